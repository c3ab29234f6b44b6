//! Signer adapter
//!
//! The managers only ever see a [Signer](Signer): something able to sign a digest on behalf of
//! the account owner. Where the key lives (memory, hardware, remote service) is not their concern.

use async_trait::async_trait;
use ethers::{
    signers::{LocalWallet, Signer as EthersSigner, WalletError},
    types::{Address, Signature, H256},
};
use gasless_primitives::{AccountError, AccountResult};
use std::fmt::Debug;

/// Key holding collaborator of an account owner
#[async_trait]
pub trait Signer: Send + Sync + Debug {
    /// Address of the owner
    fn address(&self) -> Address;

    /// Raw ECDSA signature over a 32 byte digest (no prefix applied)
    async fn sign_hash(&self, hash: H256) -> AccountResult<Signature>;

    /// EIP-191 personal signature over `message`
    async fn sign_message(&self, message: &[u8]) -> AccountResult<Signature>;
}

/// [Signer](Signer) holding a software key
#[derive(Clone, Debug)]
pub struct LocalSigner {
    wallet: LocalWallet,
}

impl LocalSigner {
    pub fn new(wallet: LocalWallet) -> Self {
        Self { wallet }
    }
}

impl From<LocalWallet> for LocalSigner {
    fn from(wallet: LocalWallet) -> Self {
        Self::new(wallet)
    }
}

fn signing_denied(err: WalletError) -> AccountError {
    AccountError::SigningDenied(err.to_string())
}

#[async_trait]
impl Signer for LocalSigner {
    fn address(&self) -> Address {
        self.wallet.address()
    }

    async fn sign_hash(&self, hash: H256) -> AccountResult<Signature> {
        self.wallet.sign_hash(hash).map_err(signing_denied)
    }

    async fn sign_message(&self, message: &[u8]) -> AccountResult<Signature> {
        self.wallet.sign_message(message).await.map_err(signing_denied)
    }
}

#[cfg(test)]
pub(crate) fn test_signer() -> LocalSigner {
    use ethers::signers::{coins_bip39::English, MnemonicBuilder};

    MnemonicBuilder::<English>::default()
        .phrase("test test test test test test test test test test test junk")
        .build()
        .unwrap()
        .into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use ethers::utils::keccak256;

    #[tokio::test]
    async fn signatures_recover_to_owner() {
        let signer = test_signer();
        assert_eq!(
            signer.address(),
            "0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266".parse::<Address>().unwrap()
        );

        let digest: H256 = keccak256("digest").into();
        let raw = signer.sign_hash(digest).await.unwrap();
        assert_eq!(raw.recover(digest).unwrap(), signer.address());
        assert!(raw.v == 27 || raw.v == 28);

        let personal = signer.sign_message(digest.as_bytes()).await.unwrap();
        assert_eq!(personal.recover(digest.as_bytes()).unwrap(), signer.address());
        assert_ne!(personal, raw);
    }
}
