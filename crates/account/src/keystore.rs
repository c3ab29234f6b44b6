//! Key storage collaborator

use crate::signer::{LocalSigner, Signer};
use ethers::{
    core::rand::thread_rng,
    signers::{
        coins_bip39::{English, Mnemonic},
        LocalWallet, MnemonicBuilder, Signer as _,
    },
    types::Address,
};
use gasless_primitives::{constants::wallet, AccountError, AccountResult};
use parking_lot::RwLock;
use std::{collections::HashMap, fmt, sync::Arc};
use tracing::info;

/// Proof that the user explicitly asked to back up a key
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BackupConsent {
    UserInitiated,
}

/// Hands out signing handles; raw secrets only leave through an explicit backup
pub trait KeyStore: Send + Sync + fmt::Debug {
    /// Signing handle of the account
    fn signer(&self, account_id: &str) -> AccountResult<Arc<dyn Signer>>;

    /// Secret (mnemonic phrase) of the account
    fn export_secret(&self, account_id: &str, consent: BackupConsent) -> AccountResult<String>;
}

/// In-memory store of BIP-39 mnemonics
#[derive(Default)]
pub struct MnemonicKeyStore {
    phrases: RwLock<HashMap<String, String>>,
}

impl fmt::Debug for MnemonicKeyStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MnemonicKeyStore").field("accounts", &self.phrases.read().len()).finish()
    }
}

fn wallet_from_phrase(phrase: &str) -> AccountResult<LocalWallet> {
    MnemonicBuilder::<English>::default()
        .phrase(phrase)
        .derivation_path(wallet::DERIVATION_PATH)
        .and_then(|builder| builder.build())
        .map_err(|err| AccountError::KeyUnavailable(format!("invalid mnemonic: {err}")))
}

impl MnemonicKeyStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Generates a fresh 12 word mnemonic for `account_id`
    ///
    /// # Returns
    /// * `AccountResult<Address>` - Owner address derived from the new mnemonic
    pub fn create_account(&self, account_id: &str) -> AccountResult<Address> {
        let mnemonic = Mnemonic::<English>::new_with_count(&mut thread_rng(), 12)
            .map_err(|err| AccountError::KeyUnavailable(err.to_string()))?;
        self.import_account(account_id, &mnemonic.to_phrase())
    }

    /// Stores an existing mnemonic under `account_id`, replacing any previous one
    pub fn import_account(&self, account_id: &str, phrase: &str) -> AccountResult<Address> {
        let phrase = phrase.split_whitespace().collect::<Vec<_>>().join(" ");
        let address = wallet_from_phrase(&phrase)?.address();
        self.phrases.write().insert(account_id.to_string(), phrase);
        info!("Stored key of account {account_id} (owner {address:?})");
        Ok(address)
    }

    /// Forgets the key of `account_id`
    pub fn delete_account(&self, account_id: &str) -> bool {
        self.phrases.write().remove(account_id).is_some()
    }

    pub fn contains(&self, account_id: &str) -> bool {
        self.phrases.read().contains_key(account_id)
    }

    fn phrase(&self, account_id: &str) -> AccountResult<String> {
        self.phrases
            .read()
            .get(account_id)
            .cloned()
            .ok_or_else(|| AccountError::KeyUnavailable(format!("no key for account {account_id}")))
    }
}

impl KeyStore for MnemonicKeyStore {
    fn signer(&self, account_id: &str) -> AccountResult<Arc<dyn Signer>> {
        let wallet = wallet_from_phrase(&self.phrase(account_id)?)?;
        Ok(Arc::new(LocalSigner::new(wallet)))
    }

    fn export_secret(&self, account_id: &str, consent: BackupConsent) -> AccountResult<String> {
        match consent {
            BackupConsent::UserInitiated => {
                info!("Exporting key of account {account_id} for backup");
                self.phrase(account_id)
            }
        }
    }
}
