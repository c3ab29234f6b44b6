//! Smart contract accounts
//!
//! Every variant knows how its factory deploys it (and therefore its counterfactual address),
//! how calls are encoded for its execute interface and what its signatures look like.

mod kernel;
mod light;
mod safe;

pub use kernel::KernelAccount;
pub use light::LightAccount;
pub use safe::{safe_operation_hash, SafeAccount};

use crate::signer::Signer;
use async_trait::async_trait;
use ethers::{
    types::{Address, Bytes, H256, U256},
    utils::get_create2_address_from_hash,
};
use gasless_primitives::{
    network::AccountAbstractionConfig, pack_init_code, AccountError, AccountResult,
    AccountVariant, CallIntent, UnsignedUserOperation,
};
use std::fmt::Debug;

/// Variant specific rules of a smart contract account
#[async_trait]
pub trait SmartAccount: Send + Sync + Debug {
    fn variant(&self) -> AccountVariant;

    fn owner(&self) -> Address;

    fn factory(&self) -> Address;

    /// Salt (or index) the factory deploys the account with
    fn salt(&self) -> U256;

    /// Counterfactual address (identical before and after deployment)
    fn address(&self) -> Address;

    /// Factory call deploying the account
    fn factory_data(&self) -> Bytes;

    /// Calldata of the account executing `intent`
    fn encode_calls(&self, intent: &CallIntent) -> AccountResult<Bytes>;

    /// Placeholder signature of the right shape, used while estimating gas
    fn dummy_signature(&self) -> Bytes;

    /// Signature field of the user operation
    async fn sign_user_operation(
        &self,
        user_operation: &UnsignedUserOperation,
        signer: &dyn Signer,
    ) -> AccountResult<Bytes>;

    fn init_code(&self) -> Bytes {
        pack_init_code(self.factory(), &self.factory_data())
    }
}

/// Builds the account of `owner` for a smart account variant
///
/// # Arguments
/// * `variant` - Smart account variant
/// * `aa` - Account abstraction deployment of the network
/// * `owner` - Owner of the account
///
/// # Returns
/// * `AccountResult<Box<dyn SmartAccount>>` - The account, or a `Configuration` error when the
///   network has no deployment of the variant
pub fn smart_account(
    variant: AccountVariant,
    aa: &AccountAbstractionConfig,
    owner: Address,
) -> AccountResult<Box<dyn SmartAccount>> {
    let missing = || {
        AccountError::Configuration(format!("network has no {variant} account deployment"))
    };

    Ok(match variant {
        AccountVariant::LightAccount => {
            Box::new(LightAccount::new(aa.light_account.clone().ok_or_else(missing)?, owner))
        }
        AccountVariant::Kernel => {
            Box::new(KernelAccount::new(aa.kernel.clone().ok_or_else(missing)?, owner))
        }
        AccountVariant::Safe => {
            Box::new(SafeAccount::new(aa.safe.clone().ok_or_else(missing)?, owner))
        }
        AccountVariant::Eoa => {
            return Err(AccountError::Configuration("eoa is not a smart account".into()))
        }
    })
}

pub(crate) fn salt_bytes(salt: U256) -> [u8; 32] {
    let mut bytes = [0u8; 32];
    salt.to_big_endian(&mut bytes);
    bytes
}

pub(crate) fn create2_address(factory: Address, salt: [u8; 32], init_code_hash: H256) -> Address {
    get_create2_address_from_hash(factory, salt, init_code_hash)
}
