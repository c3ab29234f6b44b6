//! Address derivation

use crate::smart::smart_account;
use ethers::types::{Address, U256};
use gasless_primitives::{AccountResult, AccountVariant, NetworkConfig};
use parking_lot::RwLock;
use std::collections::HashMap;
use tracing::trace;

/// Address of the account `owner` controls with the given variant on `network`
///
/// No network call is made: smart account addresses are the counterfactual CREATE2 addresses of
/// their factories, the EOA address is the owner itself.
pub fn get_address(
    variant: AccountVariant,
    owner: Address,
    network: &NetworkConfig,
) -> AccountResult<Address> {
    match variant {
        AccountVariant::Eoa => Ok(owner),
        variant => Ok(smart_account(variant, network.aa()?, owner)?.address()),
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
struct AddressKey {
    variant: AccountVariant,
    owner: Address,
    factory: Address,
    salt: U256,
}

/// Memo of derived addresses; the derivation stays the source of truth
#[derive(Debug, Default)]
pub struct AddressCache {
    entries: RwLock<HashMap<AddressKey, Address>>,
}

impl AddressCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_or_derive(
        &self,
        variant: AccountVariant,
        owner: Address,
        network: &NetworkConfig,
    ) -> AccountResult<Address> {
        if variant == AccountVariant::Eoa {
            return Ok(owner);
        }

        let account = smart_account(variant, network.aa()?, owner)?;
        let key = AddressKey { variant, owner, factory: account.factory(), salt: account.salt() };
        if let Some(address) = self.entries.read().get(&key) {
            return Ok(*address);
        }

        let address = account.address();
        trace!("Derived {variant} account of {owner:?}: {address:?}");
        self.entries.write().insert(key, address);
        Ok(address)
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        self.entries.write().clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn eoa_address_is_owner() {
        let owner = Address::random();
        assert_eq!(get_address(AccountVariant::Eoa, owner, &NetworkConfig::local()).unwrap(), owner);
    }

    #[test]
    fn cache_matches_derivation() {
        let network = NetworkConfig::local();
        let cache = AddressCache::new();
        let owner: Address = "0x88046468228953d17c7DAaE39cfEF9B4b082164D".parse().unwrap();

        let derived = get_address(AccountVariant::Kernel, owner, &network).unwrap();
        assert_eq!(cache.get_or_derive(AccountVariant::Kernel, owner, &network).unwrap(), derived);
        assert_eq!(cache.get_or_derive(AccountVariant::Kernel, owner, &network).unwrap(), derived);
        assert_eq!(cache.len(), 1);

        let mut other_index = network.clone();
        if let Some(kernel) = other_index.aa.as_mut().and_then(|aa| aa.kernel.as_mut()) {
            kernel.index = U256::one();
        }
        let other = cache.get_or_derive(AccountVariant::Kernel, owner, &other_index).unwrap();
        assert_ne!(other, derived);
        assert_eq!(cache.len(), 2);

        cache.clear();
        assert!(cache.is_empty());
        assert_eq!(cache.get_or_derive(AccountVariant::Kernel, owner, &network).unwrap(), derived);
    }

    #[test]
    fn local_addresses() {
        let network = NetworkConfig::local();
        let owner: Address = "0x88046468228953d17c7DAaE39cfEF9B4b082164D".parse().unwrap();
        assert_eq!(
            get_address(AccountVariant::Kernel, owner, &network).unwrap(),
            "0x236616abedd3cc9b91a512909baa9606bf8fdb7d".parse().unwrap()
        );
        assert_eq!(
            get_address(AccountVariant::Safe, owner, &network).unwrap(),
            "0xc5de1c79cbb6bdbf9f52b2f542f0f4df72c09694".parse().unwrap()
        );
    }

    #[test]
    fn missing_deployment() {
        let mut network = NetworkConfig::local();
        if let Some(aa) = network.aa.as_mut() {
            aa.safe = None;
        }
        assert!(AddressCache::new()
            .get_or_derive(AccountVariant::Safe, Address::random(), &network)
            .is_err());
    }
}
