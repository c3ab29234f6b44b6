//! Single in-flight operation per account

use ethers::types::Address;
use gasless_primitives::{AccountError, AccountResult};
use parking_lot::Mutex;
use std::{collections::HashSet, sync::Arc};
use tracing::trace;

/// Accounts with an operation between build start and release
#[derive(Clone, Debug, Default)]
pub struct InFlightGuard {
    accounts: Arc<Mutex<HashSet<Address>>>,
}

impl InFlightGuard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claims the account, failing with `OperationInFlight` if it is already claimed
    pub fn try_acquire(&self, account: Address) -> AccountResult<InFlightPermit> {
        if !self.accounts.lock().insert(account) {
            return Err(AccountError::OperationInFlight { account });
        }
        trace!("Account {account:?} has an operation in flight");
        Ok(InFlightPermit { account, accounts: self.accounts.clone() })
    }

    pub fn is_in_flight(&self, account: &Address) -> bool {
        self.accounts.lock().contains(account)
    }
}

/// Claim on an account, released on drop
#[derive(Debug)]
pub struct InFlightPermit {
    account: Address,
    accounts: Arc<Mutex<HashSet<Address>>>,
}

impl InFlightPermit {
    pub fn account(&self) -> Address {
        self.account
    }
}

impl Drop for InFlightPermit {
    fn drop(&mut self) {
        self.accounts.lock().remove(&self.account);
        trace!("Account {:?} released", self.account);
    }
}
