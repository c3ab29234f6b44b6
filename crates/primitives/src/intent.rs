//! Call intents supplied by the caller

use crate::error::{AccountError, AccountResult};
use ethers::types::{Address, Bytes, U256};
use serde::{Deserialize, Serialize};

/// One call the account should perform
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Call {
    pub to: Address,
    pub value: U256,
    pub data: Bytes,
}

impl Call {
    pub fn new(to: Address, value: U256, data: Bytes) -> Self {
        Self { to, value, data }
    }

    /// Plain native currency transfer
    pub fn transfer(to: Address, value: U256) -> Self {
        Self { to, value, data: Bytes::default() }
    }

    /// Contract call without value
    pub fn contract(to: Address, data: impl Into<Bytes>) -> Self {
        Self { to, value: U256::zero(), data: data.into() }
    }
}

/// A single call or an ordered batch executed atomically
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum CallIntent {
    Single(Call),
    Batch(Vec<Call>),
}

impl CallIntent {
    /// Calls in execution order
    pub fn calls(&self) -> &[Call] {
        match self {
            CallIntent::Single(call) => std::slice::from_ref(call),
            CallIntent::Batch(calls) => calls,
        }
    }

    pub fn is_batch(&self) -> bool {
        matches!(self, CallIntent::Batch(_))
    }

    /// Sum of the native value of all calls
    pub fn total_value(&self) -> U256 {
        self.calls().iter().fold(U256::zero(), |acc, call| acc.saturating_add(call.value))
    }

    /// Rejects intents which cannot be encoded
    pub fn validate(&self) -> AccountResult<()> {
        match self {
            CallIntent::Batch(calls) if calls.is_empty() => {
                Err(AccountError::InvalidIntent("batch must contain at least one call".into()))
            }
            _ => Ok(()),
        }
    }
}

impl From<Call> for CallIntent {
    fn from(call: Call) -> Self {
        CallIntent::Single(call)
    }
}

impl From<Vec<Call>> for CallIntent {
    fn from(calls: Vec<Call>) -> Self {
        if calls.len() == 1 {
            calls.into_iter().next().map(CallIntent::Single).unwrap_or(CallIntent::Batch(vec![]))
        } else {
            CallIntent::Batch(calls)
        }
    }
}
