//! Operation handles and confirmation results

use crate::{
    error::{AccountError, AccountResult},
    user_operation::{UserOperationHash, UserOperationReceipt},
};
use ethers::types::{TransactionReceipt, H256, U64};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier returned by a successful submission
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", tag = "kind", content = "hash")]
pub enum OperationHandle {
    /// User operation accepted by a bundler
    UserOperation(UserOperationHash),
    /// Transaction broadcast by a relay worker
    Transaction(H256),
}

impl OperationHandle {
    pub fn hash(&self) -> H256 {
        match self {
            OperationHandle::UserOperation(hash) => hash.0,
            OperationHandle::Transaction(hash) => *hash,
        }
    }
}

impl fmt::Display for OperationHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OperationHandle::UserOperation(hash) => write!(f, "user operation {hash}"),
            OperationHandle::Transaction(hash) => write!(f, "transaction {hash:?}"),
        }
    }
}

/// Receipt matching an operation handle
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum Receipt {
    UserOperation(Box<UserOperationReceipt>),
    Transaction(Box<TransactionReceipt>),
}

impl Receipt {
    /// Whether the operation executed without reverting
    pub fn success(&self) -> bool {
        match self {
            Receipt::UserOperation(receipt) => receipt.success,
            Receipt::Transaction(receipt) => receipt.status == Some(U64::one()),
        }
    }

    /// Hash of the transaction which included the operation
    pub fn transaction_hash(&self) -> H256 {
        match self {
            Receipt::UserOperation(receipt) => receipt.tx_receipt.transaction_hash,
            Receipt::Transaction(receipt) => receipt.transaction_hash,
        }
    }

    /// Revert reason reported by the bundler, if any
    pub fn revert_reason(&self) -> String {
        match self {
            Receipt::UserOperation(receipt) if !receipt.reason.is_empty() => receipt.reason.clone(),
            _ => format!("operation reverted in transaction {:?}", self.transaction_hash()),
        }
    }
}

/// State of an operation handle
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ConfirmationStatus {
    Pending,
    /// Included with a successful receipt
    Success,
    /// Included but execution reverted
    Failed,
    /// Confirmation budget exhausted (the operation may still be included later)
    TimedOut,
}

impl ConfirmationStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, ConfirmationStatus::Pending)
    }
}

/// Outcome of tracking one operation handle
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ConfirmationResult {
    pub handle: OperationHandle,
    pub status: ConfirmationStatus,
    pub receipt: Option<Receipt>,
}

impl ConfirmationResult {
    pub fn pending(handle: OperationHandle) -> Self {
        Self { handle, status: ConfirmationStatus::Pending, receipt: None }
    }

    pub fn timed_out(handle: OperationHandle) -> Self {
        Self { handle, status: ConfirmationStatus::TimedOut, receipt: None }
    }

    /// Terminal result derived from a receipt
    pub fn from_receipt(handle: OperationHandle, receipt: Receipt) -> Self {
        let status =
            if receipt.success() { ConfirmationStatus::Success } else { ConfirmationStatus::Failed };
        Self { handle, status, receipt: Some(receipt) }
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// Maps failed and timed out results to errors
    pub fn into_result(self) -> AccountResult<Self> {
        match self.status {
            ConfirmationStatus::Failed => Err(AccountError::ExecutionReverted {
                reason: self
                    .receipt
                    .as_ref()
                    .map(Receipt::revert_reason)
                    .unwrap_or_else(|| "operation reverted".to_string()),
            }),
            ConfirmationStatus::TimedOut => Err(AccountError::Timeout { handle: self.handle.hash() }),
            ConfirmationStatus::Pending | ConfirmationStatus::Success => Ok(self),
        }
    }
}
