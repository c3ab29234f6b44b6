//! Error taxonomy surfaced to account manager callers

use ethers::types::{Address, H256, U256};
use thiserror::Error;

pub type AccountResult<T> = Result<T, AccountError>;

/// Every failure an account manager can report
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AccountError {
    /// Invalid or missing network configuration
    #[error("configuration error: {0}")]
    Configuration(String),
    /// Transport failure (timeout, connection reset, server error)
    #[error("network unavailable: {0}")]
    NetworkUnavailable(String),
    /// Stale nonce, bad signature, underpriced fee, failed simulation
    #[error("operation rejected by validator (code {code}): {message}")]
    ValidationRejected {
        /// JSON-RPC error code reported by the validator
        code: i32,
        /// Message reported by the validator
        message: String,
    },
    /// Paymaster denied sponsorship
    #[error("paymaster rejected sponsorship: {0}")]
    PaymasterRejected(String),
    /// A gas estimate came back below the configured floor
    #[error("{field} estimate {estimate} is below the floor {floor}")]
    InsufficientGasEstimate { field: String, estimate: U256, floor: U256 },
    #[error("signing denied: {0}")]
    SigningDenied(String),
    #[error("signing key unavailable: {0}")]
    KeyUnavailable(String),
    /// Terminal on-chain failure
    #[error("execution reverted: {reason}")]
    ExecutionReverted { reason: String },
    /// Confirmation budget exhausted; the operation may still be included later
    #[error("confirmation of {handle:?} timed out")]
    Timeout { handle: H256 },
    /// Another operation of this account has not finished yet
    #[error("account {account:?} already has an operation in flight")]
    OperationInFlight { account: Address },
    #[error("invalid call intent: {0}")]
    InvalidIntent(String),
}

impl AccountError {
    /// Whether the failure is transient and the same request may be sent again
    pub fn is_retryable(&self) -> bool {
        matches!(self, AccountError::NetworkUnavailable(_))
    }

    /// Whether the failure was reported by the bundler, relay or paymaster after inspecting the
    /// operation (the nonce used by the operation must not be reused)
    pub fn is_rejection(&self) -> bool {
        matches!(
            self,
            AccountError::ValidationRejected { .. } | AccountError::PaymasterRejected(_)
        )
    }
}

impl From<serde_json::Error> for AccountError {
    fn from(err: serde_json::Error) -> Self {
        AccountError::Configuration(err.to_string())
    }
}
