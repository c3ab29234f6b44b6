//! Gasless primitive types
//!
//! Network configuration, call intents, user operations, relay requests, confirmation results and
//! the error taxonomy shared by every gasless crate.

pub mod confirmation;
pub mod constants;
mod error;
mod intent;
pub mod network;
mod policy;
pub mod relay;
mod user_operation;
mod utils;
mod variant;

pub use confirmation::{ConfirmationResult, ConfirmationStatus, OperationHandle, Receipt};
pub use error::{AccountError, AccountResult};
pub use intent::{Call, CallIntent};
pub use network::{NetworkConfig, NetworkPreset};
pub use policy::{ConfirmationPolicy, GasPolicy, RetryPolicy};
pub use user_operation::{
    SignedUserOperation, UnsignedUserOperation, UserOperation, UserOperationGasEstimation,
    UserOperationHash, UserOperationReceipt, UserOperationSponsorship,
};
pub use utils::{
    as_checksum_addr, calldata_gas, format_amount, get_address, pack_init_code, parse_amount,
    unpack_init_code,
};
pub use variant::AccountVariant;
