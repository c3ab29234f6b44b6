//! Contract bindings used by the gasless accounts
//!
//! Account execute interfaces, factories, entry point, forwarder, token and faucet, plus helpers
//! decoding revert data.

mod error;
mod gen;

pub use error::{
    decode_revert_reason, decode_revert_string, revert_data_from_json_rpc,
    revert_reason_from_json_rpc, RevertReason,
};
pub use gen::{
    entry_point, forwarder, kernel, kernel_factory, light_account, light_account_factory,
    multi_send, safe, safe_module, safe_module_setup, safe_proxy_factory, token, token_faucet,
    SELECTORS_NAMES,
};
