use ethers::{
    abi::AbiDecode,
    providers::JsonRpcError,
    types::{Bytes, U256},
};
use lazy_static::lazy_static;
use regex::Regex;
use std::str::FromStr;
use thiserror::Error;

const ERROR_STRING_SELECTOR: [u8; 4] = [0x08, 0xc3, 0x79, 0xa0];
const PANIC_SELECTOR: [u8; 4] = [0x4e, 0x48, 0x7b, 0x71];

lazy_static! {
    static ref HEX_DATA: Regex = Regex::new(r"0x[0-9a-fA-F]+").expect("Regex rules valid");
}

/// Decoded revert data of a failed call
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RevertReason {
    /// `revert("reason")` or `require(false, "reason")`
    #[error("{0}")]
    Message(String),
    /// Compiler inserted panic (overflow, division by zero, ...)
    #[error("panic (code {0:#x})")]
    Panic(U256),
    /// Custom error or empty revert
    #[error("custom error {0}")]
    Custom(Bytes),
}

// ethers-rs could not handle `require (true, "reason")` or `revert("test failed")` well, in this
// case revert with `require` error would end up with error signature `0x08c379a0`
pub fn decode_revert_string(data: &[u8]) -> Option<String> {
    if data.len() < 4 {
        return None;
    }
    let (error_sig, reason) = data.split_at(4);
    if error_sig == ERROR_STRING_SELECTOR {
        <String as AbiDecode>::decode(reason).ok()
    } else {
        None
    }
}

/// Decodes raw revert data
pub fn decode_revert_reason(data: &[u8]) -> RevertReason {
    if let Some(reason) = decode_revert_string(data) {
        return RevertReason::Message(reason);
    }
    if data.len() >= 4 && data[..4] == PANIC_SELECTOR {
        if let Ok(code) = <U256 as AbiDecode>::decode(&data[4..]) {
            return RevertReason::Panic(code);
        }
    }
    RevertReason::Custom(Bytes::from(data.to_vec()))
}

/// Extracts revert data from the `data` field of a JSON-RPC error (nodes report it either as a
/// hex string or embedded in a longer message)
pub fn revert_data_from_json_rpc(err: &JsonRpcError) -> Option<Bytes> {
    match err.data.as_ref()? {
        serde_json::Value::String(data) => {
            HEX_DATA.find(data).and_then(|hex| Bytes::from_str(hex.as_str()).ok())
        }
        serde_json::Value::Object(object) => object
            .get("data")
            .and_then(|data| data.as_str())
            .and_then(|data| HEX_DATA.find(data))
            .and_then(|hex| Bytes::from_str(hex.as_str()).ok()),
        _ => None,
    }
}

/// Revert reason reported by a JSON-RPC error, falling back to the error message
pub fn revert_reason_from_json_rpc(err: &JsonRpcError) -> RevertReason {
    match revert_data_from_json_rpc(err) {
        Some(data) => decode_revert_reason(&data),
        None => RevertReason::Message(err.message.clone()),
    }
}
