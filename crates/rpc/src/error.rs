//! Classification of bundler, paymaster and node errors into [AccountError](AccountError)

use ethers::providers::{JsonRpcError, Middleware, MiddlewareError, ProviderError, RpcError};
use gasless_contracts::revert_reason_from_json_rpc;
use gasless_primitives::{constants::rpc_error_codes, AccountError};
use jsonrpsee::{core::ClientError, types::ErrorObjectOwned};

fn from_error_object(err: &ErrorObjectOwned) -> AccountError {
    match err.code() {
        rpc_error_codes::PAYMASTER => AccountError::PaymasterRejected(err.message().to_string()),
        rpc_error_codes::INTERNAL => AccountError::NetworkUnavailable(format!(
            "internal error reported by the bundler: {}",
            err.message()
        )),
        code => AccountError::ValidationRejected { code, message: err.message().to_string() },
    }
}

/// Maps an error returned by a bundler endpoint
pub fn from_bundler_error(err: ClientError) -> AccountError {
    match err {
        ClientError::Call(err) => from_error_object(&err),
        ClientError::RequestTimeout => {
            AccountError::NetworkUnavailable("bundler request timed out".into())
        }
        err => AccountError::NetworkUnavailable(err.to_string()),
    }
}

/// Maps an error returned by a paymaster endpoint (every rejection denies sponsorship)
pub fn from_paymaster_error(err: ClientError) -> AccountError {
    match err {
        ClientError::Call(err) if err.code() == rpc_error_codes::INTERNAL => {
            AccountError::NetworkUnavailable(format!(
                "internal error reported by the paymaster: {}",
                err.message()
            ))
        }
        ClientError::Call(err) => AccountError::PaymasterRejected(format!(
            "{} (code {})",
            err.message(),
            err.code()
        )),
        ClientError::RequestTimeout => {
            AccountError::NetworkUnavailable("paymaster request timed out".into())
        }
        err => AccountError::NetworkUnavailable(err.to_string()),
    }
}

/// Maps a JSON-RPC error response of the execution node
pub fn from_json_rpc_error(err: &JsonRpcError) -> AccountError {
    if err.code == rpc_error_codes::INTERNAL as i64 {
        return AccountError::NetworkUnavailable(err.message.clone());
    }
    AccountError::ValidationRejected {
        code: err.code as i32,
        message: revert_reason_from_json_rpc(err).to_string(),
    }
}

pub fn from_provider_error(err: &ProviderError) -> AccountError {
    match err {
        ProviderError::JsonRpcClientError(inner) => match inner.as_error_response() {
            Some(response) => from_json_rpc_error(response),
            None => AccountError::NetworkUnavailable(inner.to_string()),
        },
        err => AccountError::NetworkUnavailable(err.to_string()),
    }
}

/// Maps an error of any ethers middleware stack
pub fn from_middleware_error<M: Middleware>(err: M::Error) -> AccountError {
    if let Some(response) = err.as_error_response() {
        return from_json_rpc_error(response);
    }

    if let Some(err) = err.as_provider_error() {
        return from_provider_error(err);
    }

    AccountError::NetworkUnavailable(format!("middleware error: {err:?}"))
}
