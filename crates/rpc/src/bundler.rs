//! Bundler and paymaster JSON-RPC clients

use crate::{
    error::{from_bundler_error, from_paymaster_error},
    eth_api::EthApiClient,
    paymaster_api::PaymasterApiClient,
};
use async_trait::async_trait;
use ethers::types::Address;
use gasless_primitives::{
    network::ApiKey, AccountError, AccountResult, SignedUserOperation, UserOperation,
    UserOperationGasEstimation, UserOperationHash, UserOperationReceipt, UserOperationSponsorship,
};
use jsonrpsee::http_client::{HeaderMap, HeaderValue, HttpClient, HttpClientBuilder};
use std::{fmt::Debug, str::FromStr, time::Duration};
use tracing::{debug, trace};

/// Bundler side of the submission boundary
#[async_trait]
pub trait BundlerClient: Send + Sync + Debug {
    /// Submits a signed user operation (one attempt)
    ///
    /// # Returns
    /// * `AccountResult<UserOperationHash>` - Hash of the accepted user operation
    async fn send_user_operation(
        &self,
        user_operation: &SignedUserOperation,
    ) -> AccountResult<UserOperationHash>;

    async fn estimate_user_operation_gas(
        &self,
        user_operation: &UserOperation,
        entry_point: Address,
    ) -> AccountResult<UserOperationGasEstimation>;

    /// Receipt of a user operation, or None while it is pending
    async fn get_user_operation_receipt(
        &self,
        user_operation_hash: UserOperationHash,
    ) -> AccountResult<Option<UserOperationReceipt>>;

    async fn supported_entry_points(&self) -> AccountResult<Vec<Address>>;
}

/// Paymaster side of the sponsorship boundary
#[async_trait]
pub trait PaymasterClient: Send + Sync + Debug {
    async fn sponsor_user_operation(
        &self,
        user_operation: &UserOperation,
        entry_point: Address,
    ) -> AccountResult<UserOperationSponsorship>;
}

/// Builds a JSON-RPC HTTP client sending the API key as a bearer token
pub fn build_http_client(
    url: &str,
    api_key: Option<&ApiKey>,
    request_timeout: Duration,
) -> AccountResult<HttpClient> {
    let mut headers = HeaderMap::new();
    if let Some(api_key) = api_key {
        let value = HeaderValue::from_str(&format!("Bearer {}", api_key.expose()))
            .map_err(|_| AccountError::Configuration("api key is not a valid header".into()))?;
        headers.insert("Authorization", value);
    }

    HttpClientBuilder::default()
        .set_headers(headers)
        .request_timeout(request_timeout)
        .build(url)
        .map_err(|err| AccountError::Configuration(format!("invalid endpoint {url}: {err}")))
}

/// Bundler (and paymaster) reached over HTTP
#[derive(Clone, Debug)]
pub struct HttpBundlerClient {
    client: HttpClient,
}

impl HttpBundlerClient {
    pub fn new(client: HttpClient) -> Self {
        Self { client }
    }

    pub fn connect(
        url: &str,
        api_key: Option<&ApiKey>,
        request_timeout: Duration,
    ) -> AccountResult<Self> {
        Ok(Self::new(build_http_client(url, api_key, request_timeout)?))
    }
}

#[async_trait]
impl BundlerClient for HttpBundlerClient {
    async fn send_user_operation(
        &self,
        user_operation: &SignedUserOperation,
    ) -> AccountResult<UserOperationHash> {
        trace!("Sending user operation {:?} to the bundler", user_operation.hash());
        let hash = EthApiClient::send_user_operation(
            &self.client,
            user_operation.user_operation().clone(),
            user_operation.entry_point(),
        )
        .await
        .map_err(from_bundler_error)?;
        debug!("Bundler accepted user operation {hash}");
        Ok(hash)
    }

    async fn estimate_user_operation_gas(
        &self,
        user_operation: &UserOperation,
        entry_point: Address,
    ) -> AccountResult<UserOperationGasEstimation> {
        EthApiClient::estimate_user_operation_gas(&self.client, user_operation.clone(), entry_point)
            .await
            .map_err(from_bundler_error)
    }

    async fn get_user_operation_receipt(
        &self,
        user_operation_hash: UserOperationHash,
    ) -> AccountResult<Option<UserOperationReceipt>> {
        EthApiClient::get_user_operation_receipt(&self.client, user_operation_hash)
            .await
            .map_err(from_bundler_error)
    }

    async fn supported_entry_points(&self) -> AccountResult<Vec<Address>> {
        let entry_points = EthApiClient::supported_entry_points(&self.client)
            .await
            .map_err(from_bundler_error)?;
        entry_points
            .iter()
            .map(|entry_point| {
                Address::from_str(entry_point).map_err(|err| {
                    AccountError::NetworkUnavailable(format!(
                        "bundler returned invalid entry point {entry_point}: {err}"
                    ))
                })
            })
            .collect()
    }
}

#[async_trait]
impl PaymasterClient for HttpBundlerClient {
    async fn sponsor_user_operation(
        &self,
        user_operation: &UserOperation,
        entry_point: Address,
    ) -> AccountResult<UserOperationSponsorship> {
        let sponsorship = PaymasterApiClient::sponsor_user_operation(
            &self.client,
            user_operation.clone(),
            entry_point,
        )
        .await
        .map_err(from_paymaster_error)?;
        debug!("Paymaster sponsored user operation of {:?}", user_operation.sender);
        Ok(sponsorship)
    }
}
