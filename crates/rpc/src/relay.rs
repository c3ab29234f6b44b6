//! Legacy relay client

use async_trait::async_trait;
use ethers::types::Bytes;
use gasless_primitives::{
    constants::{relay, rpc_error_codes},
    network::ApiKey,
    relay::{RelayTransactionRequest, RelayTransactionResponse},
    AccountError, AccountResult,
};
use reqwest::{Client, StatusCode};
use std::{fmt::Debug, time::Duration};
use tracing::{debug, trace};

/// Relay side of the EOA submission boundary
#[async_trait]
pub trait RelayClient: Send + Sync + Debug {
    /// Hands a signed relay request to the relay server (one attempt)
    ///
    /// # Returns
    /// * `AccountResult<Bytes>` - Signed transaction broadcast by the relay worker
    async fn relay_transaction(&self, request: &RelayTransactionRequest) -> AccountResult<Bytes>;
}

/// Relay server reached over HTTP
#[derive(Clone, Debug)]
pub struct HttpRelayClient {
    client: Client,
    url: String,
    api_key: Option<ApiKey>,
}

impl HttpRelayClient {
    pub fn new(
        relay_url: &str,
        api_key: Option<ApiKey>,
        request_timeout: Duration,
    ) -> AccountResult<Self> {
        let client = Client::builder()
            .timeout(request_timeout)
            .build()
            .map_err(|err| AccountError::Configuration(format!("relay client: {err}")))?;

        Ok(Self {
            client,
            url: format!("{}/{}", relay_url.trim_end_matches('/'), relay::RELAY_PATH),
            api_key,
        })
    }

    /// Full URL of the relay endpoint
    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl RelayClient for HttpRelayClient {
    async fn relay_transaction(&self, request: &RelayTransactionRequest) -> AccountResult<Bytes> {
        trace!("Relaying request of {:?} to {}", request.relay_request.request.from, self.url);

        let mut post = self.client.post(&self.url).json(request);
        if let Some(api_key) = &self.api_key {
            post = post.bearer_auth(api_key.expose());
        }

        let res = post
            .send()
            .await
            .map_err(|err| AccountError::NetworkUnavailable(format!("relay: {err}")))?;

        let status = res.status();
        if status.is_server_error() || status == StatusCode::TOO_MANY_REQUESTS {
            return Err(AccountError::NetworkUnavailable(format!("relay responded with {status}")));
        }
        if !status.is_success() {
            let message = res.text().await.unwrap_or_default();
            return Err(AccountError::ValidationRejected {
                code: rpc_error_codes::VALIDATION,
                message: format!("relay responded with {status}: {message}"),
            });
        }

        let body = res
            .json::<RelayTransactionResponse>()
            .await
            .map_err(|err| AccountError::ValidationRejected {
                code: rpc_error_codes::VALIDATION,
                message: format!("malformed relay response: {err}"),
            })?;
        let signed_tx = body.into_result()?;
        debug!("Relay accepted request of {:?}", request.relay_request.request.from);
        Ok(signed_tx)
    }
}
