//! Network collaborators shared by the account managers of one network

use crate::guard::InFlightGuard;
use gasless_primitives::{constants::submission::REQUEST_TIMEOUT, AccountResult, NetworkConfig};
use gasless_rpc::{
    connect_http, BundlerClient, ChainClient, HttpBundlerClient, HttpRelayClient, PaymasterClient,
    RelayClient,
};
use std::{sync::Arc, time::Duration};
use tracing::debug;

/// Execution node, bundler, paymaster and relay of a network
///
/// Sections missing from the network configuration leave their client empty; managers needing
/// them fail with a `Configuration` error.
#[derive(Clone, Debug)]
pub struct Clients {
    pub chain: Arc<dyn ChainClient>,
    pub bundler: Option<Arc<dyn BundlerClient>>,
    pub paymaster: Option<Arc<dyn PaymasterClient>>,
    pub relay: Option<Arc<dyn RelayClient>>,
    /// Shared by every manager of the network, so two managers of one account exclude each other
    pub guard: InFlightGuard,
}

impl Clients {
    pub fn new(chain: Arc<dyn ChainClient>) -> Self {
        Self { chain, bundler: None, paymaster: None, relay: None, guard: InFlightGuard::new() }
    }

    pub fn with_bundler(mut self, bundler: Arc<dyn BundlerClient>) -> Self {
        self.bundler = Some(bundler);
        self
    }

    pub fn with_paymaster(mut self, paymaster: Arc<dyn PaymasterClient>) -> Self {
        self.paymaster = Some(paymaster);
        self
    }

    pub fn with_relay(mut self, relay: Arc<dyn RelayClient>) -> Self {
        self.relay = Some(relay);
        self
    }

    /// Builds the HTTP clients of a network
    ///
    /// The API key of the network is sent to the bundler, paymaster and relay endpoints.
    pub fn connect(network: &NetworkConfig) -> AccountResult<Self> {
        let timeout = Duration::from_millis(REQUEST_TIMEOUT);
        let api_key = network.api_key.as_ref();
        let mut clients = Self::new(Arc::new(connect_http(&network.rpc_url, network.chain_id)?));

        if let Some(aa) = &network.aa {
            debug!("Connecting to bundler at {}", aa.bundler_url);
            clients = clients.with_bundler(Arc::new(HttpBundlerClient::connect(
                &aa.bundler_url,
                api_key,
                timeout,
            )?));
            if let Some(url) = aa.paymaster_endpoint() {
                debug!("Connecting to paymaster at {url}");
                clients = clients
                    .with_paymaster(Arc::new(HttpBundlerClient::connect(url, api_key, timeout)?));
            }
        }

        if let Some(relay) = &network.relay {
            let client = HttpRelayClient::new(&relay.relay_url, api_key.cloned(), timeout)?;
            debug!("Connecting to relay at {}", client.url());
            clients = clients.with_relay(Arc::new(client));
        }

        Ok(clients)
    }
}
