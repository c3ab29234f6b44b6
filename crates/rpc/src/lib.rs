//! Network boundaries of the account managers: execution node, bundler, paymaster and relay

pub mod bundler;
pub mod chain;
pub mod error;
mod eth_api;
mod paymaster_api;
pub mod relay;
pub mod retry;

pub use bundler::{build_http_client, BundlerClient, HttpBundlerClient, PaymasterClient};
pub use chain::{connect_http, create_http_provider, ChainClient, EthClient};
pub use eth_api::{EthApiClient, EthApiServer};
pub use paymaster_api::{PaymasterApiClient, PaymasterApiServer};
pub use relay::{HttpRelayClient, RelayClient};
pub use retry::with_backoff;
