//! Network configuration registry
//!
//! A [NetworkConfig](NetworkConfig) is built once (from a JSON file or from a preset), validated
//! and then shared read-only between every account manager of that chain.

use crate::{
    constants::{confirmation, entry_point, hosted, kernel, local, relay, safe},
    error::{AccountError, AccountResult},
    policy::{ConfirmationPolicy, GasPolicy, RetryPolicy},
};
use alloy_chains::{Chain, NamedChain};
use ethers::types::{Address, Bytes, U256};
use serde::{Deserialize, Serialize};
use std::{fmt, fs, path::Path, str::FromStr};
use strum_macros::{Display, EnumString, EnumVariantNames};

/// API key sent to bundler, paymaster and relay endpoints (never printed)
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ApiKey(String);

impl ApiKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ApiKey(<redacted>)")
    }
}

/// Per-chain configuration
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkConfig {
    /// Human readable name of the network
    #[serde(default)]
    pub name: String,
    pub chain_id: u64,
    /// Execution node endpoint
    pub rpc_url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<ApiKey>,
    /// Account abstraction (ERC-4337) deployment, required by the smart account variants
    #[serde(default)]
    pub aa: Option<AccountAbstractionConfig>,
    /// Legacy relay deployment, required by the EOA variant
    #[serde(default)]
    pub relay: Option<RelayConfig>,
    #[serde(default)]
    pub tokens: TokenConfig,
    #[serde(default)]
    pub gas: GasPolicy,
    #[serde(default)]
    pub submission: RetryPolicy,
    #[serde(default)]
    pub confirmation: ConfirmationPolicy,
}

/// Entry point, bundler, paymaster and account factories
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountAbstractionConfig {
    pub entry_point: Address,
    pub bundler_url: String,
    /// Endpoint serving `pm_sponsorUserOperation`; falls back to the bundler when only the
    /// paymaster address is configured
    #[serde(default)]
    pub paymaster_url: Option<String>,
    /// Paymaster expected to sponsor user operations
    #[serde(default)]
    pub paymaster: Option<Address>,
    #[serde(default)]
    pub light_account: Option<LightAccountConfig>,
    #[serde(default)]
    pub kernel: Option<KernelConfig>,
    #[serde(default)]
    pub safe: Option<SafeConfig>,
}

/// LightAccount (v1) factory
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LightAccountConfig {
    pub factory: Address,
    pub implementation: Address,
    /// Creation code of the ERC-1967 proxy deployed by the factory
    pub proxy_creation_code: Bytes,
    #[serde(default)]
    pub salt: U256,
}

/// Kernel (v2) factory
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct KernelConfig {
    pub factory: Address,
    pub implementation: Address,
    pub ecdsa_validator: Address,
    #[serde(default)]
    pub index: U256,
}

/// Safe (1.4.1) proxy factory and ERC-4337 module
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SafeConfig {
    pub proxy_factory: Address,
    pub singleton: Address,
    /// Safe4337Module (fallback handler and module)
    pub module: Address,
    /// Helper enabling the module during setup
    pub module_setup: Address,
    pub multi_send: Address,
    /// Creation code of the proxy deployed by the factory
    pub proxy_creation_code: Bytes,
    #[serde(default)]
    pub salt_nonce: U256,
}

/// Relay server, relay hub and forwarder of the legacy meta-transaction path
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelayConfig {
    pub relay_url: String,
    pub relay_hub: Address,
    pub forwarder: Address,
    /// Paymaster paying for relayed calls
    pub paymaster: Address,
    pub relay_worker: Address,
    #[serde(default = "default_domain_separator_name")]
    pub domain_separator_name: String,
    #[serde(default = "default_max_acceptance_budget")]
    pub max_acceptance_budget: U256,
    /// Validity window of a relay request (in seconds)
    #[serde(default = "default_request_valid_seconds")]
    pub request_valid_seconds: u64,
    #[serde(default = "default_gtx_data_zero")]
    pub gtx_data_zero: u64,
    #[serde(default = "default_gtx_data_non_zero")]
    pub gtx_data_non_zero: u64,
    #[serde(default = "default_max_relay_nonce_gap")]
    pub max_relay_nonce_gap: u64,
    #[serde(default = "default_client_id")]
    pub client_id: U256,
    #[serde(default)]
    pub paymaster_data: Bytes,
}

fn default_domain_separator_name() -> String {
    relay::DOMAIN_SEPARATOR_NAME.to_string()
}

fn default_max_acceptance_budget() -> U256 {
    relay::MAX_ACCEPTANCE_BUDGET.into()
}

fn default_request_valid_seconds() -> u64 {
    relay::REQUEST_VALID_SECONDS
}

fn default_gtx_data_zero() -> u64 {
    relay::GTX_DATA_ZERO
}

fn default_gtx_data_non_zero() -> u64 {
    relay::GTX_DATA_NON_ZERO
}

fn default_max_relay_nonce_gap() -> u64 {
    relay::MAX_RELAY_NONCE_GAP
}

fn default_client_id() -> U256 {
    U256::one()
}

/// Token used by the reward claim and token transfers
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenConfig {
    #[serde(default)]
    pub reward_token: Option<Address>,
    /// Contract exposing `claim()`; the reward token itself when absent
    #[serde(default)]
    pub faucet: Option<Address>,
}

impl TokenConfig {
    /// Contract called by the reward claim
    pub fn faucet(&self) -> Option<Address> {
        self.faucet.or(self.reward_token)
    }
}

/// Networks with a built-in configuration
#[derive(Clone, Copy, Debug, Display, EnumString, EnumVariantNames, PartialEq, Eq)]
#[strum(serialize_all = "kebab_case")]
pub enum NetworkPreset {
    /// Polygon PoS testnet
    Amoy,
    BaseSepolia,
    Base,
    Polygon,
    /// Local deployment with short retry and confirmation windows
    Test,
    /// Local development chain
    Local,
}

fn check_url(field: &str, url: &str) -> AccountResult<()> {
    if url.starts_with("http://") || url.starts_with("https://") {
        Ok(())
    } else {
        Err(AccountError::Configuration(format!("{field} must be an http(s) url, got {url:?}")))
    }
}

fn check_address(field: &str, address: &Address) -> AccountResult<()> {
    if address.is_zero() {
        Err(AccountError::Configuration(format!("{field} must not be the zero address")))
    } else {
        Ok(())
    }
}

impl AccountAbstractionConfig {
    /// Endpoint asked for sponsorship, if sponsorship is enabled
    pub fn paymaster_endpoint(&self) -> Option<&str> {
        match (&self.paymaster_url, &self.paymaster) {
            (Some(url), _) => Some(url.as_str()),
            (None, Some(_)) => Some(self.bundler_url.as_str()),
            (None, None) => None,
        }
    }

    fn validate(&self) -> AccountResult<()> {
        check_address("aa.entry_point", &self.entry_point)?;
        check_url("aa.bundler_url", &self.bundler_url)?;
        if let Some(url) = &self.paymaster_url {
            check_url("aa.paymaster_url", url)?;
        }
        if let Some(light) = &self.light_account {
            check_address("aa.light_account.factory", &light.factory)?;
            check_address("aa.light_account.implementation", &light.implementation)?;
            if light.proxy_creation_code.is_empty() {
                return Err(AccountError::Configuration(
                    "aa.light_account.proxy_creation_code must not be empty".into(),
                ));
            }
        }
        if let Some(kernel) = &self.kernel {
            check_address("aa.kernel.factory", &kernel.factory)?;
            check_address("aa.kernel.implementation", &kernel.implementation)?;
            check_address("aa.kernel.ecdsa_validator", &kernel.ecdsa_validator)?;
        }
        if let Some(safe) = &self.safe {
            check_address("aa.safe.proxy_factory", &safe.proxy_factory)?;
            check_address("aa.safe.singleton", &safe.singleton)?;
            check_address("aa.safe.module", &safe.module)?;
            check_address("aa.safe.module_setup", &safe.module_setup)?;
            check_address("aa.safe.multi_send", &safe.multi_send)?;
            if safe.proxy_creation_code.is_empty() {
                return Err(AccountError::Configuration(
                    "aa.safe.proxy_creation_code must not be empty".into(),
                ));
            }
        }
        Ok(())
    }
}

impl RelayConfig {
    fn validate(&self) -> AccountResult<()> {
        check_url("relay.relay_url", &self.relay_url)?;
        check_address("relay.relay_hub", &self.relay_hub)?;
        check_address("relay.forwarder", &self.forwarder)?;
        check_address("relay.paymaster", &self.paymaster)?;
        check_address("relay.relay_worker", &self.relay_worker)?;
        if self.request_valid_seconds == 0 {
            return Err(AccountError::Configuration(
                "relay.request_valid_seconds must be positive".into(),
            ));
        }
        Ok(())
    }
}

impl NetworkConfig {
    /// Loads and validates a network configuration from a JSON file
    ///
    /// # Arguments
    /// * `path` - Path of the JSON file
    ///
    /// # Returns
    /// * `AccountResult<Self>` - The validated configuration or a `Configuration` error
    pub fn from_file(path: impl AsRef<Path>) -> AccountResult<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|err| {
            AccountError::Configuration(format!("cannot read {}: {err}", path.display()))
        })?;
        let mut config: NetworkConfig = serde_json::from_str(&content)?;
        if config.name.is_empty() {
            config.name = Chain::from_id(config.chain_id).to_string();
        }
        config.validate()?;
        Ok(config)
    }

    /// Built-in configuration of a preset network
    pub fn preset(preset: NetworkPreset) -> Self {
        match preset {
            NetworkPreset::Amoy => {
                Self::hosted(NamedChain::PolygonAmoy, "https://rpc-amoy.polygon.technology", None)
            }
            NetworkPreset::BaseSepolia => {
                Self::hosted(NamedChain::BaseSepolia, "https://sepolia.base.org", None)
            }
            NetworkPreset::Base => Self::hosted(NamedChain::Base, "https://mainnet.base.org", None),
            NetworkPreset::Polygon => Self::hosted(
                NamedChain::Polygon,
                "https://polygon-rpc.com",
                Some(parse_address(hosted::POLYGON_REWARD_TOKEN)),
            ),
            NetworkPreset::Test => Self {
                name: preset.to_string(),
                submission: RetryPolicy {
                    initial_backoff_ms: 1,
                    max_backoff_ms: 10,
                    ..Default::default()
                },
                confirmation: ConfirmationPolicy {
                    poll_interval_ms: confirmation::DEV_POLL_INTERVAL,
                    timeout_ms: confirmation::DEV_POLL_INTERVAL * 100,
                },
                ..Self::local()
            },
            NetworkPreset::Local => Self::local(),
        }
    }

    /// Local development chain (entry point v0.6, Kernel and Safe factories, relay and faucet on
    /// the default ports and addresses)
    ///
    /// LightAccount requires the proxy creation code of the deployed factory and is therefore only
    /// available through a configuration file.
    pub fn local() -> Self {
        let chain = Chain::from_id(local::CHAIN_ID);
        let confirmation = if chain.named() == Some(NamedChain::Dev) {
            ConfirmationPolicy {
                poll_interval_ms: confirmation::DEV_POLL_INTERVAL,
                ..Default::default()
            }
        } else {
            ConfirmationPolicy::default()
        };

        Self {
            name: NetworkPreset::Local.to_string(),
            chain_id: local::CHAIN_ID,
            rpc_url: local::RPC_URL.to_string(),
            api_key: None,
            aa: Some(AccountAbstractionConfig {
                entry_point: parse_address(entry_point::ADDRESS),
                bundler_url: local::BUNDLER_URL.to_string(),
                paymaster_url: None,
                paymaster: None,
                light_account: None,
                kernel: Some(kernel_deployment()),
                safe: Some(safe_deployment()),
            }),
            relay: Some(RelayConfig {
                relay_url: local::RELAY_URL.to_string(),
                relay_hub: parse_address("0x3232f21A6E08312654270c78A773f00dd61d60f5"),
                forwarder: parse_address("0xB2b5841DBeF766d4b521221732F9B618fCf34A87"),
                paymaster: parse_address("0x7E4123407707516bD7a3aFa4E3ebCeacfcbaa107"),
                relay_worker: parse_address("0x84ef35506635109ce9db0dd72c25f84dbc6c5d5b"),
                domain_separator_name: default_domain_separator_name(),
                max_acceptance_budget: default_max_acceptance_budget(),
                request_valid_seconds: default_request_valid_seconds(),
                gtx_data_zero: default_gtx_data_zero(),
                gtx_data_non_zero: default_gtx_data_non_zero(),
                max_relay_nonce_gap: default_max_relay_nonce_gap(),
                client_id: default_client_id(),
                paymaster_data: Bytes::default(),
            }),
            tokens: TokenConfig {
                reward_token: Some(parse_address(local::REWARD_TOKEN)),
                faucet: Some(parse_address(local::FAUCET)),
            },
            gas: GasPolicy::default(),
            submission: RetryPolicy::default(),
            confirmation,
        }
    }

    /// Public chain served by the hosted bundler and paymaster
    ///
    /// Only the account abstraction path is preset; the legacy relay needs a configuration file.
    fn hosted(chain: NamedChain, rpc_url: &str, reward_token: Option<Address>) -> Self {
        Self {
            name: chain.to_string(),
            chain_id: Chain::from(chain).id(),
            rpc_url: rpc_url.to_string(),
            api_key: None,
            aa: Some(AccountAbstractionConfig {
                entry_point: parse_address(entry_point::ADDRESS),
                bundler_url: hosted::endpoint(hosted::BUNDLER_URL_TEMPLATE, chain),
                paymaster_url: Some(hosted::endpoint(hosted::PAYMASTER_URL_TEMPLATE, chain)),
                paymaster: None,
                light_account: None,
                kernel: Some(kernel_deployment()),
                safe: Some(safe_deployment()),
            }),
            relay: None,
            tokens: TokenConfig { reward_token, faucet: None },
            gas: GasPolicy::default(),
            submission: RetryPolicy::default(),
            confirmation: ConfirmationPolicy::default(),
        }
    }

    /// Checks the configuration once before it is shared
    pub fn validate(&self) -> AccountResult<()> {
        if self.chain_id == 0 {
            return Err(AccountError::Configuration("chain_id must not be 0".into()));
        }
        check_url("rpc_url", &self.rpc_url)?;
        if self.aa.is_none() && self.relay.is_none() {
            return Err(AccountError::Configuration(
                "either the aa or the relay section must be present".into(),
            ));
        }
        if let Some(aa) = &self.aa {
            aa.validate()?;
        }
        if let Some(relay) = &self.relay {
            relay.validate()?;
        }
        if self.gas.gas_limit_multiplier_percent < 100 {
            return Err(AccountError::Configuration(
                "gas.gas_limit_multiplier_percent must be at least 100".into(),
            ));
        }
        if self.submission.max_attempts == 0 {
            return Err(AccountError::Configuration(
                "submission.max_attempts must be at least 1".into(),
            ));
        }
        if self.confirmation.poll_interval_ms == 0 ||
            self.confirmation.timeout_ms < self.confirmation.poll_interval_ms
        {
            return Err(AccountError::Configuration(
                "confirmation.timeout_ms must be at least one positive poll interval".into(),
            ));
        }
        Ok(())
    }

    /// Returns a copy of the configuration using the given API key
    pub fn with_api_key(self, api_key: impl Into<String>) -> Self {
        Self { api_key: Some(ApiKey::new(api_key)), ..self }
    }

    pub fn chain(&self) -> Chain {
        Chain::from_id(self.chain_id)
    }

    /// Account abstraction section, required by the smart account variants
    pub fn aa(&self) -> AccountResult<&AccountAbstractionConfig> {
        self.aa.as_ref().ok_or_else(|| {
            AccountError::Configuration(format!(
                "network {} has no account abstraction deployment",
                self.name
            ))
        })
    }

    /// Relay section, required by the EOA variant
    pub fn relay(&self) -> AccountResult<&RelayConfig> {
        self.relay.as_ref().ok_or_else(|| {
            AccountError::Configuration(format!("network {} has no relay deployment", self.name))
        })
    }
}

fn parse_address(address: &str) -> Address {
    Address::from_str(address).unwrap_or_default()
}

fn kernel_deployment() -> KernelConfig {
    KernelConfig {
        factory: parse_address(kernel::FACTORY),
        implementation: parse_address(kernel::IMPLEMENTATION),
        ecdsa_validator: parse_address(kernel::ECDSA_VALIDATOR),
        index: U256::zero(),
    }
}

fn safe_deployment() -> SafeConfig {
    SafeConfig {
        proxy_factory: parse_address(safe::PROXY_FACTORY),
        singleton: parse_address(safe::SINGLETON),
        module: parse_address(safe::MODULE),
        module_setup: parse_address(safe::MODULE_SETUP),
        multi_send: parse_address(safe::MULTI_SEND),
        proxy_creation_code: Bytes::from_str(safe::PROXY_CREATION_CODE).unwrap_or_default(),
        salt_nonce: U256::zero(),
    }
}
