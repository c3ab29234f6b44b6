use crate::utils::{
    load_network, parse_variant, read_mnemonic, unwrap_path_or_home, LOCAL_NETWORK,
};
use clap::Parser;
use expanded_pathbuf::ExpandedPathBuf;
use gasless_account::{KeyStore, MnemonicKeyStore, Signer};
use gasless_primitives::{AccountVariant, NetworkConfig};
use std::sync::Arc;
use tracing::debug;

const OWNER_KEY: &str = "owner";

/// Network CLI args
#[derive(Debug, Clone, Parser, PartialEq)]
pub struct NetworkArgs {
    /// Built-in network (amoy, base-sepolia, base, polygon, test or local) or path of a network
    /// configuration file.
    #[clap(long, default_value = LOCAL_NETWORK)]
    pub network: String,

    /// API key sent to the bundler, paymaster and relay server.
    #[clap(long, env = "GASLESS_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,
}

impl NetworkArgs {
    pub fn load(&self) -> eyre::Result<Arc<NetworkConfig>> {
        let network = load_network(&self.network, self.api_key.as_deref())?;
        debug!("Using network {} (chain id {})", network.name, network.chain_id);
        Ok(Arc::new(network))
    }
}

/// Account CLI args
#[derive(Debug, Clone, Parser)]
pub struct AccountArgs {
    #[clap(flatten)]
    pub network: NetworkArgs,

    /// Account variant (eoa, light, kernel or safe).
    ///
    /// By default, this option is set to `kernel`.
    #[clap(long, default_value = "kernel", value_parser=parse_variant)]
    pub variant: AccountVariant,

    /// Path to the mnemonic file.
    ///
    /// By default, `~/.gasless/mnemonic` is used.
    #[clap(long)]
    pub mnemonic_file: Option<ExpandedPathBuf>,
}

impl AccountArgs {
    /// Signing handle of the owner key stored in the mnemonic file
    pub fn signer(&self) -> eyre::Result<Arc<dyn Signer>> {
        let path = unwrap_path_or_home(self.mnemonic_file.clone())?;
        let store = MnemonicKeyStore::new();
        store.import_account(OWNER_KEY, &read_mnemonic(&path.to_path_buf())?)?;
        Ok(store.signer(OWNER_KEY)?)
    }
}

/// Args of commands submitting an operation
#[derive(Debug, Clone, Parser, PartialEq)]
pub struct SubmitArgs {
    /// Return right after submission instead of waiting for confirmation.
    #[clap(long)]
    pub no_wait: bool,
}
