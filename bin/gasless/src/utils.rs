use dirs::home_dir;
use ethers::types::{Address, U256};
use expanded_pathbuf::ExpandedPathBuf;
use gasless_primitives::{AccountVariant, NetworkConfig, NetworkPreset};
use std::{fs, future::Future, path::Path, str::FromStr};
use tracing::info;

/// Name of the built-in local development network
pub const LOCAL_NETWORK: &str = "local";

/// Unwrap path or returns the default mnemonic file in the home directory
pub fn unwrap_path_or_home(path: Option<ExpandedPathBuf>) -> eyre::Result<ExpandedPathBuf> {
    if let Some(path) = path {
        Ok(path)
    } else {
        home_dir()
            .map(|h| h.join(".gasless").join("mnemonic"))
            .ok_or_else(|| eyre::eyre!("Get Home directory error"))
            .map(ExpandedPathBuf)
    }
}

/// Parses address from string
pub fn parse_address(s: &str) -> Result<Address, String> {
    Address::from_str(s).map_err(|_| format!("String {s} is not a valid address"))
}

/// Parses U256 from string
pub fn parse_u256(s: &str) -> Result<U256, String> {
    U256::from_dec_str(s).map_err(|_| format!("String {s} is not a valid U256"))
}

/// Parses AccountVariant from string
pub fn parse_variant(s: &str) -> Result<AccountVariant, String> {
    AccountVariant::from_str(s).map_err(|_| format!("String {s} is not a valid account variant"))
}

/// Built-in preset name or path of a JSON configuration file
pub fn load_network(network: &str, api_key: Option<&str>) -> eyre::Result<NetworkConfig> {
    let config = match NetworkPreset::from_str(network) {
        Ok(preset) => {
            let config = NetworkConfig::preset(preset);
            config.validate()?;
            config
        }
        Err(_) => NetworkConfig::from_file(network)?,
    };

    Ok(match api_key {
        Some(api_key) => config.with_api_key(api_key),
        None => config,
    })
}

/// Reads the mnemonic phrase stored at `path`
pub fn read_mnemonic(path: &Path) -> eyre::Result<String> {
    let phrase = fs::read_to_string(path)
        .map_err(|err| eyre::eyre!("Cannot read mnemonic file {}: {err}", path.display()))?;
    let phrase = phrase.trim();
    if phrase.is_empty() {
        return Err(eyre::eyre!("Mnemonic file {} is empty", path.display()));
    }
    Ok(phrase.to_string())
}

/// Writes a mnemonic phrase to `path`, readable by the owner only
pub fn write_mnemonic(path: &Path, phrase: &str, force: bool) -> eyre::Result<()> {
    if path.exists() && !force {
        return Err(eyre::eyre!("{} already exists, pass --force to overwrite it", path.display()));
    }
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, format!("{phrase}\n"))?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(path, fs::Permissions::from_mode(0o600))?;
    }

    Ok(())
}

/// Runs the future to completion or until `ctrl-c` is received.
pub async fn run_until_ctrl_c<F, E>(fut: F) -> Result<(), E>
where
    F: Future<Output = Result<(), E>>,
    E: Send + Sync + 'static + From<std::io::Error>,
{
    tokio::select! {
        res = tokio::signal::ctrl_c() => {
            res?;
            info!("Received ctrl-c signal.");
        },
        res = fut => res?,
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn value_parsers() {
        assert_eq!(parse_variant("kernel").unwrap(), AccountVariant::Kernel);
        assert_eq!(parse_variant("light").unwrap(), AccountVariant::LightAccount);
        assert!(parse_variant("simple").is_err());
        assert_eq!(parse_u256("1000").unwrap(), U256::from(1000));
        assert!(parse_u256("0x10").is_err());
        assert!(parse_address("0x123").is_err());
    }

    #[test]
    fn local_network_preset() {
        let network = load_network(LOCAL_NETWORK, Some("secret")).unwrap();
        assert_eq!(network.chain_id, NetworkConfig::local().chain_id);
        assert_eq!(network.api_key.unwrap().expose(), "secret");
        assert!(load_network("/does/not/exist.json", None).is_err());
    }

    #[test]
    fn public_network_presets() {
        assert_eq!(load_network("amoy", None).unwrap().chain_id, 80002);
        assert_eq!(load_network("base-sepolia", None).unwrap().chain_id, 84532);
        assert_eq!(load_network("base", None).unwrap().chain_id, 8453);
        assert_eq!(load_network("polygon", None).unwrap().chain_id, 137);
        assert_eq!(load_network("test", None).unwrap().name, "test");
    }

    #[test]
    fn mnemonic_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("keys").join("mnemonic");
        let phrase = "test test test test test test test test test test test junk";

        write_mnemonic(&path, phrase, false).unwrap();
        assert_eq!(read_mnemonic(&path).unwrap(), phrase);
        assert!(write_mnemonic(&path, phrase, false).is_err());
        write_mnemonic(&path, phrase, true).unwrap();

        fs::write(&path, "  \n").unwrap();
        assert!(read_mnemonic(&path).is_err());
    }
}
