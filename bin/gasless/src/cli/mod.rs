use crate::utils::run_until_ctrl_c;
use clap::{value_parser, Parser, Subcommand};

pub mod args;
pub mod commands;

/// The main Gasless CLI interface
#[derive(Debug, Parser)]
#[command(author, version, about = "Gasless", long_about = None)]
pub struct Cli {
    /// The command to execute
    #[clap(subcommand)]
    command: Commands,

    /// The verbosity level
    #[clap(long, short, global = true, default_value_t = 2, value_parser = value_parser!(u8).range(..=4))]
    verbosity: u8,
}

impl Cli {
    /// Get the log level based on the verbosity level
    pub fn get_log_level(&self) -> String {
        match self.verbosity {
            0 => "error",
            1 => "warn",
            2 => "info",
            3 => "debug",
            _ => "trace",
        }
        .into()
    }
}

/// Commands to be executed
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Create a new owner key and write its mnemonic file
    #[command(name = "create-wallet")]
    CreateWallet(commands::CreateWalletCommand),

    /// Print the account address of the owner key
    #[command(name = "address")]
    Address(commands::AddressCommand),

    /// Print the native or token balance of the account
    #[command(name = "balance")]
    Balance(commands::BalanceCommand),

    /// Transfer native currency or tokens from the account
    #[command(name = "transfer")]
    Transfer(commands::TransferCommand),

    /// Claim the reward token from the faucet
    #[command(name = "claim")]
    Claim(commands::ClaimCommand),
}

pub fn run() -> eyre::Result<()> {
    let cli = Cli::parse();

    let rust_log = match std::env::var("RUST_LOG") {
        Ok(val) => format!("{val},gasless={}", cli.get_log_level()),
        Err(_) => format!("gasless={}", cli.get_log_level()),
    };
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::new(rust_log))
        .init();

    let rt = tokio::runtime::Builder::new_multi_thread().enable_all().build()?;

    let task = async move {
        match cli.command {
            Commands::CreateWallet(command) => command.execute(),
            Commands::Address(command) => command.execute(),
            Commands::Balance(command) => command.execute().await,
            Commands::Transfer(command) => command.execute().await,
            Commands::Claim(command) => command.execute().await,
        }
    };

    rt.block_on(run_until_ctrl_c(task))
}
