use super::args::{AccountArgs, SubmitArgs};
use crate::utils::{parse_address, parse_u256, unwrap_path_or_home, write_mnemonic};
use clap::Parser;
use ethers::types::Address;
use expanded_pathbuf::ExpandedPathBuf;
use gasless_account::{
    create_account_manager, get_address, AccountManager, BackupConsent, Clients, KeyStore,
    MnemonicKeyStore,
};
use gasless_primitives::{ConfirmationStatus, OperationHandle};
use tracing::info;

/// Create a new owner key and write its mnemonic file
#[derive(Debug, Parser)]
pub struct CreateWalletCommand {
    /// Path of the mnemonic file to write.
    ///
    /// By default, `~/.gasless/mnemonic` is used.
    #[clap(long)]
    pub output_path: Option<ExpandedPathBuf>,

    /// Overwrite an existing mnemonic file.
    #[clap(long)]
    pub force: bool,
}

impl CreateWalletCommand {
    /// Execute the command
    pub fn execute(self) -> eyre::Result<()> {
        let path = unwrap_path_or_home(self.output_path)?;
        let store = MnemonicKeyStore::new();
        let owner = store.create_account("owner")?;
        let phrase = store.export_secret("owner", BackupConsent::UserInitiated)?;
        write_mnemonic(&path.to_path_buf(), &phrase, self.force)?;
        info!("Owner {owner:?} written to {}", path.display());
        Ok(())
    }
}

/// Print the account address of the owner key
#[derive(Debug, Parser)]
pub struct AddressCommand {
    #[clap(flatten)]
    account: AccountArgs,
}

impl AddressCommand {
    /// Execute the command
    pub fn execute(self) -> eyre::Result<()> {
        let network = self.account.network.load()?;
        let owner = self.account.signer()?.address();
        let address = get_address(self.account.variant, owner, &network)?;
        info!("Owner {owner:?}");
        println!("{address:?}");
        Ok(())
    }
}

/// Print the native or token balance of the account
#[derive(Debug, Parser)]
pub struct BalanceCommand {
    #[clap(flatten)]
    account: AccountArgs,

    /// Token address; the native currency when omitted.
    #[clap(long, value_parser=parse_address)]
    token: Option<Address>,

    /// Print the balance in base units with all decimals.
    #[clap(long)]
    exact: bool,
}

impl BalanceCommand {
    /// Execute the command
    pub async fn execute(self) -> eyre::Result<()> {
        let manager = connect(&self.account).await?;
        let balance = if self.exact {
            manager.get_exact_balance(self.token).await?
        } else {
            manager.get_display_balance(self.token).await?
        };
        println!("{balance}");
        Ok(())
    }
}

/// Transfer native currency or tokens from the account
#[derive(Debug, Parser)]
pub struct TransferCommand {
    #[clap(flatten)]
    account: AccountArgs,

    #[clap(flatten)]
    submit: SubmitArgs,

    /// Recipient address.
    #[clap(long, value_parser=parse_address)]
    to: Address,

    /// Amount in whole units (e.g. `1.5`), or in base units with `--exact`.
    #[clap(long)]
    amount: String,

    /// Token address; the native currency when omitted.
    #[clap(long, value_parser=parse_address)]
    token: Option<Address>,

    /// Interpret the amount in base units.
    #[clap(long)]
    exact: bool,
}

impl TransferCommand {
    /// Execute the command
    pub async fn execute(self) -> eyre::Result<()> {
        let manager = connect(&self.account).await?;
        let handle = if self.exact {
            let amount = parse_u256(&self.amount).map_err(|err| eyre::eyre!(err))?;
            manager.transfer_exact(self.to, amount, self.token).await?
        } else {
            manager.transfer(self.to, &self.amount, self.token).await?
        };
        settle(manager.as_ref(), handle, &self.submit).await
    }
}

/// Claim the reward token from the faucet
#[derive(Debug, Parser)]
pub struct ClaimCommand {
    #[clap(flatten)]
    account: AccountArgs,

    #[clap(flatten)]
    submit: SubmitArgs,
}

impl ClaimCommand {
    /// Execute the command
    pub async fn execute(self) -> eyre::Result<()> {
        let manager = connect(&self.account).await?;
        let handle = manager.claim_reward().await?;
        settle(manager.as_ref(), handle, &self.submit).await
    }
}

async fn connect(args: &AccountArgs) -> eyre::Result<Box<dyn AccountManager>> {
    let network = args.network.load()?;
    let clients = Clients::connect(&network)?;
    let manager = create_account_manager(args.variant, network, args.signer()?, &clients)?;
    info!("Using {} account {:?}", manager.variant(), manager.address());
    Ok(manager)
}

async fn settle(
    manager: &dyn AccountManager,
    handle: OperationHandle,
    args: &SubmitArgs,
) -> eyre::Result<()> {
    info!("Submitted {handle}");
    if args.no_wait {
        println!("{:?}", handle.hash());
        return Ok(());
    }

    let result = manager.confirm(handle).await.into_result()?;
    if let (ConfirmationStatus::Success, Some(receipt)) = (result.status, result.receipt) {
        info!("{handle} included in transaction {:?}", receipt.transaction_hash());
        println!("{:?}", receipt.transaction_hash());
    }
    Ok(())
}
