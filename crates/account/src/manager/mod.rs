//! Account managers
//!
//! One [AccountManager](AccountManager) per (variant, owner, network). Every variant exposes the
//! same capabilities; the smart account variants go through the entry point and a bundler, the EOA
//! variant through the forwarder and a relay server.

mod eoa;
mod smart;

pub use eoa::EoaAccountManager;
pub use smart::SmartAccountManager;

use crate::{clients::Clients, signer::Signer};
use async_trait::async_trait;
use ethers::{
    abi::{AbiDecode, AbiEncode},
    types::{Address, U256},
};
use gasless_contracts::{token, token_faucet};
use gasless_primitives::{
    constants::tokens::{DISPLAY_PRECISION, NATIVE_DECIMALS},
    format_amount, parse_amount, AccountError, AccountResult, AccountVariant, Call, CallIntent,
    ConfirmationResult, NetworkConfig, OperationHandle,
};
use gasless_rpc::ChainClient;
use std::{fmt::Debug, sync::Arc, time::Duration};
use tracing::info;

fn invalid_response(call: &str, err: impl std::fmt::Display) -> AccountError {
    AccountError::NetworkUnavailable(format!("invalid {call} response: {err}"))
}

/// Operations of one account on one network
#[async_trait]
pub trait AccountManager: Send + Sync + Debug {
    fn variant(&self) -> AccountVariant;

    /// Address of the key controlling the account
    fn owner(&self) -> Address;

    /// Address holding the funds (the owner itself for EOA accounts)
    fn address(&self) -> Address;

    fn network(&self) -> &NetworkConfig;

    fn chain(&self) -> &Arc<dyn ChainClient>;

    /// Builds, signs and submits an operation executing `intent`
    ///
    /// # Returns
    /// * `AccountResult<OperationHandle>` - Handle of the accepted (not yet included) operation
    async fn build_and_submit(&self, intent: CallIntent) -> AccountResult<OperationHandle>;

    /// Waits for a terminal result with the confirmation budget of the network
    async fn confirm(&self, handle: OperationHandle) -> ConfirmationResult;

    /// Waits for a terminal result, giving up (`TimedOut`) once `timeout` elapsed
    async fn confirm_within(&self, handle: OperationHandle, timeout: Duration)
        -> ConfirmationResult;

    /// Balance of the account in base units (native currency when `token` is none)
    async fn get_balance(&self, token: Option<Address>) -> AccountResult<U256> {
        match token {
            None => self.chain().get_balance(self.address()).await,
            Some(token) => {
                let call = token::BalanceOfCall { account: self.address() };
                let res = self.chain().call(token, call.encode().into()).await?;
                Ok(token::BalanceOfReturn::decode(res)
                    .map_err(|err| invalid_response("balanceOf", err))?
                    .balance)
            }
        }
    }

    /// Decimals of a token (18 for the native currency)
    async fn decimals(&self, token: Option<Address>) -> AccountResult<u32> {
        match token {
            None => Ok(NATIVE_DECIMALS),
            Some(token) => {
                let res = self.chain().call(token, token::DecimalsCall.encode().into()).await?;
                Ok(token::DecimalsReturn::decode(res)
                    .map_err(|err| invalid_response("decimals", err))?
                    .decimals as u32)
            }
        }
    }

    /// Balance rounded down to two decimals
    async fn get_display_balance(&self, token: Option<Address>) -> AccountResult<String> {
        let balance = self.get_balance(token).await?;
        format_amount(balance, self.decimals(token).await?, DISPLAY_PRECISION)
    }

    /// Balance with every decimal of the token
    async fn get_exact_balance(&self, token: Option<Address>) -> AccountResult<String> {
        let balance = self.get_balance(token).await?;
        let decimals = self.decimals(token).await?;
        format_amount(balance, decimals, decimals as usize)
    }

    /// Transfers a decimal amount ("1.5") of the native currency or of a token
    async fn transfer(
        &self,
        to: Address,
        amount: &str,
        token: Option<Address>,
    ) -> AccountResult<OperationHandle> {
        let amount = parse_amount(amount, self.decimals(token).await?)?;
        self.transfer_exact(to, amount, token).await
    }

    /// Transfers an amount in base units of the native currency or of a token
    async fn transfer_exact(
        &self,
        to: Address,
        amount: U256,
        token: Option<Address>,
    ) -> AccountResult<OperationHandle> {
        let balance = self.get_balance(token).await?;
        if balance < amount {
            return Err(AccountError::InvalidIntent(format!(
                "insufficient balance: {balance} < {amount}"
            )));
        }

        let call = match token {
            None => Call::transfer(to, amount),
            Some(token) => Call::contract(token, token::TransferCall { to, amount }.encode()),
        };
        info!("Transferring {amount} ({token:?}) from {:?} to {to:?}", self.address());
        self.build_and_submit(call.into()).await
    }

    /// Claims the reward tokens of the network faucet
    async fn claim_reward(&self) -> AccountResult<OperationHandle> {
        let faucet = self.network().tokens.faucet().ok_or_else(|| {
            AccountError::Configuration(format!("network {} has no faucet", self.network().name))
        })?;
        info!("Claiming reward of {:?} from {faucet:?}", self.address());
        self.build_and_submit(Call::contract(faucet, token_faucet::ClaimCall.encode()).into())
            .await
    }
}

/// Builds the manager of `variant` for the owner behind `signer`
///
/// # Arguments
/// * `variant` - Account variant
/// * `network` - Validated network configuration
/// * `signer` - Signer of the owner
/// * `clients` - Network collaborators (see [Clients::connect](Clients::connect))
///
/// # Returns
/// * `AccountResult<Box<dyn AccountManager>>` - The manager, or a `Configuration` error when the
///   network lacks the deployment or client the variant needs
pub fn create_account_manager(
    variant: AccountVariant,
    network: Arc<NetworkConfig>,
    signer: Arc<dyn Signer>,
    clients: &Clients,
) -> AccountResult<Box<dyn AccountManager>> {
    Ok(match variant {
        AccountVariant::Eoa => Box::new(EoaAccountManager::new(network, signer, clients)?),
        variant => Box::new(SmartAccountManager::new(variant, network, signer, clients)?),
    })
}
