use super::AccountManager;
use crate::{
    builder::{SponsorshipPolicy, UserOperationBuilder},
    clients::Clients,
    guard::InFlightGuard,
    signer::Signer,
    smart::{smart_account, SmartAccount},
    submission::submit_user_operation,
    tracker::{ConfirmationTracker, NetworkReceiptSource},
};
use async_trait::async_trait;
use ethers::types::{Address, U256};
use gasless_primitives::{
    AccountError, AccountResult, AccountVariant, CallIntent, ConfirmationResult,
    ConfirmationStatus, NetworkConfig, OperationHandle,
};
use gasless_rpc::{BundlerClient, ChainClient};
use parking_lot::Mutex;
use std::{sync::Arc, time::Duration};
use tracing::{debug, warn};

/// Manager of a LightAccount, Kernel or Safe account
#[derive(Debug)]
pub struct SmartAccountManager {
    network: Arc<NetworkConfig>,
    account: Box<dyn SmartAccount>,
    signer: Arc<dyn Signer>,
    chain: Arc<dyn ChainClient>,
    bundler: Arc<dyn BundlerClient>,
    builder: UserOperationBuilder,
    tracker: ConfirmationTracker,
    guard: InFlightGuard,
    /// Entry point nonce following the last accepted user operation
    nonce_floor: Mutex<Option<U256>>,
}

impl SmartAccountManager {
    pub fn new(
        variant: AccountVariant,
        network: Arc<NetworkConfig>,
        signer: Arc<dyn Signer>,
        clients: &Clients,
    ) -> AccountResult<Self> {
        let aa = network.aa()?;
        let account = smart_account(variant, aa, signer.address())?;
        let bundler = clients.bundler.clone().ok_or_else(|| {
            AccountError::Configuration(format!("network {} has no bundler client", network.name))
        })?;

        let builder = UserOperationBuilder::new(
            clients.chain.clone(),
            bundler.clone(),
            clients.paymaster.clone(),
            aa,
            network.chain_id,
            network.gas.clone(),
        );
        let tracker = ConfirmationTracker::new(
            Arc::new(NetworkReceiptSource::new(clients.chain.clone(), Some(bundler.clone()))),
            network.confirmation.clone(),
        );

        debug!("{variant} account of {:?} at {:?}", account.owner(), account.address());
        Ok(Self {
            network,
            account,
            signer,
            chain: clients.chain.clone(),
            bundler,
            builder,
            tracker,
            guard: clients.guard.clone(),
            nonce_floor: Mutex::new(None),
        })
    }

    pub fn with_sponsorship(mut self, sponsorship: SponsorshipPolicy) -> Self {
        self.builder = self.builder.with_sponsorship(sponsorship);
        self
    }

    pub fn account(&self) -> &dyn SmartAccount {
        self.account.as_ref()
    }

    fn settled(&self, result: ConfirmationResult) -> ConfirmationResult {
        if result.status == ConfirmationStatus::TimedOut {
            // a dropped operation must not block the nonce it was using
            warn!("{} timed out, falling back to the entry point nonce", result.handle);
            *self.nonce_floor.lock() = None;
        }
        result
    }
}

#[async_trait]
impl AccountManager for SmartAccountManager {
    fn variant(&self) -> AccountVariant {
        self.account.variant()
    }

    fn owner(&self) -> Address {
        self.account.owner()
    }

    fn address(&self) -> Address {
        self.account.address()
    }

    fn network(&self) -> &NetworkConfig {
        &self.network
    }

    fn chain(&self) -> &Arc<dyn ChainClient> {
        &self.chain
    }

    async fn build_and_submit(&self, intent: CallIntent) -> AccountResult<OperationHandle> {
        intent.validate()?;
        let _permit = self.guard.try_acquire(self.address())?;

        let nonce_floor = *self.nonce_floor.lock();
        let unsigned = self.builder.build(self.account.as_ref(), &intent, nonce_floor).await?;
        let nonce = unsigned.user_operation().nonce;

        let signature = self.account.sign_user_operation(&unsigned, self.signer.as_ref()).await?;
        let signed = unsigned.into_signed(signature);

        let handle = submit_user_operation(self.bundler.as_ref(), &self.network.submission, &signed)
            .await?;
        *self.nonce_floor.lock() = Some(nonce + 1);
        Ok(handle)
    }

    async fn confirm(&self, handle: OperationHandle) -> ConfirmationResult {
        self.settled(self.tracker.wait_default(handle).await)
    }

    async fn confirm_within(
        &self,
        handle: OperationHandle,
        timeout: Duration,
    ) -> ConfirmationResult {
        self.settled(self.tracker.wait(handle, timeout).await)
    }
}
