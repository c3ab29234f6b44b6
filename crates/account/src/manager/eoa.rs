use super::AccountManager;
use crate::{
    clients::Clients,
    guard::{InFlightGuard, InFlightPermit},
    relay::RelayRequestBuilder,
    signer::Signer,
    submission::submit_relay_request,
    tracker::{ConfirmationTracker, NetworkReceiptSource},
};
use async_trait::async_trait;
use ethers::types::{Address, U256};
use gasless_primitives::{
    AccountError, AccountResult, AccountVariant, CallIntent, ConfirmationResult,
    ConfirmationStatus, NetworkConfig, OperationHandle,
};
use gasless_rpc::{ChainClient, RelayClient};
use parking_lot::Mutex;
use std::{collections::HashMap, sync::Arc, time::Duration};
use tracing::{debug, warn};

/// Manager of an externally owned account using relayed meta-transactions
///
/// The forwarder nonce orders relay requests, so the account stays claimed until the relayed
/// transaction is confirmed (or confirmation gives up).
#[derive(Debug)]
pub struct EoaAccountManager {
    network: Arc<NetworkConfig>,
    signer: Arc<dyn Signer>,
    chain: Arc<dyn ChainClient>,
    relay: Arc<dyn RelayClient>,
    builder: RelayRequestBuilder,
    tracker: ConfirmationTracker,
    guard: InFlightGuard,
    nonce_floor: Mutex<Option<U256>>,
    pending: Mutex<HashMap<OperationHandle, InFlightPermit>>,
}

impl EoaAccountManager {
    pub fn new(
        network: Arc<NetworkConfig>,
        signer: Arc<dyn Signer>,
        clients: &Clients,
    ) -> AccountResult<Self> {
        let config = network.relay()?.clone();
        let relay = clients.relay.clone().ok_or_else(|| {
            AccountError::Configuration(format!("network {} has no relay client", network.name))
        })?;

        let builder = RelayRequestBuilder::new(
            clients.chain.clone(),
            config,
            network.chain_id,
            network.gas.clone(),
        );
        let tracker = ConfirmationTracker::new(
            Arc::new(NetworkReceiptSource::new(clients.chain.clone(), None)),
            network.confirmation.clone(),
        );

        Ok(Self {
            network,
            signer,
            chain: clients.chain.clone(),
            relay,
            builder,
            tracker,
            guard: clients.guard.clone(),
            nonce_floor: Mutex::new(None),
            pending: Mutex::new(HashMap::new()),
        })
    }

    /// Whether a relayed transaction of this account awaits confirmation
    pub fn has_pending(&self) -> bool {
        !self.pending.lock().is_empty()
    }

    fn settled(&self, result: ConfirmationResult) -> ConfirmationResult {
        if result.is_terminal() {
            if self.pending.lock().remove(&result.handle).is_some() {
                debug!("{:?} released after {} settled", self.address(), result.handle);
            }
            if result.status == ConfirmationStatus::TimedOut {
                warn!("{} timed out, falling back to the forwarder nonce", result.handle);
                *self.nonce_floor.lock() = None;
            }
        }
        result
    }
}

#[async_trait]
impl AccountManager for EoaAccountManager {
    fn variant(&self) -> AccountVariant {
        AccountVariant::Eoa
    }

    fn owner(&self) -> Address {
        self.signer.address()
    }

    fn address(&self) -> Address {
        self.signer.address()
    }

    fn network(&self) -> &NetworkConfig {
        &self.network
    }

    fn chain(&self) -> &Arc<dyn ChainClient> {
        &self.chain
    }

    async fn build_and_submit(&self, intent: CallIntent) -> AccountResult<OperationHandle> {
        intent.validate()?;
        let from = self.address();
        let permit = self.guard.try_acquire(from)?;

        let nonce_floor = *self.nonce_floor.lock();
        let unsigned = self.builder.build(from, &intent, nonce_floor).await?;
        let nonce = unsigned.request().request.nonce;

        let signature = self.signer.sign_hash(unsigned.hash()).await?;
        let signed = unsigned.into_signed(signature.to_vec().into());
        let request = self.builder.transaction_request(&signed).await?;

        let handle =
            submit_relay_request(self.relay.as_ref(), &self.network.submission, &request).await?;
        *self.nonce_floor.lock() = Some(nonce + 1);
        self.pending.lock().insert(handle, permit);
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
