//! Confirmation tracker
//!
//! Polls for the receipt of an operation handle until it is included, reverted or the wall-clock
//! budget runs out. Terminal results are remembered: once a handle reached `Success`, `Failed` or
//! `TimedOut` it is never polled again while its result is retained. Only the most recent settled
//! results are retained, the oldest are evicted first.

use async_trait::async_trait;
use gasless_primitives::{
    constants::confirmation::SETTLED_CAPACITY, AccountResult, ConfirmationPolicy,
    ConfirmationResult, OperationHandle, Receipt,
};
use gasless_rpc::{BundlerClient, ChainClient};
use parking_lot::Mutex;
use std::{
    collections::{HashMap, VecDeque},
    fmt::Debug,
    sync::Arc,
    time::Duration,
};
use tokio::time::Instant;
use tracing::{debug, trace, warn};

/// Where receipts of operation handles come from
#[async_trait]
pub trait ReceiptSource: Send + Sync + Debug {
    /// Receipt of the handle, or None while it is pending
    async fn receipt(&self, handle: &OperationHandle) -> AccountResult<Option<Receipt>>;
}

/// Receipts of user operations from the bundler, of transactions from the execution node
#[derive(Clone, Debug)]
pub struct NetworkReceiptSource {
    chain: Arc<dyn ChainClient>,
    bundler: Option<Arc<dyn BundlerClient>>,
}

impl NetworkReceiptSource {
    pub fn new(chain: Arc<dyn ChainClient>, bundler: Option<Arc<dyn BundlerClient>>) -> Self {
        Self { chain, bundler }
    }
}

#[async_trait]
impl ReceiptSource for NetworkReceiptSource {
    async fn receipt(&self, handle: &OperationHandle) -> AccountResult<Option<Receipt>> {
        match handle {
            OperationHandle::UserOperation(hash) => {
                let Some(bundler) = &self.bundler else {
                    return Ok(None);
                };
                let receipt = bundler.get_user_operation_receipt(*hash).await?;
                Ok(receipt.and_then(|receipt| {
                    if receipt.user_operation_hash == *hash {
                        Some(Receipt::UserOperation(Box::new(receipt)))
                    } else {
                        warn!(
                            "Bundler returned receipt of {} for {hash}",
                            receipt.user_operation_hash
                        );
                        None
                    }
                }))
            }
            OperationHandle::Transaction(hash) => Ok(self
                .chain
                .get_transaction_receipt(*hash)
                .await?
                .map(|receipt| Receipt::Transaction(Box::new(receipt)))),
        }
    }
}

/// Terminal results in settlement order
#[derive(Debug)]
struct SettledResults {
    results: HashMap<OperationHandle, ConfirmationResult>,
    order: VecDeque<OperationHandle>,
    capacity: usize,
}

impl SettledResults {
    fn new(capacity: usize) -> Self {
        Self { results: HashMap::new(), order: VecDeque::new(), capacity: capacity.max(1) }
    }

    fn insert(&mut self, result: ConfirmationResult) {
        if self.results.insert(result.handle, result.clone()).is_some() {
            return;
        }
        self.order.push_back(result.handle);
        while self.order.len() > self.capacity {
            if let Some(evicted) = self.order.pop_front() {
                trace!("Evicting settled result of {evicted}");
                self.results.remove(&evicted);
            }
        }
    }
}

/// Per-handle confirmation state machine
#[derive(Debug)]
pub struct ConfirmationTracker {
    source: Arc<dyn ReceiptSource>,
    policy: ConfirmationPolicy,
    settled: Mutex<SettledResults>,
}

impl ConfirmationTracker {
    pub fn new(source: Arc<dyn ReceiptSource>, policy: ConfirmationPolicy) -> Self {
        Self { source, policy, settled: Mutex::new(SettledResults::new(SETTLED_CAPACITY)) }
    }

    /// Retains at most `capacity` settled results
    pub fn with_settled_capacity(self, capacity: usize) -> Self {
        Self { settled: Mutex::new(SettledResults::new(capacity)), ..self }
    }

    pub fn policy(&self) -> &ConfirmationPolicy {
        &self.policy
    }

    /// Number of settled results currently retained
    pub fn settled_len(&self) -> usize {
        self.settled.lock().results.len()
    }

    fn cached(&self, handle: &OperationHandle) -> Option<ConfirmationResult> {
        self.settled.lock().results.get(handle).cloned()
    }

    fn settle(&self, result: ConfirmationResult) -> ConfirmationResult {
        debug!("{} settled as {:?}", result.handle, result.status);
        self.settled.lock().insert(result.clone());
        result
    }

    /// One polling step
    ///
    /// Poll failures are transient: the handle stays pending.
    pub async fn poll(&self, handle: OperationHandle) -> ConfirmationResult {
        if let Some(result) = self.cached(&handle) {
            return result;
        }

        match self.source.receipt(&handle).await {
            Ok(Some(receipt)) => self.settle(ConfirmationResult::from_receipt(handle, receipt)),
            Ok(None) => {
                trace!("{handle} is pending");
                ConfirmationResult::pending(handle)
            }
            Err(err) => {
                warn!("Polling {handle} failed: {err}");
                ConfirmationResult::pending(handle)
            }
        }
    }

    /// Polls until the handle is terminal or `budget` is exhausted
    ///
    /// # Arguments
    /// * `handle` - Handle returned by the submission
    /// * `budget` - Wall-clock budget; the handle times out once it is spent
    ///
    /// # Returns
    /// * `ConfirmationResult` - Always terminal
    pub async fn wait(&self, handle: OperationHandle, budget: Duration) -> ConfirmationResult {
        let deadline = Instant::now() + budget;

        loop {
            let result = self.poll(handle).await;
            if result.is_terminal() {
                return result;
            }

            let now = Instant::now();
            if now >= deadline {
                return self.settle(ConfirmationResult::timed_out(handle));
            }
            tokio::time::sleep(self.policy.poll_interval().min(deadline - now)).await;
        }
    }

    /// Polls with the configured budget
    pub async fn wait_default(&self, handle: OperationHandle) -> ConfirmationResult {
        self.wait(handle, self.policy.timeout()).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ethers::types::{TransactionReceipt, H256};
    use gasless_primitives::{AccountError, ConfirmationStatus};
    use std::sync::atomic::{AtomicU32, Ordering};

    /// Pending for `pending_polls` polls, then answers with a receipt of `status`
    #[derive(Debug)]
    struct ScriptedSource {
        calls: AtomicU32,
        pending_polls: u32,
        status: Option<u64>,
        fail_first: bool,
    }

    impl ScriptedSource {
        fn new(pending_polls: u32, status: Option<u64>) -> Self {
            Self { calls: AtomicU32::new(0), pending_polls, status, fail_first: false }
        }

        fn calls(&self) -> u32 {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl ReceiptSource for ScriptedSource {
        async fn receipt(&self, handle: &OperationHandle) -> AccountResult<Option<Receipt>> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail_first && call == 0 {
                return Err(AccountError::NetworkUnavailable("connection reset".into()));
            }
            if call < self.pending_polls {
                return Ok(None);
            }
            Ok(self.status.map(|status| {
                Receipt::Transaction(Box::new(TransactionReceipt {
                    transaction_hash: handle.hash(),
                    status: Some(status.into()),
                    ..Default::default()
                }))
            }))
        }
    }

    fn tracker(source: Arc<ScriptedSource>) -> ConfirmationTracker {
        ConfirmationTracker::new(
            source,
            ConfirmationPolicy { poll_interval_ms: 5, timeout_ms: 1_000 },
        )
    }

    fn handle() -> OperationHandle {
        OperationHandle::Transaction(H256::random())
    }

    #[tokio::test]
    async fn success_is_terminal_and_cached() {
        let source = Arc::new(ScriptedSource::new(2, Some(1)));
        let tracker = tracker(source.clone());
        let handle = handle();

        let result = tracker.wait(handle, Duration::from_secs(1)).await;
        assert_eq!(result.status, ConfirmationStatus::Success);
        assert_eq!(source.calls(), 3);

        // no further network calls once terminal
        assert_eq!(tracker.poll(handle).await, result);
        assert_eq!(tracker.wait(handle, Duration::from_secs(1)).await, result);
        assert_eq!(source.calls(), 3);
    }

    #[tokio::test]
    async fn reverted_receipt_fails() {
        let source = Arc::new(ScriptedSource::new(0, Some(0)));
        let result = tracker(source).wait(handle(), Duration::from_secs(1)).await;
        assert_eq!(result.status, ConfirmationStatus::Failed);
        assert!(matches!(result.into_result(), Err(AccountError::ExecutionReverted { .. })));
    }

    #[tokio::test]
    async fn budget_exhaustion_times_out() {
        let source = Arc::new(ScriptedSource::new(u32::MAX, None));
        let tracker = tracker(source.clone());
        let handle = handle();

        let result = tracker.wait(handle, Duration::from_millis(30)).await;
        assert_eq!(result.status, ConfirmationStatus::TimedOut);
        assert!(result.receipt.is_none());

        let calls = source.calls();
        assert_eq!(tracker.poll(handle).await.status, ConfirmationStatus::TimedOut);
        assert_eq!(source.calls(), calls);
        assert_eq!(
            result.into_result().unwrap_err(),
            AccountError::Timeout { handle: handle.hash() }
        );
    }

    #[tokio::test]
    async fn settled_results_are_bounded() {
        let source = Arc::new(ScriptedSource::new(0, Some(1)));
        let tracker = tracker(source.clone()).with_settled_capacity(2);
        let handles = [handle(), handle(), handle()];

        for handle in handles {
            tracker.wait(handle, Duration::from_secs(1)).await;
        }
        assert_eq!(tracker.settled_len(), 2);
        assert_eq!(source.calls(), 3);

        // the two most recent stay cached, the oldest is polled again
        tracker.poll(handles[2]).await;
        tracker.poll(handles[1]).await;
        assert_eq!(source.calls(), 3);
        assert_eq!(tracker.poll(handles[0]).await.status, ConfirmationStatus::Success);
        assert_eq!(source.calls(), 4);
        assert_eq!(tracker.settled_len(), 2);
    }

    #[tokio::test]
    async fn poll_failures_are_transient() {
        let source = Arc::new(ScriptedSource {
            calls: AtomicU32::new(0),
            pending_polls: 0,
            status: Some(1),
            fail_first: true,
        });
        let tracker = tracker(source.clone());
        let handle = handle();

        assert_eq!(tracker.poll(handle).await.status, ConfirmationStatus::Pending);
        assert_eq!(tracker.poll(handle).await.status, ConfirmationStatus::Success);
    }
}
