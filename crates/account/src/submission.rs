//! Submission client: hands signed operations to the bundler or the relay server

use gasless_contracts::SELECTORS_NAMES;
use gasless_primitives::{
    relay::{relayed_transaction_hash, RelayTransactionRequest},
    AccountResult, OperationHandle, RetryPolicy, SignedUserOperation,
};
use gasless_rpc::{with_backoff, BundlerClient, RelayClient};
use tracing::{info, warn};

fn describe_call(call_data: &[u8]) -> String {
    call_data
        .get(..4)
        .and_then(|selector| {
            let mut bytes = [0u8; 4];
            bytes.copy_from_slice(selector);
            SELECTORS_NAMES.get(&bytes).cloned()
        })
        .unwrap_or_else(|| "unknown call".to_string())
}

/// Sends a signed user operation, retrying transport failures
///
/// # Arguments
/// * `bundler` - Bundler accepting the user operation
/// * `policy` - Retry policy of the network
/// * `user_operation` - Signed user operation
///
/// # Returns
/// * `AccountResult<OperationHandle>` - Handle of the accepted user operation; rejections are
///   returned after the first attempt
pub async fn submit_user_operation(
    bundler: &dyn BundlerClient,
    policy: &RetryPolicy,
    user_operation: &SignedUserOperation,
) -> AccountResult<OperationHandle> {
    let hash = with_backoff(policy, "eth_sendUserOperation", || {
        bundler.send_user_operation(user_operation)
    })
    .await?;

    if hash != user_operation.hash() {
        warn!("Bundler returned hash {hash}, expected {}", user_operation.hash());
    }
    info!(
        "User operation {hash} ({}) of {:?} with nonce {} accepted by the bundler",
        describe_call(&user_operation.call_data),
        user_operation.sender,
        user_operation.nonce
    );
    Ok(OperationHandle::UserOperation(hash))
}

/// Hands a signed relay request to the relay server, retrying transport failures
///
/// # Returns
/// * `AccountResult<OperationHandle>` - Handle of the transaction broadcast by the relay worker
pub async fn submit_relay_request(
    relay: &dyn RelayClient,
    policy: &RetryPolicy,
    request: &RelayTransactionRequest,
) -> AccountResult<OperationHandle> {
    let signed_tx =
        with_backoff(policy, "relay", || relay.relay_transaction(request)).await?;
    let hash = relayed_transaction_hash(&signed_tx);

    info!(
        "Relay request ({}) of {:?} with forwarder nonce {} broadcast in transaction {hash:?}",
        describe_call(&request.relay_request.request.data),
        request.relay_request.request.from,
        request.relay_request.request.nonce
    );
    Ok(OperationHandle::Transaction(hash))
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use ethers::{
        abi::AbiEncode,
        types::{Address, Bytes, H256},
        utils::keccak256,
    };
    use gasless_contracts::token;
    use gasless_primitives::{
        relay::{RelayMetadata, RelayRequest},
        AccountError, UnsignedUserOperation, UserOperation, UserOperationGasEstimation,
        UserOperationHash, UserOperationReceipt,
    };
    use std::sync::{
        atomic::{AtomicU32, Ordering},
        Mutex,
    };

    #[derive(Debug, Default)]
    struct FlakyBundler {
        failures: Mutex<Vec<AccountError>>,
        calls: AtomicU32,
    }

    #[async_trait]
    impl BundlerClient for FlakyBundler {
        async fn send_user_operation(
            &self,
            user_operation: &SignedUserOperation,
        ) -> AccountResult<UserOperationHash> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match self.failures.lock().unwrap().pop() {
                Some(err) => Err(err),
                None => Ok(user_operation.hash()),
            }
        }

        async fn estimate_user_operation_gas(
            &self,
            _user_operation: &UserOperation,
            _entry_point: Address,
        ) -> AccountResult<UserOperationGasEstimation> {
            unimplemented!()
        }

        async fn get_user_operation_receipt(
            &self,
            _user_operation_hash: UserOperationHash,
        ) -> AccountResult<Option<UserOperationReceipt>> {
            unimplemented!()
        }

        async fn supported_entry_points(&self) -> AccountResult<Vec<Address>> {
            unimplemented!()
        }
    }

    #[derive(Debug)]
    struct StaticRelay(Bytes);

    #[async_trait]
    impl RelayClient for StaticRelay {
        async fn relay_transaction(
            &self,
            _request: &RelayTransactionRequest,
        ) -> AccountResult<Bytes> {
            Ok(self.0.clone())
        }
    }

    fn policy(max_attempts: u32) -> RetryPolicy {
        RetryPolicy { max_attempts, initial_backoff_ms: 1, max_backoff_ms: 2, multiplier: 2 }
    }

    fn signed() -> SignedUserOperation {
        let call_data = token::TransferCall { to: Address::random(), amount: 1.into() }.encode();
        UnsignedUserOperation::new(
            UserOperation::default().sender(Address::random()).call_data(call_data.into()),
            Address::random(),
            1337,
        )
        .into_signed(vec![1u8; 65].into())
    }

    #[test]
    fn call_names() {
        let call_data = token::TransferCall { to: Address::random(), amount: 1.into() }.encode();
        assert_eq!(describe_call(&call_data), "transfer");
        assert_eq!(describe_call(&[0x01]), "unknown call");
    }

    #[tokio::test]
    async fn user_operation_handle() {
        let bundler = FlakyBundler::default();
        bundler
            .failures
            .lock()
            .unwrap()
            .push(AccountError::NetworkUnavailable("connection reset".into()));
        let uo = signed();

        let handle = submit_user_operation(&bundler, &policy(3), &uo).await.unwrap();
        assert_eq!(handle, OperationHandle::UserOperation(uo.hash()));
        assert_eq!(bundler.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn transport_failures_up_to_the_ceiling() {
        let bundler = FlakyBundler::default();
        bundler.failures.lock().unwrap().extend(
            (0..10).map(|_| AccountError::NetworkUnavailable("timeout".into())),
        );

        let res = submit_user_operation(&bundler, &policy(5), &signed()).await;
        assert!(matches!(res, Err(AccountError::NetworkUnavailable(_))));
        assert_eq!(bundler.calls.load(Ordering::SeqCst), 5);
    }

    #[tokio::test]
    async fn stale_nonce_is_not_retried() {
        let bundler = FlakyBundler::default();
        bundler.failures.lock().unwrap().push(AccountError::ValidationRejected {
            code: -32500,
            message: "AA25 invalid account nonce".into(),
        });

        let res = submit_user_operation(&bundler, &policy(5), &signed()).await;
        assert!(matches!(res, Err(AccountError::ValidationRejected { code: -32500, .. })));
        assert_eq!(bundler.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn relay_handle_is_transaction_hash() {
        let signed_tx = Bytes::from(vec![0x02, 0xf8, 0x6c, 0x01]);
        let relay = StaticRelay(signed_tx.clone());
        let request = RelayTransactionRequest {
            relay_request: RelayRequest::default(),
            metadata: RelayMetadata {
                max_acceptance_budget: 1.into(),
                relay_hub_address: Address::random(),
                signature: Bytes::default(),
                approval_data: Bytes::default(),
                relay_max_nonce: 3,
                relay_last_known_nonce: 0,
                domain_separator_name: "GSN Relayed Transaction".into(),
            },
        };

        let handle = submit_relay_request(&relay, &policy(1), &request).await.unwrap();
        assert_eq!(handle, OperationHandle::Transaction(H256::from(keccak256(&signed_tx))));
    }
}
