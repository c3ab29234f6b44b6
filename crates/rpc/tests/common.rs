#![allow(dead_code)]

use async_trait::async_trait;
use ethers::types::{Address, Bytes, U256, U64};
use gasless_primitives::{
    UserOperation, UserOperationGasEstimation, UserOperationHash, UserOperationReceipt,
    UserOperationSponsorship,
};
use gasless_rpc::{EthApiServer, PaymasterApiServer};
use jsonrpsee::{
    core::RpcResult,
    server::{ServerBuilder, ServerHandle},
    types::{ErrorObject, ErrorObjectOwned},
};
use std::{
    collections::VecDeque,
    net::SocketAddr,
    sync::{
        atomic::{AtomicU32, Ordering},
        Arc, Mutex,
    },
};

/// Scripted bundler and paymaster
#[derive(Default)]
pub struct MockState {
    /// Error codes returned by `eth_sendUserOperation` before it accepts
    pub send_errors: Mutex<VecDeque<i32>>,
    pub sponsor_error: Mutex<Option<i32>>,
    pub receipt: Mutex<Option<UserOperationReceipt>>,
    pub sent: Mutex<Vec<(UserOperation, Address)>>,
    pub send_calls: AtomicU32,
    pub estimate_calls: AtomicU32,
    pub sponsor_calls: AtomicU32,
    pub receipt_calls: AtomicU32,
}

impl MockState {
    pub fn send_calls(&self) -> u32 {
        self.send_calls.load(Ordering::SeqCst)
    }

    pub fn fail_sends_with(&self, codes: &[i32]) {
        self.send_errors.lock().unwrap().extend(codes.iter().copied());
    }
}

fn error(code: i32) -> ErrorObjectOwned {
    ErrorObject::owned(code, format!("mock error {code}"), None::<bool>)
}

#[derive(Clone)]
pub struct MockBundler {
    pub state: Arc<MockState>,
}

#[async_trait]
impl EthApiServer for MockBundler {
    async fn chain_id(&self) -> RpcResult<U64> {
        Ok(U64::from(1337))
    }

    async fn supported_entry_points(&self) -> RpcResult<Vec<String>> {
        Ok(vec!["0x5FF137D4b0FDCD49DcA30c7CF57E578a026d2789".into()])
    }

    async fn send_user_operation(
        &self,
        user_operation: UserOperation,
        entry_point: Address,
    ) -> RpcResult<UserOperationHash> {
        self.state.send_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(code) = self.state.send_errors.lock().unwrap().pop_front() {
            return Err(error(code));
        }
        let hash = user_operation.hash(&entry_point, 1337);
        self.state.sent.lock().unwrap().push((user_operation, entry_point));
        Ok(hash)
    }

    async fn estimate_user_operation_gas(
        &self,
        _user_operation: UserOperation,
        _entry_point: Address,
    ) -> RpcResult<UserOperationGasEstimation> {
        self.state.estimate_calls.fetch_add(1, Ordering::SeqCst);
        Ok(UserOperationGasEstimation {
            pre_verification_gas: 44_056.into(),
            verification_gas_limit: 60_624.into(),
            call_gas_limit: 33_100.into(),
        })
    }

    async fn get_user_operation_receipt(
        &self,
        _user_operation_hash: UserOperationHash,
    ) -> RpcResult<Option<UserOperationReceipt>> {
        self.state.receipt_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.state.receipt.lock().unwrap().clone())
    }
}

#[async_trait]
impl PaymasterApiServer for MockBundler {
    async fn sponsor_user_operation(
        &self,
        _user_operation: UserOperation,
        _entry_point: Address,
    ) -> RpcResult<UserOperationSponsorship> {
        self.state.sponsor_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(code) = *self.state.sponsor_error.lock().unwrap() {
            return Err(error(code));
        }
        Ok(UserOperationSponsorship {
            paymaster_and_data: Bytes::from(vec![0xaa; 20]),
            pre_verification_gas: Some(U256::from(50_000)),
            verification_gas_limit: None,
            call_gas_limit: None,
        })
    }
}

/// Starts the mock on a free local port
pub async fn start_mock_bundler(
    state: Arc<MockState>,
) -> eyre::Result<(String, SocketAddr, ServerHandle)> {
    let server = ServerBuilder::default().build("127.0.0.1:0").await?;
    let addr = server.local_addr()?;

    let bundler = MockBundler { state };
    let mut module = EthApiServer::into_rpc(bundler.clone());
    module.merge(PaymasterApiServer::into_rpc(bundler))?;

    let handle = server.start(module);
    Ok((format!("http://{addr}"), addr, handle))
}
