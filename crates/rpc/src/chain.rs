//! Chain query boundary (execution node)

use crate::error::from_middleware_error;
use alloy_chains::{Chain, NamedChain};
use async_trait::async_trait;
use ethers::{
    providers::{Http, Middleware, Provider},
    types::{
        transaction::eip2718::TypedTransaction, Address, Bytes, TransactionReceipt,
        TransactionRequest, H256, U256,
    },
};
use gasless_primitives::{AccountError, AccountResult};
use std::{fmt::Debug, sync::Arc, time::Duration};
use tracing::trace;

/// Read operations the account managers need from an execution node
#[async_trait]
pub trait ChainClient: Send + Sync + Debug {
    async fn chain_id(&self) -> AccountResult<u64>;

    /// Native balance at the latest block
    async fn get_balance(&self, address: Address) -> AccountResult<U256>;

    /// Deployed code (empty for undeployed accounts)
    async fn get_code(&self, address: Address) -> AccountResult<Bytes>;

    async fn get_transaction_count(&self, address: Address) -> AccountResult<U256>;

    /// `eth_call` against the latest block
    async fn call(&self, to: Address, data: Bytes) -> AccountResult<Bytes>;

    /// `eth_estimateGas` of a call sent by `from`
    async fn estimate_gas(
        &self,
        from: Address,
        to: Address,
        value: U256,
        data: Bytes,
    ) -> AccountResult<U256>;

    /// Suggested EIP-1559 fees (max fee per gas, max priority fee per gas)
    async fn estimate_fees(&self) -> AccountResult<(U256, U256)>;

    async fn get_transaction_receipt(&self, hash: H256)
        -> AccountResult<Option<TransactionReceipt>>;
}

/// [ChainClient](ChainClient) backed by an ethers middleware
#[derive(Debug)]
pub struct EthClient<M> {
    provider: Arc<M>,
}

impl<M> Clone for EthClient<M> {
    fn clone(&self) -> Self {
        Self { provider: self.provider.clone() }
    }
}

impl<M: Middleware + 'static> EthClient<M> {
    pub fn new(provider: Arc<M>) -> Self {
        Self { provider }
    }

    pub fn provider(&self) -> &Arc<M> {
        &self.provider
    }
}

#[async_trait]
impl<M: Middleware + Debug + 'static> ChainClient for EthClient<M> {
    async fn chain_id(&self) -> AccountResult<u64> {
        let chain_id = self.provider.get_chainid().await.map_err(from_middleware_error::<M>)?;
        Ok(chain_id.as_u64())
    }

    async fn get_balance(&self, address: Address) -> AccountResult<U256> {
        self.provider.get_balance(address, None).await.map_err(from_middleware_error::<M>)
    }

    async fn get_code(&self, address: Address) -> AccountResult<Bytes> {
        self.provider.get_code(address, None).await.map_err(from_middleware_error::<M>)
    }

    async fn get_transaction_count(&self, address: Address) -> AccountResult<U256> {
        self.provider.get_transaction_count(address, None).await.map_err(from_middleware_error::<M>)
    }

    async fn call(&self, to: Address, data: Bytes) -> AccountResult<Bytes> {
        let tx: TypedTransaction = TransactionRequest::new().to(to).data(data).into();
        self.provider.call(&tx, None).await.map_err(from_middleware_error::<M>)
    }

    async fn estimate_gas(
        &self,
        from: Address,
        to: Address,
        value: U256,
        data: Bytes,
    ) -> AccountResult<U256> {
        let tx: TypedTransaction =
            TransactionRequest::new().from(from).to(to).value(value).data(data).into();
        let gas = self.provider.estimate_gas(&tx, None).await.map_err(from_middleware_error::<M>)?;
        trace!("Estimated {gas} gas for call from {from:?} to {to:?}");
        Ok(gas)
    }

    async fn estimate_fees(&self) -> AccountResult<(U256, U256)> {
        self.provider.estimate_eip1559_fees(None).await.map_err(from_middleware_error::<M>)
    }

    async fn get_transaction_receipt(
        &self,
        hash: H256,
    ) -> AccountResult<Option<TransactionReceipt>> {
        self.provider.get_transaction_receipt(hash).await.map_err(from_middleware_error::<M>)
    }
}

/// Creates ethers provider with HTTP connection
///
/// Local development chains are polled much more often than public ones.
pub fn create_http_provider(url: &str, chain_id: u64) -> AccountResult<Provider<Http>> {
    let provider = Provider::<Http>::try_from(url)
        .map_err(|err| AccountError::Configuration(format!("invalid rpc url {url}: {err}")))?;

    Ok(provider.interval(if Chain::from_id(chain_id).named() == Some(NamedChain::Dev) {
        Duration::from_millis(5u64)
    } else {
        Duration::from_millis(500u64)
    }))
}

/// Connects to the execution node of a network
pub fn connect_http(url: &str, chain_id: u64) -> AccountResult<EthClient<Provider<Http>>> {
    Ok(EthClient::new(Arc::new(create_http_provider(url, chain_id)?)))
}
