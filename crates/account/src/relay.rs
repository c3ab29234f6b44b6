//! Operation builder (relay requests)

use ethers::{
    abi::{encode, AbiDecode, AbiEncode, Token},
    types::{Address, U256},
};
use gasless_contracts::forwarder;
use gasless_primitives::{
    calldata_gas,
    network::RelayConfig,
    relay::{
        ForwardRequest, RelayData, RelayDomain, RelayMetadata, RelayRequest,
        RelayTransactionRequest, SignedRelayRequest, UnsignedRelayRequest,
    },
    AccountError, AccountResult, CallIntent, GasPolicy,
};
use gasless_rpc::ChainClient;
use std::{
    sync::Arc,
    time::{SystemTime, UNIX_EPOCH},
};
use tracing::{debug, trace};

/// ABI encoding of the relay request as it appears in the relay hub call
fn encode_relay_request(request: &RelayRequest) -> Vec<u8> {
    let forward = &request.request;
    let data = &request.relay_data;
    encode(&[Token::Tuple(vec![
        Token::Tuple(vec![
            Token::Address(forward.from),
            Token::Address(forward.to),
            Token::Uint(forward.value),
            Token::Uint(forward.gas),
            Token::Uint(forward.nonce),
            Token::Bytes(forward.data.to_vec()),
            Token::Uint(forward.valid_until_time),
        ]),
        Token::Tuple(vec![
            Token::Uint(data.max_fee_per_gas),
            Token::Uint(data.max_priority_fee_per_gas),
            Token::Uint(data.transaction_calldata_gas_used),
            Token::Address(data.relay_worker),
            Token::Address(data.paymaster),
            Token::Address(data.forwarder),
            Token::Bytes(data.paymaster_data.to_vec()),
            Token::Uint(data.client_id),
        ]),
    ])])
}

/// Assembles relay requests of one network
#[derive(Clone, Debug)]
pub struct RelayRequestBuilder {
    chain: Arc<dyn ChainClient>,
    config: RelayConfig,
    chain_id: u64,
    gas: GasPolicy,
}

impl RelayRequestBuilder {
    pub fn new(
        chain: Arc<dyn ChainClient>,
        config: RelayConfig,
        chain_id: u64,
        gas: GasPolicy,
    ) -> Self {
        Self { chain, config, chain_id, gas }
    }

    pub fn domain(&self) -> RelayDomain {
        RelayDomain::new(&self.config.domain_separator_name, self.chain_id, self.config.forwarder)
    }

    /// Forwarder nonce of `from`, raised to the local floor
    pub async fn forwarder_nonce(
        &self,
        from: Address,
        nonce_floor: Option<U256>,
    ) -> AccountResult<U256> {
        let call = forwarder::GetNonceCall { from };
        let res = self.chain.call(self.config.forwarder, call.encode().into()).await?;
        let nonce = forwarder::GetNonceReturn::decode(res)
            .map_err(|err| {
                AccountError::NetworkUnavailable(format!("invalid getNonce response: {err}"))
            })?
            .nonce;

        Ok(match nonce_floor {
            Some(floor) if floor > nonce => {
                trace!("Forwarder nonce of {from:?} raised from {nonce} to the local floor {floor}");
                floor
            }
            _ => nonce,
        })
    }

    /// Builds the relay request executing `intent` on behalf of `from`
    ///
    /// Only a single call without native value can be forwarded.
    ///
    /// # Arguments
    /// * `from` - Owner of the externally owned account
    /// * `intent` - Call to forward
    /// * `nonce_floor` - Smallest forwarder nonce the request may use
    ///
    /// # Returns
    /// * `AccountResult<UnsignedRelayRequest>` - Request bound to the forwarder, relay hub and chain
    pub async fn build(
        &self,
        from: Address,
        intent: &CallIntent,
        nonce_floor: Option<U256>,
    ) -> AccountResult<UnsignedRelayRequest> {
        let call = match intent {
            CallIntent::Single(call) => call,
            CallIntent::Batch(_) => {
                return Err(AccountError::InvalidIntent(
                    "relayed transactions execute a single call".into(),
                ))
            }
        };
        if !call.value.is_zero() {
            return Err(AccountError::InvalidIntent(
                "relayed transactions cannot transfer native value".into(),
            ));
        }

        let nonce = self.forwarder_nonce(from, nonce_floor).await?;
        let estimate = self.chain.estimate_gas(from, call.to, U256::zero(), call.data.clone()).await?;
        let gas = self.gas.scale_gas(estimate).max(self.gas.relay_gas_limit);

        let (max_fee, max_priority_fee) = self.chain.estimate_fees().await?;
        let (max_fee_per_gas, max_priority_fee_per_gas) =
            self.gas.apply_fees(max_fee, max_priority_fee);

        let now = SystemTime::now().duration_since(UNIX_EPOCH).map(|d| d.as_secs()).unwrap_or(0);

        let mut request = RelayRequest {
            request: ForwardRequest {
                from,
                to: call.to,
                value: U256::zero(),
                gas,
                nonce,
                data: call.data.clone(),
                valid_until_time: (now + self.config.request_valid_seconds).into(),
            },
            relay_data: RelayData {
                max_fee_per_gas,
                max_priority_fee_per_gas,
                transaction_calldata_gas_used: U256::zero(),
                relay_worker: self.config.relay_worker,
                paymaster: self.config.paymaster,
                forwarder: self.config.forwarder,
                paymaster_data: self.config.paymaster_data.clone(),
                client_id: self.config.client_id,
            },
        };
        request.relay_data.transaction_calldata_gas_used = calldata_gas(
            &encode_relay_request(&request),
            self.config.gtx_data_zero,
            self.config.gtx_data_non_zero,
        )
        .into();

        debug!(
            "Built relay request of {from:?}: forwarder nonce {nonce}, gas {gas}, calldata gas {}",
            request.relay_data.transaction_calldata_gas_used
        );
        Ok(UnsignedRelayRequest::new(request, self.domain()))
    }

    /// Relay server payload of a signed request
    ///
    /// The relay worker nonce window is read right before submission.
    pub async fn transaction_request(
        &self,
        signed: &SignedRelayRequest,
    ) -> AccountResult<RelayTransactionRequest> {
        let worker_nonce = self.chain.get_transaction_count(self.config.relay_worker).await?.as_u64();
        Ok(RelayTransactionRequest {
            relay_request: signed.request().clone(),
            metadata: RelayMetadata {
                max_acceptance_budget: self.config.max_acceptance_budget,
                relay_hub_address: self.config.relay_hub,
                signature: signed.signature().clone(),
                approval_data: Default::default(),
                relay_max_nonce: worker_nonce + self.config.max_relay_nonce_gap,
                relay_last_known_nonce: worker_nonce,
                domain_separator_name: self.config.domain_separator_name.clone(),
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn calldata_gas_counts_zero_bytes_cheaper() {
        let mut request = RelayRequest::default();
        let empty = calldata_gas(&encode_relay_request(&request), 4, 16);
        // 20 words, the only non-zero bytes are the 5 offsets (0x20, 0x40, 0x0140, 0xe0, 0x0100)
        assert_eq!(empty, 6 * 16 + (20 * 32 - 6) * 4);

        request.request.data = vec![0xff; 4].into();
        assert!(calldata_gas(&encode_relay_request(&request), 4, 16) > empty);
    }
}
