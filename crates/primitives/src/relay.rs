//! Legacy relay (meta-transaction) requests
//!
//! A relay request is a forward request executed by the forwarder on behalf of `from`, plus the
//! relay data describing who pays for it. The owner signs the EIP-712 digest of both. The relay
//! hub is not part of the signed data and only travels in the [RelayMetadata](RelayMetadata).

use crate::{
    constants::{relay, rpc_error_codes},
    error::{AccountError, AccountResult},
};
use ethers::{
    abi::{encode, Token},
    types::{Address, Bytes, H256, U256},
    utils::keccak256,
};
use lazy_static::lazy_static;
use serde::{Deserialize, Serialize};

const EIP712_DOMAIN_TYPE: &str =
    "EIP712Domain(string name,string version,uint256 chainId,address verifyingContract)";
const RELAY_DATA_TYPE: &str = "RelayData(uint256 maxFeePerGas,uint256 maxPriorityFeePerGas,uint256 transactionCalldataGasUsed,address relayWorker,address paymaster,address forwarder,bytes paymasterData,uint256 clientId)";
const RELAY_REQUEST_TYPE: &str = "RelayRequest(address from,address to,uint256 value,uint256 gas,uint256 nonce,bytes data,uint256 validUntilTime,RelayData relayData)";

lazy_static! {
    static ref EIP712_DOMAIN_TYPEHASH: [u8; 32] = keccak256(EIP712_DOMAIN_TYPE);
    static ref RELAY_DATA_TYPEHASH: [u8; 32] = keccak256(RELAY_DATA_TYPE);
    static ref RELAY_REQUEST_TYPEHASH: [u8; 32] =
        keccak256(format!("{RELAY_REQUEST_TYPE}{RELAY_DATA_TYPE}"));
}

/// Call executed by the forwarder
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ForwardRequest {
    pub from: Address,
    pub to: Address,
    pub value: U256,
    pub gas: U256,
    /// Forwarder nonce of `from`
    pub nonce: U256,
    pub data: Bytes,
    /// Unix timestamp after which the request is rejected
    pub valid_until_time: U256,
}

/// Fees and parties of a relayed call
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RelayData {
    pub max_fee_per_gas: U256,
    pub max_priority_fee_per_gas: U256,
    pub transaction_calldata_gas_used: U256,
    pub relay_worker: Address,
    pub paymaster: Address,
    pub forwarder: Address,
    pub paymaster_data: Bytes,
    pub client_id: U256,
}

/// Relay request as sent to the relay server
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RelayRequest {
    pub request: ForwardRequest,
    pub relay_data: RelayData,
}

/// EIP-712 domain of the forwarder
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RelayDomain {
    pub name: String,
    pub version: String,
    pub chain_id: u64,
    pub verifying_contract: Address,
}

impl RelayDomain {
    pub fn new(name: impl Into<String>, chain_id: u64, forwarder: Address) -> Self {
        Self {
            name: name.into(),
            version: relay::DOMAIN_SEPARATOR_VERSION.to_string(),
            chain_id,
            verifying_contract: forwarder,
        }
    }

    pub fn separator(&self) -> H256 {
        keccak256(encode(&[
            Token::FixedBytes(EIP712_DOMAIN_TYPEHASH.to_vec()),
            Token::FixedBytes(keccak256(self.name.as_bytes()).to_vec()),
            Token::FixedBytes(keccak256(self.version.as_bytes()).to_vec()),
            Token::Uint(self.chain_id.into()),
            Token::Address(self.verifying_contract),
        ]))
        .into()
    }
}

impl RelayData {
    pub fn struct_hash(&self) -> H256 {
        keccak256(encode(&[
            Token::FixedBytes(RELAY_DATA_TYPEHASH.to_vec()),
            Token::Uint(self.max_fee_per_gas),
            Token::Uint(self.max_priority_fee_per_gas),
            Token::Uint(self.transaction_calldata_gas_used),
            Token::Address(self.relay_worker),
            Token::Address(self.paymaster),
            Token::Address(self.forwarder),
            Token::FixedBytes(keccak256(&self.paymaster_data).to_vec()),
            Token::Uint(self.client_id),
        ]))
        .into()
    }
}

impl RelayRequest {
    pub fn struct_hash(&self) -> H256 {
        let request = &self.request;
        keccak256(encode(&[
            Token::FixedBytes(RELAY_REQUEST_TYPEHASH.to_vec()),
            Token::Address(request.from),
            Token::Address(request.to),
            Token::Uint(request.value),
            Token::Uint(request.gas),
            Token::Uint(request.nonce),
            Token::FixedBytes(keccak256(&request.data).to_vec()),
            Token::Uint(request.valid_until_time),
            Token::FixedBytes(self.relay_data.struct_hash().as_bytes().to_vec()),
        ]))
        .into()
    }

    /// EIP-712 digest signed by `from`
    pub fn digest(&self, domain: &RelayDomain) -> H256 {
        keccak256(
            [&[0x19, 0x01][..], domain.separator().as_bytes(), self.struct_hash().as_bytes()]
                .concat(),
        )
        .into()
    }
}

/// Relay request bound to its forwarder domain, ready to be signed
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UnsignedRelayRequest {
    request: RelayRequest,
    domain: RelayDomain,
}

impl UnsignedRelayRequest {
    pub fn new(request: RelayRequest, domain: RelayDomain) -> Self {
        Self { request, domain }
    }

    pub fn request(&self) -> &RelayRequest {
        &self.request
    }

    pub fn domain(&self) -> &RelayDomain {
        &self.domain
    }

    pub fn hash(&self) -> H256 {
        self.request.digest(&self.domain)
    }

    pub fn into_signed(self, signature: Bytes) -> SignedRelayRequest {
        let hash = self.hash();
        SignedRelayRequest { request: self.request, domain: self.domain, signature, hash }
    }
}

/// Signed relay request (read-only)
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SignedRelayRequest {
    request: RelayRequest,
    domain: RelayDomain,
    signature: Bytes,
    hash: H256,
}

impl SignedRelayRequest {
    pub fn request(&self) -> &RelayRequest {
        &self.request
    }

    pub fn domain(&self) -> &RelayDomain {
        &self.domain
    }

    pub fn signature(&self) -> &Bytes {
        &self.signature
    }

    pub fn hash(&self) -> H256 {
        self.hash
    }
}

/// Metadata the relay server needs besides the request itself
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RelayMetadata {
    pub max_acceptance_budget: U256,
    pub relay_hub_address: Address,
    pub signature: Bytes,
    pub approval_data: Bytes,
    /// Highest relay worker nonce the client accepts
    pub relay_max_nonce: u64,
    pub relay_last_known_nonce: u64,
    pub domain_separator_name: String,
}

/// Body of `POST {relay_url}/relay`
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RelayTransactionRequest {
    pub relay_request: RelayRequest,
    pub metadata: RelayMetadata,
}

/// Response of `POST {relay_url}/relay`
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RelayTransactionResponse {
    #[serde(default)]
    pub signed_tx: Option<Bytes>,
    #[serde(default)]
    pub error: Option<String>,
}

impl RelayTransactionResponse {
    /// Signed transaction the relay worker broadcast, or the rejection reported by the relay
    pub fn into_result(self) -> AccountResult<Bytes> {
        match (self.signed_tx, self.error) {
            (_, Some(message)) => {
                Err(AccountError::ValidationRejected { code: rpc_error_codes::VALIDATION, message })
            }
            (Some(signed_tx), None) => Ok(signed_tx),
            (None, None) => Err(AccountError::ValidationRejected {
                code: rpc_error_codes::VALIDATION,
                message: "relay returned neither a transaction nor an error".into(),
            }),
        }
    }
}

/// Hash of the transaction broadcast by the relay worker
pub fn relayed_transaction_hash(signed_tx: &Bytes) -> H256 {
    keccak256(signed_tx).into()
}
