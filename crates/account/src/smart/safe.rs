use super::{create2_address, salt_bytes, SmartAccount};
use crate::signer::Signer;
use async_trait::async_trait;
use ethers::{
    abi::{encode, AbiEncode, Token},
    types::{Address, Bytes, H256, U256},
    utils::keccak256,
};
use gasless_contracts::{multi_send, safe, safe_module, safe_module_setup, safe_proxy_factory};
use gasless_primitives::{
    constants::dummy_signature, network::SafeConfig, AccountResult, AccountVariant, Call,
    CallIntent, UnsignedUserOperation,
};
use lazy_static::lazy_static;
use std::str::FromStr;

const SAFE_OP_TYPE: &str = "SafeOp(address safe,uint256 nonce,bytes initCode,bytes callData,uint256 callGasLimit,uint256 verificationGasLimit,uint256 preVerificationGas,uint256 maxFeePerGas,uint256 maxPriorityFeePerGas,bytes paymasterAndData,uint48 validAfter,uint48 validUntil,address entryPoint)";
const DOMAIN_TYPE: &str = "EIP712Domain(uint256 chainId,address verifyingContract)";

lazy_static! {
    static ref SAFE_OP_TYPEHASH: [u8; 32] = keccak256(SAFE_OP_TYPE);
    static ref DOMAIN_TYPEHASH: [u8; 32] = keccak256(DOMAIN_TYPE);
}

const OPERATION_CALL: u8 = 0;
const OPERATION_DELEGATECALL: u8 = 1;

/// Signatures carry no validity window (valid immediately, never expire)
const VALID_AFTER: u64 = 0;
const VALID_UNTIL: u64 = 0;

/// EIP-712 digest of a user operation as verified by the Safe 4337 module
///
/// # Arguments
/// * `user_operation` - User operation bound to its entry point and chain
/// * `module` - Safe 4337 module (verifying contract of the domain)
/// * `valid_after` - Start of the validity window
/// * `valid_until` - End of the validity window (0 for none)
pub fn safe_operation_hash(
    user_operation: &UnsignedUserOperation,
    module: Address,
    valid_after: u64,
    valid_until: u64,
) -> H256 {
    let domain_separator = keccak256(encode(&[
        Token::FixedBytes(DOMAIN_TYPEHASH.to_vec()),
        Token::Uint(user_operation.chain_id().into()),
        Token::Address(module),
    ]));

    let uo = user_operation.user_operation();
    let struct_hash = keccak256(encode(&[
        Token::FixedBytes(SAFE_OP_TYPEHASH.to_vec()),
        Token::Address(uo.sender),
        Token::Uint(uo.nonce),
        Token::FixedBytes(keccak256(&uo.init_code).to_vec()),
        Token::FixedBytes(keccak256(&uo.call_data).to_vec()),
        Token::Uint(uo.call_gas_limit),
        Token::Uint(uo.verification_gas_limit),
        Token::Uint(uo.pre_verification_gas),
        Token::Uint(uo.max_fee_per_gas),
        Token::Uint(uo.max_priority_fee_per_gas),
        Token::FixedBytes(keccak256(&uo.paymaster_and_data).to_vec()),
        Token::Uint(valid_after.into()),
        Token::Uint(valid_until.into()),
        Token::Address(user_operation.entry_point()),
    ]));

    keccak256([&[0x19, 0x01][..], &domain_separator[..], &struct_hash[..]].concat()).into()
}

/// Packs calls for `multiSend`: operation, to, value, data length, data
fn pack_multi_send(calls: &[Call]) -> Vec<u8> {
    let mut packed = Vec::new();
    for call in calls {
        packed.push(OPERATION_CALL);
        packed.extend_from_slice(call.to.as_bytes());
        packed.extend_from_slice(&salt_bytes(call.value));
        packed.extend_from_slice(&salt_bytes(call.data.len().into()));
        packed.extend_from_slice(&call.data);
    }
    packed
}

/// Safe (1.4.1) with the 4337 module enabled at setup and a single owner
#[derive(Clone, Debug)]
pub struct SafeAccount {
    config: SafeConfig,
    owner: Address,
}

impl SafeAccount {
    pub fn new(config: SafeConfig, owner: Address) -> Self {
        Self { config, owner }
    }

    /// `setup` call initializing the proxy: one owner, threshold 1, module enabled
    fn initializer(&self) -> Vec<u8> {
        let enable_modules =
            safe_module_setup::EnableModulesCall { modules: vec![self.config.module] }.encode();
        safe::SetupCall {
            owners: vec![self.owner],
            threshold: U256::one(),
            to: self.config.module_setup,
            data: enable_modules.into(),
            fallback_handler: self.config.module,
            payment_token: Address::zero(),
            payment: U256::zero(),
            payment_receiver: Address::zero(),
        }
        .encode()
    }
}

#[async_trait]
impl SmartAccount for SafeAccount {
    fn variant(&self) -> AccountVariant {
        AccountVariant::Safe
    }

    fn owner(&self) -> Address {
        self.owner
    }

    fn factory(&self) -> Address {
        self.config.proxy_factory
    }

    fn salt(&self) -> U256 {
        self.config.salt_nonce
    }

    fn address(&self) -> Address {
        let salt = keccak256(
            [&keccak256(self.initializer())[..], &salt_bytes(self.config.salt_nonce)[..]].concat(),
        );
        let deployment_code = [
            self.config.proxy_creation_code.as_ref(),
            &H256::from(self.config.singleton)[..],
        ]
        .concat();
        create2_address(self.config.proxy_factory, salt, keccak256(deployment_code).into())
    }

    fn factory_data(&self) -> Bytes {
        safe_proxy_factory::CreateProxyWithNonceCall {
            singleton: self.config.singleton,
            initializer: self.initializer().into(),
            salt_nonce: self.config.salt_nonce,
        }
        .encode()
        .into()
    }

    fn encode_calls(&self, intent: &CallIntent) -> AccountResult<Bytes> {
        intent.validate()?;
        let call = match intent {
            CallIntent::Single(call) => safe_module::ExecuteUserOpCall {
                to: call.to,
                value: call.value,
                data: call.data.clone(),
                operation: OPERATION_CALL,
            },
            CallIntent::Batch(calls) => safe_module::ExecuteUserOpCall {
                to: self.config.multi_send,
                value: U256::zero(),
                data: multi_send::MultiSendCall { transactions: pack_multi_send(calls).into() }
                    .encode()
                    .into(),
                operation: OPERATION_DELEGATECALL,
            },
        };
        Ok(call.encode().into())
    }

    fn dummy_signature(&self) -> Bytes {
        let ecdsa = Bytes::from_str(dummy_signature::ECDSA).unwrap_or_default();
        [&validity_window()[..], &ecdsa[..]].concat().into()
    }

    async fn sign_user_operation(
        &self,
        user_operation: &UnsignedUserOperation,
        signer: &dyn Signer,
    ) -> AccountResult<Bytes> {
        let digest = safe_operation_hash(user_operation, self.config.module, VALID_AFTER, VALID_UNTIL);
        let signature = signer.sign_hash(digest).await?;
        Ok([&validity_window()[..], &signature.to_vec()[..]].concat().into())
    }
}

/// `validAfter (uint48) ‖ validUntil (uint48)` prefix of the signature
fn validity_window() -> [u8; 12] {
    let mut window = [0u8; 12];
    window[..6].copy_from_slice(&VALID_AFTER.to_be_bytes()[2..]);
    window[6..].copy_from_slice(&VALID_UNTIL.to_be_bytes()[2..]);
    window
}
