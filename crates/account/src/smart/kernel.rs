use super::{create2_address, salt_bytes, SmartAccount};
use crate::signer::Signer;
use async_trait::async_trait;
use ethers::{
    abi::AbiEncode,
    types::{Address, Bytes, U256},
    utils::keccak256,
};
use gasless_contracts::{kernel, kernel_factory};
use gasless_primitives::{
    constants::dummy_signature, network::KernelConfig, AccountResult, AccountVariant, CallIntent,
    UnsignedUserOperation,
};
use std::str::FromStr;

/// Call (not delegatecall) operation of the Kernel execute interface
const OPERATION_CALL: u8 = 0;

/// Kernel (v2) account validated by the ECDSA validator in sudo mode
#[derive(Clone, Debug)]
pub struct KernelAccount {
    config: KernelConfig,
    owner: Address,
}

impl KernelAccount {
    pub fn new(config: KernelConfig, owner: Address) -> Self {
        Self { config, owner }
    }

    /// `initialize(validator, owner)` call the factory runs on the new account
    fn initializer(&self) -> Vec<u8> {
        kernel::InitializeCall {
            default_validator: self.config.ecdsa_validator,
            data: self.owner.as_bytes().to_vec().into(),
        }
        .encode()
    }

    /// Init code of the ERC-1967 proxy the factory deploys with `CREATE2`
    ///
    /// The proxy only embeds the factory (the sole caller allowed to initialize it), so the
    /// address does not depend on the implementation. Factories whose address starts with six
    /// zero bytes get the shorter `PUSH14` form.
    fn proxy_init_code(&self) -> Vec<u8> {
        let factory = self.config.factory.as_bytes();
        if factory[..6].iter().all(|byte| *byte == 0) {
            [&PROXY_PREFIX_PUSH14[..], &factory[6..], &PROXY_RUNTIME_PUSH14[..]].concat()
        } else {
            [&PROXY_PREFIX_PUSH20[..], factory, &PROXY_RUNTIME_PUSH20[..]].concat()
        }
    }
}

const PROXY_PREFIX_PUSH20: [u8; 13] =
    [0x60, 0x7f, 0x3d, 0x81, 0x60, 0x09, 0x3d, 0x39, 0xf3, 0x3d, 0x3d, 0x33, 0x73];
const PROXY_PREFIX_PUSH14: [u8; 13] =
    [0x60, 0x79, 0x3d, 0x81, 0x60, 0x09, 0x3d, 0x39, 0xf3, 0x3d, 0x3d, 0x33, 0x6d];

/// Proxy runtime after the factory address: calls from the factory store the implementation and
/// run `initialize`, any other call is delegated to the implementation in the ERC-1967 slot
const PROXY_RUNTIME_PUSH20: [u8; 103] = proxy_runtime(0x57, 0x52);
const PROXY_RUNTIME_PUSH14: [u8; 103] = proxy_runtime(0x51, 0x4c);

const fn proxy_runtime(init_dest: u8, return_dest: u8) -> [u8; 103] {
    [
        0x14, 0x60, init_dest, 0x57, 0x36, 0x3d, 0x3d, 0x37, 0x36, 0x3d, 0x7f, 0x36, 0x08, 0x94,
        0xa1, 0x3b, 0xa1, 0xa3, 0x21, 0x06, 0x67, 0xc8, 0x28, 0x49, 0x2d, 0xb9, 0x8d, 0xca, 0x3e,
        0x20, 0x76, 0xcc, 0x37, 0x35, 0xa9, 0x20, 0xa3, 0xca, 0x50, 0x5d, 0x38, 0x2b, 0xbc, 0x54,
        0x5a, 0xf4, 0x3d, 0x60, 0x00, 0x80, 0x3e, 0x60, return_dest, 0x57, 0x3d, 0x60, 0x00, 0xfd,
        0x5b, 0x3d, 0x60, 0x00, 0xf3, 0x5b, 0x3d, 0x35, 0x60, 0x20, 0x35, 0x55, 0x60, 0x40, 0x80,
        0x36, 0x11, 0x15, 0x60, return_dest, 0x57, 0x36, 0x03, 0x80, 0x60, 0x40, 0x3d, 0x37, 0x3d,
        0x3d, 0x35, 0x5a, 0xf4, 0x3d, 0x60, 0x00, 0x80, 0x3e, 0x60, return_dest, 0x57, 0x3d, 0x60,
        0x00, 0xfd,
    ]
}

#[async_trait]
impl SmartAccount for KernelAccount {
    fn variant(&self) -> AccountVariant {
        AccountVariant::Kernel
    }

    fn owner(&self) -> Address {
        self.owner
    }

    fn factory(&self) -> Address {
        self.config.factory
    }

    fn salt(&self) -> U256 {
        self.config.index
    }

    fn address(&self) -> Address {
        let salt = keccak256([self.initializer(), salt_bytes(self.config.index).to_vec()].concat());
        let salt = U256::from_big_endian(&salt) & ((U256::one() << 96) - 1);
        create2_address(
            self.config.factory,
            salt_bytes(salt),
            keccak256(self.proxy_init_code()).into(),
        )
    }

    fn factory_data(&self) -> Bytes {
        kernel_factory::CreateAccountCall {
            implementation: self.config.implementation,
            data: self.initializer().into(),
            index: self.config.index,
        }
        .encode()
        .into()
    }

    fn encode_calls(&self, intent: &CallIntent) -> AccountResult<Bytes> {
        intent.validate()?;
        let data = match intent {
            CallIntent::Single(call) => kernel::ExecuteCall {
                to: call.to,
                value: call.value,
                data: call.data.clone(),
                operation: OPERATION_CALL,
            }
            .encode(),
            CallIntent::Batch(calls) => kernel::ExecuteBatchCall {
                calls: calls
                    .iter()
                    .map(|call| kernel::Call {
                        to: call.to,
                        value: call.value,
                        data: call.data.clone(),
                    })
                    .collect(),
            }
            .encode(),
        };
        Ok(data.into())
    }

    fn dummy_signature(&self) -> Bytes {
        let ecdsa = Bytes::from_str(dummy_signature::ECDSA).unwrap_or_default();
        [&dummy_signature::KERNEL_SUDO_MODE[..], &ecdsa[..]].concat().into()
    }

    async fn sign_user_operation(
        &self,
        user_operation: &UnsignedUserOperation,
        signer: &dyn Signer,
    ) -> AccountResult<Bytes> {
        let signature = signer.sign_message(user_operation.hash().as_fixed_bytes()).await?;
        Ok([&dummy_signature::KERNEL_SUDO_MODE[..], &signature.to_vec()[..]].concat().into())
    }
}
