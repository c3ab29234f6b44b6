use super::{create2_address, salt_bytes, SmartAccount};
use crate::signer::Signer;
use async_trait::async_trait;
use ethers::{
    abi::{encode, AbiEncode, Token},
    types::{Address, Bytes, U256},
    utils::keccak256,
};
use gasless_contracts::{light_account, light_account_factory};
use gasless_primitives::{
    constants::dummy_signature, network::LightAccountConfig, AccountResult, AccountVariant,
    CallIntent, UnsignedUserOperation,
};
use std::str::FromStr;

/// LightAccount (v1): single owner account behind an ERC-1967 proxy
#[derive(Clone, Debug)]
pub struct LightAccount {
    config: LightAccountConfig,
    owner: Address,
}

impl LightAccount {
    pub fn new(config: LightAccountConfig, owner: Address) -> Self {
        Self { config, owner }
    }

    /// Proxy creation code followed by its constructor arguments (implementation, initializer)
    fn deployment_code(&self) -> Vec<u8> {
        let initializer = light_account::InitializeCall { an_owner: self.owner }.encode();
        let args = encode(&[
            Token::Address(self.config.implementation),
            Token::Bytes(initializer),
        ]);
        [self.config.proxy_creation_code.as_ref(), &args[..]].concat()
    }
}

#[async_trait]
impl SmartAccount for LightAccount {
    fn variant(&self) -> AccountVariant {
        AccountVariant::LightAccount
    }

    fn owner(&self) -> Address {
        self.owner
    }

    fn factory(&self) -> Address {
        self.config.factory
    }

    fn salt(&self) -> U256 {
        self.config.salt
    }

    fn address(&self) -> Address {
        create2_address(
            self.config.factory,
            salt_bytes(self.config.salt),
            keccak256(self.deployment_code()).into(),
        )
    }

    fn factory_data(&self) -> Bytes {
        light_account_factory::CreateAccountCall { owner: self.owner, salt: self.config.salt }
            .encode()
            .into()
    }

    fn encode_calls(&self, intent: &CallIntent) -> AccountResult<Bytes> {
        intent.validate()?;
        let data = match intent {
            CallIntent::Single(call) => light_account::ExecuteCall {
                dest: call.to,
                value: call.value,
                func: call.data.clone(),
            }
            .encode(),
            CallIntent::Batch(calls) => light_account::ExecuteBatchCall {
                dest: calls.iter().map(|call| call.to).collect(),
                value: calls.iter().map(|call| call.value).collect(),
                func: calls.iter().map(|call| call.data.clone()).collect(),
            }
            .encode(),
        };
        Ok(data.into())
    }

    fn dummy_signature(&self) -> Bytes {
        Bytes::from_str(dummy_signature::ECDSA).unwrap_or_default()
    }

    async fn sign_user_operation(
        &self,
        user_operation: &UnsignedUserOperation,
        signer: &dyn Signer,
    ) -> AccountResult<Bytes> {
        let signature = signer.sign_message(user_operation.hash().as_fixed_bytes()).await?;
        Ok(signature.to_vec().into())
    }
}
