//! Operation builder (user operations)

use crate::smart::SmartAccount;
use ethers::{
    abi::{AbiDecode, AbiEncode},
    types::{Address, Bytes, U256},
};
use gasless_contracts::entry_point;
use gasless_primitives::{
    constants::entry_point::NONCE_KEY, network::AccountAbstractionConfig, AccountError,
    AccountResult, CallIntent, GasPolicy, UnsignedUserOperation, UserOperation,
    UserOperationGasEstimation,
};
use gasless_rpc::{BundlerClient, ChainClient, PaymasterClient};
use std::sync::Arc;
use tracing::{debug, trace, warn};

/// What to do when the paymaster refuses to sponsor an operation
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SponsorshipPolicy {
    /// The rejection is returned to the caller
    #[default]
    Required,
    /// The account pays for the operation itself
    FallbackToSelfFunded,
}

/// Nonce and deployment state of an account right before building
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AccountState {
    pub deployed: bool,
    pub nonce: U256,
}

/// Assembles unsigned user operations of one network
#[derive(Clone, Debug)]
pub struct UserOperationBuilder {
    chain: Arc<dyn ChainClient>,
    bundler: Arc<dyn BundlerClient>,
    paymaster: Option<Arc<dyn PaymasterClient>>,
    entry_point: Address,
    chain_id: u64,
    gas: GasPolicy,
    sponsorship: SponsorshipPolicy,
}

impl UserOperationBuilder {
    pub fn new(
        chain: Arc<dyn ChainClient>,
        bundler: Arc<dyn BundlerClient>,
        paymaster: Option<Arc<dyn PaymasterClient>>,
        aa: &AccountAbstractionConfig,
        chain_id: u64,
        gas: GasPolicy,
    ) -> Self {
        Self {
            chain,
            bundler,
            paymaster,
            entry_point: aa.entry_point,
            chain_id,
            gas,
            sponsorship: SponsorshipPolicy::default(),
        }
    }

    pub fn with_sponsorship(mut self, sponsorship: SponsorshipPolicy) -> Self {
        self.sponsorship = sponsorship;
        self
    }

    pub fn sponsorship(&self) -> SponsorshipPolicy {
        self.sponsorship
    }

    /// Deployment status and entry point nonce of `sender`
    ///
    /// # Arguments
    /// * `sender` - Smart account address
    /// * `nonce_floor` - Smallest nonce the next operation may use (last submitted nonce + 1)
    pub async fn account_state(
        &self,
        sender: Address,
        nonce_floor: Option<U256>,
    ) -> AccountResult<AccountState> {
        let deployed = !self.chain.get_code(sender).await?.is_empty();
        let mut nonce = if deployed {
            let call = entry_point::GetNonceCall { sender, key: NONCE_KEY.into() };
            let res = self.chain.call(self.entry_point, call.encode().into()).await?;
            entry_point::GetNonceReturn::decode(res)
                .map_err(|err| {
                    AccountError::NetworkUnavailable(format!("invalid getNonce response: {err}"))
                })?
                .nonce
        } else {
            U256::zero()
        };

        if let Some(floor) = nonce_floor {
            if floor > nonce {
                trace!("Nonce of {sender:?} raised from {nonce} to the local floor {floor}");
                nonce = floor;
            }
        }

        Ok(AccountState { deployed, nonce })
    }

    fn check_floors(&self, estimation: &UserOperationGasEstimation) -> AccountResult<()> {
        if estimation.call_gas_limit < self.gas.min_call_gas_limit {
            return Err(AccountError::InsufficientGasEstimate {
                field: "callGasLimit".into(),
                estimate: estimation.call_gas_limit,
                floor: self.gas.min_call_gas_limit,
            });
        }
        if estimation.verification_gas_limit < self.gas.min_verification_gas_limit {
            return Err(AccountError::InsufficientGasEstimate {
                field: "verificationGasLimit".into(),
                estimate: estimation.verification_gas_limit,
                floor: self.gas.min_verification_gas_limit,
            });
        }
        Ok(())
    }

    /// Bundler estimate, scaled by the gas policy
    async fn estimate(&self, uo: &UserOperation) -> AccountResult<UserOperationGasEstimation> {
        let estimation = self.bundler.estimate_user_operation_gas(uo, self.entry_point).await?;
        trace!("Bundler estimated {estimation:?}");
        self.check_floors(&estimation)?;
        Ok(UserOperationGasEstimation {
            pre_verification_gas: estimation.pre_verification_gas,
            verification_gas_limit: self.gas.scale_gas(estimation.verification_gas_limit),
            call_gas_limit: self.gas.scale_gas(estimation.call_gas_limit),
        })
    }

    fn with_gas(uo: UserOperation, estimation: UserOperationGasEstimation) -> UserOperation {
        uo.call_gas_limit(estimation.call_gas_limit)
            .verification_gas_limit(estimation.verification_gas_limit)
            .pre_verification_gas(estimation.pre_verification_gas)
    }

    /// Paymaster data and gas limits, or self funded gas limits
    async fn gas_and_sponsorship(&self, uo: UserOperation) -> AccountResult<UserOperation> {
        let Some(paymaster) = &self.paymaster else {
            let estimation = self.estimate(&uo).await?;
            return Ok(Self::with_gas(uo, estimation));
        };

        match self.sponsor(paymaster.as_ref(), uo.clone()).await {
            Err(AccountError::PaymasterRejected(reason))
                if self.sponsorship == SponsorshipPolicy::FallbackToSelfFunded =>
            {
                warn!("Paymaster rejected operation of {:?} ({reason}), paying with account funds", uo.sender);
                let estimation = self.estimate(&uo).await?;
                Ok(Self::with_gas(uo, estimation))
            }
            res => res,
        }
    }

    /// Gas limits and paymaster data of a sponsored operation
    ///
    /// The paymaster signs over the gas fields, so the last sponsorship is always requested for
    /// the limits that get submitted.
    async fn sponsor(
        &self,
        paymaster: &dyn PaymasterClient,
        uo: UserOperation,
    ) -> AccountResult<UserOperation> {
        let sender = uo.sender;
        let sponsorship = paymaster.sponsor_user_operation(&uo, self.entry_point).await?;
        if let Some(estimation) = sponsorship.gas_estimation() {
            // limits signed by the paymaster are used as they are
            self.check_floors(&estimation)?;
            debug!("Operation of {sender:?} sponsored");
            return Ok(Self::with_gas(uo, estimation)
                .paymaster_and_data(sponsorship.paymaster_and_data));
        }

        // estimated with the paymaster attached, then sponsored again with the final limits
        let estimation =
            self.estimate(&uo.clone().paymaster_and_data(sponsorship.paymaster_and_data)).await?;
        let uo = Self::with_gas(uo, estimation);
        let sponsorship = paymaster.sponsor_user_operation(&uo, self.entry_point).await?;
        let uo = match sponsorship.gas_estimation() {
            Some(estimation) => {
                self.check_floors(&estimation)?;
                Self::with_gas(uo, estimation)
            }
            None => uo,
        };
        debug!("Operation of {sender:?} sponsored after estimation");
        Ok(uo.paymaster_and_data(sponsorship.paymaster_and_data))
    }

    /// Builds the unsigned user operation executing `intent` from `account`
    ///
    /// # Arguments
    /// * `account` - Smart account sending the operation
    /// * `intent` - Call or batch to execute
    /// * `nonce_floor` - Smallest nonce the operation may use
    ///
    /// # Returns
    /// * `AccountResult<UnsignedUserOperation>` - Operation bound to the entry point and chain id,
    ///   with an empty signature
    pub async fn build(
        &self,
        account: &dyn SmartAccount,
        intent: &CallIntent,
        nonce_floor: Option<U256>,
    ) -> AccountResult<UnsignedUserOperation> {
        let sender = account.address();
        let call_data = account.encode_calls(intent)?;

        let state = self.account_state(sender, nonce_floor).await?;
        let init_code = if !state.deployed && state.nonce.is_zero() {
            debug!("Account {sender:?} is not deployed, attaching init code");
            account.init_code()
        } else {
            Bytes::default()
        };

        let (max_fee, max_priority_fee) = self.chain.estimate_fees().await?;
        let (max_fee_per_gas, max_priority_fee_per_gas) =
            self.gas.apply_fees(max_fee, max_priority_fee);

        let uo = UserOperation::default()
            .sender(sender)
            .nonce(state.nonce)
            .init_code(init_code)
            .call_data(call_data)
            .max_fee_per_gas(max_fee_per_gas)
            .max_priority_fee_per_gas(max_priority_fee_per_gas)
            .signature(account.dummy_signature());

        let uo = self.gas_and_sponsorship(uo).await?.signature(Bytes::default());
        debug!(
            "Built user operation of {sender:?}: nonce {}, call gas {}, verification gas {}, pre-verification gas {}",
            uo.nonce, uo.call_gas_limit, uo.verification_gas_limit, uo.pre_verification_gas
        );

        Ok(UnsignedUserOperation::new(uo, self.entry_point, self.chain_id))
    }
}
