//! Gas, submission retry and confirmation polling policies

use crate::constants::{confirmation, gas, submission};
use ethers::types::U256;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Gas policy thresholds applied by the operation builder
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GasPolicy {
    pub min_call_gas_limit: U256,
    pub min_verification_gas_limit: U256,
    /// Multiplier applied to gas estimates (in percent, 100 keeps the estimate)
    pub gas_limit_multiplier_percent: u64,
    /// Increase of the node suggested fees (in percent)
    pub fee_bump_percent: u64,
    /// Upper bound of max fee per gas; none means uncapped
    pub max_fee_per_gas_cap: Option<U256>,
    /// Gas limit floor for calls sent through the relay
    pub relay_gas_limit: U256,
}

impl Default for GasPolicy {
    fn default() -> Self {
        Self {
            min_call_gas_limit: gas::MIN_CALL_GAS_LIMIT.into(),
            min_verification_gas_limit: gas::MIN_VERIFICATION_GAS_LIMIT.into(),
            gas_limit_multiplier_percent: gas::GAS_LIMIT_MULTIPLIER_PERCENT,
            fee_bump_percent: gas::FEE_BUMP_PERCENT,
            max_fee_per_gas_cap: None,
            relay_gas_limit: gas::RELAY_GAS_LIMIT.into(),
        }
    }
}

impl GasPolicy {
    /// Scales a gas estimate by the configured multiplier
    pub fn scale_gas(&self, estimate: U256) -> U256 {
        estimate * self.gas_limit_multiplier_percent / 100
    }

    /// Bumps node suggested fees and applies the cap
    ///
    /// # Arguments
    /// * `max_fee_per_gas` - Suggested max fee per gas
    /// * `max_priority_fee_per_gas` - Suggested max priority fee per gas
    ///
    /// # Returns
    /// * `(U256, U256)` - Max fee per gas and max priority fee per gas; the priority fee never
    ///   exceeds the max fee
    pub fn apply_fees(&self, max_fee_per_gas: U256, max_priority_fee_per_gas: U256) -> (U256, U256) {
        let bump = |fee: U256| fee * (100 + self.fee_bump_percent) / 100;
        let mut max_fee = bump(max_fee_per_gas);
        let mut priority_fee = bump(max_priority_fee_per_gas);
        if let Some(cap) = self.max_fee_per_gas_cap {
            max_fee = max_fee.min(cap);
        }
        priority_fee = priority_fee.min(max_fee);
        (max_fee, priority_fee)
    }
}

/// Exponential backoff for transport failures during submission
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    /// Total number of attempts (including the first one)
    pub max_attempts: u32,
    /// Delay before the first retry (in milliseconds)
    pub initial_backoff_ms: u64,
    /// Upper bound of the delay (in milliseconds)
    pub max_backoff_ms: u64,
    pub multiplier: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: submission::MAX_ATTEMPTS,
            initial_backoff_ms: submission::INITIAL_BACKOFF,
            max_backoff_ms: submission::MAX_BACKOFF,
            multiplier: submission::BACKOFF_MULTIPLIER,
        }
    }
}

impl RetryPolicy {
    /// Policy which makes exactly one attempt
    pub fn no_retry() -> Self {
        Self { max_attempts: 1, ..Default::default() }
    }

    /// Delay to wait after the given failed attempt (attempts are counted from 1)
    pub fn backoff(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1);
        let factor = (self.multiplier.max(1) as u64).saturating_pow(exponent);
        let delay = self.initial_backoff_ms.saturating_mul(factor).min(self.max_backoff_ms);
        Duration::from_millis(delay)
    }
}

/// Receipt polling schedule
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfirmationPolicy {
    pub poll_interval_ms: u64,
    pub timeout_ms: u64,
}

impl Default for ConfirmationPolicy {
    fn default() -> Self {
        Self { poll_interval_ms: confirmation::POLL_INTERVAL, timeout_ms: confirmation::TIMEOUT }
    }
}

impl ConfirmationPolicy {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}
