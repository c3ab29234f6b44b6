//! Account variants

use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString, EnumVariantNames};

/// Kind of account an owner key controls
#[derive(
    Clone,
    Copy,
    Debug,
    Display,
    EnumString,
    EnumVariantNames,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
)]
#[strum(serialize_all = "kebab_case")]
#[serde(rename_all = "kebab-case")]
pub enum AccountVariant {
    /// Externally owned account; calls go through the relay hub and forwarder
    Eoa,
    /// LightAccount (v1)
    #[strum(serialize = "light")]
    #[serde(rename = "light")]
    LightAccount,
    /// Kernel (v2) with the ECDSA validator
    Kernel,
    /// Safe (1.4.1) with the ERC-4337 module
    Safe,
}

impl AccountVariant {
    /// Whether operations of this variant are user operations sent to a bundler
    pub fn is_smart_account(&self) -> bool {
        !matches!(self, AccountVariant::Eoa)
    }
}
