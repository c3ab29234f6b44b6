//! Gasless accounts
//!
//! Address derivation, operation building and signing, submission and confirmation tracking for
//! the smart account variants (LightAccount, Kernel, Safe) and for relayed EOA meta-transactions.

pub mod builder;
pub mod clients;
pub mod derivation;
pub mod guard;
pub mod keystore;
pub mod manager;
pub mod relay;
pub mod signer;
pub mod smart;
pub mod submission;
pub mod tracker;

pub use builder::{SponsorshipPolicy, UserOperationBuilder};
pub use clients::Clients;
pub use derivation::{get_address, AddressCache};
pub use guard::{InFlightGuard, InFlightPermit};
pub use keystore::{BackupConsent, KeyStore, MnemonicKeyStore};
pub use manager::{create_account_manager, AccountManager, EoaAccountManager, SmartAccountManager};
pub use relay::RelayRequestBuilder;
pub use signer::{LocalSigner, Signer};
pub use smart::{smart_account, SmartAccount};
pub use tracker::{ConfirmationTracker, NetworkReceiptSource, ReceiptSource};
