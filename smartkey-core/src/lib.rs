#![deny(clippy::all, clippy::pedantic, clippy::nursery)]
//! Passkey-backed signing connector for smart contract accounts.
//!
//! A platform authenticator (passkey) owns the key material. This crate asks it for
//! assertions, turns those assertions into the signature blob the smart account
//! verifies on-chain, hands out a dummy blob for gas estimation, and exposes the
//! wallet-connector lifecycle to the host application.

use strum::EnumString;

/// Deployment environment used to pick connector defaults.
#[derive(Debug, Clone, Copy, PartialEq, Eq, uniffi::Enum, EnumString)]
#[strum(serialize_all = "lowercase")]
pub enum Environment {
    /// Testnet deployment (OP Sepolia).
    Staging,
    /// Mainnet deployment (OP Mainnet).
    Production,
}

mod error;
pub use error::*;

mod config;
pub use config::*;

mod credential;
pub use credential::*;

/// Persistence of the enrolled passkey record.
pub mod storage;

/// Assertion decoding, canonicalization and on-chain signature encoding.
pub mod signature;

mod signer;
pub use signer::*;

/// Smart account factory rules and the account-client handle.
pub mod account;

mod session;
pub use session::*;

mod connector;
pub use connector::*;

/// Logging bridge to the host application.
pub mod logger;

pub(crate) mod primitives;

uniffi::setup_scaffolding!("smartkey_core");
