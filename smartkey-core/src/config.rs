use alloy_primitives::{address, Address};
use serde::{Deserialize, Serialize};

use crate::{error::ConnectorError, Environment};

/// OP Mainnet.
pub const OPTIMISM_CHAIN_ID: u64 = 10;

/// OP Sepolia.
pub const OPTIMISM_SEPOLIA_CHAIN_ID: u64 = 11_155_420;

/// Relying party the passkeys are bound to.
pub const DEFAULT_RP_ID: &str = "exactly.app";

/// Origin reported in `clientDataJSON` by the production web app.
pub const DEFAULT_ORIGIN: &str = "https://web.exactly.app";

/// Implementation behind every account proxy deployed by the factory.
pub static DEFAULT_ACCOUNT_IMPLEMENTATION: Address =
    address!("0x0046000000000151008789797b54fdb500E2a61e");

/// User verification requirement passed to the authenticator.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, uniffi::Enum)]
#[serde(rename_all = "lowercase")]
pub enum UserVerification {
    /// The authenticator must verify the user (biometric or PIN).
    Required,
    /// Verify the user when the authenticator supports it.
    #[default]
    Preferred,
    /// Presence is enough.
    Discouraged,
}

/// Static configuration of a connector instance.
///
/// A connector serves exactly one chain. Every chain check (`connect`,
/// `switch_chain`, `chainChanged`, `get_provider`) goes through [`ConnectorConfig::ensure_chain`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectorConfig {
    /// The single supported chain.
    pub chain_id: u64,
    /// WebAuthn relying party identifier.
    pub rp_id: String,
    /// Origin embedded in dummy `clientDataJSON`.
    pub origin: String,
    /// Account factory that deploys the smart account.
    pub factory_address: Address,
    /// Implementation the factory's proxies delegate to.
    #[serde(default = "default_account_implementation")]
    pub account_implementation: Address,
    /// Whether to restrict assertions to the stored credential id.
    ///
    /// Some platforms mis-filter `allowCredentials`; turning this off lets the
    /// authenticator pick any discoverable credential for the relying party.
    #[serde(default = "default_filter_allowed_credentials")]
    pub filter_allowed_credentials: bool,
    /// User verification requirement for assertions.
    #[serde(default)]
    pub user_verification: UserVerification,
}

const fn default_filter_allowed_credentials() -> bool {
    true
}

fn default_account_implementation() -> Address {
    DEFAULT_ACCOUNT_IMPLEMENTATION
}

impl ConnectorConfig {
    /// Builds the default configuration for an environment.
    #[must_use]
    pub fn from_environment(environment: &Environment, factory_address: Address) -> Self {
        let chain_id = match environment {
            Environment::Staging => OPTIMISM_SEPOLIA_CHAIN_ID,
            Environment::Production => OPTIMISM_CHAIN_ID,
        };
        Self {
            chain_id,
            rp_id: DEFAULT_RP_ID.to_string(),
            origin: DEFAULT_ORIGIN.to_string(),
            factory_address,
            account_implementation: DEFAULT_ACCOUNT_IMPLEMENTATION,
            filter_allowed_credentials: true,
            user_verification: UserVerification::Preferred,
        }
    }

    /// Parses a configuration from its JSON representation.
    ///
    /// # Errors
    /// Returns `ConnectorError::InvalidInput` if the JSON does not describe a valid config.
    pub fn from_json(json: &str) -> Result<Self, ConnectorError> {
        serde_json::from_str(json).map_err(|e| ConnectorError::InvalidInput {
            attribute: "config".to_string(),
            reason: e.to_string(),
        })
    }

    /// Fails with `UnsupportedChain` unless `chain_id` is the configured chain.
    ///
    /// # Errors
    /// Returns `ConnectorError::UnsupportedChain` for any other chain id.
    pub fn ensure_chain(&self, chain_id: u64) -> Result<(), ConnectorError> {
        if chain_id == self.chain_id {
            Ok(())
        } else {
            Err(ConnectorError::UnsupportedChain { chain_id })
        }
    }
}
