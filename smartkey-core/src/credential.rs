//! The enrolled passkey and its persisted record.

use std::sync::Arc;

use alloy_primitives::U256;
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use serde::{Deserialize, Serialize};

use crate::{
    error::ConnectorError,
    primitives::{to_padded_hex, ParseFromForeignBinding},
};

/// One enrolled authenticator bound to one on-chain account.
///
/// The P-256 public key `(x, y)` is the owner key of the smart account. A
/// credential is created once during enrollment and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq, uniffi::Object)]
pub struct PasskeyCredential {
    credential_id: Vec<u8>,
    public_key_x: U256,
    public_key_y: U256,
}

impl PasskeyCredential {
    /// Builds a credential from its raw parts.
    #[must_use]
    pub const fn new(credential_id: Vec<u8>, public_key_x: U256, public_key_y: U256) -> Self {
        Self {
            credential_id,
            public_key_x,
            public_key_y,
        }
    }

    /// Raw credential id as issued by the authenticator.
    #[must_use]
    pub fn credential_id_bytes(&self) -> &[u8] {
        &self.credential_id
    }

    /// The x coordinate of the P-256 public key.
    #[must_use]
    pub const fn x(&self) -> U256 {
        self.public_key_x
    }

    /// The y coordinate of the P-256 public key.
    #[must_use]
    pub const fn y(&self) -> U256 {
        self.public_key_y
    }

    /// Returns the persisted form of this credential.
    #[must_use]
    pub fn to_record(&self) -> PasskeyRecord {
        PasskeyRecord {
            credential_id: URL_SAFE_NO_PAD.encode(&self.credential_id),
            public_key_x: to_padded_hex(self.public_key_x),
            public_key_y: to_padded_hex(self.public_key_y),
        }
    }
}

#[uniffi::export]
impl PasskeyCredential {
    /// Builds a credential from its encoded parts: a base64url credential id and
    /// hex public key coordinates.
    ///
    /// # Errors
    /// Returns `ConnectorError::InvalidInput` naming the attribute that does not parse.
    #[uniffi::constructor]
    pub fn from_encoded(
        credential_id: &str,
        public_key_x: &str,
        public_key_y: &str,
    ) -> Result<Self, ConnectorError> {
        let id = URL_SAFE_NO_PAD
            .decode(credential_id.trim())
            .map_err(|e| ConnectorError::InvalidInput {
                attribute: "credential_id".to_string(),
                reason: e.to_string(),
            })?;
        if id.is_empty() {
            return Err(ConnectorError::InvalidInput {
                attribute: "credential_id".to_string(),
                reason: "empty credential id".to_string(),
            });
        }
        Ok(Self::new(
            id,
            U256::parse_from_ffi(public_key_x, "public_key_x")?,
            U256::parse_from_ffi(public_key_y, "public_key_y")?,
        ))
    }

    /// The credential id, base64url-encoded without padding.
    #[must_use]
    pub fn credential_id(&self) -> String {
        URL_SAFE_NO_PAD.encode(&self.credential_id)
    }

    /// The x coordinate as a 32-byte padded hex string.
    #[must_use]
    pub fn public_key_x(&self) -> String {
        to_padded_hex(self.public_key_x)
    }

    /// The y coordinate as a 32-byte padded hex string.
    #[must_use]
    pub fn public_key_y(&self) -> String {
        to_padded_hex(self.public_key_y)
    }
}

/// External credential-creation flow, implemented by the host application.
///
/// Runs the platform's passkey registration ceremony and returns the new
/// credential. The connector persists it before connecting.
#[uniffi::export(with_foreign)]
#[async_trait::async_trait]
pub trait EnrollmentPort: Send + Sync {
    /// Creates a new passkey for the relying party.
    async fn enroll(&self) -> Result<Arc<PasskeyCredential>, ConnectorError>;
}

/// Persisted layout of a passkey: `{credentialId, publicKeyX, publicKeyY}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PasskeyRecord {
    /// Base64url credential id.
    pub credential_id: String,
    /// Hex x coordinate.
    pub public_key_x: String,
    /// Hex y coordinate.
    pub public_key_y: String,
}

impl TryFrom<&PasskeyRecord> for PasskeyCredential {
    type Error = ConnectorError;

    fn try_from(record: &PasskeyRecord) -> Result<Self, Self::Error> {
        Self::from_encoded(
            &record.credential_id,
            &record.public_key_x,
            &record.public_key_y,
        )
    }
}
