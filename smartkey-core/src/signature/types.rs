use alloy_primitives::{eip191_hash_message, hex, Bytes, B256, U256};
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use serde::Deserialize;

use crate::error::ConnectorError;

/// A 32-byte value handed to the authenticator to be signed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Challenge(B256);

impl Challenge {
    /// Wraps raw challenge bytes.
    #[must_use]
    pub const fn new(bytes: B256) -> Self {
        Self(bytes)
    }

    /// Derives the challenge for a user-operation hash.
    ///
    /// The account verifies the EIP-191 personal-message hash of the 32 raw hash
    /// bytes, not the hash itself.
    #[must_use]
    pub fn for_user_operation(hash: B256) -> Self {
        Self(eip191_hash_message(hash))
    }

    /// All-zero challenge used when no real operation exists yet.
    #[must_use]
    pub const fn placeholder() -> Self {
        Self(B256::ZERO)
    }

    /// The raw 32 bytes.
    #[must_use]
    pub const fn as_b256(&self) -> &B256 {
        &self.0
    }

    /// Base64url encoding without padding, as it appears in `clientDataJSON`.
    #[must_use]
    pub fn to_base64url(&self) -> String {
        URL_SAFE_NO_PAD.encode(self.0)
    }
}

/// Assertion produced by the platform authenticator.
///
/// Consumed once by [`super::decode`] and then discarded.
#[derive(Debug, Clone, PartialEq, Eq, uniffi::Record)]
pub struct WebAuthnAssertion {
    /// Raw authenticator data.
    pub authenticator_data: Vec<u8>,
    /// The client data JSON exactly as the authenticator produced it.
    pub client_data_json: String,
    /// DER-encoded ECDSA `(r, s)` pair.
    pub signature: Vec<u8>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct AssertionResponseJson {
    authenticator_data: String,
    #[serde(rename = "clientDataJSON")]
    client_data_json: String,
    signature: String,
}

impl WebAuthnAssertion {
    /// Parses the `response` object of a `PublicKeyCredential` serialized as JSON,
    /// where every binary field is base64url.
    ///
    /// Accepts either the `response` object itself or the full credential with a
    /// nested `response`.
    ///
    /// # Errors
    /// Returns `ConnectorError::MalformedAssertion` if a field is missing or does not decode.
    pub fn from_response_json(json: &str) -> Result<Self, ConnectorError> {
        let value: serde_json::Value = serde_json::from_str(json)
            .map_err(|e| ConnectorError::malformed(format!("response json: {e}")))?;
        let response = value.get("response").cloned().unwrap_or(value);
        let response: AssertionResponseJson = serde_json::from_value(response)
            .map_err(|e| ConnectorError::malformed(format!("response json: {e}")))?;

        let decode = |field: &str, value: &str| {
            URL_SAFE_NO_PAD
                .decode(value.trim_end_matches('='))
                .map_err(|e| ConnectorError::malformed(format!("{field}: {e}")))
        };
        let client_data_json =
            String::from_utf8(decode("clientDataJSON", &response.client_data_json)?)
                .map_err(|e| ConnectorError::malformed(format!("clientDataJSON: {e}")))?;

        Ok(Self {
            authenticator_data: decode("authenticatorData", &response.authenticator_data)?,
            client_data_json,
            signature: decode("signature", &response.signature)?,
        })
    }
}

/// Decoded, malleability-corrected WebAuthn signature.
///
/// Invariant: `0 < s <= n/2` where `n` is the P-256 group order. This is the only
/// representation ever ABI-encoded for on-chain consumption.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CanonicalSignature {
    /// Raw authenticator data.
    pub authenticator_data: Bytes,
    /// The client data JSON.
    pub client_data_json: String,
    /// Byte offset of `"challenge":"` in `client_data_json`.
    pub challenge_index: U256,
    /// Byte offset of `"type":"` in `client_data_json`.
    pub type_index: U256,
    /// ECDSA `r`.
    pub r: U256,
    /// ECDSA `s`, in low-s form.
    pub s: U256,
}

/// Encoded signature ready for submission: `tag || abi.encode(WebAuthnAuth)`.
///
/// Only [`super::encode`] and the passkey signer create these.
#[derive(Debug, Clone, PartialEq, Eq, uniffi::Object)]
pub struct SignatureBlob(Bytes);

impl SignatureBlob {
    pub(crate) const fn new(bytes: Bytes) -> Self {
        Self(bytes)
    }

    /// The encoded bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

#[uniffi::export]
impl SignatureBlob {
    /// The encoded bytes, `0x`-prefixed hex.
    #[must_use]
    pub fn to_hex(&self) -> String {
        hex::encode_prefixed(&self.0)
    }

    /// The encoded bytes.
    #[must_use]
    pub fn to_bytes(&self) -> Vec<u8> {
        self.0.to_vec()
    }
}

/// Estimate-only signature with the shape of a real [`SignatureBlob`].
///
/// It authorizes nothing. It exists so gas can be estimated before the user is
/// prompted, and must only ever flow into read-only estimation calls.
#[derive(Debug, Clone, PartialEq, Eq, uniffi::Object)]
pub struct DummySignature(Bytes);

impl DummySignature {
    pub(crate) const fn new(bytes: Bytes) -> Self {
        Self(bytes)
    }

    /// The encoded bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

#[uniffi::export]
impl DummySignature {
    /// The encoded bytes, `0x`-prefixed hex.
    #[must_use]
    pub fn to_hex(&self) -> String {
        hex::encode_prefixed(&self.0)
    }
}
