use alloy_primitives::{hex, Bytes, U256};

use super::{
    codec::{encode_auth, find_challenge_index, find_type_index, WebAuthnAuth, P256_HALF_N},
    types::{Challenge, DummySignature},
};

/// Authenticator data of a real platform assertion: rpIdHash, UP|UV flags, zero counter.
pub const DUMMY_AUTHENTICATOR_DATA: [u8; 37] =
    hex!("49960de5880e8c687434170f6476605b8fe4aeb9a28632c7995cf3ba831d97630500000000");

/// Produces estimate-only signatures shaped like real ones.
///
/// The blob carries realistic authenticator data, a `clientDataJSON` with the same
/// member layout a browser emits, `r = 2^256 - 1` and `s = n/2`, so it ABI-encodes
/// to the same length as a real signature for the same origin.
#[derive(Debug, Clone)]
pub struct DummySignatureGenerator {
    origin: String,
}

impl DummySignatureGenerator {
    /// Creates a generator for assertions issued to `origin`.
    #[must_use]
    pub fn new(origin: impl Into<String>) -> Self {
        Self {
            origin: origin.into(),
        }
    }

    /// Returns the fixed dummy blob built around the placeholder challenge.
    #[must_use]
    pub fn generate(&self) -> DummySignature {
        self.generate_for(&Challenge::placeholder())
    }

    /// Returns a dummy blob whose `clientDataJSON` embeds `challenge`.
    #[must_use]
    pub fn generate_for(&self, challenge: &Challenge) -> DummySignature {
        // origin is serialized as a JSON string, the way browsers write it
        let origin = serde_json::Value::String(self.origin.clone());
        let client_data_json = format!(
            r#"{{"type":"webauthn.get","challenge":"{}","origin":{origin},"crossOrigin":false}}"#,
            challenge.to_base64url(),
        );
        // both literals are part of the template above
        let type_index = find_type_index(&client_data_json).unwrap_or_default();
        let challenge_index = find_challenge_index(&client_data_json).unwrap_or_default();

        DummySignature::new(encode_auth(&WebAuthnAuth {
            authenticatorData: Bytes::from_static(&DUMMY_AUTHENTICATOR_DATA),
            clientDataJSON: client_data_json,
            challengeIndex: U256::from(challenge_index),
            typeIndex: U256::from(type_index),
            r: U256::MAX,
            s: P256_HALF_N,
        }))
    }
}
