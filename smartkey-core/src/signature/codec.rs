//! Decoding of WebAuthn assertions and encoding of the on-chain signature blob.
//!
//! The verifying contract does not parse `clientDataJSON`. It receives the byte
//! offsets of the `"type":"` and `"challenge":"` members and checks the bytes found
//! there, so the offsets must come from a literal substring search over the exact
//! bytes the authenticator signed.

use alloy_core::sol_types::SolValue;
use alloy_primitives::{Bytes, U256};
use p256::ecdsa::Signature;
use ruint::uint;

use super::types::{CanonicalSignature, SignatureBlob, WebAuthnAssertion};
use crate::error::ConnectorError;

alloy_core::sol! {
    /// WebAuthn authentication payload checked by the account's P-256 verifier.
    #[derive(Debug, PartialEq, Eq)]
    struct WebAuthnAuth {
        bytes authenticatorData;
        string clientDataJSON;
        uint256 challengeIndex;
        uint256 typeIndex;
        uint256 r;
        uint256 s;
    }
}

/// Signature type prefix for "owner index 0 / WebAuthn".
pub const WEBAUTHN_SIGNATURE_TAG: u8 = 0;

/// Literal the verifier expects at `typeIndex`.
pub const TYPE_MARKER: &str = "\"type\":\"";

/// Literal the verifier expects at `challengeIndex`.
pub const CHALLENGE_MARKER: &str = "\"challenge\":\"";

/// Order of the P-256 group.
pub const P256_N: U256 =
    uint!(0xffffffff00000000ffffffffffffffffbce6faada7179e84f3b9cac2fc632551_U256);

/// `floor(n / 2)`: the largest `s` the verifier accepts.
pub const P256_HALF_N: U256 =
    uint!(0x7fffffff800000007fffffffffffffffde737d56d38bcf4279dce5617e3192a8_U256);

/// Byte offset of `"type":"` in `client_data_json`.
#[must_use]
pub fn find_type_index(client_data_json: &str) -> Option<usize> {
    client_data_json.find(TYPE_MARKER)
}

/// Byte offset of `"challenge":"` in `client_data_json`.
#[must_use]
pub fn find_challenge_index(client_data_json: &str) -> Option<usize> {
    client_data_json.find(CHALLENGE_MARKER)
}

/// Maps `s` to its low form: `n - s` when `s > n/2`, otherwise `s` unchanged.
///
/// Either root of a valid ECDSA pair verifies off-chain; the account only accepts
/// the low one so each logical signature has a single wire encoding.
#[must_use]
pub fn normalize_s(s: U256) -> U256 {
    if s > P256_HALF_N {
        P256_N - s
    } else {
        s
    }
}

/// Decodes an assertion into its canonical signature.
///
/// # Errors
/// Returns `ConnectorError::MalformedAssertion` if the DER signature is not a
/// SEQUENCE of two in-range integers, or if `clientDataJSON` lacks the
/// `"type":"` or `"challenge":"` literals.
pub fn decode(assertion: &WebAuthnAssertion) -> Result<CanonicalSignature, ConnectorError> {
    let client_data_json = assertion.client_data_json.as_str();
    let type_index = find_type_index(client_data_json)
        .ok_or_else(|| ConnectorError::malformed("clientDataJSON has no \"type\" member"))?;
    let challenge_index = find_challenge_index(client_data_json).ok_or_else(|| {
        ConnectorError::malformed("clientDataJSON has no \"challenge\" member")
    })?;

    let signature = Signature::from_der(&assertion.signature)
        .map_err(|e| ConnectorError::malformed(format!("der signature: {e}")))?;
    let (r, s) = signature.split_bytes();
    let s = U256::from_be_slice(&s);
    let canonical_s = normalize_s(s);
    if canonical_s != s {
        log::debug!("normalized high-s assertion signature");
    }

    Ok(CanonicalSignature {
        authenticator_data: Bytes::copy_from_slice(&assertion.authenticator_data),
        client_data_json: assertion.client_data_json.clone(),
        challenge_index: U256::from(challenge_index),
        type_index: U256::from(type_index),
        r: U256::from_be_slice(&r),
        s: canonical_s,
    })
}

/// Encodes a canonical signature as `WEBAUTHN_SIGNATURE_TAG || abi.encode(WebAuthnAuth)`.
///
/// The tuple order `(authenticatorData, clientDataJSON, challengeIndex, typeIndex, r, s)`
/// and the tag are fixed by the verifying contract.
#[must_use]
pub fn encode(signature: &CanonicalSignature) -> SignatureBlob {
    SignatureBlob::new(encode_auth(&WebAuthnAuth::from(signature)))
}

pub(super) fn encode_auth(auth: &WebAuthnAuth) -> Bytes {
    let encoded = auth.abi_encode();
    let mut out = Vec::with_capacity(1 + encoded.len());
    out.push(WEBAUTHN_SIGNATURE_TAG);
    out.extend_from_slice(&encoded);
    out.into()
}

impl From<&CanonicalSignature> for WebAuthnAuth {
    fn from(signature: &CanonicalSignature) -> Self {
        Self {
            authenticatorData: signature.authenticator_data.clone(),
            clientDataJSON: signature.client_data_json.clone(),
            challengeIndex: signature.challenge_index,
            typeIndex: signature.type_index,
            r: signature.r,
            s: signature.s,
        }
    }
}

#[cfg(test)]
mod tests {
    use p256::ecdsa::{signature::Signer, SigningKey};
    use rand::rngs::OsRng;
    use test_case::test_case;

    use super::*;

    const CLIENT_DATA: &str = r#"{"type":"webauthn.get","challenge":"3q2-7w","origin":"https://web.exactly.app","crossOrigin":false}"#;

    fn signature_with_s(key: &SigningKey, message: &[u8], high: bool) -> Vec<u8> {
        let signature: Signature = key.sign(message);
        let (r, s) = signature.split_bytes();
        let low = normalize_s(U256::from_be_slice(&s));
        let s = if high { P256_N - low } else { low };
        Signature::from_scalars(r, s.to_be_bytes::<32>())
            .expect("valid scalars")
            .to_der()
            .as_bytes()
            .to_vec()
    }

    fn assertion(signature: Vec<u8>, client_data_json: &str) -> WebAuthnAssertion {
        WebAuthnAssertion {
            authenticator_data: vec![0x49; 37],
            client_data_json: client_data_json.to_string(),
            signature,
        }
    }

    #[test]
    fn test_half_order_constant() {
        assert_eq!(P256_HALF_N, P256_N >> 1usize);
    }

    #[test]
    fn test_decoded_s_is_always_low() {
        for _ in 0..16 {
            let key = SigningKey::random(&mut OsRng);
            for high in [false, true] {
                let decoded =
                    decode(&assertion(signature_with_s(&key, b"op", high), CLIENT_DATA))
                        .unwrap();
                assert!(decoded.s <= P256_HALF_N);
                assert!(decoded.s > U256::ZERO);
            }
        }
    }

    #[test]
    fn test_conjugate_signatures_decode_to_same_s() {
        let key = SigningKey::from_slice(&[7u8; 32]).unwrap();
        let low = decode(&assertion(signature_with_s(&key, b"op", false), CLIENT_DATA))
            .unwrap();
        let high = decode(&assertion(signature_with_s(&key, b"op", true), CLIENT_DATA))
            .unwrap();
        assert_eq!(low, high);
    }

    #[test]
    fn test_normalize_s_boundaries() {
        assert_eq!(normalize_s(P256_HALF_N), P256_HALF_N);
        assert_eq!(normalize_s(P256_HALF_N + U256::from(1)), P256_HALF_N);
        assert_eq!(normalize_s(P256_N - U256::from(1)), U256::from(1));
        assert_eq!(normalize_s(U256::from(1)), U256::from(1));
    }

    #[test_case(r#"{"type":"webauthn.get","challenge":"AAAA","origin":"x"}"#, 1, 23 ; "type first")]
    #[test_case(r#"{"challenge":"AAAA","type":"webauthn.get","origin":"x"}"#, 20, 1 ; "challenge first")]
    #[test_case(r#"{"origin":"é","type":"webauthn.get","challenge":"AAAA"}"#, 15, 37 ; "multibyte prefix")]
    fn test_offsets_point_at_literals(json: &str, type_index: usize, challenge_index: usize) {
        let key = SigningKey::from_slice(&[9u8; 32]).unwrap();
        let decoded = decode(&assertion(signature_with_s(&key, b"op", false), json)).unwrap();
        assert_eq!(decoded.type_index, U256::from(type_index));
        assert_eq!(decoded.challenge_index, U256::from(challenge_index));
        assert!(json.as_bytes()[type_index..].starts_with(TYPE_MARKER.as_bytes()));
        assert!(json.as_bytes()[challenge_index..].starts_with(CHALLENGE_MARKER.as_bytes()));
    }

    #[test_case(r#"{"challenge":"AAAA"}"# ; "missing type")]
    #[test_case(r#"{"type":"webauthn.get"}"# ; "missing challenge")]
    #[test_case(r#"{"type": "webauthn.get", "challenge": "AAAA"}"# ; "spaced members")]
    fn test_client_data_without_literals_is_malformed(json: &str) {
        let key = SigningKey::from_slice(&[9u8; 32]).unwrap();
        assert!(matches!(
            decode(&assertion(signature_with_s(&key, b"op", false), json)),
            Err(ConnectorError::MalformedAssertion { .. })
        ));
    }

    #[test_case(vec![] ; "empty")]
    #[test_case(vec![0x30, 0x02, 0x02, 0x00] ; "truncated sequence")]
    #[test_case(vec![0x04, 0x20, 0x01] ; "not a sequence")]
    #[test_case(vec![0x30, 0x06, 0x02, 0x01, 0x00, 0x02, 0x01, 0x01] ; "zero r")]
    fn test_bad_der_is_malformed(signature: Vec<u8>) {
        assert!(matches!(
            decode(&assertion(signature, CLIENT_DATA)),
            Err(ConnectorError::MalformedAssertion { .. })
        ));
    }

    #[test]
    fn test_encode_layout() {
        let key = SigningKey::from_slice(&[3u8; 32]).unwrap();
        let decoded =
            decode(&assertion(signature_with_s(&key, b"op", true), CLIENT_DATA)).unwrap();
        let blob = encode(&decoded);
        let bytes = blob.as_bytes();

        assert_eq!(bytes[0], WEBAUTHN_SIGNATURE_TAG);
        // single dynamic tuple: head word is the offset to the tuple body
        assert_eq!(U256::from_be_slice(&bytes[1..33]), U256::from(0x20));

        let auth = <WebAuthnAuth as SolValue>::abi_decode(&bytes[1..]).unwrap();
        assert_eq!(auth.authenticatorData, decoded.authenticator_data);
        assert_eq!(auth.clientDataJSON, CLIENT_DATA);
        assert_eq!(auth.challengeIndex, U256::from(23));
        assert_eq!(auth.typeIndex, U256::from(1));
        assert_eq!(auth.r, decoded.r);
        assert_eq!(auth.s, decoded.s);
        assert_eq!((bytes.len() - 1) % 32, 0);
    }

    #[test]
    fn test_encode_is_deterministic() {
        let key = SigningKey::from_slice(&[5u8; 32]).unwrap();
        let decoded =
            decode(&assertion(signature_with_s(&key, b"op", false), CLIENT_DATA)).unwrap();
        assert_eq!(encode(&decoded), encode(&decoded.clone()));
        assert_eq!(encode(&decoded).to_hex(), encode(&decoded).to_hex());
    }
}
