//! Signature pipeline: from a raw WebAuthn assertion to the blob a smart account verifies.
//!
//! ```text
//! WebAuthnAssertion --decode--> CanonicalSignature --encode--> SignatureBlob
//!                                                    DummySignatureGenerator --> DummySignature
//! ```
//!
//! [`SignatureBlob`] and [`DummySignature`] are distinct types. Only the
//! former is ever produced by a real authenticator assertion, and there is no
//! conversion from one into the other.

mod codec;
mod dummy;
mod types;

pub use codec::{
    decode, encode, find_challenge_index, find_type_index, normalize_s, WebAuthnAuth,
    CHALLENGE_MARKER, P256_HALF_N, P256_N, TYPE_MARKER, WEBAUTHN_SIGNATURE_TAG,
};
pub use dummy::{DummySignatureGenerator, DUMMY_AUTHENTICATOR_DATA};
pub use types::{CanonicalSignature, Challenge, DummySignature, SignatureBlob, WebAuthnAssertion};
