use thiserror::Error;

use crate::storage::StorageError;

/// Error outputs from the connector and its signing pipeline.
#[derive(Debug, Error, uniffi::Error)]
pub enum ConnectorError {
    /// No passkey is enrolled for this user; enrollment is required.
    #[error("no_credential")]
    NoCredential,
    /// The authenticator returned no assertion (user cancelled or no matching credential).
    #[error("no_assertion")]
    NoAssertion,
    /// The assertion could not be decoded into a canonical signature.
    #[error("malformed_assertion: {reason}")]
    MalformedAssertion {
        /// What was wrong with the assertion.
        reason: String,
    },
    /// The requested chain is not the single chain this connector serves.
    #[error("unsupported_chain: {chain_id}")]
    UnsupportedChain {
        /// The chain id that was requested.
        chain_id: u64,
    },
    /// The account factory could not derive the smart account address.
    #[error("account_derivation_failed: {reason}")]
    AccountDerivationFailed {
        /// Failure reported by the factory.
        reason: String,
    },
    /// The external enrollment flow failed to produce a credential.
    #[error("enrollment_failed: {reason}")]
    EnrollmentFailed {
        /// Failure reported by the enrollment flow.
        reason: String,
    },
    /// A pending `connect` was overtaken by a `disconnect`.
    #[error("connection_aborted")]
    ConnectionAborted,
    /// The presented input is not valid for the requested operation.
    #[error("invalid_input_{attribute}: {reason}")]
    InvalidInput {
        /// The attribute that is invalid.
        attribute: String,
        /// Why it is invalid.
        reason: String,
    },
    /// The credential store failed.
    #[error("storage_error: {reason}")]
    Storage {
        /// Underlying storage failure.
        reason: String,
    },
    /// A foreign callback failed unexpectedly.
    #[error("unexpected_uniffi_callback_error: {0}")]
    UnexpectedUniFFICallbackError(String),
}

impl ConnectorError {
    pub(crate) fn malformed(reason: impl Into<String>) -> Self {
        Self::MalformedAssertion {
            reason: reason.into(),
        }
    }
}

impl From<StorageError> for ConnectorError {
    fn from(error: StorageError) -> Self {
        Self::Storage {
            reason: error.to_string(),
        }
    }
}

impl From<uniffi::UnexpectedUniFFICallbackError> for ConnectorError {
    fn from(error: uniffi::UnexpectedUniFFICallbackError) -> Self {
        Self::UnexpectedUniFFICallbackError(error.reason)
    }
}
