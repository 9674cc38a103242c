//! Obtains assertions from the platform authenticator and turns them into signature blobs.

use std::sync::Arc;

use alloy_primitives::B256;
use tokio::sync::Mutex;

use crate::{
    config::{ConnectorConfig, UserVerification},
    credential::PasskeyCredential,
    error::ConnectorError,
    signature::{self, Challenge, SignatureBlob, WebAuthnAssertion},
};

/// Request for a single WebAuthn assertion.
#[derive(Debug, Clone, PartialEq, Eq, uniffi::Record)]
pub struct AssertionRequest {
    /// Relying party identifier.
    pub rp_id: String,
    /// The 32 challenge bytes to sign.
    pub challenge: Vec<u8>,
    /// Credential ids the authenticator may use. Empty lets it pick any
    /// discoverable credential for the relying party.
    pub allow_credentials: Vec<Vec<u8>>,
    /// User verification requirement.
    pub user_verification: UserVerification,
}

/// The platform authenticator, implemented by the host application.
///
/// Implementations resolve `Ok(None)` when the user cancels the prompt or no
/// matching credential exists.
#[uniffi::export(with_foreign)]
#[async_trait::async_trait]
pub trait AuthenticatorPort: Send + Sync {
    /// Prompts the user and returns the resulting assertion.
    async fn get_assertion(
        &self,
        request: AssertionRequest,
    ) -> Result<Option<WebAuthnAssertion>, ConnectorError>;
}

/// Signs challenges with the enrolled passkey.
///
/// At most one authenticator prompt is outstanding per signer; concurrent
/// callers wait their turn.
pub struct PasskeySigner {
    authenticator: Arc<dyn AuthenticatorPort>,
    rp_id: String,
    user_verification: UserVerification,
    filter_allowed_credentials: bool,
    prompt: Mutex<()>,
}

impl std::fmt::Debug for PasskeySigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PasskeySigner")
            .field("rp_id", &self.rp_id)
            .field("user_verification", &self.user_verification)
            .field("filter_allowed_credentials", &self.filter_allowed_credentials)
            .finish_non_exhaustive()
    }
}

impl PasskeySigner {
    /// Creates a signer for the relying party in `config`.
    #[must_use]
    pub fn new(authenticator: Arc<dyn AuthenticatorPort>, config: &ConnectorConfig) -> Self {
        Self {
            authenticator,
            rp_id: config.rp_id.clone(),
            user_verification: config.user_verification,
            filter_allowed_credentials: config.filter_allowed_credentials,
            prompt: Mutex::new(()),
        }
    }

    /// Builds the assertion request for `challenge`.
    #[must_use]
    pub fn assertion_request(
        &self,
        challenge: &Challenge,
        credential: &PasskeyCredential,
    ) -> AssertionRequest {
        let allow_credentials = if self.filter_allowed_credentials {
            vec![credential.credential_id_bytes().to_vec()]
        } else {
            Vec::new()
        };
        AssertionRequest {
            rp_id: self.rp_id.clone(),
            challenge: challenge.as_b256().to_vec(),
            allow_credentials,
            user_verification: self.user_verification,
        }
    }

    /// Asks the authenticator to sign `challenge` and encodes the result.
    ///
    /// # Errors
    /// - `ConnectorError::NoAssertion` when the user cancels or no credential matches.
    /// - `ConnectorError::MalformedAssertion` when the assertion does not decode.
    /// - Any error the authenticator itself reports.
    pub async fn sign(
        &self,
        challenge: &Challenge,
        credential: &PasskeyCredential,
    ) -> Result<SignatureBlob, ConnectorError> {
        let request = self.assertion_request(challenge, credential);
        let assertion = {
            let _prompt = self.prompt.lock().await;
            self.authenticator.get_assertion(request).await?
        };
        let Some(assertion) = assertion else {
            log::info!("authenticator returned no assertion");
            return Err(ConnectorError::NoAssertion);
        };
        Ok(signature::encode(&signature::decode(&assertion)?))
    }

    /// Signs a user-operation hash.
    ///
    /// # Errors
    /// See [`PasskeySigner::sign`].
    pub async fn sign_user_operation_hash(
        &self,
        hash: B256,
        credential: &PasskeyCredential,
    ) -> Result<SignatureBlob, ConnectorError> {
        log::debug!("signing user operation {hash}");
        self.sign(&Challenge::for_user_operation(hash), credential)
            .await
    }
}

/// Adapts an authenticator that hands back `PublicKeyCredential` JSON.
///
/// Browsers and most mobile passkey libraries serialize assertions with
/// base64url binary fields. This helper parses that shape so hosts do not have to.
///
/// # Errors
/// Returns `ConnectorError::MalformedAssertion` if the JSON does not decode.
#[uniffi::export]
pub fn assertion_from_json(json: &str) -> Result<WebAuthnAssertion, ConnectorError> {
    WebAuthnAssertion::from_response_json(json)
}
