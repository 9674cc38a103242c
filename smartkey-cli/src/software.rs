use std::sync::Arc;

use alloy_primitives::{Address, B256, U256};
use eyre::{Context as _, Result};
use p256::ecdsa::{signature::Signer as _, Signature, SigningKey};
use serde_json::json;
use smartkey_core::{
    account::Create2AccountFactory,
    signature::{Challenge, WebAuthnAssertion, DUMMY_AUTHENTICATOR_DATA},
    storage::{CredentialStore, InMemoryKeyValueStore},
    AssertionRequest, AuthenticatorPort, ConnectorError, EnrollmentPort, Environment,
    PasskeyCredential, SmartAccountConnector,
};

#[derive(Debug, clap::Args)]
pub struct SignArgs {
    /// P-256 private key standing in for the passkey (32-byte hex).
    #[arg(long, env = "SMARTKEY_PRIVATE_KEY", hide_env_values = true)]
    private_key: B256,

    /// User-operation hash to sign.
    #[arg(long)]
    hash: B256,

    /// Account factory address.
    #[arg(long, env = "SMARTKEY_FACTORY")]
    factory: Address,

    /// Deployment environment, which selects the chain.
    #[arg(long, default_value = "staging")]
    environment: String,
}

/// Authenticator that signs with an in-process key, the way a platform
/// authenticator would for `origin`.
struct SoftwareAuthenticator {
    key: SigningKey,
    origin: String,
}

#[async_trait::async_trait]
impl AuthenticatorPort for SoftwareAuthenticator {
    async fn get_assertion(
        &self,
        request: AssertionRequest,
    ) -> Result<Option<WebAuthnAssertion>, ConnectorError> {
        let challenge = B256::try_from(request.challenge.as_slice()).map_err(|_| {
            ConnectorError::InvalidInput {
                attribute: "challenge".to_string(),
                reason: "expected 32 bytes".to_string(),
            }
        })?;
        let client_data_json = format!(
            r#"{{"type":"webauthn.get","challenge":"{}","origin":"{}","crossOrigin":false}}"#,
            Challenge::new(challenge).to_base64url(),
            self.origin
        );
        let signature: Signature = self.key.sign(client_data_json.as_bytes());
        tracing::debug!(rp_id = %request.rp_id, "software authenticator signed");
        Ok(Some(WebAuthnAssertion {
            authenticator_data: DUMMY_AUTHENTICATOR_DATA.to_vec(),
            client_data_json,
            signature: signature.to_der().as_bytes().to_vec(),
        }))
    }
}

/// Enrollment that hands out the software key's credential.
struct SoftwareEnrollment {
    credential: Arc<PasskeyCredential>,
}

#[async_trait::async_trait]
impl EnrollmentPort for SoftwareEnrollment {
    async fn enroll(&self) -> Result<Arc<PasskeyCredential>, ConnectorError> {
        Ok(self.credential.clone())
    }
}

fn credential_for(key: &SigningKey) -> Result<PasskeyCredential> {
    let point = key.verifying_key().to_encoded_point(false);
    let (Some(x), Some(y)) = (point.x(), point.y()) else {
        eyre::bail!("public key is not an affine point");
    };
    Ok(PasskeyCredential::new(
        b"software".to_vec(),
        U256::from_be_slice(x),
        U256::from_be_slice(y),
    ))
}

impl SignArgs {
    pub async fn run(self) -> Result<()> {
        let environment: Environment = self
            .environment
            .parse()
            .wrap_err_with(|| format!("unknown environment {}", self.environment))?;
        let key = SigningKey::from_slice(self.private_key.as_slice())
            .wrap_err("invalid P-256 private key")?;
        let credential = Arc::new(credential_for(&key)?);

        let config = smartkey_core::ConnectorConfig::from_environment(&environment, self.factory);
        let connector = SmartAccountConnector::with_config(
            config.clone(),
            CredentialStore::new(Arc::new(InMemoryKeyValueStore::new())),
            Arc::new(SoftwareAuthenticator {
                key,
                origin: config.origin.clone(),
            }),
            Arc::new(SoftwareEnrollment { credential }),
            Arc::new(Create2AccountFactory::new(
                config.factory_address,
                config.account_implementation,
            )),
        );

        let connected = connector.connect(None, false).await?;
        let signature = connector.sign_user_operation_hash(self.hash.to_vec()).await?;

        let output = json!({
            "account": connected.accounts.first(),
            "chainId": connected.chain_id,
            "signature": signature.to_hex(),
        });
        println!("{}", serde_json::to_string_pretty(&output)?);
        Ok(())
    }
}
