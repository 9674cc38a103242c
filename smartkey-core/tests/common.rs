#![allow(dead_code)]

//! Fakes shared across integration tests.

use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc, Mutex,
};

use alloy_primitives::{address, Address, B256, U256};
use tokio::sync::Notify;
use p256::ecdsa::{signature::Signer, Signature, SigningKey};
use smartkey_core::{
    account::{AccountFactoryPort, Create2AccountFactory},
    signature::{normalize_s, Challenge, WebAuthnAssertion, DUMMY_AUTHENTICATOR_DATA, P256_N},
    storage::{CredentialStore, InMemoryKeyValueStore},
    AssertionRequest, AuthenticatorPort, ChangeEvent, ConnectResult, ConnectorConfig,
    ConnectorError, ConnectorEventListener, EnrollmentPort, Environment, PasskeyCredential,
    SmartAccountConnector, DEFAULT_ACCOUNT_IMPLEMENTATION,
};

pub const FACTORY: Address = address!("0x1111111111111111111111111111111111111111");

pub fn config() -> ConnectorConfig {
    ConnectorConfig::from_environment(&Environment::Staging, FACTORY)
}

pub fn expected_address(credential: &PasskeyCredential) -> String {
    Create2AccountFactory::new(FACTORY, DEFAULT_ACCOUNT_IMPLEMENTATION)
        .address_of(credential)
        .to_checksum(None)
}

/// How the scripted authenticator answers the next prompts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthenticatorMode {
    Sign { high_s: bool },
    Cancel,
    Garbage,
}

/// Authenticator backed by a real P-256 key.
pub struct ScriptedAuthenticator {
    key: SigningKey,
    origin: String,
    mode: Mutex<AuthenticatorMode>,
    calls: AtomicUsize,
    requests: Mutex<Vec<AssertionRequest>>,
}

impl ScriptedAuthenticator {
    pub fn new(seed: u8) -> Self {
        Self {
            key: SigningKey::from_slice(&[seed; 32]).expect("valid scalar"),
            origin: config().origin,
            mode: Mutex::new(AuthenticatorMode::Sign { high_s: false }),
            calls: AtomicUsize::new(0),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn set_mode(&self, mode: AuthenticatorMode) {
        *self.mode.lock().unwrap() = mode;
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn last_request(&self) -> Option<AssertionRequest> {
        self.requests.lock().unwrap().last().cloned()
    }

    pub fn key(&self) -> &SigningKey {
        &self.key
    }

    /// The credential this authenticator's key corresponds to.
    pub fn credential(&self, credential_id: &[u8]) -> PasskeyCredential {
        let point = self.key.verifying_key().to_encoded_point(false);
        PasskeyCredential::new(
            credential_id.to_vec(),
            U256::from_be_slice(point.x().expect("uncompressed")),
            U256::from_be_slice(point.y().expect("uncompressed")),
        )
    }

    pub fn client_data_json(&self, challenge: &[u8]) -> String {
        let challenge = Challenge::new(B256::from_slice(challenge));
        format!(
            r#"{{"type":"webauthn.get","challenge":"{}","origin":"{}","crossOrigin":false}}"#,
            challenge.to_base64url(),
            self.origin
        )
    }
}

#[async_trait::async_trait]
impl AuthenticatorPort for ScriptedAuthenticator {
    async fn get_assertion(
        &self,
        request: AssertionRequest,
    ) -> Result<Option<WebAuthnAssertion>, ConnectorError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.requests.lock().unwrap().push(request.clone());

        let mode = *self.mode.lock().unwrap();
        let high_s = match mode {
            AuthenticatorMode::Cancel => return Ok(None),
            AuthenticatorMode::Garbage => {
                return Ok(Some(WebAuthnAssertion {
                    authenticator_data: DUMMY_AUTHENTICATOR_DATA.to_vec(),
                    client_data_json: "{}".to_string(),
                    signature: vec![0x30, 0x00],
                }))
            }
            AuthenticatorMode::Sign { high_s } => high_s,
        };

        let client_data_json = self.client_data_json(&request.challenge);
        let signature: Signature = self.key.sign(client_data_json.as_bytes());
        let (r, s) = signature.split_bytes();
        let low = normalize_s(U256::from_be_slice(&s));
        let s = if high_s { P256_N - low } else { low };
        let signature = Signature::from_scalars(r, s.to_be_bytes::<32>()).expect("valid scalars");

        Ok(Some(WebAuthnAssertion {
            authenticator_data: DUMMY_AUTHENTICATOR_DATA.to_vec(),
            client_data_json,
            signature: signature.to_der().as_bytes().to_vec(),
        }))
    }
}

/// Enrollment flow that hands out a fixed credential, or fails when it has none.
///
/// A gated enrollment parks after signalling `started` until `release` is called.
pub struct CountingEnrollment {
    credential: Option<Arc<PasskeyCredential>>,
    calls: AtomicUsize,
    gate: Option<(Notify, Notify)>,
}

impl CountingEnrollment {
    pub fn returning(credential: PasskeyCredential) -> Self {
        Self {
            credential: Some(Arc::new(credential)),
            calls: AtomicUsize::new(0),
            gate: None,
        }
    }

    pub fn gated(credential: PasskeyCredential) -> Self {
        Self {
            gate: Some((Notify::new(), Notify::new())),
            ..Self::returning(credential)
        }
    }

    pub fn failing() -> Self {
        Self {
            credential: None,
            calls: AtomicUsize::new(0),
            gate: None,
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub async fn started(&self) {
        if let Some((started, _)) = &self.gate {
            started.notified().await;
        }
    }

    pub fn release(&self) {
        if let Some((_, release)) = &self.gate {
            release.notify_one();
        }
    }
}

#[async_trait::async_trait]
impl EnrollmentPort for CountingEnrollment {
    async fn enroll(&self) -> Result<Arc<PasskeyCredential>, ConnectorError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some((started, release)) = &self.gate {
            started.notify_one();
            release.notified().await;
        }
        tokio::task::yield_now().await;
        self.credential
            .clone()
            .ok_or_else(|| ConnectorError::EnrollmentFailed {
                reason: "user dismissed registration".to_string(),
            })
    }
}

/// Factory port that always fails.
pub struct FailingFactory;

#[async_trait::async_trait]
impl AccountFactoryPort for FailingFactory {
    async fn account_address(
        &self,
        _credential: Arc<PasskeyCredential>,
    ) -> Result<String, ConnectorError> {
        Err(ConnectorError::UnexpectedUniFFICallbackError(
            "rpc unreachable".to_string(),
        ))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    Connect(ConnectResult),
    Change(ChangeEvent),
    Disconnect,
}

#[derive(Default)]
pub struct RecordingListener {
    events: Mutex<Vec<Event>>,
}

impl RecordingListener {
    pub fn events(&self) -> Vec<Event> {
        self.events.lock().unwrap().clone()
    }
}

impl ConnectorEventListener for RecordingListener {
    fn on_connect(&self, result: ConnectResult) {
        self.events.lock().unwrap().push(Event::Connect(result));
    }

    fn on_change(&self, event: ChangeEvent) {
        self.events.lock().unwrap().push(Event::Change(event));
    }

    fn on_disconnect(&self) {
        self.events.lock().unwrap().push(Event::Disconnect);
    }
}

/// A connector wired to fakes, plus handles on each of them.
pub struct Harness {
    pub connector: SmartAccountConnector,
    pub backend: Arc<InMemoryKeyValueStore>,
    pub authenticator: Arc<ScriptedAuthenticator>,
    pub enrollment: Arc<CountingEnrollment>,
    pub listener: Arc<RecordingListener>,
}

impl Harness {
    pub fn new(enrollment: CountingEnrollment) -> Self {
        Self::with_factory(
            enrollment,
            Arc::new(Create2AccountFactory::new(
                FACTORY,
                DEFAULT_ACCOUNT_IMPLEMENTATION,
            )),
        )
    }

    pub fn with_factory(
        enrollment: CountingEnrollment,
        factory: Arc<dyn AccountFactoryPort>,
    ) -> Self {
        let backend = Arc::new(InMemoryKeyValueStore::new());
        let authenticator = Arc::new(ScriptedAuthenticator::new(7));
        let enrollment = Arc::new(enrollment);
        let listener = Arc::new(RecordingListener::default());
        let connector = SmartAccountConnector::with_config(
            config(),
            CredentialStore::new(backend.clone()),
            authenticator.clone(),
            enrollment.clone(),
            factory,
        );
        connector.set_listener(listener.clone());
        Self {
            connector,
            backend,
            authenticator,
            enrollment,
            listener,
        }
    }

    pub fn store(&self) -> CredentialStore {
        CredentialStore::new(self.backend.clone())
    }
}
