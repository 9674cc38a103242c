use std::{
    str::FromStr,
    sync::{Arc, PoisonError, RwLock},
};

use alloy_primitives::Address;
use tokio::sync::Mutex;

use crate::{
    account::{AccountClient, AccountFactoryPort, Create2AccountFactory},
    config::ConnectorConfig,
    credential::{EnrollmentPort, PasskeyCredential},
    error::ConnectorError,
    primitives::{parse_hash_bytes, ParseFromForeignBinding},
    session::{AccountSessionStateMachine, ConnectStart, Session, SessionTransition},
    signature::{Challenge, DummySignature, DummySignatureGenerator, SignatureBlob},
    signer::{AuthenticatorPort, PasskeySigner},
    storage::{CredentialStore, KeyValueStore},
    Environment,
};

/// Result of a successful `connect`, also delivered to `on_connect`.
#[derive(Debug, Clone, PartialEq, Eq, uniffi::Record)]
pub struct ConnectResult {
    /// Checksummed account addresses. Always exactly one.
    pub accounts: Vec<String>,
    /// The connected chain.
    pub chain_id: u64,
}

/// Payload of a `change` event. Exactly one field is set.
#[derive(Debug, Clone, PartialEq, Eq, uniffi::Record)]
pub struct ChangeEvent {
    /// New checksummed account list.
    pub accounts: Option<Vec<String>>,
    /// New chain.
    pub chain_id: Option<u64>,
}

/// Receives connection lifecycle events.
///
/// Callbacks run on the task that caused the transition, after the new state is
/// committed. They must not call back into the connector synchronously.
#[uniffi::export(with_foreign)]
pub trait ConnectorEventListener: Send + Sync {
    /// A session was established.
    fn on_connect(&self, result: ConnectResult);
    /// The account list or chain changed.
    fn on_change(&self, event: ChangeEvent);
    /// The session ended.
    fn on_disconnect(&self);
}

/// What the host should talk to for chain access.
#[derive(uniffi::Enum)]
pub enum Provider {
    /// The connected account's client.
    Account {
        /// The active account client.
        client: Arc<AccountClient>,
    },
    /// No session; fall back to a read-only client for the chain.
    ReadOnly {
        /// The chain the read-only client must target.
        chain_id: u64,
    },
}

/// Wallet connector backed by a passkey-owned smart account.
///
/// Serves exactly one chain. At most one `connect` or `setup` runs at a time; the
/// session state is only locked for the duration of each transition.
#[derive(uniffi::Object)]
pub struct SmartAccountConnector {
    config: ConnectorConfig,
    store: CredentialStore,
    signer: Arc<PasskeySigner>,
    enrollment: Arc<dyn EnrollmentPort>,
    factory: Arc<dyn AccountFactoryPort>,
    dummy: DummySignatureGenerator,
    state: Mutex<AccountSessionStateMachine>,
    connecting: Mutex<()>,
    listener: RwLock<Option<Arc<dyn ConnectorEventListener>>>,
}

impl SmartAccountConnector {
    /// Builds a connector from already-typed parts.
    #[must_use]
    pub fn with_config(
        config: ConnectorConfig,
        store: CredentialStore,
        authenticator: Arc<dyn AuthenticatorPort>,
        enrollment: Arc<dyn EnrollmentPort>,
        factory: Arc<dyn AccountFactoryPort>,
    ) -> Self {
        Self {
            signer: Arc::new(PasskeySigner::new(authenticator, &config)),
            dummy: DummySignatureGenerator::new(config.origin.clone()),
            state: Mutex::new(AccountSessionStateMachine::new(&config)),
            connecting: Mutex::new(()),
            listener: RwLock::new(None),
            config,
            store,
            enrollment,
            factory,
        }
    }

    /// The connector configuration.
    #[must_use]
    pub const fn config(&self) -> &ConnectorConfig {
        &self.config
    }

    /// The active session, if any.
    pub async fn session(&self) -> Option<Session> {
        self.state.lock().await.session().cloned()
    }

    async fn enroll(&self) -> Result<Arc<PasskeyCredential>, ConnectorError> {
        log::info!("no stored passkey, starting enrollment");
        let credential = self.enrollment.enroll().await?;
        self.store.save(&credential)?;
        Ok(credential)
    }

    async fn open_session(
        &self,
        credential: Arc<PasskeyCredential>,
    ) -> Result<Session, ConnectorError> {
        let derivation_failed = |reason: String| ConnectorError::AccountDerivationFailed { reason };
        let address = self
            .factory
            .account_address(credential.clone())
            .await
            .map_err(|e| match e {
                ConnectorError::AccountDerivationFailed { .. } => e,
                other => derivation_failed(other.to_string()),
            })?;
        let address =
            Address::from_str(address.trim()).map_err(|e| derivation_failed(e.to_string()))?;

        let client = AccountClient::new(
            address,
            self.config.chain_id,
            self.config.factory_address,
            credential,
            self.signer.clone(),
            self.dummy.clone(),
        );
        Ok(Session {
            address,
            chain_id: self.config.chain_id,
            client: Arc::new(client),
        })
    }

    /// Loads or enrolls the credential and derives the session, with the state unlocked.
    async fn establish(&self, allow_enrollment: bool) -> Result<Session, ConnectorError> {
        let credential = match self.store.load()? {
            Some(credential) => credential,
            None if allow_enrollment => self.enroll().await?,
            None => return Err(ConnectorError::NoCredential),
        };
        self.open_session(credential).await
    }

    async fn finish_connect(
        &self,
        outcome: Result<Session, ConnectorError>,
    ) -> Result<Session, ConnectorError> {
        let mut machine = self.state.lock().await;
        match outcome {
            Ok(session) => {
                let transition = machine.complete_connect(session.clone())?;
                drop(machine);
                log::info!("connected account {}", session.address);
                self.emit(transition);
                Ok(session)
            }
            Err(error) => {
                machine.fail_connect();
                log::warn!("connect failed: {error}");
                Err(error)
            }
        }
    }

    fn emit(&self, transition: SessionTransition) {
        let listener = self
            .listener
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        let Some(listener) = listener else {
            return;
        };
        match transition {
            SessionTransition::Unchanged => {}
            SessionTransition::Connected(session) => listener.on_connect(connect_result(&session)),
            SessionTransition::AccountsChanged(accounts) => listener.on_change(ChangeEvent {
                accounts: Some(accounts.iter().map(|a| a.to_checksum(None)).collect()),
                chain_id: None,
            }),
            SessionTransition::ChainChanged(chain_id) => listener.on_change(ChangeEvent {
                accounts: None,
                chain_id: Some(chain_id),
            }),
            SessionTransition::Disconnected => listener.on_disconnect(),
        }
    }

    async fn credential_for_signing(&self) -> Result<Arc<PasskeyCredential>, ConnectorError> {
        if let Some(session) = self.state.lock().await.session() {
            return Ok(Arc::new(session.client.credential().clone()));
        }
        self.store.load()?.ok_or(ConnectorError::NoCredential)
    }
}

fn connect_result(session: &Session) -> ConnectResult {
    ConnectResult {
        accounts: vec![session.address.to_checksum(None)],
        chain_id: session.chain_id,
    }
}

#[uniffi::export(async_runtime = "tokio")]
impl SmartAccountConnector {
    /// Creates a connector from a JSON [`ConnectorConfig`].
    ///
    /// # Errors
    /// Returns `ConnectorError::InvalidInput` if the config does not parse.
    #[uniffi::constructor]
    pub fn new(
        config: &str,
        store: Arc<dyn KeyValueStore>,
        authenticator: Arc<dyn AuthenticatorPort>,
        enrollment: Arc<dyn EnrollmentPort>,
        factory: Arc<dyn AccountFactoryPort>,
    ) -> Result<Self, ConnectorError> {
        let config = ConnectorConfig::from_json(config)?;
        Ok(Self::with_config(
            config,
            CredentialStore::new(store),
            authenticator,
            enrollment,
            factory,
        ))
    }

    /// Creates a connector with the defaults for `environment`, deriving account
    /// addresses locally from the factory's CREATE2 rule.
    ///
    /// # Errors
    /// Returns `ConnectorError::InvalidInput` if `factory_address` does not parse.
    #[uniffi::constructor]
    pub fn new_with_defaults(
        environment: &Environment,
        factory_address: &str,
        store: Arc<dyn KeyValueStore>,
        authenticator: Arc<dyn AuthenticatorPort>,
        enrollment: Arc<dyn EnrollmentPort>,
    ) -> Result<Self, ConnectorError> {
        let factory_address = Address::parse_from_ffi(factory_address, "factory_address")?;
        let config = ConnectorConfig::from_environment(environment, factory_address);
        let factory = Arc::new(Create2AccountFactory::new(
            config.factory_address,
            config.account_implementation,
        ));
        Ok(Self::with_config(
            config,
            CredentialStore::new(store),
            authenticator,
            enrollment,
            factory,
        ))
    }

    /// Registers the listener for lifecycle events, replacing any previous one.
    pub fn set_listener(&self, listener: Arc<dyn ConnectorEventListener>) {
        *self
            .listener
            .write()
            .unwrap_or_else(PoisonError::into_inner) = Some(listener);
    }

    /// Removes the event listener.
    pub fn clear_listener(&self) {
        *self
            .listener
            .write()
            .unwrap_or_else(PoisonError::into_inner) = None;
    }

    /// Restores the session from a stored passkey without prompting the user.
    ///
    /// Does nothing when no passkey is stored or a session is already established.
    ///
    /// # Errors
    /// Storage and address derivation failures are returned; the state stays `Disconnected`.
    pub async fn setup(&self) -> Result<(), ConnectorError> {
        let _connecting = self.connecting.lock().await;
        if let ConnectStart::AlreadyConnected(_) = self.state.lock().await.begin_connect(None)? {
            return Ok(());
        }
        let outcome = match self.store.load() {
            Ok(Some(credential)) => self.open_session(credential).await,
            Ok(None) => {
                self.state.lock().await.fail_connect();
                log::debug!("no stored passkey to restore");
                return Ok(());
            }
            Err(error) => Err(error.into()),
        };
        self.finish_connect(outcome).await.map(|_| ())
    }

    /// Connects the stored passkey's account, enrolling a new passkey when none is
    /// stored and `is_reconnecting` is false.
    ///
    /// Idempotent while connected: returns the current session without prompting.
    ///
    /// # Errors
    /// - `ConnectorError::UnsupportedChain` if `chain_id` is not the configured chain.
    /// - `ConnectorError::NoCredential` if reconnecting and no passkey is stored.
    /// - `ConnectorError::AccountDerivationFailed` if the address cannot be derived.
    /// - `ConnectorError::ConnectionAborted` if `disconnect` was called meanwhile.
    /// - Enrollment and storage failures.
    pub async fn connect(
        &self,
        chain_id: Option<u64>,
        is_reconnecting: bool,
    ) -> Result<ConnectResult, ConnectorError> {
        let _connecting = self.connecting.lock().await;
        if let ConnectStart::AlreadyConnected(session) =
            self.state.lock().await.begin_connect(chain_id)?
        {
            return Ok(connect_result(&session));
        }
        let outcome = self.establish(!is_reconnecting).await;
        let session = self.finish_connect(outcome).await?;
        Ok(connect_result(&session))
    }

    /// Ends the session. Never fails and may be called in any state.
    pub async fn disconnect(&self) {
        let transition = self.state.lock().await.disconnect();
        if matches!(transition, SessionTransition::Disconnected) {
            log::info!("disconnected");
        }
        self.emit(transition);
    }

    /// Checksummed addresses of the connected account; empty when not connected.
    pub async fn get_accounts(&self) -> Vec<String> {
        self.state
            .lock()
            .await
            .session()
            .map(|session| vec![session.address.to_checksum(None)])
            .unwrap_or_default()
    }

    /// Whether a session exists or can be restored without enrollment.
    pub async fn is_authorized(&self) -> bool {
        if self.state.lock().await.is_connected() {
            return true;
        }
        match self.store.load() {
            Ok(credential) => credential.is_some(),
            Err(error) => {
                log::warn!("cannot read stored passkey: {error}");
                false
            }
        }
    }

    /// The single chain this connector serves.
    #[must_use]
    pub const fn get_chain_id(&self) -> u64 {
        self.config.chain_id
    }

    /// Switches to `chain_id`.
    ///
    /// # Errors
    /// Returns `ConnectorError::UnsupportedChain` for any chain but the configured one.
    pub async fn switch_chain(&self, chain_id: u64) -> Result<u64, ConnectorError> {
        self.state.lock().await.switch_chain(chain_id)
    }

    /// Applies an `accountsChanged` reported by the host. An empty list disconnects.
    ///
    /// # Errors
    /// Returns `ConnectorError::InvalidInput` if an address does not parse. The
    /// state is left unchanged.
    pub async fn on_accounts_changed(&self, accounts: Vec<String>) -> Result<(), ConnectorError> {
        let accounts = accounts
            .into_iter()
            .map(|account| Address::parse_from_ffi(&account, "accounts"))
            .collect::<Result<Vec<_>, _>>()?;
        let transition = self.state.lock().await.accounts_changed(&accounts);
        self.emit(transition);
        Ok(())
    }

    /// Applies a `chainChanged` reported by the host.
    ///
    /// # Errors
    /// Returns `ConnectorError::UnsupportedChain` for any chain but the configured one.
    pub async fn on_chain_changed(&self, chain_id: u64) -> Result<(), ConnectorError> {
        let transition = self.state.lock().await.chain_changed(chain_id)?;
        self.emit(transition);
        Ok(())
    }

    /// The account client while connected, otherwise a read-only fallback.
    ///
    /// # Errors
    /// Returns `ConnectorError::UnsupportedChain` if `chain_id` is given and is not
    /// the configured chain.
    pub async fn get_provider(&self, chain_id: Option<u64>) -> Result<Provider, ConnectorError> {
        if let Some(chain_id) = chain_id {
            self.config.ensure_chain(chain_id)?;
        }
        Ok(match self.state.lock().await.session() {
            Some(session) => Provider::Account {
                client: session.client.clone(),
            },
            None => Provider::ReadOnly {
                chain_id: self.config.chain_id,
            },
        })
    }

    /// Signs a 32-byte user-operation hash with the connected or stored passkey.
    ///
    /// # Errors
    /// - `ConnectorError::InvalidInput` if `hash` is not 32 bytes.
    /// - `ConnectorError::NoCredential` if no passkey is connected or stored. The
    ///   authenticator is not called.
    /// - Any signing error from the passkey signer.
    #[allow(clippy::needless_pass_by_value)]
    pub async fn sign_user_operation_hash(
        &self,
        hash: Vec<u8>,
    ) -> Result<Arc<SignatureBlob>, ConnectorError> {
        let hash = parse_hash_bytes(&hash, "hash")?;
        let credential = self.credential_for_signing().await?;
        let blob = self
            .signer
            .sign_user_operation_hash(hash, &credential)
            .await?;
        Ok(Arc::new(blob))
    }

    /// Estimate-only signature for gas estimation. Never valid on-chain.
    #[must_use]
    pub fn get_dummy_signature(&self) -> Arc<DummySignature> {
        Arc::new(self.dummy.generate())
    }

    /// Estimate-only signature embedding the challenge for `hash`.
    ///
    /// # Errors
    /// Returns `ConnectorError::InvalidInput` if `hash` is not 32 bytes.
    #[allow(clippy::needless_pass_by_value)]
    pub fn get_dummy_signature_for(
        &self,
        hash: Vec<u8>,
    ) -> Result<Arc<DummySignature>, ConnectorError> {
        let hash = parse_hash_bytes(&hash, "hash")?;
        Ok(Arc::new(
            self.dummy.generate_for(&Challenge::for_user_operation(hash)),
        ))
    }
}
