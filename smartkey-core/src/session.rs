//! Connection lifecycle of a single connector.
//!
//! The state machine itself never awaits. The connector holds it behind a mutex
//! for the read-modify-write of each transition and performs enrollment, address
//! derivation and authenticator prompts between `begin_connect` and
//! `complete_connect`, with the lock released.

use std::sync::Arc;

use alloy_primitives::Address;

use crate::{account::AccountClient, config::ConnectorConfig, error::ConnectorError};

/// A connected smart account.
#[derive(Debug, Clone)]
pub struct Session {
    /// The account address currently reported to the host.
    pub address: Address,
    /// The chain the session is on.
    pub chain_id: u64,
    /// The single active account-client handle.
    pub client: Arc<AccountClient>,
}

/// Connection state of a connector.
#[derive(Debug, Clone, Default)]
pub enum SessionState {
    /// No session. Initial state.
    #[default]
    Disconnected,
    /// A `connect` is in flight.
    Connecting,
    /// A session is established.
    Connected(Session),
}

/// Outcome of [`AccountSessionStateMachine::begin_connect`].
#[derive(Debug, Clone)]
pub enum ConnectStart {
    /// The machine moved to `Connecting`; the caller must finish with
    /// `complete_connect` or `fail_connect`.
    Started,
    /// Already connected on the requested chain; nothing to do.
    AlreadyConnected(Session),
}

/// Observable effect of a transition, used to emit host events.
#[derive(Debug, Clone)]
pub enum SessionTransition {
    /// Nothing observable happened.
    Unchanged,
    /// A session was established.
    Connected(Session),
    /// The host reported a new account list.
    AccountsChanged(Vec<Address>),
    /// The chain was (re)confirmed.
    ChainChanged(u64),
    /// The session ended.
    Disconnected,
}

/// Owns [`SessionState`] and enforces its transitions.
///
/// Failed transitions leave the state untouched, so a retried `connect` always
/// starts from a known state.
#[derive(Debug)]
pub struct AccountSessionStateMachine {
    config: ConnectorConfig,
    state: SessionState,
}

impl AccountSessionStateMachine {
    /// A machine in `Disconnected` for the chain in `config`.
    #[must_use]
    pub fn new(config: &ConnectorConfig) -> Self {
        Self {
            config: config.clone(),
            state: SessionState::Disconnected,
        }
    }

    /// The current state.
    #[must_use]
    pub const fn state(&self) -> &SessionState {
        &self.state
    }

    /// The current session, if connected.
    #[must_use]
    pub const fn session(&self) -> Option<&Session> {
        match &self.state {
            SessionState::Connected(session) => Some(session),
            _ => None,
        }
    }

    /// Whether a session is established.
    #[must_use]
    pub const fn is_connected(&self) -> bool {
        matches!(self.state, SessionState::Connected(_))
    }

    /// Starts a connect on `chain_id` (the configured chain when `None`).
    ///
    /// # Errors
    /// Returns `ConnectorError::UnsupportedChain` for any other chain. The state
    /// is left unchanged.
    pub fn begin_connect(&mut self, chain_id: Option<u64>) -> Result<ConnectStart, ConnectorError> {
        if let Some(chain_id) = chain_id {
            self.config.ensure_chain(chain_id)?;
        }
        if let SessionState::Connected(session) = &self.state {
            return Ok(ConnectStart::AlreadyConnected(session.clone()));
        }
        self.state = SessionState::Connecting;
        Ok(ConnectStart::Started)
    }

    /// Finishes a connect started with `begin_connect`.
    ///
    /// # Errors
    /// Returns `ConnectorError::ConnectionAborted` if the machine left `Connecting`
    /// in the meantime (a `disconnect` won the race).
    pub fn complete_connect(
        &mut self,
        session: Session,
    ) -> Result<SessionTransition, ConnectorError> {
        if !matches!(self.state, SessionState::Connecting) {
            return Err(ConnectorError::ConnectionAborted);
        }
        self.state = SessionState::Connected(session.clone());
        Ok(SessionTransition::Connected(session))
    }

    /// Abandons a connect started with `begin_connect`.
    pub fn fail_connect(&mut self) {
        if matches!(self.state, SessionState::Connecting) {
            self.state = SessionState::Disconnected;
        }
    }

    /// Ends the session. Idempotent.
    pub fn disconnect(&mut self) -> SessionTransition {
        match std::mem::take(&mut self.state) {
            SessionState::Connected(_) => SessionTransition::Disconnected,
            SessionState::Connecting | SessionState::Disconnected => {
                SessionTransition::Unchanged
            }
        }
    }

    /// Applies an external `accountsChanged`.
    ///
    /// An empty list ends the session. A non-empty list makes the first address
    /// the session address and rebinds the account client to it, keeping the
    /// passkey that connected.
    pub fn accounts_changed(&mut self, accounts: &[Address]) -> SessionTransition {
        let SessionState::Connected(session) = &mut self.state else {
            return SessionTransition::Unchanged;
        };
        match accounts.first() {
            None => {
                self.state = SessionState::Disconnected;
                SessionTransition::Disconnected
            }
            Some(address) => {
                session.address = *address;
                session.client = Arc::new(session.client.with_address(*address));
                SessionTransition::AccountsChanged(accounts.to_vec())
            }
        }
    }

    /// Applies an external `chainChanged`.
    ///
    /// # Errors
    /// Returns `ConnectorError::UnsupportedChain` for any chain other than the
    /// configured one. The state is left unchanged.
    pub fn chain_changed(&mut self, chain_id: u64) -> Result<SessionTransition, ConnectorError> {
        self.config.ensure_chain(chain_id)?;
        let SessionState::Connected(session) = &mut self.state else {
            return Ok(SessionTransition::Unchanged);
        };
        session.chain_id = chain_id;
        Ok(SessionTransition::ChainChanged(chain_id))
    }

    /// Switches to `chain_id`, which must be the configured chain.
    ///
    /// # Errors
    /// Returns `ConnectorError::UnsupportedChain` for any other chain. The state
    /// is left unchanged.
    pub fn switch_chain(&mut self, chain_id: u64) -> Result<u64, ConnectorError> {
        self.chain_changed(chain_id)?;
        Ok(chain_id)
    }
}

#[cfg(test)]
mod tests {
    use alloy_primitives::U256;

    use super::*;
    use crate::{
        credential::PasskeyCredential,
        signature::{DummySignatureGenerator, WebAuthnAssertion},
        signer::{AssertionRequest, AuthenticatorPort, PasskeySigner},
        Environment,
    };

    struct NoAuthenticator;

    #[async_trait::async_trait]
    impl AuthenticatorPort for NoAuthenticator {
        async fn get_assertion(
            &self,
            _request: AssertionRequest,
        ) -> Result<Option<WebAuthnAssertion>, ConnectorError> {
            Ok(None)
        }
    }

    fn config() -> ConnectorConfig {
        ConnectorConfig::from_environment(&Environment::Staging, Address::repeat_byte(0x11))
    }

    fn session(address: Address) -> Session {
        let config = config();
        let client = AccountClient::new(
            address,
            config.chain_id,
            config.factory_address,
            Arc::new(PasskeyCredential::new(b"abc".to_vec(), U256::from(1), U256::from(2))),
            Arc::new(PasskeySigner::new(Arc::new(NoAuthenticator), &config)),
            DummySignatureGenerator::new(config.origin.clone()),
        );
        Session {
            address,
            chain_id: config.chain_id,
            client: Arc::new(client),
        }
    }

    fn connected(address: Address) -> AccountSessionStateMachine {
        let mut machine = AccountSessionStateMachine::new(&config());
        assert!(matches!(
            machine.begin_connect(None).unwrap(),
            ConnectStart::Started
        ));
        machine.complete_connect(session(address)).unwrap();
        machine
    }

    #[test]
    fn test_disconnect_is_idempotent() {
        let mut machine = AccountSessionStateMachine::new(&config());
        assert!(matches!(machine.disconnect(), SessionTransition::Unchanged));
        assert!(matches!(machine.disconnect(), SessionTransition::Unchanged));
        assert!(matches!(machine.state(), SessionState::Disconnected));

        let mut machine = connected(Address::repeat_byte(1));
        assert!(matches!(machine.disconnect(), SessionTransition::Disconnected));
        assert!(matches!(machine.disconnect(), SessionTransition::Unchanged));
    }

    #[test]
    fn test_connect_on_wrong_chain_leaves_state() {
        let mut machine = AccountSessionStateMachine::new(&config());
        assert!(matches!(
            machine.begin_connect(Some(1)),
            Err(ConnectorError::UnsupportedChain { chain_id: 1 })
        ));
        assert!(matches!(machine.state(), SessionState::Disconnected));

        let mut machine = connected(Address::repeat_byte(1));
        assert!(machine.begin_connect(Some(10)).is_err());
        assert!(machine.is_connected());
    }

    #[test]
    fn test_connect_is_idempotent_while_connected() {
        let mut machine = connected(Address::repeat_byte(1));
        match machine.begin_connect(Some(11_155_420)).unwrap() {
            ConnectStart::AlreadyConnected(session) => {
                assert_eq!(session.address, Address::repeat_byte(1));
            }
            ConnectStart::Started => panic!("should not restart"),
        }
        assert!(machine.is_connected());
    }

    #[test]
    fn test_failed_connect_returns_to_disconnected() {
        let mut machine = AccountSessionStateMachine::new(&config());
        machine.begin_connect(None).unwrap();
        assert!(matches!(machine.state(), SessionState::Connecting));
        machine.fail_connect();
        assert!(matches!(machine.state(), SessionState::Disconnected));
    }

    #[test]
    fn test_disconnect_aborts_pending_connect() {
        let mut machine = AccountSessionStateMachine::new(&config());
        machine.begin_connect(None).unwrap();
        assert!(matches!(machine.disconnect(), SessionTransition::Unchanged));
        assert!(matches!(
            machine.complete_connect(session(Address::repeat_byte(1))),
            Err(ConnectorError::ConnectionAborted)
        ));
        assert!(matches!(machine.state(), SessionState::Disconnected));
    }

    #[test]
    fn test_empty_accounts_changed_disconnects() {
        let mut machine = connected(Address::repeat_byte(1));
        assert!(matches!(
            machine.accounts_changed(&[]),
            SessionTransition::Disconnected
        ));
        assert!(matches!(machine.state(), SessionState::Disconnected));
    }

    #[test]
    fn test_accounts_changed_updates_address() {
        let mut machine = connected(Address::repeat_byte(1));
        let next = Address::repeat_byte(2);
        match machine.accounts_changed(&[next]) {
            SessionTransition::AccountsChanged(accounts) => assert_eq!(accounts, vec![next]),
            other => panic!("unexpected transition: {other:?}"),
        }
        let session = machine.session().unwrap();
        assert_eq!(session.address, next);
        assert_eq!(session.client.account_address(), next);
        assert_eq!(session.client.credential().x(), U256::from(1));
    }

    #[test]
    fn test_accounts_changed_while_disconnected_is_ignored() {
        let mut machine = AccountSessionStateMachine::new(&config());
        assert!(matches!(
            machine.accounts_changed(&[Address::repeat_byte(1)]),
            SessionTransition::Unchanged
        ));
    }

    #[test]
    fn test_switch_chain() {
        let mut machine = connected(Address::repeat_byte(1));
        assert_eq!(machine.switch_chain(11_155_420).unwrap(), 11_155_420);
        let session = machine.session().unwrap();
        assert_eq!(session.chain_id, 11_155_420);
        assert_eq!(session.address, Address::repeat_byte(1));

        assert!(matches!(
            machine.switch_chain(10),
            Err(ConnectorError::UnsupportedChain { chain_id: 10 })
        ));
        assert_eq!(machine.session().unwrap().chain_id, 11_155_420);
    }

    #[test]
    fn test_chain_changed_rejects_other_chains() {
        let mut machine = connected(Address::repeat_byte(1));
        assert!(matches!(
            machine.chain_changed(11_155_420).unwrap(),
            SessionTransition::ChainChanged(11_155_420)
        ));
        assert!(machine.chain_changed(1).is_err());
        assert!(machine.is_connected());
    }
}
