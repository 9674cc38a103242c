use std::sync::Arc;

use alloy_primitives::{hex, Address, Bytes};

use super::factory::account_init_code;
use crate::{
    credential::PasskeyCredential,
    error::ConnectorError,
    primitives::parse_hash_bytes,
    signature::{Challenge, DummySignature, DummySignatureGenerator, SignatureBlob},
    signer::PasskeySigner,
};

/// Signing handle for one connected smart account.
///
/// Created by the connector once `connect` resolves and reused until the session ends.
#[derive(Debug, uniffi::Object)]
pub struct AccountClient {
    address: Address,
    chain_id: u64,
    credential: Arc<PasskeyCredential>,
    signer: Arc<PasskeySigner>,
    dummy: DummySignatureGenerator,
    init_code: Bytes,
}

impl AccountClient {
    pub(crate) fn new(
        address: Address,
        chain_id: u64,
        factory: Address,
        credential: Arc<PasskeyCredential>,
        signer: Arc<PasskeySigner>,
        dummy: DummySignatureGenerator,
    ) -> Self {
        let init_code = account_init_code(factory, &credential);
        Self {
            address,
            chain_id,
            credential,
            signer,
            dummy,
            init_code,
        }
    }

    /// The same account handle reporting `address`, bound to the same passkey.
    pub(crate) fn with_address(&self, address: Address) -> Self {
        Self {
            address,
            chain_id: self.chain_id,
            credential: self.credential.clone(),
            signer: self.signer.clone(),
            dummy: self.dummy.clone(),
            init_code: self.init_code.clone(),
        }
    }

    /// The account address.
    #[must_use]
    pub const fn account_address(&self) -> Address {
        self.address
    }

    /// The passkey that owns the account.
    #[must_use]
    pub fn credential(&self) -> &PasskeyCredential {
        &self.credential
    }
}

#[uniffi::export(async_runtime = "tokio")]
impl AccountClient {
    /// The checksummed account address.
    #[must_use]
    pub fn address(&self) -> String {
        self.address.to_checksum(None)
    }

    /// The chain this account operates on.
    #[must_use]
    pub const fn chain_id(&self) -> u64 {
        self.chain_id
    }

    /// The account's init code, `0x`-prefixed hex.
    #[must_use]
    pub fn init_code(&self) -> String {
        hex::encode_prefixed(&self.init_code)
    }

    /// Signs a 32-byte user-operation hash with the owning passkey.
    ///
    /// # Errors
    /// - `ConnectorError::InvalidInput` if `hash` is not 32 bytes.
    /// - Any signing error from the passkey signer.
    #[allow(clippy::needless_pass_by_value)]
    pub async fn sign_user_operation_hash(
        &self,
        hash: Vec<u8>,
    ) -> Result<Arc<SignatureBlob>, ConnectorError> {
        let hash = parse_hash_bytes(&hash, "hash")?;
        let blob = self
            .signer
            .sign_user_operation_hash(hash, &self.credential)
            .await?;
        Ok(Arc::new(blob))
    }

    /// Estimate-only signature for gas estimation.
    #[must_use]
    pub fn dummy_signature(&self) -> Arc<DummySignature> {
        Arc::new(self.dummy.generate())
    }

    /// Estimate-only signature whose `clientDataJSON` carries the challenge for `hash`.
    ///
    /// # Errors
    /// Returns `ConnectorError::InvalidInput` if `hash` is not 32 bytes.
    #[allow(clippy::needless_pass_by_value)]
    pub fn dummy_signature_for(
        &self,
        hash: Vec<u8>,
    ) -> Result<Arc<DummySignature>, ConnectorError> {
        let hash = parse_hash_bytes(&hash, "hash")?;
        Ok(Arc::new(
            self.dummy.generate_for(&Challenge::for_user_operation(hash)),
        ))
    }
}
