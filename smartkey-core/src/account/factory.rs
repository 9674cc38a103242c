use std::sync::Arc;

use alloy_core::sol_types::{SolCall, SolValue};
use alloy_primitives::{hex, keccak256, Address, Bytes, B256, U256};

use crate::{
    credential::PasskeyCredential, error::ConnectorError, primitives::ParseFromForeignBinding,
};

alloy_core::sol! {
    /// Owner key of the account as `(x, y)`.
    struct PublicKey {
        uint256 x;
        uint256 y;
    }

    /// Deploys the account for `owners` at its counterfactual address.
    function createAccount(uint256 salt, PublicKey[] owners);
}

const ERC1967_PROXY_PREFIX: [u8; 9] = hex!("603d3d8160223d3973");
const ERC1967_PROXY_SUFFIX: [u8; 66] = hex!(
    "60095155f3363d3d373d3d363d7f360894a13ba1a3210667c828492db98dca3e2076cc3735a920a3ca505d382bbc545af43d6000803e6038573d6000fd5b3d6000f3"
);

/// Resolves the smart account address owned by a passkey.
///
/// Implemented by the host when the address comes from elsewhere (an indexer or
/// an RPC call to the factory). [`Create2AccountFactory`] derives it locally.
#[uniffi::export(with_foreign)]
#[async_trait::async_trait]
pub trait AccountFactoryPort: Send + Sync {
    /// Returns the `0x`-prefixed account address owned by `credential`.
    async fn account_address(
        &self,
        credential: Arc<PasskeyCredential>,
    ) -> Result<String, ConnectorError>;
}

/// Calldata-prefixed init code: `factory || createAccount(0, [(x, y)])`.
///
/// Used as `initCode` on the first user operation, before the account exists.
#[must_use]
pub fn account_init_code(factory: Address, credential: &PasskeyCredential) -> Bytes {
    let call = createAccountCall {
        salt: U256::ZERO,
        owners: vec![PublicKey {
            x: credential.x(),
            y: credential.y(),
        }],
    }
    .abi_encode();

    let mut init_code = Vec::with_capacity(20 + call.len());
    init_code.extend_from_slice(factory.as_slice());
    init_code.extend_from_slice(&call);
    init_code.into()
}

/// CREATE2 salt the factory uses: `keccak256(abi.encode(0, abi.encode([(x, y)])))`.
#[must_use]
pub fn account_salt(credential: &PasskeyCredential) -> B256 {
    let owners = vec![(B256::from(credential.x()), B256::from(credential.y()))].abi_encode();
    keccak256((U256::ZERO, Bytes::from(owners)).abi_encode_params())
}

/// Hash of the minimal ERC-1967 proxy the factory deploys for `implementation`.
#[must_use]
pub fn erc1967_init_code_hash(implementation: Address) -> B256 {
    let mut code = Vec::with_capacity(
        ERC1967_PROXY_PREFIX.len() + 20 + ERC1967_PROXY_SUFFIX.len(),
    );
    code.extend_from_slice(&ERC1967_PROXY_PREFIX);
    code.extend_from_slice(implementation.as_slice());
    code.extend_from_slice(&ERC1967_PROXY_SUFFIX);
    keccak256(code)
}

/// Derives account addresses with the factory's CREATE2 rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Create2AccountFactory {
    factory: Address,
    implementation: Address,
}

impl Create2AccountFactory {
    /// A factory at `factory` deploying proxies to `implementation`.
    #[must_use]
    pub const fn new(factory: Address, implementation: Address) -> Self {
        Self {
            factory,
            implementation,
        }
    }

    /// The counterfactual address owned by `credential`.
    #[must_use]
    pub fn address_of(&self, credential: &PasskeyCredential) -> Address {
        self.factory.create2(
            account_salt(credential),
            erc1967_init_code_hash(self.implementation),
        )
    }
}

#[async_trait::async_trait]
impl AccountFactoryPort for Create2AccountFactory {
    async fn account_address(
        &self,
        credential: Arc<PasskeyCredential>,
    ) -> Result<String, ConnectorError> {
        Ok(self.address_of(&credential).to_checksum(None))
    }
}

/// Derives the checksummed account address for `credential` without any network access.
///
/// # Errors
/// Returns `ConnectorError::InvalidInput` if an address does not parse.
#[uniffi::export]
pub fn counterfactual_address(
    factory_address: &str,
    implementation_address: &str,
    credential: Arc<PasskeyCredential>,
) -> Result<String, ConnectorError> {
    let factory = Address::parse_from_ffi(factory_address, "factory_address")?;
    let implementation =
        Address::parse_from_ffi(implementation_address, "implementation_address")?;
    Ok(Create2AccountFactory::new(factory, implementation)
        .address_of(&credential)
        .to_checksum(None))
}
