//! The smart account owned by a passkey.
//!
//! [`factory`] holds the deployment rules (init code and counterfactual address);
//! [`client`] is the handle a connected session hands to the host for signing.

mod client;
mod factory;

pub use client::AccountClient;
pub use factory::{
    account_init_code, account_salt, counterfactual_address, erc1967_init_code_hash,
    AccountFactoryPort, Create2AccountFactory,
};
