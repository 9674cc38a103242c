//! `smartkey` developer CLI.
//!
//! Offline tooling around the connector's wire formats: decode a WebAuthn
//! assertion into the on-chain signature blob, print dummy signatures, derive the
//! counterfactual account address and init code of a passkey, and run the full
//! signing pipeline against a software P-256 key.

use std::path::PathBuf;

use alloy_primitives::{Address, B256};
use clap::Parser as _;
use eyre::{Context as _, Result};
use serde_json::json;
use smartkey_core::{
    account::{account_init_code, Create2AccountFactory},
    signature::{decode, encode, Challenge, DummySignatureGenerator, WebAuthnAssertion},
    PasskeyCredential, DEFAULT_ACCOUNT_IMPLEMENTATION, DEFAULT_ORIGIN,
};
use tracing_subscriber::{layer::SubscriberExt as _, util::SubscriberInitExt as _};

mod software;

#[derive(Debug, clap::Parser)]
#[command(name = "smartkey", version, about, long_about = None)]
struct Args {
    #[command(subcommand)]
    action: Action,
}

#[derive(Debug, clap::Subcommand)]
enum Action {
    /// Decode a `PublicKeyCredential` assertion and print the encoded signature.
    Decode(DecodeArgs),
    /// Print the estimate-only dummy signature.
    Dummy(DummyArgs),
    /// Print the counterfactual account address of a passkey.
    Address(KeyArgs),
    /// Print the account init code of a passkey.
    InitCode(KeyArgs),
    /// Sign a user-operation hash with a software key through the connector.
    Sign(software::SignArgs),
}

#[derive(Debug, clap::Args)]
struct DecodeArgs {
    /// Assertion JSON, or `@path` to read it from a file.
    #[arg(long)]
    assertion: String,
}

#[derive(Debug, clap::Args)]
struct DummyArgs {
    /// Origin embedded in the dummy `clientDataJSON`.
    #[arg(long, env = "SMARTKEY_ORIGIN", default_value = DEFAULT_ORIGIN)]
    origin: String,

    /// User-operation hash to embed as the challenge.
    #[arg(long)]
    hash: Option<B256>,
}

#[derive(Debug, clap::Args)]
struct KeyArgs {
    /// Public key x coordinate (hex).
    #[arg(long)]
    x: String,

    /// Public key y coordinate (hex).
    #[arg(long)]
    y: String,

    /// Account factory address.
    #[arg(long, env = "SMARTKEY_FACTORY")]
    factory: Address,

    /// Implementation the factory's proxies delegate to.
    #[arg(long, default_value_t = DEFAULT_ACCOUNT_IMPLEMENTATION)]
    implementation: Address,
}

impl KeyArgs {
    fn credential(&self) -> Result<PasskeyCredential> {
        // the credential id plays no part in address derivation
        PasskeyCredential::from_encoded("AA", &self.x, &self.y).wrap_err("invalid public key")
    }
}

fn read_input(value: &str) -> Result<String> {
    match value.strip_prefix('@') {
        Some(path) => std::fs::read_to_string(PathBuf::from(path))
            .wrap_err_with(|| format!("failed to read {path}")),
        None => Ok(value.to_string()),
    }
}

fn run_decode(args: &DecodeArgs) -> Result<()> {
    let assertion = WebAuthnAssertion::from_response_json(&read_input(&args.assertion)?)
        .wrap_err("failed to parse assertion")?;
    let canonical = decode(&assertion).wrap_err("failed to decode assertion")?;
    tracing::debug!(
        type_index = %canonical.type_index,
        challenge_index = %canonical.challenge_index,
        "decoded assertion"
    );
    let blob = encode(&canonical);

    let output = json!({
        "authenticatorData": alloy_primitives::hex::encode(&canonical.authenticator_data),
        "clientDataJSON": canonical.client_data_json,
        "challengeIndex": canonical.challenge_index.to_string(),
        "typeIndex": canonical.type_index.to_string(),
        "r": format!("{:#066x}", canonical.r),
        "s": format!("{:#066x}", canonical.s),
        "signature": blob.to_hex(),
    });
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

fn run_dummy(args: &DummyArgs) -> Result<()> {
    let generator = DummySignatureGenerator::new(args.origin.clone());
    let dummy = match args.hash {
        Some(hash) => generator.generate_for(&Challenge::for_user_operation(hash)),
        None => generator.generate(),
    };
    println!("{}", dummy.to_hex());
    Ok(())
}

fn run_address(args: &KeyArgs) -> Result<()> {
    let credential = args.credential()?;
    let address = Create2AccountFactory::new(args.factory, args.implementation)
        .address_of(&credential);
    println!("{}", address.to_checksum(None));
    Ok(())
}

fn run_init_code(args: &KeyArgs) -> Result<()> {
    let credential = args.credential()?;
    println!(
        "{}",
        alloy_primitives::hex::encode_prefixed(account_init_code(args.factory, &credential))
    );
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "warn".into()),
        ))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let args = Args::parse();
    match args.action {
        Action::Decode(args) => run_decode(&args),
        Action::Dummy(args) => run_dummy(&args),
        Action::Address(args) => run_address(&args),
        Action::InitCode(args) => run_init_code(&args),
        Action::Sign(args) => args.run().await.wrap_err("failed to sign"),
    }
}
