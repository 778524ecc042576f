use alloy_primitives::Address;
use alloy_signer_local::PrivateKeySigner;
use anyhow::{bail, Context, Result};
use clap::Parser;
use tracing::debug;

use vanity_market_auth::{
    Authorization, MarketConfig, SignatureFormat, StructKind, Values, DEFAULT_DEADLINE,
    VANITY_MARKET,
};

/// Sign a GiveUpEverywhere authorization and print the payload.
///
/// Signed over the cross-chain domain, so one signature is valid on every
/// chain the market is deployed to.
#[derive(Parser, Debug)]
#[clap(author, version, about, long_about = None)]
struct Args {
    /// Private key of the signer.
    #[clap(long, env = "USER_PRIVATE_KEY")]
    private_key: PrivateKeySigner,

    /// Token id being given up.
    id: String,

    /// uint8 nonce of the give-up.
    nonce: String,

    /// Address allowed to claim the id afterwards.
    claimer: String,

    /// Unix timestamp after which the authorization expires (default 2^248).
    deadline: Option<String>,

    /// Market contract verifying the signature.
    #[clap(long, env = "VANITY_MARKET", default_value_t = VANITY_MARKET)]
    market: Address,

    /// Signature layout: canonical (65 bytes) or compact (64 bytes).
    #[clap(long, default_value_t = SignatureFormat::Canonical)]
    format: SignatureFormat,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(tracing_subscriber::filter::EnvFilter::from_default_env())
        .init();

    match dotenvy::dotenv() {
        Ok(path) => debug!("Loaded environment variables from {:?}", path),
        Err(e) if e.not_found() => debug!("No .env file found"),
        Err(e) => bail!("failed to load .env file: {}", e),
    }

    let args = Args::parse();
    let config = MarketConfig::default().with_market(args.market);
    let kind = StructKind::GiveUpEverywhere;

    let mut values = Values::new()
        .with("id", args.id)
        .with("nonce", args.nonce)
        .with("claimer", args.claimer);
    match args.deadline {
        Some(deadline) => values.insert("deadline", deadline),
        None => values.insert("deadline", DEFAULT_DEADLINE),
    }

    let domain = config.domain(kind, None)?;
    let auth = Authorization::new(kind, domain, values)?;
    let signed = auth
        .sign(&args.private_key, args.format)
        .with_context(|| format!("signing {kind} as {:#x}", args.private_key.address()))?;

    println!("{}", serde_json::to_string_pretty(&signed)?);
    Ok(())
}
