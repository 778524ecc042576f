use alloy_primitives::Address;
use anyhow::{bail, Result};
use clap::Parser;
use tracing::{debug, info};

use vanity_market_auth::{
    typed_data::{digest_from_json, typed_data_json},
    Authorization, MarketConfig, StructKind, Values,
};

/// Print the EIP-712 digest of a market struct.
///
/// GiveUpEverywhere is hashed over the cross-chain domain and ignores the
/// chain id; MintAndSell is hashed over the domain of that chain.
#[derive(Parser, Debug)]
#[clap(author, version, about, long_about = None)]
struct Args {
    /// Market contract verifying the signature.
    market: Address,

    /// Chain id of the full domain.
    chain_id: u64,

    /// Struct to hash: GiveUpEverywhere or MintAndSell.
    kind: StructKind,

    /// Field values, in the order the struct declares them.
    values: Vec<String>,

    /// Print the typed-data document instead of the digest.
    #[clap(long)]
    json: bool,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(tracing_subscriber::filter::EnvFilter::from_default_env())
        .init();

    let args = Args::parse();
    let config = MarketConfig::default().with_market(args.market);

    let values = Values::from_positional(args.kind.schema(), args.values)?;
    let domain = config.domain(args.kind, Some(args.chain_id))?;
    let auth = Authorization::new(args.kind, domain, values)?;
    let digest = auth.digest()?;

    let document = typed_data_json(auth.domain(), args.kind.schema(), auth.values())?;
    let independent = digest_from_json(&document.to_string())?;
    if independent != digest {
        bail!("typed-data digest {independent} disagrees with struct digest {digest}");
    }
    debug!(%digest, "typed-data document agrees with struct digest");

    if args.json {
        println!("{}", serde_json::to_string_pretty(&document)?);
    } else {
        info!(kind = %args.kind, "hashed struct");
        println!("{digest}");
    }
    Ok(())
}
