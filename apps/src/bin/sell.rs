use alloy_primitives::{Address, U256};
use alloy_provider::ProviderBuilder;
use alloy_signer_local::PrivateKeySigner;
use anyhow::{bail, Context, Result};
use clap::Parser;
use tracing::{debug, info};
use url::Url;

use vanity_market_auth::{
    read_chain_id, storage::RpcStorage, values::parse_price, Authorization, MarketConfig,
    SignatureFormat, StructKind, Values, DEFAULT_DEADLINE, DEFAULT_MAX_SCAN_WORDS, VANITY_MARKET,
};

/// Sign a MintAndSell authorization and print the payload.
///
/// With --rpc-url the chain id is read from the node and the nonce is the
/// lowest one the signer has not used yet. The nonce is not reserved: a second
/// authorization signed before the first is consumed on-chain gets the same one.
#[derive(Parser, Debug)]
#[clap(author, version, about, long_about = None)]
struct Args {
    /// Private key of the signer.
    #[clap(long, env = "USER_PRIVATE_KEY")]
    private_key: PrivateKeySigner,

    /// Token id to mint and sell.
    id: String,

    /// uint8 salt nonce of the vanity address.
    salt_nonce: String,

    /// Price in ether.
    price: String,

    /// Chain the sale is valid on. Ignored when --rpc-url is given.
    #[clap(long)]
    chain_id: Option<u64>,

    /// Signer nonce. Ignored when --rpc-url is given.
    #[clap(long)]
    nonce: Option<String>,

    /// Receiver of the sale proceeds. Defaults to the signer.
    #[clap(long)]
    beneficiary: Option<String>,

    /// Only buyer allowed to fill the sale; the zero address allows anyone.
    #[clap(long, default_value_t = Address::ZERO)]
    buyer: Address,

    /// Unix timestamp after which the authorization expires.
    #[clap(long, default_value_t = DEFAULT_DEADLINE)]
    deadline: U256,

    /// URL of the Ethereum RPC endpoint used to find the chain id and a free nonce.
    #[clap(long, env = "RPC_URL")]
    rpc_url: Option<Url>,

    /// Market contract verifying the signature.
    #[clap(long, env = "VANITY_MARKET", default_value_t = VANITY_MARKET)]
    market: Address,

    /// Bitmap words scanned for a free nonce before giving up.
    #[clap(long, default_value_t = DEFAULT_MAX_SCAN_WORDS)]
    max_scan_words: u64,

    /// Signature layout: canonical (65 bytes) or compact (64 bytes).
    #[clap(long, default_value_t = SignatureFormat::Compact)]
    format: SignatureFormat,
}

#[tokio::main]
async fn main() -> Result<()> {
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
    let config = MarketConfig::default()
        .with_market(args.market)
        .with_max_scan_words(args.max_scan_words);
    let kind = StructKind::MintAndSell;
    let signer_address = args.private_key.address();

    let (nonce, chain_id) = match &args.rpc_url {
        Some(rpc_url) => {
            let storage = RpcStorage::new(ProviderBuilder::new().connect_http(rpc_url.clone()));
            let chain_id = read_chain_id(&storage).await?;
            let nonce = config
                .nonce_allocator()
                .next_free_nonce(&storage, signer_address)
                .await?;
            info!(%signer_address, chain_id, %nonce, "discovered free nonce");
            (nonce.to_string(), chain_id)
        }
        None => {
            let Some(chain_id) = args.chain_id else {
                bail!("--chain-id is required without --rpc-url");
            };
            let Some(nonce) = args.nonce.clone() else {
                bail!("--nonce is required without --rpc-url");
            };
            (nonce, chain_id)
        }
    };

    let beneficiary = args
        .beneficiary
        .clone()
        .unwrap_or_else(|| signer_address.to_string());

    let values = Values::new()
        .with("id", args.id.as_str())
        .with("saltNonce", args.salt_nonce.as_str())
        .with("price", parse_price(&args.price)?)
        .with("beneficiary", beneficiary)
        .with("buyer", args.buyer)
        .with("nonce", nonce)
        .with("deadline", args.deadline);

    let domain = config.domain(kind, Some(chain_id))?;
    let auth = Authorization::new(kind, domain, values)?;
    let signed = auth
        .sign(&args.private_key, args.format)
        .with_context(|| format!("signing {kind} as {signer_address:#x}"))?;

    println!("{}", serde_json::to_string_pretty(&signed)?);
    Ok(())
}
