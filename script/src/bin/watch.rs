//! Feed Watcher
//!
//! Long-running verifier that, once per voting epoch:
//! 1. Resolves the round `lookback_secs` in the past via the relay.
//! 2. Fetches each configured feed with its proof from the data provider.
//! 3. Verifies it locally or through the verifier contract.
//! 4. Logs the verdict; mismatches are logged at `warn`.
//!
//! A failed attempt is not retried; the next epoch is the retry.
//!
//! Usage:
//! RUST_LOG=info cargo run --bin ftso-watch -- --feeds 1:BTC/USD,1:ETH/USD --api-key <key>

use anyhow::{bail, Context, Result};
use clap::Parser;
use ftso_lib::{FeedId, Orchestrator, Verdict, VerificationPath};
use ftso_script::config::{FeedSelector, NetworkArgs};
use ftso_script::ledger::EvmLedger;
use ftso_script::provider::HttpFeedProvider;
use ftso_script::report::describe;
use ftso_script::setup_logger;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{error, info, warn};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Comma-separated `category:name` list
    #[arg(long, env = "FTSO_FEEDS", value_delimiter = ',', default_value = "1:BTC/USD")]
    feeds: Vec<FeedSelector>,

    /// `local` or `delegated`
    #[arg(long, env = "FTSO_VERIFICATION_PATH", default_value_t = VerificationPath::Local)]
    path: VerificationPath,

    /// Seconds between checks (one voting epoch by default)
    #[arg(long, env = "FTSO_INTERVAL_SECS", default_value_t = 90)]
    interval_secs: u64,

    #[command(flatten)]
    network: NetworkArgs,
}

#[derive(Debug, Default)]
struct Tally {
    verified: u64,
    mismatched: u64,
    failed: u64,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    setup_logger();

    let args = Args::parse();
    if args.path == VerificationPath::Delegated && args.network.verifier.is_none() {
        bail!("--path delegated requires --verifier (or FTSO_VERIFIER_ADDRESS)");
    }

    let feeds: Vec<(FeedSelector, FeedId)> = args
        .feeds
        .iter()
        .map(|selector| selector.feed_id().map(|id| (selector.clone(), id)))
        .collect::<Result<_, _>>()
        .context("invalid feed selector")?;

    info!(
        feeds = feeds.len(),
        path = %args.path,
        interval_secs = args.interval_secs,
        network = ?args.network,
        "starting feed watcher"
    );

    let ledger = EvmLedger::connect(&args.network)
        .await
        .context("connect to ledger")?;
    let provider = HttpFeedProvider::new(
        args.network.provider_url.clone(),
        args.network.api_key.clone(),
        args.network.timeout(),
    )
    .context("build provider client")?;
    let orchestrator = Orchestrator::new(ledger, provider, args.network.settings());

    let mut tally = Tally::default();
    let interval = Duration::from_secs(args.interval_secs.max(1));

    // Main Loop
    loop {
        let timestamp = args.network.target_timestamp();
        match orchestrator.resolve_round(timestamp).await {
            Ok(round_id) => {
                for (selector, feed_id) in &feeds {
                    let outcome = match args.path {
                        VerificationPath::Local => orchestrator.verify_local(feed_id, round_id).await,
                        VerificationPath::Delegated => {
                            orchestrator.verify_delegated(feed_id, round_id).await
                        }
                    };
                    let line = describe(&selector.name, args.network.provider_url.as_str(), &outcome);
                    match &outcome {
                        Ok(Verdict::Verified { .. }) => {
                            tally.verified += 1;
                            info!(feed = %selector, round_id, "{line}");
                        }
                        Ok(Verdict::Mismatch(_)) => {
                            tally.mismatched += 1;
                            warn!(feed = %selector, round_id, "{line}");
                        }
                        Err(_) => {
                            tally.failed += 1;
                            error!(feed = %selector, round_id, "{line}");
                        }
                    }
                }
            }
            Err(err) => {
                tally.failed += 1;
                error!(timestamp, error = %err, "could not resolve voting round, skipping epoch");
            }
        }

        info!(
            verified = tally.verified,
            mismatched = tally.mismatched,
            failed = tally.failed,
            "sleeping for {}s",
            interval.as_secs()
        );
        sleep(interval).await;
    }
}
