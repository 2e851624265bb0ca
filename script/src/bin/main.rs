//! One-shot verification of a single feed against the relay.
//!
//! You can run this script using the following command:
//! ```shell
//! RUST_LOG=info cargo run --release -- --local --api-key <key>
//! ```
//! or
//! ```shell
//! RUST_LOG=info cargo run --release -- --delegated --verifier <address> --api-key <key>
//! ```

use anyhow::{bail, Context, Result};
use clap::Parser;
use ftso_lib::{with_timeout, FeedId, Orchestrator, Phase, RoundId, Verdict, VerificationPath, VerifyError};
use ftso_script::config::{FeedArgs, NetworkArgs};
use ftso_script::ledger::EvmLedger;
use ftso_script::provider::HttpFeedProvider;
use ftso_script::report::{describe, exit_code};
use ftso_script::setup_logger;
use std::process::ExitCode;
use tracing::{error, info};

/// The arguments for the command.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Recompute the root locally and compare it with the relay
    #[arg(long)]
    local: bool,

    /// Let the verifier contract check the proof
    #[arg(long)]
    delegated: bool,

    /// Verify this round instead of resolving one
    #[arg(long)]
    round_id: Option<RoundId>,

    #[command(flatten)]
    network: NetworkArgs,

    #[command(flatten)]
    feed: FeedArgs,
}

#[tokio::main]
async fn main() -> ExitCode {
    dotenv::dotenv().ok();
    // Setup the logger.
    setup_logger();

    // Parse the command line arguments.
    let args = Args::parse();

    if args.local == args.delegated {
        eprintln!("Error: You must specify either --local or --delegated");
        return ExitCode::from(ftso_script::report::EXIT_ERROR);
    }

    match run(args).await {
        Ok(code) => code,
        Err(err) => {
            error!(error = %format!("{err:#}"), "verification could not start");
            eprintln!("Error: {err:#}");
            ExitCode::from(ftso_script::report::EXIT_ERROR)
        }
    }
}

async fn run(args: Args) -> Result<ExitCode> {
    let path = if args.delegated {
        VerificationPath::Delegated
    } else {
        VerificationPath::Local
    };
    if path == VerificationPath::Delegated && args.network.verifier.is_none() {
        bail!("--delegated requires --verifier (or FTSO_VERIFIER_ADDRESS)");
    }

    let selector = args.feed.selector();
    let feed_id = selector.feed_id().context("invalid feed selector")?;

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
    let outcome = match (path, args.round_id) {
        (VerificationPath::Local, Some(round_id)) => {
            orchestrator.verify_local(&feed_id, round_id).await
        }
        (VerificationPath::Local, None) => {
            orchestrator
                .verify(&feed_id, args.network.target_timestamp(), path)
                .await
        }
        (VerificationPath::Delegated, Some(round_id)) => {
            orchestrator.verify_delegated(&feed_id, round_id).await
        }
        (VerificationPath::Delegated, None) => {
            verify_previous_round(&orchestrator, &args.network, &feed_id).await
        }
    };

    println!(
        "{}",
        describe(&selector.name, args.network.provider_url.as_str(), &outcome)
    );
    Ok(exit_code(&outcome))
}

/// Delegated path: ask the verifier contract which round to check.
async fn verify_previous_round(
    orchestrator: &Orchestrator<EvmLedger, HttpFeedProvider>,
    network: &NetworkArgs,
    feed_id: &FeedId,
) -> Result<Verdict, VerifyError> {
    let round_id = with_timeout(
        network.timeout(),
        "previous_round_id",
        orchestrator.ledger().previous_round_id(),
    )
    .await
    .map_err(|source| VerifyError::collaborator(Phase::ResolveReference, source))?;
    info!(round_id, "verifier contract reported previous round");
    orchestrator.verify_delegated(feed_id, round_id).await
}
