//! Network collaborators and configuration shared by the feed verifier binaries.

pub mod config;
pub mod ledger;
pub mod provider;
pub mod report;

use tracing_subscriber::EnvFilter;

/// Install the fmt subscriber; `RUST_LOG` overrides the `info` default.
pub fn setup_logger() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}
