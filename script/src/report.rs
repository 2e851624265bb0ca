use ftso_lib::{Verdict, VerifyError};
use std::process::ExitCode;

/// Exit status for a verified feed.
pub const EXIT_VERIFIED: u8 = 0;
/// Exit status for an attempt that could not complete.
pub const EXIT_ERROR: u8 = 1;
/// Exit status for data that does not match the committed root.
pub const EXIT_MISMATCH: u8 = 2;

/// Human-readable line for a finished attempt.
pub fn describe(feed_name: &str, provider_url: &str, outcome: &Result<Verdict, VerifyError>) -> String {
    match outcome {
        Ok(Verdict::Verified { price, .. }) => format!("Verified price for {feed_name}: {price}"),
        Ok(Verdict::Mismatch(mismatch)) => format!(
            "Feed data obtained from {provider_url} does not match on-chain hash! ({mismatch})"
        ),
        Err(err) => format!("Verification of {feed_name} failed: {err}"),
    }
}

/// Process status for a finished attempt.
pub fn code(outcome: &Result<Verdict, VerifyError>) -> u8 {
    match outcome {
        Ok(Verdict::Verified { .. }) => EXIT_VERIFIED,
        Ok(Verdict::Mismatch(_)) => EXIT_MISMATCH,
        Err(_) => EXIT_ERROR,
    }
}

pub fn exit_code(outcome: &Result<Verdict, VerifyError>) -> ExitCode {
    ExitCode::from(code(outcome))
}
