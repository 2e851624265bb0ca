//! Error taxonomy for a verification attempt.
//!
//! A failed attempt is always an error value; an authenticity failure is
//! not an error and is reported as [`Verdict::Mismatch`](crate::Verdict).

use core::fmt;
use core::time::Duration;
use thiserror::Error;

/// A feed record field does not fit its committed width.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EncodingError {
    #[error("field `{field}` = {value} does not fit in {width}")]
    OutOfRange {
        field: &'static str,
        value: i64,
        width: &'static str,
    },

    #[error("feed id must be 21 bytes, got {len}")]
    FeedIdWidth { len: usize },

    #[error("feed name `{name}` is longer than 20 bytes")]
    FeedNameTooLong { name: String },
}

/// A proof element is not a 32-byte hash.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("proof element {index} is {len} bytes, expected 32")]
pub struct MalformedProofError {
    pub index: usize,
    pub len: usize,
}

/// A ledger or data provider call failed.
#[derive(Debug, Error)]
pub enum CollaboratorError {
    #[error("ledger call failed: {0}")]
    Ledger(String),

    #[error("provider request failed: {0}")]
    Provider(String),

    #[error("provider returned HTTP {status} for {url}")]
    Status { status: u16, url: String },

    #[error("could not decode provider response: {0}")]
    Decode(String),

    #[error("{operation} timed out after {timeout:?}")]
    Timeout {
        operation: &'static str,
        timeout: Duration,
    },

    #[error("invalid configuration: {0}")]
    Config(String),
}

/// Step of the verification protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    ResolveReference,
    FetchRecord,
    Recompute,
    DelegatedVerify,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::ResolveReference => "resolve-reference",
            Self::FetchRecord => "fetch-record",
            Self::Recompute => "recompute",
            Self::DelegatedVerify => "delegated-verify",
        };
        f.write_str(name)
    }
}

/// Fatal failure of one verification attempt.
#[derive(Debug, Error)]
pub enum VerifyError {
    #[error(transparent)]
    Encoding(#[from] EncodingError),

    #[error(transparent)]
    MalformedProof(#[from] MalformedProofError),

    #[error("{phase} failed: {source}")]
    Collaborator {
        phase: Phase,
        #[source]
        source: CollaboratorError,
    },
}

impl VerifyError {
    pub fn collaborator(phase: Phase, source: CollaboratorError) -> Self {
        Self::Collaborator { phase, source }
    }

    /// Phase in which the attempt was aborted.
    pub fn phase(&self) -> Phase {
        match self {
            Self::Encoding(_) | Self::MalformedProof(_) => Phase::Recompute,
            Self::Collaborator { phase, .. } => *phase,
        }
    }

    /// Infrastructure failure, as opposed to bad data from the provider.
    pub fn is_collaborator(&self) -> bool {
        matches!(self, Self::Collaborator { .. })
    }
}
