//! Verification of FTSO price-feed records against relay-committed Merkle roots.
//!
//! A feed record fetched from an untrusted data provider is encoded into a
//! fixed-width byte sequence, hashed into a leaf and folded with its proof
//! using the sorted-pair rule. The resulting root is either compared locally
//! against the root committed on the ledger, or the whole check is delegated
//! to a verifier contract.

use alloy_sol_types::sol;

pub mod types;
pub mod error;
pub mod hash;
pub mod encoding;
pub mod merkle;
pub mod verifier;

#[cfg(feature = "std")]
pub mod builder;
#[cfg(feature = "std")]
pub mod orchestrator;

pub use types::*;
pub use error::*;
pub use hash::*;
pub use encoding::*;
pub use merkle::*;
pub use verifier::*;

#[cfg(feature = "std")]
pub use builder::*;
#[cfg(feature = "std")]
pub use orchestrator::*;

sol! {
    /// A single feed observation, laid out as the relay commits it.
    struct FeedData {
        uint32 votingRoundId;
        bytes21 id;
        int32 value;
        uint16 turnoutBIPS;
        int8 decimals;
    }

    /// A feed observation with the sibling hashes leading to the round root.
    struct FeedDataWithProof {
        bytes32[] proof;
        FeedData body;
    }
}
