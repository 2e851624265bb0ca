//! The two interchangeable ways of checking a feed record.
//!
//! [`LocalVerifier`] recomputes the root and compares it with a root already
//! read from the ledger. [`DelegatedVerifier`] hands the record and proof to
//! a verifier contract and trusts its boolean answer.

use alloy_primitives::B256;
use core::fmt;
use core::future::Future;
use core::str::FromStr;
use core::time::Duration;

use crate::encoding::LeafEncoding;
use crate::error::{CollaboratorError, Phase, VerifyError};
use crate::merkle::{parse_proof, reduce};
use crate::types::{FeedBody, FeedId, FeedRecord, FeedWithProof, Mismatch, ProtocolId, RoundId, Verdict};

/// Read-only view of the authoritative ledger.
pub trait Ledger {
    /// Voting round that contains `timestamp` (unix seconds).
    fn resolve_round(
        &self,
        timestamp: u64,
    ) -> impl Future<Output = Result<RoundId, CollaboratorError>> + Send;

    /// Merkle root committed for `(protocol_id, round_id)`.
    fn committed_root(
        &self,
        protocol_id: ProtocolId,
        round_id: RoundId,
    ) -> impl Future<Output = Result<B256, CollaboratorError>> + Send;

    /// Ask the on-ledger verifier whether `proof` ties `record` to the
    /// committed root.
    fn verify_feed(
        &self,
        protocol_id: ProtocolId,
        round_id: RoundId,
        record: &FeedRecord,
        proof: &[B256],
    ) -> impl Future<Output = Result<bool, CollaboratorError>> + Send;
}

/// Untrusted source of feed records and proofs.
pub trait FeedProvider {
    fn fetch_feed(
        &self,
        feed_id: &FeedId,
        round_id: RoundId,
    ) -> impl Future<Output = Result<FeedWithProof, CollaboratorError>> + Send;
}

/// Round the record is being checked against.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct VerificationContext {
    pub protocol_id: ProtocolId,
    pub round_id: RoundId,
}

/// Capability shared by both verification paths.
pub trait FeedVerifier {
    fn verify(
        &self,
        feed: &FeedWithProof,
        context: &VerificationContext,
    ) -> impl Future<Output = Result<Verdict, VerifyError>> + Send;
}

/// Which verifier an attempt uses.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum VerificationPath {
    #[default]
    Local,
    Delegated,
}

impl fmt::Display for VerificationPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Local => f.write_str("local"),
            Self::Delegated => f.write_str("delegated"),
        }
    }
}

impl FromStr for VerificationPath {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "local" => Ok(Self::Local),
            "delegated" | "onchain" => Ok(Self::Delegated),
            other => Err(format!("unknown verification path `{other}`")),
        }
    }
}

/// Recomputes the root locally against a root already read from the ledger.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LocalVerifier {
    encoding: LeafEncoding,
    reference_root: B256,
}

impl LocalVerifier {
    pub fn new(encoding: LeafEncoding, reference_root: B256) -> Self {
        Self {
            encoding,
            reference_root,
        }
    }

    pub fn reference_root(&self) -> B256 {
        self.reference_root
    }

    /// Root implied by `body` and `proof`.
    pub fn recompute<T: AsRef<[u8]>>(&self, body: &FeedBody, proof: &[T]) -> Result<(FeedRecord, B256), VerifyError> {
        let record = FeedRecord::try_from(body)?;
        let proof = parse_proof(proof)?;
        let leaf = record.leaf_hash(self.encoding);
        Ok((record, reduce(leaf, &proof)))
    }

    pub fn check(&self, feed: &FeedWithProof) -> Result<Verdict, VerifyError> {
        let (record, computed) = self.recompute(&feed.body, &feed.proof)?;
        if computed == self.reference_root {
            Ok(Verdict::verified(record))
        } else {
            Ok(Verdict::Mismatch(Mismatch::Root {
                computed,
                reference: self.reference_root,
            }))
        }
    }
}

impl FeedVerifier for LocalVerifier {
    async fn verify(
        &self,
        feed: &FeedWithProof,
        _context: &VerificationContext,
    ) -> Result<Verdict, VerifyError> {
        self.check(feed)
    }
}

/// Submits the record and proof to the ledger's verifier contract.
#[derive(Debug)]
pub struct DelegatedVerifier<'a, L> {
    ledger: &'a L,
    timeout: Option<Duration>,
}

impl<'a, L: Ledger + Sync> DelegatedVerifier<'a, L> {
    pub fn new(ledger: &'a L) -> Self {
        Self {
            ledger,
            timeout: None,
        }
    }

    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }
}

impl<'a, L: Ledger + Sync> FeedVerifier for DelegatedVerifier<'a, L> {
    async fn verify(
        &self,
        feed: &FeedWithProof,
        context: &VerificationContext,
    ) -> Result<Verdict, VerifyError> {
        // Widths are checked locally; the contract would only revert.
        let record = FeedRecord::try_from(&feed.body)?;
        let proof = parse_proof(&feed.proof)?;

        let accepted = with_timeout(
            self.timeout,
            "verify_feed",
            self.ledger
                .verify_feed(context.protocol_id, context.round_id, &record, &proof),
        )
        .await
        .map_err(|source| VerifyError::collaborator(Phase::DelegatedVerify, source))?;

        if accepted {
            Ok(Verdict::verified(record))
        } else {
            Ok(Verdict::Mismatch(Mismatch::Rejected))
        }
    }
}

/// Run a collaborator call, failing with [`CollaboratorError::Timeout`]
/// once `limit` elapses.
pub async fn with_timeout<T, F>(
    limit: Option<Duration>,
    operation: &'static str,
    call: F,
) -> Result<T, CollaboratorError>
where
    F: Future<Output = Result<T, CollaboratorError>>,
{
    match limit {
        Some(timeout) => tokio::time::timeout(timeout, call)
            .await
            .unwrap_or(Err(CollaboratorError::Timeout { operation, timeout })),
        None => call.await,
    }
}

/// Reject records that answer a different question than the one asked.
///
/// Takes the narrowed record, so width violations surface as
/// [`EncodingError`](crate::error::EncodingError) before this runs.
pub fn check_identity(record: &FeedRecord, feed_id: &FeedId, round_id: RoundId) -> Option<Mismatch> {
    if record.feed_id != *feed_id {
        return Some(Mismatch::WrongFeed {
            expected: *feed_id,
            actual: record.feed_id,
        });
    }
    if record.round_id != round_id {
        return Some(Mismatch::WrongRound {
            expected: round_id,
            actual: record.round_id,
        });
    }
    None
}

#[cfg(all(test, feature = "std"))]
mod tests {
    use super::*;
    use crate::builder::MerkleTree;
    use alloy_primitives::Bytes;

    fn records() -> Vec<FeedRecord> {
        ["BTC/USD", "ETH/USD", "XRP/USD", "FLR/USD", "DOGE/USD"]
            .iter()
            .enumerate()
            .map(|(i, name)| FeedRecord {
                round_id: 915909,
                feed_id: FeedId::new(1, name).unwrap(),
                value: 6345678 + i as i32,
                turnout_bips: 10000,
                decimals: 5,
            })
            .collect()
    }

    #[test]
    fn test_local_verifier_accepts_tree_proof() {
        let records = records();
        let tree = MerkleTree::from_records(&records, LeafEncoding::Packed);
        let root = tree.root().unwrap();
        let verifier = LocalVerifier::new(LeafEncoding::Packed, root);

        for record in &records {
            let proof = tree.record_proof(record, LeafEncoding::Packed).unwrap();
            let verdict = verifier.check(&FeedWithProof::new(record, &proof)).unwrap();
            assert_eq!(verdict, Verdict::verified(*record));
        }
    }

    #[test]
    fn test_local_verifier_degenerate_root() {
        let record = records()[0];
        let leaf = record.leaf_hash(LeafEncoding::Packed);
        let verifier = LocalVerifier::new(LeafEncoding::Packed, leaf);
        assert!(verifier.check(&FeedWithProof::new(&record, &[])).unwrap().is_verified());
    }

    #[test]
    fn test_local_verifier_mismatch_on_tampered_value() {
        let records = records();
        let tree = MerkleTree::from_records(&records, LeafEncoding::Packed);
        let root = tree.root().unwrap();
        let proof = tree.record_proof(&records[0], LeafEncoding::Packed).unwrap();

        let mut feed = FeedWithProof::new(&records[0], &proof);
        feed.body.value += 1;

        let verdict = LocalVerifier::new(LeafEncoding::Packed, root).check(&feed).unwrap();
        match verdict {
            Verdict::Mismatch(Mismatch::Root { reference, computed }) => {
                assert_eq!(reference, root);
                assert_ne!(computed, root);
            }
            other => panic!("unexpected verdict {other:?}"),
        }
    }

    #[test]
    fn test_local_verifier_wrong_encoding_mismatches() {
        let records = records();
        let tree = MerkleTree::from_records(&records, LeafEncoding::Abi);
        let proof = tree.record_proof(&records[1], LeafEncoding::Abi).unwrap();
        let feed = FeedWithProof::new(&records[1], &proof);

        let abi = LocalVerifier::new(LeafEncoding::Abi, tree.root().unwrap());
        let packed = LocalVerifier::new(LeafEncoding::Packed, tree.root().unwrap());
        assert!(abi.check(&feed).unwrap().is_verified());
        assert!(!packed.check(&feed).unwrap().is_verified());
    }

    #[test]
    fn test_local_verifier_errors() {
        let record = records()[0];
        let verifier = LocalVerifier::new(LeafEncoding::Packed, B256::ZERO);

        let mut feed = FeedWithProof::new(&record, &[B256::ZERO]);
        feed.proof[0] = Bytes::from(vec![0u8; 33]);
        assert!(matches!(verifier.check(&feed), Err(VerifyError::MalformedProof(_))));

        let mut feed = FeedWithProof::new(&record, &[]);
        feed.body.turnout_bips = 1 << 16;
        assert!(matches!(verifier.check(&feed), Err(VerifyError::Encoding(_))));
    }

    #[test]
    fn test_check_identity() {
        let record = records()[0];
        assert_eq!(check_identity(&record, &record.feed_id, 915909), None);
        assert_eq!(
            check_identity(&record, &record.feed_id, 915910),
            Some(Mismatch::WrongRound {
                expected: 915910,
                actual: 915909
            })
        );

        let other = FeedId::new(1, "ETH/USD").unwrap();
        assert_eq!(
            check_identity(&record, &other, 915909),
            Some(Mismatch::WrongFeed {
                expected: other,
                actual: record.feed_id
            })
        );
    }

    #[test]
    fn test_parse_verification_path() {
        assert_eq!("local".parse::<VerificationPath>(), Ok(VerificationPath::Local));
        assert_eq!("Delegated".parse::<VerificationPath>(), Ok(VerificationPath::Delegated));
        assert!("remote".parse::<VerificationPath>().is_err());
    }

    #[tokio::test]
    async fn test_with_timeout_elapses() {
        let slow = async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok::<_, CollaboratorError>(1)
        };
        let err = with_timeout(Some(Duration::from_millis(10)), "slow_call", slow)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            CollaboratorError::Timeout {
                operation: "slow_call",
                ..
            }
        ));

        let fast = async { Ok::<_, CollaboratorError>(2) };
        assert_eq!(with_timeout(None, "fast_call", fast).await.unwrap(), 2);
    }
}
