use alloy_primitives::B256;
use core::future::Future;
use core::time::Duration;
use tracing::{debug, error, info, warn};

use crate::encoding::LeafEncoding;
use crate::error::{CollaboratorError, Phase, VerifyError};
use crate::types::{
    FeedId, FeedRecord, FeedWithProof, Mismatch, ProtocolId, RoundId, Verdict, FTSO_PROTOCOL_ID,
};
use crate::verifier::{
    check_identity, with_timeout, DelegatedVerifier, FeedProvider, FeedVerifier, Ledger,
    LocalVerifier, VerificationContext, VerificationPath,
};

/// Knobs shared by every attempt an [`Orchestrator`] runs.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Settings {
    pub protocol_id: ProtocolId,
    pub encoding: LeafEncoding,
    /// Upper bound on each ledger or provider call; `None` waits forever.
    pub timeout: Option<Duration>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            protocol_id: FTSO_PROTOCOL_ID,
            encoding: LeafEncoding::default(),
            timeout: Some(Duration::from_secs(30)),
        }
    }
}

/// Drives one verification attempt per call: resolve the round (and, on the
/// local path, its committed root), fetch the record and proof, then verify.
///
/// Attempts share no state; the orchestrator only holds the collaborators.
pub struct Orchestrator<L, P> {
    ledger: L,
    provider: P,
    settings: Settings,
}

impl<L, P> Orchestrator<L, P>
where
    L: Ledger + Sync,
    P: FeedProvider + Sync,
{
    pub fn new(ledger: L, provider: P, settings: Settings) -> Self {
        Self {
            ledger,
            provider,
            settings,
        }
    }

    pub fn ledger(&self) -> &L {
        &self.ledger
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Verify `feed_id` for the round containing `timestamp`.
    pub async fn verify(
        &self,
        feed_id: &FeedId,
        timestamp: u64,
        path: VerificationPath,
    ) -> Result<Verdict, VerifyError> {
        info!(feed = %feed_id, timestamp, %path, "starting verification");
        let round_id = self.resolve_round(timestamp).await?;
        match path {
            VerificationPath::Local => self.verify_local(feed_id, round_id).await,
            VerificationPath::Delegated => self.verify_delegated(feed_id, round_id).await,
        }
    }

    pub async fn resolve_round(&self, timestamp: u64) -> Result<RoundId, VerifyError> {
        let round_id = self
            .call(
                Phase::ResolveReference,
                "resolve_round",
                self.ledger.resolve_round(timestamp),
            )
            .await?;
        debug!(timestamp, round_id, "resolved voting round");
        Ok(round_id)
    }

    /// Local path: compare a locally recomputed root with the committed one.
    pub async fn verify_local(
        &self,
        feed_id: &FeedId,
        round_id: RoundId,
    ) -> Result<Verdict, VerifyError> {
        let reference_root = self.committed_root(round_id).await?;
        let feed = self.fetch(feed_id, round_id).await?;
        if let Some(mismatch) = self.identity(&feed, feed_id, round_id)? {
            return Ok(Verdict::Mismatch(mismatch));
        }

        let verifier = LocalVerifier::new(self.settings.encoding, reference_root);
        let verdict = verifier.verify(&feed, &self.context(round_id)).await;
        report(feed_id, round_id, Phase::Recompute, verdict)
    }

    /// Delegated path: let the ledger's verifier contract decide.
    pub async fn verify_delegated(
        &self,
        feed_id: &FeedId,
        round_id: RoundId,
    ) -> Result<Verdict, VerifyError> {
        let feed = self.fetch(feed_id, round_id).await?;
        if let Some(mismatch) = self.identity(&feed, feed_id, round_id)? {
            return Ok(Verdict::Mismatch(mismatch));
        }

        let verifier = DelegatedVerifier::new(&self.ledger).with_timeout(self.settings.timeout);
        let verdict = verifier.verify(&feed, &self.context(round_id)).await;
        report(feed_id, round_id, Phase::DelegatedVerify, verdict)
    }

    async fn committed_root(&self, round_id: RoundId) -> Result<B256, VerifyError> {
        let root = self
            .call(
                Phase::ResolveReference,
                "committed_root",
                self.ledger
                    .committed_root(self.settings.protocol_id, round_id),
            )
            .await?;
        debug!(round_id, protocol_id = self.settings.protocol_id, %root, "committed root");
        Ok(root)
    }

    async fn fetch(&self, feed_id: &FeedId, round_id: RoundId) -> Result<FeedWithProof, VerifyError> {
        let feed = self
            .call(
                Phase::FetchRecord,
                "fetch_feed",
                self.provider.fetch_feed(feed_id, round_id),
            )
            .await?;
        debug!(feed = %feed_id, round_id, proof_len = feed.proof.len(), "fetched feed record");
        Ok(feed)
    }

    /// Narrow the fetched body first; an out-of-width field is fatal, not a mismatch.
    fn identity(
        &self,
        feed: &FeedWithProof,
        feed_id: &FeedId,
        round_id: RoundId,
    ) -> Result<Option<Mismatch>, VerifyError> {
        let record = FeedRecord::try_from(&feed.body).map_err(|err| {
            error!(feed = %feed_id, round_id, error = %err, "provider record violates field widths");
            VerifyError::from(err)
        })?;
        let mismatch = check_identity(&record, feed_id, round_id);
        if let Some(mismatch) = &mismatch {
            warn!(feed = %feed_id, round_id, %mismatch, "provider answered for another feed or round");
        }
        Ok(mismatch)
    }

    fn context(&self, round_id: RoundId) -> VerificationContext {
        VerificationContext {
            protocol_id: self.settings.protocol_id,
            round_id,
        }
    }

    async fn call<T, F>(&self, phase: Phase, operation: &'static str, call: F) -> Result<T, VerifyError>
    where
        F: Future<Output = Result<T, CollaboratorError>>,
    {
        with_timeout(self.settings.timeout, operation, call)
            .await
            .map_err(|source| {
                error!(%phase, operation, error = %source, "collaborator call failed");
                VerifyError::collaborator(phase, source)
            })
    }
}

fn report(
    feed_id: &FeedId,
    round_id: RoundId,
    phase: Phase,
    verdict: Result<Verdict, VerifyError>,
) -> Result<Verdict, VerifyError> {
    match &verdict {
        Ok(Verdict::Verified { price, .. }) => {
            info!(feed = %feed_id, round_id, %phase, price, "feed verified");
        }
        Ok(Verdict::Mismatch(mismatch)) => {
            warn!(feed = %feed_id, round_id, %phase, %mismatch, "feed does not match committed root");
        }
        Err(err) => {
            error!(feed = %feed_id, round_id, phase = %err.phase(), error = %err, "verification aborted");
        }
    }
    verdict
}
