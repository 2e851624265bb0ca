//! Read-only access to the relay and the verifier contract over JSON-RPC.

use alloy::primitives::{Address, B256, U256};
use alloy::providers::{DynProvider, Provider, ProviderBuilder};
use ftso_lib::{CollaboratorError, FeedRecord, Ledger, ProtocolId, RoundId};
use tracing::{debug, info};

use crate::config::NetworkArgs;

mod contracts {
    use alloy::sol;

    sol! {
        #[sol(rpc)]
        interface IFlareContractRegistry {
            function getContractAddressByName(string calldata _name) external view returns (address);
        }

        #[sol(rpc)]
        interface IRelay {
            function getVotingRoundId(uint256 _timestamp) external view returns (uint256);
            function getConfirmedMerkleRoot(uint256 _protocolId, uint256 _votingRoundId) external view returns (bytes32);
        }

        struct FeedData {
            uint32 votingRoundId;
            bytes21 id;
            int32 value;
            uint16 turnoutBIPS;
            int8 decimals;
        }

        struct FeedDataWithProof {
            bytes32[] proof;
            FeedData body;
        }

        #[sol(rpc)]
        interface IFeedVerifier {
            function getPreviousRoundId() external view returns (uint256);
            function verifyFeed(uint256 _protocolId, uint256 _roundId, FeedDataWithProof calldata _feedData) external view returns (bool);
        }
    }
}

use contracts::{FeedData, FeedDataWithProof, IFeedVerifier, IFlareContractRegistry, IRelay};

/// Name under which the registry publishes the relay.
pub const RELAY_CONTRACT_NAME: &str = "Relay";

/// [`Ledger`] backed by the relay and an optional verifier contract.
pub struct EvmLedger {
    relay: IRelay::IRelayInstance<DynProvider>,
    verifier: Option<IFeedVerifier::IFeedVerifierInstance<DynProvider>>,
}

fn ledger_err(context: &str, err: impl std::fmt::Display) -> CollaboratorError {
    CollaboratorError::Ledger(format!("{context}: {err}"))
}

fn to_round_id(value: U256) -> Result<RoundId, CollaboratorError> {
    RoundId::try_from(value)
        .map_err(|_| CollaboratorError::Ledger(format!("round id {value} does not fit in uint32")))
}

impl EvmLedger {
    /// Connect to the RPC endpoint and look up the relay in the registry.
    pub async fn connect(args: &NetworkArgs) -> Result<Self, CollaboratorError> {
        let provider = ProviderBuilder::new()
            .connect_http(args.rpc_url.clone())
            .erased();

        let registry = IFlareContractRegistry::new(args.registry, provider.clone());
        let relay_address: Address = registry
            .getContractAddressByName(RELAY_CONTRACT_NAME.to_string())
            .call()
            .await
            .map_err(|e| ledger_err("registry lookup", e))?;
        if relay_address == Address::ZERO {
            return Err(CollaboratorError::Ledger(format!(
                "registry {} has no `{RELAY_CONTRACT_NAME}` contract",
                args.registry
            )));
        }
        info!(registry = %args.registry, relay = %relay_address, "resolved relay contract");

        Ok(Self {
            relay: IRelay::new(relay_address, provider.clone()),
            verifier: args
                .verifier
                .map(|address| IFeedVerifier::new(address, provider)),
        })
    }

    fn verifier(&self) -> Result<&IFeedVerifier::IFeedVerifierInstance<DynProvider>, CollaboratorError> {
        self.verifier.as_ref().ok_or_else(|| {
            CollaboratorError::Config("delegated verification needs a verifier contract address".to_string())
        })
    }

    /// Latest round the verifier contract considers finalized.
    pub async fn previous_round_id(&self) -> Result<RoundId, CollaboratorError> {
        let round = self
            .verifier()?
            .getPreviousRoundId()
            .call()
            .await
            .map_err(|e| ledger_err("getPreviousRoundId", e))?;
        to_round_id(round)
    }
}

impl Ledger for EvmLedger {
    async fn resolve_round(&self, timestamp: u64) -> Result<RoundId, CollaboratorError> {
        let round = self
            .relay
            .getVotingRoundId(U256::from(timestamp))
            .call()
            .await
            .map_err(|e| ledger_err("getVotingRoundId", e))?;
        to_round_id(round)
    }

    async fn committed_root(
        &self,
        protocol_id: ProtocolId,
        round_id: RoundId,
    ) -> Result<B256, CollaboratorError> {
        let root = self
            .relay
            .getConfirmedMerkleRoot(U256::from(protocol_id), U256::from(round_id))
            .call()
            .await
            .map_err(|e| ledger_err("getConfirmedMerkleRoot", e))?;
        if root == B256::ZERO {
            return Err(CollaboratorError::Ledger(format!(
                "no confirmed root for protocol {protocol_id} round {round_id}"
            )));
        }
        Ok(root)
    }

    async fn verify_feed(
        &self,
        protocol_id: ProtocolId,
        round_id: RoundId,
        record: &FeedRecord,
        proof: &[B256],
    ) -> Result<bool, CollaboratorError> {
        let verifier = self.verifier()?;
        let payload = feed_payload(record, proof);
        debug!(verifier = %verifier.address(), round_id, proof_len = proof.len(), "calling verifyFeed");
        verifier
            .verifyFeed(U256::from(protocol_id), U256::from(round_id), payload)
            .call()
            .await
            .map_err(|e| ledger_err("verifyFeed", e))
    }
}

fn feed_payload(record: &FeedRecord, proof: &[B256]) -> FeedDataWithProof {
    let ftso_lib::FeedDataWithProof { proof, body } = ftso_lib::FeedDataWithProof::new(record, proof);
    FeedDataWithProof {
        proof,
        body: FeedData {
            votingRoundId: body.votingRoundId,
            id: body.id,
            value: body.value,
            turnoutBIPS: body.turnoutBIPS,
            decimals: body.decimals,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy::sol_types::SolType;
    use ftso_lib::{FeedId, LeafEncoding};

    fn record() -> FeedRecord {
        FeedRecord {
            round_id: 915909,
            feed_id: FeedId::new(1, "BTC/USD").unwrap(),
            value: 6345678,
            turnout_bips: 10000,
            decimals: 5,
        }
    }

    #[test]
    fn test_payload_body_matches_leaf_encoding() {
        let payload = feed_payload(&record(), &[B256::repeat_byte(0x11)]);
        assert_eq!(payload.proof, vec![B256::repeat_byte(0x11)]);
        assert_eq!(
            <FeedData as SolType>::abi_encode(&payload.body),
            record().encode(LeafEncoding::Abi)
        );
    }

    #[test]
    fn test_round_id_bounds() {
        assert_eq!(to_round_id(U256::from(915909u64)).unwrap(), 915909);
        assert!(to_round_id(U256::from(u64::from(u32::MAX) + 1)).is_err());
    }
}
