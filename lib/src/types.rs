use alloy_primitives::{hex, Bytes, FixedBytes, B256};
use core::fmt;
use core::str::FromStr;
use serde::{Deserialize, Serialize};

use crate::error::EncodingError;
use crate::{FeedData, FeedDataWithProof};

/// Voting round identifier
pub type RoundId = u32;

/// Relay protocol identifier
pub type ProtocolId = u8;

/// Protocol id under which the FTSO scaling roots are committed
pub const FTSO_PROTOCOL_ID: ProtocolId = 100;

/// Width of a feed identifier in bytes
pub const FEED_ID_LEN: usize = 21;

/// Well-known feed categories (first byte of a feed id).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum FeedCategory {
    Crypto = 1,
    Forex = 2,
    Commodity = 3,
    Stock = 4,
}

impl TryFrom<u8> for FeedCategory {
    type Error = u8;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(Self::Crypto),
            2 => Ok(Self::Forex),
            3 => Ok(Self::Commodity),
            4 => Ok(Self::Stock),
            other => Err(other),
        }
    }
}

/// 21-byte feed identifier: one category byte followed by the
/// zero-padded UTF-8 feed name.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FeedId(pub FixedBytes<FEED_ID_LEN>);

impl FeedId {
    /// Derive the identifier for `(category, name)`.
    pub fn new(category: u8, name: &str) -> Result<Self, EncodingError> {
        let name_bytes = name.as_bytes();
        if name_bytes.len() > FEED_ID_LEN - 1 {
            return Err(EncodingError::FeedNameTooLong {
                name: name.to_string(),
            });
        }

        let mut id = [0u8; FEED_ID_LEN];
        id[0] = category;
        id[1..=name_bytes.len()].copy_from_slice(name_bytes);
        Ok(Self(FixedBytes(id)))
    }

    pub fn from_slice(bytes: &[u8]) -> Result<Self, EncodingError> {
        let id: [u8; FEED_ID_LEN] = bytes
            .try_into()
            .map_err(|_| EncodingError::FeedIdWidth { len: bytes.len() })?;
        Ok(Self(FixedBytes(id)))
    }

    pub fn category(&self) -> u8 {
        self.0[0]
    }

    /// Feed name with the zero padding stripped.
    pub fn name(&self) -> String {
        let name = &self.0[1..];
        let end = name.iter().rposition(|&b| b != 0).map_or(0, |i| i + 1);
        String::from_utf8_lossy(&name[..end]).into_owned()
    }

    pub fn as_bytes(&self) -> &[u8; FEED_ID_LEN] {
        &self.0 .0
    }
}

impl fmt::Display for FeedId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl FromStr for FeedId {
    type Err = EncodingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = hex::decode(s).map_err(|_| EncodingError::FeedIdWidth { len: s.len() / 2 })?;
        Self::from_slice(&bytes)
    }
}

/// Feed record body as served by the data provider.
///
/// Integer fields are kept wide so that values outside the committed
/// widths are rejected by the encoder rather than by the JSON decoder.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedBody {
    pub voting_round_id: i64,
    pub id: Bytes,
    pub value: i64,
    #[serde(rename = "turnoutBIPS")]
    pub turnout_bips: i64,
    pub decimals: i64,
}

/// Feed body together with its proof, as served by the data provider.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedWithProof {
    pub body: FeedBody,
    pub proof: Vec<Bytes>,
}

impl FeedWithProof {
    pub fn new(record: &FeedRecord, proof: &[B256]) -> Self {
        Self {
            body: FeedBody::from(record),
            proof: proof.iter().map(|p| Bytes::copy_from_slice(p.as_slice())).collect(),
        }
    }
}

/// Response envelope of `GET /specific-feed/{feed_id}/{round_id}`.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedResponse {
    pub feed_with_proof: FeedWithProof,
}

/// A feed record narrowed to the widths the relay commits to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct FeedRecord {
    pub round_id: RoundId,
    pub feed_id: FeedId,
    pub value: i32,
    pub turnout_bips: u16,
    pub decimals: i8,
}

impl FeedRecord {
    /// `value / 10^decimals`; negative decimals scale up.
    pub fn price(&self) -> f64 {
        display_price(self.value, self.decimals)
    }
}

pub fn display_price(value: i32, decimals: i8) -> f64 {
    f64::from(value) / 10f64.powi(i32::from(decimals))
}

fn narrow<T: TryFrom<i64>>(
    field: &'static str,
    value: i64,
    width: &'static str,
) -> Result<T, EncodingError> {
    T::try_from(value).map_err(|_| EncodingError::OutOfRange { field, value, width })
}

impl TryFrom<&FeedBody> for FeedRecord {
    type Error = EncodingError;

    fn try_from(body: &FeedBody) -> Result<Self, Self::Error> {
        Ok(Self {
            round_id: narrow("votingRoundId", body.voting_round_id, "uint32")?,
            feed_id: FeedId::from_slice(&body.id)?,
            value: narrow("value", body.value, "int32")?,
            turnout_bips: narrow("turnoutBIPS", body.turnout_bips, "uint16")?,
            decimals: narrow("decimals", body.decimals, "int8")?,
        })
    }
}

impl From<&FeedRecord> for FeedBody {
    fn from(record: &FeedRecord) -> Self {
        Self {
            voting_round_id: i64::from(record.round_id),
            id: Bytes::copy_from_slice(record.feed_id.as_bytes()),
            value: i64::from(record.value),
            turnout_bips: i64::from(record.turnout_bips),
            decimals: i64::from(record.decimals),
        }
    }
}

impl From<&FeedRecord> for FeedData {
    fn from(record: &FeedRecord) -> Self {
        Self {
            votingRoundId: record.round_id,
            id: record.feed_id.0,
            value: record.value,
            turnoutBIPS: record.turnout_bips,
            decimals: record.decimals,
        }
    }
}

impl FeedDataWithProof {
    pub fn new(record: &FeedRecord, proof: &[B256]) -> Self {
        Self {
            proof: proof.to_vec(),
            body: FeedData::from(record),
        }
    }
}

/// Why a record was not accepted.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Mismatch {
    /// Locally recomputed root differs from the committed one.
    Root { computed: B256, reference: B256 },
    /// The verifier contract answered `false`.
    Rejected,
    /// Provider returned a record for another feed.
    WrongFeed { expected: FeedId, actual: FeedId },
    /// Provider returned a record for another round.
    WrongRound { expected: RoundId, actual: RoundId },
}

impl fmt::Display for Mismatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Root { computed, reference } => {
                write!(f, "computed root {computed} does not match committed root {reference}")
            }
            Self::Rejected => write!(f, "verifier contract rejected the proof"),
            Self::WrongFeed { expected, actual } => {
                write!(f, "expected feed {expected}, provider returned {actual}")
            }
            Self::WrongRound { expected, actual } => {
                write!(f, "expected round {expected}, provider returned {actual}")
            }
        }
    }
}

/// Outcome of a completed verification attempt.
#[derive(Clone, Debug, PartialEq)]
pub enum Verdict {
    Verified { record: FeedRecord, price: f64 },
    Mismatch(Mismatch),
}

impl Verdict {
    pub fn verified(record: FeedRecord) -> Self {
        Self::Verified {
            price: record.price(),
            record,
        }
    }

    pub fn is_verified(&self) -> bool {
        matches!(self, Self::Verified { .. })
    }
}
