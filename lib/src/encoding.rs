//! Canonical byte encoding of a feed record.
//!
//! Packed layout (32 bytes, big-endian, two's complement for signed fields):
//!
//! | offset | width | field           |
//! |--------|-------|-----------------|
//! | 0      | 4     | `votingRoundId` |
//! | 4      | 21    | `id`            |
//! | 25     | 4     | `value`         |
//! | 29     | 2     | `turnoutBIPS`   |
//! | 31     | 1     | `decimals`      |
//!
//! The ABI layout places the same fields each in its own 32-byte word
//! (160 bytes), which is what the relay hashes on-chain.

use alloy_primitives::B256;
use alloy_sol_types::SolType;
use core::fmt;
use core::str::FromStr;
use serde::{Deserialize, Serialize};

use crate::error::EncodingError;
use crate::hash::keccak256;
use crate::types::{FeedBody, FeedRecord};
use crate::FeedData;

pub const PACKED_LEN: usize = 32;
pub const ABI_LEN: usize = 160;

/// Byte layout hashed into a leaf.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LeafEncoding {
    #[default]
    Packed,
    Abi,
}

impl fmt::Display for LeafEncoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Packed => f.write_str("packed"),
            Self::Abi => f.write_str("abi"),
        }
    }
}

impl FromStr for LeafEncoding {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "packed" => Ok(Self::Packed),
            "abi" => Ok(Self::Abi),
            other => Err(format!("unknown leaf encoding `{other}` (expected packed or abi)")),
        }
    }
}

impl FeedRecord {
    pub fn encode_packed(&self) -> [u8; PACKED_LEN] {
        let mut out = [0u8; PACKED_LEN];
        out[0..4].copy_from_slice(&self.round_id.to_be_bytes());
        out[4..25].copy_from_slice(self.feed_id.as_bytes());
        out[25..29].copy_from_slice(&self.value.to_be_bytes());
        out[29..31].copy_from_slice(&self.turnout_bips.to_be_bytes());
        out[31] = self.decimals.to_be_bytes()[0];
        out
    }

    pub fn encode_abi(&self) -> Vec<u8> {
        <FeedData as SolType>::abi_encode(&FeedData::from(self))
    }

    pub fn encode(&self, encoding: LeafEncoding) -> Vec<u8> {
        match encoding {
            LeafEncoding::Packed => self.encode_packed().to_vec(),
            LeafEncoding::Abi => self.encode_abi(),
        }
    }

    /// Leaf of this record: a single hash over its encoding.
    pub fn leaf_hash(&self, encoding: LeafEncoding) -> B256 {
        keccak256(&self.encode(encoding))
    }
}

/// Encode a provider body, enforcing every field width.
pub fn encode_body(body: &FeedBody, encoding: LeafEncoding) -> Result<Vec<u8>, EncodingError> {
    let record = FeedRecord::try_from(body)?;
    Ok(record.encode(encoding))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::FeedId;
    use alloy_primitives::{b256, hex};

    fn sample() -> FeedRecord {
        FeedRecord {
            round_id: 915909,
            feed_id: FeedId::new(1, "BTC/USD").unwrap(),
            value: 6345678,
            turnout_bips: 10000,
            decimals: 5,
        }
    }

    #[test]
    fn test_packed_layout() {
        let encoded = sample().encode_packed();
        assert_eq!(
            hex::encode(encoded),
            "000df9c5014254432f555344000000000000000000000000000060d3ce271005"
        );
    }

    #[test]
    fn test_packed_negative_fields() {
        let record = FeedRecord {
            round_id: 1,
            value: -5,
            turnout_bips: 0,
            decimals: -2,
            ..sample()
        };
        assert_eq!(
            hex::encode(record.encode_packed()),
            "00000001014254432f55534400000000000000000000000000fffffffb0000fe"
        );
    }

    #[test]
    fn test_leaf_golden_vectors() {
        let record = sample();
        assert_eq!(
            record.leaf_hash(LeafEncoding::Packed),
            b256!("c7ac45e58639f88b1a4dc43d214b4817d98692f4ca9684908f2bed7a283ece1b")
        );
        assert_eq!(
            record.leaf_hash(LeafEncoding::Abi),
            b256!("dad911fa55ba38ecf5bf2f013fc3b215b5b91d6368fdd00b454710639619e2b9")
        );
    }

    #[test]
    fn test_abi_layout() {
        let encoded = sample().encode_abi();
        assert_eq!(encoded.len(), ABI_LEN);
        // bytes21 is right-padded inside its word
        assert_eq!(&encoded[32..53], sample().feed_id.as_bytes());
        assert!(encoded[53..64].iter().all(|&b| b == 0));

        let negative = FeedRecord {
            decimals: -1,
            ..sample()
        };
        // int8 is sign-extended across the whole word
        assert!(negative.encode_abi()[128..].iter().all(|&b| b == 0xff));
    }

    #[test]
    fn test_encoding_is_deterministic() {
        let record = sample();
        assert_eq!(record.encode_packed(), record.encode_packed());
        assert_eq!(record.encode_abi(), record.encode_abi());
    }

    #[test]
    fn test_encode_body_rejects_wide_value() {
        let mut body = FeedBody::from(&sample());
        body.value = 1 << 31;
        let err = encode_body(&body, LeafEncoding::Packed).unwrap_err();
        assert!(matches!(err, EncodingError::OutOfRange { field: "value", .. }));

        body.value = -(1 << 31);
        assert_eq!(encode_body(&body, LeafEncoding::Packed).unwrap().len(), PACKED_LEN);
    }

    #[test]
    fn test_single_byte_changes_leaf() {
        let base = sample().leaf_hash(LeafEncoding::Packed);
        let variants = [
            FeedRecord { round_id: 915910, ..sample() },
            FeedRecord { feed_id: FeedId::new(1, "ETH/USD").unwrap(), ..sample() },
            FeedRecord { value: 6345679, ..sample() },
            FeedRecord { turnout_bips: 9999, ..sample() },
            FeedRecord { decimals: 6, ..sample() },
        ];
        for record in variants {
            assert_ne!(record.leaf_hash(LeafEncoding::Packed), base);
        }
    }

    #[test]
    fn test_parse_leaf_encoding() {
        assert_eq!("packed".parse::<LeafEncoding>(), Ok(LeafEncoding::Packed));
        assert_eq!("ABI".parse::<LeafEncoding>(), Ok(LeafEncoding::Abi));
        assert!("rlp".parse::<LeafEncoding>().is_err());
    }
}
