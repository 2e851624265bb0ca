use alloy_primitives::B256;

use crate::error::MalformedProofError;
use crate::hash::hash_sorted_pair;

/// Fold a proof into a root, starting from `leaf`.
///
/// Siblings are consumed left to right; each step hashes the accumulator
/// and the sibling with the numerically smaller one first. An empty proof
/// returns the leaf itself.
pub fn reduce(leaf: B256, proof: &[B256]) -> B256 {
    proof
        .iter()
        .fold(leaf, |acc, sibling| hash_sorted_pair(&acc, sibling))
}

/// Check that every proof element is exactly 32 bytes.
pub fn parse_proof<T: AsRef<[u8]>>(proof: &[T]) -> Result<Vec<B256>, MalformedProofError> {
    proof
        .iter()
        .enumerate()
        .map(|(index, element)| {
            let bytes = element.as_ref();
            B256::try_from(bytes).map_err(|_| MalformedProofError {
                index,
                len: bytes.len(),
            })
        })
        .collect()
}

/// [`reduce`] over an unchecked proof.
pub fn reduce_raw<T: AsRef<[u8]>>(leaf: B256, proof: &[T]) -> Result<B256, MalformedProofError> {
    Ok(reduce(leaf, &parse_proof(proof)?))
}

/// Verify a sorted-pair Merkle proof
///
/// # Arguments
/// * `root` - The committed root
/// * `leaf` - Hash of the encoded record
/// * `proof` - Sibling hashes from the leaf upward
pub fn verify_proof(root: &B256, leaf: B256, proof: &[B256]) -> bool {
    reduce(leaf, proof) == *root
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encoding::LeafEncoding;
    use crate::hash::hash_pair;
    use crate::types::{FeedId, FeedRecord};
    use alloy_primitives::{b256, Bytes};

    fn leaf() -> B256 {
        FeedRecord {
            round_id: 915909,
            feed_id: FeedId::new(1, "BTC/USD").unwrap(),
            value: 6345678,
            turnout_bips: 10000,
            decimals: 5,
        }
        .leaf_hash(LeafEncoding::Packed)
    }

    #[test]
    fn test_empty_proof_is_leaf() {
        assert_eq!(reduce(leaf(), &[]), leaf());
        assert!(verify_proof(&leaf(), leaf(), &[]));
    }

    #[test]
    fn test_reduce_golden_vectors() {
        let low = B256::repeat_byte(0x11);
        let high = B256::repeat_byte(0xff);

        assert_eq!(
            reduce(leaf(), &[low]),
            b256!("53060e2d88567cb1f335e700ac4c6611f0ac9860c85d99177b20063be87a3d45")
        );
        assert_eq!(
            reduce(leaf(), &[high]),
            b256!("137d1219fa300c11da3bcca6db511894bef3f7ea05e7ee00dac964a557723f31")
        );
        assert_eq!(
            reduce(leaf(), &[low, high]),
            b256!("5ea247325bb91d07cd588ec3dbc7bc2028ab9c3c4ce99e7d8f079e1ea184999c")
        );
    }

    #[test]
    fn test_sibling_side_does_not_matter() {
        let low = B256::repeat_byte(0x11);
        let high = B256::repeat_byte(0xff);
        let acc = leaf();

        // leaf (0xc7..) sits between the two siblings
        assert!(low < acc && acc < high);
        assert_eq!(reduce(acc, &[low]), hash_pair(&low, &acc));
        assert_eq!(reduce(acc, &[high]), hash_pair(&acc, &high));

        // swapping roles of accumulator and sibling yields the same hash
        assert_eq!(reduce(acc, &[low]), reduce(low, &[acc]));
        assert_eq!(reduce(acc, &[high]), reduce(high, &[acc]));
    }

    #[test]
    fn test_proof_order_matters() {
        let a = B256::repeat_byte(0x11);
        let b = B256::repeat_byte(0xff);
        assert_ne!(reduce(leaf(), &[a, b]), reduce(leaf(), &[b, a]));
    }

    #[test]
    fn test_mutated_sibling_changes_root() {
        let proof = [B256::repeat_byte(0x11), B256::repeat_byte(0xff)];
        let root = reduce(leaf(), &proof);

        for i in 0..proof.len() {
            for byte in 0..32 {
                let mut mutated = proof;
                mutated[i].0[byte] ^= 0x01;
                assert!(!verify_proof(&root, leaf(), &mutated));
            }
        }
    }

    #[test]
    fn test_parse_proof_rejects_short_element() {
        let proof = vec![
            Bytes::from(vec![0x11u8; 32]),
            Bytes::from(vec![0x22u8; 31]),
        ];
        let err = parse_proof(&proof).unwrap_err();
        assert_eq!(err, MalformedProofError { index: 1, len: 31 });
        assert!(reduce_raw(leaf(), &proof).is_err());
    }

    #[test]
    fn test_parse_proof_accepts_hashes() {
        let proof = vec![Bytes::from(vec![0x11u8; 32])];
        assert_eq!(parse_proof(&proof).unwrap(), vec![B256::repeat_byte(0x11)]);
        assert_eq!(
            reduce_raw(leaf(), &proof).unwrap(),
            reduce(leaf(), &[B256::repeat_byte(0x11)])
        );
    }
}
