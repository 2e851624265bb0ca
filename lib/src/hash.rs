use alloy_primitives::B256;
use sha3::{Digest, Keccak256};

/// Compute Keccak256 hash
pub fn keccak256(data: &[u8]) -> B256 {
    let mut hasher = Keccak256::new();
    hasher.update(data);
    let digest: [u8; 32] = hasher.finalize().into();
    B256::from(digest)
}

/// Hash of the raw 64-byte concatenation `left || right`.
pub fn hash_pair(left: &B256, right: &B256) -> B256 {
    let mut data = [0u8; 64];
    data[..32].copy_from_slice(left.as_slice());
    data[32..].copy_from_slice(right.as_slice());
    keccak256(&data)
}

/// Hash a pair with the smaller value (as a big-endian integer) first.
///
/// Lexicographic comparison of the fixed-width arrays is the big-endian
/// numeric order, so no wide-integer type is involved.
pub fn hash_sorted_pair(a: &B256, b: &B256) -> B256 {
    if a <= b {
        hash_pair(a, b)
    } else {
        hash_pair(b, a)
    }
}
