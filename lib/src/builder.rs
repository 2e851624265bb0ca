use alloy_primitives::B256;

use crate::encoding::LeafEncoding;
use crate::hash::hash_sorted_pair;
use crate::types::FeedRecord;

/// Sorted-pair Merkle tree over a set of leaf hashes, laid out as a flat
/// array: leaves occupy the last `n` slots in ascending order and node `i`
/// hashes its children `2i + 1` and `2i + 2`.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MerkleTree {
    nodes: Vec<B256>,
    leaves: usize,
}

impl MerkleTree {
    /// Build a tree; duplicate leaves are collapsed.
    pub fn build(leaves: impl IntoIterator<Item = B256>) -> Self {
        let mut sorted: Vec<B256> = leaves.into_iter().collect();
        sorted.sort_unstable();
        sorted.dedup();

        let n = sorted.len();
        if n == 0 {
            return Self::default();
        }

        let mut nodes = vec![B256::ZERO; 2 * n - 1];
        nodes[n - 1..].copy_from_slice(&sorted);
        for i in (0..n - 1).rev() {
            nodes[i] = hash_sorted_pair(&nodes[2 * i + 1], &nodes[2 * i + 2]);
        }

        Self { nodes, leaves: n }
    }

    pub fn from_records<'a>(
        records: impl IntoIterator<Item = &'a FeedRecord>,
        encoding: LeafEncoding,
    ) -> Self {
        Self::build(records.into_iter().map(|r| r.leaf_hash(encoding)))
    }

    pub fn root(&self) -> Option<B256> {
        self.nodes.first().copied()
    }

    pub fn len(&self) -> usize {
        self.leaves
    }

    pub fn is_empty(&self) -> bool {
        self.leaves == 0
    }

    /// Leaves in tree order.
    pub fn leaves(&self) -> &[B256] {
        &self.nodes[self.nodes.len() - self.leaves..]
    }

    /// Sibling hashes from `leaf` up to the root, or `None` if the leaf is
    /// not in the tree.
    pub fn proof(&self, leaf: &B256) -> Option<Vec<B256>> {
        let index = self.leaves().binary_search(leaf).ok()?;
        let mut pos = self.leaves - 1 + index;
        let mut proof = Vec::new();
        while pos > 0 {
            let sibling = if pos % 2 == 1 { pos + 1 } else { pos - 1 };
            proof.push(self.nodes[sibling]);
            pos = (pos - 1) / 2;
        }
        Some(proof)
    }

    pub fn record_proof(&self, record: &FeedRecord, encoding: LeafEncoding) -> Option<Vec<B256>> {
        self.proof(&record.leaf_hash(encoding))
    }
}
