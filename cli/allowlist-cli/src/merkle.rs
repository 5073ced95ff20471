//! Sorted-pair Merkle tree over a set of leaves.
//!
//! Leaves are sorted ascending (big-endian integer order) and deduplicated, then
//! reduced level by level: adjacent nodes are combined with
//! [`hash_pair`](crate::common::hash_pair), and a trailing odd node is carried up
//! unchanged. The root therefore depends only on the leaf *set*.

use crate::common::{hash_pair, hex_encode, Hash};
use crate::error::MerkleError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MerkleTree {
    /// `levels[0]` holds the sorted leaves; the last level holds only the root.
    levels: Vec<Vec<Hash>>,
}

impl MerkleTree {
    /// Builds the tree from leaves in any order.
    ///
    /// # Errors
    /// Returns [`MerkleError::EmptyTree`] if `leaves` is empty.
    pub fn from_leaves(mut leaves: Vec<Hash>) -> Result<Self, MerkleError> {
        if leaves.is_empty() {
            return Err(MerkleError::EmptyTree);
        }
        leaves.sort_unstable();
        leaves.dedup();

        let mut levels = vec![leaves];
        while let Some(level) = levels.last().filter(|level| level.len() > 1) {
            let next_level: Vec<Hash> = level
                .chunks(2)
                .map(|chunk| match chunk {
                    [left, right] => hash_pair(left, right),
                    [carried] => *carried,
                    _ => unreachable!("chunks(2) yields one or two nodes"),
                })
                .collect();
            levels.push(next_level);
        }

        Ok(Self { levels })
    }

    pub fn root(&self) -> Hash {
        // Construction guarantees a non-empty final level.
        self.levels[self.levels.len() - 1][0]
    }

    /// Leaves in canonical (sorted) order.
    pub fn leaves(&self) -> &[Hash] {
        &self.levels[0]
    }

    pub fn leaf_count(&self) -> usize {
        self.levels[0].len()
    }

    /// Number of combination levels above the leaves.
    pub fn depth(&self) -> usize {
        self.levels.len() - 1
    }

    /// Position of `leaf` in canonical order, if present.
    pub fn leaf_index(&self, leaf: &Hash) -> Option<usize> {
        self.levels[0].binary_search(leaf).ok()
    }

    /// Generates the proof for the leaf at `leaf_index` (canonical order).
    ///
    /// Siblings are listed bottom-to-top. Levels where the node was carried up
    /// without a partner contribute nothing, so a single-leaf tree has an empty
    /// proof.
    ///
    /// # Errors
    /// Returns [`MerkleError::LeafIndexOutOfBounds`] for an unknown index.
    pub fn proof(&self, leaf_index: usize) -> Result<Vec<Hash>, MerkleError> {
        let len = self.leaf_count();
        if leaf_index >= len {
            return Err(MerkleError::LeafIndexOutOfBounds {
                index: leaf_index,
                len,
            });
        }

        let mut proof = Vec::with_capacity(self.depth());
        let mut current_index = leaf_index;

        for level in &self.levels[..self.levels.len() - 1] {
            let sibling_index = current_index ^ 1;
            if let Some(sibling) = level.get(sibling_index) {
                proof.push(*sibling);
            }
            current_index /= 2;
        }

        Ok(proof)
    }

    /// Proof for a leaf looked up by value.
    ///
    /// # Errors
    /// Returns [`MerkleError::UnknownLeaf`] if `leaf` is not in the tree.
    pub fn proof_for_leaf(&self, leaf: &Hash) -> Result<Vec<Hash>, MerkleError> {
        let index = self
            .leaf_index(leaf)
            .ok_or_else(|| MerkleError::UnknownLeaf(hex_encode(leaf)))?;
        self.proof(index)
    }
}
