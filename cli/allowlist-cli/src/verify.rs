//! Proof verification with the same sorted-pair folding the minting contract
//! performs on-chain. Generation and client-side pre-checks both go through
//! these functions.

use alloy_primitives::U256;

use crate::common::{hash_pair, Address, Hash};
use crate::error::ProofMismatchError;
use crate::leaf::leaf_hash;

/// Folds `proof` into `leaf` with the canonical pairwise hash.
pub fn compute_root(leaf: &Hash, proof: &[Hash]) -> Hash {
    proof
        .iter()
        .fold(*leaf, |current, sibling| hash_pair(&current, sibling))
}

pub fn verify_proof(leaf: &Hash, proof: &[Hash], root: &Hash) -> bool {
    compute_root(leaf, proof) == *root
}

/// Like [`verify_proof`], but reports the recomputed root on mismatch.
pub fn check_proof(leaf: &Hash, proof: &[Hash], root: &Hash) -> Result<(), ProofMismatchError> {
    let computed = compute_root(leaf, proof);
    if computed == *root {
        Ok(())
    } else {
        Err(ProofMismatchError {
            computed,
            expected: *root,
        })
    }
}

/// Verifies a claimed allocation the way the contract does: rebuild the leaf
/// from `(address, max_allowed)` and fold the proof into it.
pub fn check_allocation(
    address: &Address,
    max_allowed: &U256,
    proof: &[Hash],
    root: &Hash,
) -> Result<(), ProofMismatchError> {
    check_proof(&leaf_hash(address, max_allowed), proof, root)
}

pub fn verify_allocation(
    address: &Address,
    max_allowed: &U256,
    proof: &[Hash],
    root: &Hash,
) -> bool {
    check_allocation(address, max_allowed, proof, root).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::parse_hash;

    const GOLDEN_ROOT: &str = "0xffdc20935fa406500ad9886e97f1f5fa3638021d0c9d718380570919ca99fb90";

    fn address(last: u8) -> Address {
        let mut address = [0xaau8; 20];
        address[19] = 0xa0 | last;
        address
    }

    fn golden_proof(last: u8) -> Vec<Hash> {
        let hexes: &[&str] = match last {
            1 => &[
                "0x8d83d1bfdafb1b4be89555fa0f1cf1e856d67ecdbb21cb9c1df4dcf041733851",
                "0x9c8bc71bc4928fb71f2d90ed91804c98bc1ef1e8ead0cd70643370bab8541382",
            ],
            2 => &["0xe6036327a6dd3bf08ace5040333aaab3a3c4046b3eee3458d489688cc31cf366"],
            3 => &[
                "0x378a8834f7b6521467ec5a27dd76d521f4a3e16e6a482500315fce45f0de5e03",
                "0x9c8bc71bc4928fb71f2d90ed91804c98bc1ef1e8ead0cd70643370bab8541382",
            ],
            _ => unreachable!(),
        };
        hexes.iter().map(|s| parse_hash(s).unwrap()).collect()
    }

    #[test]
    fn test_golden_allocations_verify() {
        let root = parse_hash(GOLDEN_ROOT).unwrap();
        for last in 1..=3u8 {
            let amount = U256::from(u64::from(last) * 10);
            assert!(verify_allocation(&address(last), &amount, &golden_proof(last), &root));
        }
    }

    #[test]
    fn test_empty_proof_compares_leaf_to_root() {
        let leaf = leaf_hash(&address(1), &U256::from(10u64));
        assert_eq!(compute_root(&leaf, &[]), leaf);
        assert!(verify_proof(&leaf, &[], &leaf));
    }

    #[test]
    fn test_changed_amount_fails() {
        let root = parse_hash(GOLDEN_ROOT).unwrap();
        let err = check_allocation(&address(1), &U256::from(11u64), &golden_proof(1), &root)
            .unwrap_err();
        assert_eq!(err.expected, root);
        assert_ne!(err.computed, root);
    }

    #[test]
    fn test_other_address_cannot_reuse_proof() {
        let root = parse_hash(GOLDEN_ROOT).unwrap();
        assert!(!verify_allocation(&address(4), &U256::from(10u64), &golden_proof(1), &root));
    }

    #[test]
    fn test_any_single_bit_flip_in_proof_fails() {
        let root = parse_hash(GOLDEN_ROOT).unwrap();
        let leaf = leaf_hash(&address(1), &U256::from(10u64));
        let proof = golden_proof(1);
        for element in 0..proof.len() {
            for bit in 0..256usize {
                let mut tampered = proof.clone();
                tampered[element][bit / 8] ^= 1u8 << (bit % 8);
                assert!(
                    !verify_proof(&leaf, &tampered, &root),
                    "element {element} bit {bit}"
                );
            }
        }
    }

    #[test]
    fn test_truncated_or_extended_proof_fails() {
        let root = parse_hash(GOLDEN_ROOT).unwrap();
        let leaf = leaf_hash(&address(1), &U256::from(10u64));
        let proof = golden_proof(1);
        assert!(!verify_proof(&leaf, &proof[..1], &root));
        let mut extended = proof.clone();
        extended.push(root);
        assert!(!verify_proof(&leaf, &extended, &root));
    }
}
