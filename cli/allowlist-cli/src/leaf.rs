use alloy_primitives::U256;
use rayon::prelude::*;

use crate::common::{keccak256, Address, Hash};
use crate::dataset::AllocationRecord;

/// Length of the packed `(address, uint256)` encoding.
pub const PACKED_LEN: usize = 20 + 32;

/// Packs an allocation exactly as Solidity's `abi.encodePacked(address, uint256)`:
/// the 20 raw address bytes followed by the amount as a 32-byte big-endian word.
pub fn encode_packed(address: &Address, max_allowed: &U256) -> [u8; PACKED_LEN] {
    let mut packed = [0u8; PACKED_LEN];
    packed[..20].copy_from_slice(address);
    packed[20..].copy_from_slice(&max_allowed.to_be_bytes::<32>());
    packed
}

/// `keccak256(abi.encodePacked(address, maxAllowed))`.
pub fn leaf_hash(address: &Address, max_allowed: &U256) -> Hash {
    keccak256(encode_packed(address, max_allowed))
}

impl AllocationRecord {
    pub fn leaf(&self) -> Hash {
        leaf_hash(&self.address, &self.max_allowed)
    }
}

/// Hashes every record into its leaf. Records are independent, so this runs on
/// the rayon pool; output order matches input order.
pub fn hash_leaves(records: &[AllocationRecord]) -> Vec<Hash> {
    records.par_iter().map(AllocationRecord::leaf).collect()
}
