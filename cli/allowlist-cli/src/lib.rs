pub mod artifact;
pub mod common;
pub mod config;
pub mod dataset;
pub mod eligibility;
pub mod error;
pub mod leaf;
pub mod merkle;
pub mod verify;

pub use artifact::AllowlistArtifact;
pub use common::{
    decode_address, hash_pair, hex_encode, keccak256, parse_address, parse_hash,
    write_file_atomic, Address, Hash,
};
pub use dataset::{parse_dataset, AllocationRecord};
pub use eligibility::{
    ArtifactSource, DirectorySource, Eligibility, EligibilityChecker, Snapshot,
};
pub use error::{ArtifactError, FetchError, MerkleError, ProofMismatchError, ValidationError};
pub use leaf::leaf_hash;
pub use merkle::MerkleTree;
pub use verify::{check_allocation, compute_root, verify_allocation, verify_proof};
