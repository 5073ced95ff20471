use thiserror::Error;

use crate::common::{hex_encode, Hash};

/// Rejection of an input dataset. Fatal to a generation run: nothing is written.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("input is empty: no header line found")]
    EmptyInput,

    #[error("address column not found: expected a header named one of [{expected}]")]
    MissingAddressColumn { expected: String },

    #[error("amount column not found: expected a header named one of [{expected}]")]
    MissingAmountColumn { expected: String },

    #[error("line {line}: invalid address {value:?} (expected 0x followed by 40 hex digits)")]
    InvalidAddress { line: usize, value: String },

    #[error("line {line}: amount {value:?} for {address} is not a non-negative 256-bit integer")]
    InvalidAmount {
        line: usize,
        address: String,
        value: String,
    },

    #[error("no valid rows: every row had an empty address or amount")]
    NoValidRows,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum MerkleError {
    #[error("cannot build a Merkle tree from zero leaves")]
    EmptyTree,

    #[error("leaf index {index} is out of bounds for tree with {len} leaves")]
    LeafIndexOutOfBounds { index: usize, len: usize },

    #[error("leaf {0} is not part of the tree")]
    UnknownLeaf(String),
}

/// The recomputed root did not match the committed one. A gating outcome
/// ("ineligible or stale proof"), never a transient fault.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error(
    "ineligible or stale proof: computed root {} does not match expected root {}",
    hex_encode(.computed),
    hex_encode(.expected)
)]
pub struct ProofMismatchError {
    pub computed: Hash,
    pub expected: Hash,
}

/// Failure to read or interpret a persisted artifact.
#[derive(Debug, Error)]
pub enum ArtifactError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {path}: {source}")]
    Json {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("malformed artifact: {0}")]
    Malformed(String),

    #[error("artifact entry for {address} does not verify against its root")]
    InvalidEntry {
        address: String,
        #[source]
        source: ProofMismatchError,
    },
}

/// An artifact lookup that could not be completed. Consumers treat this as
/// zero allocation (fail-closed) and report it as "could not verify right now".
#[derive(Debug, Error)]
#[error("allowlist artifact unavailable: {0}")]
pub struct FetchError(#[from] pub ArtifactError);
