//! The persisted result of one generation run: a root plus one proof entry per
//! address. Artifacts are immutable once built; a changed allowlist is a new
//! artifact with a new root.

use alloy_primitives::U256;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::common::{
    decode_address, hex_encode, parse_hash, write_file_atomic, Address, Hash,
};
use crate::dataset::{deduplicate, parse_amount, AllocationRecord};
use crate::error::{ArtifactError, MerkleError};
use crate::leaf::{hash_leaves, leaf_hash};
use crate::merkle::MerkleTree;
use crate::verify::check_allocation;

pub const ROOT_FILE: &str = "root.json";
pub const LEAVES_FILE: &str = "leaves.json";
pub const PROOFS_FILE: &str = "proofs.json";
pub const BUNDLE_FILE: &str = "allowlist.json";

/// `root.json`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RootFile {
    pub root: String,
}

/// One element of `leaves.json`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeafRecord {
    pub address: String,
    pub max_allowed: String,
    pub leaf: String,
}

/// Amount as it appears in a proof file. Written as a decimal string; plain
/// JSON numbers are accepted on read.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum JsonAmount {
    Decimal(String),
    Number(u64),
}

impl JsonAmount {
    fn to_u256(&self) -> Option<U256> {
        match self {
            JsonAmount::Decimal(s) => parse_amount(s.trim()),
            JsonAmount::Number(n) => Some(U256::from(*n)),
        }
    }
}

/// One value of `proofs.json`, keyed by lowercase address.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProofFileEntry {
    pub max_allowed: JsonAmount,
    #[serde(default)]
    pub proof: Vec<String>,
}

pub type ProofMap = BTreeMap<String, ProofFileEntry>;

/// `allowlist.json`: root and proof map in a single document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BundleFile {
    pub root: String,
    pub entries: ProofMap,
}

/// Shapes accepted when reading a single proof file.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ProofFileContents {
    Bundle {
        root: Option<String>,
        entries: ProofMap,
    },
    Bare(ProofMap),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactEntry {
    pub max_allowed: U256,
    pub proof: Vec<Hash>,
}

impl ArtifactEntry {
    fn to_file_entry(&self) -> ProofFileEntry {
        ProofFileEntry {
            max_allowed: JsonAmount::Decimal(self.max_allowed.to_string()),
            proof: self.proof.iter().map(hex_encode).collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AllowlistArtifact {
    root: Hash,
    entries: BTreeMap<Address, ArtifactEntry>,
}

impl AllowlistArtifact {
    /// Hashes the records, builds the tree and derives one proof per address.
    ///
    /// # Errors
    /// Returns [`MerkleError::EmptyTree`] if `records` is empty.
    pub fn generate(records: &[AllocationRecord]) -> Result<Self, MerkleError> {
        let records = deduplicate(records.iter().copied());
        let leaves = hash_leaves(&records);
        let tree = MerkleTree::from_leaves(leaves.clone())?;
        info!(
            leaves = tree.leaf_count(),
            depth = tree.depth(),
            root = %hex_encode(tree.root()),
            "built merkle tree"
        );

        let mut entries = BTreeMap::new();
        for (record, leaf) in records.iter().zip(&leaves) {
            let proof = tree.proof_for_leaf(leaf)?;
            entries.insert(
                record.address,
                ArtifactEntry {
                    max_allowed: record.max_allowed,
                    proof,
                },
            );
        }

        Ok(Self {
            root: tree.root(),
            entries,
        })
    }

    pub fn from_parts(root: Hash, entries: BTreeMap<Address, ArtifactEntry>) -> Self {
        Self { root, entries }
    }

    pub fn root(&self) -> Hash {
        self.root
    }

    pub fn entry(&self, address: &Address) -> Option<&ArtifactEntry> {
        self.entries.get(address)
    }

    pub fn entries(&self) -> impl Iterator<Item = (&Address, &ArtifactEntry)> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Checks that every entry's proof reproduces the root.
    ///
    /// # Errors
    /// Returns [`ArtifactError::InvalidEntry`] for the first entry that fails.
    pub fn validate(&self) -> Result<(), ArtifactError> {
        for (address, entry) in &self.entries {
            check_allocation(address, &entry.max_allowed, &entry.proof, &self.root).map_err(
                |source| ArtifactError::InvalidEntry {
                    address: hex_encode(address),
                    source,
                },
            )?;
        }
        Ok(())
    }

    pub fn root_file(&self) -> RootFile {
        RootFile {
            root: hex_encode(self.root),
        }
    }

    /// Leaf records in canonical leaf order.
    pub fn leaf_records(&self) -> Vec<LeafRecord> {
        let mut leaves: Vec<(Hash, &Address, &ArtifactEntry)> = self
            .entries
            .iter()
            .map(|(address, entry)| (leaf_hash(address, &entry.max_allowed), address, entry))
            .collect();
        leaves.sort_unstable_by(|a, b| a.0.cmp(&b.0));
        leaves
            .into_iter()
            .map(|(leaf, address, entry)| LeafRecord {
                address: hex_encode(address),
                max_allowed: entry.max_allowed.to_string(),
                leaf: hex_encode(leaf),
            })
            .collect()
    }

    pub fn proof_map(&self) -> ProofMap {
        self.entries
            .iter()
            .map(|(address, entry)| (hex_encode(address), entry.to_file_entry()))
            .collect()
    }

    pub fn bundle(&self) -> BundleFile {
        BundleFile {
            root: hex_encode(self.root),
            entries: self.proof_map(),
        }
    }

    /// Writes `leaves.json`, `proofs.json` (and `allowlist.json` when `bundle`
    /// is set) into `dir`, then `root.json` last, creating `dir` if needed.
    ///
    /// Every document is serialized before the first file is touched, and each
    /// file is replaced atomically. Readers of a directory prefer the bundle,
    /// which switches in one rename. Without a bundle, a reader that lands
    /// mid-publish sees new proofs under the old root, which fails to verify
    /// instead of granting anything. A bundle left by an earlier run is
    /// removed first so it cannot shadow the new split files.
    pub fn write_to_dir(&self, dir: &Path, bundle: bool) -> anyhow::Result<Vec<PathBuf>> {
        use anyhow::Context;

        let mut outputs = vec![
            (LEAVES_FILE, to_json(&self.leaf_records())?),
            (PROOFS_FILE, to_json(&self.proof_map())?),
        ];
        if bundle {
            outputs.push((BUNDLE_FILE, to_json(&self.bundle())?));
        }
        outputs.push((ROOT_FILE, to_json(&self.root_file())?));

        fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create output directory {:?}", dir))?;

        let stale_bundle = dir.join(BUNDLE_FILE);
        if !bundle && stale_bundle.is_file() {
            fs::remove_file(&stale_bundle)
                .with_context(|| format!("Failed to remove stale {}", BUNDLE_FILE))?;
            debug!(path = %stale_bundle.display(), "removed stale bundle");
        }

        let mut written = Vec::with_capacity(outputs.len());
        for (name, contents) in outputs {
            let path = dir.join(name);
            write_file_atomic(&path, &contents)
                .with_context(|| format!("Failed to write {}", name))?;
            debug!(path = %path.display(), "wrote artifact file");
            written.push(path);
        }
        Ok(written)
    }

    /// Loads an artifact from a directory, or from a single proof file in
    /// bundle or bare-map form. A directory is read through its
    /// `allowlist.json` when present, otherwise from `proofs.json` and
    /// `root.json`. For a bare map the root is read from a sibling `root.json`.
    ///
    /// The result is not validated; stale proofs surface at verification time.
    pub fn load(path: &Path) -> Result<Self, ArtifactError> {
        if path.is_dir() {
            let bundle = path.join(BUNDLE_FILE);
            if bundle.is_file() {
                return Self::load(&bundle);
            }
            let entries: ProofMap = read_json(&path.join(PROOFS_FILE))?;
            let root: RootFile = read_json(&path.join(ROOT_FILE))?;
            return Self::from_file_parts(&root.root, entries);
        }

        match read_json::<ProofFileContents>(path)? {
            ProofFileContents::Bundle {
                root: Some(root),
                entries,
            } => Self::from_file_parts(&root, entries),
            ProofFileContents::Bundle {
                root: None,
                entries,
            }
            | ProofFileContents::Bare(entries) => {
                let root_path = path
                    .parent()
                    .map(|dir| dir.join(ROOT_FILE))
                    .unwrap_or_else(|| PathBuf::from(ROOT_FILE));
                let root: RootFile = read_json(&root_path)?;
                Self::from_file_parts(&root.root, entries)
            }
        }
    }

    fn from_file_parts(root: &str, file_entries: ProofMap) -> Result<Self, ArtifactError> {
        let root = parse_hash(root)
            .map_err(|e| ArtifactError::Malformed(format!("root {:?}: {:#}", root, e)))?;

        let mut entries = BTreeMap::new();
        for (key, file_entry) in file_entries {
            let address = decode_address(&key)
                .map_err(|e| ArtifactError::Malformed(format!("address {:?}: {:#}", key, e)))?;
            let max_allowed = file_entry.max_allowed.to_u256().ok_or_else(|| {
                ArtifactError::Malformed(format!(
                    "maxAllowed {:?} for {} is not a decimal integer",
                    file_entry.max_allowed, key
                ))
            })?;
            let proof = file_entry
                .proof
                .iter()
                .map(|element| {
                    parse_hash(element).map_err(|e| {
                        ArtifactError::Malformed(format!(
                            "proof element {:?} for {}: {:#}",
                            element, key, e
                        ))
                    })
                })
                .collect::<Result<Vec<_>, _>>()?;
            if entries
                .insert(address, ArtifactEntry { max_allowed, proof })
                .is_some()
            {
                return Err(ArtifactError::Malformed(format!(
                    "address {} appears more than once",
                    hex_encode(address)
                )));
            }
        }

        Ok(Self { root, entries })
    }
}

fn to_json<T: Serialize>(value: &T) -> anyhow::Result<String> {
    let mut json = serde_json::to_string_pretty(value)?;
    json.push('\n');
    Ok(json)
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T, ArtifactError> {
    let contents = fs::read_to_string(path).map_err(|source| ArtifactError::Io {
        path: path.display().to_string(),
        source,
    })?;
    serde_json::from_str(&contents).map_err(|source| ArtifactError::Json {
        path: path.display().to_string(),
        source,
    })
}
