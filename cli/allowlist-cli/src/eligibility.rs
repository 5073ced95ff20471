//! Fail-closed eligibility gating over a published allowlist artifact.
//!
//! Only a proof that verifies against the expected root grants an allocation.
//! Every other outcome, including an artifact that cannot be read, resolves to
//! zero. Unreadable artifacts are reported separately from ineligibility so a
//! participant is not told they are off the list because of a transient fault.

use alloy_primitives::U256;
use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::artifact::{AllowlistArtifact, ArtifactEntry};
use crate::common::{hex_encode, Address, Hash};
use crate::error::FetchError;
use crate::verify::check_allocation;

/// What a source knows about one address, taken from a single read so the
/// entry and the root always belong to the same artifact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot {
    /// The entry for the address, or `None` if it is not listed.
    pub entry: Option<ArtifactEntry>,
    /// The root the artifact was generated under.
    pub root: Hash,
}

/// Somewhere an artifact can be consulted.
pub trait ArtifactSource {
    fn snapshot(&self, address: &Address) -> Result<Snapshot, FetchError>;
}

impl ArtifactSource for AllowlistArtifact {
    fn snapshot(&self, address: &Address) -> Result<Snapshot, FetchError> {
        Ok(Snapshot {
            entry: self.entry(address).cloned(),
            root: self.root(),
        })
    }
}

impl<T: ArtifactSource + ?Sized> ArtifactSource for &T {
    fn snapshot(&self, address: &Address) -> Result<Snapshot, FetchError> {
        (**self).snapshot(address)
    }
}

impl<T: ArtifactSource + ?Sized> ArtifactSource for Arc<T> {
    fn snapshot(&self, address: &Address) -> Result<Snapshot, FetchError> {
        (**self).snapshot(address)
    }
}

/// Reads the persisted artifact from disk on every call, so a republished
/// artifact is picked up by the next lookup. A directory is read through its
/// bundle file when one exists.
#[derive(Debug, Clone)]
pub struct DirectorySource {
    path: PathBuf,
}

impl DirectorySource {
    /// `path` may be an artifact directory or a single proof file.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl ArtifactSource for DirectorySource {
    fn snapshot(&self, address: &Address) -> Result<Snapshot, FetchError> {
        let artifact = AllowlistArtifact::load(&self.path)?;
        artifact.snapshot(address)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Eligibility {
    /// Proof verified against the expected root.
    Eligible {
        max_allowed: U256,
        proof: Vec<Hash>,
        root: Hash,
    },
    /// The artifact has no entry for this address.
    NotListed,
    /// An entry exists but does not reproduce the expected root.
    StaleProof { computed: Hash, expected: Hash },
    /// The artifact could not be consulted.
    Unavailable { reason: String },
}

impl Eligibility {
    /// Allocation to gate on: zero for anything but [`Eligibility::Eligible`].
    pub fn max_allowed(&self) -> U256 {
        match self {
            Eligibility::Eligible { max_allowed, .. } => *max_allowed,
            _ => U256::ZERO,
        }
    }

    pub fn is_eligible(&self) -> bool {
        matches!(self, Eligibility::Eligible { .. })
    }

    /// Whether the outcome is final for this session. `StaleProof` is not:
    /// its remedy is a re-fetch, which may land on a fully published artifact.
    pub fn is_definitive(&self) -> bool {
        matches!(self, Eligibility::Eligible { .. } | Eligibility::NotListed)
    }
}

impl fmt::Display for Eligibility {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Eligibility::Eligible { max_allowed, .. } => {
                write!(f, "eligible: up to {} allowed", max_allowed)
            }
            Eligibility::NotListed => write!(f, "not on the allowlist"),
            Eligibility::StaleProof { expected, .. } => write!(
                f,
                "proof does not match root {}; re-fetch the allowlist and try again",
                hex_encode(expected)
            ),
            Eligibility::Unavailable { reason } => {
                write!(f, "could not verify right now: {}", reason)
            }
        }
    }
}

/// Resolves addresses against an [`ArtifactSource`], caching definitive
/// outcomes per address for the checker's lifetime.
///
/// The checker never retries. An unavailable source or a stale proof is
/// reported as is and the source is consulted again on the next call.
pub struct EligibilityChecker<S> {
    source: S,
    expected_root: Option<Hash>,
    cache: HashMap<Address, Eligibility>,
}

impl<S: ArtifactSource> EligibilityChecker<S> {
    /// Checks proofs against the artifact's own root.
    pub fn new(source: S) -> Self {
        Self {
            source,
            expected_root: None,
            cache: HashMap::new(),
        }
    }

    /// Checks proofs against an externally committed root (the on-chain value),
    /// which takes precedence over whatever root the artifact carries.
    pub fn with_expected_root(source: S, root: Hash) -> Self {
        Self {
            source,
            expected_root: Some(root),
            cache: HashMap::new(),
        }
    }

    pub fn check(&mut self, address: &Address) -> Eligibility {
        if let Some(cached) = self.cache.get(address) {
            return cached.clone();
        }

        let outcome = self.resolve(address);
        debug!(address = %hex_encode(address), %outcome, "eligibility resolved");
        if outcome.is_definitive() {
            self.cache.insert(*address, outcome.clone());
        }
        outcome
    }

    /// Drops cached outcomes, e.g. after a new artifact is published.
    pub fn clear_cache(&mut self) {
        self.cache.clear();
    }

    fn resolve(&self, address: &Address) -> Eligibility {
        let Snapshot { entry, root } = match self.source.snapshot(address) {
            Ok(snapshot) => snapshot,
            Err(e) => return unavailable(address, e),
        };
        let Some(entry) = entry else {
            return Eligibility::NotListed;
        };

        let expected = self.expected_root.unwrap_or(root);
        match check_allocation(address, &entry.max_allowed, &entry.proof, &expected) {
            Ok(()) => Eligibility::Eligible {
                max_allowed: entry.max_allowed,
                proof: entry.proof,
                root: expected,
            },
            Err(mismatch) => Eligibility::StaleProof {
                computed: mismatch.computed,
                expected: mismatch.expected,
            },
        }
    }
}

fn unavailable(address: &Address, error: FetchError) -> Eligibility {
    warn!(
        address = %hex_encode(address),
        error = %error,
        "artifact lookup failed; treating as zero allocation"
    );
    Eligibility::Unavailable {
        reason: error.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::AllocationRecord;
    use crate::error::ArtifactError;
    use std::cell::Cell;

    fn address(last: u8) -> Address {
        let mut address = [0xaau8; 20];
        address[19] = 0xa0 | last;
        address
    }

    fn golden() -> AllowlistArtifact {
        let records: Vec<_> = (1..=3u8)
            .map(|i| AllocationRecord::new(address(i), U256::from(u64::from(i) * 10)))
            .collect();
        AllowlistArtifact::generate(&records).unwrap()
    }

    /// Fails the first `failures` lookups, then serves `artifact`.
    struct FlakySource {
        artifact: AllowlistArtifact,
        failures: Cell<usize>,
        lookups: Cell<usize>,
    }

    impl FlakySource {
        fn new(artifact: AllowlistArtifact, failures: usize) -> Self {
            Self {
                artifact,
                failures: Cell::new(failures),
                lookups: Cell::new(0),
            }
        }
    }

    impl ArtifactSource for FlakySource {
        fn snapshot(&self, address: &Address) -> Result<Snapshot, FetchError> {
            self.lookups.set(self.lookups.get() + 1);
            if self.failures.get() > 0 {
                self.failures.set(self.failures.get() - 1);
                return Err(FetchError(ArtifactError::Malformed("network down".into())));
            }
            self.artifact.snapshot(address)
        }
    }

    #[test]
    fn test_listed_address_is_eligible() {
        let artifact = golden();
        let mut checker = EligibilityChecker::new(&artifact);
        let outcome = checker.check(&address(2));
        assert!(outcome.is_eligible());
        assert_eq!(outcome.max_allowed(), U256::from(20u64));
    }

    #[test]
    fn test_unlisted_address_gets_zero() {
        let artifact = golden();
        let mut checker = EligibilityChecker::new(&artifact);
        let outcome = checker.check(&address(9));
        assert_eq!(outcome, Eligibility::NotListed);
        assert_eq!(outcome.max_allowed(), U256::ZERO);
        assert_eq!(outcome.to_string(), "not on the allowlist");
    }

    #[test]
    fn test_on_chain_root_mismatch_is_stale() {
        let artifact = golden();
        let on_chain = [0x42u8; 32];
        let mut checker = EligibilityChecker::with_expected_root(&artifact, on_chain);
        match checker.check(&address(1)) {
            Eligibility::StaleProof { computed, expected } => {
                assert_eq!(expected, on_chain);
                assert_eq!(computed, artifact.root());
            }
            other => panic!("unexpected outcome {other:?}"),
        }
    }

    #[test]
    fn test_tampered_entry_is_stale() {
        let artifact = golden();
        let mut entries: std::collections::BTreeMap<_, _> = artifact
            .entries()
            .map(|(address, entry)| (*address, entry.clone()))
            .collect();
        if let Some(entry) = entries.get_mut(&address(3)) {
            entry.max_allowed = U256::from(300u64);
        }
        let tampered = AllowlistArtifact::from_parts(artifact.root(), entries);
        let mut checker = EligibilityChecker::new(tampered);
        let outcome = checker.check(&address(3));
        assert!(matches!(outcome, Eligibility::StaleProof { .. }));
        assert_eq!(outcome.max_allowed(), U256::ZERO);
        assert!(checker.check(&address(1)).is_eligible());
    }

    #[test]
    fn test_fetch_failure_fails_closed_and_is_not_cached() {
        let source = Arc::new(FlakySource::new(golden(), 1));
        let mut checker = EligibilityChecker::new(Arc::clone(&source));

        let first = checker.check(&address(1));
        assert!(matches!(first, Eligibility::Unavailable { .. }));
        assert_eq!(first.max_allowed(), U256::ZERO);
        assert!(first.to_string().starts_with("could not verify right now"));
        assert_eq!(source.lookups.get(), 1);

        assert!(checker.check(&address(1)).is_eligible());
        assert_eq!(source.lookups.get(), 2);
    }

    #[test]
    fn test_definitive_outcomes_are_cached() {
        let source = Arc::new(FlakySource::new(golden(), 0));
        let mut checker = EligibilityChecker::new(Arc::clone(&source));

        checker.check(&address(1));
        checker.check(&address(1));
        checker.check(&address(9));
        checker.check(&address(9));
        assert_eq!(source.lookups.get(), 2);

        checker.clear_cache();
        checker.check(&address(1));
        assert_eq!(source.lookups.get(), 3);
    }

    #[test]
    fn test_stale_proof_is_not_cached() {
        let source = Arc::new(FlakySource::new(golden(), 0));
        let mut checker = EligibilityChecker::with_expected_root(Arc::clone(&source), [0x42; 32]);

        assert!(matches!(checker.check(&address(1)), Eligibility::StaleProof { .. }));
        assert!(matches!(checker.check(&address(1)), Eligibility::StaleProof { .. }));
        assert_eq!(source.lookups.get(), 2);
    }

    #[test]
    fn test_directory_source_missing_is_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        let mut checker = EligibilityChecker::new(DirectorySource::new(dir.path().join("gone")));
        assert!(matches!(
            checker.check(&address(1)),
            Eligibility::Unavailable { .. }
        ));
    }

    #[test]
    fn test_directory_source_reads_written_artifact() {
        let dir = tempfile::tempdir().unwrap();
        let artifact = golden();
        artifact.write_to_dir(dir.path(), false).unwrap();

        let source = DirectorySource::new(dir.path());
        let mut checker = EligibilityChecker::with_expected_root(source, artifact.root());
        let outcome = checker.check(&address(3));
        assert_eq!(outcome.max_allowed(), U256::from(30u64));
    }

    /// Golden records plus one more, so every proof and the root change.
    fn republished() -> AllowlistArtifact {
        let records: Vec<_> = (1..=4u8)
            .map(|i| AllocationRecord::new(address(i), U256::from(u64::from(i) * 10)))
            .collect();
        AllowlistArtifact::generate(&records).unwrap()
    }

    #[test]
    fn test_republish_observed_midway_recovers() {
        let dir = tempfile::tempdir().unwrap();
        let old = golden();
        let new = republished();
        old.write_to_dir(dir.path(), false).unwrap();

        let mut checker = EligibilityChecker::new(DirectorySource::new(dir.path()));

        // New proofs are in place but the new root is not yet.
        std::fs::write(
            dir.path().join(crate::artifact::PROOFS_FILE),
            serde_json::to_string(&new.proof_map()).unwrap(),
        )
        .unwrap();
        let midway = checker.check(&address(1));
        assert!(!midway.is_eligible());
        assert_eq!(midway.max_allowed(), U256::ZERO);

        new.write_to_dir(dir.path(), false).unwrap();
        match checker.check(&address(1)) {
            Eligibility::Eligible { root, .. } => assert_eq!(root, new.root()),
            other => panic!("address 1 is listed in both artifacts, got {other:?}"),
        }
    }

    #[test]
    fn test_republish_through_bundle_is_never_mixed() {
        let dir = tempfile::tempdir().unwrap();
        let old = golden();
        let new = republished();
        old.write_to_dir(dir.path(), true).unwrap();

        // Only the new root has landed; the bundle still holds the old artifact.
        std::fs::write(
            dir.path().join(crate::artifact::ROOT_FILE),
            serde_json::to_string(&new.root_file()).unwrap(),
        )
        .unwrap();
        let mut checker = EligibilityChecker::new(DirectorySource::new(dir.path()));
        match checker.check(&address(1)) {
            Eligibility::Eligible { root, .. } => assert_eq!(root, old.root()),
            other => panic!("unexpected outcome {other:?}"),
        }

        new.write_to_dir(dir.path(), true).unwrap();
        checker.clear_cache();
        match checker.check(&address(4)) {
            Eligibility::Eligible { root, .. } => assert_eq!(root, new.root()),
            other => panic!("unexpected outcome {other:?}"),
        }
    }
}
