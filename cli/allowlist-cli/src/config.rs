use std::env;
use std::path::PathBuf;

/// Environment-backed defaults for the CLI. Explicit arguments win.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Where `generate` writes artifacts when no directory is given.
    pub output_dir: PathBuf,
    /// Root committed on-chain (hex), used by `check` when `--root` is absent.
    /// Parsed by the caller so a malformed value is reported, not ignored.
    pub expected_root: Option<String>,
    /// `tracing` filter directive used when `RUST_LOG` is unset.
    pub log_filter: String,
}

impl Config {
    pub fn from_env() -> Self {
        Self::from_vars(|key| env::var(key).ok())
    }

    fn from_vars(var: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();

        let output_dir = var("ALLOWLIST_OUTPUT_DIR")
            .filter(|dir| !dir.trim().is_empty())
            .map(PathBuf::from)
            .unwrap_or(defaults.output_dir);

        let expected_root = var("ALLOWLIST_ROOT").filter(|root| !root.trim().is_empty());

        let log_filter = var("ALLOWLIST_LOG")
            .filter(|filter| !filter.trim().is_empty())
            .unwrap_or(defaults.log_filter);

        Self {
            output_dir,
            expected_root,
            log_filter,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("."),
            expected_root: None,
            log_filter: "info".to_string(),
        }
    }
}
