use anyhow::{Context, Result};
use clap::Args;
use serde::Serialize;
use std::path::PathBuf;

use allowlist_cli::config::Config;
use allowlist_cli::{
    hex_encode, parse_address, parse_hash, write_file_atomic, DirectorySource, Eligibility,
    EligibilityChecker,
};

#[derive(Args, Debug)]
pub struct Cli {
    /// Artifact directory, or a single proof file (bundle or bare map)
    #[arg(short, long)]
    artifact: PathBuf,

    /// Address to check
    #[arg(short = 'w', long)]
    address: String,

    /// Root committed on-chain (hex) [default: $ALLOWLIST_ROOT, else the artifact's root]
    #[arg(short, long)]
    root: Option<String>,

    /// Write the mint-call arguments as JSON when eligible
    #[arg(short, long)]
    output: Option<PathBuf>,
}

/// Arguments for the contract's allowlist mint call.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ClaimOutput {
    address: String,
    max_allowed: String,
    proof: Vec<String>,
    root: String,
}

pub fn run(cli: Cli, config: &Config) -> Result<()> {
    let address = parse_address(&cli.address).context("Invalid address")?;

    let expected_root = cli
        .root
        .as_deref()
        .or(config.expected_root.as_deref())
        .map(parse_hash)
        .transpose()
        .context("Invalid expected root")?;

    let source = DirectorySource::new(&cli.artifact);
    let mut checker = match expected_root {
        Some(root) => EligibilityChecker::with_expected_root(source, root),
        None => EligibilityChecker::new(source),
    };

    let outcome = checker.check(&address);
    println!("{}: {}", hex_encode(address), outcome);

    match outcome {
        Eligibility::Eligible {
            max_allowed,
            proof,
            root,
        } => {
            println!("Proof length: {} nodes", proof.len());
            if let Some(output) = cli.output {
                let claim = ClaimOutput {
                    address: hex_encode(address),
                    max_allowed: max_allowed.to_string(),
                    proof: proof.iter().map(hex_encode).collect(),
                    root: hex_encode(root),
                };
                let json =
                    serde_json::to_string_pretty(&claim).context("Failed to serialize claim")?;
                write_file_atomic(&output, &json).context("Failed to write claim file")?;
                println!("Claim written to {:?}", output);
            }
            Ok(())
        }
        Eligibility::NotListed => anyhow::bail!("Address is not on the allowlist"),
        Eligibility::StaleProof { .. } => {
            anyhow::bail!("Proof is stale for the expected root; fetch a fresh artifact")
        }
        Eligibility::Unavailable { reason } => {
            anyhow::bail!("Could not verify eligibility right now: {}", reason)
        }
    }
}
