use anyhow::{Context, Result};
use clap::Args;
use std::fs;
use std::path::PathBuf;
use tracing::info;

use allowlist_cli::config::Config;
use allowlist_cli::{hex_encode, parse_dataset, AllowlistArtifact};

#[derive(Args, Debug)]
pub struct Cli {
    /// Allocation CSV with an address column and an amount column
    input: PathBuf,

    /// Directory for root.json, leaves.json and proofs.json
    /// [default: $ALLOWLIST_OUTPUT_DIR or the current directory]
    output_dir: Option<PathBuf>,

    /// Also write allowlist.json containing the root and every proof
    #[arg(long)]
    bundle: bool,
}

pub fn run(cli: Cli, config: &Config) -> Result<()> {
    info!(input = %cli.input.display(), "reading allocations");
    let text = fs::read_to_string(&cli.input)
        .with_context(|| format!("Failed to read input file {:?}", cli.input))?;

    let records = parse_dataset(&text)
        .with_context(|| format!("Invalid allocation dataset {:?}", cli.input))?;
    info!(records = records.len(), "dataset normalized");

    let artifact = AllowlistArtifact::generate(&records).context("Failed to build Merkle tree")?;
    artifact
        .validate()
        .context("Generated proofs do not reproduce the root")?;

    let output_dir = cli.output_dir.unwrap_or_else(|| config.output_dir.clone());
    let written = artifact
        .write_to_dir(&output_dir, cli.bundle)
        .context("Failed to write allowlist artifacts")?;

    println!("Root: {}", hex_encode(artifact.root()));
    let names: Vec<String> = written
        .iter()
        .filter_map(|path| path.file_name())
        .map(|name| name.to_string_lossy().into_owned())
        .collect();
    println!("Generated: {} in {}", names.join(", "), output_dir.display());

    Ok(())
}
