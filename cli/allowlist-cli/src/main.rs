#![forbid(unsafe_code)]
#![allow(unreachable_pub)]

use clap::{Parser, Subcommand};
use tracing_subscriber::filter::EnvFilter;

use allowlist_cli::config::Config;

mod check;
mod generate;
mod verify_claim;

#[derive(Parser, Debug)]
#[command(name = "allowlist")]
#[command(about = "Merkle allowlist generation and verification tools", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Build root, leaves and proofs from an allocation CSV
    Generate(generate::Cli),
    /// Resolve an address's eligibility against a published artifact
    Check(check::Cli),
    /// Verify a single (address, amount, proof) claim against a root
    Verify(verify_claim::Cli),
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = Config::from_env();

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.log_filter));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Generate(args) => generate::run(args, &config)?,
        Commands::Check(args) => check::run(args, &config)?,
        Commands::Verify(args) => verify_claim::run(&args)?,
    }

    Ok(())
}
