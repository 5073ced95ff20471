use anyhow::{Context, Result};
use clap::Args;

use allowlist_cli::dataset::parse_amount;
use allowlist_cli::{check_allocation, hex_encode, leaf_hash, parse_address, parse_hash};

#[derive(Args, Debug)]
pub struct Cli {
    /// Claiming address
    #[arg(short = 'w', long)]
    address: String,

    /// Claimed maximum allocation (decimal)
    #[arg(short = 'n', long)]
    amount: String,

    /// Expected Merkle root (hex)
    #[arg(short, long)]
    root: String,

    /// Proof elements, bottom-to-top (hex); repeat or comma-separate
    #[arg(short, long, value_delimiter = ',')]
    proof: Vec<String>,
}

pub fn run(cli: &Cli) -> Result<()> {
    let address = parse_address(&cli.address).context("Invalid address")?;
    let amount = parse_amount(cli.amount.trim())
        .with_context(|| format!("Invalid amount {:?}: expected a decimal integer", cli.amount))?;
    let root = parse_hash(&cli.root).context("Invalid Merkle root")?;
    let proof = cli
        .proof
        .iter()
        .map(|element| parse_hash(element))
        .collect::<Result<Vec<_>>>()
        .context("Invalid proof element")?;

    println!("Leaf: {}", hex_encode(leaf_hash(&address, &amount)));
    check_allocation(&address, &amount, &proof, &root)?;
    println!("Proof valid for {} (maxAllowed {})", hex_encode(address), amount);

    Ok(())
}
