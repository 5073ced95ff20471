use sha3::{Digest, Keccak256};
use std::fs::{self, File};
use std::io::Write;
use std::path::Path;

/// A 20-byte EVM account address.
pub type Address = [u8; 20];

/// A 32-byte Keccak-256 digest (leaf, internal node or root).
pub type Hash = [u8; 32];

/// Parses an Ethereum address from a hex string.
///
/// # Arguments
/// * `addr_str` - The address string, with or without "0x" prefix
///
/// # Returns
/// A 20-byte array representing the address
///
/// # Errors
/// Returns an error if the address is not 40 hex characters, contains invalid hex,
/// or is the zero address
pub fn parse_address(addr_str: &str) -> anyhow::Result<Address> {
    let address = decode_address(addr_str)?;
    if address == [0u8; 20] {
        anyhow::bail!("Zero address not allowed");
    }
    Ok(address)
}

/// Like [`parse_address`] but accepts the zero address. Used when reading back
/// artifacts, which may legitimately contain any 20-byte key.
pub fn decode_address(addr_str: &str) -> anyhow::Result<Address> {
    let trimmed = addr_str.trim();
    let cleaned = trimmed.strip_prefix("0x").unwrap_or(trimmed);
    if cleaned.len() != 40 {
        anyhow::bail!(
            "Invalid address length: expected 40 hex chars, got {}",
            cleaned.len()
        );
    }
    let mut address = [0u8; 20];
    hex::decode_to_slice(cleaned, &mut address)
        .map_err(|e| anyhow::anyhow!("Invalid hex encoding: {}", e))?;
    Ok(address)
}

/// Parses a 32-byte hash (Merkle root, leaf or proof element) from hex.
///
/// The "0x" prefix is optional and either letter case is accepted.
pub fn parse_hash(hash_str: &str) -> anyhow::Result<Hash> {
    let trimmed = hash_str.trim();
    let cleaned = trimmed.strip_prefix("0x").unwrap_or(trimmed);
    if cleaned.len() != 64 {
        anyhow::bail!(
            "Invalid hash length: expected 64 hex chars, got {}",
            cleaned.len()
        );
    }
    let mut hash = [0u8; 32];
    hex::decode_to_slice(cleaned, &mut hash)
        .map_err(|e| anyhow::anyhow!("Invalid hex encoding: {}", e))?;
    Ok(hash)
}

/// Lowercase "0x"-prefixed hex, the form used in every persisted artifact.
pub fn hex_encode(bytes: impl AsRef<[u8]>) -> String {
    format!("0x{}", hex::encode(bytes))
}

/// Keccak-256 of an arbitrary byte string.
pub fn keccak256(data: impl AsRef<[u8]>) -> Hash {
    Keccak256::digest(data.as_ref()).into()
}

/// Canonical pairwise hash of two Merkle nodes.
///
/// The operands are ordered as big-endian integers and hashed smaller-first, so
/// `hash_pair(a, b) == hash_pair(b, a)`. Lexicographic order on fixed-width
/// byte arrays is the big-endian integer order.
pub fn hash_pair(a: &Hash, b: &Hash) -> Hash {
    let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
    Keccak256::new()
        .chain_update(lo)
        .chain_update(hi)
        .finalize()
        .into()
}

/// Writes `contents` to `path` via a sibling temp file and a rename, so readers
/// never observe a half-written file.
pub fn write_file_atomic(path: &Path, contents: &str) -> anyhow::Result<()> {
    use anyhow::Context;

    let temp_path = path.with_extension("tmp");
    let mut file = File::create(&temp_path)
        .with_context(|| format!("Failed to create temp file {:?}", temp_path))?;
    file.write_all(contents.as_bytes())
        .context("Failed to write to temp file")?;
    file.flush().context("Failed to flush temp file")?;
    file.sync_all().context("Failed to sync temp file")?;
    fs::rename(&temp_path, path)
        .with_context(|| format!("Failed to move temp file to {:?}", path))?;
    Ok(())
}
