//! Parsing and normalization of raw allocation datasets.
//!
//! Input is simple comma-separated text with a header row. Rows are validated,
//! rows with an empty address or amount are skipped, and duplicate addresses
//! (compared case-insensitively) collapse to the largest allocation.

use alloy_primitives::U256;
use std::collections::btree_map::Entry;
use std::collections::BTreeMap;
use tracing::debug;

use crate::common::Address;
use crate::error::ValidationError;

/// Header names accepted for the address column, compared after lowercasing.
pub const ADDRESS_HEADERS: &[&str] = &["wallet", "address", "wallet_address", "addy"];

/// Header names accepted for the amount column, compared after lowercasing.
pub const AMOUNT_HEADERS: &[&str] = &["amount", "maxallowed", "allocation", "allo"];

/// One participant and the maximum quantity they may mint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AllocationRecord {
    pub address: Address,
    pub max_allowed: U256,
}

impl AllocationRecord {
    pub fn new(address: Address, max_allowed: U256) -> Self {
        Self {
            address,
            max_allowed,
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct Columns {
    address: usize,
    amount: usize,
}

/// Parses a CSV allocation dataset into deduplicated records.
///
/// Records are returned sorted by address so downstream output is stable.
///
/// # Errors
/// Returns a [`ValidationError`] if the header is missing or lacks a recognised
/// column, if any non-empty address or amount is malformed, or if no row
/// survives parsing.
pub fn parse_dataset(text: &str) -> Result<Vec<AllocationRecord>, ValidationError> {
    let text = text.strip_prefix('\u{feff}').unwrap_or(text);
    let mut lines = text
        .lines()
        .enumerate()
        .map(|(idx, line)| (idx + 1, line))
        .filter(|(_, line)| !line.trim().is_empty());

    let (_, header_line) = lines.next().ok_or(ValidationError::EmptyInput)?;
    let columns = locate_columns(header_line)?;

    let mut records: BTreeMap<Address, AllocationRecord> = BTreeMap::new();
    let mut rows = 0usize;
    let mut skipped = 0usize;

    for (line_num, line) in lines {
        rows += 1;
        let cells: Vec<&str> = line.split(',').map(str::trim).collect();
        let address_str = cells.get(columns.address).copied().unwrap_or("");
        let amount_str = cells.get(columns.amount).copied().unwrap_or("");

        if address_str.is_empty() || amount_str.is_empty() {
            skipped += 1;
            continue;
        }

        let address =
            parse_hex_address(address_str).ok_or_else(|| ValidationError::InvalidAddress {
                line: line_num,
                value: address_str.to_string(),
            })?;
        let max_allowed =
            parse_amount(amount_str).ok_or_else(|| ValidationError::InvalidAmount {
                line: line_num,
                address: address_str.to_string(),
                value: amount_str.to_string(),
            })?;

        merge_record(&mut records, AllocationRecord::new(address, max_allowed));
    }

    if records.is_empty() {
        return Err(ValidationError::NoValidRows);
    }

    debug!(rows, skipped, unique = records.len(), "normalized dataset");
    Ok(records.into_values().collect())
}

/// Collapses records sharing an address, keeping the largest allocation.
///
/// On a tie the first-seen record is kept. Output is sorted by address.
pub fn deduplicate(
    records: impl IntoIterator<Item = AllocationRecord>,
) -> Vec<AllocationRecord> {
    let mut merged = BTreeMap::new();
    for record in records {
        merge_record(&mut merged, record);
    }
    merged.into_values().collect()
}

fn merge_record(records: &mut BTreeMap<Address, AllocationRecord>, record: AllocationRecord) {
    match records.entry(record.address) {
        Entry::Vacant(slot) => {
            slot.insert(record);
        }
        Entry::Occupied(mut slot) => {
            let existing = slot.get_mut();
            debug!(
                address = %hex::encode(record.address),
                kept = %existing.max_allowed.max(record.max_allowed),
                "duplicate address"
            );
            if record.max_allowed > existing.max_allowed {
                existing.max_allowed = record.max_allowed;
            }
        }
    }
}

fn locate_columns(header_line: &str) -> Result<Columns, ValidationError> {
    let header: Vec<String> = header_line
        .split(',')
        .map(|cell| cell.trim().to_lowercase())
        .collect();

    let address = header
        .iter()
        .rposition(|h| ADDRESS_HEADERS.contains(&h.as_str()))
        .ok_or_else(|| ValidationError::MissingAddressColumn {
            expected: ADDRESS_HEADERS.join(", "),
        })?;
    let amount = header
        .iter()
        .rposition(|h| AMOUNT_HEADERS.contains(&h.as_str()))
        .ok_or_else(|| ValidationError::MissingAmountColumn {
            expected: AMOUNT_HEADERS.join(", "),
        })?;

    Ok(Columns { address, amount })
}

/// Strict dataset address form: `0x` followed by exactly 40 hex digits.
fn parse_hex_address(value: &str) -> Option<Address> {
    let digits = value.strip_prefix("0x")?;
    if digits.len() != 40 {
        return None;
    }
    let mut address = [0u8; 20];
    hex::decode_to_slice(digits, &mut address).ok()?;
    Some(address)
}

/// Decimal digits only; no sign, no radix prefix, no separators.
pub fn parse_amount(value: &str) -> Option<U256> {
    if value.is_empty() || !value.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    U256::from_str_radix(value, 10).ok()
}
