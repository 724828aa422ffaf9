//! Spreadsheet import adapter — source B.
//!
//! Input is tabular text: a header row, then one row per account. Each
//! mapped value column holds that account's participation count for one
//! fleet type. Zero, blank, and non-numeric cells yield no record at all
//! (a count of 0 must never create a counter row — the chart layer
//! relies on zero rows being absent).

use crate::error::{StatsError, StatsResult};
use crate::event::ImportRecord;
use crate::store::StatsStore;
use std::collections::BTreeMap;

/// Header cell that carries the account label. Never part of a mapping.
pub const ACCOUNT_COLUMN: &str = "Account";

/// Runtime column-to-fleet-type mapping, supplied by the caller per run.
pub type ColumnMapping = BTreeMap<String, String>;

/// Check a runtime mapping against the persisted whitelist: every mapped
/// column must be a known mapping column and must not be ignored.
pub fn validate_mapping(store: &StatsStore, mapping: &ColumnMapping) -> StatsResult<()> {
    if mapping.values().any(|t| t.trim().is_empty()) {
        return Err(StatsError::InvalidMapping(
            "mapping targets must be non-empty fleet-type names".into(),
        ));
    }

    let known: Vec<String> = store
        .column_mappings()?
        .into_iter()
        .map(|m| m.column_name)
        .collect();
    let ignored = store.ignored_columns()?;

    for column in mapping.keys() {
        if column == ACCOUNT_COLUMN {
            return Err(StatsError::InvalidMapping(format!(
                "'{ACCOUNT_COLUMN}' is the account column and cannot be mapped"
            )));
        }
        if ignored.iter().any(|c| c == column) {
            return Err(StatsError::InvalidMapping(format!(
                "column '{column}' is on the ignore list"
            )));
        }
        if !known.iter().any(|c| c == column) {
            return Err(StatsError::InvalidMapping(format!(
                "column '{column}' is not whitelisted"
            )));
        }
    }
    Ok(())
}

/// Parse import text into normalized records.
///
/// Rows without a non-empty account cell are skipped. Only columns named
/// in `mapping` produce records, and only when the cell parses to a
/// positive integer.
pub fn parse_import(csv_text: &str, mapping: &ColumnMapping) -> StatsResult<Vec<ImportRecord>> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(csv_text.as_bytes());

    let headers = reader
        .headers()
        .map_err(|e| StatsError::Import(format!("unreadable header row: {e}")))?
        .clone();

    let account_idx = headers
        .iter()
        .position(|h| h == ACCOUNT_COLUMN)
        .ok_or_else(|| {
            StatsError::Import(format!("header row has no '{ACCOUNT_COLUMN}' column"))
        })?;

    // Pairs of (cell index, fleet-type name) for the mapped columns that
    // actually appear in this file. Mapped columns absent from the header
    // simply contribute nothing.
    let mapped_columns: Vec<(usize, &str)> = headers
        .iter()
        .enumerate()
        .filter_map(|(idx, header)| {
            mapping.get(header).map(|fleet_type| (idx, fleet_type.as_str()))
        })
        .collect();

    let mut records = Vec::new();
    for row in reader.records() {
        let row = row.map_err(|e| StatsError::Import(format!("unreadable row: {e}")))?;

        let account = row.get(account_idx).unwrap_or("").trim();
        if account.is_empty() {
            log::debug!("import: skipping row without account cell");
            continue;
        }

        for (idx, fleet_type) in &mapped_columns {
            let cell = row.get(*idx).unwrap_or("").trim();
            if cell.is_empty() {
                continue;
            }
            match cell.parse::<u32>() {
                Ok(0) => {}
                Ok(count) => records.push(ImportRecord {
                    account: account.to_string(),
                    fleet_type: (*fleet_type).to_string(),
                    count,
                }),
                Err(_) => log::debug!(
                    "import: account '{account}' column '{fleet_type}' \
                     has non-numeric cell '{cell}', skipping"
                ),
            }
        }
    }
    Ok(records)
}
