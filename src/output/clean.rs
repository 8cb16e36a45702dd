//! Trivial record cleaning
//!
//! The only dedup this tool performs is row-level: repeated URLs keep
//! their first record. Missing scalar fields are filled with empty
//! strings so every record carries the same columns in CSV and SQLite.

use crate::extract::PageRecord;
use std::collections::HashSet;

/// Removes duplicate records, keeping the first occurrence of each URL
pub fn dedup_records(records: Vec<PageRecord>) -> Vec<PageRecord> {
    let original = records.len();
    let mut seen: HashSet<String> = HashSet::new();
    let deduped: Vec<PageRecord> = records
        .into_iter()
        .filter(|record| seen.insert(record.url.clone()))
        .collect();

    if deduped.len() != original {
        tracing::info!("Removed {} duplicate records", original - deduped.len());
    }

    deduped
}

/// Fills missing scalar fields with empty strings
pub fn fill_missing(records: &mut [PageRecord]) {
    for record in records {
        record.title.get_or_insert_with(String::new);
        record.text.get_or_insert_with(String::new);
        record.error.get_or_insert_with(String::new);
        record.error_kind.get_or_insert_with(String::new);
    }
}

/// Applies the full cleaning pass: dedup then fill
pub fn clean_records(records: Vec<PageRecord>) -> Vec<PageRecord> {
    let mut cleaned = dedup_records(records);
    fill_missing(&mut cleaned);
    cleaned
}
