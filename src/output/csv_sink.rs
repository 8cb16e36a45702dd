//! CSV record sink
//!
//! One row per record with a stable column order. Nested fields (links,
//! tables, metadata) are JSON-encoded into their cells, since CSV has no
//! nesting of its own.

use crate::extract::PageRecord;
use crate::output::{OutputResult, RecordSink};
use std::path::PathBuf;

/// Column order for CSV output
const COLUMNS: &[&str] = &[
    "url",
    "status",
    "title",
    "text",
    "links",
    "tables",
    "metadata",
    "error",
    "error_kind",
    "attempts",
    "elapsed_ms",
];

/// Sink writing records to a CSV file
pub struct CsvSink {
    path: PathBuf,
}

impl CsvSink {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }
}

impl RecordSink for CsvSink {
    fn write_records(&self, records: &[PageRecord]) -> OutputResult<PathBuf> {
        let mut writer = csv::Writer::from_path(&self.path)?;

        writer.write_record(COLUMNS)?;

        for record in records {
            let links = serde_json::to_string(&record.links)?;
            let tables = serde_json::to_string(&record.tables)?;
            let metadata = serde_json::to_string(&record.metadata)?;
            let attempts = record.attempts.to_string();
            let elapsed_ms = record.elapsed_ms.to_string();

            writer.write_record([
                record.url.as_str(),
                record.status.as_str(),
                record.title.as_deref().unwrap_or(""),
                record.text.as_deref().unwrap_or(""),
                links.as_str(),
                tables.as_str(),
                metadata.as_str(),
                record.error.as_deref().unwrap_or(""),
                record.error_kind.as_deref().unwrap_or(""),
                attempts.as_str(),
                elapsed_ms.as_str(),
            ])?;
        }

        writer.flush()?;
        Ok(self.path.clone())
    }
}
