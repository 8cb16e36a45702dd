//! Output module: cleaning and persistence of scraped records
//!
//! Records flow through a trivial cleaning pass (row dedup by URL,
//! empty-string fill for missing scalars) and then into one of the
//! [`RecordSink`] implementations: JSON, CSV, or SQLite.

mod clean;
mod csv_sink;
mod json_sink;
mod sqlite_sink;

pub use clean::{clean_records, dedup_records, fill_missing};
pub use csv_sink::CsvSink;
pub use json_sink::JsonSink;
pub use sqlite_sink::SqliteSink;

use crate::config::{OutputConfig, OutputFormat};
use crate::extract::PageRecord;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors that can occur during output operations
#[derive(Debug, Error)]
pub enum OutputError {
    #[error("Failed to write output: {0}")]
    Write(String),

    #[error("Failed to serialize records: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for output operations
pub type OutputResult<T> = Result<T, OutputError>;

/// Trait for record sinks
///
/// A sink persists the full cleaned record set for a run in one shot.
pub trait RecordSink {
    /// Writes all records to the sink's target
    ///
    /// Returns the path of the file that was written.
    fn write_records(&self, records: &[PageRecord]) -> OutputResult<PathBuf>;
}

/// Builds the output path for a run: `<dir>/<file>.<ext>`
///
/// A file stem that already carries the format's extension is kept as-is.
pub fn output_path(config: &OutputConfig) -> PathBuf {
    let extension = config.format.extension();
    let file = if config.file.ends_with(&format!(".{}", extension)) {
        config.file.clone()
    } else {
        format!("{}.{}", config.file, extension)
    };
    Path::new(&config.dir).join(file)
}

/// Writes records to the configured sink, creating the output directory
pub fn write_records(config: &OutputConfig, records: &[PageRecord]) -> OutputResult<PathBuf> {
    std::fs::create_dir_all(&config.dir)?;
    let path = output_path(config);

    let written = match config.format {
        OutputFormat::Json => JsonSink::new(path).write_records(records)?,
        OutputFormat::Csv => CsvSink::new(path).write_records(records)?,
        OutputFormat::Sqlite => {
            SqliteSink::new(path, &config.table_name).write_records(records)?
        }
    };

    tracing::info!("Saved {} records to {}", records.len(), written.display());
    Ok(written)
}
