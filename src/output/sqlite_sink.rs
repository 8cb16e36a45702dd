//! SQLite record sink
//!
//! Writes records into a single table with drop-and-recreate semantics per
//! run. Nested fields are JSON-encoded, matching the CSV sink. The table
//! name comes from configuration and is validated as a plain identifier
//! before it reaches any SQL.

use crate::extract::PageRecord;
use crate::output::{OutputError, OutputResult, RecordSink};
use rusqlite::{params, Connection};
use std::path::PathBuf;

/// Sink writing records to a SQLite database
pub struct SqliteSink {
    path: PathBuf,
    table_name: String,
}

impl SqliteSink {
    pub fn new(path: PathBuf, table_name: &str) -> Self {
        Self {
            path,
            table_name: table_name.to_string(),
        }
    }
}

impl RecordSink for SqliteSink {
    fn write_records(&self, records: &[PageRecord]) -> OutputResult<PathBuf> {
        // Config validation enforces identifier-only table names; refuse
        // anything else in case a sink is constructed directly.
        if !is_plain_identifier(&self.table_name) {
            return Err(OutputError::Write(format!(
                "Invalid table name '{}'",
                self.table_name
            )));
        }

        let mut conn = Connection::open(&self.path)?;

        conn.execute_batch(&format!(
            "DROP TABLE IF EXISTS {table};
             CREATE TABLE {table} (
                 url TEXT NOT NULL,
                 status TEXT NOT NULL,
                 title TEXT,
                 text TEXT,
                 links TEXT,
                 tables TEXT,
                 metadata TEXT,
                 error TEXT,
                 error_kind TEXT,
                 attempts INTEGER NOT NULL,
                 elapsed_ms INTEGER NOT NULL
             );",
            table = self.table_name
        ))?;

        let tx = conn.transaction()?;
        {
            let mut stmt = tx.prepare(&format!(
                "INSERT INTO {} (url, status, title, text, links, tables, metadata,
                                 error, error_kind, attempts, elapsed_ms)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
                self.table_name
            ))?;

            for record in records {
                stmt.execute(params![
                    record.url,
                    record.status,
                    record.title.as_deref().unwrap_or(""),
                    record.text.as_deref().unwrap_or(""),
                    serde_json::to_string(&record.links)?,
                    serde_json::to_string(&record.tables)?,
                    serde_json::to_string(&record.metadata)?,
                    record.error.as_deref().unwrap_or(""),
                    record.error_kind.as_deref().unwrap_or(""),
                    record.attempts,
                    record.elapsed_ms as i64,
                ])?;
            }
        }
        tx.commit()?;

        Ok(self.path.clone())
    }
}

/// True for names safe to interpolate into DDL
fn is_plain_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}
