//! JSON record sink
//!
//! Writes the record set as one pretty-printed JSON array.

use crate::extract::PageRecord;
use crate::output::{OutputResult, RecordSink};
use std::fs::File;
use std::io::BufWriter;
use std::path::PathBuf;

/// Sink writing records to a JSON file
pub struct JsonSink {
    path: PathBuf,
}

impl JsonSink {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }
}

impl RecordSink for JsonSink {
    fn write_records(&self, records: &[PageRecord]) -> OutputResult<PathBuf> {
        let file = File::create(&self.path)?;
        let writer = BufWriter::new(file);
        serde_json::to_writer_pretty(writer, records)?;
        Ok(self.path.clone())
    }
}
