//! Scraped-page record types
//!
//! One [`PageRecord`] is produced per input URL, whatever its outcome, and
//! handed to the output sinks.

use crate::scrape::{FetchResult, FetchStatus};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A hyperlink extracted from a page
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkEntry {
    /// Absolute URL after resolving against the page URL
    pub href: String,

    /// Anchor text
    pub text: String,

    /// Value of the title attribute, empty when absent
    pub title: String,
}

/// One row of an extracted table: column name to cell text
pub type TableRow = BTreeMap<String, String>;

/// The record produced for one URL
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageRecord {
    /// The requested URL
    pub url: String,

    /// Terminal status: success, denied, or error
    pub status: String,

    /// Page title, when extracted
    #[serde(default)]
    pub title: Option<String>,

    /// Whitespace-collapsed page text, when extracted
    #[serde(default)]
    pub text: Option<String>,

    /// Links found on the page
    #[serde(default)]
    pub links: Vec<LinkEntry>,

    /// Rows of the first matching table
    #[serde(default)]
    pub tables: Vec<TableRow>,

    /// Title and meta tags
    #[serde(default)]
    pub metadata: BTreeMap<String, String>,

    /// Error message for denied/error records
    #[serde(default)]
    pub error: Option<String>,

    /// Error classification for error records
    #[serde(default)]
    pub error_kind: Option<String>,

    /// Number of fetch attempts made
    #[serde(default)]
    pub attempts: u32,

    /// Wall-clock milliseconds spent fetching
    #[serde(default)]
    pub elapsed_ms: u64,
}

impl PageRecord {
    /// Creates an empty record for a fetch outcome, without extraction
    pub fn from_fetch(fetch: &FetchResult) -> Self {
        Self {
            url: fetch.url.clone(),
            status: fetch.status.as_str().to_string(),
            title: None,
            text: None,
            links: Vec::new(),
            tables: Vec::new(),
            metadata: BTreeMap::new(),
            error: fetch.error.clone(),
            error_kind: fetch.error_kind.map(|k| k.as_str().to_string()),
            attempts: fetch.attempts,
            elapsed_ms: fetch.elapsed.as_millis() as u64,
        }
    }

    /// True when the underlying fetch ultimately failed
    ///
    /// Policy denials are refusals, not failures.
    pub fn is_failure(&self) -> bool {
        self.status == FetchStatus::Error.as_str()
    }
}
