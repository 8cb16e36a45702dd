//! Content extraction module
//!
//! Turns fetched pages into [`PageRecord`]s: the built-in extractor
//! honors the configured extraction toggles, and site-specific parsers
//! can be registered by URL prefix to take over for matching URLs.

mod html;
mod record;
mod registry;

pub use html::HtmlExtractor;
pub use record::{LinkEntry, PageRecord, TableRow};
pub use registry::{ParserRegistry, SiteParser};

use thiserror::Error;

/// Errors raised during extraction
#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("Invalid CSS selector: {0}")]
    InvalidSelector(String),

    #[error("Parse failed: {0}")]
    Parse(String),
}
