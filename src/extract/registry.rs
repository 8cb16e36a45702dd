//! Custom site-parser registry
//!
//! Site-specific parsers are registered against a URL prefix and selected
//! by longest-prefix match, falling back to the built-in extractor when no
//! prefix matches. A parser is any collaborator exposing
//! `parse(html, url) -> PageRecord`.

use crate::extract::record::PageRecord;
use crate::extract::ExtractError;
use crate::url::longest_prefix_match;
use std::sync::Arc;

/// Capability interface for site-specific parsing
pub trait SiteParser: Send + Sync {
    /// Parses fetched HTML into a record
    fn parse(&self, html: &str, url: &str) -> Result<PageRecord, ExtractError>;
}

/// Maps URL prefixes to site parsers
#[derive(Default)]
pub struct ParserRegistry {
    prefixes: Vec<String>,
    parsers: Vec<Arc<dyn SiteParser>>,
}

impl ParserRegistry {
    /// Creates an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a parser for all URLs starting with `prefix`
    pub fn register(&mut self, prefix: impl Into<String>, parser: Arc<dyn SiteParser>) {
        self.prefixes.push(prefix.into());
        self.parsers.push(parser);
    }

    /// Resolves the most specific parser for a URL
    pub fn resolve(&self, url: &str) -> Option<&Arc<dyn SiteParser>> {
        longest_prefix_match(&self.prefixes, url).map(|idx| &self.parsers[idx])
    }

    /// Returns the number of registered parsers
    pub fn len(&self) -> usize {
        self.parsers.len()
    }

    /// Returns true when no parsers are registered
    pub fn is_empty(&self) -> bool {
        self.parsers.is_empty()
    }
}
