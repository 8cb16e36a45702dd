//! URL handling for Inkcap
//!
//! This module provides the [`Origin`] type (the unit of robots.txt caching
//! and rate-limit bucketing) and URL-prefix matching used to select custom
//! site parsers.

use crate::{UrlError, UrlResult};
use std::fmt;
use url::Url;

/// The origin of a URL: scheme + host + port
///
/// All URLs sharing an origin share one robots.txt cache entry and one
/// rate-limiter bucket. The port falls back to the scheme's known default
/// so `http://example.com` and `http://example.com:80` are the same origin.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Origin {
    scheme: String,
    host: String,
    port: Option<u16>,
}

impl Origin {
    /// Derives the origin from a parsed URL
    ///
    /// # Errors
    ///
    /// Returns [`UrlError::InvalidScheme`] for non-HTTP(S) URLs and
    /// [`UrlError::MissingHost`] for URLs without a host component.
    pub fn of(url: &Url) -> UrlResult<Self> {
        if url.scheme() != "http" && url.scheme() != "https" {
            return Err(UrlError::InvalidScheme(url.scheme().to_string()));
        }

        let host = url
            .host_str()
            .ok_or(UrlError::MissingHost)?
            .to_lowercase();

        Ok(Self {
            scheme: url.scheme().to_string(),
            host,
            port: url.port_or_known_default(),
        })
    }

    /// Parses a URL string and derives its origin
    pub fn parse(url_str: &str) -> UrlResult<Self> {
        let url = Url::parse(url_str).map_err(|e| UrlError::Parse(e.to_string()))?;
        Self::of(&url)
    }

    /// Returns the URL of this origin's robots.txt file
    pub fn robots_url(&self) -> String {
        format!("{}/robots.txt", self)
    }

    /// Returns the host portion of the origin
    pub fn host(&self) -> &str {
        &self.host
    }
}

impl fmt::Display for Origin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.port {
            Some(port) => write!(f, "{}://{}:{}", self.scheme, self.host, port),
            None => write!(f, "{}://{}", self.scheme, self.host),
        }
    }
}

/// Finds the longest matching prefix for a URL among registered prefixes
///
/// Used by the parser registry to pick the most specific custom parser for
/// a URL. Returns the index of the winning entry, or None when nothing
/// matches.
pub fn longest_prefix_match(prefixes: &[String], url: &str) -> Option<usize> {
    let mut best: Option<(usize, usize)> = None;

    for (idx, prefix) in prefixes.iter().enumerate() {
        if url.starts_with(prefix.as_str()) {
            match best {
                Some((_, len)) if prefix.len() <= len => {}
                _ => best = Some((idx, prefix.len())),
            }
        }
    }

    best.map(|(idx, _)| idx)
}

/// Reads a URL list from a file, one URL per line
///
/// Blank lines and surrounding whitespace are skipped.
pub fn read_urls_from_file(path: &std::path::Path) -> std::io::Result<Vec<String>> {
    let content = std::fs::read_to_string(path)?;
    let urls: Vec<String> = content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect();

    tracing::info!("Read {} URLs from {}", urls.len(), path.display());
    Ok(urls)
}
