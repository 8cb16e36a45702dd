//! Built-in HTML extraction
//!
//! Extracts text, links, tables, and metadata from fetched pages using the
//! scraper crate. Which fields are populated is governed by the extraction
//! toggles; with no toggle set, title, text, links and metadata are all
//! extracted.

use crate::config::ExtractConfig;
use crate::extract::record::{LinkEntry, PageRecord, TableRow};
use crate::extract::ExtractError;
use crate::scrape::{FetchResult, FetchStatus};
use scraper::{ElementRef, Html, Selector};
use std::collections::BTreeMap;
use url::Url;

/// Built-in extractor applying the configured toggles
pub struct HtmlExtractor {
    config: ExtractConfig,
    scope: Option<Selector>,
}

impl HtmlExtractor {
    /// Creates an extractor, compiling the optional scoping selector
    pub fn new(config: &ExtractConfig) -> Result<Self, ExtractError> {
        let scope = match &config.selector {
            Some(raw) => Some(
                Selector::parse(raw)
                    .map_err(|e| ExtractError::InvalidSelector(format!("'{}': {}", raw, e)))?,
            ),
            None => None,
        };

        Ok(Self {
            config: config.clone(),
            scope,
        })
    }

    /// Builds the record for a fetch outcome
    ///
    /// Denied and error fetches produce records carrying only status and
    /// error fields; successful fetches are parsed and extracted.
    pub fn record_for(&self, fetch: &FetchResult) -> PageRecord {
        let mut record = PageRecord::from_fetch(fetch);

        if fetch.status != FetchStatus::Success {
            return record;
        }

        let Some(body) = fetch.content.as_deref() else {
            return record;
        };

        let document = Html::parse_document(body);
        record.title = extract_title(&document);

        let default_mode = self.config.is_default();

        if default_mode || self.config.text {
            record.text = Some(self.extract_text(&document));
        }

        if default_mode || self.config.links {
            record.links = extract_links(&document, &fetch.url);
        }

        if self.config.tables {
            record.tables = self.extract_tables(&document);
        }

        if default_mode || self.config.metadata {
            record.metadata = extract_metadata(&document);
        }

        record
    }

    /// Extracts whitespace-collapsed text, scoped to the selector when set
    fn extract_text(&self, document: &Html) -> String {
        let raw: String = match &self.scope {
            Some(selector) => {
                let mut parts: Vec<String> = Vec::new();
                for element in document.select(selector) {
                    parts.push(element.text().collect::<String>());
                }
                if parts.is_empty() {
                    tracing::warn!("No elements matched the extraction selector");
                }
                parts.join(" ")
            }
            None => document.root_element().text().collect(),
        };

        collapse_whitespace(&raw)
    }

    /// Extracts the first matching table as header-keyed rows
    fn extract_tables(&self, document: &Html) -> Vec<TableRow> {
        let table = match &self.scope {
            Some(selector) => document.select(selector).next(),
            None => match Selector::parse("table") {
                Ok(table_selector) => document.select(&table_selector).next(),
                Err(_) => None,
            },
        };

        let Some(table) = table else {
            tracing::warn!("No table found in the page");
            return Vec::new();
        };

        extract_table_rows(table)
    }
}

/// Extracts the page title
fn extract_title(document: &Html) -> Option<String> {
    let selector = Selector::parse("title").ok()?;
    document
        .select(&selector)
        .next()
        .map(|el| collapse_whitespace(&el.text().collect::<String>()))
        .filter(|s| !s.is_empty())
}

/// Extracts `<a href>` links, resolved against the page URL
///
/// `javascript:`, `mailto:`, `tel:` and `data:` links, fragment-only
/// anchors, and hrefs that do not resolve to HTTP(S) are skipped.
fn extract_links(document: &Html, page_url: &str) -> Vec<LinkEntry> {
    let Ok(selector) = Selector::parse("a[href]") else {
        return Vec::new();
    };

    let base = Url::parse(page_url).ok();
    let mut links = Vec::new();

    for element in document.select(&selector) {
        let Some(href) = element.value().attr("href") else {
            continue;
        };

        let Some(resolved) = resolve_link(href, base.as_ref()) else {
            continue;
        };

        links.push(LinkEntry {
            href: resolved,
            text: collapse_whitespace(&element.text().collect::<String>()),
            title: element.value().attr("title").unwrap_or("").to_string(),
        });
    }

    links
}

/// Resolves a link href to an absolute HTTP(S) URL
fn resolve_link(href: &str, base: Option<&Url>) -> Option<String> {
    let href = href.trim();

    if href.is_empty() || href.starts_with('#') {
        return None;
    }

    if href.starts_with("javascript:")
        || href.starts_with("mailto:")
        || href.starts_with("tel:")
        || href.starts_with("data:")
    {
        return None;
    }

    let resolved = match base {
        Some(base) => base.join(href).ok()?,
        None => Url::parse(href).ok()?,
    };

    if resolved.scheme() == "http" || resolved.scheme() == "https" {
        Some(resolved.to_string())
    } else {
        None
    }
}

/// Extracts title and meta tags into a key/value map
fn extract_metadata(document: &Html) -> BTreeMap<String, String> {
    let mut metadata = BTreeMap::new();

    if let Some(title) = extract_title(document) {
        metadata.insert("title".to_string(), title);
    }

    if let Ok(selector) = Selector::parse("meta") {
        for element in document.select(&selector) {
            let value = element.value();
            let Some(content) = value.attr("content") else {
                continue;
            };

            if let Some(name) = value.attr("name") {
                metadata.insert(name.to_string(), content.to_string());
            } else if let Some(property) = value.attr("property") {
                metadata.insert(property.to_string(), content.to_string());
            } else if let Some(http_equiv) = value.attr("http-equiv") {
                metadata.insert(format!("http-equiv:{}", http_equiv), content.to_string());
            }
        }
    }

    metadata
}

/// Extracts the rows of one table element
///
/// Headers come from `<thead>` cells, else the first row, else generated
/// `column_N` names. Rows with more cells than headers spill into
/// generated column names.
fn extract_table_rows(table: ElementRef<'_>) -> Vec<TableRow> {
    let thead_cells = Selector::parse("thead th").ok();
    let row_selector = match Selector::parse("tr") {
        Ok(s) => s,
        Err(_) => return Vec::new(),
    };
    let cell_selector = match Selector::parse("th, td") {
        Ok(s) => s,
        Err(_) => return Vec::new(),
    };

    let mut headers: Vec<String> = thead_cells
        .as_ref()
        .map(|sel| {
            table
                .select(sel)
                .map(|th| collapse_whitespace(&th.text().collect::<String>()))
                .collect()
        })
        .unwrap_or_default();
    let headers_from_thead = !headers.is_empty();

    let rows: Vec<ElementRef<'_>> = table.select(&row_selector).collect();
    let mut skip_first_row = false;

    if !headers_from_thead {
        if let Some(first_row) = rows.first() {
            headers = first_row
                .select(&cell_selector)
                .map(|cell| collapse_whitespace(&cell.text().collect::<String>()))
                .collect();
            skip_first_row = !headers.is_empty();
        }
    }

    let mut result = Vec::new();
    for (idx, row) in rows.iter().enumerate() {
        if skip_first_row && idx == 0 {
            continue;
        }

        if headers_from_thead && row_in_thead(*row) {
            continue;
        }

        let cells: Vec<String> = row
            .select(&cell_selector)
            .map(|cell| collapse_whitespace(&cell.text().collect::<String>()))
            .collect();

        if cells.is_empty() {
            continue;
        }

        let mut row_data = TableRow::new();
        for (i, cell) in cells.into_iter().enumerate() {
            let key = headers
                .get(i)
                .filter(|h| !h.is_empty())
                .cloned()
                .unwrap_or_else(|| format!("column_{}", i + 1));
            row_data.insert(key, cell);
        }
        result.push(row_data);
    }

    result
}

/// True when the row sits inside a `<thead>`
fn row_in_thead(row: ElementRef<'_>) -> bool {
    row.ancestors()
        .filter_map(ElementRef::wrap)
        .any(|ancestor| ancestor.value().name() == "thead")
}

/// Collapses runs of whitespace into single spaces and trims
fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scrape::FetchResult;
    use std::time::Duration;

    const TEST_HTML: &str = r#"
        <!DOCTYPE html>
        <html>
        <head>
            <title>Test Page</title>
            <meta name="description" content="A test page">
            <meta property="og:type" content="article">
        </head>
        <body>
            <h1>Test Page Heading</h1>
            <p>This is a test paragraph with a <a href="https://example.com" title="Example">link text</a>.</p>
            <p>And a <a href="/relative">relative link</a>.</p>
            <a href="javascript:void(0)">Skipped</a>
            <a href="mailto:someone@example.com">Also skipped</a>
            <table>
                <tr><th>Header 1</th><th>Header 2</th></tr>
                <tr><td>Data 1</td><td>Data 2</td></tr>
            </table>
        </body>
        </html>
    "#;

    fn success_fetch(body: &str) -> FetchResult {
        FetchResult {
            url: "https://example.com/page".to_string(),
            status: FetchStatus::Success,
            content: Some(body.to_string()),
            status_code: Some(200),
            error_kind: None,
            error: None,
            attempts: 1,
            elapsed: Duration::from_millis(10),
        }
    }

    fn default_extractor() -> HtmlExtractor {
        HtmlExtractor::new(&ExtractConfig::default()).unwrap()
    }

    #[test]
    fn test_default_mode_extracts_everything() {
        let record = default_extractor().record_for(&success_fetch(TEST_HTML));

        assert_eq!(record.title.as_deref(), Some("Test Page"));
        let text = record.text.unwrap();
        assert!(text.contains("Test Page Heading"));
        assert!(text.contains("This is a test paragraph"));
        assert_eq!(record.links.len(), 2);
        assert_eq!(record.metadata.get("description").unwrap(), "A test page");
        // Tables only extracted when explicitly requested.
        assert!(record.tables.is_empty());
    }

    #[test]
    fn test_links_resolved_and_filtered() {
        let record = default_extractor().record_for(&success_fetch(TEST_HTML));

        assert_eq!(record.links[0].href, "https://example.com/");
        assert_eq!(record.links[0].text, "link text");
        assert_eq!(record.links[0].title, "Example");
        assert_eq!(record.links[1].href, "https://example.com/relative");
    }

    #[test]
    fn test_tables_toggle() {
        let config = ExtractConfig {
            tables: true,
            ..Default::default()
        };
        let extractor = HtmlExtractor::new(&config).unwrap();
        let record = extractor.record_for(&success_fetch(TEST_HTML));

        assert_eq!(record.tables.len(), 1);
        assert_eq!(record.tables[0].get("Header 1").unwrap(), "Data 1");
        assert_eq!(record.tables[0].get("Header 2").unwrap(), "Data 2");
        // Specific toggles suppress the default fields.
        assert!(record.text.is_none());
        assert!(record.links.is_empty());
    }

    #[test]
    fn test_table_with_thead() {
        let html = r#"
            <table>
                <thead><tr><th>Name</th><th>Age</th></tr></thead>
                <tbody>
                    <tr><td>Alice</td><td>30</td></tr>
                    <tr><td>Bob</td><td>25</td></tr>
                </tbody>
            </table>
        "#;
        let config = ExtractConfig {
            tables: true,
            ..Default::default()
        };
        let extractor = HtmlExtractor::new(&config).unwrap();
        let record = extractor.record_for(&success_fetch(html));

        assert_eq!(record.tables.len(), 2);
        assert_eq!(record.tables[0].get("Name").unwrap(), "Alice");
        assert_eq!(record.tables[1].get("Age").unwrap(), "25");
    }

    #[test]
    fn test_table_without_headers_generates_columns() {
        let html = "<table><tr><td>a</td><td>b</td></tr><tr><td>c</td><td>d</td></tr></table>";
        let config = ExtractConfig {
            tables: true,
            ..Default::default()
        };
        let extractor = HtmlExtractor::new(&config).unwrap();
        let record = extractor.record_for(&success_fetch(html));

        // First row becomes the header row.
        assert_eq!(record.tables.len(), 1);
        assert_eq!(record.tables[0].get("a").unwrap(), "c");
        assert_eq!(record.tables[0].get("b").unwrap(), "d");
    }

    #[test]
    fn test_text_scoped_by_selector() {
        let config = ExtractConfig {
            text: true,
            selector: Some("h1".to_string()),
            ..Default::default()
        };
        let extractor = HtmlExtractor::new(&config).unwrap();
        let record = extractor.record_for(&success_fetch(TEST_HTML));

        assert_eq!(record.text.as_deref(), Some("Test Page Heading"));
    }

    #[test]
    fn test_selector_matching_nothing_yields_empty_text() {
        let config = ExtractConfig {
            text: true,
            selector: Some(".does-not-exist".to_string()),
            ..Default::default()
        };
        let extractor = HtmlExtractor::new(&config).unwrap();
        let record = extractor.record_for(&success_fetch(TEST_HTML));

        assert_eq!(record.text.as_deref(), Some(""));
    }

    #[test]
    fn test_invalid_selector_rejected_at_construction() {
        let config = ExtractConfig {
            selector: Some("[[[".to_string()),
            ..Default::default()
        };
        assert!(matches!(
            HtmlExtractor::new(&config),
            Err(ExtractError::InvalidSelector(_))
        ));
    }

    #[test]
    fn test_metadata_http_equiv() {
        let html = r#"<html><head><meta http-equiv="refresh" content="30"></head><body></body></html>"#;
        let record = default_extractor().record_for(&success_fetch(html));
        assert_eq!(record.metadata.get("http-equiv:refresh").unwrap(), "30");
    }

    #[test]
    fn test_error_fetch_skips_extraction() {
        let fetch = FetchResult {
            url: "https://example.com/".to_string(),
            status: FetchStatus::Error,
            content: None,
            status_code: Some(500),
            error_kind: None,
            error: Some("HTTP 500".to_string()),
            attempts: 3,
            elapsed: Duration::ZERO,
        };
        let record = default_extractor().record_for(&fetch);

        assert!(record.title.is_none());
        assert!(record.text.is_none());
        assert!(record.links.is_empty());
    }
}
