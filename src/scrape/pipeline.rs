//! Scrape pipeline: fetch, extract, clean, persist
//!
//! Ties the worker pool, the extractor/registry, the cleaning pass, and
//! the configured record sink into one run. All shared politeness state
//! (robots cache, limiter buckets) lives inside the run's fetcher; two
//! concurrent runs never interfere.

use crate::config::Config;
use crate::extract::{HtmlExtractor, PageRecord, ParserRegistry};
use crate::output::{clean_records, write_records};
use crate::scrape::fetcher::{FetchResult, Fetcher};
use crate::scrape::pool::WorkerPool;
use crate::scrape::render::{DynamicRenderer, UnconfiguredRenderer};
use crate::{ConfigError, ScrapeError};
use std::path::PathBuf;
use std::sync::Arc;

/// Summary of one completed run
#[derive(Debug)]
pub struct RunReport {
    /// Cleaned records, one per unique attempted URL
    pub records: Vec<PageRecord>,

    /// True when fail-fast stopped dispatch early
    pub aborted: bool,

    /// Where the records were written
    pub output_path: PathBuf,
}

impl RunReport {
    /// Number of records whose URL ultimately failed
    ///
    /// Robots denials are refusals, not failures, and do not count here.
    pub fn failure_count(&self) -> usize {
        self.records.iter().filter(|r| r.is_failure()).count()
    }

    /// Number of successful records
    pub fn success_count(&self) -> usize {
        self.records.iter().filter(|r| r.status == "success").count()
    }
}

/// Runs a full scrape over the configured URL list
///
/// `registry` supplies site-specific parsers; `renderer` supplies the
/// dynamic-rendering backend used when `use-browser` is set. Without one,
/// browser-mode fetches surface terminal render errors instead of
/// crashing.
pub async fn run_scrape(
    config: &Config,
    registry: &ParserRegistry,
    renderer: Option<Arc<dyn DynamicRenderer>>,
) -> Result<RunReport, ScrapeError> {
    if config.urls.is_empty() {
        return Err(ScrapeError::Config(ConfigError::Validation(
            "No URLs to scrape: pass --url, --url-file, or a config with a urls list".to_string(),
        )));
    }

    let extractor = HtmlExtractor::new(&config.extract)?;

    let mut fetcher = Fetcher::new(&config.scraper, &config.user_agents)?;
    if config.scraper.use_browser {
        let renderer = match renderer {
            Some(renderer) => renderer,
            None => {
                tracing::warn!(
                    "use-browser is set but no renderer backend is wired up; \
                     rendered fetches will fail"
                );
                Arc::new(UnconfiguredRenderer)
            }
        };
        fetcher = fetcher.with_renderer(renderer);
    }

    let pool = WorkerPool::new(&config.pool);
    let outcome = pool.run(&config.urls, Arc::new(fetcher)).await;

    if outcome.aborted {
        if let Some(err) = outcome
            .results
            .iter()
            .filter(|r| r.is_error())
            .find_map(FetchResult::to_scrape_error)
        {
            tracing::error!("fail-fast triggered by: {}", err);
        }
    }

    let records: Vec<PageRecord> = outcome
        .results
        .iter()
        .map(|fetch| build_record(fetch, registry, &extractor))
        .collect();

    let records = clean_records(records);
    let output_path = write_records(&config.output, &records)?;

    let report = RunReport {
        records,
        aborted: outcome.aborted,
        output_path,
    };

    tracing::info!(
        "Run complete: {} succeeded, {} failed, {} denied{}",
        report.success_count(),
        report.failure_count(),
        report
            .records
            .iter()
            .filter(|r| r.status == "denied")
            .count(),
        if report.aborted { " (aborted early)" } else { "" }
    );

    Ok(report)
}

/// Builds the record for one fetch outcome
///
/// A registered site parser takes over for matching URLs; its failures
/// surface as parse errors on the record and are never retried.
fn build_record(
    fetch: &FetchResult,
    registry: &ParserRegistry,
    extractor: &HtmlExtractor,
) -> PageRecord {
    if fetch.is_success() {
        if let (Some(parser), Some(body)) = (registry.resolve(&fetch.url), fetch.content.as_deref())
        {
            return match parser.parse(body, &fetch.url) {
                Ok(mut record) => {
                    record.url = fetch.url.clone();
                    record.attempts = fetch.attempts;
                    record.elapsed_ms = fetch.elapsed.as_millis() as u64;
                    record
                }
                Err(e) => {
                    tracing::error!("Custom parser failed for {}: {}", fetch.url, e);
                    let mut record = PageRecord::from_fetch(fetch);
                    record.status = "error".to_string();
                    record.error = Some(e.to_string());
                    record.error_kind = Some("parse_error".to_string());
                    record
                }
            };
        }
    }

    extractor.record_for(fetch)
}
