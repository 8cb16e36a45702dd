//! Bounded worker pool for batch dispatch
//!
//! URLs are split into batches of `max_workers`; each batch's fetches run
//! concurrently, with `batch_delay` between batches. The concurrency bound
//! caps simultaneously in-flight fetches only; it implies no completion
//! ordering. Results are collected in completion order and carry their
//! source URL for re-association.

use crate::config::PoolConfig;
use crate::scrape::fetcher::{FetchResult, Fetcher};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinSet;

/// Outcome of a pool run
#[derive(Debug)]
pub struct PoolOutcome {
    /// One result per dispatched URL, in completion order
    pub results: Vec<FetchResult>,

    /// True when fail-fast stopped dispatch before all URLs were attempted
    pub aborted: bool,
}

impl PoolOutcome {
    /// Number of results with a terminal error
    pub fn error_count(&self) -> usize {
        self.results.iter().filter(|r| r.is_error()).count()
    }
}

/// Dispatches a bounded URL list across concurrent fetch tasks
pub struct WorkerPool {
    max_workers: usize,
    batch_delay: Duration,
    fail_fast: bool,
}

impl WorkerPool {
    /// Creates a pool from pool settings
    pub fn new(config: &PoolConfig) -> Self {
        Self {
            max_workers: config.max_workers.max(1),
            batch_delay: Duration::from_secs_f64(config.batch_delay.max(0.0)),
            fail_fast: config.fail_fast,
        }
    }

    /// Fetches every URL through the shared fetcher
    ///
    /// With `fail_fast`, a terminal error lets the current batch's
    /// in-flight tasks finish but dispatches no further batches.
    pub async fn run(&self, urls: &[String], fetcher: Arc<Fetcher>) -> PoolOutcome {
        let total = urls.len();
        let mut results = Vec::with_capacity(total);
        let mut aborted = false;

        tracing::info!(
            "Dispatching {} URLs across up to {} workers",
            total,
            self.max_workers
        );

        let batches: Vec<&[String]> = urls.chunks(self.max_workers).collect();
        let batch_count = batches.len();

        for (batch_idx, batch) in batches.into_iter().enumerate() {
            let mut tasks: JoinSet<FetchResult> = JoinSet::new();
            for url in batch {
                let fetcher = fetcher.clone();
                let url = url.clone();
                tasks.spawn(async move { fetcher.fetch(&url).await });
            }

            let mut batch_failed = false;
            while let Some(joined) = tasks.join_next().await {
                match joined {
                    Ok(result) => {
                        if result.is_error() {
                            batch_failed = true;
                        }
                        tracing::info!(
                            "Completed {}/{}: {} ({})",
                            results.len() + 1,
                            total,
                            result.url,
                            result.status.as_str()
                        );
                        results.push(result);
                    }
                    Err(e) => {
                        // A panicked fetch task loses its URL association;
                        // surface it and keep the batch going.
                        tracing::error!("Fetch task failed: {}", e);
                        batch_failed = true;
                    }
                }
            }

            if self.fail_fast && batch_failed {
                if batch_idx + 1 < batch_count {
                    tracing::warn!(
                        "fail-fast: stopping after batch {}/{}",
                        batch_idx + 1,
                        batch_count
                    );
                    aborted = true;
                }
                break;
            }

            if batch_idx + 1 < batch_count && !self.batch_delay.is_zero() {
                tracing::debug!("Sleeping {:?} between batches", self.batch_delay);
                tokio::time::sleep(self.batch_delay).await;
            }
        }

        tracing::info!(
            "Pool finished: {}/{} URLs attempted, {} errors",
            results.len(),
            total,
            results.iter().filter(|r| r.is_error()).count()
        );

        PoolOutcome { results, aborted }
    }
}
