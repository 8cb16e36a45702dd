//! Per-origin rate limiting with exponential backoff
//!
//! Each origin gets an independent state cell holding its minimum request
//! interval and current backoff. Tasks call [`RateLimiter::wait_for_slot`]
//! before every network attempt; concurrent requests to the same origin
//! serialize through that origin's cell while unrelated origins proceed
//! independently.
//!
//! Backoff policy: a failed request doubles the origin's interval up to a
//! ceiling; a success resets it to the base interval. The base interval is
//! the configured rate limit, raised per origin by robots.txt Crawl-delay.

use crate::url::Origin;
use rand::Rng;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::Instant;

/// Multiplier applied to the interval after each failure
const BACKOFF_FACTOR: u32 = 2;

/// Ceiling on the backed-off interval
const MAX_BACKOFF: Duration = Duration::from_secs(60);

/// Fraction of the interval added as random jitter to each sleep
///
/// Jitter only ever lengthens a wait, so the minimum-spacing guarantee is
/// unaffected.
const JITTER_FACTOR: f64 = 0.1;

/// Per-origin limiter state
#[derive(Debug, Clone)]
struct OriginState {
    /// Minimum interval between requests: max(base rate limit, crawl delay)
    min_interval: Duration,

    /// Current backoff interval; None while the origin is healthy
    backoff: Option<Duration>,

    /// Earliest permitted start time for the next request
    next_slot: Option<Instant>,
}

impl OriginState {
    fn new(min_interval: Duration) -> Self {
        Self {
            min_interval,
            backoff: None,
            next_slot: None,
        }
    }

    /// The interval currently governing this origin
    fn effective_interval(&self) -> Duration {
        self.backoff.unwrap_or(self.min_interval)
    }
}

/// Rate limiter shared by all worker tasks in a run
///
/// One instance per run, passed in explicitly; never a process-wide
/// singleton, so concurrent runs and tests do not interfere.
pub struct RateLimiter {
    base_interval: Duration,
    origins: Mutex<HashMap<Origin, Arc<tokio::sync::Mutex<OriginState>>>>,
}

impl RateLimiter {
    /// Creates a limiter with the given base interval between requests
    pub fn new(base_interval: Duration) -> Self {
        Self {
            base_interval,
            origins: Mutex::new(HashMap::new()),
        }
    }

    /// Creates a limiter from a rate limit in seconds
    pub fn from_secs_f64(rate_limit: f64) -> Self {
        Self::new(Duration::from_secs_f64(rate_limit.max(0.0)))
    }

    /// Blocks until the next request to `origin` is permitted
    ///
    /// Holding the origin cell across the sleep serializes concurrent
    /// callers for the same origin: each caller in turn sleeps out the
    /// remaining interval, then reserves the following slot before
    /// releasing the cell.
    pub async fn wait_for_slot(&self, origin: &Origin) {
        let cell = self.cell(origin);
        let mut state = cell.lock().await;

        if let Some(slot) = state.next_slot {
            let now = Instant::now();
            if slot > now {
                let jitter = jitter_for(state.effective_interval());
                tracing::trace!(
                    "Waiting {:?} (+{:?} jitter) for slot on {}",
                    slot - now,
                    jitter,
                    origin
                );
                tokio::time::sleep_until(slot + jitter).await;
            }
        }

        // Reserve the next slot before releasing the cell so a concurrent
        // caller cannot start inside this request's interval.
        state.next_slot = Some(Instant::now() + state.effective_interval());
    }

    /// Records the outcome of a request to `origin`
    ///
    /// A failure doubles the origin's interval (bounded by the ceiling)
    /// starting from the failure time; a success resets the interval to
    /// the origin's minimum.
    pub async fn record_outcome(&self, origin: &Origin, success: bool) {
        let cell = self.cell(origin);
        let mut state = cell.lock().await;
        let now = Instant::now();

        if success {
            if state.backoff.take().is_some() {
                tracing::debug!("Backoff for {} reset to base interval", origin);
            }
            state.next_slot = Some(now + state.min_interval);
        } else {
            let doubled = state
                .effective_interval()
                .saturating_mul(BACKOFF_FACTOR)
                .min(MAX_BACKOFF);
            tracing::debug!("Backoff for {} raised to {:?}", origin, doubled);
            state.backoff = Some(doubled);
            state.next_slot = Some(now + doubled);
        }
    }

    /// Raises the minimum interval for `origin` to honor a robots.txt
    /// Crawl-delay
    ///
    /// The effective minimum is the larger of the global rate limit and
    /// the crawl delay; a crawl delay below the global rate limit never
    /// lowers it.
    pub async fn apply_crawl_delay(&self, origin: &Origin, delay_secs: f64) {
        if !delay_secs.is_finite() || delay_secs <= 0.0 {
            return;
        }

        let cell = self.cell(origin);
        let mut state = cell.lock().await;
        let delay = Duration::from_secs_f64(delay_secs);
        if delay > state.min_interval {
            tracing::debug!("Crawl-delay raises interval for {} to {:?}", origin, delay);
            state.min_interval = delay;
        }
    }

    /// Returns the interval currently governing `origin`
    ///
    /// Mostly useful for inspection and tests.
    pub async fn current_interval(&self, origin: &Origin) -> Duration {
        let cell = self.cell(origin);
        let state = cell.lock().await;
        state.effective_interval()
    }

    /// Gets or creates the state cell for an origin
    fn cell(&self, origin: &Origin) -> Arc<tokio::sync::Mutex<OriginState>> {
        let mut origins = self.origins.lock().unwrap_or_else(|e| e.into_inner());
        origins
            .entry(origin.clone())
            .or_insert_with(|| Arc::new(tokio::sync::Mutex::new(OriginState::new(self.base_interval))))
            .clone()
    }
}

/// Computes the random jitter added to a sleep
fn jitter_for(interval: Duration) -> Duration {
    let max = interval.as_secs_f64() * JITTER_FACTOR;
    if max <= 0.0 {
        return Duration::ZERO;
    }
    let amount = rand::thread_rng().gen_range(0.0..max);
    Duration::from_secs_f64(amount)
}
