//! Scraping module: fetching, dispatch, and the run pipeline
//!
//! This module contains the request-dispatch and politeness layer:
//! - HTTP fetching with robots.txt checks, rate limiting, and retries
//! - The bounded worker pool dispatching batches of URLs
//! - User-Agent rotation
//! - The dynamic-rendering collaborator seam
//! - The pipeline wiring fetch, extraction, cleaning, and output together

mod fetcher;
mod pipeline;
mod pool;
mod render;
mod user_agent;

pub use fetcher::{
    build_http_client, FetchErrorKind, FetchResult, FetchStatus, Fetcher,
};
pub use pipeline::{run_scrape, RunReport};
pub use pool::{PoolOutcome, WorkerPool};
pub use render::{DynamicRenderer, RenderError, UnconfiguredRenderer};
pub use user_agent::UserAgentRotator;
