//! HTTP fetcher with politeness and retry logic
//!
//! The fetcher owns the full per-URL request flow:
//!
//! 1. Parse the URL; malformed URLs fail immediately without retries
//! 2. Check robots.txt; denials return without any network call
//! 3. Apply the origin's robots.txt Crawl-delay to the rate limiter
//! 4. Wait for a rate-limit slot before every network attempt
//! 5. Issue the GET (or delegate to the dynamic renderer)
//! 6. Retry transient failures (timeout, 5xx, 429, connection errors) up
//!    to `max_retries` with the limiter's exponential backoff
//!
//! Non-retryable failures (4xx except 429) fail on the first attempt.

use crate::config::ScraperConfig;
use crate::limiter::RateLimiter;
use crate::robots::RobotsPolicy;
use crate::scrape::render::{DynamicRenderer, RenderError};
use crate::scrape::user_agent::UserAgentRotator;
use crate::url::Origin;
use crate::ScrapeError;
use reqwest::{header, redirect::Policy, Client};
use std::sync::Arc;
use std::time::{Duration, Instant};
use url::Url;

/// Terminal status of a fetch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchStatus {
    /// Page fetched successfully
    Success,
    /// robots.txt disallowed the URL; no request was issued
    Denied,
    /// All attempts failed
    Error,
}

impl FetchStatus {
    /// Database/record string for this status
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Denied => "denied",
            Self::Error => "error",
        }
    }
}

/// Classification of a failed fetch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchErrorKind {
    Timeout,
    HttpError,
    ConnectionError,
    RenderError,
    InvalidUrl,
}

impl FetchErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Timeout => "timeout",
            Self::HttpError => "http_error",
            Self::ConnectionError => "connection_error",
            Self::RenderError => "render_error",
            Self::InvalidUrl => "invalid_url",
        }
    }
}

/// Result of fetching one URL
///
/// Immutable once produced; consumed by the extraction stage. Results are
/// re-associated with their source URL through the `url` field, never by
/// position in a batch.
#[derive(Debug, Clone)]
pub struct FetchResult {
    /// The requested URL
    pub url: String,

    /// Terminal status
    pub status: FetchStatus,

    /// Page body on success
    pub content: Option<String>,

    /// HTTP status code of the final response, when one was received
    pub status_code: Option<u16>,

    /// Error classification when status is Error
    pub error_kind: Option<FetchErrorKind>,

    /// Human-readable error message
    pub error: Option<String>,

    /// Number of attempts actually made
    pub attempts: u32,

    /// Wall-clock time spent on this URL
    pub elapsed: Duration,
}

impl FetchResult {
    pub fn is_success(&self) -> bool {
        self.status == FetchStatus::Success
    }

    pub fn is_denied(&self) -> bool {
        self.status == FetchStatus::Denied
    }

    pub fn is_error(&self) -> bool {
        self.status == FetchStatus::Error
    }

    /// Maps a denied or failed result onto the library error taxonomy
    pub fn to_scrape_error(&self) -> Option<ScrapeError> {
        let url = self.url.clone();
        match self.status {
            FetchStatus::Success => None,
            FetchStatus::Denied => Some(ScrapeError::RobotsDenied { url }),
            FetchStatus::Error => {
                let message = self
                    .error
                    .clone()
                    .unwrap_or_else(|| "unknown error".to_string());
                Some(match self.error_kind {
                    Some(FetchErrorKind::Timeout) => ScrapeError::Timeout { url },
                    Some(FetchErrorKind::HttpError) => ScrapeError::Http {
                        url,
                        status: self.status_code.unwrap_or(0),
                    },
                    Some(FetchErrorKind::RenderError) => ScrapeError::Render { url, message },
                    Some(FetchErrorKind::ConnectionError)
                    | Some(FetchErrorKind::InvalidUrl)
                    | None => ScrapeError::Connection { url, message },
                })
            }
        }
    }
}

/// Outcome of a single network attempt
#[derive(Debug)]
enum AttemptError {
    Timeout(String),
    Http { status: u16 },
    Connection(String),
    Render(RenderError),
}

impl AttemptError {
    /// Transient failures consume retry budget; the rest fail immediately
    fn is_transient(&self) -> bool {
        match self {
            Self::Timeout(_) | Self::Connection(_) => true,
            Self::Http { status } => *status == 429 || (500..600).contains(status),
            Self::Render(e) => e.is_transient(),
        }
    }

    fn kind(&self) -> FetchErrorKind {
        match self {
            Self::Timeout(_) => FetchErrorKind::Timeout,
            Self::Http { .. } => FetchErrorKind::HttpError,
            Self::Connection(_) => FetchErrorKind::ConnectionError,
            Self::Render(_) => FetchErrorKind::RenderError,
        }
    }

    fn status_code(&self) -> Option<u16> {
        match self {
            Self::Http { status } => Some(*status),
            _ => None,
        }
    }

    fn message(&self) -> String {
        match self {
            Self::Timeout(url) => format!("Request timeout for {}", url),
            Self::Http { status } => format!("HTTP {}", status),
            Self::Connection(message) => message.clone(),
            Self::Render(e) => e.to_string(),
        }
    }
}

/// Builds the HTTP client used for page fetches
///
/// Redirects are followed up to 10 hops; gzip and brotli responses are
/// decompressed transparently. TLS verification is controlled by the
/// `verify-ssl` setting.
pub fn build_http_client(timeout: Duration, verify_ssl: bool) -> Result<Client, reqwest::Error> {
    Client::builder()
        .timeout(timeout)
        .connect_timeout(Duration::from_secs(10))
        .redirect(Policy::limited(10))
        .danger_accept_invalid_certs(!verify_ssl)
        .gzip(true)
        .brotli(true)
        .build()
}

/// Fetcher shared by all worker tasks in a run
///
/// Robots and limiter state live here as explicit per-run objects so
/// concurrent runs and tests never interfere through globals.
pub struct Fetcher {
    client: Client,
    agents: UserAgentRotator,
    robots: RobotsPolicy,
    limiter: RateLimiter,
    max_retries: u32,
    renderer: Option<Arc<dyn DynamicRenderer>>,
}

impl Fetcher {
    /// Creates a fetcher from scraper settings
    pub fn new(config: &ScraperConfig, extra_agents: &[String]) -> Result<Self, ScrapeError> {
        let timeout = Duration::from_secs(config.timeout);
        let client = build_http_client(timeout, config.verify_ssl)?;

        let robots = if config.respect_robots_txt {
            RobotsPolicy::new(client.clone())
        } else {
            RobotsPolicy::permissive(client.clone())
        };

        Ok(Self {
            client,
            agents: UserAgentRotator::new(extra_agents),
            robots,
            limiter: RateLimiter::from_secs_f64(config.rate_limit),
            max_retries: config.max_retries,
            renderer: None,
        })
    }

    /// Attaches a dynamic renderer; subsequent fetches go through it
    pub fn with_renderer(mut self, renderer: Arc<dyn DynamicRenderer>) -> Self {
        self.renderer = Some(renderer);
        self
    }

    /// Returns the rate limiter (for inspection in tests)
    pub fn limiter(&self) -> &RateLimiter {
        &self.limiter
    }

    /// Fetches a single URL, honoring robots.txt, rate limits, and retries
    pub async fn fetch(&self, url_str: &str) -> FetchResult {
        let started = Instant::now();

        let url = match Url::parse(url_str) {
            Ok(url) => url,
            Err(e) => {
                return self.terminal_error(
                    url_str,
                    FetchErrorKind::InvalidUrl,
                    format!("Malformed URL: {}", e),
                    None,
                    0,
                    started,
                )
            }
        };

        let origin = match Origin::of(&url) {
            Ok(origin) => origin,
            Err(e) => {
                return self.terminal_error(
                    url_str,
                    FetchErrorKind::InvalidUrl,
                    e.to_string(),
                    None,
                    0,
                    started,
                )
            }
        };

        // Policy refusal is not a failure: no request, no retry, no backoff.
        let robots_agent = self.agents.pick().to_string();
        if !self.robots.is_allowed(&url, &robots_agent).await {
            tracing::info!("URL {} disallowed by robots.txt", url_str);
            return FetchResult {
                url: url_str.to_string(),
                status: FetchStatus::Denied,
                content: None,
                status_code: None,
                error_kind: None,
                error: Some("Disallowed by robots.txt".to_string()),
                attempts: 0,
                elapsed: started.elapsed(),
            };
        }

        if let Some(delay) = self.robots.crawl_delay(&origin, &robots_agent).await {
            self.limiter.apply_crawl_delay(&origin, delay).await;
        }

        let mut attempts = 0;
        loop {
            attempts += 1;
            self.limiter.wait_for_slot(&origin).await;

            let user_agent = self.agents.pick().to_string();
            match self.attempt(&url, &user_agent).await {
                Ok((status_code, body)) => {
                    self.limiter.record_outcome(&origin, true).await;
                    tracing::debug!(
                        "Fetched {} ({} attempt{})",
                        url_str,
                        attempts,
                        if attempts == 1 { "" } else { "s" }
                    );
                    return FetchResult {
                        url: url_str.to_string(),
                        status: FetchStatus::Success,
                        content: Some(body),
                        status_code,
                        error_kind: None,
                        error: None,
                        attempts,
                        elapsed: started.elapsed(),
                    };
                }
                Err(err) => {
                    self.limiter.record_outcome(&origin, false).await;

                    if err.is_transient() && attempts <= self.max_retries {
                        tracing::warn!(
                            "Attempt {}/{} failed for {}: {}",
                            attempts,
                            self.max_retries + 1,
                            url_str,
                            err.message()
                        );
                        continue;
                    }

                    tracing::error!("Giving up on {}: {}", url_str, err.message());
                    return self.terminal_error(
                        url_str,
                        err.kind(),
                        err.message(),
                        err.status_code(),
                        attempts,
                        started,
                    );
                }
            }
        }
    }

    /// Issues one network attempt: plain GET or rendered page
    async fn attempt(
        &self,
        url: &Url,
        user_agent: &str,
    ) -> Result<(Option<u16>, String), AttemptError> {
        if let Some(renderer) = &self.renderer {
            return self.render_attempt(renderer.clone(), url).await;
        }

        let response = self
            .client
            .get(url.clone())
            .header(header::USER_AGENT, user_agent)
            .header(
                header::ACCEPT,
                "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8",
            )
            .header(header::ACCEPT_LANGUAGE, "en-US,en;q=0.5")
            .send()
            .await
            .map_err(classify_reqwest_error)?;

        let status = response.status();

        if !status.is_success() {
            return Err(AttemptError::Http {
                status: status.as_u16(),
            });
        }

        let body = response
            .text()
            .await
            .map_err(classify_reqwest_error)?;

        Ok((Some(status.as_u16()), body))
    }

    /// Runs the synchronous renderer on a blocking thread
    async fn render_attempt(
        &self,
        renderer: Arc<dyn DynamicRenderer>,
        url: &Url,
    ) -> Result<(Option<u16>, String), AttemptError> {
        let url_str = url.to_string();
        let rendered = tokio::task::spawn_blocking(move || renderer.render(&url_str))
            .await
            .map_err(|e| {
                AttemptError::Render(RenderError::Failed {
                    url: url.to_string(),
                    message: format!("render task panicked: {}", e),
                })
            })?;

        match rendered {
            Ok(html) => Ok((None, html)),
            Err(e) => Err(AttemptError::Render(e)),
        }
    }

    fn terminal_error(
        &self,
        url: &str,
        kind: FetchErrorKind,
        message: String,
        status_code: Option<u16>,
        attempts: u32,
        started: Instant,
    ) -> FetchResult {
        FetchResult {
            url: url.to_string(),
            status: FetchStatus::Error,
            content: None,
            status_code,
            error_kind: Some(kind),
            error: Some(message),
            attempts,
            elapsed: started.elapsed(),
        }
    }
}

/// Maps a reqwest error onto the attempt error taxonomy
fn classify_reqwest_error(e: reqwest::Error) -> AttemptError {
    if e.is_timeout() {
        AttemptError::Timeout(
            e.url()
                .map(|u| u.to_string())
                .unwrap_or_else(|| "<unknown>".to_string()),
        )
    } else if e.is_connect() {
        AttemptError::Connection(format!("Connection error: {}", e))
    } else if let Some(status) = e.status() {
        AttemptError::Http {
            status: status.as_u16(),
        }
    } else {
        AttemptError::Connection(e.to_string())
    }
}
