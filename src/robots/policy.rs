//! Robots.txt policy with per-origin caching
//!
//! The policy lazily fetches `<origin>/robots.txt` on the first query for
//! an origin and caches the parsed rules for the lifetime of the run. A
//! fetch failure fails open: the origin is treated as fully allowed.

use crate::robots::parser::RobotsRules;
use crate::url::Origin;
use chrono::{DateTime, Utc};
use reqwest::Client;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use url::Url;

/// Timeout for robots.txt fetches, independent of the page timeout
const ROBOTS_FETCH_TIMEOUT: Duration = Duration::from_secs(10);

/// A cached robots.txt entry for one origin
#[derive(Debug, Clone)]
pub struct CachedRobots {
    /// The parsed rules
    pub rules: RobotsRules,

    /// When the robots.txt was fetched
    pub fetched_at: DateTime<Utc>,
}

/// Robots.txt policy shared by all worker tasks in a run
///
/// Cache state is keyed per origin with one async cell per origin, so
/// concurrent first queries for the same origin fetch robots.txt once
/// while queries for unrelated origins proceed independently.
pub struct RobotsPolicy {
    /// When set, every URL is allowed and robots.txt is never fetched
    ignore: bool,

    client: Client,

    cache: Mutex<HashMap<Origin, Arc<tokio::sync::Mutex<Option<CachedRobots>>>>>,
}

impl RobotsPolicy {
    /// Creates a policy that fetches and honors robots.txt
    pub fn new(client: Client) -> Self {
        Self {
            ignore: false,
            client,
            cache: Mutex::new(HashMap::new()),
        }
    }

    /// Creates a bypassed policy: everything allowed, nothing fetched
    pub fn permissive(client: Client) -> Self {
        Self {
            ignore: true,
            client,
            cache: Mutex::new(HashMap::new()),
        }
    }

    /// Checks whether a URL may be fetched by the given user agent
    pub async fn is_allowed(&self, url: &Url, user_agent: &str) -> bool {
        if self.ignore {
            return true;
        }

        let origin = match Origin::of(url) {
            Ok(origin) => origin,
            // Unsupported URLs are rejected by the fetcher before any
            // robots query; treat them as allowed here.
            Err(_) => return true,
        };

        let rules = self.rules_for(&origin).await;
        rules.is_allowed(url.as_str(), user_agent)
    }

    /// Returns the robots.txt Crawl-delay for an origin, in seconds
    pub async fn crawl_delay(&self, origin: &Origin, user_agent: &str) -> Option<f64> {
        if self.ignore {
            return None;
        }

        let rules = self.rules_for(origin).await;
        rules.crawl_delay(user_agent)
    }

    /// Returns cached rules for an origin, fetching on first use
    async fn rules_for(&self, origin: &Origin) -> RobotsRules {
        let cell = {
            let mut cache = self.cache.lock().unwrap_or_else(|e| e.into_inner());
            cache
                .entry(origin.clone())
                .or_insert_with(|| Arc::new(tokio::sync::Mutex::new(None)))
                .clone()
        };

        let mut entry = cell.lock().await;
        if let Some(cached) = entry.as_ref() {
            return cached.rules.clone();
        }

        let rules = self.fetch_rules(origin).await;
        *entry = Some(CachedRobots {
            rules: rules.clone(),
            fetched_at: Utc::now(),
        });
        rules
    }

    /// Fetches and parses robots.txt for an origin, failing open
    async fn fetch_rules(&self, origin: &Origin) -> RobotsRules {
        let robots_url = origin.robots_url();
        tracing::debug!("Fetching robots.txt: {}", robots_url);

        let response = self
            .client
            .get(&robots_url)
            .timeout(ROBOTS_FETCH_TIMEOUT)
            .send()
            .await;

        match response {
            Ok(resp) if resp.status().is_success() => match resp.text().await {
                Ok(body) => RobotsRules::from_content(&body),
                Err(e) => {
                    tracing::warn!("Failed to read robots.txt body from {}: {}", robots_url, e);
                    RobotsRules::allow_all()
                }
            },
            Ok(resp) => {
                tracing::debug!(
                    "robots.txt at {} returned HTTP {}, allowing all",
                    robots_url,
                    resp.status()
                );
                RobotsRules::allow_all()
            }
            Err(e) => {
                tracing::debug!("robots.txt fetch failed for {}: {}, allowing all", robots_url, e);
                RobotsRules::allow_all()
            }
        }
    }
}
