//! User-Agent rotation
//!
//! A pool of common desktop browser User-Agent strings, rotated randomly
//! per request attempt to avoid trivial fingerprinting. Extra agents from
//! the configuration are appended to the built-in pool.

use rand::seq::SliceRandom;

/// Built-in pool of common browser user agents
const DEFAULT_USER_AGENTS: &[&str] = &[
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/121.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:122.0) Gecko/20100101 Firefox/122.0",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.2 Safari/605.1.15",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36 Edg/120.0.2210.91",
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
];

/// Rotates User-Agent strings across request attempts
#[derive(Debug, Clone)]
pub struct UserAgentRotator {
    agents: Vec<String>,
}

impl UserAgentRotator {
    /// Creates a rotator over the built-in pool plus any extra agents
    pub fn new(extra_agents: &[String]) -> Self {
        let mut agents: Vec<String> = DEFAULT_USER_AGENTS
            .iter()
            .map(|s| s.to_string())
            .collect();

        for agent in extra_agents {
            if !agents.contains(agent) {
                agents.push(agent.clone());
            }
        }

        Self { agents }
    }

    /// Picks a random user agent from the pool
    pub fn pick(&self) -> &str {
        self.agents
            .choose(&mut rand::thread_rng())
            .map(String::as_str)
            // The pool always contains the built-in agents.
            .unwrap_or(DEFAULT_USER_AGENTS[0])
    }

    /// Returns the number of agents in the pool
    pub fn len(&self) -> usize {
        self.agents.len()
    }

    /// Returns true when the pool is empty (never, in practice)
    pub fn is_empty(&self) -> bool {
        self.agents.is_empty()
    }
}

impl Default for UserAgentRotator {
    fn default() -> Self {
        Self::new(&[])
    }
}
