//! Robots.txt rule evaluation
//!
//! Allow/Disallow matching is delegated to the robotstxt crate; Crawl-delay
//! is parsed here because the crate does not expose it.

use robotstxt::DefaultMatcher;

/// Parsed robots.txt rules for one origin
#[derive(Debug, Clone)]
pub struct RobotsRules {
    /// Raw robots.txt content; None means everything is allowed
    content: Option<String>,
}

impl RobotsRules {
    /// Creates rules from raw robots.txt content
    pub fn from_content(content: &str) -> Self {
        Self {
            content: Some(content.to_string()),
        }
    }

    /// Creates permissive rules that allow everything
    ///
    /// Used when robots.txt cannot be fetched (the policy fails open) and
    /// when robots handling is disabled.
    pub fn allow_all() -> Self {
        Self { content: None }
    }

    /// Checks whether a URL is allowed for the given user agent
    pub fn is_allowed(&self, url: &str, user_agent: &str) -> bool {
        let content = match &self.content {
            Some(c) if !c.is_empty() => c,
            _ => return true,
        };

        let mut matcher = DefaultMatcher::default();
        matcher.one_agent_allowed_by_robots(content, user_agent, url)
    }

    /// Returns the Crawl-delay for the given user agent, in seconds
    ///
    /// Group matching mirrors the directive grammar: a `Crawl-delay` applies
    /// to the `User-agent` lines of its group; a group naming the agent
    /// (case-insensitive substring match) wins over the `*` group.
    pub fn crawl_delay(&self, user_agent: &str) -> Option<f64> {
        let content = self.content.as_deref()?;
        let agent_lower = user_agent.to_lowercase();

        let mut group_agents: Vec<String> = Vec::new();
        let mut wildcard_delay: Option<f64> = None;
        let mut agent_delay: Option<f64> = None;
        // A Disallow/Allow line ends the run of User-agent lines; the next
        // User-agent starts a fresh group.
        let mut group_open = false;

        for line in content.lines() {
            let line = match line.split_once('#') {
                Some((before, _)) => before.trim(),
                None => line.trim(),
            };
            if line.is_empty() {
                continue;
            }

            let Some((key, value)) = line.split_once(':') else {
                continue;
            };
            let key = key.trim().to_lowercase();
            let value = value.trim();

            match key.as_str() {
                "user-agent" => {
                    if !group_open {
                        group_agents.clear();
                        group_open = true;
                    }
                    group_agents.push(value.to_lowercase());
                }
                "crawl-delay" => {
                    group_open = false;
                    if let Ok(delay) = value.parse::<f64>() {
                        if group_agents.iter().any(|a| a != "*" && agent_lower.contains(a.as_str()))
                        {
                            agent_delay = Some(delay);
                        } else if group_agents.iter().any(|a| a == "*") {
                            wildcard_delay = Some(delay);
                        }
                    }
                }
                _ => {
                    group_open = false;
                }
            }
        }

        agent_delay.or(wildcard_delay)
    }
}
