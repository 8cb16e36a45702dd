use serde::Deserialize;
use std::fmt;

/// Main configuration structure for Inkcap
///
/// Every section and field carries a default so a partial (or missing)
/// config file is usable; CLI flags override file values.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default)]
    pub scraper: ScraperConfig,
    #[serde(default)]
    pub pool: PoolConfig,
    #[serde(default)]
    pub extract: ExtractConfig,
    #[serde(default)]
    pub output: OutputConfig,

    /// URLs to scrape when none are given on the command line
    #[serde(default)]
    pub urls: Vec<String>,

    /// Extra User-Agent strings appended to the built-in rotation pool
    #[serde(default, rename = "user-agents")]
    pub user_agents: Vec<String>,
}

/// Politeness and request behavior
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ScraperConfig {
    /// Minimum interval between requests to the same origin (seconds)
    #[serde(default = "default_rate_limit", rename = "rate-limit")]
    pub rate_limit: f64,

    /// Whether to fetch and honor robots.txt
    #[serde(default = "default_true", rename = "respect-robots-txt")]
    pub respect_robots_txt: bool,

    /// Maximum number of retries for transient failures
    #[serde(default = "default_max_retries", rename = "max-retries")]
    pub max_retries: u32,

    /// Per-request timeout (seconds)
    #[serde(default = "default_timeout")]
    pub timeout: u64,

    /// Whether to verify TLS certificates
    #[serde(default = "default_true", rename = "verify-ssl")]
    pub verify_ssl: bool,

    /// Whether to fetch pages through the dynamic-rendering collaborator
    #[serde(default, rename = "use-browser")]
    pub use_browser: bool,

    /// Whether the dynamic renderer runs headless
    #[serde(default = "default_true")]
    pub headless: bool,
}

impl Default for ScraperConfig {
    fn default() -> Self {
        Self {
            rate_limit: default_rate_limit(),
            respect_robots_txt: true,
            max_retries: default_max_retries(),
            timeout: default_timeout(),
            verify_ssl: true,
            use_browser: false,
            headless: true,
        }
    }
}

/// Worker pool behavior
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PoolConfig {
    /// Maximum number of concurrently in-flight fetches
    #[serde(default = "default_max_workers", rename = "max-workers")]
    pub max_workers: usize,

    /// Delay between batches (seconds)
    #[serde(default = "default_batch_delay", rename = "batch-delay")]
    pub batch_delay: f64,

    /// Abort dispatch after the first terminal error
    #[serde(default, rename = "fail-fast")]
    pub fail_fast: bool,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            max_workers: default_max_workers(),
            batch_delay: default_batch_delay(),
            fail_fast: false,
        }
    }
}

/// Extraction toggles
///
/// When no toggle is set, title, text, links and metadata are all
/// extracted.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ExtractConfig {
    #[serde(default)]
    pub text: bool,

    #[serde(default)]
    pub links: bool,

    #[serde(default)]
    pub tables: bool,

    #[serde(default)]
    pub metadata: bool,

    /// Optional CSS selector scoping text/table extraction
    #[serde(default)]
    pub selector: Option<String>,
}

impl ExtractConfig {
    /// Returns true when no specific extraction was requested
    pub fn is_default(&self) -> bool {
        !(self.text || self.links || self.tables || self.metadata)
    }
}

/// Output target configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OutputConfig {
    /// Directory output files are written into (created if missing)
    #[serde(default = "default_output_dir")]
    pub dir: String,

    /// Output file stem; the format supplies the extension
    #[serde(default = "default_output_file")]
    pub file: String,

    /// Output format
    #[serde(default)]
    pub format: OutputFormat,

    /// Table name for SQLite output
    #[serde(default = "default_table_name", rename = "table-name")]
    pub table_name: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir: default_output_dir(),
            file: default_output_file(),
            format: OutputFormat::default(),
            table_name: default_table_name(),
        }
    }
}

/// Supported output formats
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Json,
    Csv,
    Sqlite,
}

impl OutputFormat {
    /// Returns the file extension for this format
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Json => "json",
            Self::Csv => "csv",
            Self::Sqlite => "db",
        }
    }
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "json" => Ok(Self::Json),
            "csv" => Ok(Self::Csv),
            "sqlite" => Ok(Self::Sqlite),
            other => Err(format!(
                "Unsupported output format '{}'. Use: json, csv, or sqlite",
                other
            )),
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Json => "json",
            Self::Csv => "csv",
            Self::Sqlite => "sqlite",
        };
        f.write_str(name)
    }
}

fn default_rate_limit() -> f64 {
    1.0
}

fn default_max_retries() -> u32 {
    3
}

fn default_timeout() -> u64 {
    30
}

fn default_max_workers() -> usize {
    5
}

fn default_batch_delay() -> f64 {
    1.0
}

fn default_output_dir() -> String {
    "./data".to_string()
}

fn default_output_file() -> String {
    "scraped_data".to_string()
}

fn default_table_name() -> String {
    "scraped_data".to_string()
}

fn default_true() -> bool {
    true
}
