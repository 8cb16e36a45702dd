//! Inkcap main entry point
//!
//! Command-line interface for the Inkcap batch web scraper.

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use inkcap::config::{load_config_with_hash, validate, Config};
use inkcap::extract::ParserRegistry;
use inkcap::schedule::CronScheduler;
use inkcap::scrape::run_scrape;
use inkcap::url::read_urls_from_file;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Inkcap: a polite batch web scraper
///
/// Fetches a bounded list of URLs while honoring robots.txt and per-origin
/// rate limits, extracts structured content, and persists it as JSON, CSV,
/// or SQLite.
#[derive(Parser, Debug)]
#[command(name = "inkcap")]
#[command(version)]
#[command(about = "A polite batch web scraper", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    quiet: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the scraper
    Run(RunArgs),

    /// Schedule a recurring run via cron
    Schedule {
        /// Cron schedule expression (e.g. '0 0 * * *' for daily at midnight)
        schedule: String,

        /// Name recorded as a comment above the job
        #[arg(long)]
        job_name: Option<String>,

        #[command(flatten)]
        run: RunArgs,
    },

    /// List scheduled scrape jobs
    ListJobs,

    /// Remove scheduled jobs matching a pattern
    RemoveJob {
        /// Pattern to match in the job command
        pattern: String,
    },
}

#[derive(Args, Debug, Clone)]
struct RunArgs {
    /// Path to a TOML configuration file
    #[arg(long)]
    config: Option<PathBuf>,

    /// URL to scrape (repeatable)
    #[arg(long)]
    url: Vec<String>,

    /// File containing URLs to scrape, one per line
    #[arg(long)]
    url_file: Option<PathBuf>,

    /// Directory to save output files
    #[arg(long)]
    output_dir: Option<String>,

    /// Output file name (extension added from the format)
    #[arg(long)]
    output_file: Option<String>,

    /// Output format: json, csv, or sqlite
    #[arg(long)]
    output_format: Option<String>,

    /// Table name for SQLite output
    #[arg(long)]
    table_name: Option<String>,

    /// Maximum number of parallel workers
    #[arg(long)]
    max_workers: Option<usize>,

    /// Delay between batches in seconds
    #[arg(long)]
    batch_delay: Option<f64>,

    /// Minimum interval between requests to the same origin, in seconds
    #[arg(long)]
    rate_limit: Option<f64>,

    /// Ignore robots.txt rules
    #[arg(long)]
    ignore_robots: bool,

    /// Fetch pages through the dynamic-rendering backend
    #[arg(long)]
    browser: bool,

    /// Run the dynamic renderer with a visible browser window
    #[arg(long)]
    no_headless: bool,

    /// Maximum number of retries for transient failures
    #[arg(long)]
    max_retries: Option<u32>,

    /// Per-request timeout in seconds
    #[arg(long)]
    timeout: Option<u64>,

    /// Disable TLS certificate verification
    #[arg(long)]
    no_verify_ssl: bool,

    /// Extract text content
    #[arg(long)]
    extract_text: bool,

    /// Extract links
    #[arg(long)]
    extract_links: bool,

    /// Extract tables
    #[arg(long)]
    extract_tables: bool,

    /// Extract metadata
    #[arg(long)]
    extract_metadata: bool,

    /// CSS selector targeting specific elements
    #[arg(long)]
    selector: Option<String>,

    /// Stop dispatching new batches after the first terminal error
    #[arg(long)]
    fail_fast: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    match cli.command {
        Commands::Run(args) => handle_run(args).await,
        Commands::Schedule {
            schedule,
            job_name,
            run,
        } => handle_schedule(&schedule, job_name.as_deref(), &run),
        Commands::ListJobs => handle_list_jobs(),
        Commands::RemoveJob { pattern } => handle_remove_job(&pattern),
    }
}

/// Sets up the tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("inkcap=info,warn"),
            1 => EnvFilter::new("inkcap=debug,info"),
            2 => EnvFilter::new("inkcap=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// Handles the run subcommand
async fn handle_run(args: RunArgs) -> anyhow::Result<()> {
    let config = build_config(&args)?;

    let registry = ParserRegistry::new();
    let report = run_scrape(&config, &registry, None).await?;

    // Per-URL summary
    for record in &report.records {
        match record.status.as_str() {
            "success" => println!("ok      {}", record.url),
            "denied" => println!("denied  {}", record.url),
            _ => println!(
                "error   {} ({})",
                record.url,
                record.error.as_deref().unwrap_or("unknown error")
            ),
        }
    }
    println!(
        "\n{} succeeded, {} failed, saved to {}",
        report.success_count(),
        report.failure_count(),
        report.output_path.display()
    );

    if report.failure_count() > 0 || report.aborted {
        std::process::exit(1);
    }

    Ok(())
}

/// Builds the effective configuration: defaults < config file < CLI flags
fn build_config(args: &RunArgs) -> anyhow::Result<Config> {
    let mut config = match &args.config {
        Some(path) => {
            let (config, hash) = load_config_with_hash(path)
                .with_context(|| format!("Failed to load config from {}", path.display()))?;
            tracing::info!("Configuration loaded from {} (hash: {})", path.display(), hash);
            config
        }
        None => Config::default(),
    };

    if let Some(rate_limit) = args.rate_limit {
        config.scraper.rate_limit = rate_limit;
    }
    if args.ignore_robots {
        config.scraper.respect_robots_txt = false;
    }
    if let Some(max_retries) = args.max_retries {
        config.scraper.max_retries = max_retries;
    }
    if let Some(timeout) = args.timeout {
        config.scraper.timeout = timeout;
    }
    if args.no_verify_ssl {
        config.scraper.verify_ssl = false;
    }
    if args.browser {
        config.scraper.use_browser = true;
    }
    if args.no_headless {
        config.scraper.headless = false;
    }

    if let Some(max_workers) = args.max_workers {
        config.pool.max_workers = max_workers;
    }
    if let Some(batch_delay) = args.batch_delay {
        config.pool.batch_delay = batch_delay;
    }
    if args.fail_fast {
        config.pool.fail_fast = true;
    }

    if args.extract_text {
        config.extract.text = true;
    }
    if args.extract_links {
        config.extract.links = true;
    }
    if args.extract_tables {
        config.extract.tables = true;
    }
    if args.extract_metadata {
        config.extract.metadata = true;
    }
    if let Some(selector) = &args.selector {
        config.extract.selector = Some(selector.clone());
    }

    if let Some(dir) = &args.output_dir {
        config.output.dir = dir.clone();
    }
    if let Some(file) = &args.output_file {
        config.output.file = file.clone();
    }
    if let Some(format) = &args.output_format {
        config.output.format = format
            .parse::<inkcap::config::OutputFormat>()
            .map_err(|e| anyhow::anyhow!(e))?;
    }
    if let Some(table_name) = &args.table_name {
        config.output.table_name = table_name.clone();
    }

    // URL precedence: --url flags, then --url-file, then the config list
    if !args.url.is_empty() {
        config.urls = args.url.clone();
    } else if let Some(url_file) = &args.url_file {
        config.urls = read_urls_from_file(url_file)
            .with_context(|| format!("Failed to read URLs from {}", url_file.display()))?;
    }

    validate(&config).context("Invalid effective configuration")?;

    Ok(config)
}

/// Handles the schedule subcommand
fn handle_schedule(schedule: &str, job_name: Option<&str>, args: &RunArgs) -> anyhow::Result<()> {
    let command = run_command_string(args)?;
    let scheduler = CronScheduler::new();

    let comment = job_name.map(str::to_string).unwrap_or_else(|| {
        "Scheduled inkcap scrape".to_string()
    });

    scheduler.add_job(schedule, &command, Some(&comment))?;
    println!("Scheduled: {} {}", schedule, command);
    Ok(())
}

/// Handles the list-jobs subcommand
fn handle_list_jobs() -> anyhow::Result<()> {
    let scheduler = CronScheduler::new();
    let jobs = scheduler.list_jobs()?;

    if jobs.is_empty() {
        println!("No scheduled jobs found");
    } else {
        println!("Scheduled jobs:");
        for job in jobs {
            println!("  {}", job);
        }
    }
    Ok(())
}

/// Handles the remove-job subcommand
fn handle_remove_job(pattern: &str) -> anyhow::Result<()> {
    let scheduler = CronScheduler::new();
    let removed = scheduler.remove_jobs(pattern)?;

    if removed > 0 {
        println!("Removed {} job(s) matching: {}", removed, pattern);
    } else {
        println!("No jobs matched: {}", pattern);
    }
    Ok(())
}

/// Rebuilds the `run` command line for a scheduled job
fn run_command_string(args: &RunArgs) -> anyhow::Result<String> {
    let exe = std::env::current_exe().context("Failed to resolve the inkcap binary path")?;
    let mut parts: Vec<String> = vec![exe.display().to_string(), "run".to_string()];

    if let Some(config) = &args.config {
        parts.push(format!("--config={}", config.display()));
    }
    for url in &args.url {
        parts.push(format!("--url={}", url));
    }
    if let Some(url_file) = &args.url_file {
        parts.push(format!("--url-file={}", url_file.display()));
    }
    if let Some(dir) = &args.output_dir {
        parts.push(format!("--output-dir={}", dir));
    }
    if let Some(file) = &args.output_file {
        parts.push(format!("--output-file={}", file));
    }
    if let Some(format) = &args.output_format {
        parts.push(format!("--output-format={}", format));
    }
    if let Some(table_name) = &args.table_name {
        parts.push(format!("--table-name={}", table_name));
    }
    if let Some(max_workers) = args.max_workers {
        parts.push(format!("--max-workers={}", max_workers));
    }
    if let Some(batch_delay) = args.batch_delay {
        parts.push(format!("--batch-delay={}", batch_delay));
    }
    if let Some(rate_limit) = args.rate_limit {
        parts.push(format!("--rate-limit={}", rate_limit));
    }
    if args.ignore_robots {
        parts.push("--ignore-robots".to_string());
    }
    if args.browser {
        parts.push("--browser".to_string());
    }
    if args.no_headless {
        parts.push("--no-headless".to_string());
    }
    if let Some(max_retries) = args.max_retries {
        parts.push(format!("--max-retries={}", max_retries));
    }
    if let Some(timeout) = args.timeout {
        parts.push(format!("--timeout={}", timeout));
    }
    if args.no_verify_ssl {
        parts.push("--no-verify-ssl".to_string());
    }
    if args.extract_text {
        parts.push("--extract-text".to_string());
    }
    if args.extract_links {
        parts.push("--extract-links".to_string());
    }
    if args.extract_tables {
        parts.push("--extract-tables".to_string());
    }
    if args.extract_metadata {
        parts.push("--extract-metadata".to_string());
    }
    if let Some(selector) = &args.selector {
        parts.push(format!("--selector={}", selector));
    }
    if args.fail_fast {
        parts.push("--fail-fast".to_string());
    }

    Ok(parts.join(" "))
}
