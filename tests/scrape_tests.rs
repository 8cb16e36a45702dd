//! Integration tests for the scrape pipeline
//!
//! These tests use wiremock mock servers to exercise the politeness layer
//! end-to-end: rate-limit spacing, robots.txt handling, retry budgets,
//! fail-fast dispatch, and output persistence.

use inkcap::config::{Config, OutputFormat, PoolConfig, ScraperConfig};
use inkcap::extract::{PageRecord, ParserRegistry};
use inkcap::scrape::{run_scrape, Fetcher, WorkerPool};
use std::sync::Arc;
use std::time::{Duration, Instant};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn scraper_config(rate_limit: f64, respect_robots: bool, max_retries: u32) -> ScraperConfig {
    ScraperConfig {
        rate_limit,
        respect_robots_txt: respect_robots,
        max_retries,
        timeout: 10,
        verify_ssl: true,
        use_browser: false,
        headless: true,
    }
}

fn pool_config(max_workers: usize, fail_fast: bool) -> PoolConfig {
    PoolConfig {
        max_workers,
        batch_delay: 0.0,
        fail_fast,
    }
}

async fn mount_page(server: &MockServer, page_path: &str, title: &str) {
    Mock::given(method("GET"))
        .and(path(page_path.to_string()))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(format!(
                    "<html><head><title>{}</title></head><body><p>content</p></body></html>",
                    title
                ))
                .insert_header("content-type", "text/html"),
        )
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_same_origin_requests_are_spaced() {
    let server = MockServer::start().await;
    mount_page(&server, "/a", "A").await;
    mount_page(&server, "/b", "B").await;

    let fetcher = Arc::new(Fetcher::new(&scraper_config(0.3, false, 0), &[]).unwrap());
    let pool = WorkerPool::new(&pool_config(2, false));

    let urls = vec![format!("{}/a", server.uri()), format!("{}/b", server.uri())];

    let start = Instant::now();
    let outcome = pool.run(&urls, fetcher).await;
    let elapsed = start.elapsed();

    assert_eq!(outcome.results.len(), 2);
    assert!(outcome.results.iter().all(|r| r.is_success()));
    // Both URLs share an origin, so the second request waits out the
    // 300ms minimum interval even though both fetches run concurrently.
    assert!(
        elapsed >= Duration::from_millis(300),
        "requests too close together: {:?}",
        elapsed
    );
}

#[tokio::test]
async fn test_different_origins_not_throttled_against_each_other() {
    let server_a = MockServer::start().await;
    let server_b = MockServer::start().await;
    mount_page(&server_a, "/", "A").await;
    mount_page(&server_b, "/", "B").await;

    let fetcher = Arc::new(Fetcher::new(&scraper_config(1.0, false, 0), &[]).unwrap());
    let pool = WorkerPool::new(&pool_config(2, false));

    let urls = vec![format!("{}/", server_a.uri()), format!("{}/", server_b.uri())];

    let start = Instant::now();
    let outcome = pool.run(&urls, fetcher).await;

    assert!(outcome.results.iter().all(|r| r.is_success()));
    // Distinct origins have independent buckets: no 1s wait between them.
    assert!(start.elapsed() < Duration::from_millis(800));
}

#[tokio::test]
async fn test_crawl_delay_raises_spacing() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/robots.txt"))
        .respond_with(
            ResponseTemplate::new(200).set_body_string("User-agent: *\nCrawl-delay: 0.4"),
        )
        .mount(&server)
        .await;
    mount_page(&server, "/a", "A").await;
    mount_page(&server, "/b", "B").await;

    // Global rate limit is negligible; the robots crawl delay governs.
    let fetcher = Fetcher::new(&scraper_config(0.01, true, 0), &[]).unwrap();

    let start = Instant::now();
    let first = fetcher.fetch(&format!("{}/a", server.uri())).await;
    let second = fetcher.fetch(&format!("{}/b", server.uri())).await;

    assert!(first.is_success());
    assert!(second.is_success());
    assert!(
        start.elapsed() >= Duration::from_millis(400),
        "crawl delay not honored: {:?}",
        start.elapsed()
    );
}

#[tokio::test]
async fn test_robots_denial_issues_no_page_request() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/robots.txt"))
        .respond_with(
            ResponseTemplate::new(200).set_body_string("User-agent: *\nDisallow: /private"),
        )
        .expect(1)
        .mount(&server)
        .await;
    // The denied page must never be requested.
    Mock::given(method("GET"))
        .and(path("/private"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let fetcher = Fetcher::new(&scraper_config(0.0, true, 2), &[]).unwrap();
    let result = fetcher.fetch(&format!("{}/private", server.uri())).await;

    assert!(result.is_denied());
    assert_eq!(result.attempts, 0);
    assert!(result.content.is_none());
}

#[tokio::test]
async fn test_robots_allowed_path_still_fetched() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/robots.txt"))
        .respond_with(
            ResponseTemplate::new(200).set_body_string("User-agent: *\nDisallow: /private"),
        )
        .mount(&server)
        .await;
    mount_page(&server, "/public", "Public").await;

    let fetcher = Fetcher::new(&scraper_config(0.0, true, 0), &[]).unwrap();
    let result = fetcher.fetch(&format!("{}/public", server.uri())).await;

    assert!(result.is_success());
}

#[tokio::test]
async fn test_ignore_robots_never_fetches_robots_txt() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/robots.txt"))
        .respond_with(
            ResponseTemplate::new(200).set_body_string("User-agent: *\nDisallow: /"),
        )
        .expect(0)
        .mount(&server)
        .await;
    mount_page(&server, "/private", "Private").await;

    let fetcher = Fetcher::new(&scraper_config(0.0, false, 0), &[]).unwrap();
    let result = fetcher.fetch(&format!("{}/private", server.uri())).await;

    assert!(result.is_success());
}

#[tokio::test]
async fn test_robots_fetched_once_per_origin() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/robots.txt"))
        .respond_with(ResponseTemplate::new(200).set_body_string("User-agent: *\nAllow: /"))
        .expect(1)
        .mount(&server)
        .await;
    mount_page(&server, "/a", "A").await;
    mount_page(&server, "/b", "B").await;
    mount_page(&server, "/c", "C").await;

    let fetcher = Fetcher::new(&scraper_config(0.0, true, 0), &[]).unwrap();
    for p in ["/a", "/b", "/c"] {
        let result = fetcher.fetch(&format!("{}{}", server.uri(), p)).await;
        assert!(result.is_success());
    }
}

#[tokio::test]
async fn test_retry_exhaustion_attempts_max_retries_plus_one() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/flaky"))
        .respond_with(ResponseTemplate::new(500))
        .expect(3)
        .mount(&server)
        .await;

    let fetcher = Fetcher::new(&scraper_config(0.0, false, 2), &[]).unwrap();
    let result = fetcher.fetch(&format!("{}/flaky", server.uri())).await;

    assert!(result.is_error());
    assert_eq!(result.attempts, 3);
    assert_eq!(result.status_code, Some(500));
    assert_eq!(
        result.error_kind.map(|k| k.as_str()),
        Some("http_error")
    );
}

#[tokio::test]
async fn test_transient_failure_then_success_retries() {
    let server = MockServer::start().await;
    // Two failures, then success.
    Mock::given(method("GET"))
        .and(path("/eventually"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(2)
        .mount(&server)
        .await;
    mount_page(&server, "/eventually", "Recovered").await;

    let fetcher = Fetcher::new(&scraper_config(0.0, false, 3), &[]).unwrap();
    let result = fetcher.fetch(&format!("{}/eventually", server.uri())).await;

    assert!(result.is_success());
    assert_eq!(result.attempts, 3);
}

#[tokio::test]
async fn test_404_fails_without_retries() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/missing"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&server)
        .await;

    let fetcher = Fetcher::new(&scraper_config(0.0, false, 5), &[]).unwrap();
    let result = fetcher.fetch(&format!("{}/missing", server.uri())).await;

    assert!(result.is_error());
    assert_eq!(result.attempts, 1);
    assert_eq!(result.status_code, Some(404));
}

#[tokio::test]
async fn test_429_consumes_retry_budget() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/limited"))
        .respond_with(ResponseTemplate::new(429))
        .expect(2)
        .mount(&server)
        .await;

    let fetcher = Fetcher::new(&scraper_config(0.0, false, 1), &[]).unwrap();
    let result = fetcher.fetch(&format!("{}/limited", server.uri())).await;

    assert!(result.is_error());
    assert_eq!(result.attempts, 2);
}

#[tokio::test]
async fn test_partial_results_without_fail_fast() {
    let server = MockServer::start().await;
    mount_page(&server, "/ok1", "One").await;
    Mock::given(method("GET"))
        .and(path("/broken"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;
    mount_page(&server, "/ok2", "Two").await;

    let fetcher = Arc::new(Fetcher::new(&scraper_config(0.0, false, 0), &[]).unwrap());
    let pool = WorkerPool::new(&pool_config(1, false));

    let urls = vec![
        format!("{}/ok1", server.uri()),
        format!("{}/broken", server.uri()),
        format!("{}/ok2", server.uri()),
    ];
    let outcome = pool.run(&urls, fetcher).await;

    // All N URLs yield results; exactly one is an error.
    assert_eq!(outcome.results.len(), 3);
    assert_eq!(outcome.error_count(), 1);
    assert!(!outcome.aborted);
}

#[tokio::test]
async fn test_fail_fast_stops_dispatch_after_failing_batch() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/broken"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;
    // The URL after the failing batch must never be requested.
    Mock::given(method("GET"))
        .and(path("/after"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let fetcher = Arc::new(Fetcher::new(&scraper_config(0.0, false, 0), &[]).unwrap());
    let pool = WorkerPool::new(&pool_config(1, true));

    let urls = vec![
        format!("{}/broken", server.uri()),
        format!("{}/after", server.uri()),
    ];
    let outcome = pool.run(&urls, fetcher).await;

    assert_eq!(outcome.results.len(), 1);
    assert!(outcome.aborted);
}

#[tokio::test]
async fn test_full_pipeline_writes_json_records() {
    let server = MockServer::start().await;
    mount_page(&server, "/page1", "First Page").await;
    mount_page(&server, "/page2", "Second Page").await;

    let out_dir = tempfile::tempdir().unwrap();

    let mut config = Config::default();
    config.scraper.rate_limit = 0.0;
    config.scraper.respect_robots_txt = false;
    config.pool.max_workers = 2;
    config.pool.batch_delay = 0.0;
    config.output.dir = out_dir.path().display().to_string();
    config.output.format = OutputFormat::Json;
    config.urls = vec![
        format!("{}/page1", server.uri()),
        format!("{}/page2", server.uri()),
    ];

    let registry = ParserRegistry::new();
    let report = run_scrape(&config, &registry, None).await.unwrap();

    assert_eq!(report.records.len(), 2);
    assert_eq!(report.failure_count(), 0);
    assert!(!report.aborted);

    let content = std::fs::read_to_string(&report.output_path).unwrap();
    let records: Vec<PageRecord> = serde_json::from_str(&content).unwrap();
    assert_eq!(records.len(), 2);

    let titles: Vec<Option<&str>> = records.iter().map(|r| r.title.as_deref()).collect();
    assert!(titles.contains(&Some("First Page")) || titles.contains(&Some("Second Page")));
}

#[tokio::test]
async fn test_pipeline_dedups_repeated_urls() {
    let server = MockServer::start().await;
    mount_page(&server, "/page", "Page").await;

    let out_dir = tempfile::tempdir().unwrap();

    let mut config = Config::default();
    config.scraper.rate_limit = 0.0;
    config.scraper.respect_robots_txt = false;
    config.output.dir = out_dir.path().display().to_string();
    let url = format!("{}/page", server.uri());
    config.urls = vec![url.clone(), url];

    let registry = ParserRegistry::new();
    let report = run_scrape(&config, &registry, None).await.unwrap();

    assert_eq!(report.records.len(), 1);
}

#[tokio::test]
async fn test_pipeline_reports_mixed_outcomes() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/robots.txt"))
        .respond_with(
            ResponseTemplate::new(200).set_body_string("User-agent: *\nDisallow: /secret"),
        )
        .mount(&server)
        .await;
    mount_page(&server, "/open", "Open").await;
    Mock::given(method("GET"))
        .and(path("/gone"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let out_dir = tempfile::tempdir().unwrap();

    let mut config = Config::default();
    config.scraper.rate_limit = 0.0;
    config.scraper.max_retries = 0;
    config.output.dir = out_dir.path().display().to_string();
    config.urls = vec![
        format!("{}/open", server.uri()),
        format!("{}/secret", server.uri()),
        format!("{}/gone", server.uri()),
    ];

    let registry = ParserRegistry::new();
    let report = run_scrape(&config, &registry, None).await.unwrap();

    assert_eq!(report.records.len(), 3);
    assert_eq!(report.success_count(), 1);
    // The denial is a refusal, not a failure.
    assert_eq!(report.failure_count(), 1);

    let denied = report
        .records
        .iter()
        .find(|r| r.url.ends_with("/secret"))
        .unwrap();
    assert_eq!(denied.status, "denied");
}

#[tokio::test]
async fn test_custom_parser_takes_over_matching_prefix() {
    use inkcap::extract::{ExtractError, SiteParser};

    struct TitleOnlyParser;

    impl SiteParser for TitleOnlyParser {
        fn parse(&self, _html: &str, url: &str) -> Result<PageRecord, ExtractError> {
            Ok(PageRecord {
                url: url.to_string(),
                status: "success".to_string(),
                title: Some("from custom parser".to_string()),
                text: None,
                links: Vec::new(),
                tables: Vec::new(),
                metadata: Default::default(),
                error: None,
                error_kind: None,
                attempts: 0,
                elapsed_ms: 0,
            })
        }
    }

    let server = MockServer::start().await;
    mount_page(&server, "/page", "Server Title").await;

    let out_dir = tempfile::tempdir().unwrap();

    let mut config = Config::default();
    config.scraper.rate_limit = 0.0;
    config.scraper.respect_robots_txt = false;
    config.output.dir = out_dir.path().display().to_string();
    config.urls = vec![format!("{}/page", server.uri())];

    let mut registry = ParserRegistry::new();
    registry.register(server.uri(), Arc::new(TitleOnlyParser));

    let report = run_scrape(&config, &registry, None).await.unwrap();

    assert_eq!(report.records.len(), 1);
    assert_eq!(
        report.records[0].title.as_deref(),
        Some("from custom parser")
    );
}
