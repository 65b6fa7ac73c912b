//! End-to-end fetch runs against a mock ranking endpoint.

use ranking_fetcher::{
    Backoff, FetchMode, PacingController, RankingClient, RankingDriver, RetryPolicy, RunOptions,
};
use serde_json::{json, Value};
use shared::{Config, DataPaths, FetcherConfig};
use std::path::Path;
use std::time::{Duration, Instant};
use tempfile::TempDir;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn fetcher_config(server_uri: &str) -> FetcherConfig {
    let mut config = Config::default().fetcher;
    config.base_url = format!("{}/ranking/get", server_uri);
    config.max_retries = 3;
    config.retry_base_delay_ms = 10;
    config.retry_max_delay_ms = 40;
    config.pacing.base_delay_ms = 5;
    config.pacing.min_delay_ms = 1;
    config.pacing.max_delay_ms = 50;
    config
}

fn build_driver(config: &FetcherConfig, root: &Path, options: RunOptions) -> RankingDriver {
    let backoff = match options.mode {
        FetchMode::Concurrent { .. } => Backoff::Exponential {
            base: Duration::from_millis(config.retry_base_delay_ms),
            max: Duration::from_millis(config.retry_max_delay_ms),
        },
        _ => Backoff::Linear {
            base: Duration::from_millis(config.retry_base_delay_ms),
        },
    };

    let client = RankingClient::new(
        config,
        RetryPolicy {
            max_attempts: config.max_retries,
            backoff,
        },
    )
    .unwrap();

    let pacing = PacingController::new(
        Duration::from_millis(config.pacing.base_delay_ms),
        Duration::from_millis(config.pacing.min_delay_ms),
        Duration::from_millis(config.pacing.max_delay_ms),
    );

    RankingDriver::new(client, pacing, DataPaths::new(root), options).unwrap()
}

/// Envelope for `page` with `records` entries; record ids are
/// `page * 100 + index` so output contents identify their source page.
fn page_body(page: u32, last_page: u32, records: u32) -> Value {
    let data: Vec<Value> = (0..records)
        .map(|i| json!({"id": page * 100 + i, "title": format!("wpis-{}-{}", page, i)}))
        .collect();

    json!({"rankings": {"data": data, "last_page": last_page}})
}

async fn mount_page(server: &MockServer, page: u32, body: Value) {
    Mock::given(method("GET"))
        .and(path("/ranking/get"))
        .and(query_param("page", page.to_string()))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .expect(1)
        .mount(server)
        .await;
}

fn read_lines(path: &Path) -> Vec<Value> {
    std::fs::read_to_string(path)
        .unwrap()
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect()
}

fn ids(lines: &[Value]) -> Vec<u64> {
    lines.iter().map(|v| v["id"].as_u64().unwrap()).collect()
}

#[tokio::test]
async fn sequential_run_archives_every_record_in_order() {
    let server = MockServer::start().await;
    for page in 1..=3 {
        mount_page(&server, page, page_body(page, 3, 2)).await;
    }

    let temp_dir = TempDir::new().unwrap();
    let config = fetcher_config(&server.uri());
    let mut driver = build_driver(
        &config,
        temp_dir.path(),
        RunOptions {
            mode: FetchMode::Sequential,
            page_range: None,
            output: None,
            sort_output: false,
        },
    );

    let stats = driver.run().await.unwrap();

    assert_eq!(stats.total_pages, 3);
    assert_eq!(stats.pages_fetched, 3);
    assert_eq!(stats.pages_missing, 0);
    assert_eq!(stats.pages_failed, 0);
    assert_eq!(stats.records_written, 6);

    let lines = read_lines(&DataPaths::new(temp_dir.path()).ranking_file());
    assert_eq!(ids(&lines), vec![100, 101, 200, 201, 300, 301]);
    assert_eq!(lines[0]["title"], "wpis-1-0");
}

#[tokio::test]
async fn not_found_page_is_absent_and_never_retried() {
    let server = MockServer::start().await;
    mount_page(&server, 1, page_body(1, 3, 2)).await;
    Mock::given(method("GET"))
        .and(path("/ranking/get"))
        .and(query_param("page", "2"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&server)
        .await;
    mount_page(&server, 3, page_body(3, 3, 2)).await;

    let temp_dir = TempDir::new().unwrap();
    let config = fetcher_config(&server.uri());
    let mut driver = build_driver(
        &config,
        temp_dir.path(),
        RunOptions {
            mode: FetchMode::Sequential,
            page_range: None,
            output: None,
            sort_output: false,
        },
    );

    let stats = driver.run().await.unwrap();

    assert_eq!(stats.pages_fetched, 2);
    assert_eq!(stats.pages_missing, 1);
    assert_eq!(stats.pages_failed, 0);

    let lines = read_lines(&DataPaths::new(temp_dir.path()).ranking_file());
    assert_eq!(ids(&lines), vec![100, 101, 300, 301]);
}

#[tokio::test]
async fn exhausted_page_is_skipped_and_run_completes() {
    let server = MockServer::start().await;
    mount_page(&server, 1, page_body(1, 3, 2)).await;
    // Fails on every attempt; the retry limit bounds the request count
    Mock::given(method("GET"))
        .and(path("/ranking/get"))
        .and(query_param("page", "2"))
        .respond_with(ResponseTemplate::new(500))
        .expect(3)
        .mount(&server)
        .await;
    mount_page(&server, 3, page_body(3, 3, 2)).await;

    let temp_dir = TempDir::new().unwrap();
    let config = fetcher_config(&server.uri());
    let mut driver = build_driver(
        &config,
        temp_dir.path(),
        RunOptions {
            mode: FetchMode::Sequential,
            page_range: None,
            output: None,
            sort_output: false,
        },
    );

    let stats = driver.run().await.unwrap();

    assert_eq!(stats.pages_fetched, 2);
    assert_eq!(stats.pages_failed, 1);

    let lines = read_lines(&DataPaths::new(temp_dir.path()).ranking_file());
    assert_eq!(ids(&lines), vec![100, 101, 300, 301]);
}

#[tokio::test]
async fn failing_discovery_aborts_without_output() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/ranking/get"))
        .respond_with(ResponseTemplate::new(500))
        .expect(3)
        .mount(&server)
        .await;

    let temp_dir = TempDir::new().unwrap();
    let config = fetcher_config(&server.uri());
    let mut driver = build_driver(
        &config,
        temp_dir.path(),
        RunOptions {
            mode: FetchMode::Sequential,
            page_range: None,
            output: None,
            sort_output: false,
        },
    );

    let result = driver.run().await;

    assert!(result.is_err());
    assert!(!DataPaths::new(temp_dir.path()).ranking_file().exists());
}

#[tokio::test]
async fn partitioned_run_splits_pages_across_part_files() {
    let server = MockServer::start().await;
    for page in 1..=10 {
        mount_page(&server, page, page_body(page, 10, 1)).await;
    }

    let temp_dir = TempDir::new().unwrap();
    let config = fetcher_config(&server.uri());
    let mut driver = build_driver(
        &config,
        temp_dir.path(),
        RunOptions {
            mode: FetchMode::Partitioned { parts: 2 },
            page_range: None,
            output: None,
            sort_output: false,
        },
    );

    let stats = driver.run().await.unwrap();

    assert_eq!(stats.pages_fetched, 10);
    assert_eq!(stats.records_written, 10);

    let paths = DataPaths::new(temp_dir.path());
    let part1 = read_lines(&paths.ranking_part_file(1));
    let part2 = read_lines(&paths.ranking_part_file(2));

    assert_eq!(ids(&part1), vec![100, 200, 300, 400, 500]);
    assert_eq!(ids(&part2), vec![600, 700, 800, 900, 1000]);
    assert!(!paths.ranking_part_file(3).exists());
}

#[tokio::test]
async fn worker_pool_is_bounded_by_width() {
    let server = MockServer::start().await;
    for page in 1..=4 {
        Mock::given(method("GET"))
            .and(path("/ranking/get"))
            .and(query_param("page", page.to_string()))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(page_body(page, 4, 1))
                    .set_delay(Duration::from_millis(300)),
            )
            .expect(1)
            .mount(&server)
            .await;
    }

    let temp_dir = TempDir::new().unwrap();
    let config = fetcher_config(&server.uri());
    let mut driver = build_driver(
        &config,
        temp_dir.path(),
        RunOptions {
            mode: FetchMode::Concurrent { workers: 2 },
            // Explicit range: all four pages go through the pool
            page_range: Some((1, 4)),
            output: None,
            sort_output: true,
        },
    );

    let start = Instant::now();
    let stats = driver.run().await.unwrap();
    let elapsed = start.elapsed();

    // Two workers over four 300ms pages: two rounds. A wider pool would
    // finish in one round, a sequential run would need four.
    assert!(
        elapsed >= Duration::from_millis(580),
        "finished too fast for a pool of 2: {:?}",
        elapsed
    );
    assert!(
        elapsed < Duration::from_millis(1100),
        "too slow for a pool of 2: {:?}",
        elapsed
    );

    assert_eq!(stats.pages_fetched, 4);
    assert_eq!(stats.records_written, 4);

    // sort_output normalizes completion order back to page order
    let lines = read_lines(&DataPaths::new(temp_dir.path()).ranking_file());
    assert_eq!(ids(&lines), vec![100, 200, 300, 400]);
}

#[tokio::test]
async fn explicit_range_skips_discovery_and_respects_output_override() {
    let server = MockServer::start().await;
    for page in 5..=6 {
        mount_page(&server, page, page_body(page, 99, 2)).await;
    }

    let temp_dir = TempDir::new().unwrap();
    let output = temp_dir.path().join("slice.jsonl");
    let config = fetcher_config(&server.uri());
    let mut driver = build_driver(
        &config,
        temp_dir.path(),
        RunOptions {
            mode: FetchMode::Sequential,
            page_range: Some((5, 6)),
            output: Some(output.clone()),
            sort_output: false,
        },
    );

    let stats = driver.run().await.unwrap();

    assert_eq!(stats.total_pages, 2);
    assert_eq!(stats.records_written, 4);

    let lines = read_lines(&output);
    assert_eq!(ids(&lines), vec![500, 501, 600, 601]);
    // No request for page 1 was made; the mocks above verify on drop
    assert!(!DataPaths::new(temp_dir.path()).ranking_file().exists());
}
