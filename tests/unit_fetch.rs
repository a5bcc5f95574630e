// Unit tests for the concurrent fetch stage.
//
// A mock SerpProvider stands in for the search API so the worker pool,
// failure isolation, cancellation and concurrency bound can be checked
// without network access.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use indicatif::ProgressBar;
use tokio_util::sync::CancellationToken;

use serpcluster::cluster::aggregate::aggregate;
use serpcluster::config::Config;
use serpcluster::error::FetchError;
use serpcluster::pipeline::fetch::fetch_all;
use serpcluster::pipeline::run::{execute, RunContext};
use serpcluster::serp::client::SerpProvider;
use serpcluster::serp::types::SearchResult;

/// Deterministic provider: each keyword ranks a fixed set of domains.
/// Keywords listed in `failing` return a 500.
struct MockProvider {
    domains: HashMap<String, Vec<&'static str>>,
    failing: Vec<String>,
    delay: Duration,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    calls: AtomicUsize,
}

impl MockProvider {
    fn new(domains: &[(&str, Vec<&'static str>)]) -> Self {
        Self {
            domains: domains
                .iter()
                .map(|(k, d)| (k.to_string(), d.clone()))
                .collect(),
            failing: Vec::new(),
            delay: Duration::from_millis(5),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
            calls: AtomicUsize::new(0),
        }
    }

    fn failing(mut self, keywords: &[&str]) -> Self {
        self.failing = keywords.iter().map(|k| k.to_string()).collect();
        self
    }

    fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

#[async_trait]
impl SerpProvider for MockProvider {
    async fn search(&self, keyword: &str) -> Result<Vec<SearchResult>, FetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);

        tokio::time::sleep(self.delay).await;
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        if self.failing.iter().any(|k| k == keyword) {
            return Err(FetchError::Status {
                status: 500,
                body: "upstream error".to_string(),
            });
        }

        let domains = self.domains.get(keyword).cloned().unwrap_or_default();
        Ok(domains
            .into_iter()
            .enumerate()
            .map(|(i, domain)| SearchResult {
                keyword: keyword.to_string(),
                position: Some(i as u32 + 1),
                url: Some(format!("https://{domain}/{keyword}")),
            })
            .collect())
    }
}

fn keywords(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| s.to_string()).collect()
}

fn catalogue() -> MockProvider {
    MockProvider::new(&[
        ("shoes", vec!["a.com", "b.com", "c.com"]),
        ("boots", vec!["a.com", "b.com", "d.com"]),
        ("sandals", vec!["e.com"]),
        ("trainers", vec!["a.com", "b.com", "c.com", "f.com"]),
        ("slippers", vec![]),
    ])
}

fn sorted(mut results: Vec<SearchResult>) -> Vec<SearchResult> {
    results.sort_by(|a, b| {
        a.keyword
            .cmp(&b.keyword)
            .then_with(|| a.position.cmp(&b.position))
    });
    results
}

#[tokio::test]
async fn collects_results_for_every_keyword() {
    let provider = catalogue();
    let kws = keywords(&["shoes", "boots", "sandals", "trainers", "slippers"]);
    let outcome = fetch_all(
        &provider,
        &kws,
        3,
        &ProgressBar::hidden(),
        &CancellationToken::new(),
    )
    .await;

    assert_eq!(outcome.succeeded, 5);
    assert!(outcome.failures.is_empty());
    assert_eq!(outcome.results.len(), 3 + 3 + 1 + 4);
    assert_eq!(provider.calls.load(Ordering::SeqCst), 5);
}

#[tokio::test]
async fn result_keywords_are_subset_of_input() {
    let provider = catalogue();
    let kws = keywords(&["shoes", "sandals"]);
    let outcome = fetch_all(
        &provider,
        &kws,
        5,
        &ProgressBar::hidden(),
        &CancellationToken::new(),
    )
    .await;

    assert!(outcome.results.iter().all(|r| kws.contains(&r.keyword)));
}

#[tokio::test]
async fn failed_keyword_contributes_nothing() {
    let provider = catalogue().failing(&["boots"]);
    let kws = keywords(&["shoes", "boots", "trainers"]);
    let outcome = fetch_all(
        &provider,
        &kws,
        2,
        &ProgressBar::hidden(),
        &CancellationToken::new(),
    )
    .await;

    assert_eq!(outcome.succeeded, 2);
    assert_eq!(outcome.failures.len(), 1);
    assert_eq!(outcome.failures[0].keyword, "boots");
    assert!(outcome.results.iter().all(|r| r.keyword != "boots"));
    assert_eq!(outcome.completed(), 3);
}

#[tokio::test]
async fn all_failures_yield_empty_results_and_empty_clusters() {
    let provider = catalogue().failing(&["shoes", "boots"]);
    let kws = keywords(&["shoes", "boots"]);
    let outcome = fetch_all(
        &provider,
        &kws,
        4,
        &ProgressBar::hidden(),
        &CancellationToken::new(),
    )
    .await;

    assert!(outcome.results.is_empty());
    assert_eq!(outcome.failures.len(), 2);

    let table = aggregate(&kws, &outcome.results, None, 2);
    assert!(table.is_empty());
}

#[tokio::test]
async fn concurrency_bound_is_respected() {
    let provider = catalogue().with_delay(Duration::from_millis(20));
    let kws = keywords(&["shoes", "boots", "sandals", "trainers", "slippers"]);
    fetch_all(
        &provider,
        &kws,
        2,
        &ProgressBar::hidden(),
        &CancellationToken::new(),
    )
    .await;

    let peak = provider.max_in_flight.load(Ordering::SeqCst);
    assert!(peak <= 2, "expected at most 2 in flight, saw {peak}");
}

#[tokio::test]
async fn concurrency_one_is_sequential() {
    let provider = catalogue();
    let kws = keywords(&["shoes", "boots", "sandals"]);
    fetch_all(
        &provider,
        &kws,
        1,
        &ProgressBar::hidden(),
        &CancellationToken::new(),
    )
    .await;

    assert_eq!(provider.max_in_flight.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn zero_concurrency_is_treated_as_one() {
    let provider = catalogue();
    let kws = keywords(&["shoes", "boots"]);
    let outcome = fetch_all(
        &provider,
        &kws,
        0,
        &ProgressBar::hidden(),
        &CancellationToken::new(),
    )
    .await;
    assert_eq!(outcome.succeeded, 2);
}

#[tokio::test]
async fn concurrency_one_and_twenty_five_agree() {
    let kws = keywords(&["shoes", "boots", "sandals", "trainers", "slippers"]);

    let sequential = fetch_all(
        &catalogue(),
        &kws,
        1,
        &ProgressBar::hidden(),
        &CancellationToken::new(),
    )
    .await;
    let parallel = fetch_all(
        &catalogue(),
        &kws,
        25,
        &ProgressBar::hidden(),
        &CancellationToken::new(),
    )
    .await;

    assert_eq!(
        sorted(sequential.results.clone()),
        sorted(parallel.results.clone())
    );
    assert_eq!(
        aggregate(&kws, &sequential.results, None, 2),
        aggregate(&kws, &parallel.results, None, 2)
    );
}

#[tokio::test]
async fn cancelled_before_start_searches_nothing() {
    let provider = catalogue();
    let kws = keywords(&["shoes", "boots"]);
    let cancel = CancellationToken::new();
    cancel.cancel();

    let outcome = fetch_all(&provider, &kws, 2, &ProgressBar::hidden(), &cancel).await;

    assert_eq!(provider.calls.load(Ordering::SeqCst), 0);
    assert_eq!(outcome.cancelled(), 2);
    assert!(outcome.results.is_empty());
}

#[tokio::test]
async fn cancel_mid_run_stops_slow_searches() {
    let provider = catalogue().with_delay(Duration::from_secs(30));
    let kws = keywords(&["shoes", "boots", "sandals"]);
    let cancel = CancellationToken::new();

    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(20)).await;
        trigger.cancel();
    });

    let outcome = tokio::time::timeout(
        Duration::from_secs(5),
        fetch_all(&provider, &kws, 2, &ProgressBar::hidden(), &cancel),
    )
    .await
    .expect("cancellation should end the run promptly");

    assert_eq!(outcome.cancelled(), 3);
    assert_eq!(outcome.succeeded, 0);
}

#[tokio::test]
async fn progress_tracks_completed_keywords() {
    let provider = catalogue().failing(&["boots"]);
    let kws = keywords(&["shoes", "boots", "sandals"]);
    let pb = ProgressBar::hidden();
    fetch_all(&provider, &kws, 3, &pb, &CancellationToken::new()).await;

    assert_eq!(pb.position(), 3);
    assert_eq!(pb.length(), Some(3));
}

#[tokio::test]
async fn repeated_keyword_is_searched_once_per_run() {
    let provider = MockProvider::new(&[("shoes", vec!["a.com"])]);
    let config = Config {
        api_key: "test-key".to_string(),
        concurrency: 4,
        min_match: 2,
        ..Config::default()
    };
    let ctx = RunContext::new(config.settings().unwrap());

    let report = execute(&ctx, &provider, &keywords(&["shoes", "shoes"]), &ProgressBar::hidden())
        .await
        .unwrap();

    assert_eq!(provider.calls.load(Ordering::SeqCst), 1);
    assert_eq!(report.fetch.succeeded, 1);
    // A single a.com hit scores 1, below the threshold
    assert!(report.table.is_empty());
}
