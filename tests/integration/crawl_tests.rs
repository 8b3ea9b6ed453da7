use crate::common::CountingFetcher;
use async_trait::async_trait;
use ripple_crawl::crawler::{
    crawl, Crawler, DiscoveryRecord, FetchResult, FetchedPage, Fetcher, StaticFetcher,
};
use ripple_crawl::FetchError;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

const NO_LINKS: [&str; 0] = [];

fn urls(records: &[DiscoveryRecord]) -> HashSet<String> {
    records.iter().map(|r| r.url.clone()).collect()
}

fn set(items: &[&str]) -> HashSet<String> {
    items.iter().map(|s| s.to_string()).collect()
}

fn diamond() -> StaticFetcher {
    StaticFetcher::new()
        .page("A", "a", ["B", "C"])
        .page("B", "b", ["D"])
        .page("C", "c", ["D"])
        .page("D", "d", NO_LINKS)
}

#[tokio::test]
async fn test_single_page_no_children() {
    let fetcher = Arc::new(CountingFetcher::new(StaticFetcher::new().page("A", "a", NO_LINKS)));

    let records = crawl("A", 1, Arc::clone(&fetcher)).await;

    assert_eq!(
        records,
        vec![DiscoveryRecord {
            url: "A".to_string(),
            body: "a".to_string(),
            children: vec![],
        }]
    );
    assert_eq!(fetcher.total_calls(), 1);
}

#[tokio::test]
async fn test_tree_depth_cutoff() {
    let fetcher = Arc::new(CountingFetcher::new(
        StaticFetcher::new()
            .page("A", "a", ["B", "C"])
            .page("B", "b", ["D"])
            .page("C", "c", NO_LINKS)
            .page("D", "d", NO_LINKS),
    ));

    let records = crawl("A", 2, Arc::clone(&fetcher)).await;

    assert_eq!(urls(&records), set(&["A", "B", "C"]));
    assert_eq!(fetcher.calls("D"), 0);
    assert_eq!(fetcher.total_calls(), 3);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_diamond_fetches_shared_child_once() {
    let fetcher = Arc::new(CountingFetcher::new(diamond()));

    let records = crawl("A", 4, Arc::clone(&fetcher)).await;

    assert_eq!(records.len(), 4);
    assert_eq!(urls(&records), set(&["A", "B", "C", "D"]));
    assert_eq!(fetcher.calls("D"), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_cycle_terminates() {
    let fetcher = Arc::new(CountingFetcher::new(
        StaticFetcher::new().page("A", "a", ["B"]).page("B", "b", ["A"]),
    ));

    let crawl_future = crawl("A", 10, Arc::clone(&fetcher));
    let records = tokio::time::timeout(Duration::from_secs(5), crawl_future)
        .await
        .expect("crawl did not terminate");

    assert_eq!(records.len(), 2);
    assert_eq!(fetcher.calls("A"), 1);
    assert_eq!(fetcher.calls("B"), 1);
}

#[tokio::test]
async fn test_fetch_failure_does_not_abort() {
    let fetcher = StaticFetcher::new()
        .page("A", "a", ["B", "C"])
        .page("C", "c", NO_LINKS);

    let (records, report) = Crawler::new(fetcher).collect("A", 2).await.unwrap();

    assert_eq!(urls(&records), set(&["A", "C"]));
    assert_eq!(report.fetch_failures, 1);
    assert_eq!(report.pages_fetched, 2);
}

#[tokio::test]
async fn test_every_fetch_failing_still_returns() {
    let (records, report) = Crawler::new(StaticFetcher::new())
        .collect("A", 3)
        .await
        .unwrap();

    assert!(records.is_empty());
    assert_eq!(report.fetch_failures, 1);
    assert!(report.is_balanced());
}

#[tokio::test]
async fn test_max_depth_zero_fetches_nothing() {
    let fetcher = Arc::new(CountingFetcher::new(diamond()));

    let (records, report) = Crawler::new(Arc::clone(&fetcher))
        .collect("A", 0)
        .await
        .unwrap();

    assert!(records.is_empty());
    assert_eq!(fetcher.total_calls(), 0);
    assert_eq!(report.depth_exhausted, 1);
    assert_eq!(report.tasks_registered, 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_depth_bound_on_chain() {
    let mut fetcher = StaticFetcher::new();
    for i in 0..10 {
        fetcher = fetcher.page(format!("N{}", i), format!("n{}", i), [format!("N{}", i + 1)]);
    }
    let fetcher = Arc::new(CountingFetcher::new(fetcher));

    let records = crawl("N0", 4, Arc::clone(&fetcher)).await;

    assert_eq!(urls(&records), set(&["N0", "N1", "N2", "N3"]));
    for i in 4..10 {
        assert_eq!(fetcher.calls(&format!("N{}", i)), 0);
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_complete_tree_is_fully_fetched() {
    // Binary tree of depth 5: node i has children 2i+1 and 2i+2.
    let nodes = 31;
    let mut fetcher = StaticFetcher::new();
    for i in 0..nodes {
        let children: Vec<String> = [2 * i + 1, 2 * i + 2]
            .into_iter()
            .filter(|c| *c < nodes)
            .map(|c| format!("T{}", c))
            .collect();
        fetcher = fetcher.page(format!("T{}", i), "t", children);
    }
    let fetcher = Arc::new(CountingFetcher::new(fetcher).with_jitter(2));

    let (records, report) = Crawler::new(Arc::clone(&fetcher))
        .collect("T0", 5)
        .await
        .unwrap();

    assert_eq!(records.len(), nodes);
    assert_eq!(fetcher.max_calls_per_url(), 1);
    assert_eq!(report.fetch_attempts(), nodes as u64);
    assert!(report.is_balanced());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_records_match_successful_fetches() {
    let fetcher = Arc::new(CountingFetcher::new(StaticFetcher::golang_tour()).with_jitter(3));

    let (records, report) = Crawler::new(Arc::clone(&fetcher))
        .collect("https://golang.org/", 4)
        .await
        .unwrap();

    assert_eq!(
        urls(&records),
        set(&[
            "https://golang.org/",
            "https://golang.org/pkg/",
            "https://golang.org/pkg/fmt/",
            "https://golang.org/pkg/os/",
        ])
    );
    assert_eq!(records.len() as u64, report.pages_fetched);
    assert_eq!(report.fetch_failures, 1);
    assert_eq!(fetcher.calls("https://golang.org/cmd/"), 1);
    assert_eq!(fetcher.max_calls_per_url(), 1);
    assert_eq!(fetcher.total_calls() as u64, report.fetch_attempts());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_barrier_balance() {
    let (_, report) = Crawler::new(StaticFetcher::golang_tour())
        .collect("https://golang.org/", 6)
        .await
        .unwrap();

    assert!(report.is_balanced());
    let exits = report.pages_fetched
        + report.fetch_failures
        + report.already_seen
        + report.depth_exhausted
        + report.cancelled;
    assert_eq!(exits, report.tasks_registered);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn test_diamond_race_repeated() {
    for run in 0..100 {
        let fetcher = Arc::new(CountingFetcher::new(diamond()).with_jitter(5));

        let records = crawl("A", 4, Arc::clone(&fetcher)).await;

        assert_eq!(fetcher.calls("D"), 1, "D fetched more than once in run {}", run);
        assert_eq!(records.len(), 4, "wrong record count in run {}", run);
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn test_cycle_race_repeated() {
    for run in 0..100 {
        let fetcher = Arc::new(
            CountingFetcher::new(StaticFetcher::new().page("A", "a", ["B"]).page("B", "b", ["A"]))
                .with_jitter(2),
        );

        let crawl_future = crawl("A", 10, Arc::clone(&fetcher));
        let records = tokio::time::timeout(Duration::from_secs(5), crawl_future)
            .await
            .unwrap_or_else(|_| panic!("crawl hung in run {}", run));

        assert_eq!(records.len(), 2);
        assert_eq!(fetcher.total_calls(), 2, "wrong fetch count in run {}", run);
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_same_url_reached_by_many_parents() {
    // Every page links to every other page.
    let names: Vec<String> = (0..12).map(|i| format!("P{}", i)).collect();
    let mut fetcher = StaticFetcher::new();
    for name in &names {
        fetcher = fetcher.page(name.clone(), "p", names.clone());
    }
    let fetcher = Arc::new(CountingFetcher::new(fetcher).with_jitter(3));

    let (records, report) = Crawler::new(Arc::clone(&fetcher))
        .collect("P0", 3)
        .await
        .unwrap();

    assert_eq!(records.len(), names.len());
    assert_eq!(fetcher.max_calls_per_url(), 1);
    assert!(report.already_seen > 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn test_concurrency_limit_respected() {
    let children: Vec<String> = (0..40).map(|i| format!("C{}", i)).collect();
    let mut fetcher = StaticFetcher::new().page("root", "r", children.clone());
    for child in &children {
        fetcher = fetcher.page(child.clone(), "c", NO_LINKS);
    }
    let fetcher = Arc::new(CountingFetcher::new(fetcher).with_jitter(5));

    let (records, _) = Crawler::new(Arc::clone(&fetcher))
        .with_max_concurrent_fetches(3)
        .collect("root", 2)
        .await
        .unwrap();

    assert_eq!(records.len(), 41);
    assert!(fetcher.peak_in_flight() <= 3);
}

#[tokio::test]
async fn test_callback_sees_each_record_once() {
    let mut seen = HashMap::new();

    let report = Crawler::new(diamond())
        .run("A", 4, |record| {
            *seen.entry(record.url).or_insert(0) += 1;
        })
        .await
        .unwrap();

    assert_eq!(seen.len(), 4);
    assert!(seen.values().all(|count| *count == 1));
    assert_eq!(report.pages_fetched, 4);
}

/// Serves the root immediately and hangs on every other URL
struct HangingFetcher;

#[async_trait]
impl Fetcher for HangingFetcher {
    async fn fetch(&self, url: &str) -> FetchResult {
        if url == "root" {
            return Ok(FetchedPage::new("r", ["slow-1", "slow-2", "slow-3"]));
        }
        tokio::time::sleep(Duration::from_secs(3600)).await;
        Err(FetchError::Other(format!("{} never finishes", url)))
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_cancellation_stops_in_flight_fetches() {
    let token = CancellationToken::new();
    let crawler = Crawler::new(HangingFetcher).with_cancellation(token.clone());

    let canceller = tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        token.cancel();
    });

    let (records, report) = tokio::time::timeout(Duration::from_secs(5), crawler.collect("root", 3))
        .await
        .expect("cancelled crawl did not return")
        .unwrap();
    canceller.await.unwrap();

    assert_eq!(urls(&records), set(&["root"]));
    assert_eq!(report.cancelled, 3);
    assert!(report.was_cancelled());
    assert!(report.is_balanced());
}

#[tokio::test]
async fn test_cancelled_before_start_claims_nothing() {
    let fetcher = Arc::new(CountingFetcher::new(diamond()));
    let token = CancellationToken::new();
    token.cancel();

    let (records, report) = Crawler::new(Arc::clone(&fetcher))
        .with_cancellation(token)
        .collect("A", 4)
        .await
        .unwrap();

    assert!(records.is_empty());
    assert_eq!(fetcher.total_calls(), 0);
    assert_eq!(report.cancelled, 1);
}

#[tokio::test]
async fn test_independent_traversals_do_not_share_state() {
    let fetcher = Arc::new(CountingFetcher::new(diamond()));
    let crawler = Crawler::new(Arc::clone(&fetcher));

    let (first, _) = crawler.collect("A", 4).await.unwrap();
    let (second, _) = crawler.collect("B", 4).await.unwrap();

    assert_eq!(first.len(), 4);
    assert_eq!(urls(&second), set(&["B", "D"]));
    assert_eq!(fetcher.calls("D"), 2);
}
