//! Full runs from registry to SQLite

use crate::common::{
    article_html, days_ago, listing_html, peak_overlap, test_source, test_tunables, ArrivalLog,
};
use regwatch::config::{Registry, Tunables};
use regwatch::crawler::Coordinator;
use regwatch::storage::{ArticleStore, RunStatus, SqliteStorage};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use wiremock::matchers::{method, path, path_regex};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Mounts a listing with one fresh, one stale and one short article
async fn mount_regulator(server: &MockServer) {
    let hrefs = vec![
        "/about".to_string(),
        "/news/fresh-guidance".to_string(),
        "/news/old-guidance".to_string(),
        "/news/short-notice".to_string(),
        "/fr/news/fresh-guidance".to_string(),
    ];
    Mock::given(method("GET"))
        .and(path("/press"))
        .respond_with(ResponseTemplate::new(200).set_body_string(listing_html(&hrefs)))
        .mount(server)
        .await;

    let pages = [
        ("/news/fresh-guidance", article_html("Fresh guidance", Some(days_ago(1)), 8)),
        ("/news/old-guidance", article_html("Old guidance", Some(days_ago(40)), 8)),
        ("/news/short-notice", article_html("Short notice", Some(days_ago(1)), 1)),
    ];
    for (p, body) in pages {
        Mock::given(method("GET"))
            .and(path(p))
            .respond_with(ResponseTemplate::new(200).set_body_string(body))
            .mount(server)
            .await;
    }
}

fn registry(server: &MockServer) -> Registry {
    Registry {
        sources: vec![
            test_source("regulator", &format!("{}/press", server.uri())),
            test_source("dead listing", &format!("{}/gone", server.uri())),
        ],
    }
}

#[tokio::test]
async fn test_full_run_persists_only_qualifying_articles() {
    let server = MockServer::start().await;
    mount_regulator(&server).await;
    Mock::given(method("GET"))
        .and(path("/gone"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir.path().join("regwatch.db");
    let store = Arc::new(SqliteStorage::new(&db_path).unwrap());
    let coordinator = Coordinator::new(&test_tunables(), store.clone()).unwrap();

    let stats = coordinator.run(&registry(&server), "hash-1").await.unwrap();

    assert_eq!(stats.sources_total, 2);
    assert_eq!(stats.sources_failed, 1);
    assert_eq!(stats.candidates, 3);
    assert_eq!(stats.persisted, 1);
    assert_eq!(stats.skipped.get("stale"), Some(&1));
    assert_eq!(stats.skipped.get("too-short"), Some(&1));
    assert_eq!(stats.failed, 0);

    let fresh_url = format!("{}/news/fresh-guidance", server.uri());
    let stored = store.get_article(&fresh_url).unwrap().expect("article stored");
    assert_eq!(stored.title, "Fresh guidance");
    assert_eq!(stored.date_source, "meta");
    assert_eq!(store.count_articles().unwrap(), 1);

    let run = store.get_latest_run().unwrap().unwrap();
    assert_eq!(run.status, RunStatus::Completed);
    assert_eq!(run.registry_hash, "hash-1");
    assert_eq!(run.persisted, 1);
    assert_eq!(run.sources_failed, 1);
    assert!(run.finished_at.is_some());
}

#[tokio::test]
async fn test_repeated_runs_are_idempotent() {
    let server = MockServer::start().await;
    mount_regulator(&server).await;
    Mock::given(method("GET"))
        .and(path("/gone"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir.path().join("regwatch.db");
    let registry = registry(&server);
    let fresh_url = format!("{}/news/fresh-guidance", server.uri());

    let first = {
        let store = Arc::new(SqliteStorage::new(&db_path).unwrap());
        let coordinator = Coordinator::new(&test_tunables(), store.clone()).unwrap();
        coordinator.run(&registry, "hash-1").await.unwrap();
        store.get_article(&fresh_url).unwrap().unwrap()
    };

    // Reopen the same file for the second run
    let store = Arc::new(SqliteStorage::new(&db_path).unwrap());
    let coordinator = Coordinator::new(&test_tunables(), store.clone()).unwrap();
    let stats = coordinator.run(&registry, "hash-1").await.unwrap();
    assert_eq!(stats.persisted, 1);

    let second = store.get_article(&fresh_url).unwrap().unwrap();
    assert_eq!(store.count_articles().unwrap(), 1);
    assert_eq!(second.id, first.id);
    assert_eq!(second.inserted_at, first.inserted_at);
    assert!(second.updated_at >= first.updated_at);
    assert_eq!(second.fingerprint, first.fingerprint);

    let recent = store.list_recent_articles_days(7, 10).unwrap();
    assert_eq!(recent.len(), 1);
}

const ARTICLE_DELAY: Duration = Duration::from_millis(200);

/// Mounts a listing of three slow articles, all logged into `log`
async fn mount_slow_regulator(server: &MockServer, log: &ArrivalLog) {
    let hrefs: Vec<String> = (1..=3).map(|i| format!("/news/item-{}", i)).collect();
    Mock::given(method("GET"))
        .and(path("/press"))
        .respond_with(ResponseTemplate::new(200).set_body_string(listing_html(&hrefs)))
        .mount(server)
        .await;

    let article = ResponseTemplate::new(200).set_body_string(article_html(
        "Slow statement",
        Some(days_ago(1)),
        8,
    ));
    Mock::given(method("GET"))
        .and(path_regex(r"^/news/item-\d$"))
        .respond_with(log.sharing(article, ARTICLE_DELAY))
        .expect(3)
        .mount(server)
        .await;
}

async fn peak_extractions(fetch_concurrency: usize) -> usize {
    let log = ArrivalLog::new(ResponseTemplate::new(200), ARTICLE_DELAY);
    let first = MockServer::start().await;
    let second = MockServer::start().await;
    mount_slow_regulator(&first, &log).await;
    mount_slow_regulator(&second, &log).await;

    let registry = Registry {
        sources: vec![
            test_source("first", &format!("{}/press", first.uri())),
            test_source("second", &format!("{}/press", second.uri())),
        ],
    };
    let tunables = Tunables {
        fetch_concurrency,
        per_host_concurrency: 8,
        ..test_tunables()
    };
    let store = Arc::new(SqliteStorage::open_in_memory().unwrap());
    let coordinator = Coordinator::new(&tunables, store.clone()).unwrap();

    let stats = coordinator.run(&registry, "slow").await.unwrap();
    assert_eq!(stats.candidates, 6);
    assert_eq!(stats.persisted, 6);

    let arrivals = log.arrivals();
    assert_eq!(arrivals.len(), 6);
    peak_overlap(&arrivals, ARTICLE_DELAY.mul_f64(0.8))
}

#[tokio::test]
async fn test_single_extraction_slot_serializes_all_hosts() {
    assert_eq!(peak_extractions(1).await, 1);
}

#[tokio::test]
async fn test_extraction_limit_caps_concurrency_across_hosts() {
    assert_eq!(peak_extractions(2).await, 2);
}
