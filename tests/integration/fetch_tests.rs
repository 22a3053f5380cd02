//! Transport behavior against a mock server

use crate::common::{peak_overlap, test_tunables, ArrivalLog};
use futures::future::join_all;
use regwatch::config::Tunables;
use regwatch::crawler::{FetchOutcome, HeaderProfile, Transport};
use std::time::{Duration, Instant};
use url::Url;
use wiremock::matchers::{header, method, path, path_regex};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn url(server: &MockServer, p: &str) -> Url {
    Url::parse(&format!("{}{}", server.uri(), p)).unwrap()
}

#[tokio::test]
async fn test_transient_status_retried_until_exhausted() {
    let server = MockServer::start().await;
    let tunables = test_tunables();

    Mock::given(method("GET"))
        .and(path("/busy"))
        .respond_with(ResponseTemplate::new(503))
        .expect(u64::from(tunables.http_retries) + 1)
        .mount(&server)
        .await;

    let transport = Transport::new(&tunables).unwrap();
    let outcome = transport
        .fetch(&url(&server, "/busy"), HeaderProfile::Primary)
        .await;

    match outcome {
        FetchOutcome::TransientFailure { reason } => assert_eq!(reason, "HTTP 503"),
        other => panic!("expected transient failure, got {:?}", other),
    }
}

#[tokio::test]
async fn test_permanent_status_is_not_retried() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/gone"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&server)
        .await;

    let transport = Transport::new(&test_tunables()).unwrap();
    let outcome = transport
        .fetch(&url(&server, "/gone"), HeaderProfile::Primary)
        .await;

    assert!(matches!(outcome, FetchOutcome::PermanentFailure { status: 404 }));
}

#[tokio::test]
async fn test_recovers_after_transient_failures() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/flaky"))
        .respond_with(ResponseTemplate::new(429))
        .up_to_n_times(2)
        .with_priority(1)
        .expect(2)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/flaky"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<p>ok</p>"))
        .expect(1)
        .mount(&server)
        .await;

    let transport = Transport::new(&test_tunables()).unwrap();
    let page = transport
        .fetch(&url(&server, "/flaky"), HeaderProfile::Primary)
        .await
        .into_ok_page()
        .expect("third attempt succeeds");

    assert_eq!(page.status, 200);
    assert_eq!(page.text(), "<p>ok</p>");
}

#[tokio::test]
async fn test_zero_retries_means_single_attempt() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/down"))
        .respond_with(ResponseTemplate::new(500))
        .expect(1)
        .mount(&server)
        .await;

    let tunables = Tunables {
        http_retries: 0,
        ..test_tunables()
    };
    let transport = Transport::new(&tunables).unwrap();
    let outcome = transport
        .fetch(&url(&server, "/down"), HeaderProfile::Primary)
        .await;

    assert!(matches!(outcome, FetchOutcome::TransientFailure { .. }));
}

#[tokio::test]
async fn test_secondary_profile_sends_client_hints() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/hints"))
        .and(header("sec-ch-ua-platform", "\"Windows\""))
        .and(header("upgrade-insecure-requests", "1"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/hints"))
        .respond_with(ResponseTemplate::new(403))
        .expect(1)
        .mount(&server)
        .await;

    let transport = Transport::new(&test_tunables()).unwrap();
    let target = url(&server, "/hints");

    let primary = transport.fetch(&target, HeaderProfile::Primary).await;
    assert!(matches!(primary, FetchOutcome::PermanentFailure { status: 403 }));

    let secondary = transport.fetch(&target, HeaderProfile::Secondary).await;
    assert!(secondary.into_ok_page().is_some());
}

#[tokio::test]
async fn test_page_exposes_headers() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/doc"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "application/pdf")
                .insert_header("last-modified", "Mon, 06 May 2024 07:08:09 GMT")
                .set_body_bytes(b"%PDF-1.4".to_vec()),
        )
        .mount(&server)
        .await;

    let transport = Transport::new(&test_tunables()).unwrap();
    let page = transport
        .fetch(&url(&server, "/doc"), HeaderProfile::Primary)
        .await
        .into_ok_page()
        .unwrap();

    assert_eq!(page.content_type(), "application/pdf");
    assert_eq!(page.last_modified(), Some("Mon, 06 May 2024 07:08:09 GMT"));
    assert_eq!(page.body, b"%PDF-1.4".to_vec());
}

#[tokio::test]
async fn test_concurrent_fetches_respect_per_host_limit() {
    let server = MockServer::start().await;
    let delay = Duration::from_millis(200);
    let log = ArrivalLog::new(ResponseTemplate::new(200).set_body_string("ok"), delay);

    Mock::given(method("GET"))
        .and(path_regex(r"^/slow/\d+$"))
        .respond_with(log.clone())
        .expect(8)
        .mount(&server)
        .await;

    let tunables = Tunables {
        per_host_concurrency: 2,
        ..test_tunables()
    };
    let transport = Transport::new(&tunables).unwrap();
    let urls: Vec<Url> = (0..8).map(|i| url(&server, &format!("/slow/{}", i))).collect();

    let started = Instant::now();
    let outcomes = join_all(
        urls.iter()
            .map(|u| transport.fetch(u, HeaderProfile::Primary)),
    )
    .await;
    let elapsed = started.elapsed();

    assert!(outcomes
        .iter()
        .all(|o| matches!(o, FetchOutcome::Content(page) if page.status == 200)));
    assert_eq!(peak_overlap(&log.arrivals(), delay.mul_f64(0.8)), 2);
    assert!(elapsed >= delay * 4, "8 requests, 2 at a time: {:?}", elapsed);
    assert_eq!(transport.throttle().known_origins(), 1);
}
