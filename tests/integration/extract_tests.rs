//! Article extraction against mock article pages

use crate::common::{article_html, days_ago, test_source, test_tunables, FailingPdf, StubPdf};
use chrono::{DateTime, Utc};
use regwatch::config::Tunables;
use regwatch::crawler::Transport;
use regwatch::extract::{
    ArticleOutcome, ArticleRecord, DateSource, ExtractError, ExtractSettings, Extractor,
    SkipReason,
};
use std::sync::Arc;
use url::Url;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn extractor(tunables: &Tunables) -> Extractor {
    let transport = Arc::new(Transport::new(tunables).unwrap());
    Extractor::new(transport, ExtractSettings::from(tunables))
}

async fn serve(server: &MockServer, p: &str, response: ResponseTemplate) -> Url {
    Mock::given(method("GET"))
        .and(path(p))
        .respond_with(response)
        .mount(server)
        .await;
    Url::parse(&format!("{}{}", server.uri(), p)).unwrap()
}

fn html(body: String) -> ResponseTemplate {
    ResponseTemplate::new(200)
        .insert_header("content-type", "text/html; charset=utf-8")
        .set_body_string(body)
}

fn http_date(dt: DateTime<Utc>) -> String {
    dt.format("%a, %d %b %Y %H:%M:%S GMT").to_string()
}

/// A one-paragraph page linking to `/docs/paper.pdf`
fn short_page_with_pdf(published: Option<DateTime<Utc>>) -> String {
    article_html("Consultation paper", published, 1).replace(
        "</article>",
        "<a href=\"/docs/paper.pdf\">Download the paper</a></article>",
    )
}

fn pdf_response() -> ResponseTemplate {
    ResponseTemplate::new(200)
        .insert_header("content-type", "application/pdf")
        .set_body_bytes(b"%PDF-1.7 stub".to_vec())
}

fn ready(outcome: ArticleOutcome) -> ArticleRecord {
    match outcome {
        ArticleOutcome::Ready(record) => record,
        other => panic!("expected a record, got {:?}", other),
    }
}

#[tokio::test]
async fn test_recent_dated_article_is_ready() {
    let server = MockServer::start().await;
    let published = days_ago(2);
    let url = serve(
        &server,
        "/news/statement",
        html(article_html("Supervisory statement", Some(published), 8)),
    )
    .await;

    let source = test_source("reg", &format!("{}/news", server.uri()));
    let record = ready(extractor(&test_tunables()).extract(&url, &source).await);

    assert_eq!(record.title, "Supervisory statement");
    assert_eq!(record.date_source, DateSource::MetaTag);
    assert_eq!(record.published_at.timestamp(), published.timestamp());
    assert!(record.text_chars() >= 600);
    assert!(record.text.contains("Paragraph 8 of the supervisory statement"));
    assert!(!record.text.contains("Home"));
    assert_eq!(record.url, url.as_str());
}

#[tokio::test]
async fn test_old_article_is_stale() {
    let server = MockServer::start().await;
    let url = serve(
        &server,
        "/news/old",
        html(article_html("Old statement", Some(days_ago(30)), 8)),
    )
    .await;

    let source = test_source("reg", &format!("{}/news", server.uri()));
    let outcome = extractor(&test_tunables()).extract(&url, &source).await;
    assert_eq!(outcome, ArticleOutcome::Skipped(SkipReason::Stale));
}

#[tokio::test]
async fn test_old_article_kept_when_recency_disabled() {
    let server = MockServer::start().await;
    let published = days_ago(30);
    let url = serve(
        &server,
        "/news/archive-item",
        html(article_html("Archived statement", Some(published), 8)),
    )
    .await;

    let mut source = test_source("reg", &format!("{}/news", server.uri()));
    source.last_week_only = false;

    let record = ready(extractor(&test_tunables()).extract(&url, &source).await);
    assert_eq!(record.published_at.timestamp(), published.timestamp());
}

#[tokio::test]
async fn test_non_english_page_is_skipped() {
    let server = MockServer::start().await;
    let body = article_html("Communiqué", Some(days_ago(1)), 8).replace("lang=\"en\"", "lang=\"fr\"");
    let url = serve(&server, "/news/communique", html(body)).await;

    let source = test_source("reg", &format!("{}/news", server.uri()));
    let outcome = extractor(&test_tunables()).extract(&url, &source).await;
    assert_eq!(
        outcome,
        ArticleOutcome::Skipped(SkipReason::NonEnglish { lang: "fr".into() })
    );
}

#[tokio::test]
async fn test_undated_evergreen_page_uses_fetch_time() {
    let server = MockServer::start().await;
    let url = serve(
        &server,
        "/standard/12345",
        html(article_html("Information security management", None, 8)).insert_header(
            "last-modified",
            http_date(days_ago(400)).as_str(),
        ),
    )
    .await;

    let tunables = Tunables {
        evergreen_domains: vec!["127.0.0.1".to_string()],
        ..test_tunables()
    };
    let source = test_source("standards", &format!("{}/standards", server.uri()));

    let before = Utc::now();
    let record = ready(extractor(&tunables).extract(&url, &source).await);
    let after = Utc::now();

    assert_eq!(record.date_source, DateSource::FetchTime);
    assert!(record.published_at >= before && record.published_at <= after);
}

#[tokio::test]
async fn test_undated_page_elsewhere_is_stale() {
    let server = MockServer::start().await;
    let url = serve(
        &server,
        "/news/undated",
        html(article_html("Undated notice", None, 8)),
    )
    .await;

    let source = test_source("reg", &format!("{}/news", server.uri()));
    let outcome = extractor(&test_tunables()).extract(&url, &source).await;
    assert_eq!(outcome, ArticleOutcome::Skipped(SkipReason::Stale));
}

#[tokio::test]
async fn test_last_modified_dates_undated_page() {
    let server = MockServer::start().await;
    let modified = days_ago(1);
    let url = serve(
        &server,
        "/news/modified",
        html(article_html("Updated guidance", None, 8))
            .insert_header("last-modified", http_date(modified).as_str()),
    )
    .await;

    let source = test_source("reg", &format!("{}/news", server.uri()));
    let record = ready(extractor(&test_tunables()).extract(&url, &source).await);

    assert_eq!(record.date_source, DateSource::LastModified);
    assert_eq!(record.published_at.timestamp(), modified.timestamp());
}

#[tokio::test]
async fn test_short_page_appends_linked_pdf() {
    let server = MockServer::start().await;

    let landing = article_html("Consultation paper", Some(days_ago(1)), 1).replace(
        "</article>",
        "<a href=\"/docs/consultation.pdf\">Download the paper</a></article>",
    );
    let url = serve(&server, "/news/consultation", html(landing)).await;

    Mock::given(method("GET"))
        .and(path("/docs/consultation.pdf"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "application/pdf")
                .set_body_bytes(b"%PDF-1.7 stub".to_vec()),
        )
        .expect(1)
        .mount(&server)
        .await;

    let pdf_text = "The consultation proposes amendments. ".repeat(80);
    let tunables = test_tunables();
    let extractor = extractor(&tunables).with_pdf_extractor(Arc::new(StubPdf(pdf_text)));

    let source = test_source("reg", &format!("{}/news", server.uri()));
    let record = ready(extractor.extract(&url, &source).await);

    assert!(record.text.contains("Paragraph 1 of the supervisory statement"));
    assert!(record.text.contains("The consultation proposes amendments."));
    assert!(record.text_chars() > 3000);
    assert_eq!(record.date_source, DateSource::MetaTag);
}

#[tokio::test]
async fn test_pdf_last_modified_dates_undated_page() {
    let server = MockServer::start().await;
    let url = serve(&server, "/news/landing", html(short_page_with_pdf(None))).await;
    let modified = days_ago(90);
    serve(
        &server,
        "/docs/paper.pdf",
        pdf_response().insert_header("last-modified", http_date(modified).as_str()),
    )
    .await;

    let pdf_text = "The paper sets out the proposed reporting templates. ".repeat(40);
    let tunables = test_tunables();
    let extractor = extractor(&tunables).with_pdf_extractor(Arc::new(StubPdf(pdf_text)));

    let mut source = test_source("reg", &format!("{}/news", server.uri()));
    source.last_week_only = false;
    let record = ready(extractor.extract(&url, &source).await);

    assert_eq!(record.date_source, DateSource::PdfLastModified);
    assert_eq!(record.published_at.timestamp(), modified.timestamp());
    assert!(record.text.contains("proposed reporting templates"));
}

#[tokio::test]
async fn test_failed_pdf_extraction_leaves_page_text() {
    let server = MockServer::start().await;
    let url = serve(
        &server,
        "/news/landing",
        html(short_page_with_pdf(Some(days_ago(1)))),
    )
    .await;
    serve(&server, "/docs/paper.pdf", pdf_response()).await;

    let mut source = test_source("reg", &format!("{}/news", server.uri()));
    let tunables = test_tunables();

    source.pdf_chase = false;
    let page_only = extractor(&tunables).extract(&url, &source).await;
    let ArticleOutcome::Skipped(SkipReason::TooShort { chars: page_chars }) = page_only else {
        panic!("expected too-short skip, got {:?}", page_only);
    };

    source.pdf_chase = true;
    let extractor = extractor(&tunables).with_pdf_extractor(Arc::new(FailingPdf));
    let outcome = extractor.extract(&url, &source).await;

    assert_eq!(
        outcome,
        ArticleOutcome::Skipped(SkipReason::TooShort { chars: page_chars })
    );
    assert_eq!(server.received_requests().await.unwrap().len(), 3);
}

#[tokio::test]
async fn test_short_page_without_pdf_is_too_short() {
    let server = MockServer::start().await;
    let url = serve(
        &server,
        "/news/brief",
        html(article_html("Brief notice", Some(days_ago(1)), 1)),
    )
    .await;

    let source = test_source("reg", &format!("{}/news", server.uri()));
    match extractor(&test_tunables()).extract(&url, &source).await {
        ArticleOutcome::Skipped(SkipReason::TooShort { chars }) => assert!(chars < 600),
        other => panic!("expected too-short skip, got {:?}", other),
    }
}

#[tokio::test]
async fn test_missing_article_fails_with_status() {
    let server = MockServer::start().await;
    let url = serve(&server, "/news/missing", ResponseTemplate::new(404)).await;

    let source = test_source("reg", &format!("{}/news", server.uri()));
    let outcome = extractor(&test_tunables()).extract(&url, &source).await;
    assert_eq!(outcome, ArticleOutcome::Failed(ExtractError::Http(404)));
}
