//! Article extraction
//!
//! Turns a candidate URL into a clean, dated [`ArticleRecord`] or an explicit
//! skip/failure. The steps short-circuit in order:
//!
//! 1. fetch the page (non-200 fails)
//! 2. language gate on the declared document language
//! 3. publish date inference (metadata, JSON-LD, visible text, Last-Modified, URL)
//! 4. recency gate
//! 5. main-content extraction with a whole-page fallback
//! 6. PDF fallback for short pages, then the minimum-length gate
//! 7. title resolution

mod dates;
mod metadata;
mod pdf;
mod readability;

pub use dates::{
    date_from_document, date_from_json_ld, date_from_meta, date_from_url_path,
    date_from_visible_text, parse_http_date, parse_human_date, parse_isoish, DateSource,
};
pub use metadata::{declared_language, is_english, page_title, title_from_text};
pub use pdf::{
    extract_pdf_text, find_first_pdf_link, is_pdf_content_type, PdfExtractText, PdfTextExtractor,
};
pub use readability::{extract_main_text, visible_text};

use crate::config::{SourceConfig, Tunables};
use crate::crawler::{FetchOutcome, FetchedPage, HeaderProfile, Transport};
use crate::url::is_evergreen_host;
use chrono::{DateTime, Duration, Utc};
use scraper::Html;
use sha2::{Digest, Sha256};
use std::fmt;
use std::sync::Arc;
use thiserror::Error;
use url::Url;

/// Hex SHA-256 of an article URL, used as its content fingerprint
///
/// # Examples
///
/// ```
/// use regwatch::extract::fingerprint;
///
/// let a = fingerprint("https://example.com/a");
/// assert_eq!(a.len(), 64);
/// assert_eq!(a, fingerprint("https://example.com/a"));
/// assert_ne!(a, fingerprint("https://example.com/b"));
/// ```
pub fn fingerprint(url: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(url.as_bytes());
    hex::encode(hasher.finalize())
}

/// True when `published_at` falls inside the age window ending at `now`
///
/// A window reaching past the representable range accepts every date.
pub fn is_recent(published_at: DateTime<Utc>, now: DateTime<Utc>, max_age_days: i64) -> bool {
    Duration::try_days(max_age_days)
        .and_then(|window| now.checked_sub_signed(window))
        .map_or(true, |cutoff| published_at >= cutoff)
}

/// An extracted article ready for persistence
#[derive(Debug, Clone, PartialEq)]
pub struct ArticleRecord {
    pub url: String,
    pub title: String,
    pub text: String,
    pub published_at: DateTime<Utc>,
    pub date_source: DateSource,
    pub fingerprint: String,
}

impl ArticleRecord {
    pub fn new(
        url: impl Into<String>,
        title: impl Into<String>,
        text: impl Into<String>,
        published_at: DateTime<Utc>,
        date_source: DateSource,
    ) -> Self {
        let url = url.into();
        Self {
            fingerprint: fingerprint(&url),
            url,
            title: title.into(),
            text: text.into(),
            published_at,
            date_source,
        }
    }

    /// Body length in characters
    pub fn text_chars(&self) -> usize {
        self.text.chars().count()
    }
}

/// Why a fetched page was not kept
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    /// The document declares a non-English language
    NonEnglish { lang: String },
    /// Undated or older than the age window
    Stale,
    /// Body (plus any PDF text) below the minimum length
    TooShort { chars: usize },
}

impl SkipReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NonEnglish { .. } => "non-english",
            Self::Stale => "stale",
            Self::TooShort { .. } => "too-short",
        }
    }
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NonEnglish { lang } => write!(f, "non-English page (lang={})", lang),
            Self::Stale => write!(f, "old or undated"),
            Self::TooShort { chars } => write!(f, "too short ({} chars)", chars),
        }
    }
}

/// Extraction failures
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ExtractError {
    #[error("HTTP {0}")]
    Http(u16),

    #[error("fetch failed: {0}")]
    Transient(String),

    #[error("PDF text extraction failed: {0}")]
    Pdf(String),
}

/// Result of extracting one candidate
#[derive(Debug, Clone, PartialEq)]
pub enum ArticleOutcome {
    Ready(ArticleRecord),
    Skipped(SkipReason),
    Failed(ExtractError),
}

/// Thresholds the extractor applies
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractSettings {
    pub min_text_length: usize,
    pub max_age_days: i64,
    pub evergreen_domains: Vec<String>,
}

impl From<&Tunables> for ExtractSettings {
    fn from(tunables: &Tunables) -> Self {
        Self {
            min_text_length: tunables.min_text_length,
            max_age_days: tunables.max_age_days,
            evergreen_domains: tunables.evergreen_domains.clone(),
        }
    }
}

impl Default for ExtractSettings {
    fn default() -> Self {
        Self::from(&Tunables::default())
    }
}

/// Everything learned from the HTML before any further network traffic
#[derive(Debug)]
struct PageAnalysis {
    published_at: DateTime<Utc>,
    date_source: DateSource,
    date_resolved: bool,
    evergreen: bool,
    title: Option<String>,
    text: String,
    pdf_link: Option<Url>,
}

/// Fetches and extracts candidate articles
pub struct Extractor {
    transport: Arc<Transport>,
    settings: ExtractSettings,
    pdf: Arc<dyn PdfTextExtractor>,
}

impl Extractor {
    pub fn new(transport: Arc<Transport>, settings: ExtractSettings) -> Self {
        Self {
            transport,
            settings,
            pdf: Arc::new(PdfExtractText),
        }
    }

    /// Replaces the PDF text backend
    pub fn with_pdf_extractor(mut self, pdf: Arc<dyn PdfTextExtractor>) -> Self {
        self.pdf = pdf;
        self
    }

    pub fn settings(&self) -> &ExtractSettings {
        &self.settings
    }

    /// Extracts one candidate article
    pub async fn extract(&self, url: &Url, source: &SourceConfig) -> ArticleOutcome {
        let page = match self.transport.fetch(url, HeaderProfile::Primary).await {
            FetchOutcome::Content(page) if page.status == 200 => page,
            FetchOutcome::Content(page) => {
                return ArticleOutcome::Failed(ExtractError::Http(page.status))
            }
            FetchOutcome::PermanentFailure { status } => {
                return ArticleOutcome::Failed(ExtractError::Http(status))
            }
            FetchOutcome::TransientFailure { reason } => {
                return ArticleOutcome::Failed(ExtractError::Transient(reason))
            }
        };
        let fetched_at = Utc::now();

        let mut analysis = match self.analyze_page(url, &page, source, fetched_at) {
            Ok(analysis) => analysis,
            Err(reason) => return ArticleOutcome::Skipped(reason),
        };

        if let Some(pdf_url) = analysis.pdf_link.take() {
            self.chase_pdf(&pdf_url, &mut analysis).await;
        }

        let chars = analysis.text.chars().count();
        if chars < self.settings.min_text_length {
            return ArticleOutcome::Skipped(SkipReason::TooShort { chars });
        }

        let title = analysis
            .title
            .take()
            .unwrap_or_else(|| title_from_text(&analysis.text));

        ArticleOutcome::Ready(ArticleRecord::new(
            url.as_str(),
            title,
            analysis.text,
            analysis.published_at,
            analysis.date_source,
        ))
    }

    /// Runs every HTML-only step; the parsed document never outlives this call
    fn analyze_page(
        &self,
        url: &Url,
        page: &FetchedPage,
        source: &SourceConfig,
        fetched_at: DateTime<Utc>,
    ) -> Result<PageAnalysis, SkipReason> {
        let html = page.text();
        let document = Html::parse_document(&html);

        let lang = declared_language(&document);
        if !is_english(lang.as_deref()) {
            return Err(SkipReason::NonEnglish {
                lang: lang.unwrap_or_default(),
            });
        }

        let evergreen = url
            .host_str()
            .is_some_and(|host| is_evergreen_host(host, &self.settings.evergreen_domains));

        let inferred = date_from_document(&document)
            .or_else(|| {
                if evergreen {
                    return None;
                }
                page.last_modified()
                    .and_then(parse_http_date)
                    .map(|dt| (dt, DateSource::LastModified))
            })
            .or_else(|| date_from_url_path(url).map(|dt| (dt, DateSource::UrlPath)));
        let date_resolved = inferred.is_some();

        // Undated evergreen pages take the fetch time
        let resolved =
            inferred.or_else(|| evergreen.then_some((fetched_at, DateSource::FetchTime)));

        if source.last_week_only {
            match resolved {
                Some((dt, _)) if is_recent(dt, fetched_at, self.settings.max_age_days) => {}
                _ => return Err(SkipReason::Stale),
            }
        }
        let (published_at, date_source) =
            resolved.unwrap_or((fetched_at, DateSource::FetchTime));

        let text = extract_main_text(&html).unwrap_or_else(|| visible_text(&document));

        let pdf_link = if source.pdf_chase && text.chars().count() < self.settings.min_text_length
        {
            find_first_pdf_link(&document, url)
        } else {
            None
        };

        Ok(PageAnalysis {
            published_at,
            date_source,
            date_resolved,
            evergreen,
            title: page_title(&document),
            text,
            pdf_link,
        })
    }

    /// Appends the linked PDF's text; failures leave the analysis untouched
    async fn chase_pdf(&self, pdf_url: &Url, analysis: &mut PageAnalysis) {
        let outcome = self.transport.fetch(pdf_url, HeaderProfile::Primary).await;
        let pdf = match outcome.into_ok_page() {
            Some(pdf) if is_pdf_content_type(pdf.content_type()) => pdf,
            Some(pdf) => {
                tracing::debug!("Linked {} is not a PDF ({})", pdf_url, pdf.content_type());
                return;
            }
            None => {
                tracing::debug!("Linked PDF {} unavailable", pdf_url);
                return;
            }
        };

        let last_modified = pdf.last_modified().and_then(parse_http_date);
        let text = match extract_pdf_text(self.pdf.clone(), pdf.body).await {
            Ok(text) => text,
            Err(e) => {
                tracing::warn!("PDF extract failed {}: {}", pdf_url, e);
                return;
            }
        };
        if text.is_empty() {
            return;
        }

        tracing::debug!("Appending {} chars from {}", text.chars().count(), pdf_url);
        analysis.text = if analysis.text.is_empty() {
            text
        } else {
            format!("{}\n\n{}", analysis.text, text)
        };

        if !analysis.date_resolved && !analysis.evergreen {
            if let Some(dt) = last_modified {
                analysis.published_at = dt;
                analysis.date_source = DateSource::PdfLastModified;
            }
        }
    }
}
