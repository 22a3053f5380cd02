//! Listing discovery and candidate link extraction
//!
//! A source's listing page is located by walking an ordered plan of
//! attempts (primary URL, fallbacks, header and AMP escalations). The winning
//! page is then reduced to a short, conservative list of candidate article
//! URLs.

use crate::config::SourceConfig;
use crate::crawler::fetcher::{FetchOutcome, HeaderProfile, Transport};
use crate::url::{dedupe_preserving_order, normalize_url, resolve_href, same_host};
use scraper::{Html, Selector};
use thiserror::Error;
use url::Url;

/// Path segments of the non-English language editions published by EU bodies
pub const NON_ENGLISH_SEGMENTS: [&str; 23] = [
    "/fr/", "/de/", "/es/", "/it/", "/pt/", "/bg/", "/pl/", "/ru/", "/nl/", "/cs/", "/da/", "/fi/",
    "/sv/", "/ro/", "/sk/", "/sl/", "/lt/", "/lv/", "/et/", "/el/", "/hu/", "/ga/", "/mt/",
];

/// Error pages never worth fetching (non-English segments are denied as well)
pub const ALWAYS_DENIED: [&str; 2] = ["/page-not-found", "/404"];

/// Landing pages that list articles rather than being one
pub const NAVIGATION_SUFFIXES: [&str; 6] =
    ["/en", "/news", "/policies", "/about", "/contact", "/events"];

/// Listing discovery failures
#[derive(Debug, Error)]
pub enum ListingError {
    #[error("no listing URL configured for {0}")]
    NoUrls(String),

    #[error("listing failed for {source_name}: {last}")]
    Exhausted { source_name: String, last: String },
}

/// The listing page that won discovery
#[derive(Debug, Clone)]
pub struct ListingPage {
    /// The attempted URL, used as the base for relative links
    pub base_url: Url,

    /// Page body
    pub html: String,

    /// Profile that obtained it
    pub profile: HeaderProfile,
}

/// One step of the discovery plan
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListingAttempt {
    pub url: Url,
    pub profile: HeaderProfile,

    /// Only tried when the primary attempt on the same listing URL got a 403
    pub escalation: bool,
}

/// Builds AMP variants of a listing URL, omitting any already present
///
/// # Examples
///
/// ```
/// use regwatch::crawler::amp_variants;
///
/// assert_eq!(
///     amp_variants("https://example.com/news/"),
///     vec![
///         "https://example.com/news/amp",
///         "https://example.com/news/?amp",
///         "https://example.com/news/?output=amp",
///     ]
/// );
/// ```
pub fn amp_variants(url: &str) -> Vec<String> {
    let mut variants = Vec::new();
    let joiner = if url.contains('?') { '&' } else { '?' };

    let (path, query) = match url.split_once('?') {
        Some((path, query)) => (path, Some(query)),
        None => (url, None),
    };
    let path = path.trim_end_matches('/');
    if !path.ends_with("/amp") {
        variants.push(match query {
            Some(query) => format!("{}/amp?{}", path, query),
            None => format!("{}/amp", path),
        });
    }
    if !url.contains("?amp") && !url.contains("&amp") {
        variants.push(format!("{}{}amp", url, joiner));
    }
    if !url.contains("output=amp") {
        variants.push(format!("{}{}output=amp", url, joiner));
    }

    variants
}

/// Expands a source into its ordered discovery plan
///
/// Per listing URL (primary first, then each fallback): the URL with the
/// primary profile, then as escalations the URL with the secondary profile
/// and each AMP variant with the secondary profile. Unparseable URLs are
/// logged and left out.
pub fn listing_plan(source: &SourceConfig) -> Vec<ListingAttempt> {
    let mut plan = Vec::new();

    for raw in source.listing_urls() {
        let url = match normalize_url(raw) {
            Ok(url) => url,
            Err(e) => {
                tracing::warn!("Skipping listing URL {} for {}: {}", raw, source.name, e);
                continue;
            }
        };

        plan.push(ListingAttempt {
            url: url.clone(),
            profile: HeaderProfile::Primary,
            escalation: false,
        });
        plan.push(ListingAttempt {
            url: url.clone(),
            profile: HeaderProfile::Secondary,
            escalation: true,
        });
        plan.extend(
            amp_variants(url.as_str())
                .iter()
                .filter_map(|v| Url::parse(v).ok())
                .map(|url| ListingAttempt {
                    url,
                    profile: HeaderProfile::Secondary,
                    escalation: true,
                }),
        );
    }

    plan
}

/// Finds the first listing URL answering 200
pub async fn discover_listing(
    transport: &Transport,
    source: &SourceConfig,
) -> Result<ListingPage, ListingError> {
    let plan = listing_plan(source);
    if plan.is_empty() {
        return Err(ListingError::NoUrls(source.name.clone()));
    }

    let mut forbidden = false;
    let mut last = String::from("not attempted");

    for attempt in plan {
        if attempt.escalation && !forbidden {
            continue;
        }

        let outcome = transport.fetch(&attempt.url, attempt.profile).await;
        if !attempt.escalation {
            forbidden = matches!(outcome, FetchOutcome::PermanentFailure { status: 403 });
        }

        last = format!("{} -> {}", attempt.url, outcome.describe());

        match outcome.into_ok_page() {
            Some(page) => {
                tracing::debug!(
                    "Listing for {} found at {} ({:?})",
                    source.name,
                    attempt.url,
                    attempt.profile
                );
                return Ok(ListingPage {
                    base_url: attempt.url,
                    html: page.text(),
                    profile: attempt.profile,
                });
            }
            None => tracing::warn!("Listing attempt {} for {}", last, source.name),
        }
    }

    Err(ListingError::Exhausted {
        source_name: source.name.clone(),
        last,
    })
}

/// Reduces a listing page to candidate article URLs
///
/// Anchors nested in `<article>` come first, then every anchor, in document
/// order. After resolution and deduplication the filters run in order:
///
/// 1. same host as `base` (when `same_host_only`)
/// 2. no non-English path segment
/// 3. at least one allow substring (when any are configured)
/// 4. no deny substring (configured plus built-in)
/// 5. not a navigational landing page
///
/// The survivors are truncated to `max_links`.
pub fn extract_candidates(html: &str, base: &Url, source: &SourceConfig) -> Vec<Url> {
    let links = collect_anchors(html, base);

    let deny: Vec<&str> = source
        .deny_substr
        .iter()
        .map(String::as_str)
        .chain(ALWAYS_DENIED)
        .chain(NON_ENGLISH_SEGMENTS)
        .collect();

    links
        .into_iter()
        .filter(|url| !source.same_host_only || same_host(url, base))
        .filter(|url| !is_non_english_url(url))
        .filter(|url| {
            source.allow_substr.is_empty()
                || source.allow_substr.iter().any(|a| url.as_str().contains(a.as_str()))
        })
        .filter(|url| !deny.iter().any(|d| url.as_str().contains(d)))
        .filter(|url| !is_navigation_page(url))
        .take(source.max_links)
        .collect()
}

/// Resolved, deduplicated anchor targets, article anchors first
fn collect_anchors(html: &str, base: &Url) -> Vec<Url> {
    let document = Html::parse_document(html);
    let mut links = Vec::new();

    for selector in ["article a[href]", "a[href]"] {
        let Ok(selector) = Selector::parse(selector) else {
            continue;
        };
        links.extend(
            document
                .select(&selector)
                .filter_map(|a| a.value().attr("href"))
                .filter_map(|href| resolve_href(href, base)),
        );
    }

    dedupe_preserving_order(links)
}

/// True when the URL contains a known non-English path segment
pub fn is_non_english_url(url: &Url) -> bool {
    let lower = url.as_str().to_lowercase();
    NON_ENGLISH_SEGMENTS.iter().any(|seg| lower.contains(seg))
}

fn is_navigation_page(url: &Url) -> bool {
    let trimmed = url.as_str().trim_end_matches('/');
    NAVIGATION_SUFFIXES.iter().any(|s| trimmed.ends_with(s))
}
