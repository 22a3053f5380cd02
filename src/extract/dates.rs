//! Publication date heuristics
//!
//! Each heuristic returns `None` when it finds nothing usable; the extractor
//! tries them in a fixed order and keeps the first hit.

use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use serde_json::Value;
use url::Url;

/// Where a publish date came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateSource {
    MetaTag,
    JsonLd,
    VisibleText,
    LastModified,
    UrlPath,
    PdfLastModified,
    FetchTime,
}

impl DateSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::MetaTag => "meta",
            Self::JsonLd => "json-ld",
            Self::VisibleText => "visible-text",
            Self::LastModified => "last-modified",
            Self::UrlPath => "url-path",
            Self::PdfLastModified => "pdf-last-modified",
            Self::FetchTime => "fetch-time",
        }
    }
}

/// Date-bearing elements, in priority order
const META_SELECTORS: [&str; 10] = [
    r#"meta[property="article:published_time"]"#,
    r#"meta[property="article:modified_time"]"#,
    r#"meta[property="og:updated_time"]"#,
    r#"meta[name="date"]"#,
    r#"meta[name="dcterms.date"]"#,
    r#"meta[name="publish_date"]"#,
    r#"meta[name="publication_date"]"#,
    r#"meta[itemprop="datePublished"]"#,
    r#"meta[itemprop="dateModified"]"#,
    "time[datetime]",
];

const JSON_LD_KEYS: [&str; 3] = ["datePublished", "dateModified", "uploadDate"];

const HEADING_TAGS: [&str; 3] = ["h1", "h2", "h3"];

/// Text nodes scanned after a heading
const TEXT_NODES_AFTER_HEADING: usize = 19;

const VISIBLE_DATE_SELECTOR: &str = r#"article [class*="date"], article [class*="published"], article [class*="time"], header [class*="date"], header [class*="published"], header [class*="time"]"#;

static HUMAN_DATE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)\b(january|february|march|april|may|june|july|august|september|october|november|december)\s+(\d{1,2}),\s+(\d{4})\b",
    )
    .expect("hardcoded regex pattern is valid")
});

static URL_PATH_DATE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"/(20\d{2})/([01]\d)(?:/([0-3]\d))?/").expect("hardcoded regex pattern is valid")
});

static URL_SLUG_DATE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(20\d{2})-([01]\d)-([0-3]\d)").expect("hardcoded regex pattern is valid")
});

/// Parses an ISO-8601-ish timestamp
///
/// Accepts full RFC 3339, a trailing `Z`, offsets without a colon, naive
/// date-times and bare dates. Values without an offset are taken as UTC.
///
/// # Examples
///
/// ```
/// use regwatch::extract::parse_isoish;
///
/// let dt = parse_isoish("2024-05-02T09:30:00+02:00").unwrap();
/// assert_eq!(dt.to_rfc3339(), "2024-05-02T07:30:00+00:00");
/// assert!(parse_isoish("2024-05-02").is_some());
/// assert!(parse_isoish("yesterday").is_none());
/// ```
pub fn parse_isoish(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.with_timezone(&Utc));
    }

    for format in ["%Y-%m-%dT%H:%M:%S%.f%z", "%Y-%m-%dT%H:%M%z"] {
        if let Ok(dt) = DateTime::parse_from_str(value, format) {
            return Some(dt.with_timezone(&Utc));
        }
    }

    for format in [
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y-%m-%dT%H:%M",
        "%Y-%m-%d %H:%M",
    ] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(value, format) {
            return Some(Utc.from_utc_datetime(&naive));
        }
    }

    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .and_then(midnight_utc)
}

/// Parses an HTTP `Last-Modified` value (RFC 2822 / IMF-fixdate)
pub fn parse_http_date(value: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc2822(value.trim())
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

/// Finds the first "Month DD, YYYY" phrase in a text
pub fn parse_human_date(text: &str) -> Option<DateTime<Utc>> {
    let caps = HUMAN_DATE.captures(text)?;
    let month = month_number(&caps[1])?;
    let day: u32 = caps[2].parse().ok()?;
    let year: i32 = caps[3].parse().ok()?;
    NaiveDate::from_ymd_opt(year, month, day).and_then(midnight_utc)
}

/// First parseable date among the structured metadata tags
pub fn date_from_meta(document: &Html) -> Option<DateTime<Utc>> {
    META_SELECTORS.iter().find_map(|selector| {
        let selector = Selector::parse(selector).ok()?;
        let element = document.select(&selector).next()?;
        let value = element
            .value()
            .attr("content")
            .or_else(|| element.value().attr("datetime"))?;
        parse_isoish(value)
    })
}

/// First parseable date in the page's JSON-LD blocks
///
/// A block may hold a single object, an array of objects, or an object with
/// an `@graph` array.
pub fn date_from_json_ld(document: &Html) -> Option<DateTime<Utc>> {
    let selector = Selector::parse(r#"script[type="application/ld+json"]"#).ok()?;

    document.select(&selector).find_map(|script| {
        let raw: String = script.text().collect();
        let data: Value = match serde_json::from_str(raw.trim()) {
            Ok(data) => data,
            Err(e) => {
                tracing::trace!("Ignoring malformed JSON-LD block: {}", e);
                return None;
            }
        };
        json_ld_nodes(&data).into_iter().find_map(date_from_json_ld_node)
    })
}

fn json_ld_nodes(data: &Value) -> Vec<&Value> {
    match data {
        Value::Array(items) => items.iter().flat_map(json_ld_nodes).collect(),
        Value::Object(map) => {
            let mut nodes = vec![data];
            if let Some(Value::Array(graph)) = map.get("@graph") {
                nodes.extend(graph.iter().filter(|n| n.is_object()));
            }
            nodes
        }
        _ => Vec::new(),
    }
}

fn date_from_json_ld_node(node: &Value) -> Option<DateTime<Utc>> {
    JSON_LD_KEYS.iter().find_map(|key| match node.get(*key)? {
        Value::String(s) => parse_isoish(s),
        other => parse_isoish(&other.to_string()),
    })
}

/// A "Month DD, YYYY" date shown near the top of the content
///
/// Date-classed elements of the article or header are tried first, then the
/// text nodes right after each `h1`-`h3` heading.
pub fn date_from_visible_text(document: &Html) -> Option<DateTime<Utc>> {
    let selector = Selector::parse(VISIBLE_DATE_SELECTOR).ok()?;
    document
        .select(&selector)
        .flat_map(|el: ElementRef<'_>| el.text())
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .find_map(parse_human_date)
        .or_else(|| date_after_headings(document))
}

fn date_after_headings(document: &Html) -> Option<DateTime<Utc>> {
    let nodes: Vec<_> = document.tree.root().descendants().collect();

    nodes.iter().enumerate().find_map(|(i, node)| {
        let heading = node.value().as_element()?;
        if !HEADING_TAGS.contains(&heading.name()) {
            return None;
        }

        // Pre-order: the heading's own subtree ends after `count` nodes
        let following = i + node.descendants().count();
        nodes[following..]
            .iter()
            .filter_map(|n| n.value().as_text())
            .take(TEXT_NODES_AFTER_HEADING)
            .map(|t| t.trim())
            .filter(|t| !t.is_empty())
            .find_map(parse_human_date)
    })
}

/// A date embedded in the URL: `/YYYY/MM[/DD]/` (day defaults to 15) or a `YYYY-MM-DD` slug
pub fn date_from_url_path(url: &Url) -> Option<DateTime<Utc>> {
    let text = url.as_str();

    if let Some(caps) = URL_PATH_DATE.captures(text) {
        let year: i32 = caps[1].parse().ok()?;
        let month: u32 = caps[2].parse().ok()?;
        let day: u32 = caps
            .get(3)
            .map(|d| d.as_str().parse::<u32>())
            .transpose()
            .ok()?
            .unwrap_or(15);
        return NaiveDate::from_ymd_opt(year, month, day).and_then(midnight_utc);
    }

    let caps = URL_SLUG_DATE.captures(text)?;
    NaiveDate::from_ymd_opt(
        caps[1].parse().ok()?,
        caps[2].parse().ok()?,
        caps[3].parse().ok()?,
    )
    .and_then(midnight_utc)
}

/// Document-level heuristics: meta tags, then JSON-LD, then visible text
pub fn date_from_document(document: &Html) -> Option<(DateTime<Utc>, DateSource)> {
    date_from_meta(document)
        .map(|dt| (dt, DateSource::MetaTag))
        .or_else(|| date_from_json_ld(document).map(|dt| (dt, DateSource::JsonLd)))
        .or_else(|| date_from_visible_text(document).map(|dt| (dt, DateSource::VisibleText)))
}

fn midnight_utc(date: NaiveDate) -> Option<DateTime<Utc>> {
    date.and_hms_opt(0, 0, 0)
        .map(|naive| Utc.from_utc_datetime(&naive))
}

fn month_number(name: &str) -> Option<u32> {
    const MONTHS: [&str; 12] = [
        "january", "february", "march", "april", "may", "june", "july", "august", "september",
        "october", "november", "december",
    ];
    let name = name.to_lowercase();
    MONTHS
        .iter()
        .position(|m| *m == name)
        .map(|i| i as u32 + 1)
}
