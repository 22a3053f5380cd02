use crate::UrlError;
use std::collections::HashSet;
use url::Url;

/// Parses an absolute http(s) URL and strips its fragment
///
/// Candidate links keep their host, path and query exactly as published;
/// only the fragment is removed, so two anchors pointing at different
/// sections of one page collapse to the same candidate.
///
/// # Examples
///
/// ```
/// use regwatch::url::normalize_url;
///
/// let url = normalize_url("https://example.com/notice?id=4#annex").unwrap();
/// assert_eq!(url.as_str(), "https://example.com/notice?id=4");
/// ```
pub fn normalize_url(url_str: &str) -> Result<Url, UrlError> {
    let mut url = Url::parse(url_str.trim()).map_err(|e| UrlError::Parse(e.to_string()))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(UrlError::InvalidScheme(format!(
            "Only HTTP and HTTPS schemes are supported, got: {}",
            url.scheme()
        )));
    }

    if url.host_str().is_none() {
        return Err(UrlError::MissingDomain);
    }

    url.set_fragment(None);
    Ok(url)
}

/// Resolves an anchor href against the page it was found on
///
/// Returns None if the link should be excluded:
/// - empty or fragment-only hrefs
/// - javascript:, mailto:, tel: and data: links
/// - anything that does not resolve to an http(s) URL
pub fn resolve_href(href: &str, base_url: &Url) -> Option<Url> {
    let href = href.trim();

    if href.is_empty() || href.starts_with('#') {
        return None;
    }

    let lower = href.to_ascii_lowercase();
    if ["javascript:", "mailto:", "tel:", "data:"]
        .iter()
        .any(|scheme| lower.starts_with(scheme))
    {
        return None;
    }

    let mut absolute = base_url.join(href).ok()?;
    if absolute.scheme() != "http" && absolute.scheme() != "https" {
        return None;
    }

    absolute.set_fragment(None);
    Some(absolute)
}

/// Removes exact duplicates, keeping the first occurrence's position
pub fn dedupe_preserving_order(urls: impl IntoIterator<Item = Url>) -> Vec<Url> {
    let mut seen = HashSet::new();
    urls.into_iter()
        .filter(|url| seen.insert(url.as_str().to_string()))
        .collect()
}
