/// Checks if a host matches a wildcard pattern
///
/// Two kinds of patterns are supported:
/// 1. Exact match: "iso.org" matches only "iso.org"
/// 2. Wildcard match: "*.iso.org" matches "iso.org" and any subdomain of it
///
/// Both arguments are expected in lowercase.
///
/// # Examples
///
/// ```
/// use regwatch::url::matches_wildcard;
///
/// assert!(matches_wildcard("iso.org", "iso.org"));
/// assert!(!matches_wildcard("iso.org", "www.iso.org"));
/// assert!(matches_wildcard("*.iso.org", "www.iso.org"));
/// assert!(!matches_wildcard("*.iso.org", "notiso.org"));
/// ```
pub fn matches_wildcard(pattern: &str, candidate: &str) -> bool {
    match pattern.strip_prefix("*.") {
        Some(base) => candidate == base || candidate.ends_with(&format!(".{}", base)),
        None => candidate == pattern,
    }
}

/// True when the host matches any of the evergreen patterns
///
/// Evergreen hosts report modification times that do not date their content,
/// so header-based date inference is disabled for them.
pub fn is_evergreen_host(host: &str, patterns: &[String]) -> bool {
    let host = host.to_lowercase();
    patterns.iter().any(|p| matches_wildcard(p, &host))
}
