use url::Url;

/// Returns the origin key (scheme, host and port) used for per-host throttling
///
/// # Examples
///
/// ```
/// use url::Url;
/// use regwatch::url::origin_key;
///
/// let a = Url::parse("https://example.com/a").unwrap();
/// let b = Url::parse("https://example.com:443/b?x=1").unwrap();
/// assert_eq!(origin_key(&a), origin_key(&b));
/// ```
pub fn origin_key(url: &Url) -> String {
    url.origin().ascii_serialization()
}

/// True when both URLs share host and port
pub fn same_host(a: &Url, b: &Url) -> bool {
    a.host_str().map(str::to_lowercase) == b.host_str().map(str::to_lowercase)
        && a.port_or_known_default() == b.port_or_known_default()
}
