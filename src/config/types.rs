use serde::Deserialize;

/// Default number of candidate links kept per listing page
pub const DEFAULT_MAX_LINKS: usize = 12;

/// Raw registry file as written on disk
///
/// Every key of a source entry is optional; missing keys fall back to the
/// `[defaults]` table and then to the built-in defaults.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RegistryFile {
    #[serde(default)]
    pub defaults: SourceOverrides,
    #[serde(default)]
    pub sources: Vec<SourceOverrides>,
}

/// Per-source (or shared default) options before merging
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SourceOverrides {
    pub name: Option<String>,
    pub url: Option<String>,
    pub fallback_urls: Option<Vec<String>>,
    pub same_host_only: Option<bool>,
    pub allow_substr: Option<Vec<String>>,
    pub deny_substr: Option<Vec<String>>,
    pub max_links: Option<usize>,
    pub last_week_only: Option<bool>,
    pub pdf_chase: Option<bool>,
}

/// A fully merged source descriptor
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceConfig {
    /// Display name used in logs (defaults to the primary URL)
    pub name: String,

    /// Primary listing URL
    pub url: String,

    /// Listing URLs tried in order when the primary one fails
    pub fallback_urls: Vec<String>,

    /// Only keep candidate links on the listing page's host (default true)
    pub same_host_only: bool,

    /// Keep only candidates containing at least one of these substrings
    pub allow_substr: Vec<String>,

    /// Drop candidates containing any of these substrings
    pub deny_substr: Vec<String>,

    /// Maximum number of candidates per listing (default 12)
    pub max_links: usize,

    /// Skip articles that are undated or older than the age window (default true)
    pub last_week_only: bool,

    /// Follow the first linked PDF when the page body is too short (default true)
    pub pdf_chase: bool,
}

impl SourceConfig {
    /// Listing URLs in the order they should be tried: primary, then fallbacks
    pub fn listing_urls(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.url.as_str()).chain(self.fallback_urls.iter().map(String::as_str))
    }
}

/// The loaded source registry
#[derive(Debug, Clone, Default)]
pub struct Registry {
    pub sources: Vec<SourceConfig>,
}
