use crate::config::types::{Registry, SourceConfig};
use crate::ConfigError;
use url::Url;

/// Validates the entire registry
pub fn validate(registry: &Registry) -> Result<(), ConfigError> {
    for source in &registry.sources {
        validate_source(source)?;
    }
    Ok(())
}

/// Validates a single merged source
fn validate_source(source: &SourceConfig) -> Result<(), ConfigError> {
    if source.name.trim().is_empty() {
        return Err(ConfigError::Validation(format!(
            "source for {} has an empty name",
            source.url
        )));
    }

    for listing in source.listing_urls() {
        validate_listing_url(&source.name, listing)?;
    }

    if source.max_links < 1 {
        return Err(ConfigError::Validation(format!(
            "max_links for '{}' must be >= 1, got {}",
            source.name, source.max_links
        )));
    }

    if source.allow_substr.iter().any(|s| s.is_empty()) {
        return Err(ConfigError::Validation(format!(
            "allow_substr for '{}' contains an empty string",
            source.name
        )));
    }

    if source.deny_substr.iter().any(|s| s.is_empty()) {
        return Err(ConfigError::Validation(format!(
            "deny_substr for '{}' contains an empty string",
            source.name
        )));
    }

    Ok(())
}

/// Listing URLs must be absolute http(s) URLs with a host
fn validate_listing_url(name: &str, raw: &str) -> Result<(), ConfigError> {
    let url = Url::parse(raw)
        .map_err(|e| ConfigError::InvalidUrl(format!("'{}' in source '{}': {}", raw, name, e)))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(ConfigError::InvalidUrl(format!(
            "'{}' in source '{}' must use http or https",
            raw, name
        )));
    }

    if url.host_str().is_none() {
        return Err(ConfigError::InvalidUrl(format!(
            "'{}' in source '{}' has no host",
            raw, name
        )));
    }

    Ok(())
}
