use crate::config::types::{
    Registry, RegistryFile, SourceConfig, SourceOverrides, DEFAULT_MAX_LINKS,
};
use crate::config::validation::validate;
use crate::ConfigError;
use sha2::{Digest, Sha256};
use std::path::Path;

/// Merges one source entry over the shared defaults
///
/// A key set on the source wins; otherwise the `[defaults]` value is used;
/// otherwise the built-in default. Lists replace rather than extend.
///
/// # Returns
///
/// * `Ok(SourceConfig)` - The merged source
/// * `Err(ConfigError)` - Neither the source nor the defaults provide a URL
pub fn merge_source(
    defaults: &SourceOverrides,
    source: &SourceOverrides,
) -> Result<SourceConfig, ConfigError> {
    let url = source
        .url
        .clone()
        .or_else(|| defaults.url.clone())
        .ok_or_else(|| {
            ConfigError::Validation(format!(
                "source {:?} has no url",
                source.name.as_deref().unwrap_or("<unnamed>")
            ))
        })?;

    let name = source
        .name
        .clone()
        .or_else(|| defaults.name.clone())
        .unwrap_or_else(|| url.clone());

    Ok(SourceConfig {
        name,
        url,
        fallback_urls: pick(&source.fallback_urls, &defaults.fallback_urls).unwrap_or_default(),
        same_host_only: pick(&source.same_host_only, &defaults.same_host_only).unwrap_or(true),
        allow_substr: pick(&source.allow_substr, &defaults.allow_substr).unwrap_or_default(),
        deny_substr: pick(&source.deny_substr, &defaults.deny_substr).unwrap_or_default(),
        max_links: pick(&source.max_links, &defaults.max_links).unwrap_or(DEFAULT_MAX_LINKS),
        last_week_only: pick(&source.last_week_only, &defaults.last_week_only).unwrap_or(true),
        pdf_chase: pick(&source.pdf_chase, &defaults.pdf_chase).unwrap_or(true),
    })
}

fn pick<T: Clone>(own: &Option<T>, fallback: &Option<T>) -> Option<T> {
    own.clone().or_else(|| fallback.clone())
}

/// Parses registry TOML text, merges every source and validates the result
pub fn parse_registry(content: &str) -> Result<Registry, ConfigError> {
    let raw: RegistryFile = toml::from_str(content)?;

    let sources = raw
        .sources
        .iter()
        .map(|entry| merge_source(&raw.defaults, entry))
        .collect::<Result<Vec<_>, _>>()?;

    let registry = Registry { sources };
    validate(&registry)?;

    Ok(registry)
}

/// Loads and parses a registry file from the given path
///
/// # Example
///
/// ```no_run
/// use std::path::Path;
/// use regwatch::config::load_registry;
///
/// let registry = load_registry(Path::new("sources.toml")).unwrap();
/// println!("{} sources", registry.sources.len());
/// ```
pub fn load_registry(path: &Path) -> Result<Registry, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    parse_registry(&content)
}

/// Computes a SHA-256 hash of the registry file content
///
/// Stored with each run so changes to the registry between runs are visible.
pub fn compute_registry_hash(path: &Path) -> Result<String, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    Ok(hex::encode(hasher.finalize()))
}

/// Loads a registry and returns both the registry and its hash
pub fn load_registry_with_hash(path: &Path) -> Result<(Registry, String), ConfigError> {
    let registry = load_registry(path)?;
    let hash = compute_registry_hash(path)?;
    Ok((registry, hash))
}
