//! Configuration module for regwatch
//!
//! Two inputs configure a run: the source registry (a TOML file with a
//! `[defaults]` table and a `[[sources]]` array) and the environment
//! tunables.
//!
//! # Example
//!
//! ```no_run
//! use regwatch::config::{load_registry, Tunables};
//! use std::path::Path;
//!
//! let registry = load_registry(Path::new("sources.toml")).unwrap();
//! let tunables = Tunables::from_env().unwrap();
//! println!("{} sources, {} concurrent extractions", registry.sources.len(), tunables.fetch_concurrency);
//! ```

mod parser;
mod tunables;
mod types;
mod validation;

// Re-export types
pub use tunables::{
    Tunables, DEFAULT_ACCEPT_LANGUAGE, DEFAULT_EVERGREEN_DOMAINS, MAX_AGE_DAYS_LIMIT,
    MAX_BACKOFF_BASE,
};
pub use types::{Registry, RegistryFile, SourceConfig, SourceOverrides, DEFAULT_MAX_LINKS};

// Re-export parser functions
pub use parser::{
    compute_registry_hash, load_registry, load_registry_with_hash, merge_source, parse_registry,
};
