//! URL handling module for regwatch
//!
//! This module provides candidate normalization (fragment stripping and
//! href resolution), origin keys for throttling, host comparison and the
//! wildcard matching used for evergreen hosts.

mod domain;
mod matcher;
mod normalize;

pub use domain::{origin_key, same_host};
pub use matcher::{is_evergreen_host, matches_wildcard};
pub use normalize::{dedupe_preserving_order, normalize_url, resolve_href};
