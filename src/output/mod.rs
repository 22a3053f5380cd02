//! Console output for runs and stored articles
//!
//! This module handles:
//! - Accumulating and printing run statistics
//! - Listing recently published articles from the store

mod recent;
pub mod stats;

pub use recent::{excerpt, format_article, print_recent_articles};
pub use stats::{print_run_summary, RunStats};
