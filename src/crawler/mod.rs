//! Crawler module: transport, listing discovery and run orchestration
//!
//! This module contains:
//! - HTTP fetching with header profiles and retry logic
//! - Per-host request throttling
//! - Listing discovery and candidate link filtering
//! - Concurrent run coordination

mod coordinator;
mod fetcher;
mod listing;
mod throttle;

pub use coordinator::{CandidateOutcome, Coordinator};
pub use fetcher::{
    build_http_client, is_retryable_status, FetchOutcome, FetchedPage, HeaderProfile,
    RetryPolicy, Transport, MAX_BACKOFF, RETRYABLE_STATUSES,
};
pub use listing::{
    amp_variants, discover_listing, extract_candidates, is_non_english_url, listing_plan,
    ListingAttempt, ListingError, ListingPage, ALWAYS_DENIED, NAVIGATION_SUFFIXES,
    NON_ENGLISH_SEGMENTS,
};
pub use throttle::HostThrottle;
