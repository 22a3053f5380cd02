//! Integration tests for regwatch
//!
//! These tests use wiremock to stand in for regulator websites and drive
//! the transport, listing discovery, extraction and full runs end-to-end.

mod extract_tests;
mod fetch_tests;
mod run_tests;
