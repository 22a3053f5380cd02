//! PDF fallback helpers
//!
//! Regulators often publish a one-paragraph landing page with the real text
//! in an attached PDF. These helpers locate that PDF and turn it into text.

use super::ExtractError;
use scraper::{Html, Selector};
use std::sync::Arc;
use url::Url;

/// Converts PDF bytes to plain text
pub trait PdfTextExtractor: Send + Sync {
    fn extract_text(&self, bytes: &[u8]) -> Result<String, ExtractError>;
}

/// Text extraction backed by the `pdf-extract` crate
#[derive(Debug, Default, Clone, Copy)]
pub struct PdfExtractText;

impl PdfTextExtractor for PdfExtractText {
    fn extract_text(&self, bytes: &[u8]) -> Result<String, ExtractError> {
        pdf_extract::extract_text_from_mem(bytes).map_err(|e| ExtractError::Pdf(e.to_string()))
    }
}

/// True when a Content-Type value denotes a PDF
pub fn is_pdf_content_type(content_type: &str) -> bool {
    content_type.to_ascii_lowercase().contains("application/pdf")
}

/// The first link on the page whose href ends in `.pdf`
pub fn find_first_pdf_link(document: &Html, base: &Url) -> Option<Url> {
    let anchors = Selector::parse("a[href]").ok()?;

    document
        .select(&anchors)
        .filter_map(|a| a.value().attr("href"))
        .map(str::trim)
        .find(|href| href.to_ascii_lowercase().ends_with(".pdf"))
        .and_then(|href| crate::url::resolve_href(href, base))
}

/// Runs a (CPU-bound) extractor off the async worker threads
pub async fn extract_pdf_text(
    extractor: Arc<dyn PdfTextExtractor>,
    bytes: Vec<u8>,
) -> Result<String, ExtractError> {
    tokio::task::spawn_blocking(move || extractor.extract_text(&bytes))
        .await
        .map_err(|e| ExtractError::Pdf(format!("extraction task failed: {}", e)))?
        .map(|text| text.trim().to_string())
}
