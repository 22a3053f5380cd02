//! Main-content extraction
//!
//! The article body comes from Lectito's readability pipeline; its cleaned
//! HTML is flattened into normalized lines here. When Lectito finds nothing
//! usable the whole page's visible text stands in.

use lectito_core::{Document, ExtractConfig};
use scraper::{ElementRef, Html, Node, Selector};

/// Smallest body Lectito is asked to accept
const CHAR_THRESHOLD: usize = 100;

/// Top-scoring containers Lectito compares
const MAX_TOP_CANDIDATES: usize = 5;

const SKIPPED_TAGS: [&str; 5] = ["script", "style", "noscript", "template", "svg"];

const BLOCK_TAGS: [&str; 29] = [
    "address", "article", "aside", "blockquote", "br", "dd", "div", "dl", "dt", "figcaption",
    "figure", "footer", "form", "h1", "h2", "h3", "h4", "h5", "h6", "header", "hr", "li", "main",
    "nav", "ol", "p", "pre", "section", "table",
];

fn lectito_config() -> ExtractConfig {
    let mut cfg = ExtractConfig::default();
    cfg.char_threshold = CHAR_THRESHOLD;
    cfg.max_top_candidates = MAX_TOP_CANDIDATES;
    cfg
}

/// Extracts the main article text, or None when no usable text is found
pub fn extract_main_text(html: &str) -> Option<String> {
    let doc = match Document::parse(html) {
        Ok(doc) => doc,
        Err(e) => {
            tracing::debug!("Readability parse failed: {}", e);
            return None;
        }
    };

    let extracted = match lectito_core::extract_content(&doc, &lectito_config()) {
        Ok(extracted) => extracted,
        Err(e) => {
            tracing::debug!("Readability extraction failed: {}", e);
            return None;
        }
    };

    let fragment = Html::parse_fragment(&extracted.content);
    let text = element_text(&fragment.root_element());
    (!text.is_empty()).then_some(text)
}

/// Normalized visible text of the whole page body
///
/// Scripts, styles and similar non-rendered elements are skipped, block
/// boundaries become line breaks and runs of blank lines collapse to one.
pub fn visible_text(document: &Html) -> String {
    let root = Selector::parse("body")
        .ok()
        .and_then(|body| document.select(&body).next())
        .unwrap_or_else(|| document.root_element());
    element_text(&root)
}

/// Normalized visible text of one element
pub fn element_text(element: &ElementRef<'_>) -> String {
    let mut raw = String::new();
    collect_text(element, &mut raw);
    normalize_lines(&raw)
}

fn collect_text(element: &ElementRef<'_>, out: &mut String) {
    for child in element.children() {
        match child.value() {
            Node::Text(text) => {
                out.extend(text.chars().map(|c| if c.is_whitespace() { ' ' } else { c }))
            }
            Node::Element(el) => {
                let name = el.name();
                if SKIPPED_TAGS.contains(&name) {
                    continue;
                }
                let Some(child) = ElementRef::wrap(child) else {
                    continue;
                };

                let block = BLOCK_TAGS.contains(&name);
                if block {
                    out.push('\n');
                } else if name == "td" || name == "th" {
                    out.push(' ');
                }
                collect_text(&child, out);
                if block {
                    out.push('\n');
                }
            }
            _ => {}
        }
    }
}

fn normalize_lines(raw: &str) -> String {
    let mut lines: Vec<String> = Vec::new();
    let mut blank_run = 0;

    for line in raw.lines() {
        let line = line.split_whitespace().collect::<Vec<_>>().join(" ");
        if line.is_empty() {
            blank_run += 1;
            if blank_run == 1 && !lines.is_empty() {
                lines.push(String::new());
            }
        } else {
            blank_run = 0;
            lines.push(line);
        }
    }

    while lines.last().is_some_and(|l| l.is_empty()) {
        lines.pop();
    }

    lines.join("\n")
}
