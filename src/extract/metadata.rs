//! Page-level metadata: declared language and title

use scraper::{Html, Selector};

/// Longest first-line title before it is cut
pub const MAX_DERIVED_TITLE_CHARS: usize = 120;

/// The `lang` (or `xml:lang`) attribute of the root element, if any
pub fn declared_language(document: &Html) -> Option<String> {
    let root = document.root_element();
    root.value()
        .attr("lang")
        .or_else(|| root.value().attr("xml:lang"))
        .map(|lang| lang.trim().to_string())
        .filter(|lang| !lang.is_empty())
}

/// Pages without a declared language count as English
pub fn is_english(lang: Option<&str>) -> bool {
    lang.map_or(true, |l| l.to_ascii_lowercase().starts_with("en"))
}

/// Trimmed `<title>` text, if non-empty
pub fn page_title(document: &Html) -> Option<String> {
    let selector = Selector::parse("title").ok()?;
    document
        .select(&selector)
        .next()
        .map(|t| t.text().collect::<Vec<_>>().join(" "))
        .map(|t| t.split_whitespace().collect::<Vec<_>>().join(" "))
        .filter(|t| !t.is_empty())
}

/// Derives a title from body text
///
/// Uses the first non-blank line, cut to 120 characters with an ellipsis,
/// or "Untitled" when there is no text at all.
///
/// # Examples
///
/// ```
/// use regwatch::extract::title_from_text;
///
/// assert_eq!(title_from_text("Short headline\nBody"), "Short headline");
/// assert_eq!(title_from_text(""), "Untitled");
/// assert_eq!(title_from_text(&"a".repeat(130)).chars().count(), 121);
/// ```
pub fn title_from_text(text: &str) -> String {
    let Some(first) = text.lines().map(str::trim).find(|l| !l.is_empty()) else {
        return "Untitled".to_string();
    };

    if first.chars().count() > MAX_DERIVED_TITLE_CHARS {
        let cut: String = first.chars().take(MAX_DERIVED_TITLE_CHARS).collect();
        format!("{}…", cut)
    } else {
        first.to_string()
    }
}
