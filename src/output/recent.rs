//! Listing of recently published articles from the store

use crate::storage::{ArticleStore, StorageResult, StoredArticle};

/// Characters of body text shown per article
const EXCERPT_CHARS: usize = 160;

/// One-paragraph excerpt of an article body
pub fn excerpt(text: &str) -> String {
    let flat = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if flat.chars().count() > EXCERPT_CHARS {
        let cut: String = flat.chars().take(EXCERPT_CHARS).collect();
        format!("{}…", cut.trim_end())
    } else {
        flat
    }
}

/// Formats one article for the console
pub fn format_article(article: &StoredArticle) -> String {
    format!(
        "{}  {}\n  {}\n  {}",
        article.published_at.format("%Y-%m-%d"),
        article.title,
        article.url,
        excerpt(&article.raw_text)
    )
}

/// Prints articles published in the last `days` days, newest first
pub fn print_recent_articles(
    store: &dyn ArticleStore,
    days: i64,
    limit: usize,
) -> StorageResult<usize> {
    let articles = store.list_recent_articles_days(days, limit)?;

    println!("=== Articles from the last {} days ({}) ===\n", days, articles.len());
    for article in &articles {
        println!("{}\n", format_article(article));
    }

    Ok(articles.len())
}
