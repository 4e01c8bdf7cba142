//! News and search lookup contract

use crate::ToolError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[cfg(test)]
use mockall::automock;

/// One search hit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewsArticle {
    pub title: String,
    pub source: String,
    pub url: String,
    pub snippet: String,
    pub published_at: Option<DateTime<Utc>>,
}

impl NewsArticle {
    /// Markdown bullet with headline, source and snippet
    pub fn to_markdown(&self) -> String {
        let date = self
            .published_at
            .map(|d| format!(" ({})", d.format("%Y-%m-%d")))
            .unwrap_or_default();
        format!(
            "- **{}** [{}]{}\n  {}\n  <{}>\n",
            self.title.trim(),
            self.source,
            date,
            self.snippet.trim(),
            self.url
        )
    }
}

/// News/search lookups; fails with [`ToolError::ProviderError`] on outage
#[cfg_attr(test, automock)]
#[async_trait]
pub trait NewsProvider: Send + Sync {
    /// Up to `max_results` articles matching `query`
    async fn search(&self, query: &str, max_results: usize) -> Result<Vec<NewsArticle>, ToolError>;

    /// Provider name, for logs
    fn name(&self) -> &'static str;
}
