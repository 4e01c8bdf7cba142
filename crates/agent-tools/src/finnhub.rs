//! Finnhub company-news provider

use crate::ToolError;
use crate::news::{NewsArticle, NewsProvider};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use governor::clock::DefaultClock;
use governor::state::{InMemoryState, NotKeyed};
use governor::{Quota, RateLimiter};
use reqwest::Client;
use serde::Deserialize;
use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

const DEFAULT_BASE_URL: &str = "https://finnhub.io/api/v1";

type SharedRateLimiter = Arc<RateLimiter<NotKeyed, InMemoryState, DefaultClock>>;

#[derive(Debug, Deserialize)]
struct FinnhubArticle {
    datetime: i64,
    headline: String,
    source: String,
    summary: String,
    url: String,
}

/// News lookups against Finnhub's company-news endpoint
///
/// The query's first token is the ticker; remaining tokens rank the
/// returned articles by keyword overlap, newest first on ties.
pub struct FinnhubNewsProvider {
    client: Client,
    api_key: String,
    base_url: String,
    lookback_days: i64,
    rate_limiter: SharedRateLimiter,
}

impl FinnhubNewsProvider {
    /// Create a client limited to `rate_limit` requests per minute
    ///
    /// Finnhub's free tier allows 60 per minute.
    pub fn new(
        api_key: impl Into<String>,
        rate_limit: u32,
        request_timeout: Duration,
    ) -> Result<Self, ToolError> {
        let quota = Quota::per_minute(NonZeroU32::new(rate_limit).unwrap_or(NonZeroU32::MIN));
        let client = Client::builder().timeout(request_timeout).build()?;

        Ok(Self {
            client,
            api_key: api_key.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            lookback_days: 14,
            rate_limiter: Arc::new(RateLimiter::direct(quota)),
        })
    }

    /// Override the API base URL
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Number of days of news to request
    pub fn with_lookback_days(mut self, days: i64) -> Self {
        self.lookback_days = days.max(1);
        self
    }

    async fn company_news(&self, symbol: &str) -> Result<Vec<FinnhubArticle>, ToolError> {
        self.rate_limiter.until_ready().await;

        let to = Utc::now().date_naive();
        let from = (to - chrono::Duration::days(self.lookback_days)).to_string();
        let to = to.to_string();
        let url = format!("{}/company-news", self.base_url);

        let response = self
            .client
            .get(&url)
            .query(&[
                ("symbol", symbol),
                ("from", from.as_str()),
                ("to", to.as_str()),
                ("token", self.api_key.as_str()),
            ])
            .send()
            .await
            .map_err(|e| ToolError::ProviderError(format!("Finnhub request failed: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(ToolError::ProviderError(format!(
                "Finnhub API error {status}: {body}"
            )));
        }

        response
            .json::<Vec<FinnhubArticle>>()
            .await
            .map_err(|e| ToolError::ProviderError(format!("Failed to parse Finnhub response: {e}")))
    }
}

fn keyword_score(article: &FinnhubArticle, keywords: &[String]) -> usize {
    let haystack = format!("{} {}", article.headline, article.summary).to_lowercase();
    keywords.iter().filter(|k| haystack.contains(k.as_str())).count()
}

#[async_trait]
impl NewsProvider for FinnhubNewsProvider {
    async fn search(&self, query: &str, max_results: usize) -> Result<Vec<NewsArticle>, ToolError> {
        let mut tokens = query.split_whitespace();
        let symbol = tokens
            .next()
            .ok_or_else(|| ToolError::InvalidRequest("empty news query".to_string()))?
            .to_uppercase();
        let keywords: Vec<String> = tokens.map(str::to_lowercase).collect();

        let mut articles = self.company_news(&symbol).await?;
        debug!(symbol = %symbol, fetched = articles.len(), "Fetched Finnhub news");

        articles.sort_by(|a, b| {
            keyword_score(b, &keywords)
                .cmp(&keyword_score(a, &keywords))
                .then(b.datetime.cmp(&a.datetime))
        });

        Ok(articles
            .into_iter()
            .take(max_results)
            .map(|a| NewsArticle {
                title: a.headline,
                source: a.source,
                url: a.url,
                snippet: a.summary,
                published_at: DateTime::from_timestamp(a.datetime, 0),
            })
            .collect())
    }

    fn name(&self) -> &'static str {
        "finnhub"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn article(headline: &str, datetime: i64) -> FinnhubArticle {
        FinnhubArticle {
            datetime,
            headline: headline.to_string(),
            source: "test".to_string(),
            summary: String::new(),
            url: String::new(),
        }
    }

    #[test]
    fn test_client_creation() {
        let client = FinnhubNewsProvider::new("test_key", 60, Duration::from_secs(5))
            .unwrap()
            .with_lookback_days(0);
        assert_eq!(client.api_key, "test_key");
        assert_eq!(client.lookback_days, 1);
        assert_eq!(client.name(), "finnhub");
    }

    #[test]
    fn test_keyword_score() {
        let keywords = vec!["earnings".to_string(), "guidance".to_string()];
        assert_eq!(keyword_score(&article("Earnings beat, guidance raised", 0), &keywords), 2);
        assert_eq!(keyword_score(&article("New store opens", 0), &keywords), 0);
    }

    #[tokio::test]
    async fn test_empty_query_is_invalid() {
        let client = FinnhubNewsProvider::new("k", 60, Duration::from_secs(1)).unwrap();
        let err = client.search("   ", 5).await.unwrap_err();
        assert!(matches!(err, ToolError::InvalidRequest(_)));
    }
}
