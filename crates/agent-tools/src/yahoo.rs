//! Yahoo Finance market-data provider

use crate::cache::{CacheKey, ResponseCache};
use crate::financial::{FinancialDataProvider, Fundamentals, PricePoint, PriceRange};
use crate::ToolError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::time::Duration;
use time::OffsetDateTime;
use tracing::debug;
use yahoo_finance_api as yahoo;

/// Market data from Yahoo Finance (no API key required)
///
/// Histories and fundamentals are cached for `ttl`. Yahoo's public chart
/// endpoint carries no valuation ratios, so those fields stay empty.
#[derive(Clone)]
pub struct YahooFinanceProvider {
    cache: ResponseCache,
}

impl YahooFinanceProvider {
    /// Create a provider caching responses for `ttl`
    pub fn new(ttl: Duration) -> Self {
        Self {
            cache: ResponseCache::new(ttl),
        }
    }

    async fn fetch_history(ticker: &str, days: i64) -> Result<Vec<PricePoint>, ToolError> {
        let provider =
            yahoo::YahooConnector::new().map_err(|e| ToolError::ProviderError(e.to_string()))?;

        let end = Utc::now();
        let start = end - chrono::Duration::days(days);
        let start = OffsetDateTime::from_unix_timestamp(start.timestamp())
            .map_err(|e| ToolError::InvalidRequest(format!("invalid start timestamp: {e}")))?;
        let end = OffsetDateTime::from_unix_timestamp(end.timestamp())
            .map_err(|e| ToolError::InvalidRequest(format!("invalid end timestamp: {e}")))?;

        let response = provider
            .get_quote_history(ticker, start, end)
            .await
            .map_err(|e| classify(ticker, &e.to_string()))?;
        let quotes = response
            .quotes()
            .map_err(|e| classify(ticker, &e.to_string()))?;

        if quotes.is_empty() {
            return Err(ToolError::DataUnavailable {
                symbol: ticker.to_string(),
                reason: "no quotes in range".to_string(),
            });
        }

        debug!(ticker, quotes = quotes.len(), "Fetched Yahoo history");

        Ok(quotes
            .iter()
            .map(|q| PricePoint {
                date: DateTime::from_timestamp(q.timestamp as i64, 0)
                    .unwrap_or_else(Utc::now)
                    .date_naive(),
                close: q.close,
                volume: q.volume,
            })
            .collect())
    }
}

impl Default for YahooFinanceProvider {
    fn default() -> Self {
        Self::new(Duration::from_secs(300))
    }
}

/// Unknown symbols surface as "not found"/"no data"; everything else is an outage
fn classify(ticker: &str, message: &str) -> ToolError {
    let lower = message.to_lowercase();
    if ["not found", "no data", "no quotes", "no result", "404", "empty"]
        .iter()
        .any(|needle| lower.contains(needle))
    {
        ToolError::DataUnavailable {
            symbol: ticker.to_string(),
            reason: message.to_string(),
        }
    } else {
        ToolError::ProviderError(message.to_string())
    }
}

#[async_trait]
impl FinancialDataProvider for YahooFinanceProvider {
    async fn price_history(
        &self,
        ticker: &str,
        range: PriceRange,
    ) -> Result<Vec<PricePoint>, ToolError> {
        let key = CacheKey::new(ticker, "history", range.label());
        self.cache
            .get_or_fetch(key, || Self::fetch_history(ticker, range.days()))
            .await
    }

    async fn fundamentals(&self, ticker: &str) -> Result<Fundamentals, ToolError> {
        let key = CacheKey::new(ticker, "fundamentals", "");
        self.cache
            .get_or_fetch(key, move || async move {
                let year = Self::fetch_history(ticker, PriceRange::OneYear.days()).await?;

                let closes = year.iter().map(|p| p.close);
                let high = closes.clone().fold(f64::MIN, f64::max);
                let low = closes.fold(f64::MAX, f64::min);
                let average_volume =
                    year.iter().map(|p| p.volume as f64).sum::<f64>() / year.len() as f64;

                Ok(Fundamentals {
                    symbol: ticker.to_string(),
                    last_price: year.last().map(|p| p.close),
                    fifty_two_week_high: Some(high),
                    fifty_two_week_low: Some(low),
                    average_volume: Some(average_volume),
                    ..Default::default()
                })
            })
            .await
    }

    fn name(&self) -> &'static str {
        "yahoo-finance"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify() {
        assert!(matches!(
            classify("ZZZZ", "Not Found: No data found, symbol may be delisted"),
            ToolError::DataUnavailable { .. }
        ));
        assert!(matches!(
            classify("AAPL", "connection reset by peer"),
            ToolError::ProviderError(_)
        ));
    }

    #[tokio::test]
    #[ignore] // Requires network access
    async fn test_price_history() {
        let provider = YahooFinanceProvider::default();
        let points = provider
            .price_history("AAPL", PriceRange::OneMonth)
            .await
            .unwrap();
        assert!(!points.is_empty());
        assert!(points.windows(2).all(|w| w[0].date <= w[1].date));
    }

    #[tokio::test]
    #[ignore] // Requires network access
    async fn test_fundamentals() {
        let provider = YahooFinanceProvider::default();
        let f = provider.fundamentals("AAPL").await.unwrap();
        assert!(f.last_price.unwrap() > 0.0);
    }
}
