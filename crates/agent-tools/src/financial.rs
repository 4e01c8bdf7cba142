//! Financial data lookup contract

use crate::ToolError;
use async_trait::async_trait;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[cfg(test)]
use mockall::automock;

/// Look-back window for price history
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PriceRange {
    OneMonth,
    ThreeMonths,
    SixMonths,
    OneYear,
}

impl PriceRange {
    /// Calendar days covered by the range
    pub fn days(&self) -> i64 {
        match self {
            PriceRange::OneMonth => 30,
            PriceRange::ThreeMonths => 90,
            PriceRange::SixMonths => 180,
            PriceRange::OneYear => 365,
        }
    }

    /// Short label ("1mo", "3mo", ...)
    pub fn label(&self) -> &'static str {
        match self {
            PriceRange::OneMonth => "1mo",
            PriceRange::ThreeMonths => "3mo",
            PriceRange::SixMonths => "6mo",
            PriceRange::OneYear => "1y",
        }
    }
}

impl fmt::Display for PriceRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for PriceRange {
    type Err = ToolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "1mo" | "1m" => Ok(PriceRange::OneMonth),
            "3mo" | "3m" => Ok(PriceRange::ThreeMonths),
            "6mo" | "6m" => Ok(PriceRange::SixMonths),
            "1y" | "12mo" => Ok(PriceRange::OneYear),
            other => Err(ToolError::InvalidRequest(format!("unknown price range: {other}"))),
        }
    }
}

/// One closing price
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PricePoint {
    pub date: NaiveDate,
    pub close: f64,
    pub volume: u64,
}

/// Valuation and fundamentals snapshot
///
/// Providers fill what they can; missing fields render as "N/A".
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Fundamentals {
    pub symbol: String,
    pub name: Option<String>,
    pub currency: Option<String>,
    pub last_price: Option<f64>,
    pub fifty_two_week_high: Option<f64>,
    pub fifty_two_week_low: Option<f64>,
    pub average_volume: Option<f64>,
    pub market_cap: Option<f64>,
    pub pe_ratio: Option<f64>,
    pub eps: Option<f64>,
    pub dividend_yield: Option<f64>,
}

fn fmt_opt(value: Option<f64>, decimals: usize) -> String {
    value.map_or_else(|| "N/A".to_string(), |v| format!("{v:.decimals$}"))
}

impl Fundamentals {
    /// Markdown bullet list of the populated snapshot
    pub fn to_markdown(&self) -> String {
        let mut out = String::new();
        if let Some(name) = &self.name {
            out.push_str(&format!("- Company: {name}\n"));
        }
        out.push_str(&format!("- Last price: {}\n", fmt_opt(self.last_price, 2)));
        out.push_str(&format!(
            "- 52-week range: {} - {}\n",
            fmt_opt(self.fifty_two_week_low, 2),
            fmt_opt(self.fifty_two_week_high, 2)
        ));
        out.push_str(&format!(
            "- Average volume: {}\n",
            fmt_opt(self.average_volume, 0)
        ));
        out.push_str(&format!("- Market cap: {}\n", fmt_opt(self.market_cap, 0)));
        out.push_str(&format!("- P/E ratio: {}\n", fmt_opt(self.pe_ratio, 2)));
        out.push_str(&format!("- EPS: {}\n", fmt_opt(self.eps, 2)));
        out.push_str(&format!(
            "- Dividend yield: {}\n",
            fmt_opt(self.dividend_yield, 2)
        ));
        out
    }
}

/// Summary statistics over a price history
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceSummary {
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub first_close: f64,
    pub last_close: f64,
    pub change_pct: f64,
    pub high: f64,
    pub low: f64,
    /// Standard deviation of daily returns, in percent
    pub daily_volatility_pct: f64,
}

impl PriceSummary {
    /// Summarize an ordered history; `None` when it is empty
    pub fn from_points(points: &[PricePoint]) -> Option<Self> {
        let first = points.first()?;
        let last = points.last()?;

        let high = points.iter().map(|p| p.close).fold(f64::MIN, f64::max);
        let low = points.iter().map(|p| p.close).fold(f64::MAX, f64::min);

        let returns: Vec<f64> = points
            .windows(2)
            .filter(|w| w[0].close > 0.0)
            .map(|w| (w[1].close - w[0].close) / w[0].close)
            .collect();
        let volatility = if returns.len() < 2 {
            0.0
        } else {
            let mean = returns.iter().sum::<f64>() / returns.len() as f64;
            let variance = returns.iter().map(|r| (r - mean).powi(2)).sum::<f64>()
                / (returns.len() - 1) as f64;
            variance.sqrt() * 100.0
        };

        let change_pct = if first.close > 0.0 {
            (last.close - first.close) / first.close * 100.0
        } else {
            0.0
        };

        Some(Self {
            start: first.date,
            end: last.date,
            first_close: first.close,
            last_close: last.close,
            change_pct,
            high,
            low,
            daily_volatility_pct: volatility,
        })
    }

    /// Markdown bullet list
    pub fn to_markdown(&self) -> String {
        format!(
            "- Period: {} to {}\n- Close: {:.2} -> {:.2} ({:+.2}%)\n- Range: {:.2} - {:.2}\n- Daily volatility: {:.2}%\n",
            self.start,
            self.end,
            self.first_close,
            self.last_close,
            self.change_pct,
            self.low,
            self.high,
            self.daily_volatility_pct
        )
    }
}

/// Price and fundamentals lookups
///
/// Both operations fail with [`ToolError::DataUnavailable`] for an unknown
/// ticker.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait FinancialDataProvider: Send + Sync {
    /// Closing prices over `range`, oldest first
    async fn price_history(
        &self,
        ticker: &str,
        range: PriceRange,
    ) -> Result<Vec<PricePoint>, ToolError>;

    /// Valuation and fundamentals snapshot
    async fn fundamentals(&self, ticker: &str) -> Result<Fundamentals, ToolError>;

    /// Provider name, for logs
    fn name(&self) -> &'static str;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn point(day: u32, close: f64) -> PricePoint {
        PricePoint {
            date: NaiveDate::from_ymd_opt(2024, 1, day).unwrap(),
            close,
            volume: 1_000,
        }
    }

    #[test]
    fn test_range_parse() {
        assert_eq!("3mo".parse::<PriceRange>().unwrap(), PriceRange::ThreeMonths);
        assert_eq!("1Y".parse::<PriceRange>().unwrap(), PriceRange::OneYear);
        assert!("5y".parse::<PriceRange>().is_err());
        assert_eq!(PriceRange::SixMonths.to_string(), "6mo");
    }

    #[test]
    fn test_summary() {
        let points = vec![point(1, 100.0), point(2, 110.0), point(3, 99.0), point(4, 120.0)];
        let summary = PriceSummary::from_points(&points).unwrap();

        assert!((summary.change_pct - 20.0).abs() < 1e-9);
        assert_eq!(summary.high, 120.0);
        assert_eq!(summary.low, 99.0);
        assert!(summary.daily_volatility_pct > 0.0);
        assert!(summary.to_markdown().contains("+20.00%"));
    }

    #[test]
    fn test_summary_empty() {
        assert!(PriceSummary::from_points(&[]).is_none());
    }

    #[test]
    fn test_fundamentals_markdown_marks_missing() {
        let f = Fundamentals {
            symbol: "AAPL".to_string(),
            last_price: Some(189.5),
            ..Default::default()
        };
        let md = f.to_markdown();
        assert!(md.contains("Last price: 189.50"));
        assert!(md.contains("P/E ratio: N/A"));
    }
}
