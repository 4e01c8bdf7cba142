//! External collaborators for research agents
//!
//! This crate defines the narrow contracts the orchestration engine consumes
//! (financial data and news lookups), concrete clients for them, and the
//! [`ToolBox`] through which an agent reaches them. A `ToolBox` is minted
//! per task from the [`ToolRegistry`] and refuses any call outside the
//! role's capability set.

pub mod cache;
pub mod error;
pub mod financial;
pub mod finnhub;
pub mod news;
pub mod registry;
pub mod retry;
pub mod toolbox;
pub mod yahoo;

pub use cache::{CacheKey, ResponseCache};
pub use error::ToolError;
pub use financial::{FinancialDataProvider, Fundamentals, PricePoint, PriceRange, PriceSummary};
pub use finnhub::FinnhubNewsProvider;
pub use news::{NewsArticle, NewsProvider};
pub use registry::ToolRegistry;
pub use retry::RetryPolicy;
pub use toolbox::ToolBox;
pub use yahoo::YahooFinanceProvider;
