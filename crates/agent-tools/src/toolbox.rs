//! Capability-gated access to collaborators for one task

use crate::financial::{FinancialDataProvider, Fundamentals, PricePoint, PriceRange};
use crate::news::{NewsArticle, NewsProvider};
use crate::{RetryPolicy, ToolError};
use agent_core::{AgentRole, Capability, ContextRecord, ContextStore, Error, RecordId, Result, Sequence};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Everything one task may touch, scoped to one role and one namespace
///
/// Every method checks the role's capability set before doing anything
/// and fails with [`Error::CapabilityViolation`] otherwise. External
/// lookups get a per-attempt timeout and the retry policy; store reads are
/// limited to records committed before `visible_before`, when set.
pub struct ToolBox {
    pub(crate) role: AgentRole,
    pub(crate) namespace: String,
    pub(crate) visible_before: Option<Sequence>,
    pub(crate) financial: Option<Arc<dyn FinancialDataProvider>>,
    pub(crate) news: Option<Arc<dyn NewsProvider>>,
    pub(crate) store: Arc<dyn ContextStore>,
    pub(crate) retry: RetryPolicy,
    pub(crate) call_timeout: Duration,
}

impl ToolBox {
    /// Role this toolbox was minted for
    pub fn role(&self) -> &AgentRole {
        &self.role
    }

    /// Namespace (ticker) all calls are scoped to
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Closing prices for the namespace's ticker
    pub async fn price_history(&self, range: PriceRange) -> Result<Vec<PricePoint>> {
        self.role.ensure(Capability::FinancialLookup)?;
        let provider = self.financial_provider()?;
        let ticker = self.namespace.as_str();

        self.call(Capability::FinancialLookup, move || {
            provider.price_history(ticker, range)
        })
        .await
    }

    /// Fundamentals snapshot for the namespace's ticker
    pub async fn fundamentals(&self) -> Result<Fundamentals> {
        self.role.ensure(Capability::FinancialLookup)?;
        let provider = self.financial_provider()?;
        let ticker = self.namespace.as_str();

        self.call(Capability::FinancialLookup, move || provider.fundamentals(ticker))
            .await
    }

    /// News search; the ticker is prepended to `keywords`
    pub async fn search_news(&self, keywords: &str, max_results: usize) -> Result<Vec<NewsArticle>> {
        self.role.ensure(Capability::NewsLookup)?;
        let provider = self
            .news
            .as_ref()
            .ok_or_else(|| Error::tool(Capability::NewsLookup.as_str(), "no news provider configured"))?;
        let query = format!("{} {}", self.namespace, keywords.trim());
        let query = query.trim();

        self.call(Capability::NewsLookup, move || provider.search(query, max_results))
            .await
    }

    /// Store records for the namespace ranked against `topic`
    pub async fn recall(&self, topic: &str, k: usize) -> Result<Vec<ContextRecord>> {
        self.role.ensure(Capability::ContextStore)?;
        self.store
            .query_as_of(&self.namespace, topic, k, self.visible_before)
            .await
    }

    /// Append a record under the namespace, attributed to this role
    pub async fn remember(&self, content: &str) -> Result<RecordId> {
        self.role.ensure(Capability::ContextStore)?;
        self.store
            .put(&self.namespace, content, &self.role.name)
            .await
    }

    fn financial_provider(&self) -> Result<&Arc<dyn FinancialDataProvider>> {
        self.financial.as_ref().ok_or_else(|| {
            Error::tool(
                Capability::FinancialLookup.as_str(),
                "no financial data provider configured",
            )
        })
    }

    async fn call<T, F, Fut>(&self, capability: Capability, mut operation: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = std::result::Result<T, ToolError>>,
    {
        let timeout = self.call_timeout;
        let name = format!("{}:{}", capability, self.namespace);
        debug!(role = %self.role.name, tool = %name, "Calling collaborator");

        self.retry
            .execute(&name, || {
                let attempt = operation();
                async move {
                    tokio::time::timeout(timeout, attempt)
                        .await
                        .unwrap_or(Err(ToolError::Timeout(timeout)))
                }
            })
            .await
            .map_err(|e| e.into_core(capability.as_str()))
    }
}
