//! Registry of collaborators shared by every task in a run

use crate::financial::FinancialDataProvider;
use crate::news::NewsProvider;
use crate::{RetryPolicy, ToolBox};
use agent_core::{AgentRole, ContextStore, Sequence};
use std::sync::Arc;
use std::time::Duration;

/// Holds the configured collaborators and mints per-task [`ToolBox`]es
///
/// Providers are optional so a run without news credentials still
/// starts; calls to a missing provider fail as tool failures.
#[derive(Clone)]
pub struct ToolRegistry {
    financial: Option<Arc<dyn FinancialDataProvider>>,
    news: Option<Arc<dyn NewsProvider>>,
    store: Arc<dyn ContextStore>,
    retry: RetryPolicy,
    call_timeout: Duration,
}

impl ToolRegistry {
    /// Create a registry over a context store, with no lookup providers
    pub fn new(store: Arc<dyn ContextStore>) -> Self {
        Self {
            financial: None,
            news: None,
            store,
            retry: RetryPolicy::default(),
            call_timeout: Duration::from_secs(30),
        }
    }

    /// Register the financial data provider
    pub fn with_financial(mut self, provider: Arc<dyn FinancialDataProvider>) -> Self {
        self.financial = Some(provider);
        self
    }

    /// Register the news provider
    pub fn with_news(mut self, provider: Arc<dyn NewsProvider>) -> Self {
        self.news = Some(provider);
        self
    }

    /// Retry policy for external lookups
    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Per-attempt timeout for external lookups
    pub fn with_call_timeout(mut self, timeout: Duration) -> Self {
        self.call_timeout = timeout;
        self
    }

    /// The shared context store
    pub fn store(&self) -> &Arc<dyn ContextStore> {
        &self.store
    }

    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.retry
    }

    /// Toolbox for `role` scoped to `namespace`
    ///
    /// Store reads through the toolbox only see records with a sequence
    /// below `visible_before`, when given.
    pub fn toolbox(
        &self,
        role: &AgentRole,
        namespace: &str,
        visible_before: Option<Sequence>,
    ) -> ToolBox {
        ToolBox {
            role: role.clone(),
            namespace: namespace.to_string(),
            visible_before,
            financial: self.financial.clone(),
            news: self.news.clone(),
            store: Arc::clone(&self.store),
            retry: self.retry.clone(),
            call_timeout: self.call_timeout,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use agent_core::Capability;
    use agent_memory::InMemoryContextStore;

    #[test]
    fn test_toolbox_scoping() {
        let registry = ToolRegistry::new(Arc::new(InMemoryContextStore::new()))
            .with_call_timeout(Duration::from_secs(5));
        let role = AgentRole::new("reporter").with_capability(Capability::ContextStore);

        let toolbox = registry.toolbox(&role, "MSFT", Some(4));

        assert_eq!(toolbox.namespace(), "MSFT");
        assert_eq!(toolbox.role().name, "reporter");
        assert_eq!(toolbox.visible_before, Some(4));
        assert_eq!(toolbox.call_timeout, Duration::from_secs(5));
        assert_eq!(registry.retry_policy(), &RetryPolicy::default());
    }
}
