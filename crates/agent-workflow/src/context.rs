//! Per-invocation run context

use agent_core::ContextStore;
use std::sync::Arc;
use uuid::Uuid;

/// Values for one orchestration run
///
/// Owned by a single invocation; the store handle is the only shared
/// state tasks see.
#[derive(Clone)]
pub struct RunContext {
    pub run_id: Uuid,
    pub ticker: String,
    pub company_name: Option<String>,
    /// Clear the ticker's namespace before the first wave
    pub reset_memory: bool,
    pub store: Arc<dyn ContextStore>,
}

impl RunContext {
    /// Context for `ticker` (normalized to upper case)
    pub fn new(ticker: &str, store: Arc<dyn ContextStore>) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            ticker: ticker.trim().to_uppercase(),
            company_name: None,
            reset_memory: false,
            store,
        }
    }

    pub fn with_company_name(mut self, name: Option<String>) -> Self {
        self.company_name = name.filter(|n| !n.trim().is_empty());
        self
    }

    pub fn with_reset_memory(mut self, reset: bool) -> Self {
        self.reset_memory = reset;
        self
    }

    /// Company name, or the ticker when none was given
    pub fn display_name(&self) -> &str {
        self.company_name.as_deref().unwrap_or(&self.ticker)
    }

    /// Store namespace for this run
    pub fn namespace(&self) -> &str {
        &self.ticker
    }
}

impl std::fmt::Debug for RunContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RunContext")
            .field("run_id", &self.run_id)
            .field("ticker", &self.ticker)
            .field("company_name", &self.company_name)
            .field("reset_memory", &self.reset_memory)
            .finish_non_exhaustive()
    }
}
