//! Error types for collaborator calls

use std::time::Duration;
use thiserror::Error;

/// Errors reported by data and news providers
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ToolError {
    /// The provider has no data for the symbol (unknown ticker, empty range)
    #[error("Data unavailable for {symbol}: {reason}")]
    DataUnavailable { symbol: String, reason: String },

    /// The provider failed or is unreachable
    #[error("Provider error: {0}")]
    ProviderError(String),

    /// A single attempt exceeded its time budget
    #[error("Request timed out after {0:?}")]
    Timeout(Duration),

    /// The request itself was malformed
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

impl ToolError {
    /// Whether another attempt could succeed
    pub fn is_retryable(&self) -> bool {
        matches!(self, ToolError::ProviderError(_) | ToolError::Timeout(_))
    }

    /// Convert into the shared taxonomy, tagged with the collaborator name
    pub fn into_core(self, tool: &str) -> agent_core::Error {
        agent_core::Error::tool(tool, self)
    }
}

impl From<reqwest::Error> for ToolError {
    fn from(err: reqwest::Error) -> Self {
        ToolError::ProviderError(err.to_string())
    }
}
