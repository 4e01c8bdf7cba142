//! Error types shared across the workspace

use crate::Capability;
use std::time::Duration;
use thiserror::Error;

/// Result type alias for agent-core
pub type Result<T> = std::result::Result<T, Error>;

/// Failure taxonomy for graph construction, task execution and sessions
///
/// Errors are `Clone` because a failed task result is read by every
/// dependent and by the report synthesizer.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    /// Invalid task graph or configuration, raised before anything runs
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// A role called a collaborator outside its capability set
    #[error("Capability violation: role '{role}' may not use {capability}")]
    CapabilityViolation {
        /// Role that attempted the call
        role: String,
        /// Capability that was requested
        capability: Capability,
    },

    /// External collaborator failed after retries
    #[error("Tool failure in {tool}: {reason}")]
    ToolFailure {
        /// Collaborator name
        tool: String,
        /// Last error reported by the collaborator
        reason: String,
    },

    /// Reasoning step produced empty or malformed output
    #[error("Reasoning failure: {0}")]
    ReasoningFailure(String),

    /// A dependency did not succeed, so the task was skipped
    #[error("Dependency '{dependency}' did not succeed")]
    DependencyFailure {
        /// First dependency that failed or was skipped
        dependency: String,
    },

    /// Task or run exceeded its time budget
    #[error("{scope} timed out after {after:?}")]
    Timeout {
        /// What timed out (a task id or "run")
        scope: String,
        /// The budget that was exceeded
        after: Duration,
    },

    /// The synthesized report is missing required sections
    #[error("Report validation failed, missing required section(s): {}", .missing.join(", "))]
    Validation {
        /// Titles of the missing sections
        missing: Vec<String>,
    },

    /// Context store backend failure
    #[error("Storage error: {0}")]
    Storage(String),

    /// Interactive command needs a ticker but none is active
    #[error("No active ticker; run `research <TICKER>` first or name one explicitly")]
    NoActiveTicker,

    /// Interactive input was not a command or ticker
    #[error("Unknown command: {0}")]
    UnknownCommand(String),

    /// Generic error message
    #[error("{0}")]
    Generic(String),
}

impl Error {
    /// Stable label used in logs and serialized results
    pub fn kind(&self) -> &'static str {
        match self {
            Error::Configuration(_) => "configuration_error",
            Error::CapabilityViolation { .. } => "capability_violation",
            Error::ToolFailure { .. } => "tool_failure",
            Error::ReasoningFailure(_) => "reasoning_failure",
            Error::DependencyFailure { .. } => "dependency_failure",
            Error::Timeout { .. } => "timeout_error",
            Error::Validation { .. } => "validation_error",
            Error::Storage(_) => "storage_error",
            Error::NoActiveTicker => "no_active_ticker",
            Error::UnknownCommand(_) => "unknown_command",
            Error::Generic(_) => "error",
        }
    }

    /// Shorthand for a tool failure
    pub fn tool(tool: impl Into<String>, reason: impl ToString) -> Self {
        Error::ToolFailure {
            tool: tool.into(),
            reason: reason.to_string(),
        }
    }

    /// Shorthand for a timeout
    pub fn timeout(scope: impl Into<String>, after: Duration) -> Self {
        Error::Timeout {
            scope: scope.into(),
            after,
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Storage(format!("serialization failed: {err}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_message_names_sections() {
        let err = Error::Validation {
            missing: vec!["Risk Assessment".to_string(), "Disclaimer".to_string()],
        };
        assert_eq!(
            err.to_string(),
            "Report validation failed, missing required section(s): Risk Assessment, Disclaimer"
        );
        assert_eq!(err.kind(), "validation_error");
    }

    #[test]
    fn test_capability_violation_message() {
        let err = Error::CapabilityViolation {
            role: "reporter".to_string(),
            capability: Capability::NewsLookup,
        };
        assert!(err.to_string().contains("reporter"));
        assert!(err.to_string().contains("news-lookup"));
    }

    #[test]
    fn test_timeout_helper() {
        let err = Error::timeout("analysis", Duration::from_secs(5));
        assert_eq!(err.kind(), "timeout_error");
        assert!(err.to_string().starts_with("analysis timed out"));
    }
}
