//! Error types for prompt operations

use thiserror::Error;

/// Result type for prompt operations
pub type Result<T> = std::result::Result<T, PromptError>;

/// Errors that can occur during prompt operations
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PromptError {
    /// Template parsing failed
    #[error("Failed to parse template '{name}': {detail}")]
    TemplateParseFailed { name: String, detail: String },

    /// Template uses a variable the caller does not supply
    #[error("Template '{name}' references undeclared placeholder(s): {}", .placeholders.join(", "))]
    UndeclaredPlaceholders {
        name: String,
        placeholders: Vec<String>,
    },

    /// Template rendering failed
    #[error("Failed to render template '{name}': {detail}")]
    RenderError { name: String, detail: String },
}

impl From<PromptError> for agent_core::Error {
    fn from(err: PromptError) -> Self {
        agent_core::Error::Configuration(err.to_string())
    }
}
