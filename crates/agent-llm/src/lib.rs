//! Language-model backend for the reasoning step
//!
//! This crate provides a provider-agnostic completion contract, an
//! OpenAI-compatible client (behind the `openai` feature), and
//! [`LlmReasoner`], which adapts any provider to the
//! [`agent_core::Reasoner`] capability agents consume.

pub mod completion;
pub mod error;
pub mod messages;
pub mod provider;
pub mod reasoner;

// Re-export main types
pub use completion::{CompletionRequest, CompletionResponse, StopReason, TokenUsage};
pub use error::{LLMError, Result};
pub use messages::{Message, Role};
pub use provider::LLMProvider;
pub use reasoner::LlmReasoner;

// Provider implementations (feature-gated)
#[cfg(feature = "openai")]
pub mod providers;
