//! Adapter from a completion provider to the reasoning capability

use crate::{CompletionRequest, LLMProvider, StopReason};
use agent_core::{Error, Reasoner, ReasoningRequest, Result};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, warn};

/// [`Reasoner`] backed by a chat-completion model
///
/// The role's instructions become the system prompt and the task prompt
/// the single user turn. An empty completion is a reasoning failure.
pub struct LlmReasoner {
    provider: Arc<dyn LLMProvider>,
    model: String,
    max_tokens: usize,
}

impl LlmReasoner {
    pub fn new(provider: Arc<dyn LLMProvider>, model: impl Into<String>) -> Self {
        Self {
            provider,
            model: model.into(),
            max_tokens: 2048,
        }
    }

    /// Completion token budget per reasoning step
    pub fn with_max_tokens(mut self, max_tokens: usize) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

#[async_trait]
impl Reasoner for LlmReasoner {
    async fn reason(&self, request: ReasoningRequest) -> Result<String> {
        let mut completion = CompletionRequest::single_turn(&self.model, request.prompt)
            .with_max_tokens(self.max_tokens)
            .with_temperature(request.temperature);
        if !request.instructions.trim().is_empty() {
            completion = completion.with_system(request.instructions);
        }

        let response = self.provider.complete(completion).await?;
        debug!(
            role = %request.role,
            tokens = response.usage.total(),
            "Reasoning step completed"
        );

        if response.stop_reason == StopReason::MaxTokens {
            warn!(role = %request.role, "Completion truncated at token limit");
        }

        response
            .message
            .text()
            .map(str::to_string)
            .ok_or_else(|| Error::ReasoningFailure(format!("{} returned an empty completion", request.role)))
    }

    fn name(&self) -> &str {
        self.provider.name()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{CompletionResponse, LLMError, Message, TokenUsage};
    use std::sync::Mutex;

    struct Canned {
        reply: std::result::Result<String, String>,
        seen: Mutex<Vec<CompletionRequest>>,
    }

    impl Canned {
        fn new(reply: std::result::Result<&str, &str>) -> Arc<Self> {
            Arc::new(Self {
                reply: reply.map(str::to_string).map_err(str::to_string),
                seen: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl LLMProvider for Canned {
        async fn complete(&self, request: CompletionRequest) -> crate::Result<CompletionResponse> {
            self.seen.lock().unwrap().push(request);
            match &self.reply {
                Ok(text) => Ok(CompletionResponse {
                    message: Message::assistant(text.clone()),
                    stop_reason: StopReason::EndTurn,
                    usage: TokenUsage::default(),
                }),
                Err(msg) => Err(LLMError::RequestFailed(msg.clone())),
            }
        }

        fn name(&self) -> &str {
            "canned"
        }
    }

    fn request() -> ReasoningRequest {
        ReasoningRequest {
            role: "analyst".to_string(),
            instructions: "You analyze financials.".to_string(),
            prompt: "Summarize AAPL".to_string(),
            temperature: 0.0,
        }
    }

    #[tokio::test]
    async fn test_reason_maps_request() {
        let provider = Canned::new(Ok("AAPL looks steady."));
        let reasoner = LlmReasoner::new(provider.clone(), "gpt-4o-mini").with_max_tokens(512);

        let text = reasoner.reason(request()).await.unwrap();
        assert_eq!(text, "AAPL looks steady.");
        assert_eq!(reasoner.name(), "canned");

        let seen = provider.seen.lock().unwrap();
        assert_eq!(seen[0].system.as_deref(), Some("You analyze financials."));
        assert_eq!(seen[0].temperature, Some(0.0));
        assert_eq!(seen[0].max_tokens, 512);
    }

    #[tokio::test]
    async fn test_empty_completion_is_reasoning_failure() {
        let reasoner = LlmReasoner::new(Canned::new(Ok("   ")), "m");
        let err = reasoner.reason(request()).await.unwrap_err();
        assert_eq!(err.kind(), "reasoning_failure");
    }

    #[tokio::test]
    async fn test_provider_error_is_reasoning_failure() {
        let reasoner = LlmReasoner::new(Canned::new(Err("502")), "m");
        let err = reasoner.reason(request()).await.unwrap_err();
        assert!(matches!(err, Error::ReasoningFailure(msg) if msg.contains("502")));
    }
}
