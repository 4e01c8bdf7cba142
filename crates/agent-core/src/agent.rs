//! Agent roles and the reasoning capability

use crate::{Capability, CapabilitySet, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// A role an agent plays in a run
///
/// The capability set and temperature are fixed when the role is defined;
/// nothing at execution time can widen them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentRole {
    /// Role identifier, referenced by task definitions
    pub name: String,
    /// Collaborators this role may call
    pub capabilities: CapabilitySet,
    /// Sampling temperature handed to the reasoning step
    pub temperature: f32,
    /// Standing instructions for the reasoning step
    pub instructions: String,
}

impl AgentRole {
    /// Create a role with no capabilities and a neutral temperature
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            capabilities: CapabilitySet::new(),
            temperature: 0.0,
            instructions: String::new(),
        }
    }

    /// Grant a capability
    pub fn with_capability(mut self, capability: Capability) -> Self {
        self.capabilities = self.capabilities.with(capability);
        self
    }

    /// Set the temperature
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    /// Set the standing instructions
    pub fn with_instructions(mut self, instructions: impl Into<String>) -> Self {
        self.instructions = instructions.into();
        self
    }

    /// Check a capability against this role
    pub fn ensure(&self, capability: Capability) -> Result<()> {
        self.capabilities.ensure(&self.name, capability)
    }
}

/// Input to one reasoning step
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReasoningRequest {
    /// Role performing the step
    pub role: String,
    /// Standing instructions (system prompt)
    pub instructions: String,
    /// Task prompt with gathered inputs
    pub prompt: String,
    /// Sampling temperature
    pub temperature: f32,
}

/// The opaque capability that turns a prompt into text, or fails
///
/// Implementations may call a language model, a rules engine, or a canned
/// script in tests. Output validation happens in the caller.
#[async_trait]
pub trait Reasoner: Send + Sync {
    /// Produce text for the request
    async fn reason(&self, request: ReasoningRequest) -> Result<String>;

    /// Backend name, for logs
    fn name(&self) -> &str;
}
