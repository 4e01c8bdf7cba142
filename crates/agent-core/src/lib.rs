//! Core abstractions for the research orchestration engine
//!
//! This crate defines the types every other crate in the workspace agrees on:
//!
//! - [`Error`]: the shared failure taxonomy used by tasks, tools and sessions
//! - [`Capability`] / [`CapabilitySet`]: which collaborators a role may call
//! - [`AgentRole`]: a named role with a fixed capability set and temperature
//! - [`ContextStore`]: the namespaced, append-only store agents share
//! - [`Reasoner`]: the opaque reasoning step that turns a prompt into text

pub mod agent;
pub mod capability;
pub mod context;
pub mod error;

pub use agent::{AgentRole, Reasoner, ReasoningRequest};
pub use capability::{Capability, CapabilitySet};
pub use context::{ContextRecord, ContextStore, RecordId, Sequence};
pub use error::{Error, Result};
