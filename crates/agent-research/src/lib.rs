//! Multi-agent financial research
//!
//! A manager, a researcher, an analyst and a reporter cooperate on one
//! ticker: research and analysis run in parallel, each publishing findings
//! to the shared context store, then the reporter synthesizes a validated
//! report from both.
//!
//! - [`ResearchSession::run`] is the synchronous boundary, returning a
//!   [`RunOutcome`] (and its flat [`RunReport`] serialization)
//! - [`InteractiveSession::handle`] processes one interactive line at a time
//! - [`ResearchConfig`] collects timeouts, retry policy and model settings

pub mod config;
pub mod interactive;
pub mod pipeline;
pub mod roles;
pub mod session;

pub use config::{ResearchConfig, ResearchConfigBuilder, RoleTemperatures};
pub use interactive::{Command, InteractiveSession, Output, SessionState};
pub use session::{ResearchSession, RunOutcome, RunReport, RunRequest, TaskSummary};
