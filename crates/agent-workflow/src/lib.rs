//! Multi-agent orchestration for research runs
//!
//! A [`Crew`] owns a validated [`TaskGraph`], the [`Roster`] of agents that
//! act for each role, and an [`Executor`] that runs the graph in waves:
//!
//! - every task in a wave is dispatched concurrently and the next wave
//!   waits until all of them are terminal
//! - a failed task fails or skips its dependents unless they declare a
//!   fallback or tolerate failed inputs
//! - in hierarchical mode a [`Coordinator`] reviews each wave and may
//!   defer tasks or re-dispatch one with a hint
//!
//! The synthesis task assembles a [`ReportDocument`] from upstream results.

pub mod agent;
pub mod context;
pub mod crew;
pub mod executor;
pub mod graph;
pub mod manager;
pub mod plan;
pub mod run_log;
pub mod synthesizer;
pub mod task;

pub use agent::{AgentUnit, Roster, TaskInput};
pub use context::RunContext;
pub use crew::{Crew, CrewBuilder, CrewOutput};
pub use executor::{ExecutionReport, Executor, ExecutorSettings};
pub use graph::{TEMPLATE_VARIABLES, TaskGraph, TaskGraphBuilder};
pub use manager::{
    CompletedTask, CompletenessReview, Coordinator, DelegationMode, Directive, ManagerAgent,
    ReadyTask, ReviewRequest,
};
pub use plan::{ExecutionPlan, Wave, next_wave};
pub use run_log::{LogEntry, LogLevel, RunLog};
pub use synthesizer::{
    ReportDocument, ReportLayout, ReportSection, SectionPolicy, SectionSource, SectionSpec,
    assemble, report_title,
};
pub use task::{
    OutputShape, TaskId, TaskKind, TaskOutput, TaskResult, TaskSpec, TaskStatus, ToolRequest,
};
