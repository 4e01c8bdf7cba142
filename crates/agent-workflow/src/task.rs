//! Task definitions and per-task results

use crate::synthesizer::{ReportDocument, ReportLayout};
use agent_core::Error;
use agent_prompt::PromptTemplate;
use agent_tools::PriceRange;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Task identifier, unique within a graph
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(String);

impl TaskId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TaskId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

/// Shape the reasoning step must produce
#[derive(Debug, Clone, PartialEq)]
pub enum OutputShape {
    /// Any non-blank text
    Text,
    /// A JSON object carrying every listed field with a non-empty value
    Structured { required_fields: Vec<String> },
}

/// A collaborator call the agent makes before reasoning
#[derive(Debug, Clone, PartialEq)]
pub enum ToolRequest {
    PriceHistory(PriceRange),
    Fundamentals,
    NewsSearch { keywords: String, max_results: usize },
    Recall { topic: String, limit: usize },
}

impl ToolRequest {
    /// Capability the request needs
    pub fn capability(&self) -> agent_core::Capability {
        use agent_core::Capability;
        match self {
            ToolRequest::PriceHistory(_) | ToolRequest::Fundamentals => Capability::FinancialLookup,
            ToolRequest::NewsSearch { .. } => Capability::NewsLookup,
            ToolRequest::Recall { .. } => Capability::ContextStore,
        }
    }
}

/// What the executor does with the agent's output
#[derive(Debug, Clone, PartialEq)]
pub enum TaskKind {
    /// The agent's output is the task result
    Agent,
    /// The agent's output feeds a report assembled from upstream results
    Synthesis(ReportLayout),
}

/// Declarative task definition
#[derive(Debug, Clone)]
pub struct TaskSpec {
    pub id: TaskId,
    /// Role name, resolved against the roster when the graph is built
    pub role: String,
    pub template: PromptTemplate,
    /// Dependencies, in declaration order
    pub depends_on: Vec<TaskId>,
    pub concurrent: bool,
    pub output: OutputShape,
    pub tools: Vec<ToolRequest>,
    /// Write the output to the context store on success
    pub publish: bool,
    /// Result used in place of running the task when a dependency failed
    pub fallback: Option<String>,
    /// Run even when dependencies failed, seeing the gaps as degraded inputs
    pub tolerate_failed_dependencies: bool,
    pub kind: TaskKind,
}

impl TaskSpec {
    /// A concurrent, text-producing task with no dependencies
    pub fn new(id: impl Into<String>, role: impl Into<String>, template: PromptTemplate) -> Self {
        Self {
            id: TaskId::new(id),
            role: role.into(),
            template,
            depends_on: Vec::new(),
            concurrent: true,
            output: OutputShape::Text,
            tools: Vec::new(),
            publish: false,
            fallback: None,
            tolerate_failed_dependencies: false,
            kind: TaskKind::Agent,
        }
    }

    pub fn depends_on(mut self, dependency: impl Into<String>) -> Self {
        self.depends_on.push(TaskId::new(dependency));
        self
    }

    /// Run in a wave of its own
    pub fn sequential(mut self) -> Self {
        self.concurrent = false;
        self
    }

    pub fn structured(mut self, required_fields: &[&str]) -> Self {
        self.output = OutputShape::Structured {
            required_fields: required_fields.iter().map(|f| (*f).to_string()).collect(),
        };
        self
    }

    pub fn with_tool(mut self, request: ToolRequest) -> Self {
        self.tools.push(request);
        self
    }

    pub fn publish(mut self) -> Self {
        self.publish = true;
        self
    }

    pub fn with_fallback(mut self, value: impl Into<String>) -> Self {
        self.fallback = Some(value.into());
        self
    }

    pub fn tolerate_failed_dependencies(mut self) -> Self {
        self.tolerate_failed_dependencies = true;
        self
    }

    /// Make this the report-synthesis task; implies tolerating failed dependencies
    pub fn synthesize(mut self, layout: ReportLayout) -> Self {
        self.kind = TaskKind::Synthesis(layout);
        self.tolerate_failed_dependencies = true;
        self
    }
}

/// Terminal state of a task
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Succeeded,
    Failed,
    Skipped,
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TaskStatus::Succeeded => f.write_str("succeeded"),
            TaskStatus::Failed => f.write_str("failed"),
            TaskStatus::Skipped => f.write_str("skipped"),
        }
    }
}

/// Content a task produced
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum TaskOutput {
    Text(String),
    Structured(serde_json::Map<String, serde_json::Value>),
    Document(ReportDocument),
}

impl TaskOutput {
    /// Plain-text rendering, used for prompts and report sections
    pub fn as_text(&self) -> String {
        match self {
            TaskOutput::Text(text) => text.clone(),
            TaskOutput::Structured(map) => map
                .iter()
                .map(|(key, value)| match value {
                    serde_json::Value::String(s) => format!("**{key}**: {s}"),
                    other => format!("**{key}**: {other}"),
                })
                .collect::<Vec<_>>()
                .join("\n\n"),
            TaskOutput::Document(doc) => doc.to_markdown(),
        }
    }

    /// A string field of a structured output
    pub fn field(&self, name: &str) -> Option<&str> {
        match self {
            TaskOutput::Structured(map) => map.get(name).and_then(serde_json::Value::as_str),
            _ => None,
        }
    }
}

/// Outcome of one task in one run
#[derive(Debug, Clone)]
pub struct TaskResult {
    pub task_id: TaskId,
    pub status: TaskStatus,
    pub output: Option<TaskOutput>,
    pub error: Option<Error>,
    /// Output came from a fallback value or the task ran on failed inputs
    pub degraded: bool,
    /// Offset from run start at which the task was dispatched
    pub started_at: Duration,
    /// Offset from run start at which the task became terminal
    pub finished_at: Duration,
}

impl TaskResult {
    pub fn succeeded(task_id: TaskId, output: TaskOutput) -> Self {
        Self {
            task_id,
            status: TaskStatus::Succeeded,
            output: Some(output),
            error: None,
            degraded: false,
            started_at: Duration::ZERO,
            finished_at: Duration::ZERO,
        }
    }

    pub fn failed(task_id: TaskId, error: Error) -> Self {
        Self {
            task_id,
            status: TaskStatus::Failed,
            output: None,
            error: Some(error),
            degraded: false,
            started_at: Duration::ZERO,
            finished_at: Duration::ZERO,
        }
    }

    pub fn skipped(task_id: TaskId, dependency: &TaskId) -> Self {
        Self {
            status: TaskStatus::Skipped,
            error: Some(Error::DependencyFailure {
                dependency: dependency.to_string(),
            }),
            ..Self::failed(task_id, Error::Generic(String::new()))
        }
    }

    pub(crate) fn timed(mut self, started_at: Duration, finished_at: Duration) -> Self {
        self.started_at = started_at;
        self.finished_at = finished_at;
        self
    }

    pub fn is_success(&self) -> bool {
        self.status == TaskStatus::Succeeded
    }

    /// Time spent between dispatch and completion
    pub fn elapsed(&self) -> Duration {
        self.finished_at.saturating_sub(self.started_at)
    }
}
