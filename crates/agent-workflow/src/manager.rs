//! Delegation modes and the hierarchical coordinator

use crate::agent::{AgentUnit, extract_json};
use crate::task::{TaskId, TaskStatus};
use agent_core::{Error, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;
use tracing::debug;

#[cfg(test)]
use mockall::automock;

/// How waves are chosen
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DelegationMode {
    /// Waves computed once from declared dependencies
    Sequential,
    /// A coordinator reviews each wave before dispatch
    #[default]
    Hierarchical,
}

impl fmt::Display for DelegationMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DelegationMode::Sequential => f.write_str("sequential"),
            DelegationMode::Hierarchical => f.write_str("hierarchical"),
        }
    }
}

impl FromStr for DelegationMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "sequential" | "seq" => Ok(DelegationMode::Sequential),
            "hierarchical" | "hier" => Ok(DelegationMode::Hierarchical),
            other => Err(Error::Configuration(format!(
                "unknown mode '{other}' (expected sequential or hierarchical)"
            ))),
        }
    }
}

/// A coordinator decision about the upcoming wave
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Directive {
    /// Hold a ready task back for a later round
    Defer(TaskId),
    /// Run a finished task again, with guidance, before its dependents
    Redo { task: TaskId, hint: String },
}

/// A task about to be dispatched
#[derive(Debug, Clone, PartialEq)]
pub struct ReadyTask {
    pub id: TaskId,
    pub depends_on: Vec<TaskId>,
}

/// A task already terminal in this run
#[derive(Debug, Clone, PartialEq)]
pub struct CompletedTask {
    pub id: TaskId,
    pub status: TaskStatus,
    /// Non-whitespace characters of output
    pub output_chars: usize,
    pub preview: String,
    /// Already re-dispatched once
    pub redone: bool,
}

/// What the coordinator sees before a wave
#[derive(Debug, Clone, PartialEq)]
pub struct ReviewRequest {
    pub round: usize,
    pub ticker: String,
    pub ready: Vec<ReadyTask>,
    pub completed: Vec<CompletedTask>,
}

impl ReviewRequest {
    pub fn completed(&self, id: &TaskId) -> Option<&CompletedTask> {
        self.completed.iter().find(|c| &c.id == id)
    }
}

/// Reviews ready tasks before each hierarchical wave
///
/// Directives are advisory: the executor drops any that would break a
/// dependency, redo a task twice, or redo a task whose dependents started.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait Coordinator: Send + Sync {
    async fn review(&self, request: &ReviewRequest) -> Result<Vec<Directive>>;
}

/// Rule-based coordinator: redo a dependency whose output looks too thin
#[derive(Debug, Clone)]
pub struct CompletenessReview {
    min_chars: usize,
}

impl CompletenessReview {
    pub fn new(min_chars: usize) -> Self {
        Self { min_chars }
    }
}

#[async_trait]
impl Coordinator for CompletenessReview {
    async fn review(&self, request: &ReviewRequest) -> Result<Vec<Directive>> {
        let mut directives: Vec<Directive> = Vec::new();

        for ready in &request.ready {
            for dep in &ready.depends_on {
                let Some(done) = request.completed(dep) else {
                    continue;
                };
                let thin = done.status == TaskStatus::Succeeded && done.output_chars < self.min_chars;
                let listed = directives
                    .iter()
                    .any(|d| matches!(d, Directive::Redo { task, .. } if task == dep));
                if thin && !done.redone && !listed {
                    directives.push(Directive::Redo {
                        task: dep.clone(),
                        hint: format!(
                            "The previous output ({} characters) looked incomplete; expand it with concrete figures and sources.",
                            done.output_chars
                        ),
                    });
                }
            }
        }

        Ok(directives)
    }
}

/// Coordinator backed by the manager role's reasoning step
///
/// The reply must contain a JSON object
/// `{"directives": [{"action": "defer"|"redo", "task": "...", "hint": "..."}]}`;
/// anything unparseable means "no changes".
pub struct ManagerAgent {
    unit: AgentUnit,
}

impl ManagerAgent {
    pub fn new(unit: AgentUnit) -> Self {
        Self { unit }
    }
}

fn review_prompt(request: &ReviewRequest) -> String {
    let mut prompt = format!(
        "You coordinate a research crew working on {}. Round {}.\n\n## Ready to dispatch\n",
        request.ticker, request.round
    );
    for task in &request.ready {
        let deps: Vec<&str> = task.depends_on.iter().map(TaskId::as_str).collect();
        prompt.push_str(&format!("- {} (needs: {})\n", task.id, deps.join(", ")));
    }
    prompt.push_str("\n## Finished\n");
    for task in &request.completed {
        prompt.push_str(&format!(
            "- {} [{}{}]: {}\n",
            task.id,
            task.status,
            if task.redone { ", already redone" } else { "" },
            task.preview
        ));
    }
    prompt.push_str(
        "\nIf a finished output is too thin for the ready tasks, ask for a redo with a hint. \
         If a ready task should wait a round, defer it. Otherwise return no directives.\n\
         Answer with JSON only: {\"directives\": [{\"action\": \"defer\" or \"redo\", \"task\": \"<id>\", \"hint\": \"<guidance>\"}]}\n",
    );
    prompt
}

pub(crate) fn parse_directives(text: &str) -> Vec<Directive> {
    let Some(map) = extract_json(text) else {
        return Vec::new();
    };
    let Some(Value::Array(items)) = map.get("directives") else {
        return Vec::new();
    };

    items
        .iter()
        .filter_map(|item| {
            let action = item.get("action")?.as_str()?.to_lowercase();
            let task = TaskId::new(item.get("task")?.as_str()?.trim());
            match action.as_str() {
                "defer" => Some(Directive::Defer(task)),
                "redo" => Some(Directive::Redo {
                    task,
                    hint: item
                        .get("hint")
                        .and_then(Value::as_str)
                        .unwrap_or("Revisit and complete your previous output.")
                        .to_string(),
                }),
                _ => None,
            }
        })
        .collect()
}

#[async_trait]
impl Coordinator for ManagerAgent {
    async fn review(&self, request: &ReviewRequest) -> Result<Vec<Directive>> {
        let reply = self.unit.reason(&review_prompt(request)).await?;
        let directives = parse_directives(&reply);
        debug!(round = request.round, count = directives.len(), "Manager directives");
        Ok(directives)
    }
}
