//! Validated task graph

use crate::agent::Roster;
use crate::plan::ExecutionPlan;
use crate::task::{TaskId, TaskKind, TaskSpec};
use agent_core::{Error, Result};
use petgraph::algo::toposort;
use petgraph::graph::{DiGraph, NodeIndex};
use std::collections::HashMap;

/// Variables every task template may reference
pub const TEMPLATE_VARIABLES: [&str; 4] = ["ticker", "company_name", "upstream", "hint"];

/// An acyclic set of tasks whose roles all exist in a roster
///
/// Only [`TaskGraphBuilder::build`] creates one, so holding a `TaskGraph`
/// means the configuration checks have passed.
#[derive(Debug, Clone)]
pub struct TaskGraph {
    tasks: Vec<TaskSpec>,
    index: HashMap<TaskId, usize>,
    dependents: HashMap<TaskId, Vec<TaskId>>,
}

impl TaskGraph {
    pub fn builder() -> TaskGraphBuilder {
        TaskGraphBuilder::default()
    }

    /// Tasks in declaration order
    pub fn tasks(&self) -> &[TaskSpec] {
        &self.tasks
    }

    pub fn get(&self, id: &TaskId) -> Option<&TaskSpec> {
        self.index.get(id).map(|&i| &self.tasks[i])
    }

    /// Tasks that declare `id` as a dependency, in declaration order
    pub fn dependents(&self, id: &TaskId) -> &[TaskId] {
        self.dependents.get(id).map_or(&[], Vec::as_slice)
    }

    /// Tasks nothing depends on
    pub fn sinks(&self) -> impl Iterator<Item = &TaskSpec> {
        self.tasks.iter().filter(|t| self.dependents(&t.id).is_empty())
    }

    /// Declaration position, used to keep result ordering stable
    pub fn position(&self, id: &TaskId) -> Option<usize> {
        self.index.get(id).copied()
    }

    pub fn plan(&self) -> ExecutionPlan {
        ExecutionPlan::compute(self)
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }
}

/// Collects task definitions and validates them into a [`TaskGraph`]
#[derive(Debug, Default)]
pub struct TaskGraphBuilder {
    tasks: Vec<TaskSpec>,
}

impl TaskGraphBuilder {
    pub fn task(mut self, spec: TaskSpec) -> Self {
        self.tasks.push(spec);
        self
    }

    /// Validate against `roster`
    ///
    /// Fails with [`Error::Configuration`] on an empty graph, a duplicate
    /// id, an unknown role, a self or undeclared dependency, a template
    /// placeholder the engine does not supply, a synthesis layout reading a
    /// task outside its dependencies, or a cycle.
    pub fn build(self, roster: &Roster) -> Result<TaskGraph> {
        if self.tasks.is_empty() {
            return Err(Error::Configuration("task graph has no tasks".to_string()));
        }

        let mut graph = DiGraph::<usize, ()>::new();
        let mut nodes: HashMap<TaskId, NodeIndex> = HashMap::new();
        let mut index = HashMap::new();

        for (i, task) in self.tasks.iter().enumerate() {
            if index.insert(task.id.clone(), i).is_some() {
                return Err(Error::Configuration(format!("duplicate task id '{}'", task.id)));
            }
            if !roster.contains(&task.role) {
                return Err(Error::Configuration(format!(
                    "task '{}' requests unregistered role '{}'",
                    task.id, task.role
                )));
            }
            task.template.ensure_placeholders(TEMPLATE_VARIABLES)?;
            if let TaskKind::Synthesis(layout) = &task.kind
                && let Some(missing) = layout
                    .upstream_tasks()
                    .find(|id| !task.depends_on.contains(id))
            {
                return Err(Error::Configuration(format!(
                    "synthesis task '{}' reads task '{missing}' without depending on it",
                    task.id
                )));
            }
            nodes.insert(task.id.clone(), graph.add_node(i));
        }

        let mut dependents: HashMap<TaskId, Vec<TaskId>> = HashMap::new();
        for task in &self.tasks {
            for dep in &task.depends_on {
                if dep == &task.id {
                    return Err(Error::Configuration(format!("task '{}' depends on itself", task.id)));
                }
                let Some(&from) = nodes.get(dep) else {
                    return Err(Error::Configuration(format!(
                        "task '{}' depends on undeclared task '{dep}'",
                        task.id
                    )));
                };
                graph.add_edge(from, nodes[&task.id], ());
                dependents.entry(dep.clone()).or_default().push(task.id.clone());
            }
        }

        toposort(&graph, None).map_err(|cycle| {
            let task = &self.tasks[graph[cycle.node_id()]];
            Error::Configuration(format!("dependency cycle through task '{}'", task.id))
        })?;

        Ok(TaskGraph {
            tasks: self.tasks,
            index,
            dependents,
        })
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::agent::AgentUnit;
    use crate::synthesizer::{ReportLayout, SectionSource};
    use agent_core::{AgentRole, Reasoner, ReasoningRequest};
    use agent_prompt::PromptTemplate;
    use async_trait::async_trait;
    use std::sync::Arc;

    struct Silent;

    #[async_trait]
    impl Reasoner for Silent {
        async fn reason(&self, _request: ReasoningRequest) -> Result<String> {
            Ok(String::new())
        }

        fn name(&self) -> &str {
            "silent"
        }
    }

    pub(crate) fn roster() -> Roster {
        Roster::new().with_agent(AgentUnit::new(AgentRole::new("worker"), Arc::new(Silent)))
    }

    pub(crate) fn spec(id: &str, deps: &[&str]) -> TaskSpec {
        let template = PromptTemplate::new(id, "Work on {{ ticker }}").unwrap();
        deps.iter()
            .fold(TaskSpec::new(id, "worker", template), |s, d| s.depends_on(*d))
    }

    pub(crate) fn graph(specs: Vec<TaskSpec>) -> TaskGraph {
        specs
            .into_iter()
            .fold(TaskGraph::builder(), TaskGraphBuilder::task)
            .build(&roster())
            .unwrap()
    }

    fn build_err(specs: Vec<TaskSpec>) -> String {
        let err = specs
            .into_iter()
            .fold(TaskGraph::builder(), TaskGraphBuilder::task)
            .build(&roster())
            .unwrap_err();
        assert_eq!(err.kind(), "configuration_error");
        err.to_string()
    }

    #[test]
    fn test_cycle_rejected() {
        let msg = build_err(vec![spec("a", &["c"]), spec("b", &["a"]), spec("c", &["b"])]);
        assert!(msg.contains("cycle"));
    }

    #[test]
    fn test_undeclared_dependency_rejected() {
        let msg = build_err(vec![spec("report", &["research"])]);
        assert!(msg.contains("undeclared task 'research'"));
    }

    #[test]
    fn test_self_dependency_rejected() {
        assert!(build_err(vec![spec("a", &["a"])]).contains("itself"));
    }

    #[test]
    fn test_unknown_role_rejected() {
        let template = PromptTemplate::new("t", "x").unwrap();
        let msg = build_err(vec![TaskSpec::new("a", "oracle", template)]);
        assert!(msg.contains("unregistered role 'oracle'"));
    }

    #[test]
    fn test_duplicate_and_empty_rejected() {
        assert!(build_err(vec![spec("a", &[]), spec("a", &[])]).contains("duplicate"));
        assert!(build_err(vec![]).contains("no tasks"));
    }

    #[test]
    fn test_unknown_placeholder_rejected() {
        let template = PromptTemplate::new("t", "{{ ticker }} in {{ sector }}").unwrap();
        let msg = build_err(vec![TaskSpec::new("a", "worker", template)]);
        assert!(msg.contains("sector"));
    }

    #[test]
    fn test_synthesis_must_depend_on_sections() {
        let layout = ReportLayout::new("Research Report")
            .section("Findings", SectionSource::Task(TaskId::from("research")));

        let msg = build_err(vec![
            spec("research", &[]),
            spec("report", &[]).synthesize(layout.clone()),
        ]);
        assert!(msg.contains("reads task 'research' without depending on it"));

        let g = graph(vec![
            spec("research", &[]),
            spec("report", &["research"]).synthesize(layout),
        ]);
        assert_eq!(
            g.plan().waves(),
            &[vec![TaskId::from("research")], vec![TaskId::from("report")]]
        );
    }

    #[test]
    fn test_dependents_and_sinks() {
        let g = graph(vec![
            spec("research", &[]),
            spec("analysis", &[]),
            spec("report", &["research", "analysis"]),
        ]);

        assert_eq!(g.dependents(&TaskId::from("research")), &[TaskId::from("report")]);
        let sinks: Vec<_> = g.sinks().map(|t| t.id.as_str()).collect();
        assert_eq!(sinks, vec!["report"]);
        assert_eq!(g.position(&TaskId::from("analysis")), Some(1));
    }
}
