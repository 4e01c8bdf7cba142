//! A validated graph, its agents and an executor, run as one unit

use crate::agent::Roster;
use crate::context::RunContext;
use crate::executor::{Executor, ExecutorSettings};
use crate::graph::{TaskGraph, TaskGraphBuilder};
use crate::manager::Coordinator;
use crate::plan::Wave;
use crate::run_log::RunLog;
use crate::synthesizer::ReportDocument;
use crate::task::{TaskOutput, TaskResult, TaskSpec};
use agent_core::{Error, Result};
use agent_tools::ToolRegistry;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{info, instrument};

/// Outcome of one crew run
#[derive(Debug, Clone)]
pub struct CrewOutput {
    /// No run-level error and every sink task succeeded
    pub success: bool,
    /// The synthesized report, when a synthesis task succeeded
    pub document: Option<ReportDocument>,
    pub results: Vec<TaskResult>,
    pub waves: Vec<Wave>,
    pub log: RunLog,
    pub duration: Duration,
    pub error: Option<Error>,
}

impl CrewOutput {
    fn aborted(error: Error, log: RunLog, started: Instant) -> Self {
        Self {
            success: false,
            document: None,
            results: Vec::new(),
            waves: Vec::new(),
            log,
            duration: started.elapsed(),
            error: Some(error),
        }
    }

    pub fn result(&self, id: &str) -> Option<&TaskResult> {
        self.results.iter().find(|r| r.task_id.as_str() == id)
    }

    /// Markdown of the synthesized report
    pub fn report_markdown(&self) -> Option<String> {
        self.document.as_ref().map(ReportDocument::to_markdown)
    }
}

/// Builder for [`Crew`]
pub struct CrewBuilder {
    tasks: TaskGraphBuilder,
    roster: Roster,
    tools: ToolRegistry,
    settings: ExecutorSettings,
    coordinator: Option<Arc<dyn Coordinator>>,
}

impl CrewBuilder {
    pub fn task(mut self, spec: TaskSpec) -> Self {
        self.tasks = self.tasks.task(spec);
        self
    }

    pub fn roster(mut self, roster: Roster) -> Self {
        self.roster = roster;
        self
    }

    pub fn settings(mut self, settings: ExecutorSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn coordinator(mut self, coordinator: Arc<dyn Coordinator>) -> Self {
        self.coordinator = Some(coordinator);
        self
    }

    /// Validate the graph against the roster; nothing runs on failure
    pub fn build(self) -> Result<Crew> {
        let graph = self.tasks.build(&self.roster)?;
        let mut executor = Executor::new(Arc::new(graph), Arc::new(self.roster), self.tools)
            .with_settings(self.settings);
        if let Some(coordinator) = self.coordinator {
            executor = executor.with_coordinator(coordinator);
        }
        Ok(Crew { executor })
    }
}

/// Agents plus the task graph they execute
pub struct Crew {
    executor: Executor,
}

impl Crew {
    pub fn builder(tools: ToolRegistry) -> CrewBuilder {
        CrewBuilder {
            tasks: TaskGraph::builder(),
            roster: Roster::new(),
            tools,
            settings: ExecutorSettings::default(),
            coordinator: None,
        }
    }

    pub fn graph(&self) -> &TaskGraph {
        self.executor.graph()
    }

    pub fn settings(&self) -> &ExecutorSettings {
        self.executor.settings()
    }

    /// Run the graph for `ctx`
    ///
    /// Clears the ticker's namespace first when `ctx.reset_memory` is set.
    /// Never panics or returns early with `Err`; every failure ends up in
    /// [`CrewOutput::error`].
    #[instrument(skip_all, fields(ticker = %ctx.ticker))]
    pub async fn kickoff(&self, ctx: &RunContext) -> CrewOutput {
        let started = Instant::now();
        let mut log = RunLog::new();
        log.info(format!(
            "research run {} started for {} ({}), {} mode",
            ctx.run_id,
            ctx.display_name(),
            ctx.ticker,
            self.settings().mode
        ));

        if ctx.reset_memory {
            if let Err(err) = ctx.store.reset(ctx.namespace()).await {
                log.warn(format!("could not clear context for {}: {err}", ctx.ticker));
                return CrewOutput::aborted(err, log, started);
            }
            log.info(format!("cleared stored context for {}", ctx.ticker));
        }

        let report = self.executor.run(ctx, log).await;
        let mut log = report.log;

        let failed_sink = self
            .graph()
            .sinks()
            .find_map(|sink| match report.results.iter().find(|r| r.task_id == sink.id) {
                Some(result) if result.is_success() => None,
                Some(result) => Some((
                    sink.id.clone(),
                    result
                        .error
                        .clone()
                        .unwrap_or_else(|| Error::Generic(format!("task '{}' {}", sink.id, result.status))),
                )),
                None => Some((
                    sink.id.clone(),
                    Error::Generic(format!("task '{}' never ran", sink.id)),
                )),
            });

        let error = match (report.run_error, failed_sink) {
            (Some(err), _) => Some(err),
            (None, Some((sink, err))) => {
                log.warn(format!("final task '{sink}' did not succeed: {err}"));
                Some(err)
            }
            (None, None) => None,
        };

        let document = report.results.iter().find_map(|r| match &r.output {
            Some(TaskOutput::Document(doc)) if r.is_success() => Some(doc.clone()),
            _ => None,
        });

        let success = error.is_none();
        let duration = started.elapsed();
        if success {
            log.info(format!("run finished in {:.1}s", duration.as_secs_f64()));
        }
        info!(success, waves = report.waves.len(), "Crew run finished");

        CrewOutput {
            success,
            document,
            results: report.results,
            waves: report.waves,
            log,
            duration,
            error,
        }
    }
}
