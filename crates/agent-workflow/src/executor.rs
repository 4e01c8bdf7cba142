//! Wave executor with join barriers, timeouts and failure propagation

use crate::agent::{Roster, TaskInput};
use crate::context::RunContext;
use crate::graph::TaskGraph;
use crate::manager::{CompletedTask, Coordinator, DelegationMode, Directive, ReadyTask, ReviewRequest};
use crate::plan::{Wave, next_wave};
use crate::run_log::RunLog;
use crate::synthesizer::assemble;
use crate::task::{TaskId, TaskKind, TaskOutput, TaskResult, TaskStatus};
use agent_core::{Error, Result, Sequence};
use agent_tools::ToolRegistry;
use futures::future::join_all;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, instrument};

/// Limits and mode for one executor
#[derive(Debug, Clone, PartialEq)]
pub struct ExecutorSettings {
    pub mode: DelegationMode,
    pub task_timeout: Duration,
    pub run_timeout: Duration,
    /// Coordinator consultations per run
    pub max_delegation_rounds: usize,
}

impl Default for ExecutorSettings {
    fn default() -> Self {
        Self {
            mode: DelegationMode::Hierarchical,
            task_timeout: Duration::from_secs(180),
            run_timeout: Duration::from_secs(600),
            max_delegation_rounds: 3,
        }
    }
}

/// Everything one graph execution produced
#[derive(Debug, Clone)]
pub struct ExecutionReport {
    /// Results in declaration order
    pub results: Vec<TaskResult>,
    /// Waves as dispatched
    pub waves: Vec<Wave>,
    pub log: RunLog,
    /// Run-level failure (timeout or storage), independent of task results
    pub run_error: Option<Error>,
    pub elapsed: Duration,
}

impl ExecutionReport {
    pub fn result(&self, id: &str) -> Option<&TaskResult> {
        self.results.iter().find(|r| r.task_id.as_str() == id)
    }
}

struct RunState {
    started: Instant,
    done: HashSet<TaskId>,
    results: HashMap<TaskId, TaskResult>,
    hints: HashMap<TaskId, String>,
    redone: HashSet<TaskId>,
    waves: Vec<Wave>,
    in_flight: Vec<TaskId>,
    log: RunLog,
}

impl RunState {
    fn new(log: RunLog) -> Self {
        Self {
            started: Instant::now(),
            done: HashSet::new(),
            results: HashMap::new(),
            hints: HashMap::new(),
            redone: HashSet::new(),
            waves: Vec::new(),
            in_flight: Vec::new(),
            log,
        }
    }
}

/// Runs a [`TaskGraph`] wave by wave
///
/// Every task of a wave is dispatched concurrently and the next wave
/// starts only after all of them are terminal. Store reads during a wave
/// see only records committed before it started.
pub struct Executor {
    graph: Arc<TaskGraph>,
    roster: Arc<Roster>,
    tools: ToolRegistry,
    settings: ExecutorSettings,
    coordinator: Option<Arc<dyn Coordinator>>,
}

impl Executor {
    pub fn new(graph: Arc<TaskGraph>, roster: Arc<Roster>, tools: ToolRegistry) -> Self {
        Self {
            graph,
            roster,
            tools,
            settings: ExecutorSettings::default(),
            coordinator: None,
        }
    }

    pub fn with_settings(mut self, settings: ExecutorSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Coordinator consulted before each wave in hierarchical mode
    pub fn with_coordinator(mut self, coordinator: Arc<dyn Coordinator>) -> Self {
        self.coordinator = Some(coordinator);
        self
    }

    pub fn graph(&self) -> &TaskGraph {
        &self.graph
    }

    pub fn settings(&self) -> &ExecutorSettings {
        &self.settings
    }

    /// Execute the graph against `ctx`, appending to `log`
    #[instrument(skip_all, fields(run_id = %ctx.run_id, ticker = %ctx.ticker, mode = %self.settings.mode))]
    pub async fn run(&self, ctx: &RunContext, log: RunLog) -> ExecutionReport {
        let mut state = RunState::new(log);

        let outcome = tokio::time::timeout(self.settings.run_timeout, self.drive(ctx, &mut state)).await;
        let run_error = match outcome {
            Ok(Ok(())) => None,
            Ok(Err(err)) => {
                state.log.warn(format!("run aborted: {err}"));
                Some(err)
            }
            Err(_) => {
                let err = Error::timeout("run", self.settings.run_timeout);
                let now = state.started.elapsed();
                for id in std::mem::take(&mut state.in_flight) {
                    state.log.warn(format!("task '{id}' cancelled by run timeout"));
                    state
                        .results
                        .insert(id.clone(), TaskResult::failed(id, err.clone()).timed(now, now));
                }
                state.log.warn(format!("{err}"));
                Some(err)
            }
        };

        let mut results: Vec<TaskResult> = state.results.into_values().collect();
        results.sort_by_key(|r| self.graph.position(&r.task_id));

        ExecutionReport {
            results,
            waves: state.waves,
            log: state.log,
            run_error,
            elapsed: state.started.elapsed(),
        }
    }

    async fn drive(&self, ctx: &RunContext, state: &mut RunState) -> Result<()> {
        match self.settings.mode {
            DelegationMode::Sequential => {
                for wave in self.graph.plan().waves() {
                    self.run_wave(ctx, wave.clone(), state).await?;
                }
            }
            DelegationMode::Hierarchical => {
                let mut rounds = 0;
                while let Some(mut wave) = next_wave(&self.graph, &state.done) {
                    if let Some(coordinator) = &self.coordinator
                        && rounds < self.settings.max_delegation_rounds
                    {
                        rounds += 1;
                        wave = self.consult(coordinator.as_ref(), ctx, wave, state, rounds).await;
                    }
                    self.run_wave(ctx, wave, state).await?;
                }
            }
        }
        Ok(())
    }

    async fn consult(
        &self,
        coordinator: &dyn Coordinator,
        ctx: &RunContext,
        wave: Wave,
        state: &mut RunState,
        round: usize,
    ) -> Wave {
        let request = self.review_request(ctx, &wave, state, round);
        let directives = match coordinator.review(&request).await {
            Ok(directives) => directives,
            Err(err) => {
                state.log.warn(format!("coordinator review failed, keeping plan: {err}"));
                return wave;
            }
        };

        let mut redo_applied = false;
        let mut deferred = HashSet::new();
        for directive in directives {
            match directive {
                Directive::Redo { task, hint } => {
                    if self.can_redo(&task, state) {
                        state.log.warn(format!("coordinator re-dispatches '{task}': {hint}"));
                        state.done.remove(&task);
                        state.results.remove(&task);
                        state.redone.insert(task.clone());
                        state.hints.insert(task, hint);
                        redo_applied = true;
                    } else {
                        state.log.info(format!("coordinator redo of '{task}' ignored"));
                    }
                }
                Directive::Defer(task) => {
                    deferred.insert(task);
                }
            }
        }

        let ready = if redo_applied {
            next_wave(&self.graph, &state.done).unwrap_or_default()
        } else {
            wave
        };
        let kept: Wave = ready.iter().filter(|id| !deferred.contains(*id)).cloned().collect();

        if kept.is_empty() {
            if !deferred.is_empty() {
                state.log.info("coordinator deferred every ready task; deferral ignored");
            }
            ready
        } else {
            if kept.len() < ready.len() {
                let held: Vec<&str> = ready
                    .iter()
                    .filter(|id| deferred.contains(*id))
                    .map(TaskId::as_str)
                    .collect();
                state.log.info(format!("coordinator deferred: {}", held.join(", ")));
            }
            kept
        }
    }

    fn can_redo(&self, task: &TaskId, state: &RunState) -> bool {
        state.results.contains_key(task)
            && !state.redone.contains(task)
            && self
                .graph
                .dependents(task)
                .iter()
                .all(|d| !state.done.contains(d))
    }

    fn review_request(&self, ctx: &RunContext, wave: &Wave, state: &RunState, round: usize) -> ReviewRequest {
        let ready = wave
            .iter()
            .filter_map(|id| self.graph.get(id))
            .map(|t| ReadyTask {
                id: t.id.clone(),
                depends_on: t.depends_on.clone(),
            })
            .collect();

        let completed = self
            .graph
            .tasks()
            .iter()
            .filter_map(|t| state.results.get(&t.id))
            .map(|r| {
                let text = r.output.as_ref().map(TaskOutput::as_text).unwrap_or_default();
                CompletedTask {
                    id: r.task_id.clone(),
                    status: r.status,
                    output_chars: text.chars().filter(|c| !c.is_whitespace()).count(),
                    preview: text.chars().take(300).collect(),
                    redone: state.redone.contains(&r.task_id),
                }
            })
            .collect();

        ReviewRequest {
            round,
            ticker: ctx.ticker.clone(),
            ready,
            completed,
        }
    }

    async fn run_wave(&self, ctx: &RunContext, wave: Wave, state: &mut RunState) -> Result<()> {
        if wave.is_empty() {
            return Ok(());
        }
        let number = state.waves.len() + 1;
        let names: Vec<&str> = wave.iter().map(TaskId::as_str).collect();
        state.log.info(format!("wave {number} dispatched: {}", names.join(", ")));

        let watermark = ctx.store.watermark().await?;
        state.in_flight.clone_from(&wave);

        let outcomes = {
            let results = &state.results;
            let hints = &state.hints;
            let started = state.started;
            join_all(wave.iter().map(|id| {
                self.dispatch(ctx, id, results, hints.get(id).map(String::as_str), watermark, started)
            }))
            .await
        };

        for result in outcomes {
            match result.status {
                TaskStatus::Succeeded if result.degraded => state.log.warn(format!(
                    "task '{}' succeeded with degraded inputs in {:.1}s",
                    result.task_id,
                    result.elapsed().as_secs_f64()
                )),
                TaskStatus::Succeeded => state.log.info(format!(
                    "task '{}' succeeded in {:.1}s",
                    result.task_id,
                    result.elapsed().as_secs_f64()
                )),
                status => state.log.warn(format!(
                    "task '{}' {status}: {}",
                    result.task_id,
                    result.error.as_ref().map(ToString::to_string).unwrap_or_default()
                )),
            }
            state.done.insert(result.task_id.clone());
            state.results.insert(result.task_id.clone(), result);
        }

        state.in_flight.clear();
        state.waves.push(wave);
        Ok(())
    }

    async fn dispatch(
        &self,
        ctx: &RunContext,
        id: &TaskId,
        results: &HashMap<TaskId, TaskResult>,
        hint: Option<&str>,
        watermark: Sequence,
        run_started: Instant,
    ) -> TaskResult {
        let started_at = run_started.elapsed();
        let finish = |result: TaskResult| result.timed(started_at, run_started.elapsed());

        let Some(task) = self.graph.get(id) else {
            return finish(TaskResult::failed(
                id.clone(),
                Error::Configuration(format!("task '{id}' is not in the graph")),
            ));
        };

        let failed_dep = task
            .depends_on
            .iter()
            .find(|d| results.get(*d).is_none_or(|r| !r.is_success()));
        if let Some(dep) = failed_dep {
            if let Some(fallback) = &task.fallback {
                let mut result = TaskResult::succeeded(id.clone(), TaskOutput::Text(fallback.clone()));
                result.degraded = true;
                return finish(result);
            }
            if !task.tolerate_failed_dependencies {
                debug!(task = %id, dependency = %dep, "Skipping task");
                return finish(TaskResult::skipped(id.clone(), dep));
            }
        }

        let Some(agent) = self.roster.get(&task.role) else {
            return finish(TaskResult::failed(
                id.clone(),
                Error::Configuration(format!("role '{}' is not registered", task.role)),
            ));
        };

        let upstream: BTreeMap<String, String> = task
            .depends_on
            .iter()
            .map(|dep| {
                let text = match results.get(dep) {
                    Some(r) if r.is_success() => r.output.as_ref().map(TaskOutput::as_text).unwrap_or_default(),
                    Some(r) => format!(
                        "[unavailable: {}]",
                        r.error.as_ref().map(ToString::to_string).unwrap_or_default()
                    ),
                    None => "[unavailable]".to_string(),
                };
                (dep.to_string(), text)
            })
            .collect();
        let input = TaskInput::new(&ctx.ticker, ctx.display_name())
            .with_upstream(upstream)
            .with_hint(hint.unwrap_or_default());
        let toolbox = self.tools.toolbox(agent.role(), ctx.namespace(), Some(watermark));

        info!(task = %id, role = %task.role, "Dispatching task");
        let work = async {
            let output = agent.execute(task, &input, &toolbox).await?;
            match &task.kind {
                TaskKind::Agent => Ok(output),
                TaskKind::Synthesis(layout) => {
                    assemble(layout, ctx.display_name(), &ctx.ticker, &output, results)
                        .map(TaskOutput::Document)
                }
            }
        };

        let mut result = match tokio::time::timeout(self.settings.task_timeout, work).await {
            Ok(Ok(output)) => TaskResult::succeeded(id.clone(), output),
            Ok(Err(err)) => TaskResult::failed(id.clone(), err),
            Err(_) => TaskResult::failed(
                id.clone(),
                Error::timeout(format!("task '{id}'"), self.settings.task_timeout),
            ),
        };
        result.degraded = result.is_success() && failed_dep.is_some();
        finish(result)
    }
}
