//! Wave planning over a task graph

use crate::graph::TaskGraph;
use crate::task::TaskId;
use std::collections::HashSet;

/// A set of tasks dispatched together, in declaration order
pub type Wave = Vec<TaskId>;

/// The next wave given which tasks are already terminal
///
/// A task is ready when it is not done and all its dependencies are. If
/// the earliest-declared ready task is not concurrency-eligible it runs
/// alone; otherwise the wave is every ready concurrency-eligible task.
/// Returns `None` when nothing is ready.
pub fn next_wave(graph: &TaskGraph, done: &HashSet<TaskId>) -> Option<Wave> {
    let ready: Vec<_> = graph
        .tasks()
        .iter()
        .filter(|t| !done.contains(&t.id) && t.depends_on.iter().all(|d| done.contains(d)))
        .collect();

    let first = ready.first()?;
    if !first.concurrent {
        return Some(vec![first.id.clone()]);
    }

    Some(
        ready
            .iter()
            .filter(|t| t.concurrent)
            .map(|t| t.id.clone())
            .collect(),
    )
}

/// Static plan: waves computed once from declared dependencies
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionPlan {
    waves: Vec<Wave>,
}

impl ExecutionPlan {
    pub(crate) fn compute(graph: &TaskGraph) -> Self {
        let mut done = HashSet::new();
        let mut waves = Vec::new();

        while let Some(wave) = next_wave(graph, &done) {
            done.extend(wave.iter().cloned());
            waves.push(wave);
        }

        Self { waves }
    }

    pub fn waves(&self) -> &[Wave] {
        &self.waves
    }

    /// Every task in dispatch order
    pub fn order(&self) -> impl Iterator<Item = &TaskId> {
        self.waves.iter().flatten()
    }

    /// Zero-based wave index of a task
    pub fn wave_of(&self, id: &TaskId) -> Option<usize> {
        self.waves.iter().position(|w| w.contains(id))
    }
}
