//! Transient state of one interactive session

use chrono::{DateTime, Utc};
use std::collections::VecDeque;

/// Entries kept before the oldest is dropped
pub const MAX_HISTORY: usize = 50;

/// One processed command
#[derive(Debug, Clone, PartialEq)]
pub struct HistoryEntry {
    pub at: DateTime<Utc>,
    pub command: String,
    pub ticker: Option<String>,
    pub success: bool,
    pub summary: String,
}

/// Active ticker plus bounded command history; never persisted
#[derive(Debug, Clone, Default)]
pub struct SessionState {
    active_ticker: Option<String>,
    history: VecDeque<HistoryEntry>,
}

impl SessionState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn active_ticker(&self) -> Option<&str> {
        self.active_ticker.as_deref()
    }

    pub fn is_idle(&self) -> bool {
        self.active_ticker.is_none()
    }

    pub fn activate(&mut self, ticker: impl Into<String>) {
        self.active_ticker = Some(ticker.into());
    }

    pub fn history(&self) -> impl Iterator<Item = &HistoryEntry> {
        self.history.iter()
    }

    pub fn history_len(&self) -> usize {
        self.history.len()
    }

    pub fn record(
        &mut self,
        command: impl Into<String>,
        ticker: Option<String>,
        success: bool,
        summary: impl Into<String>,
    ) {
        if self.history.len() == MAX_HISTORY {
            self.history.pop_front();
        }
        self.history.push_back(HistoryEntry {
            at: Utc::now(),
            command: command.into(),
            ticker,
            success,
            summary: summary.into(),
        });
    }

    /// Back to idle with an empty history
    pub fn clear(&mut self) {
        self.active_ticker = None;
        self.history.clear();
    }
}
