//! Interactive session manager
//!
//! One input line at a time: research a ticker, ask follow-up questions
//! answered from stored findings, inspect context and history. The
//! [`SessionState`] is owned by the caller and only mutated here.

mod command;
mod state;

pub use command::{Command, is_ticker};
pub use state::{HistoryEntry, MAX_HISTORY, SessionState};

use crate::session::{ResearchSession, RunRequest};
use agent_core::{Error, Result};
use comfy_table::Table;
use comfy_table::presets::UTF8_FULL;
use tracing::debug;

/// What the caller should show after a line
#[derive(Debug, Clone, PartialEq)]
pub enum Output {
    Text(String),
    /// The session ended
    Exit,
}

/// Interprets input lines against a [`ResearchSession`]
pub struct InteractiveSession {
    session: ResearchSession,
}

impl InteractiveSession {
    pub fn new(session: ResearchSession) -> Self {
        Self { session }
    }

    pub fn session(&self) -> &ResearchSession {
        &self.session
    }

    /// Prompt string reflecting the active ticker
    pub fn prompt(state: &SessionState) -> String {
        match state.active_ticker() {
            Some(ticker) => format!("finresearch [{ticker}]> "),
            None => "finresearch> ".to_string(),
        }
    }

    /// Process one line
    ///
    /// Errors leave `state` untouched: `NoActiveTicker` for `context`
    /// without a ticker while idle, `UnknownCommand` for input that is
    /// neither a command nor a ticker while idle.
    pub async fn handle(&self, state: &mut SessionState, line: &str) -> Result<Output> {
        let command = Command::parse(line)?;
        debug!(?command, "Handling interactive command");

        match command {
            Command::Research { ticker } => {
                state.activate(ticker.clone());
                let outcome = self.session.run(RunRequest::new(ticker.clone())).await;

                let text = match outcome.report_markdown() {
                    Some(report) if outcome.success => report,
                    _ => format!(
                        "Research for {ticker} failed: {}\n\n{}",
                        outcome
                            .error
                            .as_ref()
                            .map_or_else(|| "unknown error".to_string(), ToString::to_string),
                        outcome.log_entries.join("\n")
                    ),
                };
                let summary = match &outcome.error {
                    None => format!("report ready in {:.1}s", outcome.duration.as_secs_f64()),
                    Some(err) => err.kind().to_string(),
                };
                state.record(line.trim(), Some(ticker), outcome.success, summary);
                Ok(Output::Text(text))
            }
            Command::FollowUp { text } => {
                let Some(ticker) = state.active_ticker().map(str::to_string) else {
                    return Err(Error::UnknownCommand(text));
                };
                let answer = self.session.follow_up(&ticker, &text).await?;
                state.record(text, Some(ticker), true, "follow-up answered");
                Ok(Output::Text(answer))
            }
            Command::Context { ticker } => {
                let ticker = ticker
                    .or_else(|| state.active_ticker().map(str::to_string))
                    .ok_or(Error::NoActiveTicker)?;
                let records = self.session.context(&ticker).await?;
                if records.is_empty() {
                    return Ok(Output::Text(format!("No stored context for {ticker}.")));
                }
                let lines: Vec<String> = records
                    .iter()
                    .map(|r| {
                        format!(
                            "#{} [{}] {} {}",
                            r.sequence,
                            r.source_role,
                            r.timestamp.format("%Y-%m-%d %H:%M"),
                            r.preview(160)
                        )
                    })
                    .collect();
                Ok(Output::Text(format!(
                    "{} record(s) for {ticker}:\n{}",
                    records.len(),
                    lines.join("\n")
                )))
            }
            Command::Status => Ok(Output::Text(status_table(state))),
            Command::Clear { memory } => {
                let mut text = "Session cleared.".to_string();
                if memory && let Some(ticker) = state.active_ticker() {
                    self.session.reset(ticker).await?;
                    text = format!("Session cleared; stored context for {ticker} removed.");
                }
                state.clear();
                Ok(Output::Text(text))
            }
            Command::Help => Ok(Output::Text(Command::help_text().to_string())),
            Command::Exit => Ok(Output::Exit),
        }
    }
}

fn status_table(state: &SessionState) -> String {
    let active = state.active_ticker().unwrap_or("none");
    if state.history_len() == 0 {
        return format!("Active ticker: {active}\nNo commands yet.");
    }

    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_header(vec!["Time", "Command", "Ticker", "Result"]);
    for entry in state.history() {
        table.add_row(vec![
            entry.at.format("%H:%M:%S").to_string(),
            entry.command.clone(),
            entry.ticker.clone().unwrap_or_default(),
            format!("{} {}", if entry.success { "ok" } else { "failed" }, entry.summary),
        ]);
    }
    format!("Active ticker: {active}\n{table}")
}
