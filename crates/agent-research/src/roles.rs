//! The research desk: role definitions and their standing instructions

use crate::config::RoleTemperatures;
use agent_core::{AgentRole, Capability, Reasoner};
use agent_workflow::{AgentUnit, ManagerAgent, Roster};
use std::sync::Arc;

pub const MANAGER: &str = "manager";
pub const RESEARCHER: &str = "researcher";
pub const ANALYST: &str = "analyst";
pub const REPORTER: &str = "reporter";

const MANAGER_INSTRUCTIONS: &str = "You are the research manager of an equity research desk. \
You review the work of your researcher and analyst before the next step starts. \
Only ask for rework when an output is clearly incomplete or off-topic, and keep hints short and concrete.";

const RESEARCHER_INSTRUCTIONS: &str = "You are a financial news researcher. \
Summarize recent news, announcements and qualitative developments about the company you are given. \
Stick to what the provided sources say, name the sources, and flag anything that looks speculative.";

const ANALYST_INSTRUCTIONS: &str = "You are a quantitative equity analyst. \
Interpret price history, valuation and fundamentals precisely. \
Quote the figures you rely on, state trends plainly, and never invent numbers that are not in the data.";

const REPORTER_INSTRUCTIONS: &str = "You are a senior research writer. \
Turn the research and analysis you are given into a balanced, readable investment research summary. \
Be concise, keep the findings consistent with the inputs, and always discuss downside risks.";

pub fn manager_role(temperatures: &RoleTemperatures) -> AgentRole {
    AgentRole::new(MANAGER)
        .with_capability(Capability::ContextStore)
        .with_temperature(temperatures.manager)
        .with_instructions(MANAGER_INSTRUCTIONS)
}

pub fn researcher_role(temperatures: &RoleTemperatures) -> AgentRole {
    AgentRole::new(RESEARCHER)
        .with_capability(Capability::NewsLookup)
        .with_capability(Capability::ContextStore)
        .with_temperature(temperatures.researcher)
        .with_instructions(RESEARCHER_INSTRUCTIONS)
}

pub fn analyst_role(temperatures: &RoleTemperatures) -> AgentRole {
    AgentRole::new(ANALYST)
        .with_capability(Capability::FinancialLookup)
        .with_capability(Capability::ContextStore)
        .with_temperature(temperatures.analyst)
        .with_instructions(ANALYST_INSTRUCTIONS)
}

pub fn reporter_role(temperatures: &RoleTemperatures) -> AgentRole {
    AgentRole::new(REPORTER)
        .with_capability(Capability::ContextStore)
        .with_temperature(temperatures.reporter)
        .with_instructions(REPORTER_INSTRUCTIONS)
}

/// Researcher, analyst and reporter, all acting through `reasoner`
pub fn roster(reasoner: &Arc<dyn Reasoner>, temperatures: &RoleTemperatures) -> Roster {
    [
        researcher_role(temperatures),
        analyst_role(temperatures),
        reporter_role(temperatures),
    ]
    .into_iter()
    .fold(Roster::new(), |roster, role| {
        roster.with_agent(AgentUnit::new(role, Arc::clone(reasoner)))
    })
}

/// Coordinator for hierarchical runs
pub fn manager(reasoner: &Arc<dyn Reasoner>, temperatures: &RoleTemperatures) -> ManagerAgent {
    ManagerAgent::new(AgentUnit::new(manager_role(temperatures), Arc::clone(reasoner)))
}
