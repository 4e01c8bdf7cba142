//! Agent execution unit and role roster

use crate::task::{OutputShape, TaskOutput, TaskSpec, ToolRequest};
use agent_core::{AgentRole, Capability, Error, Reasoner, ReasoningRequest, Result};
use agent_prompt::PromptBuilder;
use agent_tools::{PriceSummary, ToolBox};
use regex::Regex;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::sync::{Arc, LazyLock};
use tracing::{debug, warn};

static FENCED_JSON: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"(?s)```(?:json)?\s*(\{.*\})\s*```").ok());

/// Inputs resolved for one task execution
#[derive(Debug, Clone, Default)]
pub struct TaskInput {
    /// Template variables (`ticker`, `company_name`, `upstream`, `hint`)
    pub variables: Map<String, Value>,
}

impl TaskInput {
    pub fn new(ticker: &str, company_name: &str) -> Self {
        let mut variables = Map::new();
        variables.insert("ticker".to_string(), Value::from(ticker));
        variables.insert("company_name".to_string(), Value::from(company_name));
        variables.insert("upstream".to_string(), Value::Object(Map::new()));
        variables.insert("hint".to_string(), Value::from(""));
        Self { variables }
    }

    /// Upstream outputs by task id, as text
    pub fn with_upstream(mut self, upstream: BTreeMap<String, String>) -> Self {
        let map = upstream.into_iter().map(|(k, v)| (k, Value::from(v))).collect();
        self.variables.insert("upstream".to_string(), Value::Object(map));
        self
    }

    /// Guidance from the coordinator for a re-dispatched task
    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.variables.insert("hint".to_string(), Value::from(hint.into()));
        self
    }
}

/// One role plus the reasoning capability that acts for it
#[derive(Clone)]
pub struct AgentUnit {
    role: AgentRole,
    reasoner: Arc<dyn Reasoner>,
}

impl AgentUnit {
    pub fn new(role: AgentRole, reasoner: Arc<dyn Reasoner>) -> Self {
        Self { role, reasoner }
    }

    pub fn role(&self) -> &AgentRole {
        &self.role
    }

    /// Check every capability the task needs before touching anything
    fn preflight(&self, task: &TaskSpec) -> Result<()> {
        for request in &task.tools {
            self.role.ensure(request.capability())?;
        }
        if task.publish {
            self.role.ensure(Capability::ContextStore)?;
        }
        Ok(())
    }

    /// Run one task: gather inputs through `toolbox`, reason once, retry once
    /// on invalid output, publish if asked
    pub async fn execute(
        &self,
        task: &TaskSpec,
        input: &TaskInput,
        toolbox: &ToolBox,
    ) -> Result<TaskOutput> {
        self.preflight(task)?;

        let rendered = task.template.render(&Value::Object(input.variables.clone()))?;
        let gathered = gather(task, toolbox).await?;
        let hint = input
            .variables
            .get("hint")
            .and_then(Value::as_str)
            .unwrap_or_default();
        let prompt = PromptBuilder::new()
            .text(rendered)
            .newline()
            .data_section("Coordinator Guidance", hint)
            .text(gathered)
            .text(format_instructions(&task.output))
            .build();

        let output = self.reason_validated(task, &prompt).await?;

        if task.publish {
            let id = toolbox
                .remember(&format!("[{}] {}", task.id, output.as_text()))
                .await?;
            debug!(task = %task.id, record = %id, "Published task output");
        }

        Ok(output)
    }

    async fn reason_validated(&self, task: &TaskSpec, prompt: &str) -> Result<TaskOutput> {
        let first = self.reason(prompt).await;
        let problem = match first {
            Ok(text) => match validate_output(&task.output, &text) {
                Ok(output) => return Ok(output),
                Err(problem) => problem,
            },
            Err(Error::ReasoningFailure(problem)) => problem,
            Err(other) => return Err(other),
        };

        warn!(task = %task.id, role = %self.role.name, %problem, "Invalid reasoning output, retrying once");
        let retry_prompt = PromptBuilder::new()
            .text(prompt)
            .section("Previous attempt was invalid")
            .text(format!(
                "Your previous answer was rejected: {problem}. Produce a complete answer in the required format.\n"
            ))
            .build();

        let text = self.reason(&retry_prompt).await?;
        validate_output(&task.output, &text).map_err(|problem| {
            Error::ReasoningFailure(format!("task '{}' output invalid after retry: {problem}", task.id))
        })
    }

    /// One reasoning step as this role, without output validation
    pub async fn reason(&self, prompt: &str) -> Result<String> {
        self.reasoner
            .reason(ReasoningRequest {
                role: self.role.name.clone(),
                instructions: self.role.instructions.clone(),
                prompt: prompt.to_string(),
                temperature: self.role.temperature,
            })
            .await
    }
}

async fn gather(task: &TaskSpec, toolbox: &ToolBox) -> Result<String> {
    let mut builder = PromptBuilder::new();

    for request in &task.tools {
        builder = match request {
            ToolRequest::PriceHistory(range) => {
                let points = toolbox.price_history(*range).await?;
                let body = PriceSummary::from_points(&points)
                    .map(|s| s.to_markdown())
                    .unwrap_or_default();
                builder.data_section(format!("Price History ({range})"), body)
            }
            ToolRequest::Fundamentals => {
                let fundamentals = toolbox.fundamentals().await?;
                builder.data_section("Fundamentals", fundamentals.to_markdown())
            }
            ToolRequest::NewsSearch {
                keywords,
                max_results,
            } => {
                let articles = toolbox.search_news(keywords, *max_results).await?;
                let body: String = articles.iter().map(|a| a.to_markdown()).collect();
                builder.data_section("Recent News", body)
            }
            ToolRequest::Recall { topic, limit } => {
                let records = toolbox.recall(topic, *limit).await?;
                let body: String = records
                    .iter()
                    .map(|r| format!("- ({}) {}\n", r.source_role, r.content))
                    .collect();
                builder.data_section("Prior Findings", body)
            }
        };
    }

    Ok(builder.build())
}

fn format_instructions(shape: &OutputShape) -> String {
    match shape {
        OutputShape::Text => String::new(),
        OutputShape::Structured { required_fields } => format!(
            "\nRespond with a single JSON object containing the string fields: {}.\n",
            required_fields.join(", ")
        ),
    }
}

/// The first JSON object in `text`, fenced or bare
pub(crate) fn extract_json(text: &str) -> Option<Map<String, Value>> {
    let fenced = FENCED_JSON
        .as_ref()
        .and_then(|re| re.captures(text))
        .and_then(|c| c.get(1))
        .map(|m| m.as_str());

    let candidate = fenced.or_else(|| {
        let start = text.find('{')?;
        let end = text.rfind('}')?;
        (start < end).then(|| &text[start..=end])
    })?;

    match serde_json::from_str::<Value>(candidate).ok()? {
        Value::Object(map) => Some(map),
        _ => None,
    }
}

fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.trim().is_empty(),
        Value::Array(items) => items.is_empty(),
        Value::Object(map) => map.is_empty(),
        _ => false,
    }
}

/// Check reasoning output against the declared shape
pub(crate) fn validate_output(shape: &OutputShape, text: &str) -> std::result::Result<TaskOutput, String> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err("output was empty".to_string());
    }

    match shape {
        OutputShape::Text => Ok(TaskOutput::Text(trimmed.to_string())),
        OutputShape::Structured { required_fields } => {
            let map = extract_json(trimmed).ok_or_else(|| "output was not a JSON object".to_string())?;
            let missing: Vec<&str> = required_fields
                .iter()
                .filter(|f| map.get(f.as_str()).is_none_or(is_blank))
                .map(String::as_str)
                .collect();
            if missing.is_empty() {
                Ok(TaskOutput::Structured(map))
            } else {
                Err(format!("missing field(s): {}", missing.join(", ")))
            }
        }
    }
}

/// Agents available to a graph, keyed by role name
#[derive(Clone, Default)]
pub struct Roster {
    agents: BTreeMap<String, AgentUnit>,
}

impl Roster {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an agent; a later agent with the same role name replaces it
    pub fn with_agent(mut self, agent: AgentUnit) -> Self {
        self.agents.insert(agent.role.name.clone(), agent);
        self
    }

    pub fn get(&self, role: &str) -> Option<&AgentUnit> {
        self.agents.get(role)
    }

    pub fn contains(&self, role: &str) -> bool {
        self.agents.contains_key(role)
    }

    pub fn roles(&self) -> impl Iterator<Item = &AgentRole> {
        self.agents.values().map(AgentUnit::role)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use agent_core::ContextStore;
    use agent_memory::InMemoryContextStore;
    use agent_prompt::PromptTemplate;
    use agent_tools::ToolRegistry;
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    /// Replies from a script, recording prompts
    struct Scripted {
        replies: Mutex<VecDeque<Result<String>>>,
        prompts: Mutex<Vec<String>>,
    }

    impl Scripted {
        fn new(replies: Vec<Result<&str>>) -> Arc<Self> {
            Arc::new(Self {
                replies: Mutex::new(replies.into_iter().map(|r| r.map(str::to_string)).collect()),
                prompts: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl Reasoner for Scripted {
        async fn reason(&self, request: ReasoningRequest) -> Result<String> {
            self.prompts.lock().unwrap().push(request.prompt);
            self.replies
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Ok(String::new()))
        }

        fn name(&self) -> &str {
            "scripted"
        }
    }

    fn registry() -> ToolRegistry {
        ToolRegistry::new(Arc::new(InMemoryContextStore::new()))
    }

    fn task(template: &str) -> TaskSpec {
        TaskSpec::new("research", "researcher", PromptTemplate::new("research", template).unwrap())
    }

    fn researcher() -> AgentRole {
        AgentRole::new("researcher")
            .with_capability(Capability::NewsLookup)
            .with_capability(Capability::ContextStore)
    }

    #[tokio::test]
    async fn test_renders_and_publishes() {
        let reasoner = Scripted::new(vec![Ok("Apple shipped a new phone.")]);
        let unit = AgentUnit::new(researcher(), reasoner.clone());
        let registry = registry();
        let toolbox = registry.toolbox(unit.role(), "AAPL", None);

        let spec = task("Research {{ company_name }} ({{ ticker }})").publish();
        let output = unit
            .execute(&spec, &TaskInput::new("AAPL", "Apple"), &toolbox)
            .await
            .unwrap();

        assert_eq!(output, TaskOutput::Text("Apple shipped a new phone.".to_string()));
        assert!(reasoner.prompts.lock().unwrap()[0].starts_with("Research Apple (AAPL)"));

        let records = registry.store().records("AAPL").await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].content, "[research] Apple shipped a new phone.");
    }

    #[tokio::test]
    async fn test_capability_violation_fails_before_reasoning() {
        let reasoner = Scripted::new(vec![Ok("unused")]);
        let unit = AgentUnit::new(researcher(), reasoner.clone());
        let registry = registry();
        let toolbox = registry.toolbox(unit.role(), "AAPL", None);

        let spec = task("x").with_tool(ToolRequest::Fundamentals);
        let err = unit
            .execute(&spec, &TaskInput::new("AAPL", "Apple"), &toolbox)
            .await
            .unwrap_err();

        assert_eq!(err.kind(), "capability_violation");
        assert!(reasoner.prompts.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_invalid_output_retried_with_hint() {
        let reasoner = Scripted::new(vec![Ok("not json"), Ok(r#"{"summary": "Fine."}"#)]);
        let unit = AgentUnit::new(researcher(), reasoner.clone());
        let registry = registry();
        let toolbox = registry.toolbox(unit.role(), "AAPL", None);

        let spec = task("Summarize").structured(&["summary"]);
        let output = unit
            .execute(&spec, &TaskInput::new("AAPL", "Apple"), &toolbox)
            .await
            .unwrap();

        assert_eq!(output.field("summary"), Some("Fine."));
        let prompts = reasoner.prompts.lock().unwrap();
        assert_eq!(prompts.len(), 2);
        assert!(prompts[1].contains("Previous attempt was invalid"));
    }

    #[tokio::test]
    async fn test_second_invalid_output_fails() {
        let reasoner = Scripted::new(vec![Ok(""), Err(Error::ReasoningFailure("empty".to_string()))]);
        let unit = AgentUnit::new(researcher(), reasoner);
        let registry = registry();
        let toolbox = registry.toolbox(unit.role(), "AAPL", None);

        let err = unit
            .execute(&task("x"), &TaskInput::new("AAPL", "Apple"), &toolbox)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "reasoning_failure");
    }

    #[test]
    fn test_validate_structured() {
        let shape = OutputShape::Structured {
            required_fields: vec!["summary".to_string(), "risk_assessment".to_string()],
        };

        let fenced = "Here you go:\n```json\n{\"summary\": \"a\", \"risk_assessment\": \"b\"}\n```";
        assert!(validate_output(&shape, fenced).is_ok());

        let err = validate_output(&shape, r#"{"summary": "a", "risk_assessment": "  "}"#).unwrap_err();
        assert_eq!(err, "missing field(s): risk_assessment");

        assert!(validate_output(&shape, "[1, 2]").is_err());
        assert!(validate_output(&OutputShape::Text, " \n ").is_err());
    }

    #[test]
    fn test_input_variables() {
        let mut upstream = BTreeMap::new();
        upstream.insert("research".to_string(), "news".to_string());
        let input = TaskInput::new("MSFT", "Microsoft")
            .with_upstream(upstream)
            .with_hint("be thorough");

        assert_eq!(input.variables["upstream"]["research"], "news");
        assert_eq!(input.variables["hint"], "be thorough");
    }

    #[test]
    fn test_roster_lookup() {
        let roster = Roster::new().with_agent(AgentUnit::new(researcher(), Scripted::new(vec![])));
        assert!(roster.contains("researcher"));
        assert!(roster.get("analyst").is_none());
        assert_eq!(roster.roles().count(), 1);
    }
}
