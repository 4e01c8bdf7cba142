//! Orchestration session: the `run` boundary callers invoke

use crate::config::ResearchConfig;
use crate::pipeline;
use crate::roles;
use agent_core::{ContextRecord, ContextStore, Error, Reasoner, Result};
use agent_llm::LlmReasoner;
use agent_llm::providers::{OpenAIConfig, OpenAIProvider};
use agent_prompt::PromptBuilder;
use agent_tools::{
    FinancialDataProvider, FinnhubNewsProvider, NewsProvider, ToolRegistry, YahooFinanceProvider,
};
use agent_workflow::{
    AgentUnit, Crew, CrewOutput, DelegationMode, ReportDocument, RunContext, TaskStatus,
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

/// One research invocation
#[derive(Debug, Clone, PartialEq)]
pub struct RunRequest {
    pub ticker: String,
    pub company_name: Option<String>,
    /// Falls back to the configured mode
    pub mode: Option<DelegationMode>,
    pub reset_memory: bool,
}

impl RunRequest {
    pub fn new(ticker: impl Into<String>) -> Self {
        Self {
            ticker: ticker.into(),
            company_name: None,
            mode: None,
            reset_memory: false,
        }
    }

    pub fn with_company_name(mut self, name: impl Into<String>) -> Self {
        self.company_name = Some(name.into());
        self
    }

    pub fn with_mode(mut self, mode: DelegationMode) -> Self {
        self.mode = Some(mode);
        self
    }

    pub fn with_reset_memory(mut self, reset: bool) -> Self {
        self.reset_memory = reset;
        self
    }
}

/// Per-task line of a run outcome
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TaskSummary {
    pub task: String,
    pub status: TaskStatus,
    pub degraded: bool,
    pub elapsed_seconds: f64,
    pub error: Option<String>,
}

/// Everything a run produced
#[derive(Debug, Clone)]
pub struct RunOutcome {
    pub ticker: String,
    pub success: bool,
    pub document: Option<ReportDocument>,
    pub log_entries: Vec<String>,
    pub duration: Duration,
    pub error: Option<Error>,
    pub task_summaries: Vec<TaskSummary>,
}

impl RunOutcome {
    fn rejected(ticker: &str, error: Error) -> Self {
        Self {
            ticker: ticker.to_string(),
            success: false,
            document: None,
            log_entries: vec![format!("run rejected: {error}")],
            duration: Duration::ZERO,
            error: Some(error),
            task_summaries: Vec::new(),
        }
    }

    fn from_crew(ticker: &str, output: CrewOutput) -> Self {
        let task_summaries = output
            .results
            .iter()
            .map(|r| TaskSummary {
                task: r.task_id.to_string(),
                status: r.status,
                degraded: r.degraded,
                elapsed_seconds: r.elapsed().as_secs_f64(),
                error: r.error.as_ref().map(ToString::to_string),
            })
            .collect();

        Self {
            ticker: ticker.to_string(),
            success: output.success,
            document: output.document,
            log_entries: output.log.lines(),
            duration: output.duration,
            error: output.error,
            task_summaries,
        }
    }

    pub fn report_markdown(&self) -> Option<String> {
        self.document.as_ref().map(ReportDocument::to_markdown)
    }

    /// Flat record for remote callers
    pub fn to_report(&self) -> RunReport {
        RunReport {
            success: self.success,
            report: self.report_markdown(),
            logs: self.log_entries.clone(),
            duration_seconds: (!self.duration.is_zero()).then(|| self.duration.as_secs_f64()),
            error: self.error.as_ref().map(ToString::to_string),
        }
    }
}

/// Serialized run result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunReport {
    pub success: bool,
    pub report: Option<String>,
    pub logs: Vec<String>,
    pub duration_seconds: Option<f64>,
    pub error: Option<String>,
}

/// Long-lived research service: configuration, store, collaborators and
/// the reasoning backend shared by every run
pub struct ResearchSession {
    config: ResearchConfig,
    store: Arc<dyn ContextStore>,
    tools: ToolRegistry,
    reasoner: Arc<dyn Reasoner>,
}

impl ResearchSession {
    /// Session over `store` with no lookup providers registered
    pub fn new(config: ResearchConfig, reasoner: Arc<dyn Reasoner>, store: Arc<dyn ContextStore>) -> Self {
        let tools = ToolRegistry::new(Arc::clone(&store))
            .with_retry_policy(config.retry_policy())
            .with_call_timeout(config.tool_timeout);
        Self {
            config,
            store,
            tools,
            reasoner,
        }
    }

    /// Session wired to the OpenAI-compatible endpoint, Yahoo Finance and,
    /// when a key is configured, Finnhub news
    pub async fn from_config(config: ResearchConfig) -> Result<Self> {
        config.validate()?;

        let mut llm = OpenAIConfig::new(config.api_key.clone().unwrap_or_else(|| "not-needed".to_string()))
            .with_timeout(config.task_timeout.as_secs().max(1));
        if let Some(base) = &config.api_base {
            llm = llm.with_api_base(base);
        }
        let provider = OpenAIProvider::with_config(llm)?;
        let reasoner: Arc<dyn Reasoner> = Arc::new(LlmReasoner::new(Arc::new(provider), config.model.clone()));

        let store = agent_memory::open_store(config.memory_path.as_deref()).await?;
        let cache_ttl = config.cache_ttl;
        let mut session = Self::new(config, reasoner, store)
            .with_financial(Arc::new(YahooFinanceProvider::new(cache_ttl)));

        match &session.config.finnhub_api_key {
            Some(key) => {
                let news = FinnhubNewsProvider::new(key, session.config.news_rate_limit, session.config.tool_timeout)
                    .map_err(|e| e.into_core("news-lookup"))?;
                session = session.with_news(Arc::new(news));
            }
            None => warn!("FINNHUB_API_KEY not set; news lookups will fail and research sections will be degraded"),
        }

        Ok(session)
    }

    pub fn with_financial(mut self, provider: Arc<dyn FinancialDataProvider>) -> Self {
        self.tools = self.tools.with_financial(provider);
        self
    }

    pub fn with_news(mut self, provider: Arc<dyn NewsProvider>) -> Self {
        self.tools = self.tools.with_news(provider);
        self
    }

    pub fn config(&self) -> &ResearchConfig {
        &self.config
    }

    pub fn store(&self) -> &Arc<dyn ContextStore> {
        &self.store
    }

    fn crew(&self, mode: DelegationMode) -> Result<Crew> {
        let temperatures = &self.config.temperatures;
        let mut builder = Crew::builder(self.tools.clone())
            .roster(roles::roster(&self.reasoner, temperatures))
            .settings(self.config.executor_settings(mode));
        for task in pipeline::research_tasks(&self.config)? {
            builder = builder.task(task);
        }
        if mode == DelegationMode::Hierarchical {
            builder = builder.coordinator(Arc::new(roles::manager(&self.reasoner, temperatures)));
        }
        builder.build()
    }

    /// Run the research graph for one ticker
    ///
    /// Never returns an error: configuration problems, timeouts and report
    /// validation failures all come back as an unsuccessful outcome.
    pub async fn run(&self, request: RunRequest) -> RunOutcome {
        let ticker = request.ticker.trim().to_uppercase();
        if ticker.is_empty() {
            return RunOutcome::rejected(&ticker, Error::Configuration("ticker must not be empty".to_string()));
        }

        let mode = request.mode.unwrap_or(self.config.mode);
        let crew = match self.crew(mode) {
            Ok(crew) => crew,
            Err(err) => return RunOutcome::rejected(&ticker, err),
        };

        let ctx = RunContext::new(&ticker, Arc::clone(&self.store))
            .with_company_name(request.company_name)
            .with_reset_memory(request.reset_memory);

        let output = crew.kickoff(&ctx).await;
        info!(
            ticker = %ticker,
            success = output.success,
            duration_secs = output.duration.as_secs_f64(),
            "Research run finished"
        );
        RunOutcome::from_crew(&ticker, output)
    }

    /// Answer a question from stored research without rerunning the graph
    pub async fn follow_up(&self, ticker: &str, question: &str) -> Result<String> {
        let ticker = ticker.to_uppercase();
        let records = self.store.query(&ticker, question, 5).await?;
        if records.is_empty() {
            return Ok(format!(
                "No stored research for {ticker} yet; run `research {ticker}` first."
            ));
        }

        let findings: String = records
            .iter()
            .map(|r| format!("- ({}) {}\n", r.source_role, r.content))
            .collect();
        let prompt = PromptBuilder::new()
            .text(format!("Answer this follow-up question about {ticker}: {question}\n"))
            .data_section("Stored Findings", findings)
            .text("\nAnswer only from the findings above and say so when they do not cover the question.\n")
            .build();

        let reporter = AgentUnit::new(roles::reporter_role(&self.config.temperatures), Arc::clone(&self.reasoner));
        let answer = reporter.reason(&prompt).await?;
        let answer = answer.trim();
        if answer.is_empty() {
            return Err(Error::ReasoningFailure("follow-up answer was empty".to_string()));
        }
        Ok(answer.to_string())
    }

    /// Stored records for a ticker, oldest first
    pub async fn context(&self, ticker: &str) -> Result<Vec<ContextRecord>> {
        self.store.records(&ticker.to_uppercase()).await
    }

    /// Clear a ticker's stored context
    pub async fn reset(&self, ticker: &str) -> Result<()> {
        let ticker = ticker.to_uppercase();
        self.store.reset(&ticker).await?;
        info!(ticker = %ticker, "Cleared stored context");
        Ok(())
    }

    /// Write the report as `<TICKER>_<timestamp>.md` under `dir`
    pub async fn save_report(&self, outcome: &RunOutcome, dir: &Path) -> Result<PathBuf> {
        let document = outcome
            .document
            .as_ref()
            .ok_or_else(|| Error::Generic(format!("run for {} produced no report", outcome.ticker)))?;

        tokio::fs::create_dir_all(dir)
            .await
            .map_err(|e| Error::Storage(format!("cannot create {}: {e}", dir.display())))?;
        let path = dir.join(format!(
            "{}_{}.md",
            outcome.ticker,
            document.generated_at.format("%Y%m%d_%H%M%S")
        ));
        tokio::fs::write(&path, document.to_markdown())
            .await
            .map_err(|e| Error::Storage(format!("cannot write {}: {e}", path.display())))?;

        info!(path = %path.display(), "Saved report");
        Ok(path)
    }
}
