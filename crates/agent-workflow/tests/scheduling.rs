//! End-to-end scheduling behavior of a research crew

use agent_core::{
    AgentRole, Capability, ContextStore, Reasoner, ReasoningRequest, Result,
};
use agent_memory::InMemoryContextStore;
use agent_prompt::PromptTemplate;
use agent_tools::{NewsArticle, NewsProvider, RetryPolicy, ToolError, ToolRegistry};
use agent_workflow::{
    AgentUnit, CompletenessReview, Crew, CrewOutput, DelegationMode, ExecutorSettings,
    ReportLayout, Roster, RunContext, SectionPolicy, SectionSource, TaskId, TaskSpec, TaskStatus,
    ToolRequest,
};
use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;

const SUMMARY_JSON: &str = r#"{"summary": "Apple remains a cash-generating leader.", "risk_assessment": "Regulatory pressure on the App Store."}"#;
const RESEARCH: &str = "Apple announced record services revenue and a new buyback program.";
const ANALYSIS: &str = "Shares rose 12% over three months; margins expanded to 46%.";

/// Scripted replies per role; the last reply repeats
struct Desk {
    delays: HashMap<&'static str, Duration>,
    replies: Mutex<HashMap<String, VecDeque<&'static str>>>,
    prompts: Mutex<Vec<(String, String)>>,
}

impl Desk {
    fn new() -> Self {
        let mut replies = HashMap::new();
        replies.insert("researcher".to_string(), VecDeque::from([RESEARCH]));
        replies.insert("analyst".to_string(), VecDeque::from([ANALYSIS]));
        replies.insert("reporter".to_string(), VecDeque::from([SUMMARY_JSON]));
        Self {
            delays: HashMap::new(),
            replies: Mutex::new(replies),
            prompts: Mutex::new(Vec::new()),
        }
    }

    fn delay(mut self, role: &'static str, millis: u64) -> Self {
        self.delays.insert(role, Duration::from_millis(millis));
        self
    }

    fn replies(self, role: &'static str, replies: &[&'static str]) -> Self {
        self.replies
            .lock()
            .unwrap()
            .insert(role.to_string(), replies.iter().copied().collect());
        self
    }

    fn prompts_for(&self, role: &str) -> Vec<String> {
        self.prompts
            .lock()
            .unwrap()
            .iter()
            .filter(|(r, _)| r == role)
            .map(|(_, p)| p.clone())
            .collect()
    }
}

#[async_trait]
impl Reasoner for Desk {
    async fn reason(&self, request: ReasoningRequest) -> Result<String> {
        if let Some(delay) = self.delays.get(request.role.as_str()) {
            tokio::time::sleep(*delay).await;
        }
        self.prompts
            .lock()
            .unwrap()
            .push((request.role.clone(), request.prompt));

        let mut replies = self.replies.lock().unwrap();
        let queue = replies.entry(request.role).or_default();
        let reply = if queue.len() > 1 {
            queue.pop_front().unwrap_or_default()
        } else {
            queue.front().copied().unwrap_or_default()
        };
        Ok(reply.to_string())
    }

    fn name(&self) -> &str {
        "desk"
    }
}

struct Wire {
    fail: bool,
}

#[async_trait]
impl NewsProvider for Wire {
    async fn search(&self, query: &str, _max_results: usize) -> std::result::Result<Vec<NewsArticle>, ToolError> {
        if self.fail {
            return Err(ToolError::ProviderError("search backend unavailable".to_string()));
        }
        Ok(vec![NewsArticle {
            title: format!("Headline for {query}"),
            source: "wire".to_string(),
            url: "https://news.example.com/1".to_string(),
            snippet: "Services revenue reached a record.".to_string(),
            published_at: None,
        }])
    }

    fn name(&self) -> &'static str {
        "wire"
    }
}

fn template(name: &str, source: &str) -> PromptTemplate {
    PromptTemplate::new(name, source).unwrap()
}

fn layout(policy: SectionPolicy) -> ReportLayout {
    ReportLayout::new("Research Report")
        .section("Executive Summary", SectionSource::Field("summary".to_string()))
        .section("Market & Financial Data", SectionSource::Task(TaskId::from("analysis")))
        .section("News & Qualitative Findings", SectionSource::Task(TaskId::from("research")))
        .section("Risk Assessment", SectionSource::Field("risk_assessment".to_string()))
        .section("Disclaimer", SectionSource::Static("Not investment advice.".to_string()))
        .with_policy(policy)
}

fn roster(desk: &Arc<Desk>) -> Roster {
    let reasoner: Arc<dyn Reasoner> = desk.clone();
    Roster::new()
        .with_agent(AgentUnit::new(
            AgentRole::new("researcher")
                .with_capability(Capability::NewsLookup)
                .with_capability(Capability::ContextStore),
            Arc::clone(&reasoner),
        ))
        .with_agent(AgentUnit::new(
            AgentRole::new("analyst").with_capability(Capability::ContextStore),
            Arc::clone(&reasoner),
        ))
        .with_agent(AgentUnit::new(
            AgentRole::new("reporter").with_capability(Capability::ContextStore),
            reasoner,
        ))
}

struct Fixture {
    desk: Arc<Desk>,
    store: Arc<dyn ContextStore>,
    news_fails: bool,
    policy: SectionPolicy,
    settings: ExecutorSettings,
    review: Option<CompletenessReview>,
}

impl Fixture {
    fn new(desk: Desk) -> Self {
        Self {
            desk: Arc::new(desk),
            store: Arc::new(InMemoryContextStore::new()),
            news_fails: false,
            policy: SectionPolicy::default(),
            settings: ExecutorSettings {
                mode: DelegationMode::Sequential,
                ..ExecutorSettings::default()
            },
            review: None,
        }
    }

    fn crew(&self) -> Crew {
        let tools = ToolRegistry::new(Arc::clone(&self.store))
            .with_news(Arc::new(Wire { fail: self.news_fails }))
            .with_retry_policy(RetryPolicy::fast());

        let mut builder = Crew::builder(tools)
            .roster(roster(&self.desk))
            .settings(self.settings.clone())
            .task(
                TaskSpec::new(
                    "research",
                    "researcher",
                    template("research", "Research recent news for {{ company_name }} ({{ ticker }})."),
                )
                .with_tool(ToolRequest::NewsSearch {
                    keywords: "stock news".to_string(),
                    max_results: 5,
                })
                .publish(),
            )
            .task(
                TaskSpec::new(
                    "analysis",
                    "analyst",
                    template("analysis", "Analyze the financials of {{ ticker }}."),
                )
                .with_tool(ToolRequest::Recall {
                    topic: "services revenue buyback".to_string(),
                    limit: 5,
                })
                .publish(),
            )
            .task(
                TaskSpec::new(
                    "report",
                    "reporter",
                    template(
                        "report",
                        "Write the report for {{ company_name }}.\n{{ upstream.research }}\n{{ upstream.analysis }}",
                    ),
                )
                .depends_on("research")
                .depends_on("analysis")
                .structured(&["summary", "risk_assessment"])
                .synthesize(layout(self.policy)),
            );
        if let Some(review) = &self.review {
            builder = builder.coordinator(Arc::new(review.clone()));
        }
        builder.build().unwrap()
    }

    async fn run(&self) -> CrewOutput {
        let ctx = RunContext::new("aapl", Arc::clone(&self.store))
            .with_company_name(Some("Apple Inc.".to_string()));
        self.crew().kickoff(&ctx).await
    }
}

fn ids(wave: &[TaskId]) -> Vec<&str> {
    wave.iter().map(TaskId::as_str).collect()
}

#[tokio::test]
async fn test_independent_tasks_share_a_wave_and_report_waits() {
    let fixture = Fixture::new(Desk::new().delay("researcher", 40).delay("analyst", 60));

    let output = fixture.run().await;

    assert!(output.success, "{:?}", output.error);
    assert_eq!(output.waves.len(), 2);
    assert_eq!(ids(&output.waves[0]), vec!["research", "analysis"]);
    assert_eq!(ids(&output.waves[1]), vec!["report"]);

    let report = output.result("report").unwrap();
    for dep in ["research", "analysis"] {
        assert!(report.started_at >= output.result(dep).unwrap().finished_at);
    }

    let document = output.document.as_ref().unwrap();
    assert_eq!(document.title, "Apple Inc. (AAPL) Research Report");
    assert_eq!(
        document.section_titles(),
        vec![
            "Executive Summary",
            "Market & Financial Data",
            "News & Qualitative Findings",
            "Risk Assessment",
            "Disclaimer"
        ]
    );
    assert_eq!(document.section("News & Qualitative Findings").unwrap().body, RESEARCH);
    assert_eq!(document.degraded_sections().count(), 0);

    let report_prompt = &fixture.desk.prompts_for("reporter")[0];
    assert!(report_prompt.contains(RESEARCH) && report_prompt.contains(ANALYSIS));

    let recalled = fixture.store.query("AAPL", "services revenue buyback", 5).await.unwrap();
    assert!(recalled[0].content.starts_with("[research]"));
}

#[tokio::test]
async fn test_tool_failure_degrades_report_section() {
    let mut fixture = Fixture::new(Desk::new());
    fixture.news_fails = true;

    let output = fixture.run().await;

    let research = output.result("research").unwrap();
    assert_eq!(research.status, TaskStatus::Failed);
    assert_eq!(research.error.as_ref().unwrap().kind(), "tool_failure");
    assert!(fixture.desk.prompts_for("researcher").is_empty());

    assert!(output.success);
    let document = output.document.unwrap();
    let news = document.section("News & Qualitative Findings").unwrap();
    assert!(news.degraded.is_some());
    assert!(news.body.starts_with("_Section degraded: upstream task 'research' failed"));
    assert!(output.log.contains("succeeded with degraded inputs"));
}

#[tokio::test]
async fn test_strict_policy_rejects_degraded_section() {
    let mut fixture = Fixture::new(Desk::new());
    fixture.news_fails = true;
    fixture.policy = SectionPolicy::strict();

    let output = fixture.run().await;

    assert!(!output.success);
    assert!(output.document.is_none());
    assert_eq!(
        output.error,
        Some(agent_core::Error::Validation {
            missing: vec!["News & Qualitative Findings".to_string()]
        })
    );
}

#[tokio::test]
async fn test_empty_summary_field_fails_validation() {
    let desk = Desk::new().replies(
        "reporter",
        &[r#"{"summary": "ok", "risk_assessment": "none"}"#],
    );
    let mut fixture = Fixture::new(desk);
    fixture.policy = SectionPolicy {
        min_chars: 10,
        ..SectionPolicy::default()
    };

    let output = fixture.run().await;

    assert!(!output.success);
    match output.error {
        Some(agent_core::Error::Validation { missing }) => {
            assert_eq!(missing, vec!["Executive Summary", "Risk Assessment"]);
        }
        other => panic!("expected validation error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_cycle_rejected_before_anything_runs() {
    let desk = Arc::new(Desk::new());
    let store: Arc<dyn ContextStore> = Arc::new(InMemoryContextStore::new());

    let result = Crew::builder(ToolRegistry::new(store))
        .roster(roster(&desk))
        .task(TaskSpec::new("a", "analyst", template("a", "{{ ticker }}")).depends_on("b"))
        .task(TaskSpec::new("b", "analyst", template("b", "{{ ticker }}")).depends_on("a"))
        .build();

    let err = result.err().unwrap();
    assert_eq!(err.kind(), "configuration_error");
    assert!(desk.prompts.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_run_timeout_fails_in_flight_tasks() {
    let mut fixture = Fixture::new(Desk::new().delay("researcher", 500));
    fixture.settings.run_timeout = Duration::from_millis(50);

    let output = fixture.run().await;

    assert!(!output.success);
    assert_eq!(output.error.as_ref().unwrap().kind(), "timeout_error");
    assert_eq!(output.result("research").unwrap().status, TaskStatus::Failed);
    assert!(output.result("report").is_none());
    assert!(output.document.is_none());
}

#[tokio::test]
async fn test_task_timeout_is_isolated_to_the_task() {
    let mut fixture = Fixture::new(Desk::new().delay("analyst", 300));
    fixture.settings.task_timeout = Duration::from_millis(50);

    let output = fixture.run().await;

    let analysis = output.result("analysis").unwrap();
    assert_eq!(analysis.status, TaskStatus::Failed);
    assert_eq!(analysis.error.as_ref().unwrap().kind(), "timeout_error");
    assert!(output.result("research").unwrap().is_success());

    // the report tolerates failed inputs and renders the gap
    assert!(output.success);
    let document = output.document.unwrap();
    assert!(document.section("Market & Financial Data").unwrap().degraded.is_some());
}

#[tokio::test]
async fn test_hierarchical_review_redoes_thin_output_once() {
    let desk = Desk::new().replies("analyst", &["Thin.", ANALYSIS]);
    let mut fixture = Fixture::new(desk);
    fixture.settings.mode = DelegationMode::Hierarchical;
    fixture.review = Some(CompletenessReview::new(40));

    let output = fixture.run().await;

    assert!(output.success, "{:?}", output.error);
    let waves: Vec<Vec<&str>> = output.waves.iter().map(|w| ids(w)).collect();
    assert_eq!(
        waves,
        vec![vec!["research", "analysis"], vec!["analysis"], vec!["report"]]
    );

    let analyst_prompts = fixture.desk.prompts_for("analyst");
    assert_eq!(analyst_prompts.len(), 2);
    assert!(analyst_prompts[1].contains("Coordinator Guidance"));

    let document = output.document.unwrap();
    assert_eq!(document.section("Market & Financial Data").unwrap().body, ANALYSIS);
}

#[tokio::test]
async fn test_rerun_over_shared_store_is_repeatable() {
    let fixture = Fixture::new(Desk::new());

    let first = fixture.run().await;
    let second = fixture.run().await;

    assert!(first.success && second.success);
    assert_eq!(first.waves, second.waves);
    assert_eq!(
        first.document.unwrap().section_titles(),
        second.document.unwrap().section_titles()
    );

    // the second analysis recalls what the first run published
    let analyst_prompts = fixture.desk.prompts_for("analyst");
    assert_eq!(analyst_prompts.len(), 2);
    assert!(!analyst_prompts[0].contains("Prior Findings"));
    assert!(analyst_prompts[1].contains("Prior Findings"));
    assert!(analyst_prompts[1].contains(RESEARCH));
    assert_eq!(fixture.store.records("AAPL").await.unwrap().len(), 4);
}

#[tokio::test]
async fn test_dispatch_waits_for_dependencies_under_any_delays() {
    let assignments: [(u64, u64, u64); 5] = [(0, 0, 0), (50, 0, 0), (0, 50, 0), (30, 60, 10), (60, 30, 25)];

    for (research, analysis, report) in assignments {
        let desk = Desk::new()
            .delay("researcher", research)
            .delay("analyst", analysis)
            .delay("reporter", report);
        let fixture = Fixture::new(desk);
        let crew = fixture.crew();
        let ctx = RunContext::new("AAPL", Arc::clone(&fixture.store));

        let output = crew.kickoff(&ctx).await;

        assert!(output.success, "delays {research}/{analysis}/{report}: {:?}", output.error);
        for result in &output.results {
            let spec = crew.graph().get(&result.task_id).unwrap();
            for dep in &spec.depends_on {
                let upstream = output.result(dep.as_str()).unwrap();
                assert!(
                    result.started_at >= upstream.finished_at,
                    "'{}' started before '{dep}' finished with delays {research}/{analysis}/{report}",
                    result.task_id
                );
            }
        }
    }
}

#[tokio::test]
async fn test_reset_memory_clears_previous_run() {
    let fixture = Fixture::new(Desk::new());
    fixture.store.put("AAPL", "stale finding", "analyst").await.unwrap();

    let ctx = RunContext::new("AAPL", Arc::clone(&fixture.store)).with_reset_memory(true);
    let output = fixture.crew().kickoff(&ctx).await;

    assert!(output.success);
    let records = fixture.store.records("AAPL").await.unwrap();
    assert!(records.iter().all(|r| r.content != "stale finding"));
    assert_eq!(records.len(), 2);
}
