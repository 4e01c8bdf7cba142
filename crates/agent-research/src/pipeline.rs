//! The default research graph: research and analysis in parallel, then the report

use crate::config::ResearchConfig;
use crate::roles::{ANALYST, REPORTER, RESEARCHER};
use agent_core::Result;
use agent_prompt::PromptTemplate;
use agent_workflow::{ReportLayout, SectionSource, TaskId, TaskSpec, ToolRequest};

pub const RESEARCH_TASK: &str = "research";
pub const ANALYSIS_TASK: &str = "analysis";
pub const REPORT_TASK: &str = "report";

const RESEARCH_TEMPLATE: &str = "\
Research the latest news, announcements and qualitative developments for {{ company_name }} ({{ ticker }}).
Cover products and strategy, management, competition, regulation and market sentiment.
Base every statement on the news and prior findings below and name the source.";

const ANALYSIS_TEMPLATE: &str = "\
Analyze the market and financial data for {{ company_name }} ({{ ticker }}).
Describe the recent price trend and volatility, then valuation and fundamentals.
Quote the figures from the data below; say so explicitly when a figure is unavailable.";

const REPORT_TEMPLATE: &str = "\
Write the research summary for {{ company_name }} ({{ ticker }}).

## News & Qualitative Findings
{{ upstream.research }}

## Market & Financial Analysis
{{ upstream.analysis }}

Provide `summary`: an executive summary of three to five sentences that combines both inputs,
and `risk_assessment`: the main downside risks, one short paragraph per risk.
If an input above is marked unavailable, say which part of the picture is missing.";

/// Required sections of the final document, in order
pub fn report_layout(config: &ResearchConfig) -> ReportLayout {
    ReportLayout::new("Research Report")
        .section("Executive Summary", SectionSource::Field("summary".to_string()))
        .section("Market & Financial Data", SectionSource::Task(TaskId::from(ANALYSIS_TASK)))
        .section(
            "News & Qualitative Findings",
            SectionSource::Task(TaskId::from(RESEARCH_TASK)),
        )
        .section("Risk Assessment", SectionSource::Field("risk_assessment".to_string()))
        .section("Disclaimer", SectionSource::Static(config.disclaimer.clone()))
        .with_policy(config.section_policy())
}

/// Task definitions for one research run
pub fn research_tasks(config: &ResearchConfig) -> Result<Vec<TaskSpec>> {
    let research = TaskSpec::new(
        RESEARCH_TASK,
        RESEARCHER,
        PromptTemplate::new(RESEARCH_TASK, RESEARCH_TEMPLATE)?,
    )
    .with_tool(ToolRequest::NewsSearch {
        keywords: "stock news".to_string(),
        max_results: config.max_news_results,
    })
    .with_tool(ToolRequest::Recall {
        topic: "news announcements sentiment".to_string(),
        limit: 5,
    })
    .publish();

    let analysis = TaskSpec::new(
        ANALYSIS_TASK,
        ANALYST,
        PromptTemplate::new(ANALYSIS_TASK, ANALYSIS_TEMPLATE)?,
    )
    .with_tool(ToolRequest::PriceHistory(config.price_range))
    .with_tool(ToolRequest::Fundamentals)
    .with_tool(ToolRequest::Recall {
        topic: "price valuation fundamentals metrics".to_string(),
        limit: 5,
    })
    .publish();

    let report = TaskSpec::new(
        REPORT_TASK,
        REPORTER,
        PromptTemplate::new(REPORT_TASK, REPORT_TEMPLATE)?,
    )
    .depends_on(RESEARCH_TASK)
    .depends_on(ANALYSIS_TASK)
    .structured(&["summary", "risk_assessment"])
    .synthesize(report_layout(config));

    Ok(vec![research, analysis, report])
}
