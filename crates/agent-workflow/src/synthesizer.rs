//! Report assembly and validation for the terminal synthesis task

use crate::task::{TaskId, TaskOutput, TaskResult, TaskStatus};
use agent_core::{Error, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;

/// Where a section's content comes from
#[derive(Debug, Clone, PartialEq)]
pub enum SectionSource {
    /// The full output of an upstream task
    Task(TaskId),
    /// A field of the synthesis task's own structured output
    Field(String),
    /// Fixed text
    Static(String),
}

/// One required section
#[derive(Debug, Clone, PartialEq)]
pub struct SectionSpec {
    pub title: String,
    pub source: SectionSource,
}

impl SectionSpec {
    pub fn new(title: impl Into<String>, source: SectionSource) -> Self {
        Self {
            title: title.into(),
            source,
        }
    }
}

/// When a section counts as present
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SectionPolicy {
    /// A section standing in for a failed upstream task is present
    pub degraded_counts_as_present: bool,
    /// Minimum non-whitespace characters of real content
    pub min_chars: usize,
}

impl Default for SectionPolicy {
    fn default() -> Self {
        Self {
            degraded_counts_as_present: true,
            min_chars: 1,
        }
    }
}

impl SectionPolicy {
    /// Degraded sections count as missing
    pub fn strict() -> Self {
        Self {
            degraded_counts_as_present: false,
            ..Self::default()
        }
    }
}

/// Title and required sections of the final document
#[derive(Debug, Clone, PartialEq)]
pub struct ReportLayout {
    /// Appended to "<Company> (<TICKER>)" to form the document title
    pub title_suffix: String,
    pub sections: Vec<SectionSpec>,
    pub policy: SectionPolicy,
}

impl ReportLayout {
    pub fn new(title_suffix: impl Into<String>) -> Self {
        Self {
            title_suffix: title_suffix.into(),
            sections: Vec::new(),
            policy: SectionPolicy::default(),
        }
    }

    pub fn section(mut self, title: impl Into<String>, source: SectionSource) -> Self {
        self.sections.push(SectionSpec::new(title, source));
        self
    }

    pub fn with_policy(mut self, policy: SectionPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Upstream tasks the layout reads
    pub fn upstream_tasks(&self) -> impl Iterator<Item = &TaskId> {
        self.sections.iter().filter_map(|s| match &s.source {
            SectionSource::Task(id) => Some(id),
            _ => None,
        })
    }
}

/// One rendered section
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportSection {
    pub title: String,
    pub body: String,
    /// Why the section stands in for missing upstream content
    #[serde(skip_serializing_if = "Option::is_none")]
    pub degraded: Option<String>,
}

/// The validated research document
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportDocument {
    pub title: String,
    pub ticker: String,
    pub generated_at: DateTime<Utc>,
    pub sections: Vec<ReportSection>,
}

impl ReportDocument {
    pub fn section(&self, title: &str) -> Option<&ReportSection> {
        self.sections.iter().find(|s| s.title == title)
    }

    /// Section titles in document order
    pub fn section_titles(&self) -> Vec<&str> {
        self.sections.iter().map(|s| s.title.as_str()).collect()
    }

    pub fn degraded_sections(&self) -> impl Iterator<Item = &ReportSection> {
        self.sections.iter().filter(|s| s.degraded.is_some())
    }

    pub fn to_markdown(&self) -> String {
        let mut out = format!(
            "# {}\n\n*Generated {}*\n",
            self.title,
            self.generated_at.format("%Y-%m-%d %H:%M UTC")
        );
        for section in &self.sections {
            out.push_str(&format!("\n## {}\n\n{}\n", section.title, section.body.trim()));
        }
        out
    }
}

/// Title line for a company and ticker
pub fn report_title(company_name: &str, ticker: &str, suffix: &str) -> String {
    if company_name.eq_ignore_ascii_case(ticker) {
        format!("{ticker} {suffix}")
    } else {
        format!("{company_name} ({ticker}) {suffix}")
    }
}

fn content_chars(text: &str) -> usize {
    text.chars().filter(|c| !c.is_whitespace()).count()
}

fn degraded_section(title: &str, id: &TaskId, result: Option<&TaskResult>) -> ReportSection {
    let reason = match result {
        Some(r) => {
            let cause = r
                .error
                .as_ref()
                .map_or_else(|| "no output".to_string(), ToString::to_string);
            format!("upstream task '{id}' {}: {cause}", r.status)
        }
        None => format!("upstream task '{id}' did not run"),
    };
    ReportSection {
        title: title.to_string(),
        body: format!("_Section degraded: {reason}._"),
        degraded: Some(reason),
    }
}

/// Assemble the document and validate every required section
///
/// Fails with [`Error::Validation`] naming each missing section: empty or
/// shorter than `min_chars` after substitution, or degraded when the
/// policy does not accept degraded sections.
pub fn assemble(
    layout: &ReportLayout,
    company_name: &str,
    ticker: &str,
    own: &TaskOutput,
    upstream: &HashMap<TaskId, TaskResult>,
) -> Result<ReportDocument> {
    let min_chars = layout.policy.min_chars.max(1);
    let mut sections = Vec::with_capacity(layout.sections.len());
    let mut missing = Vec::new();

    for spec in &layout.sections {
        let section = match &spec.source {
            SectionSource::Static(text) => ReportSection {
                title: spec.title.clone(),
                body: text.clone(),
                degraded: None,
            },
            SectionSource::Field(field) => ReportSection {
                title: spec.title.clone(),
                body: own.field(field).unwrap_or_default().trim().to_string(),
                degraded: None,
            },
            SectionSource::Task(id) => match upstream.get(id) {
                Some(result) if result.status == TaskStatus::Succeeded => ReportSection {
                    title: spec.title.clone(),
                    body: result
                        .output
                        .as_ref()
                        .map(TaskOutput::as_text)
                        .unwrap_or_default()
                        .trim()
                        .to_string(),
                    degraded: result
                        .degraded
                        .then(|| format!("upstream task '{id}' used its fallback value")),
                },
                other => degraded_section(&spec.title, id, other),
            },
        };

        let present = match &section.degraded {
            Some(_) if !layout.policy.degraded_counts_as_present => false,
            Some(_) => true,
            None => content_chars(&section.body) >= min_chars,
        };
        if !present {
            missing.push(spec.title.clone());
        }
        sections.push(section);
    }

    if !missing.is_empty() {
        return Err(Error::Validation { missing });
    }

    Ok(ReportDocument {
        title: report_title(company_name, ticker, &layout.title_suffix),
        ticker: ticker.to_string(),
        generated_at: Utc::now(),
        sections,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn layout() -> ReportLayout {
        ReportLayout::new("Research Report")
            .section("Executive Summary", SectionSource::Field("summary".to_string()))
            .section("Market & Financial Data", SectionSource::Task(TaskId::from("analysis")))
            .section("News & Qualitative Findings", SectionSource::Task(TaskId::from("research")))
            .section("Disclaimer", SectionSource::Static("Not investment advice.".to_string()))
    }

    fn own(summary: &str) -> TaskOutput {
        TaskOutput::Structured(json!({ "summary": summary }).as_object().cloned().unwrap())
    }

    fn upstream(research: TaskResult) -> HashMap<TaskId, TaskResult> {
        let mut map = HashMap::new();
        map.insert(
            TaskId::from("analysis"),
            TaskResult::succeeded(TaskId::from("analysis"), TaskOutput::Text("P/E 28".to_string())),
        );
        map.insert(TaskId::from("research"), research);
        map
    }

    fn research_failed() -> TaskResult {
        TaskResult::failed(
            TaskId::from("research"),
            Error::tool("news-lookup", "Provider error: outage"),
        )
    }

    #[test]
    fn test_complete_document() {
        let research = TaskResult::succeeded(TaskId::from("research"), TaskOutput::Text("Launch".to_string()));
        let doc = assemble(&layout(), "Apple", "AAPL", &own("Strong"), &upstream(research)).unwrap();

        assert_eq!(doc.title, "Apple (AAPL) Research Report");
        assert_eq!(
            doc.section_titles(),
            vec![
                "Executive Summary",
                "Market & Financial Data",
                "News & Qualitative Findings",
                "Disclaimer"
            ]
        );
        let md = doc.to_markdown();
        assert!(md.starts_with("# Apple (AAPL) Research Report"));
        assert!(md.contains("## Market & Financial Data\n\nP/E 28"));
    }

    #[test]
    fn test_failed_upstream_is_degraded_not_missing() {
        let doc = assemble(&layout(), "Apple", "AAPL", &own("Strong"), &upstream(research_failed())).unwrap();

        let section = doc.section("News & Qualitative Findings").unwrap();
        assert!(section.degraded.as_deref().unwrap().contains("'research' failed"));
        assert!(section.body.contains("news-lookup"));
        assert_eq!(doc.degraded_sections().count(), 1);
    }

    #[test]
    fn test_strict_policy_names_degraded_section() {
        let strict = layout().with_policy(SectionPolicy::strict());
        let err = assemble(&strict, "Apple", "AAPL", &own("Strong"), &upstream(research_failed())).unwrap_err();

        assert_eq!(
            err,
            Error::Validation {
                missing: vec!["News & Qualitative Findings".to_string()]
            }
        );
    }

    #[test]
    fn test_empty_after_substitution_is_missing() {
        let research = TaskResult::succeeded(TaskId::from("research"), TaskOutput::Text("  ".to_string()));
        let err = assemble(&layout(), "Apple", "AAPL", &own(""), &upstream(research)).unwrap_err();

        let Error::Validation { missing } = err else {
            panic!("expected validation error");
        };
        assert_eq!(missing, vec!["Executive Summary", "News & Qualitative Findings"]);
    }

    #[test]
    fn test_min_chars() {
        let research = TaskResult::succeeded(TaskId::from("research"), TaskOutput::Text("ok".to_string()));
        let layout = layout().with_policy(SectionPolicy {
            degraded_counts_as_present: true,
            min_chars: 5,
        });
        let err = assemble(&layout, "Apple", "AAPL", &own("Strong quarter"), &upstream(research)).unwrap_err();
        assert!(err.to_string().contains("News & Qualitative Findings"));
    }

    #[test]
    fn test_title_without_company() {
        assert_eq!(report_title("TSLA", "TSLA", "Research Report"), "TSLA Research Report");
    }
}
