//! Fluent prompt builder
//!
//! Assembles the gathered-inputs part of a task prompt: rendered task
//! text followed by markdown sections of tool data and upstream results.

/// A fluent builder for constructing prompts
///
/// ```
/// use agent_prompt::PromptBuilder;
///
/// let prompt = PromptBuilder::new()
///     .text("Analyze AAPL.")
///     .section("Price History")
///     .bullet("Close: 189.50")
///     .build();
///
/// assert!(prompt.contains("## Price History"));
/// assert!(prompt.contains("- Close: 189.50"));
/// ```
#[derive(Debug, Clone, Default)]
pub struct PromptBuilder {
    parts: Vec<String>,
}

impl PromptBuilder {
    /// Create a new prompt builder
    pub fn new() -> Self {
        Self::default()
    }

    /// Add static text
    pub fn text(mut self, content: impl Into<String>) -> Self {
        self.parts.push(content.into());
        self
    }

    /// Add a newline
    pub fn newline(self) -> Self {
        self.text("\n")
    }

    /// Add a blank line (two newlines)
    pub fn blank_line(self) -> Self {
        self.text("\n\n")
    }

    /// Add a `##` section header
    pub fn section(self, title: impl Into<String>) -> Self {
        self.text(format!("\n## {}\n", title.into()))
    }

    /// A section with a body, skipped when the body is blank
    pub fn data_section(self, title: impl Into<String>, body: impl AsRef<str>) -> Self {
        let body = body.as_ref().trim();
        if body.is_empty() {
            return self;
        }
        self.section(title).text(format!("{body}\n"))
    }

    /// Add content only when `condition` holds
    pub fn when(self, condition: bool, content: impl Into<String>) -> Self {
        if condition { self.text(content) } else { self }
    }

    /// Add a bullet point
    pub fn bullet(self, content: impl Into<String>) -> Self {
        self.text(format!("- {}\n", content.into()))
    }

    /// Add a bullet per item
    pub fn bullets<I, S>(mut self, items: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for item in items {
            self = self.bullet(item);
        }
        self
    }

    /// Add a fenced code block
    pub fn code_block(self, language: impl Into<String>, code: impl Into<String>) -> Self {
        self.text(format!("```{}\n{}\n```\n", language.into(), code.into()))
    }

    /// Build the final prompt string
    pub fn build(self) -> String {
        self.parts.concat()
    }
}
