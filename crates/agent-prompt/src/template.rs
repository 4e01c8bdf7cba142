//! MiniJinja-backed task prompt templates

use crate::{PromptError, Result};
use minijinja::{Environment, UndefinedBehavior};
use std::collections::BTreeSet;

/// A named prompt template in Jinja2 syntax
///
/// The source is parsed once at construction so syntax errors surface
/// when the task graph is built, not mid-run. Rendering is strict: a
/// variable missing from the context is an error rather than an empty
/// string.
#[derive(Debug, Clone, PartialEq)]
pub struct PromptTemplate {
    name: String,
    source: String,
    placeholders: BTreeSet<String>,
}

impl PromptTemplate {
    /// Parse `source`, recording the top-level variables it references
    pub fn new(name: impl Into<String>, source: impl Into<String>) -> Result<Self> {
        let name = name.into();
        let source = source.into();

        let env = Environment::new();
        let template =
            env.template_from_str(&source)
                .map_err(|e| PromptError::TemplateParseFailed {
                    name: name.clone(),
                    detail: e.to_string(),
                })?;
        let placeholders = template.undeclared_variables(false).into_iter().collect();

        Ok(Self {
            name,
            source,
            placeholders,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    /// Top-level variables the template reads
    pub fn placeholders(&self) -> &BTreeSet<String> {
        &self.placeholders
    }

    /// Fail unless every placeholder is in `available`
    pub fn ensure_placeholders<'a>(
        &self,
        available: impl IntoIterator<Item = &'a str>,
    ) -> Result<()> {
        let available: BTreeSet<&str> = available.into_iter().collect();
        let missing: Vec<String> = self
            .placeholders
            .iter()
            .filter(|p| !available.contains(p.as_str()))
            .cloned()
            .collect();

        if missing.is_empty() {
            Ok(())
        } else {
            Err(PromptError::UndeclaredPlaceholders {
                name: self.name.clone(),
                placeholders: missing,
            })
        }
    }

    /// Render against a JSON object of variables
    pub fn render(&self, vars: &serde_json::Value) -> Result<String> {
        let mut env = Environment::new();
        env.set_undefined_behavior(UndefinedBehavior::Strict);

        let value = minijinja::Value::from_serialize(vars);
        env.render_str(&self.source, value)
            .map_err(|e| PromptError::RenderError {
                name: self.name.clone(),
                detail: e.to_string(),
            })
    }
}
