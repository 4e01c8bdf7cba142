//! Task prompt templates for research agents
//!
//! [`PromptTemplate`] wraps a Jinja2 template (via MiniJinja) and knows
//! which variables it reads, so a task graph can reject templates whose
//! placeholders the engine never supplies. [`PromptBuilder`] assembles
//! the data sections appended to a rendered prompt.
//!
//! ```
//! use agent_prompt::PromptTemplate;
//! use serde_json::json;
//!
//! let template = PromptTemplate::new("news", "Find news on {{ ticker }}").unwrap();
//! assert!(template.ensure_placeholders(["ticker", "company_name"]).is_ok());
//! assert_eq!(template.render(&json!({ "ticker": "AAPL" })).unwrap(), "Find news on AAPL");
//! ```

mod builder;
mod error;
mod template;

pub use builder::PromptBuilder;
pub use error::{PromptError, Result};
pub use template::PromptTemplate;
