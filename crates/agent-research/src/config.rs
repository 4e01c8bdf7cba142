//! Configuration for research runs

use agent_core::{Error, Result};
use agent_tools::{PriceRange, RetryPolicy};
use agent_utils::{EnvError, EnvReader};
use agent_workflow::{DelegationMode, ExecutorSettings, SectionPolicy};
use std::path::PathBuf;
use std::time::Duration;

/// Prefix of every application variable
pub const ENV_PREFIX: &str = "FINRESEARCH_";

const DEFAULT_DISCLAIMER: &str = "This report is generated automatically for informational purposes only and does not constitute investment advice. Data may be incomplete or delayed; verify independently before making investment decisions.";

/// Sampling temperature per role
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RoleTemperatures {
    pub manager: f32,
    pub researcher: f32,
    pub analyst: f32,
    pub reporter: f32,
}

impl Default for RoleTemperatures {
    fn default() -> Self {
        Self {
            manager: 0.1,
            researcher: 0.7,
            analyst: 0.0,
            reporter: 0.5,
        }
    }
}

impl RoleTemperatures {
    fn iter(&self) -> impl Iterator<Item = (&'static str, f32)> {
        [
            ("manager", self.manager),
            ("researcher", self.researcher),
            ("analyst", self.analyst),
            ("reporter", self.reporter),
        ]
        .into_iter()
    }
}

/// Configuration for research runs
#[derive(Debug, Clone)]
pub struct ResearchConfig {
    /// Delegation mode when a request does not name one
    pub mode: DelegationMode,

    /// Budget for one task, including its lookups and reasoning
    pub task_timeout: Duration,

    /// Budget for a whole run
    pub run_timeout: Duration,

    /// Per-attempt budget for an external lookup
    pub tool_timeout: Duration,

    /// Attempts per external lookup, including the first
    pub max_retries: u32,

    /// Backoff before the second attempt
    pub retry_backoff_base: Duration,

    /// Coordinator consultations per hierarchical run
    pub max_delegation_rounds: usize,

    pub max_news_results: usize,
    pub price_range: PriceRange,

    /// Lifetime of cached price histories and fundamentals
    pub cache_ttl: Duration,

    /// News requests per minute
    pub news_rate_limit: u32,

    /// JSON file backing the context store; in-process when unset
    pub memory_path: Option<PathBuf>,

    /// Where `--save` writes reports
    pub output_dir: Option<PathBuf>,

    /// Degraded sections count as missing
    pub strict_sections: bool,
    pub min_section_chars: usize,
    pub disclaimer: String,
    pub temperatures: RoleTemperatures,

    pub model: String,
    pub api_base: Option<String>,
    pub api_key: Option<String>,
    pub finnhub_api_key: Option<String>,
}

impl Default for ResearchConfig {
    fn default() -> Self {
        Self {
            mode: DelegationMode::Hierarchical,
            task_timeout: Duration::from_secs(180),
            run_timeout: Duration::from_secs(600),
            tool_timeout: Duration::from_secs(30),
            max_retries: 3,
            retry_backoff_base: Duration::from_millis(500),
            max_delegation_rounds: 3,
            max_news_results: 10,
            price_range: PriceRange::ThreeMonths,
            cache_ttl: Duration::from_secs(300),
            news_rate_limit: 60,
            memory_path: None,
            output_dir: None,
            strict_sections: false,
            min_section_chars: 1,
            disclaimer: DEFAULT_DISCLAIMER.to_string(),
            temperatures: RoleTemperatures::default(),
            model: "gpt-4o-mini".to_string(),
            api_base: None,
            api_key: None,
            finnhub_api_key: None,
        }
    }
}

fn env_error(err: EnvError) -> Error {
    Error::Configuration(err.to_string())
}

impl ResearchConfig {
    pub fn builder() -> ResearchConfigBuilder {
        ResearchConfigBuilder::default()
    }

    /// Defaults overridden by the process environment
    pub fn from_env() -> Result<Self> {
        Self::from_reader(&EnvReader::system(ENV_PREFIX))
    }

    /// Defaults overridden by `env`, then validated
    pub fn from_reader(env: &EnvReader) -> Result<Self> {
        let mut config = Self::default();

        if let Some(mode) = env.string("MODE") {
            config.mode = mode.parse()?;
        }
        if let Some(timeout) = env.duration_secs("TASK_TIMEOUT_SECS").map_err(env_error)? {
            config.task_timeout = timeout;
        }
        if let Some(timeout) = env.duration_secs("RUN_TIMEOUT_SECS").map_err(env_error)? {
            config.run_timeout = timeout;
        }
        if let Some(timeout) = env.duration_secs("TOOL_TIMEOUT_SECS").map_err(env_error)? {
            config.tool_timeout = timeout;
        }
        if let Some(retries) = env.parse("MAX_RETRIES").map_err(env_error)? {
            config.max_retries = retries;
        }
        if let Some(rounds) = env.parse("MAX_DELEGATION_ROUNDS").map_err(env_error)? {
            config.max_delegation_rounds = rounds;
        }
        if let Some(results) = env.parse("MAX_NEWS_RESULTS").map_err(env_error)? {
            config.max_news_results = results;
        }
        if let Some(strict) = env.flag("STRICT_SECTIONS").map_err(env_error)? {
            config.strict_sections = strict;
        }
        config.memory_path = env.string("MEMORY_PATH").map(PathBuf::from);
        config.output_dir = env.string("OUTPUT_DIR").map(PathBuf::from);

        if let Some(model) = env.raw("OPENAI_MODEL") {
            config.model = model;
        }
        config.api_base = env.raw("OPENAI_API_BASE");
        config.api_key = env.raw("OPENAI_API_KEY");
        config.finnhub_api_key = env.raw("FINNHUB_API_KEY");

        config.validate()?;
        Ok(config)
    }

    /// Reject settings no run could succeed with
    pub fn validate(&self) -> Result<()> {
        let problem = if self.task_timeout.is_zero() || self.run_timeout.is_zero() {
            Some("timeouts must be greater than zero".to_string())
        } else if self.tool_timeout.is_zero() {
            Some("tool_timeout must be greater than zero".to_string())
        } else if self.task_timeout > self.run_timeout {
            Some(format!(
                "task_timeout ({:?}) exceeds run_timeout ({:?})",
                self.task_timeout, self.run_timeout
            ))
        } else if self.max_retries == 0 {
            Some("max_retries must be greater than 0".to_string())
        } else if self.max_delegation_rounds == 0 {
            Some("max_delegation_rounds must be greater than 0".to_string())
        } else if self.max_news_results == 0 {
            Some("max_news_results must be greater than 0".to_string())
        } else if self.model.trim().is_empty() {
            Some("model must not be empty".to_string())
        } else {
            self.temperatures
                .iter()
                .find(|(_, t)| !(0.0..=2.0).contains(t))
                .map(|(role, t)| format!("temperature for {role} must be within [0, 2], got {t}"))
        };

        match problem {
            Some(message) => Err(Error::Configuration(message)),
            None => Ok(()),
        }
    }

    pub fn executor_settings(&self, mode: DelegationMode) -> ExecutorSettings {
        ExecutorSettings {
            mode,
            task_timeout: self.task_timeout,
            run_timeout: self.run_timeout,
            max_delegation_rounds: self.max_delegation_rounds,
        }
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(
            self.max_retries,
            self.retry_backoff_base,
            Duration::from_secs(10),
            2.0,
        )
    }

    pub fn section_policy(&self) -> SectionPolicy {
        SectionPolicy {
            degraded_counts_as_present: !self.strict_sections,
            min_chars: self.min_section_chars,
        }
    }
}

/// Builder for [`ResearchConfig`]
#[derive(Debug, Default)]
pub struct ResearchConfigBuilder {
    config: ResearchConfig,
}

impl ResearchConfigBuilder {
    pub fn mode(mut self, mode: DelegationMode) -> Self {
        self.config.mode = mode;
        self
    }

    pub fn task_timeout(mut self, timeout: Duration) -> Self {
        self.config.task_timeout = timeout;
        self
    }

    pub fn run_timeout(mut self, timeout: Duration) -> Self {
        self.config.run_timeout = timeout;
        self
    }

    pub fn tool_timeout(mut self, timeout: Duration) -> Self {
        self.config.tool_timeout = timeout;
        self
    }

    pub fn max_retries(mut self, retries: u32) -> Self {
        self.config.max_retries = retries;
        self
    }

    pub fn retry_backoff_base(mut self, backoff: Duration) -> Self {
        self.config.retry_backoff_base = backoff;
        self
    }

    pub fn max_delegation_rounds(mut self, rounds: usize) -> Self {
        self.config.max_delegation_rounds = rounds;
        self
    }

    pub fn max_news_results(mut self, results: usize) -> Self {
        self.config.max_news_results = results;
        self
    }

    pub fn price_range(mut self, range: PriceRange) -> Self {
        self.config.price_range = range;
        self
    }

    pub fn memory_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.memory_path = Some(path.into());
        self
    }

    pub fn output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.output_dir = Some(dir.into());
        self
    }

    pub fn strict_sections(mut self, strict: bool) -> Self {
        self.config.strict_sections = strict;
        self
    }

    pub fn min_section_chars(mut self, chars: usize) -> Self {
        self.config.min_section_chars = chars;
        self
    }

    pub fn disclaimer(mut self, text: impl Into<String>) -> Self {
        self.config.disclaimer = text.into();
        self
    }

    pub fn temperatures(mut self, temperatures: RoleTemperatures) -> Self {
        self.config.temperatures = temperatures;
        self
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.model = model.into();
        self
    }

    pub fn finnhub_api_key(mut self, key: impl Into<String>) -> Self {
        self.config.finnhub_api_key = Some(key.into());
        self
    }

    /// Validate and return the configuration
    pub fn build(self) -> Result<ResearchConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}
