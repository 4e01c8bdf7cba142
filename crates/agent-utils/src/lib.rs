//! Shared utilities for the research workspace
//!
//! Logging setup and environment-backed configuration helpers.

pub mod config;
pub mod logging;

pub use config::{EnvError, EnvReader};
pub use logging::{LogFormat, init_tracing, init_tracing_with};
