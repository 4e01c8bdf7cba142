//! Environment-backed configuration helpers

use std::collections::HashMap;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

/// A variable was set but could not be parsed
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Invalid value '{value}' for {key}: {reason}")]
pub struct EnvError {
    pub key: String,
    pub value: String,
    pub reason: String,
}

type Lookup = Box<dyn Fn(&str) -> Option<String> + Send + Sync>;

/// Reads prefixed configuration variables
///
/// Lookups go through a closure so tests can supply a map instead of
/// touching the process environment.
pub struct EnvReader {
    prefix: String,
    lookup: Lookup,
}

impl EnvReader {
    /// Read from the process environment
    pub fn system(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            lookup: Box::new(|key| std::env::var(key).ok()),
        }
    }

    /// Read from a fixed map
    pub fn from_map(prefix: impl Into<String>, vars: HashMap<String, String>) -> Self {
        Self {
            prefix: prefix.into(),
            lookup: Box::new(move |key| vars.get(key).cloned()),
        }
    }

    /// Unprefixed variable, trimmed; blank counts as unset
    pub fn raw(&self, key: &str) -> Option<String> {
        (self.lookup)(key)
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    }

    /// `<PREFIX><key>`, trimmed; blank counts as unset
    pub fn string(&self, key: &str) -> Option<String> {
        self.raw(&format!("{}{key}", self.prefix))
    }

    /// Parse `<PREFIX><key>` with [`FromStr`]
    pub fn parse<T>(&self, key: &str) -> Result<Option<T>, EnvError>
    where
        T: FromStr,
        T::Err: std::fmt::Display,
    {
        let full = format!("{}{key}", self.prefix);
        match self.raw(&full) {
            None => Ok(None),
            Some(value) => value.parse().map(Some).map_err(|e: T::Err| EnvError {
                key: full,
                reason: e.to_string(),
                value,
            }),
        }
    }

    /// Seconds, fractional allowed
    pub fn duration_secs(&self, key: &str) -> Result<Option<Duration>, EnvError> {
        let full = format!("{}{key}", self.prefix);
        let Some(secs) = self.parse::<f64>(key)? else {
            return Ok(None);
        };
        Duration::try_from_secs_f64(secs)
            .map(Some)
            .map_err(|e| EnvError {
                key: full,
                value: secs.to_string(),
                reason: e.to_string(),
            })
    }

    /// Milliseconds
    pub fn duration_millis(&self, key: &str) -> Result<Option<Duration>, EnvError> {
        Ok(self.parse::<u64>(key)?.map(Duration::from_millis))
    }

    /// `1/true/yes/on` or `0/false/no/off`
    pub fn flag(&self, key: &str) -> Result<Option<bool>, EnvError> {
        let full = format!("{}{key}", self.prefix);
        match self.raw(&full) {
            None => Ok(None),
            Some(value) => match value.to_lowercase().as_str() {
                "1" | "true" | "yes" | "on" => Ok(Some(true)),
                "0" | "false" | "no" | "off" => Ok(Some(false)),
                _ => Err(EnvError {
                    key: full,
                    value,
                    reason: "expected a boolean".to_string(),
                }),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reader(pairs: &[(&str, &str)]) -> EnvReader {
        let vars = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        EnvReader::from_map("APP_", vars)
    }

    #[test]
    fn test_prefix_and_blank() {
        let env = reader(&[("APP_MODE", " sequential "), ("APP_EMPTY", "  "), ("KEY", "k")]);
        assert_eq!(env.string("MODE").as_deref(), Some("sequential"));
        assert_eq!(env.string("EMPTY"), None);
        assert_eq!(env.raw("KEY").as_deref(), Some("k"));
    }

    #[test]
    fn test_parse_errors_name_key() {
        let env = reader(&[("APP_RETRIES", "many")]);
        let err = env.parse::<u32>("RETRIES").unwrap_err();
        assert_eq!(err.key, "APP_RETRIES");
        assert_eq!(err.value, "many");
        assert_eq!(env.parse::<u32>("MISSING").unwrap(), None);
    }

    #[test]
    fn test_durations_and_flags() {
        let env = reader(&[
            ("APP_TIMEOUT", "1.5"),
            ("APP_BACKOFF", "250"),
            ("APP_STRICT", "yes"),
            ("APP_BAD", "maybe"),
            ("APP_NEG", "-1"),
        ]);
        assert_eq!(env.duration_secs("TIMEOUT").unwrap(), Some(Duration::from_millis(1500)));
        assert_eq!(env.duration_millis("BACKOFF").unwrap(), Some(Duration::from_millis(250)));
        assert_eq!(env.flag("STRICT").unwrap(), Some(true));
        assert!(env.flag("BAD").is_err());
        assert!(env.duration_secs("NEG").is_err());
    }
}
