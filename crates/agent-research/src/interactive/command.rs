//! Parsing of interactive input lines

use agent_core::{Error, Result};
use regex::Regex;
use std::sync::LazyLock;

static TICKER: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"^[A-Z]{1,5}([.-][A-Z]{1,2})?$").ok());

/// Whether `token` is a ticker symbol as typed (upper case)
pub fn is_ticker(token: &str) -> bool {
    TICKER.as_ref().is_some_and(|re| re.is_match(token))
}

/// One parsed input line
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// `research T`, `analyze T` or a bare ticker
    Research { ticker: String },
    /// `context [T]`
    Context { ticker: Option<String> },
    Status,
    /// `clear [--memory]`
    Clear { memory: bool },
    Help,
    /// `exit` or `quit`
    Exit,
    /// Anything else; only meaningful with an active ticker
    FollowUp { text: String },
}

fn ticker_arg(command: &str, arg: Option<&str>) -> Result<String> {
    let arg = arg.ok_or_else(|| Error::UnknownCommand(format!("{command} requires a ticker")))?;
    let ticker = arg.to_uppercase();
    if is_ticker(&ticker) {
        Ok(ticker)
    } else {
        Err(Error::UnknownCommand(format!("'{arg}' is not a ticker symbol")))
    }
}

impl Command {
    pub fn parse(line: &str) -> Result<Self> {
        let line = line.trim();
        if line.is_empty() {
            return Err(Error::UnknownCommand("empty input".to_string()));
        }

        let mut words = line.split_whitespace();
        let head = words.next().unwrap_or_default();
        let arg = words.next();
        let extra = words.next().is_some();

        let command = match (head.to_lowercase().as_str(), extra) {
            ("research" | "analyze", false) => Command::Research {
                ticker: ticker_arg(head, arg)?,
            },
            ("context", false) => Command::Context {
                ticker: arg.map(|a| ticker_arg(head, Some(a))).transpose()?,
            },
            ("status", false) if arg.is_none() => Command::Status,
            ("clear", false) => match arg {
                None => Command::Clear { memory: false },
                Some("--memory") => Command::Clear { memory: true },
                Some(other) => {
                    return Err(Error::UnknownCommand(format!("clear does not take '{other}'")));
                }
            },
            ("help", false) if arg.is_none() => Command::Help,
            ("exit" | "quit", false) if arg.is_none() => Command::Exit,
            _ if arg.is_none() && is_ticker(head) => Command::Research {
                ticker: head.to_string(),
            },
            _ => Command::FollowUp {
                text: line.to_string(),
            },
        };
        Ok(command)
    }

    pub fn help_text() -> &'static str {
        "\
Commands:
  research <TICKER>   run the full research graph (alias: analyze, or type the ticker)
  context [TICKER]    show stored findings for the active or named ticker
  status              show session history
  clear [--memory]    reset the session; --memory also clears the active ticker's findings
  help                show this help
  exit | quit         leave the session

Anything else is answered from stored findings for the active ticker."
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_research_forms() {
        let expected = Command::Research {
            ticker: "AAPL".to_string(),
        };
        assert_eq!(Command::parse("research aapl").unwrap(), expected);
        assert_eq!(Command::parse("ANALYZE AAPL").unwrap(), expected);
        assert_eq!(Command::parse("  AAPL ").unwrap(), expected);
        assert_eq!(
            Command::parse("BRK.B").unwrap(),
            Command::Research {
                ticker: "BRK.B".to_string()
            }
        );
    }

    #[test]
    fn test_bare_ticker_must_be_upper_case() {
        assert!(is_ticker("MSFT"));
        assert!(is_ticker("RDS-A"));
        assert!(!is_ticker("msft"));
        assert!(!is_ticker("TOOLONG"));
        assert_eq!(
            Command::parse("hello").unwrap(),
            Command::FollowUp {
                text: "hello".to_string()
            }
        );
    }

    #[test]
    fn test_management_commands() {
        assert_eq!(Command::parse("context").unwrap(), Command::Context { ticker: None });
        assert_eq!(
            Command::parse("context msft").unwrap(),
            Command::Context {
                ticker: Some("MSFT".to_string())
            }
        );
        assert_eq!(Command::parse("status").unwrap(), Command::Status);
        assert_eq!(Command::parse("clear --memory").unwrap(), Command::Clear { memory: true });
        assert_eq!(Command::parse("QUIT").unwrap(), Command::Exit);
        assert_eq!(Command::parse("help").unwrap(), Command::Help);
    }

    #[test]
    fn test_malformed_commands() {
        assert_eq!(Command::parse("research").unwrap_err().kind(), "unknown_command");
        assert_eq!(Command::parse("research 12345").unwrap_err().kind(), "unknown_command");
        assert_eq!(Command::parse("clear everything").unwrap_err().kind(), "unknown_command");
        assert!(Command::parse("   ").is_err());
    }

    #[test]
    fn test_questions_are_follow_ups() {
        assert_eq!(
            Command::parse("what about margins?").unwrap(),
            Command::FollowUp {
                text: "what about margins?".to_string()
            }
        );
        assert_eq!(
            Command::parse("status of the buyback").unwrap(),
            Command::FollowUp {
                text: "status of the buyback".to_string()
            }
        );
    }
}
