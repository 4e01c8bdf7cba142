//! Multi-agent financial research CLI
//!
//! # Usage
//!
//! ```bash
//! export OPENAI_API_BASE="http://localhost:1234/v1"
//! export OPENAI_MODEL="your-model-name"
//! export FINNHUB_API_KEY="..."
//!
//! finresearch run AAPL --company "Apple Inc." --mode sequential
//! finresearch interactive
//! ```

use agent_research::{InteractiveSession, Output, ResearchConfig, ResearchSession, RunRequest, SessionState};
use agent_utils::{LogFormat, init_tracing_with};
use agent_workflow::DelegationMode;
use clap::{Parser, Subcommand};
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser, Debug)]
#[command(name = "finresearch", version)]
#[command(about = "Research a listed company with a crew of cooperating agents", long_about = None)]
struct Cli {
    /// Log output format (pretty or json)
    #[arg(long, global = true, default_value = "pretty")]
    log_format: LogFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the research graph once and print the report
    Run {
        /// Ticker symbol, e.g. AAPL
        ticker: String,

        /// Company name used in prompts and the report title
        #[arg(long)]
        company: Option<String>,

        /// sequential or hierarchical (default from FINRESEARCH_MODE)
        #[arg(long)]
        mode: Option<DelegationMode>,

        /// Clear stored findings for the ticker first
        #[arg(long)]
        reset_memory: bool,

        /// Print the result record as JSON
        #[arg(long)]
        json: bool,

        /// Save the report under FINRESEARCH_OUTPUT_DIR (default ./reports)
        #[arg(long)]
        save: bool,
    },

    /// Start an interactive session
    Interactive,

    /// Clear stored findings for a ticker
    Reset {
        ticker: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();
    init_tracing_with(cli.log_format, "warn,agent_research=info,agent_workflow=info,run_log=info");

    let config = ResearchConfig::from_env()?;
    let output_dir = config
        .output_dir
        .clone()
        .unwrap_or_else(|| PathBuf::from("reports"));
    let session = ResearchSession::from_config(config).await?;

    match cli.command {
        Commands::Run {
            ticker,
            company,
            mode,
            reset_memory,
            json,
            save,
        } => {
            let mut request = RunRequest::new(ticker).with_reset_memory(reset_memory);
            if let Some(company) = company {
                request = request.with_company_name(company);
            }
            if let Some(mode) = mode {
                request = request.with_mode(mode);
            }

            let outcome = session.run(request).await;

            if json {
                println!("{}", serde_json::to_string_pretty(&outcome.to_report())?);
            } else if let Some(report) = outcome.report_markdown() {
                println!("{report}");
            } else {
                for line in &outcome.log_entries {
                    eprintln!("{line}");
                }
            }

            if save && outcome.document.is_some() {
                let path = session.save_report(&outcome, &output_dir).await?;
                eprintln!("Report saved to {}", path.display());
            }

            if let Some(err) = &outcome.error {
                eprintln!("Error: {err}");
            }
            Ok(if outcome.success {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            })
        }
        Commands::Interactive => {
            repl(InteractiveSession::new(session)).await?;
            Ok(ExitCode::SUCCESS)
        }
        Commands::Reset { ticker } => {
            session.reset(&ticker).await?;
            println!("Cleared stored findings for {}", ticker.to_uppercase());
            Ok(ExitCode::SUCCESS)
        }
    }
}

async fn repl(interactive: InteractiveSession) -> anyhow::Result<()> {
    println!("Financial research session. Type `help` for commands.\n");

    let mut state = SessionState::new();
    let stdin = io::stdin();
    let mut stdout = io::stdout();

    loop {
        print!("{}", InteractiveSession::prompt(&state));
        stdout.flush()?;

        let mut input = String::new();
        match stdin.lock().read_line(&mut input) {
            Ok(0) => {
                println!();
                break;
            }
            Ok(_) => {}
            Err(e) => {
                eprintln!("Error reading input: {e}");
                continue;
            }
        }

        let input = input.trim();
        if input.is_empty() {
            continue;
        }

        match interactive.handle(&mut state, input).await {
            Ok(Output::Text(text)) => println!("{text}\n"),
            Ok(Output::Exit) => break,
            Err(e) => eprintln!("Error: {e}\n"),
        }
    }

    println!("Goodbye!");
    Ok(())
}
