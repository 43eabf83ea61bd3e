use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{bail, Context, Result};
use clap::{ArgAction, Args, Parser, Subcommand};
use serde::Serialize;
use serde_json::{json, Map, Value};

use pipeline_resilience::config::EngineConfig;
use pipeline_resilience::decision::{DecisionEngine, DecisionOptions};
use pipeline_resilience::degradation::apply_degradation;
use pipeline_resilience::error::{classify, Fault};
use pipeline_resilience::logging::{init_logging, LoggingConfig};
use pipeline_resilience::retry::{JitterSource, SeededJitter, ThreadRngJitter};

#[derive(Parser, Debug)]
#[command(name = "resilience")]
#[command(version)]
#[command(about = "Failure decisions for content-generation pipelines")]
struct Cli {
    /// Suppress all log output except errors
    #[arg(long, short, global = true)]
    quiet: bool,

    /// Increase verbosity (-v, -vv)
    #[arg(long, short, action = ArgAction::Count, global = true, conflicts_with = "quiet")]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Classify a fault and print its classification
    Classify {
        #[command(flatten)]
        fault: FaultArgs,
    },

    /// Decide what to do about a failed step
    Decide {
        #[command(flatten)]
        fault: FaultArgs,

        /// Attempts already made (1-indexed)
        #[arg(long, default_value = "1")]
        attempt: u32,

        /// Attempt budget (defaults to the configured retry count)
        #[arg(long)]
        max_attempts: Option<u32>,

        /// Continue with degraded output instead of failing
        #[arg(long)]
        continue_on_error: bool,

        /// Model the failed step ran against
        #[arg(long)]
        model: Option<String>,

        #[arg(long)]
        request_id: Option<String>,

        #[arg(long)]
        workflow: Option<String>,

        #[arg(long)]
        node: Option<String>,

        /// Engine configuration file (TOML)
        #[arg(long, short)]
        config: Option<PathBuf>,

        /// Seed the jitter source for reproducible delays
        #[arg(long)]
        seed: Option<u64>,
    },

    /// Look up the fallback for a model
    Fallback {
        model: String,

        /// How many fallbacks have already been tried
        #[arg(long, default_value = "0")]
        tried: usize,

        /// Engine configuration file (TOML)
        #[arg(long, short)]
        config: Option<PathBuf>,
    },

    /// Apply a graceful-degradation scenario
    Degrade {
        scenario: String,

        /// JSON object echoed back in the result
        #[arg(long)]
        context: Option<String>,
    },
}

#[derive(Args, Debug)]
struct FaultArgs {
    /// HTTP-like status code reported by the failing call
    #[arg(long)]
    status: Option<i64>,

    /// Error message text
    #[arg(long, short)]
    message: Option<String>,

    /// Fault as a JSON object (message, statusCode/status/code, stack)
    #[arg(long, conflicts_with_all = ["status", "message"])]
    fault: Option<String>,
}

impl FaultArgs {
    fn to_fault(&self) -> Result<Fault> {
        if let Some(raw) = &self.fault {
            let value: Value = serde_json::from_str(raw).context("--fault is not valid JSON")?;
            return Ok(Fault::from_json(&value));
        }

        let mut fault = Fault::new();
        if let Some(message) = &self.message {
            fault = fault.with_message(message.clone());
        }
        if let Some(status) = self.status {
            fault = fault.with_status(status);
        }
        Ok(fault)
    }
}

mod exit_codes {
    use std::process::ExitCode;

    /// The degradation scenario is not in the catalogue
    pub fn unknown_scenario() -> ExitCode {
        ExitCode::from(2)
    }
}

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    init_logging(
        LoggingConfig::from_flags(cli.verbose, cli.quiet)
            .with_env_level()
            .with_timestamps(false),
    );

    match cli.command {
        Commands::Classify { fault } => {
            print_json(&classify(&fault.to_fault()?))?;
        }
        Commands::Decide {
            fault,
            attempt,
            max_attempts,
            continue_on_error,
            model,
            request_id,
            workflow,
            node,
            config,
            seed,
        } => {
            let fault = fault.to_fault()?;
            let options = DecisionOptions {
                attempt_number: attempt,
                max_attempts,
                continue_on_error,
                current_model_id: model,
                request_id,
                workflow_name: workflow,
                node_name: node,
                input_summary: None,
            };

            let jitter: Box<dyn JitterSource> = match seed {
                Some(seed) => Box::new(SeededJitter::new(seed)),
                None => Box::new(ThreadRngJitter),
            };
            let engine = DecisionEngine::with_jitter(load_config(config.as_deref())?, jitter);
            print_json(&engine.handle(&fault, &options))?;
        }
        Commands::Fallback {
            model,
            tried,
            config,
        } => {
            let config = load_config(config.as_deref())?;
            let fallback = config.model_fallbacks.next_fallback(&model, tried);
            print_json(&json!({
                "model": model,
                "tried": tried,
                "fallback": fallback,
            }))?;
        }
        Commands::Degrade { scenario, context } => {
            let context = parse_context(context.as_deref())?;
            let result = apply_degradation(&scenario, context);
            print_json(&result)?;
            if !result.applied {
                return Ok(exit_codes::unknown_scenario());
            }
        }
    }

    Ok(ExitCode::SUCCESS)
}

fn load_config(path: Option<&Path>) -> Result<EngineConfig> {
    match path {
        Some(path) => EngineConfig::load(path)
            .with_context(|| format!("failed to load config from {}", path.display())),
        None => Ok(EngineConfig::default()),
    }
}

fn parse_context(raw: Option<&str>) -> Result<Map<String, Value>> {
    let Some(raw) = raw else {
        return Ok(Map::new());
    };
    match serde_json::from_str::<Value>(raw).context("--context is not valid JSON")? {
        Value::Object(map) => Ok(map),
        other => bail!("--context must be a JSON object, got {other}"),
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
