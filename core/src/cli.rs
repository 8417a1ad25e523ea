use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use serde_json::json;

use crate::config::Config;
use crate::demos;
use crate::engine::{json_to_val, val_to_json, GenStep, Val};
use crate::init::InitOptions;

#[derive(Parser)]
#[command(name = "refrain")]
#[command(about = "Refrain - suspension-driven cooperative execution engine", long_about = None)]
pub struct Cli {
    /// Path to config file (overrides default search)
    #[arg(long, global = true)]
    pub config: Option<String>,

    /// Log filter, e.g. "refrain_core=debug" (overrides config file and env vars)
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run a bundled demo generator to completion, printing each step as JSON
    Demo {
        /// Demo name (countdown, accumulator, delegating, echo, stubborn, fetch_pair)
        name: String,

        /// JSON values to send, one per step after the first
        #[arg(short = 's', long = "send")]
        send: Vec<String>,

        /// Close the generator after this many steps instead of exhausting it
        #[arg(long)]
        close_after: Option<usize>,
    },

    /// Print the effective configuration
    Config {
        #[arg(long, value_enum, default_value = "json")]
        format: ConfigFormat,
    },
}

#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum ConfigFormat {
    Json,
    Toml,
}

/// Run the CLI by parsing process arguments
pub fn run_cli() -> Result<()> {
    let cli = Cli::parse();
    run_cli_with_args(cli)
}

/// Run the CLI with provided arguments (for embeddings that filter args)
pub fn run_cli_from_args(args: Vec<String>) -> Result<()> {
    let cli = Cli::parse_from(args);
    run_cli_with_args(cli)
}

fn run_cli_with_args(cli: Cli) -> Result<()> {
    crate::init::initialize(InitOptions {
        config_path: cli.config.clone(),
        log_filter: cli.log_level.clone(),
        install_tracing: true,
        ..Default::default()
    })?;

    match cli.command {
        Commands::Demo {
            name,
            send,
            close_after,
        } => run_demo(&name, &send, close_after),

        Commands::Config { format } => {
            let config = match crate::init::get_config() {
                Some(config) => config.clone(),
                None => Config::load()?,
            };
            let rendered = match format {
                ConfigFormat::Json => serde_json::to_string_pretty(&config)?,
                ConfigFormat::Toml => toml::to_string_pretty(&config)?,
            };
            println!("{}", rendered);
            Ok(())
        }
    }
}

fn run_demo(name: &str, send: &[String], close_after: Option<usize>) -> Result<()> {
    let generator = demos::by_name(name).with_context(|| {
        format!(
            "Unknown demo '{}' (available: {})",
            name,
            demos::NAMES.join(", ")
        )
    })?;

    let mut inputs = Vec::with_capacity(send.len());
    for raw in send {
        let json: serde_json::Value =
            serde_json::from_str(raw).with_context(|| format!("Invalid JSON for --send: {}", raw))?;
        inputs.push(json_to_val(&json));
    }
    let mut inputs = inputs.into_iter();

    let mut driver = demos::demo_driver();
    let mut value = Val::Null;
    let mut steps = 0;
    loop {
        if close_after == Some(steps) {
            generator.close()?;
            println!("{}", json!({ "step": steps, "closed": true }));
            return Ok(());
        }

        let step = driver.pump(&generator, value)?;
        steps += 1;
        match step {
            GenStep::Yielded(yielded) => {
                println!("{}", json!({ "step": steps, "yielded": val_to_json(&yielded) }));
            }
            GenStep::Exhausted(returned) => {
                let returned = returned.unwrap_or_default();
                println!("{}", json!({ "step": steps, "returned": val_to_json(&returned) }));
                return Ok(());
            }
            GenStep::Pending(kind) => {
                anyhow::bail!("demo '{}' paused on '{}' with no handler", name, kind);
            }
        }
        value = inputs.next().unwrap_or_default();
    }
}
