//! Configuration loading
//!
//! Sources, lowest precedence first:
//! 1. Built-in defaults
//! 2. Config file: `--config` / `REFRAIN_CONFIG_PATH`, otherwise an optional
//!    `refrain.toml` in the working directory
//! 3. `REFRAIN_*` environment variables (`REFRAIN_ENGINE__MAX_RESUMES=500`)
//! 4. Explicit builder overrides
//!
//! A `.env` file is loaded into the environment first.

use anyhow::{Context, Result};
use config::{Environment, File};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Environment variable naming the config file
pub const CONFIG_PATH_ENV: &str = "REFRAIN_CONFIG_PATH";

const DEFAULT_CONFIG_NAME: &str = "refrain";
const DEFAULT_LOG_FILTER: &str = "warn";

/// Effective configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub engine: EngineConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Engine tuning
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Resumes a `Driver` performs before raising `TimeoutError` (0 = unlimited)
    #[serde(default)]
    pub max_resumes: usize,

    /// Body invocations between cooperative `Tick` pauses in `iter_for`
    /// (0 = never tick)
    #[serde(default)]
    pub tick_interval: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// `tracing_subscriber::EnvFilter` directive; `RUST_LOG` wins when set
    #[serde(default = "default_log_filter")]
    pub filter: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: default_log_filter(),
        }
    }
}

fn default_log_filter() -> String {
    DEFAULT_LOG_FILTER.to_string()
}

impl Config {
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    /// Load from the default sources
    pub fn load() -> Result<Self> {
        Self::builder().build()
    }

    fn validate(&self) -> Result<()> {
        if self.logging.filter.trim().is_empty() {
            anyhow::bail!("logging.filter must not be empty");
        }
        Ok(())
    }
}

/// Layered configuration with explicit overrides
#[derive(Debug, Default)]
pub struct ConfigBuilder {
    config_path: Option<PathBuf>,
    max_resumes: Option<usize>,
    tick_interval: Option<usize>,
    log_filter: Option<String>,
}

impl ConfigBuilder {
    /// Config file to read (overrides `REFRAIN_CONFIG_PATH`)
    pub fn config_path(mut self, path: Option<PathBuf>) -> Self {
        self.config_path = path;
        self
    }

    pub fn max_resumes(mut self, max_resumes: Option<usize>) -> Self {
        self.max_resumes = max_resumes;
        self
    }

    pub fn tick_interval(mut self, tick_interval: Option<usize>) -> Self {
        self.tick_interval = tick_interval;
        self
    }

    pub fn log_filter(mut self, filter: Option<String>) -> Self {
        self.log_filter = filter;
        self
    }

    pub fn build(self) -> Result<Config> {
        // A missing .env is fine
        let _ = dotenvy::dotenv();

        let mut builder = config::Config::builder()
            .set_default("engine.max_resumes", 0_u64)?
            .set_default("engine.tick_interval", 0_u64)?
            .set_default("logging.filter", DEFAULT_LOG_FILTER)?;

        let path = self
            .config_path
            .or_else(|| std::env::var(CONFIG_PATH_ENV).ok().map(PathBuf::from));
        builder = match &path {
            Some(path) => builder.add_source(File::from(path.as_path()).required(true)),
            None => builder.add_source(File::with_name(DEFAULT_CONFIG_NAME).required(false)),
        };

        builder = builder.add_source(
            Environment::with_prefix("REFRAIN")
                .separator("__")
                .try_parsing(true),
        );

        if let Some(max_resumes) = self.max_resumes {
            builder = builder.set_override("engine.max_resumes", max_resumes as u64)?;
        }
        if let Some(tick_interval) = self.tick_interval {
            builder = builder.set_override("engine.tick_interval", tick_interval as u64)?;
        }
        if let Some(filter) = self.log_filter {
            builder = builder.set_override("logging.filter", filter)?;
        }

        let config: Config = builder
            .build()
            .with_context(|| match &path {
                Some(path) => format!("Failed to read config file {}", path.display()),
                None => "Failed to read configuration".to_string(),
            })?
            .try_deserialize()
            .context("Invalid configuration")?;

        config.validate()?;
        Ok(config)
    }
}
