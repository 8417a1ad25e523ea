//! Initialization system for Refrain
//!
//! Embeddings call this once before driving guest code. It loads the
//! configuration, optionally installs the tracing subscriber, and keeps the
//! result in global state. Engine code that needs a setting and finds nothing
//! initialized falls back to the defaults.
//!
//! # Example
//!
//! ```rust,no_run
//! use refrain_core::init::InitBuilder;
//!
//! InitBuilder::new()
//!     .config_path("refrain.toml")
//!     .max_resumes(10_000)
//!     .init()?;
//! # Ok::<(), anyhow::Error>(())
//! ```

use anyhow::{anyhow, Context, Result};
use std::sync::OnceLock;
use tracing_subscriber::EnvFilter;

use crate::config::{Config, EngineConfig};

/// Global initialization state
static INIT_STATE: OnceLock<InitState> = OnceLock::new();

#[derive(Debug)]
struct InitState {
    config: Config,
}

/// Options for initializing Refrain
#[derive(Debug, Clone, Default)]
pub struct InitOptions {
    /// Config file path (overrides default search)
    pub config_path: Option<String>,

    /// Resume budget for drivers (overrides config file and env vars)
    pub max_resumes: Option<usize>,

    /// Tick interval for `iter_for` (overrides config file and env vars)
    pub tick_interval: Option<usize>,

    /// Log filter (overrides config file and env vars)
    pub log_filter: Option<String>,

    /// Whether to install the global tracing subscriber
    pub install_tracing: bool,
}

/// Builder for constructing InitOptions
pub struct InitBuilder {
    options: InitOptions,
}

impl InitBuilder {
    pub fn new() -> Self {
        Self {
            options: InitOptions::default(),
        }
    }

    /// Set the config file path
    pub fn config_path(mut self, path: impl Into<String>) -> Self {
        self.options.config_path = Some(path.into());
        self
    }

    pub fn max_resumes(mut self, max_resumes: usize) -> Self {
        self.options.max_resumes = Some(max_resumes);
        self
    }

    pub fn tick_interval(mut self, tick_interval: usize) -> Self {
        self.options.tick_interval = Some(tick_interval);
        self
    }

    pub fn log_filter(mut self, filter: impl Into<String>) -> Self {
        self.options.log_filter = Some(filter.into());
        self
    }

    /// Install a stderr tracing subscriber during initialization
    pub fn install_tracing(mut self, install: bool) -> Self {
        self.options.install_tracing = install;
        self
    }

    pub fn init(self) -> Result<()> {
        initialize(self.options)
    }
}

impl Default for InitBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Initialize Refrain with the given options
///
/// Calling this function multiple times is safe - subsequent calls are no-ops.
pub fn initialize(options: InitOptions) -> Result<()> {
    if INIT_STATE.get().is_some() {
        return Ok(());
    }

    let config = Config::builder()
        .config_path(options.config_path.map(std::path::PathBuf::from))
        .max_resumes(options.max_resumes)
        .tick_interval(options.tick_interval)
        .log_filter(options.log_filter)
        .build()
        .context("Failed to load configuration")?;

    if options.install_tracing {
        init_tracing(&config.logging.filter);
    }

    tracing::debug!(
        max_resumes = config.engine.max_resumes,
        tick_interval = config.engine.tick_interval,
        "refrain initialized"
    );

    INIT_STATE
        .set(InitState { config })
        .map_err(|_| anyhow!("Initialization already completed"))?;

    Ok(())
}

/// Install the stderr subscriber; `RUST_LOG` overrides `filter`
///
/// Returns false when a global subscriber was already installed.
pub fn init_tracing(filter: &str) -> bool {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)))
        .with_writer(std::io::stderr)
        .try_init()
        .is_ok()
}

/// Check if Refrain has been initialized
pub fn is_initialized() -> bool {
    INIT_STATE.get().is_some()
}

/// The loaded configuration, if initialized
pub fn get_config() -> Option<&'static Config> {
    INIT_STATE.get().map(|state| &state.config)
}

/// Engine settings in effect (defaults before initialization)
pub fn engine_config() -> EngineConfig {
    get_config()
        .map(|config| config.engine.clone())
        .unwrap_or_default()
}
