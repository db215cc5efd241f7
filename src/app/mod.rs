use crate::{
    cli::RunOptions,
    config::PluginConfig,
    host::EventBridge,
    pipeline::AwsCliClient,
    poller::Timings,
    Result,
};
use std::{
    path::{Path, PathBuf},
    sync::Arc,
    time::Duration,
};

mod lifecycle;
mod logger;
pub mod runtime;

pub use logger::{LogLevel, Logger};

/// Config for the daemon: the config file with CLI overrides applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub action_uuid: String,
    pub timings: Timings,
    pub fetch_timeout: Duration,
    pub aws_cli: String,
    pub log_level: LogLevel,
    pub log_file: Option<PathBuf>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self::from_sources(PluginConfig::default(), RunOptions::default())
    }
}

impl AppConfig {
    pub fn from_sources(config: PluginConfig, opts: RunOptions) -> Self {
        Self {
            action_uuid: opts.action_uuid.unwrap_or_else(|| config.action_uuid.clone()),
            timings: config.timings(),
            fetch_timeout: config.fetch_timeout,
            aws_cli: opts.aws_cli.unwrap_or_else(|| config.aws_cli.clone()),
            log_level: opts.log_level.unwrap_or_default(),
            log_file: opts.log_file,
        }
    }
}

pub struct App {
    config: AppConfig,
    logger: Logger,
    created_config: Option<PathBuf>,
}

impl App {
    pub fn new(config: AppConfig) -> Result<Self> {
        let logger = Logger::new(config.log_level, config.log_file.clone())?;
        Ok(Self {
            config,
            logger,
            created_config: None,
        })
    }

    pub fn from_options(opts: RunOptions) -> Result<Self> {
        let (cfg_file, created) = match opts.config.as_deref() {
            Some(path) => (PluginConfig::load_from_path(path)?, None),
            None => PluginConfig::load_or_create()?,
        };
        let merged = AppConfig::from_sources(cfg_file, opts);
        let mut app = Self::new(merged)?;
        app.created_config = created;
        Ok(app)
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Path of the default config written while loading, if this was the first run.
    pub fn created_config(&self) -> Option<&Path> {
        self.created_config.as_deref()
    }

    /// Entry point for the daemon: install logging, then serve the host until stdin closes.
    pub fn run(self) -> Result<()> {
        let Self {
            config,
            logger,
            created_config,
        } = self;
        logger.install()?;
        if let Some(path) = created_config {
            log::info!("wrote default config to {}", path.display());
        }
        log::info!(
            "pipeline-deck {} start (action={}, refresh={}, long press={}, aws={})",
            env!("CARGO_PKG_VERSION"),
            config.action_uuid,
            humantime::format_duration(config.timings.refresh_interval),
            humantime::format_duration(config.timings.long_press),
            config.aws_cli
        );

        let client = AwsCliClient::new(config.aws_cli.clone(), config.fetch_timeout);
        runtime::run_stdio(
            Arc::new(client),
            EventBridge::new(config.action_uuid.clone()),
            config.timings,
        )
    }
}
