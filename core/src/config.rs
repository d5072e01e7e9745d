use std::{fs, path::PathBuf, sync::Arc};

use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::Deserialize;
use tracing::Level;

use crate::{
    cli::Cli,
    services::{
        cleanup::CleanerConfig,
        log::{parse_level, TracingSink},
    },
};

/// Runtime settings for the binary resolved from file, env and CLI.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Settings {
    /// Directory to clean.
    pub directory: PathBuf,
    /// Maximum age of entries to keep, in days.
    pub retention_days: u32,
    /// Seconds between two passes.
    pub frequency_secs: u64,
    /// Whether status lines are logged at all.
    pub logging_enabled: bool,
    /// Most verbose level the subscriber lets through.
    pub log_level: Level,
}

#[derive(Deserialize, Default)]
struct FileConfig {
    #[serde(default)]
    janitor: FileJanitor,
    #[serde(default)]
    logging: FileLogging,
}

#[derive(Deserialize)]
struct FileJanitor {
    #[serde(default)]
    directory: Option<PathBuf>,
    #[serde(default = "default_retention_days")]
    retention_days: u32,
    #[serde(default = "default_frequency_secs")]
    frequency_secs: u64,
}

#[derive(Deserialize)]
struct FileLogging {
    #[serde(default = "default_logging")]
    enabled: bool,
    #[serde(default)]
    level: Option<String>,
}

fn default_retention_days() -> u32 {
    7
}

fn default_frequency_secs() -> u64 {
    3600
}

fn default_logging() -> bool {
    true
}

impl Default for FileJanitor {
    fn default() -> Self {
        Self {
            directory: None,
            retention_days: default_retention_days(),
            frequency_secs: default_frequency_secs(),
        }
    }
}

impl Default for FileLogging {
    fn default() -> Self {
        Self {
            enabled: default_logging(),
            level: None,
        }
    }
}

impl Settings {
    /// Resolve settings from CLI, environment variables, config file and defaults.
    pub fn load(cli: &Cli) -> Result<Self> {
        // built-in defaults
        let mut directory: Option<PathBuf> = None;
        let mut retention_days = default_retention_days();
        let mut frequency_secs = default_frequency_secs();
        let mut logging = default_logging();
        let mut log_level = Level::INFO;

        // config file path precedence: CLI -> ENV -> default
        let explicit = cli
            .config
            .clone()
            .or_else(|| std::env::var("DIRJANITOR_CONFIG").ok().map(PathBuf::from));
        let contents = match &explicit {
            // a named file must be readable; a missing default is fine
            Some(path) => Some(
                fs::read(path)
                    .with_context(|| format!("can't read config file {}", path.display()))?,
            ),
            None => fs::read(default_config_path()).ok(),
        };

        if let Some(bytes) = contents {
            let contents = String::from_utf8_lossy(&bytes);
            let file_cfg: FileConfig = toml::from_str(&contents).context("invalid config file")?;
            directory = file_cfg.janitor.directory;
            retention_days = file_cfg.janitor.retention_days;
            frequency_secs = file_cfg.janitor.frequency_secs;
            logging = file_cfg.logging.enabled;
            if let Some(level) = file_cfg.logging.level {
                log_level = parse_level(&level);
            }
        }

        // environment overrides
        if let Ok(d) = std::env::var("DIRJANITOR_DIRECTORY") {
            directory = Some(PathBuf::from(d));
        }
        if let Ok(r) = std::env::var("DIRJANITOR_RETENTION_DAYS") {
            if let Ok(r) = r.parse::<u32>() {
                retention_days = r;
            }
        }
        if let Ok(f) = std::env::var("DIRJANITOR_FREQUENCY_SECS") {
            if let Ok(f) = f.parse::<u64>() {
                frequency_secs = f;
            }
        }
        if let Ok(l) = std::env::var("DIRJANITOR_LOGGING") {
            if let Ok(l) = l.parse::<bool>() {
                logging = l;
            }
        }
        if let Ok(l) = std::env::var("DIRJANITOR_LOG_LEVEL") {
            log_level = parse_level(&l);
        }

        // CLI overrides
        if let Some(d) = &cli.directory {
            directory = Some(d.clone());
        }
        if let Some(r) = cli.retention_days {
            retention_days = r;
        }
        if let Some(f) = cli.frequency_secs {
            frequency_secs = f;
        }
        if let Some(l) = cli.logging {
            logging = l;
        }

        let Some(directory) = directory else {
            anyhow::bail!("missing_directory");
        };
        // a zero period would spin the loop
        if frequency_secs == 0 {
            anyhow::bail!("invalid_frequency");
        }

        Ok(Self {
            directory,
            retention_days,
            frequency_secs,
            logging_enabled: logging,
            log_level,
        })
    }

    /// Level the tracing subscriber is capped at.
    pub fn max_level(&self) -> Level {
        if self.logging_enabled {
            self.log_level
        } else {
            Level::WARN
        }
    }

    /// Build the cleaner configuration; logging goes through `tracing` when enabled.
    pub fn cleaner_config(&self) -> CleanerConfig {
        let cfg = CleanerConfig::new(&self.directory, self.retention_days)
            .with_frequency_secs(self.frequency_secs);
        if self.logging_enabled {
            cfg.with_log_sink(Arc::new(TracingSink))
        } else {
            cfg
        }
    }
}

/// Determine the default config file location.
pub fn default_config_path() -> PathBuf {
    ProjectDirs::from("org", "dirjanitor", "dirjanitor")
        .map(|proj| proj.config_dir().join("dirjanitor.toml"))
        .unwrap_or_else(|| PathBuf::from("config/dirjanitor.toml"))
}
