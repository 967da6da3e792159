use crate::coordinator::CoordinatorSettings;
use crate::matchmaking::MatchmakingSettings;
use crate::services::RatingSettings;
use crate::storage::get_database_path;
use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MatchmakingConfig {
    /// Initial acceptance range in rating points
    pub base_range: u32,
    /// Points added every widen step
    pub range_increment: u32,
    pub widen_interval_secs: u64,
    pub max_wait_secs: u64,
    pub rematch_timeout_secs: u64,
    /// Period of the queue-status push and match sweep
    pub status_interval_secs: u64,
}

impl Default for MatchmakingConfig {
    fn default() -> Self {
        Self {
            base_range: 100,
            range_increment: 50,
            widen_interval_secs: 5,
            max_wait_secs: 60,
            rematch_timeout_secs: 30,
            status_interval_secs: 5,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RatingConfig {
    pub k_factor: i32,
    pub default_rating: i32,
}

impl Default for RatingConfig {
    fn default() -> Self {
        Self {
            k_factor: 24,
            default_rating: 1200,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub database_path: PathBuf,
    /// Finished-game summaries kept in memory for rematch lookups
    pub retained_results: usize,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: get_database_path().unwrap_or_else(|_| PathBuf::from("arena.sqlite")),
            retained_results: 256,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// `tracing_subscriber::EnvFilter` directive, overridden by `RUST_LOG`
    pub filter: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "info".to_string(),
        }
    }
}

/// Application configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub matchmaking: MatchmakingConfig,
    pub rating: RatingConfig,
    pub storage: StorageConfig,
    pub logging: LoggingConfig,
}

impl Config {
    fn project_dirs() -> Result<ProjectDirs> {
        ProjectDirs::from("dev", "mate", "mate-arena")
            .ok_or_else(|| anyhow::anyhow!("Could not determine application directories"))
    }

    /// Get the default data directory
    pub fn default_data_dir() -> Result<PathBuf> {
        Ok(Self::project_dirs()?.data_dir().to_path_buf())
    }

    /// Get the default config file path
    pub fn default_config_file() -> Result<PathBuf> {
        Ok(Self::project_dirs()?.config_dir().join("config.toml"))
    }

    /// Read and parse a configuration file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read configuration file {}", path.display()))?;
        toml::from_str(&content).context("Failed to parse configuration file")
    }

    /// Load the configuration at `path`, writing the defaults there first if
    /// it does not exist yet
    pub fn load_or_create(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::load(path)
        } else {
            let config = Config::default();
            config.save(path)?;
            Ok(config)
        }
    }

    /// Load configuration from the default location, creating it if needed
    pub fn load_or_create_default() -> Result<Self> {
        Self::load_or_create(&Self::default_config_file()?)
    }

    /// Save configuration to file
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).context("Failed to create config directory")?;
        }
        let content = toml::to_string_pretty(self).context("Failed to serialize configuration")?;
        std::fs::write(path, content).context("Failed to write configuration file")?;
        Ok(())
    }

    pub fn matchmaking_settings(&self) -> MatchmakingSettings {
        let m = &self.matchmaking;
        MatchmakingSettings {
            base_range: m.base_range,
            range_increment: m.range_increment,
            widen_interval: Duration::from_secs(m.widen_interval_secs),
            max_wait: Duration::from_secs(m.max_wait_secs),
            rematch_timeout: Duration::from_secs(m.rematch_timeout_secs),
            status_interval: Duration::from_secs(m.status_interval_secs),
        }
    }

    pub fn rating_settings(&self) -> RatingSettings {
        RatingSettings {
            k_factor: self.rating.k_factor,
            default_rating: self.rating.default_rating,
        }
    }

    pub fn coordinator_settings(&self) -> CoordinatorSettings {
        CoordinatorSettings {
            retained_results: self.storage.retained_results,
            fallback_rating: self.rating.default_rating,
        }
    }
}
