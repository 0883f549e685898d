//! # Configuration Management Module
//!
//! Spawnkeeper reads a single TOML file with three sections:
//!
//! - [`SpawnConfig`] - search radius, isolation distance, try budget, flatness limit
//! - [`StorageConfig`] - world save directory and backup file locations
//! - [`LoggingConfig`] - log level and optional log file
//!
//! ## Usage
//!
//! ```rust,no_run
//! use spawnkeeper::config::Config;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::load("config.toml").await?;
//!     println!("Spawn radius: {}", config.spawn.spawn_range);
//!     Config::create_default("config.toml").await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Configuration File Format
//!
//! ```toml
//! [spawn]
//! spawn_range = 4000
//! min_distance = 300
//! max_tries = 20
//! height_diff_limit = 4
//! escalation_multiplier = 10
//! debug_logs = false
//! enabled_dimensions = ["minecraft:overworld"]
//!
//! [storage]
//! world_dir = "./world"
//!
//! [logging]
//! level = "info"
//! ```
//!
//! Numeric spawn settings are bounded. [`SpawnConfig::sanitized`] clamps out-of-range
//! values and logs a warning, so a typo cannot turn a login into an unbounded search.

use std::ops::RangeInclusive;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use tokio::fs;

pub const SPAWN_RANGE_BOUNDS: RangeInclusive<i32> = 100..=50_000;
pub const MIN_DISTANCE_BOUNDS: RangeInclusive<i32> = 10..=5_000;
pub const MAX_TRIES_BOUNDS: RangeInclusive<u32> = 1..=200;
pub const HEIGHT_DIFF_BOUNDS: RangeInclusive<i32> = 1..=20;
pub const ESCALATION_BOUNDS: RangeInclusive<u32> = 1..=50;

const BACKUP_FILE_NAME: &str = "spawns.json";

/// Settings read by the coordinator at resolution time.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SpawnConfig {
    /// Search radius around the shared spawn point, in blocks.
    #[serde(default = "default_spawn_range")]
    pub spawn_range: i32,
    /// Minimum straight-line distance to any other present participant.
    #[serde(default = "default_min_distance")]
    pub min_distance: i32,
    /// Candidate budget for the first search pass.
    #[serde(default = "default_max_tries")]
    pub max_tries: u32,
    /// Largest allowed height difference inside the 7x7 flatness window.
    #[serde(default = "default_height_diff_limit")]
    pub height_diff_limit: i32,
    /// The second search pass uses `max_tries * escalation_multiplier` candidates.
    #[serde(default = "default_escalation_multiplier")]
    pub escalation_multiplier: u32,
    /// Log every candidate and rejection reason at info level.
    #[serde(default)]
    pub debug_logs: bool,
    /// Dimensions the core acts in. Empty means every dimension.
    #[serde(default = "default_enabled_dimensions")]
    pub enabled_dimensions: Vec<String>,
}

fn default_spawn_range() -> i32 {
    4000
}

fn default_min_distance() -> i32 {
    300
}

fn default_max_tries() -> u32 {
    20
}

fn default_height_diff_limit() -> i32 {
    4
}

fn default_escalation_multiplier() -> u32 {
    10
}

fn default_enabled_dimensions() -> Vec<String> {
    vec!["minecraft:overworld".to_string()]
}

impl Default for SpawnConfig {
    fn default() -> Self {
        Self {
            spawn_range: default_spawn_range(),
            min_distance: default_min_distance(),
            max_tries: default_max_tries(),
            height_diff_limit: default_height_diff_limit(),
            escalation_multiplier: default_escalation_multiplier(),
            debug_logs: false,
            enabled_dimensions: default_enabled_dimensions(),
        }
    }
}

fn clamp_logged<T>(field: &str, value: T, bounds: &RangeInclusive<T>) -> T
where
    T: PartialOrd + Copy + std::fmt::Display,
{
    let clamped = if value < *bounds.start() {
        *bounds.start()
    } else if value > *bounds.end() {
        *bounds.end()
    } else {
        value
    };
    if clamped != value {
        log::warn!(
            "spawn.{} = {} is outside {}..={}, using {}",
            field,
            value,
            bounds.start(),
            bounds.end(),
            clamped
        );
    }
    clamped
}

impl SpawnConfig {
    /// Copy of this config with every numeric setting clamped to its allowed range.
    pub fn sanitized(&self) -> Self {
        Self {
            spawn_range: clamp_logged("spawn_range", self.spawn_range, &SPAWN_RANGE_BOUNDS),
            min_distance: clamp_logged("min_distance", self.min_distance, &MIN_DISTANCE_BOUNDS),
            max_tries: clamp_logged("max_tries", self.max_tries, &MAX_TRIES_BOUNDS),
            height_diff_limit: clamp_logged(
                "height_diff_limit",
                self.height_diff_limit,
                &HEIGHT_DIFF_BOUNDS,
            ),
            escalation_multiplier: clamp_logged(
                "escalation_multiplier",
                self.escalation_multiplier,
                &ESCALATION_BOUNDS,
            ),
            debug_logs: self.debug_logs,
            enabled_dimensions: self.enabled_dimensions.clone(),
        }
    }

    /// Try budget for the escalated second search pass.
    pub fn escalated_tries(&self) -> u32 {
        self.max_tries.saturating_mul(self.escalation_multiplier)
    }

    pub fn is_dimension_enabled(&self, dimension: &str) -> bool {
        self.enabled_dimensions.is_empty() || self.enabled_dimensions.iter().any(|d| d == dimension)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StorageConfig {
    /// Root of the world save; the primary spawn store lives in a sled db under it.
    pub world_dir: String,
    /// Current backup location. Defaults to `<world_dir>/serverconfig/spawnkeeper/spawns.json`.
    #[serde(default)]
    pub backup_file: Option<String>,
    /// Backup location used by older installs, read only when the current file is absent.
    #[serde(default = "default_legacy_backup_file")]
    pub legacy_backup_file: String,
}

fn default_legacy_backup_file() -> String {
    format!("config/spawnkeeper/{}", BACKUP_FILE_NAME)
}

impl StorageConfig {
    pub fn world_db_path(&self) -> PathBuf {
        Path::new(&self.world_dir).join("spawnkeeper.db")
    }

    pub fn backup_path(&self) -> PathBuf {
        match &self.backup_file {
            Some(path) => PathBuf::from(path),
            None => Path::new(&self.world_dir)
                .join("serverconfig")
                .join("spawnkeeper")
                .join(BACKUP_FILE_NAME),
        }
    }

    pub fn legacy_backup_path(&self) -> PathBuf {
        PathBuf::from(&self.legacy_backup_file)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LoggingConfig {
    pub level: String,
    pub file: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Config {
    #[serde(default)]
    pub spawn: SpawnConfig,
    pub storage: StorageConfig,
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from a file
    pub async fn load(path: &str) -> Result<Self> {
        let content = fs::read_to_string(path)
            .await
            .map_err(|e| anyhow!("Failed to read config file {}: {}", path, e))?;

        Self::from_toml(&content).map_err(|e| anyhow!("Failed to parse config file {}: {}", path, e))
    }

    /// Parse configuration text, clamping spawn settings into range.
    pub fn from_toml(content: &str) -> Result<Self> {
        let mut config: Config = toml::from_str(content)?;
        config.spawn = config.spawn.sanitized();
        Ok(config)
    }

    /// Create a default configuration file
    pub async fn create_default(path: &str) -> Result<()> {
        let config = Config::default();
        let content = toml::to_string_pretty(&config)
            .map_err(|e| anyhow!("Failed to serialize default config: {}", e))?;

        fs::write(path, content)
            .await
            .map_err(|e| anyhow!("Failed to write config file {}: {}", path, e))?;

        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            spawn: SpawnConfig::default(),
            storage: StorageConfig {
                world_dir: "./world".to_string(),
                backup_file: None,
                legacy_backup_file: default_legacy_backup_file(),
            },
            logging: LoggingConfig {
                level: "info".to_string(),
                file: Some("spawnkeeper.log".to_string()),
            },
        }
    }
}
