//! Configuration loading and typed config structures for the croft engine.
//!
//! The canonical configuration lives in `croft-config.yaml` next to the
//! binary. This module defines strongly-typed structs that mirror the
//! YAML structure, and provides a loader that reads and validates the
//! file. Every field has a default, so an empty file (or no file at all)
//! yields a runnable configuration.

use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read the configuration file from disk.
    #[error("failed to read config file: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// Failed to parse YAML content.
    #[error("failed to parse config YAML: {source}")]
    Yaml {
        /// The underlying YAML parse error.
        source: serde_yml::Error,
    },
}

impl From<serde_yml::Error> for ConfigError {
    fn from(source: serde_yml::Error) -> Self {
        Self::Yaml { source }
    }
}

/// Top-level engine configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct BotConfig {
    /// Cycle scheduling and pacing.
    #[serde(default)]
    pub cycle: CycleConfig,

    /// Feature flags and retry gating for remote actions.
    #[serde(default)]
    pub actions: ActionConfig,

    /// Seed selection preferences.
    #[serde(default)]
    pub seeds: SeedConfig,
}

impl BotConfig {
    /// Load configuration from a YAML file at the given path.
    ///
    /// Environment variables override YAML values:
    /// - `CROFT_CYCLE_INTERVAL_SECS` overrides `cycle.interval_secs`
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read, or
    /// [`ConfigError::Yaml`] if the content is not valid YAML.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::parse(&contents)
    }

    /// Parse configuration from a YAML string.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Yaml`] if the string is not valid YAML.
    pub fn parse(yaml: &str) -> Result<Self, ConfigError> {
        let mut config: Self = serde_yml::from_str(yaml)?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Apply environment-variable overrides on top of parsed values.
    fn apply_env_overrides(&mut self) {
        if let Ok(val) = std::env::var("CROFT_CYCLE_INTERVAL_SECS") {
            if let Ok(secs) = val.parse() {
                self.cycle.interval_secs = secs;
            }
        }
    }
}

/// Cycle scheduling and pacing configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CycleConfig {
    /// Seconds between the end of one cycle and the start of the next.
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,

    /// Delay before the first cycle after `start()`, in milliseconds.
    #[serde(default = "default_startup_delay_ms")]
    pub startup_delay_ms: u64,

    /// Minimum seconds between accepted push triggers.
    #[serde(default = "default_push_debounce_secs")]
    pub push_debounce_secs: u64,

    /// Delay between accepting a push and running the out-of-band cycle,
    /// so in-flight server-side writes can settle.
    #[serde(default = "default_push_settle_ms")]
    pub push_settle_ms: u64,

    /// Pacing delay between consecutive single-item remote calls
    /// (unlock, upgrade, plant, amend), in milliseconds. Exists to stay
    /// under server-side anti-automation heuristics, not for correctness.
    #[serde(default = "default_item_pacing_ms")]
    pub item_pacing_ms: u64,

    /// Seconds between periodic summary log lines.
    #[serde(default = "default_summary_interval_secs")]
    pub summary_interval_secs: u64,
}

impl CycleConfig {
    /// The inter-item pacing delay as a [`Duration`].
    pub const fn item_pacing(&self) -> Duration {
        Duration::from_millis(self.item_pacing_ms)
    }

    /// The cycle sleep interval as a [`Duration`].
    pub const fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }

    /// The push debounce window as a [`Duration`].
    pub const fn push_debounce(&self) -> Duration {
        Duration::from_secs(self.push_debounce_secs)
    }
}

impl Default for CycleConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_interval_secs(),
            startup_delay_ms: default_startup_delay_ms(),
            push_debounce_secs: default_push_debounce_secs(),
            push_settle_ms: default_push_settle_ms(),
            item_pacing_ms: default_item_pacing_ms(),
            summary_interval_secs: default_summary_interval_secs(),
        }
    }
}

/// Remote-action feature flags and retry gating.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ActionConfig {
    /// Whether to attempt plot unlocks.
    #[serde(default = "default_true")]
    pub auto_unlock: bool,

    /// Whether to attempt plot tier upgrades.
    #[serde(default = "default_true")]
    pub auto_upgrade: bool,

    /// Whether to run the replant pipeline at all.
    #[serde(default = "default_true")]
    pub auto_replant: bool,

    /// Suppression window after a failed unlock/upgrade, in seconds.
    #[serde(default = "default_retry_cooldown_secs")]
    pub retry_cooldown_secs: i64,

    /// Item id of the soil amendment applied after planting.
    #[serde(default = "default_amendment_item")]
    pub amendment_item: u32,
}

impl Default for ActionConfig {
    fn default() -> Self {
        Self {
            auto_unlock: true,
            auto_upgrade: true,
            auto_replant: true,
            retry_cooldown_secs: default_retry_cooldown_secs(),
            amendment_item: default_amendment_item(),
        }
    }
}

/// Seed selection preferences.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SeedConfig {
    /// User-pinned seed id. When set and available, always planted.
    #[serde(default)]
    pub pinned: Option<u32>,

    /// Always plant the cheapest available seed (lowest level
    /// requirement, ties broken by price).
    #[serde(default)]
    pub force_cheapest: bool,

    /// Shop id of the seed catalog.
    #[serde(default = "default_shop_id")]
    pub shop_id: u32,

    /// Below this account level the static fallback heuristic prefers
    /// low-level seeds; at or above it, high-level seeds.
    #[serde(default = "default_cheap_level_threshold")]
    pub cheap_level_threshold: u32,
}

impl Default for SeedConfig {
    fn default() -> Self {
        Self {
            pinned: None,
            force_cheapest: false,
            shop_id: default_shop_id(),
            cheap_level_threshold: default_cheap_level_threshold(),
        }
    }
}

const fn default_interval_secs() -> u64 {
    300
}

const fn default_startup_delay_ms() -> u64 {
    3_000
}

const fn default_push_debounce_secs() -> u64 {
    30
}

const fn default_push_settle_ms() -> u64 {
    2_000
}

const fn default_item_pacing_ms() -> u64 {
    150
}

const fn default_summary_interval_secs() -> u64 {
    1_800
}

const fn default_true() -> bool {
    true
}

const fn default_retry_cooldown_secs() -> i64 {
    600
}

const fn default_amendment_item() -> u32 {
    1
}

const fn default_shop_id() -> u32 {
    1
}

const fn default_cheap_level_threshold() -> u32 {
    30
}
