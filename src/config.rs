use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::domains::view::ViewOptions;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub feed: FeedConfig,
    pub view: ViewConfig,
    pub animation: AnimationConfig,
    pub reconciliation: ReconciliationConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FeedConfig {
    /// Directory holding `graph.json`, `clusters.json` and `entities.json`.
    pub data_dir: Option<String>,
    /// JSON-lines push events; stdin when absent.
    pub events_file: Option<String>,
    pub channel_capacity: usize,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewConfig {
    #[serde(flatten)]
    pub options: ViewOptions,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AnimationConfig {
    pub default_step_ms: u64,
    pub watchdog_slack_ms: u64,
    pub resolve_retries: u32,
    pub resolve_delay_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReconciliationConfig {
    pub interval_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub max_entries: usize,
    pub file: Option<String>,
    pub level: String,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            data_dir: None,
            events_file: None,
            channel_capacity: 256,
        }
    }
}

impl Default for AnimationConfig {
    fn default() -> Self {
        Self {
            default_step_ms: 1000,
            watchdog_slack_ms: 5000,
            resolve_retries: 5,
            resolve_delay_ms: 300,
        }
    }
}

impl Default for ReconciliationConfig {
    fn default() -> Self {
        Self { interval_ms: 5000 }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            max_entries: 100,
            file: None,
            level: "info".to_string(),
        }
    }
}

impl AnimationConfig {
    pub fn default_step(&self) -> Duration {
        Duration::from_millis(self.default_step_ms)
    }

    pub fn watchdog_slack(&self) -> Duration {
        Duration::from_millis(self.watchdog_slack_ms)
    }

    pub fn resolve_delay(&self) -> Duration {
        Duration::from_millis(self.resolve_delay_ms)
    }
}

impl ReconciliationConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }
}

impl Config {
    pub async fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = tokio::fs::read_to_string(path).await?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    /// Optional TOML file overlaid with `TRANSPORT_VIEWER__<SECTION>__<KEY>`
    /// environment variables.
    pub fn load_layered(path: Option<&str>) -> Result<Self> {
        let mut builder = config::Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(config::File::with_name(path).required(false));
        }
        let layered = builder
            .add_source(
                config::Environment::with_prefix("TRANSPORT_VIEWER")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;
        Ok(layered.try_deserialize()?)
    }
}
