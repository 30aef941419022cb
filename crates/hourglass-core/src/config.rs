use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

pub const DEFAULT_INBOUND_CAPACITY: usize = 100;
pub const DEFAULT_OUTBOUND_CAPACITY: usize = 100;
pub const DEFAULT_LOG_FILTER: &str = "hourglass=info";

/// Top-level config (hourglass.toml + HOURGLASS_* env overrides).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HourglassConfig {
    #[serde(default)]
    pub scheduler: SchedulerConfig,
    #[serde(default)]
    pub log: LogConfig,
}

/// Channel sizing for a scheduler instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// Events buffered on the submission handle before senders wait.
    #[serde(default = "default_inbound_capacity")]
    pub inbound_capacity: usize,
    /// Payloads buffered on the delivery handle before the dispatcher waits.
    #[serde(default = "default_outbound_capacity")]
    pub outbound_capacity: usize,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            inbound_capacity: DEFAULT_INBOUND_CAPACITY,
            outbound_capacity: DEFAULT_OUTBOUND_CAPACITY,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogConfig {
    /// `tracing_subscriber::EnvFilter` directive used when RUST_LOG is unset.
    #[serde(default = "default_log_filter")]
    pub filter: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            filter: default_log_filter(),
        }
    }
}

fn default_inbound_capacity() -> usize {
    DEFAULT_INBOUND_CAPACITY
}
fn default_outbound_capacity() -> usize {
    DEFAULT_OUTBOUND_CAPACITY
}
fn default_log_filter() -> String {
    DEFAULT_LOG_FILTER.to_string()
}

impl HourglassConfig {
    /// Load config from a TOML file with HOURGLASS_* env var overrides.
    ///
    /// Checks in order:
    ///   1. Explicit path argument
    ///   2. ~/.hourglass/hourglass.toml
    ///
    /// A missing file is not an error; defaults fill every absent key.
    /// Nested keys use a double underscore, e.g.
    /// `HOURGLASS_SCHEDULER__INBOUND_CAPACITY=500`.
    pub fn load(config_path: Option<&str>) -> crate::error::Result<Self> {
        let path = config_path
            .map(String::from)
            .unwrap_or_else(default_config_path);

        Self::figment(&path)
            .extract()
            .map_err(|e| crate::error::CoreError::Config(e.to_string()))
    }

    fn figment(path: &str) -> Figment {
        Figment::from(Serialized::defaults(HourglassConfig::default()))
            .merge(Toml::file(path))
            .merge(Env::prefixed("HOURGLASS_").split("__"))
    }
}

fn default_config_path() -> String {
    let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
    format!("{}/.hourglass/hourglass.toml", home)
}
