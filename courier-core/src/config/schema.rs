//! Configuration schema definitions

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;

use crate::bus::Pipeline;

/// Root configuration for courier
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Dispatcher configuration
    #[serde(default)]
    pub dispatcher: DispatcherConfig,
    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Log format (text, json)
    #[serde(default = "default_log_format")]
    pub format: String,
    /// Directory for log files
    #[serde(default = "default_log_dir")]
    pub dir: String,
    /// Days to keep rotated log files
    #[serde(default = "default_retention_days")]
    pub retention_days: u64,
    /// Module-specific overrides
    #[serde(default)]
    pub overrides: HashMap<String, String>,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "text".to_string()
}

fn default_log_dir() -> String {
    "logs".to_string()
}

fn default_retention_days() -> u64 {
    7
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
            dir: default_log_dir(),
            retention_days: default_retention_days(),
            overrides: HashMap::new(),
        }
    }
}

/// What a worker does with queued messages once shutdown is signalled
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShutdownPolicy {
    /// Keep consuming until the closed queue is empty
    #[default]
    Drain,
    /// Stop at once, dropping queued and in-flight messages
    Abort,
}

/// Per-pipeline worker settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Upper bound on a single queue wait before the worker re-checks its state
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    /// Shutdown behaviour
    #[serde(default)]
    pub shutdown: ShutdownPolicy,
}

fn default_poll_interval_ms() -> u64 {
    100
}

impl PipelineConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    fn with_policy(shutdown: ShutdownPolicy) -> Self {
        Self {
            poll_interval_ms: default_poll_interval_ms(),
            shutdown,
        }
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self::with_policy(ShutdownPolicy::default())
    }
}

/// Dispatcher configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DispatcherConfig {
    /// Send worker settings
    #[serde(default = "default_outbound")]
    pub outbound: PipelineConfig,
    /// Execute worker settings
    #[serde(default = "default_inbound")]
    pub inbound: PipelineConfig,
    /// Deadline for `shutdown_and_wait`
    #[serde(default = "default_shutdown_timeout_ms")]
    pub shutdown_timeout_ms: u64,
}

fn default_outbound() -> PipelineConfig {
    PipelineConfig::with_policy(ShutdownPolicy::Drain)
}

fn default_inbound() -> PipelineConfig {
    PipelineConfig::with_policy(ShutdownPolicy::Abort)
}

fn default_shutdown_timeout_ms() -> u64 {
    5000
}

impl DispatcherConfig {
    /// Settings for one pipeline
    pub fn pipeline(&self, pipeline: Pipeline) -> &PipelineConfig {
        match pipeline {
            Pipeline::Outbound => &self.outbound,
            Pipeline::Inbound => &self.inbound,
        }
    }

    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_millis(self.shutdown_timeout_ms)
    }
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            outbound: default_outbound(),
            inbound: default_inbound(),
            shutdown_timeout_ms: default_shutdown_timeout_ms(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pipeline_defaults_differ_by_policy() {
        let config = DispatcherConfig::default();
        assert_eq!(config.outbound.shutdown, ShutdownPolicy::Drain);
        assert_eq!(config.inbound.shutdown, ShutdownPolicy::Abort);
        assert_eq!(config.pipeline(Pipeline::Inbound).poll_interval(), Duration::from_millis(100));
        assert_eq!(config.shutdown_timeout(), Duration::from_secs(5));
    }

    #[test]
    fn test_deserialize_partial_dispatcher_section() {
        let config: Config =
            serde_json::from_str(r#"{"dispatcher":{"inbound":{"shutdown":"drain"}}}"#).unwrap();
        assert_eq!(config.dispatcher.inbound.shutdown, ShutdownPolicy::Drain);
        assert_eq!(config.dispatcher.inbound.poll_interval_ms, 100);
        assert_eq!(config.dispatcher.outbound.shutdown, ShutdownPolicy::Drain);
        assert_eq!(config.logging.level, "info");
    }
}
