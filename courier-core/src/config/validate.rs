//! Configuration validation rules.

use super::schema::{Config, DispatcherConfig, PipelineConfig};

const MAX_POLL_INTERVAL_MS: u64 = 60_000;
const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];
const LOG_FORMATS: [&str; 2] = ["text", "json"];

/// Validate configuration and return aggregated validation errors.
pub fn validate_config(config: &Config) -> crate::Result<()> {
    let mut errors = Vec::new();

    check_dispatcher(&config.dispatcher, &mut errors);

    let level = config.logging.level.to_ascii_lowercase();
    if !LOG_LEVELS.contains(&level.as_str()) {
        errors.push(format!(
            "logging.level must be one of {}, got '{}'",
            LOG_LEVELS.join("/"),
            config.logging.level
        ));
    }
    let format = config.logging.format.to_ascii_lowercase();
    if !LOG_FORMATS.contains(&format.as_str()) {
        errors.push(format!(
            "logging.format must be text or json, got '{}'",
            config.logging.format
        ));
    }
    if config.logging.dir.trim().is_empty() {
        errors.push("logging.dir must not be empty".to_string());
    }
    if config.logging.retention_days == 0 {
        errors.push("logging.retention_days must be > 0".to_string());
    }

    into_result(errors)
}

/// Validate only the dispatcher section; used when a dispatcher is started
/// from a hand-built config.
pub fn validate_dispatcher(config: &DispatcherConfig) -> crate::Result<()> {
    let mut errors = Vec::new();
    check_dispatcher(config, &mut errors);
    into_result(errors)
}

fn into_result(errors: Vec<String>) -> crate::Result<()> {
    if errors.is_empty() {
        Ok(())
    } else {
        Err(crate::Error::Validation(errors.join("; ")))
    }
}

fn check_dispatcher(config: &DispatcherConfig, errors: &mut Vec<String>) {
    check_pipeline("dispatcher.outbound", &config.outbound, errors);
    check_pipeline("dispatcher.inbound", &config.inbound, errors);
    if config.shutdown_timeout_ms == 0 {
        errors.push("dispatcher.shutdown_timeout_ms must be > 0".to_string());
    }
}

fn check_pipeline(path: &str, pipeline: &PipelineConfig, errors: &mut Vec<String>) {
    if !(1..=MAX_POLL_INTERVAL_MS).contains(&pipeline.poll_interval_ms) {
        errors.push(format!(
            "{}.poll_interval_ms must be in [1, {}]",
            path, MAX_POLL_INTERVAL_MS
        ));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_accepts_defaults() {
        validate_config(&Config::default()).unwrap();
    }

    #[test]
    fn test_validate_rejects_zero_poll_interval() {
        let mut config = Config::default();
        config.dispatcher.inbound.poll_interval_ms = 0;

        let err = validate_config(&config).unwrap_err();
        assert!(err.to_string().contains("dispatcher.inbound.poll_interval_ms"));
    }

    #[test]
    fn test_validate_aggregates_errors() {
        let mut config = Config::default();
        config.dispatcher.shutdown_timeout_ms = 0;
        config.logging.level = "verbose".to_string();
        config.logging.format = "xml".to_string();

        let msg = validate_config(&config).unwrap_err().to_string();
        assert!(msg.contains("shutdown_timeout_ms"));
        assert!(msg.contains("logging.level"));
        assert!(msg.contains("logging.format"));
    }

    #[test]
    fn test_validate_dispatcher_ignores_logging_section() {
        let mut config = Config::default();
        config.logging.level = "verbose".to_string();
        validate_dispatcher(&config.dispatcher).unwrap();

        config.dispatcher.outbound.poll_interval_ms = MAX_POLL_INTERVAL_MS + 1;
        let msg = validate_dispatcher(&config.dispatcher).unwrap_err().to_string();
        assert!(msg.contains("dispatcher.outbound.poll_interval_ms"));
        assert!(!msg.contains("logging"));
    }

    #[test]
    fn test_validate_level_is_case_insensitive() {
        let mut config = Config::default();
        config.logging.level = "DEBUG".to_string();
        config.logging.format = "JSON".to_string();
        validate_config(&config).unwrap();
    }
}
