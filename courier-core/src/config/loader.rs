//! Configuration loading and management

use super::schema::Config;
use super::validate::validate_config;
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};

/// Prefix for nested environment overrides, e.g. `COURIER__DISPATCHER__SHUTDOWN_TIMEOUT_MS`
const ENV_PREFIX: &str = "COURIER__";

/// Configuration loader
pub struct ConfigLoader {
    config_dir: PathBuf,
}

impl ConfigLoader {
    /// Create a new config loader with the default config directory
    pub fn new() -> Self {
        let config_dir = dirs::home_dir()
            .map(|h| h.join(".courier"))
            .unwrap_or_else(|| PathBuf::from(".courier"));

        Self { config_dir }
    }

    /// Create a new config loader with a custom config directory
    pub fn with_dir<P: AsRef<Path>>(dir: P) -> Self {
        Self {
            config_dir: dir.as_ref().to_path_buf(),
        }
    }

    /// Load configuration from file and environment
    pub fn load(&self) -> crate::Result<Config> {
        let config_path = self.config_path();
        let mut merged = serde_json::to_value(Config::default())?;

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            let file_value: Value = serde_json::from_str(&content).map_err(|e| {
                crate::Error::Config(format!("Failed to parse {}: {}", config_path.display(), e))
            })?;
            merge_values(&mut merged, file_value);
        }

        apply_path_overrides(&mut merged, std::env::vars());

        let config: Config = serde_json::from_value(merged)
            .map_err(|e| crate::Error::Config(format!("Invalid configuration: {}", e)))?;
        validate_config(&config)?;
        Ok(config)
    }

    /// Save configuration to file
    pub fn save(&self, config: &Config) -> crate::Result<()> {
        std::fs::create_dir_all(&self.config_dir)?;
        let content = serde_json::to_string_pretty(config)?;
        std::fs::write(self.config_path(), content)?;
        Ok(())
    }

    /// Get the config directory path
    pub fn config_dir(&self) -> &Path {
        &self.config_dir
    }

    fn config_path(&self) -> PathBuf {
        self.config_dir.join("config.json")
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

/// Deep-merge `overlay` into `base`; objects merge key by key, anything else replaces
fn merge_values(base: &mut Value, overlay: Value) {
    match (base, overlay) {
        (Value::Object(base_map), Value::Object(overlay_map)) => {
            for (key, value) in overlay_map {
                merge_values(base_map.entry(key).or_insert(Value::Null), value);
            }
        }
        (slot, value) => *slot = value,
    }
}

/// Write `value` at `path`, creating intermediate objects as needed
fn set_path_value(root: &mut Value, path: &[String], value: Value) {
    let Some((head, rest)) = path.split_first() else {
        *root = value;
        return;
    };
    if !root.is_object() {
        *root = Value::Object(Map::new());
    }
    if let Value::Object(map) = root {
        set_path_value(map.entry(head.clone()).or_insert(Value::Null), rest, value);
    }
}

fn apply_path_overrides<I>(config: &mut Value, vars: I)
where
    I: IntoIterator<Item = (String, String)>,
{
    for (key, value) in vars {
        let Some(suffix) = key.strip_prefix(ENV_PREFIX) else {
            continue;
        };
        let segments: Vec<String> = suffix
            .split("__")
            .filter(|s| !s.is_empty())
            .map(|s| s.to_ascii_lowercase())
            .collect();
        if segments.is_empty() {
            continue;
        }
        // Numbers and booleans parse as JSON; anything else (e.g. `drain`) is a string
        let value = serde_json::from_str(&value).unwrap_or(Value::String(value));
        set_path_value(config, &segments, value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ShutdownPolicy;
    use once_cell::sync::Lazy;
    use std::sync::{Mutex, MutexGuard};
    use tempfile::TempDir;

    static ENV_LOCK: Lazy<Mutex<()>> = Lazy::new(|| Mutex::new(()));

    struct EnvVarGuard {
        key: String,
        original: Option<String>,
    }

    impl EnvVarGuard {
        fn set(key: &str, value: &str) -> Self {
            let original = std::env::var(key).ok();
            std::env::set_var(key, value);
            Self {
                key: key.to_string(),
                original,
            }
        }
    }

    impl Drop for EnvVarGuard {
        fn drop(&mut self) {
            match &self.original {
                Some(value) => std::env::set_var(&self.key, value),
                None => std::env::remove_var(&self.key),
            }
        }
    }

    fn lock_env() -> MutexGuard<'static, ()> {
        ENV_LOCK
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    #[test]
    fn test_load_default_config() {
        let _lock = lock_env();
        let temp_dir = TempDir::new().unwrap();
        let loader = ConfigLoader::with_dir(temp_dir.path());
        let config = loader.load().unwrap();

        assert_eq!(config.dispatcher.outbound.poll_interval_ms, 100);
        assert_eq!(config.dispatcher.inbound.shutdown, ShutdownPolicy::Abort);
        assert_eq!(config.logging.format, "text");
    }

    #[test]
    fn test_save_and_load_config() {
        let _lock = lock_env();
        let temp_dir = TempDir::new().unwrap();
        let loader = ConfigLoader::with_dir(temp_dir.path());

        let mut config = Config::default();
        config.dispatcher.shutdown_timeout_ms = 250;
        config.dispatcher.outbound.shutdown = ShutdownPolicy::Abort;

        loader.save(&config).unwrap();
        let loaded = loader.load().unwrap();

        assert_eq!(loaded.dispatcher.shutdown_timeout_ms, 250);
        assert_eq!(loaded.dispatcher.outbound.shutdown, ShutdownPolicy::Abort);
    }

    #[test]
    fn test_file_values_merge_over_defaults() {
        let _lock = lock_env();
        let temp_dir = TempDir::new().unwrap();
        std::fs::write(
            temp_dir.path().join("config.json"),
            r#"{"dispatcher":{"inbound":{"poll_interval_ms":20}}}"#,
        )
        .unwrap();

        let config = ConfigLoader::with_dir(temp_dir.path()).load().unwrap();
        assert_eq!(config.dispatcher.inbound.poll_interval_ms, 20);
        assert_eq!(config.dispatcher.inbound.shutdown, ShutdownPolicy::Abort);
        assert_eq!(config.dispatcher.shutdown_timeout_ms, 5000);
    }

    #[test]
    fn test_load_applies_path_env_overrides() {
        let _lock = lock_env();
        let _timeout = EnvVarGuard::set("COURIER__DISPATCHER__SHUTDOWN_TIMEOUT_MS", "1500");
        let _policy = EnvVarGuard::set("COURIER__DISPATCHER__INBOUND__SHUTDOWN", "drain");
        let _level = EnvVarGuard::set("COURIER__LOGGING__LEVEL", "debug");

        let temp_dir = TempDir::new().unwrap();
        let config = ConfigLoader::with_dir(temp_dir.path()).load().unwrap();

        assert_eq!(config.dispatcher.shutdown_timeout_ms, 1500);
        assert_eq!(config.dispatcher.inbound.shutdown, ShutdownPolicy::Drain);
        assert_eq!(config.logging.level, "debug");
    }

    #[test]
    fn test_env_overrides_file() {
        let _lock = lock_env();
        let _guard = EnvVarGuard::set("COURIER__DISPATCHER__OUTBOUND__POLL_INTERVAL_MS", "30");

        let temp_dir = TempDir::new().unwrap();
        std::fs::write(
            temp_dir.path().join("config.json"),
            r#"{"dispatcher":{"outbound":{"poll_interval_ms":500}}}"#,
        )
        .unwrap();

        let config = ConfigLoader::with_dir(temp_dir.path()).load().unwrap();
        assert_eq!(config.dispatcher.outbound.poll_interval_ms, 30);
    }

    #[test]
    fn test_validation_rejects_invalid_poll_interval() {
        let _lock = lock_env();
        let _guard = EnvVarGuard::set("COURIER__DISPATCHER__INBOUND__POLL_INTERVAL_MS", "0");

        let temp_dir = TempDir::new().unwrap();
        let err = ConfigLoader::with_dir(temp_dir.path()).load().unwrap_err();
        assert!(err.to_string().contains("poll_interval_ms"));
    }

    #[test]
    fn test_malformed_file_is_a_config_error() {
        let _lock = lock_env();
        let temp_dir = TempDir::new().unwrap();
        std::fs::write(temp_dir.path().join("config.json"), "{ not json").unwrap();

        let err = ConfigLoader::with_dir(temp_dir.path()).load().unwrap_err();
        assert!(matches!(err, crate::Error::Config(_)));
        assert!(err.to_string().contains("config.json"));
    }

    #[test]
    fn test_mistyped_override_is_a_config_error() {
        let _lock = lock_env();
        let _guard = EnvVarGuard::set("COURIER__DISPATCHER__OUTBOUND__SHUTDOWN", "later");

        let temp_dir = TempDir::new().unwrap();
        let err = ConfigLoader::with_dir(temp_dir.path()).load().unwrap_err();
        assert!(matches!(err, crate::Error::Config(_)));
    }

    #[test]
    fn test_apply_path_overrides_ignores_foreign_keys() {
        let mut value = serde_json::json!({"logging": {"level": "info"}});
        apply_path_overrides(
            &mut value,
            vec![
                ("PATH".to_string(), "/usr/bin".to_string()),
                ("COURIER__".to_string(), "ignored".to_string()),
                ("COURIER__LOGGING__LEVEL".to_string(), "warn".to_string()),
            ],
        );
        assert_eq!(value, serde_json::json!({"logging": {"level": "warn"}}));
    }
}
