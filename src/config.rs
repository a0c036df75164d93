//! Configuration management for ClientFit
//!
//! This module handles loading, parsing, validating, and managing
//! application settings from files, environment variables, and CLI
//! overrides. Client capability records are not configured here; this
//! file only seeds the override layer at startup.

use crate::error::{ClientFitError, Result};
use crate::manager::ConfigManager;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Main settings structure for ClientFit
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Settings {
    /// Logging output
    #[serde(default)]
    pub logging: LoggingConfig,
    /// Client detection policy
    #[serde(default)]
    pub detection: DetectionConfig,
    /// Behavior tracking policy
    #[serde(default)]
    pub behavior: BehaviorConfig,
    /// Startup overrides and templates per client
    #[serde(default)]
    pub clients: ClientsConfig,
    /// Export location
    #[serde(default)]
    pub persistence: PersistenceConfig,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default level when RUST_LOG is unset
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Emit JSON lines instead of human-readable output
    #[serde(default)]
    pub json_format: bool,
    /// Also append logs to this file
    #[serde(default)]
    pub file_path: Option<PathBuf>,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json_format: false,
            file_path: None,
        }
    }
}

/// Capability-signature acceptance policy
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectionConfig {
    /// Fraction of compared checks that must match
    #[serde(default = "default_signature_threshold")]
    pub signature_threshold: f64,
    /// Fewest checks that must be comparable
    #[serde(default = "default_min_signature_checks")]
    pub min_signature_checks: usize,
}

fn default_signature_threshold() -> f64 {
    0.8
}

fn default_min_signature_checks() -> usize {
    2
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            signature_threshold: default_signature_threshold(),
            min_signature_checks: default_min_signature_checks(),
        }
    }
}

/// Behavior tracking configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BehaviorConfig {
    /// Seconds between classification sweeps
    #[serde(default = "default_sweep_interval")]
    pub sweep_interval_secs: u64,
    /// Error rate that triggers an adaptive update
    #[serde(default = "default_error_rate_trigger")]
    pub error_rate_trigger: f64,
    /// Attempts before the error rate is trusted
    #[serde(default = "default_min_attempts")]
    pub min_attempts: u64,
}

fn default_sweep_interval() -> u64 {
    crate::behavior::DEFAULT_SWEEP_INTERVAL.as_secs()
}

fn default_error_rate_trigger() -> f64 {
    crate::behavior::DEFAULT_ERROR_RATE_TRIGGER
}

fn default_min_attempts() -> u64 {
    crate::behavior::DEFAULT_MIN_ATTEMPTS
}

impl Default for BehaviorConfig {
    fn default() -> Self {
        Self {
            sweep_interval_secs: default_sweep_interval(),
            error_rate_trigger: default_error_rate_trigger(),
            min_attempts: default_min_attempts(),
        }
    }
}

/// Per-client startup configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ClientsConfig {
    /// Override patches keyed by client id
    #[serde(default)]
    pub overrides: BTreeMap<String, Map<String, Value>>,
    /// Template names keyed by client id
    #[serde(default)]
    pub templates: BTreeMap<String, String>,
}

/// Persistence configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PersistenceConfig {
    /// Default directory for exported client configuration
    #[serde(default)]
    pub export_dir: Option<PathBuf>,
}

impl Settings {
    /// Load settings from file with environment and CLI overrides
    ///
    /// # Arguments
    ///
    /// * `path` - Path to settings file
    /// * `cli` - CLI arguments for overrides
    ///
    /// # Returns
    ///
    /// Returns the loaded and merged settings
    ///
    /// # Errors
    ///
    /// Returns error if the file exists but cannot be read or parsed
    pub fn load(path: &str, cli: &crate::cli::Cli) -> Result<Self> {
        let mut settings = if Path::new(path).exists() {
            Self::from_file(path)?
        } else {
            tracing::warn!("Config file not found at {}, using defaults", path);
            Self::default()
        };

        settings.apply_env_vars();
        settings.apply_cli_overrides(cli);

        Ok(settings)
    }

    fn from_file(path: &str) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| ClientFitError::Config(format!("Failed to read config file: {}", e)))?;
        serde_yaml::from_str(&contents)
            .map_err(|e| ClientFitError::Config(format!("Failed to parse config: {}", e)).into())
    }

    fn apply_env_vars(&mut self) {
        if let Ok(level) = std::env::var("CLIENTFIT_LOG_LEVEL") {
            self.logging.level = level;
        }

        if let Ok(json_logs) = std::env::var("CLIENTFIT_JSON_LOGS") {
            match json_logs.to_lowercase().as_str() {
                "1" | "true" | "yes" => self.logging.json_format = true,
                "0" | "false" | "no" => self.logging.json_format = false,
                _ => tracing::warn!("Invalid CLIENTFIT_JSON_LOGS: {}", json_logs),
            }
        }

        if let Ok(file) = std::env::var("CLIENTFIT_LOG_FILE") {
            self.logging.file_path = Some(PathBuf::from(file));
        }

        if let Ok(interval) = std::env::var("CLIENTFIT_SWEEP_INTERVAL") {
            if let Ok(value) = interval.parse() {
                self.behavior.sweep_interval_secs = value;
            } else {
                tracing::warn!("Invalid CLIENTFIT_SWEEP_INTERVAL: {}", interval);
            }
        }

        if let Ok(dir) = std::env::var("CLIENTFIT_EXPORT_DIR") {
            self.persistence.export_dir = Some(PathBuf::from(dir));
        }
    }

    fn apply_cli_overrides(&mut self, cli: &crate::cli::Cli) {
        if cli.verbose {
            self.logging.level = "debug".to_string();
        }
    }

    /// Validate the settings
    ///
    /// # Errors
    ///
    /// Returns error if any validation check fails
    pub fn validate(&self) -> Result<()> {
        if self.logging.level.trim().is_empty() {
            return Err(ClientFitError::Config("logging.level cannot be empty".to_string()).into());
        }

        let threshold = self.detection.signature_threshold;
        if threshold <= 0.0 || threshold > 1.0 {
            return Err(ClientFitError::Config(
                "detection.signature_threshold must be in (0.0, 1.0]".to_string(),
            )
            .into());
        }

        if self.detection.min_signature_checks == 0 {
            return Err(ClientFitError::Config(
                "detection.min_signature_checks must be greater than 0".to_string(),
            )
            .into());
        }

        if self.behavior.sweep_interval_secs == 0 {
            return Err(ClientFitError::Config(
                "behavior.sweep_interval_secs must be greater than 0".to_string(),
            )
            .into());
        }

        let trigger = self.behavior.error_rate_trigger;
        if trigger <= 0.0 || trigger > 1.0 {
            return Err(ClientFitError::Config(
                "behavior.error_rate_trigger must be in (0.0, 1.0]".to_string(),
            )
            .into());
        }

        if self.behavior.min_attempts == 0 {
            return Err(ClientFitError::Config(
                "behavior.min_attempts must be greater than 0".to_string(),
            )
            .into());
        }

        Ok(())
    }

    /// Seed the override layer from the configured templates and overrides
    ///
    /// Templates are applied first so explicit overrides refine them.
    ///
    /// # Errors
    ///
    /// Returns the first template or override the manager rejects
    pub fn apply_client_settings(&self, manager: &ConfigManager) -> Result<()> {
        for (client_id, template) in &self.clients.templates {
            manager.apply_template(client_id, template)?;
            tracing::debug!("Applied template {} to {}", template, client_id);
        }
        for (client_id, patch) in &self.clients.overrides {
            manager.set_override(client_id, patch.clone())?;
            tracing::debug!("Applied configured override for {}", client_id);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{assert_error_kind, create_test_file, temp_dir, test_manager};
    use serial_test::serial;

    fn clear_env() {
        for var in [
            "CLIENTFIT_LOG_LEVEL",
            "CLIENTFIT_JSON_LOGS",
            "CLIENTFIT_LOG_FILE",
            "CLIENTFIT_SWEEP_INTERVAL",
            "CLIENTFIT_EXPORT_DIR",
        ] {
            std::env::remove_var(var);
        }
    }

    #[test]
    fn test_default_settings() {
        let settings = Settings::default();
        assert_eq!(settings.logging.level, "info");
        assert!(!settings.logging.json_format);
        assert_eq!(settings.detection.signature_threshold, 0.8);
        assert_eq!(settings.detection.min_signature_checks, 2);
        assert_eq!(settings.behavior.sweep_interval_secs, 60);
        assert_eq!(settings.behavior.error_rate_trigger, 0.2);
        assert_eq!(settings.behavior.min_attempts, 5);
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_settings_from_yaml() {
        let yaml = r#"
logging:
  level: warn
  json_format: true
detection:
  signature_threshold: 0.9
clients:
  templates:
    zed: minimal
  overrides:
    cursor:
      maxToolsPerCall: 12
"#;
        let settings: Settings = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(settings.logging.level, "warn");
        assert!(settings.logging.json_format);
        assert_eq!(settings.detection.signature_threshold, 0.9);
        assert_eq!(settings.detection.min_signature_checks, 2);
        assert_eq!(settings.clients.templates["zed"], "minimal");
        assert_eq!(
            settings.clients.overrides["cursor"]["maxToolsPerCall"],
            serde_json::json!(12)
        );
    }

    #[test]
    fn test_validation_rejects_empty_level() {
        let mut settings = Settings::default();
        settings.logging.level = " ".to_string();
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_validation_rejects_bad_threshold() {
        let mut settings = Settings::default();
        settings.detection.signature_threshold = 0.0;
        assert!(settings.validate().is_err());
        settings.detection.signature_threshold = 1.5;
        assert!(settings.validate().is_err());
        settings.detection.signature_threshold = 1.0;
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_validation_rejects_zero_counts() {
        let mut settings = Settings::default();
        settings.detection.min_signature_checks = 0;
        assert!(settings.validate().is_err());

        let mut settings = Settings::default();
        settings.behavior.sweep_interval_secs = 0;
        assert!(settings.validate().is_err());

        let mut settings = Settings::default();
        settings.behavior.min_attempts = 0;
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_validation_rejects_bad_error_rate_trigger() {
        let mut settings = Settings::default();
        settings.behavior.error_rate_trigger = -0.1;
        assert!(settings.validate().is_err());
    }

    #[test]
    #[serial]
    fn test_load_nonexistent_file_uses_defaults() {
        clear_env();
        let settings = Settings::load("nonexistent.yaml", &crate::cli::Cli::default()).unwrap();
        assert_eq!(settings.logging.level, "info");
    }

    #[test]
    #[serial]
    fn test_load_reads_file() {
        clear_env();
        let dir = temp_dir();
        let path = create_test_file(&dir, "clientfit.yaml", "behavior:\n  min_attempts: 9\n");
        let settings =
            Settings::load(path.to_str().unwrap(), &crate::cli::Cli::default()).unwrap();
        assert_eq!(settings.behavior.min_attempts, 9);
    }

    #[test]
    #[serial]
    fn test_load_rejects_malformed_file() {
        clear_env();
        let dir = temp_dir();
        let path = create_test_file(&dir, "broken.yaml", "logging: [unterminated");
        let result = Settings::load(path.to_str().unwrap(), &crate::cli::Cli::default());
        assert!(result.is_err());
    }

    #[test]
    #[serial]
    fn test_env_overrides() {
        clear_env();
        std::env::set_var("CLIENTFIT_LOG_LEVEL", "trace");
        std::env::set_var("CLIENTFIT_JSON_LOGS", "true");
        std::env::set_var("CLIENTFIT_LOG_FILE", "/tmp/clientfit.log");
        std::env::set_var("CLIENTFIT_SWEEP_INTERVAL", "15");
        std::env::set_var("CLIENTFIT_EXPORT_DIR", "/tmp/exports");

        let settings = Settings::load("nonexistent.yaml", &crate::cli::Cli::default()).unwrap();
        clear_env();

        assert_eq!(settings.logging.level, "trace");
        assert!(settings.logging.json_format);
        assert_eq!(
            settings.logging.file_path,
            Some(PathBuf::from("/tmp/clientfit.log"))
        );
        assert_eq!(settings.behavior.sweep_interval_secs, 15);
        assert_eq!(
            settings.persistence.export_dir,
            Some(PathBuf::from("/tmp/exports"))
        );
    }

    #[test]
    #[serial]
    fn test_invalid_env_values_ignored() {
        clear_env();
        std::env::set_var("CLIENTFIT_SWEEP_INTERVAL", "soon");
        std::env::set_var("CLIENTFIT_JSON_LOGS", "maybe");
        let settings = Settings::load("nonexistent.yaml", &crate::cli::Cli::default()).unwrap();
        clear_env();
        assert_eq!(settings.behavior.sweep_interval_secs, 60);
        assert!(!settings.logging.json_format);
    }

    #[test]
    #[serial]
    fn test_verbose_forces_debug() {
        clear_env();
        std::env::set_var("CLIENTFIT_LOG_LEVEL", "warn");
        let cli = crate::cli::Cli {
            verbose: true,
            ..crate::cli::Cli::default()
        };
        let settings = Settings::load("nonexistent.yaml", &cli).unwrap();
        clear_env();
        assert_eq!(settings.logging.level, "debug");
    }

    #[test]
    fn test_apply_client_settings() {
        let manager = test_manager();
        let mut settings = Settings::default();
        settings
            .clients
            .templates
            .insert("cursor".to_string(), "minimal".to_string());
        let mut patch = Map::new();
        patch.insert("maxToolsPerCall".to_string(), serde_json::json!(4));
        settings.clients.overrides.insert("cursor".to_string(), patch);

        settings.apply_client_settings(&manager).unwrap();
        let caps = manager.get_config("cursor").capabilities();
        assert_eq!(caps.max_tools_per_call, 4);
        assert_eq!(caps.output_format, crate::capability::OutputFormat::Minimal);
    }

    #[test]
    fn test_apply_client_settings_unknown_template() {
        let manager = test_manager();
        let mut settings = Settings::default();
        settings
            .clients
            .templates
            .insert("cursor".to_string(), "gigantic".to_string());
        assert_error_kind(settings.apply_client_settings(&manager), "unknown_template");
    }

    #[test]
    fn test_sample_config_is_valid() {
        let settings: Settings =
            serde_yaml::from_str(include_str!("../config/clientfit.yaml")).unwrap();
        settings.validate().unwrap();
        settings.apply_client_settings(&test_manager()).unwrap();
    }
}
