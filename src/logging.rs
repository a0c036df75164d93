//! Structured logging setup
//!
//! Installs a `tracing` subscriber with JSON or human-readable output on
//! stderr and an optional append-mode log file. Stdout stays free for
//! command output.

use crate::config::LoggingConfig;
use anyhow::Result;
use std::fs::{File, OpenOptions};
use std::path::Path;
use std::sync::Arc;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Initialize logging based on configuration.
///
/// `RUST_LOG` takes precedence over the configured level.
///
/// # Errors
///
/// Returns error if the level does not parse, the log file cannot be
/// opened, or a global subscriber is already installed
///
/// # Examples
///
/// ```no_run
/// use clientfit::config::LoggingConfig;
/// use clientfit::logging::init_logging;
///
/// let config = LoggingConfig {
///     level: "debug".to_string(),
///     json_format: true,
///     file_path: None,
/// };
/// init_logging(&config).unwrap();
/// ```
pub fn init_logging(config: &LoggingConfig) -> Result<()> {
    let env_filter = build_filter(&config.level)?;
    let registry = tracing_subscriber::registry().with(env_filter);
    let file = config.file_path.as_deref().map(open_log_file).transpose()?;

    if config.json_format {
        let stderr_layer = fmt::layer()
            .json()
            .with_current_span(true)
            .with_writer(std::io::stderr);
        let file_layer = file.map(|file| {
            fmt::layer()
                .json()
                .with_current_span(true)
                .with_writer(Arc::new(file))
        });
        registry.with(stderr_layer).with(file_layer).try_init()?;
    } else {
        let stderr_layer = fmt::layer()
            .with_target(true)
            .with_level(true)
            .with_writer(std::io::stderr);
        let file_layer = file.map(|file| {
            fmt::layer()
                .with_target(true)
                .with_level(true)
                .with_ansi(false)
                .with_writer(Arc::new(file))
        });
        registry.with(stderr_layer).with(file_layer).try_init()?;
    }

    Ok(())
}

fn build_filter(level: &str) -> Result<EnvFilter> {
    Ok(EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(level))?)
}

fn open_log_file(path: &Path) -> Result<File> {
    Ok(OpenOptions::new().create(true).append(true).open(path)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use tempfile::TempDir;

    #[test]
    #[serial]
    fn test_filter_accepts_levels_and_directives() {
        std::env::remove_var("RUST_LOG");
        assert!(build_filter("info").is_ok());
        assert!(build_filter("clientfit=debug,warn").is_ok());
    }

    #[test]
    #[serial]
    fn test_filter_rejects_garbage_level() {
        std::env::remove_var("RUST_LOG");
        assert!(build_filter("clientfit=verbose").is_err());
    }

    #[test]
    fn test_open_log_file_appends() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("clientfit.log");
        std::fs::write(&path, "existing\n").unwrap();
        drop(open_log_file(&path).unwrap());
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "existing\n");
    }

    #[test]
    fn test_open_log_file_missing_dir() {
        let dir = TempDir::new().unwrap();
        assert!(open_log_file(&dir.path().join("missing/clientfit.log")).is_err());
    }
}
