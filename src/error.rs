//! Error types for ClientFit
//!
//! This module defines all error types used throughout the library,
//! using `thiserror` for ergonomic error handling.

use thiserror::Error;

/// Main error type for ClientFit operations
///
/// Callers receive these wrapped in `anyhow::Error` and can use
/// `downcast_ref::<ClientFitError>()` to tell the kinds apart, for example
/// to separate an unknown tool from a tool that is hidden from the client.
#[derive(Error, Debug)]
pub enum ClientFitError {
    /// Application settings errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// A capability record failed schema validation on write
    #[error("Validation failed: {}", errors.join("; "))]
    Validation {
        /// Every validation error found in the rejected record
        errors: Vec<String>,
    },

    /// No tool is registered under the requested name
    #[error("Tool not found: {0}")]
    ToolNotFound(String),

    /// The tool exists but the connected client cannot use it
    #[error("Tool '{tool}' is not compatible with client '{client}': {reason}")]
    ToolIncompatible {
        /// Requested tool
        tool: String,
        /// Resolved client profile id
        client: String,
        /// Which gate rejected the call
        reason: String,
    },

    /// Tool execution exceeded the client's timeout
    #[error("Tool '{tool}' timed out after {timeout_ms}ms")]
    ToolTimeout {
        /// Tool that was cancelled
        tool: String,
        /// Timeout that was applied
        timeout_ms: u64,
    },

    /// Generic tool execution errors raised by handlers
    #[error("Tool execution error: {0}")]
    ToolExecution(String),

    /// No resource is registered under the requested uri
    #[error("Resource not found: {0}")]
    ResourceNotFound(String),

    /// The resource exists but the client cannot receive its content
    #[error("Resource '{uri}' is not available to this client: {reason}")]
    ResourceIncompatible {
        /// Requested resource uri
        uri: String,
        /// Why the resource is hidden
        reason: String,
    },

    /// Requested configuration template does not exist
    #[error("Unknown configuration template: {0}")]
    UnknownTemplate(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// YAML parsing errors
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// Invalid detection pattern
    #[error("Pattern error: {0}")]
    Pattern(#[from] regex::Error),
}

/// Result type alias for ClientFit operations
///
/// This is a convenience alias that uses `anyhow::Error` as the error type,
/// allowing for rich error context and easy error propagation.
pub type Result<T> = anyhow::Result<T>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_error_display() {
        let error = ClientFitError::Config("invalid format".to_string());
        assert_eq!(error.to_string(), "Configuration error: invalid format");
    }

    #[test]
    fn test_validation_error_joins_messages() {
        let error = ClientFitError::Validation {
            errors: vec![
                "maxToolsPerCall: must be <= 50".to_string(),
                "outputFormat: must be one of minimal, concise".to_string(),
            ],
        };
        let s = error.to_string();
        assert!(s.starts_with("Validation failed: "));
        assert!(s.contains("maxToolsPerCall"));
        assert!(s.contains("; outputFormat"));
    }

    #[test]
    fn test_tool_not_found_display() {
        let error = ClientFitError::ToolNotFound("get_accounts".to_string());
        assert_eq!(error.to_string(), "Tool not found: get_accounts");
    }

    #[test]
    fn test_tool_incompatible_display() {
        let error = ClientFitError::ToolIncompatible {
            tool: "render_chart".to_string(),
            client: "generic".to_string(),
            reason: "requires image support".to_string(),
        };
        assert_eq!(
            error.to_string(),
            "Tool 'render_chart' is not compatible with client 'generic': requires image support"
        );
    }

    #[test]
    fn test_tool_timeout_display() {
        let error = ClientFitError::ToolTimeout {
            tool: "slow".to_string(),
            timeout_ms: 1500,
        };
        assert_eq!(error.to_string(), "Tool 'slow' timed out after 1500ms");
    }

    #[test]
    fn test_unknown_template_display() {
        let error = ClientFitError::UnknownTemplate("huge".to_string());
        assert_eq!(error.to_string(), "Unknown configuration template: huge");
    }

    #[test]
    fn test_io_error_conversion() {
        let io_error = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let error: ClientFitError = io_error.into();
        assert!(matches!(error, ClientFitError::Io(_)));
    }

    #[test]
    fn test_json_error_conversion() {
        let json_error = serde_json::from_str::<serde_json::Value>("{invalid json}").unwrap_err();
        let error: ClientFitError = json_error.into();
        assert!(matches!(error, ClientFitError::Serialization(_)));
    }

    #[test]
    fn test_yaml_error_conversion() {
        let yaml_error = serde_yaml::from_str::<serde_yaml::Value>("invalid: : yaml").unwrap_err();
        let error: ClientFitError = yaml_error.into();
        assert!(matches!(error, ClientFitError::Yaml(_)));
    }

    #[test]
    fn test_downcast_through_anyhow() {
        let err: anyhow::Error = ClientFitError::ToolNotFound("x".to_string()).into();
        assert!(matches!(
            err.downcast_ref::<ClientFitError>(),
            Some(ClientFitError::ToolNotFound(_))
        ));
    }

    #[test]
    fn test_error_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<ClientFitError>();
    }
}
