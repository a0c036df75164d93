//! Starter override templates
//!
//! Each template is a capability patch that can be applied to any client
//! through the regular override write path.

use crate::error::ClientFitError;
use serde_json::{json, Map, Value};
use std::fmt;
use std::str::FromStr;

/// Named starter configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConfigTemplate {
    /// Smallest footprint for constrained clients
    Minimal,
    /// Balanced defaults
    Standard,
    /// Rich clients with full media support
    Advanced,
    /// Small screens and slow links
    Mobile,
    /// Large budgets and developer diagnostics
    Enterprise,
}

impl ConfigTemplate {
    /// Every template, in presentation order
    pub const ALL: [ConfigTemplate; 5] = [
        ConfigTemplate::Minimal,
        ConfigTemplate::Standard,
        ConfigTemplate::Advanced,
        ConfigTemplate::Mobile,
        ConfigTemplate::Enterprise,
    ];

    /// Template name
    pub fn name(&self) -> &'static str {
        match self {
            ConfigTemplate::Minimal => "minimal",
            ConfigTemplate::Standard => "standard",
            ConfigTemplate::Advanced => "advanced",
            ConfigTemplate::Mobile => "mobile",
            ConfigTemplate::Enterprise => "enterprise",
        }
    }

    /// One-line description
    pub fn description(&self) -> &'static str {
        match self {
            ConfigTemplate::Minimal => "Few low-complexity tools, tiny responses, no media",
            ConfigTemplate::Standard => "Balanced tool budget and structured output",
            ConfigTemplate::Advanced => "Large tool budget, media and streaming enabled",
            ConfigTemplate::Mobile => "Concise output and short lists for small screens",
            ConfigTemplate::Enterprise => "Maximum budgets with developer diagnostics",
        }
    }

    /// Override patch for this template
    pub fn patch(&self) -> Map<String, Value> {
        let value = match self {
            ConfigTemplate::Minimal => json!({
                "maxToolsPerCall": 5,
                "maxConcurrentTools": 1,
                "toolComplexity": "low",
                "outputFormat": "minimal",
                "maxResponseSize": 10_000,
                "supportsBinaryContent": false,
                "supportsImages": false,
                "supportsStreaming": false,
                "errorVerbosity": "minimal"
            }),
            ConfigTemplate::Standard => json!({
                "maxToolsPerCall": 10,
                "maxConcurrentTools": 2,
                "toolComplexity": "medium",
                "outputFormat": "structured",
                "escapeHandling": "standard",
                "maxResponseSize": 50_000,
                "errorVerbosity": "detailed"
            }),
            ConfigTemplate::Advanced => json!({
                "maxToolsPerCall": 25,
                "maxConcurrentTools": 5,
                "toolComplexity": "high",
                "outputFormat": "structured",
                "maxResponseSize": 100_000,
                "supportsBinaryContent": true,
                "supportsImages": true,
                "supportsStreaming": true,
                "timeoutMs": 60_000
            }),
            ConfigTemplate::Mobile => json!({
                "maxToolsPerCall": 5,
                "maxConcurrentTools": 1,
                "toolComplexity": "low",
                "outputFormat": "concise",
                "maxResponseSize": 20_000,
                "supportsStreaming": false,
                "rateLimit": {"requests": 20},
                "ui": {"maxListItems": 10, "codeBlocks": false}
            }),
            ConfigTemplate::Enterprise => json!({
                "maxToolsPerCall": 50,
                "maxConcurrentTools": 10,
                "toolComplexity": "high",
                "outputFormat": "developer",
                "maxResponseSize": 500_000,
                "supportsBinaryContent": true,
                "supportsImages": true,
                "supportsStreaming": true,
                "timeoutMs": 120_000,
                "errorVerbosity": "developer",
                "rateLimit": {"requests": 1_000},
                "ui": {"showMetadata": true}
            }),
        };
        match value {
            Value::Object(map) => map,
            _ => Map::new(),
        }
    }
}

impl FromStr for ConfigTemplate {
    type Err = ClientFitError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|t| t.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| ClientFitError::UnknownTemplate(s.to_string()))
    }
}

impl fmt::Display for ConfigTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capability::{capability_schema, ValidationMode};

    #[test]
    fn test_every_template_is_a_valid_patch() {
        for template in ConfigTemplate::ALL {
            let result = capability_schema().validate(&template.patch(), ValidationMode::Patch);
            assert!(result.valid, "{}: {:?}", template, result.errors);
            assert!(result.warnings.is_empty(), "{}: {:?}", template, result.warnings);
        }
    }

    #[test]
    fn test_parse_template_name() {
        assert_eq!("Mobile".parse::<ConfigTemplate>().unwrap(), ConfigTemplate::Mobile);
        let err = "gigantic".parse::<ConfigTemplate>().unwrap_err();
        assert!(matches!(err, ClientFitError::UnknownTemplate(_)));
    }

    #[test]
    fn test_minimal_template_lowers_complexity() {
        let patch = ConfigTemplate::Minimal.patch();
        assert_eq!(patch["toolComplexity"], "low");
        assert_eq!(patch["maxToolsPerCall"], 5);
    }
}
