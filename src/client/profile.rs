//! Built-in client profile table
//!
//! Profiles are evaluated in the order they appear in the table. The
//! built-in order is:
//!
//! 1. `claude-desktop`
//! 2. `claude-code`
//! 3. `cursor`
//! 4. `vscode`
//! 5. `windsurf`
//! 6. `zed`
//! 7. `cline`
//! 8. `mcp-inspector`
//!
//! `generic` is the fallback and carries no detection patterns. More
//! specific products come before broader ones so that, for example,
//! "Claude Code" never falls through to the `vscode` `code` pattern.

use crate::capability::{
    Capabilities, ErrorVerbosity, EscapeHandling, Features, OutputFormat, RateLimit,
    ToolComplexity, UiPreferences,
};
use crate::error::Result;
use regex::Regex;
use serde_json::{Map, Value};
use std::sync::Arc;

/// Identifier of the fallback profile
pub const GENERIC_PROFILE_ID: &str = "generic";

/// One expected value inside a capability signature
#[derive(Debug, Clone, PartialEq)]
pub enum SignatureCheck {
    /// Boolean capability must match exactly
    Bool(bool),
    /// Numeric capability must fall within `[min, max]`
    Range {
        /// Inclusive lower bound
        min: f64,
        /// Inclusive upper bound
        max: f64,
    },
}

impl SignatureCheck {
    fn matches(&self, value: &Value) -> bool {
        match (self, value) {
            (SignatureCheck::Bool(expected), Value::Bool(actual)) => expected == actual,
            (SignatureCheck::Range { min, max }, Value::Number(n)) => n
                .as_f64()
                .map(|v| v >= *min && v <= *max)
                .unwrap_or(false),
            _ => false,
        }
    }
}

/// Declared-capability fingerprint of a client
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CapabilitySignature {
    checks: Vec<(String, SignatureCheck)>,
}

impl CapabilitySignature {
    /// Create an empty signature
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an exact boolean check
    pub fn flag(mut self, key: &str, expected: bool) -> Self {
        self.checks.push((key.to_string(), SignatureCheck::Bool(expected)));
        self
    }

    /// Add an inclusive numeric range check
    pub fn range(mut self, key: &str, min: f64, max: f64) -> Self {
        self.checks
            .push((key.to_string(), SignatureCheck::Range { min, max }));
        self
    }

    /// Compare against declared capabilities
    ///
    /// Only keys present in `declared` are compared.
    ///
    /// # Returns
    ///
    /// Returns `(matched, compared)`
    pub fn compare(&self, declared: &Map<String, Value>) -> (usize, usize) {
        self.checks
            .iter()
            .filter_map(|(key, check)| declared.get(key).map(|value| check.matches(value)))
            .fold((0, 0), |(matched, compared), hit| {
                (matched + usize::from(hit), compared + 1)
            })
    }
}

/// Static capability template for a recognized client type
#[derive(Debug, Clone)]
pub struct ClientProfile {
    /// Stable profile identifier, also the config key
    pub id: String,
    /// Human-readable client name
    pub name: String,
    /// Detection patterns, tested in order
    pub patterns: Vec<Regex>,
    /// Default capability set
    pub capabilities: Capabilities,
    /// Fingerprint used when no pattern matches
    pub signature: Option<CapabilitySignature>,
}

impl ClientProfile {
    /// Create a profile from pattern sources
    ///
    /// # Errors
    ///
    /// Returns error if any pattern fails to compile
    pub fn new(id: &str, name: &str, patterns: &[&str], capabilities: Capabilities) -> Result<Self> {
        let patterns = patterns
            .iter()
            .map(|p| Regex::new(p))
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(crate::error::ClientFitError::from)?;
        Ok(Self {
            id: id.to_string(),
            name: name.to_string(),
            patterns,
            capabilities,
            signature: None,
        })
    }

    /// Attach a capability signature
    pub fn with_signature(mut self, signature: CapabilitySignature) -> Self {
        self.signature = Some(signature);
        self
    }

    /// Returns true if any detection pattern matches `text`
    pub fn matches(&self, text: &str) -> bool {
        self.patterns.iter().any(|p| p.is_match(text))
    }

    /// Base configuration record for this profile
    ///
    /// The record carries the profile id and name next to its capabilities
    /// and is the first layer of every resolved configuration.
    pub fn base_record(&self) -> Map<String, Value> {
        let mut record = Map::new();
        record.insert("id".to_string(), Value::String(self.id.clone()));
        record.insert("name".to_string(), Value::String(self.name.clone()));
        record.extend(self.capabilities.to_record());
        record
    }
}

/// Ordered table of client profiles plus the fallback profile
#[derive(Debug, Clone)]
pub struct ProfileTable {
    profiles: Vec<Arc<ClientProfile>>,
    fallback: Arc<ClientProfile>,
}

impl ProfileTable {
    /// Create a table from profiles in detection order
    pub fn new(profiles: Vec<ClientProfile>, fallback: ClientProfile) -> Self {
        Self {
            profiles: profiles.into_iter().map(Arc::new).collect(),
            fallback: Arc::new(fallback),
        }
    }

    /// Profiles in detection order, excluding the fallback
    pub fn iter(&self) -> impl Iterator<Item = &Arc<ClientProfile>> {
        self.profiles.iter()
    }

    /// The fallback profile
    pub fn fallback(&self) -> &Arc<ClientProfile> {
        &self.fallback
    }

    /// Find a profile by id, including the fallback
    pub fn get(&self, id: &str) -> Option<&Arc<ClientProfile>> {
        self.profiles
            .iter()
            .chain(std::iter::once(&self.fallback))
            .find(|p| p.id == id)
    }

    /// Number of profiles including the fallback
    pub fn len(&self) -> usize {
        self.profiles.len() + 1
    }

    /// A table always contains at least the fallback
    pub fn is_empty(&self) -> bool {
        false
    }

    /// Build the built-in profile table
    ///
    /// # Errors
    ///
    /// Returns error if a built-in pattern fails to compile
    ///
    /// # Examples
    ///
    /// ```
    /// use clientfit::client::ProfileTable;
    ///
    /// let table = ProfileTable::builtin().unwrap();
    /// assert_eq!(table.iter().next().unwrap().id, "claude-desktop");
    /// assert_eq!(table.fallback().id, "generic");
    /// ```
    pub fn builtin() -> Result<Self> {
        let profiles = vec![
            ClientProfile::new(
                "claude-desktop",
                "Claude Desktop",
                &[r"(?i)claude[\s_-]*desktop", r"(?i)^claude-ai\b"],
                Capabilities {
                    max_tools_per_call: 10,
                    supports_binary_content: true,
                    supports_images: true,
                    supports_streaming: false,
                    max_response_size: 50_000,
                    escape_handling: EscapeHandling::Standard,
                    output_format: OutputFormat::Structured,
                    rate_limit: RateLimit { requests: 60, window_ms: 60_000 },
                    tool_complexity: ToolComplexity::High,
                    max_concurrent_tools: 3,
                    timeout_ms: 30_000,
                    error_verbosity: ErrorVerbosity::Detailed,
                    features: Features {
                        progress_notifications: true,
                        resource_subscriptions: true,
                        prompts: true,
                    },
                    ui: UiPreferences::default(),
                },
            )?
            .with_signature(
                CapabilitySignature::new()
                    .flag("supportsImages", true)
                    .flag("supportsStreaming", false)
                    .range("maxToolsPerCall", 5.0, 15.0),
            ),
            ClientProfile::new(
                "claude-code",
                "Claude Code",
                &[r"(?i)claude[\s_-]*code"],
                Capabilities {
                    max_tools_per_call: 25,
                    supports_binary_content: true,
                    supports_images: true,
                    supports_streaming: true,
                    max_response_size: 100_000,
                    escape_handling: EscapeHandling::None,
                    output_format: OutputFormat::Developer,
                    rate_limit: RateLimit { requests: 120, window_ms: 60_000 },
                    tool_complexity: ToolComplexity::High,
                    max_concurrent_tools: 5,
                    timeout_ms: 60_000,
                    error_verbosity: ErrorVerbosity::Developer,
                    features: Features {
                        progress_notifications: true,
                        resource_subscriptions: false,
                        prompts: true,
                    },
                    ui: UiPreferences {
                        max_list_items: 50,
                        show_metadata: true,
                        code_blocks: false,
                    },
                },
            )?,
            ClientProfile::new(
                "cursor",
                "Cursor",
                &[r"(?i)\bcursor\b"],
                Capabilities {
                    max_tools_per_call: 20,
                    supports_binary_content: false,
                    supports_images: true,
                    supports_streaming: true,
                    max_response_size: 80_000,
                    escape_handling: EscapeHandling::Json,
                    output_format: OutputFormat::Concise,
                    rate_limit: RateLimit { requests: 100, window_ms: 60_000 },
                    tool_complexity: ToolComplexity::High,
                    max_concurrent_tools: 3,
                    timeout_ms: 30_000,
                    error_verbosity: ErrorVerbosity::Detailed,
                    features: Features::default(),
                    ui: UiPreferences::default(),
                },
            )?
            .with_signature(
                CapabilitySignature::new()
                    .flag("supportsImages", true)
                    .flag("supportsStreaming", true)
                    .range("maxToolsPerCall", 16.0, 40.0),
            ),
            ClientProfile::new(
                "vscode",
                "Visual Studio Code",
                &[
                    r"(?i)vs[\s_-]?code",
                    r"(?i)visual studio code",
                    r"(?i)copilot",
                    r"(?i)(^|/)code(-insiders)?$",
                ],
                Capabilities {
                    max_tools_per_call: 15,
                    supports_binary_content: false,
                    supports_images: false,
                    supports_streaming: true,
                    max_response_size: 60_000,
                    escape_handling: EscapeHandling::Markdown,
                    output_format: OutputFormat::Structured,
                    rate_limit: RateLimit { requests: 60, window_ms: 60_000 },
                    tool_complexity: ToolComplexity::Medium,
                    max_concurrent_tools: 2,
                    timeout_ms: 30_000,
                    error_verbosity: ErrorVerbosity::Detailed,
                    features: Features {
                        progress_notifications: true,
                        resource_subscriptions: false,
                        prompts: true,
                    },
                    ui: UiPreferences::default(),
                },
            )?
            .with_signature(
                CapabilitySignature::new()
                    .flag("supportsImages", false)
                    .flag("supportsStreaming", true)
                    .range("maxResponseSize", 30_000.0, 80_000.0),
            ),
            ClientProfile::new(
                "windsurf",
                "Windsurf",
                &[r"(?i)windsurf", r"(?i)codeium"],
                Capabilities {
                    max_tools_per_call: 12,
                    supports_binary_content: false,
                    supports_images: false,
                    supports_streaming: true,
                    max_response_size: 50_000,
                    escape_handling: EscapeHandling::Standard,
                    output_format: OutputFormat::Concise,
                    rate_limit: RateLimit { requests: 60, window_ms: 60_000 },
                    tool_complexity: ToolComplexity::Medium,
                    max_concurrent_tools: 2,
                    timeout_ms: 30_000,
                    error_verbosity: ErrorVerbosity::Detailed,
                    features: Features::default(),
                    ui: UiPreferences::default(),
                },
            )?,
            ClientProfile::new(
                "zed",
                "Zed",
                &[r"(?i)\bzed\b"],
                Capabilities {
                    max_tools_per_call: 10,
                    supports_binary_content: false,
                    supports_images: false,
                    supports_streaming: false,
                    max_response_size: 40_000,
                    escape_handling: EscapeHandling::Standard,
                    output_format: OutputFormat::Concise,
                    rate_limit: RateLimit { requests: 30, window_ms: 60_000 },
                    tool_complexity: ToolComplexity::Medium,
                    max_concurrent_tools: 2,
                    timeout_ms: 30_000,
                    error_verbosity: ErrorVerbosity::Minimal,
                    features: Features::default(),
                    ui: UiPreferences {
                        max_list_items: 15,
                        ..UiPreferences::default()
                    },
                },
            )?,
            ClientProfile::new(
                "cline",
                "Cline",
                &[r"(?i)\bcline\b", r"(?i)claude[\s_-]*dev"],
                Capabilities {
                    max_tools_per_call: 10,
                    supports_binary_content: false,
                    supports_images: false,
                    supports_streaming: false,
                    max_response_size: 40_000,
                    escape_handling: EscapeHandling::Json,
                    output_format: OutputFormat::Concise,
                    rate_limit: RateLimit { requests: 30, window_ms: 60_000 },
                    tool_complexity: ToolComplexity::Medium,
                    max_concurrent_tools: 1,
                    timeout_ms: 45_000,
                    error_verbosity: ErrorVerbosity::Detailed,
                    features: Features::default(),
                    ui: UiPreferences::default(),
                },
            )?,
            ClientProfile::new(
                "mcp-inspector",
                "MCP Inspector",
                &[r"(?i)mcp[\s_-]*inspector"],
                Capabilities {
                    max_tools_per_call: 50,
                    supports_binary_content: true,
                    supports_images: true,
                    supports_streaming: true,
                    max_response_size: 1_000_000,
                    escape_handling: EscapeHandling::None,
                    output_format: OutputFormat::Developer,
                    rate_limit: RateLimit { requests: 1_000, window_ms: 60_000 },
                    tool_complexity: ToolComplexity::High,
                    max_concurrent_tools: 10,
                    timeout_ms: 120_000,
                    error_verbosity: ErrorVerbosity::Developer,
                    features: Features {
                        progress_notifications: true,
                        resource_subscriptions: true,
                        prompts: true,
                    },
                    ui: UiPreferences {
                        max_list_items: 100,
                        show_metadata: true,
                        code_blocks: true,
                    },
                },
            )?,
        ];

        let generic = ClientProfile::new(
            GENERIC_PROFILE_ID,
            "Generic MCP Client",
            &[],
            Capabilities {
                max_tools_per_call: 10,
                supports_binary_content: false,
                supports_images: false,
                supports_streaming: false,
                max_response_size: 25_000,
                escape_handling: EscapeHandling::Standard,
                output_format: OutputFormat::Concise,
                rate_limit: RateLimit { requests: 30, window_ms: 60_000 },
                tool_complexity: ToolComplexity::Medium,
                max_concurrent_tools: 1,
                timeout_ms: 30_000,
                error_verbosity: ErrorVerbosity::Minimal,
                features: Features::default(),
                ui: UiPreferences {
                    max_list_items: 10,
                    ..UiPreferences::default()
                },
            },
        )?;

        Ok(Self::new(profiles, generic))
    }
}
