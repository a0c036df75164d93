//! Typed client capability records
//!
//! Capabilities travel through the configuration layers as JSON records so
//! they can be merged and validated field by field. This module provides the
//! typed view used by the rest of the crate once a record has been resolved.

pub mod schema;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;

pub use schema::{capability_schema, FieldSchema, FieldType, Schema, ValidationMode, ValidationResult};

/// Default tool budget per call
pub const DEFAULT_MAX_TOOLS_PER_CALL: u32 = 10;
/// Default bound on tool executions running at once
pub const DEFAULT_MAX_CONCURRENT_TOOLS: u32 = 2;
/// Default per-call timeout in milliseconds
pub const DEFAULT_TIMEOUT_MS: u64 = 30_000;
/// Default response size limit in bytes
pub const DEFAULT_MAX_RESPONSE_SIZE: usize = 50_000;
/// Default request budget per rate-limit window
pub const DEFAULT_RATE_LIMIT_REQUESTS: u32 = 60;
/// Default rate-limit window in milliseconds
pub const DEFAULT_RATE_LIMIT_WINDOW_MS: u64 = 60_000;
/// Default number of list items rendered in compact output modes
pub const DEFAULT_MAX_LIST_ITEMS: u32 = 25;

/// Ordinal tool complexity tier
///
/// The derived ordering is `Low < Medium < High` and is what gates tool
/// exposure: a client only sees tools whose tier is at or below its own.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ToolComplexity {
    /// Simple lookups with few parameters
    Low,
    /// Typical read and write operations
    #[default]
    Medium,
    /// Bulk, analytical or multi-step operations
    High,
}

impl ToolComplexity {
    /// Accepted string values, in ascending order
    pub const VALUES: &'static [&'static str] = &["low", "medium", "high"];

    /// String form used in capability records
    pub fn as_str(&self) -> &'static str {
        match self {
            ToolComplexity::Low => "low",
            ToolComplexity::Medium => "medium",
            ToolComplexity::High => "high",
        }
    }
}

/// Output shaping mode applied to tool results
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Bare values, short lists, no nulls
    Minimal,
    /// Compact single-line JSON without nulls
    Concise,
    /// Pretty-printed JSON
    #[default]
    Structured,
    /// Pretty-printed JSON with type and size metadata
    Developer,
}

impl OutputFormat {
    /// Accepted string values
    pub const VALUES: &'static [&'static str] = &["minimal", "concise", "structured", "developer"];

    /// String form used in capability records
    pub fn as_str(&self) -> &'static str {
        match self {
            OutputFormat::Minimal => "minimal",
            OutputFormat::Concise => "concise",
            OutputFormat::Structured => "structured",
            OutputFormat::Developer => "developer",
        }
    }
}

/// Character escaping policy for outgoing text
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum EscapeHandling {
    /// Text is passed through untouched
    None,
    /// Only non-printable control characters are escaped
    Minimal,
    /// Control characters, backslashes and double quotes are escaped
    #[default]
    Standard,
    /// Full JSON string-literal escaping
    Json,
    /// Markdown metacharacters are backslash-escaped
    Markdown,
}

impl EscapeHandling {
    /// Accepted string values
    pub const VALUES: &'static [&'static str] = &["none", "minimal", "standard", "json", "markdown"];

    /// String form used in capability records
    pub fn as_str(&self) -> &'static str {
        match self {
            EscapeHandling::None => "none",
            EscapeHandling::Minimal => "minimal",
            EscapeHandling::Standard => "standard",
            EscapeHandling::Json => "json",
            EscapeHandling::Markdown => "markdown",
        }
    }
}

/// How much detail error responses carry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ErrorVerbosity {
    /// Top-level message only
    Minimal,
    /// Message plus the cause chain
    #[default]
    Detailed,
    /// Full debug rendering including backtraces when captured
    Developer,
}

impl ErrorVerbosity {
    /// Accepted string values
    pub const VALUES: &'static [&'static str] = &["minimal", "detailed", "developer"];

    /// String form used in capability records
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorVerbosity::Minimal => "minimal",
            ErrorVerbosity::Detailed => "detailed",
            ErrorVerbosity::Developer => "developer",
        }
    }
}

macro_rules! impl_str_enum {
    ($ty:ty, $($text:literal => $variant:expr),+ $(,)?) => {
        impl FromStr for $ty {
            type Err = String;

            fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
                match s.to_ascii_lowercase().as_str() {
                    $($text => Ok($variant),)+
                    other => Err(format!("invalid value '{}'", other)),
                }
            }
        }

        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

impl_str_enum!(ToolComplexity, "low" => ToolComplexity::Low, "medium" => ToolComplexity::Medium, "high" => ToolComplexity::High);
impl_str_enum!(
    OutputFormat,
    "minimal" => OutputFormat::Minimal,
    "concise" => OutputFormat::Concise,
    "structured" => OutputFormat::Structured,
    "developer" => OutputFormat::Developer,
);
impl_str_enum!(
    EscapeHandling,
    "none" => EscapeHandling::None,
    "minimal" => EscapeHandling::Minimal,
    "standard" => EscapeHandling::Standard,
    "json" => EscapeHandling::Json,
    "markdown" => EscapeHandling::Markdown,
);
impl_str_enum!(
    ErrorVerbosity,
    "minimal" => ErrorVerbosity::Minimal,
    "detailed" => ErrorVerbosity::Detailed,
    "developer" => ErrorVerbosity::Developer,
);

/// Request budget a client tolerates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateLimit {
    /// Requests allowed per window
    pub requests: u32,
    /// Window length in milliseconds
    #[serde(rename = "window")]
    pub window_ms: u64,
}

impl Default for RateLimit {
    fn default() -> Self {
        Self {
            requests: DEFAULT_RATE_LIMIT_REQUESTS,
            window_ms: DEFAULT_RATE_LIMIT_WINDOW_MS,
        }
    }
}

/// Optional protocol features a client advertises
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Features {
    /// Client renders progress notifications
    pub progress_notifications: bool,
    /// Client can subscribe to resource updates
    pub resource_subscriptions: bool,
    /// Client supports prompt templates
    pub prompts: bool,
}

/// Rendering preferences for formatted responses
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UiPreferences {
    /// Maximum list items kept by the compact output modes
    pub max_list_items: u32,
    /// Structured output includes a metadata block
    pub show_metadata: bool,
    /// Developer output is fenced as a code block
    pub code_blocks: bool,
}

impl Default for UiPreferences {
    fn default() -> Self {
        Self {
            max_list_items: DEFAULT_MAX_LIST_ITEMS,
            show_metadata: false,
            code_blocks: true,
        }
    }
}

/// Effective capabilities of a connected client
///
/// Serializes to the camelCase record shape used by the configuration layers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Capabilities {
    /// Tools exposed per listing
    pub max_tools_per_call: u32,
    /// Client accepts binary content blocks
    pub supports_binary_content: bool,
    /// Client renders images
    pub supports_images: bool,
    /// Client consumes streamed responses
    pub supports_streaming: bool,
    /// Largest response, in bytes, sent to the client
    pub max_response_size: usize,
    /// Escaping applied to outgoing text
    pub escape_handling: EscapeHandling,
    /// Output shaping mode
    pub output_format: OutputFormat,
    /// Request budget the client tolerates
    pub rate_limit: RateLimit,
    /// Highest tool tier exposed to the client
    pub tool_complexity: ToolComplexity,
    /// Tool executions allowed at once
    pub max_concurrent_tools: u32,
    /// Per-call timeout in milliseconds
    pub timeout_ms: u64,
    /// Detail level of error responses
    pub error_verbosity: ErrorVerbosity,
    /// Optional protocol features
    pub features: Features,
    /// Rendering preferences
    pub ui: UiPreferences,
}

impl Default for Capabilities {
    fn default() -> Self {
        Self {
            max_tools_per_call: DEFAULT_MAX_TOOLS_PER_CALL,
            supports_binary_content: false,
            supports_images: false,
            supports_streaming: false,
            max_response_size: DEFAULT_MAX_RESPONSE_SIZE,
            escape_handling: EscapeHandling::default(),
            output_format: OutputFormat::default(),
            rate_limit: RateLimit::default(),
            tool_complexity: ToolComplexity::default(),
            max_concurrent_tools: DEFAULT_MAX_CONCURRENT_TOOLS,
            timeout_ms: DEFAULT_TIMEOUT_MS,
            error_verbosity: ErrorVerbosity::default(),
            features: Features::default(),
            ui: UiPreferences::default(),
        }
    }
}

impl Capabilities {
    /// Render as a capability record
    pub fn to_record(&self) -> Map<String, Value> {
        match serde_json::to_value(self) {
            Ok(Value::Object(map)) => map,
            _ => Map::new(),
        }
    }

    /// Build the typed view of a validated record
    ///
    /// Fields missing from the record, or holding a value of the wrong
    /// shape, take the documented default. Numbers are rounded to the
    /// nearest integer so that adaptive arithmetic never leaks fractions.
    pub fn from_record(record: &Map<String, Value>) -> Self {
        let defaults = Self::default();
        let rate = record.get("rateLimit").and_then(Value::as_object);
        let features = record.get("features").and_then(Value::as_object);
        let ui = record.get("ui").and_then(Value::as_object);

        Self {
            max_tools_per_call: read_u64(record, "maxToolsPerCall")
                .map(|v| v as u32)
                .unwrap_or(defaults.max_tools_per_call),
            supports_binary_content: read_bool(record, "supportsBinaryContent")
                .unwrap_or(defaults.supports_binary_content),
            supports_images: read_bool(record, "supportsImages").unwrap_or(defaults.supports_images),
            supports_streaming: read_bool(record, "supportsStreaming")
                .unwrap_or(defaults.supports_streaming),
            max_response_size: read_u64(record, "maxResponseSize")
                .map(|v| v as usize)
                .unwrap_or(defaults.max_response_size),
            escape_handling: read_enum(record, "escapeHandling").unwrap_or(defaults.escape_handling),
            output_format: read_enum(record, "outputFormat").unwrap_or(defaults.output_format),
            rate_limit: RateLimit {
                requests: rate
                    .and_then(|r| read_u64(r, "requests"))
                    .map(|v| v as u32)
                    .unwrap_or(defaults.rate_limit.requests),
                window_ms: rate
                    .and_then(|r| read_u64(r, "window"))
                    .unwrap_or(defaults.rate_limit.window_ms),
            },
            tool_complexity: read_enum(record, "toolComplexity").unwrap_or(defaults.tool_complexity),
            max_concurrent_tools: read_u64(record, "maxConcurrentTools")
                .map(|v| v as u32)
                .unwrap_or(defaults.max_concurrent_tools),
            timeout_ms: read_u64(record, "timeoutMs").unwrap_or(defaults.timeout_ms),
            error_verbosity: read_enum(record, "errorVerbosity").unwrap_or(defaults.error_verbosity),
            features: Features {
                progress_notifications: features
                    .and_then(|f| read_bool(f, "progressNotifications"))
                    .unwrap_or(defaults.features.progress_notifications),
                resource_subscriptions: features
                    .and_then(|f| read_bool(f, "resourceSubscriptions"))
                    .unwrap_or(defaults.features.resource_subscriptions),
                prompts: features
                    .and_then(|f| read_bool(f, "prompts"))
                    .unwrap_or(defaults.features.prompts),
            },
            ui: UiPreferences {
                max_list_items: ui
                    .and_then(|u| read_u64(u, "maxListItems"))
                    .map(|v| v as u32)
                    .unwrap_or(defaults.ui.max_list_items),
                show_metadata: ui
                    .and_then(|u| read_bool(u, "showMetadata"))
                    .unwrap_or(defaults.ui.show_metadata),
                code_blocks: ui
                    .and_then(|u| read_bool(u, "codeBlocks"))
                    .unwrap_or(defaults.ui.code_blocks),
            },
        }
    }
}

fn read_u64(record: &Map<String, Value>, key: &str) -> Option<u64> {
    let n = record.get(key)?.as_f64()?;
    if n.is_finite() && n >= 0.0 {
        Some(n.round() as u64)
    } else {
        None
    }
}

fn read_bool(record: &Map<String, Value>, key: &str) -> Option<bool> {
    record.get(key)?.as_bool()
}

fn read_enum<T: FromStr>(record: &Map<String, Value>, key: &str) -> Option<T> {
    record.get(key)?.as_str()?.parse().ok()
}

/// Deep-merge `patch` into `base`
///
/// Object values merge recursively; every other value in `patch`
/// replaces the one in `base`.
pub fn deep_merge(base: &mut Map<String, Value>, patch: &Map<String, Value>) {
    for (key, value) in patch {
        match (base.get_mut(key), value) {
            (Some(Value::Object(existing)), Value::Object(incoming)) => {
                deep_merge(existing, incoming);
            }
            _ => {
                base.insert(key.clone(), value.clone());
            }
        }
    }
}
