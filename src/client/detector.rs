//! Client detection from connection metadata
//!
//! Detection is deterministic and never fails. Sources are consulted in a
//! fixed priority order and, for each non-empty source, profiles are tested
//! in table order; the first pattern match wins. When no pattern matches,
//! declared capabilities are compared against profile signatures, and
//! finally the generic profile is used.

use super::profile::{ClientProfile, ProfileTable};
use crate::capability::{capability_schema, deep_merge, Capabilities, ValidationMode};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize, Serializer};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info};
use uuid::Uuid;

/// Environment variable naming the terminal program
pub const TERMINAL_PROGRAM_VAR: &str = "TERM_PROGRAM";
/// Environment variable naming the user's editor
pub const EDITOR_VAR: &str = "EDITOR";

/// Header names consulted for the client name, in order
const CLIENT_NAME_HEADERS: &[&str] = &["x-client-name", "x-mcp-client-name", "x-mcp-client"];

/// Connection metadata supplied once by the transport layer
///
/// Every field is optional.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ConnectionMetadata {
    /// Explicit user agent string
    pub user_agent: Option<String>,
    /// Explicit client name, e.g. from the initialize handshake
    pub client_name: Option<String>,
    /// Transport headers; names are matched case-insensitively
    pub headers: HashMap<String, String>,
    /// Capabilities the client declared about itself
    pub capabilities: Option<Map<String, Value>>,
    /// Transport kind, e.g. "stdio" or "http"
    pub transport: Option<String>,
    /// Environment variables visible to the session
    pub environment: HashMap<String, String>,
}

impl ConnectionMetadata {
    /// Capture the detection-relevant variables from the process environment
    pub fn with_process_env(mut self) -> Self {
        for var in [TERMINAL_PROGRAM_VAR, EDITOR_VAR] {
            if let Ok(value) = std::env::var(var) {
                self.environment.insert(var.to_string(), value);
            }
        }
        self
    }

    fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    /// Detection sources in priority order, empty values skipped
    fn sources(&self) -> Vec<(DetectionMethod, &str)> {
        let client_name_header = CLIENT_NAME_HEADERS.iter().find_map(|h| self.header(h));
        let candidates = [
            (DetectionMethod::UserAgent, self.user_agent.as_deref()),
            (DetectionMethod::ClientName, self.client_name.as_deref()),
            (DetectionMethod::HeaderUserAgent, self.header("user-agent")),
            (DetectionMethod::HeaderClientName, client_name_header),
            (
                DetectionMethod::TerminalProgram,
                self.environment.get(TERMINAL_PROGRAM_VAR).map(String::as_str),
            ),
            (
                DetectionMethod::EditorEnv,
                self.environment.get(EDITOR_VAR).map(String::as_str),
            ),
        ];
        candidates
            .into_iter()
            .filter_map(|(method, value)| {
                value
                    .map(str::trim)
                    .filter(|v| !v.is_empty())
                    .map(|v| (method, v))
            })
            .collect()
    }
}

/// How a client was recognized
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DetectionMethod {
    /// Explicit user agent
    UserAgent,
    /// Explicit client name
    ClientName,
    /// `User-Agent` header
    HeaderUserAgent,
    /// Client-name header
    HeaderClientName,
    /// Terminal program environment variable
    TerminalProgram,
    /// Editor environment variable
    EditorEnv,
    /// Declared capabilities matched a profile signature
    CapabilitySignature,
    /// Nothing matched; generic profile
    Fallback,
}

impl DetectionMethod {
    /// String form used in logs and serialized contexts
    pub fn as_str(&self) -> &'static str {
        match self {
            DetectionMethod::UserAgent => "user-agent",
            DetectionMethod::ClientName => "client-name",
            DetectionMethod::HeaderUserAgent => "header-user-agent",
            DetectionMethod::HeaderClientName => "header-client-name",
            DetectionMethod::TerminalProgram => "terminal-program",
            DetectionMethod::EditorEnv => "editor-env",
            DetectionMethod::CapabilitySignature => "capability-signature",
            DetectionMethod::Fallback => "fallback",
        }
    }
}

impl std::fmt::Display for DetectionMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Session-scoped detection result
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientContext {
    /// Matched profile
    #[serde(rename = "clientId", serialize_with = "serialize_profile_id")]
    pub profile: Arc<ClientProfile>,
    /// Effective capabilities
    pub capabilities: Capabilities,
    /// Validated capabilities the client declared about itself
    pub declared: Map<String, Value>,
    /// How the profile was chosen
    pub detection_method: DetectionMethod,
    /// Unique session identifier
    pub session_id: Uuid,
    /// When detection ran
    pub created_at: DateTime<Utc>,
}

fn serialize_profile_id<S: Serializer>(
    profile: &Arc<ClientProfile>,
    serializer: S,
) -> std::result::Result<S::Ok, S::Error> {
    serializer.serialize_str(&profile.id)
}

impl ClientContext {
    /// Configuration key for this client
    pub fn client_id(&self) -> &str {
        &self.profile.id
    }
}

/// Resolves a [`ClientContext`] from connection metadata
#[derive(Debug, Clone)]
pub struct ClientDetector {
    table: Arc<ProfileTable>,
    signature_threshold: f64,
    min_signature_checks: usize,
}

impl ClientDetector {
    /// Create a detector with the default signature policy (0.8 over at least 2 checks)
    pub fn new(table: Arc<ProfileTable>) -> Self {
        Self {
            table,
            signature_threshold: 0.8,
            min_signature_checks: 2,
        }
    }

    /// Override the signature acceptance policy
    pub fn with_signature_policy(mut self, threshold: f64, min_checks: usize) -> Self {
        self.signature_threshold = threshold;
        self.min_signature_checks = min_checks;
        self
    }

    /// Profile table used for detection
    pub fn table(&self) -> &Arc<ProfileTable> {
        &self.table
    }

    /// Detect the connected client
    ///
    /// # Arguments
    ///
    /// * `metadata` - Connection metadata; any field may be absent
    ///
    /// # Returns
    ///
    /// Always returns a context; unrecognized clients get the generic profile
    ///
    /// # Examples
    ///
    /// ```
    /// use clientfit::client::{ClientDetector, ConnectionMetadata, DetectionMethod, ProfileTable};
    /// use std::sync::Arc;
    ///
    /// let detector = ClientDetector::new(Arc::new(ProfileTable::builtin().unwrap()));
    /// let metadata = ConnectionMetadata {
    ///     user_agent: Some("Claude Desktop/1.2.0 (macOS)".to_string()),
    ///     ..Default::default()
    /// };
    /// let context = detector.detect(&metadata);
    /// assert_eq!(context.client_id(), "claude-desktop");
    /// assert_eq!(context.detection_method, DetectionMethod::UserAgent);
    /// ```
    pub fn detect(&self, metadata: &ConnectionMetadata) -> ClientContext {
        let (profile, method) = self
            .match_patterns(metadata)
            .or_else(|| self.match_signature(metadata))
            .unwrap_or_else(|| {
                debug!("No detection source matched, using fallback profile");
                (self.table.fallback().clone(), DetectionMethod::Fallback)
            });

        let declared = metadata
            .capabilities
            .as_ref()
            .map(|caps| {
                let result = capability_schema().validate(caps, ValidationMode::Patch);
                for error in &result.errors {
                    debug!(error = %error, "Ignoring invalid declared capability");
                }
                result.config
            })
            .unwrap_or_default();

        let mut record = profile.capabilities.to_record();
        deep_merge(&mut record, &declared);
        let capabilities = Capabilities::from_record(&record);

        info!(
            client = %profile.id,
            method = %method,
            transport = metadata.transport.as_deref().unwrap_or("unknown"),
            "Client detected"
        );

        ClientContext {
            profile,
            capabilities,
            declared,
            detection_method: method,
            session_id: Uuid::new_v4(),
            created_at: Utc::now(),
        }
    }

    fn match_patterns(
        &self,
        metadata: &ConnectionMetadata,
    ) -> Option<(Arc<ClientProfile>, DetectionMethod)> {
        for (method, text) in metadata.sources() {
            debug!(source = %method, value = %text, "Testing detection source");
            if let Some(profile) = self.table.iter().find(|p| p.matches(text)) {
                return Some((profile.clone(), method));
            }
        }
        None
    }

    /// Best signature match meeting the threshold; ties keep table order
    fn match_signature(
        &self,
        metadata: &ConnectionMetadata,
    ) -> Option<(Arc<ClientProfile>, DetectionMethod)> {
        let declared = metadata.capabilities.as_ref()?;
        let mut best: Option<(&Arc<ClientProfile>, f64)> = None;

        for profile in self.table.iter() {
            let Some(signature) = &profile.signature else {
                continue;
            };
            let (matched, compared) = signature.compare(declared);
            if compared < self.min_signature_checks {
                continue;
            }
            let ratio = matched as f64 / compared as f64;
            debug!(client = %profile.id, ratio, compared, "Capability signature compared");
            if ratio >= self.signature_threshold && best.map_or(true, |(_, r)| ratio > r) {
                best = Some((profile, ratio));
            }
        }

        best.map(|(profile, _)| (profile.clone(), DetectionMethod::CapabilitySignature))
    }
}
