//! Layered client configuration
//!
//! A client's configuration is resolved on every read by deep-merging
//! immutable layers and re-validating the result:
//!
//! ```text
//! base (profile or registered record)
//!   -> declared (capabilities the client reported, session resolution only)
//!   -> override (explicit admin patch)
//!   -> adaptive (behavior-derived patch)
//! ```
//!
//! Fields that fail validation after the merge are dropped from the
//! resolved record and logged; they are not reverted to an earlier
//! layer's value. The typed [`Capabilities`] view then falls back to the
//! schema default for any dropped field.
//!
//! Writes (`set_override`, `register_client`, `import_config`) are
//! all-or-nothing: any validation error rejects the entire write.

pub mod persistence;
pub mod templates;

use crate::capability::{capability_schema, deep_merge, Capabilities, ValidationMode};
use crate::client::{ClientContext, ProfileTable};
use crate::error::{ClientFitError, Result};
use chrono::Utc;
use metrics::increment_counter;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::{debug, info, warn};

pub use persistence::ConfigExport;
pub use templates::ConfigTemplate;

/// Error rate above which the tool budget shrinks and the timeout grows
const ERROR_RATE_THRESHOLD: f64 = 0.1;
/// Average response time (ms) above which concurrency is reduced
const SLOW_RESPONSE_MS: f64 = 5_000.0;
/// Fraction of the size limit above which output is compacted
const RESPONSE_SIZE_PRESSURE: f64 = 0.8;
/// Ceiling for adaptive timeout growth
const MAX_ADAPTIVE_TIMEOUT_MS: f64 = 60_000.0;
/// Ceiling for adaptive response size growth
const MAX_ADAPTIVE_RESPONSE_SIZE: f64 = 100_000.0;
/// Schema minimum for `maxResponseSize`
const MIN_RESPONSE_SIZE: f64 = 1_000.0;

/// Observed behavior fed into adaptive updates
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BehaviorSummary {
    /// Errors divided by attempts
    pub error_rate: f64,
    /// Average call duration in milliseconds
    pub avg_response_time: f64,
    /// Average serialized response size in bytes
    pub avg_response_size: f64,
}

/// Resolved configuration for one client
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientConfig {
    /// Client the configuration belongs to
    pub client_id: String,
    /// Validated, merged record
    pub values: Map<String, Value>,
    /// Validation errors for fields dropped during resolution
    pub dropped: Vec<String>,
    /// Validation warnings
    pub warnings: Vec<String>,
}

impl ClientConfig {
    /// Typed view of the resolved record
    pub fn capabilities(&self) -> Capabilities {
        Capabilities::from_record(&self.values)
    }
}

#[derive(Debug, Default)]
struct ManagerState {
    registered: HashMap<String, Map<String, Value>>,
    overrides: HashMap<String, Map<String, Value>>,
    adaptive: HashMap<String, Map<String, Value>>,
}

/// Owner of the override and adaptive layers for every client
///
/// All layer writes go through a single lock, so concurrent updates for the
/// same client are serialized and never lose each other's changes.
#[derive(Debug)]
pub struct ConfigManager {
    profiles: Arc<ProfileTable>,
    state: RwLock<ManagerState>,
}

impl ConfigManager {
    /// Create a manager over a profile table
    ///
    /// # Examples
    ///
    /// ```
    /// use clientfit::client::ProfileTable;
    /// use clientfit::manager::ConfigManager;
    /// use std::sync::Arc;
    ///
    /// let manager = ConfigManager::new(Arc::new(ProfileTable::builtin().unwrap()));
    /// let config = manager.get_config("claude-desktop");
    /// assert_eq!(config.capabilities().max_tools_per_call, 10);
    /// ```
    pub fn new(profiles: Arc<ProfileTable>) -> Self {
        Self {
            profiles,
            state: RwLock::new(ManagerState::default()),
        }
    }

    /// Profile table backing the base layer
    pub fn profiles(&self) -> &Arc<ProfileTable> {
        &self.profiles
    }

    fn read_state(&self) -> RwLockReadGuard<'_, ManagerState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_state(&self) -> RwLockWriteGuard<'_, ManagerState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Resolve the configuration for a client id
    ///
    /// Unknown ids resolve against the generic profile. Never fails.
    pub fn get_config(&self, client_id: &str) -> ClientConfig {
        let state = self.read_state();
        self.resolve(&state, client_id, None)
    }

    /// Resolve the configuration for a live session
    ///
    /// Same as [`ConfigManager::get_config`] with the client's declared
    /// capabilities layered directly above the base.
    pub fn resolve_for(&self, context: &ClientContext) -> ClientConfig {
        let state = self.read_state();
        self.resolve(&state, context.client_id(), Some(&context.declared))
    }

    fn base_record(&self, state: &ManagerState, client_id: &str) -> Map<String, Value> {
        if let Some(record) = state.registered.get(client_id) {
            return record.clone();
        }
        match self.profiles.get(client_id) {
            Some(profile) => profile.base_record(),
            None => {
                let mut record = self.profiles.fallback().base_record();
                record.insert("id".to_string(), Value::String(client_id.to_string()));
                record
            }
        }
    }

    fn resolve(
        &self,
        state: &ManagerState,
        client_id: &str,
        declared: Option<&Map<String, Value>>,
    ) -> ClientConfig {
        let mut merged = self.base_record(state, client_id);
        if let Some(declared) = declared {
            deep_merge(&mut merged, declared);
        }
        if let Some(patch) = state.overrides.get(client_id) {
            deep_merge(&mut merged, patch);
        }
        if let Some(patch) = state.adaptive.get(client_id) {
            deep_merge(&mut merged, patch);
        }

        let result = capability_schema().validate(&merged, ValidationMode::Full);
        for error in &result.errors {
            warn!(client = %client_id, error = %error, "Dropping invalid config field");
        }

        ClientConfig {
            client_id: client_id.to_string(),
            values: result.config,
            dropped: result.errors,
            warnings: result.warnings,
        }
    }

    /// Merge a patch into a client's override layer
    ///
    /// # Errors
    ///
    /// Returns `ClientFitError::Validation` if any field of the patch is
    /// invalid, or if the patch tries to change the client id. Nothing is
    /// written in that case.
    pub fn set_override(&self, client_id: &str, patch: Map<String, Value>) -> Result<()> {
        let checked = validate_patch(client_id, &patch)?;
        let mut state = self.write_state();
        let layer = state.overrides.entry(client_id.to_string()).or_default();
        deep_merge(layer, &checked);
        info!(client = %client_id, fields = checked.len(), "Override applied");
        Ok(())
    }

    /// Apply a named template as an override
    ///
    /// # Errors
    ///
    /// Returns `ClientFitError::UnknownTemplate` for an unknown name
    pub fn apply_template(&self, client_id: &str, template: &str) -> Result<()> {
        let template: ConfigTemplate = template.parse()?;
        debug!(client = %client_id, template = %template, "Applying template");
        self.set_override(client_id, template.patch())
    }

    /// Remove a client's override layer
    pub fn clear_override(&self, client_id: &str) {
        self.write_state().overrides.remove(client_id);
    }

    /// Current override layer for a client
    pub fn override_for(&self, client_id: &str) -> Option<Map<String, Value>> {
        self.read_state().overrides.get(client_id).cloned()
    }

    /// Register a custom client with a complete base record
    ///
    /// # Returns
    ///
    /// Returns the registered client id
    ///
    /// # Errors
    ///
    /// Returns `ClientFitError::Validation` if the record is incomplete or
    /// any field is invalid; nothing is registered in that case.
    pub fn register_client(&self, record: Map<String, Value>) -> Result<String> {
        let result = capability_schema().validate(&record, ValidationMode::Full);
        if !result.valid {
            return Err(ClientFitError::Validation {
                errors: result.errors,
            }
            .into());
        }
        let client_id = result
            .config
            .get("id")
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| ClientFitError::Validation {
                errors: vec!["id: required field is missing".to_string()],
            })?;

        self.write_state()
            .registered
            .insert(client_id.clone(), result.config);
        info!(client = %client_id, "Client registered");
        Ok(client_id)
    }

    /// Current adaptive layer for a client
    pub fn adaptive_settings(&self, client_id: &str) -> Option<Map<String, Value>> {
        self.read_state().adaptive.get(client_id).cloned()
    }

    /// Drop a client's adaptive layer
    pub fn reset_adaptive_settings(&self, client_id: &str) {
        if self.write_state().adaptive.remove(client_id).is_some() {
            info!(client = %client_id, "Adaptive settings reset");
        }
    }

    /// Adjust a client's adaptive layer from observed behavior
    ///
    /// Rules are independent and cumulative, each computed from the
    /// currently resolved configuration:
    ///
    /// - error rate above 0.1: tool budget x0.8 rounded down (at least 1), timeout x1.2 (at most 60s)
    /// - average response time above 5s: one fewer concurrent tool (at least 1)
    /// - average response size above 80% of the limit: concise output and a
    ///   limit of 1.2x the average size (at most 100000)
    ///
    /// The new layer replaces the old one in a single write.
    ///
    /// # Returns
    ///
    /// Returns the adaptive layer now in effect
    pub fn update_adaptive_settings(
        &self,
        client_id: &str,
        behavior: &BehaviorSummary,
    ) -> Map<String, Value> {
        self.adapt(client_id, None, behavior)
    }

    /// Adjust a client's adaptive layer from a live session's behavior
    ///
    /// Same rules as [`ConfigManager::update_adaptive_settings`], computed
    /// from the session's effective configuration so its declared
    /// capabilities are the starting point.
    pub fn update_adaptive_settings_for(
        &self,
        context: &ClientContext,
        behavior: &BehaviorSummary,
    ) -> Map<String, Value> {
        self.adapt(context.client_id(), Some(&context.declared), behavior)
    }

    fn adapt(
        &self,
        client_id: &str,
        declared: Option<&Map<String, Value>>,
        behavior: &BehaviorSummary,
    ) -> Map<String, Value> {
        let mut state = self.write_state();
        let current = self.resolve(&state, client_id, declared).capabilities();
        let mut changes = Map::new();

        if behavior.error_rate > ERROR_RATE_THRESHOLD {
            let tools = (f64::from(current.max_tools_per_call) * 0.8).floor().max(1.0);
            let timeout = (current.timeout_ms as f64 * 1.2)
                .round()
                .min(MAX_ADAPTIVE_TIMEOUT_MS);
            changes.insert("maxToolsPerCall".to_string(), json!(tools as u64));
            changes.insert("timeoutMs".to_string(), json!(timeout as u64));
        }

        if behavior.avg_response_time > SLOW_RESPONSE_MS {
            let concurrent = current.max_concurrent_tools.saturating_sub(1).max(1);
            changes.insert("maxConcurrentTools".to_string(), json!(concurrent));
        }

        if behavior.avg_response_size > RESPONSE_SIZE_PRESSURE * current.max_response_size as f64 {
            let size = (behavior.avg_response_size * 1.2)
                .round()
                .min(MAX_ADAPTIVE_RESPONSE_SIZE)
                .max(MIN_RESPONSE_SIZE);
            changes.insert("outputFormat".to_string(), json!("concise"));
            changes.insert("maxResponseSize".to_string(), json!(size as u64));
        }

        let mut layer = state.adaptive.get(client_id).cloned().unwrap_or_default();
        if changes.is_empty() {
            debug!(client = %client_id, "Behavior within bounds, adaptive layer unchanged");
            return layer;
        }

        deep_merge(&mut layer, &changes);
        state.adaptive.insert(client_id.to_string(), layer.clone());
        increment_counter!("adaptive_updates_total", "client" => client_id.to_string());
        let changes = Value::Object(changes);
        info!(
            client = %client_id,
            error_rate = behavior.error_rate,
            avg_response_time = behavior.avg_response_time,
            avg_response_size = behavior.avg_response_size,
            changes = %changes,
            "Adaptive settings updated"
        );
        layer
    }

    /// Snapshot a client's configuration layers
    pub fn export_config(&self, client_id: &str) -> ConfigExport {
        let state = self.read_state();
        let config = self.resolve(&state, client_id, None);
        ConfigExport {
            exported_at: Utc::now(),
            client_id: client_id.to_string(),
            config: config.values,
            overrides: state.overrides.get(client_id).cloned(),
            adaptive_settings: state.adaptive.get(client_id).cloned(),
        }
    }

    /// Restore a client's layers from an export
    ///
    /// Clients that are not in the profile table are re-registered from
    /// the exported configuration.
    ///
    /// # Errors
    ///
    /// Returns `ClientFitError::Validation` if any layer is invalid; no
    /// layer is written in that case.
    pub fn import_config(&self, export: ConfigExport) -> Result<()> {
        let client_id = export.client_id.as_str();
        let overrides = export
            .overrides
            .as_ref()
            .map(|patch| validate_patch(client_id, patch))
            .transpose()?;
        let adaptive = export
            .adaptive_settings
            .as_ref()
            .map(|patch| validate_patch(client_id, patch))
            .transpose()?;
        let registered = if self.profiles.get(client_id).is_none() {
            let result = capability_schema().validate(&export.config, ValidationMode::Full);
            if !result.valid {
                return Err(ClientFitError::Validation {
                    errors: result.errors,
                }
                .into());
            }
            Some(result.config)
        } else {
            None
        };

        let mut state = self.write_state();
        if let Some(record) = registered {
            state.registered.insert(client_id.to_string(), record);
        }
        match overrides {
            Some(layer) => state.overrides.insert(client_id.to_string(), layer),
            None => state.overrides.remove(client_id),
        };
        match adaptive {
            Some(layer) => state.adaptive.insert(client_id.to_string(), layer),
            None => state.adaptive.remove(client_id),
        };
        info!(client = %client_id, exported_at = %export.exported_at, "Configuration imported");
        Ok(())
    }

    /// Export a client's configuration to a JSON file
    ///
    /// # Errors
    ///
    /// Returns error if the file cannot be written
    pub fn export_config_to_file(&self, client_id: &str, path: &Path) -> Result<()> {
        self.export_config(client_id).write_to(path)
    }

    /// Import a configuration envelope from a JSON file
    ///
    /// # Returns
    ///
    /// Returns the imported client id
    ///
    /// # Errors
    ///
    /// Returns error if the file cannot be read or the envelope is invalid
    pub fn import_config_from_file(&self, path: &Path) -> Result<String> {
        let export = ConfigExport::read_from(path)?;
        let client_id = export.client_id.clone();
        self.import_config(export)?;
        Ok(client_id)
    }
}

fn validate_patch(client_id: &str, patch: &Map<String, Value>) -> Result<Map<String, Value>> {
    let mut result = capability_schema().validate(patch, ValidationMode::Patch);
    if let Some(id) = patch.get("id") {
        if id.as_str() != Some(client_id) {
            result
                .errors
                .push("id: client id cannot be changed by a patch".to_string());
        }
    }
    if !result.errors.is_empty() {
        return Err(ClientFitError::Validation {
            errors: result.errors,
        }
        .into());
    }
    Ok(result.config)
}
