//! Export/import envelope for client configuration
//!
//! The envelope is plain JSON so it can be stored anywhere; nothing is
//! persisted unless a caller asks for it.

use crate::error::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::path::Path;

/// Serialized snapshot of one client's configuration layers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigExport {
    /// When the snapshot was taken
    pub exported_at: DateTime<Utc>,
    /// Client the snapshot belongs to
    pub client_id: String,
    /// Resolved configuration at export time
    pub config: Map<String, Value>,
    /// Override layer, if any
    #[serde(default)]
    pub overrides: Option<Map<String, Value>>,
    /// Adaptive layer, if any
    #[serde(default)]
    pub adaptive_settings: Option<Map<String, Value>>,
}

impl ConfigExport {
    /// Write the envelope as pretty JSON
    ///
    /// # Errors
    ///
    /// Returns error if serialization or the write fails
    pub fn write_to(&self, path: &Path) -> Result<()> {
        let contents = serde_json::to_string_pretty(self)?;
        std::fs::write(path, contents)?;
        Ok(())
    }

    /// Read an envelope written by [`ConfigExport::write_to`]
    ///
    /// # Errors
    ///
    /// Returns error if the file cannot be read or parsed
    pub fn read_from(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&contents)?)
    }
}
