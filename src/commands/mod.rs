/*!
Command handlers for the CLI

This module provides command handlers invoked by the CLI entrypoint:

- `detect`    Resolve a client context from connection metadata
- `profiles`  Print the profile table in detection order
- `config`    Show, export and import per-client configuration
- `templates` List configuration templates

Every handler builds the same components a server would: the built-in
profile table and a config manager seeded from the settings.
*/

use crate::behavior::BehaviorTracker;
use crate::client::{ClientDetector, ProfileTable};
use crate::config::Settings;
use crate::error::Result;
use crate::manager::ConfigManager;
use std::sync::Arc;

pub mod config;
pub mod detect;
pub mod profiles;
pub mod templates;

/// Shared state for command handlers
pub struct CommandContext {
    pub settings: Settings,
    pub profiles: Arc<ProfileTable>,
    pub manager: Arc<ConfigManager>,
}

impl CommandContext {
    /// Build the profile table and a config manager seeded from settings
    ///
    /// # Errors
    ///
    /// Returns error if a built-in profile fails to build or a configured
    /// override or template is rejected
    pub fn new(settings: Settings) -> Result<Self> {
        let profiles = Arc::new(ProfileTable::builtin()?);
        let manager = Arc::new(ConfigManager::new(Arc::clone(&profiles)));
        settings.apply_client_settings(&manager)?;
        Ok(Self {
            settings,
            profiles,
            manager,
        })
    }

    /// Detector configured with the settings' signature policy
    pub fn detector(&self) -> ClientDetector {
        ClientDetector::new(Arc::clone(&self.profiles)).with_signature_policy(
            self.settings.detection.signature_threshold,
            self.settings.detection.min_signature_checks,
        )
    }

    /// Behavior tracker configured with the settings' trigger policy and sweep interval
    pub fn tracker(&self) -> Arc<BehaviorTracker> {
        Arc::new(BehaviorTracker::from_config(
            Arc::clone(&self.manager),
            &self.settings.behavior,
        ))
    }
}
