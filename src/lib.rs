//! ClientFit - client capability detection and adaptation
//!
//! This library sits between a single connected client session and the
//! tools and resources a server exposes. It detects which client is
//! connected, keeps a layered and validated capability configuration per
//! client, filters and ranks tools by compatibility, adapts request
//! parameters and response text to the client, and feeds observed
//! behavior back into the configuration.
//!
//! # Architecture
//!
//! The library is organized into the following modules:
//!
//! - `capability`: Capability types and the validation schema
//! - `client`: Client profiles and the detector
//! - `manager`: Layered configuration, templates and export/import
//! - `tools`: Tool registry, compatibility scoring and execution
//! - `adapt`: Parameter adaptation, output modes, escaping and size limits
//! - `behavior`: Usage tracking and the adaptive feedback loop
//! - `resources`: Resource registry
//! - `session`: Per-connection façade running the full call pipeline
//! - `config`: Application settings
//! - `logging`: Tracing subscriber setup
//! - `error`: Error types and result aliases
//! - `cli` / `commands`: Command-line interface and its handlers
//!
//! # Example
//!
//! ```no_run
//! use clientfit::client::{ClientDetector, ConnectionMetadata, ProfileTable};
//! use clientfit::manager::ConfigManager;
//! use clientfit::session::{Session, SessionParts};
//! use clientfit::{BehaviorTracker, ResourceRegistry, ToolRegistry};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let profiles = Arc::new(ProfileTable::builtin()?);
//!     let manager = Arc::new(ConfigManager::new(Arc::clone(&profiles)));
//!     let context = ClientDetector::new(profiles).detect(&ConnectionMetadata {
//!         client_name: Some("cursor".to_string()),
//!         ..Default::default()
//!     });
//!     let session = Session::new(
//!         context,
//!         SessionParts {
//!             tracker: Arc::new(BehaviorTracker::new(Arc::clone(&manager))),
//!             manager,
//!             tools: Arc::new(ToolRegistry::new()),
//!             resources: Arc::new(ResourceRegistry::new()),
//!         },
//!     );
//!     let response = session.call_tool("list_accounts", serde_json::json!({})).await;
//!     println!("{}", response.text);
//!     Ok(())
//! }
//! ```

pub mod adapt;
pub mod behavior;
pub mod capability;
pub mod cli;
pub mod client;
pub mod commands;
pub mod config;
pub mod error;
pub mod logging;
pub mod manager;
pub mod resources;
pub mod session;
pub mod tools;

// Re-export commonly used types
pub use behavior::BehaviorTracker;
pub use capability::Capabilities;
pub use client::{ClientContext, ClientDetector, ConnectionMetadata};
pub use config::Settings;
pub use error::{ClientFitError, Result};
pub use manager::{ClientConfig, ConfigManager};
pub use resources::ResourceRegistry;
pub use session::{Session, SessionParts, ToolResponse};
pub use tools::ToolRegistry;

#[cfg(test)]
pub mod test_utils;
