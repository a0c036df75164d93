//! Single-client session
//!
//! A [`Session`] ties the subsystem together for one connected client: it
//! holds the detected [`ClientContext`] for the life of the connection and
//! runs every tool call through parameter adaptation, bounded execution,
//! response formatting and behavior tracking. When tracking triggers an
//! adaptive update the session refreshes its capabilities and its
//! concurrency limit before the next call.

use crate::adapt::{adapt_parameters, format_error, format_response};
use crate::behavior::BehaviorTracker;
use crate::capability::Capabilities;
use crate::client::ClientContext;
use crate::error::{ClientFitError, Result};
use crate::manager::{ClientConfig, ConfigManager};
use crate::resources::{ResourceContents, ResourceDescriptor, ResourceRegistry};
use crate::tools::{RankedTool, ToolRegistry};
use metrics::increment_counter;
use serde::Serialize;
use serde_json::Value;
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Instant;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tracing::{debug, info};

/// Result of a tool call as delivered to the client
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolResponse {
    pub text: String,
    pub is_error: bool,
}

/// Concurrency slots for one session
///
/// The semaphore lives as long as the session. A shrink that cannot take
/// permits back immediately because calls hold them records the shortfall
/// in `owed`; finishing calls then forget their permits until it is paid.
#[derive(Debug)]
struct Permits {
    limit: u32,
    owed: usize,
    semaphore: Arc<Semaphore>,
}

impl Permits {
    fn new(limit: u32) -> Self {
        let limit = limit.max(1);
        Self {
            limit,
            owed: 0,
            semaphore: Arc::new(Semaphore::new(limit as usize)),
        }
    }

    fn resize(&mut self, limit: u32) {
        let limit = limit.max(1);
        if limit < self.limit {
            let shrink = (self.limit - limit) as usize;
            let forgotten = self.semaphore.forget_permits(shrink);
            self.owed += shrink - forgotten;
        } else {
            let grow = (limit - self.limit) as usize;
            let repaid = grow.min(self.owed);
            self.owed -= repaid;
            self.semaphore.add_permits(grow - repaid);
        }
        self.limit = limit;
    }

    /// Give a finished call's permit back, or retire it while slots are owed
    fn release(&mut self, permit: OwnedSemaphorePermit) {
        if self.owed > 0 {
            self.owed -= 1;
            permit.forget();
        }
    }
}

/// Shared components a session runs against
#[derive(Clone)]
pub struct SessionParts {
    pub manager: Arc<ConfigManager>,
    pub tools: Arc<ToolRegistry>,
    pub tracker: Arc<BehaviorTracker>,
    pub resources: Arc<ResourceRegistry>,
}

/// One connected client
pub struct Session {
    context: RwLock<ClientContext>,
    permits: RwLock<Permits>,
    parts: SessionParts,
}

impl Session {
    /// Start a session for a detected client
    ///
    /// The context's capabilities are replaced by the fully resolved
    /// configuration, and every registered tool starts being tracked.
    pub fn new(mut context: ClientContext, parts: SessionParts) -> Self {
        let config = parts.manager.resolve_for(&context);
        context.capabilities = config.capabilities();
        for name in parts.tools.names() {
            parts.tracker.track_tool(context.client_id(), &name);
        }
        info!(
            client = %context.client_id(),
            session = %context.session_id,
            max_concurrent_tools = context.capabilities.max_concurrent_tools,
            "Session started"
        );
        Self {
            permits: RwLock::new(Permits::new(context.capabilities.max_concurrent_tools)),
            context: RwLock::new(context),
            parts,
        }
    }

    /// Copy of the current context
    pub fn context(&self) -> ClientContext {
        self.context
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Current effective capabilities
    pub fn capabilities(&self) -> Capabilities {
        self.context
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .capabilities
            .clone()
    }

    /// Resolved configuration including validation diagnostics
    pub fn config(&self) -> ClientConfig {
        self.parts.manager.resolve_for(&self.context())
    }

    /// Current concurrency limit
    pub fn concurrency_limit(&self) -> u32 {
        self.permits
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .limit
    }

    /// Tools exposed to this client, best first
    pub fn list_tools(&self) -> Vec<RankedTool> {
        self.parts.tools.filtered_tools(&self.capabilities())
    }

    /// Resources exposed to this client
    pub fn list_resources(&self) -> Vec<ResourceDescriptor> {
        self.parts.resources.list(&self.capabilities())
    }

    /// Read a resource formatted for this client
    ///
    /// # Errors
    ///
    /// Returns error if the uri is unknown or the content is unsuitable
    pub fn read_resource(&self, uri: &str) -> Result<ResourceContents> {
        self.parts.resources.read(uri, &self.capabilities())
    }

    /// Run one tool call through the full pipeline
    ///
    /// Failures never escape as `Err`; they come back as a response with
    /// `is_error` set, rendered at the client's error verbosity.
    pub async fn call_tool(&self, name: &str, args: Value) -> ToolResponse {
        let semaphore = Arc::clone(
            &self
                .permits
                .read()
                .unwrap_or_else(PoisonError::into_inner)
                .semaphore,
        );
        let context = self.context();
        let caps = context.capabilities.clone();

        let permit = match semaphore.acquire_owned().await {
            Ok(permit) => permit,
            Err(e) => {
                let err: anyhow::Error = ClientFitError::ToolExecution(e.to_string()).into();
                return error_response(&err, &caps);
            }
        };

        let params = match self.parts.tools.get(name) {
            Some(tool) => adapt_parameters(&tool.definition, args, &caps),
            None => args,
        };

        let start = Instant::now();
        let outcome = self.parts.tools.execute_tool(name, params, &context).await;
        let duration_ms = start.elapsed().as_millis() as u64;
        self.permits
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .release(permit);

        let (response, tracked_size) = match outcome {
            Ok(data) => {
                let formatted = format_response(&data, &caps);
                if formatted.truncated {
                    increment_counter!(
                        "responses_truncated_total",
                        "client" => context.client_id().to_string()
                    );
                    debug!(
                        tool = %name,
                        original_size = formatted.original_size,
                        limit = caps.max_response_size,
                        "Response truncated"
                    );
                }
                let response = ToolResponse {
                    text: formatted.text,
                    is_error: false,
                };
                (response, Some(Some(formatted.original_size)))
            }
            Err(e) => {
                let reached_handler = !matches!(
                    e.downcast_ref::<ClientFitError>(),
                    Some(ClientFitError::ToolNotFound(_))
                        | Some(ClientFitError::ToolIncompatible { .. })
                );
                (error_response(&e, &caps), reached_handler.then_some(None))
            }
        };

        if let Some(size) = tracked_size {
            let adapted = self
                .parts
                .tracker
                .record_for(&context, name, duration_ms, size);
            if adapted.is_some() {
                self.refresh();
            }
        }

        response
    }

    /// Re-resolve capabilities and resize the concurrency limit if needed
    pub fn refresh(&self) {
        let mut context = self.context.write().unwrap_or_else(PoisonError::into_inner);
        let config = self.parts.manager.resolve_for(&context);
        context.capabilities = config.capabilities();

        let limit = context.capabilities.max_concurrent_tools.max(1);
        let mut permits = self.permits.write().unwrap_or_else(PoisonError::into_inner);
        if permits.limit != limit {
            info!(
                client = %context.client_id(),
                from = permits.limit,
                to = limit,
                "Concurrency limit changed"
            );
            permits.resize(limit);
        }
    }
}

fn error_response(err: &anyhow::Error, caps: &Capabilities) -> ToolResponse {
    ToolResponse {
        text: format_error(err, caps.error_verbosity),
        is_error: true,
    }
}
