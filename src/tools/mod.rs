//! Tool registry for ClientFit
//!
//! This module contains tool definitions, compatibility metadata, the
//! handler trait implemented by external tool code, and the registry that
//! filters, ranks and executes tools for a connected client.

pub mod scoring;

use crate::capability::{Capabilities, ToolComplexity};
use crate::client::ClientContext;
use crate::error::{ClientFitError, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use metrics::{histogram, increment_counter};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};
use tracing::{debug, warn};

pub use scoring::{compatibility_score, incompatibility_reason, is_compatible_with};

/// Tool definition as advertised to clients
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolDefinition {
    /// Name of the tool
    pub name: String,
    /// Description of what the tool does
    pub description: String,
    /// JSON schema for the tool's parameters
    pub input_schema: Value,
}

impl ToolDefinition {
    /// Create a new tool definition
    ///
    /// # Arguments
    ///
    /// * `name` - Tool name
    /// * `description` - Tool description
    /// * `input_schema` - JSON schema for parameters
    pub fn new(name: impl Into<String>, description: impl Into<String>, input_schema: Value) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            input_schema,
        }
    }

    /// Parameter names the input schema marks as required
    pub fn required_params(&self) -> Vec<&str> {
        self.input_schema
            .get("required")
            .and_then(Value::as_array)
            .map(|names| names.iter().filter_map(Value::as_str).collect())
            .unwrap_or_default()
    }
}

/// Compatibility metadata attached to a tool at registration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolMetadata {
    /// Functional category, e.g. "accounts" or "reports"
    pub category: String,
    /// Complexity tier
    pub complexity: ToolComplexity,
    /// Tool returns binary content
    pub requires_binary_content: bool,
    /// Tool returns images
    pub requires_images: bool,
    /// Tool streams its output
    pub requires_streaming: bool,
    /// Minimum requests per minute the tool needs from the client's budget
    pub rate_limit: Option<u32>,
    /// Free-form tags
    pub tags: Vec<String>,
}

impl ToolMetadata {
    /// Metadata with no feature requirements
    pub fn new(category: impl Into<String>, complexity: ToolComplexity) -> Self {
        Self {
            category: category.into(),
            complexity,
            requires_binary_content: false,
            requires_images: false,
            requires_streaming: false,
            rate_limit: None,
            tags: Vec::new(),
        }
    }

    /// Require binary content support
    pub fn requires_binary_content(mut self) -> Self {
        self.requires_binary_content = true;
        self
    }

    /// Require image support
    pub fn requires_images(mut self) -> Self {
        self.requires_images = true;
        self
    }

    /// Require streaming support
    pub fn requires_streaming(mut self) -> Self {
        self.requires_streaming = true;
        self
    }

    /// Require a minimum request budget per minute
    pub fn with_rate_limit(mut self, requests_per_minute: u32) -> Self {
        self.rate_limit = Some(requests_per_minute);
        self
    }

    /// Attach tags
    pub fn with_tags(mut self, tags: &[&str]) -> Self {
        self.tags = tags.iter().map(|t| t.to_string()).collect();
        self
    }
}

/// Per-tool usage counters
///
/// The average duration is always `total_duration_ms / calls`, where
/// `calls` counts every attempt, successful or not.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageStats {
    /// Attempts
    pub calls: u64,
    /// Successful attempts
    pub successes: u64,
    /// Failed attempts, including timeouts
    pub errors: u64,
    /// Summed duration of all attempts in milliseconds
    pub total_duration_ms: f64,
    /// Average duration per attempt in milliseconds
    pub avg_duration_ms: f64,
    /// When the tool was last invoked
    pub last_used: Option<DateTime<Utc>>,
}

impl UsageStats {
    fn record(&mut self, duration: Duration, success: bool) {
        self.calls += 1;
        if success {
            self.successes += 1;
        } else {
            self.errors += 1;
        }
        self.total_duration_ms += duration.as_secs_f64() * 1_000.0;
        self.avg_duration_ms = self.total_duration_ms / self.calls as f64;
        self.last_used = Some(Utc::now());
    }
}

/// Handler implemented by external tool code
///
/// Handlers receive adapted parameters and return plain data; formatting
/// is applied by the caller.
///
/// # Examples
///
/// ```no_run
/// use clientfit::tools::ToolHandler;
/// use clientfit::error::Result;
/// use async_trait::async_trait;
/// use serde_json::Value;
///
/// struct ListAccounts;
///
/// #[async_trait]
/// impl ToolHandler for ListAccounts {
///     async fn call(&self, _params: Value) -> Result<Value> {
///         Ok(serde_json::json!([{"id": "acc-1", "name": "Checking"}]))
///     }
/// }
/// ```
#[async_trait]
pub trait ToolHandler: Send + Sync {
    /// Execute the tool with already-adapted parameters
    ///
    /// # Errors
    ///
    /// Returns error if execution fails; the error reaches the caller unchanged
    async fn call(&self, params: Value) -> Result<Value>;
}

/// [`ToolHandler`] backed by an async closure
pub struct FnHandler<F> {
    f: F,
}

/// Wrap an async closure as a [`ToolHandler`]
///
/// # Examples
///
/// ```
/// use clientfit::tools::handler_fn;
///
/// let handler = handler_fn(|params| async move { Ok::<_, anyhow::Error>(params) });
/// ```
pub fn handler_fn<F, Fut>(f: F) -> Arc<FnHandler<F>>
where
    F: Fn(Value) -> Fut + Send + Sync,
    Fut: Future<Output = Result<Value>> + Send,
{
    Arc::new(FnHandler { f })
}

#[async_trait]
impl<F, Fut> ToolHandler for FnHandler<F>
where
    F: Fn(Value) -> Fut + Send + Sync,
    Fut: Future<Output = Result<Value>> + Send,
{
    async fn call(&self, params: Value) -> Result<Value> {
        (self.f)(params).await
    }
}

/// A registered tool with its handler and usage counters
pub struct RegisteredTool {
    /// Advertised definition
    pub definition: ToolDefinition,
    /// Compatibility metadata
    pub metadata: ToolMetadata,
    handler: Arc<dyn ToolHandler>,
    usage: Mutex<UsageStats>,
}

impl RegisteredTool {
    /// Snapshot of the usage counters
    pub fn usage(&self) -> UsageStats {
        self.usage
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn record(&self, duration: Duration, success: bool) {
        self.usage
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .record(duration, success);
    }
}

/// A tool selected for a client, with its ranking inputs
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RankedTool {
    /// Advertised definition
    pub definition: ToolDefinition,
    /// Compatibility score in `[0, 1]`
    pub score: f64,
    /// Recorded attempts at ranking time
    pub calls: u64,
}

/// Tool registry for managing available tools
///
/// Tools are registered at startup; usage counters are updated in place
/// behind a per-tool lock.
pub struct ToolRegistry {
    tools: HashMap<String, Arc<RegisteredTool>>,
}

impl ToolRegistry {
    /// Create a new empty tool registry
    pub fn new() -> Self {
        Self {
            tools: HashMap::new(),
        }
    }

    /// Register a tool
    ///
    /// Registering a name twice replaces the earlier tool and its counters.
    ///
    /// # Arguments
    ///
    /// * `definition` - Advertised definition; its name is the registry key
    /// * `metadata` - Compatibility metadata
    /// * `handler` - External implementation
    pub fn register(
        &mut self,
        definition: ToolDefinition,
        metadata: ToolMetadata,
        handler: Arc<dyn ToolHandler>,
    ) {
        let name = definition.name.clone();
        debug!(tool = %name, complexity = %metadata.complexity, "Registering tool");
        self.tools.insert(
            name,
            Arc::new(RegisteredTool {
                definition,
                metadata,
                handler,
                usage: Mutex::new(UsageStats::default()),
            }),
        );
    }

    /// Get a registered tool by name
    pub fn get(&self, name: &str) -> Option<Arc<RegisteredTool>> {
        self.tools.get(name).cloned()
    }

    /// Names of every registered tool, sorted
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.tools.keys().cloned().collect();
        names.sort();
        names
    }

    /// Usage counters for a tool
    pub fn usage(&self, name: &str) -> Option<UsageStats> {
        self.tools.get(name).map(|tool| tool.usage())
    }

    /// Get the number of registered tools
    pub fn len(&self) -> usize {
        self.tools.len()
    }

    /// Check if the registry is empty
    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Tools exposed to a client, best first
    ///
    /// Incompatible tools and tools scoring at or below
    /// [`scoring::MIN_LISTING_SCORE`] are discarded. The rest are ordered by
    /// `score + calls * 0.001` (ties by name) and truncated to the
    /// client's `maxToolsPerCall`.
    pub fn filtered_tools(&self, caps: &Capabilities) -> Vec<RankedTool> {
        let mut ranked: Vec<RankedTool> = self
            .tools
            .values()
            .filter(|tool| is_compatible_with(&tool.metadata, caps))
            .filter_map(|tool| {
                let score = compatibility_score(&tool.metadata, caps);
                (score > scoring::MIN_LISTING_SCORE).then(|| RankedTool {
                    definition: tool.definition.clone(),
                    score,
                    calls: tool.usage().calls,
                })
            })
            .collect();

        let rank = |t: &RankedTool| t.score + t.calls as f64 * scoring::USAGE_TIEBREAK_WEIGHT;
        ranked.sort_by(|a, b| {
            rank(b)
                .total_cmp(&rank(a))
                .then_with(|| a.definition.name.cmp(&b.definition.name))
        });
        ranked.truncate(caps.max_tools_per_call as usize);
        ranked
    }

    /// Execute a tool on behalf of a client
    ///
    /// The call is bounded by the client's `timeoutMs`. Usage counters are
    /// updated for every attempt that reaches the handler.
    ///
    /// # Errors
    ///
    /// - `ClientFitError::ToolNotFound` if no tool has this name
    /// - `ClientFitError::ToolIncompatible` if the client fails the gate
    /// - `ClientFitError::ToolTimeout` if the handler overruns
    /// - the handler's own error, unchanged
    pub async fn execute_tool(
        &self,
        name: &str,
        params: Value,
        context: &ClientContext,
    ) -> Result<Value> {
        let tool = self
            .get(name)
            .ok_or_else(|| ClientFitError::ToolNotFound(name.to_string()))?;

        if let Some(reason) = incompatibility_reason(&tool.metadata, &context.capabilities) {
            return Err(ClientFitError::ToolIncompatible {
                tool: name.to_string(),
                client: context.client_id().to_string(),
                reason,
            }
            .into());
        }

        let timeout_ms = context.capabilities.timeout_ms;
        let start = Instant::now();
        let outcome =
            match tokio::time::timeout(Duration::from_millis(timeout_ms), tool.handler.call(params))
                .await
            {
                Ok(result) => result,
                Err(_) => Err(ClientFitError::ToolTimeout {
                    tool: name.to_string(),
                    timeout_ms,
                }
                .into()),
            };
        let elapsed = start.elapsed();
        tool.record(elapsed, outcome.is_ok());

        let status = if outcome.is_ok() { "success" } else { "error" };
        increment_counter!("tool_calls_total", "tool" => name.to_string(), "status" => status);
        histogram!("tool_duration_seconds", elapsed.as_secs_f64(), "tool" => name.to_string());

        if let Err(e) = &outcome {
            warn!(tool = %name, error = %e, elapsed_ms = elapsed.as_millis() as u64, "Tool execution failed");
        } else {
            debug!(tool = %name, elapsed_ms = elapsed.as_millis() as u64, "Tool executed");
        }
        outcome
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}
