//! Per-client tool behavior tracking and the adaptive feedback loop
//!
//! Every attempt a client makes against a tool is recorded here. When a
//! tool's error rate crosses the trigger after enough attempts, the
//! tracker asks the [`ConfigManager`] to adapt that client's configuration.
//! A periodic sweep classifies tools for observability only; it never
//! changes configuration.

use crate::client::ClientContext;
use crate::config::BehaviorConfig;
use crate::manager::{BehaviorSummary, ConfigManager};
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// Error rate above which adaptive settings are recomputed
pub const DEFAULT_ERROR_RATE_TRIGGER: f64 = 0.2;
/// Attempts required before the error rate is trusted
pub const DEFAULT_MIN_ATTEMPTS: u64 = 5;
/// Interval between classification sweeps
pub const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(60);

const HIGH_ERROR_RATE: f64 = 0.3;
const SLOW_AVG_DURATION_MS: f64 = 10_000.0;
const FREQUENT_CALLS: u64 = 10;

/// Accumulated behavior of one client against one tool
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolBehavior {
    /// Attempts that reached the tool handler
    pub calls: u64,
    pub successes: u64,
    pub errors: u64,
    /// Wall time summed over all attempts
    pub total_duration_ms: u64,
    /// Mean over all attempts
    pub avg_duration_ms: f64,
    /// Formatted bytes before truncation, successes only
    pub total_response_size: u64,
    /// Mean over successful attempts
    pub avg_response_size: f64,
    pub last_call: Option<DateTime<Utc>>,
    /// Errors over all attempts
    pub error_rate: f64,
}

impl ToolBehavior {
    fn record(&mut self, duration_ms: u64, response_size: Option<usize>) {
        self.calls += 1;
        self.total_duration_ms += duration_ms;
        match response_size {
            Some(size) => {
                self.successes += 1;
                self.total_response_size += size as u64;
                self.avg_response_size =
                    self.total_response_size as f64 / self.successes as f64;
            }
            None => self.errors += 1,
        }
        self.avg_duration_ms = self.total_duration_ms as f64 / self.calls as f64;
        self.error_rate = self.errors as f64 / self.calls as f64;
        self.last_call = Some(Utc::now());
    }

    fn summary(&self) -> BehaviorSummary {
        BehaviorSummary {
            error_rate: self.error_rate,
            avg_response_time: self.avg_duration_ms,
            avg_response_size: self.avg_response_size,
        }
    }
}

/// A tool as seen by one client
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolKey {
    pub client_id: String,
    pub tool: String,
}

impl ToolKey {
    /// Key for a client id and tool name
    pub fn new(client_id: &str, tool: &str) -> Self {
        Self {
            client_id: client_id.to_string(),
            tool: tool.to_string(),
        }
    }
}

/// Result of a classification sweep
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BehaviorReport {
    /// Error rate above 0.3
    pub high_error: Vec<ToolKey>,
    /// Average duration above 10 seconds
    pub slow: Vec<ToolKey>,
    /// More than 10 calls
    pub frequent: Vec<ToolKey>,
    /// Tracked but never called
    pub unused: Vec<ToolKey>,
}

impl BehaviorReport {
    /// True when no tool falls in any category
    pub fn is_empty(&self) -> bool {
        self.high_error.is_empty()
            && self.slow.is_empty()
            && self.frequent.is_empty()
            && self.unused.is_empty()
    }
}

/// Usage tracker feeding the configuration manager
#[derive(Debug)]
pub struct BehaviorTracker {
    manager: Arc<ConfigManager>,
    stats: Mutex<HashMap<ToolKey, ToolBehavior>>,
    error_rate_trigger: f64,
    min_attempts: u64,
    sweep_interval: Duration,
}

impl BehaviorTracker {
    /// Create a tracker with the default trigger policy
    pub fn new(manager: Arc<ConfigManager>) -> Self {
        Self {
            manager,
            stats: Mutex::new(HashMap::new()),
            error_rate_trigger: DEFAULT_ERROR_RATE_TRIGGER,
            min_attempts: DEFAULT_MIN_ATTEMPTS,
            sweep_interval: DEFAULT_SWEEP_INTERVAL,
        }
    }

    /// Create a tracker with the trigger policy and sweep interval from settings
    pub fn from_config(manager: Arc<ConfigManager>, config: &BehaviorConfig) -> Self {
        let mut tracker =
            Self::new(manager).with_trigger(config.error_rate_trigger, config.min_attempts);
        tracker.sweep_interval = Duration::from_secs(config.sweep_interval_secs.max(1));
        tracker
    }

    /// Interval used by [`BehaviorTracker::start_sweep`]
    pub fn sweep_interval(&self) -> Duration {
        self.sweep_interval
    }

    /// Override the adaptive trigger policy
    pub fn with_trigger(mut self, error_rate: f64, min_attempts: u64) -> Self {
        self.error_rate_trigger = error_rate;
        self.min_attempts = min_attempts.max(1);
        self
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<ToolKey, ToolBehavior>> {
        self.stats.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Start tracking a tool so it can be reported as unused
    pub fn track_tool(&self, client_id: &str, tool: &str) {
        self.lock().entry(ToolKey::new(client_id, tool)).or_default();
    }

    /// Record one attempt
    ///
    /// `response_size` is the formatted size of a successful response and
    /// `None` for a failed attempt.
    ///
    /// # Returns
    ///
    /// Returns the client's new adaptive layer when this attempt triggered
    /// an adaptive update
    pub fn record(
        &self,
        client_id: &str,
        tool: &str,
        duration_ms: u64,
        response_size: Option<usize>,
    ) -> Option<Map<String, Value>> {
        self.record_attempt(client_id, None, tool, duration_ms, response_size)
    }

    /// Record one attempt made by a live session
    ///
    /// Like [`BehaviorTracker::record`], but an adaptive update starts from
    /// the session's effective configuration, declared capabilities included.
    pub fn record_for(
        &self,
        context: &ClientContext,
        tool: &str,
        duration_ms: u64,
        response_size: Option<usize>,
    ) -> Option<Map<String, Value>> {
        self.record_attempt(context.client_id(), Some(context), tool, duration_ms, response_size)
    }

    fn record_attempt(
        &self,
        client_id: &str,
        context: Option<&ClientContext>,
        tool: &str,
        duration_ms: u64,
        response_size: Option<usize>,
    ) -> Option<Map<String, Value>> {
        let summary = {
            let mut stats = self.lock();
            let entry = stats.entry(ToolKey::new(client_id, tool)).or_default();
            entry.record(duration_ms, response_size);
            debug!(
                client = %client_id,
                tool = %tool,
                calls = entry.calls,
                error_rate = entry.error_rate,
                "Recorded tool attempt"
            );
            if entry.error_rate > self.error_rate_trigger && entry.calls >= self.min_attempts {
                Some(entry.summary())
            } else {
                None
            }
        };

        summary.map(|summary| {
            info!(
                client = %client_id,
                tool = %tool,
                error_rate = summary.error_rate,
                "Error rate over trigger, adapting client configuration"
            );
            match context {
                Some(context) => self.manager.update_adaptive_settings_for(context, &summary),
                None => self.manager.update_adaptive_settings(client_id, &summary),
            }
        })
    }

    /// Copy of one tool's stats
    pub fn stats(&self, client_id: &str, tool: &str) -> Option<ToolBehavior> {
        self.lock().get(&ToolKey::new(client_id, tool)).cloned()
    }

    /// Copy of every tracked entry
    pub fn snapshot(&self) -> HashMap<ToolKey, ToolBehavior> {
        self.lock().clone()
    }

    /// Classify tracked tools from a snapshot
    pub fn analyze(&self) -> BehaviorReport {
        let mut entries: Vec<(ToolKey, ToolBehavior)> = self.snapshot().into_iter().collect();
        entries.sort_by(|a, b| a.0.cmp(&b.0));

        let mut report = BehaviorReport::default();
        for (key, stats) in entries {
            if stats.calls == 0 {
                report.unused.push(key);
                continue;
            }
            if stats.error_rate > HIGH_ERROR_RATE {
                report.high_error.push(key.clone());
            }
            if stats.avg_duration_ms > SLOW_AVG_DURATION_MS {
                report.slow.push(key.clone());
            }
            if stats.calls > FREQUENT_CALLS {
                report.frequent.push(key);
            }
        }
        report
    }

    /// Run the sweep at the configured interval until cancelled
    pub fn start_sweep(self: Arc<Self>, cancellation: CancellationToken) -> JoinHandle<()> {
        let interval = self.sweep_interval;
        info!(interval_secs = interval.as_secs(), "Starting behavior sweep");
        self.spawn_sweep(interval, cancellation)
    }

    /// Run [`BehaviorTracker::analyze`] every `interval` until cancelled
    pub fn spawn_sweep(
        self: Arc<Self>,
        interval: Duration,
        cancellation: CancellationToken,
    ) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            // The first tick completes immediately
            ticker.tick().await;
            loop {
                tokio::select! {
                    biased;

                    _ = cancellation.cancelled() => {
                        debug!("Behavior sweep stopped");
                        break;
                    }

                    _ = ticker.tick() => {
                        let report = self.analyze();
                        if report.is_empty() {
                            debug!("Behavior sweep found nothing to report");
                            continue;
                        }
                        info!(
                            high_error = report.high_error.len(),
                            slow = report.slow.len(),
                            frequent = report.frequent.len(),
                            unused = report.unused.len(),
                            "Behavior sweep"
                        );
                        for key in &report.high_error {
                            info!(client = %key.client_id, tool = %key.tool, "High error rate");
                        }
                        for key in &report.slow {
                            info!(client = %key.client_id, tool = %key.tool, "Slow tool");
                        }
                    }
                }
            }
        })
    }
}
