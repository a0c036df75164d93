//! Request parameter adaptation

use crate::capability::{Capabilities, ToolComplexity};
use crate::tools::ToolDefinition;
use serde_json::{Map, Value};
use tracing::debug;

/// Parameter names treated as result-count limits
pub const LIMIT_FIELDS: &[&str] = &[
    "limit",
    "max_results",
    "maxResults",
    "count",
    "page_size",
    "pageSize",
    "per_page",
    "perPage",
];

/// Parameters kept for low-complexity clients
pub const LOW_COMPLEXITY_ALLOWLIST: &[&str] = &["id", "name", "type", "limit", "offset"];

/// Ceiling applied when no complexity tier is known
pub const DEFAULT_LIMIT_CEILING: u64 = 50;

/// Largest limit a client of the given tier may request
pub fn limit_ceiling(complexity: Option<ToolComplexity>) -> u64 {
    match complexity {
        Some(ToolComplexity::Low) => 10,
        Some(ToolComplexity::Medium) => 25,
        Some(ToolComplexity::High) => 100,
        None => DEFAULT_LIMIT_CEILING,
    }
}

/// Adapt tool parameters to the client
///
/// Limit-like fields above the client's ceiling are clamped to it. For
/// low-complexity clients every parameter outside
/// [`LOW_COMPLEXITY_ALLOWLIST`] is dropped, except those the tool's input
/// schema lists as required. Non-object parameters pass through unchanged.
///
/// # Examples
///
/// ```
/// use clientfit::adapt::adapt_parameters;
/// use clientfit::capability::{Capabilities, ToolComplexity};
/// use clientfit::tools::ToolDefinition;
/// use serde_json::json;
///
/// let tool = ToolDefinition::new("list_transactions", "", json!({"type": "object"}));
/// let caps = Capabilities { tool_complexity: ToolComplexity::Medium, ..Default::default() };
/// let adapted = adapt_parameters(&tool, json!({"limit": 500}), &caps);
/// assert_eq!(adapted, json!({"limit": 25}));
/// ```
pub fn adapt_parameters(tool: &ToolDefinition, params: Value, caps: &Capabilities) -> Value {
    let Value::Object(params) = params else {
        return params;
    };

    let ceiling = limit_ceiling(Some(caps.tool_complexity));
    let required = tool.required_params();
    let low = caps.tool_complexity == ToolComplexity::Low;

    let adapted: Map<String, Value> = params
        .into_iter()
        .filter(|(key, _)| {
            let keep = !low
                || LOW_COMPLEXITY_ALLOWLIST.contains(&key.as_str())
                || required.contains(&key.as_str());
            if !keep {
                debug!(tool = %tool.name, param = %key, "Dropping parameter for low-complexity client");
            }
            keep
        })
        .map(|(key, value)| {
            if LIMIT_FIELDS.contains(&key.as_str()) {
                let clamped = clamp_limit(&value, ceiling);
                if clamped != value {
                    debug!(tool = %tool.name, param = %key, ceiling, "Clamped limit parameter");
                }
                (key, clamped)
            } else {
                (key, value)
            }
        })
        .collect();

    Value::Object(adapted)
}

fn clamp_limit(value: &Value, ceiling: u64) -> Value {
    match value.as_f64() {
        Some(n) if n > ceiling as f64 => Value::from(ceiling),
        _ => value.clone(),
    }
}
