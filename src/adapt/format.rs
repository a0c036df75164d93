//! Output modes and error rendering

use super::escape::escape_text;
use super::limit::apply_size_limit;
use crate::capability::{Capabilities, ErrorVerbosity, OutputFormat, UiPreferences};
use crate::error::ClientFitError;
use serde::Serialize;
use serde_json::{json, Map, Value};

/// Depth below which minimal mode summarizes nested values
const MINIMAL_DEPTH: usize = 2;

/// Text ready to hand to the client
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FormattedResponse {
    /// Final text
    pub text: String,
    /// Whether the size limit cut the text
    pub truncated: bool,
    /// Length in bytes before the size limit was applied
    pub original_size: usize,
}

/// Run the response pipeline: output mode, escape strategy, size limit
///
/// # Examples
///
/// ```
/// use clientfit::adapt::format_response;
/// use clientfit::capability::{Capabilities, EscapeHandling, OutputFormat};
/// use serde_json::json;
///
/// let caps = Capabilities {
///     output_format: OutputFormat::Concise,
///     escape_handling: EscapeHandling::None,
///     ..Default::default()
/// };
/// let response = format_response(&json!({"id": 1, "memo": null}), &caps);
/// assert_eq!(response.text, r#"{"id":1}"#);
/// assert!(!response.truncated);
/// ```
pub fn format_response(data: &Value, caps: &Capabilities) -> FormattedResponse {
    let rendered = render(data, caps.output_format, &caps.ui);
    let escaped = escape_text(&rendered, caps.escape_handling);
    let original_size = escaped.len();
    let (text, truncated) = apply_size_limit(&escaped, caps.max_response_size);
    FormattedResponse {
        text,
        truncated,
        original_size,
    }
}

/// Apply an output mode's transform, producing unescaped text
pub fn render(data: &Value, format: OutputFormat, ui: &UiPreferences) -> String {
    let max_items = ui.max_list_items as usize;
    match format {
        OutputFormat::Minimal => match data {
            Value::String(s) => s.trim().to_string(),
            other => compact(&minimize(other, max_items, 0)),
        },
        OutputFormat::Concise => match data {
            Value::String(s) => s.clone(),
            other => compact(&prune(other, max_items)),
        },
        OutputFormat::Structured => {
            if ui.show_metadata {
                pretty(&json!({ "data": data, "meta": describe(data) }))
            } else {
                match data {
                    Value::String(s) => s.clone(),
                    other => pretty(other),
                }
            }
        }
        OutputFormat::Developer => {
            let body = pretty(&json!({ "data": data, "meta": describe(data) }));
            if ui.code_blocks {
                format!("```json\n{}\n```", body)
            } else {
                body
            }
        }
    }
}

fn compact(value: &Value) -> String {
    serde_json::to_string(value).unwrap_or_else(|_| value.to_string())
}

fn pretty(value: &Value) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
}

/// Drop nulls and cap list lengths
fn prune(value: &Value, max_items: usize) -> Value {
    match value {
        Value::Object(map) => Value::Object(
            map.iter()
                .filter(|(_, v)| !v.is_null())
                .map(|(k, v)| (k.clone(), prune(v, max_items)))
                .collect(),
        ),
        Value::Array(items) => cap_list(items, max_items, |v| prune(v, max_items)),
        other => other.clone(),
    }
}

/// [`prune`], plus empty values removed, strings trimmed and deep nesting
/// summarized
fn minimize(value: &Value, max_items: usize, depth: usize) -> Value {
    if depth >= MINIMAL_DEPTH {
        return match value {
            Value::Object(map) => Value::String(format!("{{{} fields}}", map.len())),
            Value::Array(items) => Value::String(format!("[{} items]", items.len())),
            Value::String(s) => Value::String(s.trim().to_string()),
            other => other.clone(),
        };
    }
    match value {
        Value::Object(map) => Value::Object(
            map.iter()
                .filter(|(_, v)| !is_empty(v))
                .map(|(k, v)| (k.clone(), minimize(v, max_items, depth + 1)))
                .collect::<Map<_, _>>(),
        ),
        Value::Array(items) => {
            cap_list(items, max_items, |v| minimize(v, max_items, depth + 1))
        }
        Value::String(s) => Value::String(s.trim().to_string()),
        other => other.clone(),
    }
}

fn is_empty(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.trim().is_empty(),
        Value::Array(items) => items.is_empty(),
        Value::Object(map) => map.is_empty(),
        _ => false,
    }
}

fn cap_list(items: &[Value], max_items: usize, map: impl Fn(&Value) -> Value) -> Value {
    let mut kept: Vec<Value> = items.iter().take(max_items).map(map).collect();
    if items.len() > max_items {
        kept.push(Value::String(format!(
            "... {} more items",
            items.len() - max_items
        )));
    }
    Value::Array(kept)
}

fn describe(data: &Value) -> Value {
    let kind = match data {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    };
    let mut meta = Map::new();
    meta.insert("type".to_string(), json!(kind));
    meta.insert("size".to_string(), json!(compact(data).len()));
    match data {
        Value::Array(items) => {
            meta.insert("items".to_string(), json!(items.len()));
        }
        Value::Object(map) => {
            meta.insert("fields".to_string(), json!(map.len()));
        }
        _ => {}
    }
    Value::Object(meta)
}

/// Stable identifier for an error's kind
pub fn error_kind(err: &anyhow::Error) -> &'static str {
    match err.downcast_ref::<ClientFitError>() {
        Some(ClientFitError::Config(_)) => "config",
        Some(ClientFitError::Validation { .. }) => "validation",
        Some(ClientFitError::ToolNotFound(_)) => "tool_not_found",
        Some(ClientFitError::ToolIncompatible { .. }) => "tool_incompatible",
        Some(ClientFitError::ToolTimeout { .. }) => "tool_timeout",
        Some(ClientFitError::ToolExecution(_)) => "tool_execution",
        Some(ClientFitError::ResourceNotFound(_)) => "resource_not_found",
        Some(ClientFitError::ResourceIncompatible { .. }) => "resource_incompatible",
        Some(ClientFitError::UnknownTemplate(_)) => "unknown_template",
        Some(_) | None => "internal",
    }
}

/// Render an error at the client's verbosity tier
///
/// `minimal` shows only the outermost message, `detailed` adds the error
/// kind and cause chain, and `developer` adds the debug representation
/// (including a backtrace when one was captured).
pub fn format_error(err: &anyhow::Error, verbosity: ErrorVerbosity) -> String {
    match verbosity {
        ErrorVerbosity::Minimal => format!("Error: {}", err),
        ErrorVerbosity::Detailed => format!("Error [{}]: {:#}", error_kind(err), err),
        ErrorVerbosity::Developer => {
            format!("Error [{}]: {:#}\n\n{:?}", error_kind(err), err, err)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capability::EscapeHandling;
    use anyhow::Context;

    fn ui(max_list_items: u32, show_metadata: bool, code_blocks: bool) -> UiPreferences {
        UiPreferences {
            max_list_items,
            show_metadata,
            code_blocks,
        }
    }

    #[test]
    fn test_concise_drops_nulls_and_caps_lists() {
        let data = json!({"items": [1, 2, 3, 4], "cursor": null});
        let text = render(&data, OutputFormat::Concise, &ui(2, false, true));
        assert_eq!(text, r#"{"items":[1,2,"... 2 more items"]}"#);
    }

    #[test]
    fn test_minimal_summarizes_nesting() {
        let data = json!({
            "account": {"id": "a1", "owner": {"name": "Ada", "email": "ada@example.com"}},
            "memo": "  ",
            "tags": [],
            "note": "  paid  "
        });
        let text = render(&data, OutputFormat::Minimal, &ui(10, false, true));
        let parsed: Value = serde_json::from_str(&text).unwrap();
        assert_eq!(
            parsed,
            json!({"account": {"id": "a1", "owner": "{2 fields}"}, "note": "paid"})
        );
    }

    #[test]
    fn test_minimal_trims_plain_strings() {
        let text = render(&json!("  ok \n"), OutputFormat::Minimal, &ui(10, false, true));
        assert_eq!(text, "ok");
    }

    #[test]
    fn test_structured_is_pretty() {
        let data = json!({"id": 1});
        let text = render(&data, OutputFormat::Structured, &ui(10, false, true));
        assert_eq!(text, "{\n  \"id\": 1\n}");
    }

    #[test]
    fn test_structured_with_metadata() {
        let data = json!([1, 2]);
        let text = render(&data, OutputFormat::Structured, &ui(10, true, true));
        let parsed: Value = serde_json::from_str(&text).unwrap();
        assert_eq!(parsed["meta"]["type"], json!("array"));
        assert_eq!(parsed["meta"]["items"], json!(2));
        assert_eq!(parsed["data"], data);
    }

    #[test]
    fn test_developer_code_fence() {
        let data = json!({"id": 1});
        let fenced = render(&data, OutputFormat::Developer, &ui(10, false, true));
        assert!(fenced.starts_with("```json\n"));
        assert!(fenced.ends_with("\n```"));

        let bare = render(&data, OutputFormat::Developer, &ui(10, false, false));
        let parsed: Value = serde_json::from_str(&bare).unwrap();
        assert_eq!(parsed["meta"]["fields"], json!(1));
    }

    #[test]
    fn test_pipeline_truncates_after_escaping() {
        let caps = Capabilities {
            output_format: OutputFormat::Concise,
            escape_handling: EscapeHandling::Standard,
            max_response_size: 1_000,
            ..Capabilities::default()
        };
        let response = format_response(&json!("\"".repeat(800)), &caps);
        assert_eq!(response.original_size, 1_600);
        assert!(response.truncated);
        assert!(response.text.len() <= 1_000);
    }

    #[test]
    fn test_error_verbosity_tiers() {
        let err = anyhow::Error::new(ClientFitError::ToolExecution("ledger locked".into()))
            .context("get_balance failed");

        let minimal = format_error(&err, ErrorVerbosity::Minimal);
        assert_eq!(minimal, "Error: get_balance failed");

        let detailed = format_error(&err, ErrorVerbosity::Detailed);
        assert!(detailed.contains("ledger locked"));
        assert!(detailed.contains("[tool_execution]"));

        let developer = format_error(&err, ErrorVerbosity::Developer);
        assert!(developer.contains("Caused by"));
    }

    #[test]
    fn test_error_kind_for_foreign_errors() {
        let err: anyhow::Result<()> = Err(anyhow::anyhow!("boom")).context("outer");
        assert_eq!(error_kind(&err.unwrap_err()), "internal");
    }
}
