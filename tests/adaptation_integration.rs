mod common;

use clientfit::adapt::{
    adapt_parameters, apply_size_limit, format_error, format_response, TRUNCATION_NOTICE,
};
use clientfit::capability::{Capabilities, ErrorVerbosity, EscapeHandling, OutputFormat};
use clientfit::ClientFitError;
use common::{definition, detect_by_name};
use serde_json::json;

#[test]
fn test_size_limit_identity_and_bound() {
    let samples = [
        String::new(),
        "short".to_string(),
        "line\n".repeat(400),
        "ü".repeat(3_000),
        "{\"k\": \"v\"}\n".repeat(1_000),
    ];
    for text in &samples {
        for max in [1_000usize, 1_500, 2_000, 4_096, 10_000] {
            let (out, truncated) = apply_size_limit(text, max);
            if text.len() <= max {
                assert_eq!(&out, text);
                assert!(!truncated);
            } else {
                assert!(truncated);
                assert!(out.ends_with(TRUNCATION_NOTICE));
                assert!(out.len() <= max);
            }
        }
    }
}

#[test]
fn test_profile_pipelines_stay_within_limits() {
    let rows: Vec<_> = (0..2_000)
        .map(|i| json!({"id": i, "memo": "café \"rent\" *due*", "note": null}))
        .collect();
    let data = json!(rows);
    for client in ["claude-desktop", "claude-code", "cursor", "vscode", "zed", "generic"] {
        let caps = detect_by_name(client).capabilities;
        let response = format_response(&data, &caps);
        assert!(response.text.len() <= caps.max_response_size, "{}", client);
        if response.truncated {
            assert!(response.text.ends_with(TRUNCATION_NOTICE));
        }
    }
}

#[test]
fn test_compact_modes_cap_lists() {
    let caps = Capabilities {
        output_format: OutputFormat::Concise,
        escape_handling: EscapeHandling::None,
        ..Capabilities::default()
    };
    let data = json!((0..100).collect::<Vec<_>>());
    let response = format_response(&data, &caps);
    let parsed: Vec<serde_json::Value> = serde_json::from_str(&response.text).unwrap();
    assert_eq!(parsed.len(), caps.ui.max_list_items as usize + 1);
    assert_eq!(parsed.last().unwrap(), &json!("... 75 more items"));
}

#[test]
fn test_markdown_client_output_is_escaped() {
    let caps = detect_by_name("vscode").capabilities;
    assert_eq!(caps.escape_handling, EscapeHandling::Markdown);
    let response = format_response(&json!("*total* | #1"), &caps);
    assert_eq!(response.text, "\\*total\\* \\| \\#1");
}

#[test]
fn test_parameters_adapted_per_client_tier() {
    let tool = definition("search_transactions");
    let params = json!({"query": "rent", "limit": 400, "offset": 20, "include_splits": true});

    let high = adapt_parameters(&tool, params.clone(), &detect_by_name("cursor").capabilities);
    assert_eq!(high["limit"], json!(100));
    assert_eq!(high["include_splits"], json!(true));

    let medium = adapt_parameters(&tool, params.clone(), &detect_by_name("zed").capabilities);
    assert_eq!(medium["limit"], json!(25));

    let low_caps = Capabilities {
        tool_complexity: clientfit::capability::ToolComplexity::Low,
        ..Capabilities::default()
    };
    let low = adapt_parameters(&tool, params, &low_caps);
    assert_eq!(low, json!({"limit": 10, "offset": 20}));
}

#[test]
fn test_error_tiers_hide_chain_below_developer() {
    let err = anyhow::Error::new(ClientFitError::ToolTimeout {
        tool: "bulk_reconcile".to_string(),
        timeout_ms: 30_000,
    })
    .context("bulk_reconcile failed");

    let minimal = format_error(&err, ErrorVerbosity::Minimal);
    assert!(!minimal.contains("30000ms"));

    let detailed = format_error(&err, ErrorVerbosity::Detailed);
    assert!(detailed.contains("timed out after 30000ms"));
    assert!(!detailed.contains("Caused by"));

    let developer = format_error(&err, ErrorVerbosity::Developer);
    assert!(developer.contains("Caused by"));
}
