mod common;

use clientfit::capability::{Capabilities, ToolComplexity};
use clientfit::tools::{is_compatible_with, ToolMetadata};
use common::{detect_by_name, ledger_registry};
use serde_json::json;

fn names(caps: &Capabilities) -> Vec<String> {
    ledger_registry()
        .filtered_tools(caps)
        .into_iter()
        .map(|t| t.definition.name)
        .collect()
}

#[test]
fn test_listing_respects_budget_and_gate() {
    let registry = ledger_registry();
    for client in ["claude-desktop", "cursor", "vscode", "zed", "generic", "mcp-inspector"] {
        let mut caps = detect_by_name(client).capabilities;
        for budget in 1..=8 {
            caps.max_tools_per_call = budget;
            let listed = registry.filtered_tools(&caps);
            assert!(listed.len() <= budget as usize);
            for tool in &listed {
                let registered = registry.get(&tool.definition.name).unwrap();
                assert!(is_compatible_with(&registered.metadata, &caps));
                assert!(tool.score > 0.3);
            }
        }
    }
}

#[test]
fn test_image_tool_excluded_without_image_support() {
    let mut caps = Capabilities {
        tool_complexity: ToolComplexity::High,
        supports_images: false,
        ..Capabilities::default()
    };
    assert!(!names(&caps).contains(&"render_chart".to_string()));
    caps.supports_images = true;
    assert!(names(&caps).contains(&"render_chart".to_string()));
}

#[test]
fn test_raising_complexity_never_shrinks_listing() {
    let feature_sets = [
        (false, false, false),
        (true, false, false),
        (false, true, true),
        (true, true, true),
    ];
    for (binary, images, streaming) in feature_sets {
        let mut previous: Option<Vec<String>> = None;
        for tier in [ToolComplexity::Low, ToolComplexity::Medium, ToolComplexity::High] {
            let caps = Capabilities {
                tool_complexity: tier,
                supports_binary_content: binary,
                supports_images: images,
                supports_streaming: streaming,
                max_tools_per_call: 50,
                ..Capabilities::default()
            };
            let listed = names(&caps);
            if let Some(previous) = &previous {
                for name in previous {
                    assert!(listed.contains(name), "{} dropped at {:?}", name, tier);
                }
            }
            previous = Some(listed);
        }
    }
}

#[test]
fn test_low_client_sees_only_low_tools() {
    let caps = Capabilities {
        tool_complexity: ToolComplexity::Low,
        ..Capabilities::default()
    };
    assert_eq!(names(&caps), vec!["list_accounts".to_string()]);
}

#[tokio::test]
async fn test_usage_breaks_ties() {
    let registry = ledger_registry();
    let caps = Capabilities {
        tool_complexity: ToolComplexity::High,
        supports_binary_content: true,
        supports_images: true,
        supports_streaming: true,
        max_tools_per_call: 50,
        ..Capabilities::default()
    };
    let context = {
        let mut context = detect_by_name("claude-code");
        context.capabilities = caps.clone();
        context
    };

    let before = registry.filtered_tools(&caps);
    let last = before.last().unwrap().definition.name.clone();
    registry.execute_tool(&last, json!({}), &context).await.unwrap();

    let after = registry.filtered_tools(&caps);
    assert_eq!(after.first().unwrap().definition.name, last);
}

#[tokio::test]
async fn test_not_found_and_incompatible_are_distinct() {
    use clientfit::ClientFitError;

    let registry = ledger_registry();
    let context = detect_by_name("zed");

    let missing = registry
        .execute_tool("nope", json!({}), &context)
        .await
        .unwrap_err();
    assert!(matches!(
        missing.downcast_ref::<ClientFitError>(),
        Some(ClientFitError::ToolNotFound(_))
    ));

    let hidden = registry
        .execute_tool("bulk_reconcile", json!({}), &context)
        .await
        .unwrap_err();
    assert!(matches!(
        hidden.downcast_ref::<ClientFitError>(),
        Some(ClientFitError::ToolIncompatible { .. })
    ));
    // the rejected call never reached the handler
    assert_eq!(registry.usage("bulk_reconcile").unwrap().calls, 0);
}

#[test]
fn test_score_in_unit_interval_for_profiles() {
    let tools = [
        ToolMetadata::new("a", ToolComplexity::High)
            .requires_images()
            .requires_streaming()
            .requires_binary_content()
            .with_rate_limit(10_000),
        ToolMetadata::new("b", ToolComplexity::Low).with_rate_limit(1),
    ];
    for client in ["claude-desktop", "cline", "generic", "mcp-inspector"] {
        let caps = detect_by_name(client).capabilities;
        for tool in &tools {
            let score = clientfit::tools::compatibility_score(tool, &caps);
            assert!((0.0..=1.0).contains(&score));
        }
    }
}
