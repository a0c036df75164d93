mod common;

use clientfit::behavior::BehaviorTracker;
use clientfit::capability::ToolComplexity;
use clientfit::resources::{Resource, ResourceRegistry};
use clientfit::tools::{handler_fn, ToolMetadata, ToolRegistry};
use clientfit::{Session, SessionParts};
use common::{definition, detect_by_name, ledger_registry, manager, session};
use futures::future::join_all;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

fn gauge_registry(active: Arc<AtomicUsize>, peak: Arc<AtomicUsize>) -> ToolRegistry {
    let mut registry = ToolRegistry::new();
    registry.register(
        definition("slow_balance"),
        ToolMetadata::new("accounts", ToolComplexity::Low),
        handler_fn(move |_| {
            let active = Arc::clone(&active);
            let peak = Arc::clone(&peak);
            async move {
                let now = active.fetch_add(1, Ordering::SeqCst) + 1;
                peak.fetch_max(now, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(20)).await;
                active.fetch_sub(1, Ordering::SeqCst);
                Ok::<_, anyhow::Error>(json!({"balance": 100}))
            }
        }),
    );
    registry
}

#[tokio::test]
async fn test_concurrency_bounded_by_client_limit() {
    let active = Arc::new(AtomicUsize::new(0));
    let peak = Arc::new(AtomicUsize::new(0));
    // cline allows one concurrent tool
    let (session, _) = session("cline", gauge_registry(Arc::clone(&active), Arc::clone(&peak)));
    assert_eq!(session.concurrency_limit(), 1);

    let calls = (0..4).map(|_| session.call_tool("slow_balance", json!({})));
    let responses = join_all(calls).await;
    assert!(responses.iter().all(|r| !r.is_error));
    assert_eq!(peak.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_concurrent_calls_allowed_up_to_limit() {
    let active = Arc::new(AtomicUsize::new(0));
    let peak = Arc::new(AtomicUsize::new(0));
    let (session, _) = session("claude-code", gauge_registry(Arc::clone(&active), Arc::clone(&peak)));
    let limit = session.concurrency_limit() as usize;

    let calls = (0..limit * 2).map(|_| session.call_tool("slow_balance", json!({})));
    join_all(calls).await;
    assert!(peak.load(Ordering::SeqCst) <= limit);
}

#[tokio::test]
async fn test_timeout_reported_as_error() {
    let mut registry = ToolRegistry::new();
    registry.register(
        definition("hang"),
        ToolMetadata::new("ledger", ToolComplexity::Low),
        handler_fn(|_| async move {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok::<_, anyhow::Error>(Value::Null)
        }),
    );
    let (session, manager) = session("cursor", registry);
    manager
        .set_override("cursor", common::object(json!({"timeoutMs": 1000})))
        .unwrap();
    session.refresh();

    let response = session.call_tool("hang", json!({})).await;
    assert!(response.is_error);
    assert!(response.text.contains("timed out after 1000ms"));
}

#[tokio::test]
async fn test_incompatible_tool_is_error_but_not_tracked() {
    let manager = manager();
    let tracker = Arc::new(BehaviorTracker::new(Arc::clone(&manager)));
    let session = Session::new(
        detect_by_name("zed"),
        SessionParts {
            manager,
            tools: Arc::new(ledger_registry()),
            tracker: Arc::clone(&tracker),
            resources: Arc::new(ResourceRegistry::new()),
        },
    );

    let response = session.call_tool("bulk_reconcile", json!({})).await;
    assert!(response.is_error);
    // zed renders minimal errors: top message only
    assert!(response.text.starts_with("Error: Tool 'bulk_reconcile' is not compatible"));
    assert_eq!(tracker.stats("zed", "bulk_reconcile").unwrap().calls, 0);
}

#[tokio::test]
async fn test_listing_follows_adaptive_updates() {
    let mut registry = ledger_registry();
    registry.register(
        definition("flaky_sync"),
        ToolMetadata::new("ledger", ToolComplexity::Low),
        handler_fn(|_| async move { Err::<Value, _>(anyhow::anyhow!("upstream reset")) }),
    );
    let (session, manager) = session("cursor", registry);
    manager
        .set_override("cursor", common::object(json!({"maxToolsPerCall": 2})))
        .unwrap();
    session.refresh();
    assert_eq!(session.list_tools().len(), 2);

    for _ in 0..5 {
        session.call_tool("flaky_sync", json!({})).await;
    }
    // 2 * 0.8 rounds down to the floor of 1
    assert_eq!(session.capabilities().max_tools_per_call, 1);
    assert_eq!(session.list_tools().len(), 1);
    assert!(manager.adaptive_settings("cursor").is_some());
    assert!(session.capabilities().timeout_ms > 30_000);
}

#[tokio::test]
async fn test_resources_through_session() {
    let mut resources = ResourceRegistry::new();
    resources.register(Resource::text(
        "ledger://policy",
        "Policy",
        "text/markdown",
        "# Rules\nNo *overdrafts*",
    ));
    resources.register(Resource::binary(
        "ledger://scan",
        "Scan",
        "image/png",
        vec![1, 2, 3],
    ));
    let manager = manager();
    let session = Session::new(
        detect_by_name("vscode"),
        SessionParts {
            tracker: Arc::new(BehaviorTracker::new(Arc::clone(&manager))),
            manager,
            tools: Arc::new(ToolRegistry::new()),
            resources: Arc::new(resources),
        },
    );

    let listed: Vec<String> = session.list_resources().into_iter().map(|r| r.uri).collect();
    assert_eq!(listed, vec!["ledger://policy"]);

    let policy = session.read_resource("ledger://policy").unwrap();
    assert_eq!(policy.text.as_deref(), Some("\\# Rules\nNo \\*overdrafts\\*"));
    assert!(session.read_resource("ledger://scan").is_err());
}

#[tokio::test]
async fn test_large_response_truncated_with_notice() {
    let mut registry = ToolRegistry::new();
    registry.register(
        definition("dump_ledger"),
        ToolMetadata::new("ledger", ToolComplexity::Low),
        handler_fn(|_| async move { Ok::<_, anyhow::Error>(json!("x".repeat(200_000))) }),
    );
    let (session, _) = session("cursor", registry);
    let response = session.call_tool("dump_ledger", json!({})).await;
    assert!(!response.is_error);
    assert!(response.text.ends_with(clientfit::adapt::TRUNCATION_NOTICE));
    assert!(response.text.len() <= session.capabilities().max_response_size);
}

#[tokio::test]
async fn test_lowered_limit_holds_while_calls_in_flight() {
    let active = Arc::new(AtomicUsize::new(0));
    let late_peak = Arc::new(AtomicUsize::new(0));
    let mut registry = ToolRegistry::new();
    {
        let active = Arc::clone(&active);
        registry.register(
            definition("slow_sync"),
            ToolMetadata::new("ledger", ToolComplexity::Low),
            handler_fn(move |_| {
                let active = Arc::clone(&active);
                async move {
                    active.fetch_add(1, Ordering::SeqCst);
                    tokio::time::sleep(Duration::from_millis(200)).await;
                    active.fetch_sub(1, Ordering::SeqCst);
                    Ok::<_, anyhow::Error>(Value::Null)
                }
            }),
        );
    }
    {
        let active = Arc::clone(&active);
        let late_peak = Arc::clone(&late_peak);
        registry.register(
            definition("quick_check"),
            ToolMetadata::new("ledger", ToolComplexity::Low),
            handler_fn(move |_| {
                let active = Arc::clone(&active);
                let late_peak = Arc::clone(&late_peak);
                async move {
                    let now = active.fetch_add(1, Ordering::SeqCst) + 1;
                    late_peak.fetch_max(now, Ordering::SeqCst);
                    tokio::time::sleep(Duration::from_millis(10)).await;
                    active.fetch_sub(1, Ordering::SeqCst);
                    Ok::<_, anyhow::Error>(Value::Null)
                }
            }),
        );
    }
    let (session, manager) = session("claude-code", registry);
    assert_eq!(session.concurrency_limit(), 5);

    let first_wave = join_all((0..5).map(|_| session.call_tool("slow_sync", json!({}))));
    let second_wave = async {
        tokio::time::sleep(Duration::from_millis(50)).await;
        manager
            .set_override("claude-code", common::object(json!({"maxConcurrentTools": 1})))
            .unwrap();
        session.refresh();
        join_all((0..3).map(|_| session.call_tool("quick_check", json!({})))).await
    };
    let (first, second) = tokio::join!(first_wave, second_wave);

    assert!(first.iter().chain(second.iter()).all(|r| !r.is_error));
    assert_eq!(session.concurrency_limit(), 1);
    // later calls only start once the earlier wave has drained to the new limit
    assert_eq!(late_peak.load(Ordering::SeqCst), 1);
}
