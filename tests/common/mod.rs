use clientfit::capability::ToolComplexity;
use clientfit::client::{ClientContext, ClientDetector, ConnectionMetadata, ProfileTable};
use clientfit::manager::ConfigManager;
use clientfit::tools::{handler_fn, ToolDefinition, ToolMetadata, ToolRegistry};
use clientfit::{BehaviorTracker, ResourceRegistry, Session, SessionParts};
use serde_json::{json, Value};
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use tempfile::TempDir;

#[allow(dead_code)]
pub fn profiles() -> Arc<ProfileTable> {
    Arc::new(ProfileTable::builtin().expect("built-in profiles"))
}

#[allow(dead_code)]
pub fn detector() -> ClientDetector {
    ClientDetector::new(profiles())
}

#[allow(dead_code)]
pub fn detect_by_name(client_name: &str) -> ClientContext {
    detector().detect(&ConnectionMetadata {
        client_name: Some(client_name.to_string()),
        ..Default::default()
    })
}

#[allow(dead_code)]
pub fn manager() -> Arc<ConfigManager> {
    Arc::new(ConfigManager::new(profiles()))
}

#[allow(dead_code)]
pub fn definition(name: &str) -> ToolDefinition {
    ToolDefinition::new(name, format!("{} tool", name), json!({"type": "object"}))
}

/// Registry with one echo tool per complexity tier plus feature-gated tools
#[allow(dead_code)]
pub fn ledger_registry() -> ToolRegistry {
    let mut registry = ToolRegistry::new();
    let echo = || handler_fn(|params| async move { Ok::<_, anyhow::Error>(params) });
    registry.register(
        definition("list_accounts"),
        ToolMetadata::new("accounts", ToolComplexity::Low),
        echo(),
    );
    registry.register(
        definition("search_transactions"),
        ToolMetadata::new("transactions", ToolComplexity::Medium),
        echo(),
    );
    registry.register(
        definition("bulk_reconcile"),
        ToolMetadata::new("ledger", ToolComplexity::High),
        echo(),
    );
    registry.register(
        definition("render_chart"),
        ToolMetadata::new("reports", ToolComplexity::Low).requires_images(),
        echo(),
    );
    registry.register(
        definition("export_statement"),
        ToolMetadata::new("reports", ToolComplexity::Medium).requires_binary_content(),
        echo(),
    );
    registry.register(
        definition("stream_ledger"),
        ToolMetadata::new("ledger", ToolComplexity::Medium).requires_streaming(),
        echo(),
    );
    registry
}

#[allow(dead_code)]
pub fn session(client_name: &str, tools: ToolRegistry) -> (Session, Arc<ConfigManager>) {
    let manager = manager();
    let session = Session::new(
        detect_by_name(client_name),
        SessionParts {
            tracker: Arc::new(BehaviorTracker::new(Arc::clone(&manager))),
            manager: Arc::clone(&manager),
            tools: Arc::new(tools),
            resources: Arc::new(ResourceRegistry::new()),
        },
    );
    (session, manager)
}

#[allow(dead_code)]
pub fn object(value: Value) -> serde_json::Map<String, Value> {
    match value {
        Value::Object(map) => map,
        other => panic!("expected object, got {}", other),
    }
}

#[allow(dead_code)]
pub fn temp_file(name: &str, contents: &str) -> (TempDir, PathBuf) {
    let temp_dir = TempDir::new().expect("failed to create tempdir");
    let path = temp_dir.path().join(name);
    fs::write(&path, contents).expect("failed to write file");
    (temp_dir, path)
}
