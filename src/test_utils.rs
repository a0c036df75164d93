//! Test utilities for ClientFit
//!
//! This module provides common test fixtures: the built-in profile table,
//! detected client contexts, temporary files and error assertions.

use crate::adapt::error_kind;
use crate::client::{ClientContext, ClientDetector, ConnectionMetadata, ProfileTable};
use crate::error::Result;
use crate::manager::ConfigManager;
use std::path::PathBuf;
use std::sync::Arc;
use tempfile::TempDir;

/// Built-in profile table
pub fn builtin_profiles() -> Arc<ProfileTable> {
    Arc::new(ProfileTable::builtin().expect("built-in profiles compile"))
}

/// Config manager over the built-in profiles
pub fn test_manager() -> Arc<ConfigManager> {
    Arc::new(ConfigManager::new(builtin_profiles()))
}

/// Context for a client identified by its client name
pub fn detect_client(client_name: &str) -> ClientContext {
    ClientDetector::new(builtin_profiles()).detect(&ConnectionMetadata {
        client_name: Some(client_name.to_string()),
        ..Default::default()
    })
}

/// Create a temporary directory for testing
pub fn temp_dir() -> TempDir {
    TempDir::new().expect("Failed to create temporary directory")
}

/// Create a test file with the given content
///
/// # Panics
///
/// Panics if file creation or writing fails
pub fn create_test_file(dir: &TempDir, name: &str, content: &str) -> PathBuf {
    let path = dir.path().join(name);
    std::fs::write(&path, content).expect("Failed to write test file");
    path
}

/// Assert that a result failed with the given error kind
///
/// # Panics
///
/// Panics if the result is Ok or the kind differs
pub fn assert_error_kind<T: std::fmt::Debug>(result: Result<T>, expected: &str) {
    match result {
        Ok(value) => panic!("Expected {} error, got Ok({:?})", expected, value),
        Err(e) => assert_eq!(error_kind(&e), expected, "unexpected error: {:#}", e),
    }
}
