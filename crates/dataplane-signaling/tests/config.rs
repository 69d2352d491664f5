// crates/dataplane-signaling/tests/config.rs
// ============================================================================
// Module: Configuration Tests
// Description: Defaults and validation checks for the data-plane config.
// ============================================================================
//! ## Overview
//! Ensures an empty TOML document yields a runnable in-memory deployment and
//! that invalid sections fail validation closed.

#![allow(
    clippy::panic,
    clippy::unwrap_used,
    clippy::expect_used,
    reason = "Test-only panic-based assertions are permitted."
)]

use dataplane_signaling::ConfigError;
use dataplane_signaling::DataPlaneConfig;
use dataplane_signaling::FlowStoreType;

// ============================================================================
// SECTION: Test Helpers
// ============================================================================

type TestResult = Result<(), String>;

fn assert_invalid(result: Result<DataPlaneConfig, ConfigError>, needle: &str) -> TestResult {
    match result {
        Err(error) => {
            let message = error.to_string();
            if message.contains(needle) {
                Ok(())
            } else {
                Err(format!("error {message} did not contain {needle}"))
            }
        }
        Ok(_) => Err("expected invalid config".to_string()),
    }
}

// ============================================================================
// SECTION: Defaults
// ============================================================================

#[test]
fn empty_config_yields_memory_deployment() -> TestResult {
    let config = DataPlaneConfig::from_toml_str("").map_err(|err| err.to_string())?;
    if config.store.store_type != FlowStoreType::Memory {
        return Err("default store is not memory".to_string());
    }
    if config.server.bind != "127.0.0.1:8080" {
        return Err(format!("unexpected default bind {}", config.server.bind));
    }
    if config.runtime.runtime_id.is_empty() {
        return Err("default runtime id is empty".to_string());
    }
    Ok(())
}

#[test]
fn full_config_parses() -> TestResult {
    let config = DataPlaneConfig::from_toml_str(
        r#"
        [server]
        bind = "0.0.0.0:9090"

        [store]
        type = "sqlite"
        path = "/tmp/flows.db"
        busy_timeout_ms = 2500
        journal_mode = "wal"

        [runtime]
        runtime_id = "dataplane-7"
        "#,
    )
    .map_err(|err| err.to_string())?;
    if config.store.store_type != FlowStoreType::Sqlite {
        return Err("store type not parsed".to_string());
    }
    if config.runtime.runtime_id != "dataplane-7" {
        return Err("runtime id not parsed".to_string());
    }
    config.bind_addr().map_err(|err| err.to_string())?;
    Ok(())
}

// ============================================================================
// SECTION: Validation
// ============================================================================

#[test]
fn sqlite_store_requires_path() -> TestResult {
    assert_invalid(
        DataPlaneConfig::from_toml_str("[store]\ntype = \"sqlite\"\n"),
        "sqlite store requires store.path",
    )
}

#[test]
fn bind_address_must_parse() -> TestResult {
    assert_invalid(
        DataPlaneConfig::from_toml_str("[server]\nbind = \"not-an-address\"\n"),
        "server.bind",
    )
}

#[test]
fn runtime_id_must_not_be_blank() -> TestResult {
    assert_invalid(
        DataPlaneConfig::from_toml_str("[runtime]\nruntime_id = \"  \"\n"),
        "runtime.runtime_id",
    )
}
