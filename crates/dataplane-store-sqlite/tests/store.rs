// crates/dataplane-store-sqlite/tests/store.rs
// ============================================================================
// Module: SQLite Store Tests
// Description: Round-trip, strict-save, and transaction rollback checks.
// ============================================================================
//! ## Overview
//! Validates the relational store against the store contract and the
//! transaction context against the rollback-on-error and rollback-on-panic
//! guarantees, using throwaway database files.

#![allow(
    clippy::panic,
    clippy::unwrap_used,
    clippy::expect_used,
    reason = "Test-only panic-based assertions are permitted."
)]

use std::panic;
use std::panic::AssertUnwindSafe;

use dataplane_core::DataAddressBuilder;
use dataplane_core::DataFlow;
use dataplane_core::DataFlowBuilder;
use dataplane_core::DataFlowState;
use dataplane_core::DataPlaneError;
use dataplane_core::DataPlaneStore;
use dataplane_core::ErrorKind;
use dataplane_core::FlowType;
use dataplane_core::OperationContext;
use dataplane_core::TransactionContext;
use dataplane_core::TransferType;
use dataplane_store_sqlite::SqliteFlowStore;
use dataplane_store_sqlite::SqliteStoreConfig;
use tempfile::TempDir;
use url::Url;

// ============================================================================
// SECTION: Test Helpers
// ============================================================================

type TestResult = Result<(), String>;

fn open_store(dir: &TempDir) -> Result<SqliteFlowStore, String> {
    let config = SqliteStoreConfig {
        path: dir.path().join("flows.db"),
        busy_timeout_ms: 1_000,
        journal_mode: dataplane_store_sqlite::SqliteJournalMode::Wal,
    };
    SqliteFlowStore::new(config).map_err(|err| err.to_string())
}

fn flow(id: &str, state: DataFlowState) -> DataFlow {
    let mut flow = DataFlowBuilder::new()
        .id(id)
        .consumer(true)
        .participant_id("participant")
        .counter_party_id("counter-party")
        .dataspace_context("ctx")
        .agreement_id("agreement")
        .dataset_id("dataset")
        .runtime_id("runtime")
        .callback_address(Url::parse("https://callback.example/flows").unwrap())
        .transfer_type(TransferType {
            destination_type: "HttpData".to_string(),
            flow_type: FlowType::Pull,
        })
        .source_data_address(
            DataAddressBuilder::new()
                .property("type", "HttpData")
                .property("endpoint", "https://data.example/source")
                .build()
                .unwrap(),
        )
        .build()
        .unwrap();
    flow.state = state;
    flow.state_count = 3;
    flow.state_timestamp = 1_234;
    flow.error_detail = "detail".to_string();
    flow
}

// ============================================================================
// SECTION: Round Trip
// ============================================================================

#[test]
fn create_and_find_round_trip_all_columns() -> TestResult {
    let dir = TempDir::new().map_err(|err| err.to_string())?;
    let store = open_store(&dir)?;
    let ctx = OperationContext::new();
    let original = flow("f1", DataFlowState::Suspended);

    store.create(&ctx, &original).map_err(|err| err.to_string())?;
    let found = store.find_by_id(&ctx, "f1").map_err(|err| err.to_string())?;

    if found.id != original.id
        || found.consumer != original.consumer
        || found.agreement_id != original.agreement_id
        || found.dataset_id != original.dataset_id
        || found.participant_id != original.participant_id
        || found.counter_party_id != original.counter_party_id
        || found.dataspace_context != original.dataspace_context
        || found.runtime_id != original.runtime_id
        || found.callback_address != original.callback_address
        || found.transfer_type != original.transfer_type
        || found.source_data_address != original.source_data_address
        || found.destination_data_address != original.destination_data_address
        || found.state != original.state
        || found.state_count != original.state_count
        || found.state_timestamp != original.state_timestamp
        || found.error_detail != original.error_detail
    {
        return Err("round trip lost attributes".to_string());
    }
    Ok(())
}

#[test]
fn store_survives_reopen() -> TestResult {
    let dir = TempDir::new().map_err(|err| err.to_string())?;
    let ctx = OperationContext::new();
    {
        let store = open_store(&dir)?;
        store.create(&ctx, &flow("f1", DataFlowState::Started)).map_err(|err| err.to_string())?;
    }
    let store = open_store(&dir)?;
    let found = store.find_by_id(&ctx, "f1").map_err(|err| err.to_string())?;
    if found.state != DataFlowState::Started {
        return Err(format!("reopened store lost state: {}", found.state));
    }
    Ok(())
}

// ============================================================================
// SECTION: Contract Errors
// ============================================================================

#[test]
fn create_conflicts_on_duplicate_id() -> TestResult {
    let dir = TempDir::new().map_err(|err| err.to_string())?;
    let store = open_store(&dir)?;
    let ctx = OperationContext::new();

    store.create(&ctx, &flow("f1", DataFlowState::Started)).map_err(|err| err.to_string())?;
    let err = store
        .create(&ctx, &flow("f1", DataFlowState::Prepared))
        .expect_err("duplicate create must conflict");
    if err.kind() != ErrorKind::Conflict {
        return Err(format!("expected Conflict, got {err}"));
    }
    Ok(())
}

#[test]
fn save_is_strict_about_missing_rows() -> TestResult {
    let dir = TempDir::new().map_err(|err| err.to_string())?;
    let store = open_store(&dir)?;
    let ctx = OperationContext::new();

    let err = store
        .save(&ctx, &flow("missing", DataFlowState::Started))
        .expect_err("save of unknown flow must fail");
    if err.kind() != ErrorKind::NotFound {
        return Err(format!("expected NotFound, got {err}"));
    }
    Ok(())
}

#[test]
fn save_increments_version_and_refreshes_updated_at() -> TestResult {
    let dir = TempDir::new().map_err(|err| err.to_string())?;
    let store = open_store(&dir)?;
    let ctx = OperationContext::new();
    let mut entity = flow("f1", DataFlowState::Started);
    store.create(&ctx, &entity).map_err(|err| err.to_string())?;
    let created = store.find_by_id(&ctx, "f1").map_err(|err| err.to_string())?;

    entity.error_detail = "updated".to_string();
    store.save(&ctx, &entity).map_err(|err| err.to_string())?;

    let saved = store.find_by_id(&ctx, "f1").map_err(|err| err.to_string())?;
    if saved.version != created.version + 1 {
        return Err(format!("expected version bump, got {}", saved.version));
    }
    if saved.updated_at < created.updated_at {
        return Err("updated_at went backwards".to_string());
    }
    if saved.error_detail != "updated" {
        return Err("save lost the mutation".to_string());
    }
    Ok(())
}

#[test]
fn delete_removes_flow_once() -> TestResult {
    let dir = TempDir::new().map_err(|err| err.to_string())?;
    let store = open_store(&dir)?;
    let ctx = OperationContext::new();

    store.create(&ctx, &flow("f1", DataFlowState::Started)).map_err(|err| err.to_string())?;
    store.delete(&ctx, "f1").map_err(|err| err.to_string())?;
    let err = store.delete(&ctx, "f1").expect_err("second delete must fail");
    if err.kind() != ErrorKind::NotFound {
        return Err(format!("expected NotFound, got {err}"));
    }
    Ok(())
}

// ============================================================================
// SECTION: Recovery
// ============================================================================

#[test]
fn recovery_query_yields_only_transient_flows() -> TestResult {
    let dir = TempDir::new().map_err(|err| err.to_string())?;
    let store = open_store(&dir)?;
    let ctx = OperationContext::new();

    store
        .create(&ctx, &flow("preparing", DataFlowState::Preparing))
        .map_err(|err| err.to_string())?;
    store
        .create(&ctx, &flow("suspended", DataFlowState::Suspended))
        .map_err(|err| err.to_string())?;
    store
        .create(&ctx, &flow("terminated", DataFlowState::Terminated))
        .map_err(|err| err.to_string())?;

    let mut iterator = store.acquire_flows_for_recovery(&ctx);
    let mut seen = Vec::new();
    while iterator.advance() {
        seen.push(iterator.current().ok_or("missing current element")?.id.clone());
    }
    iterator.close().map_err(|err| err.to_string())?;

    if seen != ["preparing", "suspended"] {
        return Err(format!("unexpected recovery set {seen:?}"));
    }
    Ok(())
}

// ============================================================================
// SECTION: Transactions
// ============================================================================

#[test]
fn transaction_commits_on_success() -> TestResult {
    let dir = TempDir::new().map_err(|err| err.to_string())?;
    let store = open_store(&dir)?;
    let trx = store.transaction_context();
    let ctx = OperationContext::new();

    trx.execute(&ctx, &mut |ctx| store.create(ctx, &flow("f1", DataFlowState::Started)))
        .map_err(|err| err.to_string())?;

    store.find_by_id(&ctx, "f1").map_err(|err| err.to_string())?;
    Ok(())
}

#[test]
fn transaction_rolls_back_on_error() -> TestResult {
    let dir = TempDir::new().map_err(|err| err.to_string())?;
    let store = open_store(&dir)?;
    let trx = store.transaction_context();
    let ctx = OperationContext::new();

    let err = trx
        .execute(&ctx, &mut |ctx| {
            store.create(ctx, &flow("f1", DataFlowState::Started))?;
            Err(DataPlaneError::Internal("unit of work failed".to_string()))
        })
        .expect_err("failing work must surface its error");
    if !err.to_string().contains("unit of work failed") {
        return Err(format!("error not propagated unchanged: {err}"));
    }

    match store.find_by_id(&ctx, "f1") {
        Err(err) if err.kind() == ErrorKind::NotFound => Ok(()),
        other => Err(format!("expected rollback, got {other:?}")),
    }
}

#[test]
fn transaction_rolls_back_on_panic_and_reraises() -> TestResult {
    let dir = TempDir::new().map_err(|err| err.to_string())?;
    let store = open_store(&dir)?;
    let trx = store.transaction_context();
    let ctx = OperationContext::new();

    let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
        let _ = trx.execute(&ctx, &mut |ctx| {
            store.create(ctx, &flow("f1", DataFlowState::Started))?;
            panic!("work exploded");
        });
    }));
    if outcome.is_ok() {
        return Err("panic was swallowed".to_string());
    }

    match store.find_by_id(&ctx, "f1") {
        Err(err) if err.kind() == ErrorKind::NotFound => Ok(()),
        other => Err(format!("expected rollback, got {other:?}")),
    }
}

#[test]
fn cancelled_context_short_circuits_transaction() -> TestResult {
    let dir = TempDir::new().map_err(|err| err.to_string())?;
    let store = open_store(&dir)?;
    let trx = store.transaction_context();

    let ctx = OperationContext::new();
    ctx.cancel();
    let err = trx
        .execute(&ctx, &mut |_ctx| Ok(()))
        .expect_err("cancelled context must short-circuit");
    if err.kind() != ErrorKind::Cancelled {
        return Err(format!("expected Cancelled, got {err}"));
    }
    Ok(())
}
