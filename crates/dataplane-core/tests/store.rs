// crates/dataplane-core/tests/store.rs
// ============================================================================
// Module: In-Memory Store Tests
// Description: Round-trip, copy-isolation, and concurrency checks.
// ============================================================================
//! ## Overview
//! Validates the store contract: defensive copies, conflict detection on
//! create, strict save, delete, recovery iteration, and concurrent creates.

#![allow(
    clippy::panic,
    clippy::unwrap_used,
    clippy::expect_used,
    reason = "Test-only panic-based assertions are permitted."
)]

use std::sync::Arc;
use std::thread;

use dataplane_core::DataFlow;
use dataplane_core::DataFlowBuilder;
use dataplane_core::DataFlowState;
use dataplane_core::DataPlaneStore;
use dataplane_core::ErrorKind;
use dataplane_core::FlowType;
use dataplane_core::InMemoryFlowStore;
use dataplane_core::OperationContext;
use dataplane_core::TransferType;
use url::Url;

// ============================================================================
// SECTION: Test Helpers
// ============================================================================

type TestResult = Result<(), String>;

fn flow(id: &str, state: DataFlowState) -> DataFlow {
    let mut flow = DataFlowBuilder::new()
        .id(id)
        .participant_id("participant")
        .counter_party_id("counter-party")
        .dataspace_context("context")
        .agreement_id("agreement")
        .runtime_id("runtime")
        .callback_address(Url::parse("https://callback.example/flows").unwrap())
        .transfer_type(TransferType {
            destination_type: "HttpData".to_string(),
            flow_type: FlowType::Push,
        })
        .build()
        .unwrap();
    flow.state = state;
    flow
}

// ============================================================================
// SECTION: Round Trip
// ============================================================================

#[test]
fn create_and_find_round_trip() -> TestResult {
    let store = InMemoryFlowStore::new();
    let ctx = OperationContext::new();
    let original = flow("f1", DataFlowState::Started);

    store.create(&ctx, &original).map_err(|err| err.to_string())?;
    let found = store.find_by_id(&ctx, "f1").map_err(|err| err.to_string())?;

    if found.id != original.id
        || found.state != original.state
        || found.callback_address != original.callback_address
        || found.transfer_type != original.transfer_type
    {
        return Err("round trip lost attributes".to_string());
    }
    Ok(())
}

#[test]
fn reads_and_writes_are_copies() -> TestResult {
    let store = InMemoryFlowStore::new();
    let ctx = OperationContext::new();
    let mut original = flow("f1", DataFlowState::Started);
    store.create(&ctx, &original).map_err(|err| err.to_string())?;

    // Mutating the caller's copy after create must not affect the store.
    original.error_detail = "mutated outside".to_string();
    let found = store.find_by_id(&ctx, "f1").map_err(|err| err.to_string())?;
    if found.error_detail == "mutated outside" {
        return Err("store aliased the created flow".to_string());
    }

    // Mutating a read copy must not affect the store either.
    let mut read = store.find_by_id(&ctx, "f1").map_err(|err| err.to_string())?;
    read.error_detail = "mutated read".to_string();
    let again = store.find_by_id(&ctx, "f1").map_err(|err| err.to_string())?;
    if again.error_detail == "mutated read" {
        return Err("store aliased the read flow".to_string());
    }
    Ok(())
}

// ============================================================================
// SECTION: Contract Errors
// ============================================================================

#[test]
fn create_conflicts_on_duplicate_id() -> TestResult {
    let store = InMemoryFlowStore::new();
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
fn create_rejects_empty_id() -> TestResult {
    let store = InMemoryFlowStore::new();
    let ctx = OperationContext::new();
    let mut bad = flow("f1", DataFlowState::Started);
    bad.id = String::new();

    let err = store.create(&ctx, &bad).expect_err("empty id must fail");
    if err.kind() != ErrorKind::InvalidInput {
        return Err(format!("expected InvalidInput, got {err}"));
    }
    Ok(())
}

#[test]
fn save_is_strict_about_missing_rows() -> TestResult {
    let store = InMemoryFlowStore::new();
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
    let store = InMemoryFlowStore::new();
    let ctx = OperationContext::new();
    let mut entity = flow("f1", DataFlowState::Started);
    store.create(&ctx, &entity).map_err(|err| err.to_string())?;
    let created = store.find_by_id(&ctx, "f1").map_err(|err| err.to_string())?;

    entity.error_detail = "updated".to_string();
    store.save(&ctx, &entity).map_err(|err| err.to_string())?;
    store.save(&ctx, &entity).map_err(|err| err.to_string())?;

    let saved = store.find_by_id(&ctx, "f1").map_err(|err| err.to_string())?;
    if saved.version != created.version + 2 {
        return Err(format!("expected version {}, got {}", created.version + 2, saved.version));
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
    let store = InMemoryFlowStore::new();
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
// SECTION: Recovery Iterator
// ============================================================================

#[test]
fn recovery_iterator_yields_only_transient_flows() -> TestResult {
    let store = InMemoryFlowStore::new();
    let ctx = OperationContext::new();
    store
        .create(&ctx, &flow("preparing", DataFlowState::Preparing))
        .map_err(|err| err.to_string())?;
    store
        .create(&ctx, &flow("starting", DataFlowState::Starting))
        .map_err(|err| err.to_string())?;
    store
        .create(&ctx, &flow("suspended", DataFlowState::Suspended))
        .map_err(|err| err.to_string())?;
    store
        .create(&ctx, &flow("started", DataFlowState::Started))
        .map_err(|err| err.to_string())?;
    store
        .create(&ctx, &flow("terminated", DataFlowState::Terminated))
        .map_err(|err| err.to_string())?;

    let mut iterator = store.acquire_flows_for_recovery(&ctx);
    let mut seen = Vec::new();
    while iterator.advance() {
        let current = iterator.current().ok_or("advance returned true without element")?;
        seen.push(current.id.clone());
    }
    if iterator.error().is_some() {
        return Err("iterator reported an error".to_string());
    }
    iterator.close().map_err(|err| err.to_string())?;

    seen.sort();
    if seen != ["preparing", "starting", "suspended"] {
        return Err(format!("unexpected recovery set {seen:?}"));
    }
    Ok(())
}

// ============================================================================
// SECTION: Concurrency
// ============================================================================

#[test]
fn concurrent_creates_admit_exactly_one_winner() -> TestResult {
    let store = Arc::new(InMemoryFlowStore::new());
    let mut handles = Vec::new();
    for _ in 0..8 {
        let store = store.clone();
        handles.push(thread::spawn(move || {
            let ctx = OperationContext::new();
            store.create(&ctx, &flow("contended", DataFlowState::Started)).is_ok()
        }));
    }

    let successes = handles
        .into_iter()
        .map(|handle| handle.join().expect("worker panicked"))
        .filter(|ok| *ok)
        .count();
    if successes != 1 {
        return Err(format!("expected exactly one successful create, got {successes}"));
    }
    Ok(())
}
