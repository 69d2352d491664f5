// crates/dataplane-core/tests/scenarios.rs
// ============================================================================
// Module: End-to-End Lifecycle Scenarios
// Description: Full lifecycle walks combining engine operations.
// ============================================================================
//! ## Overview
//! Walks complete provider and consumer lifecycles through the engine: happy
//! paths, duplicate signaling, conflicts, suspension, and termination from
//! every state.

#![allow(
    clippy::panic,
    clippy::unwrap_used,
    clippy::expect_used,
    reason = "Test-only panic-based assertions are permitted."
)]

use std::sync::Arc;

use dataplane_core::DataFlowState;
use dataplane_core::DataPlaneStore;
use dataplane_core::DataPlaneSdk;
use dataplane_core::ErrorKind;
use dataplane_core::FlowType;
use dataplane_core::InMemoryFlowStore;
use dataplane_core::InMemoryTransactionContext;
use dataplane_core::NoopMonitor;
use dataplane_core::OperationContext;
use dataplane_core::TransferType;
use dataplane_core::messages::DataFlowBaseMessage;
use dataplane_core::messages::DataFlowPrepareMessage;
use dataplane_core::messages::DataFlowStartMessage;
use dataplane_core::messages::DataFlowStartedNotificationMessage;
use serde_json::json;

// ============================================================================
// SECTION: Test Helpers
// ============================================================================

type TestResult = Result<(), String>;

fn base_message(process_id: &str) -> DataFlowBaseMessage {
    DataFlowBaseMessage {
        message_id: "m-1".to_string(),
        participant_id: "participant".to_string(),
        counter_party_id: "counter-party".to_string(),
        dataspace_context: "ctx".to_string(),
        process_id: process_id.to_string(),
        agreement_id: "agreement".to_string(),
        dataset_id: String::new(),
        callback_address: "https://callback.example/flows".to_string(),
        transfer_type: Some(TransferType {
            destination_type: "HttpData".to_string(),
            flow_type: FlowType::Pull,
        }),
        data_address: None,
    }
}

fn new_sdk() -> (Arc<InMemoryFlowStore>, DataPlaneSdk) {
    let store = Arc::new(InMemoryFlowStore::new());
    let sdk = DataPlaneSdk::builder()
        .with_store(store.clone())
        .with_transaction_context(Arc::new(InMemoryTransactionContext::new(store.clone())))
        .with_monitor(Arc::new(NoopMonitor))
        .with_runtime_id("scenario-dataplane")
        .build()
        .unwrap();
    (store, sdk)
}

// ============================================================================
// SECTION: Scenarios
// ============================================================================

/// Provider happy path: start on an empty store yields one Started flow.
#[test]
fn provider_happy_path() -> TestResult {
    let (store, sdk) = new_sdk();
    let ctx = OperationContext::new();

    let response = sdk
        .start(&ctx, &DataFlowStartMessage { base: base_message("p1") })
        .map_err(|err| err.to_string())?;
    if response.state != DataFlowState::Started {
        return Err(format!("response state {}", response.state));
    }

    let flow = store.find_by_id(&ctx, "p1").map_err(|err| err.to_string())?;
    if flow.id != "p1" || flow.state != DataFlowState::Started || flow.consumer {
        return Err(format!("unexpected flow {:?}", flow.state));
    }
    Ok(())
}

/// Consumer prepare, then the provider's started notification arrives.
#[test]
fn consumer_prepare_then_start_by_id() -> TestResult {
    let (store, sdk) = new_sdk();
    let ctx = OperationContext::new();

    sdk.prepare(&ctx, &DataFlowPrepareMessage { base: base_message("c1") })
        .map_err(|err| err.to_string())?;
    let prepared = store.find_by_id(&ctx, "c1").map_err(|err| err.to_string())?;
    if prepared.state != DataFlowState::Prepared {
        return Err(format!("prepare left state {}", prepared.state));
    }

    let notification = DataFlowStartedNotificationMessage {
        data_address: serde_json::from_value(json!({"properties": {"foo": "bar"}}))
            .map_err(|err| err.to_string())?,
    };
    sdk.start_by_id(&ctx, "c1", &notification).map_err(|err| err.to_string())?;

    let started = store.find_by_id(&ctx, "c1").map_err(|err| err.to_string())?;
    if started.state != DataFlowState::Started {
        return Err(format!("startById left state {}", started.state));
    }
    let address = started.source_data_address.ok_or("data address not stored")?;
    if address.properties.get("foo") != Some(&json!("bar")) {
        return Err("data address properties lost".to_string());
    }
    Ok(())
}

/// Retried prepare returns Prepared again without a second row or bump.
#[test]
fn duplicate_prepare_is_a_no_op() -> TestResult {
    let (store, sdk) = new_sdk();
    let ctx = OperationContext::new();
    let message = DataFlowPrepareMessage { base: base_message("c1") };

    sdk.prepare(&ctx, &message).map_err(|err| err.to_string())?;
    let first = store.find_by_id(&ctx, "c1").map_err(|err| err.to_string())?;

    let response = sdk.prepare(&ctx, &message).map_err(|err| err.to_string())?;
    if response.state != DataFlowState::Prepared {
        return Err(format!("retry returned {}", response.state));
    }
    let second = store.find_by_id(&ctx, "c1").map_err(|err| err.to_string())?;
    if second.state_count != first.state_count || second.state != first.state {
        return Err("retry changed the flow".to_string());
    }
    Ok(())
}

/// Prepare against a flow created by start conflicts.
#[test]
fn prepare_after_start_conflicts() -> TestResult {
    let (_store, sdk) = new_sdk();
    let ctx = OperationContext::new();

    sdk.start(&ctx, &DataFlowStartMessage { base: base_message("p1") })
        .map_err(|err| err.to_string())?;
    let err = sdk
        .prepare(&ctx, &DataFlowPrepareMessage { base: base_message("p1") })
        .expect_err("prepare must conflict");
    if err.kind() != ErrorKind::Conflict || !err.to_string().contains("PREPARING or PREPARED") {
        return Err(format!("unexpected error {err}"));
    }
    Ok(())
}

/// Suspend a started provider flow; restarting it via Start fails.
#[test]
fn suspend_blocks_provider_restart() -> TestResult {
    let (store, sdk) = new_sdk();
    let ctx = OperationContext::new();

    sdk.start(&ctx, &DataFlowStartMessage { base: base_message("p1") })
        .map_err(|err| err.to_string())?;
    sdk.suspend(&ctx, "p1", "maint").map_err(|err| err.to_string())?;

    let flow = store.find_by_id(&ctx, "p1").map_err(|err| err.to_string())?;
    if flow.state != DataFlowState::Suspended || flow.error_detail != "maint" {
        return Err(format!("unexpected flow {:?}/{}", flow.state, flow.error_detail));
    }

    // A suspended provider flow needs operator intervention; the Start path
    // only serves duplicates and prepared consumer flows.
    let err = sdk
        .start(&ctx, &DataFlowStartMessage { base: base_message("p1") })
        .expect_err("suspended provider flow must not restart");
    if err.kind() != ErrorKind::InvalidTransition {
        return Err(format!("unexpected error {err}"));
    }
    Ok(())
}

/// Terminate succeeds from every reachable state; repeats are no-ops.
#[test]
fn terminate_from_anywhere() -> TestResult {
    let (store, sdk) = new_sdk();
    let ctx = OperationContext::new();

    // Build one flow per reachable state using engine operations.
    sdk.prepare(&ctx, &DataFlowPrepareMessage { base: base_message("prepared") })
        .map_err(|err| err.to_string())?;
    sdk.start(&ctx, &DataFlowStartMessage { base: base_message("started") })
        .map_err(|err| err.to_string())?;
    sdk.start(&ctx, &DataFlowStartMessage { base: base_message("suspended") })
        .map_err(|err| err.to_string())?;
    sdk.suspend(&ctx, "suspended", "pause").map_err(|err| err.to_string())?;
    sdk.start(&ctx, &DataFlowStartMessage { base: base_message("completed") })
        .map_err(|err| err.to_string())?;
    sdk.complete(&ctx, "completed").map_err(|err| err.to_string())?;

    for id in ["prepared", "started", "suspended", "completed"] {
        sdk.terminate(&ctx, id, "x").map_err(|err| format!("terminating {id}: {err}"))?;
        let flow = store.find_by_id(&ctx, id).map_err(|err| err.to_string())?;
        if flow.state != DataFlowState::Terminated {
            return Err(format!("{id} not terminated: {}", flow.state));
        }
        let count = flow.state_count;

        // Second terminate is a no-op.
        sdk.terminate(&ctx, id, "y").map_err(|err| err.to_string())?;
        let again = store.find_by_id(&ctx, id).map_err(|err| err.to_string())?;
        if again.state_count != count || again.error_detail != "x" {
            return Err(format!("{id}: repeated terminate mutated flow"));
        }
    }
    Ok(())
}

/// Completed and terminated flows cannot be suspended.
#[test]
fn suspend_fails_for_settled_flows() -> TestResult {
    let (_store, sdk) = new_sdk();
    let ctx = OperationContext::new();

    sdk.start(&ctx, &DataFlowStartMessage { base: base_message("done") })
        .map_err(|err| err.to_string())?;
    sdk.complete(&ctx, "done").map_err(|err| err.to_string())?;
    let err = sdk.suspend(&ctx, "done", "late").expect_err("completed flow cannot suspend");
    if err.kind() != ErrorKind::InvalidTransition {
        return Err(format!("unexpected error {err}"));
    }

    sdk.start(&ctx, &DataFlowStartMessage { base: base_message("gone") })
        .map_err(|err| err.to_string())?;
    sdk.terminate(&ctx, "gone", "x").map_err(|err| err.to_string())?;
    let err = sdk.suspend(&ctx, "gone", "late").expect_err("terminated flow cannot suspend");
    if err.kind() != ErrorKind::InvalidTransition {
        return Err(format!("unexpected error {err}"));
    }
    Ok(())
}
