// crates/dataplane-core/examples/minimal.rs
// ============================================================================
// Module: Minimal Engine Example
// Description: Drive a provider flow through start, suspend, and terminate.
// ============================================================================

use std::sync::Arc;

use dataplane_core::DataPlaneSdk;
use dataplane_core::FlowType;
use dataplane_core::InMemoryFlowStore;
use dataplane_core::InMemoryTransactionContext;
use dataplane_core::OperationContext;
use dataplane_core::TransferType;
use dataplane_core::messages::DataFlowStartMessage;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let store = Arc::new(InMemoryFlowStore::new());
    let sdk = DataPlaneSdk::builder()
        .with_store(store.clone())
        .with_transaction_context(Arc::new(InMemoryTransactionContext::new(store)))
        .with_runtime_id("example-dataplane")
        .build()?;

    let message = DataFlowStartMessage {
        base: dataplane_core::DataFlowBaseMessage {
            message_id: "m-1".to_string(),
            participant_id: "provider".to_string(),
            counter_party_id: "consumer".to_string(),
            dataspace_context: "demo".to_string(),
            process_id: "p-1".to_string(),
            agreement_id: "agreement-1".to_string(),
            callback_address: "https://consumer.example/callbacks".to_string(),
            transfer_type: Some(TransferType {
                destination_type: "HttpData".to_string(),
                flow_type: FlowType::Pull,
            }),
            ..Default::default()
        },
    };
    message.validate()?;

    let ctx = OperationContext::new();
    let response = sdk.start(&ctx, &message)?;
    println!("started flow p-1 in state {}", response.state);

    sdk.suspend(&ctx, "p-1", "maintenance window")?;
    println!("suspended: {}", sdk.status(&ctx, "p-1")?.state);

    sdk.terminate(&ctx, "p-1", "demo over")?;
    println!("terminated: {}", sdk.status(&ctx, "p-1")?.state);
    Ok(())
}
