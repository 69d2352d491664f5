// crates/dataplane-core/src/core/mod.rs
// ============================================================================
// Module: Core Types
// Description: Data flow entity, addresses, states, and context.
// Purpose: Group the domain types shared by engine, stores, and façades.
// ============================================================================

pub mod address;
pub mod context;
pub mod flow;
pub mod state;
pub mod time;

pub use address::DataAddress;
pub use address::DataAddressBuilder;
pub use address::EndpointProperty;
pub use address::FlowType;
pub use address::TransferType;
pub use context::OperationContext;
pub use flow::DataFlow;
pub use flow::DataFlowBuilder;
pub use state::DataFlowState;
