// crates/dataplane-core/src/runtime/mod.rs
// ============================================================================
// Module: Runtime
// Description: Lifecycle engine and in-memory store/transaction
//              implementations.
// Purpose: Group the executable parts of the core crate.
// ============================================================================

pub mod engine;
pub mod store;
pub mod transaction;

pub use engine::DEFAULT_RUNTIME_ID;
pub use engine::DataFlowHandler;
pub use engine::DataFlowProcessor;
pub use engine::DataPlaneSdk;
pub use engine::DataPlaneSdkBuilder;
pub use engine::ProcessorOptions;
pub use engine::SdkHandle;
pub use store::InMemoryFlowStore;
pub use store::SharedFlowStore;
pub use store::VecFlowIterator;
pub use transaction::InMemoryTransactionContext;
