// crates/dataplane-core/src/lib.rs
// ============================================================================
// Module: Data Plane Core Library
// Description: Public API surface of the data-flow lifecycle engine.
// Purpose: Expose the entity, interfaces, messages, and runtime helpers.
// Dependencies: crate::{core, errors, interfaces, messages, runtime}
// ============================================================================

//! ## Overview
//! This crate is the reusable coordination core for Dataspace Protocol data
//! planes. It owns the data-flow state machine, the signaling message model,
//! the store and transaction contracts, and the lifecycle engine that ties
//! them together. It moves no bytes itself: concrete transports plug in
//! through processor and handler callbacks, and façades (such as the HTTP
//! signaling crate) translate their protocol onto the engine methods.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod core;
pub mod errors;
pub mod interfaces;
pub mod messages;
pub mod runtime;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use self::core::DataAddress;
pub use self::core::DataAddressBuilder;
pub use self::core::DataFlow;
pub use self::core::DataFlowBuilder;
pub use self::core::DataFlowState;
pub use self::core::EndpointProperty;
pub use self::core::FlowType;
pub use self::core::OperationContext;
pub use self::core::TransferType;
pub use errors::DataPlaneError;
pub use errors::ErrorKind;
pub use interfaces::DataPlaneStore;
pub use interfaces::FlowIterator;
pub use interfaces::Monitor;
pub use interfaces::NoopMonitor;
pub use interfaces::StderrMonitor;
pub use interfaces::TransactionContext;
pub use interfaces::UnitOfWork;
pub use messages::DataFlowBaseMessage;
pub use messages::DataFlowPrepareMessage;
pub use messages::DataFlowResponseMessage;
pub use messages::DataFlowStartMessage;
pub use messages::DataFlowStartedNotificationMessage;
pub use messages::DataFlowStatusResponseMessage;
pub use messages::DataFlowTransitionMessage;
pub use runtime::DEFAULT_RUNTIME_ID;
pub use runtime::DataFlowHandler;
pub use runtime::DataFlowProcessor;
pub use runtime::DataPlaneSdk;
pub use runtime::DataPlaneSdkBuilder;
pub use runtime::InMemoryFlowStore;
pub use runtime::InMemoryTransactionContext;
pub use runtime::ProcessorOptions;
pub use runtime::SdkHandle;
pub use runtime::SharedFlowStore;
pub use runtime::VecFlowIterator;
