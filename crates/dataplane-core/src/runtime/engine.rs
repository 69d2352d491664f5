// crates/dataplane-core/src/runtime/engine.rs
// ============================================================================
// Module: Data Flow Lifecycle Engine
// Description: Prepare/start/suspend/terminate/complete orchestration with
//              de-duplication and pluggable processors.
// Purpose: Execute signaling operations transactionally against the store.
// Dependencies: crate::{core, errors, interfaces, messages}
// ============================================================================

//! ## Overview
//! The lifecycle engine is the single canonical execution path for signaling
//! operations. Every operation checks the caller's context, opens a
//! transaction through the configured [`TransactionContext`], de-duplicates
//! retried messages against the store, invokes the deployer's processor or
//! handler, applies the state transition, and persists the flow. All façades
//! (HTTP or otherwise) must call into these methods.
//!
//! Two operations order their side effects asymmetrically on purpose:
//! `complete` transitions before its handler runs so terminal success is
//! recorded even when external cleanup fails later, while `suspend` and
//! `terminate` obtain the transport's consent first and transition after.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;

use crate::core::address::DataAddress;
use crate::core::context::OperationContext;
use crate::core::flow::DataFlow;
use crate::core::flow::DataFlowBuilder;
use crate::core::state::DataFlowState;
use crate::errors::DataPlaneError;
use crate::errors::ErrorKind;
use crate::interfaces::DataPlaneStore;
use crate::interfaces::Monitor;
use crate::interfaces::StderrMonitor;
use crate::interfaces::TransactionContext;
use crate::interfaces::UnitOfWork;
use crate::messages::DataFlowBaseMessage;
use crate::messages::DataFlowPrepareMessage;
use crate::messages::DataFlowResponseMessage;
use crate::messages::DataFlowStartMessage;
use crate::messages::DataFlowStartedNotificationMessage;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Runtime id used when the deployer does not configure one.
pub const DEFAULT_RUNTIME_ID: &str = "dataplane";

// ============================================================================
// SECTION: Processor Contracts
// ============================================================================

/// Options passed to prepare and start processors.
#[derive(Debug, Clone, Default)]
pub struct ProcessorOptions {
    /// True when the triggering message is a retry of one already applied.
    pub duplicate: bool,
    /// Source endpoint description carried by the triggering message.
    pub source_data_address: Option<DataAddress>,
}

/// Narrow capability view handed to processors.
///
/// Processors get read access to the store, the monitor, and the runtime id
/// without a back-reference to the engine aggregate.
pub struct SdkHandle<'a> {
    /// Store the current transaction operates on.
    store: &'a dyn DataPlaneStore,
    /// Engine monitor.
    monitor: &'a dyn Monitor,
    /// Identifier of this data-plane instance.
    runtime_id: &'a str,
}

impl SdkHandle<'_> {
    /// Returns the store.
    #[must_use]
    pub fn store(&self) -> &dyn DataPlaneStore {
        self.store
    }

    /// Returns the monitor.
    #[must_use]
    pub fn monitor(&self) -> &dyn Monitor {
        self.monitor
    }

    /// Returns the runtime id of this data-plane instance.
    #[must_use]
    pub fn runtime_id(&self) -> &str {
        self.runtime_id
    }

    /// Looks up the current state of a flow.
    ///
    /// # Errors
    ///
    /// Returns [`DataPlaneError::NotFound`] when the flow does not exist.
    pub fn status(&self, ctx: &OperationContext, id: &str) -> Result<DataFlow, DataPlaneError> {
        self.store.find_by_id(ctx, id)
    }
}

/// Extension point handling prepare and start events.
///
/// Implementations may mutate the flow; mutations are persisted by the
/// engine. When `options.duplicate` is set the implementation must behave
/// idempotently.
pub type DataFlowProcessor = Arc<
    dyn Fn(
            &OperationContext,
            &mut DataFlow,
            &SdkHandle<'_>,
            &ProcessorOptions,
        ) -> Result<DataFlowResponseMessage, DataPlaneError>
        + Send
        + Sync,
>;

/// Extension point handling suspend, terminate, complete, and recover events.
pub type DataFlowHandler =
    Arc<dyn Fn(&OperationContext, &mut DataFlow) -> Result<(), DataPlaneError> + Send + Sync>;

// ============================================================================
// SECTION: Engine
// ============================================================================

/// Data-plane SDK engine owning the lifecycle of this instance's flows.
pub struct DataPlaneSdk {
    /// Flow store.
    store: Arc<dyn DataPlaneStore>,
    /// Transactional executor.
    trx_context: Arc<dyn TransactionContext>,
    /// Diagnostics monitor.
    monitor: Arc<dyn Monitor>,
    /// Identifier of this data-plane instance.
    runtime_id: String,
    /// Prepare processor.
    on_prepare: DataFlowProcessor,
    /// Start processor.
    on_start: DataFlowProcessor,
    /// Suspend handler.
    on_suspend: DataFlowHandler,
    /// Terminate handler.
    on_terminate: DataFlowHandler,
    /// Complete handler.
    on_complete: DataFlowHandler,
    /// Recovery handler.
    on_recover: DataFlowHandler,
}

impl std::fmt::Debug for DataPlaneSdk {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DataPlaneSdk")
            .field("runtime_id", &self.runtime_id)
            .finish_non_exhaustive()
    }
}

impl DataPlaneSdk {
    /// Returns a builder for the engine.
    #[must_use]
    pub fn builder() -> DataPlaneSdkBuilder {
        DataPlaneSdkBuilder::default()
    }

    /// Returns the engine monitor.
    #[must_use]
    pub fn monitor(&self) -> &dyn Monitor {
        self.monitor.as_ref()
    }

    /// Returns the runtime id of this data-plane instance.
    #[must_use]
    pub fn runtime_id(&self) -> &str {
        &self.runtime_id
    }

    /// Prepares a flow on the consumer side.
    ///
    /// A retry of an already-applied prepare is detected by finding the flow
    /// in `Preparing` or `Prepared` and is replayed through the processor
    /// with the duplicate marker set. A flow in any other state is a
    /// conflict. Otherwise a new consumer flow is created in the state the
    /// processor chooses (`Preparing` or `Prepared`).
    ///
    /// # Errors
    ///
    /// Returns [`DataPlaneError::InvalidInput`] for an empty process id,
    /// [`DataPlaneError::Conflict`] for a flow in an incompatible state, and
    /// surfaces processor and store failures otherwise.
    pub fn prepare(
        &self,
        ctx: &OperationContext,
        message: &DataFlowPrepareMessage,
    ) -> Result<DataFlowResponseMessage, DataPlaneError> {
        let process_id = message.base.process_id.clone();
        if process_id.is_empty() {
            return Err(DataPlaneError::InvalidInput("processId cannot be empty".to_string()));
        }
        let mut response = None;
        self.execute(ctx, &mut |ctx| {
            match self.find_existing(ctx, &process_id)? {
                Some(mut flow)
                    if matches!(
                        flow.state,
                        DataFlowState::Preparing | DataFlowState::Prepared
                    ) =>
                {
                    // Duplicate message; let the processor regenerate the
                    // data address if the transport needs one.
                    let options = ProcessorOptions {
                        duplicate: true,
                        source_data_address: None,
                    };
                    let reply = (self.on_prepare)(ctx, &mut flow, &self.handle(), &options)
                        .map_err(|err| {
                            err.context(&format!("processing data flow {process_id}"))
                        })?;
                    self.store.save(ctx, &flow).map_err(|err| {
                        err.context(&format!("saving data flow {process_id}"))
                    })?;
                    response = Some(reply);
                    Ok(())
                }
                Some(flow) => Err(DataPlaneError::Conflict(format!(
                    "data flow {} is not in PREPARING or PREPARED state but in {}",
                    flow.id, flow.state
                ))),
                None => {
                    let mut flow =
                        self.flow_from_message(&message.base, true, DataFlowState::Preparing)?;
                    if let Some(address) = &message.base.data_address {
                        flow.destination_data_address = Some(address.clone());
                    }
                    let options = ProcessorOptions::default();
                    let reply = (self.on_prepare)(ctx, &mut flow, &self.handle(), &options)
                        .map_err(|err| {
                            err.context(&format!("processing data flow {process_id}"))
                        })?;
                    match reply.state {
                        DataFlowState::Prepared => flow.transition_to_prepared()?,
                        DataFlowState::Preparing => flow.transition_to_preparing()?,
                        other => {
                            return Err(DataPlaneError::Internal(format!(
                                "onPrepare returned an invalid state {other}"
                            )));
                        }
                    }
                    self.store.create(ctx, &flow).map_err(|err| {
                        err.context(&format!("creating data flow {process_id}"))
                    })?;
                    response = Some(reply);
                    Ok(())
                }
            }
        })?;
        response
            .ok_or_else(|| DataPlaneError::Internal("prepare produced no response".to_string()))
    }

    /// Starts a flow.
    ///
    /// With no prior flow this is the provider path: a provider flow is
    /// created in the state the processor chooses (`Starting` or `Started`).
    /// An existing flow is advanced through [`Self::start_existing_flow`].
    ///
    /// # Errors
    ///
    /// Returns [`DataPlaneError::InvalidInput`] for an empty process id and
    /// surfaces de-duplication, processor, transition, and store failures.
    pub fn start(
        &self,
        ctx: &OperationContext,
        message: &DataFlowStartMessage,
    ) -> Result<DataFlowResponseMessage, DataPlaneError> {
        let process_id = message.base.process_id.clone();
        if process_id.is_empty() {
            return Err(DataPlaneError::InvalidInput("processId cannot be empty".to_string()));
        }
        let mut response = None;
        self.execute(ctx, &mut |ctx| {
            match self.find_existing(ctx, &process_id)? {
                Some(mut flow) => {
                    let reply = self.start_existing_flow(
                        ctx,
                        &mut flow,
                        message.base.data_address.clone(),
                    )?;
                    response = Some(reply);
                    Ok(())
                }
                None => {
                    let mut flow =
                        self.flow_from_message(&message.base, false, DataFlowState::Starting)?;
                    if let Some(address) = &message.base.data_address {
                        flow.source_data_address = Some(address.clone());
                    }
                    let options = ProcessorOptions {
                        duplicate: false,
                        source_data_address: message.base.data_address.clone(),
                    };
                    let reply = (self.on_start)(ctx, &mut flow, &self.handle(), &options)
                        .map_err(|err| {
                            err.context(&format!("processing data flow {process_id}"))
                        })?;
                    self.apply_start_state(&reply, &mut flow)?;
                    self.store.create(ctx, &flow).map_err(|err| {
                        err.context(&format!("creating data flow {process_id}"))
                    })?;
                    response = Some(reply);
                    Ok(())
                }
            }
        })?;
        response.ok_or_else(|| DataPlaneError::Internal("start produced no response".to_string()))
    }

    /// Advances a consumer flow when the provider's started notification
    /// arrives out of band.
    ///
    /// # Errors
    ///
    /// Returns [`DataPlaneError::NotFound`] when the flow does not exist and
    /// [`DataPlaneError::InvalidInput`] when the flow is not consumer-side.
    pub fn start_by_id(
        &self,
        ctx: &OperationContext,
        id: &str,
        message: &DataFlowStartedNotificationMessage,
    ) -> Result<DataFlowResponseMessage, DataPlaneError> {
        if id.is_empty() {
            return Err(DataPlaneError::InvalidInput("processId cannot be empty".to_string()));
        }
        let mut response = None;
        self.execute(ctx, &mut |ctx| {
            let mut flow = self
                .store
                .find_by_id(ctx, id)
                .map_err(|err| err.context(&format!("starting data flow {id}")))?;
            if !flow.consumer {
                return Err(DataPlaneError::InvalidInput(
                    "startById is only valid for consumer flows".to_string(),
                ));
            }
            let reply = self.start_existing_flow(ctx, &mut flow, message.data_address.clone())?;
            response = Some(reply);
            Ok(())
        })?;
        response
            .ok_or_else(|| DataPlaneError::Internal("startById produced no response".to_string()))
    }

    /// Suspends a started flow, recording the reason.
    ///
    /// A flow already suspended is a no-op. The suspend handler runs before
    /// the transition; its error aborts the transaction.
    ///
    /// # Errors
    ///
    /// Returns [`DataPlaneError::NotFound`] when the flow does not exist and
    /// [`DataPlaneError::InvalidTransition`] when the flow is not `Started`.
    pub fn suspend(
        &self,
        ctx: &OperationContext,
        id: &str,
        reason: &str,
    ) -> Result<(), DataPlaneError> {
        if id.is_empty() {
            return Err(DataPlaneError::InvalidInput("processId cannot be empty".to_string()));
        }
        self.execute(ctx, &mut |ctx| {
            let mut flow = self
                .store
                .find_by_id(ctx, id)
                .map_err(|err| err.context(&format!("suspending data flow {id}")))?;
            if flow.state == DataFlowState::Suspended {
                return Ok(());
            }
            (self.on_suspend)(ctx, &mut flow)
                .map_err(|err| err.context(&format!("suspending data flow {id}")))?;
            flow.transition_to_suspended(reason)?;
            self.store
                .save(ctx, &flow)
                .map_err(|err| err.context(&format!("suspending data flow {id}")))
        })
    }

    /// Terminates a flow, recording the reason.
    ///
    /// Valid from every non-terminated state; a flow already terminated is a
    /// no-op. The terminate handler runs before the transition; its error
    /// aborts the transaction.
    ///
    /// # Errors
    ///
    /// Returns [`DataPlaneError::NotFound`] when the flow does not exist.
    pub fn terminate(
        &self,
        ctx: &OperationContext,
        id: &str,
        reason: &str,
    ) -> Result<(), DataPlaneError> {
        if id.is_empty() {
            return Err(DataPlaneError::InvalidInput("processId cannot be empty".to_string()));
        }
        self.execute(ctx, &mut |ctx| {
            let mut flow = self
                .store
                .find_by_id(ctx, id)
                .map_err(|err| err.context(&format!("terminating data flow {id}")))?;
            if flow.state == DataFlowState::Terminated {
                return Ok(());
            }
            (self.on_terminate)(ctx, &mut flow)
                .map_err(|err| err.context(&format!("terminating data flow {id}")))?;
            flow.transition_to_terminated(reason)?;
            self.store
                .save(ctx, &flow)
                .map_err(|err| err.context(&format!("terminating data flow {id}")))
        })
    }

    /// Completes a flow.
    ///
    /// A flow already completed is a no-op. The transition is applied before
    /// the complete handler runs; a transition failure is returned unchanged
    /// and the handler is never invoked.
    ///
    /// # Errors
    ///
    /// Returns [`DataPlaneError::NotFound`] when the flow does not exist and
    /// [`DataPlaneError::InvalidTransition`] when the flow is not `Started`.
    pub fn complete(&self, ctx: &OperationContext, id: &str) -> Result<(), DataPlaneError> {
        if id.is_empty() {
            return Err(DataPlaneError::InvalidInput("processId cannot be empty".to_string()));
        }
        self.execute(ctx, &mut |ctx| {
            let mut flow = self
                .store
                .find_by_id(ctx, id)
                .map_err(|err| err.context(&format!("completing data flow {id}")))?;
            if flow.state == DataFlowState::Completed {
                return Ok(());
            }
            flow.transition_to_completed()?;
            (self.on_complete)(ctx, &mut flow)
                .map_err(|err| err.context(&format!("completing data flow {id}")))?;
            self.store
                .save(ctx, &flow)
                .map_err(|err| err.context(&format!("completing data flow {id}")))
        })
    }

    /// Returns the current state of a flow.
    ///
    /// # Errors
    ///
    /// Returns [`DataPlaneError::NotFound`] when the flow does not exist.
    pub fn status(&self, ctx: &OperationContext, id: &str) -> Result<DataFlow, DataPlaneError> {
        let mut found = None;
        self.execute(ctx, &mut |ctx| {
            found = Some(self.store.find_by_id(ctx, id)?);
            Ok(())
        })?;
        found.ok_or_else(|| DataPlaneError::Internal("status produced no flow".to_string()))
    }

    /// Runs one recovery sweep over flows in transient states.
    ///
    /// The recover handler is invoked once per flow; a handler failure is
    /// logged and the flow is skipped, so one broken flow does not starve
    /// the rest of the sweep. Periodic scheduling is the deployer's concern.
    ///
    /// # Errors
    ///
    /// Surfaces iterator and store failures.
    pub fn recover(&self, ctx: &OperationContext) -> Result<(), DataPlaneError> {
        self.execute(ctx, &mut |ctx| {
            let mut iterator = self.store.acquire_flows_for_recovery(ctx);
            while iterator.advance() {
                let Some(found) = iterator.current() else {
                    break;
                };
                let mut flow = found.clone();
                match (self.on_recover)(ctx, &mut flow) {
                    Ok(()) => {
                        self.store.save(ctx, &flow).map_err(|err| {
                            err.context(&format!("recovering data flow {}", flow.id))
                        })?;
                    }
                    Err(err) => {
                        self.monitor.printf(format_args!(
                            "recovery of data flow {} failed, skipping: {err}",
                            flow.id
                        ));
                    }
                }
            }
            if let Some(err) = iterator.error() {
                let err = err.clone().context("acquiring data flows for recovery");
                iterator.close()?;
                return Err(err);
            }
            iterator.close()
        })
    }

    /// Advances an already-known flow towards `Started`.
    fn start_existing_flow(
        &self,
        ctx: &OperationContext,
        flow: &mut DataFlow,
        source_address: Option<DataAddress>,
    ) -> Result<DataFlowResponseMessage, DataPlaneError> {
        match flow.state {
            DataFlowState::Starting | DataFlowState::Started => {
                // Duplicate message; replay through the processor.
                if let Some(address) = &source_address {
                    flow.source_data_address = Some(address.clone());
                }
                let options = ProcessorOptions {
                    duplicate: true,
                    source_data_address: source_address,
                };
                let reply = (self.on_start)(ctx, flow, &self.handle(), &options)
                    .map_err(|err| err.context(&format!("processing data flow {}", flow.id)))?;
                self.apply_start_state(&reply, flow)?;
                self.store
                    .save(ctx, flow)
                    .map_err(|err| err.context(&format!("saving data flow {}", flow.id)))?;
                Ok(reply)
            }
            DataFlowState::Prepared if flow.consumer => {
                if let Some(address) = &source_address {
                    flow.source_data_address = Some(address.clone());
                }
                let options = ProcessorOptions {
                    duplicate: false,
                    source_data_address: source_address,
                };
                let reply = (self.on_start)(ctx, flow, &self.handle(), &options)
                    .map_err(|err| err.context(&format!("processing data flow {}", flow.id)))?;
                self.apply_start_state(&reply, flow)?;
                self.store
                    .save(ctx, flow)
                    .map_err(|err| err.context(&format!("saving data flow {}", flow.id)))?;
                Ok(reply)
            }
            other => Err(DataPlaneError::InvalidTransition(format!(
                "cannot start data flow {} in state {other}",
                flow.id
            ))),
        }
    }

    /// Applies the start-processor response state to the flow.
    fn apply_start_state(
        &self,
        response: &DataFlowResponseMessage,
        flow: &mut DataFlow,
    ) -> Result<(), DataPlaneError> {
        match response.state {
            DataFlowState::Started => flow
                .transition_to_started()
                .map_err(|err| err.context("onStart returned an invalid state")),
            DataFlowState::Starting => flow
                .transition_to_starting()
                .map_err(|err| err.context("onStart returned an invalid state")),
            other => Err(DataPlaneError::Internal(format!(
                "onStart returned an invalid state {other}"
            ))),
        }
    }

    /// Looks up a flow, mapping absence to `None` for de-duplication.
    fn find_existing(
        &self,
        ctx: &OperationContext,
        id: &str,
    ) -> Result<Option<DataFlow>, DataPlaneError> {
        match self.store.find_by_id(ctx, id) {
            Ok(flow) => Ok(Some(flow)),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err.context(&format!("performing de-duplication for {id}"))),
        }
    }

    /// Builds a new flow from the base message.
    fn flow_from_message(
        &self,
        base: &DataFlowBaseMessage,
        consumer: bool,
        state: DataFlowState,
    ) -> Result<DataFlow, DataPlaneError> {
        let callback_address = base.callback_url()?;
        let Some(transfer_type) = base.transfer_type.clone() else {
            return Err(DataPlaneError::Validation("transferType is required".to_string()));
        };
        DataFlowBuilder::new()
            .id(base.process_id.clone())
            .consumer(consumer)
            .state(state)
            .agreement_id(base.agreement_id.clone())
            .dataset_id(base.dataset_id.clone())
            .participant_id(base.participant_id.clone())
            .counter_party_id(base.counter_party_id.clone())
            .dataspace_context(base.dataspace_context.clone())
            .runtime_id(self.runtime_id.clone())
            .callback_address(callback_address)
            .transfer_type(transfer_type)
            .build()
    }

    /// Returns the capability view handed to processors.
    fn handle(&self) -> SdkHandle<'_> {
        SdkHandle {
            store: self.store.as_ref(),
            monitor: self.monitor.as_ref(),
            runtime_id: &self.runtime_id,
        }
    }

    /// Fails fast on cancellation, then runs the work transactionally.
    fn execute(
        &self,
        ctx: &OperationContext,
        work: &mut UnitOfWork<'_>,
    ) -> Result<(), DataPlaneError> {
        ctx.check()?;
        self.trx_context.execute(ctx, work)
    }
}

// ============================================================================
// SECTION: Builder
// ============================================================================

/// Composable-options builder for [`DataPlaneSdk`].
///
/// Store and transaction context are required; every other option has a
/// default (prepare resolves to `Prepared`, start to `Started`, transition
/// handlers are no-ops, diagnostics go to standard error).
#[derive(Default)]
pub struct DataPlaneSdkBuilder {
    store: Option<Arc<dyn DataPlaneStore>>,
    trx_context: Option<Arc<dyn TransactionContext>>,
    monitor: Option<Arc<dyn Monitor>>,
    runtime_id: Option<String>,
    on_prepare: Option<DataFlowProcessor>,
    on_start: Option<DataFlowProcessor>,
    on_suspend: Option<DataFlowHandler>,
    on_terminate: Option<DataFlowHandler>,
    on_complete: Option<DataFlowHandler>,
    on_recover: Option<DataFlowHandler>,
}

impl DataPlaneSdkBuilder {
    /// Creates an empty builder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the flow store (required).
    #[must_use]
    pub fn with_store(mut self, store: Arc<dyn DataPlaneStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Sets the transaction context (required).
    #[must_use]
    pub fn with_transaction_context(mut self, trx_context: Arc<dyn TransactionContext>) -> Self {
        self.trx_context = Some(trx_context);
        self
    }

    /// Sets the monitor.
    #[must_use]
    pub fn with_monitor(mut self, monitor: Arc<dyn Monitor>) -> Self {
        self.monitor = Some(monitor);
        self
    }

    /// Sets the runtime id of this data-plane instance.
    #[must_use]
    pub fn with_runtime_id(mut self, runtime_id: impl Into<String>) -> Self {
        self.runtime_id = Some(runtime_id.into());
        self
    }

    /// Sets the prepare processor.
    #[must_use]
    pub fn with_prepare_processor(mut self, processor: DataFlowProcessor) -> Self {
        self.on_prepare = Some(processor);
        self
    }

    /// Sets the start processor.
    #[must_use]
    pub fn with_start_processor(mut self, processor: DataFlowProcessor) -> Self {
        self.on_start = Some(processor);
        self
    }

    /// Sets the suspend handler.
    #[must_use]
    pub fn with_suspend_handler(mut self, handler: DataFlowHandler) -> Self {
        self.on_suspend = Some(handler);
        self
    }

    /// Sets the terminate handler.
    #[must_use]
    pub fn with_terminate_handler(mut self, handler: DataFlowHandler) -> Self {
        self.on_terminate = Some(handler);
        self
    }

    /// Sets the complete handler.
    #[must_use]
    pub fn with_complete_handler(mut self, handler: DataFlowHandler) -> Self {
        self.on_complete = Some(handler);
        self
    }

    /// Sets the recovery handler.
    #[must_use]
    pub fn with_recover_handler(mut self, handler: DataFlowHandler) -> Self {
        self.on_recover = Some(handler);
        self
    }

    /// Builds the engine.
    ///
    /// # Errors
    ///
    /// Returns [`DataPlaneError::InvalidInput`] when the store or the
    /// transaction context is missing.
    pub fn build(self) -> Result<DataPlaneSdk, DataPlaneError> {
        let Some(store) = self.store else {
            return Err(DataPlaneError::InvalidInput("store is required".to_string()));
        };
        let Some(trx_context) = self.trx_context else {
            return Err(DataPlaneError::InvalidInput(
                "transaction context is required".to_string(),
            ));
        };
        Ok(DataPlaneSdk {
            store,
            trx_context,
            monitor: self.monitor.unwrap_or_else(|| Arc::new(StderrMonitor)),
            runtime_id: self.runtime_id.unwrap_or_else(|| DEFAULT_RUNTIME_ID.to_string()),
            on_prepare: self.on_prepare.unwrap_or_else(default_prepare_processor),
            on_start: self.on_start.unwrap_or_else(default_start_processor),
            on_suspend: self.on_suspend.unwrap_or_else(noop_handler),
            on_terminate: self.on_terminate.unwrap_or_else(noop_handler),
            on_complete: self.on_complete.unwrap_or_else(noop_handler),
            on_recover: self.on_recover.unwrap_or_else(noop_handler),
        })
    }
}

/// Default prepare processor resolving directly to `Prepared`.
fn default_prepare_processor() -> DataFlowProcessor {
    Arc::new(|_ctx, flow, handle, _options| {
        Ok(DataFlowResponseMessage {
            dataplane_id: handle.runtime_id().to_string(),
            data_address: flow.destination_data_address.clone(),
            state: DataFlowState::Prepared,
            error: String::new(),
        })
    })
}

/// Default start processor resolving directly to `Started`.
fn default_start_processor() -> DataFlowProcessor {
    Arc::new(|_ctx, flow, handle, _options| {
        Ok(DataFlowResponseMessage {
            dataplane_id: handle.runtime_id().to_string(),
            data_address: flow.destination_data_address.clone(),
            state: DataFlowState::Started,
            error: String::new(),
        })
    })
}

/// Default no-op transition handler.
fn noop_handler() -> DataFlowHandler {
    Arc::new(|_ctx, _flow| Ok(()))
}
