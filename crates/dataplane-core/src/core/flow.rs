// crates/dataplane-core/src/core/flow.rs
// ============================================================================
// Module: Data Flow Entity
// Description: Data flow state, transition rules, and builder.
// Purpose: Enforce the lifecycle state machine with monotonic bookkeeping.
// Dependencies: serde, url, crate::core::{address, state, time}
// ============================================================================

//! ## Overview
//! A [`DataFlow`] represents one logical transfer session owned by this data
//! plane. All state changes go through the transition methods, which enforce
//! the permitted-transition matrix, keep `state_count` strictly increasing on
//! effective changes, and leave the entity untouched when a transition is
//! rejected. Self-transitions are accepted as idempotent no-ops.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;
use url::Url;

use crate::core::address::DataAddress;
use crate::core::address::TransferType;
use crate::core::state::DataFlowState;
use crate::core::time::epoch_millis;
use crate::errors::DataPlaneError;

// ============================================================================
// SECTION: Data Flow
// ============================================================================

/// One logical data-transfer session, identified by the control-plane
/// process id.
///
/// # Invariants
/// - `id` is non-empty.
/// - `state_count` strictly increases on every effective transition and is
///   unchanged by idempotent self-transitions.
/// - `state_timestamp` is non-decreasing across effective transitions.
/// - `consumer` is immutable after creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataFlow {
    /// Control-plane process id; primary key.
    pub id: String,
    /// Optimistic-concurrency counter, maintained by stores on save.
    pub version: i64,
    /// True when this endpoint is the data consumer.
    pub consumer: bool,
    /// Agreement identifier, carried verbatim.
    pub agreement_id: String,
    /// Dataset identifier, carried verbatim.
    pub dataset_id: String,
    /// Participant identifier, carried verbatim.
    pub participant_id: String,
    /// Counter-party identifier, carried verbatim.
    pub counter_party_id: String,
    /// Dataspace context, carried verbatim.
    pub dataspace_context: String,
    /// Identifier of the owning data-plane instance.
    pub runtime_id: String,
    /// Absolute URL used by transports to signal back.
    pub callback_address: Url,
    /// Requested transfer type.
    pub transfer_type: TransferType,
    /// Source endpoint description, when known.
    pub source_data_address: Option<DataAddress>,
    /// Destination endpoint description, when known.
    pub destination_data_address: Option<DataAddress>,
    /// Current lifecycle state.
    pub state: DataFlowState,
    /// Number of effective state changes.
    pub state_count: u64,
    /// Epoch milliseconds of the last effective state change.
    pub state_timestamp: i64,
    /// Reason recorded by suspension or termination.
    pub error_detail: String,
    /// Epoch milliseconds of creation.
    pub created_at: i64,
    /// Epoch milliseconds of the last persisted mutation.
    pub updated_at: i64,
}

impl DataFlow {
    /// Transitions to `Preparing`.
    ///
    /// # Errors
    ///
    /// Returns [`DataPlaneError::InvalidTransition`] when the current state
    /// does not permit it.
    pub fn transition_to_preparing(&mut self) -> Result<(), DataPlaneError> {
        self.transition(DataFlowState::Preparing, &[DataFlowState::Uninitialized])?;
        Ok(())
    }

    /// Transitions to `Prepared`.
    ///
    /// # Errors
    ///
    /// Returns [`DataPlaneError::InvalidTransition`] when the current state
    /// does not permit it.
    pub fn transition_to_prepared(&mut self) -> Result<(), DataPlaneError> {
        self.transition(
            DataFlowState::Prepared,
            &[DataFlowState::Uninitialized, DataFlowState::Preparing],
        )?;
        Ok(())
    }

    /// Transitions to `Starting`.
    ///
    /// # Errors
    ///
    /// Returns [`DataPlaneError::InvalidTransition`] when the current state
    /// does not permit it.
    pub fn transition_to_starting(&mut self) -> Result<(), DataPlaneError> {
        self.transition(
            DataFlowState::Starting,
            &[DataFlowState::Uninitialized, DataFlowState::Prepared],
        )?;
        Ok(())
    }

    /// Transitions to `Started`.
    ///
    /// # Errors
    ///
    /// Returns [`DataPlaneError::InvalidTransition`] when the current state
    /// does not permit it.
    pub fn transition_to_started(&mut self) -> Result<(), DataPlaneError> {
        self.transition(
            DataFlowState::Started,
            &[
                DataFlowState::Uninitialized,
                DataFlowState::Prepared,
                DataFlowState::Starting,
                DataFlowState::Suspended,
            ],
        )?;
        Ok(())
    }

    /// Transitions to `Suspended`, recording the reason.
    ///
    /// The reason is recorded only when the transition is effective; an
    /// idempotent self-transition leaves the existing detail in place.
    ///
    /// # Errors
    ///
    /// Returns [`DataPlaneError::InvalidTransition`] when the current state
    /// does not permit it.
    pub fn transition_to_suspended(&mut self, reason: &str) -> Result<(), DataPlaneError> {
        let effective = self.transition(DataFlowState::Suspended, &[DataFlowState::Started])?;
        if effective {
            self.error_detail = reason.to_string();
        }
        Ok(())
    }

    /// Transitions to `Completed`.
    ///
    /// # Errors
    ///
    /// Returns [`DataPlaneError::InvalidTransition`] when the current state
    /// does not permit it.
    pub fn transition_to_completed(&mut self) -> Result<(), DataPlaneError> {
        self.transition(DataFlowState::Completed, &[DataFlowState::Started])?;
        Ok(())
    }

    /// Transitions to `Terminated`, recording the reason.
    ///
    /// `Terminated` is reachable from every state and absorbing; repeating
    /// the transition is an idempotent no-op.
    ///
    /// # Errors
    ///
    /// Never fails; the signature matches the other transition methods.
    pub fn transition_to_terminated(&mut self, reason: &str) -> Result<(), DataPlaneError> {
        let effective = self.transition(
            DataFlowState::Terminated,
            &[
                DataFlowState::Uninitialized,
                DataFlowState::Preparing,
                DataFlowState::Prepared,
                DataFlowState::Starting,
                DataFlowState::Started,
                DataFlowState::Completed,
                DataFlowState::Suspended,
            ],
        )?;
        if effective {
            self.error_detail = reason.to_string();
        }
        Ok(())
    }

    /// Applies a transition when permitted.
    ///
    /// Returns true when the transition was effective, false for an
    /// idempotent self-transition. On rejection the entity is unchanged.
    fn transition(
        &mut self,
        target: DataFlowState,
        allowed_from: &[DataFlowState],
    ) -> Result<bool, DataPlaneError> {
        if self.state == target {
            return Ok(false);
        }
        if !allowed_from.contains(&self.state) {
            return Err(DataPlaneError::InvalidTransition(format!(
                "cannot transition from {} to {}",
                self.state, target
            )));
        }
        self.state = target;
        self.state_count += 1;
        self.state_timestamp = epoch_millis().max(self.state_timestamp);
        Ok(true)
    }
}

// ============================================================================
// SECTION: Builder
// ============================================================================

/// Fluent builder for [`DataFlow`].
///
/// `build` validates all required attributes at once and reports every
/// missing one in a single error.
#[derive(Debug, Default)]
pub struct DataFlowBuilder {
    id: String,
    consumer: bool,
    agreement_id: String,
    dataset_id: String,
    participant_id: String,
    counter_party_id: String,
    dataspace_context: String,
    runtime_id: String,
    callback_address: Option<Url>,
    transfer_type: Option<TransferType>,
    source_data_address: Option<DataAddress>,
    destination_data_address: Option<DataAddress>,
    state: DataFlowState,
    created_at: Option<i64>,
}

impl DataFlowBuilder {
    /// Creates an empty builder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the flow id (the control-plane process id).
    #[must_use]
    pub fn id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    /// Marks the flow as consumer- or provider-side.
    #[must_use]
    pub fn consumer(mut self, consumer: bool) -> Self {
        self.consumer = consumer;
        self
    }

    /// Sets the agreement id.
    #[must_use]
    pub fn agreement_id(mut self, id: impl Into<String>) -> Self {
        self.agreement_id = id.into();
        self
    }

    /// Sets the dataset id.
    #[must_use]
    pub fn dataset_id(mut self, id: impl Into<String>) -> Self {
        self.dataset_id = id.into();
        self
    }

    /// Sets the participant id.
    #[must_use]
    pub fn participant_id(mut self, id: impl Into<String>) -> Self {
        self.participant_id = id.into();
        self
    }

    /// Sets the counter-party id.
    #[must_use]
    pub fn counter_party_id(mut self, id: impl Into<String>) -> Self {
        self.counter_party_id = id.into();
        self
    }

    /// Sets the dataspace context.
    #[must_use]
    pub fn dataspace_context(mut self, context: impl Into<String>) -> Self {
        self.dataspace_context = context.into();
        self
    }

    /// Sets the owning data-plane instance id.
    #[must_use]
    pub fn runtime_id(mut self, id: impl Into<String>) -> Self {
        self.runtime_id = id.into();
        self
    }

    /// Sets the callback address.
    #[must_use]
    pub fn callback_address(mut self, address: Url) -> Self {
        self.callback_address = Some(address);
        self
    }

    /// Sets the transfer type.
    #[must_use]
    pub fn transfer_type(mut self, transfer_type: TransferType) -> Self {
        self.transfer_type = Some(transfer_type);
        self
    }

    /// Sets the source data address.
    #[must_use]
    pub fn source_data_address(mut self, address: DataAddress) -> Self {
        self.source_data_address = Some(address);
        self
    }

    /// Sets the destination data address.
    #[must_use]
    pub fn destination_data_address(mut self, address: DataAddress) -> Self {
        self.destination_data_address = Some(address);
        self
    }

    /// Sets the initial state.
    #[must_use]
    pub fn state(mut self, state: DataFlowState) -> Self {
        self.state = state;
        self
    }

    /// Overrides the creation timestamp (defaults to now).
    #[must_use]
    pub fn created_at(mut self, created_at: i64) -> Self {
        self.created_at = Some(created_at);
        self
    }

    /// Builds the flow, validating required attributes.
    ///
    /// # Errors
    ///
    /// Returns [`DataPlaneError::InvalidInput`] listing every missing
    /// attribute.
    pub fn build(self) -> Result<DataFlow, DataPlaneError> {
        let mut missing = Vec::new();
        if self.id.is_empty() {
            missing.push("id is required");
        }
        if self.participant_id.is_empty() {
            missing.push("participantId is required");
        }
        if self.counter_party_id.is_empty() {
            missing.push("counterPartyId is required");
        }
        if self.dataspace_context.is_empty() {
            missing.push("dataspaceContext is required");
        }
        if self.agreement_id.is_empty() {
            missing.push("agreementId is required");
        }
        if self.runtime_id.is_empty() {
            missing.push("runtimeId is required");
        }
        if self.callback_address.is_none() {
            missing.push("callbackAddress is required");
        }
        match &self.transfer_type {
            None => missing.push("transferType is required"),
            Some(transfer_type) if transfer_type.destination_type.is_empty() => {
                missing.push("transferType destination type is required");
            }
            Some(_) => {}
        }
        if !missing.is_empty() {
            return Err(DataPlaneError::InvalidInput(format!(
                "validation failed: [{}]",
                missing.join("; ")
            )));
        }

        let (Some(callback_address), Some(transfer_type)) =
            (self.callback_address, self.transfer_type)
        else {
            return Err(DataPlaneError::Internal(
                "data flow builder validation out of sync".to_string(),
            ));
        };

        let created_at = self.created_at.unwrap_or_else(epoch_millis);
        let state_timestamp = if self.state == DataFlowState::Uninitialized {
            0
        } else {
            created_at
        };
        Ok(DataFlow {
            id: self.id,
            version: 0,
            consumer: self.consumer,
            agreement_id: self.agreement_id,
            dataset_id: self.dataset_id,
            participant_id: self.participant_id,
            counter_party_id: self.counter_party_id,
            dataspace_context: self.dataspace_context,
            runtime_id: self.runtime_id,
            callback_address,
            transfer_type,
            source_data_address: self.source_data_address,
            destination_data_address: self.destination_data_address,
            state: self.state,
            state_count: 0,
            state_timestamp,
            error_detail: String::new(),
            created_at,
            updated_at: created_at,
        })
    }
}
