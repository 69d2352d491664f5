// crates/dataplane-core/src/messages.rs
// ============================================================================
// Module: Signaling Messages
// Description: Typed signaling messages and their structural validation.
// Purpose: Bound the lifecycle engine with a validated message surface.
// Dependencies: serde, url, crate::core
// ============================================================================

//! ## Overview
//! Signaling messages are decoded from JSON with unknown fields ignored and
//! validated as a pure function over the decoded structure before the engine
//! sees them. Validation collects every structural defect into a single
//! [`DataPlaneError::Validation`] so control planes get one actionable error.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;
use url::Url;

use crate::core::address::DataAddress;
use crate::core::address::TransferType;
use crate::core::state::DataFlowState;
use crate::errors::DataPlaneError;

// ============================================================================
// SECTION: Base Message
// ============================================================================

/// Fields shared by prepare and start messages.
///
/// # Invariants
/// - `callback_address` must be a non-blank absolute URL after validation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataFlowBaseMessage {
    /// Message identifier assigned by the control plane.
    #[serde(default)]
    pub message_id: String,
    /// Participant identifier.
    #[serde(default)]
    pub participant_id: String,
    /// Counter-party identifier.
    #[serde(default)]
    pub counter_party_id: String,
    /// Dataspace context.
    #[serde(default)]
    pub dataspace_context: String,
    /// Process id identifying the data flow.
    #[serde(default)]
    pub process_id: String,
    /// Agreement identifier.
    #[serde(default)]
    pub agreement_id: String,
    /// Optional dataset identifier.
    #[serde(default)]
    pub dataset_id: String,
    /// Callback address; validated as an absolute URL.
    #[serde(default)]
    pub callback_address: String,
    /// Requested transfer type.
    #[serde(default)]
    pub transfer_type: Option<TransferType>,
    /// Optional endpoint description attached to the message.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_address: Option<DataAddress>,
}

impl DataFlowBaseMessage {
    /// Validates the structural requirements of the message.
    ///
    /// # Errors
    ///
    /// Returns [`DataPlaneError::Validation`] listing every defect.
    pub fn validate(&self) -> Result<(), DataPlaneError> {
        let mut defects = Vec::new();
        if self.message_id.is_empty() {
            defects.push("messageId is required".to_string());
        }
        if self.participant_id.is_empty() {
            defects.push("participantId is required".to_string());
        }
        if self.counter_party_id.is_empty() {
            defects.push("counterPartyId is required".to_string());
        }
        if self.dataspace_context.is_empty() {
            defects.push("dataspaceContext is required".to_string());
        }
        if self.process_id.is_empty() {
            defects.push("processId is required".to_string());
        }
        if self.agreement_id.is_empty() {
            defects.push("agreementId is required".to_string());
        }
        if self.callback_address.trim().is_empty() {
            defects.push("callbackAddress is required".to_string());
        } else if let Err(err) = Url::parse(&self.callback_address) {
            defects.push(format!("callbackAddress is not an absolute URL: {err}"));
        }
        match &self.transfer_type {
            None => defects.push("transferType is required".to_string()),
            Some(transfer_type) if transfer_type.destination_type.is_empty() => {
                defects.push("transferType destination type is required".to_string());
            }
            Some(_) => {}
        }
        if defects.is_empty() {
            Ok(())
        } else {
            Err(DataPlaneError::Validation(defects.join("; ")))
        }
    }

    /// Returns the callback address as a parsed URL.
    ///
    /// # Errors
    ///
    /// Returns [`DataPlaneError::Validation`] when the address does not
    /// parse; `validate` catches this earlier on the request path.
    pub fn callback_url(&self) -> Result<Url, DataPlaneError> {
        Url::parse(&self.callback_address).map_err(|err| {
            DataPlaneError::Validation(format!("callbackAddress is not an absolute URL: {err}"))
        })
    }
}

// ============================================================================
// SECTION: Request Messages
// ============================================================================

/// Consumer-side request to prepare for receiving data.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DataFlowPrepareMessage {
    /// Shared signaling fields.
    #[serde(flatten)]
    pub base: DataFlowBaseMessage,
}

impl DataFlowPrepareMessage {
    /// Validates the message.
    ///
    /// # Errors
    ///
    /// Returns [`DataPlaneError::Validation`] listing every defect.
    pub fn validate(&self) -> Result<(), DataPlaneError> {
        self.base.validate()
    }
}

/// Request to start a data flow (provider side, or consumer advance).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DataFlowStartMessage {
    /// Shared signaling fields.
    #[serde(flatten)]
    pub base: DataFlowBaseMessage,
}

impl DataFlowStartMessage {
    /// Validates the message.
    ///
    /// # Errors
    ///
    /// Returns [`DataPlaneError::Validation`] listing every defect.
    pub fn validate(&self) -> Result<(), DataPlaneError> {
        self.base.validate()
    }
}

/// Out-of-band notification that the provider has started the flow.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataFlowStartedNotificationMessage {
    /// Source endpoint description supplied by the provider.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_address: Option<DataAddress>,
}

impl DataFlowStartedNotificationMessage {
    /// Validates the message; the payload has no required fields.
    ///
    /// # Errors
    ///
    /// Currently never fails.
    pub fn validate(&self) -> Result<(), DataPlaneError> {
        Ok(())
    }
}

/// Optional body for suspend and terminate requests.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataFlowTransitionMessage {
    /// Reason recorded on the flow.
    #[serde(default)]
    pub reason: String,
}

impl DataFlowTransitionMessage {
    /// Validates the message; the payload has no required fields.
    ///
    /// # Errors
    ///
    /// Currently never fails.
    pub fn validate(&self) -> Result<(), DataPlaneError> {
        Ok(())
    }
}

// ============================================================================
// SECTION: Response Messages
// ============================================================================

/// Response produced by processors and returned to the control plane.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataFlowResponseMessage {
    /// Identifier of the responding data-plane instance.
    #[serde(default)]
    pub dataplane_id: String,
    /// Endpoint description handed back to the counter-party.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_address: Option<DataAddress>,
    /// State the flow reached.
    #[serde(default)]
    pub state: DataFlowState,
    /// Error detail for failed requests.
    #[serde(default)]
    pub error: String,
}

impl DataFlowResponseMessage {
    /// Builds an error response with no flow context.
    #[must_use]
    pub fn for_error(message: impl Into<String>) -> Self {
        Self {
            dataplane_id: String::new(),
            data_address: None,
            state: DataFlowState::Uninitialized,
            error: message.into(),
        }
    }
}

impl Default for DataFlowResponseMessage {
    fn default() -> Self {
        Self {
            dataplane_id: String::new(),
            data_address: None,
            state: DataFlowState::Uninitialized,
            error: String::new(),
        }
    }
}

/// Response for status lookups.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataFlowStatusResponseMessage {
    /// Current state of the flow.
    pub state: DataFlowState,
    /// Identifier of the flow.
    pub data_flow_id: String,
}
