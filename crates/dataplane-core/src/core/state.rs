// crates/dataplane-core/src/core/state.rs
// ============================================================================
// Module: Data Flow States
// Description: Lifecycle states of a data flow and their wire encoding.
// Purpose: Provide the stable state codes shared by signaling and storage.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! Data flow states are encoded as stable integer codes on the wire and in
//! persistent stores. The codes are part of the signaling contract and must
//! never be renumbered.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;

use serde::Deserialize;
use serde::Deserializer;
use serde::Serialize;
use serde::Serializer;
use serde::de;

// ============================================================================
// SECTION: Data Flow State
// ============================================================================

/// Lifecycle state of a data flow.
///
/// # Invariants
/// - Integer codes are stable and form part of the persisted contract.
/// - `Terminated` is absorbing: no transition leaves it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DataFlowState {
    /// Flow has been constructed but not yet transitioned.
    Uninitialized,
    /// Consumer is provisioning resources for the transfer.
    Preparing,
    /// Consumer side is ready to receive data.
    Prepared,
    /// Transport is being started.
    Starting,
    /// Data is flowing.
    Started,
    /// Transfer finished successfully.
    Completed,
    /// Transfer is paused and may be resumed.
    Suspended,
    /// Transfer has been terminated; final state.
    Terminated,
}

impl DataFlowState {
    /// All states, in ascending code order.
    pub const ALL: [Self; 8] = [
        Self::Uninitialized,
        Self::Preparing,
        Self::Prepared,
        Self::Starting,
        Self::Started,
        Self::Completed,
        Self::Suspended,
        Self::Terminated,
    ];

    /// Returns the stable integer code for the state.
    #[must_use]
    pub const fn code(self) -> i64 {
        match self {
            Self::Uninitialized => 0,
            Self::Preparing => 50,
            Self::Prepared => 100,
            Self::Starting => 150,
            Self::Started => 200,
            Self::Completed => 250,
            Self::Suspended => 300,
            Self::Terminated => 350,
        }
    }

    /// Resolves a state from its stable integer code.
    #[must_use]
    pub const fn from_code(code: i64) -> Option<Self> {
        match code {
            0 => Some(Self::Uninitialized),
            50 => Some(Self::Preparing),
            100 => Some(Self::Prepared),
            150 => Some(Self::Starting),
            200 => Some(Self::Started),
            250 => Some(Self::Completed),
            300 => Some(Self::Suspended),
            350 => Some(Self::Terminated),
            _ => None,
        }
    }

    /// Returns the canonical upper-case name used in diagnostics.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Uninitialized => "UNINITIALIZED",
            Self::Preparing => "PREPARING",
            Self::Prepared => "PREPARED",
            Self::Starting => "STARTING",
            Self::Started => "STARTED",
            Self::Completed => "COMPLETED",
            Self::Suspended => "SUSPENDED",
            Self::Terminated => "TERMINATED",
        }
    }

    /// Returns true for states a recovery sweep should revisit.
    #[must_use]
    pub const fn is_transient(self) -> bool {
        matches!(self, Self::Preparing | Self::Starting | Self::Suspended)
    }
}

impl Default for DataFlowState {
    fn default() -> Self {
        Self::Uninitialized
    }
}

impl fmt::Display for DataFlowState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for DataFlowState {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_i64(self.code())
    }
}

impl<'de> Deserialize<'de> for DataFlowState {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let code = i64::deserialize(deserializer)?;
        Self::from_code(code)
            .ok_or_else(|| de::Error::custom(format!("unknown data flow state code {code}")))
    }
}
