// crates/dataplane-core/src/errors.rs
// ============================================================================
// Module: Error Taxonomy
// Description: Error kinds surfaced by the data-flow lifecycle engine.
// Purpose: Let callers match error kinds after context has been attached.
// Dependencies: thiserror
// ============================================================================

//! ## Overview
//! The engine, stores, and transaction contexts share a single error taxonomy.
//! Context strings are folded into the variant payload so that wrapping an
//! error never changes its kind; callers branch on [`DataPlaneError::kind`]
//! rather than parsing messages.

// ============================================================================
// SECTION: Imports
// ============================================================================

use thiserror::Error;

// ============================================================================
// SECTION: Error Kind
// ============================================================================

/// Classification of a [`DataPlaneError`], used for status mapping.
///
/// # Invariants
/// - Variants are stable; the signaling façade maps them to HTTP codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Structural message defect.
    Validation,
    /// Semantic precondition failed (empty id, wrong role, null entity).
    InvalidInput,
    /// Referenced data flow does not exist.
    NotFound,
    /// Existing data flow is in an incompatible state, or a duplicate create.
    Conflict,
    /// The state machine rejected a transition.
    InvalidTransition,
    /// The caller's cancellation or deadline fired.
    Cancelled,
    /// Store, processor, or other failure not covered above.
    Internal,
}

// ============================================================================
// SECTION: Data Plane Error
// ============================================================================

/// Error returned by engine, store, and transaction operations.
#[derive(Debug, Clone, Error)]
pub enum DataPlaneError {
    /// Structural message defect.
    #[error("validation error: {0}")]
    Validation(String),
    /// Semantic precondition failed.
    #[error("invalid input: {0}")]
    InvalidInput(String),
    /// Referenced data flow does not exist.
    #[error("not found: {0}")]
    NotFound(String),
    /// Existing data flow is in an incompatible state, or a duplicate create.
    #[error("conflict: {0}")]
    Conflict(String),
    /// The state machine rejected a transition.
    #[error("invalid transition: {0}")]
    InvalidTransition(String),
    /// The caller's cancellation or deadline fired.
    #[error("operation cancelled: {0}")]
    Cancelled(String),
    /// Store, processor, or other failure not covered above.
    #[error("internal error: {0}")]
    Internal(String),
}

impl DataPlaneError {
    /// Returns the kind of this error.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation(_) => ErrorKind::Validation,
            Self::InvalidInput(_) => ErrorKind::InvalidInput,
            Self::NotFound(_) => ErrorKind::NotFound,
            Self::Conflict(_) => ErrorKind::Conflict,
            Self::InvalidTransition(_) => ErrorKind::InvalidTransition,
            Self::Cancelled(_) => ErrorKind::Cancelled,
            Self::Internal(_) => ErrorKind::Internal,
        }
    }

    /// Returns true when the error is of the given kind.
    #[must_use]
    pub fn is_kind(&self, kind: ErrorKind) -> bool {
        self.kind() == kind
    }

    /// Prefixes the error message with context, preserving the kind.
    #[must_use]
    pub fn context(self, context: &str) -> Self {
        match self {
            Self::Validation(message) => Self::Validation(format!("{context}: {message}")),
            Self::InvalidInput(message) => Self::InvalidInput(format!("{context}: {message}")),
            Self::NotFound(message) => Self::NotFound(format!("{context}: {message}")),
            Self::Conflict(message) => Self::Conflict(format!("{context}: {message}")),
            Self::InvalidTransition(message) => {
                Self::InvalidTransition(format!("{context}: {message}"))
            }
            Self::Cancelled(message) => Self::Cancelled(format!("{context}: {message}")),
            Self::Internal(message) => Self::Internal(format!("{context}: {message}")),
        }
    }
}
