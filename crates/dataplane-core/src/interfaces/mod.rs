// crates/dataplane-core/src/interfaces/mod.rs
// ============================================================================
// Module: Data Plane Interfaces
// Description: Backend-agnostic contracts for storage, transactions, and
//              logging.
// Purpose: Define the seams through which stores and deployments plug in.
// Dependencies: crate::core, crate::errors
// ============================================================================

//! ## Overview
//! Interfaces define how the lifecycle engine integrates with persistence and
//! observability without embedding backend details. Store implementations
//! must be safe for concurrent callers and must return copies that the
//! caller may mutate freely.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;

use crate::core::context::OperationContext;
use crate::core::flow::DataFlow;
use crate::errors::DataPlaneError;

// ============================================================================
// SECTION: Store
// ============================================================================

/// Persistent mapping from flow id to [`DataFlow`].
///
/// # Invariants
/// - Implementations are safe for concurrent callers.
/// - Reads return copies; writes store copies (no aliasing with callers).
/// - `save` refreshes `updated_at` and increments `version`.
pub trait DataPlaneStore: Send + Sync {
    /// Returns the flow with the given id.
    ///
    /// # Errors
    ///
    /// Returns [`DataPlaneError::NotFound`] when no flow has the id.
    fn find_by_id(&self, ctx: &OperationContext, id: &str) -> Result<DataFlow, DataPlaneError>;

    /// Inserts a new flow.
    ///
    /// # Errors
    ///
    /// Returns [`DataPlaneError::Conflict`] when the id already exists and
    /// [`DataPlaneError::InvalidInput`] when the id is empty.
    fn create(&self, ctx: &OperationContext, flow: &DataFlow) -> Result<(), DataPlaneError>;

    /// Updates an existing flow by id.
    ///
    /// # Errors
    ///
    /// Returns [`DataPlaneError::NotFound`] when no flow has the id and
    /// [`DataPlaneError::InvalidInput`] when the id is empty.
    fn save(&self, ctx: &OperationContext, flow: &DataFlow) -> Result<(), DataPlaneError>;

    /// Deletes the flow with the given id.
    ///
    /// # Errors
    ///
    /// Returns [`DataPlaneError::NotFound`] when no flow has the id and
    /// [`DataPlaneError::InvalidInput`] when the id is empty.
    fn delete(&self, ctx: &OperationContext, id: &str) -> Result<(), DataPlaneError>;

    /// Returns an iterator over flows in transient states that a recovery
    /// sweep should revisit.
    fn acquire_flows_for_recovery(&self, ctx: &OperationContext) -> Box<dyn FlowIterator>;
}

// ============================================================================
// SECTION: Transaction Context
// ============================================================================

/// Unit of work executed within a transaction.
pub type UnitOfWork<'a> = dyn FnMut(&OperationContext) -> Result<(), DataPlaneError> + 'a;

/// Transactional executor for units of work against the store.
///
/// Implementations guarantee that a successful return commits all store
/// mutations performed by `work`, and that an error return or a panic rolls
/// every one of them back (panics are re-raised after rollback).
///
/// The provided implementations serialize units of work internally and must
/// not be re-entered from within `work`.
pub trait TransactionContext: Send + Sync {
    /// Runs `work` atomically.
    ///
    /// # Errors
    ///
    /// Propagates the error returned by `work` unchanged; infrastructure
    /// failures surface as [`DataPlaneError::Internal`].
    fn execute(
        &self,
        ctx: &OperationContext,
        work: &mut UnitOfWork<'_>,
    ) -> Result<(), DataPlaneError>;
}

// ============================================================================
// SECTION: Flow Iterator
// ============================================================================

/// Lazy, forward-only, finite sequence of flows.
///
/// Callers alternate `advance` and `current`, inspect `error` when
/// `advance` returns false, and `close` when done.
pub trait FlowIterator {
    /// Advances to the next element; returns false when exhausted or failed.
    fn advance(&mut self) -> bool;

    /// Returns the current element, if positioned on one.
    fn current(&self) -> Option<&DataFlow>;

    /// Returns the error that stopped iteration, if any.
    fn error(&self) -> Option<&DataPlaneError>;

    /// Releases resources associated with the iterator.
    ///
    /// # Errors
    ///
    /// Returns [`DataPlaneError`] when releasing fails.
    fn close(&mut self) -> Result<(), DataPlaneError>;
}

// ============================================================================
// SECTION: Monitor
// ============================================================================

/// Process-wide logging abstraction.
///
/// Deployments replace this to route engine diagnostics into their logging
/// pipeline; the default writes to standard error.
pub trait Monitor: Send + Sync {
    /// Prints a single line.
    fn println(&self, message: &str);

    /// Prints a formatted line.
    fn printf(&self, args: fmt::Arguments<'_>);
}

/// Monitor writing one line per message to standard error.
pub struct StderrMonitor;

impl Monitor for StderrMonitor {
    fn println(&self, message: &str) {
        eprintln!("{message}");
    }

    fn printf(&self, args: fmt::Arguments<'_>) {
        eprintln!("{args}");
    }
}

/// Monitor that discards all output.
pub struct NoopMonitor;

impl Monitor for NoopMonitor {
    fn println(&self, _message: &str) {}

    fn printf(&self, _args: fmt::Arguments<'_>) {}
}
