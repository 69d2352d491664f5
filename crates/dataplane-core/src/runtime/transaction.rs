// crates/dataplane-core/src/runtime/transaction.rs
// ============================================================================
// Module: In-Memory Transaction Context
// Description: Snapshot-based transactional executor for the in-memory store.
// Purpose: Give the in-memory store the same rollback guarantees as a
//          relational deployment.
// Dependencies: crate::interfaces, crate::runtime::store
// ============================================================================

//! ## Overview
//! The in-memory transaction context snapshots the backing store before the
//! unit of work runs and restores the snapshot when the work returns an
//! error or panics (the panic is re-raised after rollback). Units of work
//! are serialized on an internal gate, which also yields the per-flow
//! serialization the engine relies on. The context is not re-entrant: a unit
//! of work must not call `execute` again.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::panic;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::sync::Mutex;

use crate::core::context::OperationContext;
use crate::errors::DataPlaneError;
use crate::interfaces::TransactionContext;
use crate::interfaces::UnitOfWork;
use crate::runtime::store::InMemoryFlowStore;

// ============================================================================
// SECTION: In-Memory Transaction Context
// ============================================================================

/// Transactional executor backed by store snapshots.
pub struct InMemoryTransactionContext {
    /// Store the snapshots are taken from.
    store: Arc<InMemoryFlowStore>,
    /// Gate serializing units of work.
    gate: Mutex<()>,
}

impl InMemoryTransactionContext {
    /// Creates a transaction context over the given store.
    #[must_use]
    pub fn new(store: Arc<InMemoryFlowStore>) -> Self {
        Self {
            store,
            gate: Mutex::new(()),
        }
    }
}

impl TransactionContext for InMemoryTransactionContext {
    fn execute(
        &self,
        ctx: &OperationContext,
        work: &mut UnitOfWork<'_>,
    ) -> Result<(), DataPlaneError> {
        let guard = self
            .gate
            .lock()
            .map_err(|_| DataPlaneError::Internal("transaction gate poisoned".to_string()))?;
        ctx.check()?;
        let snapshot = self.store.snapshot()?;
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| work(ctx)));
        match outcome {
            Ok(Ok(())) => Ok(()),
            Ok(Err(err)) => {
                self.store.restore(snapshot)?;
                Err(err)
            }
            Err(payload) => {
                // Restore before re-raising so partial mutations never persist;
                // release the gate first so it is not poisoned by the unwind.
                let _ = self.store.restore(snapshot);
                drop(guard);
                panic::resume_unwind(payload);
            }
        }
    }
}
