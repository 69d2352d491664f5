// crates/dataplane-core/src/core/context.rs
// ============================================================================
// Module: Operation Context
// Description: Cancellation and deadline handle for engine operations.
// Purpose: Let callers abort lifecycle operations before or during a
//          transaction without binding the core to an async runtime.
// ============================================================================

//! ## Overview
//! Every engine operation takes an [`OperationContext`]. The engine checks it
//! before opening a transaction and propagates it into store calls and
//! processors; long-running processors are expected to poll it. The handle is
//! clonable and shares its state across clones.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering;
use std::time::Duration;
use std::time::Instant;

use crate::errors::DataPlaneError;

// ============================================================================
// SECTION: Operation Context
// ============================================================================

/// Shared cancellation state.
#[derive(Debug, Default)]
struct ContextInner {
    /// Explicit cancellation flag.
    cancelled: AtomicBool,
    /// Optional absolute deadline.
    deadline: Option<Instant>,
}

/// Cancellation and deadline handle passed through engine operations.
#[derive(Debug, Clone, Default)]
pub struct OperationContext {
    /// Shared state across clones.
    inner: Arc<ContextInner>,
}

impl OperationContext {
    /// Creates a context that never expires.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a context that expires after `timeout`.
    #[must_use]
    pub fn with_deadline(timeout: Duration) -> Self {
        Self {
            inner: Arc::new(ContextInner {
                cancelled: AtomicBool::new(false),
                deadline: Some(Instant::now() + timeout),
            }),
        }
    }

    /// Cancels the context; all clones observe the cancellation.
    pub fn cancel(&self) {
        self.inner.cancelled.store(true, Ordering::SeqCst);
    }

    /// Returns true when cancelled or past the deadline.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        if self.inner.cancelled.load(Ordering::SeqCst) {
            return true;
        }
        self.inner.deadline.is_some_and(|deadline| Instant::now() >= deadline)
    }

    /// Fails fast when the context is cancelled.
    ///
    /// # Errors
    ///
    /// Returns [`DataPlaneError::Cancelled`] when cancelled or expired.
    pub fn check(&self) -> Result<(), DataPlaneError> {
        if self.is_cancelled() {
            return Err(DataPlaneError::Cancelled("context cancelled".to_string()));
        }
        Ok(())
    }
}
