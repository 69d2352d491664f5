// crates/dataplane-core/src/runtime/store.rs
// ============================================================================
// Module: In-Memory Flow Store
// Description: Thread-safe in-memory implementation of the store contract.
// Purpose: Provide a deterministic store for tests, demos, and
//          single-process deployments.
// Dependencies: crate::core, crate::interfaces
// ============================================================================

//! ## Overview
//! The in-memory store keeps flows in a map behind a reader-writer lock and
//! exchanges deep copies on every read and write, so callers never alias the
//! stored entity. It is the backing for the in-memory transaction context,
//! which snapshots and restores the whole map around a unit of work.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::RwLock;

use crate::core::context::OperationContext;
use crate::core::flow::DataFlow;
use crate::core::time::epoch_millis;
use crate::errors::DataPlaneError;
use crate::interfaces::DataPlaneStore;
use crate::interfaces::FlowIterator;

// ============================================================================
// SECTION: In-Memory Store
// ============================================================================

/// In-memory flow store guarded by a reader-writer lock.
#[derive(Debug, Default)]
pub struct InMemoryFlowStore {
    /// Flow map keyed by flow id.
    flows: RwLock<BTreeMap<String, DataFlow>>,
}

impl InMemoryFlowStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Takes a deep copy of the whole map for transactional rollback.
    pub(crate) fn snapshot(&self) -> Result<BTreeMap<String, DataFlow>, DataPlaneError> {
        let guard = self
            .flows
            .read()
            .map_err(|_| DataPlaneError::Internal("flow store lock poisoned".to_string()))?;
        Ok(guard.clone())
    }

    /// Replaces the map with a previously taken snapshot.
    pub(crate) fn restore(
        &self,
        snapshot: BTreeMap<String, DataFlow>,
    ) -> Result<(), DataPlaneError> {
        let mut guard = self
            .flows
            .write()
            .map_err(|_| DataPlaneError::Internal("flow store lock poisoned".to_string()))?;
        *guard = snapshot;
        Ok(())
    }
}

impl DataPlaneStore for InMemoryFlowStore {
    fn find_by_id(&self, ctx: &OperationContext, id: &str) -> Result<DataFlow, DataPlaneError> {
        ctx.check()?;
        let guard = self
            .flows
            .read()
            .map_err(|_| DataPlaneError::Internal("flow store lock poisoned".to_string()))?;
        guard
            .get(id)
            .cloned()
            .ok_or_else(|| DataPlaneError::NotFound(format!("data flow {id}")))
    }

    fn create(&self, ctx: &OperationContext, flow: &DataFlow) -> Result<(), DataPlaneError> {
        ctx.check()?;
        if flow.id.is_empty() {
            return Err(DataPlaneError::InvalidInput("data flow id is empty".to_string()));
        }
        let mut guard = self
            .flows
            .write()
            .map_err(|_| DataPlaneError::Internal("flow store lock poisoned".to_string()))?;
        if guard.contains_key(&flow.id) {
            return Err(DataPlaneError::Conflict(format!("data flow {} already exists", flow.id)));
        }
        let mut stored = flow.clone();
        stored.updated_at = epoch_millis();
        guard.insert(stored.id.clone(), stored);
        Ok(())
    }

    fn save(&self, ctx: &OperationContext, flow: &DataFlow) -> Result<(), DataPlaneError> {
        ctx.check()?;
        if flow.id.is_empty() {
            return Err(DataPlaneError::InvalidInput("data flow id is empty".to_string()));
        }
        let mut guard = self
            .flows
            .write()
            .map_err(|_| DataPlaneError::Internal("flow store lock poisoned".to_string()))?;
        let Some(existing) = guard.get(&flow.id) else {
            return Err(DataPlaneError::NotFound(format!("data flow {}", flow.id)));
        };
        let mut stored = flow.clone();
        stored.version = existing.version + 1;
        stored.updated_at = epoch_millis();
        guard.insert(stored.id.clone(), stored);
        Ok(())
    }

    fn delete(&self, ctx: &OperationContext, id: &str) -> Result<(), DataPlaneError> {
        ctx.check()?;
        if id.is_empty() {
            return Err(DataPlaneError::InvalidInput("data flow id is empty".to_string()));
        }
        let mut guard = self
            .flows
            .write()
            .map_err(|_| DataPlaneError::Internal("flow store lock poisoned".to_string()))?;
        guard
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| DataPlaneError::NotFound(format!("data flow {id}")))
    }

    fn acquire_flows_for_recovery(&self, ctx: &OperationContext) -> Box<dyn FlowIterator> {
        if let Err(err) = ctx.check() {
            return Box::new(VecFlowIterator::failed(err));
        }
        let guard = match self.flows.read() {
            Ok(guard) => guard,
            Err(_) => {
                return Box::new(VecFlowIterator::failed(DataPlaneError::Internal(
                    "flow store lock poisoned".to_string(),
                )));
            }
        };
        let flows = guard.values().filter(|flow| flow.state.is_transient()).cloned().collect();
        Box::new(VecFlowIterator::from_flows(flows))
    }
}

// ============================================================================
// SECTION: Vec-Backed Iterator
// ============================================================================

/// Flow iterator over a materialized vector.
#[derive(Debug, Default)]
pub struct VecFlowIterator {
    /// Remaining elements.
    items: Vec<DataFlow>,
    /// Position of the current element.
    index: Option<usize>,
    /// Error that stopped iteration, if any.
    error: Option<DataPlaneError>,
}

impl VecFlowIterator {
    /// Creates an iterator over the given flows.
    #[must_use]
    pub fn from_flows(items: Vec<DataFlow>) -> Self {
        Self {
            items,
            index: None,
            error: None,
        }
    }

    /// Creates an already-failed iterator.
    #[must_use]
    pub fn failed(error: DataPlaneError) -> Self {
        Self {
            items: Vec::new(),
            index: None,
            error: Some(error),
        }
    }
}

impl FlowIterator for VecFlowIterator {
    fn advance(&mut self) -> bool {
        if self.error.is_some() {
            return false;
        }
        let next = self.index.map_or(0, |index| index + 1);
        if next < self.items.len() {
            self.index = Some(next);
            true
        } else {
            self.index = None;
            false
        }
    }

    fn current(&self) -> Option<&DataFlow> {
        self.index.and_then(|index| self.items.get(index))
    }

    fn error(&self) -> Option<&DataPlaneError> {
        self.error.as_ref()
    }

    fn close(&mut self) -> Result<(), DataPlaneError> {
        self.items.clear();
        self.index = None;
        Ok(())
    }
}

// ============================================================================
// SECTION: Shared Store Wrapper
// ============================================================================

/// Shared flow store backed by an `Arc` trait object.
#[derive(Clone)]
pub struct SharedFlowStore {
    /// Inner store implementation.
    inner: Arc<dyn DataPlaneStore>,
}

impl SharedFlowStore {
    /// Wraps a flow store in a shared, clonable wrapper.
    #[must_use]
    pub fn from_store(store: impl DataPlaneStore + 'static) -> Self {
        Self {
            inner: Arc::new(store),
        }
    }

    /// Wraps an existing shared store.
    #[must_use]
    pub const fn new(store: Arc<dyn DataPlaneStore>) -> Self {
        Self {
            inner: store,
        }
    }
}

impl DataPlaneStore for SharedFlowStore {
    fn find_by_id(&self, ctx: &OperationContext, id: &str) -> Result<DataFlow, DataPlaneError> {
        self.inner.find_by_id(ctx, id)
    }

    fn create(&self, ctx: &OperationContext, flow: &DataFlow) -> Result<(), DataPlaneError> {
        self.inner.create(ctx, flow)
    }

    fn save(&self, ctx: &OperationContext, flow: &DataFlow) -> Result<(), DataPlaneError> {
        self.inner.save(ctx, flow)
    }

    fn delete(&self, ctx: &OperationContext, id: &str) -> Result<(), DataPlaneError> {
        self.inner.delete(ctx, id)
    }

    fn acquire_flows_for_recovery(&self, ctx: &OperationContext) -> Box<dyn FlowIterator> {
        self.inner.acquire_flows_for_recovery(ctx)
    }
}
