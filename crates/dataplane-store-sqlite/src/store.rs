// crates/dataplane-store-sqlite/src/store.rs
// ============================================================================
// Module: SQLite Flow Store
// Description: Durable DataPlaneStore backed by SQLite, plus the matching
//              transaction context.
// Purpose: Persist data flows across restarts with real rollback semantics.
// Dependencies: dataplane-core, rusqlite, serde, serde_json, thiserror
// ============================================================================

//! ## Overview
//! This module implements the store contract on a single `data_flows` table.
//! The two data addresses are stored as JSON columns, the state as its
//! stable integer code, and timestamps as epoch milliseconds. `save` is
//! strict: updating a missing row fails with not-found instead of upserting.
//! The companion [`SqliteTransactionContext`] shares the store's connection
//! and brackets units of work with `BEGIN IMMEDIATE`/`COMMIT`, rolling back
//! on error and on panic.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::panic;
use std::panic::AssertUnwindSafe;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;
use std::sync::Mutex;
use std::time::Duration;

use dataplane_core::DataAddress;
use dataplane_core::DataFlow;
use dataplane_core::DataFlowState;
use dataplane_core::DataPlaneError;
use dataplane_core::DataPlaneStore;
use dataplane_core::FlowIterator;
use dataplane_core::FlowType;
use dataplane_core::OperationContext;
use dataplane_core::TransactionContext;
use dataplane_core::TransferType;
use dataplane_core::UnitOfWork;
use dataplane_core::VecFlowIterator;
use dataplane_core::core::time::epoch_millis;
use rusqlite::Connection;
use rusqlite::ErrorCode;
use rusqlite::OptionalExtension;
use rusqlite::params;
use serde::Deserialize;
use thiserror::Error;
use url::Url;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// `SQLite` schema version for the store.
const SCHEMA_VERSION: i64 = 1;
/// Default busy timeout (ms).
const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;

/// Stable integer codes of the states a recovery sweep revisits.
const TRANSIENT_STATE_CODES: [i64; 3] = [
    DataFlowState::Preparing.code(),
    DataFlowState::Starting.code(),
    DataFlowState::Suspended.code(),
];

// ============================================================================
// SECTION: Config
// ============================================================================

/// `SQLite` journal mode configuration.
///
/// # Invariants
/// - Values map 1:1 to `SQLite` `journal_mode` pragma settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SqliteJournalMode {
    /// WAL journal mode (recommended).
    #[default]
    Wal,
    /// Delete journal mode (legacy).
    Delete,
}

impl SqliteJournalMode {
    /// Returns the `SQLite` pragma value.
    #[must_use]
    pub const fn pragma_value(self) -> &'static str {
        match self {
            Self::Wal => "wal",
            Self::Delete => "delete",
        }
    }
}

/// Configuration for the `SQLite` flow store.
///
/// # Invariants
/// - `path` must resolve to a file path (not a directory).
/// - `busy_timeout_ms` is interpreted as milliseconds.
#[derive(Debug, Clone, Deserialize)]
pub struct SqliteStoreConfig {
    /// Path to the `SQLite` database file.
    pub path: PathBuf,
    /// Busy timeout in milliseconds.
    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,
    /// `SQLite` journal mode.
    #[serde(default)]
    pub journal_mode: SqliteJournalMode,
}

/// Returns the default busy timeout for `SQLite` connections.
const fn default_busy_timeout_ms() -> u64 {
    DEFAULT_BUSY_TIMEOUT_MS
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// `SQLite` store initialization errors.
#[derive(Debug, Error)]
pub enum SqliteStoreError {
    /// Database could not be opened or configured.
    #[error("sqlite store open failed: {0}")]
    Open(String),
    /// Schema creation or migration failed.
    #[error("sqlite store schema error: {0}")]
    Schema(String),
    /// Stored schema version is incompatible.
    #[error("sqlite store version mismatch: expected {expected}, found {found}")]
    VersionMismatch {
        /// Supported schema version.
        expected: i64,
        /// Version found in the database.
        found: i64,
    },
}

// ============================================================================
// SECTION: Schema
// ============================================================================

/// Table and index definitions for the flow store.
const SCHEMA_SQL: &str = "
CREATE TABLE IF NOT EXISTS data_flows (
    id                         TEXT PRIMARY KEY,
    version                    INTEGER NOT NULL,
    consumer                   INTEGER NOT NULL,
    agreement_id               TEXT NOT NULL,
    dataset_id                 TEXT NOT NULL,
    runtime_id                 TEXT NOT NULL,
    participant_id             TEXT NOT NULL,
    counter_party_id           TEXT NOT NULL,
    dataspace_context          TEXT NOT NULL,
    callback_address           TEXT NOT NULL,
    transfer_type_destination  TEXT NOT NULL,
    transfer_type_flow         TEXT NOT NULL,
    source_data_address        TEXT,
    destination_data_address   TEXT,
    state                      INTEGER NOT NULL,
    state_count                INTEGER NOT NULL,
    state_timestamp_ms         INTEGER NOT NULL,
    error_detail               TEXT NOT NULL,
    created_at_ms              INTEGER NOT NULL,
    updated_at_ms              INTEGER NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_data_flows_state ON data_flows(state);
CREATE INDEX IF NOT EXISTS idx_data_flows_updated_at ON data_flows(updated_at_ms);
CREATE INDEX IF NOT EXISTS idx_data_flows_agreement ON data_flows(agreement_id);
CREATE INDEX IF NOT EXISTS idx_data_flows_dataset ON data_flows(dataset_id);
CREATE INDEX IF NOT EXISTS idx_data_flows_participant ON data_flows(participant_id);
";

/// Column list shared by the select statements.
const SELECT_COLUMNS: &str = "id, version, consumer, agreement_id, dataset_id, runtime_id, \
     participant_id, counter_party_id, dataspace_context, callback_address, \
     transfer_type_destination, transfer_type_flow, source_data_address, \
     destination_data_address, state, state_count, state_timestamp_ms, error_detail, \
     created_at_ms, updated_at_ms";

// ============================================================================
// SECTION: Store
// ============================================================================

/// Durable flow store backed by a single `SQLite` database file.
pub struct SqliteFlowStore {
    /// Shared connection; `SQLite` transactions are per connection.
    conn: Arc<Mutex<Connection>>,
}

impl SqliteFlowStore {
    /// Opens (and if necessary initializes) the store.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteStoreError`] when the database cannot be opened, the
    /// schema cannot be created, or the stored schema version is
    /// incompatible.
    pub fn new(config: SqliteStoreConfig) -> Result<Self, SqliteStoreError> {
        let conn = Connection::open(&config.path)
            .map_err(|err| SqliteStoreError::Open(err.to_string()))?;
        conn.busy_timeout(Duration::from_millis(config.busy_timeout_ms))
            .map_err(|err| SqliteStoreError::Open(err.to_string()))?;
        conn.pragma_update(None, "journal_mode", config.journal_mode.pragma_value())
            .map_err(|err| SqliteStoreError::Open(err.to_string()))?;
        conn.pragma_update(None, "synchronous", "full")
            .map_err(|err| SqliteStoreError::Open(err.to_string()))?;

        let found: i64 = conn
            .pragma_query_value(None, "user_version", |row| row.get(0))
            .map_err(|err| SqliteStoreError::Schema(err.to_string()))?;
        match found {
            0 => {
                conn.execute_batch(SCHEMA_SQL)
                    .map_err(|err| SqliteStoreError::Schema(err.to_string()))?;
                conn.pragma_update(None, "user_version", SCHEMA_VERSION)
                    .map_err(|err| SqliteStoreError::Schema(err.to_string()))?;
            }
            version if version == SCHEMA_VERSION => {}
            version => {
                return Err(SqliteStoreError::VersionMismatch {
                    expected: SCHEMA_VERSION,
                    found: version,
                });
            }
        }
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Returns a transaction context sharing this store's connection.
    #[must_use]
    pub fn transaction_context(&self) -> SqliteTransactionContext {
        SqliteTransactionContext {
            conn: Arc::clone(&self.conn),
            gate: Mutex::new(()),
        }
    }

    /// Locks the shared connection.
    fn lock_conn(&self) -> Result<std::sync::MutexGuard<'_, Connection>, DataPlaneError> {
        self.conn
            .lock()
            .map_err(|_| DataPlaneError::Internal("sqlite connection poisoned".to_string()))
    }
}

impl DataPlaneStore for SqliteFlowStore {
    fn find_by_id(&self, ctx: &OperationContext, id: &str) -> Result<DataFlow, DataPlaneError> {
        ctx.check()?;
        let conn = self.lock_conn()?;
        let sql = format!("SELECT {SELECT_COLUMNS} FROM data_flows WHERE id = ?1");
        let row = conn
            .query_row(&sql, params![id], read_row)
            .optional()
            .map_err(|err| DataPlaneError::Internal(format!("sqlite query failed: {err}")))?;
        drop(conn);
        match row {
            Some(row) => decode_flow(row),
            None => Err(DataPlaneError::NotFound(format!("data flow {id}"))),
        }
    }

    fn create(&self, ctx: &OperationContext, flow: &DataFlow) -> Result<(), DataPlaneError> {
        ctx.check()?;
        if flow.id.is_empty() {
            return Err(DataPlaneError::InvalidInput("data flow id is empty".to_string()));
        }
        let source = encode_address(flow.source_data_address.as_ref())?;
        let destination = encode_address(flow.destination_data_address.as_ref())?;
        let conn = self.lock_conn()?;
        let result = conn.execute(
            "INSERT INTO data_flows (
                id, version, consumer, agreement_id, dataset_id, runtime_id,
                participant_id, counter_party_id, dataspace_context, callback_address,
                transfer_type_destination, transfer_type_flow, source_data_address,
                destination_data_address, state, state_count, state_timestamp_ms,
                error_detail, created_at_ms, updated_at_ms
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14,
                      ?15, ?16, ?17, ?18, ?19, ?20)",
            params![
                flow.id,
                flow.version,
                flow.consumer,
                flow.agreement_id,
                flow.dataset_id,
                flow.runtime_id,
                flow.participant_id,
                flow.counter_party_id,
                flow.dataspace_context,
                flow.callback_address.as_str(),
                flow.transfer_type.destination_type,
                flow.transfer_type.flow_type.to_string(),
                source,
                destination,
                flow.state.code(),
                i64::try_from(flow.state_count).unwrap_or(i64::MAX),
                flow.state_timestamp,
                flow.error_detail,
                flow.created_at,
                epoch_millis(),
            ],
        );
        match result {
            Ok(_) => Ok(()),
            Err(err) if is_unique_violation(&err) => {
                Err(DataPlaneError::Conflict(format!("data flow {} already exists", flow.id)))
            }
            Err(err) => Err(DataPlaneError::Internal(format!("sqlite insert failed: {err}"))),
        }
    }

    fn save(&self, ctx: &OperationContext, flow: &DataFlow) -> Result<(), DataPlaneError> {
        ctx.check()?;
        if flow.id.is_empty() {
            return Err(DataPlaneError::InvalidInput("data flow id is empty".to_string()));
        }
        let source = encode_address(flow.source_data_address.as_ref())?;
        let destination = encode_address(flow.destination_data_address.as_ref())?;
        let conn = self.lock_conn()?;
        let updated = conn
            .execute(
                "UPDATE data_flows
                 SET version = version + 1,
                     consumer = ?1,
                     agreement_id = ?2,
                     dataset_id = ?3,
                     runtime_id = ?4,
                     participant_id = ?5,
                     counter_party_id = ?6,
                     dataspace_context = ?7,
                     callback_address = ?8,
                     transfer_type_destination = ?9,
                     transfer_type_flow = ?10,
                     source_data_address = ?11,
                     destination_data_address = ?12,
                     state = ?13,
                     state_count = ?14,
                     state_timestamp_ms = ?15,
                     error_detail = ?16,
                     updated_at_ms = ?17
                 WHERE id = ?18",
                params![
                    flow.consumer,
                    flow.agreement_id,
                    flow.dataset_id,
                    flow.runtime_id,
                    flow.participant_id,
                    flow.counter_party_id,
                    flow.dataspace_context,
                    flow.callback_address.as_str(),
                    flow.transfer_type.destination_type,
                    flow.transfer_type.flow_type.to_string(),
                    source,
                    destination,
                    flow.state.code(),
                    i64::try_from(flow.state_count).unwrap_or(i64::MAX),
                    flow.state_timestamp,
                    flow.error_detail,
                    epoch_millis(),
                    flow.id,
                ],
            )
            .map_err(|err| DataPlaneError::Internal(format!("sqlite update failed: {err}")))?;
        if updated == 0 {
            return Err(DataPlaneError::NotFound(format!("data flow {}", flow.id)));
        }
        Ok(())
    }

    fn delete(&self, ctx: &OperationContext, id: &str) -> Result<(), DataPlaneError> {
        ctx.check()?;
        if id.is_empty() {
            return Err(DataPlaneError::InvalidInput("data flow id is empty".to_string()));
        }
        let conn = self.lock_conn()?;
        let deleted = conn
            .execute("DELETE FROM data_flows WHERE id = ?1", params![id])
            .map_err(|err| DataPlaneError::Internal(format!("sqlite delete failed: {err}")))?;
        if deleted == 0 {
            return Err(DataPlaneError::NotFound(format!("data flow {id}")));
        }
        Ok(())
    }

    fn acquire_flows_for_recovery(&self, ctx: &OperationContext) -> Box<dyn FlowIterator> {
        if let Err(err) = ctx.check() {
            return Box::new(VecFlowIterator::failed(err));
        }
        match self.query_transient_flows() {
            Ok(flows) => Box::new(VecFlowIterator::from_flows(flows)),
            Err(err) => Box::new(VecFlowIterator::failed(err)),
        }
    }
}

impl SqliteFlowStore {
    /// Materializes all flows in transient states, ordered by id.
    fn query_transient_flows(&self) -> Result<Vec<DataFlow>, DataPlaneError> {
        let conn = self.lock_conn()?;
        let sql = format!(
            "SELECT {SELECT_COLUMNS} FROM data_flows WHERE state IN (?1, ?2, ?3) ORDER BY id"
        );
        let mut statement = conn
            .prepare(&sql)
            .map_err(|err| DataPlaneError::Internal(format!("sqlite query failed: {err}")))?;
        let rows = statement
            .query_map(
                params![
                    TRANSIENT_STATE_CODES[0],
                    TRANSIENT_STATE_CODES[1],
                    TRANSIENT_STATE_CODES[2]
                ],
                read_row,
            )
            .map_err(|err| DataPlaneError::Internal(format!("sqlite query failed: {err}")))?;
        let mut flows = Vec::new();
        for row in rows {
            let row = row
                .map_err(|err| DataPlaneError::Internal(format!("sqlite query failed: {err}")))?;
            flows.push(decode_flow(row)?);
        }
        Ok(flows)
    }
}

// ============================================================================
// SECTION: Row Mapping
// ============================================================================

/// Raw column values of one `data_flows` row.
struct FlowRow {
    id: String,
    version: i64,
    consumer: bool,
    agreement_id: String,
    dataset_id: String,
    runtime_id: String,
    participant_id: String,
    counter_party_id: String,
    dataspace_context: String,
    callback_address: String,
    destination_type: String,
    flow_type: String,
    source_data_address: Option<String>,
    destination_data_address: Option<String>,
    state: i64,
    state_count: i64,
    state_timestamp: i64,
    error_detail: String,
    created_at: i64,
    updated_at: i64,
}

/// Reads the raw column values in `SELECT_COLUMNS` order.
fn read_row(row: &rusqlite::Row<'_>) -> Result<FlowRow, rusqlite::Error> {
    Ok(FlowRow {
        id: row.get(0)?,
        version: row.get(1)?,
        consumer: row.get(2)?,
        agreement_id: row.get(3)?,
        dataset_id: row.get(4)?,
        runtime_id: row.get(5)?,
        participant_id: row.get(6)?,
        counter_party_id: row.get(7)?,
        dataspace_context: row.get(8)?,
        callback_address: row.get(9)?,
        destination_type: row.get(10)?,
        flow_type: row.get(11)?,
        source_data_address: row.get(12)?,
        destination_data_address: row.get(13)?,
        state: row.get(14)?,
        state_count: row.get(15)?,
        state_timestamp: row.get(16)?,
        error_detail: row.get(17)?,
        created_at: row.get(18)?,
        updated_at: row.get(19)?,
    })
}

/// Decodes a raw row into the entity, failing closed on corrupt data.
fn decode_flow(row: FlowRow) -> Result<DataFlow, DataPlaneError> {
    let state = DataFlowState::from_code(row.state).ok_or_else(|| {
        DataPlaneError::Internal(format!(
            "corrupt data flow {}: unknown state code {}",
            row.id, row.state
        ))
    })?;
    let callback_address = Url::parse(&row.callback_address).map_err(|err| {
        DataPlaneError::Internal(format!("corrupt data flow {}: callback address: {err}", row.id))
    })?;
    let flow_type = FlowType::from_str(&row.flow_type).map_err(|err| {
        DataPlaneError::Internal(format!("corrupt data flow {}: {err}", row.id))
    })?;
    let source_data_address = decode_address(&row.id, row.source_data_address.as_deref())?;
    let destination_data_address =
        decode_address(&row.id, row.destination_data_address.as_deref())?;
    Ok(DataFlow {
        id: row.id,
        version: row.version,
        consumer: row.consumer,
        agreement_id: row.agreement_id,
        dataset_id: row.dataset_id,
        participant_id: row.participant_id,
        counter_party_id: row.counter_party_id,
        dataspace_context: row.dataspace_context,
        runtime_id: row.runtime_id,
        callback_address,
        transfer_type: TransferType {
            destination_type: row.destination_type,
            flow_type,
        },
        source_data_address,
        destination_data_address,
        state,
        state_count: u64::try_from(row.state_count).unwrap_or_default(),
        state_timestamp: row.state_timestamp,
        error_detail: row.error_detail,
        created_at: row.created_at,
        updated_at: row.updated_at,
    })
}

/// Encodes an optional data address into its JSON column value.
fn encode_address(address: Option<&DataAddress>) -> Result<Option<String>, DataPlaneError> {
    address
        .map(|address| {
            serde_json::to_string(address).map_err(|err| {
                DataPlaneError::Internal(format!("encoding data address: {err}"))
            })
        })
        .transpose()
}

/// Decodes an optional JSON column value into a data address.
fn decode_address(id: &str, value: Option<&str>) -> Result<Option<DataAddress>, DataPlaneError> {
    value
        .map(|value| {
            serde_json::from_str(value).map_err(|err| {
                DataPlaneError::Internal(format!("corrupt data flow {id}: data address: {err}"))
            })
        })
        .transpose()
}

/// Detects `SQLite` unique-constraint violations on insert.
fn is_unique_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(failure, _)
            if failure.code == ErrorCode::ConstraintViolation
    )
}

// ============================================================================
// SECTION: Transaction Context
// ============================================================================

/// Transactional executor sharing the store's connection.
///
/// Units of work are serialized on an internal gate; the context must not be
/// re-entered from within a unit of work.
pub struct SqliteTransactionContext {
    /// Connection shared with the store.
    conn: Arc<Mutex<Connection>>,
    /// Gate serializing units of work.
    gate: Mutex<()>,
}

impl SqliteTransactionContext {
    /// Runs a statement batch on the shared connection.
    fn run_sql(&self, sql: &str) -> Result<(), DataPlaneError> {
        let conn = self
            .conn
            .lock()
            .map_err(|_| DataPlaneError::Internal("sqlite connection poisoned".to_string()))?;
        conn.execute_batch(sql)
            .map_err(|err| DataPlaneError::Internal(format!("sqlite {sql} failed: {err}")))
    }
}

impl TransactionContext for SqliteTransactionContext {
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
        self.run_sql("BEGIN IMMEDIATE")?;
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| work(ctx)));
        match outcome {
            Ok(Ok(())) => self.run_sql("COMMIT"),
            Ok(Err(err)) => {
                if let Err(rollback_err) = self.run_sql("ROLLBACK") {
                    return Err(DataPlaneError::Internal(format!(
                        "operation failed: {err}, rollback failed: {rollback_err}"
                    )));
                }
                Err(err)
            }
            Err(payload) => {
                // Roll back before re-raising so partial mutations never
                // persist; release the gate first so it is not poisoned.
                let _ = self.run_sql("ROLLBACK");
                drop(guard);
                panic::resume_unwind(payload);
            }
        }
    }
}
