// crates/dataplane-signaling/src/server.rs
// ============================================================================
// Module: Signaling Server
// Description: HTTP facade mapping signaling endpoints onto the engine.
// Purpose: Deserialize, validate, and route control-plane calls.
// Dependencies: dataplane-core, dataplane-store-sqlite, axum, tokio, uuid
// ============================================================================

//! ## Overview
//! The signaling server is a thin adapter: every endpoint decodes its body,
//! validates it, invokes the corresponding engine operation, and translates
//! the error taxonomy into HTTP status codes. Decode failures are logged
//! with a correlation id so operators can match a client complaint to a log
//! line without the server echoing the raw body back.
//!
//! Status mapping: `Validation`, `InvalidInput`, and `InvalidTransition` are
//! 400, `NotFound` is 404, `Conflict` is 409, everything else is 500.
//! Successful prepare/start calls answer 200 when the flow reached the
//! terminal target and 202 with a `Location` header while it is still in
//! the intermediate state.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;

use axum::Json;
use axum::Router;
use axum::body::Bytes;
use axum::extract::Path;
use axum::extract::State;
use axum::http::StatusCode;
use axum::http::header::LOCATION;
use axum::response::IntoResponse;
use axum::response::Response;
use axum::routing::get;
use axum::routing::post;
use dataplane_core::DataFlowState;
use dataplane_core::DataPlaneError;
use dataplane_core::DataPlaneSdk;
use dataplane_core::ErrorKind;
use dataplane_core::InMemoryFlowStore;
use dataplane_core::InMemoryTransactionContext;
use dataplane_core::OperationContext;
use dataplane_core::SharedFlowStore;
use dataplane_core::TransactionContext;
use dataplane_core::messages::DataFlowPrepareMessage;
use dataplane_core::messages::DataFlowResponseMessage;
use dataplane_core::messages::DataFlowStartMessage;
use dataplane_core::messages::DataFlowStartedNotificationMessage;
use dataplane_core::messages::DataFlowStatusResponseMessage;
use dataplane_core::messages::DataFlowTransitionMessage;
use dataplane_store_sqlite::SqliteFlowStore;
use dataplane_store_sqlite::SqliteStoreConfig;
use serde::de::DeserializeOwned;
use thiserror::Error;
use uuid::Uuid;

use crate::config::DataPlaneConfig;
use crate::config::FlowStoreType;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Signaling server errors.
#[derive(Debug, Error)]
pub enum SignalingServerError {
    /// Configuration is invalid.
    #[error("signaling config error: {0}")]
    Config(String),
    /// Server initialization failed.
    #[error("signaling init error: {0}")]
    Init(String),
    /// Serving failed.
    #[error("signaling io error: {0}")]
    Io(String),
}

// ============================================================================
// SECTION: Wiring
// ============================================================================

/// Builds the flow store and matching transaction context for a config.
///
/// # Errors
///
/// Returns [`SignalingServerError`] when the configured store cannot be
/// initialized.
pub fn build_flow_store(
    config: &DataPlaneConfig,
) -> Result<(SharedFlowStore, Arc<dyn TransactionContext>), SignalingServerError> {
    match config.store.store_type {
        FlowStoreType::Memory => {
            let store = Arc::new(InMemoryFlowStore::new());
            let trx = Arc::new(InMemoryTransactionContext::new(store.clone()));
            Ok((SharedFlowStore::new(store), trx))
        }
        FlowStoreType::Sqlite => {
            let path = config.store.path.clone().ok_or_else(|| {
                SignalingServerError::Config("sqlite store requires store.path".to_string())
            })?;
            let mut sqlite_config = SqliteStoreConfig {
                path,
                busy_timeout_ms: 5_000,
                journal_mode: config.store.journal_mode.unwrap_or_default(),
            };
            if let Some(busy_timeout_ms) = config.store.busy_timeout_ms {
                sqlite_config.busy_timeout_ms = busy_timeout_ms;
            }
            let store = SqliteFlowStore::new(sqlite_config)
                .map_err(|err| SignalingServerError::Init(err.to_string()))?;
            let trx = Arc::new(store.transaction_context());
            Ok((SharedFlowStore::from_store(store), trx))
        }
    }
}

/// Signaling server instance.
pub struct SignalingServer {
    /// Server configuration.
    config: DataPlaneConfig,
    /// Engine the endpoints dispatch to.
    sdk: Arc<DataPlaneSdk>,
}

impl SignalingServer {
    /// Builds a server around an engine the deployer has already assembled
    /// (with its transport processors registered).
    ///
    /// # Errors
    ///
    /// Returns [`SignalingServerError::Config`] when the config is invalid.
    pub fn new(
        config: DataPlaneConfig,
        sdk: Arc<DataPlaneSdk>,
    ) -> Result<Self, SignalingServerError> {
        config.validate().map_err(|err| SignalingServerError::Config(err.to_string()))?;
        Ok(Self {
            config,
            sdk,
        })
    }

    /// Builds a server with a default engine over the configured store.
    ///
    /// Useful for demos and tests; production deployments register transport
    /// processors and use [`Self::new`].
    ///
    /// # Errors
    ///
    /// Returns [`SignalingServerError`] when initialization fails.
    pub fn from_config(config: DataPlaneConfig) -> Result<Self, SignalingServerError> {
        config.validate().map_err(|err| SignalingServerError::Config(err.to_string()))?;
        let (store, trx) = build_flow_store(&config)?;
        let sdk = DataPlaneSdk::builder()
            .with_store(Arc::new(store))
            .with_transaction_context(trx)
            .with_runtime_id(config.runtime.runtime_id.clone())
            .build()
            .map_err(|err| SignalingServerError::Init(err.to_string()))?;
        Self::new(config, Arc::new(sdk))
    }

    /// Returns the router serving the signaling endpoints.
    #[must_use]
    pub fn router(&self) -> Router {
        router(self.sdk.clone())
    }

    /// Serves the signaling endpoints until the process is stopped.
    ///
    /// # Errors
    ///
    /// Returns [`SignalingServerError::Io`] when binding or serving fails.
    pub async fn serve(self) -> Result<(), SignalingServerError> {
        let addr = self
            .config
            .bind_addr()
            .map_err(|err| SignalingServerError::Config(err.to_string()))?;
        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .map_err(|err| SignalingServerError::Io(err.to_string()))?;
        let router = router(self.sdk);
        axum::serve(listener, router)
            .await
            .map_err(|err| SignalingServerError::Io(err.to_string()))
    }
}

/// Builds the signaling router over an engine.
#[must_use]
pub fn router(sdk: Arc<DataPlaneSdk>) -> Router {
    Router::new()
        .route("/dataflows/prepare", post(prepare))
        .route("/dataflows/start", post(start))
        .route("/dataflows/{id}/started", post(start_by_id))
        .route("/dataflows/{id}/suspend", post(suspend))
        .route("/dataflows/{id}/terminate", post(terminate))
        .route("/dataflows/{id}/completed", post(completed))
        .route("/dataflows/{id}/status", get(status))
        .method_not_allowed_fallback(invalid_method)
        .with_state(sdk)
}

/// Answers unsupported methods on known paths.
async fn invalid_method() -> Response {
    (
        StatusCode::BAD_REQUEST,
        Json(DataFlowResponseMessage::for_error("Invalid request method")),
    )
        .into_response()
}

// ============================================================================
// SECTION: Handlers
// ============================================================================

/// POST /dataflows/prepare
async fn prepare(State(sdk): State<Arc<DataPlaneSdk>>, body: Bytes) -> Response {
    let message: DataFlowPrepareMessage = match decode(&sdk, &body) {
        Ok(message) => message,
        Err(response) => return response,
    };
    if let Err(err) = message.validate() {
        return error_response(&sdk, &err);
    }
    let ctx = OperationContext::new();
    match sdk.prepare(&ctx, &message) {
        Ok(response) => {
            accepted_or_ok(response, DataFlowState::Prepared, &message.base.process_id)
        }
        Err(err) => error_response(&sdk, &err),
    }
}

/// POST /dataflows/start
async fn start(State(sdk): State<Arc<DataPlaneSdk>>, body: Bytes) -> Response {
    let message: DataFlowStartMessage = match decode(&sdk, &body) {
        Ok(message) => message,
        Err(response) => return response,
    };
    if let Err(err) = message.validate() {
        return error_response(&sdk, &err);
    }
    let ctx = OperationContext::new();
    match sdk.start(&ctx, &message) {
        Ok(response) => {
            accepted_or_ok(response, DataFlowState::Started, &message.base.process_id)
        }
        Err(err) => error_response(&sdk, &err),
    }
}

/// POST /dataflows/{id}/started
async fn start_by_id(
    State(sdk): State<Arc<DataPlaneSdk>>,
    Path(id): Path<String>,
    body: Bytes,
) -> Response {
    let message: DataFlowStartedNotificationMessage = if body.is_empty() {
        DataFlowStartedNotificationMessage::default()
    } else {
        match decode(&sdk, &body) {
            Ok(message) => message,
            Err(response) => return response,
        }
    };
    if let Err(err) = message.validate() {
        return error_response(&sdk, &err);
    }
    let ctx = OperationContext::new();
    match sdk.start_by_id(&ctx, &id, &message) {
        Ok(response) => accepted_or_ok(response, DataFlowState::Started, &id),
        Err(err) => error_response(&sdk, &err),
    }
}

/// POST /dataflows/{id}/suspend
async fn suspend(
    State(sdk): State<Arc<DataPlaneSdk>>,
    Path(id): Path<String>,
    body: Bytes,
) -> Response {
    let reason = match transition_reason(&sdk, &body) {
        Ok(reason) => reason,
        Err(response) => return response,
    };
    let ctx = OperationContext::new();
    match sdk.suspend(&ctx, &id, &reason) {
        Ok(()) => StatusCode::OK.into_response(),
        Err(err) => error_response(&sdk, &err),
    }
}

/// POST /dataflows/{id}/terminate
async fn terminate(
    State(sdk): State<Arc<DataPlaneSdk>>,
    Path(id): Path<String>,
    body: Bytes,
) -> Response {
    let reason = match transition_reason(&sdk, &body) {
        Ok(reason) => reason,
        Err(response) => return response,
    };
    let ctx = OperationContext::new();
    match sdk.terminate(&ctx, &id, &reason) {
        Ok(()) => StatusCode::OK.into_response(),
        Err(err) => error_response(&sdk, &err),
    }
}

/// POST /dataflows/{id}/completed
async fn completed(State(sdk): State<Arc<DataPlaneSdk>>, Path(id): Path<String>) -> Response {
    let ctx = OperationContext::new();
    match sdk.complete(&ctx, &id) {
        Ok(()) => (StatusCode::OK, Json(serde_json::Value::Null)).into_response(),
        Err(err) => error_response(&sdk, &err),
    }
}

/// GET /dataflows/{id}/status
async fn status(State(sdk): State<Arc<DataPlaneSdk>>, Path(id): Path<String>) -> Response {
    let ctx = OperationContext::new();
    match sdk.status(&ctx, &id) {
        Ok(flow) => {
            let response = DataFlowStatusResponseMessage {
                state: flow.state,
                data_flow_id: flow.id,
            };
            (StatusCode::OK, Json(response)).into_response()
        }
        Err(err) => error_response(&sdk, &err),
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Decodes a JSON body, logging failures under a correlation id.
fn decode<T: DeserializeOwned>(sdk: &DataPlaneSdk, body: &Bytes) -> Result<T, Response> {
    serde_json::from_slice(body).map_err(|err| {
        let correlation_id = Uuid::new_v4();
        sdk.monitor()
            .printf(format_args!("error decoding data flow request [{correlation_id}]: {err}"));
        (
            StatusCode::BAD_REQUEST,
            Json(DataFlowResponseMessage::for_error(format!(
                "Failed to decode request body [{correlation_id}]"
            ))),
        )
            .into_response()
    })
}

/// Extracts the optional transition reason from a suspend/terminate body.
fn transition_reason(sdk: &DataPlaneSdk, body: &Bytes) -> Result<String, Response> {
    if body.is_empty() {
        return Ok(String::new());
    }
    let message: DataFlowTransitionMessage = decode(sdk, body)?;
    if let Err(err) = message.validate() {
        return Err(error_response(sdk, &err));
    }
    Ok(message.reason)
}

/// Answers 200 at the terminal target, 202 with a Location while pending.
fn accepted_or_ok(
    response: DataFlowResponseMessage,
    terminal: DataFlowState,
    process_id: &str,
) -> Response {
    if response.state == terminal {
        return (StatusCode::OK, Json(response)).into_response();
    }
    let mut reply = (StatusCode::ACCEPTED, Json(response)).into_response();
    if let Ok(location) = format!("/dataflows/{process_id}").parse() {
        reply.headers_mut().insert(LOCATION, location);
    }
    reply
}

/// Maps the engine error taxonomy onto HTTP status codes.
fn error_response(sdk: &DataPlaneSdk, err: &DataPlaneError) -> Response {
    let code = match err.kind() {
        ErrorKind::Validation | ErrorKind::InvalidInput | ErrorKind::InvalidTransition => {
            StatusCode::BAD_REQUEST
        }
        ErrorKind::NotFound => StatusCode::NOT_FOUND,
        ErrorKind::Conflict => StatusCode::CONFLICT,
        ErrorKind::Cancelled | ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
    };
    if code == StatusCode::INTERNAL_SERVER_ERROR {
        sdk.monitor().printf(format_args!("Error processing flow: {err}"));
    }
    (code, Json(DataFlowResponseMessage::for_error(err.to_string()))).into_response()
}
