// crates/dataplane-signaling/src/lib.rs
// ============================================================================
// Module: Signaling Library
// Description: Public API surface of the HTTP signaling facade.
// Purpose: Expose the server, router, and configuration model.
// Dependencies: crate::{config, server}
// ============================================================================

//! ## Overview
//! HTTP facade for the data-plane lifecycle engine. The facade owns no
//! business logic: it decodes and validates signaling messages, dispatches
//! to `dataplane-core`, and maps the error taxonomy onto status codes.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod config;
pub mod server;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use config::ConfigError;
pub use config::DataPlaneConfig;
pub use config::FlowStoreType;
pub use config::RuntimeConfig;
pub use config::ServerConfig;
pub use config::StoreConfig;
pub use server::SignalingServer;
pub use server::SignalingServerError;
pub use server::build_flow_store;
pub use server::router;
