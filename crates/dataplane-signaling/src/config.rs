// crates/dataplane-signaling/src/config.rs
// ============================================================================
// Module: Data Plane Configuration
// Description: TOML-backed configuration for the signaling server.
// Purpose: Select bind address, flow store backend, and runtime identity.
// Dependencies: dataplane-core, dataplane-store-sqlite, serde, thiserror, toml
// ============================================================================

//! ## Overview
//! Configuration is deserialized from TOML with serde defaults so an empty
//! document yields a runnable in-memory deployment, then validated as a
//! whole. Configuration is untrusted input; validation fails closed.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::net::SocketAddr;
use std::path::Path;
use std::path::PathBuf;

use dataplane_core::runtime::DEFAULT_RUNTIME_ID;
use dataplane_store_sqlite::SqliteJournalMode;
use serde::Deserialize;
use thiserror::Error;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Configuration file could not be read.
    #[error("config read failed: {0}")]
    Read(String),
    /// Configuration could not be parsed.
    #[error("config parse failed: {0}")]
    Parse(String),
    /// Configuration is structurally valid but semantically wrong.
    #[error("invalid config: {0}")]
    Invalid(String),
}

// ============================================================================
// SECTION: Sections
// ============================================================================

/// HTTP server settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Bind address for the signaling endpoints.
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1:8080".to_string(),
        }
    }
}

/// Flow store backend selection.
///
/// # Invariants
/// - Variants are stable for configuration files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum FlowStoreType {
    /// In-process store; state is lost on restart.
    #[default]
    Memory,
    /// Durable `SQLite`-backed store.
    Sqlite,
}

/// Flow store settings.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct StoreConfig {
    /// Selected backend.
    #[serde(rename = "type")]
    pub store_type: FlowStoreType,
    /// Database file path (required for the `SQLite` backend).
    pub path: Option<PathBuf>,
    /// Busy timeout in milliseconds for the `SQLite` backend.
    pub busy_timeout_ms: Option<u64>,
    /// Journal mode for the `SQLite` backend.
    pub journal_mode: Option<SqliteJournalMode>,
}

/// Runtime identity settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    /// Identifier of this data-plane instance.
    pub runtime_id: String,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            runtime_id: DEFAULT_RUNTIME_ID.to_string(),
        }
    }
}

// ============================================================================
// SECTION: Config Root
// ============================================================================

/// Root configuration for a data-plane deployment.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct DataPlaneConfig {
    /// HTTP server settings.
    pub server: ServerConfig,
    /// Flow store settings.
    pub store: StoreConfig,
    /// Runtime identity settings.
    pub runtime: RuntimeConfig,
}

impl DataPlaneConfig {
    /// Parses configuration from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when parsing or validation fails.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: Self =
            toml::from_str(content).map_err(|err| ConfigError::Parse(err.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Loads configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when reading, parsing, or validation fails.
    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let content =
            std::fs::read_to_string(path).map_err(|err| ConfigError::Read(err.to_string()))?;
        Self::from_toml_str(&content)
    }

    /// Validates cross-field invariants.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] when a section is inconsistent.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.server
            .bind
            .parse::<SocketAddr>()
            .map_err(|err| ConfigError::Invalid(format!("server.bind: {err}")))?;
        if self.store.store_type == FlowStoreType::Sqlite && self.store.path.is_none() {
            return Err(ConfigError::Invalid("sqlite store requires store.path".to_string()));
        }
        if self.runtime.runtime_id.trim().is_empty() {
            return Err(ConfigError::Invalid("runtime.runtime_id must not be blank".to_string()));
        }
        Ok(())
    }

    /// Returns the parsed bind address.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] when the address does not parse;
    /// `validate` catches this earlier.
    pub fn bind_addr(&self) -> Result<SocketAddr, ConfigError> {
        self.server
            .bind
            .parse()
            .map_err(|err| ConfigError::Invalid(format!("server.bind: {err}")))
    }
}
