// crates/dataplane-core/src/core/address.rs
// ============================================================================
// Module: Data Addresses
// Description: Transport-specific endpoint descriptions and transfer types.
// Purpose: Carry opaque endpoint property bags between control and data plane.
// Dependencies: serde, serde_json
// ============================================================================

//! ## Overview
//! A data address is an opaque bag of properties describing one side of a
//! transfer (URL, token, channel name, and so on). The core never interprets
//! the bag beyond the conventional `type`, `endpoint`, and
//! `endpointProperties` keys, which transports have agreed on.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;
use std::str::FromStr;

use serde::Deserialize;
use serde::Serialize;
use serde_json::Map;
use serde_json::Value;

use crate::errors::DataPlaneError;

// ============================================================================
// SECTION: Conventional Property Keys
// ============================================================================

/// Conventional key holding the address type tag.
pub const PROPERTY_TYPE: &str = "type";
/// Conventional key holding the endpoint URL.
pub const PROPERTY_ENDPOINT: &str = "endpoint";
/// Conventional key holding the ordered endpoint property records.
pub const PROPERTY_ENDPOINT_PROPERTIES: &str = "endpointProperties";

// ============================================================================
// SECTION: Flow Type
// ============================================================================

/// Direction of a transfer as seen from the consumer.
///
/// # Invariants
/// - Wire form is lower case and stable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FlowType {
    /// Consumer pulls data from the provider endpoint.
    Pull,
    /// Provider pushes data to the consumer endpoint.
    Push,
}

impl fmt::Display for FlowType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pull => f.write_str("pull"),
            Self::Push => f.write_str("push"),
        }
    }
}

impl FromStr for FlowType {
    type Err = DataPlaneError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "pull" => Ok(Self::Pull),
            "push" => Ok(Self::Push),
            other => Err(DataPlaneError::InvalidInput(format!("unknown flow type {other}"))),
        }
    }
}

/// Transfer type requested by the control plane.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferType {
    /// Destination type understood by the selected transport.
    pub destination_type: String,
    /// Transfer direction.
    pub flow_type: FlowType,
}

// ============================================================================
// SECTION: Endpoint Properties
// ============================================================================

/// Single record of the conventional `endpointProperties` sequence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EndpointProperty {
    /// Property key.
    pub key: String,
    /// Property type tag.
    #[serde(rename = "type")]
    pub kind: String,
    /// Property value.
    pub value: String,
}

// ============================================================================
// SECTION: Data Address
// ============================================================================

/// Opaque endpoint description exchanged with transports.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DataAddress {
    /// Property bag carried verbatim.
    pub properties: Map<String, Value>,
}

impl DataAddress {
    /// Returns the conventional `type` tag when present.
    #[must_use]
    pub fn type_tag(&self) -> Option<&str> {
        self.properties.get(PROPERTY_TYPE).and_then(Value::as_str)
    }

    /// Returns the conventional `endpoint` URL when present.
    #[must_use]
    pub fn endpoint(&self) -> Option<&str> {
        self.properties.get(PROPERTY_ENDPOINT).and_then(Value::as_str)
    }

    /// Decodes the conventional `endpointProperties` records in order.
    ///
    /// Records that do not match the `{key, type, value}` shape are skipped.
    #[must_use]
    pub fn endpoint_properties(&self) -> Vec<EndpointProperty> {
        let Some(Value::Array(entries)) = self.properties.get(PROPERTY_ENDPOINT_PROPERTIES) else {
            return Vec::new();
        };
        entries
            .iter()
            .filter_map(|entry| serde_json::from_value(entry.clone()).ok())
            .collect()
    }
}

// ============================================================================
// SECTION: Builder
// ============================================================================

/// Fluent builder for [`DataAddress`].
#[derive(Debug, Default)]
pub struct DataAddressBuilder {
    /// Accumulated property bag.
    properties: Map<String, Value>,
}

impl DataAddressBuilder {
    /// Creates an empty builder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets a single property.
    #[must_use]
    pub fn property(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }

    /// Merges a set of properties into the bag.
    #[must_use]
    pub fn properties(mut self, properties: Map<String, Value>) -> Self {
        self.properties.extend(properties);
        self
    }

    /// Builds the address.
    ///
    /// # Errors
    ///
    /// Returns [`DataPlaneError::InvalidInput`] when no properties were set.
    pub fn build(self) -> Result<DataAddress, DataPlaneError> {
        if self.properties.is_empty() {
            return Err(DataPlaneError::InvalidInput(
                "data address properties are required".to_string(),
            ));
        }
        Ok(DataAddress {
            properties: self.properties,
        })
    }
}
