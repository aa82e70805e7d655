//! Compiled circuit record: the JSON artifact handed from `readCircuit` to `prove`.

use crate::circuit::CircuitConfig;
use crate::error::{CircuitError, Result};
use crate::schema::InputSchema;
use alloy_primitives::B256;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::{Deserialize, Serialize};

/// Token standing in for the circuit client binding in a source snapshot
pub const CIRCUIT_IMPORT_PLACEHOLDER: &str = "AXIOM_CLIENT_IMPORT";

/// Client version the placeholder is bound to when a snapshot is reconstructed
pub const CLIENT_VERSION: &str = "v2";

/// Compiled circuit record.
///
/// `inputSchema` and `circuit` are both base64 strings: the schema JSON and the
/// placeholder-prefixed source text respectively.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompiledCircuit {
    pub vk: String,
    pub config: CircuitConfig,
    pub query_schema: B256,
    pub input_schema: String,
    pub circuit: String,
}

impl CompiledCircuit {
    /// Parse a record; every field is required
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| CircuitError::InvalidRecord(e.to_string()))
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn decode_input_schema(&self) -> Result<InputSchema> {
        let bytes = STANDARD.decode(self.input_schema.trim())?;
        let json = String::from_utf8(bytes)
            .map_err(|e| CircuitError::InvalidRecord(format!("inputSchema is not UTF-8: {e}")))?;
        InputSchema::from_json(&json)
    }

    /// Decode the source snapshot and bind its import placeholder
    pub fn decode_circuit_source(&self) -> Result<String> {
        let bytes = STANDARD.decode(self.circuit.trim())?;
        let snapshot = String::from_utf8(bytes)
            .map_err(|e| CircuitError::InvalidRecord(format!("circuit is not UTF-8: {e}")))?;
        bind_client_import(&snapshot).map(str::to_string)
    }
}

/// Header line prepended to every source snapshot
#[must_use]
pub fn import_header() -> String {
    format!("import {CIRCUIT_IMPORT_PLACEHOLDER}\n")
}

/// Base64 snapshot of circuit source text, prefixed with the import placeholder
#[must_use]
pub fn encode_circuit_source(source: &str) -> String {
    STANDARD.encode(format!("{}{source}", import_header()))
}

pub fn encode_input_schema(schema: &InputSchema) -> Result<String> {
    Ok(STANDARD.encode(schema.to_json()?))
}

/// Strip the placeholder header from a snapshot, returning the circuit source.
///
/// The placeholder resolves to the in-process client; a snapshot without it,
/// or importing anything else, is rejected.
pub fn bind_client_import(snapshot: &str) -> Result<&str> {
    let (header, body) = snapshot
        .split_once('\n')
        .ok_or_else(|| CircuitError::InvalidRecord("circuit snapshot has no import header".to_string()))?;

    match header.trim().strip_prefix("import ") {
        Some(token) if token.trim() == CIRCUIT_IMPORT_PLACEHOLDER => {
            tracing::debug!("Bound {} to client {}", CIRCUIT_IMPORT_PLACEHOLDER, CLIENT_VERSION);
            Ok(body)
        }
        _ => Err(CircuitError::InvalidRecord(format!(
            "unexpected circuit import header `{header}`"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot_carries_placeholder_and_verbatim_source() {
        let source = "{ \"name\": \"x\" }\n";
        let encoded = encode_circuit_source(source);
        let decoded = String::from_utf8(STANDARD.decode(&encoded).unwrap()).unwrap();
        assert_eq!(decoded, format!("import AXIOM_CLIENT_IMPORT\n{source}"));
        assert_eq!(bind_client_import(&decoded).unwrap(), source);
    }

    #[test]
    fn test_rejects_foreign_import() {
        assert!(bind_client_import("import child_process\n{}").is_err());
        assert!(bind_client_import("{}").is_err());
    }

    #[test]
    fn test_input_schema_is_base64_json() {
        let schema = InputSchema::from_json(r#"{"a":"CircuitValue","b":"CircuitValue256[]"}"#).unwrap();
        let encoded = encode_input_schema(&schema).unwrap();
        assert_eq!(
            STANDARD.decode(&encoded).unwrap(),
            br#"{"a":"CircuitValue","b":"CircuitValue256[]"}"#.to_vec()
        );
    }
}
