//! ABI glue between caller-supplied hex blobs and string-keyed circuit inputs.

use crate::error::{CircuitError, Result};
use crate::schema::{get_solidity_type, InputSchema};
use alloy_dyn_abi::{DynSolType, DynSolValue};
use alloy_primitives::{Bytes, U256};
use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};
use tracing::debug;

/// One positional ABI parameter derived from an input schema entry
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AbiParameter {
    pub name: String,
    pub solidity_type: &'static str,
    pub ty: DynSolType,
}

/// Build the ABI parameter list for a schema, in schema key order
pub fn abi_parameters(schema: &InputSchema) -> Result<Vec<AbiParameter>> {
    schema
        .iter()
        .map(|(name, tag)| {
            let solidity_type = get_solidity_type(tag)?;
            let ty = DynSolType::parse(solidity_type)
                .map_err(|e| CircuitError::InputDecode(e.to_string()))?;
            Ok(AbiParameter {
                name: name.to_string(),
                solidity_type,
                ty,
            })
        })
        .collect()
}

/// Circuit inputs keyed by schema name, values in string form.
///
/// Scalars are decimal strings; arrays are comma-joined decimal strings.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CircuitInputs {
    values: Vec<(String, String)>,
}

impl CircuitInputs {
    #[must_use]
    pub const fn new() -> Self {
        Self { values: Vec::new() }
    }

    /// Set an input value, replacing an existing one with the same name
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        match self.values.iter_mut().find(|(key, _)| *key == name) {
            Some(slot) => slot.1 = value,
            None => self.values.push((name, value)),
        }
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.values
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.values
            .iter()
            .map(|(name, value)| (name.as_str(), value.as_str()))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl Serialize for CircuitInputs {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.values.len()))?;
        for (name, value) in &self.values {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}

/// Decode a hex ABI blob holding every circuit input, positionally, per the schema
pub fn decode_inputs(schema: &InputSchema, inputs: &str) -> Result<CircuitInputs> {
    let params = abi_parameters(schema)?;
    let data = decode_hex(inputs)?;

    let mut circuit_inputs = CircuitInputs::new();
    if params.is_empty() {
        return Ok(circuit_inputs);
    }

    let tuple = DynSolType::Tuple(params.iter().map(|p| p.ty.clone()).collect());
    let decoded = tuple
        .abi_decode_params(&data)
        .map_err(|e| CircuitError::InputDecode(e.to_string()))?;

    let values = match decoded {
        DynSolValue::Tuple(values) => values,
        other => vec![other],
    };
    if values.len() != params.len() {
        return Err(CircuitError::InputDecode(format!(
            "expected {} values, decoded {}",
            params.len(),
            values.len()
        )));
    }

    for (param, value) in params.iter().zip(values.iter()) {
        circuit_inputs.insert(param.name.clone(), value_to_string(value)?);
    }

    debug!("Decoded {} circuit inputs", circuit_inputs.len());
    Ok(circuit_inputs)
}

/// Encode string-form circuit inputs into a hex ABI blob, per the schema
pub fn encode_inputs(schema: &InputSchema, inputs: &CircuitInputs) -> Result<Bytes> {
    let params = abi_parameters(schema)?;
    let values = params
        .iter()
        .map(|param| {
            let raw = inputs.get(&param.name).ok_or_else(|| CircuitError::InvalidInput {
                name: param.name.clone(),
                reason: "missing value".to_string(),
            })?;
            string_to_value(&param.name, &param.ty, raw)
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(DynSolValue::Tuple(values).abi_encode_params().into())
}

/// Parse a decimal or `0x`-prefixed hex string into a 256-bit word
pub fn parse_u256(raw: &str) -> Option<U256> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    raw.parse::<U256>().ok()
}

/// Split the string form of an array input into its elements
pub fn parse_u256_list(raw: &str) -> Option<Vec<U256>> {
    if raw.trim().is_empty() {
        return Some(Vec::new());
    }
    raw.split(',').map(parse_u256).collect()
}

fn decode_hex(inputs: &str) -> Result<Vec<u8>> {
    let trimmed = inputs.trim();
    let stripped = trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
        .unwrap_or(trimmed);
    hex::decode(stripped).map_err(|e| CircuitError::InputDecode(format!("invalid hex: {e}")))
}

fn value_to_string(value: &DynSolValue) -> Result<String> {
    match value {
        DynSolValue::Uint(word, _) => Ok(word.to_string()),
        DynSolValue::Array(items) => Ok(items
            .iter()
            .map(value_to_string)
            .collect::<Result<Vec<_>>>()?
            .join(",")),
        other => Err(CircuitError::InputDecode(format!(
            "unsupported decoded value {other:?}"
        ))),
    }
}

fn string_to_value(name: &str, ty: &DynSolType, raw: &str) -> Result<DynSolValue> {
    let invalid = |reason: &str| CircuitError::InvalidInput {
        name: name.to_string(),
        reason: format!("{reason}: `{raw}`"),
    };
    match ty {
        DynSolType::Uint(bits) => parse_u256(raw)
            .map(|word| DynSolValue::Uint(word, *bits))
            .ok_or_else(|| invalid("not an unsigned integer")),
        DynSolType::Array(inner) => match inner.as_ref() {
            DynSolType::Uint(bits) => parse_u256_list(raw)
                .map(|words| {
                    DynSolValue::Array(
                        words
                            .into_iter()
                            .map(|word| DynSolValue::Uint(word, *bits))
                            .collect(),
                    )
                })
                .ok_or_else(|| invalid("not a list of unsigned integers")),
            _ => Err(invalid("unsupported array element type")),
        },
        _ => Err(invalid("unsupported type")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parameters_follow_schema_order() {
        let schema =
            InputSchema::from_json(r#"{"b":"CircuitValue256[]","a":"CircuitValue"}"#).unwrap();
        let params = abi_parameters(&schema).unwrap();
        assert_eq!(params.len(), 2);
        assert_eq!(params[0].name, "b");
        assert_eq!(params[0].solidity_type, "uint256[]");
        assert_eq!(params[1].name, "a");
        assert_eq!(params[1].ty, DynSolType::Uint(256));
    }

    #[test]
    fn test_parse_helpers() {
        assert_eq!(parse_u256("42"), Some(U256::from(42)));
        assert_eq!(parse_u256("0x2a"), Some(U256::from(42)));
        assert_eq!(parse_u256(""), None);
        assert_eq!(parse_u256("-1"), None);
        assert_eq!(parse_u256_list(""), Some(vec![]));
        assert_eq!(
            parse_u256_list("1,2,3"),
            Some(vec![U256::from(1), U256::from(2), U256::from(3)])
        );
        assert_eq!(parse_u256_list("1,,3"), None);
    }
}
