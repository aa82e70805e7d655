//! Circuit input schema and the circuit-value to Solidity type mapping.

use crate::error::{CircuitError, Result};
use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// Circuit-value type tags accepted in an input schema
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum CircuitType {
    CircuitValue,
    CircuitValue256,
    CircuitValueArray,
    CircuitValue256Array,
}

impl CircuitType {
    /// Parse a schema type tag
    pub fn from_tag(tag: &str) -> Result<Self> {
        match tag {
            "CircuitValue" => Ok(Self::CircuitValue),
            "CircuitValue256" => Ok(Self::CircuitValue256),
            "CircuitValue[]" => Ok(Self::CircuitValueArray),
            "CircuitValue256[]" => Ok(Self::CircuitValue256Array),
            other => Err(CircuitError::UnknownType(other.to_string())),
        }
    }

    #[must_use]
    pub const fn tag(self) -> &'static str {
        match self {
            Self::CircuitValue => "CircuitValue",
            Self::CircuitValue256 => "CircuitValue256",
            Self::CircuitValueArray => "CircuitValue[]",
            Self::CircuitValue256Array => "CircuitValue256[]",
        }
    }

    /// Canonical Solidity ABI type for this circuit-value type
    #[must_use]
    pub const fn solidity_type(self) -> &'static str {
        match self {
            Self::CircuitValue | Self::CircuitValue256 => "uint256",
            Self::CircuitValueArray | Self::CircuitValue256Array => "uint256[]",
        }
    }

    #[must_use]
    pub const fn is_array(self) -> bool {
        matches!(self, Self::CircuitValueArray | Self::CircuitValue256Array)
    }

    /// Whether values must be BN254 scalar field elements (as opposed to full 256-bit words)
    #[must_use]
    pub const fn is_field_element(self) -> bool {
        matches!(self, Self::CircuitValue | Self::CircuitValueArray)
    }
}

/// Map a circuit-value type tag to its Solidity ABI type.
///
/// Fails with `Unknown type <tag>` for anything outside the closed set.
pub fn get_solidity_type(tag: &str) -> Result<&'static str> {
    CircuitType::from_tag(tag).map(CircuitType::solidity_type)
}

/// Ordered mapping from input name to circuit-value type tag.
///
/// Key order is the positional ABI order, so it is preserved through every
/// (de)serialization. Tags are kept verbatim and only checked when the ABI
/// descriptor is built.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct InputSchema {
    entries: Vec<(String, String)>,
}

impl InputSchema {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Append an input; names must be unique
    pub fn push(&mut self, name: impl Into<String>, tag: impl Into<String>) -> Result<()> {
        let name = name.into();
        if self.contains(&name) {
            return Err(CircuitError::InvalidSchema(format!(
                "duplicate input `{name}`"
            )));
        }
        self.entries.push((name, tag.into()));
        Ok(())
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.entries.iter().any(|(key, _)| key == name)
    }

    /// Type tag of an input, if declared
    #[must_use]
    pub fn tag_of(&self, name: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, tag)| tag.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries
            .iter()
            .map(|(name, tag)| (name.as_str(), tag.as_str()))
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(name, _)| name.as_str())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Resolve every tag, failing on the first unknown one
    pub fn types(&self) -> Result<Vec<(&str, CircuitType)>> {
        self.iter()
            .map(|(name, tag)| CircuitType::from_tag(tag).map(|ty| (name, ty)))
            .collect()
    }

    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| CircuitError::InvalidSchema(e.to_string()))
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

impl Serialize for InputSchema {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (name, tag) in &self.entries {
            map.serialize_entry(name, tag)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for InputSchema {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        struct SchemaVisitor;

        impl<'de> Visitor<'de> for SchemaVisitor {
            type Value = InputSchema;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("an object mapping input names to circuit-value types")
            }

            fn visit_map<A: MapAccess<'de>>(
                self,
                mut access: A,
            ) -> std::result::Result<Self::Value, A::Error> {
                let mut schema = InputSchema::new();
                while let Some((name, tag)) = access.next_entry::<String, String>()? {
                    schema.push(name, tag).map_err(serde::de::Error::custom)?;
                }
                Ok(schema)
            }
        }

        deserializer.deserialize_map(SchemaVisitor)
    }
}
