//! Declarative circuit definitions.
//!
//! A circuit is a JSON document naming its input schema and an ordered list of
//! steps. The document is parsed as data and run by the sandboxed
//! interpreter in [`crate::interpreter`]; nothing in it is ever executed as code.
//!
//! ```json
//! {
//!   "name": "balanceDelta",
//!   "inputSchema": { "blockNumber": "CircuitValue", "address": "CircuitValue" },
//!   "steps": [
//!     { "op": "getAccount", "out": "balance", "block": "blockNumber",
//!       "address": "address", "field": "balance" },
//!     { "op": "addToCallback", "value": "balance" }
//!   ]
//! }
//! ```

use crate::data::{AccountField, HeaderField};
use crate::error::{CircuitError, Result};
use crate::schema::{CircuitType, InputSchema};
use alloy_primitives::U256;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;

/// Maximum number of `addToCallback` results per circuit
pub const USER_MAX_OUTPUTS: usize = 128;

/// Maximum number of data subqueries per circuit
pub const USER_MAX_SUBQUERIES: usize = 128;

/// Binary operation fields shared by arithmetic and comparison steps
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BinaryOp {
    pub out: String,
    pub lhs: String,
    pub rhs: String,
}

/// One circuit operation
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "camelCase", deny_unknown_fields)]
pub enum Step {
    Add(BinaryOp),
    Sub(BinaryOp),
    Mul(BinaryOp),
    Div(BinaryOp),
    IsEqual(BinaryOp),
    IsLessThan(BinaryOp),
    Sum {
        out: String,
        values: String,
    },
    GetHeader {
        out: String,
        block: String,
        field: HeaderField,
    },
    GetAccount {
        out: String,
        block: String,
        address: String,
        field: AccountField,
    },
    GetStorage {
        out: String,
        block: String,
        address: String,
        slot: String,
    },
    AddToCallback {
        value: String,
    },
    Log {
        value: String,
    },
}

impl Step {
    /// Name bound by this step, if any
    #[must_use]
    pub fn output(&self) -> Option<&str> {
        match self {
            Self::Add(op)
            | Self::Sub(op)
            | Self::Mul(op)
            | Self::Div(op)
            | Self::IsEqual(op)
            | Self::IsLessThan(op) => Some(op.out.as_str()),
            Self::Sum { out, .. }
            | Self::GetHeader { out, .. }
            | Self::GetAccount { out, .. }
            | Self::GetStorage { out, .. } => Some(out.as_str()),
            Self::AddToCallback { .. } | Self::Log { .. } => None,
        }
    }

    /// Scalar operands read by this step
    #[must_use]
    pub fn scalar_operands(&self) -> Vec<&str> {
        match self {
            Self::Add(op)
            | Self::Sub(op)
            | Self::Mul(op)
            | Self::Div(op)
            | Self::IsEqual(op)
            | Self::IsLessThan(op) => vec![op.lhs.as_str(), op.rhs.as_str()],
            Self::Sum { .. } => Vec::new(),
            Self::GetHeader { block, .. } => vec![block.as_str()],
            Self::GetAccount { block, address, .. } => vec![block.as_str(), address.as_str()],
            Self::GetStorage {
                block,
                address,
                slot,
                ..
            } => vec![block.as_str(), address.as_str(), slot.as_str()],
            Self::AddToCallback { value } | Self::Log { value } => vec![value.as_str()],
        }
    }

    #[must_use]
    pub const fn is_subquery(&self) -> bool {
        matches!(
            self,
            Self::GetHeader { .. } | Self::GetAccount { .. } | Self::GetStorage { .. }
        )
    }

    #[must_use]
    pub const fn is_output(&self) -> bool {
        matches!(self, Self::AddToCallback { .. })
    }

    /// Estimated advice cells the step occupies in the mock layout
    #[must_use]
    pub const fn cell_cost(&self) -> usize {
        match self {
            Self::Add(_) | Self::Sub(_) | Self::Mul(_) => 4,
            Self::Div(_) => 8,
            Self::IsEqual(_) => 7,
            Self::IsLessThan(_) => 24,
            Self::Sum { .. } => 32,
            Self::GetHeader { .. } | Self::GetAccount { .. } | Self::GetStorage { .. } => 12,
            Self::AddToCallback { .. } => 2,
            Self::Log { .. } => 0,
        }
    }
}

/// A reference to a value inside a step
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Operand {
    Literal(U256),
    Name(String),
    Index(String, usize),
}

impl Operand {
    pub fn parse(raw: &str) -> Result<Self> {
        let raw = raw.trim();
        let invalid = || CircuitError::InvalidDefinition(format!("invalid operand `{raw}`"));

        let first = raw.chars().next().ok_or_else(invalid)?;
        if first.is_ascii_digit() {
            return raw.parse::<U256>().map(Self::Literal).map_err(|_| invalid());
        }

        if let Some(open) = raw.find('[') {
            let name = &raw[..open];
            let index = raw[open + 1..]
                .strip_suffix(']')
                .and_then(|idx| idx.trim().parse::<usize>().ok())
                .ok_or_else(invalid)?;
            if !is_identifier(name) {
                return Err(invalid());
            }
            return Ok(Self::Index(name.to_string(), index));
        }

        if is_identifier(raw) {
            Ok(Self::Name(raw.to_string()))
        } else {
            Err(invalid())
        }
    }
}

fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Parsed circuit document
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct CircuitDefinition {
    pub name: String,
    pub input_schema: InputSchema,
    pub steps: Vec<Step>,
}

impl CircuitDefinition {
    /// Parse and validate a definition from its source text
    pub fn from_source(source: &str) -> Result<Self> {
        let definition: Self = serde_json::from_str(source)
            .map_err(|e| CircuitError::InvalidDefinition(e.to_string()))?;
        definition.validate()?;
        Ok(definition)
    }

    /// Read a definition file, returning the parsed definition and its verbatim text
    pub fn load(path: impl AsRef<Path>) -> Result<(Self, String)> {
        let source = std::fs::read_to_string(path.as_ref())?;
        let definition = Self::from_source(&source)?;
        Ok((definition, source))
    }

    #[must_use]
    pub fn output_count(&self) -> usize {
        self.steps.iter().filter(|step| step.is_output()).count()
    }

    #[must_use]
    pub fn subquery_count(&self) -> usize {
        self.steps.iter().filter(|step| step.is_subquery()).count()
    }

    /// Static checks run before any input is seen
    pub fn validate(&self) -> Result<()> {
        let invalid = |msg: String| Err(CircuitError::InvalidDefinition(msg));

        if !is_identifier(&self.name) {
            return invalid(format!("invalid circuit name `{}`", self.name));
        }

        let types = self.input_schema.types()?;
        let mut scalars: HashSet<&str> = HashSet::new();
        let mut arrays: HashSet<&str> = HashSet::new();
        for &(name, ty) in &types {
            if !is_identifier(name) {
                return invalid(format!("invalid input name `{name}`"));
            }
            if ty.is_array() {
                arrays.insert(name);
            } else {
                scalars.insert(name);
            }
        }

        for (position, step) in self.steps.iter().enumerate() {
            for raw in step.scalar_operands() {
                match Operand::parse(raw)? {
                    Operand::Literal(_) => {}
                    Operand::Name(name) => {
                        if !scalars.contains(name.as_str()) {
                            return invalid(format!(
                                "step {position}: `{name}` is not a defined scalar"
                            ));
                        }
                    }
                    Operand::Index(name, _) => {
                        if !arrays.contains(name.as_str()) {
                            return invalid(format!(
                                "step {position}: `{name}` is not an array input"
                            ));
                        }
                    }
                }
            }

            if let Step::Sum { values, .. } = step {
                if !arrays.contains(values.as_str()) {
                    return invalid(format!(
                        "step {position}: `{values}` is not an array input"
                    ));
                }
            }

            if let Some(out) = step.output() {
                if !is_identifier(out) {
                    return invalid(format!("step {position}: invalid output name `{out}`"));
                }
                if scalars.contains(out) || arrays.contains(out) {
                    return invalid(format!("step {position}: `{out}` is already defined"));
                }
                scalars.insert(out);
            }
        }

        if self.output_count() > USER_MAX_OUTPUTS {
            return Err(CircuitError::CircuitTooLarge(format!(
                "{} outputs exceed the limit of {USER_MAX_OUTPUTS}",
                self.output_count()
            )));
        }
        if self.subquery_count() > USER_MAX_SUBQUERIES {
            return Err(CircuitError::CircuitTooLarge(format!(
                "{} subqueries exceed the limit of {USER_MAX_SUBQUERIES}",
                self.subquery_count()
            )));
        }

        Ok(())
    }

    /// Canonical serialization, independent of source formatting
    pub fn canonical_bytes(&self) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }

    /// Resolved input types, in schema order
    pub fn input_types(&self) -> Result<Vec<(&str, CircuitType)>> {
        self.input_schema.types()
    }
}
