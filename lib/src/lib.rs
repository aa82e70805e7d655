//! Circuit-side building blocks for the axiom-std bridge: the type mapper,
//! ABI input decoding, the compiled circuit record, and the mock circuit
//! runtime used by `readCircuit` and `prove`.

pub mod abi;
pub mod circuit;
pub mod data;
pub mod definition;
pub mod error;
pub mod interpreter;
pub mod record;
pub mod schema;

pub use abi::{abi_parameters, decode_inputs, encode_inputs, AbiParameter, CircuitInputs};
pub use circuit::{BaseCircuit, CircuitConfig, ComputeQuery};
pub use data::{
    AccountField, DataQuery, DataSnapshot, DataSource, DataSubquery, HeaderField,
    StaticDataSource,
};
pub use definition::{CircuitDefinition, Step};
pub use error::{CircuitError, Result};
pub use record::CompiledCircuit;
pub use schema::{get_solidity_type, CircuitType, InputSchema};
