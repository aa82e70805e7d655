//! Mock circuit lifecycle: compile, reload a saved compilation, prove.

use crate::abi::CircuitInputs;
use crate::data::{DataQuery, DataSource, DataSubquery};
use crate::definition::CircuitDefinition;
use crate::error::{CircuitError, Result};
use crate::interpreter::{run_circuit, CircuitRun};
use crate::record::{encode_circuit_source, encode_input_schema, CompiledCircuit};
use crate::schema::InputSchema;
use alloy_primitives::{keccak256, Bytes, B256};
use alloy_sol_types::SolValue;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Instant;
use tracing::{debug, info};

/// Smallest and largest circuit degree the mock layout accepts
pub const MIN_K: u8 = 8;
pub const MAX_K: u8 = 20;

/// Advice columns in the mock layout
pub const DEFAULT_NUM_ADVICE: u16 = 4;

/// Rows reserved for blinding factors
pub const UNUSABLE_ROWS: usize = 20;

/// Field elements per bytes32 result (hi-lo split)
pub const USER_RESULT_FIELD_ELEMENTS: u16 = 2;

/// Mock circuit parameters, derived from the definition alone
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CircuitConfig {
    pub k: u8,
    pub num_advice: u16,
    pub num_lookup_advice: u16,
    pub num_instance: u16,
    pub num_lookup_bits: u8,
    pub max_outputs: u16,
    pub max_subqueries: u16,
}

impl CircuitConfig {
    #[allow(clippy::cast_possible_truncation)]
    pub fn derive(definition: &CircuitDefinition) -> Result<Self> {
        let cells: usize = definition.input_schema.len()
            + definition.steps.iter().map(|step| step.cell_cost()).sum::<usize>();
        let rows = cells.div_ceil(usize::from(DEFAULT_NUM_ADVICE)) + UNUSABLE_ROWS;
        let k = (usize::BITS - rows.saturating_sub(1).leading_zeros()).max(u32::from(MIN_K));
        if k > u32::from(MAX_K) {
            return Err(CircuitError::CircuitTooLarge(format!(
                "needs 2^{k} rows, the limit is 2^{MAX_K}"
            )));
        }
        let k = k as u8;

        let uses_range_checks = definition
            .steps
            .iter()
            .any(|step| matches!(step, crate::definition::Step::IsLessThan(_)));

        // Both counts are bounded by the definition limits, well inside u16
        let max_outputs = definition.output_count() as u16;
        let max_subqueries = definition.subquery_count() as u16;

        Ok(Self {
            k,
            num_advice: DEFAULT_NUM_ADVICE,
            num_lookup_advice: u16::from(uses_range_checks),
            num_instance: USER_RESULT_FIELD_ELEMENTS * (max_outputs + max_subqueries),
            num_lookup_bits: k - 1,
            max_outputs,
            max_subqueries,
        })
    }
}

/// Computation half of a submittable query
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComputeQuery {
    pub k: u8,
    pub result_len: u16,
    pub vkey: Vec<B256>,
    pub compute_proof: Bytes,
}

impl ComputeQuery {
    /// Packed encoding committed to by the query hash
    #[allow(clippy::cast_possible_truncation)]
    #[must_use]
    pub fn encode_packed(&self) -> Vec<u8> {
        let mut out = schema_preimage(self.k, self.result_len, &self.vkey);
        out.extend_from_slice(&(self.compute_proof.len() as u32).to_be_bytes());
        out.extend_from_slice(&self.compute_proof);
        out
    }
}

#[derive(Clone, Debug)]
struct CompiledState {
    config: CircuitConfig,
    vkey: Vec<B256>,
    query_schema: B256,
}

impl CompiledState {
    fn derive(definition: &CircuitDefinition) -> Result<Self> {
        let config = CircuitConfig::derive(definition)?;
        let vkey = vec![
            keccak256(definition.canonical_bytes()?),
            keccak256(serde_json::to_vec(&config)?),
        ];
        let query_schema = query_schema(config.k, config.max_outputs, &vkey);
        Ok(Self {
            config,
            vkey,
            query_schema,
        })
    }

    fn vk_hex(&self) -> String {
        let bytes: Vec<u8> = self.vkey.iter().flat_map(|word| word.0).collect();
        format!("0x{}", hex::encode(bytes))
    }
}

/// Identifier of a circuit's shape as seen by the query contract
#[allow(clippy::cast_possible_truncation)]
#[must_use]
pub fn query_schema(k: u8, result_len: u16, vkey: &[B256]) -> B256 {
    keccak256(schema_preimage(k, result_len, vkey))
}

/// `uint8 k ‖ uint16 resultLen ‖ uint8 vkeyLen ‖ bytes32[] vkey`, packed.
/// uint8 has no `SolValue` impl, so the layout is written out by hand.
#[allow(clippy::cast_possible_truncation)]
fn schema_preimage(k: u8, result_len: u16, vkey: &[B256]) -> Vec<u8> {
    let mut out = Vec::with_capacity(4 + 32 * vkey.len());
    out.push(k);
    out.extend_from_slice(&result_len.to_be_bytes());
    out.push(vkey.len() as u8);
    for word in vkey {
        out.extend_from_slice(word.as_slice());
    }
    out
}

/// A circuit definition together with its mock compilation state
#[derive(Clone, Debug)]
pub struct BaseCircuit {
    definition: CircuitDefinition,
    source: String,
    compiled: Option<CompiledState>,
    last_run: Option<CircuitRun>,
}

impl BaseCircuit {
    /// Build a circuit from definition source text
    pub fn new(source: impl Into<String>) -> Result<Self> {
        let source = source.into();
        let definition = CircuitDefinition::from_source(&source)?;
        Ok(Self {
            definition,
            source,
            compiled: None,
            last_run: None,
        })
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let (definition, source) = CircuitDefinition::load(path)?;
        Ok(Self {
            definition,
            source,
            compiled: None,
            last_run: None,
        })
    }

    /// Reconstruct a circuit from the source snapshot inside a compiled record.
    ///
    /// The record's input schema must be the one the definition declares.
    pub fn from_compiled(record: &CompiledCircuit) -> Result<Self> {
        let source = record.decode_circuit_source()?;
        let circuit = Self::new(source)?;
        let record_schema = record.decode_input_schema()?;
        if record_schema != circuit.definition.input_schema {
            return Err(CircuitError::RecordMismatch(
                "inputSchema differs from the circuit's declared schema".to_string(),
            ));
        }
        Ok(circuit)
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.definition.name
    }

    #[must_use]
    pub const fn input_schema(&self) -> &InputSchema {
        &self.definition.input_schema
    }

    #[must_use]
    pub const fn definition(&self) -> &CircuitDefinition {
        &self.definition
    }

    #[must_use]
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Run the circuit on the given inputs and produce its compiled record
    pub async fn mock_compile(
        &mut self,
        inputs: &CircuitInputs,
        data_source: &dyn DataSource,
    ) -> Result<CompiledCircuit> {
        let start_time = Instant::now();
        info!("🔧 Mock compiling circuit `{}`", self.name());

        let state = CompiledState::derive(&self.definition)?;
        let run = run_circuit(&self.definition, inputs, data_source).await?;

        let record = CompiledCircuit {
            vk: state.vk_hex(),
            config: state.config,
            query_schema: state.query_schema,
            input_schema: encode_input_schema(&self.definition.input_schema)?,
            circuit: encode_circuit_source(&self.source),
        };

        debug!(
            "Compiled `{}` with k={} in {}ms",
            self.name(),
            state.config.k,
            start_time.elapsed().as_millis()
        );
        self.compiled = Some(state);
        self.last_run = Some(run);
        Ok(record)
    }

    /// Adopt a saved compilation, checking it belongs to this circuit
    pub fn load_saved_mock(&mut self, record: &CompiledCircuit) -> Result<()> {
        let state = CompiledState::derive(&self.definition)?;

        if record.config != state.config {
            return Err(CircuitError::RecordMismatch("config".to_string()));
        }
        if !record.vk.eq_ignore_ascii_case(&state.vk_hex()) {
            return Err(CircuitError::RecordMismatch("vk".to_string()));
        }
        if record.query_schema != state.query_schema {
            return Err(CircuitError::RecordMismatch("querySchema".to_string()));
        }

        debug!("Loaded saved compilation for `{}`", self.name());
        self.compiled = Some(state);
        Ok(())
    }

    /// Run the circuit and produce a mock compute query
    pub async fn mock_prove(
        &mut self,
        inputs: &CircuitInputs,
        data_source: &dyn DataSource,
    ) -> Result<ComputeQuery> {
        let start_time = Instant::now();
        let state = self.compiled.clone().ok_or(CircuitError::NotCompiled)?;
        info!("🔐 Mock proving circuit `{}`", self.name());

        let run = run_circuit(&self.definition, inputs, data_source).await?;
        if run.compute_results.len() != usize::from(state.config.max_outputs) {
            return Err(CircuitError::Execution(format!(
                "expected {} results, produced {}",
                state.config.max_outputs,
                run.compute_results.len()
            )));
        }

        let compute_query = ComputeQuery {
            k: state.config.k,
            result_len: state.config.max_outputs,
            vkey: state.vkey.clone(),
            compute_proof: mock_compute_proof(state.query_schema, &run.compute_results),
        };

        info!(
            "✅ Mock proof ready: {} results, {} subqueries ({}ms)",
            run.compute_results.len(),
            run.subqueries.len(),
            start_time.elapsed().as_millis()
        );
        self.last_run = Some(run);
        Ok(compute_query)
    }

    /// Results of the most recent compile or prove run
    pub fn compute_results(&self) -> Result<&[B256]> {
        self.last_run
            .as_ref()
            .map(|run| run.compute_results.as_slice())
            .ok_or(CircuitError::NotCompiled)
    }

    /// Subqueries of the most recent run, bound to a source chain
    pub fn data_query(&self, source_chain_id: u64) -> Result<DataQuery> {
        let subqueries: Vec<DataSubquery> = self
            .last_run
            .as_ref()
            .map(|run| run.subqueries.clone())
            .ok_or(CircuitError::NotCompiled)?;
        Ok(DataQuery::new(source_chain_id, subqueries))
    }
}

/// Results followed by a transcript digest in place of a real proof
fn mock_compute_proof(query_schema: B256, results: &[B256]) -> Bytes {
    let mut proof: Vec<u8> = results.iter().flat_map(|word| word.0).collect();
    let transcript = keccak256((query_schema, results.to_vec()).abi_encode_packed());
    proof.extend_from_slice(transcript.as_slice());
    proof.into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::definition::Step;
    use alloy_primitives::b256;

    #[test]
    fn test_config_for_small_circuit_uses_min_k() {
        let definition = CircuitDefinition::from_source(
            r#"{"name":"tiny","inputSchema":{"a":"CircuitValue"},
            "steps":[{"op":"addToCallback","value":"a"}]}"#,
        )
        .unwrap();
        let config = CircuitConfig::derive(&definition).unwrap();
        assert_eq!(config.k, MIN_K);
        assert_eq!(config.num_lookup_bits, MIN_K - 1);
        assert_eq!(config.max_outputs, 1);
        assert_eq!(config.max_subqueries, 0);
        assert_eq!(config.num_instance, 2);
        assert_eq!(config.num_lookup_advice, 0);
    }

    #[test]
    fn test_config_rejects_circuit_beyond_max_k() {
        let sum = Step::Sum {
            out: "total".to_string(),
            values: "xs".to_string(),
        };
        let mut definition = CircuitDefinition {
            name: "huge".to_string(),
            input_schema: InputSchema::default(),
            steps: vec![sum; 131_000],
        };
        assert_eq!(CircuitConfig::derive(&definition).unwrap().k, MAX_K);

        definition.steps.extend(definition.steps[..9_000].to_vec());
        let err = CircuitConfig::derive(&definition).unwrap_err();
        assert!(matches!(err, CircuitError::CircuitTooLarge(_)));
        assert_eq!(
            err.to_string(),
            "Circuit too large: needs 2^21 rows, the limit is 2^20"
        );
    }

    #[test]
    fn test_compute_query_packed_layout() {
        let query = ComputeQuery {
            k: 10,
            result_len: 1,
            vkey: vec![B256::repeat_byte(0xaa)],
            compute_proof: Bytes::from(vec![1, 2, 3]),
        };
        let packed = query.encode_packed();
        // k (1) + resultLen (2) + vkeyLen (1) + vkey (32) + proofLen (4) + proof (3)
        assert_eq!(packed.len(), 43);
        assert_eq!(packed[0], 10);
        assert_eq!(&packed[1..3], &1u16.to_be_bytes());
        assert_eq!(packed[3], 1);
        assert_eq!(&packed[36..40], &3u32.to_be_bytes());
    }

    #[test]
    fn test_compute_query_packed_bytes() {
        let query = ComputeQuery {
            k: 10,
            result_len: 1,
            vkey: vec![B256::repeat_byte(0xaa)],
            compute_proof: Bytes::from(vec![1, 2, 3]),
        };
        let expected = hex::decode(concat!(
            "0a000101",
            "aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa",
            "00000003010203"
        ))
        .unwrap();
        assert_eq!(query.encode_packed(), expected);
    }

    #[test]
    fn test_query_schema_known_vector() {
        let schema = query_schema(10, 1, &[B256::repeat_byte(0xaa)]);
        assert_eq!(
            schema,
            b256!("da6ab526116363ba6a57a89f8a8850234cd81d306c488c539d74928e6df6dad8")
        );
    }

    #[test]
    fn test_query_schema_depends_on_vkey() {
        let a = query_schema(10, 1, &[B256::ZERO]);
        let b = query_schema(10, 1, &[B256::repeat_byte(1)]);
        assert_ne!(a, b);
    }
}
