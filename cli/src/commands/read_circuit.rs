use crate::error::Result;
use axiom_std_lib::{decode_inputs, BaseCircuit, CompiledCircuit};
use clap::Args;
use ethereum_client::connect_data_source;
use std::path::PathBuf;
use tracing::info;

#[derive(Debug, Clone, Args)]
pub struct ReadCircuitArgs {
    /// Path to the circuit definition file
    pub circuit_path: PathBuf,

    /// ABI-encoded circuit inputs, hex
    pub inputs: String,

    /// Chain data provider: an http(s) RPC URL or a file:// snapshot
    pub provider_uri: String,
}

/// Mock compile a circuit definition into its compiled record
pub async fn read_circuit(args: &ReadCircuitArgs) -> Result<CompiledCircuit> {
    info!("📖 Reading circuit from {}", args.circuit_path.display());

    let mut circuit = BaseCircuit::from_file(&args.circuit_path)?;
    let data_source = connect_data_source(&args.provider_uri)?;
    let inputs = decode_inputs(circuit.input_schema(), &args.inputs)?;

    let record = circuit.mock_compile(&inputs, data_source.as_ref()).await?;
    info!(
        "✅ Compiled `{}` (k={}, {} outputs)",
        circuit.name(),
        record.config.k,
        record.config.max_outputs
    );
    Ok(record)
}
