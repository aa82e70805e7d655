use crate::error::Result;
use alloy_primitives::{Address, Bytes, B256, U256};
use axiom_std_lib::{decode_inputs, BaseCircuit, CompiledCircuit};
use clap::Args;
use ethereum_client::{connect_data_source, Callback, Config, QueryBuilder, QueryOptions, SendQueryArgs};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

#[derive(Debug, Clone, Args)]
pub struct ProveArgs {
    /// Compiled circuit record, as printed by `readCircuit`
    pub compiled_json: String,

    /// ABI-encoded circuit inputs, hex
    pub inputs: String,

    /// Chain data provider: an http(s) RPC URL or a file:// snapshot
    pub provider_uri: String,

    /// Chain the data subqueries are read from
    pub source_chain_id: u64,

    /// Contract called back with the results
    pub callback_target: Address,

    /// Extra bytes passed to the callback, hex
    pub callback_extra_data: Bytes,

    /// Receiver of unused payment
    pub refund_address: Address,

    /// Max fee per gas paid for fulfillment, in wei
    pub max_fee_per_gas: u64,

    /// Gas limit of the callback
    pub callback_gas_limit: u32,

    /// Account sending the query
    pub caller: Address,
}

/// Submittable query printed by `prove`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProveOutput {
    pub value: String,
    pub mock: bool,
    pub query_id: String,
    pub args: SendQueryArgs,
    pub calldata: Bytes,
    pub compute_results: Vec<B256>,
}

/// Mock prove a compiled circuit and assemble its `sendQuery` call
pub async fn prove(args: &ProveArgs, config: &Config) -> Result<ProveOutput> {
    let record = CompiledCircuit::from_json(&args.compiled_json)?;
    let mut circuit = BaseCircuit::from_compiled(&record)?;
    info!("🔁 Reconstructed circuit `{}` from compiled record", circuit.name());

    let input_schema = record.decode_input_schema()?;
    let data_source = connect_data_source(&args.provider_uri)?;
    let inputs = decode_inputs(&input_schema, &args.inputs)?;
    debug!("Decoded {} circuit inputs", inputs.len());

    circuit.load_saved_mock(&record)?;
    let compute_query = circuit.mock_prove(&inputs, data_source.as_ref()).await?;
    let compute_results = circuit.compute_results()?.to_vec();
    let data_query = circuit.data_query(args.source_chain_id)?;

    let query = QueryBuilder::new(config.query.clone()).build(
        &data_query,
        &compute_query,
        Callback {
            target: args.callback_target,
            extra_data: args.callback_extra_data.clone(),
        },
        &QueryOptions {
            max_fee_per_gas: args.max_fee_per_gas,
            callback_gas_limit: args.callback_gas_limit,
            refundee: Some(args.refund_address),
            user_salt: None,
            override_axiom_query_fee: U256::ZERO,
        },
        args.caller,
    )?;

    Ok(ProveOutput {
        value: query.value.to_string(),
        mock: true,
        query_id: query.query_id.to_string(),
        args: query.args,
        calldata: query.calldata,
        compute_results,
    })
}
