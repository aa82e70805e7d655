//! Assembly of the `sendQuery` transaction for a proven circuit.

use crate::config::QueryConfig;
use crate::contracts::{sendQueryCall, AxiomV2Callback, AxiomV2ComputeQuery, AxiomV2FeeData};
use crate::error::{EthereumError, Result};
use alloy_primitives::{keccak256, Address, Bytes, B256, U256};
use alloy_sol_types::{SolCall, SolValue};
use axiom_std_lib::{ComputeQuery, DataQuery};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// Query format version committed to by the query hash
pub const QUERY_VERSION: u8 = 2;

/// Contract call made once the query is fulfilled
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Callback {
    pub target: Address,
    pub extra_data: Bytes,
}

/// Fee and refund options for a query
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryOptions {
    pub max_fee_per_gas: u64,
    pub callback_gas_limit: u32,
    /// Defaults to the caller
    pub refundee: Option<Address>,
    /// Random when unset
    pub user_salt: Option<B256>,
    pub override_axiom_query_fee: U256,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeeData {
    pub max_fee_per_gas: String,
    pub callback_gas_limit: u32,
    pub override_axiom_query_fee: String,
}

/// Named `sendQuery` arguments, in call order
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendQueryArgs {
    pub source_chain_id: String,
    pub data_query_hash: B256,
    pub compute_query: ComputeQuery,
    pub callback: Callback,
    pub fee_data: FeeData,
    pub user_salt: B256,
    pub refundee: Address,
    pub data_query: Bytes,
}

/// A fully assembled, unsent query
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SendQuery {
    pub value: U256,
    pub query_id: U256,
    pub query_hash: B256,
    pub args: SendQueryArgs,
    pub calldata: Bytes,
}

/// Builds `sendQuery` calls against fixed fee parameters
#[derive(Debug, Clone)]
pub struct QueryBuilder {
    config: QueryConfig,
}

impl QueryBuilder {
    #[must_use]
    pub const fn new(config: QueryConfig) -> Self {
        Self { config }
    }

    /// Payment attached to the call: worst-case gas plus the protocol fee
    #[must_use]
    pub fn payment(&self, options: &QueryOptions) -> U256 {
        let gas = U256::from(options.callback_gas_limit)
            + U256::from(self.config.proof_verification_gas);
        let fee = self.config.axiom_query_fee.max(options.override_axiom_query_fee);
        U256::from(options.max_fee_per_gas) * gas + fee
    }

    pub fn build(
        &self,
        data_query: &DataQuery,
        compute_query: &ComputeQuery,
        callback: Callback,
        options: &QueryOptions,
        caller: Address,
    ) -> Result<SendQuery> {
        if compute_query.vkey.len() > usize::from(u8::MAX) {
            return Err(EthereumError::Query(format!(
                "verifying key has {} words, at most {} fit",
                compute_query.vkey.len(),
                u8::MAX
            )));
        }
        if u32::try_from(compute_query.compute_proof.len()).is_err() {
            return Err(EthereumError::Query("compute proof is too long".to_string()));
        }

        let refundee = options.refundee.unwrap_or(caller);
        let user_salt = options
            .user_salt
            .unwrap_or_else(|| B256::from(rand::random::<[u8; 32]>()));
        let data_query_hash = data_query.hash();
        let encoded_data_query = data_query.encode();

        let mut query_preimage = vec![QUERY_VERSION];
        query_preimage
            .extend_from_slice(&(data_query.source_chain_id, data_query_hash).abi_encode_packed());
        query_preimage.extend_from_slice(&compute_query.encode_packed());
        let query_hash = keccak256(query_preimage);
        let callback_hash =
            keccak256((callback.target, callback.extra_data.clone()).abi_encode_packed());
        let query_id = U256::from_be_bytes(
            keccak256(
                (
                    data_query.source_chain_id,
                    caller,
                    user_salt,
                    query_hash,
                    callback_hash,
                    refundee,
                )
                    .abi_encode_packed(),
            )
            .0,
        );

        let call = sendQueryCall {
            sourceChainId: data_query.source_chain_id,
            dataQueryHash: data_query_hash,
            computeQuery: AxiomV2ComputeQuery {
                k: compute_query.k,
                resultLen: compute_query.result_len,
                vkey: compute_query.vkey.clone(),
                computeProof: compute_query.compute_proof.clone(),
            },
            callback: AxiomV2Callback {
                target: callback.target,
                extraData: callback.extra_data.clone(),
            },
            feeData: AxiomV2FeeData {
                maxFeePerGas: options.max_fee_per_gas,
                callbackGasLimit: options.callback_gas_limit,
                overrideAxiomQueryFee: options.override_axiom_query_fee,
            },
            userSalt: user_salt,
            refundee,
            dataQuery: encoded_data_query.clone(),
        };
        let calldata: Bytes = call.abi_encode().into();

        let value = self.payment(options);
        debug!("Query hash {query_hash}, callback hash {callback_hash}");
        info!(
            "📦 Built sendQuery for chain {} with {} subqueries, value {} wei",
            data_query.source_chain_id,
            data_query.subqueries.len(),
            value
        );

        Ok(SendQuery {
            value,
            query_id,
            query_hash,
            args: SendQueryArgs {
                source_chain_id: data_query.source_chain_id.to_string(),
                data_query_hash,
                compute_query: compute_query.clone(),
                callback,
                fee_data: FeeData {
                    max_fee_per_gas: options.max_fee_per_gas.to_string(),
                    callback_gas_limit: options.callback_gas_limit,
                    override_axiom_query_fee: options.override_axiom_query_fee.to_string(),
                },
                user_salt,
                refundee,
                data_query: encoded_data_query,
            },
            calldata,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{DEFAULT_AXIOM_QUERY_FEE, DEFAULT_PROOF_VERIFICATION_GAS};
    use alloy_primitives::{address, b256};
    use axiom_std_lib::{DataSubquery, HeaderField};

    fn builder() -> QueryBuilder {
        QueryBuilder::new(QueryConfig {
            axiom_query_fee: DEFAULT_AXIOM_QUERY_FEE,
            proof_verification_gas: DEFAULT_PROOF_VERIFICATION_GAS,
        })
    }

    fn options() -> QueryOptions {
        QueryOptions {
            max_fee_per_gas: 25_000_000_000,
            callback_gas_limit: 100_000,
            refundee: None,
            user_salt: Some(B256::repeat_byte(7)),
            override_axiom_query_fee: U256::ZERO,
        }
    }

    fn compute_query() -> ComputeQuery {
        ComputeQuery {
            k: 8,
            result_len: 1,
            vkey: vec![B256::repeat_byte(1), B256::repeat_byte(2)],
            compute_proof: Bytes::from(vec![0xab; 64]),
        }
    }

    fn data_query() -> DataQuery {
        DataQuery::new(
            11_155_111,
            vec![DataSubquery::Header {
                block_number: 5_000_000,
                field: HeaderField::Timestamp,
            }],
        )
    }

    #[test]
    fn test_payment_covers_gas_and_fee() {
        let value = builder().payment(&options());
        let expected = U256::from(25_000_000_000u64) * U256::from(520_000u64)
            + U256::from(3_000_000_000_000_000u64);
        assert_eq!(value, expected);
    }

    #[test]
    fn test_payment_with_huge_verification_gas() {
        let builder = QueryBuilder::new(QueryConfig {
            axiom_query_fee: U256::ZERO,
            proof_verification_gas: u64::MAX,
        });
        let mut opts = options();
        opts.max_fee_per_gas = u64::MAX;
        let gas = U256::from(u64::MAX) + U256::from(100_000u64);
        assert_eq!(builder.payment(&opts), U256::from(u64::MAX) * gas);
    }

    #[test]
    fn test_override_fee_only_raises_payment() {
        let mut opts = options();
        opts.override_axiom_query_fee = U256::from(1u64);
        assert_eq!(builder().payment(&opts), builder().payment(&options()));

        opts.override_axiom_query_fee = U256::from(10_000_000_000_000_000u64);
        assert!(builder().payment(&opts) > builder().payment(&options()));
    }

    #[test]
    fn test_refundee_defaults_to_caller() {
        let caller = address!("00000000000000000000000000000000000000c0");
        let callback = Callback {
            target: Address::repeat_byte(0x11),
            extra_data: Bytes::new(),
        };
        let query = builder()
            .build(&data_query(), &compute_query(), callback, &options(), caller)
            .unwrap();
        assert_eq!(query.args.refundee, caller);
    }

    #[test]
    fn test_query_hash_known_vector() {
        let callback = Callback {
            target: Address::ZERO,
            extra_data: Bytes::new(),
        };
        let query = builder()
            .build(&data_query(), &compute_query(), callback, &options(), Address::ZERO)
            .unwrap();
        assert_eq!(
            query.args.data_query_hash,
            b256!("4a40081dbc123c01a0f84369080dc80323257ee43047fbfb7c21bb6684506430")
        );
        assert_eq!(
            query.query_hash,
            b256!("7bf3ffed201a15a19e5599eae921e9d5832cd0fd2b3333ae769b20f8c8569175")
        );
    }

    #[test]
    fn test_query_id_depends_on_salt() {
        let caller = Address::repeat_byte(0xc0);
        let callback = Callback {
            target: Address::repeat_byte(0x11),
            extra_data: Bytes::from(vec![1, 2]),
        };
        let a = builder()
            .build(&data_query(), &compute_query(), callback.clone(), &options(), caller)
            .unwrap();
        let mut salted = options();
        salted.user_salt = Some(B256::repeat_byte(8));
        let b = builder()
            .build(&data_query(), &compute_query(), callback, &salted, caller)
            .unwrap();

        assert_eq!(a.query_hash, b.query_hash);
        assert_ne!(a.query_id, b.query_id);
    }

    #[test]
    fn test_random_salt_when_unset() {
        let mut opts = options();
        opts.user_salt = None;
        let callback = Callback {
            target: Address::ZERO,
            extra_data: Bytes::new(),
        };
        let a = builder()
            .build(&data_query(), &compute_query(), callback.clone(), &opts, Address::ZERO)
            .unwrap();
        let b = builder()
            .build(&data_query(), &compute_query(), callback, &opts, Address::ZERO)
            .unwrap();
        assert_ne!(a.args.user_salt, b.args.user_salt);
    }

    #[test]
    fn test_calldata_decodes_to_args() {
        let caller = Address::repeat_byte(0xc0);
        let callback = Callback {
            target: Address::repeat_byte(0x11),
            extra_data: Bytes::from(vec![0xde, 0xad]),
        };
        let query = builder()
            .build(&data_query(), &compute_query(), callback, &options(), caller)
            .unwrap();

        assert_eq!(&query.calldata[..4], sendQueryCall::SELECTOR.as_slice());
        let decoded = sendQueryCall::abi_decode(&query.calldata).unwrap();
        assert_eq!(decoded.sourceChainId, 11_155_111);
        assert_eq!(decoded.dataQueryHash, data_query().hash());
        assert_eq!(decoded.computeQuery.k, 8);
        assert_eq!(decoded.computeQuery.vkey, compute_query().vkey);
        assert_eq!(decoded.callback.extraData, Bytes::from(vec![0xde, 0xad]));
        assert_eq!(decoded.feeData.callbackGasLimit, 100_000);
        assert_eq!(decoded.userSalt, B256::repeat_byte(7));
        assert_eq!(decoded.refundee, caller);
        assert_eq!(decoded.dataQuery, data_query().encode());
    }
}
