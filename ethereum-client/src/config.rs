use crate::error::{EthereumError, Result};
use alloy_primitives::{uint, U256};
use serde::{Deserialize, Serialize};
use std::env;

/// Query protocol version this client speaks
pub const SUPPORTED_SDK_VERSION: &str = "v2";

/// Flat fee charged by the query contract, 0.003 ether
pub const DEFAULT_AXIOM_QUERY_FEE: U256 = uint!(3000000000000000_U256);

/// Gas reserved for on-chain proof verification
pub const DEFAULT_PROOF_VERIFICATION_GAS: u64 = 420_000;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    pub sdk_version: String,
    pub query: QueryConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryConfig {
    pub axiom_query_fee: U256,
    pub proof_verification_gas: u64,
}

impl Config {
    /// Read overrides from the environment, falling back to protocol defaults
    pub fn from_env() -> Result<Self> {
        let sdk_version =
            env::var("AXIOM_SDK_VERSION").unwrap_or_else(|_| SUPPORTED_SDK_VERSION.to_string());

        let axiom_query_fee = match env::var("AXIOM_QUERY_FEE") {
            Ok(raw) => raw
                .trim()
                .parse::<U256>()
                .map_err(|e| EthereumError::Config(format!("Invalid AXIOM_QUERY_FEE: {e}")))?,
            Err(_) => DEFAULT_AXIOM_QUERY_FEE,
        };

        let proof_verification_gas = match env::var("PROOF_VERIFICATION_GAS") {
            Ok(raw) => raw.trim().parse::<u64>().map_err(|e| {
                EthereumError::Config(format!("Invalid PROOF_VERIFICATION_GAS: {e}"))
            })?,
            Err(_) => DEFAULT_PROOF_VERIFICATION_GAS,
        };

        let config = Self {
            sdk_version,
            query: QueryConfig {
                axiom_query_fee,
                proof_verification_gas,
            },
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.sdk_version != SUPPORTED_SDK_VERSION {
            return Err(EthereumError::Config(format!(
                "Unsupported AXIOM_SDK_VERSION {}, only {SUPPORTED_SDK_VERSION} is available",
                self.sdk_version
            )));
        }

        if self.query.proof_verification_gas == 0 {
            return Err(EthereumError::Config(
                "Proof verification gas must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            sdk_version: SUPPORTED_SDK_VERSION.to_string(),
            query: QueryConfig {
                axiom_query_fee: DEFAULT_AXIOM_QUERY_FEE,
                proof_verification_gas: DEFAULT_PROOF_VERIFICATION_GAS,
            },
        }
    }
}
