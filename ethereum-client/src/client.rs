use crate::error::{EthereumError, Result};
use alloy_primitives::{Address, B256, U256};
use alloy_provider::{Provider, ProviderBuilder};
use alloy_rpc_types_eth::{BlockId, BlockNumberOrTag};
use async_trait::async_trait;
use axiom_std_lib::{AccountField, DataSource, HeaderField, StaticDataSource};
use std::sync::Arc;
use tracing::{debug, info};
use url::Url;

/// Answers circuit subqueries from a JSON-RPC node
pub struct RpcDataSource {
    rpc_url: Url,
    http_provider: Arc<dyn Provider>,
}

impl RpcDataSource {
    #[must_use]
    pub fn new(rpc_url: Url) -> Self {
        let http_provider = ProviderBuilder::new().connect_http(rpc_url.clone());
        Self {
            rpc_url,
            http_provider: Arc::new(http_provider),
        }
    }

    #[must_use]
    pub const fn rpc_url(&self) -> &Url {
        &self.rpc_url
    }

    pub async fn header(&self, block_number: u32, field: HeaderField) -> Result<U256> {
        let block = self
            .http_provider
            .get_block_by_number(BlockNumberOrTag::Number(u64::from(block_number)))
            .await?
            .ok_or(EthereumError::BlockNotFound(block_number))?;
        let header = &block.header;

        let value = match field {
            HeaderField::ParentHash => word(header.parent_hash),
            HeaderField::OmmersHash => word(header.ommers_hash),
            HeaderField::Miner => word(header.beneficiary.into_word()),
            HeaderField::StateRoot => word(header.state_root),
            HeaderField::TransactionsRoot => word(header.transactions_root),
            HeaderField::ReceiptsRoot => word(header.receipts_root),
            HeaderField::Difficulty => header.difficulty,
            HeaderField::Number => U256::from(header.number),
            HeaderField::GasLimit => U256::from(header.gas_limit),
            HeaderField::GasUsed => U256::from(header.gas_used),
            HeaderField::Timestamp => U256::from(header.timestamp),
            HeaderField::MixHash => word(header.mix_hash),
            HeaderField::BaseFeePerGas => header
                .base_fee_per_gas
                .map(U256::from)
                .ok_or_else(|| EthereumError::MissingHeaderField("baseFeePerGas".to_string()))?,
        };
        Ok(value)
    }

    pub async fn account(
        &self,
        block_number: u32,
        address: Address,
        field: AccountField,
    ) -> Result<U256> {
        let proof = self
            .http_provider
            .get_proof(address, Vec::new())
            .block_id(BlockId::number(u64::from(block_number)))
            .await?;

        Ok(match field {
            AccountField::Nonce => U256::from(proof.nonce),
            AccountField::Balance => proof.balance,
            AccountField::StorageRoot => word(proof.storage_hash),
            AccountField::CodeHash => word(proof.code_hash),
        })
    }

    pub async fn storage(&self, block_number: u32, address: Address, slot: U256) -> Result<U256> {
        let value = self
            .http_provider
            .get_storage_at(address, slot)
            .block_id(BlockId::number(u64::from(block_number)))
            .await?;
        Ok(value)
    }
}

#[async_trait]
impl DataSource for RpcDataSource {
    async fn header_field(
        &self,
        block_number: u32,
        field: HeaderField,
    ) -> axiom_std_lib::Result<U256> {
        self.header(block_number, field)
            .await
            .map_err(EthereumError::into_circuit_error)
    }

    async fn account_field(
        &self,
        block_number: u32,
        address: Address,
        field: AccountField,
    ) -> axiom_std_lib::Result<U256> {
        self.account(block_number, address, field)
            .await
            .map_err(EthereumError::into_circuit_error)
    }

    async fn storage_slot(
        &self,
        block_number: u32,
        address: Address,
        slot: U256,
    ) -> axiom_std_lib::Result<U256> {
        self.storage(block_number, address, slot)
            .await
            .map_err(EthereumError::into_circuit_error)
    }
}

fn word(hash: B256) -> U256 {
    U256::from_be_bytes(hash.0)
}

/// Resolve a provider locator into a data source.
///
/// `http(s)://` connects to a JSON-RPC node; `file://` loads an offline
/// snapshot of chain values.
pub fn connect_data_source(provider_uri: &str) -> Result<Arc<dyn DataSource>> {
    let url = Url::parse(provider_uri.trim())
        .map_err(|e| EthereumError::InvalidProviderUri(format!("{provider_uri}: {e}")))?;

    match url.scheme() {
        "http" | "https" => {
            info!("🌐 Using JSON-RPC provider at {}", url.host_str().unwrap_or("unknown host"));
            Ok(Arc::new(RpcDataSource::new(url)))
        }
        "file" => {
            let path = url.to_file_path().map_err(|()| {
                EthereumError::InvalidProviderUri(format!("{provider_uri}: not a local path"))
            })?;
            debug!("Loading chain snapshot from {}", path.display());
            Ok(Arc::new(StaticDataSource::from_json_file(&path)?))
        }
        other => Err(EthereumError::InvalidProviderUri(format!(
            "unsupported scheme `{other}` in {provider_uri}"
        ))),
    }
}
