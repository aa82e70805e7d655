//! Data subqueries, their on-chain encoding, and the `DataSource` seam that answers them.

use crate::abi::parse_u256;
use crate::error::{CircuitError, Result};
use alloy_primitives::{keccak256, Address, Bytes, B256, U256};
use alloy_sol_types::SolValue;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use tracing::debug;

/// Subquery type identifiers used in the encoded data query
pub const HEADER_SUBQUERY_TYPE: u16 = 1;
pub const ACCOUNT_SUBQUERY_TYPE: u16 = 2;
pub const STORAGE_SUBQUERY_TYPE: u16 = 3;

/// Block header fields a circuit may read
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum HeaderField {
    ParentHash,
    OmmersHash,
    Miner,
    StateRoot,
    TransactionsRoot,
    ReceiptsRoot,
    Difficulty,
    Number,
    GasLimit,
    GasUsed,
    Timestamp,
    MixHash,
    BaseFeePerGas,
}

impl HeaderField {
    /// Position of the field in the RLP-encoded header
    #[must_use]
    pub const fn index(self) -> u32 {
        match self {
            Self::ParentHash => 0,
            Self::OmmersHash => 1,
            Self::Miner => 2,
            Self::StateRoot => 3,
            Self::TransactionsRoot => 4,
            Self::ReceiptsRoot => 5,
            Self::Difficulty => 7,
            Self::Number => 8,
            Self::GasLimit => 9,
            Self::GasUsed => 10,
            Self::Timestamp => 11,
            Self::MixHash => 13,
            Self::BaseFeePerGas => 15,
        }
    }
}

/// Account fields a circuit may read
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum AccountField {
    Nonce,
    Balance,
    StorageRoot,
    CodeHash,
}

impl AccountField {
    #[must_use]
    pub const fn index(self) -> u32 {
        match self {
            Self::Nonce => 0,
            Self::Balance => 1,
            Self::StorageRoot => 2,
            Self::CodeHash => 3,
        }
    }
}

/// A single data fetch requested by a circuit
#[derive(Clone, PartialEq, Eq, Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum DataSubquery {
    #[serde(rename_all = "camelCase")]
    Header { block_number: u32, field: HeaderField },
    #[serde(rename_all = "camelCase")]
    Account {
        block_number: u32,
        address: Address,
        field: AccountField,
    },
    #[serde(rename_all = "camelCase")]
    Storage {
        block_number: u32,
        address: Address,
        slot: U256,
    },
}

impl DataSubquery {
    #[must_use]
    pub const fn subquery_type(&self) -> u16 {
        match self {
            Self::Header { .. } => HEADER_SUBQUERY_TYPE,
            Self::Account { .. } => ACCOUNT_SUBQUERY_TYPE,
            Self::Storage { .. } => STORAGE_SUBQUERY_TYPE,
        }
    }

    #[must_use]
    pub const fn block_number(&self) -> u32 {
        match self {
            Self::Header { block_number, .. }
            | Self::Account { block_number, .. }
            | Self::Storage { block_number, .. } => *block_number,
        }
    }

    /// Packed encoding of the subquery fields
    #[must_use]
    pub fn encode_data(&self) -> Vec<u8> {
        match self {
            Self::Header {
                block_number,
                field,
            } => (*block_number, field.index()).abi_encode_packed(),
            Self::Account {
                block_number,
                address,
                field,
            } => (*block_number, *address, field.index()).abi_encode_packed(),
            Self::Storage {
                block_number,
                address,
                slot,
            } => (*block_number, *address, *slot).abi_encode_packed(),
        }
    }

    #[must_use]
    pub fn hash(&self) -> B256 {
        keccak256((self.subquery_type(), Bytes::from(self.encode_data())).abi_encode_packed())
    }
}

/// Ordered data subqueries bound to the chain they are read from
#[derive(Clone, PartialEq, Eq, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataQuery {
    pub source_chain_id: u64,
    pub subqueries: Vec<DataSubquery>,
}

impl DataQuery {
    #[must_use]
    pub const fn new(source_chain_id: u64, subqueries: Vec<DataSubquery>) -> Self {
        Self {
            source_chain_id,
            subqueries,
        }
    }

    #[allow(clippy::cast_possible_truncation)]
    fn len_u16(&self) -> u16 {
        self.subqueries.len() as u16
    }

    /// Packed encoding submitted alongside the query
    #[must_use]
    pub fn encode(&self) -> Bytes {
        let mut encoded = (self.source_chain_id, self.len_u16()).abi_encode_packed();
        for subquery in &self.subqueries {
            encoded.extend_from_slice(&subquery.subquery_type().to_be_bytes());
            encoded.extend_from_slice(&subquery.encode_data());
        }
        encoded.into()
    }

    /// Commitment over the chain id and every subquery hash
    #[must_use]
    pub fn hash(&self) -> B256 {
        let mut packed = (self.source_chain_id, self.len_u16()).abi_encode_packed();
        for subquery in &self.subqueries {
            packed.extend_from_slice(subquery.hash().as_slice());
        }
        keccak256(packed)
    }
}

/// Answers data subqueries for a running circuit
#[async_trait]
pub trait DataSource: Send + Sync {
    async fn header_field(&self, block_number: u32, field: HeaderField) -> Result<U256>;

    async fn account_field(
        &self,
        block_number: u32,
        address: Address,
        field: AccountField,
    ) -> Result<U256>;

    async fn storage_slot(&self, block_number: u32, address: Address, slot: U256) -> Result<U256>;

    async fn fetch(&self, subquery: &DataSubquery) -> Result<U256> {
        debug!("Fetching subquery {:?}", subquery);
        match subquery {
            DataSubquery::Header {
                block_number,
                field,
            } => self.header_field(*block_number, *field).await,
            DataSubquery::Account {
                block_number,
                address,
                field,
            } => self.account_field(*block_number, *address, *field).await,
            DataSubquery::Storage {
                block_number,
                address,
                slot,
            } => self.storage_slot(*block_number, *address, *slot).await,
        }
    }
}

/// Offline snapshot of chain data, as stored in a JSON fixture file
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataSnapshot {
    #[serde(default)]
    pub headers: Vec<HeaderEntry>,
    #[serde(default)]
    pub accounts: Vec<AccountEntry>,
    #[serde(default)]
    pub storage: Vec<StorageEntry>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct HeaderEntry {
    pub block: u32,
    pub field: HeaderField,
    pub value: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AccountEntry {
    pub block: u32,
    pub address: Address,
    pub field: AccountField,
    pub value: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StorageEntry {
    pub block: u32,
    pub address: Address,
    pub slot: String,
    pub value: String,
}

/// In-memory `DataSource` backed by fixed values
#[derive(Clone, Debug, Default)]
pub struct StaticDataSource {
    headers: HashMap<(u32, HeaderField), U256>,
    accounts: HashMap<(u32, Address, AccountField), U256>,
    storage: HashMap<(u32, Address, U256), U256>,
}

impl StaticDataSource {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_header(mut self, block_number: u32, field: HeaderField, value: U256) -> Self {
        self.headers.insert((block_number, field), value);
        self
    }

    #[must_use]
    pub fn with_account(
        mut self,
        block_number: u32,
        address: Address,
        field: AccountField,
        value: U256,
    ) -> Self {
        self.accounts.insert((block_number, address, field), value);
        self
    }

    #[must_use]
    pub fn with_storage(mut self, block_number: u32, address: Address, slot: U256, value: U256) -> Self {
        self.storage.insert((block_number, address, slot), value);
        self
    }

    pub fn from_snapshot(snapshot: &DataSnapshot) -> Result<Self> {
        let word = |raw: &str| {
            parse_u256(raw)
                .ok_or_else(|| CircuitError::DataSource(format!("invalid snapshot value `{raw}`")))
        };

        let mut source = Self::new();
        for entry in &snapshot.headers {
            source = source.with_header(entry.block, entry.field, word(&entry.value)?);
        }
        for entry in &snapshot.accounts {
            source = source.with_account(entry.block, entry.address, entry.field, word(&entry.value)?);
        }
        for entry in &snapshot.storage {
            source = source.with_storage(entry.block, entry.address, word(&entry.slot)?, word(&entry.value)?);
        }
        Ok(source)
    }

    /// Load a snapshot fixture from disk
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| {
            CircuitError::DataSource(format!("failed to read {}: {e}", path.display()))
        })?;
        let snapshot: DataSnapshot = serde_json::from_str(&text).map_err(|e| {
            CircuitError::DataSource(format!("invalid snapshot {}: {e}", path.display()))
        })?;
        Self::from_snapshot(&snapshot)
    }
}

#[async_trait]
impl DataSource for StaticDataSource {
    async fn header_field(&self, block_number: u32, field: HeaderField) -> Result<U256> {
        self.headers
            .get(&(block_number, field))
            .copied()
            .ok_or_else(|| {
                CircuitError::DataSource(format!("no header {field:?} for block {block_number}"))
            })
    }

    async fn account_field(
        &self,
        block_number: u32,
        address: Address,
        field: AccountField,
    ) -> Result<U256> {
        self.accounts
            .get(&(block_number, address, field))
            .copied()
            .ok_or_else(|| {
                CircuitError::DataSource(format!(
                    "no account {field:?} for {address} at block {block_number}"
                ))
            })
    }

    async fn storage_slot(&self, block_number: u32, address: Address, slot: U256) -> Result<U256> {
        // Unset storage slots read as zero on chain
        Ok(self
            .storage
            .get(&(block_number, address, slot))
            .copied()
            .unwrap_or_default())
    }
}
