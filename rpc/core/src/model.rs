//! Wire models of the node's local-state JSON API.
//!
//! Field names follow the node's JSON exactly; missing fields fall back to their defaults.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// RPC error type
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RpcError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Decode error: {0}")]
    Decode(String),

    /// The node answered, but with a non-success status.
    #[error("API error {status}: {message}")]
    Api { status: u16, message: String },
}

impl RpcError {
    /// A node-level rejection rather than a transport or decoding failure. For transaction
    /// lookups this means the transaction has been pruned from the node.
    pub fn is_missing(&self) -> bool {
        matches!(self, RpcError::Api { .. })
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BlockNumberRequest {}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct BlockNumberResponse {
    pub block_height: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct BlockHeaderRequest {
    pub height: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct BlockHeaderResponse {
    pub block_header: BlockHeader,
}

/// Signed header of a block, including the hashes of every transaction it contains.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct BlockHeader {
    #[serde(rename = "BClaims")]
    pub claims: BlockClaims,
    pub sig_group: String,
    #[serde(rename = "TxHshLst")]
    pub tx_hashes: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct BlockClaims {
    #[serde(rename = "ChainID")]
    pub chain_id: u32,
    pub height: u32,
    pub tx_count: u32,
    pub prev_block: String,
    pub tx_root: String,
    pub state_root: String,
    pub header_root: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct MinedTransactionRequest {
    pub tx_hash: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct MinedTransaction {
    pub tx: Tx,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct Tx {
    pub fee: String,
    pub vin: Vec<TxIn>,
    pub vout: Vec<Vout>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct TxIn {
    #[serde(rename = "TXInLinker")]
    pub linker: TxInLinker,
    pub signature: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct TxInLinker {
    #[serde(rename = "TXInPreImage")]
    pub pre_image: TxInPreImage,
    pub tx_hash: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct TxInPreImage {
    #[serde(rename = "ChainID")]
    pub chain_id: u32,
    pub consumed_tx_idx: u32,
    pub consumed_tx_hash: String,
}

/// One transaction output as the node sends it: at most one of the two shapes is set.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct Vout {
    pub data_store: Option<DataStoreOut>,
    pub value_store: Option<ValueStoreOut>,
}

impl Vout {
    /// Collapse the wire shape into a [`TxOutput`]. Empty entries yield `None`; a data store
    /// takes precedence over a value store.
    pub fn output(&self) -> Option<TxOutput> {
        match (&self.data_store, &self.value_store) {
            (Some(data), _) => Some(TxOutput::Data(data.clone())),
            (None, Some(value)) => Some(TxOutput::Value(value.clone())),
            (None, None) => None,
        }
    }
}

/// A transaction output is either a keyed data entry or a spendable value.
#[derive(Debug, Clone, PartialEq)]
pub enum TxOutput {
    Data(DataStoreOut),
    Value(ValueStoreOut),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct DataStoreOut {
    #[serde(rename = "DSLinker")]
    pub linker: DataStoreLinker,
    pub signature: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct DataStoreLinker {
    #[serde(rename = "DSPreImage")]
    pub pre_image: DataStorePreImage,
    pub tx_hash: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct DataStorePreImage {
    #[serde(rename = "ChainID")]
    pub chain_id: u32,
    pub index: String,
    pub issued_at: u32,
    pub deposit: String,
    pub raw_data: String,
    #[serde(rename = "TXOutIdx")]
    pub tx_out_idx: u32,
    pub owner: String,
    pub fee: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct ValueStoreOut {
    #[serde(rename = "VSPreImage")]
    pub pre_image: ValueStorePreImage,
    pub tx_hash: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct ValueStorePreImage {
    #[serde(rename = "ChainID")]
    pub chain_id: u32,
    pub value: String,
    #[serde(rename = "TXOutIdx")]
    pub tx_out_idx: u32,
    pub owner: String,
    pub fee: String,
}
