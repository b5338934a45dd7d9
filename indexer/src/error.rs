//! Error types for the indexer

use entity_store::DbError;
use rpc_core::RpcError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum IndexerError {
    #[error("Database error: {0}")]
    Database(#[from] DbError),

    #[error("RPC error: {0}")]
    Rpc(#[from] RpcError),

    /// A balance or output value that is not a base-16 integer.
    #[error("could not parse: {0}")]
    Parse(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<sqlx::Error> for IndexerError {
    fn from(err: sqlx::Error) -> Self {
        IndexerError::Database(DbError::Sqlx(err))
    }
}

impl From<toml::de::Error> for IndexerError {
    fn from(err: toml::de::Error) -> Self {
        IndexerError::Config(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, IndexerError>;
