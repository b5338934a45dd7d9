//! AliceNet chain indexer
//!
//! Polls a node's local-state API, decodes every block and transaction, derives account
//! balances, and keeps all of it in a SQLite index that a read-only query service serves from.

pub mod cli;
pub mod config;
pub mod database;
pub mod error;
pub mod indexer;
pub mod metrics;
pub mod models;
pub mod rpc_client;

pub use config::Config;
pub use error::{IndexerError, Result};
pub use indexer::Scanner;
pub use models::Stores;
