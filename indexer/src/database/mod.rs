//! Database bootstrap for the indexer

pub mod connection;

pub use connection::{connect, migrate};
