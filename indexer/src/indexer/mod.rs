//! Scanning pipeline: decode chain data, derive account state, persist it in height order

pub mod decoder;
pub mod ledger;
pub mod service;

pub use decoder::Output;
pub use ledger::Ledger;
pub use service::Scanner;
