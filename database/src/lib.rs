//! Generic entity store.
//!
//! Any type implementing [`Storable`] gets upsert-by-key, point reads and its own listing query
//! through [`SqlStore`], with no per-entity code in the store itself.

pub mod db;
pub mod errors;
pub mod storable;
pub mod store;

pub use db::Database;
pub use errors::{DbError, DbResult};
pub use storable::{Key, ObserveTime, Statement, Storable, Value, COMMIT_TIMESTAMP_SQL};
pub use store::{SqlStore, Store, WriteBatch};
