//! Database connection management

use crate::error::Result;
use entity_store::Database;
use std::path::Path;

const SCHEMA: &str = include_str!("../../migrations/001_initial_schema.sql");

/// Open the database at `path` and make sure every entity table exists.
pub async fn connect(path: &Path, max_connections: u32) -> Result<Database> {
    let db = Database::open_with(path, max_connections).await?;
    migrate(&db).await?;
    Ok(db)
}

/// Create any missing tables. Safe to run against an already initialised database.
pub async fn migrate(db: &Database) -> Result<()> {
    db.execute_batch(SCHEMA).await?;
    tracing::debug!("schema up to date");
    Ok(())
}
