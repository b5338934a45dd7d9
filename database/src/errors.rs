use thiserror::Error;

#[derive(Error, Debug)]
pub enum DbError {
    #[error("SQLite error: {0}")]
    Sqlx(#[from] sqlx::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Key not found: {table} {key}")]
    NotFound { table: &'static str, key: String },

    #[error("Invalid key for {table}: expected {expected} parts, got {got}")]
    InvalidKey { table: &'static str, expected: usize, got: usize },

    #[error("Invalid data: {0}")]
    InvalidData(String),
}

impl DbError {
    /// True when a point read matched no row. Everything else is an internal failure.
    pub fn is_not_found(&self) -> bool {
        matches!(self, DbError::NotFound { .. })
    }
}

pub type DbResult<T> = Result<T, DbError>;
