//! Upsert/get/list machinery implemented once for every [`Storable`] type.

use crate::db::Database;
use crate::errors::{DbError, DbResult};
use crate::storable::{Key, Statement, Storable, Value};
use async_trait::async_trait;
use sqlx::{SqliteConnection, SqlitePool};
use std::marker::PhantomData;

/// Persistence contract shared by the scanner (writer) and the query service (reader).
#[async_trait]
pub trait Store<T: Storable>: Send + Sync {
    /// Insert or replace the row with the item's key.
    async fn insert(&self, item: &T) -> DbResult<()>;

    /// Point read by exact key. Fails with [`DbError::NotFound`] when no row matches.
    async fn get(&self, key: &Key) -> DbResult<T>;

    /// Run the type's listing query. No matches is an empty vector, not an error.
    async fn list(&self, prefix: &Key, limit: i64, offset: i64) -> DbResult<Vec<T>>;

    /// Queue the upsert of `item` in `batch` instead of writing it now.
    fn stage(&self, batch: &mut WriteBatch, item: &T) -> DbResult<()> {
        batch.put(item)
    }
}

/// Upserts that are written together or not at all, see [`Database::write_batch`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WriteBatch {
    statements: Vec<Statement>,
}

impl WriteBatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn put<T: Storable>(&mut self, item: &T) -> DbResult<()> {
        let statement = upsert(item)?;
        self.statements.push(statement);
        Ok(())
    }

    pub fn push(&mut self, statement: Statement) {
        self.statements.push(statement);
    }

    pub fn statements(&self) -> &[Statement] {
        &self.statements
    }

    pub fn len(&self) -> usize {
        self.statements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.statements.is_empty()
    }
}

/// Binds every non-commit value positionally onto a sqlx query.
macro_rules! bind_values {
    ($query:expr, $values:expr) => {{
        let mut query = $query;
        for value in $values {
            query = match value {
                Value::Integer(v) => query.bind(*v),
                Value::Text(v) => query.bind(v.as_str()),
                Value::Bool(v) => query.bind(*v),
                Value::Timestamp(v) => query.bind(*v),
                Value::Null => query.bind(Option::<String>::None),
                Value::CommitTimestamp => continue,
            };
        }
        query
    }};
}

/// SQLite-backed [`Store`] for one entity type.
pub struct SqlStore<T> {
    pool: SqlitePool,
    _entity: PhantomData<fn() -> T>,
}

impl<T> SqlStore<T> {
    pub fn new(database: &Database) -> Self {
        Self {
            pool: database.pool().clone(),
            _entity: PhantomData,
        }
    }
}

impl<T> Clone for SqlStore<T> {
    fn clone(&self) -> Self {
        Self {
            pool: self.pool.clone(),
            _entity: PhantomData,
        }
    }
}

fn ensure_bindable(table: &'static str, values: &[Value]) -> DbResult<()> {
    if values.iter().all(Value::is_bound) {
        Ok(())
    } else {
        Err(DbError::InvalidData(format!(
            "{table}: commit timestamp can only be written, not queried"
        )))
    }
}

fn insert_sql<T: Storable>(values: &[Value]) -> String {
    let placeholders: Vec<&str> = values.iter().map(Value::placeholder).collect();
    format!(
        "INSERT OR REPLACE INTO {} ({}) VALUES ({})",
        T::TABLE,
        T::COLUMNS.join(", "),
        placeholders.join(", ")
    )
}

fn upsert<T: Storable>(item: &T) -> DbResult<Statement> {
    let values = item.values();
    if values.len() != T::COLUMNS.len() {
        return Err(DbError::InvalidData(format!(
            "{}: {} values for {} columns",
            T::TABLE,
            values.len(),
            T::COLUMNS.len()
        )));
    }

    let sql = insert_sql::<T>(&values);
    Ok(values.into_iter().fold(Statement::new(sql), |statement, value| statement.bind(value)))
}

pub(crate) async fn execute_statement(conn: &mut SqliteConnection, statement: &Statement) -> DbResult<()> {
    bind_values!(sqlx::query(statement.sql()), statement.params())
        .execute(conn)
        .await?;
    Ok(())
}

fn get_sql<T: Storable>() -> String {
    let predicate: Vec<String> = T::KEY_COLUMNS.iter().map(|column| format!("{column} = ?")).collect();
    format!("SELECT * FROM {} WHERE {}", T::TABLE, predicate.join(" AND "))
}

#[async_trait]
impl<T: Storable> Store<T> for SqlStore<T> {
    async fn insert(&self, item: &T) -> DbResult<()> {
        let statement = upsert(item)?;
        bind_values!(sqlx::query(statement.sql()), statement.params())
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    async fn get(&self, key: &Key) -> DbResult<T> {
        if key.len() != T::KEY_COLUMNS.len() {
            return Err(DbError::InvalidKey {
                table: T::TABLE,
                expected: T::KEY_COLUMNS.len(),
                got: key.len(),
            });
        }
        ensure_bindable(T::TABLE, key.parts())?;

        let sql = get_sql::<T>();
        let row = bind_values!(sqlx::query_as::<_, T>(&sql), key.parts())
            .fetch_optional(&self.pool)
            .await?;

        row.ok_or_else(|| DbError::NotFound {
            table: T::TABLE,
            key: key.to_string(),
        })
    }

    async fn list(&self, prefix: &Key, limit: i64, offset: i64) -> DbResult<Vec<T>> {
        let statement = T::list(prefix, limit, offset);
        ensure_bindable(T::TABLE, statement.params())?;

        let rows = bind_values!(sqlx::query_as::<_, T>(statement.sql()), statement.params())
            .fetch_all(&self.pool)
            .await?;

        Ok(rows)
    }
}
