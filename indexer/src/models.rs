//! Entities persisted by the indexer and the stores that hold them.

use entity_store::{key, Database, Key, ObserveTime, SqlStore, Statement, Storable, Store, Value};
use sqlx::sqlite::SqliteRow;
use sqlx::{FromRow, Row};
use std::sync::Arc;

/// Name of the scanner's progress row in `scanner_cursors`.
pub const SCANNER_CURSOR: &str = "scanner";

fn paged(sql: &str, limit: i64, offset: i64) -> Statement {
    Statement::new(sql).bind(limit).bind(offset)
}

fn prefixed(sql: &str, prefix: &Key, limit: i64, offset: i64) -> Statement {
    Statement::new(sql).bind(prefix.part(0)).bind(limit).bind(offset)
}

/// A block header, one row per height.
#[derive(Debug, Clone, PartialEq)]
pub struct Block {
    pub height: i64,
    pub chain_id: i64,
    pub transaction_count: i64,
    pub previous_block_hash: String,
    pub transaction_root_hash: String,
    pub state_root_hash: String,
    pub header_root_hash: String,
    pub group_signature_hash: String,
    pub transaction_hashes: Vec<String>,
    pub observe_time: ObserveTime,
}

impl<'r> FromRow<'r, SqliteRow> for Block {
    fn from_row(row: &'r SqliteRow) -> Result<Self, sqlx::Error> {
        // The hash list is kept as a JSON array in a single column.
        let hashes: String = row.try_get("transaction_hashes")?;
        let transaction_hashes = serde_json::from_str(&hashes).map_err(|e| sqlx::Error::ColumnDecode {
            index: "transaction_hashes".to_string(),
            source: Box::new(e),
        })?;

        Ok(Self {
            height: row.try_get("height")?,
            chain_id: row.try_get("chain_id")?,
            transaction_count: row.try_get("transaction_count")?,
            previous_block_hash: row.try_get("previous_block_hash")?,
            transaction_root_hash: row.try_get("transaction_root_hash")?,
            state_root_hash: row.try_get("state_root_hash")?,
            header_root_hash: row.try_get("header_root_hash")?,
            group_signature_hash: row.try_get("group_signature_hash")?,
            transaction_hashes,
            observe_time: row.try_get("observe_time")?,
        })
    }
}

impl Storable for Block {
    const TABLE: &'static str = "blocks";
    const COLUMNS: &'static [&'static str] = &[
        "height",
        "chain_id",
        "transaction_count",
        "previous_block_hash",
        "transaction_root_hash",
        "state_root_hash",
        "header_root_hash",
        "group_signature_hash",
        "transaction_hashes",
        "observe_time",
    ];
    const KEY_COLUMNS: &'static [&'static str] = &["height"];

    fn key(&self) -> Key {
        key![self.height]
    }

    fn values(&self) -> Vec<Value> {
        let hashes = serde_json::Value::from(self.transaction_hashes.clone()).to_string();
        vec![
            self.height.into(),
            self.chain_id.into(),
            self.transaction_count.into(),
            (&self.previous_block_hash).into(),
            (&self.transaction_root_hash).into(),
            (&self.state_root_hash).into(),
            (&self.header_root_hash).into(),
            (&self.group_signature_hash).into(),
            hashes.into(),
            self.observe_time.into(),
        ]
    }

    fn list(_prefix: &Key, limit: i64, offset: i64) -> Statement {
        paged("SELECT * FROM blocks ORDER BY height DESC LIMIT ? OFFSET ?", limit, offset)
    }
}

/// A transaction as discovered at `height`. `missing` is set when the node no longer serves it.
#[derive(Debug, Clone, PartialEq, FromRow)]
pub struct Transaction {
    pub height: i64,
    pub transaction_hash: String,
    pub observe_time: ObserveTime,
    pub missing: Option<bool>,
}

impl Storable for Transaction {
    const TABLE: &'static str = "transactions";
    const COLUMNS: &'static [&'static str] = &["height", "transaction_hash", "observe_time", "missing"];
    const KEY_COLUMNS: &'static [&'static str] = &["height", "transaction_hash"];

    fn key(&self) -> Key {
        key![self.height, &self.transaction_hash]
    }

    fn values(&self) -> Vec<Value> {
        vec![
            self.height.into(),
            (&self.transaction_hash).into(),
            self.observe_time.into(),
            self.missing.into(),
        ]
    }

    fn list(_prefix: &Key, limit: i64, offset: i64) -> Statement {
        paged(
            "SELECT * FROM transactions ORDER BY height DESC, transaction_hash DESC LIMIT ? OFFSET ?",
            limit,
            offset,
        )
    }
}

#[derive(Debug, Clone, PartialEq, FromRow)]
pub struct TransactionInput {
    pub transaction_hash: String,
    pub input_index: i64,
    pub chain_id: i64,
    pub consumed_transaction_hash: String,
    pub consumed_transaction_index: i64,
    pub signature: String,
    pub observe_time: ObserveTime,
}

impl Storable for TransactionInput {
    const TABLE: &'static str = "transaction_inputs";
    const COLUMNS: &'static [&'static str] = &[
        "transaction_hash",
        "input_index",
        "chain_id",
        "consumed_transaction_hash",
        "consumed_transaction_index",
        "signature",
        "observe_time",
    ];
    const KEY_COLUMNS: &'static [&'static str] = &["transaction_hash", "input_index"];

    fn key(&self) -> Key {
        key![&self.transaction_hash, self.input_index]
    }

    fn values(&self) -> Vec<Value> {
        vec![
            (&self.transaction_hash).into(),
            self.input_index.into(),
            self.chain_id.into(),
            (&self.consumed_transaction_hash).into(),
            self.consumed_transaction_index.into(),
            (&self.signature).into(),
            self.observe_time.into(),
        ]
    }

    fn list(prefix: &Key, limit: i64, offset: i64) -> Statement {
        prefixed(
            "SELECT * FROM transaction_inputs WHERE transaction_hash = ? \
             ORDER BY input_index DESC LIMIT ? OFFSET ?",
            prefix,
            limit,
            offset,
        )
    }
}

/// A spendable value output.
#[derive(Debug, Clone, PartialEq, FromRow)]
pub struct ValueStore {
    pub transaction_hash: String,
    pub output_index: i64,
    pub chain_id: i64,
    /// Base-16 big integer.
    pub value: String,
    pub owner: String,
    pub fee: String,
    pub observe_time: ObserveTime,
}

impl Storable for ValueStore {
    const TABLE: &'static str = "value_stores";
    const COLUMNS: &'static [&'static str] =
        &["transaction_hash", "output_index", "chain_id", "value", "owner", "fee", "observe_time"];
    const KEY_COLUMNS: &'static [&'static str] = &["transaction_hash", "output_index"];

    fn key(&self) -> Key {
        key![&self.transaction_hash, self.output_index]
    }

    fn values(&self) -> Vec<Value> {
        vec![
            (&self.transaction_hash).into(),
            self.output_index.into(),
            self.chain_id.into(),
            (&self.value).into(),
            (&self.owner).into(),
            (&self.fee).into(),
            self.observe_time.into(),
        ]
    }

    fn list(prefix: &Key, limit: i64, offset: i64) -> Statement {
        prefixed(
            "SELECT * FROM value_stores WHERE transaction_hash = ? \
             ORDER BY output_index DESC LIMIT ? OFFSET ?",
            prefix,
            limit,
            offset,
        )
    }
}

/// A keyed data output.
#[derive(Debug, Clone, PartialEq, FromRow)]
pub struct DataStore {
    pub transaction_hash: String,
    pub output_index: i64,
    pub signature: String,
    pub chain_id: i64,
    pub data_index: String,
    pub issued_at: i64,
    pub deposit: String,
    pub raw_data: String,
    pub owner: String,
    pub fee: String,
    pub observe_time: ObserveTime,
}

impl Storable for DataStore {
    const TABLE: &'static str = "data_stores";
    const COLUMNS: &'static [&'static str] = &[
        "transaction_hash",
        "output_index",
        "signature",
        "chain_id",
        "data_index",
        "issued_at",
        "deposit",
        "raw_data",
        "owner",
        "fee",
        "observe_time",
    ];
    const KEY_COLUMNS: &'static [&'static str] = &["transaction_hash", "output_index"];

    fn key(&self) -> Key {
        key![&self.transaction_hash, self.output_index]
    }

    fn values(&self) -> Vec<Value> {
        vec![
            (&self.transaction_hash).into(),
            self.output_index.into(),
            (&self.signature).into(),
            self.chain_id.into(),
            (&self.data_index).into(),
            self.issued_at.into(),
            (&self.deposit).into(),
            (&self.raw_data).into(),
            (&self.owner).into(),
            (&self.fee).into(),
            self.observe_time.into(),
        ]
    }

    fn list(prefix: &Key, limit: i64, offset: i64) -> Statement {
        prefixed(
            "SELECT * FROM data_stores WHERE transaction_hash = ? \
             ORDER BY output_index DESC LIMIT ? OFFSET ?",
            prefix,
            limit,
            offset,
        )
    }
}

#[derive(Debug, Clone, PartialEq, FromRow)]
pub struct Account {
    pub address: String,
    /// Base-16 big integer.
    pub balance: String,
}

impl Storable for Account {
    const TABLE: &'static str = "accounts";
    const COLUMNS: &'static [&'static str] = &["address", "balance"];
    const KEY_COLUMNS: &'static [&'static str] = &["address"];

    fn key(&self) -> Key {
        key![&self.address]
    }

    fn values(&self) -> Vec<Value> {
        vec![(&self.address).into(), (&self.balance).into()]
    }

    fn list(_prefix: &Key, limit: i64, offset: i64) -> Statement {
        paged("SELECT * FROM accounts ORDER BY address LIMIT ? OFFSET ?", limit, offset)
    }
}

/// Which transactions touched an address.
#[derive(Debug, Clone, PartialEq, FromRow)]
pub struct AccountTransaction {
    pub address: String,
    pub transaction_hash: String,
    pub observe_time: ObserveTime,
}

impl Storable for AccountTransaction {
    const TABLE: &'static str = "account_transactions";
    const COLUMNS: &'static [&'static str] = &["address", "transaction_hash", "observe_time"];
    const KEY_COLUMNS: &'static [&'static str] = &["address", "transaction_hash"];

    fn key(&self) -> Key {
        key![&self.address, &self.transaction_hash]
    }

    fn values(&self) -> Vec<Value> {
        vec![
            (&self.address).into(),
            (&self.transaction_hash).into(),
            self.observe_time.into(),
        ]
    }

    fn list(prefix: &Key, limit: i64, offset: i64) -> Statement {
        prefixed(
            "SELECT * FROM account_transactions WHERE address = ? \
             ORDER BY transaction_hash LIMIT ? OFFSET ?",
            prefix,
            limit,
            offset,
        )
    }
}

/// Which data entries an address owns.
#[derive(Debug, Clone, PartialEq, FromRow)]
pub struct AccountStore {
    pub address: String,
    pub data_index: String,
    pub issued_at: i64,
    pub value: String,
    pub observe_time: ObserveTime,
}

impl Storable for AccountStore {
    const TABLE: &'static str = "account_stores";
    const COLUMNS: &'static [&'static str] = &["address", "data_index", "issued_at", "value", "observe_time"];
    const KEY_COLUMNS: &'static [&'static str] = &["address", "data_index"];

    fn key(&self) -> Key {
        key![&self.address, &self.data_index]
    }

    fn values(&self) -> Vec<Value> {
        vec![
            (&self.address).into(),
            (&self.data_index).into(),
            self.issued_at.into(),
            (&self.value).into(),
            self.observe_time.into(),
        ]
    }

    fn list(prefix: &Key, limit: i64, offset: i64) -> Statement {
        prefixed(
            "SELECT * FROM account_stores WHERE address = ? ORDER BY data_index LIMIT ? OFFSET ?",
            prefix,
            limit,
            offset,
        )
    }
}

/// Last height a scanner fully processed.
#[derive(Debug, Clone, PartialEq, FromRow)]
pub struct ScannerCursor {
    pub name: String,
    pub height: i64,
    pub observe_time: ObserveTime,
}

impl Storable for ScannerCursor {
    const TABLE: &'static str = "scanner_cursors";
    const COLUMNS: &'static [&'static str] = &["name", "height", "observe_time"];
    const KEY_COLUMNS: &'static [&'static str] = &["name"];

    fn key(&self) -> Key {
        key![&self.name]
    }

    fn values(&self) -> Vec<Value> {
        vec![(&self.name).into(), self.height.into(), self.observe_time.into()]
    }

    fn list(_prefix: &Key, limit: i64, offset: i64) -> Statement {
        paged("SELECT * FROM scanner_cursors ORDER BY name LIMIT ? OFFSET ?", limit, offset)
    }
}

/// Every entity store, shared by the scanner and the query service. Writes that must land
/// together go through `database` as one batch.
#[derive(Clone)]
pub struct Stores {
    pub database: Database,
    pub blocks: Arc<dyn Store<Block>>,
    pub transactions: Arc<dyn Store<Transaction>>,
    pub transaction_inputs: Arc<dyn Store<TransactionInput>>,
    pub data_stores: Arc<dyn Store<DataStore>>,
    pub value_stores: Arc<dyn Store<ValueStore>>,
    pub accounts: Arc<dyn Store<Account>>,
    pub account_transactions: Arc<dyn Store<AccountTransaction>>,
    pub account_stores: Arc<dyn Store<AccountStore>>,
    pub cursors: Arc<dyn Store<ScannerCursor>>,
}

impl Stores {
    pub fn in_sqlite(database: &Database) -> Self {
        Self {
            database: database.clone(),
            blocks: Arc::new(SqlStore::<Block>::new(database)),
            transactions: Arc::new(SqlStore::<Transaction>::new(database)),
            transaction_inputs: Arc::new(SqlStore::<TransactionInput>::new(database)),
            data_stores: Arc::new(SqlStore::<DataStore>::new(database)),
            value_stores: Arc::new(SqlStore::<ValueStore>::new(database)),
            accounts: Arc::new(SqlStore::<Account>::new(database)),
            account_transactions: Arc::new(SqlStore::<AccountTransaction>::new(database)),
            account_stores: Arc::new(SqlStore::<AccountStore>::new(database)),
            cursors: Arc::new(SqlStore::<ScannerCursor>::new(database)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::connect;
    use chrono::{TimeZone, Utc};
    use tempfile::TempDir;

    async fn setup() -> (TempDir, Stores) {
        let tmp = TempDir::new().unwrap();
        let db = connect(&tmp.path().join("models.db"), 4).await.unwrap();
        (tmp, Stores::in_sqlite(&db))
    }

    fn at() -> ObserveTime {
        ObserveTime::At(Utc.with_ymd_and_hms(2022, 8, 15, 9, 30, 0).unwrap())
    }

    fn block(height: i64) -> Block {
        Block {
            height,
            chain_id: 42,
            transaction_count: 2,
            previous_block_hash: "prev".into(),
            transaction_root_hash: "txroot".into(),
            state_root_hash: "stateroot".into(),
            header_root_hash: "headerroot".into(),
            group_signature_hash: "sig".into(),
            transaction_hashes: vec!["h1".into(), "h2".into()],
            observe_time: at(),
        }
    }

    fn input(hash: &str, index: i64) -> TransactionInput {
        TransactionInput {
            transaction_hash: hash.into(),
            input_index: index,
            chain_id: 42,
            consumed_transaction_hash: "consumed".into(),
            consumed_transaction_index: 3,
            signature: "sig".into(),
            observe_time: at(),
        }
    }

    #[tokio::test]
    async fn test_round_trip_every_entity() {
        let (_tmp, stores) = setup().await;

        let b = block(10);
        stores.blocks.insert(&b).await.unwrap();
        assert_eq!(stores.blocks.get(&b.key()).await.unwrap(), b);

        let t = Transaction { height: 10, transaction_hash: "h1".into(), observe_time: at(), missing: Some(true) };
        stores.transactions.insert(&t).await.unwrap();
        assert_eq!(stores.transactions.get(&t.key()).await.unwrap(), t);

        let i = input("h1", 0);
        stores.transaction_inputs.insert(&i).await.unwrap();
        assert_eq!(stores.transaction_inputs.get(&i.key()).await.unwrap(), i);

        let v = ValueStore {
            transaction_hash: "h1".into(),
            output_index: 0,
            chain_id: 42,
            value: "ff".into(),
            owner: "owner".into(),
            fee: "1".into(),
            observe_time: at(),
        };
        stores.value_stores.insert(&v).await.unwrap();
        assert_eq!(stores.value_stores.get(&v.key()).await.unwrap(), v);

        let d = DataStore {
            transaction_hash: "h1".into(),
            output_index: 1,
            signature: "dsig".into(),
            chain_id: 42,
            data_index: "idx".into(),
            issued_at: 5,
            deposit: "10".into(),
            raw_data: "raw".into(),
            owner: "owner".into(),
            fee: "2".into(),
            observe_time: at(),
        };
        stores.data_stores.insert(&d).await.unwrap();
        assert_eq!(stores.data_stores.get(&d.key()).await.unwrap(), d);

        let a = Account { address: "owner".into(), balance: "ff".into() };
        stores.accounts.insert(&a).await.unwrap();
        assert_eq!(stores.accounts.get(&a.key()).await.unwrap(), a);

        let at_row = AccountTransaction { address: "owner".into(), transaction_hash: "h1".into(), observe_time: at() };
        stores.account_transactions.insert(&at_row).await.unwrap();
        assert_eq!(stores.account_transactions.get(&at_row.key()).await.unwrap(), at_row);

        let s = AccountStore {
            address: "owner".into(),
            data_index: "idx".into(),
            issued_at: 5,
            value: "raw".into(),
            observe_time: at(),
        };
        stores.account_stores.insert(&s).await.unwrap();
        assert_eq!(stores.account_stores.get(&s.key()).await.unwrap(), s);

        let c = ScannerCursor { name: SCANNER_CURSOR.into(), height: 10, observe_time: at() };
        stores.cursors.insert(&c).await.unwrap();
        assert_eq!(stores.cursors.get(&c.key()).await.unwrap(), c);
    }

    #[tokio::test]
    async fn test_transaction_without_missing_flag() {
        let (_tmp, stores) = setup().await;
        let t = Transaction { height: 1, transaction_hash: "h".into(), observe_time: at(), missing: None };
        stores.transactions.insert(&t).await.unwrap();
        assert_eq!(stores.transactions.get(&t.key()).await.unwrap().missing, None);
    }

    #[tokio::test]
    async fn test_blocks_list_descending_by_height() {
        let (_tmp, stores) = setup().await;
        for height in [3, 1, 5, 2, 4] {
            stores.blocks.insert(&block(height)).await.unwrap();
        }

        let heights: Vec<i64> = stores
            .blocks
            .list(&Key::empty(), 10, 0)
            .await
            .unwrap()
            .iter()
            .map(|b| b.height)
            .collect();
        assert_eq!(heights, vec![5, 4, 3, 2, 1]);

        let page: Vec<i64> = stores
            .blocks
            .list(&Key::empty(), 2, 1)
            .await
            .unwrap()
            .iter()
            .map(|b| b.height)
            .collect();
        assert_eq!(page, vec![4, 3]);
    }

    #[tokio::test]
    async fn test_inputs_list_descending_by_index_for_one_hash() {
        let (_tmp, stores) = setup().await;
        for index in 0..4 {
            stores.transaction_inputs.insert(&input("h1", index)).await.unwrap();
        }
        stores.transaction_inputs.insert(&input("h2", 0)).await.unwrap();

        let indexes: Vec<i64> = stores
            .transaction_inputs
            .list(&key!["h1"], 100, 0)
            .await
            .unwrap()
            .iter()
            .map(|i| i.input_index)
            .collect();
        assert_eq!(indexes, vec![3, 2, 1, 0]);

        assert!(stores.transaction_inputs.list(&key!["nope"], 100, 0).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_account_stores_list_by_address_in_index_order() {
        let (_tmp, stores) = setup().await;
        for index in ["c", "a", "b"] {
            let s = AccountStore {
                address: "owner".into(),
                data_index: index.into(),
                issued_at: 1,
                value: "v".into(),
                observe_time: ObserveTime::Commit,
            };
            stores.account_stores.insert(&s).await.unwrap();
        }

        let indexes: Vec<String> = stores
            .account_stores
            .list(&key!["owner"], 10, 0)
            .await
            .unwrap()
            .into_iter()
            .map(|s| s.data_index)
            .collect();
        assert_eq!(indexes, vec!["a", "b", "c"]);
    }
}
