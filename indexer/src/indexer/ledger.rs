//! Account balances and per-address indexes derived from transaction outputs

use crate::error::{IndexerError, Result};
use crate::indexer::decoder::Output;
use crate::models::{Account, AccountStore, AccountTransaction, Stores};
use entity_store::{key, DbError, ObserveTime, Storable, WriteBatch};
use num_bigint::BigInt;
use num_traits::Num;
use tracing::debug;

const HEX: u32 = 16;

/// Sum of two base-16 integers, re-encoded as base-16.
pub fn add_hex(current: &str, amount: &str) -> Result<String> {
    let parse = |s: &str| BigInt::from_str_radix(s, HEX).map_err(|_| IndexerError::Parse(s.to_string()));
    let total = parse(current)? + parse(amount)?;
    Ok(total.to_str_radix(HEX))
}

pub struct Ledger {
    stores: Stores,
}

impl Ledger {
    pub fn new(stores: Stores) -> Self {
        Self { stores }
    }

    /// Apply one decoded output and persist it. Returns `false` when the output row already
    /// exists, in which case its effects were applied on an earlier pass and nothing is written.
    ///
    /// The account update, its link rows and the output row itself are written as one batch, so
    /// the output row is present exactly when its effects are.
    pub async fn record_output(&self, output: &Output) -> Result<bool> {
        if self.output_exists(output).await? {
            debug!(
                hash = output.transaction_hash(),
                index = output.output_index(),
                "output already applied"
            );
            return Ok(false);
        }

        let mut batch = self.stores.database.batch();
        match output {
            Output::Value(value) => {
                self.stage_credit(&mut batch, &value.owner, &value.transaction_hash, &value.value)
                    .await?;
                self.stores.value_stores.stage(&mut batch, value)?;
            }
            Output::Data(data) => {
                // Data stores move no value but still touch the owner's account.
                self.stage_credit(&mut batch, &data.owner, &data.transaction_hash, "0").await?;
                self.stores.account_stores.stage(
                    &mut batch,
                    &AccountStore {
                        address: data.owner.clone(),
                        data_index: data.data_index.clone(),
                        issued_at: data.issued_at,
                        value: data.raw_data.clone(),
                        observe_time: ObserveTime::Commit,
                    },
                )?;
                self.stores.data_stores.stage(&mut batch, data)?;
            }
        }
        self.stores.database.write_batch(batch).await?;

        Ok(true)
    }

    /// Add `value` to `owner`'s balance and link the transaction to the address.
    pub async fn credit(&self, owner: &str, hash: &str, value: &str) -> Result<()> {
        let mut batch = self.stores.database.batch();
        self.stage_credit(&mut batch, owner, hash, value).await?;
        self.stores.database.write_batch(batch).await?;
        Ok(())
    }

    async fn stage_credit(&self, batch: &mut WriteBatch, owner: &str, hash: &str, value: &str) -> Result<()> {
        let mut account = match self.stores.accounts.get(&key![owner]).await {
            Ok(account) => account,
            Err(DbError::NotFound { .. }) => Account { address: owner.to_string(), balance: "0".to_string() },
            Err(e) => return Err(e.into()),
        };

        account.balance = add_hex(&account.balance, value)?;
        self.stores.accounts.stage(batch, &account)?;
        self.stores.account_transactions.stage(
            batch,
            &AccountTransaction {
                address: owner.to_string(),
                transaction_hash: hash.to_string(),
                observe_time: ObserveTime::Commit,
            },
        )?;

        debug!(address = owner, balance = %account.balance, "account update staged");
        Ok(())
    }

    async fn output_exists(&self, output: &Output) -> Result<bool> {
        let found = match output {
            Output::Value(value) => self.stores.value_stores.get(&value.key()).await.map(|_| ()),
            Output::Data(data) => self.stores.data_stores.get(&data.key()).await.map(|_| ()),
        };

        match found {
            Ok(()) => Ok(true),
            Err(e) if e.is_not_found() => Ok(false),
            Err(e) => Err(e.into()),
        }
    }
}
