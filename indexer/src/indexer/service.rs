//! Chain scanner: walks the chain height by height and feeds the index

use std::sync::Arc;
use tokio::sync::broadcast::{self, error::TryRecvError};
use tokio::time::{sleep, Duration};
use tracing::{debug, error, info, warn};

use crate::error::{IndexerError, Result};
use crate::indexer::decoder::{decode_block, decode_inputs, decode_outputs, decode_transaction, missing_transaction};
use crate::indexer::ledger::Ledger;
use crate::metrics::{BLOCKS_PROCESSED, CURRENT_BLOCK, CYCLE_FAILURES, HIGHEST_BLOCK, MISSING_TRANSACTIONS};
use crate::models::{ScannerCursor, Stores, SCANNER_CURSOR};
use entity_store::{key, ObserveTime};
use rpc_core::{ChainApi, MinedTransaction};

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(5);

/// Single sequential writer of the index.
///
/// `highest` is the last height whose block and transactions were all persisted (0 before the
/// first one). It only moves forward, and only after the cursor row for the height is written.
pub struct Scanner {
    client: Arc<dyn ChainApi>,
    stores: Stores,
    ledger: Ledger,
    poll_interval: Duration,
    highest: u32,
}

impl Scanner {
    /// A scanner that starts from height 1, ignoring any stored cursor.
    pub fn new(client: Arc<dyn ChainApi>, stores: Stores, poll_interval: Duration) -> Self {
        Self {
            client,
            ledger: Ledger::new(stores.clone()),
            stores,
            poll_interval,
            highest: 0,
        }
    }

    /// A scanner that continues after the stored cursor, or from `start_height` if that is later.
    pub async fn resume(
        client: Arc<dyn ChainApi>,
        stores: Stores,
        poll_interval: Duration,
        start_height: u32,
    ) -> Result<Self> {
        let cursor = match stores.cursors.get(&key![SCANNER_CURSOR]).await {
            Ok(cursor) => u32::try_from(cursor.height)
                .map_err(|_| IndexerError::Internal(format!("invalid cursor height {}", cursor.height)))?,
            Err(e) if e.is_not_found() => 0,
            Err(e) => return Err(e.into()),
        };

        let mut scanner = Self::new(client, stores, poll_interval);
        scanner.highest = cursor.max(start_height.saturating_sub(1));
        info!(cursor, start_height, highest = scanner.highest, "scanner resumed");

        Ok(scanner)
    }

    pub fn highest(&self) -> u32 {
        self.highest
    }

    /// Poll until a shutdown signal arrives or the sender goes away. A failed cycle is logged
    /// and retried after the poll interval from the same height.
    pub async fn run(&mut self, mut shutdown: broadcast::Receiver<()>) {
        info!(highest = self.highest, interval = ?self.poll_interval, "starting scanner");

        loop {
            match shutdown.try_recv() {
                Err(TryRecvError::Empty) => {}
                _ => break,
            }

            if let Err(e) = self.process_once().await {
                CYCLE_FAILURES.inc();
                error!(highest = self.highest, "scan cycle failed: {}", e);
            }

            tokio::select! {
                _ = shutdown.recv() => break,
                _ = sleep(self.poll_interval) => {}
            }
        }

        info!(highest = self.highest, "scanner stopped");
    }

    /// Index every height between the last completed one and the node's current height.
    pub async fn process_once(&mut self) -> Result<()> {
        let current = self.client.height().await?;
        HIGHEST_BLOCK.set(i64::from(current));
        info!(current, highest = self.highest, "polling chain");

        for height in self.highest.saturating_add(1)..=current {
            CURRENT_BLOCK.set(i64::from(height));
            self.process_height(height).await?;
            self.checkpoint(height).await?;

            self.highest = height;
            BLOCKS_PROCESSED.inc();
        }

        Ok(())
    }

    async fn process_height(&self, height: u32) -> Result<()> {
        let header = self.client.block_header(height).await?;
        let block = decode_block(&header);
        if block.height != i64::from(height) {
            warn!(height, claimed = block.height, "header claims a different height");
        }
        self.stores.blocks.insert(&block).await?;
        debug!(height, transactions = header.tx_hashes.len(), "block stored");

        for hash in &header.tx_hashes {
            match self.client.transaction(hash).await {
                Ok(tx) => self.push_transaction(height, hash, &tx).await?,
                Err(e) if e.is_missing() => {
                    warn!(height, %hash, "transaction missing, continuing: {}", e);
                    MISSING_TRANSACTIONS.inc();
                    self.push_missing_transaction(height, hash).await?;
                }
                Err(e) => return Err(e.into()),
            }
        }

        Ok(())
    }

    async fn push_transaction(&self, height: u32, hash: &str, tx: &MinedTransaction) -> Result<()> {
        self.stores.transactions.insert(&decode_transaction(height, hash)).await?;

        for input in decode_inputs(tx) {
            self.stores.transaction_inputs.insert(&input).await?;
        }

        for output in decode_outputs(tx) {
            self.ledger.record_output(&output).await?;
        }

        debug!(height, %hash, "transaction stored");
        Ok(())
    }

    /// Record a pruned transaction, unless an earlier pass already indexed it in full. Its inputs
    /// and outputs stay valid, so the complete row wins over the missing marker.
    async fn push_missing_transaction(&self, height: u32, hash: &str) -> Result<()> {
        match self.stores.transactions.get(&key![i64::from(height), hash]).await {
            Ok(existing) if existing.missing != Some(true) => {
                debug!(height, %hash, "transaction already indexed, keeping it");
                return Ok(());
            }
            Ok(_) => {}
            Err(e) if e.is_not_found() => {}
            Err(e) => return Err(e.into()),
        }

        self.stores.transactions.insert(&missing_transaction(height, hash)).await?;
        Ok(())
    }

    async fn checkpoint(&self, height: u32) -> Result<()> {
        self.stores
            .cursors
            .insert(&ScannerCursor {
                name: SCANNER_CURSOR.to_string(),
                height: i64::from(height),
                observe_time: ObserveTime::Commit,
            })
            .await?;
        Ok(())
    }
}
