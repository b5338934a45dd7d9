//! Chain API trait definition

use async_trait::async_trait;
use crate::model::*;

/// The three local-state queries the indexer needs from a node.
#[async_trait]
pub trait ChainApi: Send + Sync {
    /// Current height of the chain.
    async fn height(&self) -> Result<u32, RpcError>;

    /// Header of the block at `height`.
    async fn block_header(&self, height: u32) -> Result<BlockHeader, RpcError>;

    /// A mined transaction by hash. Fails with [`RpcError::Api`] when the node no longer has it.
    async fn transaction(&self, hash: &str) -> Result<MinedTransaction, RpcError>;
}
