//! Ledger contract.
//!
//! The ledger owns the chain and all state derived from it. Heights start at
//! 1 for the genesis block. Every method takes `&self`; implementations guard
//! their state with a shared/exclusive lock held only for the duration of a
//! call.

use thiserror::Error;
use tidal_types::{Address, Block, BlockId, BlockSnapshot, Feature, Score, Transaction};

/// Errors returned by the ledger.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LedgerError {
    /// The ledger rejected a block or transaction under consensus rules.
    #[error("validation failed: {0}")]
    Validation(String),

    /// A block or height was not found.
    #[error("not found: {0}")]
    NotFound(String),

    /// The storage engine failed.
    #[error("storage error: {0}")]
    Storage(String),

    /// The ledger has been closed.
    #[error("ledger closed")]
    Closed,

    /// Any other failure.
    #[error("ledger error: {0}")]
    Other(String),
}

impl LedgerError {
    /// Whether the error is a consensus rejection attributable to the data
    /// supplied, as opposed to a local failure.
    pub fn is_validation(&self) -> bool {
        matches!(self, LedgerError::Validation(_))
    }
}

/// Result type for ledger operations.
pub type LedgerResult<T> = Result<T, LedgerError>;

/// The durable chain and state engine.
pub trait Ledger: Send + Sync + 'static {
    /// Cumulative score of the local chain.
    fn current_score(&self) -> LedgerResult<Score>;

    /// Cumulative score of the chain up to and including `height`.
    fn score_at_height(&self, height: u64) -> LedgerResult<Score>;

    /// Height of the top block.
    fn height(&self) -> LedgerResult<u64>;

    /// Block at `height`.
    fn block_by_height(&self, height: u64) -> LedgerResult<Block>;

    /// Height of a block on the local chain, if it is there.
    fn height_by_id(&self, id: &BlockId) -> LedgerResult<Option<u64>>;

    /// The top block, including any applied micro-blocks.
    fn top_block(&self) -> LedgerResult<Block> {
        self.block_by_height(self.height()?)
    }

    /// Whether `id` is on the local chain.
    fn contains(&self, id: &BlockId) -> LedgerResult<bool> {
        Ok(self.height_by_id(id)?.is_some())
    }

    /// Remove every block above `id`, returning the removed blocks in chain
    /// order.
    fn rollback_to(&self, id: &BlockId) -> LedgerResult<Vec<Block>>;

    /// Apply a contiguous run of blocks on top of the chain. In light mode
    /// `snapshots` carries one snapshot per block, in the same order.
    fn apply(&self, blocks: &[Block], snapshots: Option<&[BlockSnapshot]>) -> LedgerResult<()>;

    /// Replace the top block with a newer version of the same liquid block.
    fn apply_micro(&self, block: &Block) -> LedgerResult<()>;

    /// Whether a feature is active at the current height.
    fn is_activated(&self, feature: Feature) -> LedgerResult<bool>;

    /// Minimum balance of `address` over the heights `from..=to`.
    fn effective_balance(&self, address: &Address, from: u64, to: u64) -> LedgerResult<u64>;

    /// Start serving the extended API once the node has caught up.
    fn start_providing_extended_api(&self) -> LedgerResult<()>;

    /// Whether enough address-indexed transaction data has accumulated in
    /// memory to be flushed.
    fn should_persist_address_transactions(&self) -> LedgerResult<bool>;

    /// Flush accumulated address-indexed transaction data. May be slow.
    fn persist_address_transactions(&self) -> LedgerResult<()>;

    /// Offer a transaction to the pool. Returns whether it was new and valid.
    fn accept_transaction(&self, tx: &Transaction) -> LedgerResult<bool>;

    /// Close the ledger.
    fn close(&self) -> LedgerResult<()>;
}
