//! In-memory reference ledger.
//!
//! [`MemoryLedger`] keeps the whole chain in a vector behind a
//! `parking_lot::RwLock`: queries take the shared lock, block application and
//! rollback take the exclusive lock for the duration of the call. It checks
//! chain linkage and block signatures only; balances, activated features and
//! rejected blocks are set by the embedder.

use crate::traits::{Ledger, LedgerError, LedgerResult};
use parking_lot::RwLock;
use std::collections::{HashMap, HashSet};
use tidal_types::{Address, Block, BlockId, BlockSnapshot, Feature, Score, Transaction};
use tracing::{debug, info};

#[derive(Debug)]
struct Inner {
    blocks: Vec<Block>,
    /// Cumulative score at each height, parallel to `blocks`.
    scores: Vec<Score>,
    heights: HashMap<BlockId, u64>,
    balances: HashMap<Address, u64>,
    features: HashSet<Feature>,
    rejected: HashSet<BlockId>,
    pool: HashSet<[u8; 32]>,
    pending_address_data: usize,
    persist_threshold: usize,
    persist_count: usize,
    applied_snapshots: usize,
    extended_api: bool,
    fail_close: bool,
    closed: bool,
}

impl Inner {
    fn ensure_open(&self) -> LedgerResult<()> {
        if self.closed {
            return Err(LedgerError::Closed);
        }
        Ok(())
    }

    fn height(&self) -> u64 {
        self.blocks.len() as u64
    }

    fn top(&self) -> LedgerResult<&Block> {
        self.blocks
            .last()
            .ok_or_else(|| LedgerError::NotFound("empty chain".into()))
    }

    fn at(&self, height: u64) -> LedgerResult<&Block> {
        if height == 0 {
            return Err(LedgerError::NotFound("height 0".into()));
        }
        self.blocks
            .get((height - 1) as usize)
            .ok_or_else(|| LedgerError::NotFound(format!("height {}", height)))
    }

    fn push(&mut self, block: Block) {
        let score = match self.scores.last() {
            Some(prev) => prev + &block.score(),
            None => block.score(),
        };
        self.heights.insert(block.id(), self.height() + 1);
        self.scores.push(score);
        self.blocks.push(block);
    }
}

/// A ledger that keeps the chain in memory.
#[derive(Debug)]
pub struct MemoryLedger {
    inner: RwLock<Inner>,
}

impl MemoryLedger {
    /// A ledger holding only `genesis`.
    pub fn new(genesis: Block) -> Self {
        let mut inner = Inner {
            blocks: Vec::new(),
            scores: Vec::new(),
            heights: HashMap::new(),
            balances: HashMap::new(),
            features: HashSet::new(),
            rejected: HashSet::new(),
            pool: HashSet::new(),
            pending_address_data: 0,
            persist_threshold: 0,
            persist_count: 0,
            applied_snapshots: 0,
            extended_api: false,
            fail_close: false,
            closed: false,
        };
        inner.push(genesis);
        Self {
            inner: RwLock::new(inner),
        }
    }

    /// Set the balance of `address`.
    pub fn with_balance(self, address: Address, balance: u64) -> Self {
        self.set_balance(address, balance);
        self
    }

    /// Activate `feature`.
    pub fn with_feature(self, feature: Feature) -> Self {
        self.inner.write().features.insert(feature);
        self
    }

    /// Request persistence once this many blocks have been applied since the
    /// last flush. Zero disables it.
    pub fn with_persist_threshold(self, blocks: usize) -> Self {
        self.inner.write().persist_threshold = blocks;
        self
    }

    /// Set the balance of `address`.
    pub fn set_balance(&self, address: Address, balance: u64) {
        self.inner.write().balances.insert(address, balance);
    }

    /// Make every later application of block `id` fail validation.
    pub fn reject(&self, id: BlockId) {
        self.inner.write().rejected.insert(id);
    }

    /// Make [`Ledger::close`] fail.
    pub fn fail_close(&self) {
        self.inner.write().fail_close = true;
    }

    /// Number of completed persistence flushes.
    pub fn persist_count(&self) -> usize {
        self.inner.read().persist_count
    }

    /// Number of snapshots received with applied blocks.
    pub fn applied_snapshots(&self) -> usize {
        self.inner.read().applied_snapshots
    }

    /// Whether the extended API was started.
    pub fn extended_api_started(&self) -> bool {
        self.inner.read().extended_api
    }

    /// Number of transactions accepted into the pool.
    pub fn pool_size(&self) -> usize {
        self.inner.read().pool.len()
    }

    /// Whether the ledger has been closed.
    pub fn is_closed(&self) -> bool {
        self.inner.read().closed
    }

    /// IDs of the chain from genesis to top.
    pub fn chain(&self) -> Vec<BlockId> {
        self.inner.read().blocks.iter().map(Block::id).collect()
    }

    fn check(inner: &Inner, block: &Block, expected_parent: BlockId) -> LedgerResult<()> {
        if block.parent() != expected_parent {
            return Err(LedgerError::Validation(format!(
                "block {} has parent {}, expected {}",
                block.id(),
                block.parent(),
                expected_parent
            )));
        }
        if inner.rejected.contains(&block.id()) {
            return Err(LedgerError::Validation(format!("block {} is invalid", block.id())));
        }
        if !block.verify_signature() {
            return Err(LedgerError::Validation(format!(
                "block {} has an invalid signature",
                block.id()
            )));
        }
        Ok(())
    }
}

impl Ledger for MemoryLedger {
    fn current_score(&self) -> LedgerResult<Score> {
        let inner = self.inner.read();
        inner.ensure_open()?;
        Ok(inner.scores.last().cloned().unwrap_or_default())
    }

    fn score_at_height(&self, height: u64) -> LedgerResult<Score> {
        let inner = self.inner.read();
        inner.ensure_open()?;
        inner.at(height)?;
        Ok(inner.scores[(height - 1) as usize].clone())
    }

    fn height(&self) -> LedgerResult<u64> {
        let inner = self.inner.read();
        inner.ensure_open()?;
        Ok(inner.height())
    }

    fn block_by_height(&self, height: u64) -> LedgerResult<Block> {
        let inner = self.inner.read();
        inner.ensure_open()?;
        inner.at(height).cloned()
    }

    fn height_by_id(&self, id: &BlockId) -> LedgerResult<Option<u64>> {
        let inner = self.inner.read();
        inner.ensure_open()?;
        Ok(inner.heights.get(id).copied())
    }

    fn top_block(&self) -> LedgerResult<Block> {
        let inner = self.inner.read();
        inner.ensure_open()?;
        inner.top().cloned()
    }

    fn rollback_to(&self, id: &BlockId) -> LedgerResult<Vec<Block>> {
        let mut inner = self.inner.write();
        inner.ensure_open()?;
        let height = *inner
            .heights
            .get(id)
            .ok_or_else(|| LedgerError::NotFound(format!("block {}", id)))?;

        let removed: Vec<Block> = inner.blocks.drain(height as usize..).collect();
        inner.scores.truncate(height as usize);
        for block in &removed {
            inner.heights.remove(&block.id());
        }
        info!(to = %id, height = height, removed = removed.len(), "Rolled back");
        Ok(removed)
    }

    fn apply(&self, blocks: &[Block], snapshots: Option<&[BlockSnapshot]>) -> LedgerResult<()> {
        let mut inner = self.inner.write();
        inner.ensure_open()?;

        if let Some(snapshots) = snapshots {
            if snapshots.len() != blocks.len() {
                return Err(LedgerError::Validation(format!(
                    "{} snapshots for {} blocks",
                    snapshots.len(),
                    blocks.len()
                )));
            }
            for (block, snapshot) in blocks.iter().zip(snapshots) {
                if snapshot.block_id != block.id() {
                    return Err(LedgerError::Validation(format!(
                        "snapshot for {} paired with block {}",
                        snapshot.block_id,
                        block.id()
                    )));
                }
            }
        }

        // Validate the whole batch before committing any of it.
        let mut parent = inner.top()?.id();
        for block in blocks {
            Self::check(&inner, block, parent)?;
            parent = block.id();
        }

        for block in blocks {
            inner.push(block.clone());
        }
        inner.pending_address_data += blocks.len();
        if snapshots.is_some() {
            inner.applied_snapshots += blocks.len();
        }
        debug!(count = blocks.len(), height = inner.height(), "Applied blocks");
        Ok(())
    }

    fn apply_micro(&self, block: &Block) -> LedgerResult<()> {
        let mut inner = self.inner.write();
        inner.ensure_open()?;
        let top = inner.top()?.clone();

        if block.generator() != top.generator() {
            return Err(LedgerError::Validation(format!(
                "micro-block generator differs from top block {}",
                top.id()
            )));
        }
        if block.transactions.len() < top.transactions.len()
            || block.transactions[..top.transactions.len()] != top.transactions[..]
        {
            return Err(LedgerError::Validation(format!(
                "block {} does not extend top block {}",
                block.id(),
                top.id()
            )));
        }
        Self::check(&inner, block, top.parent())?;

        let height = inner.height();
        inner.heights.remove(&top.id());
        inner.heights.insert(block.id(), height);
        if let Some(last) = inner.blocks.last_mut() {
            *last = block.clone();
        }
        inner.pending_address_data += 1;
        debug!(id = %block.id(), height = height, "Applied micro-block");
        Ok(())
    }

    fn is_activated(&self, feature: Feature) -> LedgerResult<bool> {
        let inner = self.inner.read();
        inner.ensure_open()?;
        Ok(inner.features.contains(&feature))
    }

    fn effective_balance(&self, address: &Address, from: u64, to: u64) -> LedgerResult<u64> {
        let inner = self.inner.read();
        inner.ensure_open()?;
        if from > to {
            return Err(LedgerError::Other(format!("empty balance window {}..={}", from, to)));
        }
        Ok(inner.balances.get(address).copied().unwrap_or(0))
    }

    fn start_providing_extended_api(&self) -> LedgerResult<()> {
        let mut inner = self.inner.write();
        inner.ensure_open()?;
        inner.extended_api = true;
        Ok(())
    }

    fn should_persist_address_transactions(&self) -> LedgerResult<bool> {
        let inner = self.inner.read();
        inner.ensure_open()?;
        Ok(inner.persist_threshold > 0 && inner.pending_address_data >= inner.persist_threshold)
    }

    fn persist_address_transactions(&self) -> LedgerResult<()> {
        let mut inner = self.inner.write();
        inner.ensure_open()?;
        inner.pending_address_data = 0;
        inner.persist_count += 1;
        Ok(())
    }

    fn accept_transaction(&self, tx: &Transaction) -> LedgerResult<bool> {
        let mut inner = self.inner.write();
        inner.ensure_open()?;
        Ok(inner.pool.insert(tx.id()))
    }

    fn close(&self) -> LedgerResult<()> {
        let mut inner = self.inner.write();
        if inner.fail_close {
            return Err(LedgerError::Storage("failed to flush on close".into()));
        }
        inner.closed = true;
        Ok(())
    }
}
