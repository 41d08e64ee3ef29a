//! Block-ID sync protocol
//!
//! [`SyncInternal`] is the per-attempt protocol state held by the
//! orchestrator while it syncs with one peer. It is driven by four calls:
//!
//! - [`SyncInternal::ask_block_ids`] sends our locator and starts waiting for IDs
//! - [`SyncInternal::block_ids`] registers the peer's answer and requests bodies
//! - [`SyncInternal::block`] / [`SyncInternal::snapshot`] record arrivals
//! - [`SyncInternal::blocks`] pops whatever is ready to apply
//!
//! The struct does not apply blocks or switch states; it reports what it
//! has and leaves those decisions to the caller.

use thiserror::Error;
use tracing::{debug, trace};

use tidal_config::SyncConfig;
use tidal_core::{Ledger, LedgerError, PeerNetwork, ProtocolMessage, TransportError};
use tidal_types::{Block, BlockId, BlockSnapshot, PeerId};

use crate::ordered::{Batch, OrderedBlocks};

/// Errors raised while syncing
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SyncError {
    /// A block arrived that was never requested
    #[error("unexpected block {0}")]
    UnexpectedBlock(BlockId),

    /// A snapshot arrived that was never requested
    #[error("unexpected snapshot for block {0}")]
    UnexpectedSnapshot(BlockId),

    /// Ledger query failed
    #[error("ledger error: {0}")]
    Ledger(#[from] LedgerError),

    /// Message could not be queued
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),
}

/// What [`SyncInternal::blocks`] produced.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct SyncOutput {
    /// Blocks to apply, possibly empty
    pub batch: Batch,
    /// The peer has nothing beyond this batch
    pub eof: bool,
}

/// Protocol state of one sync attempt.
#[derive(Debug)]
pub struct SyncInternal {
    orderer: OrderedBlocks,
    /// Set between sending a locator and receiving its answer
    waiting_for_ids: bool,
    light: bool,
    max_block_ids: usize,
    apply_batch_size: usize,
    /// Size of the last ID answer, including IDs we already had
    last_answer_len: usize,
    /// Number of new IDs in the last answer
    last_answer_new: usize,
}

impl SyncInternal {
    /// Fresh protocol state. Nothing is requested until
    /// [`SyncInternal::ask_block_ids`] is called.
    pub fn new(config: &SyncConfig, light: bool) -> Self {
        Self {
            orderer: OrderedBlocks::new(light),
            waiting_for_ids: false,
            light,
            max_block_ids: config.max_block_ids,
            apply_batch_size: config.apply_batch_size,
            last_answer_len: 0,
            last_answer_new: 0,
        }
    }

    /// Whether we are waiting for the peer's block ID answer.
    pub fn is_waiting_for_ids(&self) -> bool {
        self.waiting_for_ids
    }

    /// Whether any requested block or snapshot has not been popped yet.
    pub fn has_pending_blocks(&self) -> bool {
        !self.orderer.is_empty()
    }

    /// The orderer, for inspection.
    pub fn orderer(&self) -> &OrderedBlocks {
        &self.orderer
    }

    /// Last block IDs of the local chain, newest first.
    pub fn locator(&self, ledger: &dyn Ledger) -> Result<Vec<BlockId>, LedgerError> {
        let height = ledger.height()?;
        let count = (self.max_block_ids as u64).min(height);
        let mut ids = Vec::with_capacity(count as usize);
        for h in (height - count + 1..=height).rev() {
            ids.push(ledger.block_by_height(h)?.id());
        }
        Ok(ids)
    }

    /// Send our locator to `peer` and wait for its answer.
    pub fn ask_block_ids(
        &mut self,
        ledger: &dyn Ledger,
        network: &dyn PeerNetwork,
        peer: &PeerId,
    ) -> Result<(), SyncError> {
        let locator = self.locator(ledger)?;
        debug!(
            peer = %peer,
            locator = locator.len(),
            newest = %locator.first().copied().unwrap_or(BlockId::ZERO),
            "Requesting block IDs"
        );
        network.send(peer, ProtocolMessage::GetBlockIds(locator))?;
        self.waiting_for_ids = true;
        Ok(())
    }

    /// Handle the peer's ID answer.
    ///
    /// Ignored unless an answer is awaited, so a repeated answer neither
    /// requests nor applies anything twice. IDs already on the local chain or
    /// already requested are skipped; every other ID is registered and its
    /// body requested.
    pub fn block_ids(
        &mut self,
        ledger: &dyn Ledger,
        network: &dyn PeerNetwork,
        peer: &PeerId,
        ids: &[BlockId],
    ) -> Result<(), SyncError> {
        if !self.waiting_for_ids {
            trace!(peer = %peer, count = ids.len(), "Ignoring unsolicited block IDs");
            return Ok(());
        }

        let mut new = 0;
        for id in ids {
            if ledger.contains(id)? {
                continue;
            }
            if self.orderer.add(*id) {
                new += 1;
                network.send(peer, ProtocolMessage::GetBlock(*id))?;
                if self.light {
                    network.send(peer, ProtocolMessage::GetSnapshot(*id))?;
                }
            }
        }

        debug!(peer = %peer, received = ids.len(), requested = new, "Block IDs received");
        self.waiting_for_ids = false;
        self.last_answer_len = ids.len();
        self.last_answer_new = new;
        Ok(())
    }

    /// Record a block body.
    pub fn block(&mut self, block: Block) -> Result<(), SyncError> {
        let id = block.id();
        if !self.orderer.set_block(block) {
            return Err(SyncError::UnexpectedBlock(id));
        }
        trace!(id = %id, "Block body recorded");
        Ok(())
    }

    /// Record a block snapshot.
    pub fn snapshot(&mut self, snapshot: BlockSnapshot) -> Result<(), SyncError> {
        let id = snapshot.block_id;
        if !self.orderer.set_snapshot(snapshot) {
            return Err(SyncError::UnexpectedSnapshot(id));
        }
        Ok(())
    }

    /// Pop blocks that are ready to apply.
    ///
    /// Before every requested body has arrived, a prefix is released only once
    /// it reaches the configured batch size. Once everything has arrived the
    /// whole remainder is released. If the peer's answer was shorter than
    /// the locator limit, or brought nothing new, the peer has no more
    /// blocks and `eof` is set; otherwise the caller should send a new
    /// locator after applying the batch.
    pub fn blocks(&mut self) -> SyncOutput {
        if self.waiting_for_ids {
            return SyncOutput::default();
        }

        if self.orderer.waiting_count() > 0 {
            if self.orderer.available_count() >= self.apply_batch_size {
                return SyncOutput {
                    batch: self.orderer.pop_all(),
                    eof: false,
                };
            }
            return SyncOutput::default();
        }

        let batch = self.orderer.pop_all();
        let eof = self.last_answer_len < self.max_block_ids || self.last_answer_new == 0;
        SyncOutput { batch, eof }
    }
}
