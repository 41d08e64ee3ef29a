//! Rollback-aware block application.
//!
//! A batch normally extends the top block. When it forks off an earlier block
//! instead, the blocks above the fork point are rolled back first, and put
//! back if the batch then fails to apply.

use tidal_core::{Ledger, LedgerError};
use tidal_sync::Batch;
use tidal_types::{Block, BlockSnapshot, Score};
use tracing::{debug, info, warn};

use crate::error::NodeError;

/// What an application did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ApplyOutcome {
    /// Blocks applied
    pub applied: usize,
    /// Blocks rolled back to make room
    pub rolled_back: usize,
}

/// Applies batches of blocks to a ledger.
pub struct BlocksApplier;

impl BlocksApplier {
    /// Apply `batch`, rolling back to its fork point if needed.
    ///
    /// Blocks at the head of the batch that are already on the chain are
    /// skipped. A fork must be strictly heavier than the local chain.
    pub fn apply(ledger: &dyn Ledger, batch: Batch) -> Result<ApplyOutcome, NodeError> {
        let Batch {
            mut blocks,
            mut snapshots,
        } = batch;

        let mut known = 0;
        for block in &blocks {
            if !ledger.contains(&block.id())? {
                break;
            }
            known += 1;
        }
        if known > 0 {
            debug!(skipped = known, "Skipping known blocks");
            blocks.drain(..known);
            if let Some(snapshots) = snapshots.as_mut() {
                snapshots.drain(..known.min(snapshots.len()));
            }
        }

        let Some(first) = blocks.first() else {
            return Ok(ApplyOutcome::default());
        };
        let parent = first.parent();
        let top = ledger.top_block()?;

        if parent == top.id() {
            ledger.apply(&blocks, snapshots.as_deref())?;
            return Ok(ApplyOutcome {
                applied: blocks.len(),
                rolled_back: 0,
            });
        }

        let Some(parent_height) = ledger.height_by_id(&parent)? else {
            return Err(NodeError::ParentNotFound {
                id: first.id(),
                parent,
            });
        };

        let fork = Self::fork_score(ledger, parent_height, &blocks)?;
        let local = ledger.current_score()?;
        if fork <= local {
            return Err(NodeError::NotHeavier {
                parent,
                fork,
                local,
            });
        }

        let saved = ledger.rollback_to(&parent)?;
        info!(
            parent = %parent,
            rolled_back = saved.len(),
            applying = blocks.len(),
            "Switching to heavier fork"
        );
        if let Err(e) = ledger.apply(&blocks, snapshots.as_deref()) {
            Self::restore(ledger, &saved);
            return Err(e.into());
        }
        Ok(ApplyOutcome {
            applied: blocks.len(),
            rolled_back: saved.len(),
        })
    }

    /// Replace the top liquid block with an earlier version of it and apply
    /// `block` on that version.
    ///
    /// `version` must share its parent with the current top block.
    pub fn apply_over_version(
        ledger: &dyn Ledger,
        version: &Block,
        block: Block,
        snapshot: Option<BlockSnapshot>,
    ) -> Result<ApplyOutcome, NodeError> {
        let saved = ledger.rollback_to(&version.parent())?;
        let result = ledger
            .apply(std::slice::from_ref(version), None)
            .and_then(|()| {
                let snapshots = snapshot.map(|s| vec![s]);
                ledger.apply(std::slice::from_ref(&block), snapshots.as_deref())
            });
        if let Err(e) = result {
            Self::restore(ledger, &saved);
            return Err(e.into());
        }
        debug!(version = %version.id(), block = %block.id(), "Applied over earlier liquid version");
        Ok(ApplyOutcome {
            applied: 1,
            rolled_back: saved.len(),
        })
    }

    fn fork_score(
        ledger: &dyn Ledger,
        parent_height: u64,
        blocks: &[Block],
    ) -> Result<Score, LedgerError> {
        let mut score = ledger.score_at_height(parent_height)?;
        for block in blocks {
            score += &block.score();
        }
        Ok(score)
    }

    fn restore(ledger: &dyn Ledger, saved: &[Block]) {
        let Some(first) = saved.first() else {
            return;
        };
        let result = ledger
            .rollback_to(&first.parent())
            .and_then(|_| ledger.apply(saved, None));
        if let Err(e) = result {
            warn!(error = %e, blocks = saved.len(), "Failed to restore rolled back blocks");
        }
    }
}
