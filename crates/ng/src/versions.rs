//! Liquid block versions.
//!
//! Every micro-block applied to the liquid block yields a new version with a
//! new ID. A peer that missed some micro-blocks may build its next key block
//! on an earlier version; keeping the versions lets the node roll back to
//! that version instead of rejecting the key block.

use tidal_types::{Block, BlockId};

use crate::cache::FifoCache;

/// Versions of the current liquid block, keyed by ID.
#[derive(Debug)]
pub struct BlockVersions {
    versions: FifoCache<BlockId, Block>,
}

impl BlockVersions {
    /// Keep at most `capacity` versions.
    pub fn new(capacity: usize) -> Self {
        Self {
            versions: FifoCache::new(capacity),
        }
    }

    /// Start tracking a new liquid block, forgetting the previous one.
    pub fn reset(&mut self, key_block: Block) {
        self.versions.clear();
        self.add(key_block);
    }

    /// Record a new version.
    pub fn add(&mut self, block: Block) {
        self.versions.insert(block.id(), block);
    }

    /// Version with ID `id`.
    pub fn get(&self, id: &BlockId) -> Option<&Block> {
        self.versions.get(id)
    }

    /// Number of versions kept.
    pub fn len(&self) -> usize {
        self.versions.len()
    }

    /// Whether no version is kept.
    pub fn is_empty(&self) -> bool {
        self.versions.is_empty()
    }
}
