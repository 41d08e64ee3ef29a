//! Micro-block Pipeline
//!
//! Micro-blocks are announced with a small signed inv; a node that does not
//! have the body asks the announcing peer for it. The same micro-block is
//! usually announced by many peers, so requests are deduplicated: the first
//! inv for an ID triggers a request and later ones within the cache window
//! are suppressed.
//!
//! All three caches are bounded and evict oldest-first. The goal is only to
//! avoid re-requesting recently seen items.

use tidal_config::NgConfig;
use tidal_types::{BlockId, MicroBlock, MicroBlockInv, PeerId};
use tracing::trace;

use crate::cache::FifoCache;

/// Micro-block bodies, announcements and outstanding requests.
#[derive(Debug)]
pub struct MicroblockPipeline {
    micro_blocks: FifoCache<BlockId, MicroBlock>,
    invs: FifoCache<BlockId, MicroBlockInv>,
    requests: FifoCache<BlockId, PeerId>,
}

impl MicroblockPipeline {
    /// Create the caches with the configured capacities.
    pub fn new(config: &NgConfig) -> Self {
        Self {
            micro_blocks: FifoCache::new(config.micro_block_cache_capacity),
            invs: FifoCache::new(config.inv_cache_capacity),
            requests: FifoCache::new(config.request_cache_capacity),
        }
    }

    /// Record that micro-block `id` is being requested from `peer`.
    ///
    /// Returns `true` if it had already been requested, in which case the
    /// caller must not send another request.
    pub fn request(&mut self, peer: &PeerId, id: BlockId) -> bool {
        if self.requests.contains(&id) {
            trace!(id = %id, peer = %peer, "Micro-block already requested");
            return true;
        }
        self.requests.insert(id, peer.clone());
        false
    }

    /// Peer the micro-block was requested from.
    pub fn requested_from(&self, id: &BlockId) -> Option<&PeerId> {
        self.requests.get(id)
    }

    /// Cache an announcement.
    pub fn add_inv(&mut self, inv: MicroBlockInv) {
        self.invs.insert(inv.total_block_id, inv);
    }

    /// Cached announcement for `id`.
    pub fn inv(&self, id: &BlockId) -> Option<&MicroBlockInv> {
        self.invs.get(id)
    }

    /// Cache a micro-block body.
    pub fn add_micro_block(&mut self, micro: MicroBlock) {
        self.micro_blocks.insert(micro.id(), micro);
    }

    /// Cached micro-block body for `id`.
    pub fn micro_block(&self, id: &BlockId) -> Option<&MicroBlock> {
        self.micro_blocks.get(id)
    }
}
