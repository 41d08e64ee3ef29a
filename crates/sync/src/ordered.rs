//! Block Ordering
//!
//! Block bodies requested from a peer come back in whatever order the peer
//! and the network deliver them. [`OrderedBlocks`] remembers the order in
//! which IDs were announced and releases bodies strictly in that order: a
//! block is only popped once every block announced before it has been popped.
//!
//! In light mode each block is paired with a state snapshot and counts as
//! received only once both halves are present.

use std::collections::{HashMap, VecDeque};

use tidal_types::{Block, BlockId, BlockSnapshot};

/// A contiguous run of blocks ready for the ledger.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Batch {
    /// Blocks in announced order
    pub blocks: Vec<Block>,
    /// Snapshots parallel to `blocks`, present in light mode
    pub snapshots: Option<Vec<BlockSnapshot>>,
}

impl Batch {
    /// Number of blocks.
    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    /// Whether the batch holds no blocks.
    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// IDs of the blocks in order.
    pub fn ids(&self) -> Vec<BlockId> {
        self.blocks.iter().map(Block::id).collect()
    }
}

#[derive(Debug, Default)]
struct Slot {
    block: Option<Block>,
    snapshot: Option<BlockSnapshot>,
}

/// Reassembles out-of-order block bodies into announced order.
///
/// Every ID in the sequence has exactly one slot; popping removes from both.
#[derive(Debug, Default)]
pub struct OrderedBlocks {
    /// Announced IDs, oldest announcement first
    sequence: VecDeque<BlockId>,
    /// Bodies received so far
    slots: HashMap<BlockId, Slot>,
    /// Whether a snapshot is required for every block
    light: bool,
}

impl OrderedBlocks {
    /// Create an empty orderer. With `light` set, blocks also wait for their
    /// snapshot.
    pub fn new(light: bool) -> Self {
        Self {
            sequence: VecDeque::new(),
            slots: HashMap::new(),
            light,
        }
    }

    /// Register an expected ID. Returns `true` if it was not known, in which
    /// case the caller requests its body.
    pub fn add(&mut self, id: BlockId) -> bool {
        if self.slots.contains_key(&id) {
            return false;
        }
        self.sequence.push_back(id);
        self.slots.insert(id, Slot::default());
        true
    }

    /// Record a received body. Returns `false` if its ID was never added.
    pub fn set_block(&mut self, block: Block) -> bool {
        match self.slots.get_mut(&block.id()) {
            Some(slot) => {
                slot.block = Some(block);
                true
            }
            None => false,
        }
    }

    /// Record a received snapshot. Returns `false` if its block was never added.
    pub fn set_snapshot(&mut self, snapshot: BlockSnapshot) -> bool {
        match self.slots.get_mut(&snapshot.block_id) {
            Some(slot) => {
                slot.snapshot = Some(snapshot);
                true
            }
            None => false,
        }
    }

    /// Whether `id` is registered and not yet popped.
    pub fn contains(&self, id: &BlockId) -> bool {
        self.slots.contains_key(id)
    }

    /// Whether the body of `id` has arrived (and its snapshot, in light mode).
    pub fn is_received(&self, id: &BlockId) -> bool {
        self.slots.get(id).map_or(false, |slot| self.is_complete(slot))
    }

    fn is_complete(&self, slot: &Slot) -> bool {
        slot.block.is_some() && (!self.light || slot.snapshot.is_some())
    }

    /// Number of IDs that can be popped right now.
    pub fn available_count(&self) -> usize {
        self.sequence
            .iter()
            .take_while(|id| self.is_received(id))
            .count()
    }

    /// Number of registered IDs not yet popped.
    pub fn requested_count(&self) -> usize {
        self.sequence.len()
    }

    /// Number of registered IDs whose body (or snapshot) is still missing.
    pub fn waiting_count(&self) -> usize {
        self.sequence
            .iter()
            .filter(|id| !self.is_received(id))
            .count()
    }

    /// Number of registered IDs that have arrived.
    pub fn received_count(&self) -> usize {
        self.requested_count() - self.waiting_count()
    }

    /// Whether nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.sequence.is_empty()
    }

    /// Pop the longest prefix whose bodies have all arrived.
    pub fn pop_all(&mut self) -> Batch {
        let count = self.available_count();
        let mut blocks = Vec::with_capacity(count);
        let mut snapshots = Vec::with_capacity(if self.light { count } else { 0 });

        for _ in 0..count {
            let Some(id) = self.sequence.pop_front() else {
                break;
            };
            let Some(slot) = self.slots.remove(&id) else {
                break;
            };
            if let Some(block) = slot.block {
                blocks.push(block);
            }
            if let Some(snapshot) = slot.snapshot {
                snapshots.push(snapshot);
            }
        }

        Batch {
            blocks,
            snapshots: self.light.then_some(snapshots),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tidal_crypto::KeyPair;

    fn blocks(n: usize) -> Vec<Block> {
        let keys = KeyPair::random();
        (0..n)
            .map(|i| Block::genesis(&keys, i as u64).unwrap())
            .collect()
    }

    #[test]
    fn test_add_is_idempotent() {
        let mut orderer = OrderedBlocks::new(false);
        let id = BlockId::digest(b"a");
        assert!(orderer.add(id));
        assert!(!orderer.add(id));
        assert_eq!(orderer.requested_count(), 1);
    }

    #[test]
    fn test_unknown_block_rejected() {
        let mut orderer = OrderedBlocks::new(false);
        let block = blocks(1).remove(0);
        assert!(!orderer.set_block(block));
        assert!(orderer.is_empty());
    }

    #[test]
    fn test_pop_stops_at_gap() {
        let bs = blocks(3);
        let mut orderer = OrderedBlocks::new(false);
        for b in &bs {
            orderer.add(b.id());
        }
        orderer.set_block(bs[0].clone());
        orderer.set_block(bs[2].clone());
        assert_eq!(orderer.available_count(), 1);
        assert_eq!(orderer.waiting_count(), 1);

        let batch = orderer.pop_all();
        assert_eq!(batch.ids(), vec![bs[0].id()]);
        assert!(batch.snapshots.is_none());
        assert_eq!(orderer.available_count(), 0);

        orderer.set_block(bs[1].clone());
        assert_eq!(orderer.pop_all().ids(), vec![bs[1].id(), bs[2].id()]);
        assert!(orderer.is_empty());
    }

    #[test]
    fn test_light_mode_waits_for_snapshot() {
        let bs = blocks(2);
        let mut orderer = OrderedBlocks::new(true);
        for b in &bs {
            orderer.add(b.id());
            orderer.set_block(b.clone());
        }
        assert_eq!(orderer.available_count(), 0);

        orderer.set_snapshot(BlockSnapshot::new(bs[0].id(), b"s0".to_vec()));
        let batch = orderer.pop_all();
        assert_eq!(batch.ids(), vec![bs[0].id()]);
        assert_eq!(batch.snapshots.unwrap()[0].block_id, bs[0].id());
        assert_eq!(orderer.waiting_count(), 1);
    }
}
