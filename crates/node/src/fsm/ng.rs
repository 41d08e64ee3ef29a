//! NG: extending the chain at the tip.
//!
//! Key blocks replace the liquid block; micro-blocks extend it. Every version
//! of the liquid block is kept so that a key block built on a version we have
//! already moved past can still be applied.

use tidal_core::ProtocolMessage;
use tidal_ng::{extend_block, BlockVersions, FifoCache, MicroblockPipeline};
use tidal_sync::Batch;
use tidal_types::{Block, BlockId, BlockSnapshot, MicroBlock, MicroBlockInv, PeerId};
use tracing::{debug, info, trace};

use crate::applier::BlocksApplier;
use crate::error::NodeError;
use crate::event::{Event, Task};
use crate::fsm::{BaseInfo, PersistState, State, SyncState, Transition};

/// A light-mode key block waiting for its snapshot.
#[derive(Debug)]
struct PendingKeyBlock {
    peer: PeerId,
    block: Block,
}

/// NG state.
#[derive(Debug)]
pub struct NgState {
    versions: BlockVersions,
    /// Light-mode key blocks by ID
    pending: FifoCache<BlockId, PendingKeyBlock>,
}

impl NgState {
    /// Enter NG on top of the current tip and start mining.
    pub(crate) fn enter(ctx: &mut BaseInfo) -> Transition {
        let top = match ctx.ledger.top_block() {
            Ok(top) => top,
            Err(e) => return (ctx.idle(), Some(e.into())),
        };
        let mut versions = BlockVersions::new(ctx.config.ng.block_versions_capacity);
        versions.reset(top);
        let state = Self {
            versions,
            pending: FifoCache::new(ctx.config.ng.block_versions_capacity),
        };
        let err = ctx.reschedule_mining();
        (State::Ng(state), err)
    }

    /// Cached versions of the liquid block.
    pub fn versions(&self) -> &BlockVersions {
        &self.versions
    }

    pub(crate) fn handle(mut self, ctx: &mut BaseInfo, event: Event) -> Transition {
        match event {
            Event::PeerScore { peer, score } => match ctx.local_score() {
                Ok(local) if score > local => SyncState::start(ctx, peer, score),
                Ok(_) => (State::Ng(self), None),
                Err(e) => (State::Ng(self), Some(e)),
            },
            Event::Block { peer, block } => {
                match ctx.ledger.contains(&block.id()) {
                    Ok(true) => return (State::Ng(self), Some(NodeError::AlreadyKnown(block.id()))),
                    Ok(false) => {}
                    Err(e) => return (State::Ng(self), Some(e.into())),
                }
                if ctx.config.node.light_mode {
                    let id = block.id();
                    if self.pending.contains(&id) {
                        trace!(id = %id, peer = %peer, "Snapshot already requested");
                        return (State::Ng(self), None);
                    }
                    if let Err(e) = ctx.network.send(&peer, ProtocolMessage::GetSnapshot(id)) {
                        return (State::Ng(self), Some(e.into()));
                    }
                    debug!(id = %id, peer = %peer, "Waiting for key block snapshot");
                    self.pending.insert(id, PendingKeyBlock { peer, block });
                    return (State::Ng(self), None);
                }
                self.apply_key_block(ctx, Some(peer), block, None)
            }
            Event::Snapshot { peer, snapshot } => match self.pending.remove(&snapshot.block_id) {
                Some(pending) => {
                    trace!(block = %snapshot.block_id, from = %peer, "Key block snapshot received");
                    self.apply_key_block(ctx, Some(pending.peer), pending.block, Some(snapshot))
                }
                None => {
                    trace!(block = %snapshot.block_id, peer = %peer, "Unexpected snapshot");
                    (State::Ng(self), None)
                }
            },
            Event::MinedBlock(block) => self.apply_key_block(ctx, None, block, None),
            Event::MicroBlockInv { peer, inv } => {
                let err = Self::on_inv(ctx, peer, inv);
                (State::Ng(self), err)
            }
            Event::MicroBlock { peer, micro } => self.apply_micro_block(ctx, Some(peer), micro, None),
            Event::MinedMicroBlock { micro, inv } => self.apply_micro_block(ctx, None, micro, Some(inv)),
            Event::Transaction { peer, tx } => (State::Ng(self), ctx.accept_transaction(&peer, tx)),
            Event::Task(Task::Ping) => match ctx.best_peer_ahead() {
                Ok(Some((peer, score))) => {
                    info!(peer = %peer, score = %score, "Peer ahead of the tip");
                    SyncState::start(ctx, peer, score)
                }
                Ok(None) => (State::Ng(self), None),
                Err(e) => (State::Ng(self), Some(e)),
            },
            Event::StopMining => {
                info!("Mining stopped");
                (ctx.idle(), None)
            }
            other => {
                trace!(event = other.name(), "Ignored in ng");
                (State::Ng(self), None)
            }
        }
    }

    // =========================================================================
    // Key blocks
    // =========================================================================

    fn apply_key_block(
        mut self,
        ctx: &mut BaseInfo,
        peer: Option<PeerId>,
        block: Block,
        snapshot: Option<BlockSnapshot>,
    ) -> Transition {
        let id = block.id();
        let top = match ctx.ledger.top_block() {
            Ok(top) => top,
            Err(e) => return (State::Ng(self), Some(e.into())),
        };

        let earlier_version = self
            .versions
            .get(&block.parent())
            .filter(|v| block.parent() != top.id() && v.parent() == top.parent())
            .cloned();
        let result = match earlier_version {
            Some(version) => {
                debug!(id = %id, version = %version.id(), "Key block extends earlier liquid version");
                BlocksApplier::apply_over_version(&*ctx.ledger, &version, block.clone(), snapshot)
            }
            None => {
                let batch = Batch {
                    blocks: vec![block.clone()],
                    snapshots: snapshot.map(|s| vec![s]),
                };
                BlocksApplier::apply(&*ctx.ledger, batch)
            }
        };

        if let Err(e) = result {
            if e.is_validation() {
                if let Some(peer) = &peer {
                    ctx.suspend(peer, &e);
                }
                return (ctx.idle(), Some(e));
            }
            return (State::Ng(self), Some(e));
        }

        info!(id = %id, own = peer.is_none(), "Key block applied");
        self.versions.reset(block.clone());
        ctx.pipeline = MicroblockPipeline::new(&ctx.config.ng);
        ctx.broadcast_block(&block, peer.as_ref());
        ctx.broadcast_score();

        if ctx.should_persist() {
            return (PersistState::enter(ctx), None);
        }
        let err = ctx.reschedule_mining();
        (State::Ng(self), err)
    }

    // =========================================================================
    // Micro-blocks
    // =========================================================================

    fn on_inv(ctx: &mut BaseInfo, peer: PeerId, inv: MicroBlockInv) -> Option<NodeError> {
        let id = inv.total_block_id;
        if !inv.verify() {
            return Some(NodeError::InvalidInv(id));
        }
        let top = match ctx.ledger.top_block() {
            Ok(top) => top,
            Err(e) => return Some(e.into()),
        };
        if inv.public_key != *top.generator() {
            return Some(NodeError::InvalidInv(id));
        }
        if inv.reference != top.id() {
            trace!(id = %id, reference = %inv.reference, "Inv does not extend the top block");
            return None;
        }
        if ctx.pipeline.micro_block(&id).is_some() {
            return None;
        }

        ctx.pipeline.add_inv(inv);
        if ctx.pipeline.request(&peer, id) {
            return None;
        }
        debug!(id = %id, peer = %peer, "Requesting micro-block");
        ctx.network
            .send(&peer, ProtocolMessage::MicroBlockRequest(id))
            .err()
            .map(NodeError::from)
    }

    fn apply_micro_block(
        mut self,
        ctx: &mut BaseInfo,
        peer: Option<PeerId>,
        micro: MicroBlock,
        inv: Option<MicroBlockInv>,
    ) -> Transition {
        let id = micro.id();
        if ctx.pipeline.micro_block(&id).is_some() {
            return (State::Ng(self), Some(NodeError::AlreadyKnown(id)));
        }
        let top = match ctx.ledger.top_block() {
            Ok(top) => top,
            Err(e) => return (State::Ng(self), Some(e.into())),
        };
        let block = match extend_block(&top, &micro) {
            Ok(block) => block,
            Err(e) => return (State::Ng(self), Some(e.into())),
        };

        if let Err(e) = ctx.ledger.apply_micro(&block) {
            let e = NodeError::from(e);
            if e.is_validation() {
                if let Some(peer) = &peer {
                    ctx.suspend(peer, &e);
                }
                return (ctx.idle(), Some(e));
            }
            return (State::Ng(self), Some(e));
        }

        debug!(
            id = %id,
            transactions = micro.transactions.len(),
            own = peer.is_none(),
            "Micro-block applied"
        );
        ctx.pipeline.add_micro_block(micro);
        self.versions.add(block);

        let inv = inv.or_else(|| ctx.pipeline.inv(&id).cloned());
        if let Some(inv) = inv {
            ctx.pipeline.add_inv(inv.clone());
            ctx.network
                .broadcast(ProtocolMessage::MicroBlockInv(inv), peer.as_ref());
        }

        let err = ctx.reschedule_mining();
        (State::Ng(self), err)
    }
}
