//! Idle: waiting for a peer ahead of us or for mining to start.

use tidal_sync::Batch;
use tracing::{debug, trace};

use crate::applier::BlocksApplier;
use crate::event::{Event, Task};
use crate::fsm::{BaseInfo, NgState, State, SyncState, Transition};

/// Idle state.
#[derive(Debug, Default)]
pub struct IdleState;

impl IdleState {
    pub(crate) fn handle(self, ctx: &mut BaseInfo, event: Event) -> Transition {
        match event {
            Event::PeerScore { peer, score } => {
                let local = match ctx.local_score() {
                    Ok(local) => local,
                    Err(e) => return (State::Idle(self), Some(e)),
                };
                if score > local {
                    return SyncState::start(ctx, peer, score);
                }
                (State::Idle(self), None)
            }
            // Retry discovery: sync with the best known peer if it is ahead.
            Event::Task(Task::Ping) => match ctx.best_peer_ahead() {
                Ok(Some((peer, score))) => SyncState::start(ctx, peer, score),
                Ok(None) => (State::Idle(self), None),
                Err(e) => (State::Idle(self), Some(e)),
            },
            Event::MinedBlock(block) => {
                let batch = Batch {
                    blocks: vec![block.clone()],
                    snapshots: None,
                };
                if let Err(e) = BlocksApplier::apply(&*ctx.ledger, batch) {
                    return (State::Idle(self), Some(e));
                }
                debug!(id = %block.id(), "Own block applied");
                ctx.broadcast_block(&block, None);
                ctx.broadcast_score();
                NgState::enter(ctx)
            }
            Event::StartMining => NgState::enter(ctx),
            Event::Transaction { peer, tx } => (State::Idle(self), ctx.accept_transaction(&peer, tx)),
            other => {
                trace!(event = other.name(), "Ignored in idle");
                (State::Idle(self), None)
            }
        }
    }
}
