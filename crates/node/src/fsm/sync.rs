//! Sync: catching up with one peer.
//!
//! The state drives [`SyncInternal`] and applies what it releases. A better
//! peer seen while block bodies are in flight is remembered and taken over
//! once the current batch has been applied, right before the next ID request
//! would go out.

use tidal_sync::SyncInternal;
use tidal_types::{PeerId, Score};
use tracing::{debug, info, trace};

use crate::applier::BlocksApplier;
use crate::error::NodeError;
use crate::event::{Event, Task};
use crate::fsm::{BaseInfo, NgState, PersistState, State, Transition};

/// Sync state.
#[derive(Debug)]
pub struct SyncState {
    peer: PeerId,
    score: Score,
    internal: SyncInternal,
    /// Time of the last message from `peer`
    last_activity: u64,
    /// Peer to continue with once the in-flight bodies are applied
    next_peer: Option<(PeerId, Score)>,
}

impl SyncState {
    /// Start syncing with `peer`, which announced `score`.
    pub(crate) fn start(ctx: &mut BaseInfo, peer: PeerId, score: Score) -> Transition {
        ctx.scheduler.cancel_all();
        let mut internal = SyncInternal::new(&ctx.config.sync, ctx.config.node.light_mode);
        if let Err(e) = internal.ask_block_ids(&*ctx.ledger, &*ctx.network, &peer) {
            return (ctx.idle(), Some(e.into()));
        }
        info!(peer = %peer, score = %score, "Syncing");
        let state = Self {
            peer,
            score,
            internal,
            last_activity: ctx.now(),
            next_peer: None,
        };
        (State::Sync(state), None)
    }

    /// The peer being synced with.
    pub fn peer(&self) -> &PeerId {
        &self.peer
    }

    /// Score the peer announced.
    pub fn score(&self) -> &Score {
        &self.score
    }

    /// The peer queued to take over, if any.
    pub fn next_peer(&self) -> Option<&PeerId> {
        self.next_peer.as_ref().map(|(peer, _)| peer)
    }

    /// Protocol state.
    pub fn internal(&self) -> &SyncInternal {
        &self.internal
    }

    pub(crate) fn handle(mut self, ctx: &mut BaseInfo, event: Event) -> Transition {
        match event {
            Event::PeerScore { peer, score } => self.on_score(ctx, peer, score),
            Event::BlockIds { peer, ids } if peer == self.peer => {
                self.last_activity = ctx.now();
                if let Err(e) = self
                    .internal
                    .block_ids(&*ctx.ledger, &*ctx.network, &peer, &ids)
                {
                    return (ctx.idle(), Some(e.into()));
                }
                self.advance(ctx)
            }
            Event::Block { peer, block } if peer == self.peer => {
                self.last_activity = ctx.now();
                if let Err(e) = self.internal.block(block) {
                    return (State::Sync(self), Some(e.into()));
                }
                self.advance(ctx)
            }
            Event::Snapshot { peer, snapshot } if peer == self.peer => {
                self.last_activity = ctx.now();
                if let Err(e) = self.internal.snapshot(snapshot) {
                    return (State::Sync(self), Some(e.into()));
                }
                self.advance(ctx)
            }
            Event::PeerDisconnected(peer) => {
                if peer == self.peer {
                    info!(peer = %peer, "Sync peer disconnected");
                    return (ctx.idle(), None);
                }
                if self.next_peer() == Some(&peer) {
                    self.next_peer = None;
                }
                (State::Sync(self), None)
            }
            Event::Task(Task::Ping) => {
                let elapsed_ms = ctx.now().saturating_sub(self.last_activity);
                if elapsed_ms > ctx.config.sync.timeout_ms {
                    let err = NodeError::Timeout {
                        peer: self.peer,
                        elapsed_ms,
                    };
                    return (ctx.idle(), Some(err));
                }
                (State::Sync(self), None)
            }
            other => {
                trace!(event = other.name(), "Ignored in sync");
                (State::Sync(self), None)
            }
        }
    }

    fn on_score(mut self, ctx: &mut BaseInfo, peer: PeerId, score: Score) -> Transition {
        if peer == self.peer {
            self.score = score;
        }
        let local = match ctx.local_score() {
            Ok(local) => local,
            Err(e) => return (State::Sync(self), Some(e)),
        };
        let Some((best, best_score)) = ctx.selector.select_best_peer(Some(&self.peer)) else {
            return (State::Sync(self), None);
        };
        if best == self.peer || best_score <= local {
            return (State::Sync(self), None);
        }

        if self.internal.has_pending_blocks() {
            debug!(current = %self.peer, next = %best, "Deferring sync peer switch");
            self.next_peer = Some((best, best_score));
            return (State::Sync(self), None);
        }
        info!(from = %self.peer, to = %best, score = %best_score, "Switching sync peer");
        SyncState::start(ctx, best, best_score)
    }

    /// Apply what is ready, then finish, switch peers or ask for more.
    fn advance(mut self, ctx: &mut BaseInfo) -> Transition {
        let output = self.internal.blocks();

        if !output.batch.is_empty() {
            let count = output.batch.len();
            match BlocksApplier::apply(&*ctx.ledger, output.batch) {
                Ok(outcome) => {
                    debug!(
                        peer = %self.peer,
                        received = count,
                        applied = outcome.applied,
                        rolled_back = outcome.rolled_back,
                        "Applied sync batch"
                    );
                    ctx.broadcast_score();
                }
                Err(e) => {
                    if e.is_validation() {
                        ctx.suspend(&self.peer, &e);
                    }
                    return (ctx.idle(), Some(e));
                }
            }
            if ctx.should_persist() {
                return (PersistState::enter(ctx), None);
            }
        }

        if output.eof {
            if let Some((peer, score)) = self.next_peer.take() {
                match ctx.local_score() {
                    Ok(local) if score > local => {
                        info!(from = %self.peer, to = %peer, "Switching sync peer at end of chain");
                        return SyncState::start(ctx, peer, score);
                    }
                    Ok(_) => {}
                    Err(e) => return (ctx.idle(), Some(e)),
                }
            }
            return self.finish(ctx);
        }

        if !self.internal.is_waiting_for_ids() && !self.internal.has_pending_blocks() {
            if let Some((peer, score)) = self.next_peer.take() {
                info!(from = %self.peer, to = %peer, "Switching sync peer after batch");
                return SyncState::start(ctx, peer, score);
            }
            if let Err(e) = self
                .internal
                .ask_block_ids(&*ctx.ledger, &*ctx.network, &self.peer)
            {
                return (ctx.idle(), Some(e.into()));
            }
        }
        (State::Sync(self), None)
    }

    fn finish(self, ctx: &mut BaseInfo) -> Transition {
        info!(
            peer = %self.peer,
            height = ctx.ledger.height().unwrap_or_default(),
            "Sync finished"
        );
        let api_err = ctx.start_extended_api();
        let (state, err) = NgState::enter(ctx);
        (state, err.or(api_err))
    }
}
