//! # Node State Machine
//!
//! The orchestrator is always in exactly one of five states:
//!
//! | State     | Purpose                                             |
//! |-----------|-----------------------------------------------------|
//! | `Idle`    | waiting for a peer ahead of us, or for mining to start |
//! | `Sync`    | catching up with one peer                           |
//! | `Ng`      | at the tip: accepting key blocks and micro-blocks, mining |
//! | `Persist` | flushing address-indexed data                       |
//! | `Halt`    | shut down; terminal                                 |
//!
//! Every [`Event`] is handled to completion before the next one. A handler
//! consumes the current state and returns the next one together with an
//! optional error, so a state is always replaced as a whole. Events a state
//! has no use for are ignored.
//!
//! Shared, long-lived data (collaborators, peer scores, the micro-block
//! pipeline) lives in [`BaseInfo`]; per-state data lives in the state.

mod base;
mod halt;
mod idle;
mod ng;
mod persist;
mod sync;

pub use base::BaseInfo;
pub use idle::IdleState;
pub use ng::NgState;
pub use persist::PersistState;
pub use sync::SyncState;

use std::fmt;
use std::sync::Arc;

use tidal_config::Config;
use tidal_core::{Ledger, PeerNetwork, TimeSource};
use tidal_mining::MiningScheduler;
use tidal_ng::MicroblockPipeline;
use tidal_types::PeerId;
use tracing::{debug, error, info, trace, warn};

use crate::error::{ErrorKind, NodeError};
use crate::event::{Command, Event, Task};

/// Next state and the error raised on the way, if any.
pub type Transition = (State, Option<NodeError>);

/// Orchestrator state.
#[derive(Debug)]
pub enum State {
    /// Waiting
    Idle(IdleState),
    /// Catching up with a peer
    Sync(SyncState),
    /// Extending the chain
    Ng(NgState),
    /// Flushing address-indexed data
    Persist(PersistState),
    /// Shut down
    Halt,
}

/// State name without its data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StateKind {
    /// See [`State::Idle`]
    Idle,
    /// See [`State::Sync`]
    Sync,
    /// See [`State::Ng`]
    Ng,
    /// See [`State::Persist`]
    Persist,
    /// See [`State::Halt`]
    Halt,
}

impl fmt::Display for StateKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            StateKind::Idle => "idle",
            StateKind::Sync => "sync",
            StateKind::Ng => "ng",
            StateKind::Persist => "persist",
            StateKind::Halt => "halt",
        };
        f.write_str(name)
    }
}

impl State {
    /// The state's name.
    pub fn kind(&self) -> StateKind {
        match self {
            State::Idle(_) => StateKind::Idle,
            State::Sync(_) => StateKind::Sync,
            State::Ng(_) => StateKind::Ng,
            State::Persist(_) => StateKind::Persist,
            State::Halt => StateKind::Halt,
        }
    }

    fn handle(self, ctx: &mut BaseInfo, event: Event) -> Transition {
        if let State::Halt = self {
            trace!(event = event.name(), "Halted, ignoring event");
            return (State::Halt, None);
        }

        match &event {
            Event::Halt => return halt::enter(ctx),
            Event::MicroBlockRequest { peer, id } => {
                let err = ctx.answer_micro_block_request(peer, *id);
                return (self, err);
            }
            Event::Task(Task::AskPeers) => {
                ctx.network.ask_peers();
                return (self, None);
            }
            Event::PeerScore { peer, score } => ctx.record_score(peer, score),
            Event::PeerDisconnected(peer) => ctx.forget_peer(peer),
            _ => {}
        }

        match self {
            State::Idle(state) => state.handle(ctx, event),
            State::Sync(state) => state.handle(ctx, event),
            State::Ng(state) => state.handle(ctx, event),
            State::Persist(state) => state.handle(ctx, event),
            State::Halt => (State::Halt, None),
        }
    }
}

/// The orchestrator.
///
/// # Example
///
/// ```ignore
/// let mut fsm = StateMachine::new(config, ledger, network, scheduler, time);
/// fsm.handle(Event::PeerScore { peer, score });
/// assert_eq!(fsm.state(), StateKind::Sync);
/// ```
pub struct StateMachine {
    ctx: BaseInfo,
    state: State,
}

impl StateMachine {
    /// A state machine in `Idle`.
    pub fn new(
        config: Config,
        ledger: Arc<dyn Ledger>,
        network: Arc<dyn PeerNetwork>,
        scheduler: Arc<MiningScheduler>,
        time: Arc<dyn TimeSource>,
    ) -> Self {
        Self {
            ctx: BaseInfo::new(config, ledger, network, scheduler, time),
            state: State::Idle(IdleState),
        }
    }

    /// Handle one event to completion.
    ///
    /// The returned error has already been logged at a level matching its
    /// [`ErrorKind`].
    pub fn handle(&mut self, event: Event) -> Option<NodeError> {
        let name = event.name();
        let from = self.state.kind();
        let state = std::mem::replace(&mut self.state, State::Halt);
        let (next, err) = state.handle(&mut self.ctx, event);
        let to = next.kind();
        self.state = next;

        if from != to {
            info!(%from, %to, event = name, "State transition");
        }
        if let Some(e) = &err {
            log_error(name, e);
        }
        err
    }

    /// Current state name.
    pub fn state(&self) -> StateKind {
        self.state.kind()
    }

    /// Current state.
    pub fn current(&self) -> &State {
        &self.state
    }

    /// The peer being synced with, in `Sync`.
    pub fn sync_peer(&self) -> Option<&PeerId> {
        match &self.state {
            State::Sync(state) => Some(state.peer()),
            _ => None,
        }
    }

    /// Work queued for the runtime since the last call.
    pub fn take_commands(&mut self) -> Vec<Command> {
        std::mem::take(&mut self.ctx.commands)
    }

    /// Micro-block caches.
    pub fn pipeline(&self) -> &MicroblockPipeline {
        &self.ctx.pipeline
    }

    /// Shared context.
    pub fn base(&self) -> &BaseInfo {
        &self.ctx
    }
}

impl fmt::Debug for StateMachine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StateMachine")
            .field("state", &self.state.kind())
            .finish()
    }
}

fn log_error(event: &'static str, e: &NodeError) {
    match e.kind() {
        ErrorKind::Informational => debug!(event, error = %e, "Event not applied"),
        ErrorKind::Validation | ErrorKind::Protocol => warn!(event, error = %e, "Event failed"),
        ErrorKind::Fatal => error!(event, error = %e, "Fatal error"),
    }
}
