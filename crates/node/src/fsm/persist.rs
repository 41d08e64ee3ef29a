//! Persist: flushing address-indexed transactions.

use tracing::{info, trace};

use crate::error::NodeError;
use crate::event::{Command, Event, Task};
use crate::fsm::{BaseInfo, State, Transition};

/// Persist state. The flush itself runs off the event loop.
#[derive(Debug, Default)]
pub struct PersistState;

impl PersistState {
    pub(crate) fn enter(ctx: &mut BaseInfo) -> State {
        ctx.scheduler.cancel_all();
        ctx.commands.push(Command::Persist);
        info!("Persisting address transactions");
        State::Persist(PersistState)
    }

    pub(crate) fn handle(self, ctx: &mut BaseInfo, event: Event) -> Transition {
        match event {
            Event::Task(Task::PersistComplete(Ok(()))) => {
                info!("Address transactions persisted");
                (ctx.idle(), None)
            }
            Event::Task(Task::PersistComplete(Err(e))) => (ctx.idle(), Some(NodeError::Ledger(e))),
            other => {
                trace!(event = other.name(), "Ignored while persisting");
                (State::Persist(self), None)
            }
        }
    }
}
