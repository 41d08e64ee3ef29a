//! Halt: terminal state.

use tracing::{info, warn};

use crate::error::NodeError;
use crate::fsm::{BaseInfo, State, Transition};

/// Stop mining, disconnect peers and close the ledger.
pub(crate) fn enter(ctx: &mut BaseInfo) -> Transition {
    info!("Halting");
    ctx.scheduler.cancel_all();
    if let Err(e) = ctx.network.close() {
        warn!(error = %e, "Failed to close network");
    }
    let err = ctx.ledger.close().err().map(NodeError::CloseFailed);
    (State::Halt, err)
}
