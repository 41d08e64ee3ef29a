//! Mining opportunities and their delivery slot.

use std::sync::Arc;

use parking_lot::Mutex;
use tidal_crypto::KeyPair;
use tidal_types::BlockId;
use tokio::sync::Notify;

/// A scheduled chance to forge a key block.
#[derive(Debug, Clone)]
pub struct Emit {
    /// Earliest timestamp of the block, in milliseconds
    pub timestamp: u64,
    /// Key entitled to forge
    pub key: Arc<KeyPair>,
    /// Generation signature of the block
    pub generation_signature: [u8; 32],
    /// Base target of the block
    pub base_target: u64,
    /// Block the new block extends
    pub parent: BlockId,
}

#[derive(Debug, Default)]
struct SlotState {
    epoch: u64,
    emit: Option<Emit>,
}

/// Single-slot emit buffer.
///
/// Writes never block and overwrite whatever is in the slot, so a consumer
/// always sees the most recent decision. The slot also carries the schedule
/// epoch: [`EmitSlot::offer`] from a superseded epoch is discarded under the
/// same lock that [`EmitSlot::advance_epoch`] takes, so a timer that fires
/// while a reschedule is in progress cannot leak a stale emit.
#[derive(Debug, Default)]
pub struct EmitSlot {
    state: Mutex<SlotState>,
    notify: Notify,
}

impl EmitSlot {
    /// Empty slot.
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `emit`, replacing any undelivered one.
    pub fn put(&self, emit: Emit) {
        self.state.lock().emit = Some(emit);
        self.notify.notify_one();
    }

    /// Store `emit` if `epoch` is still the current epoch. Returns whether it
    /// was stored.
    pub fn offer(&self, epoch: u64, emit: Emit) -> bool {
        {
            let mut state = self.state.lock();
            if state.epoch != epoch {
                return false;
            }
            state.emit = Some(emit);
        }
        self.notify.notify_one();
        true
    }

    /// Start a new epoch, dropping the pending emit. Returns the new epoch.
    pub fn advance_epoch(&self) -> u64 {
        let mut state = self.state.lock();
        state.epoch += 1;
        state.emit = None;
        state.epoch
    }

    /// Current epoch.
    pub fn epoch(&self) -> u64 {
        self.state.lock().epoch
    }

    /// Take the pending emit, if any.
    pub fn take(&self) -> Option<Emit> {
        self.state.lock().emit.take()
    }

    /// Whether an emit is pending.
    pub fn is_empty(&self) -> bool {
        self.state.lock().emit.is_none()
    }

    /// Wait for the next emit.
    pub async fn next(&self) -> Emit {
        loop {
            if let Some(emit) = self.take() {
                return emit;
            }
            self.notify.notified().await;
        }
    }
}
