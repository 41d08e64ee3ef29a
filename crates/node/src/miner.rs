//! Reference key-block miner.
//!
//! Waits on the scheduler's emit slot, forges an empty key block for each
//! emit that still extends the tip, and submits it to the node as
//! [`Event::MinedBlock`]. Micro-block assembly is left to the embedder, which
//! submits micro-blocks through [`Event::MinedMicroBlock`].

use std::sync::Arc;

use tidal_core::Ledger;
use tidal_mining::{Emit, EmitSlot};
use tidal_types::{Block, BlockHeader};
use tokio::sync::{broadcast, mpsc};
use tracing::{debug, info, warn};

use crate::error::NodeError;
use crate::event::Event;

/// Turns emits into key blocks.
pub struct Miner {
    ledger: Arc<dyn Ledger>,
    slot: Arc<EmitSlot>,
    events: mpsc::Sender<Event>,
}

impl Miner {
    /// Create a miner reading `slot` and posting to `events`.
    pub fn new(ledger: Arc<dyn Ledger>, slot: Arc<EmitSlot>, events: mpsc::Sender<Event>) -> Self {
        Self {
            ledger,
            slot,
            events,
        }
    }

    /// Forge the key block described by `emit`.
    ///
    /// Returns `None` if the tip has moved since the emit was computed.
    pub fn forge(ledger: &dyn Ledger, emit: &Emit) -> Result<Option<Block>, NodeError> {
        let top = ledger.top_block()?;
        if top.id() != emit.parent {
            debug!(parent = %emit.parent, tip = %top.id(), "Dropping stale emit");
            return Ok(None);
        }
        let header = BlockHeader::new(
            emit.parent,
            emit.timestamp.max(top.timestamp() + 1),
            emit.base_target,
            emit.generation_signature,
            emit.key.public_key(),
        );
        let block = Block::sign(header, Vec::new(), &emit.key)
            .map_err(|e| NodeError::Forge(e.to_string()))?;
        Ok(Some(block))
    }

    /// Run until shutdown or until the node's mailbox closes.
    pub async fn run(self, mut shutdown: broadcast::Receiver<()>) {
        loop {
            tokio::select! {
                emit = self.slot.next() => {
                    match Self::forge(&*self.ledger, &emit) {
                        Ok(Some(block)) => {
                            info!(id = %block.id(), parent = %emit.parent, "Forged key block");
                            if self.events.send(Event::MinedBlock(block)).await.is_err() {
                                break;
                            }
                        }
                        Ok(None) => {}
                        Err(e) => warn!(error = %e, "Forging failed"),
                    }
                }
                _ = shutdown.recv() => {
                    debug!("Miner shutting down");
                    break;
                }
            }
        }
    }
}
