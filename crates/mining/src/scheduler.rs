//! Mining scheduler.
//!
//! Every chain-state change calls [`MiningScheduler::reschedule`]. It
//! supersedes the previous schedule (aborting its timers and advancing the
//! slot epoch), then computes one [`Emit`] per eligible key. Emits that are
//! already due go straight into the slot; the rest arm a timer that offers
//! the emit when its timestamp arrives.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tracing::{debug, trace, warn};

use tidal_config::MiningConfig;
use tidal_core::{Ledger, ParentInfo, PeerNetwork, PosCalculator, TimeSource};
use tidal_crypto::{generation_signature, hit, KeyPair};

use crate::emit::{Emit, EmitSlot};
use crate::Result;

/// Computes and arms mining opportunities for the node's keys.
pub struct MiningScheduler {
    config: MiningConfig,
    keys: Vec<Arc<KeyPair>>,
    ledger: Arc<dyn Ledger>,
    network: Arc<dyn PeerNetwork>,
    calculator: Arc<dyn PosCalculator>,
    time: Arc<dyn TimeSource>,
    slot: Arc<EmitSlot>,
    /// Last computed schedule
    emits: Mutex<Vec<Emit>>,
    /// Armed timers of the current epoch
    timers: Mutex<Vec<JoinHandle<()>>>,
}

impl MiningScheduler {
    /// Create a scheduler for the keys in `config`.
    pub fn new(
        config: &MiningConfig,
        ledger: Arc<dyn Ledger>,
        network: Arc<dyn PeerNetwork>,
        calculator: Arc<dyn PosCalculator>,
        time: Arc<dyn TimeSource>,
    ) -> Result<Self> {
        let keys = config.key_pairs()?.into_iter().map(Arc::new).collect();
        Ok(Self::with_keys(config, keys, ledger, network, calculator, time))
    }

    /// Create a scheduler for explicit keys, ignoring `config.keys`.
    pub fn with_keys(
        config: &MiningConfig,
        keys: Vec<Arc<KeyPair>>,
        ledger: Arc<dyn Ledger>,
        network: Arc<dyn PeerNetwork>,
        calculator: Arc<dyn PosCalculator>,
        time: Arc<dyn TimeSource>,
    ) -> Self {
        Self {
            config: config.clone(),
            keys,
            ledger,
            network,
            calculator,
            time,
            slot: Arc::new(EmitSlot::new()),
            emits: Mutex::new(Vec::new()),
            timers: Mutex::new(Vec::new()),
        }
    }

    /// The slot emits are delivered through.
    pub fn slot(&self) -> Arc<EmitSlot> {
        self.slot.clone()
    }

    /// The last computed schedule, earliest first.
    pub fn emits(&self) -> Vec<Emit> {
        self.emits.lock().clone()
    }

    /// Number of keys the scheduler mines with.
    pub fn key_count(&self) -> usize {
        self.keys.len()
    }

    /// Drop the current schedule: abort its timers and discard any
    /// undelivered emit.
    pub fn cancel_all(&self) {
        let epoch = self.slot.advance_epoch();
        let timers = std::mem::take(&mut *self.timers.lock());
        for timer in &timers {
            timer.abort();
        }
        self.emits.lock().clear();
        trace!(epoch, aborted = timers.len(), "Mining schedule cancelled");
    }

    /// Recompute the schedule on top of the current tip.
    pub fn reschedule(&self) -> Result<()> {
        self.cancel_all();
        let epoch = self.slot.epoch();

        if !self.config.enabled {
            trace!("Mining disabled");
            return Ok(());
        }
        if self.keys.is_empty() {
            trace!("No mining keys");
            return Ok(());
        }
        let peers = self.network.peer_count();
        if peers < self.config.min_connected_peers {
            debug!(
                peers,
                required = self.config.min_connected_peers,
                "Not enough peers to mine"
            );
            return Ok(());
        }

        let height = self.ledger.height()?;
        let top = self.ledger.top_block()?;
        let now = self.time.now_millis();
        let age = now.saturating_sub(top.timestamp());
        if age > self.config.obsolescence_ms {
            debug!(age_ms = age, tip = %top.id(), "Tip is obsolete, not mining");
            return Ok(());
        }

        let parent = ParentInfo {
            height,
            timestamp: top.timestamp(),
            base_target: top.header.base_target,
        };
        let from = height
            .saturating_sub(self.config.balance_window.saturating_sub(1))
            .max(1);

        let mut emits = Vec::with_capacity(self.keys.len());
        for key in &self.keys {
            let address = key.address();
            let balance = self.ledger.effective_balance(&address, from, height)?;
            if balance < self.config.min_generating_balance {
                debug!(%address, balance, "Balance below generating minimum");
                continue;
            }

            let gen_sig = generation_signature(&top.header.generation_signature, &key.public_key());
            let outcome = match self.calculator.calculate(hit(&gen_sig), &parent, balance) {
                Ok(outcome) => outcome,
                Err(e) => {
                    warn!(%address, error = %e, "Proof-of-stake calculation failed");
                    continue;
                }
            };
            emits.push(Emit {
                timestamp: parent.timestamp.saturating_add(outcome.delay_ms),
                key: key.clone(),
                generation_signature: gen_sig,
                base_target: outcome.base_target,
                parent: top.id(),
            });
        }
        emits.sort_by_key(|e| e.timestamp);

        let mut due = None;
        let mut timers = Vec::new();
        for emit in &emits {
            if emit.timestamp <= now {
                due.get_or_insert_with(|| emit.clone());
            } else if let Some(timer) = self.arm(epoch, emit.clone(), emit.timestamp - now) {
                timers.push(timer);
            }
        }

        debug!(
            height,
            tip = %top.id(),
            scheduled = emits.len(),
            next = emits.first().map(|e| e.timestamp).unwrap_or_default(),
            "Mining rescheduled"
        );
        *self.timers.lock() = timers;
        *self.emits.lock() = emits;
        if let Some(emit) = due {
            self.slot.offer(epoch, emit);
        }
        Ok(())
    }

    fn arm(&self, epoch: u64, emit: Emit, wait_ms: u64) -> Option<JoinHandle<()>> {
        let handle = match Handle::try_current() {
            Ok(handle) => handle,
            Err(_) => {
                warn!("No async runtime, mining timer not armed");
                return None;
            }
        };
        let slot = self.slot.clone();
        Some(handle.spawn(async move {
            tokio::time::sleep(Duration::from_millis(wait_ms)).await;
            let timestamp = emit.timestamp;
            if slot.offer(epoch, emit) {
                trace!(timestamp, "Mining timer fired");
            }
        }))
    }
}

impl Drop for MiningScheduler {
    fn drop(&mut self) {
        for timer in self.timers.get_mut().drain(..) {
            timer.abort();
        }
    }
}

impl std::fmt::Debug for MiningScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MiningScheduler")
            .field("keys", &self.keys.len())
            .field("epoch", &self.slot.epoch())
            .field("emits", &self.emits.lock().len())
            .finish()
    }
}
