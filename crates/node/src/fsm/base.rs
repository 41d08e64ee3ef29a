//! Context shared by all states.

use std::sync::Arc;

use tidal_config::Config;
use tidal_core::{Ledger, PeerNetwork, ProtocolMessage, TimeSource};
use tidal_mining::MiningScheduler;
use tidal_ng::MicroblockPipeline;
use tidal_sync::PeerScoreSelector;
use tidal_types::{Block, BlockId, Feature, PeerId, Score, Transaction};
use tracing::{debug, info, trace, warn};

use crate::error::NodeError;
use crate::event::Command;
use crate::fsm::{IdleState, State};

/// Collaborators and state that outlive any single FSM state.
pub struct BaseInfo {
    pub(crate) config: Config,
    pub(crate) ledger: Arc<dyn Ledger>,
    pub(crate) network: Arc<dyn PeerNetwork>,
    pub(crate) scheduler: Arc<MiningScheduler>,
    pub(crate) time: Arc<dyn TimeSource>,
    /// Announced peer scores
    pub(crate) selector: PeerScoreSelector,
    /// Recreated whenever a new key block becomes the tip
    pub(crate) pipeline: MicroblockPipeline,
    pub(crate) extended_api_started: bool,
    pub(crate) commands: Vec<Command>,
}

impl BaseInfo {
    pub(crate) fn new(
        config: Config,
        ledger: Arc<dyn Ledger>,
        network: Arc<dyn PeerNetwork>,
        scheduler: Arc<MiningScheduler>,
        time: Arc<dyn TimeSource>,
    ) -> Self {
        let pipeline = MicroblockPipeline::new(&config.ng);
        Self {
            config,
            ledger,
            network,
            scheduler,
            time,
            selector: PeerScoreSelector::new(),
            pipeline,
            extended_api_started: false,
            commands: Vec::new(),
        }
    }

    /// Node configuration.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Announced peer scores.
    pub fn selector(&self) -> &PeerScoreSelector {
        &self.selector
    }

    /// Whether the extended API has been started.
    pub fn extended_api_started(&self) -> bool {
        self.extended_api_started
    }

    // =========================================================================
    // Transitions
    // =========================================================================

    /// Enter `Idle`, dropping the mining schedule.
    pub(crate) fn idle(&mut self) -> State {
        self.scheduler.cancel_all();
        State::Idle(IdleState)
    }

    // =========================================================================
    // Peers
    // =========================================================================

    pub(crate) fn record_score(&mut self, peer: &PeerId, score: &Score) {
        trace!(peer = %peer, score = %score, "Peer score");
        self.selector.push(peer.clone(), score.clone());
        self.network.update_score(peer, score);
    }

    pub(crate) fn forget_peer(&mut self, peer: &PeerId) {
        debug!(peer = %peer, "Peer gone");
        self.selector.remove(peer);
    }

    /// Suspend `peer` for supplying data rejected with `reason`.
    pub(crate) fn suspend(&mut self, peer: &PeerId, reason: &NodeError) {
        warn!(peer = %peer, reason = %reason, "Suspending peer");
        self.selector.remove(peer);
        self.network
            .suspend(peer, self.config.network.suspend_duration(), &reason.to_string());
    }

    pub(crate) fn local_score(&self) -> Result<Score, NodeError> {
        Ok(self.ledger.current_score()?)
    }

    /// Best selector peer, if its score is above the local chain.
    pub(crate) fn best_peer_ahead(&self) -> Result<Option<(PeerId, Score)>, NodeError> {
        let Some((peer, score)) = self.selector.select_best_peer(None) else {
            return Ok(None);
        };
        let local = self.local_score()?;
        Ok((score > local).then_some((peer, score)))
    }

    // =========================================================================
    // Outbound
    // =========================================================================

    pub(crate) fn broadcast_score(&self) {
        match self.ledger.current_score() {
            Ok(score) => self.network.broadcast(ProtocolMessage::Score(score), None),
            Err(e) => warn!(error = %e, "Cannot read local score"),
        }
    }

    /// Announce `block` to every peer but `except`, in the encoding the
    /// activated block version calls for.
    pub(crate) fn broadcast_block(&self, block: &Block, except: Option<&PeerId>) {
        let protobuf = self
            .ledger
            .is_activated(Feature::BLOCK_V5)
            .unwrap_or_else(|e| {
                warn!(error = %e, "Cannot read feature status");
                false
            });
        self.network.broadcast(
            ProtocolMessage::Block {
                block: block.clone(),
                protobuf,
            },
            except,
        );
    }

    pub(crate) fn answer_micro_block_request(
        &self,
        peer: &PeerId,
        id: BlockId,
    ) -> Option<NodeError> {
        let Some(micro) = self.pipeline.micro_block(&id) else {
            trace!(peer = %peer, id = %id, "Requested micro-block not cached");
            return None;
        };
        self.network
            .send(peer, ProtocolMessage::MicroBlock(micro.clone()))
            .err()
            .map(NodeError::from)
    }

    // =========================================================================
    // Ledger
    // =========================================================================

    /// Offer `tx` to the pool and relay it if it was new.
    pub(crate) fn accept_transaction(&self, peer: &PeerId, tx: Transaction) -> Option<NodeError> {
        match self.ledger.accept_transaction(&tx) {
            Ok(true) => {
                self.network
                    .broadcast(ProtocolMessage::Transaction(tx), Some(peer));
                None
            }
            Ok(false) => None,
            Err(e) => Some(e.into()),
        }
    }

    pub(crate) fn should_persist(&self) -> bool {
        self.ledger
            .should_persist_address_transactions()
            .unwrap_or_else(|e| {
                warn!(error = %e, "Cannot read persistence status");
                false
            })
    }

    /// Start the extended API the first time the node catches up.
    pub(crate) fn start_extended_api(&mut self) -> Option<NodeError> {
        if !self.config.node.extended_api || self.extended_api_started {
            return None;
        }
        self.extended_api_started = true;
        info!("Starting extended API");
        self.ledger.start_providing_extended_api().err().map(NodeError::from)
    }

    /// Recompute the mining schedule.
    pub(crate) fn reschedule_mining(&self) -> Option<NodeError> {
        self.scheduler.reschedule().err().map(NodeError::from)
    }

    /// Current time in milliseconds.
    pub(crate) fn now(&self) -> u64 {
        self.time.now_millis()
    }
}
