//! Shared fixtures for node tests
#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tidal_config::Config;
use tidal_core::{
    ManualTimeSource, MemoryLedger, ParentInfo, PeerNetwork, PosCalculator, PosOutcome, PosResult,
    ProtocolMessage, TransportError, TransportResult,
};
use tidal_crypto::{generation_signature, Hit, KeyPair};
use tidal_mining::MiningScheduler;
use tidal_node::StateMachine;
use tidal_types::{Block, BlockHeader, PeerId, Score};

pub const GENESIS_TIME: u64 = 1_700_000_000_000;
pub const BALANCE: u64 = 1_000_000_000_000;

pub fn peer(name: &str) -> PeerId {
    PeerId::from(name)
}

/// Network double that records everything the node does to it.
pub struct RecordingNetwork {
    peers: Mutex<Vec<PeerId>>,
    sent: Mutex<Vec<(PeerId, ProtocolMessage)>>,
    suspended: Mutex<Vec<PeerId>>,
    asked: AtomicUsize,
    closed: AtomicUsize,
}

impl RecordingNetwork {
    pub fn new(peers: &[&str]) -> Self {
        Self {
            peers: Mutex::new(peers.iter().map(|p| peer(p)).collect()),
            sent: Mutex::new(Vec::new()),
            suspended: Mutex::new(Vec::new()),
            asked: AtomicUsize::new(0),
            closed: AtomicUsize::new(0),
        }
    }

    /// Everything sent so far, clearing the record.
    pub fn take(&self) -> Vec<(PeerId, ProtocolMessage)> {
        std::mem::take(&mut *self.sent.lock())
    }

    pub fn sent(&self) -> Vec<(PeerId, ProtocolMessage)> {
        self.sent.lock().clone()
    }

    pub fn suspended(&self) -> Vec<PeerId> {
        self.suspended.lock().clone()
    }

    pub fn asked(&self) -> usize {
        self.asked.load(Ordering::SeqCst)
    }

    pub fn close_count(&self) -> usize {
        self.closed.load(Ordering::SeqCst)
    }
}

impl PeerNetwork for RecordingNetwork {
    fn connected(&self) -> Vec<PeerId> {
        self.peers.lock().clone()
    }

    fn update_score(&self, _peer: &PeerId, _score: &Score) {}

    fn suspend(&self, peer: &PeerId, _duration: Duration, _reason: &str) {
        self.suspended.lock().push(peer.clone());
    }

    fn ask_peers(&self) {
        self.asked.fetch_add(1, Ordering::SeqCst);
    }

    fn send(&self, peer: &PeerId, message: ProtocolMessage) -> TransportResult<()> {
        if !self.peers.lock().contains(peer) {
            return Err(TransportError::PeerNotConnected(peer.clone()));
        }
        self.sent.lock().push((peer.clone(), message));
        Ok(())
    }

    fn close(&self) -> TransportResult<()> {
        self.closed.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Every generator may forge a fixed time after the parent.
pub struct FixedDelay(pub u64);

impl PosCalculator for FixedDelay {
    fn calculate(&self, _hit: Hit, parent: &ParentInfo, _balance: u64) -> PosResult<PosOutcome> {
        Ok(PosOutcome {
            delay_ms: self.0,
            base_target: parent.base_target,
        })
    }
}

/// `n` empty blocks forged by `keys` on top of `parent`, a minute apart.
pub fn extend(parent: &Block, keys: &KeyPair, n: usize) -> Vec<Block> {
    extend_with_base_target(parent, keys, n, parent.header.base_target)
}

pub fn extend_with_base_target(
    parent: &Block,
    keys: &KeyPair,
    n: usize,
    base_target: u64,
) -> Vec<Block> {
    let mut out = Vec::with_capacity(n);
    let mut prev = parent.clone();
    for _ in 0..n {
        let header = BlockHeader::new(
            prev.id(),
            prev.timestamp() + 60_000,
            base_target,
            generation_signature(&prev.header.generation_signature, &keys.public_key()),
            keys.public_key(),
        );
        let block = Block::sign(header, Vec::new(), keys).unwrap();
        out.push(block.clone());
        prev = block;
    }
    out
}

/// A state machine wired to in-memory collaborators.
pub struct Harness {
    pub keys: Arc<KeyPair>,
    pub genesis: Block,
    pub ledger: Arc<MemoryLedger>,
    pub network: Arc<RecordingNetwork>,
    pub time: Arc<ManualTimeSource>,
    pub scheduler: Arc<MiningScheduler>,
    pub config: Config,
}

impl Harness {
    pub fn new(config: Config) -> Self {
        Self::with_ledger(config, |ledger| ledger)
    }

    pub fn with_ledger(config: Config, customize: impl FnOnce(MemoryLedger) -> MemoryLedger) -> Self {
        Self::build(config, 60_000, customize)
    }

    pub fn build(
        config: Config,
        mining_delay_ms: u64,
        customize: impl FnOnce(MemoryLedger) -> MemoryLedger,
    ) -> Self {
        let keys = Arc::new(KeyPair::random());
        let genesis = Block::genesis(&keys, GENESIS_TIME).unwrap();
        let ledger = customize(MemoryLedger::new(genesis.clone()).with_balance(keys.address(), BALANCE));
        let ledger = Arc::new(ledger);
        let network = Arc::new(RecordingNetwork::new(&["peer-a", "peer-b", "peer-c"]));
        let time = Arc::new(ManualTimeSource::new(GENESIS_TIME));
        let scheduler = Arc::new(MiningScheduler::with_keys(
            &config.mining,
            vec![keys.clone()],
            ledger.clone(),
            network.clone(),
            Arc::new(FixedDelay(mining_delay_ms)),
            time.clone(),
        ));
        Self {
            keys,
            genesis,
            ledger,
            network,
            time,
            scheduler,
            config,
        }
    }

    pub fn fsm(&self) -> StateMachine {
        StateMachine::new(
            self.config.clone(),
            self.ledger.clone(),
            self.network.clone(),
            self.scheduler.clone(),
            self.time.clone(),
        )
    }
}
