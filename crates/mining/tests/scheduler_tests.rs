//! Mining scheduler tests

use std::sync::Arc;
use std::time::Duration;

use tidal_config::MiningConfig;
use tidal_core::{
    Ledger, ManualTimeSource, MemoryLedger, ParentInfo, PeerNetwork, PosCalculator, PosOutcome,
    PosResult, ProtocolMessage, TransportResult,
};
use tidal_crypto::{Hit, KeyPair};
use tidal_mining::{MiningScheduler, NxtPosCalculator};
use tidal_types::{Block, PeerId, Score};

const GENESIS_TIME: u64 = 1_700_000_000_000;
const BALANCE: u64 = 1_000_000_000_000;

/// Network with a fixed number of peers.
struct Peers(usize);

impl PeerNetwork for Peers {
    fn connected(&self) -> Vec<PeerId> {
        (0..self.0).map(|i| PeerId::new(format!("peer-{}", i))).collect()
    }
    fn update_score(&self, _peer: &PeerId, _score: &Score) {}
    fn suspend(&self, _peer: &PeerId, _duration: Duration, _reason: &str) {}
    fn ask_peers(&self) {}
    fn send(&self, _peer: &PeerId, _message: ProtocolMessage) -> TransportResult<()> {
        Ok(())
    }
    fn close(&self) -> TransportResult<()> {
        Ok(())
    }
}

/// Every generator may forge a fixed time after the parent.
struct FixedDelay(u64);

impl PosCalculator for FixedDelay {
    fn calculate(&self, _hit: Hit, parent: &ParentInfo, _balance: u64) -> PosResult<PosOutcome> {
        Ok(PosOutcome {
            delay_ms: self.0,
            base_target: parent.base_target,
        })
    }
}

struct Setup {
    keys: Arc<KeyPair>,
    ledger: Arc<MemoryLedger>,
    time: Arc<ManualTimeSource>,
    config: MiningConfig,
}

impl Setup {
    fn new() -> Self {
        let keys = Arc::new(KeyPair::random());
        let genesis = Block::genesis(&keys, GENESIS_TIME).unwrap();
        let ledger = Arc::new(MemoryLedger::new(genesis).with_balance(keys.address(), BALANCE));
        Self {
            keys,
            ledger,
            time: Arc::new(ManualTimeSource::new(GENESIS_TIME)),
            config: MiningConfig::default(),
        }
    }

    fn scheduler(&self, calculator: impl PosCalculator, peers: usize) -> MiningScheduler {
        MiningScheduler::with_keys(
            &self.config,
            vec![self.keys.clone()],
            self.ledger.clone(),
            Arc::new(Peers(peers)),
            Arc::new(calculator),
            self.time.clone(),
        )
    }
}

#[test]
fn test_due_emit_is_delivered_immediately() {
    let setup = Setup::new();
    let scheduler = setup.scheduler(FixedDelay(0), 1);
    scheduler.reschedule().unwrap();

    let emit = scheduler.slot().take().expect("emit");
    let top = setup.ledger.top_block().unwrap();
    assert_eq!(emit.parent, top.id());
    assert_eq!(emit.timestamp, GENESIS_TIME);
    assert_eq!(emit.base_target, top.header.base_target);
    assert_eq!(emit.key.public_key(), setup.keys.public_key());
    assert_eq!(scheduler.emits().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_timer_delivers_emit() {
    let setup = Setup::new();
    let scheduler = setup.scheduler(FixedDelay(5_000), 1);
    scheduler.reschedule().unwrap();

    let slot = scheduler.slot();
    assert!(slot.is_empty());
    let emit = slot.next().await;
    assert_eq!(emit.timestamp, GENESIS_TIME + 5_000);
}

#[tokio::test(start_paused = true)]
async fn test_double_reschedule_emits_once() {
    let setup = Setup::new();
    let scheduler = setup.scheduler(FixedDelay(5_000), 1);
    scheduler.reschedule().unwrap();
    scheduler.reschedule().unwrap();

    let slot = scheduler.slot();
    tokio::time::sleep(Duration::from_millis(6_000)).await;
    assert!(slot.take().is_some());

    tokio::time::sleep(Duration::from_millis(60_000)).await;
    assert!(slot.take().is_none());
}

#[tokio::test(start_paused = true)]
async fn test_reschedule_supersedes_pending_emit() {
    let setup = Setup::new();
    let scheduler = setup.scheduler(FixedDelay(0), 1);
    scheduler.reschedule().unwrap();
    assert!(!scheduler.slot().is_empty());

    scheduler.cancel_all();
    assert!(scheduler.slot().is_empty());
    assert!(scheduler.emits().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_cancel_all_aborts_timers() {
    let setup = Setup::new();
    let scheduler = setup.scheduler(FixedDelay(1_000), 1);
    scheduler.reschedule().unwrap();
    scheduler.cancel_all();

    tokio::time::sleep(Duration::from_millis(5_000)).await;
    assert!(scheduler.slot().is_empty());
}

#[test]
fn test_disabled_mining_schedules_nothing() {
    let mut setup = Setup::new();
    setup.config.enabled = false;
    let scheduler = setup.scheduler(FixedDelay(0), 1);
    scheduler.reschedule().unwrap();
    assert!(scheduler.emits().is_empty());
    assert!(scheduler.slot().is_empty());
}

#[test]
fn test_requires_connected_peers() {
    let setup = Setup::new();
    let scheduler = setup.scheduler(FixedDelay(0), 0);
    scheduler.reschedule().unwrap();
    assert!(scheduler.emits().is_empty());
}

#[test]
fn test_obsolete_tip_schedules_nothing() {
    let setup = Setup::new();
    setup.time.advance(setup.config.obsolescence_ms + 1);
    let scheduler = setup.scheduler(FixedDelay(0), 1);
    scheduler.reschedule().unwrap();
    assert!(scheduler.emits().is_empty());
}

#[test]
fn test_low_balance_schedules_nothing() {
    let setup = Setup::new();
    setup
        .ledger
        .set_balance(setup.keys.address(), setup.config.min_generating_balance - 1);
    let scheduler = setup.scheduler(FixedDelay(0), 1);
    scheduler.reschedule().unwrap();
    assert!(scheduler.emits().is_empty());
}

#[test]
fn test_schedule_is_sorted_per_key() {
    let setup = Setup::new();
    let other = Arc::new(KeyPair::random());
    setup.ledger.set_balance(other.address(), BALANCE);
    let scheduler = MiningScheduler::with_keys(
        &setup.config,
        vec![setup.keys.clone(), other.clone()],
        setup.ledger.clone(),
        Arc::new(Peers(3)),
        Arc::new(NxtPosCalculator),
        setup.time.clone(),
    );
    scheduler.reschedule().unwrap();

    let emits = scheduler.emits();
    assert_eq!(emits.len(), 2);
    assert!(emits[0].timestamp <= emits[1].timestamp);
    assert_ne!(emits[0].generation_signature, emits[1].generation_signature);
}

#[test]
fn test_keys_from_config() {
    let setup = Setup::new();
    let config = MiningConfig {
        keys: vec!["01".repeat(32), "02".repeat(32)],
        ..MiningConfig::default()
    };
    let scheduler = MiningScheduler::new(
        &config,
        setup.ledger.clone(),
        Arc::new(Peers(1)),
        Arc::new(NxtPosCalculator),
        setup.time.clone(),
    )
    .unwrap();
    assert_eq!(scheduler.key_count(), 2);

    let bad = MiningConfig {
        keys: vec!["not-a-key".into()],
        ..MiningConfig::default()
    };
    assert!(MiningScheduler::new(
        &bad,
        setup.ledger.clone(),
        Arc::new(Peers(1)),
        Arc::new(NxtPosCalculator),
        setup.time.clone(),
    )
    .is_err());
}
