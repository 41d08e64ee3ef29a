//! State machine tests for catching up with peers

mod common;

use common::{extend, peer, Harness};
use tidal_config::Config;
use tidal_core::{Ledger, ProtocolMessage};
use tidal_node::{ErrorKind, Event, NodeError, StateKind, Task};
use tidal_sync::SyncError;
use tidal_types::{BlockId, PeerId, Score};

fn ahead(n: u64) -> Score {
    Score::from(n * 1_000_000_000_000_000)
}

fn score_event(name: &str, score: Score) -> Event {
    Event::PeerScore {
        peer: peer(name),
        score,
    }
}

fn requested_blocks(sent: &[(PeerId, ProtocolMessage)]) -> Vec<BlockId> {
    sent.iter()
        .filter_map(|(_, m)| match m {
            ProtocolMessage::GetBlock(id) => Some(*id),
            _ => None,
        })
        .collect()
}

fn locators_sent_to(sent: &[(PeerId, ProtocolMessage)], to: &str) -> Vec<Vec<BlockId>> {
    sent.iter()
        .filter(|(p, _)| p.as_str() == to)
        .filter_map(|(_, m)| match m {
            ProtocolMessage::GetBlockIds(ids) => Some(ids.clone()),
            _ => None,
        })
        .collect()
}

fn small_batches(max_block_ids: usize, apply_batch_size: usize) -> Config {
    let mut config = Config::default();
    config.sync.max_block_ids = max_block_ids;
    config.sync.apply_batch_size = apply_batch_size;
    config
}

#[test]
fn test_higher_score_starts_sync() {
    let h = Harness::new(Config::default());
    let local = extend(&h.genesis, &h.keys, 2);
    h.ledger.apply(&local, None).unwrap();
    let mut fsm = h.fsm();

    assert!(fsm.handle(score_event("peer-a", ahead(1))).is_none());
    assert_eq!(fsm.state(), StateKind::Sync);
    assert_eq!(fsm.sync_peer(), Some(&peer("peer-a")));

    let sent = h.network.take();
    let locators = locators_sent_to(&sent, "peer-a");
    assert_eq!(locators.len(), 1);
    assert_eq!(
        locators[0],
        vec![local[1].id(), local[0].id(), h.genesis.id()]
    );
}

#[test]
fn test_lower_score_stays_idle() {
    let h = Harness::new(Config::default());
    let mut fsm = h.fsm();
    fsm.handle(score_event("peer-a", Score::from(1)));
    assert_eq!(fsm.state(), StateKind::Idle);
    assert!(h.network.take().is_empty());
}

#[test]
fn test_scrambled_bodies_apply_in_order() {
    let h = Harness::new(Config::default());
    let remote = extend(&h.genesis, &h.keys, 5);
    let mut fsm = h.fsm();
    let a = peer("peer-a");

    fsm.handle(score_event("peer-a", ahead(1)));
    fsm.handle(Event::BlockIds {
        peer: a.clone(),
        ids: remote.iter().map(|b| b.id()).collect(),
    });
    let sent = h.network.take();
    assert_eq!(
        requested_blocks(&sent),
        remote.iter().map(|b| b.id()).collect::<Vec<_>>()
    );

    for i in [2, 0, 4, 1] {
        assert!(fsm
            .handle(Event::Block {
                peer: a.clone(),
                block: remote[i].clone(),
            })
            .is_none());
        assert_eq!(h.ledger.height().unwrap(), 1);
    }
    fsm.handle(Event::Block {
        peer: a.clone(),
        block: remote[3].clone(),
    });

    let mut expected = vec![h.genesis.id()];
    expected.extend(remote.iter().map(|b| b.id()));
    assert_eq!(h.ledger.chain(), expected);
    assert_eq!(fsm.state(), StateKind::Ng);
}

#[test]
fn test_partial_batches_are_applied() {
    let h = Harness::new(small_batches(100, 2));
    let remote = extend(&h.genesis, &h.keys, 4);
    let mut fsm = h.fsm();
    let a = peer("peer-a");

    fsm.handle(score_event("peer-a", ahead(1)));
    fsm.handle(Event::BlockIds {
        peer: a.clone(),
        ids: remote.iter().map(|b| b.id()).collect(),
    });
    for block in &remote[..2] {
        fsm.handle(Event::Block {
            peer: a.clone(),
            block: block.clone(),
        });
    }
    assert_eq!(h.ledger.height().unwrap(), 3);
    assert_eq!(fsm.state(), StateKind::Sync);

    for block in &remote[2..] {
        fsm.handle(Event::Block {
            peer: a.clone(),
            block: block.clone(),
        });
    }
    assert_eq!(h.ledger.height().unwrap(), 5);
    assert_eq!(fsm.state(), StateKind::Ng);
}

#[test]
fn test_known_ids_are_not_requested_twice() {
    let h = Harness::new(small_batches(2, 2));
    let remote = extend(&h.genesis, &h.keys, 3);
    let mut fsm = h.fsm();
    let a = peer("peer-a");
    let ids = |range: std::ops::Range<usize>| remote[range].iter().map(|b| b.id()).collect::<Vec<_>>();

    fsm.handle(score_event("peer-a", ahead(1)));
    fsm.handle(Event::BlockIds {
        peer: a.clone(),
        ids: ids(0..2),
    });
    // A repeated answer while bodies are in flight is ignored.
    fsm.handle(Event::BlockIds {
        peer: a.clone(),
        ids: ids(0..2),
    });
    for block in &remote[..2] {
        fsm.handle(Event::Block {
            peer: a.clone(),
            block: block.clone(),
        });
    }
    assert_eq!(h.ledger.height().unwrap(), 3);
    assert_eq!(fsm.state(), StateKind::Sync);

    // The next answer overlaps with what was just applied.
    fsm.handle(Event::BlockIds {
        peer: a.clone(),
        ids: ids(1..3),
    });
    fsm.handle(Event::Block {
        peer: a.clone(),
        block: remote[2].clone(),
    });
    fsm.handle(Event::BlockIds {
        peer: a.clone(),
        ids: ids(2..3),
    });

    let requested = requested_blocks(&h.network.take());
    assert_eq!(requested, ids(0..3));
    assert_eq!(h.ledger.height().unwrap(), 4);
    assert_eq!(fsm.state(), StateKind::Ng);
}

#[test]
fn test_answers_from_other_peers_are_ignored() {
    let h = Harness::new(Config::default());
    let remote = extend(&h.genesis, &h.keys, 2);
    let mut fsm = h.fsm();

    fsm.handle(score_event("peer-a", ahead(1)));
    h.network.take();
    fsm.handle(Event::BlockIds {
        peer: peer("peer-b"),
        ids: remote.iter().map(|b| b.id()).collect(),
    });
    assert!(h.network.take().is_empty());
    assert_eq!(fsm.state(), StateKind::Sync);
}

#[test]
fn test_higher_score_wins_in_either_order() {
    for order in [["peer-a", "peer-b"], ["peer-b", "peer-a"]] {
        let h = Harness::new(Config::default());
        let mut fsm = h.fsm();
        for name in order {
            let score = if name == "peer-a" { ahead(1) } else { ahead(2) };
            fsm.handle(score_event(name, score));
        }
        assert_eq!(fsm.sync_peer(), Some(&peer("peer-b")));

        // Re-announcing the same scores changes nothing.
        fsm.handle(score_event("peer-a", ahead(1)));
        fsm.handle(score_event("peer-b", ahead(2)));
        assert_eq!(fsm.sync_peer(), Some(&peer("peer-b")));
    }
}

#[test]
fn test_peer_switch_waits_for_in_flight_bodies() {
    let h = Harness::new(small_batches(2, 2));
    let remote = extend(&h.genesis, &h.keys, 2);
    let mut fsm = h.fsm();
    let a = peer("peer-a");

    fsm.handle(score_event("peer-a", ahead(1)));
    fsm.handle(Event::BlockIds {
        peer: a.clone(),
        ids: remote.iter().map(|b| b.id()).collect(),
    });
    fsm.handle(score_event("peer-b", ahead(2)));
    assert_eq!(fsm.sync_peer(), Some(&a));

    h.network.take();
    for block in &remote {
        fsm.handle(Event::Block {
            peer: a.clone(),
            block: block.clone(),
        });
    }
    assert_eq!(h.ledger.height().unwrap(), 3);
    assert_eq!(fsm.sync_peer(), Some(&peer("peer-b")));

    let sent = h.network.take();
    assert_eq!(locators_sent_to(&sent, "peer-b").len(), 1);
    assert!(locators_sent_to(&sent, "peer-a").is_empty());
}

#[test]
fn test_deferred_switch_survives_end_of_chain() {
    let h = Harness::new(Config::default());
    let remote = extend(&h.genesis, &h.keys, 2);
    let mut fsm = h.fsm();
    let a = peer("peer-a");

    fsm.handle(score_event("peer-a", ahead(1)));
    fsm.handle(Event::BlockIds {
        peer: a.clone(),
        ids: remote.iter().map(|b| b.id()).collect(),
    });
    fsm.handle(score_event("peer-b", ahead(2)));
    assert_eq!(fsm.sync_peer(), Some(&a));

    h.network.take();
    for block in &remote {
        fsm.handle(Event::Block {
            peer: a.clone(),
            block: block.clone(),
        });
    }
    // The short answer ended the chain of peer-a, but peer-b is still ahead.
    assert_eq!(h.ledger.height().unwrap(), 3);
    assert_eq!(fsm.state(), StateKind::Sync);
    assert_eq!(fsm.sync_peer(), Some(&peer("peer-b")));
    assert_eq!(locators_sent_to(&h.network.take(), "peer-b").len(), 1);
}

#[test]
fn test_ng_resyncs_with_peer_ahead_on_tick() {
    let h = Harness::new(Config::default());
    let mut fsm = h.fsm();

    fsm.handle(score_event("peer-a", ahead(1)));
    fsm.handle(Event::BlockIds {
        peer: peer("peer-a"),
        ids: Vec::new(),
    });
    assert_eq!(fsm.state(), StateKind::Ng);

    fsm.handle(Event::Task(Task::Ping));
    assert_eq!(fsm.state(), StateKind::Sync);
    assert_eq!(fsm.sync_peer(), Some(&peer("peer-a")));
}

#[test]
fn test_ng_stays_on_tick_without_peer_ahead() {
    let h = Harness::new(Config::default());
    let mut fsm = h.fsm();
    fsm.handle(score_event("peer-a", Score::from(1)));
    fsm.handle(Event::StartMining);

    fsm.handle(Event::Task(Task::Ping));
    assert_eq!(fsm.state(), StateKind::Ng);
}

#[test]
fn test_rejected_block_suspends_peer() {
    let h = Harness::new(Config::default());
    let remote = extend(&h.genesis, &h.keys, 3);
    h.ledger.reject(remote[1].id());
    let mut fsm = h.fsm();
    let a = peer("peer-a");

    fsm.handle(score_event("peer-a", ahead(1)));
    fsm.handle(Event::BlockIds {
        peer: a.clone(),
        ids: remote.iter().map(|b| b.id()).collect(),
    });
    let mut last = None;
    for block in &remote {
        last = fsm.handle(Event::Block {
            peer: a.clone(),
            block: block.clone(),
        });
    }

    let err = last.expect("apply error");
    assert_eq!(err.kind(), ErrorKind::Validation);
    assert_eq!(fsm.state(), StateKind::Idle);
    assert_eq!(h.network.suspended(), vec![a.clone()]);
    assert_eq!(h.ledger.height().unwrap(), 1);

    // The suspended peer is no longer a sync candidate.
    fsm.handle(Event::Task(Task::Ping));
    assert_eq!(fsm.state(), StateKind::Idle);
}

#[test]
fn test_unrequested_block_is_reported() {
    let h = Harness::new(Config::default());
    let stray = extend(&h.genesis, &h.keys, 1).remove(0);
    let mut fsm = h.fsm();

    fsm.handle(score_event("peer-a", ahead(1)));
    let err = fsm.handle(Event::Block {
        peer: peer("peer-a"),
        block: stray.clone(),
    });
    assert_eq!(
        err,
        Some(NodeError::Sync(SyncError::UnexpectedBlock(stray.id())))
    );
    assert_eq!(err.map(|e| e.kind()), Some(ErrorKind::Protocol));
    assert_eq!(fsm.state(), StateKind::Sync);
    assert!(h.network.suspended().is_empty());
}

#[test]
fn test_stalled_sync_times_out() {
    let h = Harness::new(Config::default());
    let mut fsm = h.fsm();

    fsm.handle(score_event("peer-a", ahead(1)));
    h.time.advance(h.config.sync.timeout_ms);
    assert!(fsm.handle(Event::Task(Task::Ping)).is_none());
    assert_eq!(fsm.state(), StateKind::Sync);

    h.time.advance(1);
    let err = fsm.handle(Event::Task(Task::Ping)).expect("timeout");
    assert!(matches!(err, NodeError::Timeout { .. }));
    assert_eq!(err.kind(), ErrorKind::Fatal);
    assert_eq!(fsm.state(), StateKind::Idle);

    // The next tick retries with the best known peer.
    fsm.handle(Event::Task(Task::Ping));
    assert_eq!(fsm.state(), StateKind::Sync);
}

#[test]
fn test_losing_sync_peer_returns_to_idle() {
    let h = Harness::new(Config::default());
    let mut fsm = h.fsm();

    fsm.handle(score_event("peer-a", ahead(1)));
    fsm.handle(Event::PeerDisconnected(peer("peer-b")));
    assert_eq!(fsm.state(), StateKind::Sync);
    fsm.handle(Event::PeerDisconnected(peer("peer-a")));
    assert_eq!(fsm.state(), StateKind::Idle);
    assert!(fsm.base().selector().is_empty());
}

#[test]
fn test_light_mode_waits_for_snapshots() {
    let mut config = Config::default();
    config.node.light_mode = true;
    let h = Harness::new(config);
    let remote = extend(&h.genesis, &h.keys, 2);
    let mut fsm = h.fsm();
    let a = peer("peer-a");

    fsm.handle(score_event("peer-a", ahead(1)));
    fsm.handle(Event::BlockIds {
        peer: a.clone(),
        ids: remote.iter().map(|b| b.id()).collect(),
    });
    let snapshot_requests = h
        .network
        .take()
        .into_iter()
        .filter(|(_, m)| matches!(m, ProtocolMessage::GetSnapshot(_)))
        .count();
    assert_eq!(snapshot_requests, 2);

    for block in &remote {
        fsm.handle(Event::Block {
            peer: a.clone(),
            block: block.clone(),
        });
    }
    assert_eq!(h.ledger.height().unwrap(), 1);

    for block in &remote {
        fsm.handle(Event::Snapshot {
            peer: a.clone(),
            snapshot: tidal_types::BlockSnapshot::new(block.id(), vec![1, 2, 3]),
        });
    }
    assert_eq!(h.ledger.height().unwrap(), 3);
    assert_eq!(h.ledger.applied_snapshots(), 2);
    assert_eq!(fsm.state(), StateKind::Ng);
}

#[test]
fn test_extended_api_starts_once() {
    let mut config = Config::default();
    config.node.extended_api = true;
    let h = Harness::new(config);
    let mut fsm = h.fsm();

    for round in 0..2u64 {
        fsm.handle(score_event("peer-a", ahead(round + 1)));
        assert_eq!(fsm.state(), StateKind::Sync);
        fsm.handle(Event::BlockIds {
            peer: peer("peer-a"),
            ids: Vec::new(),
        });
        assert_eq!(fsm.state(), StateKind::Ng);
        assert!(h.ledger.extended_api_started());
        assert!(fsm.base().extended_api_started());
    }
}
