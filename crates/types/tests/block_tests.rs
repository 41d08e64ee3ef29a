//! Tests for blocks, micro-blocks and announcements

use tidal_crypto::{generation_signature, KeyPair};
use tidal_types::block::{BlockHeader, INITIAL_BASE_TARGET};
use tidal_types::{Block, BlockId, MicroBlock, MicroBlockInv, Score, Transaction};

fn child_of(parent: &Block, keys: &KeyPair, timestamp: u64) -> Block {
    let header = BlockHeader::new(
        parent.id(),
        timestamp,
        parent.header.base_target,
        generation_signature(&parent.header.generation_signature, &keys.public_key()),
        keys.public_key(),
    );
    Block::sign(header, Vec::new(), keys).unwrap()
}

#[test]
fn test_genesis() {
    let keys = KeyPair::random();
    let genesis = Block::genesis(&keys, 1_000).unwrap();
    assert!(genesis.parent().is_zero());
    assert_eq!(genesis.header.base_target, INITIAL_BASE_TARGET);
    assert_eq!(genesis.generator(), &keys.public_key());
    assert!(genesis.verify_signature());
}

#[test]
fn test_chain_links_by_id() {
    let keys = KeyPair::random();
    let genesis = Block::genesis(&keys, 0).unwrap();
    let b1 = child_of(&genesis, &keys, 60_000);
    let b2 = child_of(&b1, &keys, 120_000);
    assert_eq!(b1.parent(), genesis.id());
    assert_eq!(b2.parent(), b1.id());
    assert_ne!(b1.id(), b2.id());
}

#[test]
fn test_signature_from_other_key_rejected() {
    let keys = KeyPair::random();
    let mallory = KeyPair::random();
    let block = Block::genesis(&keys, 0).unwrap();
    let forged_sig = mallory.sign(&block.header.signing_bytes()).unwrap();
    let forged = Block::new(block.header.clone(), Vec::new(), forged_sig);
    assert!(!forged.verify_signature());
}

#[test]
fn test_transactions_must_match_root() {
    let keys = KeyPair::random();
    let genesis = Block::genesis(&keys, 0).unwrap();
    let mut tampered = genesis.clone();
    tampered.transactions.push(Transaction::new(b"sneaky".to_vec()));
    assert!(!tampered.verify_signature());
}

#[test]
fn test_block_score() {
    let keys = KeyPair::random();
    let genesis = Block::genesis(&keys, 0).unwrap();
    assert_eq!(genesis.score(), Score::from_base_target(INITIAL_BASE_TARGET));
}

#[test]
fn test_micro_block_build() {
    let keys = KeyPair::random();
    let genesis = Block::genesis(&keys, 0).unwrap();
    let key_block = child_of(&genesis, &keys, 60_000);

    let txs = vec![Transaction::new(b"tx1".to_vec()), Transaction::new(b"tx2".to_vec())];
    let (micro, total) = MicroBlock::build(&keys, &key_block, txs.clone()).unwrap();

    assert_eq!(micro.reference, key_block.id());
    assert_eq!(micro.id(), total.id());
    assert_eq!(total.transactions, txs);
    assert_eq!(total.parent(), key_block.parent());
    assert!(micro.verify_signature());
    assert!(total.verify_signature());

    // Rebuilding the total block from the micro-block reproduces its ID.
    let rebuilt = key_block.extended(&micro.transactions, micro.total_block_signature);
    assert_eq!(rebuilt.id(), micro.total_block_id);
}

#[test]
fn test_micro_block_chain() {
    let keys = KeyPair::random();
    let key_block = Block::genesis(&keys, 0).unwrap();
    let (m1, v1) = MicroBlock::build(&keys, &key_block, vec![Transaction::new(b"a".to_vec())]).unwrap();
    let (m2, v2) = MicroBlock::build(&keys, &v1, vec![Transaction::new(b"b".to_vec())]).unwrap();
    assert_eq!(m2.reference, m1.total_block_id);
    assert_eq!(v2.transactions.len(), 2);
}

#[test]
fn test_inv_signature() {
    let keys = KeyPair::random();
    let key_block = Block::genesis(&keys, 0).unwrap();
    let (micro, _) = MicroBlock::build(&keys, &key_block, Vec::new()).unwrap();
    let inv = MicroBlockInv::new(&keys, &micro).unwrap();
    assert!(inv.verify());
    assert_eq!(inv.total_block_id, micro.id());

    let mut tampered = inv.clone();
    tampered.reference = BlockId::digest(b"elsewhere");
    assert!(!tampered.verify());
}

#[test]
fn test_block_json_roundtrip() {
    let keys = KeyPair::random();
    let block = Block::genesis(&keys, 5).unwrap();
    let json = serde_json::to_string(&block).unwrap();
    let restored: Block = serde_json::from_str(&json).unwrap();
    assert_eq!(restored, block);
    assert_eq!(restored.id(), block.id());
}
