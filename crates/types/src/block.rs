//! Key blocks.
//!
//! This module provides:
//! - [`BlockHeader`] - proof-of-stake metadata and the transactions commitment
//! - [`Block`] - a header, its transactions and the generator's signature
//! - [`BlockSnapshot`] - state snapshot paired with a block in light mode
//!
//! A block's ID is the Keccak256 of the RLP-encoded header followed by the
//! signature, so two versions of the same liquid block (a key block and the
//! same block extended by micro-blocks) have different IDs.

use crate::{BlockId, Result, Score, Transaction};
use bytes::Bytes;
use rlp::{Encodable, RlpStream};
use serde::{Deserialize, Serialize};
use tidal_crypto::{keccak256_concat, Hasher, KeyPair, PublicKey, Signature};

/// Block version written by this node.
pub const BLOCK_VERSION: u8 = 5;

/// Base target of the genesis block.
pub const INITIAL_BASE_TARGET: u64 = 153_722_867;

/// Commitment to an ordered list of transactions.
pub fn transactions_root(transactions: &[Transaction]) -> [u8; 32] {
    let mut hasher = Hasher::new();
    for tx in transactions {
        hasher.update(&tx.id());
    }
    hasher.finalize()
}

/// Block header.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockHeader {
    /// Block format version
    pub version: u8,
    /// Unix timestamp in milliseconds
    pub timestamp: u64,
    /// ID of the parent block ([`BlockId::ZERO`] for genesis)
    pub parent: BlockId,
    /// Proof-of-stake base target
    pub base_target: u64,
    /// Generation signature chained from the parent
    pub generation_signature: [u8; 32],
    /// Public key of the block generator
    pub generator: PublicKey,
    /// Commitment to the block's transactions
    pub transactions_root: [u8; 32],
    /// Features the generator votes for
    pub features: Vec<u16>,
}

impl BlockHeader {
    /// Header for a new block with no transactions.
    pub fn new(
        parent: BlockId,
        timestamp: u64,
        base_target: u64,
        generation_signature: [u8; 32],
        generator: PublicKey,
    ) -> Self {
        Self {
            version: BLOCK_VERSION,
            timestamp,
            parent,
            base_target,
            generation_signature,
            generator,
            transactions_root: transactions_root(&[]),
            features: Vec::new(),
        }
    }

    /// Bytes covered by the generator's signature.
    pub fn signing_bytes(&self) -> Vec<u8> {
        rlp::encode(self).to_vec()
    }
}

impl Encodable for BlockHeader {
    fn rlp_append(&self, s: &mut RlpStream) {
        s.begin_list(8);
        s.append(&self.version);
        s.append(&self.timestamp);
        s.append(&self.parent);
        s.append(&self.base_target);
        s.append(&self.generation_signature.to_vec());
        s.append(&self.generator.to_compressed().to_vec());
        s.append(&self.transactions_root.to_vec());
        s.append_list::<u16, u16>(&self.features);
    }
}

/// A signed key block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    /// Block header
    pub header: BlockHeader,
    /// Transactions in block order
    pub transactions: Vec<Transaction>,
    /// Generator's signature over the header
    pub signature: Signature,
    id: BlockId,
}

impl Block {
    /// Assemble a block from parts and derive its ID.
    pub fn new(header: BlockHeader, transactions: Vec<Transaction>, signature: Signature) -> Self {
        let id = Self::compute_id(&header, &signature);
        Self {
            header,
            transactions,
            signature,
            id,
        }
    }

    /// Commit to `transactions`, set the generator and sign.
    pub fn sign(
        mut header: BlockHeader,
        transactions: Vec<Transaction>,
        keys: &KeyPair,
    ) -> Result<Self> {
        header.generator = keys.public_key();
        header.transactions_root = transactions_root(&transactions);
        let signature = keys.sign(&header.signing_bytes())?;
        Ok(Self::new(header, transactions, signature))
    }

    /// A genesis block forged by `keys`.
    pub fn genesis(keys: &KeyPair, timestamp: u64) -> Result<Self> {
        let header = BlockHeader::new(
            BlockId::ZERO,
            timestamp,
            INITIAL_BASE_TARGET,
            [0u8; 32],
            keys.public_key(),
        );
        Self::sign(header, Vec::new(), keys)
    }

    fn compute_id(header: &BlockHeader, signature: &Signature) -> BlockId {
        BlockId::new(keccak256_concat(&[
            &header.signing_bytes(),
            signature.as_bytes(),
        ]))
    }

    /// Block ID.
    #[inline]
    pub fn id(&self) -> BlockId {
        self.id
    }

    /// Parent block ID.
    #[inline]
    pub fn parent(&self) -> BlockId {
        self.header.parent
    }

    /// Generator's public key.
    #[inline]
    pub fn generator(&self) -> &PublicKey {
        &self.header.generator
    }

    /// Timestamp in milliseconds.
    #[inline]
    pub fn timestamp(&self) -> u64 {
        self.header.timestamp
    }

    /// Weight this block adds to its chain.
    pub fn score(&self) -> Score {
        Score::from_base_target(self.header.base_target)
    }

    /// Whether the signature was made by the header's generator and the
    /// transactions match the header commitment.
    pub fn verify_signature(&self) -> bool {
        if self.header.transactions_root != transactions_root(&self.transactions) {
            return false;
        }
        self.header
            .generator
            .verify(&self.header.signing_bytes(), &self.signature)
            .unwrap_or(false)
    }

    /// This block with `extra` transactions appended and a new signature.
    ///
    /// The result is the next version of a liquid block; it keeps the parent,
    /// generator and proof-of-stake fields of `self`.
    pub fn extended(&self, extra: &[Transaction], signature: Signature) -> Self {
        let mut transactions = Vec::with_capacity(self.transactions.len() + extra.len());
        transactions.extend_from_slice(&self.transactions);
        transactions.extend_from_slice(extra);
        let mut header = self.header.clone();
        header.transactions_root = transactions_root(&transactions);
        Self::new(header, transactions, signature)
    }
}

/// State snapshot delivered alongside a block in light mode.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockSnapshot {
    /// Block the snapshot belongs to
    pub block_id: BlockId,
    /// Encoded snapshot
    pub data: Bytes,
}

impl BlockSnapshot {
    /// Create a snapshot for `block_id`.
    pub fn new(block_id: BlockId, data: impl Into<Bytes>) -> Self {
        Self {
            block_id,
            data: data.into(),
        }
    }
}
