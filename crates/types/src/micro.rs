//! NG micro-blocks and their announcements.
//!
//! A micro-block appends transactions to the current liquid block. It names
//! the liquid block version it extends (`reference`) and carries the
//! signature and ID of the resulting version (`total_block_signature`,
//! `total_block_id`), so a receiver can rebuild the extended block and check
//! it without further round trips. Micro-blocks are identified by their
//! `total_block_id`.

use crate::{Block, BlockId, Result, Transaction};
use rlp::{Encodable, RlpStream};
use serde::{Deserialize, Serialize};
use tidal_crypto::{KeyPair, PublicKey, Signature};

/// Micro-block format version written by this node.
pub const MICRO_BLOCK_VERSION: u8 = 5;

/// A signed extension of the liquid block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MicroBlock {
    /// Format version
    pub version: u8,
    /// Generator of the liquid block
    pub sender: PublicKey,
    /// Transactions appended by this micro-block
    pub transactions: Vec<Transaction>,
    /// ID of the liquid block version this micro-block extends
    pub reference: BlockId,
    /// ID of the liquid block after applying this micro-block
    pub total_block_id: BlockId,
    /// Signature of the liquid block after applying this micro-block
    pub total_block_signature: Signature,
    /// Sender's signature over the micro-block
    pub signature: Signature,
}

impl MicroBlock {
    /// Extend `liquid` with `transactions`.
    ///
    /// Returns the signed micro-block together with the new liquid block
    /// version it produces.
    pub fn build(
        keys: &KeyPair,
        liquid: &Block,
        transactions: Vec<Transaction>,
    ) -> Result<(Self, Block)> {
        let draft = liquid.extended(&transactions, Signature::default());
        let total_block_signature = keys.sign(&draft.header.signing_bytes())?;
        let total = Block::new(draft.header, draft.transactions, total_block_signature);

        let mut micro = Self {
            version: MICRO_BLOCK_VERSION,
            sender: keys.public_key(),
            transactions,
            reference: liquid.id(),
            total_block_id: total.id(),
            total_block_signature,
            signature: Signature::default(),
        };
        micro.signature = keys.sign(&micro.signing_bytes())?;
        Ok((micro, total))
    }

    /// Micro-block ID: the ID of the liquid block version it produces.
    #[inline]
    pub fn id(&self) -> BlockId {
        self.total_block_id
    }

    /// Bytes covered by [`MicroBlock::signature`].
    pub fn signing_bytes(&self) -> Vec<u8> {
        rlp::encode(self).to_vec()
    }

    /// Whether `signature` was made by `sender`.
    pub fn verify_signature(&self) -> bool {
        self.sender
            .verify(&self.signing_bytes(), &self.signature)
            .unwrap_or(false)
    }
}

impl Encodable for MicroBlock {
    fn rlp_append(&self, s: &mut RlpStream) {
        s.begin_list(6);
        s.append(&self.version);
        s.append(&self.sender.to_compressed().to_vec());
        s.append_list::<Transaction, Transaction>(&self.transactions);
        s.append(&self.reference);
        s.append(&self.total_block_id);
        s.append(&self.total_block_signature.as_bytes().to_vec());
    }
}

/// Signed announcement that a micro-block exists.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MicroBlockInv {
    /// Announcing generator
    pub public_key: PublicKey,
    /// ID of the announced micro-block
    pub total_block_id: BlockId,
    /// Liquid block version the micro-block extends
    pub reference: BlockId,
    /// Generator's signature over the announcement
    pub signature: Signature,
}

impl MicroBlockInv {
    /// Sign an announcement for `micro`.
    pub fn new(keys: &KeyPair, micro: &MicroBlock) -> Result<Self> {
        let mut inv = Self {
            public_key: keys.public_key(),
            total_block_id: micro.total_block_id,
            reference: micro.reference,
            signature: Signature::default(),
        };
        inv.signature = keys.sign(&inv.signing_bytes())?;
        Ok(inv)
    }

    fn signing_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(33 + 64);
        bytes.extend_from_slice(&self.public_key.to_compressed());
        bytes.extend_from_slice(self.total_block_id.as_bytes());
        bytes.extend_from_slice(self.reference.as_bytes());
        bytes
    }

    /// Whether the announcement is signed by `public_key`.
    pub fn verify(&self) -> bool {
        self.public_key
            .verify(&self.signing_bytes(), &self.signature)
            .unwrap_or(false)
    }
}
