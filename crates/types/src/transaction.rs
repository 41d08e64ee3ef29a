//! Opaque transactions.
//!
//! Transaction validation lives in the ledger; the node core only moves
//! transactions between peers, blocks and the ledger's pool, so a transaction
//! here is its encoded bytes plus a content identifier.

use bytes::Bytes;
use rlp::{Encodable, RlpStream};
use serde::{Deserialize, Serialize};
use std::fmt;

/// An encoded transaction.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    data: Bytes,
}

impl Transaction {
    /// Wrap encoded transaction bytes.
    pub fn new(data: impl Into<Bytes>) -> Self {
        Self { data: data.into() }
    }

    /// Keccak256 of the encoded bytes.
    pub fn id(&self) -> [u8; 32] {
        tidal_crypto::keccak256(&self.data)
    }

    /// Encoded bytes.
    pub fn data(&self) -> &Bytes {
        &self.data
    }
}

impl fmt::Debug for Transaction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Transaction")
            .field("id", &hex::encode(&self.id()[..8]))
            .field("len", &self.data.len())
            .finish()
    }
}

impl Encodable for Transaction {
    fn rlp_append(&self, s: &mut RlpStream) {
        s.encoder().encode_value(&self.data);
    }
}
