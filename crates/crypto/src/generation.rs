//! Generation signatures and hits.
//!
//! Each block carries a generation signature derived from its parent's
//! generation signature and the generator's public key. The first eight bytes
//! of that value form the generator's *hit*, which proof-of-stake arithmetic
//! compares against the target to decide when the generator may forge.

use crate::{keccak256_concat, PublicKey};

/// Proof-of-stake hit value.
pub type Hit = u64;

/// Generation signature of a child block forged by `generator` on top of a
/// parent with generation signature `parent`.
pub fn generation_signature(parent: &[u8; 32], generator: &PublicKey) -> [u8; 32] {
    keccak256_concat(&[parent, &generator.to_compressed()])
}

/// Hit of a generation signature: its first eight bytes, little-endian.
pub fn hit(generation_signature: &[u8; 32]) -> Hit {
    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&generation_signature[..8]);
    u64::from_le_bytes(bytes)
}
