//! # Tidal Crypto
//!
//! Cryptographic primitives for the Tidal node.
//!
//! This crate provides:
//! - **Keccak256 hashing** - block, transaction and micro-block identifiers
//! - **secp256k1 signatures** - block and micro-block signing by generators
//! - **Generation signatures** - the chained per-block value that feeds the
//!   proof-of-stake hit
//!
//! ## Example
//!
//! ```rust
//! use tidal_crypto::{keccak256, KeyPair, generation};
//!
//! let keys = KeyPair::random();
//! let signature = keys.sign(b"block bytes").unwrap();
//! assert!(keys.public_key().verify(b"block bytes", &signature).unwrap());
//!
//! let parent_gen_sig = keccak256(b"genesis");
//! let gen_sig = generation::generation_signature(&parent_gen_sig, &keys.public_key());
//! let _hit = generation::hit(&gen_sig);
//! ```

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]
#![deny(unsafe_code)]

pub mod ecdsa;
pub mod generation;
pub mod hash;

pub use ecdsa::{Address, KeyPair, PrivateKey, PublicKey, Signature};
pub use generation::{generation_signature, hit, Hit};
pub use hash::{keccak256, keccak256_concat, Hasher};

/// Common type alias for 32-byte hash
pub type Hash = [u8; 32];

/// Error types for cryptographic operations
#[derive(Debug, thiserror::Error)]
pub enum CryptoError {
    /// Invalid private key bytes
    #[error("invalid private key: {0}")]
    InvalidPrivateKey(String),

    /// Invalid public key bytes
    #[error("invalid public key: {0}")]
    InvalidPublicKey(String),

    /// Invalid signature bytes
    #[error("invalid signature: {0}")]
    InvalidSignature(String),

    /// Invalid input length
    #[error("invalid input length: expected {expected}, got {actual}")]
    InvalidLength {
        /// Expected length
        expected: usize,
        /// Actual length
        actual: usize,
    },

    /// Hex decoding error
    #[error("hex decoding error: {0}")]
    HexError(String),
}

impl From<hex::FromHexError> for CryptoError {
    fn from(e: hex::FromHexError) -> Self {
        CryptoError::HexError(e.to_string())
    }
}

/// Result type for cryptographic operations
pub type Result<T> = std::result::Result<T, CryptoError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keccak256_basic() {
        let hash = keccak256(b"hello");
        assert_eq!(
            hex::encode(hash),
            "1c8aff950685c2ed4bc3174f3472287b56d9517b9c948127319a09a7a36deac8"
        );
    }

    #[test]
    fn test_sign_verify_roundtrip() {
        let keys = KeyPair::random();
        let signature = keys.sign(b"payload").unwrap();
        assert!(keys.public_key().verify(b"payload", &signature).unwrap());
        assert!(!keys.public_key().verify(b"other", &signature).unwrap());
    }

    #[test]
    fn test_hex_error_conversion() {
        let err: CryptoError = hex::decode("zz").unwrap_err().into();
        assert!(matches!(err, CryptoError::HexError(_)));
    }
}
