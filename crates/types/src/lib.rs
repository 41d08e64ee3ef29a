//! # Tidal Types
//!
//! Core type definitions shared by every Tidal crate.
//!
//! - [`BlockId`] - 32-byte block identifier
//! - [`Score`] - arbitrary-precision cumulative chain weight
//! - [`Block`] and [`BlockHeader`] - signed key blocks
//! - [`MicroBlock`] and [`MicroBlockInv`] - NG chain extensions and their announcements
//! - [`Transaction`] - opaque transaction payload
//! - [`BlockSnapshot`] - state snapshot accompanying a block in light mode
//! - [`PeerId`] and [`Feature`]
//!
//! ## Example
//!
//! ```rust
//! use tidal_types::{Block, BlockHeader, Score};
//! use tidal_crypto::KeyPair;
//!
//! let keys = KeyPair::random();
//! let genesis = Block::genesis(&keys, 0).unwrap();
//! assert!(genesis.verify_signature());
//! assert!(genesis.score() > Score::zero());
//! ```

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]
#![deny(unsafe_code)]

pub mod block;
pub mod id;
pub mod micro;
pub mod peer;
pub mod score;
pub mod transaction;

pub use block::{transactions_root, Block, BlockHeader, BlockSnapshot};
pub use id::BlockId;
pub use micro::{MicroBlock, MicroBlockInv};
pub use peer::{Feature, PeerId};
pub use score::Score;
pub use tidal_crypto::Address;
pub use transaction::Transaction;

/// Result type alias for type-level operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur when building or checking Tidal types
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Invalid hex string
    #[error("invalid hex: {0}")]
    InvalidHex(#[from] hex::FromHexError),

    /// Invalid length for a fixed-size type
    #[error("invalid length: expected {expected}, got {actual}")]
    InvalidLength {
        /// Expected length
        expected: usize,
        /// Actual length
        actual: usize,
    },

    /// A signature does not match its payload
    #[error("invalid signature: {0}")]
    InvalidSignature(String),

    /// Micro-block does not reference the block it is applied to
    #[error("micro-block references {reference}, top block is {top}")]
    ReferenceMismatch {
        /// Reference carried by the micro-block
        reference: BlockId,
        /// Current top block
        top: BlockId,
    },

    /// Cryptographic error
    #[error("crypto error: {0}")]
    Crypto(#[from] tidal_crypto::CryptoError),
}
