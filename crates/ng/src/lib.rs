//! # Tidal NG
//!
//! Support for the NG protocol, where a key block is followed by a stream of
//! micro-blocks that append transactions to it until the next key block.
//! The key block plus every micro-block applied so far is the *liquid block*;
//! each micro-block produces a new version of it with a new ID.
//!
//! ## Key Components
//!
//! - **[`FifoCache`]**: fixed-capacity map evicting the oldest insertion.
//! - **[`MicroblockPipeline`]**: micro-block bodies, announcements and the
//!   request deduplication that keeps at most one outstanding request per
//!   micro-block.
//! - **[`BlockVersions`]**: the versions of the current liquid block.
//! - **[`extend_block`]**: rebuilds and checks the liquid block version a
//!   micro-block produces.

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]
#![deny(unsafe_code)]

pub mod cache;
pub mod extend;
pub mod pipeline;
pub mod versions;

pub use cache::FifoCache;
pub use extend::extend_block;
pub use pipeline::MicroblockPipeline;
pub use versions::BlockVersions;

use tidal_types::BlockId;

/// Errors raised while handling micro-blocks
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum NgError {
    /// The micro-block extends a block other than the top block
    #[error("micro-block references {reference}, top block is {top}")]
    ReferenceMismatch {
        /// Reference carried by the micro-block
        reference: BlockId,
        /// Current top block
        top: BlockId,
    },

    /// The micro-block was not produced by the liquid block's generator
    #[error("micro-block sender is not the generator of {0}")]
    SenderMismatch(BlockId),

    /// A signature does not verify
    #[error("invalid signature on {0}")]
    InvalidSignature(String),

    /// The rebuilt block does not have the announced ID
    #[error("rebuilt block {actual} does not match announced {expected}")]
    IdMismatch {
        /// ID announced by the micro-block
        expected: BlockId,
        /// ID of the rebuilt block
        actual: BlockId,
    },
}

impl NgError {
    /// Whether the error only means the micro-block arrived for a tip we no
    /// longer have, as opposed to malformed data.
    pub fn is_stale(&self) -> bool {
        matches!(self, NgError::ReferenceMismatch { .. })
    }
}

/// Result type for NG operations
pub type Result<T> = std::result::Result<T, NgError>;
