//! # Tidal Sync
//!
//! Chain synchronization with a single peer that is ahead of us.
//!
//! ## Key Components
//!
//! - **[`OrderedBlocks`]**: reassembles block bodies that arrive in any order
//!   into the order their IDs were announced, yielding only gap-free prefixes.
//!
//! - **[`PeerScoreSelector`]**: groups connected peers by the chain score they
//!   announce and picks the peer to sync with, preferring to stay with the
//!   current peer.
//!
//! - **[`SyncInternal`]**: the block-ID protocol. It sends a locator of our
//!   most recent block IDs, requests the body of every new ID the peer
//!   answers with, and hands back batches ready for the ledger.
//!
//! ## Protocol Flow
//!
//! 1. **Locator**: we send `GetBlockIds` with our last block IDs, newest first.
//!
//! 2. **IDs**: the peer answers with IDs following the newest one it knows.
//!
//! 3. **Bodies**: every unknown ID is registered with the orderer and its body
//!    (and in light mode its snapshot) is requested.
//!
//! 4. **Apply**: contiguous prefixes are popped and applied. A short answer
//!    means the peer has nothing more; otherwise we send a fresh locator.
//!
//! ## Example
//!
//! ```rust
//! use tidal_sync::OrderedBlocks;
//! use tidal_types::BlockId;
//!
//! let mut orderer = OrderedBlocks::new(false);
//! assert!(orderer.add(BlockId::digest(b"b1")));
//! assert!(!orderer.add(BlockId::digest(b"b1")));
//! assert_eq!(orderer.available_count(), 0);
//! ```

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]
#![deny(unsafe_code)]

pub mod ordered;
pub mod selector;
pub mod sync;

pub use ordered::{Batch, OrderedBlocks};
pub use selector::PeerScoreSelector;
pub use sync::{SyncError, SyncInternal, SyncOutput};

/// Result type for sync operations
pub type Result<T> = std::result::Result<T, SyncError>;
