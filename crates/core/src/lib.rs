//! # Tidal Core - Collaborator Contracts
//!
//! The node core drives three external collaborators it does not implement:
//!
//! - **Ledger**: the durable chain and state engine ([`Ledger`])
//! - **Network**: connected peers and message delivery ([`PeerNetwork`])
//! - **Proof of stake**: leader-election arithmetic ([`PosCalculator`])
//!
//! plus a clock ([`TimeSource`]) so that timing-dependent code can be tested
//! with a manual clock.
//!
//! [`MemoryLedger`] is a small in-memory ledger implementing the contract. It
//! keeps the whole chain in memory and validates only chain linkage and
//! signatures, which is enough for tests and embedders that bring their own
//! state engine.
//!
//! # Thread Safety
//!
//! All traits require `Send + Sync + 'static`. The ledger is shared by the
//! orchestrator, the miner and any API layer and serializes access through its
//! own locks; callers hold no lock across calls.
//!
//! # Example
//!
//! ```
//! use tidal_core::{Ledger, MemoryLedger};
//! use tidal_crypto::KeyPair;
//! use tidal_types::Block;
//!
//! let keys = KeyPair::random();
//! let ledger = MemoryLedger::new(Block::genesis(&keys, 0).unwrap());
//! assert_eq!(ledger.height().unwrap(), 1);
//! ```

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![warn(clippy::all)]

pub mod memory;
pub mod traits;

pub use memory::MemoryLedger;
pub use traits::{
    // Ledger
    Ledger, LedgerError, LedgerResult,
    // Network
    PeerNetwork, ProtocolMessage, TransportError, TransportResult,
    // Proof of stake
    ParentInfo, PosCalculator, PosError, PosOutcome, PosResult,
    // Time
    ManualTimeSource, SystemTimeSource, TimeSource,
};
