//! # Tidal Node
//!
//! The chain synchronization and block production engine of a Tidal full
//! node.
//!
//! The node decides at any moment whether it is catching up with the
//! network, extending the chain with key blocks and micro-blocks, flushing
//! accumulated state, or shutting down. Storage, transport and proof-of-stake
//! arithmetic are supplied by the embedder through the contracts in
//! `tidal-core`.
//!
//! ## Components
//!
//! - [`StateMachine`] - the Idle / Sync / NG / Persist / Halt orchestrator
//! - [`BlocksApplier`] - batch application with rollback to a fork point
//! - [`Node`] - mailbox, tickers, persistence and the reference [`Miner`]
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use tidal_config::Config;
//! use tidal_core::{Ledger, PeerNetwork};
//! use tidal_mining::NxtPosCalculator;
//! use tidal_node::{init_logging, Node};
//!
//! async fn start(ledger: Arc<dyn Ledger>, network: Arc<dyn PeerNetwork>) -> anyhow::Result<()> {
//!     let config = Config::default();
//!     init_logging(&config.logging)?;
//!
//!     let node = Node::new(config, ledger, network, Arc::new(NxtPosCalculator))?;
//!     let handle = node.handle();
//!     let running = tokio::spawn(node.run());
//!
//!     // Feed network messages through `handle` ...
//!     handle.halt().await;
//!     running.await??;
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]
#![deny(unsafe_code)]

pub mod applier;
pub mod error;
pub mod event;
pub mod fsm;
pub mod logging;
pub mod miner;
pub mod node;

pub use applier::{ApplyOutcome, BlocksApplier};
pub use error::{ErrorKind, NodeError};
pub use event::{Command, Event, Task};
pub use fsm::{State, StateKind, StateMachine};
pub use logging::init_logging;
pub use miner::Miner;
pub use node::{Node, NodeHandle};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Commonly used types
pub mod prelude {
    //! Commonly used types for convenience
    pub use super::{Event, Node, NodeError, NodeHandle, StateKind, StateMachine};
    pub use tidal_config::Config;
    pub use tidal_types::{Block, BlockId, MicroBlock, PeerId, Score};
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }
}
