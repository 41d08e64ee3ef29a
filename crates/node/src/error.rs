//! Node errors and their classification.

use thiserror::Error;
use tidal_core::{LedgerError, TransportError};
use tidal_mining::MiningError;
use tidal_ng::NgError;
use tidal_sync::SyncError;
use tidal_types::{BlockId, PeerId, Score};

/// How an error affects the node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Logged; the state machine carries on.
    Informational,
    /// Data was rejected under consensus rules; the supplying peer is
    /// suspended.
    Validation,
    /// Unexpected or malformed protocol data, or a local failure.
    Protocol,
    /// Stall or shutdown failure.
    Fatal,
}

/// Errors surfaced by event handlers.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum NodeError {
    /// Block or micro-block is already known
    #[error("already known: {0}")]
    AlreadyKnown(BlockId),

    /// Micro-block announcement with a bad signature
    #[error("invalid micro-block inv {0}")]
    InvalidInv(BlockId),

    /// A batch does not outweigh the chain it would replace
    #[error("fork at {parent} with score {fork} does not beat local score {local}")]
    NotHeavier {
        /// Common ancestor
        parent: BlockId,
        /// Score of the chain after applying the fork
        fork: Score,
        /// Local score
        local: Score,
    },

    /// A block's parent is not on the local chain
    #[error("parent {parent} of block {id} not found")]
    ParentNotFound {
        /// Block being applied
        id: BlockId,
        /// Its missing parent
        parent: BlockId,
    },

    /// The sync peer went quiet
    #[error("sync with {peer} stalled for {elapsed_ms}ms")]
    Timeout {
        /// Sync peer
        peer: PeerId,
        /// Time since the peer's last message
        elapsed_ms: u64,
    },

    /// The ledger failed to close during shutdown
    #[error("failed to close ledger: {0}")]
    CloseFailed(LedgerError),

    /// A block could not be forged
    #[error("forging failed: {0}")]
    Forge(String),

    /// Ledger error
    #[error(transparent)]
    Ledger(#[from] LedgerError),

    /// Transport error
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// Sync protocol error
    #[error(transparent)]
    Sync(#[from] SyncError),

    /// Micro-block error
    #[error(transparent)]
    Ng(#[from] NgError),

    /// Mining scheduler error
    #[error("mining: {0}")]
    Mining(String),
}

impl From<MiningError> for NodeError {
    fn from(e: MiningError) -> Self {
        match e {
            MiningError::Ledger(e) => NodeError::Ledger(e),
            other => NodeError::Mining(other.to_string()),
        }
    }
}

impl NodeError {
    /// Classify the error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            NodeError::AlreadyKnown(_) => ErrorKind::Informational,
            NodeError::InvalidInv(_) => ErrorKind::Protocol,
            NodeError::NotHeavier { .. } => ErrorKind::Validation,
            NodeError::ParentNotFound { .. } => ErrorKind::Protocol,
            NodeError::Timeout { .. } => ErrorKind::Fatal,
            NodeError::CloseFailed(_) => ErrorKind::Fatal,
            NodeError::Forge(_) => ErrorKind::Protocol,
            NodeError::Ledger(e) => ledger_kind(e),
            NodeError::Transport(TransportError::PeerNotConnected(_)) => ErrorKind::Informational,
            NodeError::Transport(_) => ErrorKind::Protocol,
            NodeError::Sync(SyncError::Ledger(e)) => ledger_kind(e),
            NodeError::Sync(SyncError::Transport(TransportError::PeerNotConnected(_))) => {
                ErrorKind::Informational
            }
            NodeError::Sync(_) => ErrorKind::Protocol,
            NodeError::Ng(e) if e.is_stale() => ErrorKind::Informational,
            NodeError::Ng(_) => ErrorKind::Protocol,
            NodeError::Mining(_) => ErrorKind::Protocol,
        }
    }

    /// Whether the supplying peer should be suspended.
    pub fn is_validation(&self) -> bool {
        self.kind() == ErrorKind::Validation
    }
}

fn ledger_kind(e: &LedgerError) -> ErrorKind {
    if e.is_validation() {
        ErrorKind::Validation
    } else {
        ErrorKind::Protocol
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classification() {
        let id = BlockId::digest(b"x");
        assert_eq!(NodeError::AlreadyKnown(id).kind(), ErrorKind::Informational);
        assert_eq!(
            NodeError::Ledger(LedgerError::Validation("bad".into())).kind(),
            ErrorKind::Validation
        );
        assert_eq!(
            NodeError::Ledger(LedgerError::Storage("disk".into())).kind(),
            ErrorKind::Protocol
        );
        assert_eq!(
            NodeError::Sync(SyncError::UnexpectedBlock(id)).kind(),
            ErrorKind::Protocol
        );
        assert_eq!(
            NodeError::Transport(TransportError::PeerNotConnected(PeerId::from("p"))).kind(),
            ErrorKind::Informational
        );
        assert_eq!(
            NodeError::Ng(NgError::ReferenceMismatch {
                reference: id,
                top: BlockId::ZERO
            })
            .kind(),
            ErrorKind::Informational
        );
        assert_eq!(
            NodeError::CloseFailed(LedgerError::Closed).kind(),
            ErrorKind::Fatal
        );
    }
}
