//! Peer network contract.
//!
//! The transport (handshake, framing, connection lifecycle and message
//! encoding) lives behind [`PeerNetwork`]. The node core only names peers,
//! updates their scores, suspends misbehaving ones and hands messages over for
//! delivery. Sends never block: an implementation drops a message rather than
//! wait on a slow peer.

use std::time::Duration;
use thiserror::Error;
use tidal_types::{Block, BlockId, MicroBlock, MicroBlockInv, PeerId, Score, Transaction};
use tracing::debug;

/// Errors that can occur during network operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    /// The peer is not connected.
    #[error("peer not connected: {0}")]
    PeerNotConnected(PeerId),

    /// The peer's outbound queue is full; the message was dropped.
    #[error("send queue full for peer {0}")]
    QueueFull(PeerId),

    /// The network has been shut down.
    #[error("network not running")]
    NotRunning,

    /// Generic network error.
    #[error("network error: {0}")]
    Internal(String),
}

/// Result type for transport operations.
pub type TransportResult<T> = Result<T, TransportError>;

/// Outbound protocol messages.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProtocolMessage {
    /// Our cumulative chain score.
    Score(Score),
    /// A block announcement, protobuf-encoded once block version 5 is active.
    Block {
        /// The announced block
        block: Block,
        /// Whether to use the protobuf encoding
        protobuf: bool,
    },
    /// Ask for the block IDs following the first ID the peer knows from
    /// this locator (newest first).
    GetBlockIds(Vec<BlockId>),
    /// A list of block IDs.
    BlockIds(Vec<BlockId>),
    /// Ask for a block body.
    GetBlock(BlockId),
    /// Ask for the state snapshot of a block.
    GetSnapshot(BlockId),
    /// Announce a micro-block.
    MicroBlockInv(MicroBlockInv),
    /// Ask for a micro-block body.
    MicroBlockRequest(BlockId),
    /// A micro-block body.
    MicroBlock(MicroBlock),
    /// A transaction.
    Transaction(Transaction),
}

impl ProtocolMessage {
    /// Short message name for logs.
    pub fn name(&self) -> &'static str {
        match self {
            ProtocolMessage::Score(_) => "score",
            ProtocolMessage::Block { protobuf: false, .. } => "block",
            ProtocolMessage::Block { protobuf: true, .. } => "pb-block",
            ProtocolMessage::GetBlockIds(_) => "get-block-ids",
            ProtocolMessage::BlockIds(_) => "block-ids",
            ProtocolMessage::GetBlock(_) => "get-block",
            ProtocolMessage::GetSnapshot(_) => "get-snapshot",
            ProtocolMessage::MicroBlockInv(_) => "micro-block-inv",
            ProtocolMessage::MicroBlockRequest(_) => "micro-block-request",
            ProtocolMessage::MicroBlock(_) => "micro-block",
            ProtocolMessage::Transaction(_) => "transaction",
        }
    }
}

/// The set of connected peers.
///
/// # Example
///
/// ```ignore
/// use tidal_core::{PeerNetwork, ProtocolMessage};
///
/// fn announce(network: &impl PeerNetwork, score: Score) {
///     network.broadcast(ProtocolMessage::Score(score), None);
/// }
/// ```
pub trait PeerNetwork: Send + Sync + 'static {
    /// Currently connected peers.
    fn connected(&self) -> Vec<PeerId>;

    /// Whether a specific peer is connected.
    fn is_connected(&self, peer: &PeerId) -> bool {
        self.connected().iter().any(|p| p == peer)
    }

    /// Number of connected peers.
    fn peer_count(&self) -> usize {
        self.connected().len()
    }

    /// Record the score a peer announced.
    fn update_score(&self, peer: &PeerId, score: &Score);

    /// Exclude a peer from selection for `duration`.
    fn suspend(&self, peer: &PeerId, duration: Duration, reason: &str);

    /// Ask connected peers for more peers.
    fn ask_peers(&self);

    /// Queue a message for one peer.
    fn send(&self, peer: &PeerId, message: ProtocolMessage) -> TransportResult<()>;

    /// Queue a message for every connected peer except `except`.
    ///
    /// Delivery failures to individual peers are logged and skipped.
    fn broadcast(&self, message: ProtocolMessage, except: Option<&PeerId>) {
        for peer in self.connected() {
            if Some(&peer) == except {
                continue;
            }
            if let Err(e) = self.send(&peer, message.clone()) {
                debug!(peer = %peer, message = message.name(), error = %e, "Broadcast send dropped");
            }
        }
    }

    /// Disconnect all peers and stop the network.
    fn close(&self) -> TransportResult<()>;
}
