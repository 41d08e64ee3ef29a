//! Events consumed by the state machine.
//!
//! Network messages, miner output, timer ticks and task completions all
//! enter the node as an [`Event`] through one mailbox.

use tidal_core::LedgerError;
use tidal_types::{
    Block, BlockId, BlockSnapshot, MicroBlock, MicroBlockInv, PeerId, Score, Transaction,
};

/// Input to the state machine.
#[derive(Debug, Clone)]
pub enum Event {
    /// A peer announced its chain score.
    PeerScore {
        /// Announcing peer
        peer: PeerId,
        /// Announced score
        score: Score,
    },
    /// A peer disconnected.
    PeerDisconnected(PeerId),
    /// Answer to our block ID request.
    BlockIds {
        /// Answering peer
        peer: PeerId,
        /// IDs in chain order
        ids: Vec<BlockId>,
    },
    /// A block body, requested or broadcast.
    Block {
        /// Sending peer
        peer: PeerId,
        /// The block
        block: Block,
    },
    /// A block snapshot, in light mode.
    Snapshot {
        /// Sending peer
        peer: PeerId,
        /// The snapshot
        snapshot: BlockSnapshot,
    },
    /// A micro-block announcement.
    MicroBlockInv {
        /// Announcing peer
        peer: PeerId,
        /// The announcement
        inv: MicroBlockInv,
    },
    /// A peer asks for a micro-block body.
    MicroBlockRequest {
        /// Requesting peer
        peer: PeerId,
        /// Requested micro-block
        id: BlockId,
    },
    /// A micro-block body.
    MicroBlock {
        /// Sending peer
        peer: PeerId,
        /// The micro-block
        micro: MicroBlock,
    },
    /// A transaction relayed by a peer.
    Transaction {
        /// Sending peer
        peer: PeerId,
        /// The transaction
        tx: Transaction,
    },
    /// A key block forged by this node.
    MinedBlock(Block),
    /// A micro-block assembled by this node, with its signed announcement.
    MinedMicroBlock {
        /// The micro-block
        micro: MicroBlock,
        /// Its announcement
        inv: MicroBlockInv,
    },
    /// Start producing blocks.
    StartMining,
    /// Stop producing blocks.
    StopMining,
    /// Internal housekeeping.
    Task(Task),
    /// Shut down.
    Halt,
}

impl Event {
    /// Short event name for logs.
    pub fn name(&self) -> &'static str {
        match self {
            Event::PeerScore { .. } => "peer-score",
            Event::PeerDisconnected(_) => "peer-disconnected",
            Event::BlockIds { .. } => "block-ids",
            Event::Block { .. } => "block",
            Event::Snapshot { .. } => "snapshot",
            Event::MicroBlockInv { .. } => "micro-block-inv",
            Event::MicroBlockRequest { .. } => "micro-block-request",
            Event::MicroBlock { .. } => "micro-block",
            Event::Transaction { .. } => "transaction",
            Event::MinedBlock(_) => "mined-block",
            Event::MinedMicroBlock { .. } => "mined-micro-block",
            Event::StartMining => "start-mining",
            Event::StopMining => "stop-mining",
            Event::Task(Task::Ping) => "ping",
            Event::Task(Task::AskPeers) => "ask-peers",
            Event::Task(Task::PersistComplete(_)) => "persist-complete",
            Event::Halt => "halt",
        }
    }
}

/// Periodic and background task events.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Task {
    /// Liveness tick used to detect sync stalls.
    Ping,
    /// Time to ask peers for more peers.
    AskPeers,
    /// Address-transaction persistence finished.
    PersistComplete(Result<(), LedgerError>),
}

/// Work the state machine hands to the runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Flush address-indexed transactions off the event loop and report
    /// back with [`Task::PersistComplete`].
    Persist,
}
