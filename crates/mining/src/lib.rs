//! # Tidal Mining
//!
//! Decides when this node may forge the next key block.
//!
//! For every owned key pair the [`MiningScheduler`] derives the key's hit
//! from the tip's generation signature, looks up the key's effective balance
//! and asks a [`PosCalculator`](tidal_core::PosCalculator) how long after the
//! tip the key may forge. The earliest opportunity is delivered through an
//! [`EmitSlot`], a single-slot buffer where a newer emit replaces an older
//! one. The miner consumes the slot; the scheduler never talks to the
//! orchestrator directly.
//!
//! [`NxtPosCalculator`] is a reference calculator.

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]
#![deny(unsafe_code)]

mod emit;
mod nxt;
mod scheduler;

pub use emit::{Emit, EmitSlot};
pub use nxt::NxtPosCalculator;
pub use scheduler::MiningScheduler;

use thiserror::Error;
use tidal_config::ConfigError;
use tidal_core::LedgerError;

/// Mining errors
#[derive(Error, Debug)]
pub enum MiningError {
    /// Mining keys could not be loaded
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Ledger query failed
    #[error("ledger error: {0}")]
    Ledger(#[from] LedgerError),
}

/// Result type for mining operations
pub type Result<T> = std::result::Result<T, MiningError>;
