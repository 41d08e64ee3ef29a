//! Contracts of the node core's external collaborators.
//!
//! - **Ledger**: chain storage, block application, balances
//! - **Network**: peer registry and outbound protocol messages
//! - **Pos**: pluggable leader-election arithmetic
//! - **Time**: wall clock

mod ledger;
mod network;
mod pos;
mod time;

pub use ledger::*;
pub use network::*;
pub use pos::*;
pub use time::*;
