//! # Tidal Configuration
//!
//! Configuration parsing for the Tidal node. Every setting lives in one
//! `tidal.toml` file; every section may be omitted and falls back to its
//! defaults.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use tidal_config::Config;
//! use std::path::Path;
//!
//! let config = Config::load(Path::new("tidal.toml"))?;
//! println!("sync timeout: {:?}", config.sync.timeout());
//! ```
//!
//! ## Configuration Sections
//!
//! - `[node]` - Light mode, extended API, orchestrator mailbox size
//! - `[sync]` - Block ID locator length, apply batch size, stall timeout
//! - `[ng]` - Micro-block, inv and request cache capacities
//! - `[mining]` - Generator keys and mining gates
//! - `[network]` - Peer discovery and suspension intervals
//! - `[logging]` - Log level and format

mod config;
mod error;

pub use config::*;
pub use error::*;
