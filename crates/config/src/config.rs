//! Main configuration module for Tidal
//!
//! All node settings are defined in one `tidal.toml` file. Sections are
//! optional; missing sections and fields take the defaults documented on each
//! struct.

use crate::error::{ConfigError, ConfigResult};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tidal_crypto::KeyPair;
use tracing::{debug, info};

/// Main configuration struct containing all Tidal settings.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(default)]
pub struct Config {
    /// Node-wide behaviour
    pub node: NodeConfig,

    /// Chain synchronization
    pub sync: SyncConfig,

    /// NG micro-block caches
    pub ng: NgConfig,

    /// Block production
    pub mining: MiningConfig,

    /// Peer housekeeping
    pub network: NetworkConfig,

    /// Logging configuration
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from a TOML file.
    ///
    /// # Example
    ///
    /// ```rust,ignore
    /// use tidal_config::Config;
    /// use std::path::Path;
    ///
    /// let config = Config::load(Path::new("tidal.toml"))?;
    /// ```
    pub fn load(path: &Path) -> ConfigResult<Self> {
        info!("Loading configuration from {:?}", path);

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::FileAccess {
            path: path.to_path_buf(),
            source: e,
        })?;

        let config = Self::from_str(&content)?;

        info!(
            "Configuration loaded: light_mode={}, mining={}, keys={}",
            config.node.light_mode,
            config.mining.enabled,
            config.mining.keys.len()
        );

        Ok(config)
    }

    /// Load configuration from a TOML string.
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(content: &str) -> ConfigResult<Self> {
        let config: Config = toml::from_str(content)?;
        debug!("Configuration parsed successfully, validating...");
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> ConfigResult<()> {
        self.node.validate()?;
        self.sync.validate()?;
        self.ng.validate()?;
        self.mining.validate()?;
        self.network.validate()?;
        self.logging.validate()?;

        debug!("Configuration validation passed");
        Ok(())
    }

    /// Save configuration to a TOML file.
    pub fn save(&self, path: &Path) -> ConfigResult<()> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content).map_err(|e| ConfigError::FileAccess {
            path: path.to_path_buf(),
            source: e,
        })?;
        Ok(())
    }
}

fn non_zero(name: &'static str, value: usize) -> ConfigResult<()> {
    if value == 0 {
        return Err(ConfigError::ZeroValue { name });
    }
    Ok(())
}

fn positive_ms(name: &'static str, value: u64) -> ConfigResult<()> {
    if value == 0 {
        return Err(ConfigError::InvalidTimeout { name, value });
    }
    Ok(())
}

// =============================================================================
// Node Configuration
// =============================================================================

/// Node-wide behaviour.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct NodeConfig {
    /// Request a state snapshot with every block instead of executing it
    pub light_mode: bool,

    /// Hand the extended API over to the ledger once the first sync finishes
    pub extended_api: bool,

    /// Capacity of the orchestrator's event mailbox
    pub mailbox_capacity: usize,
}

impl NodeConfig {
    pub fn validate(&self) -> ConfigResult<()> {
        non_zero("node.mailbox_capacity", self.mailbox_capacity)
    }
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            light_mode: false,
            extended_api: false,
            mailbox_capacity: 1024,
        }
    }
}

// =============================================================================
// Sync Configuration
// =============================================================================

/// Chain synchronization parameters.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct SyncConfig {
    /// Locator length and the request size below which a peer is considered
    /// to have no more blocks
    pub max_block_ids: usize,

    /// Smallest contiguous prefix applied before every requested body arrived
    pub apply_batch_size: usize,

    /// Time without progress after which synchronization is abandoned (ms)
    pub timeout_ms: u64,

    /// Liveness tick interval (ms)
    pub ping_interval_ms: u64,
}

impl SyncConfig {
    pub fn validate(&self) -> ConfigResult<()> {
        non_zero("sync.max_block_ids", self.max_block_ids)?;
        non_zero("sync.apply_batch_size", self.apply_batch_size)?;
        if self.apply_batch_size > self.max_block_ids {
            return Err(ConfigError::BatchExceedsRequest {
                batch: self.apply_batch_size,
                max: self.max_block_ids,
            });
        }
        positive_ms("sync.timeout_ms", self.timeout_ms)?;
        positive_ms("sync.ping_interval_ms", self.ping_interval_ms)?;
        Ok(())
    }

    /// Stall deadline.
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Liveness tick interval.
    pub fn ping_interval(&self) -> Duration {
        Duration::from_millis(self.ping_interval_ms)
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            max_block_ids: 100,
            apply_batch_size: 32,
            timeout_ms: 30_000,
            ping_interval_ms: 1_000,
        }
    }
}

// =============================================================================
// NG Configuration
// =============================================================================

/// Capacities of the NG caches. All caches evict oldest-first.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct NgConfig {
    /// Micro-block bodies kept to answer peer requests
    pub micro_block_cache_capacity: usize,

    /// Micro-block announcements kept
    pub inv_cache_capacity: usize,

    /// Micro-block IDs already requested from a peer
    pub request_cache_capacity: usize,

    /// Versions of the current liquid block kept for rollback
    pub block_versions_capacity: usize,
}

impl NgConfig {
    pub fn validate(&self) -> ConfigResult<()> {
        non_zero("ng.micro_block_cache_capacity", self.micro_block_cache_capacity)?;
        non_zero("ng.inv_cache_capacity", self.inv_cache_capacity)?;
        non_zero("ng.request_cache_capacity", self.request_cache_capacity)?;
        non_zero("ng.block_versions_capacity", self.block_versions_capacity)?;
        Ok(())
    }
}

impl Default for NgConfig {
    fn default() -> Self {
        Self {
            micro_block_cache_capacity: 24,
            inv_cache_capacity: 24,
            request_cache_capacity: 24,
            block_versions_capacity: 16,
        }
    }
}

// =============================================================================
// Mining Configuration
// =============================================================================

/// Block production settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct MiningConfig {
    /// Whether this node produces blocks
    pub enabled: bool,

    /// Hex-encoded secp256k1 secret keys of the generators this node runs
    pub keys: Vec<String>,

    /// Number of trailing blocks over which effective balance is taken
    pub balance_window: u64,

    /// Effective balance below which a key does not generate
    pub min_generating_balance: u64,

    /// Tip age after which mining pauses until the node catches up (ms)
    pub obsolescence_ms: u64,

    /// Fewer connected peers than this pauses mining
    pub min_connected_peers: usize,
}

impl MiningConfig {
    pub fn validate(&self) -> ConfigResult<()> {
        if self.balance_window == 0 {
            return Err(ConfigError::ZeroValue {
                name: "mining.balance_window",
            });
        }
        positive_ms("mining.obsolescence_ms", self.obsolescence_ms)?;
        self.key_pairs()?;
        Ok(())
    }

    /// Parse the configured generator keys.
    pub fn key_pairs(&self) -> ConfigResult<Vec<KeyPair>> {
        self.keys
            .iter()
            .enumerate()
            .map(|(index, key)| {
                KeyPair::from_hex(key).map_err(|e| ConfigError::InvalidMiningKey {
                    index,
                    reason: e.to_string(),
                })
            })
            .collect()
    }

    /// Maximum tip age before mining pauses.
    pub fn obsolescence(&self) -> Duration {
        Duration::from_millis(self.obsolescence_ms)
    }
}

impl Default for MiningConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            keys: Vec::new(),
            balance_window: 1000,
            min_generating_balance: 100_000_000_000,
            obsolescence_ms: 4 * 60 * 60 * 1000,
            min_connected_peers: 1,
        }
    }
}

// =============================================================================
// Network Configuration
// =============================================================================

/// Peer housekeeping intervals.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct NetworkConfig {
    /// How often to ask peers for more peers (ms)
    pub ask_peers_interval_ms: u64,

    /// How long a peer that sent invalid blocks stays suspended (ms)
    pub suspend_duration_ms: u64,
}

impl NetworkConfig {
    pub fn validate(&self) -> ConfigResult<()> {
        positive_ms("network.ask_peers_interval_ms", self.ask_peers_interval_ms)?;
        positive_ms("network.suspend_duration_ms", self.suspend_duration_ms)?;
        Ok(())
    }

    /// Peer discovery interval.
    pub fn ask_peers_interval(&self) -> Duration {
        Duration::from_millis(self.ask_peers_interval_ms)
    }

    /// Suspension length for misbehaving peers.
    pub fn suspend_duration(&self) -> Duration {
        Duration::from_millis(self.suspend_duration_ms)
    }
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            ask_peers_interval_ms: 300_000,
            suspend_duration_ms: 300_000,
        }
    }
}

// =============================================================================
// Logging Configuration
// =============================================================================

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,

    /// Log format (text, compact, json)
    pub format: String,
}

impl LoggingConfig {
    pub fn validate(&self) -> ConfigResult<()> {
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.level.to_lowercase().as_str()) {
            return Err(ConfigError::InvalidLogLevel(self.level.clone()));
        }

        let valid_formats = ["text", "compact", "json"];
        if !valid_formats.contains(&self.format.to_lowercase().as_str()) {
            return Err(ConfigError::InvalidLogFormat(self.format.clone()));
        }

        Ok(())
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "text".to_string(),
        }
    }
}
