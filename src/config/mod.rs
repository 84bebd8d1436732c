//! # Configuration Management Module
//!
//! TOML configuration for a relaybbs node. The file is organized into sections:
//!
//! - [`BbsConfig`] - node identity, replication peers, urgent board name
//! - [`StorageConfig`] - data directory and outbound frame budget
//! - [`LoggingConfig`] - log level and optional log file
//! - [`GamesConfig`] - card game toggle and record store location
//! - [`SchedulerConfigToml`] - outbound pacing knobs
//! - [`NodeSeed`] - optional static entries for the node directory
//!
//! ## Usage
//!
//! ```rust,no_run
//! use relaybbs::config::Config;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::load("config.toml").await?;
//!     println!("BBS Name: {}", config.bbs.name);
//!     println!("Peers: {:?}", config.peer_ids());
//!     Ok(())
//! }
//! ```
//!
//! ## Node identities
//!
//! Identities are written either as Meshtastic-style `!` + 8 hex digits
//! (`"!a1b2c3d4"`) or as a plain decimal `u32`. See [`parse_node_id`].

use anyhow::{anyhow, Result};
use log::warn;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tokio::fs;

use crate::bbs::scheduler::SchedulerConfig;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BbsConfig {
    pub name: String,
    /// This node's own identity. Interactive traffic must be addressed here.
    #[serde(default)]
    pub node_id: String,
    /// Recognized BBS-node identities; sync records are accepted from and sent to these.
    #[serde(default)]
    pub peers: Vec<String>,
    /// Board whose new bulletins trigger a public broadcast notification.
    #[serde(default = "default_urgent_board")]
    pub urgent_board: String,
}

fn default_urgent_board() -> String {
    "Urgent".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    pub data_dir: String,
    /// Outbound frame budget in bytes; longer replies are chunked.
    pub max_message_size: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
    pub file: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GamesConfig {
    #[serde(default = "default_true")]
    pub blackjack_enabled: bool,
    /// Optional override for the sled path; defaults to `<data_dir>/blackjack`.
    #[serde(default)]
    pub blackjack_db_path: Option<String>,
}

fn default_true() -> bool {
    true
}

impl Default for GamesConfig {
    fn default() -> Self {
        Self {
            blackjack_enabled: true,
            blackjack_db_path: None,
        }
    }
}

/// Scheduler knobs as they appear in TOML. Converted with [`SchedulerConfigToml::to_runtime`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfigToml {
    #[serde(default = "default_min_gap")]
    pub min_send_gap_ms: u64,
    #[serde(default = "default_max_queue")]
    pub max_queue: usize,
    #[serde(default = "default_aging")]
    pub aging_threshold_ms: u64,
    #[serde(default = "default_stats_interval")]
    pub stats_interval_ms: u64,
}

fn default_min_gap() -> u64 {
    2000
}
fn default_max_queue() -> usize {
    256
}
fn default_aging() -> u64 {
    5000
}
fn default_stats_interval() -> u64 {
    10000
}

impl Default for SchedulerConfigToml {
    fn default() -> Self {
        Self {
            min_send_gap_ms: default_min_gap(),
            max_queue: default_max_queue(),
            aging_threshold_ms: default_aging(),
            stats_interval_ms: default_stats_interval(),
        }
    }
}

impl SchedulerConfigToml {
    pub fn to_runtime(&self) -> SchedulerConfig {
        SchedulerConfig {
            min_send_gap_ms: self.min_send_gap_ms,
            max_queue: self.max_queue.max(1),
            aging_threshold_ms: self.aging_threshold_ms,
            stats_interval_ms: self.stats_interval_ms,
        }
    }
}

/// Static node directory entry. Live deployments learn nodes from the radio.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeSeed {
    pub id: String,
    pub short_name: String,
    #[serde(default)]
    pub long_name: String,
    #[serde(default)]
    pub hw_model: Option<String>,
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub battery_level: Option<u8>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub bbs: BbsConfig,
    pub storage: StorageConfig,
    pub logging: LoggingConfig,
    #[serde(default)]
    pub games: GamesConfig,
    #[serde(default)]
    pub scheduler: SchedulerConfigToml,
    #[serde(default)]
    pub nodes: Vec<NodeSeed>,
}

/// Parse a node identity: `!` followed by hex digits, `0x` hex, or decimal.
pub fn parse_node_id(raw: &str) -> Option<u32> {
    let s = raw.trim();
    if let Some(hex) = s
        .strip_prefix('!')
        .or_else(|| s.strip_prefix("0x"))
        .or_else(|| s.strip_prefix("0X"))
    {
        return u32::from_str_radix(hex, 16).ok();
    }
    s.parse::<u32>().ok()
}

/// Render a node identity in the `!xxxxxxxx` form.
pub fn format_node_id(id: u32) -> String {
    format!("!{:08x}", id)
}

impl Config {
    /// Load configuration from a file
    pub async fn load(path: &str) -> Result<Self> {
        let content = fs::read_to_string(path)
            .await
            .map_err(|e| anyhow!("Failed to read config file {}: {}", path, e))?;

        let config: Config = toml::from_str(&content)
            .map_err(|e| anyhow!("Failed to parse config file {}: {}", path, e))?;

        Ok(config)
    }

    /// Create a default configuration file
    pub async fn create_default(path: &str) -> Result<()> {
        let config = Config::default();
        let content = toml::to_string_pretty(&config)
            .map_err(|e| anyhow!("Failed to serialize default config: {}", e))?;

        fs::write(path, content)
            .await
            .map_err(|e| anyhow!("Failed to write config file {}: {}", path, e))?;

        Ok(())
    }

    /// Own node id, if configured and parseable.
    pub fn own_node_id(&self) -> Option<u32> {
        if self.bbs.node_id.trim().is_empty() {
            return None;
        }
        let parsed = parse_node_id(&self.bbs.node_id);
        if parsed.is_none() {
            warn!("Ignoring unparseable bbs.node_id '{}'", self.bbs.node_id);
        }
        parsed
    }

    /// Configured peers that parse as node ids. Bad entries are logged and skipped.
    pub fn peer_ids(&self) -> Vec<u32> {
        let mut out = Vec::with_capacity(self.bbs.peers.len());
        for raw in &self.bbs.peers {
            match parse_node_id(raw) {
                Some(id) if !out.contains(&id) => out.push(id),
                Some(_) => {}
                None => warn!("Ignoring unparseable peer id '{}'", raw),
            }
        }
        out
    }

    pub fn blackjack_db_path(&self) -> PathBuf {
        match &self.games.blackjack_db_path {
            Some(p) => PathBuf::from(p),
            None => PathBuf::from(&self.storage.data_dir).join("blackjack"),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            bbs: BbsConfig {
                name: "Relay BBS".to_string(),
                node_id: String::new(),
                peers: Vec::new(),
                urgent_board: default_urgent_board(),
            },
            storage: StorageConfig {
                data_dir: "./data".to_string(),
                max_message_size: 200, // leaves room for ~30 bytes of radio protocol overhead
            },
            logging: LoggingConfig {
                level: "info".to_string(),
                file: Some("relaybbs.log".to_string()),
            },
            games: GamesConfig::default(),
            scheduler: SchedulerConfigToml::default(),
            nodes: Vec::new(),
        }
    }
}
