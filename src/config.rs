//! Console configuration parameters
//!
//! Tunables for the command executor, the line console and the network
//! transports. Persisted as a postcard blob through
//! [`StoragePort`](crate::app::ports::StoragePort).

use serde::{Deserialize, Serialize};

use crate::app::ports::{ConfigError, StoragePort};

const NAMESPACE: &str = "console";
const KEY: &str = "concfg";
const MAX_BLOB_SIZE: usize = 512;

/// Core console configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsoleConfig {
    // --- Line console ---
    /// Prompt printed by the REPL before each line
    pub prompt: String,
    /// Number of command lines kept in history
    pub history_len: u16,

    // --- Executor ---
    /// Bounded wait for the execution lock (milliseconds)
    pub lock_timeout_ms: u32,
    /// Longest accepted command line (bytes)
    pub max_cmdline_len: u16,
    /// Most arguments accepted on one command line, command name included
    pub max_cmdline_args: u8,

    // --- Transports ---
    /// Largest reassembled WebSocket message (bytes, after hex expansion)
    pub max_message_len: u32,
    /// Concurrent WebSocket connections with their own reassembly slot
    pub max_connections: u8,
}

impl Default for ConsoleConfig {
    fn default() -> Self {
        Self {
            prompt: String::from("c3dp> "),
            history_len: 100,

            lock_timeout_ms: 200,
            max_cmdline_len: 256,
            max_cmdline_args: 8,

            max_message_len: 4096,
            max_connections: 4,
        }
    }
}

impl ConsoleConfig {
    /// Range-check every field. Invalid values are rejected, never clamped.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.prompt.is_empty() || self.prompt.len() > 32 {
            return Err(ConfigError::ValidationFailed("prompt must be 1–32 bytes"));
        }
        if !(1..=1000).contains(&self.history_len) {
            return Err(ConfigError::ValidationFailed("history_len must be 1–1000"));
        }
        if !(10..=10_000).contains(&self.lock_timeout_ms) {
            return Err(ConfigError::ValidationFailed(
                "lock_timeout_ms must be 10–10000",
            ));
        }
        if !(16..=4096).contains(&self.max_cmdline_len) {
            return Err(ConfigError::ValidationFailed(
                "max_cmdline_len must be 16–4096",
            ));
        }
        if !(1..=64).contains(&self.max_cmdline_args) {
            return Err(ConfigError::ValidationFailed(
                "max_cmdline_args must be 1–64",
            ));
        }
        if !(64..=65_536).contains(&self.max_message_len) {
            return Err(ConfigError::ValidationFailed(
                "max_message_len must be 64–65536",
            ));
        }
        if !(1..=16).contains(&self.max_connections) {
            return Err(ConfigError::ValidationFailed(
                "max_connections must be 1–16",
            ));
        }
        Ok(())
    }

    /// Load from storage. Returns defaults if nothing has been saved yet.
    pub fn load(nvs: &dyn StoragePort) -> Result<Self, ConfigError> {
        if !nvs.exists(NAMESPACE, KEY) {
            log::info!("ConsoleConfig: no stored config, using defaults");
            return Ok(Self::default());
        }
        let mut buf = [0u8; MAX_BLOB_SIZE];
        let n = nvs.read(NAMESPACE, KEY, &mut buf)?;
        let cfg: Self = postcard::from_bytes(&buf[..n]).map_err(|_| ConfigError::Corrupted)?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Validate and persist.
    pub fn save(&self, nvs: &mut dyn StoragePort) -> Result<(), ConfigError> {
        self.validate()?;
        let bytes = postcard::to_allocvec(self).map_err(|_| ConfigError::Corrupted)?;
        nvs.write(NAMESPACE, KEY, &bytes)?;
        Ok(())
    }
}
