//! Port traits: the hexagonal boundary between the command core and the
//! outside world.
//!
//! ```text
//!   Adapter ──▶ Port trait ──▶ Executor / builtins (domain)
//! ```
//!
//! Driven adapters (NVS, configuration store, line editor) implement these
//! traits. The console core consumes them via generics or trait objects, so
//! nothing in `console` or `rpc` touches flash or UART directly.

use std::sync::Arc;

// ───────────────────────────────────────────────────────────────
// Storage port (driven adapter: domain ↔ NVS / flash)
// ───────────────────────────────────────────────────────────────

/// Persistent key-value storage for configuration, history, etc.
///
/// Keys are namespaced to prevent collisions between subsystems. Write
/// operations MUST be atomic; the ESP-IDF NVS API guarantees this per
/// `nvs_commit()`, the in-memory simulation trivially.
pub trait StoragePort {
    /// Read a value. Returns the number of bytes written to `buf`.
    fn read(&self, namespace: &str, key: &str, buf: &mut [u8]) -> Result<usize, StorageError>;

    /// Write a value atomically.
    fn write(&mut self, namespace: &str, key: &str, data: &[u8]) -> Result<(), StorageError>;

    /// Delete a key. Returns `Ok(())` even if the key didn't exist.
    fn delete(&mut self, namespace: &str, key: &str) -> Result<(), StorageError>;

    /// Check whether a key exists without reading it.
    fn exists(&self, namespace: &str, key: &str) -> bool;
}

// ───────────────────────────────────────────────────────────────
// Key/value configuration port (reachable from commands)
// ───────────────────────────────────────────────────────────────

/// Flattened dotted-key configuration service, e.g. `"net.ap.ssid"`.
///
/// The executor never mediates this; built-in commands reach it directly.
pub trait KeyValueConfig {
    /// Current value of `key`, or `None` if the key is unknown.
    fn get(&self, key: &str) -> Option<&str>;

    /// Set `key` to `value`. Returns `false` if the key is unknown,
    /// read-only, or the value was rejected.
    fn set(&mut self, key: &str, value: &str) -> bool;
}

// ───────────────────────────────────────────────────────────────
// Line editor port (driving adapter: UART / terminal → REPL)
// ───────────────────────────────────────────────────────────────

/// Interactive line-editing front end used by the REPL.
pub trait LineEditor {
    /// Block until a line is read. `Ok(None)` on end of input.
    fn read_line(&mut self, prompt: &str) -> std::io::Result<Option<String>>;

    /// Show text to the user.
    fn print(&mut self, text: &str) -> std::io::Result<()>;

    /// Remember an entered line for recall. Editors without history
    /// ignore it.
    fn add_history(&mut self, _line: &str) {}

    /// Source for tab completion and argument hints.
    fn set_completion(&mut self, _source: Arc<dyn Completion>) {}
}

/// Completion source for a [`LineEditor`].
pub trait Completion: Send + Sync {
    /// Candidates that complete the partial `line`, sorted.
    fn complete(&self, line: &str) -> Vec<String>;

    /// Argument hint for the command typed so far.
    fn hint(&self, line: &str) -> Option<String>;
}

// ───────────────────────────────────────────────────────────────
// Error types
// ───────────────────────────────────────────────────────────────

/// Errors from configuration load/save/validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigError {
    /// No config found in storage (first boot).
    NotFound,
    /// Stored config failed integrity / deserialization check.
    Corrupted,
    /// A config field failed range validation.
    /// The `&'static str` describes which field and why.
    ValidationFailed(&'static str),
    /// Underlying storage is full.
    StorageFull,
    /// Generic I/O error from the storage backend.
    IoError,
}

/// Errors from [`StoragePort`] operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageError {
    /// Requested key does not exist.
    NotFound,
    /// Storage partition is full.
    Full,
    /// Generic I/O error.
    IoError,
    /// Caller buffer is smaller than the stored value.
    BufferTooSmall,
}

impl core::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::NotFound => write!(f, "config not found"),
            Self::Corrupted => write!(f, "config corrupted"),
            Self::ValidationFailed(msg) => write!(f, "validation failed: {}", msg),
            Self::StorageFull => write!(f, "storage full"),
            Self::IoError => write!(f, "I/O error"),
        }
    }
}

impl core::fmt::Display for StorageError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::NotFound => write!(f, "key not found"),
            Self::Full => write!(f, "storage full"),
            Self::IoError => write!(f, "I/O error"),
            Self::BufferTooSmall => write!(f, "buffer too small"),
        }
    }
}

impl From<StorageError> for ConfigError {
    fn from(e: StorageError) -> Self {
        match e {
            StorageError::NotFound => Self::NotFound,
            StorageError::Full => Self::StorageFull,
            StorageError::IoError | StorageError::BufferTooSmall => Self::IoError,
        }
    }
}
