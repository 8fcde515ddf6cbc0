//! Unified error types for the console firmware.
//!
//! A single `Error` enum for the boot sequence, plus the executor's and the
//! reassembler's failure reasons. All variants are `Copy`.

use core::fmt;

pub use crate::app::ports::{ConfigError, StorageError};

// ---------------------------------------------------------------------------
// Top-level firmware error
// ---------------------------------------------------------------------------

/// Every fallible operation in the firmware funnels into this type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// Persistent storage failed.
    Storage(StorageError),
    /// Configuration is invalid or could not be loaded.
    Config(ConfigError),
    /// Peripheral or service initialisation failed.
    Init(&'static str),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Storage(e) => write!(f, "storage: {e}"),
            Self::Config(e) => write!(f, "config: {e}"),
            Self::Init(msg) => write!(f, "init: {msg}"),
        }
    }
}

impl std::error::Error for Error {}

// ---------------------------------------------------------------------------
// Executor errors
// ---------------------------------------------------------------------------

/// Reasons the executor refused or failed to run a command line.
///
/// None of these are fatal: the caller gets a descriptive text and the
/// executor is usable for the next call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecError {
    /// Empty command line, embedded NUL, or a tokeniser rejection.
    InvalidCommand,
    /// Another command held the execution lock past the acquire timeout.
    Busy,
    /// The capture sink could not grow.
    NoMemory,
}

impl fmt::Display for ExecError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidCommand => write!(f, "Invalid command"),
            Self::Busy => write!(f, "Console task is executing command"),
            Self::NoMemory => write!(f, "Cannot allocate memory for command result"),
        }
    }
}

// ---------------------------------------------------------------------------
// Reassembly errors
// ---------------------------------------------------------------------------

/// Why an in-flight WebSocket message was discarded or a frame skipped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReassemblyError {
    /// Continuation frame arrived with no message in flight.
    MissingHead,
    /// A different connection tried to start a message while one is assembling.
    OwnerMismatch,
    /// Frame offset does not match the bytes already received for this frame.
    OffsetMismatch,
    /// Payload would run past the frame's declared length.
    Overrun,
    /// Buffer could not be allocated or grown.
    NoMemory,
    /// Declared size exceeds the configured message limit.
    TooLarge,
    /// Every reassembly slot is taken by another connection.
    NoSlot,
}

impl fmt::Display for ReassemblyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingHead => write!(f, "continuation without a head frame"),
            Self::OwnerMismatch => write!(f, "another connection owns the in-flight message"),
            Self::OffsetMismatch => write!(f, "frame offset out of sequence"),
            Self::Overrun => write!(f, "payload exceeds declared frame length"),
            Self::NoMemory => write!(f, "cannot allocate message buffer"),
            Self::TooLarge => write!(f, "message exceeds size limit"),
            Self::NoSlot => write!(f, "no free reassembly slot"),
        }
    }
}

impl From<StorageError> for Error {
    fn from(e: StorageError) -> Self {
        Self::Storage(e)
    }
}

impl From<ConfigError> for Error {
    fn from(e: ConfigError) -> Self {
        Self::Config(e)
    }
}

// ---------------------------------------------------------------------------
// Convenience Result alias
// ---------------------------------------------------------------------------

/// Firmware-wide `Result` alias.
pub type Result<T> = core::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exec_errors_render_descriptive_text() {
        assert_eq!(
            ExecError::Busy.to_string(),
            "Console task is executing command"
        );
        assert!(ExecError::NoMemory.to_string().contains("allocate"));
    }

    #[test]
    fn drop_reasons_render_descriptive_text() {
        assert_eq!(
            ReassemblyError::OwnerMismatch.to_string(),
            "another connection owns the in-flight message"
        );
        assert!(ReassemblyError::NoMemory.to_string().contains("allocate"));
    }

    #[test]
    fn subsystem_errors_convert_into_top_level() {
        let e: Error = ConfigError::Corrupted.into();
        assert_eq!(e, Error::Config(ConfigError::Corrupted));
        assert_eq!(e.to_string(), "config: config corrupted");

        let e: Error = StorageError::NotFound.into();
        assert_eq!(e.to_string(), "storage: key not found");
        assert_eq!(Error::Init("wifi").to_string(), "init: wifi");
    }
}
