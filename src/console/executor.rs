//! Single-flight command executor.
//!
//! Every transport (UART REPL, HTTP form, WebSocket JSON-RPC) funnels its
//! command lines through one [`CommandExecutor`]. Execution is serialized by
//! an [`ExecutionLock`] with a bounded wait; the interpreter prints into a
//! fresh [`CaptureSink`] owned by the call, so two commands can never
//! interleave output.
//!
//! ```text
//!  execute(line)
//!    ├─ validate (empty / NUL)      → Invalid, lock untouched
//!    ├─ acquire lock ≤ timeout      → Busy
//!    ├─ record history
//!    ├─ interpreter.run(line, sink)
//!    ├─ sink.finish()               → trimmed output or None
//!    └─ drop permit
//! ```

use core::fmt;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use log::{debug, error, warn};

use super::capture::CaptureSink;
use super::history::History;
use super::lock::ExecutionLock;
use super::registry::{Dispatch, Interpreter};
use crate::config::ConsoleConfig;
use crate::error::ExecError;

/// Outcome class of one `execute` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecStatus {
    Success,
    /// No command with that name is registered.
    UnknownCommand,
    /// The command ran and returned a non-zero exit code.
    CommandError(i32),
    /// Empty line, embedded NUL, or rejected by the tokeniser.
    Invalid,
    /// Another command held the lock past the timeout.
    Busy,
    /// The capture sink could not grow.
    NoMemory,
    /// The interpreter panicked.
    Internal,
}

impl ExecStatus {
    pub fn is_success(self) -> bool {
        self == Self::Success
    }
}

impl fmt::Display for ExecStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Success => write!(f, "OK"),
            Self::UnknownCommand => write!(f, "Unrecognized command"),
            Self::CommandError(code) => write!(f, "Command returned non-zero error code: {code}"),
            Self::Invalid => write!(f, "{}", ExecError::InvalidCommand),
            Self::Busy => write!(f, "{}", ExecError::Busy),
            Self::NoMemory => write!(f, "{}", ExecError::NoMemory),
            Self::Internal => write!(f, "Internal error while executing command"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionResult {
    pub status: ExecStatus,
    /// Captured output with trailing line endings stripped; `None` when the
    /// command printed nothing.
    pub output: Option<String>,
}

impl ExecutionResult {
    fn failed(status: ExecStatus) -> Self {
        Self {
            status,
            output: None,
        }
    }

    /// Whether there is nothing to show.
    pub fn is_empty(&self) -> bool {
        self.output.is_none()
    }

    /// Text for a transport reply: the captured output when there is any,
    /// otherwise the status description for failures, otherwise "".
    pub fn text(&self) -> String {
        match (&self.output, self.status) {
            (Some(out), _) => out.clone(),
            (None, ExecStatus::Success) => String::new(),
            (None, status) => status.to_string(),
        }
    }

    /// Consuming variant of [`text`](Self::text).
    pub fn into_text(self) -> String {
        match (self.output, self.status) {
            (Some(out), _) => out,
            (None, ExecStatus::Success) => String::new(),
            (None, status) => status.to_string(),
        }
    }
}

pub struct CommandExecutor<I: Interpreter> {
    lock: ExecutionLock,
    interpreter: Mutex<I>,
    history: Arc<History>,
    timeout: Duration,
    capture_limit: Option<usize>,
}

impl<I: Interpreter> CommandExecutor<I> {
    pub fn new(interpreter: I, history: Arc<History>, config: &ConsoleConfig) -> Self {
        Self {
            lock: ExecutionLock::new(),
            interpreter: Mutex::new(interpreter),
            history,
            timeout: Duration::from_millis(u64::from(config.lock_timeout_ms)),
            capture_limit: None,
        }
    }

    /// Cap captured output at `limit` bytes; larger output reports NoMemory.
    #[must_use]
    pub fn with_capture_limit(mut self, limit: usize) -> Self {
        self.capture_limit = Some(limit);
        self
    }

    pub fn history(&self) -> &Arc<History> {
        &self.history
    }

    /// Whether a command is in flight right now.
    pub fn is_busy(&self) -> bool {
        self.lock.is_held()
    }

    pub fn execute(&self, line: &str) -> ExecutionResult {
        if line.trim().is_empty() || line.contains('\0') {
            return ExecutionResult::failed(ExecStatus::Invalid);
        }

        let Some(_permit) = self.lock.acquire_timeout(self.timeout) else {
            warn!("EXEC: busy, rejected `{}`", line);
            return ExecutionResult {
                status: ExecStatus::Busy,
                output: Some(ExecError::Busy.to_string()),
            };
        };
        debug!("EXEC: `{}`", line);
        self.history.record(line);

        let mut sink = match self.capture_limit {
            Some(limit) => CaptureSink::with_limit(limit),
            None => CaptureSink::new(),
        };
        let mut interp = self
            .interpreter
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let dispatch = catch_unwind(AssertUnwindSafe(|| interp.run(line, &mut sink)));
        drop(interp);

        let dispatch = match dispatch {
            Ok(d) => d,
            Err(_) => {
                error!("EXEC: command panicked: `{}`", line);
                return ExecutionResult::failed(ExecStatus::Internal);
            }
        };
        if sink.overflowed() {
            warn!("EXEC: output of `{}` exceeded capture buffer", line);
            return ExecutionResult {
                status: ExecStatus::NoMemory,
                output: Some(ExecError::NoMemory.to_string()),
            };
        }

        let status = match dispatch {
            Dispatch::NotFound => {
                warn!("EXEC: unrecognized command: `{}`", line);
                ExecStatus::UnknownCommand
            }
            Dispatch::Ran(0) => ExecStatus::Success,
            Dispatch::Ran(code) => {
                warn!("EXEC: command error {}: `{}`", code, line);
                ExecStatus::CommandError(code)
            }
            Dispatch::Invalid(reason) => {
                warn!("EXEC: {}: `{}`", reason, line);
                return ExecutionResult {
                    status: ExecStatus::Invalid,
                    output: Some(format!("{}: {}", ExecError::InvalidCommand, reason)),
                };
            }
        };
        ExecutionResult {
            status,
            output: sink.finish(),
        }
    }
}
