//! Command console core.
//!
//! One [`CommandExecutor`](executor::CommandExecutor) is shared by every
//! transport. It owns the execution lock and hands each call a fresh
//! capture sink; the [`CommandRegistry`](registry::CommandRegistry) is the
//! interpreter behind it.

pub mod capture;
pub mod commands;
pub mod executor;
pub mod history;
pub mod lock;
pub mod registry;
pub mod repl;

pub use executor::{CommandExecutor, ExecStatus, ExecutionResult};
pub use registry::{CommandRegistry, Dispatch, Interpreter};
