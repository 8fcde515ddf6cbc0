//! Console firmware main entry point.
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                     Adapters (outer ring)                    │
//! │                                                              │
//! │  StdioLineEditor   EspHttpServer (/cmd, /ws)   NvsAdapter    │
//! │  (UART REPL)       + ReassemblerTable          ConfigStore   │
//! │        │                  │ INBOUND / OUTBOUND               │
//! │        │                  ▼                                  │
//! │        │            Dispatcher (thread)                      │
//! │        ▼                  ▼                                  │
//! │  ┌────────────────────────────────────────────────────────┐  │
//! │  │  CommandExecutor (single flight) → CommandRegistry     │  │
//! │  └────────────────────────────────────────────────────────┘  │
//! └──────────────────────────────────────────────────────────────┘
//! ```
#![deny(unused_must_use)]

use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex};

use anyhow::Result;
use log::info;

use consolefw::adapters::http_server;
use consolefw::adapters::nvs::NvsAdapter;
use consolefw::adapters::stdio::StdioLineEditor;
use consolefw::boot;
use consolefw::console::repl::Repl;
use consolefw::console::{CommandExecutor, CommandRegistry};
use consolefw::error::Error;
use consolefw::rpc::channels::{Dispatcher, INBOUND, OUTBOUND};
use consolefw::task::{Core, spawn_task};

fn main() -> Result<()> {
    // ── 1. ESP-IDF bootstrap ──────────────────────────────────
    esp_idf_svc::sys::link_patches();
    esp_idf_logger::init()?;
    info!("{} v{}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"));

    // ── 2. Storage, configuration, interpreter ────────────────
    let nvs = NvsAdapter::new().map_err(Error::from)?;
    let console = boot::assemble(Arc::new(Mutex::new(nvs)))?;
    let executor: &'static CommandExecutor<CommandRegistry> =
        Box::leak(Box::new(console.executor));

    // ── 3. Network transports ─────────────────────────────────
    // Keep the server alive for the lifetime of the firmware.
    let _server = http_server::start(executor, Arc::clone(&console.store), &console.config)?;
    spawn_task(Core::App, 5, 8, "dispatch\0", move || {
        Dispatcher::new(executor, &INBOUND, &OUTBOUND).run();
    })?;

    // ── 4. UART REPL on the main task ─────────────────────────
    let stop = AtomicBool::new(false);
    let mut repl = Repl::new(executor, StdioLineEditor::stdio(), &console.prompt)
        .with_completion(console.index);
    repl.seed_history(console.history.entries().iter().map(String::as_str));
    repl.run(&stop)?;
    Ok(())
}
