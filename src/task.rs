//! Core-pinned thread spawning.
//!
//! On ESP-IDF `std::thread` is a pthread on top of a FreeRTOS task.
//! The spawn configuration is thread-local and applies to the *next*
//! `pthread_create()` from the calling thread, so the config→spawn pair
//! must not be interleaved with other thread creation on the same thread.
//! On host the core and priority are ignored.

use std::io;
use std::thread::JoinHandle;

/// CPU core identifiers for the dual-core ESP32.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum Core {
    /// Core 0 (PRO_CPU): WiFi, lwIP, httpd.
    Pro = 0,
    /// Core 1 (APP_CPU): console and command execution.
    App = 1,
}

/// Spawn a named thread with explicit core, priority and stack.
///
/// `name` must be NUL-terminated (e.g. `"dispatch\0"`).
#[cfg(target_os = "espidf")]
pub fn spawn_task(
    core: Core,
    priority: u8,
    stack_kb: usize,
    name: &'static str,
    f: impl FnOnce() + Send + 'static,
) -> io::Result<JoinHandle<()>> {
    use esp_idf_hal::cpu::Core as HalCore;
    use esp_idf_hal::task::thread::ThreadSpawnConfiguration;

    ThreadSpawnConfiguration {
        name: Some(name.as_bytes()),
        stack_size: stack_kb * 1024,
        priority,
        pin_to_core: Some(match core {
            Core::Pro => HalCore::Core0,
            Core::App => HalCore::Core1,
        }),
        ..Default::default()
    }
    .set()
    .map_err(|e| io::Error::other(format!("thread spawn config failed: {e}")))?;

    let display_name = name.trim_end_matches('\0');
    log::info!(
        "Spawning '{}' on {:?} (pri={}, stack={}KB)",
        display_name,
        core,
        priority,
        stack_kb
    );
    std::thread::Builder::new()
        .name(display_name.into())
        .spawn(f)
}

/// Host fallback: no core pinning or priority.
#[cfg(not(target_os = "espidf"))]
pub fn spawn_task(
    _core: Core,
    _priority: u8,
    stack_kb: usize,
    name: &'static str,
    f: impl FnOnce() + Send + 'static,
) -> io::Result<JoinHandle<()>> {
    let display_name = name.trim_end_matches('\0');
    log::info!("Spawning '{}' (sim, stack={}KB)", display_name, stack_kb);
    std::thread::Builder::new()
        .name(display_name.into())
        .stack_size(stack_kb * 1024)
        .spawn(f)
}
