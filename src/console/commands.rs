//! Built-in console commands.
//!
//! | Command            | Effect                                      |
//! |--------------------|---------------------------------------------|
//! | `version`          | Firmware name and version                   |
//! | `echo [text...]`   | Print the arguments joined by spaces        |
//! | `history`          | Numbered command history, oldest first      |
//! | `get <key>`        | Print one configuration value               |
//! | `set <key> <val>`  | Change one configuration value              |
//! | `lscfg`            | Every `key: value` pair                     |
//! | `loadcfg`          | Reload configuration from storage           |
//! | `savecfg`          | Persist configuration to storage            |
//! | `loadhist`         | Replace history with the stored copy        |
//! | `savehist`         | Persist history to storage                  |
//!
//! Handlers return 0 on success, 1 on usage errors and 2 when storage
//! fails, printing a diagnostic either way.

use core::fmt::Write;
use std::sync::{Arc, Mutex, PoisonError};

use super::history::History;
use super::registry::{CommandRegistry, RegisterError};
use crate::adapters::config_store::ConfigStore;
use crate::app::ports::{KeyValueConfig, StoragePort};

const USAGE: i32 = 1;
const FAILED: i32 = 2;

/// Register every built-in on `registry`.
pub fn register_builtins<S>(
    registry: &mut CommandRegistry,
    config: &Arc<Mutex<ConfigStore>>,
    storage: &Arc<Mutex<S>>,
    history: &Arc<History>,
) -> Result<(), RegisterError>
where
    S: StoragePort + Send + 'static,
{
    registry.register("version", "Get version of firmware", None, |_, out| {
        let _ = writeln!(
            out,
            "{} {}",
            env!("CARGO_PKG_NAME"),
            env!("CARGO_PKG_VERSION")
        );
        0
    })?;

    registry.register("echo", "Print arguments", Some("[text...]"), |argv, out| {
        let _ = writeln!(out, "{}", argv[1..].join(" "));
        0
    })?;

    let hist = Arc::clone(history);
    registry.register("history", "List command history", None, move |_, out| {
        for (i, line) in hist.entries().iter().enumerate() {
            let _ = writeln!(out, "{:4}  {}", i + 1, line);
        }
        0
    })?;

    // ── Configuration ──────────────────────────────────────────

    let cfg = Arc::clone(config);
    registry.register("get", "Get configuration value by key", Some("<key>"), move |argv, out| {
        let [_, key] = argv else {
            let _ = writeln!(out, "usage: get <key>");
            return USAGE;
        };
        let store = cfg.lock().unwrap_or_else(PoisonError::into_inner);
        match store.get(key) {
            Some(value) => {
                let _ = writeln!(out, "{}", value);
                0
            }
            None => {
                let _ = writeln!(out, "Unknown key `{}`", key);
                USAGE
            }
        }
    })?;

    let cfg = Arc::clone(config);
    registry.register(
        "set",
        "Set configuration value by key",
        Some("<key> <value>"),
        move |argv, out| {
            let [_, key, value] = argv else {
                let _ = writeln!(out, "usage: set <key> <value>");
                return USAGE;
            };
            let mut store = cfg.lock().unwrap_or_else(PoisonError::into_inner);
            if store.set(key, value) {
                let _ = writeln!(out, "Set `{}` to `{}` done", key, value);
                0
            } else {
                let _ = writeln!(out, "Set `{}` to `{}` fail", key, value);
                USAGE
            }
        },
    )?;

    let cfg = Arc::clone(config);
    registry.register("lscfg", "List configuration key:value details", None, move |_, out| {
        let store = cfg.lock().unwrap_or_else(PoisonError::into_inner);
        for (key, value) in store.iter() {
            let _ = writeln!(out, "{}: {}", key, value);
        }
        0
    })?;

    let cfg = Arc::clone(config);
    let nvs = Arc::clone(storage);
    registry.register("loadcfg", "Load configuration from storage", None, move |_, out| {
        let nvs = nvs.lock().unwrap_or_else(PoisonError::into_inner);
        let mut store = cfg.lock().unwrap_or_else(PoisonError::into_inner);
        match store.load(&*nvs) {
            Ok(n) => {
                let _ = writeln!(out, "Loaded {} entries", n);
                0
            }
            Err(e) => {
                let _ = writeln!(out, "Load failed: {}", e);
                FAILED
            }
        }
    })?;

    let cfg = Arc::clone(config);
    let nvs = Arc::clone(storage);
    registry.register("savecfg", "Save configuration to storage", None, move |_, out| {
        let mut nvs = nvs.lock().unwrap_or_else(PoisonError::into_inner);
        let store = cfg.lock().unwrap_or_else(PoisonError::into_inner);
        match store.save(&mut *nvs) {
            Ok(()) => {
                let _ = writeln!(out, "Saved");
                0
            }
            Err(e) => {
                let _ = writeln!(out, "Save failed: {}", e);
                FAILED
            }
        }
    })?;

    // ── History persistence ────────────────────────────────────

    let hist = Arc::clone(history);
    let nvs = Arc::clone(storage);
    registry.register("loadhist", "Load console history from storage", None, move |_, out| {
        let nvs = nvs.lock().unwrap_or_else(PoisonError::into_inner);
        match hist.load(&*nvs) {
            Ok(n) => {
                let _ = writeln!(out, "Loaded {} lines", n);
                0
            }
            Err(e) => {
                let _ = writeln!(out, "Load failed: {}", e);
                FAILED
            }
        }
    })?;

    let hist = Arc::clone(history);
    let nvs = Arc::clone(storage);
    registry.register("savehist", "Save console history to storage", None, move |_, out| {
        let mut nvs = nvs.lock().unwrap_or_else(PoisonError::into_inner);
        match hist.save(&mut *nvs) {
            Ok(n) => {
                let _ = writeln!(out, "Saved {} lines", n);
                0
            }
            Err(e) => {
                let _ = writeln!(out, "Save failed: {}", e);
                FAILED
            }
        }
    })?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::nvs::NvsAdapter;
    use crate::console::registry::{Dispatch, Interpreter};

    struct Fixture {
        registry: CommandRegistry,
        config: Arc<Mutex<ConfigStore>>,
        storage: Arc<Mutex<NvsAdapter>>,
        history: Arc<History>,
    }

    fn fixture() -> Fixture {
        let config = Arc::new(Mutex::new(ConfigStore::new()));
        let storage = Arc::new(Mutex::new(NvsAdapter::new().unwrap()));
        let history = Arc::new(History::new(10));
        let mut registry = CommandRegistry::new(256, 8);
        register_builtins(&mut registry, &config, &storage, &history).unwrap();
        Fixture {
            registry,
            config,
            storage,
            history,
        }
    }

    fn run(f: &mut Fixture, line: &str) -> (Dispatch, String) {
        let mut out = String::new();
        let d = f.registry.run(line, &mut out);
        (d, out)
    }

    #[test]
    fn version_and_echo() {
        let mut f = fixture();
        let (d, out) = run(&mut f, "version");
        assert_eq!(d, Dispatch::Ran(0));
        assert!(out.starts_with("consolefw "));

        let (_, out) = run(&mut f, "echo a \"b c\"");
        assert_eq!(out, "a b c\n");
    }

    #[test]
    fn get_and_set() {
        let mut f = fixture();
        assert_eq!(run(&mut f, "get net.ap.ssid").1, "Cloud3DP\n");

        let (d, _) = run(&mut f, "set net.ap.ssid \"Shop Floor\"");
        assert_eq!(d, Dispatch::Ran(0));
        assert_eq!(
            f.config.lock().unwrap().get("net.ap.ssid"),
            Some("Shop Floor")
        );

        assert_eq!(run(&mut f, "set info.ver 9").0, Dispatch::Ran(USAGE));
        assert_eq!(run(&mut f, "get no.such.key").0, Dispatch::Ran(USAGE));
        assert_eq!(run(&mut f, "get").0, Dispatch::Ran(USAGE));
    }

    #[test]
    fn lscfg_lists_every_key() {
        let mut f = fixture();
        let (_, out) = run(&mut f, "lscfg");
        assert!(out.contains("net.ap.host: 10.0.0.1\n"));
        assert!(out.contains("info.name: consolefw\n"));
    }

    #[test]
    fn config_persists_through_storage() {
        let mut f = fixture();
        run(&mut f, "set app.dns.host printer");
        assert_eq!(run(&mut f, "savecfg").0, Dispatch::Ran(0));
        run(&mut f, "set app.dns.host other");
        assert_eq!(run(&mut f, "loadcfg").0, Dispatch::Ran(0));
        assert_eq!(run(&mut f, "get app.dns.host").1, "printer\n");
    }

    #[test]
    fn history_commands() {
        let mut f = fixture();
        f.history.record("version");
        f.history.record("lscfg");
        assert_eq!(run(&mut f, "history").1, "   1  version\n   2  lscfg\n");

        assert_eq!(run(&mut f, "savehist").1, "Saved 2 lines\n");
        f.history.clear();
        assert_eq!(run(&mut f, "loadhist").0, Dispatch::Ran(0));
        assert_eq!(f.history.len(), 2);
    }

    #[test]
    fn loadhist_without_saved_copy_fails() {
        let mut f = fixture();
        let (d, out) = run(&mut f, "loadhist");
        assert_eq!(d, Dispatch::Ran(FAILED));
        assert!(out.contains("key not found"));
        assert!(!f.storage.lock().unwrap().exists("console", "history"));
    }
}
