//! Console assembly.
//!
//! [`assemble`] turns a storage backend into a ready command core: tunables
//! and the key/value store loaded, history restored, builtins registered,
//! executor built. The firmware entry point and the host integration tests
//! boot through the same path.
//!
//! ```text
//!  StoragePort ──▶ ConsoleConfig ──▶ CommandRegistry + builtins ──▶ CommandExecutor
//!              ──▶ ConfigStore   ──▶ prompt
//!              ──▶ History
//! ```

use std::sync::{Arc, Mutex, PoisonError};

use log::{error, info, warn};

use crate::adapters::config_store::ConfigStore;
use crate::app::ports::{KeyValueConfig, StoragePort};
use crate::config::ConsoleConfig;
use crate::console::commands::register_builtins;
use crate::console::history::History;
use crate::console::registry::CommandIndex;
use crate::console::{CommandExecutor, CommandRegistry};
use crate::error::{ConfigError, Error, Result, StorageError};

/// Everything the transports need, built from one storage backend.
pub struct Console<S> {
    pub config: ConsoleConfig,
    /// `app.cmd.prompt`, or the tunable prompt when that is empty.
    pub prompt: String,
    pub store: Arc<Mutex<ConfigStore>>,
    pub storage: Arc<Mutex<S>>,
    pub history: Arc<History>,
    /// Command names and hints for the line editor.
    pub index: Arc<CommandIndex>,
    pub executor: CommandExecutor<CommandRegistry>,
}

pub fn assemble<S>(storage: Arc<Mutex<S>>) -> Result<Console<S>>
where
    S: StoragePort + Send + 'static,
{
    let (config, store, history) = {
        let nvs = storage.lock().unwrap_or_else(PoisonError::into_inner);
        let config = load_tunables(&*nvs)?;

        let mut store = ConfigStore::new();
        if let Err(e) = store.load(&*nvs) {
            warn!("Config: load failed ({}), using defaults", e);
        }

        let history = History::new(config.history_len as usize);
        match history.load(&*nvs) {
            Ok(n) => info!("History: restored {} lines", n),
            Err(StorageError::NotFound) => {}
            Err(e) => warn!("History: restore failed ({})", e),
        }
        (config, store, history)
    };

    let prompt = match store.get("app.cmd.prompt") {
        Some(p) if !p.is_empty() => String::from(p),
        _ => config.prompt.clone(),
    };
    let store = Arc::new(Mutex::new(store));
    let history = Arc::new(history);

    let mut registry = CommandRegistry::from_config(&config);
    register_builtins(&mut registry, &store, &storage, &history).map_err(|e| {
        error!("REPL: builtin registration failed: {}", e);
        Error::Init("builtin command registration")
    })?;
    let index = Arc::new(registry.index());
    let executor = CommandExecutor::new(registry, Arc::clone(&history), &config);

    Ok(Console {
        config,
        prompt,
        store,
        storage,
        history,
        index,
        executor,
    })
}

/// Stored tunables. A corrupt or out-of-range blob falls back to the
/// defaults; a storage failure does not.
fn load_tunables(nvs: &dyn StoragePort) -> Result<ConsoleConfig> {
    match ConsoleConfig::load(nvs) {
        Ok(config) => Ok(config),
        Err(e @ (ConfigError::Corrupted | ConfigError::ValidationFailed(_))) => {
            warn!("ConsoleConfig: {}, using defaults", e);
            Ok(ConsoleConfig::default())
        }
        Err(e) => Err(e.into()),
    }
}
