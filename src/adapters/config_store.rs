//! Flattened key/value configuration store.
//!
//! Implements [`KeyValueConfig`] over a fixed table of dotted keys. Every
//! value is a string; flags are `"1"` / `"0"`, and an empty string means
//! unset. Entries are persisted one NVS key per config key in
//! the `config` namespace, so a partially written store still loads.
//!
//! | Key prefix  | Purpose                               |
//! |-------------|---------------------------------------|
//! | `web.*`     | WebSocket / HTTP credentials          |
//! | `net.ap.*`  | Hotspot SSID, password, address       |
//! | `net.sta.*` | Upstream access point credentials     |
//! | `app.*`     | mDNS, OTA, console prompt             |
//! | `info.*`    | Read-only build information           |

use log::{info, warn};
use serde_json::{Map, Value};

use super::utils::is_printable_ascii;
use crate::app::ports::{ConfigError, KeyValueConfig, StorageError, StoragePort};

const NAMESPACE: &str = "config";

/// Longest stored value (bytes).
const MAX_VALUE_LEN: usize = 128;

/// `(key, default)` for every writable entry, in listing order.
const ENTRIES: &[(&str, &str)] = &[
    ("web.ws.name", ""),
    ("web.ws.pass", ""),
    ("web.http.name", ""),
    ("web.http.pass", ""),
    ("net.ap.ssid", "Cloud3DP"),
    ("net.ap.pass", "12345678"),
    ("net.ap.host", "10.0.0.1"),
    ("net.ap.hide", "0"),
    ("net.sta.ssid", ""),
    ("net.sta.pass", ""),
    ("app.dns.run", ""),
    ("app.dns.host", ""),
    ("app.ota.run", ""),
    ("app.ota.url", ""),
    ("app.cmd.prompt", "c3dp> "),
];

const READ_ONLY: &[(&str, &str)] = &[
    ("info.name", env!("CARGO_PKG_NAME")),
    ("info.ver", env!("CARGO_PKG_VERSION")),
];

struct Entry {
    key: &'static str,
    value: String,
    writable: bool,
}

/// In-memory view of the configuration, backed by [`StoragePort`].
pub struct ConfigStore {
    entries: Vec<Entry>,
}

impl ConfigStore {
    /// Store holding the factory defaults.
    pub fn new() -> Self {
        let writable = ENTRIES.iter().map(|(key, value)| Entry {
            key,
            value: String::from(*value),
            writable: true,
        });
        let fixed = READ_ONLY.iter().map(|(key, value)| Entry {
            key,
            value: String::from(*value),
            writable: false,
        });
        Self {
            entries: writable.chain(fixed).collect(),
        }
    }

    /// Every `(key, value)` pair, in listing order.
    pub fn iter(&self) -> impl Iterator<Item = (&'static str, &str)> + '_ {
        self.entries.iter().map(|e| (e.key, e.value.as_str()))
    }

    /// Serialise every entry as one flat JSON object.
    pub fn dumps(&self) -> String {
        let mut map = Map::new();
        for e in &self.entries {
            map.insert(String::from(e.key), Value::String(e.value.clone()));
        }
        Value::Object(map).to_string()
    }

    /// Apply a JSON object. Nested objects are flattened with `.`, so
    /// `{"net":{"ap":{"ssid":"x"}}}` and `{"net.ap.ssid":"x"}` are equivalent.
    ///
    /// Unknown and read-only keys are skipped. Returns the number of
    /// entries changed.
    pub fn loads(&mut self, json: &str) -> Result<usize, ConfigError> {
        let root: Value = serde_json::from_str(json).map_err(|e| {
            warn!("Config: cannot parse JSON: {}", e);
            ConfigError::Corrupted
        })?;
        let Value::Object(map) = root else {
            return Err(ConfigError::ValidationFailed("config JSON must be an object"));
        };

        let mut flat = Vec::new();
        flatten("", &map, &mut flat);

        let mut applied = 0;
        for (key, value) in flat {
            if self.set(&key, &value) {
                applied += 1;
            } else {
                warn!("Config: skipped `{}`", key);
            }
        }
        Ok(applied)
    }

    /// Load every stored entry. Missing keys keep their current value.
    pub fn load(&mut self, nvs: &dyn StoragePort) -> Result<usize, ConfigError> {
        let mut loaded = 0;
        let mut buf = [0u8; MAX_VALUE_LEN];
        for e in self.entries.iter_mut().filter(|e| e.writable) {
            match nvs.read(NAMESPACE, e.key, &mut buf) {
                Ok(n) => match core::str::from_utf8(&buf[..n]) {
                    Ok(s) => {
                        e.value = String::from(s);
                        loaded += 1;
                    }
                    Err(_) => warn!("Config: `{}` is not UTF-8, keeping current value", e.key),
                },
                Err(StorageError::NotFound) => {}
                Err(err) => return Err(err.into()),
            }
        }
        info!("Config: loaded {} entries from storage", loaded);
        Ok(loaded)
    }

    /// Persist every writable entry.
    pub fn save(&self, nvs: &mut dyn StoragePort) -> Result<(), ConfigError> {
        for e in self.entries.iter().filter(|e| e.writable) {
            nvs.write(NAMESPACE, e.key, e.value.as_bytes())?;
        }
        info!("Config: saved {} entries", ENTRIES.len());
        Ok(())
    }

    fn entry_mut(&mut self, key: &str) -> Option<&mut Entry> {
        self.entries.iter_mut().find(|e| e.key == key)
    }
}

impl Default for ConfigStore {
    fn default() -> Self {
        Self::new()
    }
}

impl KeyValueConfig for ConfigStore {
    fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|e| e.key == key)
            .map(|e| e.value.as_str())
    }

    fn set(&mut self, key: &str, value: &str) -> bool {
        if value.len() > MAX_VALUE_LEN || !is_printable_ascii(value) {
            return false;
        }
        match self.entry_mut(key) {
            Some(e) if e.writable => {
                e.value = String::from(value);
                true
            }
            _ => false,
        }
    }
}

fn flatten(prefix: &str, map: &Map<String, Value>, out: &mut Vec<(String, String)>) {
    for (k, v) in map {
        let key = if prefix.is_empty() {
            k.clone()
        } else {
            format!("{}.{}", prefix, k)
        };
        match v {
            Value::Object(inner) => flatten(&key, inner, out),
            Value::String(s) => out.push((key, s.clone())),
            Value::Bool(b) => out.push((key, String::from(if *b { "1" } else { "0" }))),
            Value::Number(n) => out.push((key, n.to_string())),
            Value::Null | Value::Array(_) => {}
        }
    }
}
