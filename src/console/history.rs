//! Bounded command history, shared by every transport.

use std::collections::VecDeque;
use std::sync::{Mutex, PoisonError};

use log::warn;

use crate::app::ports::{StorageError, StoragePort};

const NAMESPACE: &str = "console";
const KEY: &str = "history";

/// Largest persisted history blob; older lines are dropped to fit.
const MAX_BLOB_SIZE: usize = 4000;

pub struct History {
    lines: Mutex<VecDeque<String>>,
    capacity: usize,
}

impl History {
    pub fn new(capacity: usize) -> Self {
        Self {
            lines: Mutex::new(VecDeque::with_capacity(capacity.min(16))),
            capacity: capacity.max(1),
        }
    }

    /// Append a line, evicting the oldest when full. Empty lines and
    /// immediate repeats are not recorded. Returns whether it was added.
    pub fn record(&self, line: &str) -> bool {
        if line.trim().is_empty() || line.contains('\n') {
            return false;
        }
        let mut lines = self.lines.lock().unwrap_or_else(PoisonError::into_inner);
        if lines.back().is_some_and(|last| last == line) {
            return false;
        }
        if lines.len() == self.capacity {
            lines.pop_front();
        }
        lines.push_back(String::from(line));
        true
    }

    /// Oldest first.
    pub fn entries(&self) -> Vec<String> {
        let lines = self.lines.lock().unwrap_or_else(PoisonError::into_inner);
        lines.iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.lines.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn clear(&self) {
        self.lines
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    /// Persist as newline-joined text, newest lines kept if it must shrink.
    pub fn save(&self, nvs: &mut dyn StoragePort) -> Result<usize, StorageError> {
        let lines = self.entries();
        let mut total = 0;
        let mut keep = 0;
        for line in lines.iter().rev() {
            if total + line.len() + 1 > MAX_BLOB_SIZE {
                break;
            }
            total += line.len() + 1;
            keep += 1;
        }
        let blob = lines[lines.len() - keep..].join("\n");
        nvs.write(NAMESPACE, KEY, blob.as_bytes())?;
        Ok(keep)
    }

    /// Replace the in-memory history with the persisted one.
    pub fn load(&self, nvs: &dyn StoragePort) -> Result<usize, StorageError> {
        let mut buf = vec![0u8; MAX_BLOB_SIZE];
        let n = nvs.read(NAMESPACE, KEY, &mut buf)?;
        let Ok(text) = core::str::from_utf8(&buf[..n]) else {
            warn!("History: stored blob is not UTF-8");
            return Err(StorageError::IoError);
        };
        self.clear();
        let mut loaded = 0;
        for line in text.lines() {
            if self.record(line) {
                loaded += 1;
            }
        }
        Ok(loaded)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::nvs::NvsAdapter;

    #[test]
    fn oldest_evicted_at_capacity() {
        let h = History::new(3);
        for cmd in ["a", "b", "c", "d"] {
            assert!(h.record(cmd));
        }
        assert_eq!(h.entries(), ["b", "c", "d"]);
    }

    #[test]
    fn repeats_and_blank_lines_skipped() {
        let h = History::new(10);
        assert!(h.record("version"));
        assert!(!h.record("version"));
        assert!(!h.record("   "));
        assert!(h.record("help"));
        assert!(h.record("version"));
        assert_eq!(h.len(), 3);
    }

    #[test]
    fn save_and_load_round_trip() {
        let mut nvs = NvsAdapter::new().unwrap();
        let h = History::new(10);
        h.record("get net.ap.ssid");
        h.record("set net.ap.ssid Shop");
        assert_eq!(h.save(&mut nvs).unwrap(), 2);

        let restored = History::new(10);
        restored.record("stale");
        assert_eq!(restored.load(&nvs).unwrap(), 2);
        assert_eq!(restored.entries(), ["get net.ap.ssid", "set net.ap.ssid Shop"]);
    }

    #[test]
    fn save_keeps_newest_when_oversized() {
        let mut nvs = NvsAdapter::new().unwrap();
        let h = History::new(1000);
        for i in 0..200 {
            h.record(&format!("echo {:040}", i));
        }
        let kept = h.save(&mut nvs).unwrap();
        assert!(kept < 200);

        let restored = History::new(1000);
        restored.load(&nvs).unwrap();
        assert_eq!(
            restored.entries().last().map(String::as_str),
            Some(format!("echo {:040}", 199).as_str())
        );
    }

    #[test]
    fn load_missing_reports_not_found() {
        let nvs = NvsAdapter::new().unwrap();
        assert_eq!(History::new(5).load(&nvs), Err(StorageError::NotFound));
    }
}
