//! In-memory output sink for one command execution.
//!
//! Commands print into a [`CaptureSink`] handed to the interpreter instead
//! of a process-wide stdout swap. The sink grows on demand with fallible
//! allocation; if growth fails the write is refused, the sink remembers the
//! failure, and the executor reports "cannot allocate" instead of a
//! truncated result.

use core::fmt;

/// Extra headroom reserved on each growth, so a burst of short
/// `write!` calls doesn't reallocate every time.
const GROW_STEP: usize = 64;

pub struct CaptureSink {
    buf: Vec<u8>,
    limit: Option<usize>,
    overflowed: bool,
}

impl CaptureSink {
    /// Unbounded sink (limited only by the heap).
    pub fn new() -> Self {
        Self {
            buf: Vec::new(),
            limit: None,
            overflowed: false,
        }
    }

    /// Sink that refuses to grow past `limit` bytes.
    pub fn with_limit(limit: usize) -> Self {
        Self {
            limit: Some(limit),
            ..Self::new()
        }
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// Whether any write was refused for lack of memory.
    pub fn overflowed(&self) -> bool {
        self.overflowed
    }

    /// Raw captured bytes, untrimmed.
    pub fn as_bytes(&self) -> &[u8] {
        &self.buf
    }

    /// Consume the sink and return the captured text with trailing `\r` /
    /// `\n` stripped. Leading and interior whitespace is kept verbatim.
    /// Returns `None` when nothing (or only line endings) was printed.
    pub fn finish(self) -> Option<String> {
        let mut buf = self.buf;
        while matches!(buf.last(), Some(b'\n' | b'\r')) {
            buf.pop();
        }
        if buf.is_empty() {
            return None;
        }
        Some(match String::from_utf8(buf) {
            Ok(s) => s,
            Err(e) => String::from_utf8_lossy(e.as_bytes()).into_owned(),
        })
    }

    fn append(&mut self, data: &[u8]) -> bool {
        if self.overflowed {
            return false;
        }
        let needed = self.buf.len() + data.len();
        if self.limit.is_some_and(|limit| needed > limit) {
            self.overflowed = true;
            return false;
        }
        let spare = self.buf.capacity() - self.buf.len();
        if spare < data.len() {
            let mut extra = data.len() + GROW_STEP;
            if let Some(limit) = self.limit {
                extra = extra.min(limit - self.buf.len());
            }
            if self.buf.try_reserve(extra).is_err() {
                self.overflowed = true;
                return false;
            }
        }
        self.buf.extend_from_slice(data);
        true
    }
}

impl Default for CaptureSink {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Write for CaptureSink {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        if self.append(s.as_bytes()) {
            Ok(())
        } else {
            Err(fmt::Error)
        }
    }
}

impl std::io::Write for CaptureSink {
    fn write(&mut self, data: &[u8]) -> std::io::Result<usize> {
        if self.append(data) {
            Ok(data.len())
        } else {
            Err(std::io::ErrorKind::OutOfMemory.into())
        }
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}
