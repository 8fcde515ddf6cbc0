//! Scripted interpreter for integration tests.
//!
//! Records every line it is asked to run and how many calls overlap, so
//! tests can assert the executor never runs two commands at once.

use std::fmt::Write;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use consolefw::config::ConsoleConfig;
use consolefw::console::history::History;
use consolefw::console::{CommandExecutor, Dispatch, Interpreter};

#[derive(Default)]
pub struct Tally {
    pub lines: Mutex<Vec<String>>,
    pub active: AtomicUsize,
    pub max_active: AtomicUsize,
}

#[allow(dead_code)]
impl Tally {
    pub fn calls(&self) -> usize {
        self.lines.lock().unwrap().len()
    }

    pub fn max_overlap(&self) -> usize {
        self.max_active.load(Ordering::SeqCst)
    }
}

/// Commands:
///
/// - `say <words>`: prints the words, one `write!` per character
/// - `nap <ms>`: sleeps
/// - `exit <code>`: returns the code
/// - anything else: not found
pub struct MockInterpreter {
    tally: Arc<Tally>,
}

impl MockInterpreter {
    pub fn new(tally: Arc<Tally>) -> Self {
        Self { tally }
    }
}

impl Interpreter for MockInterpreter {
    fn run(&mut self, line: &str, out: &mut dyn Write) -> Dispatch {
        let now = self.tally.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.tally.max_active.fetch_max(now, Ordering::SeqCst);
        self.tally.lines.lock().unwrap().push(String::from(line));

        let (cmd, rest) = line.split_once(' ').unwrap_or((line, ""));
        let result = match cmd {
            "say" => {
                for c in rest.chars() {
                    let _ = out.write_char(c);
                    thread::yield_now();
                }
                let _ = out.write_char('\n');
                Dispatch::Ran(0)
            }
            "nap" => {
                thread::sleep(Duration::from_millis(rest.parse().unwrap_or(0)));
                Dispatch::Ran(0)
            }
            "exit" => Dispatch::Ran(rest.parse().unwrap_or(1)),
            _ => Dispatch::NotFound,
        };

        self.tally.active.fetch_sub(1, Ordering::SeqCst);
        result
    }
}

#[allow(dead_code)]
pub fn mock_executor(lock_timeout_ms: u32) -> (CommandExecutor<MockInterpreter>, Arc<Tally>) {
    let tally = Arc::new(Tally::default());
    let cfg = ConsoleConfig {
        lock_timeout_ms,
        ..ConsoleConfig::default()
    };
    let exec = CommandExecutor::new(
        MockInterpreter::new(Arc::clone(&tally)),
        Arc::new(History::new(cfg.history_len as usize)),
        &cfg,
    );
    (exec, tally)
}
