//! Read–execute–print loop over a [`LineEditor`].

use std::io;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use log::info;

use super::executor::CommandExecutor;
use super::registry::Interpreter;
use crate::app::ports::{Completion, LineEditor};

pub struct Repl<'a, I: Interpreter, E: LineEditor> {
    executor: &'a CommandExecutor<I>,
    editor: E,
    prompt: String,
}

impl<'a, I: Interpreter, E: LineEditor> Repl<'a, I, E> {
    pub fn new(executor: &'a CommandExecutor<I>, editor: E, prompt: &str) -> Self {
        Self {
            executor,
            editor,
            prompt: String::from(prompt),
        }
    }

    /// Install the tab-completion source, usually
    /// [`CommandRegistry::index`](super::registry::CommandRegistry::index).
    pub fn with_completion(mut self, source: Arc<dyn Completion>) -> Self {
        self.editor.set_completion(source);
        self
    }

    /// Offer earlier lines (e.g. restored history) for recall.
    pub fn seed_history<'l>(&mut self, lines: impl IntoIterator<Item = &'l str>) {
        for line in lines {
            self.editor.add_history(line);
        }
    }

    /// Read one line, run it and print the result. Returns `false` at end
    /// of input.
    pub fn run_once(&mut self) -> io::Result<bool> {
        let Some(line) = self.editor.read_line(&self.prompt)? else {
            return Ok(false);
        };
        if line.trim().is_empty() {
            return Ok(true);
        }
        self.editor.add_history(&line);
        let text = self.executor.execute(&line).into_text();
        if !text.is_empty() {
            self.editor.print(&text)?;
            self.editor.print("\n")?;
        }
        Ok(true)
    }

    /// Loop until `stop` is set or input ends.
    pub fn run(&mut self, stop: &AtomicBool) -> io::Result<()> {
        info!("REPL: console started");
        while !stop.load(Ordering::Relaxed) {
            if !self.run_once()? {
                break;
            }
        }
        info!("REPL: console stopped");
        Ok(())
    }

    pub fn into_editor(self) -> E {
        self.editor
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::fmt::Write as _;
    use crate::config::ConsoleConfig;
    use crate::console::history::History;
    use crate::console::registry::CommandRegistry;
    use std::collections::VecDeque;

    #[derive(Default)]
    struct Scripted {
        input: VecDeque<&'static str>,
        shown: String,
        prompts: usize,
        recalled: Vec<String>,
        completion: Option<Arc<dyn Completion>>,
    }

    impl LineEditor for Scripted {
        fn read_line(&mut self, _prompt: &str) -> io::Result<Option<String>> {
            self.prompts += 1;
            Ok(self.input.pop_front().map(String::from))
        }

        fn print(&mut self, text: &str) -> io::Result<()> {
            self.shown.push_str(text);
            Ok(())
        }

        fn add_history(&mut self, line: &str) {
            self.recalled.push(String::from(line));
        }

        fn set_completion(&mut self, source: Arc<dyn Completion>) {
            self.completion = Some(source);
        }
    }

    fn executor() -> CommandExecutor<CommandRegistry> {
        let mut reg = CommandRegistry::new(128, 8);
        reg.register("hi", "Say hi", None, |_, out| {
            let _ = writeln!(out, "hello");
            0
        })
        .unwrap();
        reg.register("nop", "Nothing", None, |_, _| 0).unwrap();
        CommandExecutor::new(reg, Arc::new(History::new(8)), &ConsoleConfig::default())
    }

    #[test]
    fn prints_output_and_status_text() {
        let exec = executor();
        let editor = Scripted {
            input: VecDeque::from(["hi", "", "nop", "what"]),
            ..Scripted::default()
        };
        let mut repl = Repl::new(&exec, editor, "> ");
        repl.run(&AtomicBool::new(false)).unwrap();
        let editor = repl.into_editor();
        assert_eq!(editor.shown, "hello\nUnrecognized command\n");
        // Four lines plus the end-of-input read.
        assert_eq!(editor.prompts, 5);
    }

    #[test]
    fn stop_flag_ends_loop_before_reading() {
        let exec = executor();
        let editor = Scripted {
            input: VecDeque::from(["hi"]),
            ..Scripted::default()
        };
        let mut repl = Repl::new(&exec, editor, "> ");
        repl.run(&AtomicBool::new(true)).unwrap();
        assert_eq!(repl.into_editor().prompts, 0);
    }

    #[test]
    fn entered_lines_offered_for_recall() {
        let exec = executor();
        let editor = Scripted {
            input: VecDeque::from(["hi", "  ", "what"]),
            ..Scripted::default()
        };
        let mut repl = Repl::new(&exec, editor, "> ");
        repl.seed_history(["nop"]);
        repl.run(&AtomicBool::new(false)).unwrap();
        assert_eq!(repl.into_editor().recalled, ["nop", "hi", "what"]);
    }

    #[test]
    fn completion_source_reaches_editor() {
        let mut reg = CommandRegistry::new(128, 8);
        reg.register("hi", "Say hi", Some("[name]"), |_, _| 0).unwrap();
        let index = Arc::new(reg.index());
        let exec = CommandExecutor::new(reg, Arc::new(History::new(8)), &ConsoleConfig::default());

        let repl = Repl::new(&exec, Scripted::default(), "> ").with_completion(index);
        let source = repl.into_editor().completion.unwrap();
        assert_eq!(source.complete("h"), ["help", "hi"]);
        assert_eq!(source.hint("hi "), Some(String::from("[name]")));
    }
}
