//! Command registry: the interpreter behind every transport.
//!
//! Commands are registered with a name, help text, optional argument hint
//! and a handler. [`CommandRegistry::run`] splits a line into arguments,
//! looks up the first one and calls the handler with the remaining
//! arguments and the output sink.
//!
//! Argument splitting follows the usual console rules:
//!
//! ```text
//! set net.ap.ssid "Shop Floor"    → ["set", "net.ap.ssid", "Shop Floor"]
//! echo a\ b "q\"uote"             → ["echo", "a b", "q\"uote"]
//! ```

use core::fmt::{self, Write};

use crate::app::ports::Completion;
use crate::config::ConsoleConfig;

/// Interpreter dispatch outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dispatch {
    /// No command with that name.
    NotFound,
    /// Handler ran and returned this exit code.
    Ran(i32),
    /// The line could not be split into arguments.
    Invalid(&'static str),
}

/// A non-reentrant interpreter: given a command line, print into `out` and
/// report whether the command exists and how it exited.
pub trait Interpreter: Send {
    fn run(&mut self, line: &str, out: &mut dyn Write) -> Dispatch;
}

/// Handler signature: `argv[0]` is the command name.
pub type Handler = Box<dyn FnMut(&[&str], &mut dyn Write) -> i32 + Send>;

struct Command {
    name: String,
    help: String,
    hint: Option<String>,
    handler: Handler,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegisterError {
    EmptyName,
    InvalidName,
    Duplicate,
}

impl fmt::Display for RegisterError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyName => write!(f, "command name is empty"),
            Self::InvalidName => write!(f, "command name contains whitespace or quotes"),
            Self::Duplicate => write!(f, "command already registered"),
        }
    }
}

/// Name reserved for the built-in command listing.
const HELP: &str = "help";

pub struct CommandRegistry {
    /// Sorted by name.
    commands: Vec<Command>,
    max_len: usize,
    max_args: usize,
}

impl CommandRegistry {
    pub fn new(max_cmdline_len: usize, max_cmdline_args: usize) -> Self {
        Self {
            commands: Vec::new(),
            max_len: max_cmdline_len,
            max_args: max_cmdline_args.max(1),
        }
    }

    pub fn from_config(config: &ConsoleConfig) -> Self {
        Self::new(
            config.max_cmdline_len as usize,
            config.max_cmdline_args as usize,
        )
    }

    pub fn register<F>(
        &mut self,
        name: &str,
        help: &str,
        hint: Option<&str>,
        handler: F,
    ) -> Result<(), RegisterError>
    where
        F: FnMut(&[&str], &mut dyn Write) -> i32 + Send + 'static,
    {
        if name.is_empty() {
            return Err(RegisterError::EmptyName);
        }
        if name
            .chars()
            .any(|c| c.is_whitespace() || c == '"' || c == '\\')
        {
            return Err(RegisterError::InvalidName);
        }
        let pos = match self.commands.binary_search_by(|c| c.name.as_str().cmp(name)) {
            Ok(_) => return Err(RegisterError::Duplicate),
            Err(_) if name == HELP => return Err(RegisterError::Duplicate),
            Err(pos) => pos,
        };
        self.commands.insert(
            pos,
            Command {
                name: String::from(name),
                help: String::from(help),
                hint: hint.map(String::from),
                handler: Box::new(handler),
            },
        );
        Ok(())
    }

    pub fn contains(&self, name: &str) -> bool {
        name == HELP || self.find(name).is_some()
    }

    /// Registered command names, sorted, `help` included.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.commands.iter().map(|c| c.name.as_str()).collect();
        let pos = names.binary_search(&HELP).unwrap_or_else(|p| p);
        names.insert(pos, HELP);
        names
    }

    /// Names and hints for a line editor. Taken once the builtins are in,
    /// before the registry moves into the executor.
    pub fn index(&self) -> CommandIndex {
        CommandIndex {
            entries: self
                .names()
                .into_iter()
                .map(|n| (String::from(n), self.hint(n).map(String::from)))
                .collect(),
        }
    }

    /// Argument hint for `name`, if registered with one.
    pub fn hint(&self, name: &str) -> Option<&str> {
        self.find(name).and_then(|i| self.commands[i].hint.as_deref())
    }

    fn find(&self, name: &str) -> Option<usize> {
        self.commands
            .binary_search_by(|c| c.name.as_str().cmp(name))
            .ok()
    }

    fn print_help(&self, out: &mut dyn Write) {
        let _ = writeln!(out, "{}\n  Print the list of registered commands", HELP);
        for c in &self.commands {
            match &c.hint {
                Some(hint) => {
                    let _ = writeln!(out, "{} {}", c.name, hint);
                }
                None => {
                    let _ = writeln!(out, "{}", c.name);
                }
            }
            let _ = writeln!(out, "  {}", c.help);
        }
    }
}

impl Interpreter for CommandRegistry {
    fn run(&mut self, line: &str, out: &mut dyn Write) -> Dispatch {
        if line.len() > self.max_len {
            return Dispatch::Invalid("command line too long");
        }
        let args = match split_argv(line, self.max_args) {
            Ok(args) => args,
            Err(reason) => return Dispatch::Invalid(reason),
        };
        let Some(name) = args.first() else {
            return Dispatch::Invalid("empty command line");
        };
        if name == HELP {
            self.print_help(out);
            return Dispatch::Ran(0);
        }
        let Some(idx) = self.find(name) else {
            return Dispatch::NotFound;
        };
        let argv: Vec<&str> = args.iter().map(String::as_str).collect();
        Dispatch::Ran((self.commands[idx].handler)(&argv, out))
    }
}

/// Snapshot of command names and hints used for tab completion.
#[derive(Debug, Clone, Default)]
pub struct CommandIndex {
    /// Sorted by name.
    entries: Vec<(String, Option<String>)>,
}

impl CommandIndex {
    fn find(&self, name: &str) -> Option<&(String, Option<String>)> {
        self.entries
            .binary_search_by(|(n, _)| n.as_str().cmp(name))
            .ok()
            .map(|i| &self.entries[i])
    }
}

impl Completion for CommandIndex {
    /// Only the command name is completed; once an argument has started
    /// there are no candidates.
    fn complete(&self, line: &str) -> Vec<String> {
        let prefix = line.trim_start();
        if prefix.contains(char::is_whitespace) {
            return Vec::new();
        }
        self.entries
            .iter()
            .filter(|(n, _)| n.starts_with(prefix))
            .map(|(n, _)| n.clone())
            .collect()
    }

    fn hint(&self, line: &str) -> Option<String> {
        let name = line.split_whitespace().next()?;
        self.find(name).and_then(|(_, hint)| hint.clone())
    }
}

/// Split a command line into arguments.
///
/// Whitespace separates arguments; double quotes group; a backslash makes
/// the next character literal (inside or outside quotes).
pub fn split_argv(line: &str, max_args: usize) -> Result<Vec<String>, &'static str> {
    let mut args = Vec::new();
    let mut current = String::new();
    let mut in_arg = false;
    let mut quoted = false;
    let mut chars = line.chars();

    while let Some(c) = chars.next() {
        match c {
            '\\' => {
                let Some(next) = chars.next() else {
                    return Err("trailing backslash");
                };
                current.push(next);
                in_arg = true;
            }
            '"' => {
                quoted = !quoted;
                in_arg = true;
            }
            c if c.is_whitespace() && !quoted => {
                if in_arg {
                    if args.len() == max_args {
                        return Err("too many arguments");
                    }
                    args.push(core::mem::take(&mut current));
                    in_arg = false;
                }
            }
            c => {
                current.push(c);
                in_arg = true;
            }
        }
    }
    if quoted {
        return Err("unterminated quote");
    }
    if in_arg {
        if args.len() == max_args {
            return Err("too many arguments");
        }
        args.push(current);
    }
    Ok(args)
}
