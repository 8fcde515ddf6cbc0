//! Line editor over a byte stream.
//!
//! On ESP-IDF stdin/stdout are routed to the UART (or USB-serial-JTAG)
//! console by the VFS layer, so plain buffered I/O is enough for the REPL.
//! The terminal echoes what is typed; the editor only writes what it
//! changes itself.
//!
//! | Key            | Effect                                             |
//! |----------------|----------------------------------------------------|
//! | Backspace, DEL | erase the last character                           |
//! | Tab            | complete the command name, or show its argument hint |
//! | Up / Down      | recall earlier / later history entries             |

use std::collections::VecDeque;
use std::io::{self, BufRead, Write};
use std::sync::Arc;

use crate::app::ports::{Completion, LineEditor};

/// Lines kept for recall.
const RECALL_LEN: usize = 100;

const BACKSPACE: u8 = 0x08;
const DEL: u8 = 0x7f;
const ESC: u8 = 0x1b;

pub struct StdioLineEditor<R: BufRead, W: Write> {
    input: R,
    output: W,
    completion: Option<Arc<dyn Completion>>,
    recall: VecDeque<String>,
}

impl<R: BufRead, W: Write> StdioLineEditor<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self {
            input,
            output,
            completion: None,
            recall: VecDeque::new(),
        }
    }

    pub fn into_inner(self) -> (R, W) {
        (self.input, self.output)
    }

    fn next_byte(&mut self) -> io::Result<Option<u8>> {
        loop {
            let byte = match self.input.fill_buf() {
                Ok(buf) => buf.first().copied(),
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            };
            if byte.is_some() {
                self.input.consume(1);
            }
            return Ok(byte);
        }
    }

    /// Erase the current line on the terminal and write it again.
    fn redraw(&mut self, prompt: &str, line: &[u8]) -> io::Result<()> {
        self.output.write_all(b"\r\x1b[K")?;
        self.output.write_all(prompt.as_bytes())?;
        self.output.write_all(line)?;
        self.output.flush()
    }

    fn complete(&mut self, prompt: &str, line: &mut Vec<u8>) -> io::Result<()> {
        let Some(source) = self.completion.clone() else {
            return Ok(());
        };
        let text = String::from_utf8_lossy(line).into_owned();
        let candidates = source.complete(&text);
        let typed = text.trim_start();

        match candidates.as_slice() {
            [] => {
                if let Some(hint) = source.hint(&text) {
                    let name = typed.split_whitespace().next().unwrap_or_default();
                    write!(self.output, "\n{} {}\n", name, hint)?;
                    self.redraw(prompt, line)?;
                }
            }
            [only] => {
                let Some(rest) = only.strip_prefix(typed) else {
                    return Ok(());
                };
                let mut rest = String::from(rest);
                rest.push(' ');
                line.extend_from_slice(rest.as_bytes());
                self.output.write_all(rest.as_bytes())?;
                self.output.flush()?;
            }
            many => {
                let common = common_prefix(many);
                let rest = common.strip_prefix(typed).unwrap_or_default();
                if !rest.is_empty() {
                    line.extend_from_slice(rest.as_bytes());
                    self.output.write_all(rest.as_bytes())?;
                    self.output.flush()?;
                } else {
                    write!(self.output, "\n{}\n", many.join("  "))?;
                    self.redraw(prompt, line)?;
                }
            }
        }
        Ok(())
    }

    /// Handle `ESC [ A` / `ESC [ B`. Other sequences are swallowed.
    fn escape(
        &mut self,
        prompt: &str,
        line: &mut Vec<u8>,
        cursor: &mut usize,
    ) -> io::Result<()> {
        if self.next_byte()? != Some(b'[') {
            return Ok(());
        }
        let target = match self.next_byte()? {
            Some(b'A') if *cursor > 0 => *cursor - 1,
            Some(b'B') if *cursor < self.recall.len() => *cursor + 1,
            _ => return Ok(()),
        };
        *cursor = target;
        line.clear();
        if let Some(entry) = self.recall.get(target) {
            line.extend_from_slice(entry.as_bytes());
        }
        self.redraw(prompt, line)
    }
}

impl StdioLineEditor<io::StdinLock<'static>, io::Stdout> {
    /// Editor over the process stdin/stdout.
    pub fn stdio() -> Self {
        Self::new(io::stdin().lock(), io::stdout())
    }
}

impl<R: BufRead, W: Write> LineEditor for StdioLineEditor<R, W> {
    fn read_line(&mut self, prompt: &str) -> io::Result<Option<String>> {
        self.output.write_all(prompt.as_bytes())?;
        self.output.flush()?;

        let mut line = Vec::new();
        let mut cursor = self.recall.len();
        let mut any = false;
        loop {
            let Some(byte) = self.next_byte()? else {
                if !any {
                    return Ok(None);
                }
                break;
            };
            any = true;
            match byte {
                b'\n' => break,
                b'\r' => {}
                BACKSPACE | DEL => pop_char(&mut line),
                b'\t' => self.complete(prompt, &mut line)?,
                ESC => self.escape(prompt, &mut line, &mut cursor)?,
                b => line.push(b),
            }
        }
        Ok(Some(String::from_utf8_lossy(&line).into_owned()))
    }

    fn print(&mut self, text: &str) -> io::Result<()> {
        self.output.write_all(text.as_bytes())?;
        self.output.flush()
    }

    fn add_history(&mut self, line: &str) {
        if self.recall.back().is_some_and(|last| last == line) {
            return;
        }
        if self.recall.len() == RECALL_LEN {
            self.recall.pop_front();
        }
        self.recall.push_back(String::from(line));
    }

    fn set_completion(&mut self, source: Arc<dyn Completion>) {
        self.completion = Some(source);
    }
}

/// Drop the last UTF-8 character, continuation bytes included.
fn pop_char(line: &mut Vec<u8>) {
    while let Some(b) = line.pop() {
        if b & 0xC0 != 0x80 {
            break;
        }
    }
}

fn common_prefix(words: &[String]) -> &str {
    let Some((first, rest)) = words.split_first() else {
        return "";
    };
    let mut len = first.len();
    for w in rest {
        len = first
            .bytes()
            .zip(w.bytes())
            .take(len)
            .take_while(|(a, b)| a == b)
            .count();
    }
    while !first.is_char_boundary(len) {
        len -= 1;
    }
    &first[..len]
}
