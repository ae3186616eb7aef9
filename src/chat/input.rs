use std::io::{self, BufRead};

use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;

/// Somewhere to read the user's next line from. `Ok(None)` means the
/// user is done (end of input or an interrupt).
pub trait LineSource {
    fn read_line(&mut self, prompt: &str) -> io::Result<Option<String>>;

    /// Whether `read_line` shows the prompt itself. When it doesn't, the
    /// caller writes the prompt to its own output.
    fn renders_prompt(&self) -> bool {
        false
    }
}

impl<T: LineSource + ?Sized> LineSource for Box<T> {
    fn read_line(&mut self, prompt: &str) -> io::Result<Option<String>> {
        (**self).read_line(prompt)
    }

    fn renders_prompt(&self) -> bool {
        (**self).renders_prompt()
    }
}

impl LineSource for DefaultEditor {
    fn read_line(&mut self, prompt: &str) -> io::Result<Option<String>> {
        match self.readline(prompt) {
            Ok(line) => {
                if !line.is_empty() {
                    // History is a convenience, failing to record it
                    // shouldn't end the chat
                    let _ = self.add_history_entry(line.as_str());
                }
                Ok(Some(line))
            }
            Err(ReadlineError::Interrupted) => Ok(None),
            Err(ReadlineError::Eof) => Ok(None),
            Err(ReadlineError::Io(err)) => Err(err),
            Err(err) => Err(io::Error::other(err.to_string())),
        }
    }

    fn renders_prompt(&self) -> bool {
        true
    }
}

/// Reads lines from any buffered reader, e.g. piped stdin or a
/// scripted conversation in tests. Prompts are left to the caller.
pub struct BufReadSource<R> {
    reader: R,
}

impl<R: BufRead> BufReadSource<R> {
    pub fn new(reader: R) -> Self {
        Self { reader }
    }
}

impl<R: BufRead> LineSource for BufReadSource<R> {
    fn read_line(&mut self, _prompt: &str) -> io::Result<Option<String>> {
        let mut line = String::new();
        if self.reader.read_line(&mut line)? == 0 {
            return Ok(None);
        }
        if line.ends_with('\n') {
            line.pop();
            if line.ends_with('\r') {
                line.pop();
            }
        }
        Ok(Some(line))
    }
}
