use std::{
    io::{self, BufRead, Write},
    sync::Arc,
};

use thiserror::Error;

/// Returned by [`Console::write`] once the other end of the console has gone away.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("console closed")]
pub struct ConsoleClosed;

/// Completion callback installed by an interactive backend.
///
/// Called with the word under the cursor; returns candidate replacements.
pub type Completer = Arc<dyn Fn(&str) -> Vec<String> + Send + Sync>;

/// Line-oriented, blocking console abstraction.
///
/// Everything that performs script I/O goes through this trait: the `puts`/`gets`
/// builtins, and the interactive REPL itself. Implementations decide what "blocking"
/// means: [`StdConsole`] waits on the terminal, the session engine parks the calling
/// worker until the client supplies the next line.
pub trait Console {
    /// Emits one chunk of text.
    ///
    /// Each call is a separate write event for consumers that observe them, so callers
    /// should not batch unrelated output into one call.
    ///
    /// # Errors
    /// [`ConsoleClosed`] when nobody is listening any more; the caller should stop.
    fn write(&mut self, text: &str) -> Result<(), ConsoleClosed>;

    /// Shows `prompt` and blocks until a line of input is available.
    ///
    /// # Arguments
    /// * `prompt` - Text shown before the input; may be empty
    ///
    /// # Returns
    /// The line without its trailing newline, or `None` at end of input.
    fn read_line(&mut self, prompt: &str) -> Option<String>;

    /// Offers a completion callback to whoever drives this console.
    ///
    /// Consoles that cannot complete ignore it.
    fn set_completer(&mut self, completer: Completer) {
        let _ = completer;
    }

    /// Writes `line` followed by exactly one newline.
    fn puts(&mut self, line: &str) -> Result<(), ConsoleClosed> {
        let mut text = line.strip_suffix('\n').unwrap_or(line).to_owned();
        text.push('\n');
        self.write(&text)
    }
}

/// Console bound to the process's stdin and stdout.
///
/// Used by the `tether-repl` binary; never by the stdio bridge, whose stdout
/// carries protocol lines.
#[derive(Debug, Default)]
pub struct StdConsole;

impl Console for StdConsole {
    fn write(&mut self, text: &str) -> Result<(), ConsoleClosed> {
        let mut stdout = io::stdout().lock();
        stdout.write_all(text.as_bytes()).map_err(|_| ConsoleClosed)?;
        stdout.flush().map_err(|_| ConsoleClosed)
    }

    fn read_line(&mut self, prompt: &str) -> Option<String> {
        self.write(prompt).ok()?;
        let mut line = String::new();
        match io::stdin().lock().read_line(&mut line) {
            Ok(0) | Err(_) => None,
            Ok(_) => {
                let trimmed = line.trim_end_matches(['\r', '\n']).len();
                line.truncate(trimmed);
                Some(line)
            }
        }
    }
}

/// A console that collects all output into a string and has no input.
///
/// Useful for capturing script output programmatically, as the `eval` command does.
#[derive(Debug, Default)]
pub struct CollectConsole(String);

impl CollectConsole {
    #[must_use]
    pub fn new() -> Self {
        Self(String::new())
    }

    /// Returns the collected output as a string slice.
    #[must_use]
    pub fn output(&self) -> &str {
        self.0.as_str()
    }

    /// Consumes the console and returns the collected output.
    #[must_use]
    pub fn into_output(self) -> String {
        self.0
    }
}

impl Console for CollectConsole {
    fn write(&mut self, text: &str) -> Result<(), ConsoleClosed> {
        self.0.push_str(text);
        Ok(())
    }

    fn read_line(&mut self, _prompt: &str) -> Option<String> {
        None
    }
}

/// A console with scripted input that records every event in order.
///
/// Each write and each prompt becomes one [`ConsoleEvent`]; reads pop from the
/// scripted lines and return `None` once they run out. Handy in tests of code
/// written against [`Console`].
#[derive(Debug, Default)]
pub struct ScriptedConsole {
    input: std::collections::VecDeque<String>,
    events: Vec<ConsoleEvent>,
}

/// One observed interaction with a [`ScriptedConsole`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsoleEvent {
    Write(String),
    Read(String),
}

impl ScriptedConsole {
    #[must_use]
    pub fn new<I, S>(input: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            input: input.into_iter().map(Into::into).collect(),
            events: Vec::new(),
        }
    }

    #[must_use]
    pub fn events(&self) -> &[ConsoleEvent] {
        &self.events
    }

    /// Concatenation of all written text.
    #[must_use]
    pub fn output(&self) -> String {
        self.events
            .iter()
            .filter_map(|event| match event {
                ConsoleEvent::Write(text) => Some(text.as_str()),
                ConsoleEvent::Read(_) => None,
            })
            .collect()
    }
}

impl Console for ScriptedConsole {
    fn write(&mut self, text: &str) -> Result<(), ConsoleClosed> {
        self.events.push(ConsoleEvent::Write(text.to_owned()));
        Ok(())
    }

    fn read_line(&mut self, prompt: &str) -> Option<String> {
        self.events.push(ConsoleEvent::Read(prompt.to_owned()));
        self.input.pop_front()
    }
}
