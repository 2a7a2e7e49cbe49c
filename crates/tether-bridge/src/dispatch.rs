//! Command lookup and failure containment.

use std::panic::{AssertUnwindSafe, catch_unwind};

use serde_json::{Value, json};
use tether::engine::panic_message;

use crate::{
    error::CommandError,
    gateway::{Emit, Request},
    handler::ServerState,
};

/// A command implementation.
///
/// `out` takes result lines that must precede the command's own result.
pub type Handler = fn(&mut ServerState, Request, &mut dyn Emit) -> Result<Value, CommandError>;

/// Command names and their handlers.
#[derive(Debug, Default, Clone)]
pub struct CommandTable {
    commands: Vec<(&'static str, Handler)>,
}

impl CommandTable {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `name`, replacing any handler already registered for it.
    pub fn register(&mut self, name: &'static str, handler: Handler) {
        match self.commands.iter_mut().find(|(existing, _)| *existing == name) {
            Some(entry) => entry.1 = handler,
            None => self.commands.push((name, handler)),
        }
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<Handler> {
        self.commands
            .iter()
            .find(|(existing, _)| *existing == name)
            .map(|(_, handler)| *handler)
    }

    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.commands.iter().map(|(name, _)| *name)
    }
}

/// Routes requests to handlers; never lets a failure escape.
#[derive(Debug)]
pub struct Dispatcher {
    commands: CommandTable,
    state: ServerState,
}

impl Dispatcher {
    #[must_use]
    pub fn new(commands: CommandTable, state: ServerState) -> Self {
        Self { commands, state }
    }

    #[must_use]
    pub fn state(&self) -> &ServerState {
        &self.state
    }

    /// Runs the command named by `request["type"]` and returns its result.
    ///
    /// Unknown commands, handler errors and handler panics all come back as
    /// `success: false` results.
    pub fn dispatch(&mut self, request: Request, out: &mut dyn Emit) -> Value {
        let name = match request.get("type") {
            Some(Value::String(name)) => name.clone(),
            Some(other) => other.to_string(),
            None => String::new(),
        };
        let Some(handler) = self.commands.get(&name) else {
            tracing::debug!(command = %name, "unknown command");
            return error_result(format!("Unknown query type: {name}"), Vec::new());
        };
        tracing::debug!(command = %name, "dispatching");
        let state = &mut self.state;
        match catch_unwind(AssertUnwindSafe(|| handler(state, request, out))) {
            Ok(Ok(result)) => result,
            Ok(Err(err)) => {
                tracing::debug!(command = %name, error = %err, "command failed");
                error_result(format!("{}: {err}", err.kind()), err.backtrace())
            }
            Err(payload) => {
                tracing::warn!(command = %name, "command panicked");
                match panic_message(payload.as_ref()) {
                    Some(message) => error_result(format!("Panic: {message}"), Vec::new()),
                    None => unknown_error(),
                }
            }
        }
    }
}

fn error_result(error: String, backtrace: Vec<String>) -> Value {
    json!({"success": false, "error": error, "backtrace": backtrace})
}

/// Last resort when a failure cannot even be described.
fn unknown_error() -> Value {
    json!({"success": false, "error": "(unknown error)", "backtrace": []})
}
