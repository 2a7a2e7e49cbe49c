//! Protocol handlers: JSON requests in, JSON results out.
//!
//! Each handler parses its own arguments, delegates to the typed `tether` API
//! and serializes the outcome. Failures are returned as [`CommandError`] and
//! turned into error results by the dispatcher.

use std::path::Path;

use serde::{Deserialize, de::DeserializeOwned};
use serde_json::{Value, json};
use tether::{
    CodeLoc, CollectConsole, Runtime,
    engine::Step,
    introspect::{Introspector, SymbolIndex},
    repl::ReplOptions,
    session_manager::{ReplLauncher, SessionError, SessionRegistry},
};

use crate::{
    dispatch::CommandTable,
    error::CommandError,
    gateway::{Emit, Request},
};

/// Location reported for `eval` requests that do not name one.
const DEFAULT_EVAL_FILE: &str = "(eval)";

// =============================================================================
// Server state
// =============================================================================

/// Process-wide state shared by all commands.
#[derive(Debug)]
pub struct ServerState {
    runtime: Runtime,
    sessions: SessionRegistry,
}

impl ServerState {
    #[must_use]
    pub fn new(runtime: Runtime, options: ReplOptions) -> Self {
        let sessions = SessionRegistry::new(ReplLauncher::new(runtime.clone(), options));
        Self { runtime, sessions }
    }

    #[must_use]
    pub fn runtime(&self) -> &Runtime {
        &self.runtime
    }

    #[must_use]
    pub fn sessions(&self) -> &SessionRegistry {
        &self.sessions
    }

    /// Evaluates a script file into the global environment.
    pub fn load_prelude(&self, path: &Path) -> Result<(), CommandError> {
        let source = std::fs::read_to_string(path)?;
        let mut console = CollectConsole::new();
        self.runtime
            .evaluate(&source, &CodeLoc::new(path.display().to_string(), 1), &mut console)?;
        if !console.output().is_empty() {
            tracing::debug!(path = %path.display(), output = console.output(), "prelude printed output");
        }
        Ok(())
    }
}

/// The commands understood by the bridge.
#[must_use]
pub fn standard_commands() -> CommandTable {
    let mut commands = CommandTable::new();
    commands.register("eval", eval_command);
    commands.register("search-doc", search_doc_command);
    commands.register("object-info", object_info_command);
    commands.register("repl-start", repl_start_command);
    commands.register("repl-handle", repl_handle_command);
    commands.register("repl-stop", repl_stop_command);
    commands.register("repl-complete", repl_complete_command);
    commands.register("repl-list", repl_list_command);
    commands
}

// =============================================================================
// Evaluation and introspection
// =============================================================================

fn eval_command(state: &mut ServerState, request: Request, _: &mut dyn Emit) -> Result<Value, CommandError> {
    #[derive(Deserialize)]
    struct Args {
        code: String,
        #[serde(default)]
        filename: Option<String>,
        #[serde(default)]
        line: Option<u32>,
    }

    let args: Args = parse_args("eval", request)?;
    let location = CodeLoc::new(
        args.filename.unwrap_or_else(|| DEFAULT_EVAL_FILE.to_owned()),
        args.line.unwrap_or(1),
    );
    let mut console = CollectConsole::new();
    let value = state.runtime.evaluate(&args.code, &location, &mut console)?;
    let mut result = json!({"success": true, "result": value.inspect()});
    let stdout = console.into_output();
    if !stdout.is_empty() {
        result["stdout"] = Value::String(stdout);
    }
    Ok(result)
}

fn search_doc_command(state: &mut ServerState, request: Request, _: &mut dyn Emit) -> Result<Value, CommandError> {
    #[derive(Deserialize)]
    struct Args {
        input: String,
    }

    let args: Args = parse_args("search-doc", request)?;
    let index = SymbolIndex::new(state.runtime.clone());
    let completions: Vec<String> = index.search(&args.input).collect();
    Ok(json!({"success": true, "completions": completions}))
}

fn object_info_command(state: &mut ServerState, request: Request, _: &mut dyn Emit) -> Result<Value, CommandError> {
    #[derive(Deserialize)]
    struct Args {
        symbol: String,
    }

    let args: Args = parse_args("object-info", request)?;
    let index = SymbolIndex::new(state.runtime.clone());
    let Some(info) = index.describe(&args.symbol) else {
        return Ok(failure(format!("Can't find object: {}", args.symbol)));
    };
    let mut result = json!({"success": true});
    if let (Some(fields), Value::Object(info)) = (
        result.as_object_mut(),
        serde_json::to_value(&info).map_err(CommandError::Encode)?,
    ) {
        fields.extend(info);
    }
    Ok(result)
}

// =============================================================================
// Sessions
// =============================================================================

fn repl_start_command(state: &mut ServerState, request: Request, _: &mut dyn Emit) -> Result<Value, CommandError> {
    #[derive(Deserialize)]
    struct Args {
        id: Value,
        object: String,
    }

    let args: Args = parse_args("repl-start", request)?;
    state.sessions.start(&session_key(&args.id), &args.object)?;
    Ok(json!({"success": true}))
}

/// Resumes a session with one line.
///
/// Every write of the session becomes a `write` result line, followed by one
/// `read` line carrying the next prompt. The returned final result says
/// `exited` instead when the session ended during this call.
fn repl_handle_command(state: &mut ServerState, request: Request, out: &mut dyn Emit) -> Result<Value, CommandError> {
    #[derive(Deserialize)]
    struct Args {
        id: Value,
        #[serde(default)]
        argument: String,
    }

    let args: Args = parse_args("repl-handle", request)?;
    let id = args.id;
    let mut emit_failure = None;
    let mut on_write = |text: &str| {
        if emit_failure.is_none()
            && let Err(err) = out.emit(&json!({"success": true, "repl-id": id, "type": "write", "string": text}))
        {
            emit_failure = Some(err);
        }
    };
    let step = state.sessions.handle(&session_key(&id), args.argument, &mut on_write);
    if let Some(err) = emit_failure {
        return Err(err.into());
    }
    match step {
        Ok(Step::Read(prompt)) => {
            out.emit(&json!({"success": true, "repl-id": id, "type": "read", "prompt": prompt}))?;
            Ok(json!({"success": true, "repl-id": id}))
        }
        Ok(Step::Finished) => Ok(json!({"success": true, "repl-id": id, "exited": true})),
        Err(SessionError::NotFound(_)) => {
            let mut result = not_found(&id);
            result["repl-id"] = id;
            Ok(result)
        }
        Err(err) => Err(err.into()),
    }
}

fn repl_stop_command(state: &mut ServerState, request: Request, _: &mut dyn Emit) -> Result<Value, CommandError> {
    #[derive(Deserialize)]
    struct Args {
        id: Value,
    }

    let args: Args = parse_args("repl-stop", request)?;
    state.sessions.stop(&session_key(&args.id));
    Ok(json!({"success": true}))
}

fn repl_complete_command(state: &mut ServerState, request: Request, _: &mut dyn Emit) -> Result<Value, CommandError> {
    #[derive(Deserialize)]
    struct Args {
        id: Value,
        #[serde(default)]
        word: String,
    }

    let args: Args = parse_args("repl-complete", request)?;
    match state.sessions.complete(&session_key(&args.id), &args.word) {
        Ok(completions) => Ok(json!({"success": true, "completions": completions})),
        Err(SessionError::NotFound(_)) => Ok(not_found(&args.id)),
        Err(err) => Err(err.into()),
    }
}

fn repl_list_command(state: &mut ServerState, _: Request, _: &mut dyn Emit) -> Result<Value, CommandError> {
    let sessions: Vec<Value> = state
        .sessions
        .list_sessions()
        .into_iter()
        .map(|info| {
            let id = serde_json::from_str(&info.id).unwrap_or(Value::String(info.id));
            json!({"id": id, "alive": info.alive, "state": info.state.to_string()})
        })
        .collect();
    Ok(json!({"success": true, "sessions": sessions}))
}

// =============================================================================
// Helpers
// =============================================================================

fn parse_args<T: DeserializeOwned>(command: &'static str, request: Request) -> Result<T, CommandError> {
    serde_json::from_value(Value::Object(request)).map_err(|source| CommandError::InvalidRequest { command, source })
}

/// A failure result that is not an exception.
fn failure(error: String) -> Value {
    json!({"success": false, "error": error, "backtrace": []})
}

fn not_found(id: &Value) -> Value {
    let shown = match id {
        Value::String(id) => id.clone(),
        other => other.to_string(),
    };
    failure(format!("No such REPL: {shown}"))
}

/// Registry key for a client id.
///
/// Ids may be any JSON value; the key is its JSON text, so `7` and `"7"` stay distinct.
fn session_key(id: &Value) -> String {
    id.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_keys_keep_json_types_apart() {
        assert_eq!(session_key(&json!("s1")), "\"s1\"");
        assert_eq!(session_key(&json!(7)), "7");
        assert_ne!(session_key(&json!("7")), session_key(&json!(7)));
        assert_eq!(session_key(&json!(null)), "null");
    }

    #[test]
    fn not_found_shows_ids_unquoted() {
        assert_eq!(not_found(&json!("s1"))["error"], json!("No such REPL: s1"));
        assert_eq!(not_found(&json!(7))["error"], json!("No such REPL: 7"));
    }
}
