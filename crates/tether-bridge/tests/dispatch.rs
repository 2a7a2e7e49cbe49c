use pretty_assertions::assert_eq;
use serde_json::{Value, json};
use tether::{Exception, ExcKind, Runtime, repl::ReplOptions};
use tether_bridge::{
    dispatch::{CommandTable, Dispatcher},
    error::CommandError,
    gateway::{Emit, Request},
    handler::{ServerState, standard_commands},
};

fn state() -> ServerState {
    ServerState::new(Runtime::default(), ReplOptions::default())
}

fn request(value: Value) -> Request {
    match value {
        Value::Object(request) => request,
        other => panic!("not an object: {other}"),
    }
}

fn panicking(_: &mut ServerState, _: Request, _: &mut dyn Emit) -> Result<Value, CommandError> {
    panic!("handler exploded")
}

fn panicking_without_message(_: &mut ServerState, _: Request, _: &mut dyn Emit) -> Result<Value, CommandError> {
    std::panic::panic_any(17_u8)
}

fn raising(_: &mut ServerState, _: Request, _: &mut dyn Emit) -> Result<Value, CommandError> {
    Err(Exception::new(ExcKind::RuntimeError, "nope").into())
}

fn streaming(_: &mut ServerState, request: Request, out: &mut dyn Emit) -> Result<Value, CommandError> {
    out.emit(&json!({"partial": request["n"]}))?;
    Ok(json!({"success": true}))
}

fn ok(_: &mut ServerState, _: Request, _: &mut dyn Emit) -> Result<Value, CommandError> {
    Ok(json!({"success": true, "which": "second"}))
}

#[test]
fn failures_never_escape() {
    let mut commands = CommandTable::new();
    commands.register("panic", panicking);
    commands.register("opaque", panicking_without_message);
    commands.register("raise", raising);
    let mut dispatcher = Dispatcher::new(commands, state());
    let mut out: Vec<Value> = Vec::new();

    assert_eq!(
        dispatcher.dispatch(request(json!({"type": "panic"})), &mut out),
        json!({"success": false, "error": "Panic: handler exploded", "backtrace": []})
    );
    assert_eq!(
        dispatcher.dispatch(request(json!({"type": "opaque"})), &mut out),
        json!({"success": false, "error": "(unknown error)", "backtrace": []})
    );
    assert_eq!(
        dispatcher.dispatch(request(json!({"type": "raise"})), &mut out),
        json!({"success": false, "error": "RuntimeError: nope", "backtrace": []})
    );
    assert!(out.is_empty());
}

#[test]
fn handlers_can_stream_before_their_result() {
    let mut commands = CommandTable::new();
    commands.register("stream", streaming);
    let mut dispatcher = Dispatcher::new(commands, state());
    let mut out: Vec<Value> = Vec::new();
    let result = dispatcher.dispatch(request(json!({"type": "stream", "n": 1})), &mut out);
    assert_eq!(result, json!({"success": true}));
    assert_eq!(out, vec![json!({"partial": 1})]);
}

#[test]
fn registering_twice_replaces() {
    let mut commands = CommandTable::new();
    commands.register("x", raising);
    commands.register("x", ok);
    assert_eq!(commands.names().collect::<Vec<_>>(), vec!["x"]);
    let mut dispatcher = Dispatcher::new(commands, state());
    let result = dispatcher.dispatch(request(json!({"type": "x"})), &mut Vec::<Value>::new());
    assert_eq!(result["which"], json!("second"));
}

#[test]
fn standard_command_set() {
    let names: Vec<&str> = standard_commands().names().collect();
    assert_eq!(
        names,
        vec![
            "eval",
            "search-doc",
            "object-info",
            "repl-start",
            "repl-handle",
            "repl-stop",
            "repl-complete",
            "repl-list",
        ]
    );
}

#[test]
fn dispatcher_survives_a_panicking_command() {
    let mut commands = standard_commands();
    commands.register("panic", panicking);
    let mut dispatcher = Dispatcher::new(commands, state());
    let mut out: Vec<Value> = Vec::new();
    dispatcher.dispatch(request(json!({"type": "panic"})), &mut out);
    let result = dispatcher.dispatch(request(json!({"type": "eval", "code": "1 + 1"})), &mut out);
    assert_eq!(result, json!({"success": true, "result": "2"}));
}
