#![doc = include_str!("../../../README.md")]

mod builtins;
pub mod docstring;
pub mod engine;
mod exception;
mod expressions;
mod function;
mod interp;
pub mod introspect;
mod io;
mod lexer;
mod parse;
pub mod repl;
mod runtime;
pub mod session_manager;
mod value;

pub use crate::{
    builtins::{Arity, Constant, NativeFn, NativeLocation, TypeDef, TypeKind, TypeTable, Visibility, types},
    exception::{CodeLoc, ExcKind, Exception, RunResult, StackFrame},
    function::UserFunction,
    io::{CollectConsole, Completer, Console, ConsoleClosed, ConsoleEvent, ScriptedConsole, StdConsole},
    lexer::needs_more_input,
    parse::MAX_NESTING_DEPTH,
    runtime::{Binding, DEFAULT_MAX_CALL_DEPTH, Limits, Runtime},
    value::{Callable, MAX_VALUE_DEPTH, Value},
};
