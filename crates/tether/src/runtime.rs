//! Process-wide interpreter state and the entry points that evaluate code.

use std::{
    sync::{Arc, Mutex, MutexGuard, PoisonError},
    time::Duration,
};

use ahash::AHashMap;
use indexmap::IndexMap;

use crate::{
    exception::{CodeLoc, RunResult},
    function::UserFunction,
    interp::Interp,
    io::Console,
    parse::parse,
    value::Value,
};

/// Recommended maximum call depth if not otherwise specified.
pub const DEFAULT_MAX_CALL_DEPTH: usize = 200;

/// Limits applied to every evaluation on a [`Runtime`].
///
/// Build custom limits with the builder methods:
///
/// ```
/// use std::time::Duration;
/// let limits = tether::Limits::new()
///     .max_call_depth(64)
///     .max_duration(Duration::from_secs(2));
/// assert_eq!(limits.max_call_depth, 64);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Limits {
    /// Maximum nesting of function calls before `SystemStackError`.
    pub max_call_depth: usize,
    /// Wall-clock budget for one evaluation; time spent waiting for input is not counted.
    pub max_duration: Option<Duration>,
}

impl Default for Limits {
    fn default() -> Self {
        Self::new()
    }
}

impl Limits {
    #[must_use]
    pub fn new() -> Self {
        Self {
            max_call_depth: DEFAULT_MAX_CALL_DEPTH,
            max_duration: None,
        }
    }

    /// Sets the maximum call depth.
    #[must_use]
    pub fn max_call_depth(mut self, limit: usize) -> Self {
        self.max_call_depth = limit;
        self
    }

    /// Sets the per-evaluation time budget.
    #[must_use]
    pub fn max_duration(mut self, limit: Duration) -> Self {
        self.max_duration = Some(limit);
        self
    }
}

/// Global variables and user functions, shared by every evaluation.
#[derive(Debug, Default)]
pub(crate) struct Globals {
    pub vars: AHashMap<String, Value>,
    pub functions: IndexMap<String, Arc<UserFunction>>,
}

#[derive(Debug)]
struct Shared {
    globals: Mutex<Globals>,
    limits: Limits,
}

/// Handle to one interpreter instance.
///
/// Cloning is cheap; clones share the same globals. Locks on the globals are held
/// only for single lookups or updates, never while a script runs console I/O, so
/// a session parked on input never blocks `eval` or other sessions.
#[derive(Debug, Clone)]
pub struct Runtime {
    shared: Arc<Shared>,
}

impl Default for Runtime {
    fn default() -> Self {
        Self::new(Limits::default())
    }
}

impl Runtime {
    #[must_use]
    pub fn new(limits: Limits) -> Self {
        Self {
            shared: Arc::new(Shared {
                globals: Mutex::new(Globals::default()),
                limits,
            }),
        }
    }

    #[must_use]
    pub fn limits(&self) -> &Limits {
        &self.shared.limits
    }

    pub(crate) fn globals(&self) -> MutexGuard<'_, Globals> {
        // a panic while holding the lock leaves the maps themselves consistent
        self
            .shared
            .globals
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Evaluates `code` at top level, where `let` and assignments bind globals.
    pub fn evaluate(&self, code: &str, location: &CodeLoc, console: &mut dyn Console) -> RunResult<Value> {
        self.evaluate_in(&mut Binding::top_level(), code, location, console)
    }

    /// Evaluates `code` inside `binding`, keeping its locals for the next call.
    pub fn evaluate_in(
        &self,
        binding: &mut Binding,
        code: &str,
        location: &CodeLoc,
        console: &mut dyn Console,
    ) -> RunResult<Value> {
        let program = parse(code, location)?;
        let locals = binding.locals.take();
        let mut interp = Interp::new(self, console, binding.receiver.clone(), &binding.label, location, locals);
        let result = interp.run(&program);
        binding.locals = interp.into_locals();
        result
    }

    #[must_use]
    pub fn global(&self, name: &str) -> Option<Value> {
        self.globals().vars.get(name).cloned()
    }

    pub fn set_global(&self, name: impl Into<String>, value: Value) {
        self.globals().vars.insert(name.into(), value);
    }

    #[must_use]
    pub fn function(&self, name: &str) -> Option<Arc<UserFunction>> {
        self.globals().functions.get(name).cloned()
    }

    /// User functions in definition order.
    #[must_use]
    pub fn functions(&self) -> Vec<Arc<UserFunction>> {
        self.globals().functions.values().cloned().collect()
    }

    /// Names of all global variables, sorted.
    #[must_use]
    pub fn global_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.globals().vars.keys().cloned().collect();
        names.sort_unstable();
        names
    }
}

/// An evaluation context: what `self` is, plus private local variables.
///
/// A top-level binding has no locals of its own: `let` and assignments write
/// globals. Bindings created with [`Binding::new`] keep their locals across
/// evaluations, which is what an interactive session needs.
#[derive(Debug, Clone)]
pub struct Binding {
    receiver: Value,
    label: String,
    locals: Option<AHashMap<String, Value>>,
}

impl Binding {
    /// The top-level binding: `self` is nil and labelled `main`.
    #[must_use]
    pub fn top_level() -> Self {
        Self {
            receiver: Value::Nil,
            label: "main".to_owned(),
            locals: None,
        }
    }

    /// A binding on `receiver` with its own empty locals.
    #[must_use]
    pub fn new(receiver: Value) -> Self {
        let label = match &receiver {
            Value::Nil => "main".to_owned(),
            other => short_label(&other.inspect()),
        };
        Self {
            receiver,
            label,
            locals: Some(AHashMap::new()),
        }
    }

    #[must_use]
    pub fn receiver(&self) -> &Value {
        &self.receiver
    }

    /// Short description of `self` for prompts and error messages.
    #[must_use]
    pub fn label(&self) -> &str {
        &self.label
    }

    #[must_use]
    pub fn local(&self, name: &str) -> Option<&Value> {
        self.locals.as_ref()?.get(name)
    }

    /// Sets a local; a top-level binding ignores it.
    pub fn set_local(&mut self, name: impl Into<String>, value: Value) {
        if let Some(locals) = &mut self.locals {
            locals.insert(name.into(), value);
        }
    }

    /// Local variable names, sorted.
    #[must_use]
    pub fn local_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.locals.iter().flat_map(|locals| locals.keys().cloned()).collect();
        names.sort_unstable();
        names
    }
}

/// Longest `self` description shown in prompts.
const MAX_LABEL_CHARS: usize = 24;

fn short_label(text: &str) -> String {
    if text.chars().count() <= MAX_LABEL_CHARS {
        return text.to_owned();
    }
    let mut label: String = text.chars().take(MAX_LABEL_CHARS - 3).collect();
    label.push_str("...");
    label
}
