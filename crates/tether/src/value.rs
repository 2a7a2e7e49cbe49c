use std::{cmp::Ordering, fmt, sync::Arc};

use indexmap::IndexMap;

use crate::{
    builtins::{NativeFn, TypeDef, types},
    exception::{Exception, RunResult},
    function::UserFunction,
};

/// Maximum nesting depth rendered by `inspect` before eliding with `...`.
const MAX_INSPECT_DEPTH: usize = 64;

/// Maximum nesting of lists and maps inside a single value.
///
/// Dropping, cloning and comparing values recurse once per level, so a value
/// nested past this point raises `SystemStackError` when it is built.
pub const MAX_VALUE_DEPTH: usize = 1000;

/// A runtime value of the scripting language.
///
/// Values are plain data: lists and maps are copied on assignment, so a value handed
/// to a session or returned to the host never aliases interpreter state.
#[derive(Debug, Clone)]
pub enum Value {
    Nil,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    List(Vec<Value>),
    Map(IndexMap<String, Value>),
    /// A builtin class or module, e.g. `Math` or `String`.
    Type(&'static TypeDef),
    Function(Callable),
}

/// Something that can be applied to arguments.
#[derive(Debug, Clone)]
pub enum Callable {
    /// A builtin function, reached as a class method of `owner`.
    Native {
        owner: &'static TypeDef,
        func: &'static NativeFn,
    },
    User(Arc<UserFunction>),
}

impl Callable {
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Self::Native { func, .. } => func.name,
            Self::User(function) => &function.name,
        }
    }

    #[must_use]
    pub fn qualified_name(&self) -> String {
        match self {
            Self::Native { owner, func } => format!("{}.{}", owner.name, func.name),
            Self::User(function) => function.name.clone(),
        }
    }

    /// Returns `(min, max)` accepted positional arguments; `max` is `None` for variadics.
    #[must_use]
    pub fn arity(&self) -> (usize, Option<usize>) {
        match self {
            Self::Native { func, .. } => (func.arity.min, func.arity.max),
            Self::User(function) => (function.params.len(), Some(function.params.len())),
        }
    }

    #[must_use]
    pub fn signature(&self) -> String {
        match self {
            Self::Native { func, .. } => func.signature.to_owned(),
            Self::User(function) => function.signature(),
        }
    }
}

impl PartialEq for Callable {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Native { func: a, .. }, Self::Native { func: b, .. }) => std::ptr::eq(*a, *b),
            (Self::User(a), Self::User(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl Value {
    #[must_use]
    pub fn str(text: impl Into<String>) -> Self {
        Self::Str(text.into())
    }

    /// Returns the builtin class of this value.
    #[must_use]
    pub fn type_def(&self) -> &'static TypeDef {
        let table = types();
        match self {
            Self::Nil => &table.nil,
            Self::Bool(_) => &table.boolean,
            Self::Int(_) => &table.integer,
            Self::Float(_) => &table.float,
            Self::Str(_) => &table.string,
            Self::List(_) => &table.list,
            Self::Map(_) => &table.map,
            Self::Type(_) => &table.module,
            Self::Function(_) => &table.function,
        }
    }

    #[must_use]
    pub fn type_name(&self) -> &'static str {
        self.type_def().name
    }

    /// Whether lists and maps nest more than `limit` levels deep.
    ///
    /// Recurses at most `limit` levels, however deep the value actually is.
    #[must_use]
    pub fn nests_deeper_than(&self, limit: usize) -> bool {
        match self {
            Self::List(items) => limit == 0 || items.iter().any(|item| item.nests_deeper_than(limit - 1)),
            Self::Map(map) => limit == 0 || map.values().any(|value| value.nests_deeper_than(limit - 1)),
            _ => false,
        }
    }

    /// Only `nil` and `false` are falsy.
    #[must_use]
    pub fn truthy(&self) -> bool {
        !matches!(self, Self::Nil | Self::Bool(false))
    }

    /// Developer-facing representation, as printed by the REPL after `=>`.
    #[must_use]
    pub fn inspect(&self) -> String {
        let mut out = String::new();
        self.inspect_into(&mut out, 0);
        out
    }

    fn inspect_into(&self, out: &mut String, depth: usize) {
        if depth > MAX_INSPECT_DEPTH {
            out.push_str("...");
            return;
        }
        match self {
            Self::Nil => out.push_str("nil"),
            Self::Str(text) => out.push_str(&format!("{text:?}")),
            Self::List(items) => {
                out.push('[');
                for (index, item) in items.iter().enumerate() {
                    if index > 0 {
                        out.push_str(", ");
                    }
                    item.inspect_into(out, depth + 1);
                }
                out.push(']');
            }
            Self::Map(entries) => {
                out.push('{');
                for (index, (key, item)) in entries.iter().enumerate() {
                    if index > 0 {
                        out.push_str(", ");
                    }
                    out.push_str(&format!("{key:?}: "));
                    item.inspect_into(out, depth + 1);
                }
                out.push('}');
            }
            Self::Function(callable) => {
                out.push_str(&format!("#<fn {}{}>", callable.qualified_name(), callable.signature()));
            }
            other => out.push_str(&other.to_string()),
        }
    }

    /// Orders two values for sorting and `Comparable` methods.
    pub fn compare(&self, other: &Self) -> RunResult<Ordering> {
        let ordering = match (self, other) {
            (Self::Int(a), Self::Int(b)) => Some(a.cmp(b)),
            (Self::Int(a), Self::Float(b)) => (*a as f64).partial_cmp(b),
            (Self::Float(a), Self::Int(b)) => a.partial_cmp(&(*b as f64)),
            (Self::Float(a), Self::Float(b)) => a.partial_cmp(b),
            (Self::Str(a), Self::Str(b)) => Some(a.cmp(b)),
            (Self::List(a), Self::List(b)) => {
                for (left, right) in a.iter().zip(b) {
                    let step = left.compare(right)?;
                    if step != Ordering::Equal {
                        return Ok(step);
                    }
                }
                Some(a.len().cmp(&b.len()))
            }
            _ => None,
        };
        ordering.ok_or_else(|| {
            Exception::argument_error(format!(
                "comparison of {} with {} failed",
                self.type_name(),
                other.inspect()
            ))
        })
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Nil, Self::Nil) => true,
            (Self::Bool(a), Self::Bool(b)) => a == b,
            (Self::Int(a), Self::Int(b)) => a == b,
            (Self::Float(a), Self::Float(b)) => a == b,
            (Self::Int(a), Self::Float(b)) | (Self::Float(b), Self::Int(a)) => (*a as f64) == *b,
            (Self::Str(a), Self::Str(b)) => a == b,
            (Self::List(a), Self::List(b)) => a == b,
            (Self::Map(a), Self::Map(b)) => a == b,
            (Self::Type(a), Self::Type(b)) => std::ptr::eq(*a, *b),
            (Self::Function(a), Self::Function(b)) => a == b,
            _ => false,
        }
    }
}

/// User-facing string form (`to_s`): strings render raw, `nil` renders empty.
impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Nil => Ok(()),
            Self::Bool(value) => write!(f, "{value}"),
            Self::Int(value) => write!(f, "{value}"),
            Self::Float(value) => {
                if value.is_finite() && value.fract() == 0.0 && value.abs() < 1e16 {
                    write!(f, "{value:.1}")
                } else if value.is_nan() {
                    f.write_str("NaN")
                } else if value.is_infinite() {
                    f.write_str(if *value > 0.0 { "Infinity" } else { "-Infinity" })
                } else {
                    write!(f, "{value}")
                }
            }
            Self::Str(text) => f.write_str(text),
            Self::Type(def) => f.write_str(def.name),
            Self::List(_) | Self::Map(_) | Self::Function(_) => f.write_str(&self.inspect()),
        }
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Self::Str(value.to_owned())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Self::Str(value)
    }
}

impl From<Vec<Value>> for Value {
    fn from(value: Vec<Value>) -> Self {
        Self::List(value)
    }
}
