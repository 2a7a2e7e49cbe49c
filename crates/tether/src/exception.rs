use std::fmt;

use strum::{Display, EnumString, IntoStaticStr};

/// Result type alias for operations that can raise a script exception.
pub type RunResult<T> = Result<T, Exception>;

/// Exception kinds raised by the interpreter.
///
/// Uses strum derives for `Display`, `FromStr` and `Into<&'static str>`; the string
/// form is the variant name (e.g. `TypeError` -> "TypeError"), which is also the name
/// scripts pass to `raise`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, IntoStaticStr)]
pub enum ExcKind {
    /// Source text could not be tokenized or parsed.
    SyntaxError,
    /// An identifier did not resolve to anything.
    NameError,
    /// A method was not found on the receiver, or was private.
    NoMethodError,
    /// An operand had the wrong type for an operation.
    TypeError,
    /// A call received the wrong number or shape of arguments.
    ArgumentError,
    /// Division or modulo by integer zero.
    ZeroDivisionError,
    /// Integer overflow and other numeric failures.
    ArithmeticError,
    /// List index out of range.
    IndexError,
    /// Missing map key.
    KeyError,
    /// Call depth exceeded the configured limit.
    SystemStackError,
    /// The console was closed underneath a running evaluation.
    IOError,
    /// The evaluation ran past its time budget.
    TimeoutError,
    /// Generic failure, the default kind for `raise`.
    RuntimeError,
}

/// A location in script source: file name plus 1-based line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodeLoc {
    pub file: String,
    pub line: u32,
}

impl CodeLoc {
    #[must_use]
    pub fn new(file: impl Into<String>, line: u32) -> Self {
        Self {
            file: file.into(),
            line,
        }
    }
}

impl Default for CodeLoc {
    fn default() -> Self {
        Self::new("(eval)", 1)
    }
}

impl fmt::Display for CodeLoc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.file, self.line)
    }
}

/// One backtrace entry, rendered as ``file:line:in `name` ``.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StackFrame {
    pub file: String,
    pub line: u32,
    pub name: String,
}

impl fmt::Display for StackFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:in `{}`", self.file, self.line, self.name)
    }
}

/// A script-level exception: kind, message and backtrace.
///
/// Frames are ordered innermost first; the interpreter appends one frame each
/// time the exception unwinds out of a call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Exception {
    kind: ExcKind,
    message: String,
    frames: Vec<StackFrame>,
}

impl Exception {
    #[must_use]
    pub fn new(kind: ExcKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            frames: Vec::new(),
        }
    }

    pub(crate) fn type_error(message: impl Into<String>) -> Self {
        Self::new(ExcKind::TypeError, message)
    }

    pub(crate) fn argument_error(message: impl Into<String>) -> Self {
        Self::new(ExcKind::ArgumentError, message)
    }

    pub(crate) fn syntax_error(loc: &CodeLoc, message: impl fmt::Display) -> Self {
        let mut exc = Self::new(ExcKind::SyntaxError, format!("{loc}: {message}"));
        exc.push_frame(StackFrame {
            file: loc.file.clone(),
            line: loc.line,
            name: "<main>".to_owned(),
        });
        exc
    }

    #[must_use]
    pub fn kind(&self) -> ExcKind {
        self.kind
    }

    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    #[must_use]
    pub fn frames(&self) -> &[StackFrame] {
        &self.frames
    }

    /// Rendered backtrace lines, innermost first.
    #[must_use]
    pub fn backtrace(&self) -> Vec<String> {
        self.frames.iter().map(ToString::to_string).collect()
    }

    pub(crate) fn push_frame(&mut self, frame: StackFrame) {
        self.frames.push(frame);
    }
}

impl fmt::Display for Exception {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)
    }
}

impl std::error::Error for Exception {}
