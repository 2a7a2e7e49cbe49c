//! Tree-walking evaluator.
//!
//! One `Interp` lives for one call to [`Runtime::evaluate_in`]. It owns the call
//! frames, borrows the console, and reaches shared state only through short
//! critical sections on the runtime's globals.

use std::{sync::Arc, time::Instant};

use ahash::AHashMap;
use indexmap::IndexMap;

use crate::{
    builtins::{Visibility, arithmetic, list_get, lookup_constant, negate, normalize_index, type_arg, types},
    exception::{CodeLoc, ExcKind, Exception, RunResult, StackFrame},
    expressions::{BinOp, Expr, ExprKind, FnDef, Program, Stmt, UnaryOp},
    function::UserFunction,
    io::Console,
    runtime::Runtime,
    value::{Callable, MAX_VALUE_DEPTH, Value},
};

struct Frame {
    name: String,
    file: String,
    /// Line currently executing, reported if an exception unwinds through this frame.
    line: u32,
    /// `None` only for a top-level frame whose bindings are globals.
    locals: Option<AHashMap<String, Value>>,
}

pub(crate) struct Interp<'a> {
    runtime: &'a Runtime,
    console: &'a mut dyn Console,
    receiver: Value,
    label: &'a str,
    file: String,
    frames: Vec<Frame>,
    deadline: Option<Instant>,
}

impl<'a> Interp<'a> {
    pub(crate) fn new(
        runtime: &'a Runtime,
        console: &'a mut dyn Console,
        receiver: Value,
        label: &'a str,
        location: &CodeLoc,
        locals: Option<AHashMap<String, Value>>,
    ) -> Self {
        let deadline = runtime.limits().max_duration.map(|budget| Instant::now() + budget);
        Self {
            runtime,
            console,
            receiver,
            label,
            file: location.file.clone(),
            frames: vec![Frame {
                name: "<main>".to_owned(),
                file: location.file.clone(),
                line: location.line,
                locals,
            }],
            deadline,
        }
    }

    /// Runs every statement, returning the value of the last one.
    pub(crate) fn run(&mut self, program: &Program) -> RunResult<Value> {
        let mut last = Value::Nil;
        for stmt in &program.stmts {
            self.set_line(stmt.line());
            match self.exec(stmt) {
                Ok(value) => last = value,
                Err(mut exc) => {
                    if let Some(top) = self.frames.first() {
                        exc.push_frame(StackFrame {
                            file: top.file.clone(),
                            line: top.line,
                            name: top.name.clone(),
                        });
                    }
                    return Err(exc);
                }
            }
        }
        Ok(last)
    }

    /// Gives back the top-level locals so the binding can keep them.
    pub(crate) fn into_locals(mut self) -> Option<AHashMap<String, Value>> {
        self.frames.truncate(1);
        self.frames.pop().and_then(|frame| frame.locals)
    }

    // ========================================================================
    // Services for builtins
    // ========================================================================

    pub(crate) fn write(&mut self, text: &str) -> RunResult<()> {
        self.console
            .write(text)
            .map_err(|closed| Exception::new(ExcKind::IOError, closed.to_string()))
    }

    /// Blocks for a line of input; the wait does not count against the time budget.
    pub(crate) fn read_line(&mut self, prompt: &str) -> Option<String> {
        let started = Instant::now();
        let line = self.console.read_line(prompt);
        if let Some(deadline) = &mut self.deadline {
            *deadline += started.elapsed();
        }
        line
    }

    /// Applies a function value to arguments.
    pub(crate) fn call(&mut self, callable: &Callable, args: Vec<Value>) -> RunResult<Value> {
        match callable {
            Callable::Native { owner, func } => {
                self.check_deadline()?;
                func.invoke(self, &Value::Type(*owner), args).and_then(within_depth)
            }
            Callable::User(function) => self.call_user(function, args),
        }
    }

    // ========================================================================
    // Statements
    // ========================================================================

    fn exec(&mut self, stmt: &Stmt) -> RunResult<Value> {
        match stmt {
            Stmt::Let { name, value } => {
                let value = self.eval(value)?;
                self.bind(name, value.clone());
                Ok(value)
            }
            Stmt::Assign { name, value } => {
                let value = self.eval(value)?;
                self.assign(name, value.clone());
                Ok(value)
            }
            Stmt::Fn(def) => Ok(self.define(def)),
            Stmt::Expr(expr) => self.eval(expr),
        }
    }

    fn define(&mut self, def: &FnDef) -> Value {
        let function = Arc::new(UserFunction {
            name: def.name.clone(),
            params: def.params.clone(),
            body: def.body.clone(),
            source: def.source.clone(),
            doc: def.doc.clone(),
            location: CodeLoc::new(self.file.clone(), def.line),
        });
        tracing::debug!(name = %function.name, "defined function");
        self.runtime
            .globals()
            .functions
            .insert(function.name.clone(), Arc::clone(&function));
        Value::Function(Callable::User(function))
    }

    /// Binds `name` in the innermost scope.
    fn bind(&mut self, name: &str, value: Value) {
        match self.frames.last_mut().and_then(|frame| frame.locals.as_mut()) {
            Some(locals) => {
                locals.insert(name.to_owned(), value);
            }
            None => self.runtime.set_global(name, value),
        }
    }

    /// Rebinds an existing local or global, else binds a new local.
    fn assign(&mut self, name: &str, value: Value) {
        if let Some(slot) = self
            .frames
            .last_mut()
            .and_then(|frame| frame.locals.as_mut())
            .and_then(|locals| locals.get_mut(name))
        {
            *slot = value;
            return;
        }
        {
            let mut globals = self.runtime.globals();
            if let Some(slot) = globals.vars.get_mut(name) {
                *slot = value;
                return;
            }
        }
        self.bind(name, value);
    }

    fn local(&self, name: &str) -> Option<Value> {
        self.frames.last()?.locals.as_ref()?.get(name).cloned()
    }

    fn set_line(&mut self, line: u32) {
        if let Some(frame) = self.frames.last_mut() {
            frame.line = line;
        }
    }

    fn check_deadline(&self) -> RunResult<()> {
        match self.deadline {
            Some(deadline) if Instant::now() > deadline => {
                Err(Exception::new(ExcKind::TimeoutError, "execution expired"))
            }
            _ => Ok(()),
        }
    }

    // ========================================================================
    // Expressions
    // ========================================================================

    fn eval(&mut self, expr: &Expr) -> RunResult<Value> {
        match &expr.kind {
            ExprKind::Literal(value) => Ok(value.clone()),
            ExprKind::List(items) => {
                let items = items.iter().map(|item| self.eval(item)).collect::<RunResult<Vec<_>>>()?;
                self.set_line(expr.line);
                within_depth(Value::List(items))
            }
            ExprKind::Map(entries) => {
                let mut map = IndexMap::with_capacity(entries.len());
                for (key, value) in entries {
                    let key = match self.eval(key)? {
                        Value::Str(key) => key,
                        other => {
                            self.set_line(expr.line);
                            return Err(Exception::type_error(format!(
                                "map keys must be strings, got {}",
                                other.type_name()
                            )));
                        }
                    };
                    map.insert(key, self.eval(value)?);
                }
                self.set_line(expr.line);
                within_depth(Value::Map(map))
            }
            ExprKind::Name(name) => {
                self.set_line(expr.line);
                self.name(name)
            }
            ExprKind::SelfRef => Ok(self.receiver.clone()),
            ExprKind::Unary(op, operand) => {
                let value = self.eval(operand)?;
                self.set_line(expr.line);
                match op {
                    UnaryOp::Neg => negate(&value),
                    UnaryOp::Not => Ok(Value::Bool(!value.truthy())),
                }
            }
            ExprKind::Binary(op, left, right) => {
                let left = self.eval(left)?;
                let right = self.eval(right)?;
                self.set_line(expr.line);
                binary(*op, &left, &right)
            }
            ExprKind::And(left, right) => {
                let left = self.eval(left)?;
                if left.truthy() { self.eval(right) } else { Ok(left) }
            }
            ExprKind::Or(left, right) => {
                let left = self.eval(left)?;
                if left.truthy() { Ok(left) } else { self.eval(right) }
            }
            ExprKind::If { cond, then, otherwise } => {
                if self.eval(cond)?.truthy() {
                    self.eval(then)
                } else {
                    self.eval(otherwise)
                }
            }
            ExprKind::Call { callee, args } => {
                if let ExprKind::Name(name) = &callee.kind {
                    let args = self.eval_args(args)?;
                    self.set_line(expr.line);
                    return self.call_name(name, args);
                }
                let target = self.eval(callee)?;
                let args = self.eval_args(args)?;
                self.set_line(expr.line);
                match target {
                    Value::Function(callable) => self.call(&callable, args),
                    other => Err(Exception::type_error(format!(
                        "{} is not a function ({})",
                        other.inspect(),
                        other.type_name()
                    ))),
                }
            }
            ExprKind::Method { receiver, name, args } => {
                let explicit = !matches!(receiver.kind, ExprKind::SelfRef);
                let receiver = self.eval(receiver)?;
                let args = self.eval_args(args)?;
                self.set_line(expr.line);
                self.send(&receiver, name, args, explicit)
            }
            ExprKind::Const { scope, name } => {
                let scope = self.eval(scope)?;
                self.set_line(expr.line);
                lookup_constant(type_arg(&scope)?, name)
            }
            ExprKind::Index { target, index } => {
                let target = self.eval(target)?;
                let index = self.eval(index)?;
                self.set_line(expr.line);
                subscript(&target, &index)
            }
        }
    }

    fn eval_args(&mut self, args: &[Expr]) -> RunResult<Vec<Value>> {
        args.iter().map(|arg| self.eval(arg)).collect()
    }

    /// Resolves a bare identifier.
    ///
    /// Locals, globals, user functions and type names evaluate to values; Kernel
    /// functions and methods of `self` are called without arguments.
    fn name(&mut self, name: &str) -> RunResult<Value> {
        if let Some(value) = self.local(name) {
            return Ok(value);
        }
        if let Some(value) = self.runtime.global(name) {
            return Ok(value);
        }
        if let Some(function) = self.runtime.function(name) {
            return Ok(Value::Function(Callable::User(function)));
        }
        if let Some(def) = types().get(name) {
            return Ok(Value::Type(def));
        }
        if let Some(value) = self.implicit_call(name, Vec::new()) {
            return value;
        }
        if let Value::Type(def) = self.receiver
            && let Some(constant) = def.find_constant(name)
        {
            return Ok(constant.value.clone());
        }
        Err(Exception::new(
            ExcKind::NameError,
            format!("undefined local variable or method `{name}' for {}", self.label),
        ))
    }

    /// Calls `name(args)` written without a receiver.
    fn call_name(&mut self, name: &str, args: Vec<Value>) -> RunResult<Value> {
        if let Some(value) = self.local(name).or_else(|| self.runtime.global(name)) {
            return match value {
                Value::Function(callable) => self.call(&callable, args),
                other => Err(Exception::type_error(format!(
                    "`{name}` is not a function ({})",
                    other.type_name()
                ))),
            };
        }
        if let Some(function) = self.runtime.function(name) {
            return self.call_user(&function, args);
        }
        if let Some(value) = self.implicit_call(name, args) {
            return value;
        }
        Err(Exception::new(
            ExcKind::NoMethodError,
            format!("undefined method `{name}' for {}", self.label),
        ))
    }

    /// Kernel functions first, then methods of `self`, private ones included.
    fn implicit_call(&mut self, name: &str, args: Vec<Value>) -> Option<RunResult<Value>> {
        let receiver = self.receiver.clone();
        if let Some(func) = types().kernel.find_class_method(name) {
            return Some(func.invoke(self, &receiver, args).and_then(within_depth));
        }
        if let Value::Type(def) = receiver
            && let Some(func) = def.find_class_method(name)
        {
            return Some(func.invoke(self, &receiver, args).and_then(within_depth));
        }
        let func = receiver.type_def().find_method(name)?;
        Some(func.invoke(self, &receiver, args).and_then(within_depth))
    }

    /// Calls a method with an explicit receiver expression.
    fn send(&mut self, receiver: &Value, name: &str, args: Vec<Value>, explicit: bool) -> RunResult<Value> {
        if let Value::Type(def) = receiver
            && let Some(func) = def.find_class_method(name)
        {
            return func.invoke(self, receiver, args).and_then(within_depth);
        }
        match receiver.type_def().find_method(name) {
            Some(func) if func.visibility == Visibility::Private && explicit => Err(private_method(name, receiver)),
            Some(func) => func.invoke(self, receiver, args).and_then(within_depth),
            None => match self.runtime.function(name) {
                // user functions are private methods of every object
                Some(_) if explicit => Err(private_method(name, receiver)),
                Some(function) => self.call_user(&function, args),
                None => Err(Exception::new(
                    ExcKind::NoMethodError,
                    format!(
                        "undefined method `{name}' for {}:{}",
                        receiver.inspect(),
                        receiver.type_name()
                    ),
                )),
            },
        }
    }

    fn call_user(&mut self, function: &Arc<UserFunction>, args: Vec<Value>) -> RunResult<Value> {
        self.check_deadline()?;
        if args.len() != function.params.len() {
            return Err(Exception::argument_error(format!(
                "wrong number of arguments (given {}, expected {})",
                args.len(),
                function.params.len()
            )));
        }
        if self.frames.len() > self.runtime.limits().max_call_depth {
            return Err(Exception::new(ExcKind::SystemStackError, "stack level too deep"));
        }
        let locals = function.params.iter().cloned().zip(args).collect();
        self.frames.push(Frame {
            name: function.name.clone(),
            file: function.location.file.clone(),
            line: function.location.line,
            locals: Some(locals),
        });
        let result = self.eval(&function.body);
        let frame = self.frames.pop();
        result.map_err(|mut exc| {
            if let Some(frame) = frame {
                exc.push_frame(StackFrame {
                    file: frame.file,
                    line: frame.line,
                    name: frame.name,
                });
            }
            exc
        })
    }
}

fn private_method(name: &str, receiver: &Value) -> Exception {
    Exception::new(
        ExcKind::NoMethodError,
        format!(
            "private method `{name}' called for {}:{}",
            receiver.inspect(),
            receiver.type_name()
        ),
    )
}

/// Rejects values nested past [`MAX_VALUE_DEPTH`] before anything can hold them.
fn within_depth(value: Value) -> RunResult<Value> {
    if value.nests_deeper_than(MAX_VALUE_DEPTH) {
        return Err(Exception::new(ExcKind::SystemStackError, "value nested too deeply"));
    }
    Ok(value)
}

fn binary(op: BinOp, left: &Value, right: &Value) -> RunResult<Value> {
    let ordered = |accept: fn(std::cmp::Ordering) -> bool| left.compare(right).map(|ord| Value::Bool(accept(ord)));
    match op {
        BinOp::Eq => Ok(Value::Bool(left == right)),
        BinOp::NotEq => Ok(Value::Bool(left != right)),
        BinOp::Lt => ordered(std::cmp::Ordering::is_lt),
        BinOp::LtE => ordered(std::cmp::Ordering::is_le),
        BinOp::Gt => ordered(std::cmp::Ordering::is_gt),
        BinOp::GtE => ordered(std::cmp::Ordering::is_ge),
        BinOp::Add | BinOp::Sub | BinOp::Mul | BinOp::Div | BinOp::Mod => arithmetic(op, left, right),
    }
}

/// `target[index]`: out of range and missing keys give nil.
fn subscript(target: &Value, index: &Value) -> RunResult<Value> {
    match (target, index) {
        (Value::List(items), Value::Int(index)) => Ok(list_get(items, *index)),
        (Value::Str(text), Value::Int(index)) => {
            let chars: Vec<char> = text.chars().collect();
            Ok(normalize_index(*index, chars.len()).map_or(Value::Nil, |position| Value::Str(chars[position].to_string())))
        }
        (Value::List(_) | Value::Str(_), other) => Err(Exception::type_error(format!(
            "no implicit conversion of {} into Integer",
            other.type_name()
        ))),
        (Value::Map(map), Value::Str(key)) => Ok(map.get(key).cloned().unwrap_or(Value::Nil)),
        (Value::Map(_), _) => Ok(Value::Nil),
        (other, _) => Err(Exception::new(
            ExcKind::NoMethodError,
            format!("undefined method `[]' for {}:{}", other.inspect(), other.type_name()),
        )),
    }
}
