//! The builtin type table: classes, modules and their native methods.
//!
//! Every builtin is registered with the source location of its registration so the
//! introspection service can report it, and with a YARD-style documentation string.

use std::{fmt, sync::LazyLock};

use serde::Serialize;
use strum::{Display, IntoStaticStr};

use crate::{
    exception::{Exception, RunResult},
    interp::Interp,
    value::Value,
};

/// Builds a [`NativeFn`] recording the file and line of the invocation.
macro_rules! native {
    ($name:literal, $signature:literal, $arity:expr, $func:expr, $doc:literal $(,)?) => {
        $crate::builtins::NativeFn {
            name: $name,
            signature: $signature,
            doc: $doc,
            visibility: $crate::builtins::Visibility::Public,
            arity: $arity,
            func: $func,
            location: $crate::builtins::here!(),
        }
    };
}

/// A [`NativeLocation`] for the current file and line.
macro_rules! here {
    () => {
        $crate::builtins::NativeLocation {
            file: file!(),
            line: line!(),
        }
    };
}

pub(crate) use here;
pub(crate) use native;

mod collections;
mod numeric;
mod object;
mod string;

pub(crate) use collections::list_get;
pub(crate) use numeric::{arithmetic, negate};

/// Signature shared by all native functions: interpreter, receiver, arguments.
///
/// Arguments have already been checked against the function's [`Arity`].
pub(crate) type NativeFnPtr = fn(&mut Interp<'_>, &Value, Vec<Value>) -> RunResult<Value>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, IntoStaticStr, Serialize)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum TypeKind {
    Class,
    Module,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, IntoStaticStr, Serialize)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    Public,
    Private,
}

/// Where a builtin was registered in this crate's sources.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NativeLocation {
    pub file: &'static str,
    pub line: u32,
}

/// Accepted positional argument counts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Arity {
    pub min: usize,
    /// `None` accepts any number of trailing arguments.
    pub max: Option<usize>,
}

impl Arity {
    #[must_use]
    pub const fn exact(count: usize) -> Self {
        Self {
            min: count,
            max: Some(count),
        }
    }

    #[must_use]
    pub const fn range(min: usize, max: usize) -> Self {
        Self { min, max: Some(max) }
    }

    #[must_use]
    pub const fn at_least(min: usize) -> Self {
        Self { min, max: None }
    }

    #[must_use]
    pub fn accepts(self, given: usize) -> bool {
        given >= self.min && self.max.is_none_or(|max| given <= max)
    }

    /// Checks `given` against this arity, raising `ArgumentError` on mismatch.
    pub fn check(self, given: usize) -> RunResult<()> {
        if self.accepts(given) {
            return Ok(());
        }
        let expected = match self.max {
            Some(max) if max == self.min => max.to_string(),
            Some(max) => format!("{}..{max}", self.min),
            None => format!("{}+", self.min),
        };
        Err(Exception::argument_error(format!(
            "wrong number of arguments (given {given}, expected {expected})"
        )))
    }
}

/// A function implemented in Rust.
pub struct NativeFn {
    pub name: &'static str,
    /// Parameter list starting at the opening parenthesis, e.g. `(x, base = E)`.
    pub signature: &'static str,
    pub doc: &'static str,
    pub visibility: Visibility,
    pub arity: Arity,
    pub(crate) func: NativeFnPtr,
    pub location: NativeLocation,
}

impl NativeFn {
    #[must_use]
    pub(crate) fn private(mut self) -> Self {
        self.visibility = Visibility::Private;
        self
    }

    pub(crate) fn invoke(&self, interp: &mut Interp<'_>, receiver: &Value, args: Vec<Value>) -> RunResult<Value> {
        self.arity.check(args.len())?;
        (self.func)(interp, receiver, args)
    }
}

impl fmt::Debug for NativeFn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NativeFn").field("name", &self.name).finish_non_exhaustive()
    }
}

#[derive(Debug)]
pub struct Constant {
    pub name: &'static str,
    pub value: Value,
    pub doc: &'static str,
}

/// A builtin class or module.
pub struct TypeDef {
    pub name: &'static str,
    pub kind: TypeKind,
    pub superclass: Option<&'static str>,
    /// Included modules, in inclusion order.
    pub includes: &'static [&'static str],
    pub doc: &'static str,
    pub location: NativeLocation,
    pub class_methods: Vec<NativeFn>,
    pub instance_methods: Vec<NativeFn>,
    pub constants: Vec<Constant>,
}

impl TypeDef {
    fn new(name: &'static str, kind: TypeKind, location: NativeLocation) -> Self {
        Self {
            name,
            kind,
            superclass: if kind == TypeKind::Class && name != "Object" {
                Some("Object")
            } else {
                None
            },
            includes: &[],
            doc: "",
            location,
            class_methods: Vec::new(),
            instance_methods: Vec::new(),
            constants: Vec::new(),
        }
    }

    #[must_use]
    pub fn superclass(&self) -> Option<&'static TypeDef> {
        self.superclass.and_then(|name| types().get(name))
    }

    pub fn included_modules(&self) -> impl Iterator<Item = &'static TypeDef> + '_ {
        self.includes.iter().filter_map(|name| types().get(name))
    }

    /// Method resolution order: the type, its included modules (last included
    /// first), then the superclass's ancestors.
    #[must_use]
    pub fn ancestors(&'static self) -> Vec<&'static TypeDef> {
        let mut out: Vec<&'static TypeDef> = Vec::new();
        let mut current = Some(self);
        while let Some(def) = current {
            for candidate in std::iter::once(def).chain(def.included_modules().collect::<Vec<_>>().into_iter().rev()) {
                if !out.iter().any(|seen| std::ptr::eq(*seen, candidate)) {
                    out.push(candidate);
                }
            }
            current = def.superclass();
        }
        out
    }

    /// Looks up an instance method along [`Self::ancestors`], private ones included.
    #[must_use]
    pub fn find_method(&'static self, name: &str) -> Option<&'static NativeFn> {
        self.ancestors()
            .into_iter()
            .find_map(|def| def.instance_methods.iter().find(|func| func.name == name))
    }

    /// Looks up a class method on this type or its superclasses.
    #[must_use]
    pub fn find_class_method(&'static self, name: &str) -> Option<&'static NativeFn> {
        let mut current = Some(self);
        while let Some(def) = current {
            if let Some(func) = def.class_methods.iter().find(|func| func.name == name) {
                return Some(func);
            }
            current = def.superclass();
        }
        None
    }

    #[must_use]
    pub fn find_constant(&'static self, name: &str) -> Option<&'static Constant> {
        self.ancestors()
            .into_iter()
            .find_map(|def| def.constants.iter().find(|constant| constant.name == name))
    }

    /// Public instance method names, own methods first, without duplicates.
    #[must_use]
    pub fn public_instance_methods(&'static self, inherit: bool) -> Vec<&'static str> {
        let sources = if inherit { self.ancestors() } else { vec![self] };
        let mut names: Vec<&'static str> = Vec::new();
        for def in sources {
            for func in &def.instance_methods {
                if func.visibility == Visibility::Public && !names.contains(&func.name) {
                    names.push(func.name);
                }
            }
        }
        names
    }

    /// Class method names, own methods first, without duplicates.
    #[must_use]
    pub fn class_method_names(&'static self, inherit: bool) -> Vec<&'static str> {
        let mut names: Vec<&'static str> = Vec::new();
        let mut current = Some(self);
        while let Some(def) = current {
            for func in &def.class_methods {
                if !names.contains(&func.name) {
                    names.push(func.name);
                }
            }
            if !inherit {
                break;
            }
            current = def.superclass();
        }
        names
    }
}

impl fmt::Debug for TypeDef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypeDef").field("name", &self.name).finish_non_exhaustive()
    }
}

/// All builtin types, built once on first use.
#[derive(Debug)]
pub struct TypeTable {
    pub object: TypeDef,
    pub kernel: TypeDef,
    pub comparable: TypeDef,
    pub enumerable: TypeDef,
    pub module: TypeDef,
    pub function: TypeDef,
    pub nil: TypeDef,
    pub boolean: TypeDef,
    pub numeric: TypeDef,
    pub integer: TypeDef,
    pub float: TypeDef,
    pub math: TypeDef,
    pub string: TypeDef,
    pub list: TypeDef,
    pub map: TypeDef,
}

impl TypeTable {
    fn build() -> Self {
        Self {
            object: object::object(),
            kernel: object::kernel(),
            comparable: numeric::comparable(),
            enumerable: collections::enumerable(),
            module: object::module(),
            function: object::function(),
            nil: object::nil(),
            boolean: object::boolean(),
            numeric: numeric::numeric(),
            integer: numeric::integer(),
            float: numeric::float(),
            math: numeric::math(),
            string: string::string(),
            list: collections::list(),
            map: collections::map(),
        }
    }

    /// Every builtin type with `Object` first.
    #[must_use]
    pub fn all(&self) -> [&TypeDef; 15] {
        [
            &self.object,
            &self.kernel,
            &self.comparable,
            &self.enumerable,
            &self.module,
            &self.function,
            &self.nil,
            &self.boolean,
            &self.numeric,
            &self.integer,
            &self.float,
            &self.math,
            &self.string,
            &self.list,
            &self.map,
        ]
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&TypeDef> {
        self.all().into_iter().find(|def| def.name == name)
    }
}

static TYPES: LazyLock<TypeTable> = LazyLock::new(TypeTable::build);

/// The process-wide builtin type table.
#[must_use]
pub fn types() -> &'static TypeTable {
    &TYPES
}

// ============================================================================
// Argument helpers shared by the builtin modules
// ============================================================================

fn conversion_error(value: &Value, into: &str) -> Exception {
    Exception::type_error(format!("no implicit conversion of {} into {into}", value.type_name()))
}

pub(crate) fn int_arg(value: &Value) -> RunResult<i64> {
    match value {
        Value::Int(int) => Ok(*int),
        other => Err(conversion_error(other, "Integer")),
    }
}

pub(crate) fn float_arg(value: &Value) -> RunResult<f64> {
    match value {
        Value::Int(int) => Ok(*int as f64),
        Value::Float(float) => Ok(*float),
        other => Err(Exception::type_error(format!("can't convert {} into Float", other.type_name()))),
    }
}

pub(crate) fn str_arg(value: &Value) -> RunResult<&str> {
    match value {
        Value::Str(text) => Ok(text),
        other => Err(conversion_error(other, "String")),
    }
}

pub(crate) fn list_arg(value: &Value) -> RunResult<&[Value]> {
    match value {
        Value::List(items) => Ok(items),
        other => Err(conversion_error(other, "List")),
    }
}

pub(crate) fn type_arg(value: &Value) -> RunResult<&'static TypeDef> {
    match value {
        Value::Type(def) => Ok(def),
        other => Err(Exception::type_error(format!("{} is not a class or module", other.inspect()))),
    }
}

pub(crate) fn callable_arg(value: &Value) -> RunResult<&crate::value::Callable> {
    match value {
        Value::Function(callable) => Ok(callable),
        other => Err(Exception::type_error(format!(
            "wrong argument type {} (expected Function)",
            other.type_name()
        ))),
    }
}

/// Resolves `Scope::NAME`. Builtin type names are constants of `Object`.
pub(crate) fn lookup_constant(scope: &'static TypeDef, name: &str) -> RunResult<Value> {
    if std::ptr::eq(scope, &types().object) {
        if let Some(def) = types().get(name) {
            return Ok(Value::Type(def));
        }
    }
    scope
        .find_constant(name)
        .map(|constant| constant.value.clone())
        .ok_or_else(|| {
            Exception::new(
                crate::exception::ExcKind::NameError,
                format!("uninitialized constant {}::{name}", scope.name),
            )
        })
}

/// Converts a possibly negative index into a position within `len` elements.
pub(crate) fn normalize_index(index: i64, len: usize) -> Option<usize> {
    let len = i64::try_from(len).ok()?;
    let position = if index < 0 { len + index } else { index };
    (0..len).contains(&position).then_some(position as usize)
}

/// Converts a collection length to a script integer.
pub(crate) fn len_value(len: usize) -> Value {
    Value::Int(i64::try_from(len).unwrap_or(i64::MAX))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn integer_ancestors_follow_include_and_superclass_order() {
        let names: Vec<_> = types().integer.ancestors().iter().map(|def| def.name).collect();
        assert_eq!(names, ["Integer", "Numeric", "Comparable", "Object", "Kernel"]);
    }

    #[test]
    fn kernel_functions_are_private_instance_methods() {
        let puts = types().integer.find_method("puts").unwrap();
        assert_eq!(puts.visibility, Visibility::Private);
        assert_eq!(types().kernel.find_class_method("puts").unwrap().visibility, Visibility::Public);
    }

    #[test]
    fn arity_messages() {
        assert!(Arity::exact(1).check(1).is_ok());
        assert_eq!(
            Arity::range(1, 2).check(3).unwrap_err().message(),
            "wrong number of arguments (given 3, expected 1..2)"
        );
        assert_eq!(
            Arity::at_least(1).check(0).unwrap_err().message(),
            "wrong number of arguments (given 0, expected 1+)"
        );
    }

    #[test]
    fn negative_indexes_count_from_the_end() {
        assert_eq!(normalize_index(-1, 3), Some(2));
        assert_eq!(normalize_index(3, 3), None);
        assert_eq!(normalize_index(-4, 3), None);
    }
}
