//! `Object`, `Kernel`, `Module`, `Function`, `NilClass` and `Boolean`.

use std::str::FromStr;

use super::{Arity, TypeDef, TypeKind, callable_arg, lookup_constant, str_arg, type_arg, types};
use crate::{
    exception::{ExcKind, Exception, RunResult},
    interp::Interp,
    value::{Callable, Value},
};

pub(super) fn object() -> TypeDef {
    TypeDef {
        includes: &["Kernel"],
        doc: "The root of the class hierarchy.\n\n\
              Every value is an Object. Functions defined with `fn` become private\n\
              instance methods of Object, so they can be called from anywhere.",
        instance_methods: vec![
            native!("to_s", "()", Arity::exact(0), object_to_s, "Returns the string form of the receiver.\n@return [String]"),
            native!(
                "inspect",
                "()",
                Arity::exact(0),
                object_inspect,
                "Returns a developer-facing representation of the receiver.\n@return [String]",
            ),
            native!("type", "()", Arity::exact(0), object_type, "Returns the class of the receiver.\n@return [Module]"),
            native!("nil?", "()", Arity::exact(0), object_is_nil, "True only for nil.\n@return [Boolean]"),
            native!(
                "is_a?",
                "(type)",
                Arity::exact(1),
                object_is_a,
                "Tests whether +type+ is among the receiver's ancestors.\n\
                 @param [Module] type class or module to test\n\
                 @return [Boolean]\n\
                 @example\n  1.is_a?(Numeric) # => true",
            ),
            native!(
                "respond_to?",
                "(name)",
                Arity::exact(1),
                object_respond_to,
                "Tests whether the receiver has a public method called +name+.\n\
                 @param [String] name\n\
                 @return [Boolean]",
            ),
            native!(
                "methods",
                "()",
                Arity::exact(0),
                object_methods,
                "Lists the public methods of the receiver.\n@return [List<String>]",
            ),
            native!(
                "then",
                "(f)",
                Arity::exact(1),
                object_then,
                "Calls +f+ with the receiver and returns its result.\n\
                 @param [Function] f\n\
                 @return [Object] whatever +f+ returns",
            ),
        ],
        ..TypeDef::new("Object", TypeKind::Class, here!())
    }
}

fn object_to_s(_: &mut Interp<'_>, receiver: &Value, _: Vec<Value>) -> RunResult<Value> {
    Ok(Value::Str(receiver.to_string()))
}

fn object_inspect(_: &mut Interp<'_>, receiver: &Value, _: Vec<Value>) -> RunResult<Value> {
    Ok(Value::Str(receiver.inspect()))
}

fn object_type(_: &mut Interp<'_>, receiver: &Value, _: Vec<Value>) -> RunResult<Value> {
    Ok(Value::Type(receiver.type_def()))
}

fn object_is_nil(_: &mut Interp<'_>, receiver: &Value, _: Vec<Value>) -> RunResult<Value> {
    Ok(Value::Bool(matches!(receiver, Value::Nil)))
}

fn object_is_a(_: &mut Interp<'_>, receiver: &Value, args: Vec<Value>) -> RunResult<Value> {
    let target = type_arg(&args[0])?;
    Ok(Value::Bool(
        receiver.type_def().ancestors().iter().any(|def| std::ptr::eq(*def, target)),
    ))
}

fn object_respond_to(_: &mut Interp<'_>, receiver: &Value, args: Vec<Value>) -> RunResult<Value> {
    let name = str_arg(&args[0])?;
    Ok(Value::Bool(responds_to(receiver, name)))
}

/// Whether `name` is a public method callable on `receiver` with an explicit receiver.
pub(crate) fn responds_to(receiver: &Value, name: &str) -> bool {
    if let Value::Type(def) = receiver {
        if def.find_class_method(name).is_some() {
            return true;
        }
    }
    receiver
        .type_def()
        .find_method(name)
        .is_some_and(|func| func.visibility == super::Visibility::Public)
}

fn object_methods(_: &mut Interp<'_>, receiver: &Value, _: Vec<Value>) -> RunResult<Value> {
    Ok(names_value(receiver.type_def().public_instance_methods(true)))
}

fn object_then(interp: &mut Interp<'_>, receiver: &Value, args: Vec<Value>) -> RunResult<Value> {
    let f = callable_arg(&args[0])?.clone();
    interp.call(&f, vec![receiver.clone()])
}

fn names_value(names: Vec<&str>) -> Value {
    Value::List(names.into_iter().map(Value::from).collect())
}

// ============================================================================
// Kernel
// ============================================================================

/// The Kernel functions, shared between the module's public class methods and
/// its private instance methods.
fn kernel_functions() -> Vec<super::NativeFn> {
    vec![
        native!(
            "puts",
            "(*values)",
            Arity::at_least(0),
            kernel_puts,
            "Writes each value followed by a newline.\n\n\
             Lists are flattened, one element per line. With no arguments writes\n\
             a single newline.\n\
             @param [Object] values\n\
             @return [nil]",
        ),
        native!(
            "print",
            "(*values)",
            Arity::at_least(0),
            kernel_print,
            "Writes each value without a trailing newline.\n@return [nil]",
        ),
        native!(
            "p",
            "(*values)",
            Arity::at_least(0),
            kernel_p,
            "Writes the inspected form of each value on its own line.\n\
             @return [Object] nil, the only argument, or all arguments as a list",
        ),
        native!(
            "gets",
            "(prompt = \"\")",
            Arity::range(0, 1),
            kernel_gets,
            "Reads one line of input.\n\
             @param [String] prompt shown before reading\n\
             @return [String, nil] the line without its terminator, or nil at end of input",
        ),
        native!(
            "inspect",
            "(value = self)",
            Arity::range(0, 1),
            kernel_inspect,
            "Returns the developer-facing representation of +value+.\n@return [String]",
        ),
        native!(
            "type_of",
            "(value = self)",
            Arity::range(0, 1),
            kernel_type_of,
            "Returns the class of +value+.\n@return [Module]",
        ),
        native!(
            "raise",
            "(kind = \"RuntimeError\", message)",
            Arity::range(1, 2),
            kernel_raise,
            "Raises an exception.\n\
             @overload raise(message)\n  Raises a RuntimeError.\n  @param [String] message\n\
             @overload raise(kind, message)\n  @param [String] kind exception kind, e.g. \"TypeError\"\n  @param [String] message\n\
             @raise [RuntimeError]",
        ),
    ]
}

pub(super) fn kernel() -> TypeDef {
    TypeDef {
        doc: "Functions available everywhere: console output and input, inspection and\n\
              raising exceptions.\n\n\
              Each function is both a module function (`Kernel.puts(1)`) and a private\n\
              instance method of every object (`puts(1)`).",
        class_methods: kernel_functions(),
        instance_methods: kernel_functions().into_iter().map(super::NativeFn::private).collect(),
        ..TypeDef::new("Kernel", TypeKind::Module, here!())
    }
}

fn kernel_puts(interp: &mut Interp<'_>, _: &Value, args: Vec<Value>) -> RunResult<Value> {
    if args.is_empty() {
        interp.write("\n")?;
    }
    for arg in &args {
        puts_value(interp, arg)?;
    }
    Ok(Value::Nil)
}

fn puts_value(interp: &mut Interp<'_>, value: &Value) -> RunResult<()> {
    if let Value::List(items) = value {
        for item in items {
            puts_value(interp, item)?;
        }
        return Ok(());
    }
    let text = value.to_string();
    interp.write(&format!("{}\n", text.strip_suffix('\n').unwrap_or(&text)))
}

fn kernel_print(interp: &mut Interp<'_>, _: &Value, args: Vec<Value>) -> RunResult<Value> {
    for arg in &args {
        interp.write(&arg.to_string())?;
    }
    Ok(Value::Nil)
}

fn kernel_p(interp: &mut Interp<'_>, _: &Value, mut args: Vec<Value>) -> RunResult<Value> {
    for arg in &args {
        interp.write(&format!("{}\n", arg.inspect()))?;
    }
    Ok(match args.len() {
        0 => Value::Nil,
        1 => args.remove(0),
        _ => Value::List(args),
    })
}

fn kernel_gets(interp: &mut Interp<'_>, _: &Value, args: Vec<Value>) -> RunResult<Value> {
    let prompt = match args.first() {
        Some(prompt) => prompt.to_string(),
        None => String::new(),
    };
    Ok(interp.read_line(&prompt).map_or(Value::Nil, Value::Str))
}

fn kernel_inspect(_: &mut Interp<'_>, receiver: &Value, args: Vec<Value>) -> RunResult<Value> {
    Ok(Value::Str(args.first().unwrap_or(receiver).inspect()))
}

fn kernel_type_of(_: &mut Interp<'_>, receiver: &Value, args: Vec<Value>) -> RunResult<Value> {
    Ok(Value::Type(args.first().unwrap_or(receiver).type_def()))
}

fn kernel_raise(_: &mut Interp<'_>, _: &Value, args: Vec<Value>) -> RunResult<Value> {
    let mut args = args.into_iter();
    let first = args.next().unwrap_or(Value::Nil);
    let Some(message) = args.next() else {
        return Err(Exception::new(ExcKind::RuntimeError, first.to_string()));
    };
    let name = str_arg(&first)?;
    let kind =
        ExcKind::from_str(name).map_err(|_| Exception::argument_error(format!("unknown exception kind `{name}`")))?;
    Err(Exception::new(kind, message.to_string()))
}

// ============================================================================
// Module
// ============================================================================

pub(super) fn module() -> TypeDef {
    TypeDef {
        doc: "The class of every builtin class and module.",
        instance_methods: vec![
            native!("name", "()", Arity::exact(0), module_name, "Returns the name of the module.\n@return [String]"),
            native!(
                "superclass",
                "()",
                Arity::exact(0),
                module_superclass,
                "Returns the parent class, or nil for modules and `Object`.\n@return [Module, nil]",
            ),
            native!(
                "ancestors",
                "()",
                Arity::exact(0),
                module_ancestors,
                "Returns the method resolution order.\n@return [List<Module>]",
            ),
            native!(
                "instance_methods",
                "(inherit = true)",
                Arity::range(0, 1),
                module_instance_methods,
                "Lists public instance method names.\n\
                 @param [Boolean] inherit include methods of ancestors\n\
                 @return [List<String>]",
            ),
            native!(
                "methods",
                "()",
                Arity::exact(0),
                module_methods,
                "Lists class method names, inherited ones included.\n@return [List<String>]",
            ),
            native!(
                "constants",
                "()",
                Arity::exact(0),
                module_constants,
                "Lists the constants defined directly on the module.\n@return [List<String>]",
            ),
            native!(
                "const_get",
                "(name)",
                Arity::exact(1),
                module_const_get,
                "Looks up a constant by name.\n\
                 @param [String] name\n\
                 @raise [NameError] if there is no such constant\n\
                 @return [Object]",
            ),
            native!(
                "method",
                "(name)",
                Arity::exact(1),
                module_method,
                "Returns a class method as a function value.\n\
                 @param [String] name\n\
                 @return [Function]\n\
                 @example\n  let root = Math.method(\"sqrt\")\n  root(16) # => 4.0",
            ),
            native!(
                "include?",
                "(module)",
                Arity::exact(1),
                module_include,
                "Tests whether +module+ is among the ancestors.\n@return [Boolean]",
            ),
            native!("doc", "()", Arity::exact(0), module_doc, "Returns the documentation string.\n@return [String]"),
        ],
        ..TypeDef::new("Module", TypeKind::Class, here!())
    }
}

fn receiver_type(receiver: &Value) -> RunResult<&'static TypeDef> {
    type_arg(receiver)
}

fn module_name(_: &mut Interp<'_>, receiver: &Value, _: Vec<Value>) -> RunResult<Value> {
    Ok(Value::from(receiver_type(receiver)?.name))
}

fn module_superclass(_: &mut Interp<'_>, receiver: &Value, _: Vec<Value>) -> RunResult<Value> {
    Ok(receiver_type(receiver)?.superclass().map_or(Value::Nil, Value::Type))
}

fn module_ancestors(_: &mut Interp<'_>, receiver: &Value, _: Vec<Value>) -> RunResult<Value> {
    let ancestors = receiver_type(receiver)?.ancestors();
    Ok(Value::List(ancestors.into_iter().map(Value::Type).collect()))
}

fn module_instance_methods(_: &mut Interp<'_>, receiver: &Value, args: Vec<Value>) -> RunResult<Value> {
    let inherit = args.first().is_none_or(Value::truthy);
    Ok(names_value(receiver_type(receiver)?.public_instance_methods(inherit)))
}

fn module_methods(_: &mut Interp<'_>, receiver: &Value, _: Vec<Value>) -> RunResult<Value> {
    Ok(names_value(receiver_type(receiver)?.class_method_names(true)))
}

fn module_constants(_: &mut Interp<'_>, receiver: &Value, _: Vec<Value>) -> RunResult<Value> {
    let def = receiver_type(receiver)?;
    let mut names: Vec<&str> = def.constants.iter().map(|constant| constant.name).collect();
    if std::ptr::eq(def, &types().object) {
        names.extend(types().all().iter().map(|def| def.name));
    }
    Ok(names_value(names))
}

fn module_const_get(_: &mut Interp<'_>, receiver: &Value, args: Vec<Value>) -> RunResult<Value> {
    lookup_constant(receiver_type(receiver)?, str_arg(&args[0])?)
}

fn module_method(_: &mut Interp<'_>, receiver: &Value, args: Vec<Value>) -> RunResult<Value> {
    let def = receiver_type(receiver)?;
    let name = str_arg(&args[0])?;
    def.find_class_method(name)
        .map(|func| Value::Function(Callable::Native { owner: def, func }))
        .ok_or_else(|| {
            Exception::new(
                ExcKind::NameError,
                format!("undefined method `{name}' for module `{}'", def.name),
            )
        })
}

fn module_include(_: &mut Interp<'_>, receiver: &Value, args: Vec<Value>) -> RunResult<Value> {
    let def = receiver_type(receiver)?;
    let target = type_arg(&args[0])?;
    Ok(Value::Bool(
        !std::ptr::eq(def, target) && def.ancestors().iter().any(|ancestor| std::ptr::eq(*ancestor, target)),
    ))
}

fn module_doc(_: &mut Interp<'_>, receiver: &Value, _: Vec<Value>) -> RunResult<Value> {
    Ok(Value::from(receiver_type(receiver)?.doc))
}

// ============================================================================
// Function
// ============================================================================

pub(super) fn function() -> TypeDef {
    TypeDef {
        doc: "A reference to a builtin or user-defined function.\n\n\
              Function values are called with `f(x)` or `f.call(x)`.",
        instance_methods: vec![
            native!(
                "call",
                "(*args)",
                Arity::at_least(0),
                function_call,
                "Calls the function.\n@return [Object] the function's result",
            ),
            native!(
                "arity",
                "()",
                Arity::exact(0),
                function_arity,
                "Number of required arguments, negative (`-n-1`) when optional ones exist.\n@return [Integer]",
            ),
            native!("name", "()", Arity::exact(0), function_name, "Returns the function's name.\n@return [String]"),
            native!(
                "signature",
                "()",
                Arity::exact(0),
                function_signature,
                "Returns the parameter list.\n@return [String]",
            ),
            native!(
                "source",
                "()",
                Arity::exact(0),
                function_source,
                "Returns the definition's source text, nil for builtins.\n@return [String, nil]",
            ),
        ],
        ..TypeDef::new("Function", TypeKind::Class, here!())
    }
}

fn receiver_callable(receiver: &Value) -> RunResult<&Callable> {
    callable_arg(receiver)
}

fn function_call(interp: &mut Interp<'_>, receiver: &Value, args: Vec<Value>) -> RunResult<Value> {
    let callable = receiver_callable(receiver)?.clone();
    interp.call(&callable, args)
}

fn function_arity(_: &mut Interp<'_>, receiver: &Value, _: Vec<Value>) -> RunResult<Value> {
    let (min, max) = receiver_callable(receiver)?.arity();
    let required = i64::try_from(min).unwrap_or(i64::MAX);
    Ok(Value::Int(if max == Some(min) { required } else { -required - 1 }))
}

fn function_name(_: &mut Interp<'_>, receiver: &Value, _: Vec<Value>) -> RunResult<Value> {
    Ok(Value::from(receiver_callable(receiver)?.qualified_name()))
}

fn function_signature(_: &mut Interp<'_>, receiver: &Value, _: Vec<Value>) -> RunResult<Value> {
    Ok(Value::from(receiver_callable(receiver)?.signature()))
}

fn function_source(_: &mut Interp<'_>, receiver: &Value, _: Vec<Value>) -> RunResult<Value> {
    Ok(match receiver_callable(receiver)? {
        Callable::User(function) => Value::Str(function.source.clone()),
        Callable::Native { .. } => Value::Nil,
    })
}

// ============================================================================
// NilClass and Boolean
// ============================================================================

pub(super) fn nil() -> TypeDef {
    TypeDef {
        doc: "The class of `nil`, the absent value.",
        instance_methods: vec![
            native!("to_a", "()", Arity::exact(0), nil_to_a, "Returns an empty list.\n@return [List]"),
            native!("to_i", "()", Arity::exact(0), nil_to_i, "Returns 0.\n@return [Integer]"),
        ],
        ..TypeDef::new("NilClass", TypeKind::Class, here!())
    }
}

fn nil_to_a(_: &mut Interp<'_>, _: &Value, _: Vec<Value>) -> RunResult<Value> {
    Ok(Value::List(Vec::new()))
}

fn nil_to_i(_: &mut Interp<'_>, _: &Value, _: Vec<Value>) -> RunResult<Value> {
    Ok(Value::Int(0))
}

pub(super) fn boolean() -> TypeDef {
    TypeDef {
        doc: "The class of `true` and `false`.",
        instance_methods: vec![
            native!(
                "xor",
                "(other)",
                Arity::exact(1),
                boolean_xor,
                "Exclusive or of the receiver and the truthiness of +other+.\n@return [Boolean]",
            ),
            native!("to_i", "()", Arity::exact(0), boolean_to_i, "Returns 1 for true and 0 for false.\n@return [Integer]"),
        ],
        ..TypeDef::new("Boolean", TypeKind::Class, here!())
    }
}

fn boolean_xor(_: &mut Interp<'_>, receiver: &Value, args: Vec<Value>) -> RunResult<Value> {
    Ok(Value::Bool(receiver.truthy() != args[0].truthy()))
}

fn boolean_to_i(_: &mut Interp<'_>, receiver: &Value, _: Vec<Value>) -> RunResult<Value> {
    Ok(Value::Int(i64::from(receiver.truthy())))
}
