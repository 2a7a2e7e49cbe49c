//! Evaluation of tether script: values, name resolution, errors and console I/O.

use pretty_assertions::assert_eq;
use tether::{
    Binding, CodeLoc, CollectConsole, ConsoleEvent, ExcKind, Exception, Limits, MAX_VALUE_DEPTH, Runtime, ScriptedConsole,
    Value,
};

fn eval(runtime: &Runtime, code: &str) -> Result<Value, Exception> {
    runtime.evaluate(code, &CodeLoc::new("test.tt", 1), &mut CollectConsole::new())
}

fn eval_ok(code: &str) -> Value {
    eval(&Runtime::default(), code).unwrap()
}

fn eval_err(code: &str) -> String {
    eval(&Runtime::default(), code).unwrap_err().to_string()
}

// ============================================================================
// Values and operators
// ============================================================================

#[test]
fn arithmetic_and_precedence() {
    assert_eq!(eval_ok("1 + 2 * 3"), Value::Int(7));
    assert_eq!(eval_ok("(1 + 2) * 3"), Value::Int(9));
    assert_eq!(eval_ok("7 / 2"), Value::Int(3));
    assert_eq!(eval_ok("-7 / 2"), Value::Int(-4));
    assert_eq!(eval_ok("7 % 3"), Value::Int(1));
    assert_eq!(eval_ok("1 + 0.5"), Value::Float(1.5));
}

#[test]
fn strings_lists_and_maps() {
    assert_eq!(eval_ok("\"ab\" + \"cd\""), Value::str("abcd"));
    assert_eq!(eval_ok("[1, 2] + [3]"), Value::from(vec![Value::Int(1), Value::Int(2), Value::Int(3)]));
    assert_eq!(eval_ok("{\"a\": 1, b: 2}[\"b\"]"), Value::Int(2));
    assert_eq!(eval_ok("{a: 1}[\"missing\"]"), Value::Nil);
    assert_eq!(eval_ok("[1, 2, 3][-1]"), Value::Int(3));
    assert_eq!(eval_ok("[1, 2, 3][5]"), Value::Nil);
    assert_eq!(eval_ok("\"hello\"[1]"), Value::str("e"));
}

#[test]
fn inspect_forms() {
    assert_eq!(eval_ok("[1, \"two\", nil, 3.0]").inspect(), "[1, \"two\", nil, 3.0]");
    assert_eq!(eval_ok("{a: [true]}").inspect(), "{\"a\": [true]}");
    assert_eq!(eval_ok("Math").inspect(), "Math");
}

#[test]
fn short_circuit_and_conditionals() {
    assert_eq!(eval_ok("nil || 5"), Value::Int(5));
    assert_eq!(eval_ok("false && undefined_name"), Value::Bool(false));
    assert_eq!(eval_ok("if 1 < 2 then \"yes\" else \"no\""), Value::str("yes"));
    assert_eq!(eval_ok("if false then 1"), Value::Nil);
    assert_eq!(eval_ok("!nil"), Value::Bool(true));
}

#[test]
fn methods_and_constants() {
    assert_eq!(eval_ok("\"hello\".upcase"), Value::str("HELLO"));
    assert_eq!(eval_ok("[3, 1, 2].sort.first"), Value::Int(1));
    assert_eq!(eval_ok("Math.sqrt(16)"), Value::Float(4.0));
    assert_eq!(eval_ok("Math::PI > 3.14"), Value::Bool(true));
    assert_eq!(eval_ok("Integer::MAX"), Value::Int(i64::MAX));
    assert_eq!(eval_ok("5.is_a?(Numeric)"), Value::Bool(true));
}

#[test]
fn lists_are_values() {
    let runtime = Runtime::default();
    eval(&runtime, "let xs = [1]\nlet ys = xs.push(2)").unwrap();
    assert_eq!(runtime.global("xs"), Some(Value::from(vec![Value::Int(1)])));
    assert_eq!(runtime.global("ys"), Some(Value::from(vec![Value::Int(1), Value::Int(2)])));
}

// ============================================================================
// Functions and scoping
// ============================================================================

#[test]
fn user_functions_recurse() {
    let runtime = Runtime::default();
    eval(&runtime, "fn fact(n) = if n <= 1 then 1 else n * fact(n - 1)").unwrap();
    assert_eq!(eval(&runtime, "fact(10)").unwrap(), Value::Int(3_628_800));
    assert_eq!(runtime.function("fact").unwrap().signature(), "(n)");
}

#[test]
fn functions_are_values() {
    let runtime = Runtime::default();
    eval(&runtime, "fn double(x) = x * 2").unwrap();
    assert_eq!(
        eval(&runtime, "[1, 2, 3].map(double)").unwrap(),
        Value::from(vec![Value::Int(2), Value::Int(4), Value::Int(6)])
    );
    assert_eq!(eval(&runtime, "double").unwrap().inspect(), "#<fn double(x)>");
    assert_eq!(eval(&runtime, "Math.method(\"sqrt\").call(9)").unwrap(), Value::Float(3.0));
}

#[test]
fn doc_comments_attach_to_functions() {
    let runtime = Runtime::default();
    eval(&runtime, "## Adds one.\n## @param [Integer] n\nfn inc(n) = n + 1").unwrap();
    let function = runtime.function("inc").unwrap();
    assert_eq!(function.doc.as_deref(), Some("Adds one.\n@param [Integer] n"));
    assert_eq!(function.source, "fn inc(n) = n + 1");
    assert_eq!(function.location, CodeLoc::new("test.tt", 3));
}

#[test]
fn top_level_bindings_are_globals() {
    let runtime = Runtime::default();
    assert_eq!(eval(&runtime, "let x = 2; x * 21").unwrap(), Value::Int(42));
    assert_eq!(runtime.global("x"), Some(Value::Int(2)));
    assert_eq!(eval(&runtime, "x = x + 1").unwrap(), Value::Int(3));
    assert_eq!(runtime.global_names(), vec!["x".to_owned()]);
}

#[test]
fn session_bindings_keep_private_locals() {
    let runtime = Runtime::default();
    let mut binding = Binding::new(Value::Nil);
    let loc = CodeLoc::default();
    runtime
        .evaluate_in(&mut binding, "let secret = 7", &loc, &mut CollectConsole::new())
        .unwrap();
    let value = runtime
        .evaluate_in(&mut binding, "secret + 1", &loc, &mut CollectConsole::new())
        .unwrap();
    assert_eq!(value, Value::Int(8));
    assert_eq!(runtime.global("secret"), None);
    assert_eq!(binding.local_names(), vec!["secret".to_owned()]);
}

#[test]
fn assignment_in_a_session_updates_existing_globals() {
    let runtime = Runtime::default();
    eval(&runtime, "let counter = 1").unwrap();
    let mut binding = Binding::new(Value::Nil);
    runtime
        .evaluate_in(&mut binding, "counter = counter + 1", &CodeLoc::default(), &mut CollectConsole::new())
        .unwrap();
    assert_eq!(runtime.global("counter"), Some(Value::Int(2)));
    assert!(binding.local_names().is_empty());
}

#[test]
fn self_methods_resolve_without_receiver() {
    let runtime = Runtime::default();
    let mut binding = Binding::new(Value::str("hello"));
    assert_eq!(binding.label(), "\"hello\"");
    let loc = CodeLoc::default();
    let mut console = CollectConsole::new();
    assert_eq!(runtime.evaluate_in(&mut binding, "length", &loc, &mut console).unwrap(), Value::Int(5));
    assert_eq!(runtime.evaluate_in(&mut binding, "self.upcase", &loc, &mut console).unwrap(), Value::str("HELLO"));
    assert_eq!(runtime.evaluate_in(&mut binding, "center(9, \"*\")", &loc, &mut console).unwrap(), Value::str("**hello**"));
}

#[test]
fn type_bindings_reach_class_methods_and_constants() {
    let runtime = Runtime::default();
    let mut binding = Binding::new(eval(&runtime, "Math").unwrap());
    let loc = CodeLoc::default();
    let mut console = CollectConsole::new();
    assert_eq!(runtime.evaluate_in(&mut binding, "sqrt(4)", &loc, &mut console).unwrap(), Value::Float(2.0));
    assert_eq!(
        runtime.evaluate_in(&mut binding, "PI", &loc, &mut console).unwrap(),
        Value::Float(std::f64::consts::PI)
    );
}

// ============================================================================
// Errors
// ============================================================================

#[test]
fn undefined_names() {
    assert_eq!(eval_err("nope"), "NameError: undefined local variable or method `nope' for main");
    assert_eq!(eval_err("nope(1)"), "NoMethodError: undefined method `nope' for main");
    assert_eq!(eval_err("1.frobnicate"), "NoMethodError: undefined method `frobnicate' for 1:Integer");
    assert_eq!(eval_err("Math::TAU"), "NameError: uninitialized constant Math::TAU");
}

#[test]
fn private_methods_need_an_implicit_receiver() {
    assert_eq!(eval_err("1.puts"), "NoMethodError: private method `puts' called for 1:Integer");
    let runtime = Runtime::default();
    eval(&runtime, "fn helper() = 1").unwrap();
    assert_eq!(
        eval(&runtime, "2.helper").unwrap_err().to_string(),
        "NoMethodError: private method `helper' called for 2:Integer"
    );
    assert_eq!(eval_ok("Kernel.inspect(1)"), Value::str("1"));
}

#[test]
fn type_and_arithmetic_errors() {
    assert_eq!(eval_err("1 / 0"), "ZeroDivisionError: divided by 0");
    assert_eq!(eval_err("9223372036854775807 + 1"), "ArithmeticError: integer overflow");
    assert_eq!(eval_err("1 + \"a\""), "TypeError: String can't be coerced into Integer");
    assert_eq!(eval_err("[1].fetch(3)"), "IndexError: index 3 outside of list bounds: -1...1");
    assert_eq!(eval_err("{a: 1}.fetch(\"b\")"), "KeyError: key not found: \"b\"");
    assert_eq!(eval_err("\"abc\".center()"), "ArgumentError: wrong number of arguments (given 0, expected 1..2)");
    assert_eq!(eval_err("{1: 2}"), "TypeError: map keys must be strings, got Integer");
}

#[test]
fn syntax_errors_carry_the_location() {
    let err = eval(&Runtime::default(), "1 +\n\n)").unwrap_err();
    assert_eq!(err.kind(), ExcKind::SyntaxError);
    assert!(err.message().starts_with("test.tt:3:"), "{}", err.message());
}

#[test]
fn raise_builds_a_backtrace() {
    let runtime = Runtime::default();
    let err = eval(&runtime, "fn boom(x) = raise(\"ArgumentError\", \"bad \" + x)\nboom(\"y\")").unwrap_err();
    assert_eq!(err.to_string(), "ArgumentError: bad y");
    assert_eq!(
        err.backtrace(),
        vec!["test.tt:1:in `boom`".to_owned(), "test.tt:2:in `<main>`".to_owned()]
    );
    assert_eq!(eval_err("raise(\"plain\")"), "RuntimeError: plain");
    assert_eq!(eval_err("raise(\"Oops\", \"x\")"), "ArgumentError: unknown exception kind `Oops`");
}

#[test]
fn call_depth_is_limited() {
    let runtime = Runtime::new(Limits::new().max_call_depth(20));
    eval(&runtime, "fn down(n) = down(n + 1)").unwrap();
    let err = eval(&runtime, "down(0)").unwrap_err();
    assert_eq!(err.to_string(), "SystemStackError: stack level too deep");
    assert_eq!(eval(&runtime, "fn ok(n) = if n == 0 then 0 else ok(n - 1)\nok(10)").unwrap(), Value::Int(0));
}

/// `let x = 1` followed by `depth` statements of `step`, one per line.
fn nesting(step: &str, depth: usize) -> String {
    format!("let x = 1\n{}", format!("{step}\n").repeat(depth))
}

#[test]
fn value_nesting_is_limited() {
    let runtime = Runtime::default();
    eval(&runtime, &nesting("x = [x]", MAX_VALUE_DEPTH)).unwrap();
    assert_eq!(eval(&runtime, "x.length").unwrap(), Value::Int(1));

    let err = eval(&runtime, "x = [x]").unwrap_err();
    assert_eq!(err.to_string(), "SystemStackError: value nested too deeply");
    assert_eq!(err.backtrace(), vec!["test.tt:1:in `<main>`".to_owned()]);
}

#[test]
fn deep_nesting_fails_without_aborting() {
    for step in ["x = [x]", "x = {k: x}", "x = [].push(x)", "x = {}.store(\"k\", x)", "x = [1].zip([x])"] {
        let runtime = Runtime::default();
        let err = eval(&runtime, &nesting(step, 20_000)).unwrap_err();
        assert_eq!(err.kind(), ExcKind::SystemStackError, "{step}");
        // the last accepted value is still usable
        assert_eq!(eval(&runtime, "x == x").unwrap(), Value::Bool(true), "{step}");
    }
}

// ============================================================================
// Console I/O
// ============================================================================

#[test]
fn output_goes_to_the_console() {
    let runtime = Runtime::default();
    let mut console = CollectConsole::new();
    let value = runtime
        .evaluate("puts(\"a\", [1, 2])\nprint(\"x\", 3)\np(\"q\")", &CodeLoc::default(), &mut console)
        .unwrap();
    assert_eq!(value, Value::str("q"));
    assert_eq!(console.output(), "a\n1\n2\nx3\"q\"\n");
}

#[test]
fn gets_reads_from_the_console() {
    let runtime = Runtime::default();
    let mut console = ScriptedConsole::new(["bob"]);
    let value = runtime
        .evaluate("let name = gets(\"who? \")\nputs(\"hi \" + name)\ngets()", &CodeLoc::default(), &mut console)
        .unwrap();
    assert_eq!(value, Value::Nil);
    assert_eq!(
        console.events(),
        [
            ConsoleEvent::Read("who? ".to_owned()),
            ConsoleEvent::Write("hi bob\n".to_owned()),
            ConsoleEvent::Read(String::new()),
        ]
    );
}

#[test]
fn puts_writes_once_per_line() {
    let runtime = Runtime::default();
    let mut console = ScriptedConsole::new(Vec::<String>::new());
    runtime
        .evaluate("fn show(i) = puts(i)\n3.times(show)", &CodeLoc::default(), &mut console)
        .unwrap();
    assert_eq!(
        console.events(),
        [
            ConsoleEvent::Write("0\n".to_owned()),
            ConsoleEvent::Write("1\n".to_owned()),
            ConsoleEvent::Write("2\n".to_owned()),
        ]
    );
}
