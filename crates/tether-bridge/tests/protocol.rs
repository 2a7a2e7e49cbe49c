//! End-to-end request/result scenarios over in-memory streams.

use pretty_assertions::assert_eq;
use serde_json::{Value, json};
use tether::{Runtime, repl::ReplOptions};
use tether_bridge::{
    dispatch::Dispatcher,
    handler::{ServerState, standard_commands},
    serve,
};

fn dispatcher(banner: bool) -> Dispatcher {
    let options = ReplOptions {
        banner,
        name: "t".to_owned(),
    };
    Dispatcher::new(standard_commands(), ServerState::new(Runtime::default(), options))
}

/// Feeds raw request lines through the bridge and decodes every result line.
fn exchange(dispatcher: &mut Dispatcher, lines: &[&str]) -> Vec<Value> {
    let input = lines.join("\n");
    let mut output = Vec::new();
    serve(input.as_bytes(), &mut output, dispatcher).unwrap();
    String::from_utf8(output)
        .unwrap()
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect()
}

fn run(lines: &[Value]) -> Vec<Value> {
    let lines: Vec<String> = lines.iter().map(Value::to_string).collect();
    let lines: Vec<&str> = lines.iter().map(String::as_str).collect();
    exchange(&mut dispatcher(false), &lines)
}

fn write(id: &str, text: &str) -> Value {
    json!({"success": true, "repl-id": id, "type": "write", "string": text})
}

fn read(id: &str, prompt: &str) -> Value {
    json!({"success": true, "repl-id": id, "type": "read", "prompt": prompt})
}

fn handled(id: &str) -> Value {
    json!({"success": true, "repl-id": id})
}

fn handle(id: &str, argument: &str) -> Value {
    json!({"type": "repl-handle", "id": id, "argument": argument})
}

// =============================================================================
// Stateless commands
// =============================================================================

#[test]
fn eval_returns_the_inspected_value() {
    let results = run(&[
        json!({"type": "eval", "code": "[1, 2].length + 1", "filename": "a.tt", "line": 1}),
        json!({"type": "eval", "code": "puts(\"hi\"); :x", "filename": "a.tt", "line": 1}),
        json!({"type": "eval", "code": "puts(\"hi\")\n\"done\""}),
    ]);
    assert_eq!(results[0], json!({"success": true, "result": "3"}));
    assert_eq!(results[1]["success"], json!(false));
    assert_eq!(results[2], json!({"success": true, "result": "\"done\"", "stdout": "hi\n"}));
}

#[test]
fn eval_failures_carry_kind_and_backtrace() {
    let results = run(&[
        json!({"type": "eval", "code": "1 / 0", "filename": "x.tt", "line": 3}),
        json!({"type": "eval", "code": "fn f(x) = x.nope\n\nf(1)", "filename": "y.tt", "line": 1}),
    ]);
    assert_eq!(
        results[0],
        json!({"success": false, "error": "ZeroDivisionError: divided by 0", "backtrace": ["x.tt:3:in `<main>`"]})
    );
    assert_eq!(
        results[1],
        json!({
            "success": false,
            "error": "NoMethodError: undefined method `nope' for 1:Integer",
            "backtrace": ["y.tt:1:in `f`", "y.tt:3:in `<main>`"],
        })
    );
}

#[test]
fn eval_state_is_shared_with_sessions() {
    let results = run(&[
        json!({"type": "eval", "code": "let greeting = \"hello\"\nfn shout(s) = s.upcase"}),
        json!({"type": "repl-start", "id": "s", "object": "nil"}),
        handle("s", ""),
        handle("s", "shout(greeting)"),
    ]);
    assert_eq!(results[4], write("s", "=> \"HELLO\"\n"));
}

#[test]
fn bad_request_fields() {
    let results = run(&[
        json!({"type": "eval"}),
        json!({"type": "search-doc", "input": 5}),
    ]);
    let error = results[0]["error"].as_str().unwrap();
    assert!(error.starts_with("ArgumentError: invalid eval request: missing field `code`"), "{error}");
    assert_eq!(results[0]["backtrace"], json!([]));
    assert_eq!(results[1]["success"], json!(false));
}

#[test]
fn unknown_types_are_reported() {
    let results = run(&[json!({"type": "frobnicate"}), json!({"no": "type"}), json!({"type": 3})]);
    assert_eq!(
        results,
        vec![
            json!({"success": false, "error": "Unknown query type: frobnicate", "backtrace": []}),
            json!({"success": false, "error": "Unknown query type: ", "backtrace": []}),
            json!({"success": false, "error": "Unknown query type: 3", "backtrace": []}),
        ]
    );
}

#[test]
fn malformed_lines_produce_no_result() {
    let results = exchange(
        &mut dispatcher(false),
        &["{not json", "", "\"just a string\"", r#"{"type":"eval","code":"6 * 7"}"#],
    );
    assert_eq!(results, vec![json!({"success": true, "result": "42"})]);
}

#[test]
fn search_doc_lists_prefixed_symbols() {
    let results = run(&[json!({"type": "search-doc", "input": "Math::"})]);
    let mut completions: Vec<String> = serde_json::from_value(results[0]["completions"].clone()).unwrap();
    completions.sort();
    assert_eq!(completions, vec!["Math::E".to_owned(), "Math::PI".to_owned()]);
    assert_eq!(results[0]["success"], json!(true));
}

#[test]
fn object_info() {
    let results = run(&[
        json!({"type": "object-info", "symbol": "DoesNotExist123"}),
        json!({"type": "object-info", "symbol": "String#upcase"}),
        json!({"type": "object-info", "symbol": "Integer"}),
    ]);
    assert_eq!(
        results[0],
        json!({"success": false, "error": "Can't find object: DoesNotExist123", "backtrace": []})
    );

    let method = &results[1];
    assert_eq!(method["success"], json!(true));
    assert_eq!(method["symbol"], json!("String#upcase"));
    assert_eq!(method["type"], json!("method"));
    assert_eq!(method["language"], json!("native"));
    assert_eq!(method["visibility"], json!("public"));
    assert_eq!(method["source"], json!(null));
    assert!(method["doc"]["text"].is_string());

    let class = &results[2];
    assert_eq!(class["type"], json!("class"));
    assert_eq!(class["superclass"], json!("Numeric"));
    assert!(class["instance-methods"]["old"].as_array().unwrap().contains(&json!("abs")));
    assert!(class["source-location"][0].as_str().unwrap().ends_with(".rs"));
}

// =============================================================================
// Sessions
// =============================================================================

#[test]
fn first_handle_yields_one_read_without_writes() {
    let results = run(&[json!({"type": "repl-start", "id": "s1", "object": "42"}), handle("s1", "")]);
    assert_eq!(results, vec![json!({"success": true}), read("s1", "[1] t(42)> "), handled("s1")]);
}

#[test]
fn banner_arrives_as_a_write_before_the_first_read() {
    let lines = [
        json!({"type": "repl-start", "id": "s1", "object": "42"}).to_string(),
        handle("s1", "").to_string(),
    ];
    let results = exchange(&mut dispatcher(true), &[&lines[0], &lines[1]]);
    assert_eq!(results.len(), 4);
    assert_eq!(results[1]["type"], json!("write"));
    assert!(results[1]["string"].as_str().unwrap().starts_with("t "));
    assert_eq!(results[2], read("s1", "[1] t(42)> "));
    assert_eq!(results[3], handled("s1"));
}

#[test]
fn writes_precede_the_read_in_order() {
    let results = run(&[
        json!({"type": "repl-start", "id": "s1", "object": "42"}),
        handle("s1", ""),
        handle("s1", "puts(\"a\"); print(\"b\", \"c\"); self + 1"),
    ]);
    assert_eq!(
        results[3..],
        [
            write("s1", "a\n"),
            write("s1", "b"),
            write("s1", "c"),
            write("s1", "=> 43\n"),
            read("s1", "[2] t(42)> "),
            handled("s1"),
        ]
    );
}

#[test]
fn methods_of_the_target_are_in_scope() {
    let results = run(&[
        json!({"type": "repl-start", "id": "s", "object": "-5"}),
        handle("s", ""),
        handle("s", "abs"),
        handle("s", "nope"),
    ]);
    assert_eq!(results[3], write("s", "=> 5\n"));
    assert_eq!(
        results[6],
        write("s", "NameError: undefined local variable or method `nope' for -5\n")
    );
}

#[test]
fn gets_suspends_mid_evaluation() {
    let results = run(&[
        json!({"type": "repl-start", "id": "s", "object": "nil"}),
        handle("s", ""),
        handle("s", "let name = gets(\"who? \")"),
        handle("s", "bob"),
    ]);
    assert_eq!(results[3..5], [read("s", "who? "), handled("s")]);
    assert_eq!(results[5..], [write("s", "=> \"bob\"\n"), read("s", "[2] t(main)> "), handled("s")]);
}

#[test]
fn stop_is_idempotent_and_forgets_the_session() {
    let results = run(&[
        json!({"type": "repl-start", "id": "s1", "object": "nil"}),
        handle("s1", ""),
        json!({"type": "repl-stop", "id": "s1"}),
        json!({"type": "repl-stop", "id": "s1"}),
        handle("s1", "1"),
        json!({"type": "repl-complete", "id": "s1", "word": "x"}),
    ]);
    assert_eq!(results[3], json!({"success": true}));
    assert_eq!(results[4], json!({"success": true}));
    assert_eq!(
        results[5],
        json!({"success": false, "error": "No such REPL: s1", "backtrace": [], "repl-id": "s1"})
    );
    assert_eq!(
        results[6],
        json!({"success": false, "error": "No such REPL: s1", "backtrace": []})
    );
}

#[test]
fn never_started_ids_are_not_found() {
    let results = run(&[
        handle("ghost", "1"),
        json!({"type": "repl-complete", "id": "ghost", "word": "p"}),
        json!({"type": "repl-stop", "id": "ghost"}),
        json!({"type": "repl-list"}),
    ]);
    assert_eq!(results[0]["error"], json!("No such REPL: ghost"));
    assert_eq!(results[1]["error"], json!("No such REPL: ghost"));
    assert_eq!(results[2], json!({"success": true}));
    assert_eq!(results[3], json!({"success": true, "sessions": []}));
}

#[test]
fn exiting_ends_the_session() {
    let results = run(&[
        json!({"type": "repl-start", "id": "s", "object": "nil"}),
        handle("s", ""),
        handle("s", "exit"),
        json!({"type": "repl-list"}),
        handle("s", "1"),
    ]);
    assert_eq!(results[3], json!({"success": true, "repl-id": "s", "exited": true}));
    assert_eq!(
        results[4],
        json!({"success": true, "sessions": [{"id": "s", "alive": false, "state": "terminated"}]})
    );
    assert_eq!(results[5]["error"], json!("No such REPL: s"));
}

#[test]
fn completion_inside_a_session() {
    let results = run(&[
        json!({"type": "repl-start", "id": "s", "object": "nil"}),
        json!({"type": "repl-complete", "id": "s", "word": "Math::P"}),
        handle("s", ""),
        handle("s", "let velocity = 3"),
        json!({"type": "repl-complete", "id": "s", "word": "velo"}),
    ]);
    assert_eq!(results[1], json!({"success": true, "completions": []}));
    assert_eq!(results[7], json!({"success": true, "completions": ["velocity"]}));
}

#[test]
fn failing_target_is_an_error_result() {
    let results = run(&[
        json!({"type": "repl-start", "id": "s", "object": "nope"}),
        json!({"type": "repl-list"}),
    ]);
    assert_eq!(
        results[0],
        json!({
            "success": false,
            "error": "NameError: undefined local variable or method `nope' for main",
            "backtrace": ["(repl-start):1:in `<main>`"],
        })
    );
    assert_eq!(results[1], json!({"success": true, "sessions": []}));
}

#[test]
fn ids_are_echoed_verbatim() {
    let results = run(&[json!({"type": "repl-start", "id": 7, "object": "nil"}), json!({"type": "repl-handle", "id": 7})]);
    assert_eq!(results[1]["repl-id"], json!(7));
    assert_eq!(results[2], json!({"success": true, "repl-id": 7}));
}

#[test]
fn ids_of_different_json_types_are_distinct_sessions() {
    let results = run(&[
        json!({"type": "repl-start", "id": 7, "object": "1"}),
        json!({"type": "repl-start", "id": "7", "object": "2"}),
        json!({"type": "repl-handle", "id": 7}),
        json!({"type": "repl-handle", "id": "7"}),
        json!({"type": "repl-list"}),
    ]);
    assert_eq!(results[2]["prompt"], json!("[1] t(1)> "));
    assert_eq!(results[4]["prompt"], json!("[1] t(2)> "));
    assert_eq!(
        results[6],
        json!({
            "success": true,
            "sessions": [
                {"id": 7, "alive": true, "state": "suspended"},
                {"id": "7", "alive": true, "state": "suspended"},
            ],
        })
    );
}

#[test]
fn deeply_nested_values_fail_without_ending_the_process() {
    let deep = format!("let x = 1; {}", "x = [x]; ".repeat(20_000));
    let results = run(&[
        json!({"type": "eval", "code": deep}),
        json!({"type": "eval", "code": "1 + 1"}),
        json!({"type": "repl-start", "id": "s", "object": "nil"}),
        handle("s", ""),
        handle("s", &deep),
        handle("s", "x.length"),
    ]);
    assert_eq!(results[0]["error"], json!("SystemStackError: value nested too deeply"));
    assert_eq!(results[1], json!({"success": true, "result": "2"}));
    assert_eq!(results[5], write("s", "SystemStackError: value nested too deeply\n"));
    assert_eq!(results[8], write("s", "=> 1\n"));
}

#[test]
fn sessions_interleave_independently() {
    let results = run(&[
        json!({"type": "repl-start", "id": "a", "object": "1"}),
        json!({"type": "repl-start", "id": "b", "object": "2"}),
        handle("a", ""),
        handle("b", ""),
        handle("a", "self * 10"),
        handle("b", "self * 10"),
    ]);
    assert_eq!(results[6..9], [write("a", "=> 10\n"), read("a", "[2] t(1)> "), handled("a")]);
    assert_eq!(results[9..], [write("b", "=> 20\n"), read("b", "[2] t(2)> "), handled("b")]);
}
