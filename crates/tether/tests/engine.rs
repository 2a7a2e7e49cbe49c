//! Ordering and lifecycle of the session engine, driven with scripted backends.

use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};

use pretty_assertions::assert_eq;
use tether::{
    Console,
    engine::{EngineError, EngineState, SessionEngine, Step},
};

/// Resumes `engine` with `line`, returning the writes observed and where it stopped.
fn resume(engine: &mut SessionEngine, line: &str) -> (Vec<String>, Result<Step, EngineError>) {
    let mut writes = Vec::new();
    let step = engine.resume(line.to_owned(), &mut |text| writes.push(text.to_owned()));
    (writes, step)
}

/// Echoes each line back in upper case until it reads `bye`.
fn shouting_backend(console: &mut dyn Console) {
    console.write("hello\n").unwrap();
    loop {
        let Some(line) = console.read_line("> ") else {
            return;
        };
        if line == "bye" {
            let _ = console.write("goodbye\n");
            return;
        }
        for word in line.split_whitespace() {
            if console.write(&word.to_uppercase()).is_err() {
                return;
            }
        }
    }
}

#[test]
fn starts_lazily_and_discards_the_first_line() {
    let mut engine = SessionEngine::new("lazy", shouting_backend);
    assert_eq!(engine.state(), EngineState::NotStarted);
    let (writes, step) = resume(&mut engine, "ignored");
    assert_eq!(writes, vec!["hello\n".to_owned()]);
    assert_eq!(step.unwrap(), Step::Read("> ".to_owned()));
    assert_eq!(engine.state(), EngineState::Suspended);
}

#[test]
fn writes_arrive_in_order_before_the_next_read() {
    let mut engine = SessionEngine::new("order", shouting_backend);
    resume(&mut engine, "").1.unwrap();
    let (writes, step) = resume(&mut engine, "one two three");
    assert_eq!(writes, vec!["ONE".to_owned(), "TWO".to_owned(), "THREE".to_owned()]);
    assert_eq!(step.unwrap(), Step::Read("> ".to_owned()));
}

#[test]
fn zero_writes_yields_just_the_read() {
    let mut engine = SessionEngine::new("quiet", |console: &mut dyn Console| {
        while console.read_line("? ").is_some() {}
    });
    let (writes, step) = resume(&mut engine, "");
    assert!(writes.is_empty());
    assert_eq!(step.unwrap(), Step::Read("? ".to_owned()));
    let (writes, step) = resume(&mut engine, "anything");
    assert!(writes.is_empty());
    assert_eq!(step.unwrap(), Step::Read("? ".to_owned()));
}

#[test]
fn finishing_terminates_the_engine() {
    let mut engine = SessionEngine::new("finish", shouting_backend);
    resume(&mut engine, "").1.unwrap();
    let (writes, step) = resume(&mut engine, "bye");
    assert_eq!(writes, vec!["goodbye\n".to_owned()]);
    assert_eq!(step.unwrap(), Step::Finished);
    assert!(!engine.is_alive());

    let (writes, step) = resume(&mut engine, "again");
    assert!(writes.is_empty());
    assert!(matches!(step, Err(EngineError::Terminated)));
    assert!(matches!(engine.complete("x"), Err(EngineError::Terminated)));
}

#[test]
fn a_backend_that_never_reads_finishes_on_first_resume() {
    let mut engine = SessionEngine::new("oneshot", |console: &mut dyn Console| {
        console.write("a").unwrap();
        console.write("b").unwrap();
    });
    let (writes, step) = resume(&mut engine, "");
    assert_eq!(writes, vec!["a".to_owned(), "b".to_owned()]);
    assert_eq!(step.unwrap(), Step::Finished);
}

#[test]
fn panics_are_reported_and_terminate() {
    let mut engine = SessionEngine::new("panicky", |console: &mut dyn Console| {
        console.write("before\n").unwrap();
        panic!("backend exploded");
    });
    let (writes, step) = resume(&mut engine, "");
    assert_eq!(writes, vec!["before\n".to_owned()]);
    match step {
        Err(EngineError::Panicked(message)) => assert_eq!(message, "backend exploded"),
        other => panic!("expected a panic report, got {other:?}"),
    }
    assert_eq!(engine.state(), EngineState::Terminated);
}

#[test]
fn dropping_a_suspended_engine_unwinds_the_backend() {
    let unwound = Arc::new(AtomicBool::new(false));
    let flag = Arc::clone(&unwound);
    let mut engine = SessionEngine::new("dropped", move |console: &mut dyn Console| {
        let eof = console.read_line("> ").is_none();
        flag.store(eof, Ordering::SeqCst);
    });
    assert_eq!(resume(&mut engine, "").1.unwrap(), Step::Read("> ".to_owned()));
    drop(engine);
    assert!(unwound.load(Ordering::SeqCst), "backend should see end of input");
}

#[test]
fn writes_fail_once_the_engine_is_gone() {
    let closed = Arc::new(AtomicBool::new(false));
    let flag = Arc::clone(&closed);
    let engine = {
        let mut engine = SessionEngine::new("closed", move |console: &mut dyn Console| {
            if console.read_line("> ").is_none() {
                flag.store(console.write("late").is_err(), Ordering::SeqCst);
            }
        });
        resume(&mut engine, "").1.unwrap();
        engine
    };
    drop(engine);
    assert!(closed.load(Ordering::SeqCst));
}

#[test]
fn dropping_an_unstarted_engine_never_runs_the_backend() {
    let ran = Arc::new(AtomicBool::new(false));
    let flag = Arc::clone(&ran);
    let engine = SessionEngine::new("never", move |_: &mut dyn Console| flag.store(true, Ordering::SeqCst));
    drop(engine);
    assert!(!ran.load(Ordering::SeqCst));
}

#[test]
fn completer_installed_by_the_backend() {
    let mut engine = SessionEngine::new("complete", |console: &mut dyn Console| {
        console.set_completer(Arc::new(|word: &str| -> Vec<String> {
            ["alpha", "alps", "beta"]
                .iter()
                .filter(|candidate| candidate.starts_with(word))
                .map(ToString::to_string)
                .collect()
        }));
        while console.read_line("> ").is_some() {}
    });
    assert_eq!(engine.complete("al").unwrap(), Vec::<String>::new());
    resume(&mut engine, "").1.unwrap();
    assert_eq!(engine.complete("al").unwrap(), vec!["alpha".to_owned(), "alps".to_owned()]);
}

#[test]
fn gets_inside_an_evaluation_suspends_the_session() {
    use tether::{Binding, Runtime, Value, repl::{Repl, ReplOptions}};

    let runtime = Runtime::default();
    let options = ReplOptions { banner: false, name: "t".to_owned() };
    let repl = Repl::new(runtime, Binding::new(Value::Nil), options);
    let mut engine = SessionEngine::new("nested", move |console: &mut dyn Console| {
        let mut repl = repl;
        repl.run(console);
    });
    assert_eq!(resume(&mut engine, "").1.unwrap(), Step::Read("[1] t(main)> ".to_owned()));
    let (writes, step) = resume(&mut engine, "puts(\"a\"); let n = gets(\"name? \"); puts(\"b\")");
    assert_eq!(writes, vec!["a\n".to_owned()]);
    assert_eq!(step.unwrap(), Step::Read("name? ".to_owned()));
    let (writes, step) = resume(&mut engine, "zed");
    assert_eq!(writes, vec!["b\n".to_owned(), "=> nil\n".to_owned()]);
    assert_eq!(step.unwrap(), Step::Read("[2] t(main)> ".to_owned()));
    let (writes, _) = resume(&mut engine, "n");
    assert_eq!(writes, vec!["=> \"zed\"\n".to_owned()]);
}
