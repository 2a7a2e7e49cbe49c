use pretty_assertions::assert_eq;
use tether::{
    Console, Exception, Runtime,
    engine::{EngineState, SessionEngine, Step},
    repl::ReplOptions,
    session_manager::{Launcher, ReplLauncher, SessionError, SessionInfo, SessionRegistry},
};

fn registry() -> SessionRegistry {
    SessionRegistry::new(ReplLauncher::new(
        Runtime::default(),
        ReplOptions {
            banner: false,
            name: "t".to_owned(),
        },
    ))
}

fn handle<L: Launcher>(registry: &mut SessionRegistry<L>, id: &str, line: &str) -> Result<(Vec<String>, Step), SessionError> {
    let mut writes = Vec::new();
    let step = registry.handle(id, line.to_owned(), &mut |text| writes.push(text.to_owned()))?;
    Ok((writes, step))
}

#[test]
fn start_handle_stop() {
    let mut sessions = registry();
    sessions.start("a", "nil").unwrap();
    assert!(sessions.contains("a"));

    let (writes, step) = handle(&mut sessions, "a", "").unwrap();
    assert!(writes.is_empty());
    assert_eq!(step, Step::Read("[1] t(main)> ".to_owned()));

    let (writes, step) = handle(&mut sessions, "a", "puts(\"hi\"); 40 + 2").unwrap();
    assert_eq!(writes, vec!["hi\n".to_owned(), "=> 42\n".to_owned()]);
    assert_eq!(step, Step::Read("[2] t(main)> ".to_owned()));

    assert!(sessions.stop("a"));
    assert!(!sessions.stop("a"));
    assert!(matches!(handle(&mut sessions, "a", "1"), Err(SessionError::NotFound(id)) if id == "a"));
}

#[test]
fn unknown_ids_are_not_found() {
    let mut sessions = registry();
    let err = handle(&mut sessions, "ghost", "1").unwrap_err();
    assert_eq!(err.to_string(), "No such REPL: ghost");
    assert!(matches!(sessions.complete("ghost", "p"), Err(SessionError::NotFound(_))));
    assert!(!sessions.stop("ghost"));
}

#[test]
fn target_sets_the_receiver() {
    let mut sessions = registry();
    sessions.start("m", "Math").unwrap();
    assert_eq!(handle(&mut sessions, "m", "").unwrap().1, Step::Read("[1] t(Math)> ".to_owned()));
    let (writes, _) = handle(&mut sessions, "m", "PI.floor").unwrap();
    assert_eq!(writes, vec!["=> 3\n".to_owned()]);
}

#[test]
fn failing_target_registers_nothing() {
    let mut sessions = registry();
    let err = sessions.start("bad", "undefined_thing").unwrap_err();
    assert!(matches!(&err, SessionError::Launch(exc) if exc.kind().to_string() == "NameError"));
    assert!(!sessions.contains("bad"));
    assert!(sessions.is_empty());
}

#[test]
fn exited_sessions_report_missing_until_stopped() {
    let mut sessions = registry();
    sessions.start("a", "nil").unwrap();
    handle(&mut sessions, "a", "").unwrap();
    let (writes, step) = handle(&mut sessions, "a", "exit").unwrap();
    assert!(writes.is_empty());
    assert_eq!(step, Step::Finished);

    assert!(matches!(handle(&mut sessions, "a", "1"), Err(SessionError::NotFound(_))));
    assert!(matches!(sessions.complete("a", "x"), Err(SessionError::NotFound(_))));
    assert_eq!(
        sessions.list_sessions(),
        vec![SessionInfo {
            id: "a".to_owned(),
            alive: false,
            state: EngineState::Terminated,
        }]
    );
    assert!(sessions.stop("a"));
}

#[test]
fn restarting_replaces_the_session() {
    let mut sessions = registry();
    sessions.start("a", "nil").unwrap();
    handle(&mut sessions, "a", "").unwrap();
    handle(&mut sessions, "a", "let x = 1").unwrap();

    sessions.start("a", "nil").unwrap();
    assert_eq!(sessions.len(), 1);
    assert_eq!(sessions.list_sessions()[0].state, EngineState::NotStarted);
    handle(&mut sessions, "a", "").unwrap();
    let (writes, _) = handle(&mut sessions, "a", "x").unwrap();
    assert_eq!(
        writes,
        vec!["NameError: undefined local variable or method `x' for main\n".to_owned()]
    );
}

#[test]
fn sessions_are_independent() {
    let mut sessions = registry();
    for id in ["one", "two"] {
        sessions.start(id, "nil").unwrap();
        handle(&mut sessions, id, "").unwrap();
    }
    handle(&mut sessions, "one", "let n = gets(\"n? \")").unwrap();
    let (writes, step) = handle(&mut sessions, "two", "1 + 1").unwrap();
    assert_eq!(writes, vec!["=> 2\n".to_owned()]);
    assert_eq!(step, Step::Read("[2] t(main)> ".to_owned()));
    let (writes, step) = handle(&mut sessions, "one", "seven").unwrap();
    assert_eq!(writes, vec!["=> \"seven\"\n".to_owned()]);
    assert_eq!(step, Step::Read("[2] t(main)> ".to_owned()));

    let ids: Vec<String> = sessions.list_sessions().into_iter().map(|info| info.id).collect();
    assert_eq!(ids, vec!["one".to_owned(), "two".to_owned()]);
}

#[test]
fn completion_sees_session_locals() {
    let mut sessions = registry();
    sessions.start("a", "nil").unwrap();
    handle(&mut sessions, "a", "").unwrap();
    handle(&mut sessions, "a", "let counter = 3").unwrap();
    assert_eq!(sessions.complete("a", "coun").unwrap(), vec!["counter".to_owned()]);
    assert_eq!(sessions.complete("a", "Math::E").unwrap(), vec!["Math::E".to_owned()]);
}

/// Launches a scripted backend instead of a REPL.
struct EchoLauncher;

impl Launcher for EchoLauncher {
    fn launch(&self, id: &str, target: &str) -> Result<SessionEngine, Exception> {
        let greeting = format!("{target}\n");
        Ok(SessionEngine::new(id, move |console: &mut dyn Console| {
            if console.write(&greeting).is_err() {
                return;
            }
            while let Some(line) = console.read_line("echo> ") {
                if console.write(&line).is_err() {
                    return;
                }
            }
        }))
    }
}

#[test]
fn custom_launchers_drive_any_backend() {
    let mut sessions = SessionRegistry::new(EchoLauncher);
    sessions.start("e", "welcome").unwrap();
    let (writes, step) = handle(&mut sessions, "e", "").unwrap();
    assert_eq!(writes, vec!["welcome\n".to_owned()]);
    assert_eq!(step, Step::Read("echo> ".to_owned()));
    let (writes, _) = handle(&mut sessions, "e", "ping").unwrap();
    assert_eq!(writes, vec!["ping".to_owned()]);
    assert!(sessions.complete("e", "p").unwrap().is_empty());
}
