use std::process::ExitCode;

use tether::{
    Binding, CodeLoc, Limits, Runtime, StdConsole, Value,
    repl::{Repl, ReplOptions},
};

fn main() -> ExitCode {
    let args: Vec<String> = std::env::args().collect();
    let runtime = Runtime::new(Limits::new());
    let mut console = StdConsole;

    if args.len() > 1 {
        // File execution mode
        let path = &args[1];
        let source = match std::fs::read_to_string(path) {
            Ok(s) => s,
            Err(e) => {
                eprintln!("Error reading {path}: {e}");
                return ExitCode::FAILURE;
            }
        };
        if let Err(err) = runtime.evaluate(&source, &CodeLoc::new(path.as_str(), 1), &mut console) {
            eprintln!("{err}");
            for frame in err.backtrace() {
                eprintln!("\tfrom {frame}");
            }
            return ExitCode::FAILURE;
        }
        return ExitCode::SUCCESS;
    }

    // Interactive mode
    Repl::new(runtime, Binding::new(Value::Nil), ReplOptions::default()).run(&mut console);
    println!();
    ExitCode::SUCCESS
}
