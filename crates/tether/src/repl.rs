//! Interactive read-eval-print loop written against the blocking [`Console`].
//!
//! The loop knows nothing about sessions or protocols: it prompts, reads a line,
//! evaluates it and prints the result, exactly as it would on a terminal. The
//! session engine makes it suspendable by handing it a console whose reads park
//! the worker thread.

use std::sync::{Arc, Mutex, PoisonError};

use crate::{
    builtins::types,
    exception::CodeLoc,
    introspect::{Introspector, ObjectInfo, SymbolIndex},
    io::{Completer, Console, ConsoleClosed},
    lexer::needs_more_input,
    runtime::{Binding, Runtime},
    value::Value,
};

/// File name reported in backtraces for code typed at the prompt.
pub const REPL_FILE: &str = "(repl)";

const HELP: &str = "\
Commands:
  exit, quit            leave the session
  help                  show this message
  ls                    list locals and the methods of self
  show-doc SYM, ? SYM   show documentation for a type, method or function
  show-source SYM, $ SYM
                        show the source of a user function
  whereami              describe the current binding
Anything else is evaluated; `_` holds the last result.
";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplOptions {
    /// Print a greeting before the first prompt.
    pub banner: bool,
    /// Name shown in the prompt.
    pub name: String,
}

impl Default for ReplOptions {
    fn default() -> Self {
        Self {
            banner: true,
            name: "tether".to_owned(),
        }
    }
}

/// One interactive session on a [`Binding`].
#[derive(Debug)]
pub struct Repl {
    runtime: Runtime,
    binding: Binding,
    options: ReplOptions,
    /// Number of the next input, shown in the prompt.
    counter: usize,
    /// Next source line, for backtraces.
    line: u32,
    /// Local names as of the last evaluation, read by the completer.
    locals: Arc<Mutex<Vec<String>>>,
}

enum Flow {
    Continue,
    Exit,
}

impl Repl {
    #[must_use]
    pub fn new(runtime: Runtime, binding: Binding, options: ReplOptions) -> Self {
        let locals = Arc::new(Mutex::new(binding.local_names()));
        Self {
            runtime,
            binding,
            options,
            counter: 1,
            line: 1,
            locals,
        }
    }

    #[must_use]
    pub fn binding(&self) -> &Binding {
        &self.binding
    }

    /// Prompt for the next input; `continuation` while an expression is still open.
    #[must_use]
    pub fn prompt(&self, continuation: bool) -> String {
        let terminator = if continuation { '*' } else { '>' };
        format!(
            "[{}] {}({}){terminator} ",
            self.counter,
            self.options.name,
            self.binding.label()
        )
    }

    /// Runs until `exit`, end of input, or the console closing.
    pub fn run(&mut self, console: &mut dyn Console) {
        console.set_completer(self.completer());
        match self.run_loop(console) {
            Ok(()) => tracing::debug!(label = self.binding.label(), "repl finished"),
            Err(ConsoleClosed) => tracing::debug!(label = self.binding.label(), "repl console closed"),
        }
    }

    fn run_loop(&mut self, console: &mut dyn Console) -> Result<(), ConsoleClosed> {
        if self.options.banner {
            console.puts(&format!(
                "{} {} on {}. Type `help` for commands.",
                self.options.name,
                env!("CARGO_PKG_VERSION"),
                self.binding.label()
            ))?;
        }
        loop {
            let Some(input) = self.read_input(console) else {
                return Ok(());
            };
            if let Flow::Exit = self.handle(&input, console)? {
                return Ok(());
            }
        }
    }

    /// Reads one complete input, prompting for continuation lines as needed.
    fn read_input(&mut self, console: &mut dyn Console) -> Option<String> {
        let mut source = console.read_line(&self.prompt(false))?;
        while needs_more_input(&source) {
            let more = console.read_line(&self.prompt(true))?;
            if let Some(joined) = source.strip_suffix('\\') {
                source = joined.to_owned();
            }
            source.push('\n');
            source.push_str(&more);
        }
        Some(source)
    }

    fn handle(&mut self, input: &str, console: &mut dyn Console) -> Result<Flow, ConsoleClosed> {
        let trimmed = input.trim();
        let line = self.line;
        self.line += u32::try_from(input.lines().count().max(1)).unwrap_or(u32::MAX);
        if trimmed.is_empty() {
            return Ok(Flow::Continue);
        }
        let (command, argument) = trimmed.split_once(char::is_whitespace).unwrap_or((trimmed, ""));
        let argument = argument.trim();
        match command {
            "exit" | "quit" => return Ok(Flow::Exit),
            "help" => console.write(HELP)?,
            "ls" => self.list(console)?,
            "show-doc" | "?" => self.show_doc(argument, console)?,
            "show-source" | "$" => self.show_source(argument, console)?,
            "whereami" => self.whereami(console)?,
            _ => self.evaluate(input, line, console)?,
        }
        self.counter += 1;
        Ok(Flow::Continue)
    }

    fn evaluate(&mut self, input: &str, line: u32, console: &mut dyn Console) -> Result<(), ConsoleClosed> {
        let location = CodeLoc::new(REPL_FILE, line);
        let output = match self.runtime.evaluate_in(&mut self.binding, input, &location, console) {
            Ok(value) => {
                let shown = format!("=> {}", value.inspect());
                self.binding.set_local("_", value);
                shown
            }
            Err(exc) => exc.to_string(),
        };
        *self.locals.lock().unwrap_or_else(PoisonError::into_inner) = self.binding.local_names();
        console.puts(&output)
    }

    fn list(&self, console: &mut dyn Console) -> Result<(), ConsoleClosed> {
        let locals = self.binding.local_names();
        if !locals.is_empty() {
            console.puts(&format!("locals: {}", locals.join("  ")))?;
        }
        let globals = self.runtime.global_names();
        if !globals.is_empty() {
            console.puts(&format!("globals: {}", globals.join("  ")))?;
        }
        let receiver = self.binding.receiver();
        if let Value::Type(def) = receiver {
            console.puts(&format!("{}.methods: {}", def.name, def.class_method_names(true).join("  ")))?;
        }
        let def = receiver.type_def();
        console.puts(&format!(
            "{}#methods: {}",
            def.name,
            def.public_instance_methods(true).join("  ")
        ))
    }

    fn whereami(&self, console: &mut dyn Console) -> Result<(), ConsoleClosed> {
        let receiver = self.binding.receiver();
        console.puts(&format!(
            "Inside {} ({}), {} local(s).",
            self.binding.label(),
            receiver.type_name(),
            self.binding.local_names().len()
        ))
    }

    /// Resolves a meta-command argument, defaulting to the type of `self`.
    fn describe(&self, symbol: &str) -> (String, Option<ObjectInfo>) {
        let symbol = if symbol.is_empty() {
            self.binding.receiver().type_name().to_owned()
        } else {
            symbol.to_owned()
        };
        let info = SymbolIndex::new(self.runtime.clone()).describe(&symbol);
        (symbol, info)
    }

    fn show_doc(&self, symbol: &str, console: &mut dyn Console) -> Result<(), ConsoleClosed> {
        let (symbol, info) = self.describe(symbol);
        let Some(info) = info else {
            return console.puts(&format!("Error: Can't find object: {symbol}"));
        };
        let (file, line) = info.source_location();
        console.puts(&format!("From: {file}:{line}"))?;
        if let ObjectInfo::Method(method) = &info {
            console.puts(&format!("Signature: {}{}", info.symbol(), method.signature))?;
            console.puts(&format!("Visibility: {}", method.visibility))?;
        }
        let doc = info.doc();
        let text = if doc.text.is_empty() { "(undocumented)" } else { &doc.text };
        console.puts("")?;
        console.puts(text)?;
        for tag in &doc.tags {
            let mut rendered = format!("@{}", tag.tag_name);
            if let Some(types) = &tag.types {
                rendered.push_str(&format!(" [{}]", types.join(", ")));
            }
            for part in [&tag.name, &tag.text].into_iter().flatten() {
                if !part.is_empty() {
                    rendered.push(' ');
                    rendered.push_str(part);
                }
            }
            console.puts(&rendered)?;
        }
        Ok(())
    }

    fn show_source(&self, symbol: &str, console: &mut dyn Console) -> Result<(), ConsoleClosed> {
        let (symbol, info) = self.describe(symbol);
        let Some(info) = info else {
            return console.puts(&format!("Error: Can't find object: {symbol}"));
        };
        let (file, line) = info.source_location();
        console.puts(&format!("From: {file}:{line}"))?;
        match &info {
            ObjectInfo::Method(method) if method.source.is_some() => {
                console.puts(method.source.as_deref().unwrap_or_default())
            }
            _ => console.puts(&format!("{} is native; no script source available.", info.symbol())),
        }
    }

    /// Completion callback over this session's names.
    #[must_use]
    pub fn completer(&self) -> Completer {
        let runtime = self.runtime.clone();
        let receiver = self.binding.receiver().clone();
        let locals = Arc::clone(&self.locals);
        Arc::new(move |word: &str| {
            let locals = locals.lock().unwrap_or_else(PoisonError::into_inner).clone();
            completions(&runtime, &receiver, &locals, word)
        })
    }
}

/// Candidates for `word`, sorted and without duplicates.
///
/// `Type.` and `Type::` prefixes complete class methods and constants; anything
/// else completes against every name visible from the binding.
#[must_use]
pub fn completions(runtime: &Runtime, receiver: &Value, locals: &[String], word: &str) -> Vec<String> {
    let mut candidates: Vec<String> = if let Some((scope, member)) = word.rsplit_once("::") {
        types()
            .get(scope)
            .map(|def| {
                def.constants
                    .iter()
                    .filter(|constant| constant.name.starts_with(member))
                    .map(|constant| format!("{scope}::{}", constant.name))
                    .collect()
            })
            .unwrap_or_default()
    } else if let Some((scope, member)) = word.rsplit_once('.') {
        types()
            .get(scope)
            .map(|def| {
                def.class_method_names(true)
                    .into_iter()
                    .filter(|name| name.starts_with(member))
                    .map(|name| format!("{scope}.{name}"))
                    .collect()
            })
            .unwrap_or_default()
    } else {
        let mut names: Vec<String> = locals.to_vec();
        names.extend(runtime.global_names());
        names.extend(runtime.functions().iter().map(|function| function.name.clone()));
        names.extend(types().all().iter().map(|def| def.name.to_owned()));
        names.extend(types().kernel.class_method_names(false).into_iter().map(str::to_owned));
        names.extend(
            receiver
                .type_def()
                .public_instance_methods(true)
                .into_iter()
                .map(str::to_owned),
        );
        names.retain(|name| name.starts_with(word));
        names
    };
    candidates.sort_unstable();
    candidates.dedup();
    candidates
}
