//! Registry of interactive sessions keyed by client-chosen id.
//!
//! `SessionRegistry` owns every [`SessionEngine`] and offers a typed, JSON-free
//! API for starting, advancing, completing and stopping them. The stdio bridge
//! delegates to it; it contains no protocol concerns.
//!
//! Sessions that finish on their own stay registered until stopped, but report
//! as missing to `handle` and `complete`.

use indexmap::IndexMap;
use thiserror::Error;

use crate::{
    engine::{Backend, EngineError, EngineState, SessionEngine, Step},
    exception::{CodeLoc, Exception},
    io::{CollectConsole, Console},
    repl::{Repl, ReplOptions},
    runtime::{Binding, Runtime},
};

/// File name reported for the target expression of `start`.
const TARGET_FILE: &str = "(repl-start)";

// =============================================================================
// Error types
// =============================================================================

#[derive(Debug, Error)]
pub enum SessionError {
    /// No live session has this id.
    #[error("No such REPL: {0}")]
    NotFound(String),
    /// The target expression failed to evaluate.
    #[error(transparent)]
    Launch(#[from] Exception),
    /// The engine failed while running the session.
    #[error(transparent)]
    Engine(EngineError),
}

// =============================================================================
// Launching
// =============================================================================

/// Builds the engine for a new session.
pub trait Launcher: Send {
    /// Creates a session engine.
    ///
    /// # Arguments
    /// * `id` - Registry key of the new session, used to name its worker
    /// * `target` - Source of the expression the session is opened on
    ///
    /// # Errors
    /// Returns the exception raised while evaluating `target`.
    fn launch(&self, id: &str, target: &str) -> Result<SessionEngine, Exception>;
}

/// Opens a [`Repl`] on the value of the target expression.
#[derive(Debug, Clone)]
pub struct ReplLauncher {
    runtime: Runtime,
    options: ReplOptions,
}

impl ReplLauncher {
    #[must_use]
    /// Creates a launcher whose sessions share `runtime`'s globals.
    pub fn new(runtime: Runtime, options: ReplOptions) -> Self {
        Self { runtime, options }
    }
}

impl Launcher for ReplLauncher {
    fn launch(&self, id: &str, target: &str) -> Result<SessionEngine, Exception> {
        let mut console = CollectConsole::new();
        let receiver = self
            .runtime
            .evaluate(target, &CodeLoc::new(TARGET_FILE, 1), &mut console)?;
        if !console.output().is_empty() {
            tracing::debug!(session = id, output = console.output(), "target expression printed output");
        }
        let repl = Repl::new(self.runtime.clone(), Binding::new(receiver), self.options.clone());
        Ok(SessionEngine::new(id, repl))
    }
}

impl Backend for Repl {
    fn run(mut self: Box<Self>, console: &mut dyn Console) {
        Self::run(&mut self, console);
    }
}

// =============================================================================
// Registry
// =============================================================================

/// Summary of one registered session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionInfo {
    /// Registry key the session was started under.
    pub id: String,
    /// False once the session has exited; it stays listed until stopped.
    pub alive: bool,
    pub state: EngineState,
}

/// Sessions by id, in start order.
///
/// Hold one registry per process. All methods run on the caller's thread, and a
/// session's REPL only runs for the duration of [`Self::handle`].
#[derive(Debug)]
pub struct SessionRegistry<L = ReplLauncher> {
    launcher: L,
    sessions: IndexMap<String, SessionEngine>,
}

impl<L: Launcher> SessionRegistry<L> {
    /// Creates an empty registry that builds engines with `launcher`.
    pub fn new(launcher: L) -> Self {
        Self {
            launcher,
            sessions: IndexMap::new(),
        }
    }

    /// Starts a session on the value of `target`, replacing any session with the same id.
    ///
    /// The replaced engine is torn down. The new engine does not run until the
    /// first [`Self::handle`].
    pub fn start(&mut self, id: &str, target: &str) -> Result<(), SessionError> {
        let engine = self.launcher.launch(id, target)?;
        if let Some(previous) = self.sessions.insert(id.to_owned(), engine) {
            tracing::warn!(session = id, state = %previous.state(), "replacing existing session");
        }
        tracing::info!(session = id, "session started");
        Ok(())
    }

    /// Feeds `line` to the session and runs it until it wants more input.
    ///
    /// Writes made on the way are passed to `on_write` in order, before this returns.
    pub fn handle(&mut self, id: &str, line: String, on_write: &mut dyn FnMut(&str)) -> Result<Step, SessionError> {
        let engine = self.live_mut(id)?;
        let step = engine.resume(line, on_write).map_err(|err| match err {
            EngineError::Terminated => SessionError::NotFound(id.to_owned()),
            other => SessionError::Engine(other),
        })?;
        if step == Step::Finished {
            tracing::info!(session = id, "session exited");
        }
        Ok(step)
    }

    /// Removes the session; returns whether one was registered.
    pub fn stop(&mut self, id: &str) -> bool {
        let removed = self.sessions.shift_remove(id).is_some();
        if removed {
            tracing::info!(session = id, "session stopped");
        }
        removed
    }

    /// Completion candidates for `word` in a live session.
    ///
    /// # Errors
    /// Returns [`SessionError::NotFound`] for unknown or exited sessions.
    pub fn complete(&self, id: &str, word: &str) -> Result<Vec<String>, SessionError> {
        let engine = self
            .sessions
            .get(id)
            .filter(|engine| engine.is_alive())
            .ok_or_else(|| SessionError::NotFound(id.to_owned()))?;
        engine.complete(word).map_err(|err| match err {
            EngineError::Terminated => SessionError::NotFound(id.to_owned()),
            other => SessionError::Engine(other),
        })
    }

    /// Registered sessions in start order.
    #[must_use]
    pub fn list_sessions(&self) -> Vec<SessionInfo> {
        self.sessions
            .iter()
            .map(|(id, engine)| SessionInfo {
                id: id.clone(),
                alive: engine.is_alive(),
                state: engine.state(),
            })
            .collect()
    }

    /// Whether `id` is registered, live or not.
    #[must_use]
    pub fn contains(&self, id: &str) -> bool {
        self.sessions.contains_key(id)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    fn live_mut(&mut self, id: &str) -> Result<&mut SessionEngine, SessionError> {
        self.sessions
            .get_mut(id)
            .filter(|engine| engine.is_alive())
            .ok_or_else(|| SessionError::NotFound(id.to_owned()))
    }
}
