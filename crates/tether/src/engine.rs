//! Suspendable execution of a blocking console program.
//!
//! A [`SessionEngine`] runs its [`Backend`] on a dedicated worker thread, but the
//! worker and the caller never run at the same time. Control passes back and
//! forth over two single-slot channels:
//!
//! - the worker sends a `Write` or `Read` event and blocks for the reply,
//! - the caller, inside [`SessionEngine::resume`], answers every `Write` with
//!   `Continue` after forwarding the text, and returns to its own caller at the
//!   first `Read`, leaving the worker parked until the next `resume` supplies
//!   the line.
//!
//! From the backend's point of view `read_line` is an ordinary blocking call.
//! Writes reach the caller in production order and always before the prompt of
//! the read that follows them.

use std::{
    any::Any,
    panic::{AssertUnwindSafe, catch_unwind},
    sync::{
        Arc, Mutex, PoisonError,
        mpsc::{Receiver, SyncSender, sync_channel},
    },
    thread::{self, JoinHandle},
};

use strum::{Display, IntoStaticStr};
use thiserror::Error;

use crate::io::{Completer, Console, ConsoleClosed};

/// Worker stack size; evaluation recurses on the native stack.
const WORKER_STACK_SIZE: usize = 16 * 1024 * 1024;

/// A program written against blocking console I/O.
pub trait Backend: Send + 'static {
    /// Runs to completion; returns when the program ends or the console closes.
    fn run(self: Box<Self>, console: &mut dyn Console);
}

impl<F> Backend for F
where
    F: FnOnce(&mut dyn Console) + Send + 'static,
{
    fn run(self: Box<Self>, console: &mut dyn Console) {
        (*self)(console);
    }
}

/// Lifecycle of a [`SessionEngine`], displayed in kebab-case.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, IntoStaticStr)]
#[strum(serialize_all = "kebab-case")]
pub enum EngineState {
    /// Constructed; the backend starts on the first resume.
    NotStarted,
    /// Parked inside a read, waiting for the next line.
    Suspended,
    /// Only observable from within a resume.
    Running,
    /// The backend returned, panicked or was torn down. Final.
    Terminated,
}

/// Where a resume stopped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    /// The backend is waiting for input after showing this prompt.
    Read(String),
    /// The backend returned; the engine cannot be resumed again.
    Finished,
}

#[derive(Debug, Error)]
pub enum EngineError {
    /// Resumed after the backend ended.
    #[error("session has terminated")]
    Terminated,
    /// The backend panicked; carries the panic message.
    #[error("session backend panicked: {0}")]
    Panicked(String),
    #[error("failed to start session worker: {0}")]
    Spawn(#[from] std::io::Error),
}

/// Worker to resumer.
#[derive(Debug)]
enum Event {
    Write(String),
    Read(String),
    Finished,
    Panicked(String),
}

/// Resumer to worker.
#[derive(Debug)]
enum Resume {
    /// Carry on after a write.
    Continue,
    /// Return this line from the pending read.
    Line(String),
}

/// Resumer's ends of the two channels.
struct Link {
    events: Receiver<Event>,
    replies: SyncSender<Resume>,
}

type CompleterSlot = Arc<Mutex<Option<Completer>>>;

/// A backend wrapped as a resumable coroutine.
pub struct SessionEngine {
    name: String,
    state: EngineState,
    backend: Option<Box<dyn Backend>>,
    link: Option<Link>,
    worker: Option<JoinHandle<()>>,
    completer: CompleterSlot,
}

impl std::fmt::Debug for SessionEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionEngine")
            .field("name", &self.name)
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

impl SessionEngine {
    /// Wraps `backend` without starting it. `name` labels the worker thread.
    pub fn new(name: impl Into<String>, backend: impl Backend) -> Self {
        Self {
            name: name.into(),
            state: EngineState::NotStarted,
            backend: Some(Box::new(backend)),
            link: None,
            worker: None,
            completer: Arc::default(),
        }
    }

    /// Current lifecycle state. Between resumes this is never `Running`.
    #[must_use]
    pub fn state(&self) -> EngineState {
        self.state
    }

    /// False once the backend has returned, panicked or been torn down.
    #[must_use]
    pub fn is_alive(&self) -> bool {
        self.state != EngineState::Terminated
    }

    /// Runs the backend until it next reads or finishes.
    ///
    /// # Arguments
    /// * `line` - Answer to the pending read; discarded on the first resume, which
    ///   only starts the backend
    /// * `on_write` - Receives every write, in order, before the backend continues
    ///
    /// # Errors
    /// [`EngineError::Terminated`] if the backend already ended,
    /// [`EngineError::Panicked`] if it panicked during this resume, and
    /// [`EngineError::Spawn`] if the worker thread could not be started.
    pub fn resume(&mut self, line: String, on_write: &mut dyn FnMut(&str)) -> Result<Step, EngineError> {
        match self.state {
            EngineState::Terminated => return Err(EngineError::Terminated),
            EngineState::NotStarted => self.start()?,
            EngineState::Suspended | EngineState::Running => {
                let delivered = self
                    .link
                    .as_ref()
                    .is_some_and(|link| link.replies.send(Resume::Line(line)).is_ok());
                if !delivered {
                    self.finish();
                    return Err(EngineError::Terminated);
                }
            }
        }
        self.state = EngineState::Running;
        self.drive(on_write)
    }

    /// Completion candidates from the backend's completer, if it installed one.
    ///
    /// # Errors
    /// [`EngineError::Terminated`] once the backend has ended.
    pub fn complete(&self, word: &str) -> Result<Vec<String>, EngineError> {
        if self.state == EngineState::Terminated {
            return Err(EngineError::Terminated);
        }
        let completer = self.completer.lock().unwrap_or_else(PoisonError::into_inner).clone();
        Ok(completer.map(|complete| complete(word)).unwrap_or_default())
    }

    fn start(&mut self) -> Result<(), EngineError> {
        let Some(backend) = self.backend.take() else {
            return Err(EngineError::Terminated);
        };
        let (event_tx, event_rx) = sync_channel(1);
        let (reply_tx, reply_rx) = sync_channel(1);
        let mut console = ChannelConsole {
            events: event_tx,
            replies: reply_rx,
            completer: Arc::clone(&self.completer),
        };
        let spawned = thread::Builder::new()
            .name(format!("tether-session-{}", self.name))
            .stack_size(WORKER_STACK_SIZE)
            .spawn(move || {
                let outcome = catch_unwind(AssertUnwindSafe(|| backend.run(&mut console)));
                let last = match outcome {
                    Ok(()) => Event::Finished,
                    Err(payload) => Event::Panicked(panic_message(payload.as_ref()).unwrap_or("(unknown error)").to_owned()),
                };
                // the engine may already be gone
                let _ = console.events.send(last);
            });
        match spawned {
            Ok(worker) => {
                tracing::debug!(session = %self.name, "session worker started");
                self.worker = Some(worker);
                self.link = Some(Link {
                    events: event_rx,
                    replies: reply_tx,
                });
                Ok(())
            }
            Err(err) => {
                self.state = EngineState::Terminated;
                Err(EngineError::Spawn(err))
            }
        }
    }

    fn drive(&mut self, on_write: &mut dyn FnMut(&str)) -> Result<Step, EngineError> {
        loop {
            let event = match &self.link {
                Some(link) => link.events.recv().ok(),
                None => None,
            };
            match event {
                Some(Event::Write(text)) => {
                    on_write(&text);
                    if let Some(link) = &self.link {
                        // a failed send means the worker is gone; the next recv reports it
                        let _ = link.replies.send(Resume::Continue);
                    }
                }
                Some(Event::Read(prompt)) => {
                    self.state = EngineState::Suspended;
                    return Ok(Step::Read(prompt));
                }
                Some(Event::Finished) | None => {
                    self.finish();
                    return Ok(Step::Finished);
                }
                Some(Event::Panicked(message)) => {
                    tracing::warn!(session = %self.name, %message, "session backend panicked");
                    self.finish();
                    return Err(EngineError::Panicked(message));
                }
            }
        }
    }

    /// Hangs up both channels and waits for the worker to exit.
    ///
    /// A parked backend sees end of input or a closed console and unwinds.
    fn finish(&mut self) {
        self.state = EngineState::Terminated;
        self.backend = None;
        self.link = None;
        if let Some(worker) = self.worker.take()
            && worker.join().is_err()
        {
            tracing::warn!(session = %self.name, "session worker exited abnormally");
        }
    }
}

impl Drop for SessionEngine {
    fn drop(&mut self) {
        if self.worker.is_some() {
            tracing::debug!(session = %self.name, state = %self.state, "tearing down session");
        }
        self.finish();
    }
}

/// Text of a panic payload, when it carries one.
#[must_use]
pub fn panic_message(payload: &(dyn Any + Send)) -> Option<&str> {
    payload
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
}

/// Worker side: console calls become events, and block for the reply.
struct ChannelConsole {
    events: SyncSender<Event>,
    replies: Receiver<Resume>,
    completer: CompleterSlot,
}

impl Console for ChannelConsole {
    fn write(&mut self, text: &str) -> Result<(), ConsoleClosed> {
        self.events.send(Event::Write(text.to_owned())).map_err(|_| ConsoleClosed)?;
        match self.replies.recv() {
            Ok(_) => Ok(()),
            Err(_) => Err(ConsoleClosed),
        }
    }

    fn read_line(&mut self, prompt: &str) -> Option<String> {
        self.events.send(Event::Read(prompt.to_owned())).ok()?;
        match self.replies.recv().ok()? {
            Resume::Line(line) => Some(line),
            Resume::Continue => Some(String::new()),
        }
    }

    fn set_completer(&mut self, completer: Completer) {
        *self.completer.lock().unwrap_or_else(PoisonError::into_inner) = Some(completer);
    }
}
