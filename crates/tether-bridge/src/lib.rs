//! Stdio bridge between an editor and the tether runtime.
//!
//! The editor writes one JSON request per line; the bridge answers each with
//! one JSON result line, preceded by any `write`/`read` lines an interactive
//! session produced while handling it. See [`handler::standard_commands`] for
//! the command set.

pub mod config;
pub mod dispatch;
pub mod error;
pub mod gateway;
pub mod handler;
pub mod logging;

use std::io::{self, BufRead, Write};

use crate::{
    config::Config,
    dispatch::Dispatcher,
    gateway::{Emit, RequestReader, ResultWriter},
    handler::{ServerState, standard_commands},
};

/// Builds the dispatcher described by `config`, running its preludes.
///
/// A prelude that cannot be read or fails to evaluate is logged and skipped.
#[must_use]
pub fn dispatcher(config: &Config) -> Dispatcher {
    let state = ServerState::new(tether::Runtime::new(config.limits()), config.repl_options());
    for path in &config.preludes {
        match state.load_prelude(path) {
            Ok(()) => tracing::info!(path = %path.display(), "loaded prelude"),
            Err(err) => tracing::warn!(path = %path.display(), error = %format!("{}: {err}", err.kind()), "prelude failed"),
        }
    }
    Dispatcher::new(standard_commands(), state)
}

/// Serves requests from `input` until it ends.
///
/// Only I/O failures on the streams themselves end the loop early.
pub fn serve<R: BufRead, W: Write>(input: R, output: W, dispatcher: &mut Dispatcher) -> io::Result<()> {
    let mut requests = RequestReader::new(input);
    let mut results = ResultWriter::new(output);
    while let Some(request) = requests.next_request()? {
        let result = dispatcher.dispatch(request, &mut results);
        results.emit(&result)?;
    }
    tracing::info!(sessions = dispatcher.state().sessions().len(), "input closed, shutting down");
    Ok(())
}
