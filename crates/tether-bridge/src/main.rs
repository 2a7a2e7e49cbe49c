use std::io;

use anyhow::Context;
use clap::Parser;
use tether_bridge::{config::Config, logging};

fn main() -> anyhow::Result<()> {
    let config = Config::parse();
    logging::init(&config).context("failed to set up logging")?;
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "tether-bridge starting");

    let mut dispatcher = tether_bridge::dispatcher(&config);
    tether_bridge::serve(io::stdin().lock(), io::stdout().lock(), &mut dispatcher).context("protocol stream failed")?;
    Ok(())
}
