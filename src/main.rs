//! trace - sync a local directory with a trace server
//!
//! Lists the files the server has that the sync directory lacks, asks for
//! confirmation and downloads them concurrently.

use anyhow::{Context, Result};
use clap::Parser;
use std::sync::Arc;

use trace_client::logger::{Logger, NoopLogger, TextLogger};
use trace_client::{sync, Config};

fn main() -> Result<()> {
    // Set up Ctrl-C handler
    ctrlc::set_handler(move || {
        eprintln!("\nInterrupted by user. Exiting (Ctrl-C)...");
        // Exit immediately with 130 (128 + SIGINT)
        std::process::exit(130);
    })
    .context("Error setting Ctrl-C handler")?;

    let config = Config::parse();
    config.validate()?;

    let logger: Arc<dyn Logger> = match config.log_file {
        Some(ref p) => match TextLogger::new(p) {
            Ok(l) => Arc::new(l),
            Err(e) => {
                eprintln!("warning: cannot open log file {}: {}", p.display(), e);
                Arc::new(NoopLogger)
            }
        },
        None => Arc::new(NoopLogger),
    };

    let rt = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("Failed to build tokio runtime")?;

    let stdin = std::io::stdin();
    let mut input = stdin.lock();
    let mut out = std::io::stdout();
    rt.block_on(sync::run(&config, &mut input, &mut out, logger))?;
    Ok(())
}
