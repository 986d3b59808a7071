//! Main application entry point (CLI binary).
//!
//! This is a thin wrapper around the `metrika_inputs` library that handles:
//! - Command-line argument parsing
//! - Logger initialization
//! - Loading the input configuration file
//! - Ctrl-C handling
//!
//! All core functionality is implemented in the library crate.

use std::fs::File;
use std::io::{self, BufWriter};
use std::process;

use anyhow::{Context, Result};
use clap::Parser;
use tokio_util::sync::CancellationToken;

use metrika_inputs::initialization::init_logger_with;
use metrika_inputs::{run_input, InputRegistry, Opt};

#[tokio::main]
async fn main() -> Result<()> {
    let opt = Opt::parse();

    init_logger_with(opt.log_level.clone().into(), opt.log_format.clone())
        .context("Failed to initialize logger")?;

    let raw = std::fs::read_to_string(&opt.config)
        .with_context(|| format!("Failed to read config file {}", opt.config.display()))?;
    let config: serde_json::Value =
        serde_json::from_str(&raw).context("Config file is not valid JSON")?;
    let input = InputRegistry::with_builtin_inputs()
        .build(&config)
        .context("Invalid input configuration")?;

    let cancel = CancellationToken::new();
    let on_signal = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            log::warn!("Interrupt received, finishing current request");
            on_signal.cancel();
        }
    });

    let result = match &opt.output {
        Some(path) => {
            let file = File::create(path)
                .with_context(|| format!("Failed to create output file {}", path.display()))?;
            run_input(input.as_ref(), &mut BufWriter::new(file), &cancel).await
        }
        None => run_input(input.as_ref(), &mut BufWriter::new(io::stdout()), &cancel).await,
    };

    match result {
        Ok(report) => {
            eprintln!(
                "{}: wrote {} record{} in {:.1}s",
                report.input,
                report.records,
                if report.records == 1 { "" } else { "s" },
                report.elapsed_seconds
            );
            Ok(())
        }
        Err(e) => {
            eprintln!("metrika_inputs error: {:#}", e);
            process::exit(1);
        }
    }
}
