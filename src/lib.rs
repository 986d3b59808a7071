//! metrika_inputs library: Yandex Metrika and AppMetrica pipeline inputs
//!
//! This library provides batch inputs that pull data out of the Yandex Metrika
//! and AppMetrica REST APIs and turn it into structured records: raw visits and
//! hits through the Logs API, paginated report tables, counter goals and the
//! AppMetrica application list.
//!
//! Inputs follow a `connect` / `read_batch` / `close` lifecycle driven by a
//! host. [`run_input`] plays the host for a single input.
//!
//! # Example
//!
//! ```no_run
//! use metrika_inputs::{run_input, InputRegistry};
//! use serde_json::json;
//! use tokio_util::sync::CancellationToken;
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let input = InputRegistry::with_builtin_inputs().build(&json!({
//!     "yandex_metrika_logs": {
//!         "token": "y0_AgAAAA...",
//!         "counter_id": 44147844,
//!         "source": "visits",
//!         "fields": ["ym:s:visitID", "ym:s:dateTime", "ym:s:watchIDs"],
//!         "date1": "7daysAgo",
//!         "date2": "yesterday"
//!     }
//! }))?;
//!
//! let mut out = std::io::stdout();
//! let report = run_input(input.as_ref(), &mut out, &CancellationToken::new()).await?;
//! eprintln!("{} records", report.records);
//! # Ok(())
//! # }
//! ```
//!
//! # Requirements
//!
//! This library requires a Tokio runtime. Use `#[tokio::main]` in your application
//! or ensure you're calling library functions within an async context.

pub mod api;
pub mod config;
pub mod decode;
pub mod error_handling;
pub mod initialization;
pub mod input;
mod utils;

// Re-export public API
pub use config::{LogFormat, LogLevel, Opt};
pub use decode::{FieldValue, RowDecoder};
pub use error_handling::{ApiError, ClientError, ConfigError, DateParseError, InputError};
pub use input::{Batch, Input, InputRegistry, Message};
pub use run::{run_input, RunReport};
pub use utils::{format_key, parse_date, parse_date_from};

// Drives one input from connect to close
mod run {
    use std::io::Write;
    use std::time::Instant;

    use anyhow::{Context, Result};
    use log::{info, warn};
    use serde_json::json;
    use tokio_util::sync::CancellationToken;

    use crate::error_handling::InputError;
    use crate::input::{Input, Message};

    /// Summary of a completed run.
    #[derive(Debug, Clone, Default)]
    pub struct RunReport {
        /// Input type name
        pub input: &'static str,
        /// Batches read before end of input
        pub batches: usize,
        /// Records written
        pub records: usize,
        /// Elapsed time in seconds
        pub elapsed_seconds: f64,
    }

    /// Runs an input to completion, writing each record as one JSON line.
    ///
    /// Each line is `{"content": {...}, "metadata": {...}}`. The input is
    /// closed even when reading fails or `cancel` fires, so remote resources
    /// (log export jobs) are released; close uses its own token for that reason.
    ///
    /// # Arguments
    ///
    /// * `input` - The input to drive
    /// * `out` - Destination for JSON lines
    /// * `cancel` - Stops connect and reads early; treated as end of input
    ///
    /// # Errors
    ///
    /// This function will return an error if:
    /// - A read fails with anything other than end of input
    /// - Writing a record fails
    /// - Closing the input fails
    pub async fn run_input<W: Write>(
        input: &dyn Input,
        out: &mut W,
        cancel: &CancellationToken,
    ) -> Result<RunReport> {
        let start = Instant::now();
        let mut report = RunReport {
            input: input.name(),
            ..Default::default()
        };

        let read_result = read_all(input, out, cancel, &mut report).await;
        if cancel.is_cancelled() {
            warn!("Run of {} cancelled, closing", input.name());
        }

        let close_result = input.close(&CancellationToken::new()).await;
        read_result?;
        close_result.with_context(|| format!("Failed to close input {}", input.name()))?;

        report.elapsed_seconds = start.elapsed().as_secs_f64();
        info!(
            "{}: {} records in {} batches ({:.1}s)",
            report.input, report.records, report.batches, report.elapsed_seconds
        );
        Ok(report)
    }

    async fn read_all<W: Write>(
        input: &dyn Input,
        out: &mut W,
        cancel: &CancellationToken,
        report: &mut RunReport,
    ) -> Result<()> {
        match input.connect(cancel).await {
            Ok(()) => {}
            Err(InputError::EndOfInput) => {
                info!("{} has nothing to read", input.name());
                return Ok(());
            }
            Err(e) => {
                return Err(e).with_context(|| format!("Failed to connect input {}", input.name()))
            }
        }

        loop {
            let batch = match input.read_batch(cancel).await {
                Ok(batch) => batch,
                Err(InputError::EndOfInput) => break,
                Err(e) => {
                    return Err(e).with_context(|| format!("Failed to read from {}", input.name()))
                }
            };

            let written = batch
                .messages
                .iter()
                .try_for_each(|message| write_record(out, message));
            (batch.ack)(written.as_ref().map(|_| ()).map_err(|e| e.to_string()));
            written.context("Failed to write records")?;

            report.batches += 1;
            report.records += batch.messages.len();
        }

        out.flush().context("Failed to flush output")?;
        Ok(())
    }

    fn write_record<W: Write>(out: &mut W, message: &Message) -> std::io::Result<()> {
        let line = json!({
            "content": message.content,
            "metadata": message.metadata,
        });
        serde_json::to_writer(&mut *out, &line)?;
        out.write_all(b"\n")
    }
}
