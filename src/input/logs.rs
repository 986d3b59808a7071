//! `yandex_metrika_logs`: raw visits or hits through the Logs API.
//!
//! The export is a server-side job with its own lifecycle:
//!
//! ```text
//! Uninitialized -> Evaluated -> Created -(poll)-> Processed -(parts)-> Done
//!        \______________\____________\___________> Failed
//! any state --close--> Closed
//! ```
//!
//! `connect` evaluates, creates and polls until the job is processed. Each
//! `read_batch` downloads one part and emits one message per row. `close`
//! cancels a job that is still being prepared and cleans a finished one, so
//! the counter's export quota is released whether or not the run succeeded.

use std::time::Duration;

use async_trait::async_trait;
use log::{debug, error, info, trace};
use serde_json::Value;
use strum_macros::Display;
use thiserror::Error;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::api::{
    EvaluationResult, JobStatus, LogExportJob, LogExportQuery, LogRequestService, ServiceKind,
};
use crate::config::{LogsInputConfig, LOG_REQUEST_MAX_WAIT, LOG_REQUEST_POLL_INTERVAL, METRIKA_API_HOST};
use crate::decode::RowDecoder;
use crate::error_handling::{ClientError, ConfigError, InputError};
use crate::input::{build_client, Batch, Input, Message};

/// Where the export currently stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum LogExportPhase {
    Uninitialized,
    /// Evaluation succeeded; the job is not created yet.
    Evaluated,
    /// The job exists and is being prepared by the server.
    Created,
    /// Parts are available for download.
    Processed,
    /// Every part was emitted.
    Done,
    /// Terminal; reads report end of input.
    Failed,
    Closed,
}

/// Progress through the parts of a processed job.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FetchCursor {
    /// Index of the next part to download.
    pub current_part: usize,
    pub done: bool,
}

#[derive(Debug)]
struct LogExportState {
    phase: LogExportPhase,
    evaluation: Option<EvaluationResult>,
    job: Option<LogExportJob>,
    cursor: FetchCursor,
}

/// Why `connect` could not bring the job to `processed`.
#[derive(Debug, Error)]
enum PrepareFailure {
    #[error(transparent)]
    Client(#[from] ClientError),

    #[error("export is not possible (possible: {}, max days: {})", .0.possible, .0.max_days)]
    Infeasible(EvaluationResult),

    #[error("log request {request_id} ended with status {status}")]
    Status { request_id: u64, status: JobStatus },

    #[error("log request {request_id} was not processed within {waited:?}")]
    TimedOut { request_id: u64, waited: Duration },
}

/// Log export input. See the module docs for the lifecycle.
pub struct LogsInput {
    counter_id: u64,
    query: LogExportQuery,
    service: LogRequestService,
    poll_interval: Duration,
    max_wait: Duration,
    state: Mutex<LogExportState>,
}

impl LogsInput {
    pub const NAME: &'static str = "yandex_metrika_logs";

    pub fn new(service: LogRequestService, counter_id: u64, query: LogExportQuery) -> Self {
        LogsInput {
            counter_id,
            query,
            service,
            poll_interval: LOG_REQUEST_POLL_INTERVAL,
            max_wait: LOG_REQUEST_MAX_WAIT,
            state: Mutex::new(LogExportState {
                phase: LogExportPhase::Uninitialized,
                evaluation: None,
                job: None,
                cursor: FetchCursor::default(),
            }),
        }
    }

    /// Builds the input from its validated configuration.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if validation fails or the API URL is invalid.
    pub fn from_config(config: LogsInputConfig) -> Result<Self, ConfigError> {
        let config = config.validated()?;
        let client = build_client(
            config.api_url.as_deref(),
            METRIKA_API_HOST,
            ServiceKind::Management,
            config.token.clone(),
        )?;
        let query = LogExportQuery {
            source: config.source,
            date1: config.date1,
            date2: config.date2,
            fields: config.fields,
            attribution: config.attribution,
        };

        Ok(LogsInput::new(LogRequestService::new(client), config.counter_id, query)
            .with_poll_interval(Duration::from_secs(config.poll_interval_secs))
            .with_max_wait(Duration::from_secs(config.max_wait_secs)))
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn with_max_wait(mut self, max_wait: Duration) -> Self {
        self.max_wait = max_wait;
        self
    }

    pub fn query(&self) -> &LogExportQuery {
        &self.query
    }

    pub async fn phase(&self) -> LogExportPhase {
        self.state.lock().await.phase
    }

    pub async fn cursor(&self) -> FetchCursor {
        self.state.lock().await.cursor
    }

    /// Last known state of the remote job.
    pub async fn job(&self) -> Option<LogExportJob> {
        self.state.lock().await.job.clone()
    }

    /// Evaluates, creates and polls until the job leaves `created`.
    async fn prepare(
        &self,
        state: &mut LogExportState,
        cancel: &CancellationToken,
    ) -> Result<(), PrepareFailure> {
        let evaluation = match state.evaluation {
            Some(evaluation) => evaluation,
            None => {
                debug!("Evaluating log request for counter {}", self.counter_id);
                let evaluation = self
                    .service
                    .evaluate(self.counter_id, &self.query, cancel)
                    .await?;
                state.evaluation = Some(evaluation);
                state.phase = LogExportPhase::Evaluated;
                evaluation
            }
        };
        if !evaluation.is_feasible() {
            return Err(PrepareFailure::Infeasible(evaluation));
        }

        let mut job = match state.job.take() {
            Some(job) => job,
            None => {
                debug!("Creating log request for counter {}", self.counter_id);
                let job = self.service.create(self.counter_id, &self.query, cancel).await?;
                info!(
                    "Created log request {} for counter {} ({} {}..{})",
                    job.request_id, self.counter_id, self.query.source, self.query.date1, self.query.date2
                );
                state.phase = LogExportPhase::Created;
                job
            }
        };

        let request_id = job.request_id;
        let started = Instant::now();
        if job.status == JobStatus::Created {
            debug!("Waiting for log request {} to be processed", request_id);
        }
        while job.status == JobStatus::Created {
            if started.elapsed() >= self.max_wait {
                state.job = Some(job);
                return Err(PrepareFailure::TimedOut {
                    request_id,
                    waited: self.max_wait,
                });
            }

            tokio::select! {
                _ = cancel.cancelled() => {
                    state.job = Some(job);
                    return Err(ClientError::Cancelled.into());
                }
                _ = tokio::time::sleep(self.poll_interval) => {}
            }

            trace!("Updating log request {} info", request_id);
            match self.service.get(self.counter_id, request_id, cancel).await {
                Ok(updated) => job = updated,
                Err(e) => {
                    state.job = Some(job);
                    return Err(e.into());
                }
            }
        }

        let status = job.status;
        let no_parts = job.parts.is_empty();
        state.job = Some(job);

        if status != JobStatus::Processed {
            return Err(PrepareFailure::Status { request_id, status });
        }

        state.phase = LogExportPhase::Processed;
        if no_parts {
            state.cursor.done = true;
            state.phase = LogExportPhase::Done;
        }
        Ok(())
    }

    /// Decodes one downloaded part into messages.
    ///
    /// Rows are numbered from 1 within the part; `current_part` is 1-based.
    fn decode_part(
        &self,
        job: &LogExportJob,
        index: usize,
        body: &[u8],
    ) -> Result<Vec<Message>, csv::Error> {
        // quoted cells may hold tabs; a stray quote inside a cell is kept as data
        let mut reader = csv::ReaderBuilder::new()
            .delimiter(b'\t')
            .has_headers(true)
            .from_reader(body);
        let decoder = RowDecoder::new(reader.headers()?.iter());
        let query = job.query.to_value();

        let mut messages = Vec::new();
        for (row, record) in reader.records().enumerate() {
            let record = record?;
            let content = Value::Object(decoder.decode(record.iter()));
            messages.push(
                Message::new(content)
                    .with_meta("counter_id", self.counter_id)
                    .with_meta("request_id", job.request_id)
                    .with_meta("total_parts", job.parts.len())
                    .with_meta("current_part", index + 1)
                    .with_meta("current_row", row + 1)
                    .with_meta("query", query.clone()),
            );
        }
        Ok(messages)
    }
}

#[async_trait]
impl Input for LogsInput {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    async fn connect(&self, cancel: &CancellationToken) -> Result<(), InputError> {
        let mut state = self.state.lock().await;
        match state.phase {
            LogExportPhase::Processed | LogExportPhase::Done => return Ok(()),
            LogExportPhase::Failed | LogExportPhase::Closed => return Err(InputError::EndOfInput),
            _ => {}
        }

        match self.prepare(&mut state, cancel).await {
            Ok(()) => Ok(()),
            Err(PrepareFailure::Client(ClientError::Cancelled)) => {
                info!(
                    "Log request for counter {} cancelled before processing finished",
                    self.counter_id
                );
                state.phase = LogExportPhase::Failed;
                Err(InputError::EndOfInput)
            }
            Err(e) => {
                error!("Log request for counter {} failed: {}", self.counter_id, e);
                state.phase = LogExportPhase::Failed;
                Err(InputError::EndOfInput)
            }
        }
    }

    async fn read_batch(&self, cancel: &CancellationToken) -> Result<Batch, InputError> {
        let mut state = self.state.lock().await;
        if cancel.is_cancelled() {
            return Err(InputError::EndOfInput);
        }

        match state.phase {
            LogExportPhase::Processed => {}
            LogExportPhase::Uninitialized | LogExportPhase::Evaluated | LogExportPhase::Created => {
                error!(
                    "Log request for counter {} is not available; connect first",
                    self.counter_id
                );
                return Err(InputError::EndOfInput);
            }
            _ => return Err(InputError::EndOfInput),
        }

        let index = state.cursor.current_part;
        let Some(job) = state.job.as_ref() else {
            return Err(InputError::EndOfInput);
        };
        let Some(part) = job.parts.get(index) else {
            return Err(InputError::EndOfInput);
        };

        debug!(
            "Downloading part {} ({}/{}) of log request {}",
            part.part_number,
            index + 1,
            job.parts.len(),
            job.request_id
        );
        let body = match self
            .service
            .download_part(self.counter_id, job.request_id, part.part_number, cancel)
            .await
        {
            Ok(body) => body,
            Err(ClientError::Cancelled) => return Err(InputError::EndOfInput),
            Err(e) => {
                error!(
                    "Failed to download part {} of log request {}: {}",
                    part.part_number, job.request_id, e
                );
                return Err(InputError::EndOfInput);
            }
        };

        let messages = self
            .decode_part(job, index, &body)
            .map_err(|source| InputError::Decode {
                part: part.part_number,
                source,
            })?;
        let total_parts = job.parts.len();

        state.cursor.current_part += 1;
        if state.cursor.current_part == total_parts {
            state.cursor.done = true;
            state.phase = LogExportPhase::Done;
        }

        Ok(Batch::new(messages))
    }

    async fn close(&self, cancel: &CancellationToken) -> Result<(), InputError> {
        let mut state = self.state.lock().await;
        if state.phase == LogExportPhase::Closed {
            return Ok(());
        }
        let Some(request_id) = state.job.as_ref().map(|job| job.request_id) else {
            state.phase = LogExportPhase::Closed;
            return Ok(());
        };

        let current = self.service.get(self.counter_id, request_id, cancel).await?;
        match current.status {
            JobStatus::Created => {
                debug!("Cancelling log request {}", request_id);
                self.service.cancel(self.counter_id, request_id, cancel).await?;
            }
            status if status.is_cleaned() => {
                debug!("Log request {} already cleaned ({})", request_id, status);
            }
            status => {
                debug!("Cleaning log request {} ({})", request_id, status);
                self.service.clean(self.counter_id, request_id, cancel).await?;
            }
        }

        state.job = Some(current);
        state.phase = LogExportPhase::Closed;
        Ok(())
    }
}
