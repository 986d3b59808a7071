//! Log request (bulk export) endpoints of the management API.
//!
//! A log request is a server-side export job: it is evaluated, created, polled
//! until processed, downloaded part by part and finally cleaned or cancelled.
//! This module only speaks the wire protocol; the lifecycle lives in
//! `input::logs`.

use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumIter, EnumString};
use tokio_util::sync::CancellationToken;

use crate::api::client::{ApiClient, QueryParams};
use crate::error_handling::ClientError;

/// Table a log request exports.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, Display, AsRefStr, EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum LogSource {
    #[default]
    Visits,
    Hits,
}

/// Attribution model applied to traffic source fields.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, AsRefStr, EnumString, EnumIter,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum Attribution {
    First,
    Last,
    #[serde(rename = "LASTSIGN")]
    #[strum(serialize = "LASTSIGN")]
    LastSign,
    LastYandexDirectClick,
    CrossDeviceLastSignificant,
    CrossDeviceFirst,
    CrossDeviceLastYandexDirectClick,
    CrossDeviceLast,
    Automatic,
}

/// What to export: source table, period, fields and attribution.
///
/// Sent as query parameters on evaluation and creation and echoed back by
/// every job status response.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogExportQuery {
    pub source: LogSource,
    pub date1: String,
    pub date2: String,
    pub fields: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attribution: Option<Attribution>,
}

impl LogExportQuery {
    /// Query parameters; empty values are omitted and fields are comma-joined.
    pub fn params(&self) -> QueryParams {
        let candidates = [
            ("source", self.source.to_string()),
            ("date1", self.date1.clone()),
            ("date2", self.date2.clone()),
            ("fields", self.fields.join(",")),
            (
                "attribution",
                self.attribution.map(|a| a.to_string()).unwrap_or_default(),
            ),
        ];
        candidates
            .into_iter()
            .filter(|(_, v)| !v.is_empty())
            .collect()
    }

    /// The query as a JSON object, attached to every record as metadata.
    pub fn to_value(&self) -> serde_json::Value {
        serde_json::json!({
            "source": self.source.as_ref(),
            "date1": self.date1,
            "date2": self.date2,
            "fields": self.fields,
            "attribution": self.attribution.map(|a| a.to_string()).unwrap_or_default(),
        })
    }
}

/// Whether an export is feasible, and for how many days at most.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct EvaluationResult {
    pub possible: bool,
    #[serde(rename = "max_possible_day_quantity")]
    pub max_days: u32,
}

impl EvaluationResult {
    pub fn is_feasible(&self) -> bool {
        self.possible && self.max_days > 0
    }
}

/// Remote job status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Display, AsRefStr)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum JobStatus {
    /// Accepted and still being prepared.
    Created,
    /// Ready; parts can be downloaded.
    Processed,
    Canceled,
    ProcessingFailed,
    CleanedByUser,
    CleanedAutomaticallyAsTooOld,
    AwaitingRetry,
    #[default]
    #[serde(other)]
    Unknown,
}

impl JobStatus {
    /// The job's data is already gone from the server, so a clean call has nothing to do.
    ///
    /// A `canceled` job is not cleaned yet.
    pub fn is_cleaned(&self) -> bool {
        matches!(
            self,
            JobStatus::CleanedByUser | JobStatus::CleanedAutomaticallyAsTooOld
        )
    }
}

/// One downloadable chunk of a processed job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct LogPart {
    pub part_number: u32,
    #[serde(default)]
    pub size: u64,
}

/// Server-side state of one export job.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct LogExportJob {
    pub request_id: u64,
    pub counter_id: u64,
    #[serde(default)]
    pub status: JobStatus,
    #[serde(default)]
    pub size: u64,
    /// Absent until the job is processed.
    #[serde(default)]
    pub parts: Vec<LogPart>,
    #[serde(flatten)]
    pub query: LogExportQuery,
}

#[derive(Debug, Deserialize)]
struct EvaluationEnvelope {
    log_request_evaluation: EvaluationResult,
}

#[derive(Debug, Deserialize)]
struct JobEnvelope {
    log_request: LogExportJob,
}

/// Typed access to `counter/{id}/logrequest*` endpoints.
#[derive(Debug, Clone)]
pub struct LogRequestService {
    client: ApiClient,
}

impl LogRequestService {
    /// Wraps a client bound to the management service.
    pub fn new(client: ApiClient) -> Self {
        LogRequestService { client }
    }

    /// Checks whether the export can be created.
    ///
    /// # Errors
    ///
    /// Any `ClientError` from the underlying request.
    pub async fn evaluate(
        &self,
        counter_id: u64,
        query: &LogExportQuery,
        cancel: &CancellationToken,
    ) -> Result<EvaluationResult, ClientError> {
        let path = format!("counter/{counter_id}/logrequests/evaluate");
        let envelope: EvaluationEnvelope =
            self.client.get_json(&path, &query.params(), cancel).await?;
        Ok(envelope.log_request_evaluation)
    }

    /// Creates the export job.
    pub async fn create(
        &self,
        counter_id: u64,
        query: &LogExportQuery,
        cancel: &CancellationToken,
    ) -> Result<LogExportJob, ClientError> {
        let path = format!("counter/{counter_id}/logrequests");
        let envelope: JobEnvelope = self.client.post_json(&path, &query.params(), cancel).await?;
        Ok(envelope.log_request)
    }

    /// Fetches the current state of a job.
    pub async fn get(
        &self,
        counter_id: u64,
        request_id: u64,
        cancel: &CancellationToken,
    ) -> Result<LogExportJob, ClientError> {
        let path = format!("counter/{counter_id}/logrequest/{request_id}");
        let envelope: JobEnvelope = self.client.get_json(&path, &[], cancel).await?;
        Ok(envelope.log_request)
    }

    /// Cancels a job that has not been processed yet.
    pub async fn cancel(
        &self,
        counter_id: u64,
        request_id: u64,
        cancel: &CancellationToken,
    ) -> Result<LogExportJob, ClientError> {
        let path = format!("counter/{counter_id}/logrequest/{request_id}/cancel");
        let envelope: JobEnvelope = self.client.post_json(&path, &[], cancel).await?;
        Ok(envelope.log_request)
    }

    /// Deletes the prepared files of a processed job.
    pub async fn clean(
        &self,
        counter_id: u64,
        request_id: u64,
        cancel: &CancellationToken,
    ) -> Result<LogExportJob, ClientError> {
        let path = format!("counter/{counter_id}/logrequest/{request_id}/clean");
        let envelope: JobEnvelope = self.client.post_json(&path, &[], cancel).await?;
        Ok(envelope.log_request)
    }

    /// Downloads one part as raw TSV.
    pub async fn download_part(
        &self,
        counter_id: u64,
        request_id: u64,
        part_number: u32,
        cancel: &CancellationToken,
    ) -> Result<Vec<u8>, ClientError> {
        let path = format!("counter/{counter_id}/logrequest/{request_id}/part/{part_number}/download");
        self.client.get_bytes(&path, &[], cancel).await
    }
}
