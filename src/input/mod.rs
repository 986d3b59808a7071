//! Pipeline inputs.
//!
//! An input is driven by the host as `connect`, repeated `read_batch` until
//! [`InputError::EndOfInput`], then `close`. Every call receives the host's
//! cancellation token; a cancelled blocking phase ends the input rather than
//! failing it.

mod applications;
mod goals;
mod logs;
mod registry;
mod schedule;
mod stat_table;

use async_trait::async_trait;
use log::error;
use serde::Serialize;
use serde_json::{Map, Value};
use tokio_util::sync::CancellationToken;

use crate::api::{ApiClient, ServiceKind};
use crate::error_handling::{ConfigError, InputError};
use crate::initialization::init_client;

pub use applications::ApplicationsInput;
pub use goals::GoalsInput;
pub use logs::{FetchCursor, LogExportPhase, LogsInput};
pub use registry::{InputFactory, InputRegistry};
pub use schedule::ScheduleInput;
pub use stat_table::StatTableInput;

/// One output record.
#[derive(Debug, Clone, PartialEq)]
pub struct Message {
    /// Structured payload, a JSON object.
    pub content: Value,
    /// Side-channel keys describing where the record came from.
    pub metadata: Map<String, Value>,
}

impl Message {
    pub fn new(content: Value) -> Self {
        Message {
            content,
            metadata: Map::new(),
        }
    }

    pub fn with_meta(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.metadata.insert(key.to_string(), value.into());
        self
    }

    pub fn meta(&self, key: &str) -> Option<&Value> {
        self.metadata.get(key)
    }
}

/// Acknowledgement callback handed back to the host with each batch.
///
/// Receives `Ok(())` once the batch was delivered, or the delivery error.
pub type AckFn = Box<dyn FnOnce(Result<(), String>) + Send>;

/// Messages produced by one `read_batch` call.
pub struct Batch {
    pub messages: Vec<Message>,
    pub ack: AckFn,
}

impl Batch {
    /// A batch whose acknowledgement is a no-op; remote state does not depend on delivery.
    pub fn new(messages: Vec<Message>) -> Self {
        Batch {
            messages,
            ack: Box::new(|_| {}),
        }
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

impl std::fmt::Debug for Batch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Batch")
            .field("messages", &self.messages)
            .finish_non_exhaustive()
    }
}

/// Lifecycle contract between an input and its host.
///
/// Calls are sequential per instance. Implementations guard their state
/// with an async mutex so `&self` methods are safe to share.
#[async_trait]
pub trait Input: Send + Sync {
    /// Connector type name, as registered.
    fn name(&self) -> &'static str;

    /// Prepares the input. Returning `EndOfInput` means there is nothing to read.
    async fn connect(&self, cancel: &CancellationToken) -> Result<(), InputError>;

    /// Produces the next batch, or `EndOfInput` once exhausted.
    async fn read_batch(&self, cancel: &CancellationToken) -> Result<Batch, InputError>;

    /// Releases remote and local resources. Idempotent.
    async fn close(&self, cancel: &CancellationToken) -> Result<(), InputError>;
}

/// Builds the API client of an input, honouring an `api_url` override.
pub(crate) fn build_client(
    api_url: Option<&str>,
    default_host: &str,
    kind: ServiceKind,
    token: Option<String>,
) -> Result<ApiClient, ConfigError> {
    let http = init_client().map_err(|e| ConfigError::new("http_client", e.to_string()))?;
    ApiClient::new(http, api_url.unwrap_or(default_host), kind, token)
        .map_err(|e| ConfigError::new("api_url", e.to_string()))
}

/// Turns listed records into messages, one per record.
///
/// A record that fails to serialize is logged with its id and skipped.
pub(crate) fn records_to_messages<T: Serialize>(
    kind: &str,
    records: &[T],
    id: impl Fn(&T) -> u64,
) -> Vec<Message> {
    records
        .iter()
        .filter_map(|record| match serde_json::to_value(record) {
            Ok(content) => Some(Message::new(content)),
            Err(e) => {
                error!("Skipping {} {}: {}", kind, id(record), e);
                None
            }
        })
        .collect()
}
