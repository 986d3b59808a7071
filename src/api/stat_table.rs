//! Report table endpoint (`stat/v1/data`).

use serde::{Deserialize, Deserializer, Serialize};
use tokio_util::sync::CancellationToken;

use crate::api::client::{ApiClient, QueryParams};
use crate::error_handling::ClientError;

/// Report table request. The API echoes it back in every response.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StatTableQuery {
    pub ids: Vec<u64>,
    #[serde(deserialize_with = "null_as_default")]
    pub date1: String,
    #[serde(deserialize_with = "null_as_default")]
    pub date2: String,
    #[serde(deserialize_with = "null_as_default")]
    pub dimensions: Vec<String>,
    #[serde(deserialize_with = "null_as_default")]
    pub metrics: Vec<String>,
    #[serde(deserialize_with = "null_as_default")]
    pub sort: Vec<String>,
    pub limit: u32,
    pub offset: u32,
    #[serde(deserialize_with = "null_as_default")]
    pub filters: String,
    #[serde(deserialize_with = "null_as_default")]
    pub accuracy: String,
    #[serde(deserialize_with = "null_as_default")]
    pub lang: String,
    #[serde(deserialize_with = "null_as_default")]
    pub preset: String,
    #[serde(deserialize_with = "null_as_default")]
    pub timezone: String,
    #[serde(deserialize_with = "null_as_default")]
    pub direct_client_logins: Vec<String>,
}

impl StatTableQuery {
    /// Query parameters; lists are comma-joined and empty values omitted.
    pub fn params(&self) -> QueryParams {
        let ids = self
            .ids
            .iter()
            .map(u64::to_string)
            .collect::<Vec<_>>()
            .join(",");
        let candidates = [
            ("ids", ids),
            ("date1", self.date1.clone()),
            ("date2", self.date2.clone()),
            ("dimensions", self.dimensions.join(",")),
            ("metrics", self.metrics.join(",")),
            ("sort", self.sort.join(",")),
            ("filters", self.filters.clone()),
            ("accuracy", self.accuracy.clone()),
            ("limit", self.limit.to_string()),
            ("offset", self.offset.to_string()),
            ("lang", self.lang.clone()),
            ("preset", self.preset.clone()),
            ("timezone", self.timezone.clone()),
            ("direct_client_logins", self.direct_client_logins.join(",")),
        ];
        candidates
            .into_iter()
            .filter(|(_, v)| !v.is_empty())
            .collect()
    }
}

/// The echoed query reports unset parameters as `null`.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// One dimension value of a row.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct DimensionValue {
    /// Human-readable value, `null` for "not defined".
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub id: Option<serde_json::Value>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct StatTableRow {
    #[serde(default)]
    pub dimensions: Vec<DimensionValue>,
    #[serde(default)]
    pub metrics: Vec<Option<f64>>,
}

/// One page of a report table.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct StatTablePage {
    /// The query as the server understood it; names the dimension and metric columns.
    pub query: StatTableQuery,
    #[serde(default)]
    pub data: Vec<StatTableRow>,
    #[serde(default)]
    pub total_rows: u64,
}

/// Typed access to the `data` endpoint.
#[derive(Debug, Clone)]
pub struct StatTableService {
    client: ApiClient,
}

impl StatTableService {
    /// Wraps a client bound to the stat service.
    pub fn new(client: ApiClient) -> Self {
        StatTableService { client }
    }

    /// Fetches one page; `query.offset` is 1-based.
    ///
    /// # Errors
    ///
    /// Any `ClientError` from the underlying request.
    pub async fn fetch_page(
        &self,
        query: &StatTableQuery,
        cancel: &CancellationToken,
    ) -> Result<StatTablePage, ClientError> {
        self.client.get_json("data", &query.params(), cancel).await
    }
}
