//! `yandex_metrika_stat_table` / `yandex_appmetrica_stat_table`: report
//! tables fetched page by page.

use async_trait::async_trait;
use log::{debug, error};
use serde_json::{Map, Value};
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;

use crate::api::{ServiceKind, StatTablePage, StatTableQuery, StatTableService};
use crate::config::{StatTableInputConfig, APPMETRICA_API_HOST, METRIKA_API_HOST, STAT_TABLE_PAGE_LIMIT};
use crate::error_handling::{ClientError, ConfigError, InputError};
use crate::input::{build_client, Batch, Input, Message};
use crate::utils::format_key;

#[derive(Debug, Default)]
struct PageState {
    fetched: u64,
    /// Unknown until the first response.
    total: Option<u64>,
}

/// Paginated report table input.
pub struct StatTableInput {
    name: &'static str,
    query: StatTableQuery,
    service: StatTableService,
    format_keys: bool,
    state: Mutex<PageState>,
}

impl StatTableInput {
    pub const METRIKA_NAME: &'static str = "yandex_metrika_stat_table";
    pub const APPMETRICA_NAME: &'static str = "yandex_appmetrica_stat_table";

    pub fn new(service: StatTableService, query: StatTableQuery) -> Self {
        StatTableInput {
            name: Self::METRIKA_NAME,
            query: StatTableQuery {
                limit: STAT_TABLE_PAGE_LIMIT,
                ..query
            },
            service,
            format_keys: true,
            state: Mutex::new(PageState::default()),
        }
    }

    /// Builds a Metrika report table input.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if validation fails or the API URL is invalid.
    pub fn metrika(config: StatTableInputConfig) -> Result<Self, ConfigError> {
        Self::from_config(config, Self::METRIKA_NAME, METRIKA_API_HOST)
    }

    /// Builds an AppMetrica report table input; `ids` are application ids.
    pub fn appmetrica(config: StatTableInputConfig) -> Result<Self, ConfigError> {
        Self::from_config(config, Self::APPMETRICA_NAME, APPMETRICA_API_HOST)
    }

    fn from_config(
        config: StatTableInputConfig,
        name: &'static str,
        default_host: &str,
    ) -> Result<Self, ConfigError> {
        let config = config.validated()?;
        let client = build_client(
            config.api_url.as_deref(),
            default_host,
            ServiceKind::Stat,
            config.token.clone(),
        )?;
        let query = StatTableQuery {
            ids: config.ids,
            date1: config.date1,
            date2: config.date2,
            dimensions: config.dimensions,
            metrics: config.metrics,
            sort: config.sort,
            filters: config.filters.unwrap_or_default(),
            accuracy: config.accuracy.unwrap_or_default(),
            lang: config.lang.unwrap_or_default(),
            preset: config.preset.unwrap_or_default(),
            timezone: config.timezone.unwrap_or_default(),
            direct_client_logins: config.direct_client_logins,
            ..Default::default()
        };

        let mut input = StatTableInput::new(StatTableService::new(client), query)
            .with_format_keys(config.format_keys);
        input.name = name;
        Ok(input)
    }

    pub fn with_format_keys(mut self, format_keys: bool) -> Self {
        self.format_keys = format_keys;
        self
    }

    pub fn with_page_limit(mut self, limit: u32) -> Self {
        self.query.limit = limit;
        self
    }

    /// Rows fetched so far and the total, once known.
    pub async fn progress(&self) -> (u64, Option<u64>) {
        let state = self.state.lock().await;
        (state.fetched, state.total)
    }

    fn key(&self, raw: &str) -> String {
        if self.format_keys {
            format_key(raw)
        } else {
            raw.to_string()
        }
    }

    /// Zips the echoed column names with each row's values.
    fn page_messages(&self, page: &StatTablePage) -> Vec<Message> {
        let dimension_keys: Vec<String> =
            page.query.dimensions.iter().map(|d| self.key(d)).collect();
        let metric_keys: Vec<String> = page.query.metrics.iter().map(|m| self.key(m)).collect();
        let query = serde_json::to_value(&page.query).unwrap_or(Value::Null);

        page.data
            .iter()
            .map(|row| {
                let mut content = Map::new();
                for (key, dimension) in dimension_keys.iter().zip(&row.dimensions) {
                    content.insert(key.clone(), dimension.name.clone().into());
                }
                for (key, metric) in metric_keys.iter().zip(&row.metrics) {
                    content.insert(key.clone(), (*metric).into());
                }
                Message::new(Value::Object(content))
                    .with_meta("query", query.clone())
                    .with_meta("limit", page.query.limit)
                    .with_meta("offset", page.query.offset)
                    .with_meta("total", page.total_rows)
            })
            .collect()
    }
}

#[async_trait]
impl Input for StatTableInput {
    fn name(&self) -> &'static str {
        self.name
    }

    async fn connect(&self, _cancel: &CancellationToken) -> Result<(), InputError> {
        Ok(())
    }

    async fn read_batch(&self, cancel: &CancellationToken) -> Result<Batch, InputError> {
        let mut state = self.state.lock().await;
        if let Some(total) = state.total {
            if state.fetched >= total {
                return Err(InputError::EndOfInput);
            }
        }

        let offset = u32::try_from(state.fetched + 1).map_err(|_| InputError::EndOfInput)?;
        let query = StatTableQuery {
            offset,
            ..self.query.clone()
        };
        debug!(
            "Fetching {} rows from offset {} of report {:?}",
            query.limit, offset, query.metrics
        );

        let page = match self.service.fetch_page(&query, cancel).await {
            Ok(page) => page,
            Err(ClientError::Cancelled) => return Err(InputError::EndOfInput),
            Err(e) => {
                error!("Failed to fetch report table page at offset {}: {}", offset, e);
                return Err(InputError::EndOfInput);
            }
        };

        if page.total_rows == 0 || page.data.is_empty() {
            state.total = Some(state.fetched);
            return Err(InputError::EndOfInput);
        }
        if state.total.is_none() {
            state.total = Some(page.total_rows);
        }
        state.fetched += page.data.len() as u64;

        Ok(Batch::new(self.page_messages(&page)))
    }

    async fn close(&self, _cancel: &CancellationToken) -> Result<(), InputError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::ApiClient;
    use crate::initialization::init_client;
    use serde_json::json;

    fn input(format_keys: bool) -> StatTableInput {
        let client = ApiClient::new(
            init_client().unwrap(),
            "http://127.0.0.1:9",
            ServiceKind::Stat,
            None,
        )
        .unwrap();
        StatTableInput::new(StatTableService::new(client), StatTableQuery::default())
            .with_format_keys(format_keys)
    }

    fn page() -> StatTablePage {
        serde_json::from_value(json!({
            "query": {
                "ids": [1],
                "dimensions": ["ym:s:trafficSource", "ym:s:date"],
                "metrics": ["ym:s:visits", "ym:s:bounceRate"],
                "limit": 1000,
                "offset": 1
            },
            "data": [
                {
                    "dimensions": [{"name": "Direct traffic", "id": "direct"}, {"name": "2024-01-01"}],
                    "metrics": [10.0, 0.25]
                },
                {
                    "dimensions": [{"name": null}, {"name": "2024-01-02"}],
                    "metrics": [3.0, null]
                }
            ],
            "total_rows": 2
        }))
        .unwrap()
    }

    #[test]
    fn test_page_messages_formatted_keys() {
        let messages = input(true).page_messages(&page());
        assert_eq!(messages.len(), 2);
        assert_eq!(
            messages[0].content,
            json!({
                "traffic_source": "Direct traffic",
                "date": "2024-01-01",
                "visits": 10.0,
                "bounce_rate": 0.25
            })
        );
        assert_eq!(messages[1].content["traffic_source"], Value::Null);
        assert_eq!(messages[1].content["bounce_rate"], Value::Null);
        assert_eq!(messages[0].meta("total"), Some(&json!(2)));
        assert_eq!(messages[0].meta("offset"), Some(&json!(1)));
        assert_eq!(messages[0].meta("limit"), Some(&json!(1000)));
        assert_eq!(messages[0].meta("query").unwrap()["ids"], json!([1]));
    }

    #[test]
    fn test_page_messages_raw_keys() {
        let messages = input(false).page_messages(&page());
        assert_eq!(messages[0].content["ym:s:visits"], 10.0);
        assert!(messages[0].content.get("visits").is_none());
    }

    #[test]
    fn test_default_page_limit() {
        assert_eq!(input(true).query.limit, STAT_TABLE_PAGE_LIMIT);
        assert_eq!(input(true).with_page_limit(5).query.limit, 5);
    }
}
