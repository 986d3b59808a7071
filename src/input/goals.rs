//! `yandex_metrika_goals`: the goals of one counter, emitted once.

use async_trait::async_trait;
use log::error;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;

use crate::api::{GoalsService, ServiceKind};
use crate::config::{GoalsInputConfig, METRIKA_API_HOST};
use crate::error_handling::{ClientError, ConfigError, InputError};
use crate::input::{build_client, records_to_messages, Batch, Input};

pub struct GoalsInput {
    counter_id: u64,
    service: GoalsService,
    emitted: Mutex<bool>,
}

impl GoalsInput {
    pub const NAME: &'static str = "yandex_metrika_goals";

    pub fn new(service: GoalsService, counter_id: u64) -> Self {
        GoalsInput {
            counter_id,
            service,
            emitted: Mutex::new(false),
        }
    }

    pub fn from_config(config: GoalsInputConfig) -> Result<Self, ConfigError> {
        let config = config.validated()?;
        let client = build_client(
            config.api_url.as_deref(),
            METRIKA_API_HOST,
            ServiceKind::Management,
            config.token,
        )?;
        Ok(GoalsInput::new(GoalsService::new(client), config.counter_id))
    }
}

#[async_trait]
impl Input for GoalsInput {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    async fn connect(&self, _cancel: &CancellationToken) -> Result<(), InputError> {
        Ok(())
    }

    async fn read_batch(&self, cancel: &CancellationToken) -> Result<Batch, InputError> {
        let mut emitted = self.emitted.lock().await;
        if *emitted {
            return Err(InputError::EndOfInput);
        }
        *emitted = true;

        let goals = match self.service.list_goals(self.counter_id, cancel).await {
            Ok(goals) => goals,
            Err(ClientError::Cancelled) => return Err(InputError::EndOfInput),
            Err(e) => {
                error!("Failed to list goals of counter {}: {}", self.counter_id, e);
                return Err(InputError::EndOfInput);
            }
        };

        let messages = records_to_messages("goal", &goals, |goal| goal.id)
            .into_iter()
            .map(|message| message.with_meta("counter_id", self.counter_id))
            .collect();
        Ok(Batch::new(messages))
    }

    async fn close(&self, _cancel: &CancellationToken) -> Result<(), InputError> {
        Ok(())
    }
}
