//! `yandex_appmetrica_applications`: every application visible to the token, emitted once.

use async_trait::async_trait;
use log::error;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;

use crate::api::{ApplicationsService, ServiceKind};
use crate::config::{ApplicationsInputConfig, APPMETRICA_API_HOST};
use crate::error_handling::{ClientError, ConfigError, InputError};
use crate::input::{build_client, records_to_messages, Batch, Input};

pub struct ApplicationsInput {
    service: ApplicationsService,
    emitted: Mutex<bool>,
}

impl ApplicationsInput {
    pub const NAME: &'static str = "yandex_appmetrica_applications";

    pub fn new(service: ApplicationsService) -> Self {
        ApplicationsInput {
            service,
            emitted: Mutex::new(false),
        }
    }

    pub fn from_config(config: ApplicationsInputConfig) -> Result<Self, ConfigError> {
        let client = build_client(
            config.api_url.as_deref(),
            APPMETRICA_API_HOST,
            ServiceKind::Management,
            config.token,
        )?;
        Ok(ApplicationsInput::new(ApplicationsService::new(client)))
    }
}

#[async_trait]
impl Input for ApplicationsInput {
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

        let applications = match self.service.list_applications(cancel).await {
            Ok(applications) => applications,
            Err(ClientError::Cancelled) => return Err(InputError::EndOfInput),
            Err(e) => {
                error!("Failed to list applications: {}", e);
                return Err(InputError::EndOfInput);
            }
        };

        let messages = records_to_messages("application", &applications, |app| app.id);
        Ok(Batch::new(messages))
    }

    async fn close(&self, _cancel: &CancellationToken) -> Result<(), InputError> {
        Ok(())
    }
}
