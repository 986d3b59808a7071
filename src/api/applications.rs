//! AppMetrica application list (`management/v1/applications`).

use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use crate::api::client::ApiClient;
use crate::error_handling::ClientError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Application {
    pub id: u64,
    pub name: String,
    /// Folder the application is filed under in the web interface.
    #[serde(default)]
    pub label: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApplicationsEnvelope {
    #[serde(default)]
    applications: Vec<Application>,
}

#[derive(Debug, Clone)]
pub struct ApplicationsService {
    client: ApiClient,
}

impl ApplicationsService {
    /// Wraps a client bound to the AppMetrica management service.
    pub fn new(client: ApiClient) -> Self {
        ApplicationsService { client }
    }

    /// Lists the applications visible to the token.
    pub async fn list_applications(
        &self,
        cancel: &CancellationToken,
    ) -> Result<Vec<Application>, ClientError> {
        let envelope: ApplicationsEnvelope =
            self.client.get_json("applications", &[], cancel).await?;
        Ok(envelope.applications)
    }
}
