//! Counter goals endpoint (`management/v1/counter/{id}/goals`).

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use crate::api::client::ApiClient;
use crate::error_handling::ClientError;

/// A conversion goal of a counter. Composite goals carry their steps.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Goal {
    pub id: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prev_goal_id: Option<u64>,
    pub name: String,
    #[serde(rename = "type")]
    pub goal_type: String,
    #[serde(default)]
    pub goal_source: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_price: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub flag: Option<String>,
    #[serde(default)]
    pub is_favorite: u8,
    #[serde(default)]
    pub is_retargeting: u8,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub steps: Vec<Goal>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub conditions: Vec<BTreeMap<String, serde_json::Value>>,
}

#[derive(Debug, Deserialize)]
struct GoalsEnvelope {
    #[serde(default)]
    goals: Vec<Goal>,
}

#[derive(Debug, Clone)]
pub struct GoalsService {
    client: ApiClient,
}

impl GoalsService {
    /// Wraps a client bound to the management service.
    pub fn new(client: ApiClient) -> Self {
        GoalsService { client }
    }

    /// Lists every goal of `counter_id`.
    ///
    /// # Errors
    ///
    /// Any `ClientError` from the underlying request.
    pub async fn list_goals(
        &self,
        counter_id: u64,
        cancel: &CancellationToken,
    ) -> Result<Vec<Goal>, ClientError> {
        let path = format!("counter/{counter_id}/goals");
        let envelope: GoalsEnvelope = self.client.get_json(&path, &[], cancel).await?;
        Ok(envelope.goals)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_goal_decoding() {
        let envelope: GoalsEnvelope = serde_json::from_value(json!({
            "goals": [
                {
                    "id": 1,
                    "name": "Visited checkout",
                    "type": "url",
                    "goal_source": "user",
                    "is_favorite": 0,
                    "is_retargeting": 1,
                    "conditions": [{"type": "contain", "url": "/checkout"}]
                },
                {
                    "id": 2,
                    "prev_goal_id": 1,
                    "name": "Funnel",
                    "type": "step",
                    "goal_source": "user",
                    "default_price": 150.5,
                    "is_favorite": 1,
                    "is_retargeting": 0,
                    "steps": [
                        {"id": 3, "name": "Step 1", "type": "url", "is_favorite": 0, "is_retargeting": 0}
                    ]
                }
            ]
        }))
        .unwrap();

        let goals = envelope.goals;
        assert_eq!(goals.len(), 2);
        assert_eq!(goals[0].goal_type, "url");
        assert_eq!(goals[0].conditions[0]["url"], "/checkout");
        assert_eq!(goals[1].prev_goal_id, Some(1));
        assert_eq!(goals[1].default_price, Some(150.5));
        assert_eq!(goals[1].steps[0].id, 3);
    }

    #[test]
    fn test_goal_serializes_wire_names() {
        let goal = Goal {
            id: 9,
            prev_goal_id: None,
            name: "Call".to_string(),
            goal_type: "phone".to_string(),
            goal_source: "auto".to_string(),
            default_price: None,
            flag: None,
            is_favorite: 0,
            is_retargeting: 0,
            steps: vec![],
            conditions: vec![],
        };
        let value = serde_json::to_value(&goal).unwrap();
        assert_eq!(value["type"], "phone");
        assert!(value.get("steps").is_none());
        assert!(value.get("prev_goal_id").is_none());
    }
}
