//! Integration tests for the one-shot inputs
//!
//! Goals and applications are listed once, emitted as a single batch, and
//! every later read is end of input.

use metrika_inputs::config::{ApplicationsInputConfig, GoalsInputConfig};
use metrika_inputs::input::{ApplicationsInput, GoalsInput};
use metrika_inputs::Input;
use serde_json::json;
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn goals_input(server: &MockServer) -> GoalsInput {
    GoalsInput::from_config(GoalsInputConfig {
        token: Some("goals-token".to_string()),
        counter_id: 42,
        api_url: Some(server.uri()),
    })
    .expect("valid goals config")
}

#[tokio::test]
async fn test_goals_emitted_once() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/management/v1/counter/42/goals"))
        .and(header("Authorization", "Bearer goals-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "goals": [
                {
                    "id": 1,
                    "name": "Checkout",
                    "type": "url",
                    "goal_source": "user",
                    "is_favorite": 1,
                    "is_retargeting": 0,
                    "conditions": [{"type": "contain", "url": "/checkout"}]
                },
                {
                    "id": 2,
                    "name": "Funnel",
                    "type": "step",
                    "is_favorite": 0,
                    "is_retargeting": 0,
                    "steps": [
                        {"id": 3, "name": "Cart", "type": "url", "prev_goal_id": 2},
                        {"id": 4, "name": "Pay", "type": "url", "prev_goal_id": 3}
                    ]
                }
            ]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let input = goals_input(&server);
    let cancel = CancellationToken::new();
    input.connect(&cancel).await.unwrap();

    let batch = input.read_batch(&cancel).await.unwrap();
    assert_eq!(batch.len(), 2);
    assert_eq!(batch.messages[0].content["name"], "Checkout");
    assert_eq!(batch.messages[0].content["type"], "url");
    assert_eq!(batch.messages[0].content["conditions"][0]["url"], "/checkout");
    assert_eq!(batch.messages[1].content["steps"][1]["prev_goal_id"], 3);
    assert_eq!(batch.messages[1].meta("counter_id"), Some(&json!(42)));

    assert!(input.read_batch(&cancel).await.unwrap_err().is_end_of_input());
    input.close(&cancel).await.unwrap();
}

#[tokio::test]
async fn test_goals_failure_ends_input() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/management/v1/counter/42/goals"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({
            "code": 404,
            "message": "Counter not found"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let input = goals_input(&server);
    let cancel = CancellationToken::new();
    assert!(input.read_batch(&cancel).await.unwrap_err().is_end_of_input());
    assert!(input.read_batch(&cancel).await.unwrap_err().is_end_of_input());
}

#[tokio::test]
async fn test_applications_emitted_once() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/management/v1/applications"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "applications": [
                {"id": 1111, "name": "Shop", "label": "prod"},
                {"id": 2222, "name": "Shop beta"}
            ]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let input = ApplicationsInput::from_config(ApplicationsInputConfig {
        api_url: Some(server.uri()),
        ..Default::default()
    })
    .unwrap();
    let cancel = CancellationToken::new();

    let batch = input.read_batch(&cancel).await.unwrap();
    assert_eq!(batch.len(), 2);
    assert_eq!(
        batch.messages[0].content,
        json!({"id": 1111, "name": "Shop", "label": "prod"})
    );
    assert_eq!(batch.messages[1].content["label"], json!(null));
    assert!(batch.messages[0].metadata.is_empty());

    assert!(input.read_batch(&cancel).await.unwrap_err().is_end_of_input());

    let requests = server.received_requests().await.unwrap();
    assert!(requests[0].headers.get("authorization").is_none());
}
