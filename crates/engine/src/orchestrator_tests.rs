use super::*;
use co_broker::FakeBrokerClient;
use co_core::{CapabilitySelector, FakeClock, Task, TaskGroup};
use co_storage::InMemoryCampaignStore;
use std::sync::Arc;

fn campaign(id: &str) -> Campaign {
    Campaign {
        id: id.to_string(),
        name: String::new(),
        user: String::new(),
        description: String::new(),
        task_groups: vec![TaskGroup {
            id: "tg-1".to_string(),
            group_dependencies: vec![],
            tasks: vec![
                Task {
                    id: "step-1".to_string(),
                    hierarchy: "org.fac.sys.sub.svc".to_string(),
                    capability: "do".to_string(),
                    selector: CapabilitySelector::OperationId("op".to_string()),
                    input: None,
                    output: None,
                    task_dependencies: vec![],
                },
                Task {
                    id: "step-2".to_string(),
                    hierarchy: "org.fac.sys.sub.svc".to_string(),
                    capability: "do".to_string(),
                    selector: CapabilitySelector::OperationId("op".to_string()),
                    input: None,
                    output: None,
                    task_dependencies: vec![],
                },
            ],
            objectives: vec![],
        }],
    }
}

async fn wired() -> (
    Arc<Orchestrator<InMemoryCampaignStore, FakeBrokerClient, FakeClock>>,
    Arc<FakeBrokerClient>,
) {
    let store = Arc::new(InMemoryCampaignStore::default());
    let broker = Arc::new(FakeBrokerClient::new());
    let orchestrator = Arc::new(Orchestrator::new(store, broker.clone(), FakeClock::new(0)));
    broker.subscribe(orchestrator.clone()).await.unwrap();
    (orchestrator, broker)
}

#[tokio::test]
async fn submit_dispatches_the_first_step_and_publishes_it() {
    let (orchestrator, broker) = wired().await;
    let id = orchestrator.submit_campaign(campaign("11111111-1111-1111-1111-111111111111")).await.unwrap();

    let calls = broker.calls();
    assert_eq!(calls.len(), 2); // Subscribe, then the first publish.
    match &calls[1] {
        co_broker::BrokerCall::Publish { topic, headers, .. } => {
            assert_eq!(topic, "org/fac/sys/sub/svc/response");
            assert_eq!(headers.get("source").map(String::as_str), Some("org.fac.sys.sub.svc"));
        }
        other => panic!("expected a publish call, got {other:?}"),
    }
    let _ = id;
}

#[tokio::test]
async fn broker_success_callback_advances_to_the_next_step() {
    let (orchestrator, broker) = wired().await;
    let id = orchestrator
        .submit_campaign(campaign("22222222-2222-2222-2222-222222222222"))
        .await
        .unwrap();

    let mut headers = std::collections::HashMap::new();
    headers.insert("campaignId".to_string(), id.as_str().to_string());
    headers.insert("nodeId".to_string(), "step-1".to_string());
    headers.insert("has_error".to_string(), "false".to_string());
    broker.deliver(bytes::Bytes::from_static(b"{}"), "application/json", headers).await;

    let calls = broker.calls();
    // Subscribe + dispatch(step-1) + dispatch(step-2)
    assert_eq!(calls.len(), 3);
}

#[tokio::test]
async fn broker_callback_for_a_stale_step_is_silently_dropped() {
    let (orchestrator, broker) = wired().await;
    let id = orchestrator
        .submit_campaign(campaign("33333333-3333-3333-3333-333333333333"))
        .await
        .unwrap();

    let mut headers = std::collections::HashMap::new();
    headers.insert("campaignId".to_string(), id.as_str().to_string());
    headers.insert("nodeId".to_string(), "step-2".to_string()); // not the active step
    headers.insert("has_error".to_string(), "false".to_string());
    broker.deliver(bytes::Bytes::from_static(b"{}"), "application/json", headers).await;

    // No second publish happened.
    assert_eq!(broker.calls().len(), 2);
}

#[tokio::test]
async fn broker_error_callback_tears_the_campaign_down() {
    let (orchestrator, broker) = wired().await;
    let id = orchestrator
        .submit_campaign(campaign("44444444-4444-4444-4444-444444444444"))
        .await
        .unwrap();

    let mut headers = std::collections::HashMap::new();
    headers.insert("campaignId".to_string(), id.as_str().to_string());
    headers.insert("nodeId".to_string(), "step-1".to_string());
    headers.insert("has_error".to_string(), "true".to_string());
    headers.insert("source".to_string(), "org.fac.sys.sub.svc".to_string());
    broker
        .deliver(bytes::Bytes::from_static(b"{\"payload\": \"boom\"}"), "application/json", headers)
        .await;

    // The campaign is gone from the live table: firing a transition fails.
    assert!(orchestrator.fire_petri_transition(id.as_str(), "finalize_campaign").await.is_err());
}

#[tokio::test]
async fn cancel_unknown_campaign_returns_false() {
    let (orchestrator, _broker) = wired().await;
    assert!(!orchestrator.cancel_campaign("ghost").await.unwrap());
}

#[tokio::test]
async fn duplicate_submit_of_the_same_id_fails() {
    let (orchestrator, _broker) = wired().await;
    let c = campaign("55555555-5555-5555-5555-555555555555");
    orchestrator.submit_campaign(c.clone()).await.unwrap();
    assert!(matches!(
        orchestrator.submit_campaign(c).await,
        Err(EngineError::AlreadyRegistered(_))
    ));
}
