// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! End-to-end scenarios against the wired engine: submit through an
//! in-memory Event Store and a fake broker (literal scenarios).

use co_broker::{BrokerCall, FakeBrokerClient};
use co_core::{CampaignId, CapabilitySelector, EventType, FakeClock, Task, TaskGroup};
use co_engine::{EngineError, Orchestrator};
use co_storage::InMemoryCampaignStore;
use std::collections::HashMap;
use std::sync::Arc;

type Campaign = co_core::Campaign;

fn one_step_campaign(id: &str) -> Campaign {
    Campaign {
        id: id.to_string(),
        name: "seeding-run".to_string(),
        user: "operator".to_string(),
        description: String::new(),
        task_groups: vec![TaskGroup {
            id: "tg-1".to_string(),
            group_dependencies: vec![],
            tasks: vec![Task {
                id: "task-1".to_string(),
                hierarchy: "org.fac.system.subsystem.service".to_string(),
                capability: "run".to_string(),
                selector: CapabilitySelector::OperationId("op".to_string()),
                input: None,
                output: None,
                task_dependencies: vec![],
            }],
            objectives: vec![],
        }],
    }
}

async fn wired() -> (
    Arc<Orchestrator<InMemoryCampaignStore, FakeBrokerClient, FakeClock>>,
    Arc<FakeBrokerClient>,
    Arc<InMemoryCampaignStore>,
) {
    let store = Arc::new(InMemoryCampaignStore::new());
    let broker = Arc::new(FakeBrokerClient::new());
    let orchestrator = Arc::new(Orchestrator::new(store.clone(), broker.clone(), FakeClock::new(0)));
    broker.subscribe(orchestrator.clone()).await.unwrap();
    (orchestrator, broker, store)
}

fn success_headers(campaign_id: &str, node_id: &str) -> HashMap<String, String> {
    let mut headers = HashMap::new();
    headers.insert("campaignId".to_string(), campaign_id.to_string());
    headers.insert("nodeId".to_string(), node_id.to_string());
    headers.insert("has_error".to_string(), "false".to_string());
    headers.insert("source".to_string(), "org.fac.system.subsystem.service".to_string());
    headers
}

#[tokio::test]
async fn happy_single_step_reaches_campaign_complete() {
    let (orchestrator, broker, store) = wired().await;
    let id = orchestrator.submit_campaign(one_step_campaign(&uuid::Uuid::new_v4().to_string())).await.unwrap();

    broker
        .deliver(
            bytes::Bytes::from_static(b"{}"),
            "application/json",
            success_headers(id.as_str(), "task-1"),
        )
        .await;

    let events = store.load_events(id.as_str(), 0).await.unwrap();
    let types: Vec<EventType> = events.iter().map(|e| e.event_type).collect();
    assert!(types.contains(&EventType::StepStart));
    assert!(types.contains(&EventType::StepComplete));
    assert_eq!(types.last(), Some(&EventType::CampaignCompleted));
}

#[tokio::test]
async fn service_error_tears_the_campaign_down() {
    let (orchestrator, broker, store) = wired().await;
    let id = orchestrator.submit_campaign(one_step_campaign(&uuid::Uuid::new_v4().to_string())).await.unwrap();

    let mut headers = HashMap::new();
    headers.insert("campaignId".to_string(), id.as_str().to_string());
    headers.insert("nodeId".to_string(), "task-1".to_string());
    headers.insert("has_error".to_string(), "true".to_string());
    headers.insert("source".to_string(), "org.fac.system.subsystem.service".to_string());
    broker
        .deliver(bytes::Bytes::from_static(b"{\"error\":\"boom\"}"), "application/json", headers)
        .await;

    let events = store.load_events(id.as_str(), 0).await.unwrap();
    let last = events.last().unwrap();
    assert_eq!(last.event_type, EventType::CampaignErrorFromService);
    assert_eq!(
        last.payload.get("service_hierarchy").and_then(|v| v.as_str()),
        Some("org.fac.system.subsystem.service")
    );
}

#[tokio::test]
async fn late_callback_after_completion_is_a_silent_no_op() {
    let (orchestrator, broker, store) = wired().await;
    let id = orchestrator.submit_campaign(one_step_campaign(&uuid::Uuid::new_v4().to_string())).await.unwrap();

    broker.deliver(bytes::Bytes::from_static(b"{}"), "application/json", success_headers(id.as_str(), "task-1")).await;
    let events_before = store.load_events(id.as_str(), 0).await.unwrap().len();

    // Re-deliver the exact same callback now that the campaign is gone.
    broker.deliver(bytes::Bytes::from_static(b"{}"), "application/json", success_headers(id.as_str(), "task-1")).await;
    let events_after = store.load_events(id.as_str(), 0).await.unwrap().len();

    assert_eq!(events_before, events_after);
}

#[tokio::test]
async fn cancel_unknown_campaign_returns_false_and_emits_nothing() {
    let (orchestrator, _broker, _store) = wired().await;
    let random = uuid::Uuid::new_v4().to_string();
    assert!(!orchestrator.cancel_campaign(&random).await.unwrap());
}

#[tokio::test]
async fn group_dependency_cycle_is_rejected_at_submit() {
    let (orchestrator, _broker, store) = wired().await;
    let id = uuid::Uuid::new_v4().to_string();
    let cyclic = Campaign {
        id: id.clone(),
        name: String::new(),
        user: String::new(),
        description: String::new(),
        task_groups: vec![
            TaskGroup { id: "a".to_string(), group_dependencies: vec!["c".to_string()], tasks: vec![], objectives: vec![] },
            TaskGroup { id: "b".to_string(), group_dependencies: vec!["a".to_string()], tasks: vec![], objectives: vec![] },
            TaskGroup { id: "c".to_string(), group_dependencies: vec!["b".to_string()], tasks: vec![], objectives: vec![] },
        ],
    };

    let result = orchestrator.submit_campaign(cyclic).await;
    assert!(matches!(result, Err(EngineError::CycleDetected)));
    assert!(!store.campaign_exists(&id).await.unwrap());
}

#[tokio::test]
async fn empty_campaign_completes_with_zero_dispatches() {
    let (orchestrator, broker, store) = wired().await;
    let campaign = Campaign {
        id: uuid::Uuid::new_v4().to_string(),
        name: String::new(),
        user: String::new(),
        description: String::new(),
        task_groups: vec![],
    };

    let id = orchestrator.submit_campaign(campaign).await.unwrap();

    let publishes = broker.calls().iter().filter(|c| matches!(c, BrokerCall::Publish { .. })).count();
    assert_eq!(publishes, 0);

    let events = store.load_events(id.as_str(), 0).await.unwrap();
    assert_eq!(events.last().map(|e| e.event_type), Some(EventType::CampaignCompleted));
}

#[tokio::test]
async fn duplicate_submit_of_the_same_id_is_rejected() {
    let (orchestrator, _broker, _store) = wired().await;
    let campaign = one_step_campaign(&uuid::Uuid::new_v4().to_string());
    orchestrator.submit_campaign(campaign.clone()).await.unwrap();
    let second = orchestrator.submit_campaign(campaign).await;
    assert!(matches!(second, Err(EngineError::AlreadyRegistered(_))));
}

#[tokio::test]
async fn submitted_campaign_id_round_trips_through_parse_or_mint() {
    let valid = uuid::Uuid::new_v4().to_string();
    assert_eq!(CampaignId::parse_or_mint(&valid).as_str(), valid);

    let minted = CampaignId::parse_or_mint("not-a-uuid");
    assert!(uuid::Uuid::parse_str(minted.as_str()).is_ok());
}
