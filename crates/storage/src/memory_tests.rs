use super::*;
use co_core::{CampaignState, EventType};

fn sample_campaign(id: &str) -> Campaign {
    Campaign {
        id: id.to_string(),
        name: String::new(),
        user: String::new(),
        description: String::new(),
        task_groups: vec![],
    }
}

fn sample_event(campaign_id: &str, seq: u64) -> CampaignEvent {
    CampaignEvent {
        event_id: format!("evt-{seq}"),
        campaign_id: campaign_id.to_string(),
        seq,
        event_type: EventType::CampaignStarted,
        payload: serde_json::json!({}),
        timestamp: "2026-01-01T00:00:00.000Z".to_string(),
    }
}

#[tokio::test]
async fn create_then_duplicate_create_fails() {
    let store = InMemoryCampaignStore::new();
    let campaign = sample_campaign("c1");
    let state = CampaignState::from_campaign(&campaign);
    store
        .create_campaign("c1", campaign.clone(), state.clone())
        .await
        .unwrap();

    let err = store
        .create_campaign("c1", campaign, state)
        .await
        .unwrap_err();
    assert!(matches!(err, StoreError::AlreadyExists(id) if id == "c1"));
}

#[tokio::test]
async fn append_event_enforces_version_and_sequence() {
    let store = InMemoryCampaignStore::new();
    let campaign = sample_campaign("c1");
    let state = CampaignState::from_campaign(&campaign);
    store
        .create_campaign("c1", campaign, state)
        .await
        .unwrap();

    store
        .append_event(sample_event("c1", 1), 0)
        .await
        .unwrap();

    let err = store
        .append_event(sample_event("c1", 1), 0)
        .await
        .unwrap_err();
    assert!(matches!(err, StoreError::SequenceConflict { .. }));
}

#[tokio::test]
async fn update_snapshot_is_compare_and_set() {
    let store = InMemoryCampaignStore::new();
    let campaign = sample_campaign("c1");
    let state = CampaignState::from_campaign(&campaign);
    store
        .create_campaign("c1", campaign, state.clone())
        .await
        .unwrap();

    store
        .append_event(sample_event("c1", 1), 0)
        .await
        .unwrap();

    store
        .update_snapshot(
            CampaignSnapshot {
                campaign_id: "c1".to_string(),
                version: 1,
                state: state.clone(),
                updated_at: chrono::Utc::now(),
            },
            0,
        )
        .await
        .unwrap();

    let err = store
        .update_snapshot(
            CampaignSnapshot {
                campaign_id: "c1".to_string(),
                version: 1,
                state,
                updated_at: chrono::Utc::now(),
            },
            0,
        )
        .await
        .unwrap_err();
    assert!(matches!(err, StoreError::VersionConflict { .. }));
}

#[tokio::test]
async fn load_events_filters_by_after_seq() {
    let store = InMemoryCampaignStore::new();
    let campaign = sample_campaign("c1");
    let state = CampaignState::from_campaign(&campaign);
    store
        .create_campaign("c1", campaign, state)
        .await
        .unwrap();
    store
        .append_event(sample_event("c1", 1), 0)
        .await
        .unwrap();
    store
        .append_event(sample_event("c1", 2), 0)
        .await
        .unwrap_err();

    let events = store.load_events("c1", 0).await.unwrap();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].seq, 1);
}
