// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The State Reducer: the closed action→event mapping table (`spec.md`
//! §4.3). Every action here loads the current snapshot, appends the
//! derived event as one compare-and-set, then — if the event type carries
//! a status transition — folds it into a second compare-and-set against
//! the snapshot. These are always two independent calls, never one
//! transaction; a "two-event" action like `TASK_GROUP_OBJECTIVE_MET` is
//! just two such actions run back to back, the second seeing the version
//! the first one left behind.

use crate::error::EngineError;
use co_core::{CampaignEvent, Clock, EventId, EventType, ExecutionStatus};
use co_storage::CampaignStore;
use serde_json::{json, Value};
use tokio::sync::broadcast;

/// Default capacity for the reducer's event-fanout channel (`spec.md`
/// §4.5); a lagging subscriber misses old events rather than stalling
/// the reducer.
const FANOUT_CAPACITY: usize = 1024;

/// Applies reducer actions against a [`CampaignStore`]. Cheap to clone;
/// holds only a clock and the fanout sender.
#[derive(Clone)]
pub struct Reducer<C: Clock> {
    clock: C,
    fanout: broadcast::Sender<CampaignEvent>,
}

impl<C: Clock> Reducer<C> {
    pub fn new(clock: C) -> Self {
        let (fanout, _) = broadcast::channel(FANOUT_CAPACITY);
        Self { clock, fanout }
    }

    /// Every lifecycle event successfully appended is also offered here
    /// (`spec.md` §2, §4.5: "hands the resulting lifecycle events to the
    /// Fanout"). Non-blocking: a receiver that falls behind sees `Lagged`.
    pub fn subscribe_events(&self) -> broadcast::Receiver<CampaignEvent> {
        self.fanout.subscribe()
    }

    /// `spec.md` §4.2(c): fold a fired Petri transition into the event log.
    /// Unknown campaigns and transitions outside the closed mapping below
    /// are silently ignored — the caller already validated the transition
    /// fired against the net; this only decides what to *record*.
    pub async fn handle_petri_transition(
        &self,
        store: &dyn CampaignStore,
        campaign_id: &str,
        transition_name: &str,
    ) -> Result<(), EngineError> {
        if transition_name == "finalize_campaign" {
            return self
                .record_campaign_event(
                    store,
                    campaign_id,
                    EventType::CampaignCompleted,
                    json!({ "transition": transition_name }),
                )
                .await;
        }

        if let Some(group_id) = transition_name.strip_prefix("activate_") {
            return self
                .record_task_group_event(
                    store,
                    campaign_id,
                    group_id,
                    EventType::TaskGroupStarted,
                    json!({ "transition": transition_name }),
                )
                .await;
        }

        if let Some(group_id) = transition_name.strip_prefix("complete_") {
            return self
                .record_task_group_event(
                    store,
                    campaign_id,
                    group_id,
                    EventType::TaskGroupCompleted,
                    json!({ "transition": transition_name }),
                )
                .await;
        }

        if let Some(rest) = transition_name.strip_prefix("task_") {
            if let Some((group_id, task_id)) = rest.split_once('_') {
                return self
                    .record_task_event(
                        store,
                        campaign_id,
                        group_id,
                        task_id,
                        EventType::TaskCompleted,
                        json!({ "transition": transition_name }),
                    )
                    .await;
            }
        }

        Ok(())
    }

    /// `spec.md` §4.3: fires `TASK_GROUP_OBJECTIVE_MET` then
    /// `TASK_GROUP_COMPLETED`, as two sequential actions.
    pub async fn record_task_group_objective_met(
        &self,
        store: &dyn CampaignStore,
        campaign_id: &str,
        group_id: &str,
        objective_id: &str,
    ) -> Result<(), EngineError> {
        self.record_task_group_event(
            store,
            campaign_id,
            group_id,
            EventType::TaskGroupObjectiveMet,
            json!({ "objective_id": objective_id }),
        )
        .await?;

        self.record_task_group_event(
            store,
            campaign_id,
            group_id,
            EventType::TaskGroupCompleted,
            json!({ "reason": "objective_met", "objective_id": objective_id }),
        )
        .await
    }

    pub async fn record_campaign_event(
        &self,
        store: &dyn CampaignStore,
        campaign_id: &str,
        event_type: EventType,
        payload: Value,
    ) -> Result<(), EngineError> {
        let step_id = payload
            .get("step_id")
            .and_then(|v| v.as_str())
            .map(|s| s.to_string());

        self.record(store, campaign_id, event_type, payload, |snapshot| {
            match event_type {
                EventType::CampaignStarted => snapshot.state.status = ExecutionStatus::Running,
                EventType::CampaignCompleted => snapshot.state.status = ExecutionStatus::Complete,
                EventType::CampaignCancelled
                | EventType::CampaignError
                | EventType::CampaignErrorFromService
                | EventType::UnknownError => snapshot.state.status = ExecutionStatus::Error,
                EventType::StepStart => snapshot.state.active_step = step_id,
                EventType::StepComplete => snapshot.state.active_step = None,
                // `CAMPAIGN_OBJECTIVE_MET` is recorded without a status
                // transition, same as `TASK_GROUP_OBJECTIVE_MET`.
                EventType::CampaignObjectiveMet => {}
                _ => {}
            }
        })
        .await
    }

    /// Records that a campaign's objective was met without transitioning
    /// its status (`campaign_orchestrator.py`'s `_record_campaign_event`
    /// status_map omits `CAMPAIGN_OBJECTIVE_MET`, same as the task-group
    /// equivalent).
    pub async fn record_campaign_objective_met(
        &self,
        store: &dyn CampaignStore,
        campaign_id: &str,
        objective_id: &str,
    ) -> Result<(), EngineError> {
        self.record_campaign_event(
            store,
            campaign_id,
            EventType::CampaignObjectiveMet,
            json!({ "objective_id": objective_id }),
        )
        .await
    }

    pub async fn record_task_group_event(
        &self,
        store: &dyn CampaignStore,
        campaign_id: &str,
        group_id: &str,
        event_type: EventType,
        payload: Value,
    ) -> Result<(), EngineError> {
        let mut enriched = payload;
        if let Value::Object(map) = &mut enriched {
            map.insert("task_group_id".to_string(), json!(group_id));
        }

        self.record(store, campaign_id, event_type, enriched, |snapshot| {
            let new_status = match event_type {
                EventType::TaskGroupStarted => ExecutionStatus::Running,
                EventType::TaskGroupCompleted => ExecutionStatus::Complete,
                // `TASK_GROUP_OBJECTIVE_MET` is recorded without a status
                // transition; `record_task_group_objective_met` follows it
                // with an explicit `TASK_GROUP_COMPLETED`.
                _ => return,
            };
            if let Some(group) = snapshot.state.task_groups.get_mut(group_id) {
                group.status = new_status;
            }
        })
        .await
    }

    pub async fn record_task_event(
        &self,
        store: &dyn CampaignStore,
        campaign_id: &str,
        group_id: &str,
        task_id: &str,
        event_type: EventType,
        payload: Value,
    ) -> Result<(), EngineError> {
        let mut enriched = payload;
        if let Value::Object(map) = &mut enriched {
            map.insert("task_group_id".to_string(), json!(group_id));
            map.insert("task_id".to_string(), json!(task_id));
        }

        self.record(store, campaign_id, event_type, enriched, |snapshot| {
            let new_status = match event_type {
                EventType::TaskNotRunning => ExecutionStatus::Queued,
                EventType::TaskRunning => ExecutionStatus::Running,
                EventType::TaskCompleted => ExecutionStatus::Complete,
                EventType::TaskFailed => ExecutionStatus::Error,
                // `TASK_EVENT_RECEIVED` is the perpetual progress tick; it
                // never changes task status or the snapshot version
                // (`spec.md` §9 open question).
                _ => return,
            };
            if let Some(group) = snapshot.state.task_groups.get_mut(group_id) {
                if let Some(task) = group.tasks.get_mut(task_id) {
                    task.status = new_status;
                }
            }
        })
        .await
    }

    async fn record(
        &self,
        store: &dyn CampaignStore,
        campaign_id: &str,
        event_type: EventType,
        payload: Value,
        apply: impl FnOnce(&mut co_storage::CampaignSnapshot),
    ) -> Result<(), EngineError> {
        let Some(mut snapshot) = store.load_snapshot(campaign_id).await? else {
            return Ok(());
        };
        let expected_version = snapshot.version;

        let event = CampaignEvent {
            event_id: EventId::new_random().as_str().to_string(),
            campaign_id: campaign_id.to_string(),
            seq: expected_version + 1,
            event_type,
            payload,
            timestamp: self.clock.rfc3339(),
        };
        store.append_event(event.clone(), expected_version).await?;
        let _ = self.fanout.send(event.clone());

        if event_type.bumps_snapshot_version() {
            apply(&mut snapshot);
            snapshot.version = event.seq;
            snapshot.updated_at = chrono::DateTime::<chrono::Utc>::from_timestamp_millis(
                self.clock.epoch_ms() as i64,
            )
            .unwrap_or_default();
            store.update_snapshot(snapshot, expected_version).await?;
        }

        Ok(())
    }
}

#[cfg(test)]
#[path = "reducer_tests.rs"]
mod tests;
