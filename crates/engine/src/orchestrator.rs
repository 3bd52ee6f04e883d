// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Orchestrator Core: owns the live campaign table, routes broker callbacks
//! to the right campaign, dispatches outgoing task messages, and emits
//! lifecycle events (`spec.md` §4.4).

use crate::error::EngineError;
use crate::net::WorkflowNet;
use crate::reducer::Reducer;
use async_trait::async_trait;
use co_broker::{resolve, BrokerClient, BrokerSink};
use co_core::{Campaign, CampaignId, CampaignState, Clock, EventType};
use co_storage::CampaignStore;
use parking_lot::Mutex;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{info, warn};

/// A task within its group, as the flattened step list addresses it
/// (`spec.md` §4.4 "Step execution").
#[derive(Debug, Clone, PartialEq, Eq)]
struct Step {
    task_group_id: String,
    task_id: String,
}

/// Everything the Core tracks about one in-flight campaign.
struct LiveCampaign {
    campaign: Campaign,
    steps: Vec<Step>,
    current_index: usize,
    active_step: Option<Step>,
}

/// The live campaign table: canonical-id map, alias map, and net map, all
/// under one coarse-grained lock (`spec.md` §5 — O(1) lookups, no I/O
/// while holding it).
#[derive(Default)]
struct Tables {
    campaigns: HashMap<String, LiveCampaign>,
    aliases: HashMap<String, String>,
    nets: HashMap<String, WorkflowNet>,
}

/// Owns live campaigns and drives them to completion. `Store` is the Event
/// Store backend, `Broker` the publish/subscribe transport, `C` the clock.
pub struct Orchestrator<Store, Broker, C: Clock> {
    store: Arc<Store>,
    broker: Arc<Broker>,
    reducer: Reducer<C>,
    clock: C,
    tables: Mutex<Tables>,
}

impl<Store, Broker, C> Orchestrator<Store, Broker, C>
where
    Store: CampaignStore,
    Broker: BrokerClient,
    C: Clock,
{
    pub fn new(store: Arc<Store>, broker: Arc<Broker>, clock: C) -> Self {
        Self {
            store,
            broker,
            reducer: Reducer::new(clock.clone()),
            clock,
            tables: Mutex::new(Tables::default()),
        }
    }

    /// Hands out a fresh fanout queue (`spec.md` §4.5) carrying every
    /// lifecycle event the Reducer appends, across all campaigns.
    pub fn subscribe_events(&self) -> tokio::sync::broadcast::Receiver<co_core::CampaignEvent> {
        self.reducer.subscribe_events()
    }

    /// `spec.md` §4.4 "Submit": resolve the canonical id, build the alias
    /// set, compile the net, atomically register in every live map and the
    /// Event Store, then begin execution.
    pub async fn submit_campaign(&self, mut campaign: Campaign) -> Result<CampaignId, EngineError> {
        let campaign_id = CampaignId::parse_or_mint(&campaign.id);
        campaign.id = campaign_id.as_str().to_string();

        let steps = flatten_steps(&campaign);
        let mut aliases = vec![campaign.id.clone()];
        aliases.dedup();

        let initial_state = CampaignState::from_campaign(&campaign);
        let net = WorkflowNet::compile(&campaign)?;

        {
            let mut tables = self.tables.lock();
            if tables.campaigns.contains_key(campaign_id.as_str()) {
                return Err(EngineError::AlreadyRegistered(campaign_id.as_str().to_string()));
            }
            tables.campaigns.insert(
                campaign_id.as_str().to_string(),
                LiveCampaign {
                    campaign: campaign.clone(),
                    steps,
                    current_index: 0,
                    active_step: None,
                },
            );
            for alias in &aliases {
                tables.aliases.insert(alias.clone(), campaign_id.as_str().to_string());
            }
            tables.nets.insert(campaign_id.as_str().to_string(), net);
        }

        self.store
            .create_campaign(campaign_id.as_str(), campaign, initial_state)
            .await?;

        self.start_next_step(campaign_id.as_str()).await?;
        Ok(campaign_id)
    }

    /// `spec.md` §4.4 "Cancel": remove from live maps, keep the durable
    /// log, emit the cancellation event. Returns whether anything was
    /// actually removed.
    pub async fn cancel_campaign(&self, id: &str) -> Result<bool, EngineError> {
        let canonical = self.remove_campaign(id);
        let Some(canonical) = canonical else {
            return Ok(false);
        };
        self.reducer
            .record_campaign_event(
                self.store.as_ref(),
                &canonical,
                EventType::CampaignCancelled,
                json!({ "reason": "Campaign cancelled by user" }),
            )
            .await?;
        Ok(true)
    }

    /// "Fire petri transition": the explicit admin/test path (`spec.md`
    /// §4.4). Looks up the net, verifies enablement, fires, and lets the
    /// Reducer record the derived lifecycle event(s).
    pub async fn fire_petri_transition(
        &self,
        id: &str,
        transition_name: &str,
    ) -> Result<(), EngineError> {
        let canonical = {
            let tables = self.tables.lock();
            tables.aliases.get(id).cloned()
        }
        .ok_or_else(|| EngineError::NotFound(id.to_string()))?;

        {
            let mut tables = self.tables.lock();
            let net = tables
                .nets
                .get_mut(&canonical)
                .ok_or_else(|| EngineError::NotFound(canonical.clone()))?;
            net.fire(transition_name)?;
        }

        self.reducer
            .handle_petri_transition(self.store.as_ref(), &canonical, transition_name)
            .await
    }

    fn remove_campaign(&self, id: &str) -> Option<String> {
        let mut tables = self.tables.lock();
        let canonical = tables.aliases.get(id).cloned()?;
        if let Some(live) = tables.campaigns.remove(&canonical) {
            tables.aliases.retain(|_, v| v != &canonical);
            let _ = live;
        }
        tables.nets.remove(&canonical);
        Some(canonical)
    }

    /// `spec.md` §4.4 "Step execution": emit `STEP_START`, resolve the
    /// step's broker-dispatch parameters (`spec.md` §6), and publish. Any
    /// resolution failure tears the campaign down with `UNKNOWN_ERROR`.
    async fn start_next_step(&self, canonical: &str) -> Result<(), EngineError> {
        let next = {
            let mut tables = self.tables.lock();
            let Some(live) = tables.campaigns.get_mut(canonical) else {
                return Ok(());
            };
            if live.current_index >= live.steps.len() {
                None
            } else {
                let step = live.steps[live.current_index].clone();
                let is_first = live.current_index == 0;
                live.active_step = Some(step.clone());
                Some((step, live.campaign.clone(), is_first))
            }
        };

        let Some((step, campaign, is_first)) = next else {
            self.finish_campaign(canonical).await?;
            return Ok(());
        };

        if is_first {
            self.reducer
                .record_campaign_event(
                    self.store.as_ref(),
                    canonical,
                    EventType::CampaignStarted,
                    json!({}),
                )
                .await?;
        }

        self.reducer
            .record_campaign_event(
                self.store.as_ref(),
                canonical,
                EventType::StepStart,
                json!({ "step_id": step.task_id }),
            )
            .await?;

        match self.dispatch_step(&campaign, &step).await {
            Ok(()) => Ok(()),
            Err(message) => {
                self.reducer
                    .record_campaign_event(
                        self.store.as_ref(),
                        canonical,
                        EventType::UnknownError,
                        json!({ "error": message }),
                    )
                    .await?;
                self.remove_campaign(canonical);
                Ok(())
            }
        }
    }

    async fn dispatch_step(&self, campaign: &Campaign, step: &Step) -> Result<(), String> {
        let metadata = task_metadata(campaign, step).unwrap_or_else(fallback_metadata);

        let mut headers = resolve::resolve_headers(&metadata, &self.clock)
            .map_err(|e| e.to_string())?;
        let topic = resolve::resolve_topic(&metadata, &headers).map_err(|e| e.to_string())?;
        headers
            .entry("destination".to_string())
            .or_insert_with(|| topic.clone());
        let (body, content_type) = resolve::resolve_payload(&metadata);

        self.broker
            .publish(&topic, body, &content_type, headers, true)
            .await
            .map_err(|e| e.to_string())
    }

    async fn finish_campaign(&self, canonical: &str) -> Result<(), EngineError> {
        self.reducer
            .record_campaign_event(
                self.store.as_ref(),
                canonical,
                EventType::CampaignCompleted,
                json!({}),
            )
            .await?;
        self.remove_campaign(canonical);
        Ok(())
    }
}

#[async_trait]
impl<Store, Broker, C> BrokerSink for Orchestrator<Store, Broker, C>
where
    Store: CampaignStore,
    Broker: BrokerClient,
    C: Clock,
{
    /// `spec.md` §4.4 "Broker-callback handler" — the hottest path. Every
    /// step here is a silent drop on ambiguity; late or stray broker
    /// messages are expected and benign.
    async fn handle_broker_message(
        &self,
        body: bytes::Bytes,
        _content_type: &str,
        headers: HashMap<String, String>,
    ) {
        let payload: Value = serde_json::from_slice(&body).unwrap_or_else(|_| json!({}));

        let Some(campaign_id_raw) = extract_campaign_id(&headers, &payload) else {
            return;
        };

        let canonical = {
            let tables = self.tables.lock();
            tables.aliases.get(&campaign_id_raw).cloned()
        };
        let Some(canonical) = canonical else {
            return;
        };

        let Some(node_id) = extract_node_id(&headers, &payload) else {
            return;
        };

        let active_step = {
            let tables = self.tables.lock();
            tables
                .campaigns
                .get(&canonical)
                .and_then(|live| live.active_step.clone())
        };
        let Some(active_step) = active_step else {
            return;
        };
        if node_id != active_step.task_id {
            return;
        }
        let active_task_id = active_step.task_id.clone();

        let has_error = has_error(&headers);
        if let Some(message) = extract_error_message(has_error, &payload) {
            let service_hierarchy =
                extract_service_hierarchy(&headers, &payload).unwrap_or_else(|| "unknown-service".to_string());
            warn!(campaign_id = %canonical, %service_hierarchy, "campaign errored via broker callback");
            let _ = self
                .reducer
                .record_campaign_event(
                    self.store.as_ref(),
                    &canonical,
                    EventType::CampaignErrorFromService,
                    json!({ "error": message, "step_id": active_task_id, "service_hierarchy": service_hierarchy }),
                )
                .await;
            self.remove_campaign(&canonical);
            return;
        }

        if !is_step_complete_message(has_error, &payload) {
            return;
        }

        info!(campaign_id = %canonical, task_id = %active_task_id, "step completed");
        let _ = self
            .reducer
            .record_campaign_event(
                self.store.as_ref(),
                &canonical,
                EventType::StepComplete,
                json!({ "step_id": active_task_id }),
            )
            .await;

        {
            let mut tables = self.tables.lock();
            if let Some(live) = tables.campaigns.get_mut(&canonical) {
                live.current_index += 1;
                live.active_step = None;
            }
        }
        let _ = self.start_next_step(&canonical).await;
    }
}

fn flatten_steps(campaign: &Campaign) -> Vec<Step> {
    campaign
        .task_groups
        .iter()
        .flat_map(|group| {
            group.tasks.iter().map(|task| Step {
                task_group_id: group.id.clone(),
                task_id: task.id.clone(),
            })
        })
        .collect()
}

fn task_metadata(campaign: &Campaign, step: &Step) -> Option<Value> {
    let group = campaign
        .task_groups
        .iter()
        .find(|g| g.id == step.task_group_id)?;
    let task = group.tasks.iter().find(|t| t.id == step.task_id)?;
    Some(json!({
        "topic": format!("{}/response", task.hierarchy.replace('.', "/")),
        "headers": {
            "source": task.hierarchy,
            "sdk_version": "0.0.1",
        },
    }))
}

fn fallback_metadata() -> Value {
    json!({
        "topic": "org/fac/system/subsystem/service/response",
        "headers": {
            "source": "org.fac.system.subsystem.service",
            "sdk_version": "0.0.1",
        },
    })
}

fn candidate_headers(payload: &Value) -> Vec<&Value> {
    ["header", "headers", "parent_header"]
        .iter()
        .filter_map(|key| payload.get(*key))
        .filter(|v| v.is_object())
        .collect()
}

fn extract_campaign_id(headers: &HashMap<String, String>, payload: &Value) -> Option<String> {
    for key in ["campaignId", "campaign_id", "id"] {
        if let Some(value) = headers.get(key) {
            return Some(value.clone());
        }
    }
    for header in candidate_headers(payload) {
        if let Some(value) = header.get("campaignId").and_then(|v| v.as_str()) {
            return Some(value.to_string());
        }
    }
    payload
        .get("campaignId")
        .and_then(|v| v.as_str())
        .map(|s| s.to_string())
}

fn normalize_node_id(value: Option<&Value>) -> Option<String> {
    let value = value?;
    let scalar = if let Some(arr) = value.as_array() {
        arr.first()?
    } else {
        value
    };
    scalar.as_str().map(|s| s.to_string())
}

fn extract_node_id(headers: &HashMap<String, String>, payload: &Value) -> Option<String> {
    for key in ["nodeId", "node_id"] {
        if let Some(value) = headers.get(key) {
            return Some(value.clone());
        }
    }
    for header in candidate_headers(payload) {
        if let Some(id) = normalize_node_id(header.get("nodeId")) {
            return Some(id);
        }
    }
    normalize_node_id(payload.get("nodeId"))
}

fn has_error(headers: &HashMap<String, String>) -> Option<bool> {
    let value = headers.get("has_error")?;
    match value.trim().to_lowercase().as_str() {
        "true" | "1" | "yes" => Some(true),
        "false" | "0" | "no" => Some(false),
        _ => None,
    }
}

fn is_step_complete_message(has_error: Option<bool>, payload: &Value) -> bool {
    if let Some(has_error) = has_error {
        return !has_error;
    }
    for header in candidate_headers(payload) {
        if let Some(header_error) = header.get("has_error").and_then(|v| v.as_bool()) {
            return !header_error;
        }
    }
    false
}

fn extract_error_message(has_error: Option<bool>, payload: &Value) -> Option<String> {
    if has_error != Some(true) {
        return None;
    }
    let error_payload = payload
        .get("payload")
        .or_else(|| payload.get("content"))
        .unwrap_or(payload);
    Some(error_payload.to_string())
}

fn extract_service_hierarchy(headers: &HashMap<String, String>, payload: &Value) -> Option<String> {
    if let Some(source) = headers.get("source") {
        return Some(source.clone());
    }
    for header in candidate_headers(payload) {
        if let Some(source) = header.get("source").and_then(|v| v.as_str()) {
            return Some(source.to_string());
        }
    }
    None
}

#[cfg(test)]
#[path = "orchestrator_tests.rs"]
mod tests;
