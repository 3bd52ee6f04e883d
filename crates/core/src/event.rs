// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The closed event vocabulary recorded in the Event Store and pushed to
//! Fanout subscribers (`spec.md` §3, §6).

use serde::{Deserialize, Serialize};

/// Every event type the engine can emit, drawn from the closed set named in
/// `spec.md` §6 (external wire names) plus the reducer's internal action
/// table (`spec.md` §4.3). One tag, no inheritance (`spec.md` §9).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventType {
    CampaignStarted,
    TaskGroupStarted,
    TaskNotRunning,
    TaskRunning,
    TaskCompleted,
    TaskFailed,
    TaskGroupCompleted,
    TaskGroupObjectiveMet,
    CampaignObjectiveMet,
    CampaignCompleted,
    CampaignCancelled,
    CampaignError,
    TaskEventReceived,
    StepStart,
    StepComplete,
    CampaignComplete,
    ReadyForInput,
    CampaignErrorFromService,
    CampaignErrorSchema,
    UnknownError,
}

impl EventType {
    /// The screaming-snake-case wire name, matching what subscribers see in
    /// the `event_type` field of the stream payload (`spec.md` §6).
    pub fn as_wire_name(&self) -> &'static str {
        match self {
            EventType::CampaignStarted => "CAMPAIGN_STARTED",
            EventType::TaskGroupStarted => "TASK_GROUP_STARTED",
            EventType::TaskNotRunning => "TASK_NOT_RUNNING",
            EventType::TaskRunning => "TASK_RUNNING",
            EventType::TaskCompleted => "TASK_COMPLETED",
            EventType::TaskFailed => "TASK_FAILED",
            EventType::TaskGroupCompleted => "TASK_GROUP_COMPLETED",
            EventType::TaskGroupObjectiveMet => "TASK_GROUP_OBJECTIVE_MET",
            EventType::CampaignObjectiveMet => "CAMPAIGN_OBJECTIVE_MET",
            EventType::CampaignCompleted => "CAMPAIGN_COMPLETED",
            EventType::CampaignCancelled => "CAMPAIGN_CANCELLED",
            EventType::CampaignError => "CAMPAIGN_ERROR",
            EventType::TaskEventReceived => "TASK_EVENT_RECEIVED",
            EventType::StepStart => "STEP_START",
            EventType::StepComplete => "STEP_COMPLETE",
            EventType::CampaignComplete => "CAMPAIGN_COMPLETE",
            EventType::ReadyForInput => "READY_FOR_INPUT",
            EventType::CampaignErrorFromService => "CAMPAIGN_ERROR_FROM_SERVICE",
            EventType::CampaignErrorSchema => "CAMPAIGN_ERROR_SCHEMA",
            EventType::UnknownError => "UNKNOWN_ERROR",
        }
    }

    /// Whether this event type bumps the campaign's snapshot version.
    /// `TASK_EVENT_RECEIVED` is the one perpetual tick that does not
    /// (`spec.md` §4.3, §9 open question — fixed per that resolution).
    pub fn bumps_snapshot_version(&self) -> bool {
        !matches!(self, EventType::TaskEventReceived)
    }
}

/// A single entry in a campaign's durable event log (`spec.md` §3).
/// `seq` is a strictly increasing per-campaign integer starting at 1.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CampaignEvent {
    pub event_id: String,
    pub campaign_id: String,
    pub seq: u64,
    pub event_type: EventType,
    pub payload: serde_json::Value,
    /// RFC 3339 UTC timestamp (see [`crate::clock::Clock::rfc3339`]).
    pub timestamp: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wire_names_match_screaming_snake_case_serde() {
        let event_type = EventType::TaskGroupObjectiveMet;
        let json = serde_json::to_string(&event_type).unwrap_or_default();
        assert_eq!(json, "\"TASK_GROUP_OBJECTIVE_MET\"");
        assert_eq!(event_type.as_wire_name(), "TASK_GROUP_OBJECTIVE_MET");
    }

    #[test]
    fn only_task_event_received_skips_the_version_bump() {
        assert!(!EventType::TaskEventReceived.bumps_snapshot_version());
        assert!(EventType::StepStart.bumps_snapshot_version());
        assert!(EventType::CampaignCompleted.bumps_snapshot_version());
    }
}
