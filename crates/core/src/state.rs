// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Execution state: the read-model layered over a [`crate::campaign::Campaign`]
//! (`spec.md` §3).

use crate::campaign::{Campaign, Objective, TaskGroup};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Lifecycle status shared by campaigns, task groups, and tasks
/// (`spec.md` §3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionStatus {
    Queued,
    Running,
    Complete,
    Error,
}

/// Running tally for an `ObjectiveAssert` objective.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ObjectiveAssertState {
    pub met: bool,
}

/// Running tally for an `ObjectiveIterate` objective.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ObjectiveIterateState {
    pub completed_iterations: u32,
    pub target_iterations: u32,
}

/// Per-objective execution state, keyed by objective id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ObjectiveState {
    Assert(ObjectiveAssertState),
    Iterate(ObjectiveIterateState),
    /// `MaxRuntime`, `ThresholdUpperLimit`, `ThresholdRange` objectives are
    /// evaluated against task output values rather than tracked tallies;
    /// their state is simply whether they've fired.
    Threshold { met: bool },
}

impl ObjectiveState {
    pub fn initial_for(objective: &Objective) -> Self {
        match objective {
            Objective::ObjectiveAssert { .. } => {
                ObjectiveState::Assert(ObjectiveAssertState { met: false })
            }
            Objective::ObjectiveIterate { iterations, .. } => {
                ObjectiveState::Iterate(ObjectiveIterateState {
                    completed_iterations: 0,
                    target_iterations: *iterations,
                })
            }
            Objective::MaxRuntime { .. }
            | Objective::ThresholdUpperLimit { .. }
            | Objective::ThresholdRange { .. } => ObjectiveState::Threshold { met: false },
        }
    }

    pub fn is_met(&self) -> bool {
        match self {
            ObjectiveState::Assert(s) => s.met,
            ObjectiveState::Iterate(s) => s.completed_iterations >= s.target_iterations,
            ObjectiveState::Threshold { met } => *met,
        }
    }
}

/// Execution state for a single task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskState {
    pub status: ExecutionStatus,
    #[serde(default)]
    pub error_message: Option<String>,
}

impl TaskState {
    fn queued() -> Self {
        Self {
            status: ExecutionStatus::Queued,
            error_message: None,
        }
    }
}

/// Execution state for a task group, including its objectives.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskGroupState {
    pub status: ExecutionStatus,
    pub tasks: HashMap<String, TaskState>,
    pub objectives: HashMap<String, ObjectiveState>,
    #[serde(default)]
    pub error_message: Option<String>,
}

impl TaskGroupState {
    fn queued_from(group: &TaskGroup) -> Self {
        let tasks = group
            .tasks
            .iter()
            .map(|t| (t.id.clone(), TaskState::queued()))
            .collect();
        let objectives = group
            .objectives
            .iter()
            .map(|o| {
                let id = match o {
                    Objective::MaxRuntime { id, .. } => id,
                    Objective::ThresholdUpperLimit { id, .. } => id,
                    Objective::ThresholdRange { id, .. } => id,
                    Objective::ObjectiveIterate { id, .. } => id,
                    Objective::ObjectiveAssert { id, .. } => id,
                };
                (id.clone(), ObjectiveState::initial_for(o))
            })
            .collect();
        Self {
            status: ExecutionStatus::Queued,
            tasks,
            objectives,
            error_message: None,
        }
    }
}

/// The full execution state of a campaign: the read-model the Event Store
/// reduces into and that `GET /campaigns/{id}/state` serves (`spec.md` §6).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CampaignState {
    pub campaign_id: String,
    pub status: ExecutionStatus,
    pub task_groups: HashMap<String, TaskGroupState>,
    /// The currently dispatched step's task id, set by `STEP_START` and
    /// cleared by `STEP_COMPLETE` (`spec.md` §4.3, §4.4).
    #[serde(default)]
    pub active_step: Option<String>,
    #[serde(default)]
    pub error_message: Option<String>,
}

impl CampaignState {
    /// Build the all-queued initial state for a freshly submitted campaign.
    pub fn from_campaign(campaign: &Campaign) -> Self {
        let task_groups = campaign
            .task_groups
            .iter()
            .map(|g| (g.id.clone(), TaskGroupState::queued_from(g)))
            .collect();
        Self {
            campaign_id: campaign.id.clone(),
            status: ExecutionStatus::Queued,
            task_groups,
            active_step: None,
            error_message: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::campaign::{CapabilitySelector, Task, TaskGroup};

    fn sample_campaign() -> Campaign {
        Campaign {
            id: "c1".to_string(),
            name: String::new(),
            user: String::new(),
            description: String::new(),
            task_groups: vec![TaskGroup {
                id: "tg-1".to_string(),
                group_dependencies: vec![],
                tasks: vec![Task {
                    id: "t1".to_string(),
                    hierarchy: "org.fac.sys.sub.svc".to_string(),
                    capability: "do".to_string(),
                    selector: CapabilitySelector::OperationId("op".to_string()),
                    input: None,
                    output: None,
                    task_dependencies: vec![],
                }],
                objectives: vec![Objective::ObjectiveAssert {
                    id: "o1".to_string(),
                    var: "x".to_string(),
                    target: true,
                }],
            }],
        }
    }

    #[test]
    fn from_campaign_starts_everything_queued() {
        let state = CampaignState::from_campaign(&sample_campaign());
        assert_eq!(state.status, ExecutionStatus::Queued);
        let tg = &state.task_groups["tg-1"];
        assert_eq!(tg.status, ExecutionStatus::Queued);
        assert_eq!(tg.tasks["t1"].status, ExecutionStatus::Queued);
        assert!(!tg.objectives["o1"].is_met());
    }

    #[test]
    fn iterate_objective_state_is_met_once_target_reached() {
        let mut state = ObjectiveState::Iterate(ObjectiveIterateState {
            completed_iterations: 2,
            target_iterations: 3,
        });
        assert!(!state.is_met());
        if let ObjectiveState::Iterate(s) = &mut state {
            s.completed_iterations = 3;
        }
        assert!(state.is_met());
    }
}
