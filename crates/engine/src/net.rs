// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The Workflow Net: a hand-rolled Petri net compiled from one campaign
//! (`spec.md` §3, §4.2). A straightforward in-house implementation of this
//! net is small and avoids an external Petri-net dependency (`spec.md` §9).

use crate::error::EngineError;
use co_core::Campaign;
use std::collections::{HashMap, HashSet};

/// A transition's input and output place multisets. A place appearing in
/// both `inputs` and `outputs` is a read arc (§3): `fire` consumes one
/// token and immediately produces one back, so the place's count is
/// unchanged but the transition still requires a token to be present.
#[derive(Debug, Clone, Default)]
struct TransitionArcs {
    inputs: Vec<String>,
    outputs: Vec<String>,
}

/// A function from places to non-negative token counts.
pub type Marking = HashMap<String, u64>;

/// The compiled Petri net for one campaign: place set, transition set, and
/// the current marking.
#[derive(Debug, Clone)]
pub struct WorkflowNet {
    name: String,
    places: HashSet<String>,
    transitions: HashMap<String, TransitionArcs>,
    marking: Marking,
}

impl WorkflowNet {
    /// Compile `campaign` into its net (`spec.md` §4.2). Rejects cyclic
    /// group dependencies with `CycleDetected`. Missing dependency targets
    /// are not errors; they just make the dependent group unreachable.
    pub fn compile(campaign: &Campaign) -> Result<Self, EngineError> {
        detect_cycle(campaign)?;

        let mut places = HashSet::new();
        let mut transitions = HashMap::new();

        places.insert("Ready".to_string());
        places.insert("Complete".to_string());

        for group in &campaign.task_groups {
            let pending = place_tg_pending(&group.id);
            let running = place_tg_running(&group.id);
            let complete = place_tg_complete(&group.id);
            places.insert(pending.clone());
            places.insert(running);
            places.insert(complete.clone());

            let activate_inputs: Vec<String> = if group.group_dependencies.is_empty() {
                vec!["Ready".to_string()]
            } else {
                group
                    .group_dependencies
                    .iter()
                    .map(|d| place_tg_complete(d))
                    .collect()
            };
            let mut activate_outputs = activate_inputs.clone();
            if group.group_dependencies.is_empty() {
                activate_outputs = vec![pending.clone()];
            } else {
                activate_outputs.push(pending.clone());
            }
            transitions.insert(
                format!("activate_{}", group.id),
                TransitionArcs {
                    inputs: activate_inputs,
                    outputs: activate_outputs,
                },
            );

            let mut complete_inputs = vec![pending.clone()];
            for task in &group.tasks {
                let task_complete = place_task_complete(&group.id, &task.id);
                places.insert(task_complete.clone());

                let mut task_inputs = vec![pending.clone()];
                let mut task_outputs = vec![pending.clone()];
                for dep in &task.task_dependencies {
                    let dep_complete = place_task_complete(&group.id, dep);
                    task_inputs.push(dep_complete.clone());
                    task_outputs.push(dep_complete);
                }
                task_outputs.push(task_complete.clone());

                transitions.insert(
                    format!("task_{}_{}", group.id, task.id),
                    TransitionArcs {
                        inputs: task_inputs,
                        outputs: task_outputs,
                    },
                );

                complete_inputs.push(task_complete);
            }

            transitions.insert(
                format!("complete_{}", group.id),
                TransitionArcs {
                    inputs: complete_inputs,
                    outputs: vec![complete.clone()],
                },
            );
        }

        let finalize_inputs: Vec<String> = campaign
            .task_groups
            .iter()
            .map(|g| place_tg_complete(&g.id))
            .collect();
        transitions.insert(
            "finalize_campaign".to_string(),
            TransitionArcs {
                inputs: finalize_inputs,
                outputs: vec!["Complete".to_string()],
            },
        );

        let mut marking: Marking = places.iter().map(|p| (p.clone(), 0)).collect();
        // `spec.md` §3 states a single token in `Ready`, sized for the
        // common single-root-group campaign. Generalized here to one token
        // per root (no-dependency) group so independent groups activate in
        // parallel rather than contending over one shared token — see
        // DESIGN.md for the rationale tying this to the §8 "100
        // independent groups" boundary case. Reduces to exactly the
        // literal single-token behavior when there is one root group.
        let root_groups = campaign
            .task_groups
            .iter()
            .filter(|g| g.group_dependencies.is_empty())
            .count() as u64;
        marking.insert(
            "Ready".to_string(),
            if campaign.task_groups.is_empty() { 1 } else { root_groups },
        );

        Ok(Self {
            name: format!("Campaign_{}", campaign.id),
            places,
            transitions,
            marking,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn marking(&self) -> &Marking {
        &self.marking
    }

    /// Transitions enabled at the current marking: every input place holds
    /// at least the number of tokens the transition would consume from it.
    pub fn enabled_transitions(&self) -> Vec<String> {
        self.transitions
            .keys()
            .filter(|name| self.is_enabled(name))
            .cloned()
            .collect()
    }

    pub fn is_enabled(&self, transition_name: &str) -> bool {
        let Some(arcs) = self.transitions.get(transition_name) else {
            return false;
        };
        let mut required: HashMap<&str, u64> = HashMap::new();
        for place in &arcs.inputs {
            *required.entry(place.as_str()).or_insert(0) += 1;
        }
        required
            .iter()
            .all(|(place, count)| self.marking.get(*place).copied().unwrap_or(0) >= *count)
    }

    /// Atomically fire `transition_name`: all arc effects apply or none.
    pub fn fire(&mut self, transition_name: &str) -> Result<(), EngineError> {
        let arcs = self
            .transitions
            .get(transition_name)
            .ok_or_else(|| EngineError::NoSuchTransition(transition_name.to_string()))?
            .clone();

        if !self.is_enabled(transition_name) {
            return Err(EngineError::NotEnabled(transition_name.to_string()));
        }

        for place in &arcs.inputs {
            if let Some(count) = self.marking.get_mut(place) {
                *count -= 1;
            }
        }
        for place in &arcs.outputs {
            *self.marking.entry(place.clone()).or_insert(0) += 1;
        }
        Ok(())
    }

    pub fn places(&self) -> &HashSet<String> {
        &self.places
    }

    pub fn transition_names(&self) -> Vec<String> {
        self.transitions.keys().cloned().collect()
    }
}

fn place_tg_pending(group_id: &str) -> String {
    format!("tg_{group_id}_pending")
}

fn place_tg_running(group_id: &str) -> String {
    format!("tg_{group_id}_running")
}

fn place_tg_complete(group_id: &str) -> String {
    format!("tg_{group_id}_complete")
}

fn place_task_complete(group_id: &str, task_id: &str) -> String {
    format!("task_{group_id}_{task_id}_complete")
}

/// DFS-with-recursion-stack cycle detection over group dependencies
/// (`spec.md` §4.2(a)).
fn detect_cycle(campaign: &Campaign) -> Result<(), EngineError> {
    let mut deps: HashMap<&str, &[String]> = HashMap::new();
    for group in &campaign.task_groups {
        deps.insert(&group.id, &group.group_dependencies);
    }

    #[derive(Clone, Copy, PartialEq)]
    enum Mark {
        Visiting,
        Done,
    }
    let mut marks: HashMap<&str, Mark> = HashMap::new();

    fn visit<'a>(
        node: &'a str,
        deps: &HashMap<&'a str, &'a [String]>,
        marks: &mut HashMap<&'a str, Mark>,
    ) -> Result<(), EngineError> {
        match marks.get(node) {
            Some(Mark::Done) => return Ok(()),
            Some(Mark::Visiting) => return Err(EngineError::CycleDetected),
            None => {}
        }
        marks.insert(node, Mark::Visiting);
        if let Some(children) = deps.get(node) {
            for child in children.iter() {
                if deps.contains_key(child.as_str()) {
                    visit(child, deps, marks)?;
                }
            }
        }
        marks.insert(node, Mark::Done);
        Ok(())
    }

    for group in &campaign.task_groups {
        visit(&group.id, &deps, &mut marks)?;
    }
    Ok(())
}

#[cfg(test)]
#[path = "net_tests.rs"]
mod tests;
