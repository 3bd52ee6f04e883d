// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared error taxonomy for building domain types from untrusted input.

use thiserror::Error;

/// Errors raised while constructing or validating a [`crate::campaign::Campaign`]
/// and its nested types. Schema errors at the HTTP boundary are an external
/// collaborator's concern (`spec.md` §1); this covers only the invariants
/// the domain types themselves enforce.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CoreError {
    #[error("task {task_id} needs to define exactly one of operation_id or event_name")]
    TaskNeedsExactlyOneCapabilitySelector { task_id: String },
    #[error("task group {task_group_id} has duplicate task id {task_id}")]
    DuplicateTaskId {
        task_group_id: String,
        task_id: String,
    },
    #[error("campaign has duplicate task group id {task_group_id}")]
    DuplicateTaskGroupId { task_group_id: String },
    #[error("threshold_upper_limit target {target} out of range (0, 20]")]
    ThresholdUpperLimitOutOfRange { target: i64 },
    #[error("threshold_range target {target} out of range (1.62, 3.14)")]
    ThresholdRangeOutOfRange { target: f64 },
}
