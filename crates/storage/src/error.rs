// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Error taxonomy for the Event Store (`spec.md` §4.1, §7).

use thiserror::Error;

/// Errors every [`crate::CampaignStore`] backend can return. Version and
/// sequence conflicts are deterministic and non-retryable without reloading
/// the snapshot; everything else is a `TransientError` the caller MAY retry
/// (`spec.md` §7).
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("campaign {0} already exists")]
    AlreadyExists(String),
    #[error("campaign {0} not found")]
    NotFound(String),
    #[error("snapshot version conflict: expected {expected}, found {actual}")]
    VersionConflict { expected: u64, actual: u64 },
    #[error("event sequence conflict: expected seq {expected}, got {actual}")]
    SequenceConflict { expected: u64, actual: u64 },
    #[error("transient storage error: {0}")]
    TransientError(String),
}
