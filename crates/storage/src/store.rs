// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The Event Store contract every backend implements identically
//! (`spec.md` §4.1).

use crate::error::StoreError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use co_core::{Campaign, CampaignEvent, CampaignState};
use serde::{Deserialize, Serialize};

/// The latest reduced view of a campaign, versioned by `seq`
/// (`spec.md` §3). `version` equals the `seq` of the last event applied.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CampaignSnapshot {
    pub campaign_id: String,
    pub version: u64,
    pub state: CampaignState,
    pub updated_at: DateTime<Utc>,
}

/// Append-only log of per-campaign events plus the latest state snapshot,
/// with optimistic-lock discipline (`spec.md` §4.1). Every backend —
/// in-memory, document, relational — implements this surface identically
/// and passes the same test suite.
///
/// `append_event` and `update_snapshot` are independent compare-and-set
/// operations; a logical state change is the pair *(append at v, update to
/// v+1)*. Backends do not bump the snapshot version as a side effect of
/// `append_event` — that is the caller's job, via a subsequent
/// `update_snapshot`.
#[async_trait]
pub trait CampaignStore: Send + Sync {
    /// Atomically insert the campaign document, a v0 snapshot, and an empty
    /// event log. Fails with `AlreadyExists` if the id is taken.
    async fn create_campaign(
        &self,
        id: &str,
        campaign: Campaign,
        initial_state: CampaignState,
    ) -> Result<(), StoreError>;

    /// Returns the immutable campaign, or `None` if absent.
    async fn get_campaign(&self, id: &str) -> Result<Option<Campaign>, StoreError>;

    /// Returns a deep copy of the latest snapshot; callers MUST NOT mutate
    /// backend-owned state through it.
    async fn load_snapshot(&self, id: &str) -> Result<Option<CampaignSnapshot>, StoreError>;

    /// Atomically appends `event` iff the current snapshot version equals
    /// `expected_version` AND `event.seq == expected_version + 1`.
    async fn append_event(
        &self,
        event: CampaignEvent,
        expected_version: u64,
    ) -> Result<(), StoreError>;

    /// Compare-and-set: writes `snapshot` iff the stored version equals
    /// `expected_version`.
    async fn update_snapshot(
        &self,
        snapshot: CampaignSnapshot,
        expected_version: u64,
    ) -> Result<(), StoreError>;

    /// Ordered-by-`seq` events with `seq > after_seq`.
    async fn load_events(
        &self,
        id: &str,
        after_seq: u64,
    ) -> Result<Vec<CampaignEvent>, StoreError>;

    async fn campaign_exists(&self, id: &str) -> Result<bool, StoreError>;
}
