// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! In-memory Event Store backend: a single mutex guarding three maps.
//! Suitable for tests and ephemeral deployments (`spec.md` §4.1).

use crate::error::StoreError;
use crate::store::{CampaignSnapshot, CampaignStore};
use async_trait::async_trait;
use co_core::{Campaign, CampaignEvent};
use parking_lot::Mutex;
use std::collections::HashMap;

#[derive(Default)]
struct Inner {
    campaigns: HashMap<String, Campaign>,
    snapshots: HashMap<String, CampaignSnapshot>,
    events: HashMap<String, Vec<CampaignEvent>>,
}

/// An in-process `CampaignStore` for tests and single-node deployments that
/// don't need durability across restarts.
#[derive(Default)]
pub struct InMemoryCampaignStore {
    inner: Mutex<Inner>,
}

impl InMemoryCampaignStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CampaignStore for InMemoryCampaignStore {
    async fn create_campaign(
        &self,
        id: &str,
        campaign: Campaign,
        initial_state: co_core::CampaignState,
    ) -> Result<(), StoreError> {
        let mut inner = self.inner.lock();
        if inner.campaigns.contains_key(id) {
            return Err(StoreError::AlreadyExists(id.to_string()));
        }
        inner.campaigns.insert(id.to_string(), campaign);
        inner.snapshots.insert(
            id.to_string(),
            CampaignSnapshot {
                campaign_id: id.to_string(),
                version: 0,
                state: initial_state,
                updated_at: chrono::Utc::now(),
            },
        );
        inner.events.insert(id.to_string(), Vec::new());
        Ok(())
    }

    async fn get_campaign(&self, id: &str) -> Result<Option<Campaign>, StoreError> {
        Ok(self.inner.lock().campaigns.get(id).cloned())
    }

    async fn load_snapshot(&self, id: &str) -> Result<Option<CampaignSnapshot>, StoreError> {
        Ok(self.inner.lock().snapshots.get(id).cloned())
    }

    async fn append_event(
        &self,
        event: CampaignEvent,
        expected_version: u64,
    ) -> Result<(), StoreError> {
        let mut inner = self.inner.lock();
        let current_version = inner
            .snapshots
            .get(&event.campaign_id)
            .map(|s| s.version)
            .ok_or_else(|| StoreError::NotFound(event.campaign_id.clone()))?;
        if current_version != expected_version {
            return Err(StoreError::VersionConflict {
                expected: expected_version,
                actual: current_version,
            });
        }
        if event.seq != expected_version + 1 {
            return Err(StoreError::SequenceConflict {
                expected: expected_version + 1,
                actual: event.seq,
            });
        }
        inner
            .events
            .entry(event.campaign_id.clone())
            .or_default()
            .push(event);
        Ok(())
    }

    async fn update_snapshot(
        &self,
        snapshot: CampaignSnapshot,
        expected_version: u64,
    ) -> Result<(), StoreError> {
        let mut inner = self.inner.lock();
        let current_version = inner
            .snapshots
            .get(&snapshot.campaign_id)
            .map(|s| s.version)
            .ok_or_else(|| StoreError::NotFound(snapshot.campaign_id.clone()))?;
        if current_version != expected_version {
            return Err(StoreError::VersionConflict {
                expected: expected_version,
                actual: current_version,
            });
        }
        inner
            .snapshots
            .insert(snapshot.campaign_id.clone(), snapshot);
        Ok(())
    }

    async fn load_events(
        &self,
        id: &str,
        after_seq: u64,
    ) -> Result<Vec<CampaignEvent>, StoreError> {
        let inner = self.inner.lock();
        let events = inner
            .events
            .get(id)
            .map(|events| {
                events
                    .iter()
                    .filter(|e| e.seq > after_seq)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();
        Ok(events)
    }

    async fn campaign_exists(&self, id: &str) -> Result<bool, StoreError> {
        Ok(self.inner.lock().campaigns.contains_key(id))
    }
}

#[cfg(test)]
#[path = "memory_tests.rs"]
mod tests;
