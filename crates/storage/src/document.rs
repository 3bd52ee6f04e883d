// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Document-store Event Store backend (MongoDB). One collection per kind;
//! unique indices on `campaign_id` (snapshots) and `(campaign_id, seq)`
//! (events); `update_snapshot` uses a filtered update with the expected
//! version in the filter (`spec.md` §4.1).

use crate::error::StoreError;
use crate::store::{CampaignSnapshot, CampaignStore};
use async_trait::async_trait;
use co_core::{Campaign, CampaignEvent, CampaignState};
use mongodb::bson::doc;
use mongodb::options::{IndexOptions, InsertOneOptions};
use mongodb::{Client, Collection, IndexModel};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
struct CampaignDoc {
    campaign_id: String,
    campaign: Campaign,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct SnapshotDoc {
    campaign_id: String,
    version: u64,
    state: CampaignState,
    updated_at: chrono::DateTime<chrono::Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct EventDoc {
    campaign_id: String,
    #[serde(flatten)]
    event: CampaignEvent,
}

/// `CampaignStore` backed by a MongoDB database, grounded in the source
/// repository's `MongoCampaignRepository`.
pub struct DocumentCampaignStore {
    client: Client,
    campaigns: Collection<CampaignDoc>,
    snapshots: Collection<SnapshotDoc>,
    events: Collection<EventDoc>,
}

impl DocumentCampaignStore {
    /// Connect to `uri` and ensure the unique indices the CAS discipline
    /// depends on exist.
    pub async fn connect(uri: &str, database: &str) -> Result<Self, StoreError> {
        let client = Client::with_uri_str(uri)
            .await
            .map_err(|e| StoreError::TransientError(e.to_string()))?;
        let db = client.database(database);
        let store = Self {
            client,
            campaigns: db.collection("campaigns"),
            snapshots: db.collection("snapshots"),
            events: db.collection("events"),
        };
        store.ensure_indices().await?;
        Ok(store)
    }

    async fn ensure_indices(&self) -> Result<(), StoreError> {
        let unique = IndexOptions::builder().unique(true).build();

        let campaign_index = IndexModel::builder()
            .keys(doc! { "campaign_id": 1 })
            .options(unique.clone())
            .build();
        self.campaigns
            .create_index(campaign_index)
            .await
            .map_err(|e| StoreError::TransientError(e.to_string()))?;

        let snapshot_index = IndexModel::builder()
            .keys(doc! { "campaign_id": 1 })
            .options(unique.clone())
            .build();
        self.snapshots
            .create_index(snapshot_index)
            .await
            .map_err(|e| StoreError::TransientError(e.to_string()))?;

        let event_index = IndexModel::builder()
            .keys(doc! { "campaign_id": 1, "seq": 1 })
            .options(unique)
            .build();
        self.events
            .create_index(event_index)
            .await
            .map_err(|e| StoreError::TransientError(e.to_string()))?;

        Ok(())
    }
}

#[async_trait]
impl CampaignStore for DocumentCampaignStore {
    async fn create_campaign(
        &self,
        id: &str,
        campaign: Campaign,
        initial_state: CampaignState,
    ) -> Result<(), StoreError> {
        if self.campaign_exists(id).await? {
            return Err(StoreError::AlreadyExists(id.to_string()));
        }

        // Atomically insert the campaign document and its v0 snapshot —
        // a crash between the two must never leave a campaign without a
        // snapshot to load.
        let mut session = self
            .client
            .start_session()
            .await
            .map_err(|e| StoreError::TransientError(e.to_string()))?;
        session
            .start_transaction()
            .await
            .map_err(|e| StoreError::TransientError(e.to_string()))?;

        let insert_campaign = self
            .campaigns
            .insert_one(CampaignDoc {
                campaign_id: id.to_string(),
                campaign,
            })
            .with_options(InsertOneOptions::default())
            .session(&mut session)
            .await;
        if let Err(e) = insert_campaign {
            let _ = session.abort_transaction().await;
            return Err(dup_key_or_transient(e, id));
        }

        let insert_snapshot = self
            .snapshots
            .insert_one(SnapshotDoc {
                campaign_id: id.to_string(),
                version: 0,
                state: initial_state,
                updated_at: chrono::Utc::now(),
            })
            .session(&mut session)
            .await;
        if let Err(e) = insert_snapshot {
            let _ = session.abort_transaction().await;
            return Err(StoreError::TransientError(e.to_string()));
        }

        session
            .commit_transaction()
            .await
            .map_err(|e| StoreError::TransientError(e.to_string()))?;
        Ok(())
    }

    async fn get_campaign(&self, id: &str) -> Result<Option<Campaign>, StoreError> {
        let doc = self
            .campaigns
            .find_one(doc! { "campaign_id": id })
            .await
            .map_err(|e| StoreError::TransientError(e.to_string()))?;
        Ok(doc.map(|d| d.campaign))
    }

    async fn load_snapshot(&self, id: &str) -> Result<Option<CampaignSnapshot>, StoreError> {
        let doc = self
            .snapshots
            .find_one(doc! { "campaign_id": id })
            .await
            .map_err(|e| StoreError::TransientError(e.to_string()))?;
        Ok(doc.map(|d| CampaignSnapshot {
            campaign_id: d.campaign_id,
            version: d.version,
            state: d.state,
            updated_at: d.updated_at,
        }))
    }

    async fn append_event(
        &self,
        event: CampaignEvent,
        expected_version: u64,
    ) -> Result<(), StoreError> {
        let snapshot = self
            .load_snapshot(&event.campaign_id)
            .await?
            .ok_or_else(|| StoreError::NotFound(event.campaign_id.clone()))?;
        if snapshot.version != expected_version {
            return Err(StoreError::VersionConflict {
                expected: expected_version,
                actual: snapshot.version,
            });
        }
        if event.seq != expected_version + 1 {
            return Err(StoreError::SequenceConflict {
                expected: expected_version + 1,
                actual: event.seq,
            });
        }
        let campaign_id = event.campaign_id.clone();
        self.events
            .insert_one(EventDoc {
                campaign_id: campaign_id.clone(),
                event,
            })
            .await
            .map_err(|e| dup_key_or_transient(e, &campaign_id))?;
        Ok(())
    }

    async fn update_snapshot(
        &self,
        snapshot: CampaignSnapshot,
        expected_version: u64,
    ) -> Result<(), StoreError> {
        let result = self
            .snapshots
            .update_one(
                doc! { "campaign_id": &snapshot.campaign_id, "version": expected_version as i64 },
                doc! { "$set": {
                    "version": snapshot.version as i64,
                    "state": mongodb::bson::to_bson(&snapshot.state)
                        .map_err(|e| StoreError::TransientError(e.to_string()))?,
                    "updated_at": snapshot.updated_at,
                }},
            )
            .await
            .map_err(|e| StoreError::TransientError(e.to_string()))?;
        if result.matched_count == 0 {
            let current = self.load_snapshot(&snapshot.campaign_id).await?;
            return Err(StoreError::VersionConflict {
                expected: expected_version,
                actual: current.map(|s| s.version).unwrap_or(0),
            });
        }
        Ok(())
    }

    async fn load_events(
        &self,
        id: &str,
        after_seq: u64,
    ) -> Result<Vec<CampaignEvent>, StoreError> {
        use futures::TryStreamExt;

        let mut cursor = self
            .events
            .find(doc! { "campaign_id": id, "seq": { "$gt": after_seq as i64 } })
            .sort(doc! { "seq": 1 })
            .await
            .map_err(|e| StoreError::TransientError(e.to_string()))?;
        let mut out = Vec::new();
        while let Some(doc) = cursor
            .try_next()
            .await
            .map_err(|e| StoreError::TransientError(e.to_string()))?
        {
            out.push(doc.event);
        }
        Ok(out)
    }

    async fn campaign_exists(&self, id: &str) -> Result<bool, StoreError> {
        let count = self
            .campaigns
            .count_documents(doc! { "campaign_id": id })
            .await
            .map_err(|e| StoreError::TransientError(e.to_string()))?;
        Ok(count > 0)
    }
}

fn dup_key_or_transient(error: mongodb::error::Error, campaign_id: &str) -> StoreError {
    if error.to_string().contains("E11000") {
        StoreError::AlreadyExists(campaign_id.to_string())
    } else {
        StoreError::TransientError(error.to_string())
    }
}
