// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Relational Event Store backend (PostgreSQL). Three tables with the same
//! uniqueness constraints as the document backend; `append_event` uses
//! row-locking (`SELECT ... FOR UPDATE` on the snapshot row) inside a
//! transaction (`spec.md` §4.1).

use crate::error::StoreError;
use crate::store::{CampaignSnapshot, CampaignStore};
use async_trait::async_trait;
use co_core::{Campaign, CampaignEvent, CampaignState, EventType};
use sqlx::{PgPool, Row};

/// `CampaignStore` backed by a PostgreSQL connection pool.
pub struct RelationalCampaignStore {
    pool: PgPool,
}

impl RelationalCampaignStore {
    /// Connect to `database_url` and create the backing tables if absent.
    pub async fn connect(database_url: &str) -> Result<Self, StoreError> {
        let pool = PgPool::connect(database_url)
            .await
            .map_err(|e| StoreError::TransientError(e.to_string()))?;
        let store = Self { pool };
        store.migrate().await?;
        Ok(store)
    }

    async fn migrate(&self) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS campaigns (
                campaign_id TEXT PRIMARY KEY,
                campaign_json JSONB NOT NULL
            );
            CREATE TABLE IF NOT EXISTS snapshots (
                campaign_id TEXT PRIMARY KEY REFERENCES campaigns(campaign_id),
                version BIGINT NOT NULL,
                state_json JSONB NOT NULL,
                updated_at TIMESTAMPTZ NOT NULL
            );
            CREATE TABLE IF NOT EXISTS campaign_events (
                campaign_id TEXT NOT NULL REFERENCES campaigns(campaign_id),
                seq BIGINT NOT NULL,
                event_id TEXT NOT NULL,
                event_type TEXT NOT NULL,
                payload_json JSONB NOT NULL,
                timestamp TEXT NOT NULL,
                UNIQUE (campaign_id, seq)
            );
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::TransientError(e.to_string()))?;
        Ok(())
    }
}

#[async_trait]
impl CampaignStore for RelationalCampaignStore {
    async fn create_campaign(
        &self,
        id: &str,
        campaign: Campaign,
        initial_state: CampaignState,
    ) -> Result<(), StoreError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| StoreError::TransientError(e.to_string()))?;

        let campaign_json =
            serde_json::to_value(&campaign).map_err(|e| StoreError::TransientError(e.to_string()))?;
        let insert = sqlx::query("INSERT INTO campaigns (campaign_id, campaign_json) VALUES ($1, $2) ON CONFLICT DO NOTHING")
            .bind(id)
            .bind(&campaign_json)
            .execute(&mut *tx)
            .await
            .map_err(|e| StoreError::TransientError(e.to_string()))?;
        if insert.rows_affected() == 0 {
            return Err(StoreError::AlreadyExists(id.to_string()));
        }

        let state_json = serde_json::to_value(&initial_state)
            .map_err(|e| StoreError::TransientError(e.to_string()))?;
        sqlx::query(
            "INSERT INTO snapshots (campaign_id, version, state_json, updated_at) VALUES ($1, 0, $2, now())",
        )
        .bind(id)
        .bind(&state_json)
        .execute(&mut *tx)
        .await
        .map_err(|e| StoreError::TransientError(e.to_string()))?;

        tx.commit()
            .await
            .map_err(|e| StoreError::TransientError(e.to_string()))?;
        Ok(())
    }

    async fn get_campaign(&self, id: &str) -> Result<Option<Campaign>, StoreError> {
        let row = sqlx::query("SELECT campaign_json FROM campaigns WHERE campaign_id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| StoreError::TransientError(e.to_string()))?;
        row.map(|row| {
            let value: serde_json::Value = row.try_get("campaign_json")?;
            serde_json::from_value(value).map_err(sqlx::Error::Decode)
        })
        .transpose()
        .map_err(|e| StoreError::TransientError(e.to_string()))
    }

    async fn load_snapshot(&self, id: &str) -> Result<Option<CampaignSnapshot>, StoreError> {
        let row = sqlx::query(
            "SELECT campaign_id, version, state_json, updated_at FROM snapshots WHERE campaign_id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| StoreError::TransientError(e.to_string()))?;
        row.map(row_to_snapshot)
            .transpose()
            .map_err(|e| StoreError::TransientError(e.to_string()))
    }

    async fn append_event(
        &self,
        event: CampaignEvent,
        expected_version: u64,
    ) -> Result<(), StoreError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| StoreError::TransientError(e.to_string()))?;

        let row = sqlx::query("SELECT version FROM snapshots WHERE campaign_id = $1 FOR UPDATE")
            .bind(&event.campaign_id)
            .fetch_optional(&mut *tx)
            .await
            .map_err(|e| StoreError::TransientError(e.to_string()))?;
        let current_version: i64 = match row {
            Some(row) => row
                .try_get("version")
                .map_err(|e| StoreError::TransientError(e.to_string()))?,
            None => return Err(StoreError::NotFound(event.campaign_id.clone())),
        };
        if current_version as u64 != expected_version {
            return Err(StoreError::VersionConflict {
                expected: expected_version,
                actual: current_version as u64,
            });
        }
        if event.seq != expected_version + 1 {
            return Err(StoreError::SequenceConflict {
                expected: expected_version + 1,
                actual: event.seq,
            });
        }

        let payload_json = serde_json::to_value(&event.payload)
            .map_err(|e| StoreError::TransientError(e.to_string()))?;
        let insert = sqlx::query(
            "INSERT INTO campaign_events (campaign_id, seq, event_id, event_type, payload_json, timestamp) \
             VALUES ($1, $2, $3, $4, $5, $6) ON CONFLICT (campaign_id, seq) DO NOTHING",
        )
        .bind(&event.campaign_id)
        .bind(event.seq as i64)
        .bind(&event.event_id)
        .bind(event.event_type.as_wire_name())
        .bind(&payload_json)
        .bind(&event.timestamp)
        .execute(&mut *tx)
        .await
        .map_err(|e| StoreError::TransientError(e.to_string()))?;
        if insert.rows_affected() == 0 {
            return Err(StoreError::SequenceConflict {
                expected: expected_version + 1,
                actual: event.seq,
            });
        }

        tx.commit()
            .await
            .map_err(|e| StoreError::TransientError(e.to_string()))?;
        Ok(())
    }

    async fn update_snapshot(
        &self,
        snapshot: CampaignSnapshot,
        expected_version: u64,
    ) -> Result<(), StoreError> {
        let state_json = serde_json::to_value(&snapshot.state)
            .map_err(|e| StoreError::TransientError(e.to_string()))?;
        let result = sqlx::query(
            "UPDATE snapshots SET version = $1, state_json = $2, updated_at = $3 \
             WHERE campaign_id = $4 AND version = $5",
        )
        .bind(snapshot.version as i64)
        .bind(&state_json)
        .bind(snapshot.updated_at)
        .bind(&snapshot.campaign_id)
        .bind(expected_version as i64)
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::TransientError(e.to_string()))?;
        if result.rows_affected() == 0 {
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
        let rows = sqlx::query(
            "SELECT event_id, campaign_id, seq, event_type, payload_json, timestamp \
             FROM campaign_events WHERE campaign_id = $1 AND seq > $2 ORDER BY seq ASC",
        )
        .bind(id)
        .bind(after_seq as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StoreError::TransientError(e.to_string()))?;
        rows.into_iter()
            .map(row_to_event)
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| StoreError::TransientError(e.to_string()))
    }

    async fn campaign_exists(&self, id: &str) -> Result<bool, StoreError> {
        let row = sqlx::query("SELECT 1 FROM campaigns WHERE campaign_id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| StoreError::TransientError(e.to_string()))?;
        Ok(row.is_some())
    }
}

fn row_to_snapshot(row: sqlx::postgres::PgRow) -> Result<CampaignSnapshot, sqlx::Error> {
    let state_json: serde_json::Value = row.try_get("state_json")?;
    let state = serde_json::from_value(state_json).map_err(sqlx::Error::Decode)?;
    Ok(CampaignSnapshot {
        campaign_id: row.try_get("campaign_id")?,
        version: row.try_get::<i64, _>("version")? as u64,
        state,
        updated_at: row.try_get("updated_at")?,
    })
}

fn row_to_event(row: sqlx::postgres::PgRow) -> Result<CampaignEvent, sqlx::Error> {
    let event_type_str: String = row.try_get("event_type")?;
    let event_type = wire_name_to_event_type(&event_type_str)
        .ok_or_else(|| sqlx::Error::Decode(format!("unknown event_type {event_type_str}").into()))?;
    let payload: serde_json::Value = row.try_get("payload_json")?;
    Ok(CampaignEvent {
        event_id: row.try_get("event_id")?,
        campaign_id: row.try_get("campaign_id")?,
        seq: row.try_get::<i64, _>("seq")? as u64,
        event_type,
        payload,
        timestamp: row.try_get("timestamp")?,
    })
}

fn wire_name_to_event_type(name: &str) -> Option<EventType> {
    Some(match name {
        "CAMPAIGN_STARTED" => EventType::CampaignStarted,
        "TASK_GROUP_STARTED" => EventType::TaskGroupStarted,
        "TASK_COMPLETED" => EventType::TaskCompleted,
        "TASK_GROUP_COMPLETED" => EventType::TaskGroupCompleted,
        "TASK_GROUP_OBJECTIVE_MET" => EventType::TaskGroupObjectiveMet,
        "CAMPAIGN_COMPLETED" => EventType::CampaignCompleted,
        "CAMPAIGN_CANCELLED" => EventType::CampaignCancelled,
        "CAMPAIGN_ERROR" => EventType::CampaignError,
        "TASK_EVENT_RECEIVED" => EventType::TaskEventReceived,
        "STEP_START" => EventType::StepStart,
        "STEP_COMPLETE" => EventType::StepComplete,
        "CAMPAIGN_COMPLETE" => EventType::CampaignComplete,
        "READY_FOR_INPUT" => EventType::ReadyForInput,
        "CAMPAIGN_ERROR_FROM_SERVICE" => EventType::CampaignErrorFromService,
        "CAMPAIGN_ERROR_SCHEMA" => EventType::CampaignErrorSchema,
        "UNKNOWN_ERROR" => EventType::UnknownError,
        _ => return None,
    })
}
