// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Backend selection, mirroring the source's `create_campaign_repository`.

use crate::document::DocumentCampaignStore;
use crate::error::StoreError;
use crate::memory::InMemoryCampaignStore;
use crate::relational::RelationalCampaignStore;
use crate::store::CampaignStore;
use std::sync::Arc;

/// Which Event Store backend to open.
#[derive(Debug, Clone)]
pub enum StoreBackend {
    InMemory,
    Document { uri: String, database: String },
    Relational { database_url: String },
}

/// Construct the selected `CampaignStore` backend.
pub async fn open(backend: StoreBackend) -> Result<Arc<dyn CampaignStore>, StoreError> {
    match backend {
        StoreBackend::InMemory => Ok(Arc::new(InMemoryCampaignStore::new())),
        StoreBackend::Document { uri, database } => {
            let store = DocumentCampaignStore::connect(&uri, &database).await?;
            Ok(Arc::new(store))
        }
        StoreBackend::Relational { database_url } => {
            let store = RelationalCampaignStore::connect(&database_url).await?;
            Ok(Arc::new(store))
        }
    }
}
