// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Engine-internal error taxonomy (`spec.md` §7).

use co_broker::BrokerError;
use co_storage::StoreError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("validation failed: {0}")]
    Validation(String),
    #[error("cycle detected in task group dependencies")]
    CycleDetected,
    #[error("campaign {0} is already registered")]
    AlreadyRegistered(String),
    #[error("campaign {0} not found")]
    NotFound(String),
    #[error("no such transition: {0}")]
    NoSuchTransition(String),
    #[error("transition {0} is not enabled")]
    NotEnabled(String),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Broker(#[from] BrokerError),
}
