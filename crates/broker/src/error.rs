// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Broker error taxonomy (`spec.md` §7).

use thiserror::Error;

#[derive(Debug, Error)]
pub enum BrokerError {
    #[error("broker unavailable: {0}")]
    Unavailable(String),
    #[error("publish failed: {0}")]
    PublishFailed(String),
    #[error("missing required headers: {0}")]
    MissingHeaders(String),
    #[error("could not resolve a publish topic for this task")]
    ResolutionError,
}
