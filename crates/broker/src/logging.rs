// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! A `BrokerClient` that logs every publish and never delivers inbound
//! messages. The real broker wire protocol is an external collaborator
//! (`spec.md` §1, §9) — this exists so `co-daemon` links and runs without
//! picking a concrete AMQP/MQTT library on the engine's behalf.

use crate::client::{BrokerClient, BrokerSink};
use crate::error::BrokerError;
use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::info;

/// Logs outgoing publishes at `info` level; accepts a subscription but
/// never invokes it. Swap for a real transport adapter in production.
#[derive(Default)]
pub struct LoggingBrokerClient {
    sink: Mutex<Option<Arc<dyn BrokerSink>>>,
}

impl LoggingBrokerClient {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl BrokerClient for LoggingBrokerClient {
    async fn publish(
        &self,
        topic: &str,
        body: Bytes,
        content_type: &str,
        headers: HashMap<String, String>,
        persist: bool,
    ) -> Result<(), BrokerError> {
        info!(
            topic,
            content_type,
            persist,
            body_len = body.len(),
            header_count = headers.len(),
            "publish (logging broker, no transport attached)"
        );
        Ok(())
    }

    async fn subscribe(&self, sink: Arc<dyn BrokerSink>) -> Result<(), BrokerError> {
        *self.sink.lock() = Some(sink);
        Ok(())
    }
}
