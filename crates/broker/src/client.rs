// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The broker's publish/subscribe surface, an opaque transport the engine
//! is agnostic to (`spec.md` §6, §9).

use crate::error::BrokerError;
use async_trait::async_trait;
use bytes::Bytes;
use std::collections::HashMap;
use std::sync::Arc;

/// The narrow callback interface through which broker callbacks re-enter
/// the orchestrator. Expressing it this way resolves the forward reference
/// between the orchestrator and its broker client: the client is
/// constructed with a `BrokerSink` handle and doesn't need to know the
/// orchestrator's concrete type (`spec.md` §9).
#[async_trait]
pub trait BrokerSink: Send + Sync {
    async fn handle_broker_message(
        &self,
        body: Bytes,
        content_type: &str,
        headers: HashMap<String, String>,
    );
}

/// Adapter for the message-oriented middleware carrying task requests and
/// responses. Concrete brokers (AMQP, MQTT) implement this; the engine
/// never sees wire-protocol detail (`spec.md` §6).
#[async_trait]
pub trait BrokerClient: Send + Sync {
    /// Publish one message. `persist` requests durable/at-least-once
    /// delivery where the underlying transport supports it.
    async fn publish(
        &self,
        topic: &str,
        body: Bytes,
        content_type: &str,
        headers: HashMap<String, String>,
        persist: bool,
    ) -> Result<(), BrokerError>;

    /// Register the single wildcard-capable subscription that feeds
    /// `sink.handle_broker_message` for every inbound message
    /// (`spec.md` §6). Subscribers register once on startup.
    async fn subscribe(&self, sink: Arc<dyn BrokerSink>) -> Result<(), BrokerError>;
}
