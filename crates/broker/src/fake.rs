// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! A recording, in-process `BrokerClient` for tests, modeled on the
//! session adapter's fake.

use crate::client::{BrokerClient, BrokerSink};
use crate::error::BrokerError;
use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;

/// One recorded call into a [`FakeBrokerClient`].
#[derive(Debug, Clone, PartialEq)]
pub enum BrokerCall {
    Publish {
        topic: String,
        body: Bytes,
        content_type: String,
        headers: HashMap<String, String>,
        persist: bool,
    },
    Subscribe,
}

#[derive(Default)]
struct FakeBrokerState {
    calls: Vec<BrokerCall>,
    publish_should_fail: bool,
}

/// Records every `publish`/`subscribe` call and optionally feeds synthetic
/// inbound messages to the registered sink via [`FakeBrokerClient::deliver`].
#[derive(Clone, Default)]
pub struct FakeBrokerClient {
    state: Arc<Mutex<FakeBrokerState>>,
    sink: Arc<Mutex<Option<Arc<dyn BrokerSink>>>>,
}

impl FakeBrokerClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> Vec<BrokerCall> {
        self.state.lock().calls.clone()
    }

    pub fn set_publish_should_fail(&self, should_fail: bool) {
        self.state.lock().publish_should_fail = should_fail;
    }

    /// Simulate an inbound broker message arriving on the registered
    /// subscription.
    pub async fn deliver(&self, body: Bytes, content_type: &str, headers: HashMap<String, String>) {
        let sink = self.sink.lock().clone();
        if let Some(sink) = sink {
            sink.handle_broker_message(body, content_type, headers).await;
        }
    }
}

#[async_trait]
impl BrokerClient for FakeBrokerClient {
    async fn publish(
        &self,
        topic: &str,
        body: Bytes,
        content_type: &str,
        headers: HashMap<String, String>,
        persist: bool,
    ) -> Result<(), BrokerError> {
        let mut state = self.state.lock();
        if state.publish_should_fail {
            return Err(BrokerError::PublishFailed("fake configured to fail".to_string()));
        }
        state.calls.push(BrokerCall::Publish {
            topic: topic.to_string(),
            body,
            content_type: content_type.to_string(),
            headers,
            persist,
        });
        Ok(())
    }

    async fn subscribe(&self, sink: Arc<dyn BrokerSink>) -> Result<(), BrokerError> {
        self.state.lock().calls.push(BrokerCall::Subscribe);
        *self.sink.lock() = Some(sink);
        Ok(())
    }
}
