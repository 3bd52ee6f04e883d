// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Event Fanout: per-subscriber bounded queues feeding every lifecycle
//! event to every live observer (`spec.md` §4.5). `subscribe()` hands
//! back a fresh [`broadcast::Receiver`]; enqueue is non-blocking by
//! construction — a slow subscriber that falls behind the channel's
//! capacity observes a `Lagged` error on its next recv rather than
//! stalling the sender.

use bytes::Bytes;
use tokio::sync::broadcast;
use tracing::warn;

/// Capacity of the underlying broadcast channel. A subscriber idle for
/// more than this many events in a row is dropped behind (sees `Lagged`)
/// rather than slowing down publication.
const QUEUE_CAPACITY: usize = 1024;

/// A single empty-byte message signaling forced disconnect (`spec.md` §4.5).
pub fn disconnect_sentinel() -> Bytes {
    Bytes::new()
}

/// Fans lifecycle events out to every live subscriber without blocking
/// on any one of them.
pub struct Fanout {
    sender: broadcast::Sender<Bytes>,
}

impl Fanout {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(QUEUE_CAPACITY);
        Self { sender }
    }

    /// Returns a fresh queue handle. Each subscriber gets its own
    /// position in the channel; none can block another.
    pub fn subscribe(&self) -> broadcast::Receiver<Bytes> {
        self.sender.subscribe()
    }

    /// Offers one JSON-encoded lifecycle event to every live subscriber.
    /// Never blocks: `broadcast::Sender::send` only fails when there are
    /// no receivers, which is not an error here.
    pub fn publish(&self, event_json: Bytes) {
        let _ = self.sender.send(event_json);
    }

    /// Forces every current subscriber to observe a disconnect.
    pub fn disconnect_all(&self) {
        let _ = self.sender.send(disconnect_sentinel());
    }
}

impl Default for Fanout {
    fn default() -> Self {
        Self::new()
    }
}

/// Drains a subscriber's queue until it closes or is forcibly
/// disconnected, invoking `on_event` for each live message. Grounded in
/// the `tokio::select!` lag-handling loop used for websocket fanout.
pub async fn drain<F: FnMut(Bytes)>(mut rx: broadcast::Receiver<Bytes>, mut on_event: F) {
    loop {
        match rx.recv().await {
            Ok(bytes) if bytes.is_empty() => break, // disconnect sentinel
            Ok(bytes) => on_event(bytes),
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                warn!(skipped, "fanout subscriber lagged, skipping missed events");
            }
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
}

#[cfg(test)]
#[path = "fanout_tests.rs"]
mod tests;
