// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Campaign orchestrator daemon (cod)
//!
//! Background process that owns the Orchestrator Core's event loop:
//! opens the Event Store, wires a broker client, drives campaigns to
//! completion, and fans lifecycle events out to subscribers.

#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

mod fanout;
mod settings;

use std::sync::Arc;

use co_broker::LoggingBrokerClient;
use co_core::SystemClock;
use co_engine::Orchestrator;
use tokio::signal::unix::{signal, SignalKind};
use tracing::{error, info, warn};

use crate::fanout::Fanout;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    if let Some(arg) = std::env::args().nth(1) {
        match arg.as_str() {
            "--version" | "-V" | "-v" => {
                println!("cod {}", env!("CARGO_PKG_VERSION"));
                return Ok(());
            }
            "--help" | "-h" | "help" => {
                println!("cod {}", env!("CARGO_PKG_VERSION"));
                println!("Campaign orchestrator daemon - owns the engine's event loop");
                return Ok(());
            }
            _ => {
                eprintln!("error: unexpected argument '{arg}'");
                eprintln!("Usage: cod [--help | --version]");
                std::process::exit(1);
            }
        }
    }

    let settings = settings::Settings::load()?;
    setup_logging(&settings.log_filter);
    info!("starting campaign orchestrator daemon");

    let store = co_storage::open(settings.store_backend).await?;
    let broker = Arc::new(LoggingBrokerClient::new());
    let orchestrator = Arc::new(Orchestrator::new(store, broker.clone(), SystemClock));

    broker
        .subscribe(orchestrator.clone())
        .await
        .map_err(|e| e.to_string())?;

    let fanout = Arc::new(Fanout::new());
    spawn_event_bridge(orchestrator.clone(), fanout.clone());

    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sigint = signal(SignalKind::interrupt())?;

    info!("daemon ready");
    println!("READY");

    tokio::select! {
        _ = sigterm.recv() => info!("received SIGTERM, shutting down..."),
        _ = sigint.recv() => info!("received SIGINT, shutting down..."),
    }

    fanout.disconnect_all();
    info!("daemon stopped");
    Ok(())
}

/// Bridges every lifecycle event the Orchestrator emits into the Fanout,
/// JSON-encoded as a single byte string (`spec.md` §4.5).
fn spawn_event_bridge<Store, Broker, C>(
    orchestrator: Arc<Orchestrator<Store, Broker, C>>,
    fanout: Arc<Fanout>,
) where
    Store: co_storage::CampaignStore + 'static,
    Broker: co_broker::BrokerClient + 'static,
    C: co_core::Clock + 'static,
{
    let mut events = orchestrator.subscribe_events();
    tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(event) => {
                    let envelope = serde_json::json!({
                        "campaign_id": event.campaign_id,
                        "event": event,
                    });
                    match serde_json::to_vec(&envelope) {
                        Ok(bytes) => fanout.publish(bytes.into()),
                        Err(e) => error!(error = %e, "failed to encode lifecycle event"),
                    }
                }
                Err(tokio::sync::broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!(skipped, "event bridge lagged behind the reducer");
                }
                Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
            }
        }
    });
}

fn setup_logging(log_filter: &str) {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let filter = EnvFilter::try_new(log_filter).unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer())
        .init();
}
