// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Centralized environment variable access for the daemon binary
//! (`spec.md` §9): one `Settings` struct, loaded once at startup via
//! [`Settings::load`], passed by value into the components that need it.
//! Nothing reloads it at runtime.

use std::path::PathBuf;

use co_storage::StoreBackend;

/// Daemon configuration, resolved once in `main` before anything else
/// starts (mirrors the teacher's `Config::load` state-dir resolution).
#[derive(Debug, Clone)]
pub struct Settings {
    /// Root state directory (`CO_STATE_DIR` > `XDG_STATE_HOME/co` >
    /// `~/.local/state/co`).
    pub state_dir: PathBuf,
    /// Which `CampaignStore` backend to open.
    pub store_backend: StoreBackend,
    /// Pre-shared API key the external HTTP collaborator is expected to
    /// present (`spec.md` §1, §9: authentication itself is out of scope,
    /// this is only the placeholder the boundary needs). `None` means no
    /// key is configured and the check is skipped.
    pub api_key: Option<String>,
    /// Broker connection string, passed through uninterpreted — no
    /// concrete broker adapter ships in this workspace (`spec.md` §6).
    pub broker_url: Option<String>,
    /// `tracing_subscriber::EnvFilter` directive.
    pub log_filter: String,
}

impl Settings {
    /// Resolve all daemon settings from the environment, applying
    /// defaults wherever a variable is unset.
    pub fn load() -> Result<Self, SettingsError> {
        Ok(Self {
            state_dir: state_dir()?,
            store_backend: store_backend(),
            api_key: std::env::var("CO_API_KEY").ok(),
            broker_url: std::env::var("CO_BROKER_URL").ok(),
            log_filter: log_filter(),
        })
    }
}

/// `CO_STATE_DIR` > `XDG_STATE_HOME/co` > `~/.local/state/co`.
fn state_dir() -> Result<PathBuf, SettingsError> {
    if let Ok(dir) = std::env::var("CO_STATE_DIR") {
        return Ok(PathBuf::from(dir));
    }
    if let Ok(xdg) = std::env::var("XDG_STATE_HOME") {
        return Ok(PathBuf::from(xdg).join("co"));
    }
    let home = std::env::var("HOME").map_err(|_| SettingsError::NoStateDir)?;
    Ok(PathBuf::from(home).join(".local/state/co"))
}

/// Resolve which `CampaignStore` backend to open.
///
/// `CO_STORAGE_BACKEND` selects the backend (`memory` is the default):
/// - `memory` — in-process, non-durable.
/// - `document` — requires `CO_MONGO_URI` and `CO_MONGO_DATABASE`.
/// - `relational` — requires `CO_DATABASE_URL`.
fn store_backend() -> StoreBackend {
    match std::env::var("CO_STORAGE_BACKEND").as_deref() {
        Ok("document") => StoreBackend::Document {
            uri: std::env::var("CO_MONGO_URI").unwrap_or_default(),
            database: std::env::var("CO_MONGO_DATABASE").unwrap_or_else(|_| "campaigns".to_string()),
        },
        Ok("relational") => StoreBackend::Relational {
            database_url: std::env::var("CO_DATABASE_URL").unwrap_or_default(),
        },
        _ => StoreBackend::InMemory,
    }
}

/// `tracing_subscriber::EnvFilter` directive, overridable via `CO_LOG`
/// (falls back to `RUST_LOG`, then `info`).
fn log_filter() -> String {
    std::env::var("CO_LOG")
        .or_else(|_| std::env::var("RUST_LOG"))
        .unwrap_or_else(|_| "info".to_string())
}

#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("could not resolve a state directory: set CO_STATE_DIR or HOME")]
    NoStateDir,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_backend_defaults_to_memory() {
        assert!(matches!(store_backend(), StoreBackend::InMemory));
    }

    #[test]
    fn log_filter_defaults_to_info() {
        std::env::remove_var("CO_LOG");
        std::env::remove_var("RUST_LOG");
        assert_eq!(log_filter(), "info");
    }
}
