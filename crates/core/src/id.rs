// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! ID generation abstractions

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Trait for truncating identifiers to a short prefix.
pub trait ShortId {
    /// Returns a string slice truncated to at most `n` characters.
    fn short(&self, n: usize) -> &str;
}

impl ShortId for str {
    fn short(&self, n: usize) -> &str {
        if self.len() <= n {
            self
        } else {
            &self[..n]
        }
    }
}

/// Define a newtype ID wrapper around `String`.
///
/// Generates `new()`, `as_str()`, `short()`, `Display`, `From<String>`, `From<&str>`,
/// `PartialEq<str>`, `PartialEq<&str>`, and `Borrow<str>` implementations.
///
/// ```ignore
/// define_id! {
///     /// Doc comment for the ID type.
///     pub struct MyId;
/// }
///
/// // With extra derives (e.g. Default):
/// define_id! {
///     #[derive(Default)]
///     pub struct MyDefaultId;
/// }
/// ```
#[macro_export]
macro_rules! define_id {
    (
        $(#[$meta:meta])*
        pub struct $name:ident;
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
        pub struct $name(pub String);

        impl $name {
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// Returns a string slice truncated to at most `n` characters.
            pub fn short(&self, n: usize) -> &str {
                if self.0.len() <= n {
                    &self.0
                } else {
                    &self.0[..n]
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self(s)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(s.to_string())
            }
        }

        impl PartialEq<str> for $name {
            fn eq(&self, other: &str) -> bool {
                self.0 == other
            }
        }

        impl PartialEq<&str> for $name {
            fn eq(&self, other: &&str) -> bool {
                self.0 == *other
            }
        }

        impl std::borrow::Borrow<str> for $name {
            fn borrow(&self) -> &str {
                &self.0
            }
        }
    };
}

/// Generates unique identifiers
pub trait IdGen: Clone + Send + Sync {
    fn next(&self) -> String;
}

/// UUID-based ID generator for production use
#[derive(Clone, Default)]
pub struct UuidIdGen;

impl IdGen for UuidIdGen {
    fn next(&self) -> String {
        uuid::Uuid::new_v4().to_string()
    }
}

/// Sequential ID generator for testing
#[derive(Clone)]
pub struct SequentialIdGen {
    prefix: String,
    counter: Arc<AtomicU64>,
}

impl SequentialIdGen {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            counter: Arc::new(AtomicU64::new(1)),
        }
    }
}

impl Default for SequentialIdGen {
    fn default() -> Self {
        Self::new("id")
    }
}

impl IdGen for SequentialIdGen {
    fn next(&self) -> String {
        let n = self.counter.fetch_add(1, Ordering::SeqCst);
        format!("{}-{}", self.prefix, n)
    }
}

define_id! {
    /// Identifier for a campaign. Client-supplied at submit time; must be a
    /// parsable UUID string or one is minted (see [`CampaignId::parse_or_mint`]).
    pub struct CampaignId;
}

define_id! {
    /// Identifier for a task group within a campaign. Unique within the campaign.
    pub struct TaskGroupId;
}

define_id! {
    /// Identifier for a task within a task group. Unique within the group;
    /// need not parse as a UUID for net construction, but broker dispatch
    /// treats UUID-formatted task ids as step ids (`spec.md` §4.4).
    pub struct TaskId;
}

define_id! {
    /// Identifier for a recorded event.
    pub struct EventId;
}

impl CampaignId {
    /// Resolve a campaign id from client input: use it verbatim if it parses
    /// as a UUID, otherwise mint a fresh v4 UUID (`spec.md` §4.4 "Submit").
    pub fn parse_or_mint(supplied: &str) -> Self {
        match uuid::Uuid::parse_str(supplied) {
            Ok(_) => CampaignId::new(supplied),
            Err(_) => CampaignId::new(uuid::Uuid::new_v4().to_string()),
        }
    }
}

impl EventId {
    /// Mint a fresh random event id.
    pub fn new_random() -> Self {
        EventId::new(uuid::Uuid::new_v4().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_or_mint_keeps_valid_uuid() {
        let supplied = "550e8400-e29b-41d4-a716-446655440000";
        assert_eq!(CampaignId::parse_or_mint(supplied).as_str(), supplied);
    }

    #[test]
    fn parse_or_mint_mints_fresh_id_for_garbage_input() {
        let id = CampaignId::parse_or_mint("not-a-uuid");
        assert!(uuid::Uuid::parse_str(id.as_str()).is_ok());
        assert_ne!(id.as_str(), "not-a-uuid");
    }

    #[test]
    fn short_truncates() {
        let id = TaskGroupId::new("abcdefgh");
        assert_eq!(id.short(3), "abc");
        assert_eq!(TaskGroupId::new("ab").short(3), "ab");
    }
}
