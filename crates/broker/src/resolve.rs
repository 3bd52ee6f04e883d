// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Derive broker publish parameters (topic, headers, body, content type)
//! from a step's task metadata (`spec.md` §6). Pure functions so the
//! orchestrator can resolve dispatch parameters without touching the
//! broker transport itself.

use crate::error::BrokerError;
use bytes::Bytes;
use co_core::Clock;
use std::collections::HashMap;

const REQUIRED_HEADERS: [&str; 2] = ["source", "sdk_version"];
const OVERLAY_KEYS: [&str; 8] = [
    "source",
    "destination",
    "created_at",
    "sdk_version",
    "data_handler",
    "has_error",
    "campaignId",
    "nodeId",
];

/// Resolve the outgoing header map. Starts from any `headers`/`header`
/// dict in metadata, then overlays the fixed selection of well-known keys
/// when present and not already set. Defaults `created_at` to now (RFC
/// 3339 UTC) and `has_error` to `false`. Fails with `MissingHeaders` if
/// `source` or `sdk_version` end up unset.
pub fn resolve_headers(
    metadata: &serde_json::Value,
    clock: &impl Clock,
) -> Result<HashMap<String, String>, BrokerError> {
    let mut headers: HashMap<String, String> = HashMap::new();

    if let Some(nested) = metadata
        .get("headers")
        .or_else(|| metadata.get("header"))
        .and_then(|v| v.as_object())
    {
        for (k, v) in nested {
            headers.insert(k.clone(), normalize_header_value(v));
        }
    }

    for key in OVERLAY_KEYS {
        if headers.contains_key(key) {
            continue;
        }
        if let Some(value) = metadata.get(key) {
            if !value.is_null() {
                headers.insert(key.to_string(), normalize_header_value(value));
            }
        }
    }

    headers
        .entry("created_at".to_string())
        .or_insert_with(|| clock.rfc3339());
    headers
        .entry("has_error".to_string())
        .or_insert_with(|| "false".to_string());

    let missing: Vec<&str> = REQUIRED_HEADERS
        .iter()
        .copied()
        .filter(|key| !headers.contains_key(*key))
        .collect();
    if !missing.is_empty() {
        return Err(BrokerError::MissingHeaders(missing.join(", ")));
    }

    Ok(headers)
}

/// Resolve the topic: explicit `topic` field; else derived from a dotted
/// or slashed five-part service hierarchy; else assembled from the five
/// `{organization, facility, system, subsystem, service}` fields; else a
/// resolution error.
pub fn resolve_topic(
    metadata: &serde_json::Value,
    headers: &HashMap<String, String>,
) -> Result<String, BrokerError> {
    if let Some(topic) = metadata.get("topic").and_then(|v| v.as_str()) {
        if !topic.is_empty() {
            return Ok(topic.to_string());
        }
    }

    let hierarchy_value = metadata
        .get("service_hierarchy")
        .and_then(|v| v.as_str())
        .or_else(|| metadata.get("source").and_then(|v| v.as_str()))
        .or_else(|| headers.get("source").map(|s| s.as_str()));

    let parts = split_hierarchy(hierarchy_value);
    if !parts.is_empty() {
        return Ok(format!("{}/response", parts.join("/")));
    }

    let mut assembled = Vec::with_capacity(5);
    for key in ["organization", "facility", "system", "subsystem", "service"] {
        match metadata.get(key).and_then(|v| v.as_str()) {
            Some(value) if !value.is_empty() => assembled.push(value.to_string()),
            _ => break,
        }
    }
    if assembled.len() == 5 {
        return Ok(format!("{}/response", assembled.join("/")));
    }

    Err(BrokerError::ResolutionError)
}

/// Split a dotted or slashed hierarchy string into exactly five parts, or
/// an empty vec if it doesn't have exactly five non-empty parts.
pub fn split_hierarchy(value: Option<&str>) -> Vec<String> {
    let Some(value) = value else {
        return Vec::new();
    };
    if value.is_empty() {
        return Vec::new();
    }
    let parts: Vec<String> = if value.contains('/') {
        value.split('/').filter(|p| !p.is_empty()).map(String::from).collect()
    } else {
        value.split('.').filter(|p| !p.is_empty()).map(String::from).collect()
    };
    if parts.len() >= 5 {
        parts.into_iter().take(5).collect()
    } else {
        Vec::new()
    }
}

/// Resolve body bytes and content type. Looks at `payload`/`input`/`data`
/// in that order; bytes pass through, strings are UTF-8 encoded, anything
/// else is JSON-encoded (upgrading `application/octet-stream` to
/// `application/json`). Absent payload yields an empty body.
pub fn resolve_payload(metadata: &serde_json::Value) -> (Bytes, String) {
    let mut content_type = resolve_content_type(metadata);

    let raw = ["payload", "input", "data"]
        .iter()
        .find_map(|key| metadata.get(key));

    let Some(raw) = raw else {
        return (Bytes::new(), content_type);
    };

    if let Some(s) = raw.as_str() {
        return (Bytes::copy_from_slice(s.as_bytes()), content_type);
    }

    // `raw` is never raw bytes here: metadata arrives as `serde_json::Value`,
    // so binary payloads must already be base64 or similar upstream
    // (`spec.md` §9 open question — this spec defers to "bytes pass
    // through" without inventing an encoding).
    if content_type == "application/octet-stream" {
        content_type = "application/json".to_string();
    }
    let bytes = serde_json::to_vec(raw).unwrap_or_default();
    (Bytes::from(bytes), content_type)
}

fn resolve_content_type(metadata: &serde_json::Value) -> String {
    for key in ["content_type", "contentType"] {
        if let Some(value) = metadata.get(key).and_then(|v| v.as_str()) {
            if !value.is_empty() {
                return value.to_string();
            }
        }
    }
    "application/octet-stream".to_string()
}

fn normalize_header_value(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::Bool(b) => if *b { "true" } else { "false" }.to_string(),
        serde_json::Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use co_core::FakeClock;
    use serde_json::json;

    #[test]
    fn resolve_headers_requires_source_and_sdk_version() {
        let clock = FakeClock::new(0);
        let metadata = json!({});
        let err = resolve_headers(&metadata, &clock).unwrap_err();
        assert!(matches!(err, BrokerError::MissingHeaders(_)));
    }

    #[test]
    fn resolve_headers_defaults_created_at_and_has_error() {
        let clock = FakeClock::new(1_700_000_000_000);
        let metadata = json!({ "source": "org.fac.sys.sub.svc", "sdk_version": "1.0" });
        let headers = resolve_headers(&metadata, &clock).unwrap();
        assert_eq!(headers.get("has_error").map(String::as_str), Some("false"));
        assert!(headers.contains_key("created_at"));
    }

    #[test]
    fn resolve_topic_prefers_explicit_topic() {
        let metadata = json!({ "topic": "custom/topic" });
        let headers = HashMap::new();
        assert_eq!(resolve_topic(&metadata, &headers).unwrap(), "custom/topic");
    }

    #[test]
    fn resolve_topic_derives_from_dotted_hierarchy() {
        let metadata = json!({ "source": "org.fac.system.subsystem.service" });
        let headers = HashMap::new();
        assert_eq!(
            resolve_topic(&metadata, &headers).unwrap(),
            "org/fac/system/subsystem/service/response"
        );
    }

    #[test]
    fn resolve_topic_assembles_from_five_fields() {
        let metadata = json!({
            "organization": "org",
            "facility": "fac",
            "system": "sys",
            "subsystem": "sub",
            "service": "svc",
        });
        let headers = HashMap::new();
        assert_eq!(
            resolve_topic(&metadata, &headers).unwrap(),
            "org/fac/sys/sub/svc/response"
        );
    }

    #[test]
    fn resolve_topic_fails_without_enough_information() {
        let metadata = json!({});
        let headers = HashMap::new();
        assert!(matches!(
            resolve_topic(&metadata, &headers),
            Err(BrokerError::ResolutionError)
        ));
    }

    #[test]
    fn resolve_payload_json_encodes_objects_and_upgrades_content_type() {
        let metadata = json!({ "payload": { "x": 1 } });
        let (body, content_type) = resolve_payload(&metadata);
        assert_eq!(content_type, "application/json");
        assert_eq!(body.as_ref(), br#"{"x":1}"#);
    }

    #[test]
    fn resolve_payload_passes_strings_through_as_utf8() {
        let metadata = json!({ "payload": "hello" });
        let (body, _) = resolve_payload(&metadata);
        assert_eq!(body.as_ref(), b"hello");
    }

    #[test]
    fn resolve_payload_defaults_to_empty_body() {
        let metadata = json!({});
        let (body, content_type) = resolve_payload(&metadata);
        assert!(body.is_empty());
        assert_eq!(content_type, "application/octet-stream");
    }
}
