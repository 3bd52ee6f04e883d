// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! JSON Schema validation for task input/output schemas (`spec.md` §6).
//!
//! Mirrors the original's `validate_schema`: instead of failing fast on the
//! first defect, every schema error is collected so a submitter sees the
//! whole list at once.

/// Validate that `json_schema` is itself a well-formed JSON Schema, draft
/// 2020-12. Returns the list of error messages; an empty list means the
/// schema is valid.
pub fn validate_schema(json_schema: &serde_json::Value) -> Vec<String> {
    jsonschema::meta::iter_errors(json_schema)
        .map(|error| format!("{} : {}", error.instance_path, error))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn well_formed_schema_has_no_errors() {
        let schema = json!({
            "type": "object",
            "properties": { "x": { "type": "number" } },
        });
        assert!(validate_schema(&schema).is_empty());
    }

    #[test]
    fn malformed_schema_reports_errors() {
        let schema = json!({
            "type": "not-a-real-type",
        });
        assert!(!validate_schema(&schema).is_empty());
    }
}
