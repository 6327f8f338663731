//! Parsing and schema validation of structured model replies.
//!
//! Failures are reported as `Schema validation failed. Parse Errors: <errors>
//! (schema: <name>)` so they classify as schema violations with the error
//! list as detail.

use schemars::JsonSchema;
use serde::de::DeserializeOwned;
use tracing::warn;

use crate::json_schema_for;

/// Build the canonical schema failure message.
pub fn schema_failure(schema_name: &str, errors: &[String]) -> String {
    format!(
        "Schema validation failed. Parse Errors: {} (schema: {schema_name})",
        errors.join("; ")
    )
}

/// Strip a surrounding markdown code fence (with optional language tag).
pub fn strip_code_fences(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(inner) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let inner = inner.strip_suffix("```").unwrap_or(inner);
    match inner.split_once('\n') {
        Some((tag, body)) if !tag.trim_start().starts_with(['{', '[']) => body.trim(),
        _ => inner.trim(),
    }
}

/// Parse `text` as JSON, validate it against `T`'s schema, and deserialize.
pub fn parse_structured<T>(text: &str, schema_name: &str) -> Result<T, String>
where
    T: DeserializeOwned + JsonSchema,
{
    let body = strip_code_fences(text);
    let value: serde_json::Value = serde_json::from_str(body)
        .map_err(|e| schema_failure(schema_name, &[format!("reply is not valid JSON: {e}")]))?;

    let schema = json_schema_for::<T>();
    match jsonschema::validator_for(&schema) {
        Ok(validator) => {
            let errors: Vec<String> = validator
                .iter_errors(&value)
                .map(|e| {
                    let path = e.instance_path().to_string();
                    if path.is_empty() {
                        e.to_string()
                    } else {
                        format!("{path}: {e}")
                    }
                })
                .collect();
            if !errors.is_empty() {
                return Err(schema_failure(schema_name, &errors));
            }
        }
        Err(e) => warn!("Skipping validation, schema for '{schema_name}' is invalid: {e}"),
    }

    serde_json::from_value(value).map_err(|e| schema_failure(schema_name, &[e.to_string()]))
}
