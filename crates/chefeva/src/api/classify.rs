//! Maps caught failures onto a fixed set of user-facing error categories.
//!
//! Remote failures that carry an HTTP status are classified by status
//! first. Everything else (and statuses with no dedicated category) falls
//! back to case-sensitive substring rules on the message, first match wins:
//!
//! 1. `"503"` or `"overloaded"` → [`ErrorKind::Busy`]
//! 2. `"API key"` → [`ErrorKind::ConfigIssue`]
//! 3. `"Schema validation failed"` or `"Parse Errors"` → [`ErrorKind::SchemaViolation`]
//! 4. `"unknown helper"` → [`ErrorKind::UnknownTemplateHelper`]
//! 5. anything else → [`ErrorKind::Generic`]

use serde::Serialize;

/// Category of a classified failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Upstream model is overloaded or unavailable.
    Busy,
    /// Credentials or deployment configuration problem.
    ConfigIssue,
    /// The model's structured reply did not match the expected shape.
    SchemaViolation,
    /// A prompt template referenced a helper that does not exist.
    UnknownTemplateHelper,
    Generic,
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ErrorKind::Busy => "busy",
            ErrorKind::ConfigIssue => "config_issue",
            ErrorKind::SchemaViolation => "schema_violation",
            ErrorKind::UnknownTemplateHelper => "unknown_template_helper",
            ErrorKind::Generic => "generic",
        };
        f.write_str(s)
    }
}

/// A failure reduced to its category plus an optional detail for the
/// localized message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClassifiedError {
    pub kind: ErrorKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl ClassifiedError {
    pub fn new(kind: ErrorKind, detail: Option<String>) -> Self {
        Self { kind, detail }
    }
}

const PARSE_ERRORS: &str = "Parse Errors";
const UNKNOWN_HELPER: &str = "unknown helper";

/// Classify a failure message by substring rules.
pub fn classify(message: &str) -> ClassifiedError {
    if message.contains("503") || message.contains("overloaded") {
        return ClassifiedError::new(ErrorKind::Busy, None);
    }
    if message.contains("API key") {
        return ClassifiedError::new(ErrorKind::ConfigIssue, None);
    }
    if message.contains("Schema validation failed") || message.contains(PARSE_ERRORS) {
        return ClassifiedError::new(ErrorKind::SchemaViolation, schema_detail(message));
    }
    if message.contains(UNKNOWN_HELPER) {
        return ClassifiedError::new(
            ErrorKind::UnknownTemplateHelper,
            Some(helper_name(message).unwrap_or("unknown").to_string()),
        );
    }
    ClassifiedError::new(ErrorKind::Generic, Some(message.to_string()))
}

/// Classify using an HTTP status when one is known, then the message.
pub fn classify_with_status(status: Option<u16>, message: &str) -> ClassifiedError {
    match status {
        Some(503) => ClassifiedError::new(ErrorKind::Busy, None),
        Some(401) | Some(403) => ClassifiedError::new(ErrorKind::ConfigIssue, None),
        _ => classify(message),
    }
}

/// Text after `Parse Errors:` up to the next `(`, trimmed.
fn schema_detail(message: &str) -> Option<String> {
    let (_, rest) = message.split_once("Parse Errors:")?;
    let segment = rest.split_once('(').map_or(rest, |(before, _)| before);
    let trimmed = segment.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

/// First quoted token after `unknown helper`.
fn helper_name(message: &str) -> Option<&str> {
    let (_, rest) = message.split_once(UNKNOWN_HELPER)?;
    let mut chars = rest
        .trim_start_matches(|c| !matches!(c, '\'' | '"' | '`'))
        .chars();
    let quote = chars.next()?;
    let (name, _) = chars.as_str().split_once(quote)?;
    (!name.is_empty()).then_some(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn busy_messages() {
        assert_eq!(classify("503 Service Unavailable").kind, ErrorKind::Busy);
        assert_eq!(classify("model overloaded, retry").kind, ErrorKind::Busy);
        assert_eq!(classify("503 overloaded").detail, None);
    }

    #[test]
    fn config_issue() {
        let c = classify("Invalid API key");
        assert_eq!(c.kind, ErrorKind::ConfigIssue);
        // Case-sensitive.
        assert_eq!(classify("invalid api key").kind, ErrorKind::Generic);
    }

    #[test]
    fn schema_violation_extracts_detail() {
        let c = classify("Schema validation failed. Parse Errors: field X missing (at line 2)");
        assert_eq!(c.kind, ErrorKind::SchemaViolation);
        assert_eq!(c.detail.as_deref(), Some("field X missing"));
    }

    #[test]
    fn schema_violation_without_parenthesis_runs_to_end() {
        let c = classify("Parse Errors:  bad steps  ");
        assert_eq!(c.detail.as_deref(), Some("bad steps"));
    }

    #[test]
    fn schema_violation_without_detail() {
        let c = classify("Schema validation failed");
        assert_eq!(c.kind, ErrorKind::SchemaViolation);
        assert_eq!(c.detail, None);

        let empty = classify("Parse Errors: (schema: recipe)");
        assert_eq!(empty.detail, None);
    }

    #[test]
    fn unknown_helper_name() {
        assert_eq!(
            classify("unknown helper 'eq'"),
            ClassifiedError::new(ErrorKind::UnknownTemplateHelper, Some("eq".into()))
        );
        assert_eq!(
            classify("Template error: unknown helper \"ifEquals\" at 3:4")
                .detail
                .as_deref(),
            Some("ifEquals")
        );
        assert_eq!(
            classify("unknown helper `fmt`").detail.as_deref(),
            Some("fmt")
        );
    }

    #[test]
    fn unknown_helper_without_quotes_defaults() {
        let c = classify("unknown helper encountered");
        assert_eq!(c.detail.as_deref(), Some("unknown"));
    }

    #[test]
    fn generic_keeps_raw_message() {
        assert_eq!(
            classify("timeout"),
            ClassifiedError::new(ErrorKind::Generic, Some("timeout".into()))
        );
    }

    #[test]
    fn first_rule_wins() {
        // Busy outranks schema and helper rules.
        assert_eq!(
            classify("503 Parse Errors: x unknown helper 'y'").kind,
            ErrorKind::Busy
        );
        assert_eq!(
            classify("API key Parse Errors: x").kind,
            ErrorKind::ConfigIssue
        );
    }

    #[test]
    fn status_takes_precedence() {
        assert_eq!(
            classify_with_status(Some(503), "anything").kind,
            ErrorKind::Busy
        );
        assert_eq!(
            classify_with_status(Some(401), "Unauthorized").kind,
            ErrorKind::ConfigIssue
        );
        assert_eq!(
            classify_with_status(Some(403), "").kind,
            ErrorKind::ConfigIssue
        );
        assert_eq!(
            classify_with_status(Some(500), "upstream overloaded").kind,
            ErrorKind::Busy
        );
        assert_eq!(classify_with_status(None, "timeout").kind, ErrorKind::Generic);
    }
}
