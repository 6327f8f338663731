//! Localized user-facing messages.
//!
//! The catalog is an immutable resource embedded at compile time, keyed by
//! two-letter language code. Lookups derive the code from a language name
//! ("Español" → `es`) and fall back to English for unknown codes.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use serde::{Deserialize, Serialize};

use crate::api::classify::{ClassifiedError, ErrorKind};

/// Code of the fallback catalog.
pub const FALLBACK_LANGUAGE: &str = "en";

const PLACEHOLDER: &str = "{message}";

static BUILTIN: LazyLock<Localizer> = LazyLock::new(|| {
    Localizer::from_json(include_str!("messages.json"))
        .expect("embedded message catalog is valid")
});

/// Two-letter code for a language name: its first two characters,
/// lower-cased. The name is taken as given, so `" English"` yields `" e"`.
pub fn language_code(language_name: &str) -> String {
    language_name
        .chars()
        .take(2)
        .flat_map(char::to_lowercase)
        .collect()
}

/// All messages for one language. Templates containing `{message}` are
/// filled by [`Localizer::fill`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageCatalog {
    pub language_name: String,
    pub greeting: String,
    pub busy: String,
    pub config_issue: String,
    pub schema_violation: String,
    /// Used when a schema violation carries no detail.
    pub schema_default_detail: String,
    pub unknown_template_helper: String,
    pub generic: String,
    pub quota_exhausted: String,
    pub no_reply: String,
    pub empty_message: String,
    pub send_in_progress: String,
    pub invalid_request: String,
}

impl MessageCatalog {
    fn template_for(&self, kind: ErrorKind) -> &str {
        match kind {
            ErrorKind::Busy => &self.busy,
            ErrorKind::ConfigIssue => &self.config_issue,
            ErrorKind::SchemaViolation => &self.schema_violation,
            ErrorKind::UnknownTemplateHelper => &self.unknown_template_helper,
            ErrorKind::Generic => &self.generic,
        }
    }
}

/// A supported language, for pickers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LanguageInfo {
    pub code: String,
    pub name: String,
}

/// Immutable code → catalog table with English fallback.
#[derive(Debug, Clone)]
pub struct Localizer {
    catalogs: BTreeMap<String, MessageCatalog>,
    fallback: MessageCatalog,
}

impl Localizer {
    /// The catalog embedded in the crate.
    pub fn builtin() -> &'static Localizer {
        &BUILTIN
    }

    /// Load a catalog table. It must contain the fallback language.
    pub fn from_json(json: &str) -> Result<Self, String> {
        let catalogs: BTreeMap<String, MessageCatalog> =
            serde_json::from_str(json).map_err(|e| format!("invalid message catalog: {e}"))?;
        let fallback = catalogs
            .get(FALLBACK_LANGUAGE)
            .cloned()
            .ok_or_else(|| format!("message catalog is missing the '{FALLBACK_LANGUAGE}' fallback"))?;
        Ok(Self {
            catalogs,
            fallback,
        })
    }

    /// Catalog for a language name, or English.
    pub fn catalog(&self, language_name: &str) -> &MessageCatalog {
        let code = language_code(language_name);
        self.catalogs.get(&code).unwrap_or(&self.fallback)
    }

    /// Whether a dedicated catalog exists for this language name.
    pub fn supports(&self, language_name: &str) -> bool {
        self.catalogs.contains_key(&language_code(language_name))
    }

    pub fn languages(&self) -> Vec<LanguageInfo> {
        self.catalogs
            .iter()
            .map(|(code, c)| LanguageInfo {
                code: code.clone(),
                name: c.language_name.clone(),
            })
            .collect()
    }

    /// Substitute `message` into a template's single placeholder.
    pub fn fill(template: &str, message: &str) -> String {
        template.replacen(PLACEHOLDER, message, 1)
    }

    /// User-facing message for a classified error. Busy and config issues
    /// are fixed texts; the other kinds carry the detail.
    pub fn localize(&self, error: &ClassifiedError, language_name: &str) -> String {
        let catalog = self.catalog(language_name);
        let template = catalog.template_for(error.kind);
        let detail = match (error.kind, error.detail.as_deref()) {
            (ErrorKind::Busy | ErrorKind::ConfigIssue, _) => return template.to_string(),
            (ErrorKind::SchemaViolation, None) => catalog.schema_default_detail.as_str(),
            (ErrorKind::UnknownTemplateHelper, None) => "unknown",
            (_, detail) => detail.unwrap_or_default(),
        };
        Self::fill(template, detail)
    }

    pub fn greeting(&self, language_name: &str) -> &str {
        &self.catalog(language_name).greeting
    }

    pub fn invalid_request(&self, language_name: &str, detail: &str) -> String {
        Self::fill(&self.catalog(language_name).invalid_request, detail)
    }
}
