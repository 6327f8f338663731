//! Recipe and menu generation.
//!
//! Each flow validates the request, fills a prompt template, calls the
//! model in JSON mode, and validates the structured reply against the
//! schema derived from [`Recipe`] or [`Menu`]. Every failure after request
//! validation is reduced to a [`ClassifiedError`] so the caller can show a
//! localized message from the same taxonomy the chat uses.
//!
//! Generation is not counted against the chat message quota.

pub mod types;
pub mod validation;

pub use types::{
    Course, DEFAULT_COURSES, Menu, MenuRequest, Recipe, RecipeIngredient, RecipeRequest,
    RequestError,
};
pub use validation::{parse_structured, schema_failure, strip_code_fences};

use schemars::JsonSchema;
use serde::de::DeserializeOwned;
use serde_json::json;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::api::backend::{CompletionBackend, CompletionRequest, ReplyFormat};
use crate::api::classify::{ClassifiedError, classify};
use crate::conversation::Turn;
use crate::i18n::Localizer;
use crate::prompt::{PromptTemplate, generation_persona, menu_template, recipe_template};

/// Limits and defaults for generation requests.
#[derive(Debug, Clone)]
pub struct RecipeConfig {
    /// Reply language when the request names none.
    pub default_language: String,
    pub default_servings: u32,
    pub max_servings: u32,
    pub max_guests: u32,
    pub max_courses: usize,
    /// Maximum entries in any list field.
    pub max_list_items: usize,
    /// Maximum characters in any single list entry.
    pub max_item_chars: usize,
}

impl Default for RecipeConfig {
    fn default() -> Self {
        Self {
            default_language: "English".into(),
            default_servings: 2,
            max_servings: 50,
            max_guests: 200,
            max_courses: 8,
            max_list_items: 30,
            max_item_chars: 100,
        }
    }
}

impl RecipeConfig {
    pub fn with_default_language(mut self, language: impl Into<String>) -> Self {
        self.default_language = language.into();
        self
    }

    pub fn with_default_servings(mut self, servings: u32) -> Self {
        self.default_servings = servings;
        self
    }

    pub fn with_max_guests(mut self, guests: u32) -> Self {
        self.max_guests = guests;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GenerationError {
    #[error("invalid request: {0}")]
    InvalidRequest(#[from] RequestError),
    #[error("generation failed ({}): {}", .0.kind, .0.detail.as_deref().unwrap_or("-"))]
    Failed(ClassifiedError),
}

impl GenerationError {
    /// User-facing message in `language`.
    pub fn localized(&self, localizer: &Localizer, language: &str) -> String {
        match self {
            GenerationError::InvalidRequest(e) => localizer.invalid_request(language, &e.to_string()),
            GenerationError::Failed(classified) => localizer.localize(classified, language),
        }
    }
}

/// Runs recipe and menu flows against a completion backend.
#[derive(Debug, Clone, Default)]
pub struct RecipeGenerator {
    config: RecipeConfig,
}

impl RecipeGenerator {
    pub fn new(config: RecipeConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &RecipeConfig {
        &self.config
    }

    /// Language the reply will be written in.
    pub fn language_for<'a>(&'a self, requested: Option<&'a str>) -> &'a str {
        requested
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .unwrap_or(self.config.default_language.as_str())
    }

    pub async fn generate_recipe(
        &self,
        backend: &dyn CompletionBackend,
        request: &RecipeRequest,
    ) -> Result<Recipe, GenerationError> {
        let ingredients = request.validate(&self.config)?;
        let language = self.language_for(request.language.as_deref());
        let vars = json!({
            "ingredients": ingredients,
            "cuisine": request.cuisine,
            "servings": request.servings.unwrap_or(self.config.default_servings),
            "dietary_restrictions": request.dietary_restrictions,
            "max_minutes": request.max_minutes,
            "language": language,
        });
        info!("Generating recipe from {} ingredient(s)", ingredients.len());
        self.run(backend, &recipe_template(), &vars, language).await
    }

    pub async fn generate_menu(
        &self,
        backend: &dyn CompletionBackend,
        request: &MenuRequest,
    ) -> Result<Menu, GenerationError> {
        let courses = request.validate(&self.config)?;
        let language = self.language_for(request.language.as_deref());
        let vars = json!({
            "event_type": request.event_type.trim(),
            "guests": request.guests,
            "courses": courses,
            "cuisine": request.cuisine,
            "dietary_restrictions": request.dietary_restrictions,
            "budget": request.budget,
            "language": language,
        });
        info!(
            "Generating {}-course menu for {} guest(s)",
            courses.len(),
            request.guests
        );
        self.run(backend, &menu_template(), &vars, language).await
    }

    /// Render, call, validate. Shared by both flows.
    async fn run<T>(
        &self,
        backend: &dyn CompletionBackend,
        template: &PromptTemplate,
        vars: &serde_json::Value,
        language: &str,
    ) -> Result<T, GenerationError>
    where
        T: DeserializeOwned + JsonSchema,
    {
        let prompt = template
            .render(vars)
            .map_err(|e| failed(template.name(), &e.to_string()))?;
        debug!("Rendered '{}' prompt ({} chars)", template.name(), prompt.len());

        let request = CompletionRequest::new(generation_persona(), Turn::user_text(prompt))
            .with_language(language)
            .with_format(ReplyFormat::Json);

        let reply = backend.complete(request).await.map_err(|e| {
            warn!("'{}' generation call failed: {e}", template.name());
            GenerationError::Failed(e.classify())
        })?;

        let Some(text) = reply.usable_text() else {
            return Err(failed(
                template.name(),
                &schema_failure(template.name(), &["model returned no content".into()]),
            ));
        };

        parse_structured::<T>(text, template.name()).map_err(|e| failed(template.name(), &e))
    }
}

fn failed(flow: &str, message: &str) -> GenerationError {
    let classified = classify(message);
    warn!("'{flow}' generation failed: {} ({message})", classified.kind);
    GenerationError::Failed(classified)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::backend::{CompletionError, CompletionFuture, CompletionReply};
    use crate::api::classify::ErrorKind;
    use std::sync::Mutex;

    struct OneShot {
        reply: Mutex<Option<Result<CompletionReply, CompletionError>>>,
        seen: Mutex<Vec<CompletionRequest>>,
    }

    impl OneShot {
        fn new(reply: Result<CompletionReply, CompletionError>) -> Self {
            Self {
                reply: Mutex::new(Some(reply)),
                seen: Mutex::new(Vec::new()),
            }
        }
    }

    impl CompletionBackend for OneShot {
        fn complete(&self, request: CompletionRequest) -> CompletionFuture<'_> {
            self.seen.lock().unwrap().push(request);
            let reply = self.reply.lock().unwrap().take().expect("called once");
            Box::pin(async move { reply })
        }
    }

    const MENU: &str = r#"{"title":"Summer party","description":"Light and fresh",
        "courses":[{"course":"starter","name":"Gazpacho","description":"Cold tomato soup"},
                   {"course":"main","name":"Grilled fish","description":"With herbs"}]}"#;

    #[tokio::test]
    async fn menu_flow_sends_json_request_and_parses_reply() {
        let backend = OneShot::new(Ok(CompletionReply::text(MENU)));
        let request = MenuRequest {
            courses: vec!["starter".into(), "main".into()],
            language: Some("Español".into()),
            ..MenuRequest::new("summer party", 10)
        };
        let menu = RecipeGenerator::default()
            .generate_menu(&backend, &request)
            .await
            .unwrap();
        assert_eq!(menu.courses.len(), 2);

        let seen = backend.seen.lock().unwrap();
        assert_eq!(seen[0].format, ReplyFormat::Json);
        assert_eq!(seen[0].language_name, "Español");
        assert!(seen[0].history.is_empty());
        assert!(seen[0].current_turn.text().contains("Guests: 10"));
    }

    #[tokio::test]
    async fn invalid_request_never_calls_backend() {
        let backend = OneShot::new(Ok(CompletionReply::text(MENU)));
        let err = RecipeGenerator::default()
            .generate_recipe(&backend, &RecipeRequest::new(Vec::<String>::new()))
            .await
            .unwrap_err();
        assert_eq!(err, GenerationError::InvalidRequest(RequestError::Missing("ingredients")));
        assert!(backend.seen.lock().unwrap().is_empty());
        assert_eq!(
            err.localized(Localizer::builtin(), "English"),
            "Please check your request: ingredients is required"
        );
    }

    #[tokio::test]
    async fn remote_failure_is_classified() {
        let backend = OneShot::new(Err(CompletionError::with_status(503, "HTTP 503")));
        let err = RecipeGenerator::default()
            .generate_recipe(&backend, &RecipeRequest::new(["eggs"]))
            .await
            .unwrap_err();
        assert!(matches!(err, GenerationError::Failed(ref c) if c.kind == ErrorKind::Busy));
    }

    #[tokio::test]
    async fn malformed_reply_is_schema_violation() {
        let backend = OneShot::new(Ok(CompletionReply::text(r#"{"title":"x"}"#)));
        let err = RecipeGenerator::default()
            .generate_recipe(&backend, &RecipeRequest::new(["eggs"]))
            .await
            .unwrap_err();
        let GenerationError::Failed(classified) = err else {
            panic!("expected failure");
        };
        assert_eq!(classified.kind, ErrorKind::SchemaViolation);
        assert!(classified.detail.unwrap().contains("required"));
    }

    #[tokio::test]
    async fn empty_reply_is_schema_violation() {
        let backend = OneShot::new(Ok(CompletionReply::empty()));
        let err = RecipeGenerator::default()
            .generate_recipe(&backend, &RecipeRequest::new(["eggs"]))
            .await
            .unwrap_err();
        assert_eq!(
            err,
            GenerationError::Failed(ClassifiedError::new(
                ErrorKind::SchemaViolation,
                Some("model returned no content".into())
            ))
        );
    }

    #[test]
    fn language_defaults() {
        let generator =
            RecipeGenerator::new(RecipeConfig::default().with_default_language("Deutsch"));
        assert_eq!(generator.language_for(None), "Deutsch");
        assert_eq!(generator.language_for(Some("  ")), "Deutsch");
        assert_eq!(generator.language_for(Some("Français")), "Français");
    }
}
