//! REST API endpoint handlers.
//!
//! Reads are served from the [`SnapshotPublisher`] and never touch the
//! session mutex. A send holds the single in-flight permit for its whole
//! duration; mutating requests arriving meanwhile get 409.

use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use chefeva::api::CompletionBackend;
use chefeva::chat::{
    ChatSession, CompositeEventHandler, EventHandler, NoopHandler, QuotaSnapshot, SendOutcome,
    SessionSnapshot,
};
use chefeva::conversation::Part;
use chefeva::i18n::{LanguageInfo, Localizer};
use chefeva::recipe::{
    GenerationError, Menu, MenuRequest, Recipe, RecipeConfig, RecipeGenerator, RecipeRequest,
};
use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex, Semaphore};
use tracing::{debug, warn};

use crate::snapshot::SnapshotPublisher;

/// Shared application state passed to all handlers via axum's `State` extractor.
#[derive(Clone)]
pub struct AppState {
    /// The chat session. Held for the whole duration of a send.
    pub session: Arc<Mutex<ChatSession>>,
    pub backend: Arc<dyn CompletionBackend>,
    pub generator: Arc<RecipeGenerator>,
    snapshot: SnapshotPublisher,
    /// One permit, taken by the send in flight.
    sending: Arc<Semaphore>,
}

impl AppState {
    pub fn new(session: ChatSession, backend: Arc<dyn CompletionBackend>) -> Self {
        Self::with_handler(session, backend, NoopHandler)
    }

    /// Like [`AppState::new`], with `handler` observing session events
    /// ahead of the snapshot publisher. Replaces any handler already set on
    /// `session`.
    pub fn with_handler(
        session: ChatSession,
        backend: Arc<dyn CompletionBackend>,
        handler: impl EventHandler + 'static,
    ) -> Self {
        let snapshot = SnapshotPublisher::new(session.snapshot());
        let language = session.language().to_string();
        let session = session.with_event_handler(Box::new(
            CompositeEventHandler::new()
                .with(handler)
                .with(snapshot.clone()),
        ));
        Self {
            session: Arc::new(Mutex::new(session)),
            backend,
            generator: Arc::new(RecipeGenerator::new(
                RecipeConfig::default().with_default_language(language),
            )),
            snapshot,
            sending: Arc::new(Semaphore::new(1)),
        }
    }

    pub fn with_generator(mut self, generator: RecipeGenerator) -> Self {
        self.generator = Arc::new(generator);
        self
    }

    /// Latest published session state.
    pub fn snapshot(&self) -> SessionSnapshot {
        self.snapshot.current()
    }

    fn is_sending(&self) -> bool {
        self.sending.available_permits() == 0
    }

    fn send_in_progress(&self) -> ApiError {
        let catalog = Localizer::builtin().catalog(&self.snapshot.language());
        api_error(
            StatusCode::CONFLICT,
            "send_in_progress",
            catalog.send_in_progress.clone(),
        )
    }
}

/// Error body for non-2xx responses.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    /// Machine-readable kind (`send_in_progress`, `invalid_request`, `busy`, ...).
    pub error: String,
    /// Localized, user-facing message.
    pub message: String,
}

type ApiError = (StatusCode, Json<ErrorBody>);

fn api_error(status: StatusCode, error: impl Into<String>, message: impl Into<String>) -> ApiError {
    (
        status,
        Json(ErrorBody {
            error: error.into(),
            message: message.into(),
        }),
    )
}

/// GET /api/session: Conversation, language and quota.
pub async fn get_session(State(app): State<AppState>) -> Json<SessionSnapshot> {
    Json(app.snapshot())
}

/// GET /api/languages: Languages with a built-in message catalog.
pub async fn get_languages() -> Json<Vec<LanguageInfo>> {
    Json(Localizer::builtin().languages())
}

/// Request body for POST /api/chat.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatBody {
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub media_url: Option<String>,
    #[serde(default)]
    pub media_content_type: Option<String>,
}

impl ChatBody {
    fn into_parts(self) -> Vec<Part> {
        let mut parts = Vec::new();
        if !self.message.trim().is_empty() {
            parts.push(Part::text(self.message));
        }
        if let Some(url) = self.media_url.filter(|u| !u.trim().is_empty()) {
            parts.push(Part::media(url, self.media_content_type));
        }
        parts
    }
}

/// Response body for POST /api/chat.
#[derive(Debug, Serialize)]
pub struct ChatReply {
    #[serde(flatten)]
    pub outcome: SendOutcome,
    pub quota: QuotaSnapshot,
}

/// POST /api/chat: Send one message and wait for the reply.
///
/// Every handled outcome (reply, failure, exhausted quota, empty message) is
/// a 200 with a `status` field. Returns 409 while another send is in flight.
pub async fn post_chat(
    State(app): State<AppState>,
    Json(body): Json<ChatBody>,
) -> Result<Json<ChatReply>, ApiError> {
    let Ok(_sending) = app.sending.try_acquire() else {
        debug!("Rejected concurrent send");
        return Err(app.send_in_progress());
    };
    let mut session = app.session.lock().await;
    let outcome = session.send(app.backend.as_ref(), body.into_parts()).await;
    Ok(Json(ChatReply {
        outcome,
        quota: session.quota_snapshot(),
    }))
}

/// POST /api/reset: Start a fresh conversation. The quota is untouched.
///
/// Returns 409 while a send is in flight.
pub async fn post_reset(State(app): State<AppState>) -> Result<Json<SessionSnapshot>, ApiError> {
    if app.is_sending() {
        return Err(app.send_in_progress());
    }
    let mut session = app.session.lock().await;
    session.reset();
    Ok(Json(session.snapshot()))
}

/// Request body for POST /api/language.
#[derive(Debug, Deserialize)]
pub struct LanguageBody {
    pub language: String,
}

/// POST /api/language: Switch the reply language.
///
/// Returns 204 on success, 400 for a blank language, 409 while a send is in
/// flight.
pub async fn post_language(
    State(app): State<AppState>,
    Json(body): Json<LanguageBody>,
) -> Result<StatusCode, ApiError> {
    let language = body.language.trim();
    if language.is_empty() {
        let message = Localizer::builtin().invalid_request(&app.snapshot.language(), "language");
        return Err(api_error(StatusCode::BAD_REQUEST, "invalid_request", message));
    }
    if app.is_sending() {
        return Err(app.send_in_progress());
    }
    app.session.lock().await.set_language(language);
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/recipe: Generate a recipe.
///
/// 400 for an invalid request, 502 when generation fails.
pub async fn post_recipe(
    State(app): State<AppState>,
    Json(mut request): Json<RecipeRequest>,
) -> Result<Json<Recipe>, ApiError> {
    if request.language.is_none() {
        request.language = Some(app.snapshot.language());
    }
    app.generator
        .generate_recipe(app.backend.as_ref(), &request)
        .await
        .map(Json)
        .map_err(|e| generation_error(&app, request.language.as_deref(), &e))
}

/// POST /api/menu: Plan a menu.
///
/// 400 for an invalid request, 502 when generation fails.
pub async fn post_menu(
    State(app): State<AppState>,
    Json(mut request): Json<MenuRequest>,
) -> Result<Json<Menu>, ApiError> {
    if request.language.is_none() {
        request.language = Some(app.snapshot.language());
    }
    app.generator
        .generate_menu(app.backend.as_ref(), &request)
        .await
        .map(Json)
        .map_err(|e| generation_error(&app, request.language.as_deref(), &e))
}

fn generation_error(app: &AppState, language: Option<&str>, error: &GenerationError) -> ApiError {
    let language = app.generator.language_for(language);
    let message = error.localized(Localizer::builtin(), language);
    match error {
        GenerationError::InvalidRequest(_) => {
            api_error(StatusCode::BAD_REQUEST, "invalid_request", message)
        }
        GenerationError::Failed(classified) => {
            warn!("Generation failed: {error}");
            api_error(StatusCode::BAD_GATEWAY, classified.kind.to_string(), message)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chat_body_accepts_text_only() {
        let body: ChatBody = serde_json::from_str(r#"{"message":"hello"}"#).unwrap();
        let parts = body.into_parts();
        assert_eq!(parts.len(), 1);
        assert_eq!(parts[0].text.as_deref(), Some("hello"));
    }

    #[test]
    fn chat_body_with_media_only() {
        let body: ChatBody = serde_json::from_str(
            r#"{"mediaUrl":"https://img.example/a.png","mediaContentType":"image/png"}"#,
        )
        .unwrap();
        let parts = body.into_parts();
        assert_eq!(parts.len(), 1);
        let media = parts[0].media.as_ref().unwrap();
        assert_eq!(media.url, "https://img.example/a.png");
        assert_eq!(media.content_type.as_deref(), Some("image/png"));
    }

    #[test]
    fn blank_chat_body_has_no_parts() {
        let body: ChatBody = serde_json::from_str(r#"{"message":"  ","mediaUrl":""}"#).unwrap();
        assert!(body.into_parts().is_empty());
    }

    #[test]
    fn chat_reply_flattens_outcome() {
        let reply = ChatReply {
            outcome: SendOutcome::Replied {
                text: "Risotto.".into(),
            },
            quota: QuotaSnapshot {
                remaining: 4,
                max: 30,
                state: chefeva::quota::QuotaState::Available,
            },
        };
        let json = serde_json::to_value(&reply).unwrap();
        assert_eq!(json["status"], "replied");
        assert_eq!(json["text"], "Risotto.");
        assert_eq!(json["quota"]["remaining"], 4);
    }
}
