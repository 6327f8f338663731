//! Chef Eva: a recipe, menu and cooking-chat assistant on top of hosted LLMs.
//!
//! `chefeva` turns ingredients and event parameters into recipes and
//! multi-course menus, and runs a persona-driven chat ("Chef Eva") with a
//! bounded context window and a persisted per-user message quota. Model
//! calls go through the [OpenRouter](https://openrouter.ai/) chat
//! completions API.
//!
//! # Getting started
//!
//! ```ignore
//! use std::sync::Arc;
//! use chefeva::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), String> {
//!     let api_key = std::env::var("OPENROUTER_KEY").map_err(|e| e.to_string())?;
//!     let backend = OpenRouterBackend::new(OpenRouterClient::new(api_key)?);
//!
//!     let config = ChatConfig::default().with_language("Español");
//!     let store = Arc::new(FileQuotaStore::new("quota.json"));
//!     let mut session = ChatSession::open(config, store)
//!         .with_event_handler(Box::new(LoggingHandler));
//!
//!     match session.send_text(&backend, "I have leeks and potatoes").await {
//!         SendOutcome::Replied { text } => println!("{text}"),
//!         other => println!("{}", other.message()),
//!     }
//!     println!("{} messages left", session.quota_remaining());
//!     Ok(())
//! }
//! ```
//!
//! # Where to find things
//!
//! - **Chat with Chef Eva:** [`ChatSession`](chat::ChatSession) owns the
//!   [`Conversation`](conversation::Conversation) and the
//!   [`QuotaTracker`](quota::QuotaTracker). Each send is transactional: the
//!   quota is consumed and the user turn appended up front, and both are
//!   rolled back if the call fails or the future is dropped.
//!
//! - **Bound the prompt size:** [`ContextBudget`](context::ContextBudget)
//!   keeps the newest turns that fit a token budget.
//!
//! - **Turn failures into user messages:** [`api::classify`] categorizes
//!   errors and [`Localizer`](i18n::Localizer) renders them in the user's
//!   language.
//!
//! - **Generate recipes and menus:** [`RecipeGenerator`](recipe::RecipeGenerator)
//!   validates requests, renders [`prompt::template`]s, calls the model in
//!   JSON mode and validates the reply against a JSON Schema.
//!
//! - **Observe sessions:** implement [`EventHandler`](chat::EventHandler) or
//!   use [`LoggingHandler`](chat::LoggingHandler).
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`conversation`] | Turns, parts, the append-only conversation log |
//! | [`context`] | Token budget and context window builder |
//! | [`quota`] | Persisted message quota and its stores |
//! | [`api`] | Completion backend seam, error classifier, correlation IDs |
//! | [`i18n`] | Localized message catalog |
//! | [`prompt`] | Persona builder and `{{...}}` template renderer |
//! | [`recipe`] | Recipe and menu generation |
//! | [`chat`] | Chat session, config, events |

pub mod api;
pub mod chat;
pub mod context;
pub mod conversation;
pub mod i18n;
pub mod prelude;
pub mod prompt;
pub mod quota;
pub mod recipe;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use tracing::{debug, trace};

pub use api::backend::CompletionError;
use conversation::{Role, Turn};

// Re-export schemars for downstream crates.
pub use schemars;

// ── Constants ──────────────────────────────────────────────────────

pub const OPENROUTER_URL: &str = "https://openrouter.ai/api/v1/chat/completions";

/// Default model for chat and generation calls.
pub const DEFAULT_MODEL: &str = "google/gemini-2.0-flash-001";

/// Environment variable holding the OpenRouter API key.
pub const API_KEY_ENV: &str = "OPENROUTER_KEY";

// ── Schema generation ──────────────────────────────────────────────

/// Generate a JSON Schema `serde_json::Value` for a type implementing
/// `schemars::JsonSchema`. Used to validate structured model replies.
///
/// # Example
///
/// ```
/// use chefeva::json_schema_for;
/// use schemars::JsonSchema;
/// use serde::Deserialize;
///
/// #[derive(Deserialize, JsonSchema)]
/// struct Dish {
///     name: String,
///     #[serde(default)]
///     servings: Option<u32>,
/// }
///
/// let schema = json_schema_for::<Dish>();
/// assert_eq!(schema["type"], "object");
/// assert!(schema["required"].as_array().unwrap().contains(&"name".into()));
/// ```
pub fn json_schema_for<T: JsonSchema>() -> serde_json::Value {
    let schema = schemars::schema_for!(T);
    serde_json::to_value(schema)
        .unwrap_or_else(|_| serde_json::json!({"type": "object", "properties": {}}))
}

// ── Request types ──────────────────────────────────────────────────

/// Chat completion request body. Unused optional fields are omitted.
#[derive(Serialize, Debug, Default)]
pub struct ChatRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    pub messages: Vec<Message>,
    #[serde(skip_serializing_if = "is_zero_u32")]
    pub max_tokens: u32,
    #[serde(skip_serializing_if = "is_zero_f32")]
    pub temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_format: Option<ResponseFormat>,
}

fn is_zero_u32(v: &u32) -> bool {
    *v == 0
}
fn is_zero_f32(v: &f32) -> bool {
    *v == 0.0
}

/// JSON output format type.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub enum ResponseFormatType {
    #[serde(rename = "json_object")]
    JsonObject,
}

/// JSON output mode.
#[derive(Serialize, Debug)]
pub struct ResponseFormat {
    #[serde(rename = "type")]
    pub fmt_type: ResponseFormatType,
}

impl ResponseFormat {
    pub fn json_object() -> Self {
        Self {
            fmt_type: ResponseFormatType::JsonObject,
        }
    }
}

// ── Message types ──────────────────────────────────────────────────

/// Role of a message on the wire.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    System,
    User,
    Assistant,
}

impl std::fmt::Display for MessageRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MessageRole::System => write!(f, "system"),
            MessageRole::User => write!(f, "user"),
            MessageRole::Assistant => write!(f, "assistant"),
        }
    }
}

impl From<Role> for MessageRole {
    fn from(role: Role) -> Self {
        match role {
            Role::User => MessageRole::User,
            Role::Assistant => MessageRole::Assistant,
        }
    }
}

/// Message content: plain text, or an ordered list of text and image parts.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(untagged)]
pub enum MessageContent {
    Text(String),
    Parts(Vec<ContentPart>),
}

/// One element of multi-part content.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentPart {
    Text { text: String },
    ImageUrl { image_url: ImageUrl },
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct ImageUrl {
    pub url: String,
}

/// A message in the request.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct Message {
    pub role: MessageRole,
    pub content: MessageContent,
}

impl Message {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::System,
            content: MessageContent::Text(content.into()),
        }
    }

    /// Convert a conversation turn. Text-only turns collapse to plain text;
    /// turns with media become multi-part content.
    pub fn from_turn(turn: &Turn) -> Self {
        let role = MessageRole::from(turn.role);
        if turn.parts.iter().all(|p| p.media.is_none()) {
            return Self {
                role,
                content: MessageContent::Text(turn.text()),
            };
        }
        let mut parts = Vec::new();
        for part in &turn.parts {
            if let Some(text) = part.text.as_deref().filter(|t| !t.is_empty()) {
                parts.push(ContentPart::Text {
                    text: text.to_string(),
                });
            }
            if let Some(media) = &part.media {
                parts.push(ContentPart::ImageUrl {
                    image_url: ImageUrl {
                        url: media.url.clone(),
                    },
                });
            }
        }
        Self {
            role,
            content: MessageContent::Parts(parts),
        }
    }
}

// ── Response types ─────────────────────────────────────────────────

/// Raw API response (internal deserialization target).
#[derive(Deserialize, Debug)]
struct RawChatResponse {
    choices: Option<Vec<RawChoice>>,
    error: Option<ApiErrorResponse>,
    #[serde(default)]
    usage: Option<UsageInfo>,
}

#[derive(Deserialize, Debug)]
struct RawChoice {
    message: RawResponseMessage,
    finish_reason: Option<String>,
}

#[derive(Deserialize, Debug)]
struct RawResponseMessage {
    content: Option<String>,
}

#[derive(Deserialize, Debug)]
struct ApiErrorResponse {
    message: String,
    #[serde(default)]
    code: Option<serde_json::Value>,
}

/// Clean return type from `OpenRouterClient::chat()`.
#[derive(Debug)]
pub struct ChatCompletion {
    pub content: Option<String>,
    pub usage: Option<UsageInfo>,
    pub finish_reason: Option<String>,
}

/// Token usage statistics.
#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct UsageInfo {
    pub prompt_tokens: Option<u32>,
    pub completion_tokens: Option<u32>,
    pub total_tokens: Option<u32>,
}

// ── Client ─────────────────────────────────────────────────────────

/// Async HTTP client for the OpenRouter chat completions API.
pub struct OpenRouterClient {
    client: reqwest::Client,
    api_key: String,
    referer: String,
    title: String,
}

impl OpenRouterClient {
    /// Create a new client with the given API key and default headers.
    pub fn new(api_key: impl Into<String>) -> Result<Self, String> {
        Self::with_headers(api_key, "https://github.com/chefeva/chefeva", "Chef Eva")
    }

    /// Create a new client with custom Referer and X-Title headers.
    pub fn with_headers(
        api_key: impl Into<String>,
        referer: impl Into<String>,
        title: impl Into<String>,
    ) -> Result<Self, String> {
        let client = reqwest::Client::builder()
            .user_agent("chefeva/0.1")
            .timeout(Duration::from_secs(120))
            .build()
            .map_err(|e| format!("failed to build HTTP client: {e}"))?;
        Ok(Self {
            client,
            api_key: api_key.into(),
            referer: referer.into(),
            title: title.into(),
        })
    }

    /// Send a chat completion request.
    ///
    /// Non-success responses keep their HTTP status on the returned error.
    /// A response without choices is not an error: it yields `content: None`.
    pub async fn chat(&self, body: &ChatRequest) -> Result<ChatCompletion, CompletionError> {
        debug!(
            "LLM request: model={}, messages={}, max_tokens={}, temp={}, json={}",
            body.model.as_deref().unwrap_or("(none)"),
            body.messages.len(),
            body.max_tokens,
            body.temperature,
            body.response_format.is_some(),
        );
        trace!(
            "Request payload size: {} bytes",
            serde_json::to_string(body).map_or(0, |s| s.len())
        );

        let start = Instant::now();

        let resp = self
            .client
            .post(OPENROUTER_URL)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("HTTP-Referer", &self.referer)
            .header("X-Title", &self.title)
            .json(body)
            .send()
            .await
            .map_err(|e| CompletionError::new(format!("request failed: {e}")))?;

        let status = resp.status();
        let text = resp
            .text()
            .await
            .map_err(|e| CompletionError::new(format!("failed to read response: {e}")))?;

        debug!(
            "LLM response: HTTP {} in {:.1}s ({} bytes)",
            status,
            start.elapsed().as_secs_f64(),
            text.len()
        );

        if !status.is_success() {
            return Err(http_error(status.as_u16(), &text));
        }

        parse_chat_response(&text)
    }
}

/// Error for a non-success HTTP response.
fn http_error(status: u16, body: &str) -> CompletionError {
    let message = match status {
        401 | 403 => format!("OpenRouter API HTTP {status}: invalid or missing API key: {body}"),
        _ => format!("OpenRouter API HTTP {status}: {body}"),
    };
    CompletionError::with_status(status, message)
}

/// Parse a successful response body.
fn parse_chat_response(text: &str) -> Result<ChatCompletion, CompletionError> {
    let parsed: RawChatResponse = serde_json::from_str(text)
        .map_err(|e| CompletionError::new(format!("failed to parse response: {e}")))?;

    if let Some(err) = parsed.error {
        // Errors embedded in a 200 body may still carry an HTTP-like code.
        let status = err
            .code
            .as_ref()
            .and_then(serde_json::Value::as_u64)
            .and_then(|c| u16::try_from(c).ok());
        let message = format!("OpenRouter API error: {}", err.message);
        return Err(match status {
            Some(code) => CompletionError::with_status(code, message),
            None => CompletionError::new(message),
        });
    }

    if let Some(ref usage) = parsed.usage {
        debug!(
            "Token usage: prompt={}, completion={}, total={}",
            usage.prompt_tokens.unwrap_or(0),
            usage.completion_tokens.unwrap_or(0),
            usage.total_tokens.unwrap_or(0),
        );
    }

    match parsed.choices.and_then(|c| c.into_iter().next()) {
        Some(c) => {
            debug!(
                "LLM output: {} chars text",
                c.message.content.as_ref().map_or(0, |s| s.len())
            );
            Ok(ChatCompletion {
                content: c.message.content,
                usage: parsed.usage,
                finish_reason: c.finish_reason,
            })
        }
        None => {
            debug!("LLM output: empty (no choices)");
            Ok(ChatCompletion {
                content: None,
                usage: parsed.usage,
                finish_reason: None,
            })
        }
    }
}
