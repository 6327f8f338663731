//! The remote completion seam.
//!
//! Chat sessions and the recipe generator never talk HTTP directly; they
//! hand a [`CompletionRequest`] to a [`CompletionBackend`]. Production uses
//! [`OpenRouterBackend`]; tests substitute scripted backends.

use std::future::Future;
use std::pin::Pin;

use thiserror::Error;
use tracing::debug;

use super::classify::{ClassifiedError, classify_with_status};
use crate::conversation::Turn;
use crate::{ChatRequest, DEFAULT_MODEL, Message, OpenRouterClient, ResponseFormat, UsageInfo};

/// Boxed future returned by [`CompletionBackend::complete`].
pub type CompletionFuture<'a> =
    Pin<Box<dyn Future<Output = Result<CompletionReply, CompletionError>> + Send + 'a>>;

/// A failed remote call. The message is kept verbatim for classification.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct CompletionError {
    /// HTTP status, when the failure came from a non-success response.
    pub status: Option<u16>,
    pub message: String,
}

impl CompletionError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            status: None,
            message: message.into(),
        }
    }

    pub fn with_status(status: u16, message: impl Into<String>) -> Self {
        Self {
            status: Some(status),
            message: message.into(),
        }
    }

    /// Status-first classification, falling back to the message text.
    pub fn classify(&self) -> ClassifiedError {
        classify_with_status(self.status, &self.message)
    }
}

/// Whether the model should answer in prose or a JSON object.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ReplyFormat {
    #[default]
    Text,
    Json,
}

/// Everything the model sees for one call.
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionRequest {
    pub system_persona: String,
    /// Prior turns, already trimmed to the context budget.
    pub history: Vec<Turn>,
    pub current_turn: Turn,
    /// Human-readable language name ("English", "Español", ...).
    pub language_name: String,
    pub format: ReplyFormat,
}

impl CompletionRequest {
    pub fn new(system_persona: impl Into<String>, current_turn: Turn) -> Self {
        Self {
            system_persona: system_persona.into(),
            history: Vec::new(),
            current_turn,
            language_name: String::new(),
            format: ReplyFormat::Text,
        }
    }

    pub fn with_history(mut self, history: Vec<Turn>) -> Self {
        self.history = history;
        self
    }

    pub fn with_language(mut self, language_name: impl Into<String>) -> Self {
        self.language_name = language_name.into();
        self
    }

    pub fn with_format(mut self, format: ReplyFormat) -> Self {
        self.format = format;
        self
    }

    /// System text: the persona plus the reply-language instruction.
    pub fn system_text(&self) -> String {
        let language = self.language_name.trim();
        if language.is_empty() {
            self.system_persona.clone()
        } else {
            format!("{}\n\nRespond in {language}.", self.system_persona)
        }
    }

    /// Wire messages: system, history oldest first, then the current turn.
    pub fn to_messages(&self) -> Vec<Message> {
        let mut messages = Vec::with_capacity(self.history.len() + 2);
        messages.push(Message::system(self.system_text()));
        messages.extend(self.history.iter().map(Message::from_turn));
        messages.push(Message::from_turn(&self.current_turn));
        messages
    }
}

/// Successful remote reply. `text` may be absent or blank.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CompletionReply {
    pub text: Option<String>,
    pub usage: Option<UsageInfo>,
}

impl CompletionReply {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            usage: None,
        }
    }

    /// A structurally empty reply (no choices, no content).
    pub fn empty() -> Self {
        Self::default()
    }

    /// The reply text when it carries anything besides whitespace.
    pub fn usable_text(&self) -> Option<&str> {
        self.text.as_deref().filter(|t| !t.trim().is_empty())
    }
}

/// Remote completion collaborator.
pub trait CompletionBackend: Send + Sync {
    fn complete(&self, request: CompletionRequest) -> CompletionFuture<'_>;
}

// ── OpenRouter ─────────────────────────────────────────────────────

/// Default generation cap for chat and recipe replies.
pub const DEFAULT_MAX_TOKENS: u32 = 2048;

/// Default sampling temperature.
pub const DEFAULT_TEMPERATURE: f32 = 0.7;

/// [`CompletionBackend`] backed by the OpenRouter chat completions API.
pub struct OpenRouterBackend {
    client: OpenRouterClient,
    model: String,
    max_tokens: u32,
    temperature: f32,
}

impl OpenRouterBackend {
    pub fn new(client: OpenRouterClient) -> Self {
        Self {
            client,
            model: DEFAULT_MODEL.to_string(),
            max_tokens: DEFAULT_MAX_TOKENS,
            temperature: DEFAULT_TEMPERATURE,
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Build the wire request for `request`.
    pub fn chat_request(&self, request: &CompletionRequest) -> ChatRequest {
        ChatRequest {
            model: Some(self.model.clone()),
            messages: request.to_messages(),
            max_tokens: self.max_tokens,
            temperature: self.temperature,
            response_format: match request.format {
                ReplyFormat::Json => Some(ResponseFormat::json_object()),
                ReplyFormat::Text => None,
            },
        }
    }
}

impl CompletionBackend for OpenRouterBackend {
    fn complete(&self, request: CompletionRequest) -> CompletionFuture<'_> {
        Box::pin(async move {
            let body = self.chat_request(&request);
            debug!(
                "Completion: {} history turn(s), format={:?}, language={}",
                request.history.len(),
                request.format,
                request.language_name
            );
            let completion = self.client.chat(&body).await?;
            Ok(CompletionReply {
                text: completion.content,
                usage: completion.usage,
            })
        })
    }
}
