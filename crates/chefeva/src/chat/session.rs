//! The chat session: one conversation, one quota, one message in flight.
//!
//! [`ChatSession::send`] is transactional. Before the remote call it
//! consumes one unit of quota and appends the user's turn; on a reply it
//! appends the assistant turn and keeps both. Every other exit (a failed
//! call, or the send future being dropped mid-flight) refunds the quota and
//! truncates the conversation back to its pre-send length.

use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info};

use super::config::ChatConfig;
use super::events::{ChatEvent, EventHandler, NoopHandler};
use crate::api::backend::{CompletionBackend, CompletionRequest, ReplyFormat};
use crate::api::classify::ClassifiedError;
use crate::api::tracing::{generate_request_id, generate_session_id};
use crate::conversation::{Conversation, Part, Turn};
use crate::i18n::{Localizer, language_code};
use crate::quota::{QuotaDenied, QuotaState, QuotaStore, QuotaTracker};

// ── Outcomes ───────────────────────────────────────────────────────

/// Result of one [`ChatSession::send`]. Every variant carries a message
/// ready to show the user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SendOutcome {
    /// The model answered; the reply is now the last turn.
    Replied { text: String },
    /// The model answered with nothing usable. The quota stays consumed and
    /// a localized placeholder turn was appended.
    NoReply { message: String },
    /// The call failed. Quota refunded, conversation unchanged.
    Failed {
        error: ClassifiedError,
        message: String,
    },
    /// Refused before any remote call: no messages left.
    QuotaExhausted { message: String },
    /// Refused before any remote call: nothing to send.
    EmptyMessage { message: String },
}

impl SendOutcome {
    /// The text to show: the reply on success, the localized message otherwise.
    pub fn message(&self) -> &str {
        match self {
            SendOutcome::Replied { text } => text,
            SendOutcome::NoReply { message }
            | SendOutcome::Failed { message, .. }
            | SendOutcome::QuotaExhausted { message }
            | SendOutcome::EmptyMessage { message } => message,
        }
    }

    /// Whether the send reached the model and left a new assistant turn.
    pub fn is_answered(&self) -> bool {
        matches!(self, SendOutcome::Replied { .. } | SendOutcome::NoReply { .. })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuotaSnapshot {
    pub remaining: u32,
    pub max: u32,
    pub state: QuotaState,
}

/// Serializable view of a session for front ends.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSnapshot {
    pub id: String,
    pub language: String,
    pub language_code: String,
    pub quota: QuotaSnapshot,
    pub turns: Vec<Turn>,
}

// ── Session ────────────────────────────────────────────────────────

pub struct ChatSession {
    id: String,
    config: ChatConfig,
    conversation: Conversation,
    quota: QuotaTracker,
    localizer: &'static Localizer,
    handler: Box<dyn EventHandler>,
    sent: u64,
}

impl std::fmt::Debug for ChatSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChatSession")
            .field("id", &self.id)
            .field("language", &self.config.language)
            .field("turns", &self.conversation.len())
            .field("quota", &self.quota)
            .finish_non_exhaustive()
    }
}

impl ChatSession {
    /// Open a session: load the quota from `store` and seed the
    /// conversation with a greeting in the configured language.
    pub fn open(config: ChatConfig, store: Arc<dyn QuotaStore>) -> Self {
        let localizer = Localizer::builtin();
        let quota = QuotaTracker::load(store, config.quota_key.clone(), config.max_quota);
        let conversation =
            Conversation::seeded(Turn::assistant_text(localizer.greeting(&config.language)));
        let id = generate_session_id();
        info!(
            "Session {id} opened ({}, {} message(s) left)",
            config.language,
            quota.remaining()
        );
        Self {
            id,
            config,
            conversation,
            quota,
            localizer,
            handler: Box::new(NoopHandler),
            sent: 0,
        }
    }

    /// Attach `handler`. It receives a [`ChatEvent::StateChanged`] with the
    /// current snapshot straight away.
    pub fn with_event_handler(mut self, handler: Box<dyn EventHandler>) -> Self {
        self.handler = handler;
        self.publish();
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn config(&self) -> &ChatConfig {
        &self.config
    }

    pub fn language(&self) -> &str {
        &self.config.language
    }

    pub fn conversation(&self) -> &Conversation {
        &self.conversation
    }

    pub fn quota_remaining(&self) -> u32 {
        self.quota.remaining()
    }

    pub fn quota_state(&self) -> QuotaState {
        self.quota.state()
    }

    pub fn quota_snapshot(&self) -> QuotaSnapshot {
        QuotaSnapshot {
            remaining: self.quota.remaining(),
            max: self.quota.max(),
            state: self.quota.state(),
        }
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            id: self.id.clone(),
            language: self.config.language.clone(),
            language_code: language_code(&self.config.language),
            quota: self.quota_snapshot(),
            turns: self.conversation.turns().to_vec(),
        }
    }

    /// Replace the conversation with a fresh greeting. The quota is untouched.
    pub fn reset(&mut self) {
        let greeting = self.localizer.greeting(&self.config.language).to_string();
        self.conversation.reset(Turn::assistant_text(greeting));
        self.emit(&ChatEvent::Reset);
        self.publish();
    }

    /// Switch the reply language. An untouched conversation gets its
    /// greeting re-issued in the new language.
    pub fn set_language(&mut self, language: impl Into<String>) {
        self.config.language = language.into();
        if self.conversation.len() == 1 {
            let greeting = self.localizer.greeting(&self.config.language).to_string();
            self.conversation.reset(Turn::assistant_text(greeting));
        }
        let language = self.config.language.clone();
        self.emit(&ChatEvent::LanguageChanged {
            language: &language,
        });
        self.publish();
    }

    pub async fn send_text(
        &mut self,
        backend: &dyn CompletionBackend,
        text: impl Into<String>,
    ) -> SendOutcome {
        self.send(backend, vec![Part::text(text)]).await
    }

    /// Send one user message and wait for Chef Eva's answer.
    pub async fn send(&mut self, backend: &dyn CompletionBackend, parts: Vec<Part>) -> SendOutcome {
        let localizer = self.localizer;
        let catalog = localizer.catalog(&self.config.language);
        let turn = Turn::user(parts);

        if !turn.has_content() {
            self.emit(&ChatEvent::EmptyMessage);
            return SendOutcome::EmptyMessage {
                message: catalog.empty_message.clone(),
            };
        }
        if self.quota.is_exhausted() {
            self.emit(&ChatEvent::QuotaExhausted);
            return SendOutcome::QuotaExhausted {
                message: catalog.quota_exhausted.clone(),
            };
        }

        self.sent += 1;
        let request_id = generate_request_id(&self.id, self.sent);
        let window = self
            .config
            .context_budget()
            .build(self.conversation.turns(), turn.clone());
        self.emit(&ChatEvent::ContextBuilt {
            request_id: &request_id,
            window: &window,
        });

        let request = CompletionRequest::new(self.config.persona.clone(), window.current_turn)
            .with_history(window.history)
            .with_language(self.config.language.clone())
            .with_format(ReplyFormat::Text);
        let no_reply = catalog.no_reply.clone();

        let attempt = match SendAttempt::begin(self, &request_id, turn) {
            Ok(attempt) => attempt,
            Err(QuotaDenied) => {
                return SendOutcome::QuotaExhausted {
                    message: catalog.quota_exhausted.clone(),
                };
            }
        };

        // Dropping this future while awaiting rolls the attempt back.
        let result = backend.complete(request).await;

        match result {
            Ok(reply) => match reply.usable_text() {
                Some(text) => {
                    let text = text.to_string();
                    attempt.commit(Turn::assistant_text(text.clone()));
                    self.emit(&ChatEvent::Replied {
                        request_id: &request_id,
                        text: &text,
                    });
                    SendOutcome::Replied { text }
                }
                None => {
                    attempt.commit(Turn::assistant_text(no_reply.clone()));
                    self.emit(&ChatEvent::EmptyReply {
                        request_id: &request_id,
                    });
                    SendOutcome::NoReply { message: no_reply }
                }
            },
            Err(e) => {
                drop(attempt);
                let error = e.classify();
                self.emit(&ChatEvent::Failed {
                    request_id: &request_id,
                    error: &error,
                    raw: &e.message,
                });
                let message = self.localizer.localize(&error, &self.config.language);
                SendOutcome::Failed { error, message }
            }
        }
    }

    fn emit(&self, event: &ChatEvent<'_>) {
        self.handler.on_event(event);
    }

    fn publish(&self) {
        let snapshot = self.snapshot();
        self.emit(&ChatEvent::StateChanged {
            snapshot: &snapshot,
        });
    }
}

// ── Attempt guard ──────────────────────────────────────────────────

/// An in-flight send. Holds the quota unit and the appended user turn until
/// committed; dropping it uncommitted undoes both.
struct SendAttempt<'s> {
    session: &'s mut ChatSession,
    request_id: String,
    rollback_len: usize,
    committed: bool,
}

impl<'s> SendAttempt<'s> {
    fn begin(
        session: &'s mut ChatSession,
        request_id: &str,
        user_turn: Turn,
    ) -> Result<Self, QuotaDenied> {
        let remaining = match session.quota.try_consume() {
            Ok(remaining) => remaining,
            Err(denied) => {
                session.emit(&ChatEvent::QuotaExhausted);
                return Err(denied);
            }
        };
        let rollback_len = session.conversation.len();
        session.conversation.push(user_turn);
        session.emit(&ChatEvent::SendStarted {
            request_id,
            quota_remaining: remaining,
        });
        session.publish();
        Ok(Self {
            session,
            request_id: request_id.to_string(),
            rollback_len,
            committed: false,
        })
    }

    /// Keep the consumed quota and the user turn, and append the reply.
    fn commit(mut self, reply: Turn) {
        self.committed = true;
        self.session.conversation.push(reply);
        debug!(
            "[{}] committed, {} turn(s)",
            self.request_id,
            self.session.conversation.len()
        );
        self.session.publish();
    }
}

impl Drop for SendAttempt<'_> {
    fn drop(&mut self) {
        if self.committed {
            return;
        }
        self.session.conversation.rollback_to(self.rollback_len);
        let remaining = self.session.quota.refund();
        self.session.emit(&ChatEvent::RolledBack {
            request_id: &self.request_id,
            quota_remaining: remaining,
        });
        self.session.publish();
    }
}
