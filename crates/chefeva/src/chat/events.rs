//! Events emitted by a [`ChatSession`](super::ChatSession).
//!
//! The session reports every step of a send (quota consumed, context
//! built, reply received, rollback) through [`ChatEvent`]s. Callers
//! implement [`EventHandler`] to observe them.
//!
//! | Handler | Use case |
//! |---------|----------|
//! | [`NoopHandler`] | Tests, default |
//! | [`LoggingHandler`] | Structured logging via `tracing` |
//! | [`CompositeEventHandler`] | Several handlers in order |
//!
//! Front ends that render the session without holding it (the web server)
//! keep their own copy up to date from [`ChatEvent::StateChanged`].

use super::session::SessionSnapshot;
use crate::api::classify::ClassifiedError;
use crate::context::ContextWindow;
use tracing::{debug, info, trace, warn};

// ── Events ─────────────────────────────────────────────────────────

#[derive(Debug)]
pub enum ChatEvent<'a> {
    /// A send was accepted: quota consumed and user turn appended.
    SendStarted {
        request_id: &'a str,
        quota_remaining: u32,
    },
    /// The context window for the request was selected.
    ContextBuilt {
        request_id: &'a str,
        window: &'a ContextWindow,
    },
    /// The model answered.
    Replied { request_id: &'a str, text: &'a str },
    /// The model returned no usable text. The quota stays consumed.
    EmptyReply { request_id: &'a str },
    /// The remote call failed and was classified.
    Failed {
        request_id: &'a str,
        error: &'a ClassifiedError,
        raw: &'a str,
    },
    /// An attempt was undone (failure or cancellation): quota refunded and
    /// conversation restored.
    RolledBack {
        request_id: &'a str,
        quota_remaining: u32,
    },
    /// A send was refused because no messages are left.
    QuotaExhausted,
    /// A send was refused because it carried no content.
    EmptyMessage,
    /// The conversation was replaced with a fresh greeting.
    Reset,
    LanguageChanged { language: &'a str },
    /// Conversation, quota or language changed. Sent after every mutation,
    /// and once when a handler is attached.
    StateChanged { snapshot: &'a SessionSnapshot },
}

// ── Handlers ───────────────────────────────────────────────────────

/// Observer for [`ChatEvent`]s.
///
/// ```ignore
/// struct Counter(AtomicUsize);
///
/// impl EventHandler for Counter {
///     fn on_event(&self, event: &ChatEvent<'_>) {
///         if let ChatEvent::Replied { .. } = event {
///             self.0.fetch_add(1, Ordering::Relaxed);
///         }
///     }
/// }
/// ```
pub trait EventHandler: Send + Sync {
    fn on_event(&self, event: &ChatEvent<'_>) {
        let _ = event;
    }
}

/// Ignores every event.
pub struct NoopHandler;
impl EventHandler for NoopHandler {}

/// Dispatches each event to several handlers in registration order.
///
/// ```ignore
/// let handler = CompositeEventHandler::new()
///     .with(LoggingHandler)
///     .with(publisher.clone());
/// ```
pub struct CompositeEventHandler {
    handlers: Vec<Box<dyn EventHandler>>,
}

impl CompositeEventHandler {
    pub fn new() -> Self {
        Self {
            handlers: Vec::new(),
        }
    }

    pub fn with(mut self, handler: impl EventHandler + 'static) -> Self {
        self.handlers.push(Box::new(handler));
        self
    }
}

impl Default for CompositeEventHandler {
    fn default() -> Self {
        Self::new()
    }
}

impl EventHandler for CompositeEventHandler {
    fn on_event(&self, event: &ChatEvent<'_>) {
        for handler in &self.handlers {
            handler.on_event(event);
        }
    }
}

/// Logs events via `tracing`.
pub struct LoggingHandler;

impl EventHandler for LoggingHandler {
    fn on_event(&self, event: &ChatEvent<'_>) {
        match event {
            ChatEvent::SendStarted {
                request_id,
                quota_remaining,
            } => {
                info!("[{request_id}] send accepted, {quota_remaining} message(s) left");
            }
            ChatEvent::ContextBuilt { request_id, window } => {
                debug!("[{request_id}] {}", window.to_log_string());
            }
            ChatEvent::Replied { request_id, text } => {
                let preview: String = text.chars().take(200).collect();
                debug!(
                    "[{request_id}] reply: {preview}{}",
                    if text.chars().count() > 200 { "..." } else { "" }
                );
            }
            ChatEvent::EmptyReply { request_id } => {
                warn!("[{request_id}] model returned no usable text");
            }
            ChatEvent::Failed {
                request_id,
                error,
                raw,
            } => {
                warn!("[{request_id}] send failed ({}): {raw}", error.kind);
            }
            ChatEvent::RolledBack {
                request_id,
                quota_remaining,
            } => {
                info!("[{request_id}] rolled back, {quota_remaining} message(s) left");
            }
            ChatEvent::QuotaExhausted => info!("Send refused: message quota exhausted"),
            ChatEvent::EmptyMessage => debug!("Send refused: empty message"),
            ChatEvent::Reset => info!("Conversation reset"),
            ChatEvent::LanguageChanged { language } => info!("Language set to {language}"),
            ChatEvent::StateChanged { snapshot } => trace!(
                "Session {}: {} turn(s), {} message(s) left",
                snapshot.id,
                snapshot.turns.len(),
                snapshot.quota.remaining
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Counter(Arc<AtomicUsize>);

    impl EventHandler for Counter {
        fn on_event(&self, _event: &ChatEvent<'_>) {
            self.0.fetch_add(1, Ordering::Relaxed);
        }
    }

    #[test]
    fn composite_dispatches_to_all_handlers() {
        let a = Arc::new(AtomicUsize::new(0));
        let b = Arc::new(AtomicUsize::new(0));
        let handler = CompositeEventHandler::new()
            .with(Counter(a.clone()))
            .with(NoopHandler)
            .with(Counter(b.clone()))
            .with(LoggingHandler);
        handler.on_event(&ChatEvent::Reset);
        handler.on_event(&ChatEvent::QuotaExhausted);
        assert_eq!(a.load(Ordering::Relaxed), 2);
        assert_eq!(b.load(Ordering::Relaxed), 2);
    }
}
