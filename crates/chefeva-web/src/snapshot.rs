//! [`EventHandler`] that keeps a shared copy of the session for REST reads.
//!
//! The chat session stays locked for the whole of a send, which can last as
//! long as the model takes to answer. [`SnapshotPublisher`] copies each
//! [`ChatEvent::StateChanged`] snapshot into its own mutex so
//! `GET /api/session` never waits on the remote call.

use std::sync::{Arc, Mutex, PoisonError};

use chefeva::chat::{ChatEvent, EventHandler, SessionSnapshot};

/// Latest published [`SessionSnapshot`], shared between the session's event
/// handler and the request handlers.
#[derive(Clone)]
pub struct SnapshotPublisher {
    latest: Arc<Mutex<SessionSnapshot>>,
}

impl SnapshotPublisher {
    pub fn new(initial: SessionSnapshot) -> Self {
        Self {
            latest: Arc::new(Mutex::new(initial)),
        }
    }

    pub fn current(&self) -> SessionSnapshot {
        self.latest
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn language(&self) -> String {
        self.latest
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .language
            .clone()
    }
}

impl EventHandler for SnapshotPublisher {
    fn on_event(&self, event: &ChatEvent<'_>) {
        if let ChatEvent::StateChanged { snapshot } = event {
            *self.latest.lock().unwrap_or_else(PoisonError::into_inner) = (*snapshot).clone();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chefeva::chat::{ChatConfig, ChatSession};
    use chefeva::quota::MemoryQuotaStore;

    #[test]
    fn follows_session_changes() {
        let session = ChatSession::open(ChatConfig::default(), Arc::new(MemoryQuotaStore::new()));
        let publisher = SnapshotPublisher::new(session.snapshot());
        let mut session = session.with_event_handler(Box::new(publisher.clone()));

        session.set_language("Italiano");
        assert_eq!(publisher.language(), "Italiano");
        assert_eq!(publisher.current(), session.snapshot());
    }

    #[test]
    fn ignores_other_events() {
        let session = ChatSession::open(ChatConfig::default(), Arc::new(MemoryQuotaStore::new()));
        let publisher = SnapshotPublisher::new(session.snapshot());
        publisher.on_event(&ChatEvent::Reset);
        publisher.on_event(&ChatEvent::LanguageChanged { language: "Deutsch" });
        assert_eq!(publisher.language(), "English");
    }
}
