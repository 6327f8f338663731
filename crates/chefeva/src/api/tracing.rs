//! Correlation IDs for chat sessions and the messages sent within them.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::SystemTime;

/// Generate a unique ID for a chat session.
pub fn generate_session_id() -> String {
    let ts = SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos();
    // Counter disambiguates sessions opened within the same nanosecond.
    static COUNTER: AtomicU64 = AtomicU64::new(0);
    let count = COUNTER.fetch_add(1, Ordering::Relaxed);
    format!("ses-{ts:x}-{count:04x}")
}

/// ID for the `seq`-th message sent in a session.
pub fn generate_request_id(session_id: &str, seq: u64) -> String {
    format!("{session_id}:m{seq}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_ids_are_unique() {
        let a = generate_session_id();
        let b = generate_session_id();
        assert_ne!(a, b);
        assert!(a.starts_with("ses-"));
    }

    #[test]
    fn request_id_embeds_session() {
        assert_eq!(generate_request_id("ses-1-0000", 3), "ses-1-0000:m3");
    }
}
