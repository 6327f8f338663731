//! Conversation turns and the append-only conversation log.
//!
//! A [`Turn`] is one message from either the user or Chef Eva, made of
//! ordered [`Part`]s (text and/or an attached media reference). A
//! [`Conversation`] is owned by exactly one chat session: it only grows by
//! appending, and is replaced wholesale on reset.

use serde::{Deserialize, Serialize};

// ── Turns ──────────────────────────────────────────────────────────

/// Author of a turn.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::User => write!(f, "user"),
            Role::Assistant => write!(f, "assistant"),
        }
    }
}

/// A media attachment referenced by URL (photo of the fridge, a dish, ...).
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Media {
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,
}

/// One piece of a turn. Either field may be absent; a part with neither is
/// allowed but carries nothing.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
pub struct Part {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub media: Option<Media>,
}

impl Part {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            media: None,
        }
    }

    pub fn media(url: impl Into<String>, content_type: Option<String>) -> Self {
        Self {
            text: None,
            media: Some(Media {
                url: url.into(),
                content_type,
            }),
        }
    }

    /// Whether the part carries any non-blank text or a media reference.
    pub fn has_content(&self) -> bool {
        self.media.is_some() || self.text.as_deref().is_some_and(|t| !t.trim().is_empty())
    }
}

/// A single message in the conversation.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct Turn {
    pub role: Role,
    pub parts: Vec<Part>,
}

impl Turn {
    pub fn new(role: Role, parts: Vec<Part>) -> Self {
        Self { role, parts }
    }

    pub fn user(parts: Vec<Part>) -> Self {
        Self::new(Role::User, parts)
    }

    pub fn user_text(text: impl Into<String>) -> Self {
        Self::new(Role::User, vec![Part::text(text)])
    }

    pub fn assistant_text(text: impl Into<String>) -> Self {
        Self::new(Role::Assistant, vec![Part::text(text)])
    }

    /// Concatenated text of all parts, separated by newlines.
    pub fn text(&self) -> String {
        self.parts
            .iter()
            .filter_map(|p| p.text.as_deref())
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Whether any part carries content.
    pub fn has_content(&self) -> bool {
        self.parts.iter().any(Part::has_content)
    }
}

// ── Conversation ───────────────────────────────────────────────────

/// Ordered, append-only log of turns for one chat session.
///
/// Insertion order is chronological order. The log is never spliced; the
/// only ways it shrinks are [`reset`](Self::reset) (replace with a single
/// seed turn) and the crate-internal rollback of a failed send attempt to
/// the exact length it had before the attempt.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
pub struct Conversation {
    turns: Vec<Turn>,
}

impl Conversation {
    /// Create a conversation seeded with one turn (usually the greeting).
    pub fn seeded(seed: Turn) -> Self {
        Self { turns: vec![seed] }
    }

    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    pub fn last(&self) -> Option<&Turn> {
        self.turns.last()
    }

    pub fn push(&mut self, turn: Turn) {
        self.turns.push(turn);
    }

    /// Replace the whole conversation with a single seed turn.
    pub fn reset(&mut self, seed: Turn) {
        self.turns = vec![seed];
    }

    /// Drop every turn appended after `len`. No-op if already shorter.
    pub(crate) fn rollback_to(&mut self, len: usize) {
        self.turns.truncate(len);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn turn_constructors() {
        let user = Turn::user_text("I have leeks");
        assert_eq!(user.role, Role::User);
        assert_eq!(user.text(), "I have leeks");

        let eva = Turn::assistant_text("Let's make soup");
        assert_eq!(eva.role, Role::Assistant);
    }

    #[test]
    fn part_content_detection() {
        assert!(Part::text("salt").has_content());
        assert!(!Part::text("   ").has_content());
        assert!(!Part::default().has_content());
        assert!(Part::media("https://img/1.jpg", None).has_content());
    }

    #[test]
    fn turn_text_joins_parts_and_skips_media() {
        let turn = Turn::user(vec![
            Part::text("first"),
            Part::media("https://img/1.jpg", Some("image/jpeg".into())),
            Part::text("second"),
        ]);
        assert_eq!(turn.text(), "first\nsecond");
    }

    #[test]
    fn reset_replaces_everything_with_seed() {
        let mut conv = Conversation::seeded(Turn::assistant_text("hi"));
        conv.push(Turn::user_text("a"));
        conv.push(Turn::assistant_text("b"));
        conv.reset(Turn::assistant_text("hello again"));
        assert_eq!(conv.len(), 1);
        assert_eq!(conv.turns()[0].text(), "hello again");
    }

    #[test]
    fn rollback_restores_previous_length() {
        let mut conv = Conversation::seeded(Turn::assistant_text("hi"));
        let before = conv.len();
        conv.push(Turn::user_text("a"));
        conv.rollback_to(before);
        assert_eq!(conv.len(), 1);
        conv.rollback_to(5);
        assert_eq!(conv.len(), 1);
    }

    #[test]
    fn media_serializes_camel_case() {
        let part = Part::media("https://img/1.jpg", Some("image/png".into()));
        let json = serde_json::to_value(&part).unwrap();
        assert_eq!(json["media"]["contentType"], "image/png");
        assert!(json.get("text").is_none());
    }
}
