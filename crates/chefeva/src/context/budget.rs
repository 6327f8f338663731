//! Context budget: estimates how much of the model's context a turn uses
//! and trims conversation history to the most recent turns that fit.
//!
//! Sizes are estimated, not tokenized: one token per whitespace-separated
//! word of text plus a flat charge for every attached media part.

use crate::conversation::Turn;

/// Default token ceiling for history + current message.
pub const DEFAULT_CONTEXT_BUDGET: usize = 50_000;

/// Flat token charge for each part carrying media.
pub const DEFAULT_MEDIA_PART_TOKENS: usize = 100;

/// Token budget used when building the context sent with each chat message.
///
/// # Example
///
/// ```
/// use chefeva::context::ContextBudget;
/// use chefeva::conversation::Turn;
///
/// let budget = ContextBudget::new(8);
/// let history = vec![
///     Turn::assistant_text("What is in your fridge today?"),
///     Turn::user_text("eggs and spinach"),
/// ];
/// let window = budget.build(&history, Turn::user_text("and some feta"));
///
/// assert_eq!(window.current_turn.text(), "and some feta");
/// assert_eq!(window.history.len(), 1);
/// assert_eq!(window.dropped_turns, 1);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContextBudget {
    /// Maximum estimated tokens across all selected turns.
    max_tokens: usize,
    /// Tokens charged per media part.
    media_part_tokens: usize,
}

impl Default for ContextBudget {
    fn default() -> Self {
        Self::new(DEFAULT_CONTEXT_BUDGET)
    }
}

impl ContextBudget {
    pub fn new(max_tokens: usize) -> Self {
        Self {
            max_tokens,
            media_part_tokens: DEFAULT_MEDIA_PART_TOKENS,
        }
    }

    /// Override the flat per-media charge.
    pub fn with_media_part_tokens(mut self, tokens: usize) -> Self {
        self.media_part_tokens = tokens;
        self
    }

    pub fn max_tokens(&self) -> usize {
        self.max_tokens
    }

    pub fn media_part_tokens(&self) -> usize {
        self.media_part_tokens
    }

    /// Estimated size of a single turn.
    pub fn turn_size(&self, turn: &Turn) -> usize {
        turn.parts
            .iter()
            .map(|part| {
                let words = part
                    .text
                    .as_deref()
                    .map_or(0, |t| t.split_whitespace().count());
                let media = if part.media.is_some() {
                    self.media_part_tokens
                } else {
                    0
                };
                words + media
            })
            .sum()
    }

    /// Select the most recent turns of `conversation ++ [new_turn]` that fit
    /// the budget.
    ///
    /// Walks from newest to oldest and stops at the first turn that would
    /// push the total over the budget. The newest turn is always selected,
    /// even when it alone exceeds the budget.
    pub fn build(&self, conversation: &[Turn], new_turn: Turn) -> ContextWindow {
        let newest_size = self.turn_size(&new_turn);
        let mut total = newest_size;
        let mut first_kept = conversation.len();

        for (idx, turn) in conversation.iter().enumerate().rev() {
            let size = self.turn_size(turn);
            if total + size > self.max_tokens {
                break;
            }
            total += size;
            first_kept = idx;
        }

        ContextWindow {
            history: conversation[first_kept..].to_vec(),
            current_turn: new_turn,
            estimated_tokens: total,
            dropped_turns: first_kept,
        }
    }
}

/// Convenience wrapper: build a context window with the default media charge.
pub fn build_context(conversation: &[Turn], new_turn: Turn, budget: usize) -> ContextWindow {
    ContextBudget::new(budget).build(conversation, new_turn)
}

/// Result of trimming a conversation to the budget.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContextWindow {
    /// Prior turns sent as context, oldest first.
    pub history: Vec<Turn>,
    /// The message being answered.
    pub current_turn: Turn,
    /// Estimated tokens of history plus current turn.
    pub estimated_tokens: usize,
    /// Number of older turns left out of the window.
    pub dropped_turns: usize,
}

impl ContextWindow {
    /// Format as a short log-friendly string.
    pub fn to_log_string(&self) -> String {
        format!(
            "context: {} history turn(s), ~{} tokens, {} dropped",
            self.history.len(),
            self.estimated_tokens,
            self.dropped_turns,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conversation::{Part, Role};

    fn words(n: usize) -> String {
        vec!["w"; n].join(" ")
    }

    fn user(n: usize) -> Turn {
        Turn::user_text(words(n))
    }

    fn eva(n: usize) -> Turn {
        Turn::assistant_text(words(n))
    }

    #[test]
    fn empty_conversation_yields_only_new_turn() {
        let window = build_context(&[], user(3), 10);
        assert!(window.history.is_empty());
        assert_eq!(window.current_turn, user(3));
        assert_eq!(window.dropped_turns, 0);
    }

    #[test]
    fn turn_size_counts_words_and_media() {
        let budget = ContextBudget::new(100);
        let turn = Turn::user(vec![
            Part::text("two  words"),
            Part::media("https://img/a.png", None),
            Part {
                text: Some("three more words".into()),
                media: Some(crate::conversation::Media {
                    url: "https://img/b.png".into(),
                    content_type: None,
                }),
            },
            Part::default(),
        ]);
        assert_eq!(budget.turn_size(&turn), 2 + 100 + 3 + 100);
    }

    #[test]
    fn custom_media_charge() {
        let budget = ContextBudget::new(100).with_media_part_tokens(7);
        let turn = Turn::user(vec![Part::media("https://img/a.png", None)]);
        assert_eq!(budget.turn_size(&turn), 7);
    }

    #[test]
    fn keeps_most_recent_suffix_that_fits() {
        let conversation = vec![eva(5), user(5), eva(5), user(5)];
        let window = build_context(&conversation, user(5), 16);
        // 5 (new) + 5 + 5 = 15 fits, one more would be 20.
        assert_eq!(window.history, conversation[2..].to_vec());
        assert_eq!(window.estimated_tokens, 15);
        assert_eq!(window.dropped_turns, 2);
    }

    #[test]
    fn stops_at_first_overflow_even_if_older_turns_are_small() {
        let conversation = vec![eva(1), user(50), eva(2)];
        let window = build_context(&conversation, user(2), 10);
        assert_eq!(window.history, vec![eva(2)]);
        assert_eq!(window.dropped_turns, 2);
    }

    #[test]
    fn budget_boundary_is_inclusive() {
        let conversation = vec![eva(4)];
        let window = build_context(&conversation, user(6), 10);
        assert_eq!(window.history.len(), 1);
        assert_eq!(window.estimated_tokens, 10);
    }

    #[test]
    fn oversize_newest_turn_is_sent_alone() {
        let conversation = vec![eva(1), user(1)];
        let window = build_context(&conversation, user(500), 10);
        assert!(window.history.is_empty());
        assert_eq!(window.current_turn.role, Role::User);
        assert_eq!(window.estimated_tokens, 500);
        assert_eq!(window.dropped_turns, 2);
    }

    #[test]
    fn zero_size_turns_always_fit() {
        let conversation = vec![eva(0), user(0), eva(0), user(0)];
        for budget in [0, 1, 50_000] {
            let window = build_context(&conversation, user(0), budget);
            assert_eq!(window.history, conversation);
            assert_eq!(window.dropped_turns, 0);
        }
    }

    #[test]
    fn zero_budget_keeps_only_newest_when_it_has_content() {
        let conversation = vec![eva(0), user(2)];
        let window = build_context(&conversation, user(1), 0);
        assert!(window.history.is_empty());
        assert_eq!(window.current_turn, user(1));
    }

    #[test]
    fn history_is_contiguous_suffix_for_many_budgets() {
        let conversation: Vec<Turn> = (0..12)
            .map(|i| if i % 2 == 0 { eva(i + 1) } else { user(i + 1) })
            .collect();
        let newest = user(3);
        for budget in 0..120 {
            let window = build_context(&conversation, newest.clone(), budget);
            assert_eq!(window.current_turn, newest);
            let start = conversation.len() - window.history.len();
            assert_eq!(window.history, conversation[start..].to_vec());
            assert_eq!(window.dropped_turns, start);
        }
    }

    #[test]
    fn log_string_mentions_counts() {
        let window = build_context(&[eva(2)], user(2), 100);
        let log = window.to_log_string();
        assert!(log.contains("1 history turn(s)"));
        assert!(log.contains("~4 tokens"));
    }
}
