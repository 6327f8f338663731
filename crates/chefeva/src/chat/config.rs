//! Configuration for a [`ChatSession`](super::ChatSession).
//!
//! ```
//! use chefeva::chat::ChatConfig;
//!
//! let config = ChatConfig::default()
//!     .with_language("Français")
//!     .with_context_budget(8_000)
//!     .with_max_quota(10);
//! assert_eq!(config.context_budget().max_tokens(), 8_000);
//! ```

use crate::context::{ContextBudget, DEFAULT_CONTEXT_BUDGET, DEFAULT_MEDIA_PART_TOKENS};
use crate::prompt::chef_eva_persona;
use crate::quota::{DEFAULT_MAX_QUOTA, DEFAULT_QUOTA_KEY};

/// Default conversation language.
pub const DEFAULT_LANGUAGE: &str = "English";

#[derive(Debug, Clone)]
pub struct ChatConfig {
    /// System persona sent with every message.
    pub persona: String,
    /// Human-readable language name used for replies and UI messages.
    pub language: String,
    /// Token ceiling for history plus the new message.
    pub context_tokens: usize,
    /// Token charge per attached media part.
    pub media_part_tokens: usize,
    /// Messages available to a fresh user.
    pub max_quota: u32,
    /// Storage key for the quota counter.
    pub quota_key: String,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            persona: chef_eva_persona(),
            language: DEFAULT_LANGUAGE.into(),
            context_tokens: DEFAULT_CONTEXT_BUDGET,
            media_part_tokens: DEFAULT_MEDIA_PART_TOKENS,
            max_quota: DEFAULT_MAX_QUOTA,
            quota_key: DEFAULT_QUOTA_KEY.into(),
        }
    }
}

impl ChatConfig {
    pub fn with_persona(mut self, persona: impl Into<String>) -> Self {
        self.persona = persona.into();
        self
    }

    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = language.into();
        self
    }

    pub fn with_context_budget(mut self, tokens: usize) -> Self {
        self.context_tokens = tokens;
        self
    }

    pub fn with_media_part_tokens(mut self, tokens: usize) -> Self {
        self.media_part_tokens = tokens;
        self
    }

    pub fn with_max_quota(mut self, max: u32) -> Self {
        self.max_quota = max;
        self
    }

    pub fn with_quota_key(mut self, key: impl Into<String>) -> Self {
        self.quota_key = key.into();
        self
    }

    pub fn context_budget(&self) -> ContextBudget {
        ContextBudget::new(self.context_tokens).with_media_part_tokens(self.media_part_tokens)
    }
}
