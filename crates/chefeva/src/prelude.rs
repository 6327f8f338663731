//! Convenience re-exports for common `chefeva` types.
//!
//! ```ignore
//! use chefeva::prelude::*;
//! ```
//!
//! Covers what a front end needs to run chat sessions and generation
//! flows: the OpenRouter client and backend, session + config, event
//! handlers, quota stores, the localizer, and recipe types. Lower-level
//! pieces (template internals, schema validation, wire message types) are
//! left in their modules.

// ── Remote calls ────────────────────────────────────────────────────
pub use crate::api::{
    ClassifiedError, CompletionBackend, CompletionError, CompletionFuture, CompletionReply,
    CompletionRequest, ErrorKind, OpenRouterBackend, ReplyFormat, classify,
};
pub use crate::{OpenRouterClient, json_schema_for};

// ── Chat ────────────────────────────────────────────────────────────
pub use crate::chat::{
    ChatConfig, ChatEvent, ChatSession, CompositeEventHandler, EventHandler, LoggingHandler,
    NoopHandler, QuotaSnapshot, SendOutcome, SessionSnapshot,
};
pub use crate::context::{ContextBudget, build_context};
pub use crate::conversation::{Conversation, Media, Part, Role, Turn};
pub use crate::i18n::Localizer;
pub use crate::quota::{FileQuotaStore, MemoryQuotaStore, QuotaState, QuotaStore, QuotaTracker};

// ── Generation ──────────────────────────────────────────────────────
pub use crate::recipe::{
    GenerationError, Menu, MenuRequest, Recipe, RecipeConfig, RecipeGenerator, RecipeRequest,
};
