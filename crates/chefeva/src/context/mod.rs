//! Context window management for the chat assistant.
//!
//! The request sent to the model must stay bounded no matter how long the
//! conversation grows. [`budget`] estimates turn sizes and selects the most
//! recent suffix of the conversation that fits a fixed token budget, always
//! keeping the user's newest message. Dropped turns are not summarized.

pub mod budget;

pub use budget::{
    ContextBudget, ContextWindow, DEFAULT_CONTEXT_BUDGET, DEFAULT_MEDIA_PART_TOKENS,
    build_context,
};
