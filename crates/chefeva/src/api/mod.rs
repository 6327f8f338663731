//! Remote model interaction: the completion backend seam, error
//! classification, and correlation IDs.
//!
//! - [`backend`]: [`CompletionBackend`] trait, request/reply types, and the
//!   OpenRouter-backed production implementation.
//! - [`classify`]: maps failures onto [`ErrorKind`] categories, preferring
//!   HTTP status and falling back to message substrings.
//! - [`tracing`]: session and request IDs for log correlation.

pub mod backend;
pub mod classify;
pub mod tracing;

pub use backend::{
    CompletionBackend, CompletionError, CompletionFuture, CompletionReply, CompletionRequest,
    OpenRouterBackend, ReplyFormat,
};
pub use classify::{ClassifiedError, ErrorKind, classify, classify_with_status};
pub use tracing::{generate_request_id, generate_session_id};
