//! Chef Eva chat sessions.
//!
//! - [`config`]: [`ChatConfig`] with `with_*` builders.
//! - [`events`]: [`ChatEvent`] and the [`EventHandler`] family.
//! - [`session`]: [`ChatSession`], the transactional send, and the
//!   serializable [`SendOutcome`] / [`SessionSnapshot`].

pub mod config;
pub mod events;
pub mod session;

pub use config::{ChatConfig, DEFAULT_LANGUAGE};
pub use events::{ChatEvent, CompositeEventHandler, EventHandler, LoggingHandler, NoopHandler};
pub use session::{ChatSession, QuotaSnapshot, SendOutcome, SessionSnapshot};
