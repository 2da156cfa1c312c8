//! Conversational front end: inbound events, per-actor sessions and the
//! state machine that turns them into catalog edits.

pub mod auth;
pub mod engine;
pub mod event;
pub mod poller;
pub mod session;
mod views;

pub use auth::AdminGuard;
pub use engine::{ConversationEngine, Outcome, Turn};
pub use event::{Action, ActorId, Event, Reply};
pub use session::{Session, StateKind};
