//! Session module for Parlance
//!
//! Contains the conversation-session engine and the registry that owns
//! every session.

pub mod conversation;
pub mod registry;

pub use conversation::{
    ConversationSession, PromptRole, TurnOutcome, MODERATION_STOP_REASON,
};
pub use registry::{SessionFilter, SessionRegistry, SummaryVariant};
