//! Parlance - Moderated conversation sessions with response caching
//!
//! This library provides a conversation-session engine: ordered message
//! logs with moderated turns, an exact-match response cache with
//! write-through persistence, and a registry that owns sessions and can
//! derive summarized successors.
//!
//! # Architecture
//!
//! The library is organized into the following modules:
//!
//! - `session`: Conversation sessions, turn handling, and the registry
//! - `providers`: Completion-client abstraction and the OpenAI implementation
//! - `moderation`: Safety-classification gate run before each turn
//! - `cache`: Content-addressable response cache
//! - `persist`: Durable-form trait and format dispatch
//! - `search`: External embeddings/search collaborator surface
//! - `tts`: External text-to-speech collaborator surface
//! - `config`: Configuration management and validation
//! - `error`: Error types and result aliases
//! - `cli`: Command-line interface definition
//!
//! # Example
//!
//! ```no_run
//! use parlance::config::Config;
//! use parlance::moderation::OpenAiModerationGate;
//! use parlance::providers::create_client;
//! use parlance::session::{PromptRole, SessionRegistry};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::load("config.yaml")?;
//!     config.validate()?;
//!
//!     let client = create_client(&config.provider)?;
//!     let gate = Arc::new(OpenAiModerationGate::new(config.moderation.clone())?);
//!
//!     let mut registry = SessionRegistry::new(client, gate, None);
//!     registry.create("demo");
//!     let session = registry.find_mut("demo").expect("just created");
//!     let outcome = session.talk(PromptRole::User, "hello", true).await?;
//!     println!("{:?}", outcome.reply());
//!     Ok(())
//! }
//! ```

pub mod cache;
pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
pub mod moderation;
pub mod persist;
pub mod providers;
pub mod search;
pub mod session;
pub mod tts;

// Re-export commonly used types
pub use cache::{CacheEntry, InvestigateSpec, ResponseCache};
pub use config::Config;
pub use error::{ParlanceError, Result};
pub use providers::{CompletionClient, Message, Role};
pub use session::{ConversationSession, PromptRole, SessionRegistry, TurnOutcome};

#[cfg(test)]
pub mod test_utils;
