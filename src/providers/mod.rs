//! Completion-client module for Parlance
//!
//! This module contains the completion-client abstraction and the
//! OpenAI-compatible implementation.

pub mod base;
pub mod openai;

pub use base::{CompletionClient, CompletionResponse, Message, Role, TokenUsage};
pub use openai::OpenAiClient;

use crate::config::ProviderConfig;
use crate::error::Result;
use std::sync::Arc;

/// Create a completion client based on configuration
///
/// The client is constructed once at startup and shared by reference with
/// the session registry and every session it creates.
///
/// # Errors
///
/// Returns error if the provider type is unknown or initialization fails
pub fn create_client(config: &ProviderConfig) -> Result<Arc<dyn CompletionClient>> {
    match config.provider_type.as_str() {
        "openai" => Ok(Arc::new(OpenAiClient::new(config.openai.clone())?)),
        other => Err(crate::error::ParlanceError::Config(format!(
            "Unknown provider type: {}",
            other
        ))
        .into()),
    }
}
