//! Base completion-client trait and common wire types for Parlance
//!
//! This module defines the CompletionClient trait that all completion
//! backends implement, along with the message and token-usage types shared
//! across the crate.

use crate::error::{ParlanceError, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Role of a message in a conversation
///
/// Only these three roles exist; anything else is rejected at the string
/// parsing boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Message supplied by the end user
    User,
    /// Instruction-level message supplied by the operator
    System,
    /// Message produced by the completion backend
    Assistant,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::User => write!(f, "user"),
            Self::System => write!(f, "system"),
            Self::Assistant => write!(f, "assistant"),
        }
    }
}

impl FromStr for Role {
    type Err = ParlanceError;

    /// Parse a role from its lowercase wire form
    ///
    /// # Examples
    ///
    /// ```
    /// use parlance::providers::Role;
    ///
    /// let role: Role = "user".parse().unwrap();
    /// assert_eq!(role, Role::User);
    /// assert!("narrator".parse::<Role>().is_err());
    /// ```
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "user" => Ok(Self::User),
            "system" => Ok(Self::System),
            "assistant" => Ok(Self::Assistant),
            other => Err(ParlanceError::UnknownRole(other.to_string())),
        }
    }
}

/// Message structure for a conversation
///
/// Messages are immutable once appended to a session log; the only way to
/// remove one is an explicit rollback. Order is meaningful and duplicate
/// messages are never merged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /// Role of the message sender
    pub role: Role,
    /// Content of the message
    pub content: String,
}

impl Message {
    /// Creates a new message with an explicit role
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }

    /// Creates a new user message
    ///
    /// # Examples
    ///
    /// ```
    /// use parlance::providers::{Message, Role};
    ///
    /// let msg = Message::user("Hello, assistant!");
    /// assert_eq!(msg.role, Role::User);
    /// ```
    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    /// Creates a new assistant message
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }

    /// Creates a new system message
    pub fn system(content: impl Into<String>) -> Self {
        Self::new(Role::System, content)
    }
}

/// Token usage information from a completion
///
/// Tracks the number of tokens used in prompts and completions,
/// as reported by the completion backend.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct TokenUsage {
    /// Number of tokens in the prompt
    pub prompt_tokens: usize,
    /// Number of tokens in the completion
    pub completion_tokens: usize,
    /// Total tokens used (prompt + completion)
    pub total_tokens: usize,
}

impl TokenUsage {
    /// Create a new TokenUsage instance
    ///
    /// # Examples
    ///
    /// ```
    /// use parlance::providers::TokenUsage;
    ///
    /// let usage = TokenUsage::new(100, 50);
    /// assert_eq!(usage.total_tokens, 150);
    /// ```
    pub fn new(prompt_tokens: usize, completion_tokens: usize) -> Self {
        let total_tokens = prompt_tokens + completion_tokens;
        Self {
            prompt_tokens,
            completion_tokens,
            total_tokens,
        }
    }
}

/// A generated reply plus its token-usage metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionResponse {
    /// The generated reply text
    pub content: String,
    /// Token usage reported by the backend
    pub usage: TokenUsage,
}

/// Trait for chat-completion backends
///
/// Given an ordered message list, a backend returns a generated reply plus
/// token-usage metadata. Generation parameters are fixed by the
/// implementation: a single completion with deterministic sampling.
///
/// An error payload from the remote service must not panic; it is returned
/// as an error value and the caller decides how to surface it. The trait
/// carries no retry or timeout policy; that is a caller responsibility.
#[async_trait]
pub trait CompletionClient: Send + Sync {
    /// Request a completion for the given message sequence
    async fn complete(&self, messages: &[Message]) -> Result<CompletionResponse>;

    /// Backend name, used in logs
    fn name(&self) -> &str;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_parse_valid() {
        assert_eq!("user".parse::<Role>().unwrap(), Role::User);
        assert_eq!("system".parse::<Role>().unwrap(), Role::System);
        assert_eq!("assistant".parse::<Role>().unwrap(), Role::Assistant);
    }

    #[test]
    fn test_role_parse_rejects_unknown() {
        let err = "moderator".parse::<Role>().unwrap_err();
        assert!(err.to_string().contains("moderator"));
    }

    #[test]
    fn test_role_parse_rejects_mixed_case() {
        // The wire form is lowercase; anything else is not a valid role.
        assert!("User".parse::<Role>().is_err());
    }

    #[test]
    fn test_role_display_roundtrip() {
        for role in [Role::User, Role::System, Role::Assistant] {
            let parsed: Role = role.to_string().parse().unwrap();
            assert_eq!(parsed, role);
        }
    }

    #[test]
    fn test_message_constructors() {
        assert_eq!(Message::user("hi").role, Role::User);
        assert_eq!(Message::system("hi").role, Role::System);
        assert_eq!(Message::assistant("hi").role, Role::Assistant);
    }

    #[test]
    fn test_message_serialization_uses_lowercase_roles() {
        let msg = Message::user("hello");
        let json = serde_json::to_string(&msg).unwrap();
        assert!(json.contains(r#""role":"user""#));
    }

    #[test]
    fn test_message_structural_equality() {
        let a = vec![Message::user("hi"), Message::assistant("hello")];
        let b = vec![Message::user("hi"), Message::assistant("hello")];
        let c = vec![Message::user("hi"), Message::assistant("hello!")];
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_token_usage_totals() {
        let usage = TokenUsage::new(10, 5);
        assert_eq!(usage.prompt_tokens, 10);
        assert_eq!(usage.completion_tokens, 5);
        assert_eq!(usage.total_tokens, 15);
    }
}
