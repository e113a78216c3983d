//! Conversation session: an ordered message log with moderated turns
//!
//! A session owns one ordered message log. A turn appends a prompt, runs
//! the moderation gate over the rendered log, and only then contacts the
//! completion client, optionally consulting and filling the response
//! cache. A rejected turn leaves the log exactly as it was.
//!
//! Sessions carry no locking: callers must issue at most one in-flight
//! `talk`/`request_reply` per session at a time.

use crate::cache::ResponseCache;
use crate::error::{ParlanceError, Result};
use crate::moderation::ModerationGate;
use crate::providers::{CompletionClient, Message, Role};

use std::str::FromStr;
use std::sync::Arc;

/// Reason string returned when the moderation gate blocks a turn
pub const MODERATION_STOP_REASON: &str = "moderation stopped the conversation";

/// Roles permitted to initiate a turn
///
/// An assistant message cannot initiate a turn; it only ever enters the log
/// as a generated reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromptRole {
    /// Turn initiated by the end user
    User,
    /// Turn initiated by the operator
    System,
}

impl From<PromptRole> for Role {
    fn from(role: PromptRole) -> Self {
        match role {
            PromptRole::User => Role::User,
            PromptRole::System => Role::System,
        }
    }
}

impl FromStr for PromptRole {
    type Err = ParlanceError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "user" => Ok(Self::User),
            "system" => Ok(Self::System),
            other => Err(ParlanceError::UnknownRole(other.to_string())),
        }
    }
}

/// Outcome of a [`ConversationSession::talk`] turn
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TurnOutcome {
    /// The turn succeeded; the reply has been appended to the log
    Reply(String),
    /// The moderation gate blocked the turn; the log is unchanged
    Blocked {
        /// Human-readable reason for the rejection
        reason: String,
    },
}

impl TurnOutcome {
    /// The reply text, if the turn succeeded
    pub fn reply(&self) -> Option<&str> {
        match self {
            Self::Reply(text) => Some(text),
            Self::Blocked { .. } => None,
        }
    }
}

/// One ordered conversation with moderated turns and optional caching
///
/// Created empty by the session registry, mutated only through append and
/// rollback, and destroyed by explicit deletion or successor derivation.
pub struct ConversationSession {
    id: String,
    messages: Vec<Message>,
    client: Arc<dyn CompletionClient>,
    gate: Arc<dyn ModerationGate>,
    cache: Option<Arc<ResponseCache>>,
}

impl ConversationSession {
    /// Create an empty session
    ///
    /// Collaborators are constructed once at startup and shared with every
    /// session by reference.
    pub fn new(
        id: impl Into<String>,
        client: Arc<dyn CompletionClient>,
        gate: Arc<dyn ModerationGate>,
        cache: Option<Arc<ResponseCache>>,
    ) -> Self {
        let id = id.into();
        tracing::debug!("Session initialized: id={}", id);
        Self {
            id,
            messages: Vec::new(),
            client,
            gate,
            cache,
        }
    }

    /// The session's opaque identifier
    pub fn id(&self) -> &str {
        &self.id
    }

    /// The ordered message log
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// Number of messages in the log
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    /// Whether the log is empty
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Append a message to the log
    ///
    /// Messages are immutable once appended; the only way to remove one is
    /// [`rollback`](Self::rollback).
    pub fn append(&mut self, role: Role, content: impl Into<String>) {
        self.messages.push(Message::new(role, content));
    }

    /// Remove the most recently appended message
    ///
    /// No-op on an empty log.
    pub fn rollback(&mut self) {
        self.messages.pop();
    }

    /// Discard every message, keeping the session and its collaborators
    ///
    /// The session continues under the same id with an empty log.
    pub fn clear(&mut self) {
        tracing::debug!("Session log cleared: id={}", self.id);
        self.messages.clear();
    }

    /// Render the full log as deterministic human-readable text
    ///
    /// Each message renders as `"{role}: {content}"` with a blank line
    /// between messages, in log order, so a two-message log renders as
    /// `"user: hi\n\nassistant: hello"`. Used as moderation input and for
    /// search; never as a cache key.
    pub fn render_as_text(&self) -> String {
        self.messages
            .iter()
            .map(|m| format!("{}: {}", m.role, m.content))
            .collect::<Vec<_>>()
            .join("\n\n")
    }

    /// Request a reply for the current log
    ///
    /// Returns `Ok(None)` on an empty log without making any external
    /// call. With a cache attached, an exact-match hit short-circuits the
    /// completion client; a miss calls the client and writes the pair
    /// through before returning. Nothing is appended to the log here;
    /// callers decide whether and how to append the reply.
    ///
    /// A completion-service failure propagates as an error with the log
    /// unchanged, so the caller can retry without resubmitting the prompt.
    pub async fn request_reply(&self) -> Result<Option<String>> {
        if self.messages.is_empty() {
            tracing::debug!("Empty log, skipping completion call: id={}", self.id);
            return Ok(None);
        }

        if let Some(cache) = &self.cache {
            if let Some(hit) = cache.get(&self.messages)? {
                tracing::debug!("Cache hit: id={}", self.id);
                return Ok(Some(hit));
            }

            tracing::debug!("Cache miss, calling completion client: id={}", self.id);
            let response = self.client.complete(&self.messages).await?;
            cache.add(&self.messages, &response.content)?;
            return Ok(Some(response.content));
        }

        let response = self.client.complete(&self.messages).await?;
        tracing::debug!(
            "Reply received: id={}, total_tokens={}",
            self.id,
            response.usage.total_tokens
        );
        Ok(Some(response.content))
    }

    /// Run one full turn: append, moderate, reply
    ///
    /// 1. Appends the prompt under the given role.
    /// 2. With `auto_moderate`, renders the full log and passes it to the
    ///    moderation gate. A flagged verdict rolls the append back and
    ///    returns [`TurnOutcome::Blocked`]; the completion client is never
    ///    contacted.
    /// 3. Otherwise requests a reply, appends it as an assistant message,
    ///    and returns [`TurnOutcome::Reply`].
    ///
    /// A moderation- or completion-service failure is returned as an error
    /// with the appended prompt left in place; the caller may retry
    /// [`request_reply`](Self::request_reply) without resubmitting it.
    pub async fn talk(
        &mut self,
        role: PromptRole,
        content: impl Into<String>,
        auto_moderate: bool,
    ) -> Result<TurnOutcome> {
        self.append(role.into(), content);

        if auto_moderate {
            let verdict = self.gate.check(&self.render_as_text()).await?;
            if verdict.flagged {
                self.rollback();
                tracing::info!("Turn blocked by moderation: id={}", self.id);
                return Ok(TurnOutcome::Blocked {
                    reason: MODERATION_STOP_REASON.to_string(),
                });
            }
        }

        let reply = self.request_reply().await?.ok_or_else(|| {
            ParlanceError::Client("completion produced no reply for a non-empty log".to_string())
        })?;

        self.append(Role::Assistant, reply.clone());
        Ok(TurnOutcome::Reply(reply))
    }
}
