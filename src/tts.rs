//! Text-to-speech collaborator surface
//!
//! Speech synthesis and playback are fully external to this crate: audio
//! models, voices, and output devices live elsewhere. This module only
//! defines the interface the rest of the system talks to, plus a helper
//! for the one place the engine uses it: speaking the latest reply.

use crate::error::Result;
use crate::providers::Role;
use crate::session::ConversationSession;
use async_trait::async_trait;
use std::path::{Path, PathBuf};

/// External text-to-speech collaborator
///
/// Synthesis renders text to an audio file on disk; playback takes that
/// path back. Keeping the two steps separate lets callers cache or inspect
/// the rendered audio before playing it.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TtsHandler: Send + Sync {
    /// Render the given text to an audio file and return its path
    async fn get_tts(&self, text: &str) -> Result<PathBuf>;

    /// Play a previously rendered audio file
    async fn play_tts(&self, path: &Path) -> Result<()>;
}

/// Speak a session's most recent message when it is an assistant reply
///
/// Returns `Ok(false)` without touching the handler when the log is empty
/// or its last message is not from the assistant; only generated replies
/// are ever spoken.
pub async fn speak_last(
    session: &ConversationSession,
    handler: &dyn TtsHandler,
) -> Result<bool> {
    let last = match session.messages().last() {
        Some(message) if message.role == Role::Assistant => message,
        _ => return Ok(false),
    };

    let path = handler.get_tts(&last.content).await?;
    handler.play_tts(&path).await?;
    tracing::debug!("Spoke last reply: id={}, audio={}", session.id(), path.display());
    Ok(true)
}
