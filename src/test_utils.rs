//! Test utilities for Parlance
//!
//! This module provides common test utilities including temporary directory
//! management, test file creation, and stub collaborators for exercising
//! sessions without a network.

use crate::error::{ParlanceError, Result};
use crate::moderation::{ModerationGate, ModerationVerdict};
use crate::providers::{CompletionClient, CompletionResponse, Message, TokenUsage};
use async_trait::async_trait;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

/// Create a temporary directory for testing
///
/// # Returns
///
/// Returns a TempDir that will be cleaned up when dropped
///
/// # Examples
///
/// ```
/// use parlance::test_utils::temp_dir;
///
/// let dir = temp_dir();
/// let path = dir.path();
/// // Use the temporary directory
/// ```
pub fn temp_dir() -> TempDir {
    TempDir::new().expect("Failed to create temporary directory")
}

/// Create a test file with the given content
///
/// # Arguments
///
/// * `dir` - Directory to create the file in
/// * `name` - Name of the file
/// * `content` - Content to write to the file
///
/// # Returns
///
/// Returns the path to the created file
///
/// # Panics
///
/// Panics if file creation or writing fails
///
/// # Examples
///
/// ```
/// use parlance::test_utils::{temp_dir, create_test_file};
///
/// let dir = temp_dir();
/// let file_path = create_test_file(&dir, "test.txt", "content");
/// ```
pub fn create_test_file(dir: &TempDir, name: &str, content: &str) -> PathBuf {
    let path = dir.path().join(name);
    std::fs::write(&path, content).expect("Failed to write test file");
    path
}

struct StubClient {
    reply: String,
}

#[async_trait]
impl CompletionClient for StubClient {
    async fn complete(&self, _messages: &[Message]) -> Result<CompletionResponse> {
        Ok(CompletionResponse {
            content: self.reply.clone(),
            usage: TokenUsage::new(0, 0),
        })
    }

    fn name(&self) -> &str {
        "stub"
    }
}

/// Completion client that always answers with the given reply
///
/// # Examples
///
/// ```
/// use parlance::test_utils::stub_client;
///
/// let client = stub_client("hello");
/// assert_eq!(client.name(), "stub");
/// ```
pub fn stub_client(reply: &str) -> Arc<dyn CompletionClient> {
    Arc::new(StubClient {
        reply: reply.to_string(),
    })
}

struct FailingClient;

#[async_trait]
impl CompletionClient for FailingClient {
    async fn complete(&self, _messages: &[Message]) -> Result<CompletionResponse> {
        Err(ParlanceError::Client("simulated completion failure".to_string()).into())
    }

    fn name(&self) -> &str {
        "failing"
    }
}

/// Completion client whose every call fails
pub fn failing_client() -> Arc<dyn CompletionClient> {
    Arc::new(FailingClient)
}

struct StubGate {
    flagged: bool,
}

#[async_trait]
impl ModerationGate for StubGate {
    async fn check(&self, _text: &str) -> Result<ModerationVerdict> {
        Ok(ModerationVerdict {
            flagged: self.flagged,
            categories: HashMap::new(),
        })
    }
}

/// Moderation gate with a fixed verdict
pub fn stub_gate(flagged: bool) -> Arc<dyn ModerationGate> {
    Arc::new(StubGate { flagged })
}

/// Completion client that records its calls
///
/// Answers with a fixed reply while counting invocations and retaining the
/// most recent request, so tests can assert exactly what reached the
/// backend.
pub struct CountingClient {
    reply: String,
    calls: AtomicUsize,
    last_request: Mutex<Option<Vec<Message>>>,
}

impl CountingClient {
    /// Create a counting client answering with `reply`
    pub fn new(reply: &str) -> Self {
        Self {
            reply: reply.to_string(),
            calls: AtomicUsize::new(0),
            last_request: Mutex::new(None),
        }
    }

    /// Number of completed calls so far
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// The messages of the most recent call, if any
    pub fn last_request(&self) -> Option<Vec<Message>> {
        self.last_request
            .lock()
            .expect("last_request lock poisoned")
            .clone()
    }
}

#[async_trait]
impl CompletionClient for CountingClient {
    async fn complete(&self, messages: &[Message]) -> Result<CompletionResponse> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self
            .last_request
            .lock()
            .expect("last_request lock poisoned") = Some(messages.to_vec());
        Ok(CompletionResponse {
            content: self.reply.clone(),
            usage: TokenUsage::new(0, 0),
        })
    }

    fn name(&self) -> &str {
        "counting"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_temp_dir_creation() {
        let dir = temp_dir();
        assert!(dir.path().exists());
    }

    #[test]
    fn test_create_test_file() {
        let dir = temp_dir();
        let path = create_test_file(&dir, "test.txt", "content");
        assert!(path.exists());
        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(content, "content");
    }

    #[tokio::test]
    async fn test_stub_client_replies() {
        let client = stub_client("hi");
        let response = client.complete(&[Message::user("x")]).await.unwrap();
        assert_eq!(response.content, "hi");
    }

    #[tokio::test]
    async fn test_failing_client_fails() {
        let client = failing_client();
        assert!(client.complete(&[Message::user("x")]).await.is_err());
    }

    #[tokio::test]
    async fn test_stub_gate_verdict() {
        assert!(stub_gate(true).check("anything").await.unwrap().flagged);
        assert!(!stub_gate(false).check("anything").await.unwrap().flagged);
    }

    #[tokio::test]
    async fn test_counting_client_records_calls() {
        let client = CountingClient::new("pong");
        assert_eq!(client.calls(), 0);
        assert!(client.last_request().is_none());

        client.complete(&[Message::user("ping")]).await.unwrap();

        assert_eq!(client.calls(), 1);
        let request = client.last_request().unwrap();
        assert_eq!(request[0].content, "ping");
    }
}
