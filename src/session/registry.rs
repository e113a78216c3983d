//! Session registry: exclusive owner of all conversation sessions
//!
//! The registry maps ids to sessions, supports lookup by id or by content
//! filter, and derives "successor" sessions by summarizing a conversation
//! and restarting it under the same id with only the summary carried
//! forward.

use crate::cache::ResponseCache;
use crate::error::{ParlanceError, Result};
use crate::moderation::ModerationGate;
use crate::providers::{CompletionClient, Message, Role};
use crate::session::ConversationSession;

use std::collections::HashMap;
use std::str::FromStr;
use std::sync::Arc;

/// Summarization prompt sent in the user's voice
const SUMMARIZE_AS_USER: &str = "You have a limited context window, so I need you to summarize \
what we have talked about and what your job is, so I can create a new instance of you with that \
summary in its memory. Write it as a message to a future instance of yourself.";

/// Summarization prompt sent in the operator's voice
const SUMMARIZE_AS_SYSTEM: &str = "Attention: your context limit is reaching its maximum. Please \
summarize the current conversation, so that a future assistant can take over from here.";

/// Which voice asks for the summary when deriving a successor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SummaryVariant {
    /// Summarization request phrased as a user message
    FromUser,
    /// Summarization request phrased as a system message
    FromSystem,
}

impl SummaryVariant {
    /// The templated summarization-request message for this variant
    fn template(&self) -> Message {
        match self {
            Self::FromUser => Message::new(Role::User, SUMMARIZE_AS_USER),
            Self::FromSystem => Message::new(Role::System, SUMMARIZE_AS_SYSTEM),
        }
    }
}

impl FromStr for SummaryVariant {
    type Err = ParlanceError;

    /// Parse the string tag form; unknown tags are a hard error
    ///
    /// # Examples
    ///
    /// ```
    /// use parlance::session::SummaryVariant;
    ///
    /// let variant: SummaryVariant = "from user".parse().unwrap();
    /// assert_eq!(variant, SummaryVariant::FromUser);
    /// assert!("from nobody".parse::<SummaryVariant>().is_err());
    /// ```
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "from user" => Ok(Self::FromUser),
            "from system" => Ok(Self::FromSystem),
            other => Err(ParlanceError::UnknownTemplateTag(other.to_string())),
        }
    }
}

/// Content filter for [`SessionRegistry::find_by`]
///
/// Carries at most two filters; a session qualifies if it satisfies either
/// active one. With no active filter nothing matches.
#[derive(Debug, Clone, Default)]
pub struct SessionFilter {
    rendered_contains: Option<String>,
    has_message: Option<(Role, String)>,
}

impl SessionFilter {
    /// Create an empty filter
    pub fn new() -> Self {
        Self::default()
    }

    /// Match sessions whose rendered text contains the given substring
    pub fn rendered_contains(mut self, term: impl Into<String>) -> Self {
        self.rendered_contains = Some(term.into());
        self
    }

    /// Match sessions holding a message with exactly this role and content
    pub fn has_message(mut self, role: Role, content: impl Into<String>) -> Self {
        self.has_message = Some((role, content.into()));
        self
    }

    /// Set a filter from its string key form, as used by the CLI
    ///
    /// Supported keys are `general_match` (value: substring) and
    /// `role_match` (value: `role=content`). Unknown keys are a hard error:
    /// they indicate caller misuse, not a runtime condition.
    pub fn set_keyed(&mut self, key: &str, value: &str) -> Result<()> {
        match key {
            "general_match" => {
                self.rendered_contains = Some(value.to_string());
                Ok(())
            }
            "role_match" => {
                let (role, content) = value.split_once('=').ok_or_else(|| {
                    ParlanceError::Config(format!(
                        "role_match value must be role=content, got {:?}",
                        value
                    ))
                })?;
                self.has_message = Some((role.parse()?, content.to_string()));
                Ok(())
            }
            other => {
                Err(ParlanceError::Config(format!("Unknown filter key: {}", other)).into())
            }
        }
    }

    fn matches(&self, session: &ConversationSession) -> bool {
        if let Some(term) = &self.rendered_contains {
            if session.render_as_text().contains(term.as_str()) {
                return true;
            }
        }
        if let Some((role, content)) = &self.has_message {
            if session
                .messages()
                .iter()
                .any(|m| m.role == *role && m.content == *content)
            {
                return true;
            }
        }
        false
    }
}

/// Owner of the full session collection
///
/// A session has no existence outside the registry's map once created.
/// Collaborators are handed to each new session by reference.
pub struct SessionRegistry {
    sessions: HashMap<String, ConversationSession>,
    client: Arc<dyn CompletionClient>,
    gate: Arc<dyn ModerationGate>,
    cache: Option<Arc<ResponseCache>>,
}

impl SessionRegistry {
    /// Create an empty registry
    pub fn new(
        client: Arc<dyn CompletionClient>,
        gate: Arc<dyn ModerationGate>,
        cache: Option<Arc<ResponseCache>>,
    ) -> Self {
        Self {
            sessions: HashMap::new(),
            client,
            gate,
            cache,
        }
    }

    /// Insert a fresh empty session under `id`
    ///
    /// Returns false (and changes nothing) when the id is already present;
    /// an existing session is never clobbered.
    pub fn create(&mut self, id: &str) -> bool {
        if self.sessions.contains_key(id) {
            return false;
        }
        let session = ConversationSession::new(
            id,
            self.client.clone(),
            self.gate.clone(),
            self.cache.clone(),
        );
        self.sessions.insert(id.to_string(), session);
        tracing::info!("Session created: id={}", id);
        true
    }

    /// Remove the session under `id`, freeing the id
    ///
    /// Returns whether an entry existed and was removed.
    pub fn delete(&mut self, id: &str) -> bool {
        let removed = self.sessions.remove(id).is_some();
        if removed {
            tracing::info!("Session deleted: id={}", id);
        }
        removed
    }

    /// Look up a session by id
    pub fn find(&self, id: &str) -> Option<&ConversationSession> {
        self.sessions.get(id)
    }

    /// Look up a session by id for mutation
    pub fn find_mut(&mut self, id: &str) -> Option<&mut ConversationSession> {
        self.sessions.get_mut(id)
    }

    /// Number of live sessions
    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }

    /// Ids of all live sessions, unordered
    pub fn ids(&self) -> Vec<&str> {
        self.sessions.keys().map(|s| s.as_str()).collect()
    }

    /// All sessions satisfying at least one active filter
    pub fn find_by(&self, filter: &SessionFilter) -> Vec<&ConversationSession> {
        self.sessions
            .values()
            .filter(|s| filter.matches(s))
            .collect()
    }

    /// Replace a session with a successor seeded from its summary
    ///
    /// Appends the templated summarization request to the session's log,
    /// obtains the summary via the completion client (bypassing the cache;
    /// summarization prompts are one-shot), deletes the original session,
    /// creates a fresh one under the same id, and appends the summary as
    /// its only assistant message. The registry size is unchanged.
    ///
    /// Returns `Ok(false)` when no session exists under `id`. A completion
    /// failure propagates as an error; the original session then retains
    /// the appended summarization request.
    pub async fn derive_successor(&mut self, id: &str, variant: SummaryVariant) -> Result<bool> {
        let session = match self.sessions.get_mut(id) {
            Some(session) => session,
            None => return Ok(false),
        };

        let template = variant.template();
        session.append(template.role, template.content);

        let response = self.client.complete(session.messages()).await?;
        let summary = response.content;

        self.sessions.remove(id);
        let mut successor = ConversationSession::new(
            id,
            self.client.clone(),
            self.gate.clone(),
            self.cache.clone(),
        );
        successor.append(Role::Assistant, summary);
        self.sessions.insert(id.to_string(), successor);

        tracing::info!("Successor created: id={}", id);
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::PromptRole;
    use crate::test_utils::{failing_client, stub_client, stub_gate, CountingClient};

    fn registry(client: Arc<dyn CompletionClient>) -> SessionRegistry {
        SessionRegistry::new(client, stub_gate(false), None)
    }

    #[test]
    fn test_create_twice_returns_false_second_time() {
        let mut r = registry(stub_client("ok"));
        assert!(r.create("a"));
        assert!(!r.create("a"));
        assert_eq!(r.session_count(), 1);
    }

    #[test]
    fn test_create_does_not_clobber_existing_session() {
        let mut r = registry(stub_client("ok"));
        r.create("a");
        r.find_mut("a").unwrap().append(Role::User, "kept");

        assert!(!r.create("a"));
        assert_eq!(r.find("a").unwrap().len(), 1);
    }

    #[test]
    fn test_delete_returns_whether_removed() {
        let mut r = registry(stub_client("ok"));
        r.create("a");
        assert!(r.delete("a"));
        assert!(!r.delete("a"));
        assert_eq!(r.session_count(), 0);
    }

    #[test]
    fn test_find_missing_returns_none() {
        let r = registry(stub_client("ok"));
        assert!(r.find("ghost").is_none());
    }

    #[test]
    fn test_find_by_rendered_substring() {
        let mut r = registry(stub_client("ok"));
        r.create("greets");
        r.find_mut("greets").unwrap().append(Role::User, "hello world");
        r.create("other");
        r.find_mut("other").unwrap().append(Role::User, "goodbye");

        let filter = SessionFilter::new().rendered_contains("hello");
        let found = r.find_by(&filter);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id(), "greets");
    }

    #[test]
    fn test_find_by_exact_role_content_pair() {
        let mut r = registry(stub_client("ok"));
        r.create("a");
        r.find_mut("a").unwrap().append(Role::User, "hello");
        r.create("b");
        // Same content under a different role must not match.
        r.find_mut("b").unwrap().append(Role::Assistant, "hello");

        let filter = SessionFilter::new().has_message(Role::User, "hello");
        let found = r.find_by(&filter);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id(), "a");
    }

    #[test]
    fn test_find_by_or_semantics() {
        let mut r = registry(stub_client("ok"));
        r.create("a");
        r.find_mut("a").unwrap().append(Role::User, "alpha");
        r.create("b");
        r.find_mut("b").unwrap().append(Role::User, "beta");

        let filter = SessionFilter::new()
            .rendered_contains("alpha")
            .has_message(Role::User, "beta");
        assert_eq!(r.find_by(&filter).len(), 2);
    }

    #[test]
    fn test_find_by_empty_filter_matches_nothing() {
        let mut r = registry(stub_client("ok"));
        r.create("a");
        assert!(r.find_by(&SessionFilter::new()).is_empty());
    }

    #[test]
    fn test_filter_keyed_unknown_key_is_hard_error() {
        let mut filter = SessionFilter::new();
        assert!(filter.set_keyed("general_match", "hello").is_ok());
        assert!(filter.set_keyed("role_match", "user=hi").is_ok());
        assert!(filter.set_keyed("fuzzy_match", "hello").is_err());
        assert!(filter.set_keyed("role_match", "no-separator").is_err());
    }

    #[test]
    fn test_summary_variant_parse_tags() {
        assert_eq!(
            "from user".parse::<SummaryVariant>().unwrap(),
            SummaryVariant::FromUser
        );
        assert_eq!(
            "from system".parse::<SummaryVariant>().unwrap(),
            SummaryVariant::FromSystem
        );
        assert!("from elsewhere".parse::<SummaryVariant>().is_err());
    }

    #[tokio::test]
    async fn test_derive_successor_replaces_log_with_summary() {
        let mut r = registry(stub_client("the summary"));
        r.create("a");
        {
            let s = r.find_mut("a").unwrap();
            s.append(Role::User, "hello");
            s.append(Role::Assistant, "hi there");
        }
        let count_before = r.session_count();

        assert!(r
            .derive_successor("a", SummaryVariant::FromUser)
            .await
            .unwrap());

        assert_eq!(r.session_count(), count_before);
        let successor = r.find("a").unwrap();
        assert_eq!(successor.len(), 1);
        assert_eq!(successor.messages()[0].role, Role::Assistant);
        assert_eq!(successor.messages()[0].content, "the summary");
    }

    #[tokio::test]
    async fn test_derive_successor_sends_template_to_client() {
        let counting = Arc::new(CountingClient::new("summary"));
        let mut r = registry(counting.clone());
        r.create("a");
        r.find_mut("a").unwrap().append(Role::User, "hello");

        r.derive_successor("a", SummaryVariant::FromSystem)
            .await
            .unwrap();

        assert_eq!(counting.calls(), 1);
        let last_request = counting.last_request().unwrap();
        assert_eq!(last_request.len(), 2);
        assert_eq!(last_request[1].role, Role::System);
        assert!(last_request[1].content.contains("context limit"));
    }

    #[tokio::test]
    async fn test_derive_successor_missing_id_returns_false() {
        let mut r = registry(stub_client("ok"));
        assert!(!r
            .derive_successor("ghost", SummaryVariant::FromUser)
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn test_derive_successor_bypasses_cache() {
        use tempfile::TempDir;

        let dir = TempDir::new().unwrap();
        let cache =
            Arc::new(crate::cache::ResponseCache::open(dir.path().join("cache.json")).unwrap());
        let counting = Arc::new(CountingClient::new("summary"));
        let mut r = SessionRegistry::new(counting.clone(), stub_gate(false), Some(cache.clone()));
        r.create("a");
        r.find_mut("a").unwrap().append(Role::User, "hello");

        r.derive_successor("a", SummaryVariant::FromUser)
            .await
            .unwrap();

        assert_eq!(counting.calls(), 1);
        assert!(cache.is_empty().unwrap());
    }

    #[tokio::test]
    async fn test_derive_successor_error_keeps_original_session() {
        let mut r = registry(failing_client());
        r.create("a");
        r.find_mut("a").unwrap().append(Role::User, "hello");

        assert!(r
            .derive_successor("a", SummaryVariant::FromUser)
            .await
            .is_err());

        // Original session survives with the appended summarization request.
        let session = r.find("a").unwrap();
        assert_eq!(session.len(), 2);
        assert_eq!(session.messages()[0].content, "hello");
    }

    #[tokio::test]
    async fn test_sessions_share_one_client() {
        let counting = Arc::new(CountingClient::new("shared"));
        let mut r = registry(counting.clone());
        r.create("a");
        r.create("b");

        r.find_mut("a")
            .unwrap()
            .talk(PromptRole::User, "one", false)
            .await
            .unwrap();
        r.find_mut("b")
            .unwrap()
            .talk(PromptRole::User, "two", false)
            .await
            .unwrap();

        assert_eq!(counting.calls(), 2);
    }
}
