//! Embeddings-search collaborator surface
//!
//! The similarity-search subsystem is fully external to this crate: vector
//! math, storage, and model internals live elsewhere. This module only
//! defines the interface the rest of the system talks to, as explicit
//! trait types chosen at construction time.

use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Opaque handle to an embedded text
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct VectorId(pub String);

/// One search result record, ordered by relevance by the collaborator
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchHit {
    /// The matched text
    pub text: String,
    /// Tags attached to the matched text
    pub tags: Vec<String>,
    /// Collaborator-reported relevance score
    pub score: f64,
}

/// Search parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchParams {
    /// Maximum number of results to return
    #[serde(default = "default_limit")]
    pub limit: usize,
    /// Tags a result must carry
    #[serde(default)]
    pub must_have: Vec<String>,
    /// Tags a result must not carry
    #[serde(default = "default_must_not_have")]
    pub must_not_have: Vec<String>,
}

fn default_limit() -> usize {
    3
}

fn default_must_not_have() -> Vec<String> {
    // Query scratch texts are tagged so they never come back as results.
    vec!["search terms".to_string(), "search term".to_string()]
}

impl Default for SearchParams {
    fn default() -> Self {
        Self {
            limit: default_limit(),
            must_have: Vec::new(),
            must_not_have: default_must_not_have(),
        }
    }
}

/// External embeddings/search collaborator
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait EmbeddingIndex: Send + Sync {
    /// Embed a text under the given tags and return its handle
    async fn get_embedding(&self, text: &str, tags: &[String]) -> Result<VectorId>;

    /// Search for texts similar to the given vector
    async fn search(&self, vector: &VectorId, params: &SearchParams) -> Result<Vec<SearchHit>>;
}
