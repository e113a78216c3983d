//! Content-addressable response cache for Parlance
//!
//! Maps a structured request (an ordered message sequence) to a previously
//! computed reply, so repeated requests never pay for a second completion
//! call. Lookup is by exact structural match of the full sequence, served
//! through an index keyed by the SHA-256 digest of the canonical JSON
//! serialization of the input.
//!
//! Every mutation is written through to the backing file before the call
//! returns, so a crash never loses a just-written entry. Reads may happen
//! concurrently; writes are serialized behind a single write lock.

use crate::error::{ParlanceError, Result};
use crate::persist::{FileFormat, Persistable};
use crate::providers::Message;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::RwLock;

/// One cached request/response pair
///
/// Entries are not unique by input: `add` never deduplicates, so duplicate
/// inputs may coexist. `get`, `edit`, and `delete` always act on the first
/// match in storage order; `edit` is the supported way to supersede an
/// entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry {
    /// The exact ordered message sequence used as the request
    pub input: Vec<Message>,
    /// The reply computed for that request
    pub output: String,
}

impl Persistable for Vec<CacheEntry> {
    fn to_durable_form(&self, format: FileFormat) -> Result<String> {
        match format {
            FileFormat::Json => Ok(serde_json::to_string_pretty(self)?),
            FileFormat::Text => Err(ParlanceError::Persistence(
                "Cache entries require a structured format".to_string(),
            )
            .into()),
        }
    }

    fn from_durable_form(format: FileFormat, data: &str) -> Result<Self> {
        match format {
            FileFormat::Json => Ok(serde_json::from_str(data)?),
            FileFormat::Text => Err(ParlanceError::Persistence(
                "Cache entries require a structured format".to_string(),
            )
            .into()),
        }
    }
}

/// Filter specification for [`ResponseCache::investigate`]
///
/// Filters are combinable; an entry qualifies if it satisfies at least one
/// active filter. With no active filter nothing matches.
#[derive(Default)]
pub struct InvestigateSpec {
    simple_match: Option<String>,
    multi_match: Option<Vec<String>>,
    #[allow(clippy::type_complexity)]
    predicate: Option<Box<dyn Fn(&CacheEntry) -> bool + Send + Sync>>,
}

impl InvestigateSpec {
    /// Create an empty specification with no active filters
    pub fn new() -> Self {
        Self::default()
    }

    /// Match entries whose stringified form contains the given substring
    pub fn simple_match(mut self, term: impl Into<String>) -> Self {
        self.simple_match = Some(term.into());
        self
    }

    /// Match entries whose stringified form contains all of the given substrings
    pub fn multi_match(mut self, terms: Vec<String>) -> Self {
        self.multi_match = Some(terms);
        self
    }

    /// Match entries satisfying an arbitrary predicate
    pub fn predicate(mut self, f: impl Fn(&CacheEntry) -> bool + Send + Sync + 'static) -> Self {
        self.predicate = Some(Box::new(f));
        self
    }

    fn matches(&self, entry: &CacheEntry) -> bool {
        let stringified = stringify(entry);
        if let Some(term) = &self.simple_match {
            if stringified.contains(term.as_str()) {
                return true;
            }
        }
        if let Some(terms) = &self.multi_match {
            if !terms.is_empty() && terms.iter().all(|t| stringified.contains(t.as_str())) {
                return true;
            }
        }
        if let Some(predicate) = &self.predicate {
            if predicate(entry) {
                return true;
            }
        }
        false
    }
}

/// Entries plus the digest index over their canonical input serialization
struct CacheState {
    entries: Vec<CacheEntry>,
    index: HashMap<[u8; 32], Vec<usize>>,
}

impl CacheState {
    fn from_entries(entries: Vec<CacheEntry>) -> Self {
        let mut state = Self {
            entries,
            index: HashMap::new(),
        };
        state.rebuild_index();
        state
    }

    fn rebuild_index(&mut self) {
        self.index.clear();
        for (idx, entry) in self.entries.iter().enumerate() {
            self.index
                .entry(input_digest(&entry.input))
                .or_default()
                .push(idx);
        }
    }

    /// Index of the first entry whose input structurally equals `input`
    fn first_match(&self, input: &[Message]) -> Option<usize> {
        let candidates = self.index.get(&input_digest(input))?;
        candidates
            .iter()
            .copied()
            .find(|&idx| self.entries[idx].input == input)
    }
}

/// Content-addressable store of request/response pairs
///
/// # Examples
///
/// ```
/// use parlance::cache::ResponseCache;
/// use parlance::providers::Message;
/// # let dir = tempfile::TempDir::new().unwrap();
/// # let path = dir.path().join("cache.json");
///
/// let cache = ResponseCache::open(&path).unwrap();
/// let request = vec![Message::user("hi")];
/// cache.add(&request, "hello").unwrap();
/// assert_eq!(cache.get(&request).unwrap(), Some("hello".to_string()));
/// assert_eq!(cache.get(&[Message::user("bye")]).unwrap(), None);
/// ```
pub struct ResponseCache {
    path: PathBuf,
    state: RwLock<CacheState>,
}

impl ResponseCache {
    /// Open a cache backed by the given file, creating it when absent
    ///
    /// # Errors
    ///
    /// Returns error if the file exists but cannot be parsed, or if the
    /// initial empty store cannot be written.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let entries = if path.exists() {
            Vec::<CacheEntry>::load(&path)?
        } else {
            let empty = Vec::new();
            empty.save(&path)?;
            empty
        };

        tracing::info!(
            "Opened response cache: path={}, entries={}",
            path.display(),
            entries.len()
        );

        Ok(Self {
            path,
            state: RwLock::new(CacheState::from_entries(entries)),
        })
    }

    /// Look up the reply cached for an exact message sequence
    ///
    /// Returns the first match in storage order, or `Ok(None)`. A poisoned
    /// store is an error, never a miss: a silent miss here would send the
    /// caller back to the completion service.
    pub fn get(&self, input: &[Message]) -> Result<Option<String>> {
        let state = self.read_lock()?;
        Ok(state
            .first_match(input)
            .map(|idx| state.entries[idx].output.clone()))
    }

    /// Append a new entry and write the store through to disk
    ///
    /// Never deduplicates: adding the same input twice yields two entries.
    pub fn add(&self, input: &[Message], output: impl Into<String>) -> Result<()> {
        let mut state = self.write_lock()?;
        let idx = state.entries.len();
        state.entries.push(CacheEntry {
            input: input.to_vec(),
            output: output.into(),
        });
        state
            .index
            .entry(input_digest(input))
            .or_default()
            .push(idx);
        self.persist(&state)
    }

    /// Replace the output of the first entry matching `input`
    ///
    /// Returns whether a match was found; persists only when it was.
    pub fn edit(&self, input: &[Message], new_output: impl Into<String>) -> Result<bool> {
        let mut state = self.write_lock()?;
        match state.first_match(input) {
            Some(idx) => {
                state.entries[idx].output = new_output.into();
                self.persist(&state)?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Remove the first entry matching `input`
    ///
    /// Returns whether a match was found; persists only when it was.
    pub fn delete(&self, input: &[Message]) -> Result<bool> {
        let mut state = self.write_lock()?;
        match state.first_match(input) {
            Some(idx) => {
                state.entries.remove(idx);
                state.rebuild_index();
                self.persist(&state)?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Return all entries satisfying at least one active filter
    ///
    /// Preserves storage order and never yields an entry twice.
    pub fn investigate(&self, spec: &InvestigateSpec) -> Result<Vec<CacheEntry>> {
        let state = self.read_lock()?;
        Ok(state
            .entries
            .iter()
            .filter(|entry| spec.matches(entry))
            .cloned()
            .collect())
    }

    /// Number of stored entries
    pub fn len(&self) -> Result<usize> {
        Ok(self.read_lock()?.entries.len())
    }

    /// Whether the store holds no entries
    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }

    fn read_lock(&self) -> Result<std::sync::RwLockReadGuard<'_, CacheState>> {
        self.state
            .read()
            .map_err(|_| ParlanceError::Cache("cache lock poisoned".to_string()).into())
    }

    fn write_lock(&self) -> Result<std::sync::RwLockWriteGuard<'_, CacheState>> {
        self.state
            .write()
            .map_err(|_| ParlanceError::Cache("cache lock poisoned".to_string()).into())
    }

    /// Rewrite the full entry set while still holding the write lock
    fn persist(&self, state: &CacheState) -> Result<()> {
        state.entries.save(&self.path).map_err(|e| {
            ParlanceError::Cache(format!("failed to persist {}: {}", self.path.display(), e))
                .into()
        })
    }
}

/// SHA-256 digest of the canonical JSON serialization of a message sequence
fn input_digest(input: &[Message]) -> [u8; 32] {
    let canonical = serde_json::to_vec(input).unwrap_or_default();
    Sha256::digest(&canonical).into()
}

fn stringify(entry: &CacheEntry) -> String {
    serde_json::to_string(entry).unwrap_or_default()
}
