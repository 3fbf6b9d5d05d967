//! Episodic memory store with automatic consolidation.
//!
//! Each agent owns one [`MemoryStore`]: an append-only, time-ordered
//! sequence of [`MemoryItem`] records. Items carry a monotonic sequence
//! number as their ordering key, so insertion order and timestamp order
//! agree structurally and identical wall-clock timestamps cannot reorder
//! anything.
//!
//! # Consolidation
//!
//! When the live item count exceeds the configured limit, the store keeps
//! the newest `keep` items and collapses everything older into exactly one
//! summary item, produced by the text-generation service. The check runs
//! as a detached background task so [`MemoryStore::add`] never blocks on
//! summarization. A single-flight guard (try-lock on an async mutex)
//! collapses concurrent triggers into one pass; eviction and summary
//! insertion happen atomically under the item lock. If generation fails,
//! a fixed placeholder summary is used -- the evicted items are removed
//! either way.
//!
//! # Search
//!
//! `search` delegates to a [`VectorIndex`] collaborator. The default
//! [`LexicalIndex`] ranks stored texts by token overlap with the query;
//! an external vector database can be slotted in behind the same trait.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use terrarium_llm::Summarizer;

/// Fallback summary text used when the generation service fails.
const PLACEHOLDER_SUMMARY: &str = "Several events occurred.";

/// Sizing policy for one memory store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemoryConfig {
    /// Consolidation triggers when the live item count exceeds this.
    pub limit: usize,
    /// Number of newest items left untouched by consolidation.
    pub keep: usize,
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self { limit: 50, keep: 10 }
    }
}

/// Whether an item is a raw experience or a consolidation product.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MemoryKind {
    /// A directly perceived event.
    Episodic,
    /// A synthesized summary of evicted episodic items.
    Summary,
}

/// One record in the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemoryItem {
    /// Monotonic per-store ordering key.
    pub seq: u64,
    /// The remembered text.
    pub text: String,
    /// Episodic or summary.
    pub kind: MemoryKind,
    /// Wall-clock creation time (informational; `seq` is authoritative).
    pub created_at: DateTime<Utc>,
}

/// Similarity lookup collaborator backing [`MemoryStore::search`].
///
/// The store keeps the index in sync with its contents: every add
/// inserts, every consolidation removes the evicted entries and inserts
/// the summary.
pub trait VectorIndex: Send + Sync {
    /// Register a stored text under the item's sequence number.
    fn insert(&self, seq: u64, text: &str);
    /// Forget a batch of evicted items.
    fn remove(&self, seqs: &[u64]);
    /// Rank stored texts against `query`, best match first, at most `k`.
    fn query(&self, query: &str, k: usize) -> Vec<String>;
}

/// In-process token-overlap index.
///
/// Scores each stored text by the number of lowercase tokens it shares
/// with the query, breaking ties toward newer items.
#[derive(Debug, Default)]
pub struct LexicalIndex {
    entries: Mutex<BTreeMap<u64, String>>,
}

impl LexicalIndex {
    /// Create an empty index.
    pub fn new() -> Self {
        Self::default()
    }
}

/// Lowercase whitespace/punctuation tokens of a text.
fn tokenize(text: &str) -> BTreeSet<String> {
    text.to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(ToOwned::to_owned)
        .collect()
}

impl VectorIndex for LexicalIndex {
    fn insert(&self, seq: u64, text: &str) {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries.insert(seq, text.to_owned());
    }

    fn remove(&self, seqs: &[u64]) {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        for seq in seqs {
            entries.remove(seq);
        }
    }

    fn query(&self, query: &str, k: usize) -> Vec<String> {
        let query_tokens = tokenize(query);
        let entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);

        let mut scored: Vec<(usize, u64, &String)> = entries
            .iter()
            .map(|(seq, text)| {
                let score = tokenize(text).intersection(&query_tokens).count();
                (score, *seq, text)
            })
            .collect();

        // Best score first; newer items win ties.
        scored.sort_by(|a, b| b.0.cmp(&a.0).then(b.1.cmp(&a.1)));
        scored
            .into_iter()
            .take(k)
            .map(|(_, _, text)| text.clone())
            .collect()
    }
}

/// Shared interior of a [`MemoryStore`].
struct StoreInner {
    /// Live items in sequence order.
    items: Mutex<Vec<MemoryItem>>,
    /// Next ordering key.
    next_seq: AtomicU64,
    /// Single-flight consolidation guard.
    pass: tokio::sync::Mutex<()>,
    /// Sizing policy.
    config: MemoryConfig,
    /// Summary producer.
    summarizer: Summarizer,
    /// Similarity index kept in sync with `items`.
    index: Box<dyn VectorIndex>,
}

/// One agent's episodic memory.
///
/// Cheap to clone; clones share the same store.
#[derive(Clone)]
pub struct MemoryStore {
    inner: Arc<StoreInner>,
}

impl MemoryStore {
    /// Create a store with the default [`LexicalIndex`].
    pub fn new(config: MemoryConfig, summarizer: Summarizer) -> Self {
        Self::with_index(config, summarizer, Box::new(LexicalIndex::new()))
    }

    /// Create a store over a custom similarity index.
    pub fn with_index(
        config: MemoryConfig,
        summarizer: Summarizer,
        index: Box<dyn VectorIndex>,
    ) -> Self {
        Self {
            inner: Arc::new(StoreInner {
                items: Mutex::new(Vec::new()),
                next_seq: AtomicU64::new(0),
                pass: tokio::sync::Mutex::new(()),
                config,
                summarizer,
                index,
            }),
        }
    }

    /// Append an episodic item and trigger the consolidation check as a
    /// detached background task. Never blocks on summarization.
    pub fn add(&self, text: impl Into<String>) {
        let text = text.into();
        let seq = self.inner.next_seq.fetch_add(1, Ordering::Relaxed);

        let count = {
            let mut items = self
                .inner
                .items
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            items.push(MemoryItem {
                seq,
                text: text.clone(),
                kind: MemoryKind::Episodic,
                created_at: Utc::now(),
            });
            items.len()
        };
        self.inner.index.insert(seq, &text);

        if count > self.inner.config.limit {
            let store = self.clone();
            tokio::spawn(async move {
                store.try_consolidate().await;
            });
        }
    }

    /// The `n` most recently added texts, newest first.
    ///
    /// Returns everything when the store holds fewer than `n` items.
    pub fn recent(&self, n: usize) -> Vec<String> {
        let items = self
            .inner
            .items
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        items.iter().rev().take(n).map(|m| m.text.clone()).collect()
    }

    /// Similarity-ranked lookup against stored content.
    ///
    /// Returns at most `k` texts, best match first; empty when the store
    /// is empty.
    pub fn search(&self, query: &str, k: usize) -> Vec<String> {
        if self.len() == 0 {
            return Vec::new();
        }
        self.inner.index.query(query, k)
    }

    /// Number of live items (episodic + summary).
    pub fn len(&self) -> usize {
        self.inner
            .items
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Whether the store holds no items.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// A snapshot copy of all live items in order.
    pub fn snapshot(&self) -> Vec<MemoryItem> {
        self.inner
            .items
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Background-trigger entry point: runs a pass unless one is already
    /// in flight, in which case this is a no-op.
    async fn try_consolidate(&self) {
        let Ok(_guard) = self.inner.pass.try_lock() else {
            return;
        };
        self.run_pass().await;
    }

    /// Run a consolidation pass, waiting for any in-flight pass first.
    ///
    /// The threshold is re-checked after acquiring the guard, so calling
    /// this after background triggers have settled leaves the store at
    /// exactly `keep + 1` items (or untouched if under the limit).
    pub async fn consolidate(&self) {
        let _guard = self.inner.pass.lock().await;
        self.run_pass().await;
    }

    /// The consolidation pass body. Caller must hold the pass guard.
    async fn run_pass(&self) {
        let evicted: Vec<MemoryItem> = {
            let items = self
                .inner
                .items
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            if items.len() <= self.inner.config.limit {
                return;
            }
            let evict_count = items.len().saturating_sub(self.inner.config.keep);
            items.iter().take(evict_count).cloned().collect()
        };
        if evicted.is_empty() {
            return;
        }

        let texts: Vec<String> = evicted.iter().map(|m| m.text.clone()).collect();
        let summary_text = match self.inner.summarizer.summarize(&texts).await {
            Ok(summary) if !summary.trim().is_empty() => summary,
            Ok(_) => PLACEHOLDER_SUMMARY.to_owned(),
            Err(e) => {
                warn!(error = %e, "memory summarization failed, using placeholder");
                PLACEHOLDER_SUMMARY.to_owned()
            }
        };

        let evicted_seqs: BTreeSet<u64> = evicted.iter().map(|m| m.seq).collect();
        let summary_seq = self.inner.next_seq.fetch_add(1, Ordering::Relaxed);

        // Eviction and summary insertion are one atomic swap under the
        // item lock: concurrent readers see either the old items or the
        // summary, never a half-consolidated state.
        let remaining = {
            let mut items = self
                .inner
                .items
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            items.retain(|m| !evicted_seqs.contains(&m.seq));
            items.push(MemoryItem {
                seq: summary_seq,
                text: summary_text.clone(),
                kind: MemoryKind::Summary,
                created_at: Utc::now(),
            });
            items.len()
        };

        let removed: Vec<u64> = evicted_seqs.into_iter().collect();
        self.inner.index.remove(&removed);
        self.inner.index.insert(summary_seq, &summary_text);

        debug!(
            evicted = removed.len(),
            remaining,
            "memory consolidation pass complete"
        );
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;

    use terrarium_llm::{PromptSet, ScriptedGenerator, TextGenerator};

    use super::*;

    fn store_with(config: MemoryConfig, generator: ScriptedGenerator) -> MemoryStore {
        let summarizer = Summarizer::new(
            Arc::new(TextGenerator::scripted(generator)),
            Arc::new(PromptSet::new().unwrap()),
        );
        MemoryStore::new(config, summarizer)
    }

    #[tokio::test]
    async fn recent_returns_newest_first() {
        let store = store_with(MemoryConfig::default(), ScriptedGenerator::failing());
        store.add("first");
        store.add("second");
        store.add("third");
        assert_eq!(store.recent(2), vec!["third", "second"]);
        assert_eq!(store.recent(10), vec!["third", "second", "first"]);
    }

    #[tokio::test]
    async fn no_consolidation_at_or_under_limit() {
        let config = MemoryConfig { limit: 5, keep: 2 };
        let store = store_with(config, ScriptedGenerator::failing());
        for i in 0..5 {
            store.add(format!("event {i}"));
        }
        store.consolidate().await;
        assert_eq!(store.len(), 5);
        let texts = store.recent(5);
        assert_eq!(texts.first().map(String::as_str), Some("event 4"));
        assert_eq!(texts.last().map(String::as_str), Some("event 0"));
    }

    #[tokio::test]
    async fn exceeding_limit_collapses_to_keep_plus_summary() {
        let config = MemoryConfig { limit: 5, keep: 2 };
        let store = store_with(
            config,
            ScriptedGenerator::always("They spent four days gathering."),
        );
        for i in 0..6 {
            store.add(format!("event {i}"));
        }
        store.consolidate().await;

        assert_eq!(store.len(), 3);
        let texts = store.recent(10);
        assert_eq!(texts.len(), 3);
        // Newest first: summary was appended after the kept originals.
        assert_eq!(
            texts.first().map(String::as_str),
            Some("They spent four days gathering.")
        );
        assert!(texts.contains(&"event 5".to_owned()));
        assert!(texts.contains(&"event 4".to_owned()));
        assert!(!texts.contains(&"event 0".to_owned()));

        let summaries: Vec<MemoryItem> = store
            .snapshot()
            .into_iter()
            .filter(|m| m.kind == MemoryKind::Summary)
            .collect();
        assert_eq!(summaries.len(), 1);
    }

    #[tokio::test]
    async fn generation_failure_still_evicts_with_placeholder() {
        let config = MemoryConfig { limit: 5, keep: 2 };
        let store = store_with(config, ScriptedGenerator::failing());
        for i in 0..6 {
            store.add(format!("event {i}"));
        }
        store.consolidate().await;

        assert_eq!(store.len(), 3);
        let summary = store
            .snapshot()
            .into_iter()
            .find(|m| m.kind == MemoryKind::Summary)
            .unwrap();
        assert!(!summary.text.is_empty());
        assert_eq!(summary.text, PLACEHOLDER_SUMMARY);
    }

    #[tokio::test]
    async fn background_trigger_settles_at_keep_plus_one() {
        let config = MemoryConfig { limit: 5, keep: 2 };
        let store = store_with(config, ScriptedGenerator::always("A busy stretch."));
        for i in 0..6 {
            store.add(format!("event {i}"));
        }
        // The background task may or may not have finished; the public
        // entry point waits for it and re-checks the threshold.
        store.consolidate().await;
        assert_eq!(store.len(), 3);
    }

    #[tokio::test]
    async fn seq_order_survives_consolidation() {
        let config = MemoryConfig { limit: 3, keep: 1 };
        let store = store_with(config, ScriptedGenerator::always("summary"));
        for i in 0..4 {
            store.add(format!("event {i}"));
        }
        store.consolidate().await;
        let snapshot = store.snapshot();
        let seqs: Vec<u64> = snapshot.iter().map(|m| m.seq).collect();
        let mut sorted = seqs.clone();
        sorted.sort_unstable();
        assert_eq!(seqs, sorted);
    }

    #[tokio::test]
    async fn search_is_empty_on_empty_store() {
        let store = store_with(MemoryConfig::default(), ScriptedGenerator::failing());
        assert!(store.search("anything", 5).is_empty());
    }

    #[tokio::test]
    async fn search_ranks_by_token_overlap() {
        let store = store_with(MemoryConfig::default(), ScriptedGenerator::failing());
        store.add("Bob shared berries with Alice");
        store.add("rain fell all day");
        store.add("Alice thanked Bob for the berries");

        let results = store.search("berries from Bob", 2);
        assert_eq!(results.len(), 2);
        assert!(results.first().unwrap().contains("berries"));
        assert!(!results.contains(&"rain fell all day".to_owned()));
    }

    #[test]
    fn tokenize_ignores_case_and_punctuation() {
        let tokens = tokenize("Hello, World! hello");
        assert_eq!(tokens.len(), 2);
        assert!(tokens.contains("hello"));
        assert!(tokens.contains("world"));
    }
}
