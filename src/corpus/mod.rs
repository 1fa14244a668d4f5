//! Labeled example corpus with a versioned embedding index
//!
//! The corpus owns every example plus a monotonically increasing version
//! counter; the index is a derived cache of embeddings built from exactly
//! one corpus version. Queries always see a matching corpus/index pair:
//! stale indexes are rebuilt before use, and mutation is exclusive with
//! both rebuilds and lookups.
//!
//! Retrieval prefers semantic embeddings when a provider is configured.
//! The first semantic failure permanently degrades retrieval to the
//! hashed lexical method for the life of the corpus.

mod seeds;

use crate::config::EmbeddingConfig;
use crate::embeddings::{clamp_unit, cosine_similarity, EmbeddingProvider, LexicalEmbedder};
use crate::error::{QuadraError, Result};
use crate::types::{Evidence, Example, RetrievalMethod};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

/// Embedding index built from exactly one corpus version
struct IndexState {
    version: u64,
    method: RetrievalMethod,
    vectors: Vec<Vec<f32>>,
}

/// Interior state guarded by a single lock so that mutation, index
/// rebuilds, and lookups never interleave
struct CorpusInner {
    examples: Vec<Example>,
    version: u64,
    index: Option<IndexState>,
}

/// The labeled example corpus
pub struct ExampleCorpus {
    inner: RwLock<CorpusInner>,
    semantic: Option<Arc<dyn EmbeddingProvider>>,
    lexical: LexicalEmbedder,
    /// Set on the first semantic failure; never cleared
    semantic_degraded: AtomicBool,
}

impl ExampleCorpus {
    /// Create an empty corpus using only lexical retrieval
    pub fn new(config: &EmbeddingConfig) -> Self {
        Self::with_semantic_provider(config, None)
    }

    /// Create an empty corpus with an optional semantic provider
    pub fn with_semantic_provider(
        config: &EmbeddingConfig,
        semantic: Option<Arc<dyn EmbeddingProvider>>,
    ) -> Self {
        Self {
            inner: RwLock::new(CorpusInner {
                examples: Vec::new(),
                version: 0,
                index: None,
            }),
            semantic,
            lexical: LexicalEmbedder::new(config.lexical_dimensions),
            semantic_degraded: AtomicBool::new(false),
        }
    }

    /// Append a labeled example, returning the new corpus version.
    ///
    /// Texts are unique case-insensitively; a duplicate is rejected without
    /// touching the version counter.
    pub async fn append(&self, example: Example) -> Result<u64> {
        if example.text.trim().is_empty() {
            return Err(QuadraError::Validation(
                "Example text cannot be empty".to_string(),
            ));
        }

        let mut inner = self.inner.write().await;
        let lowered = example.text.to_lowercase();
        if inner
            .examples
            .iter()
            .any(|existing| existing.text.to_lowercase() == lowered)
        {
            return Err(QuadraError::DuplicateExample(example.text));
        }

        inner.examples.push(example);
        inner.version += 1;
        debug!(
            "Appended example, corpus now {} entries at version {}",
            inner.examples.len(),
            inner.version
        );
        Ok(inner.version)
    }

    /// Remove every example. The version still advances, so any index built
    /// against the pre-clear corpus is invalid.
    pub async fn clear(&self) -> u64 {
        let mut inner = self.inner.write().await;
        let removed = inner.examples.len();
        inner.examples.clear();
        inner.index = None;
        inner.version += 1;
        info!("Cleared {} examples, corpus at version {}", removed, inner.version);
        inner.version
    }

    /// Seed the built-in bilingual default examples (20 entries, 5 per
    /// quadrant). Returns the corpus version after seeding.
    pub async fn seed_defaults(&self) -> Result<u64> {
        let mut version = self.version().await;
        for example in seeds::default_examples() {
            version = self.append(example).await?;
        }
        info!("Seeded default examples, corpus at version {}", version);
        Ok(version)
    }

    /// Number of examples currently stored
    pub async fn len(&self) -> usize {
        self.inner.read().await.examples.len()
    }

    /// Whether the corpus holds no examples
    pub async fn is_empty(&self) -> bool {
        self.inner.read().await.examples.is_empty()
    }

    /// Current corpus version (bumped by every mutation, including clear)
    pub async fn version(&self) -> u64 {
        self.inner.read().await.version
    }

    /// Snapshot of all examples in insertion order
    pub async fn examples(&self) -> Vec<Example> {
        self.inner.read().await.examples.clone()
    }

    /// Version the index was built from, if one exists
    pub async fn index_version(&self) -> Option<u64> {
        self.inner.read().await.index.as_ref().map(|i| i.version)
    }

    /// Whether semantic retrieval has permanently degraded to lexical
    pub fn semantic_degraded(&self) -> bool {
        self.semantic_degraded.load(Ordering::SeqCst)
    }

    /// Rebuild the embedding index if it does not match the current corpus
    /// version and retrieval method.
    ///
    /// Idempotent: with no intervening mutation a second call performs no
    /// re-embedding. The rebuild holds the write lock, so no query can
    /// observe a mismatched corpus/index pair.
    pub async fn ensure_index_current(&self) -> Result<()> {
        {
            let inner = self.inner.read().await;
            if self.current_index(&inner).is_some() {
                return Ok(());
            }
        }

        let mut inner = self.inner.write().await;
        if self.current_index(&inner).is_some() {
            // Another writer rebuilt while we waited for the lock
            return Ok(());
        }
        self.rebuild_index(&mut inner).await
    }

    /// Return the top-k examples by cosine similarity to a pre-embedded
    /// query vector, most similar first. Ties break toward earlier
    /// insertion order.
    pub async fn query(&self, vector: &[f32], k: usize) -> Result<Vec<Evidence>> {
        for _ in 0..2 {
            self.ensure_index_current().await?;
            let inner = self.inner.read().await;
            if let Some(index) = self.current_index(&inner) {
                return Ok(Self::rank(&inner.examples, index, vector, k));
            }
            // A writer slipped in between the rebuild and our read; retry
        }

        // Mutation keeps interleaving; rebuild and rank under one write
        // lock so the pair cannot change underneath us
        let mut inner = self.inner.write().await;
        if self.current_index(&inner).is_none() {
            self.rebuild_index(&mut inner).await?;
        }
        let index = self
            .current_index(&inner)
            .ok_or_else(|| QuadraError::Other("index missing after rebuild".to_string()))?;
        Ok(Self::rank(&inner.examples, index, vector, k))
    }

    /// Embed `task` with the index's active method and return the top-k
    /// evidence plus the method that was used.
    ///
    /// A semantic failure while embedding the query degrades the corpus to
    /// lexical retrieval and retries; the caller never sees the failure.
    pub async fn retrieve(&self, task: &str, k: usize) -> Result<(Vec<Evidence>, RetrievalMethod)> {
        for _ in 0..2 {
            self.ensure_index_current().await?;
            let inner = self.inner.read().await;
            let Some(index) = self.current_index(&inner) else {
                continue;
            };
            let method = index.method;

            match self.embed_query(method, task).await {
                Ok(vector) => {
                    return Ok((Self::rank(&inner.examples, index, &vector, k), method));
                }
                Err(e) if method == RetrievalMethod::Semantic => {
                    self.semantic_degraded.store(true, Ordering::SeqCst);
                    warn!("Semantic query embedding failed, degrading to lexical retrieval: {}", e);
                    // Next pass rebuilds the index lexically
                }
                Err(e) => return Err(e),
            }
        }

        let mut inner = self.inner.write().await;
        if self.current_index(&inner).is_none() {
            self.rebuild_index(&mut inner).await?;
        }
        let index = self
            .current_index(&inner)
            .ok_or_else(|| QuadraError::Other("index missing after rebuild".to_string()))?;
        let method = index.method;
        let vector = self.embed_query(method, task).await?;
        Ok((Self::rank(&inner.examples, index, &vector, k), method))
    }

    /// Index is usable only when built from the current version with the
    /// currently-active retrieval method
    fn current_index<'a>(&self, inner: &'a CorpusInner) -> Option<&'a IndexState> {
        let active = self.active_method();
        inner
            .index
            .as_ref()
            .filter(|index| index.version == inner.version && index.method == active)
    }

    fn active_method(&self) -> RetrievalMethod {
        if self.active_semantic().is_some() {
            RetrievalMethod::Semantic
        } else {
            RetrievalMethod::Lexical
        }
    }

    fn active_semantic(&self) -> Option<&Arc<dyn EmbeddingProvider>> {
        if self.semantic_degraded.load(Ordering::SeqCst) {
            return None;
        }
        self.semantic.as_ref()
    }

    /// Re-embed every example under the write lock. A semantic batch
    /// failure flips the degradation flag and falls through to lexical.
    async fn rebuild_index(&self, inner: &mut CorpusInner) -> Result<()> {
        let texts: Vec<&str> = inner.examples.iter().map(|e| e.text.as_str()).collect();

        if let Some(provider) = self.active_semantic() {
            match provider.embed_batch(&texts).await {
                Ok(vectors) => {
                    info!(
                        "Rebuilt semantic index: {} examples at version {}",
                        vectors.len(),
                        inner.version
                    );
                    inner.index = Some(IndexState {
                        version: inner.version,
                        method: RetrievalMethod::Semantic,
                        vectors,
                    });
                    return Ok(());
                }
                Err(e) => {
                    self.semantic_degraded.store(true, Ordering::SeqCst);
                    warn!("Semantic embedding failed, falling back to lexical retrieval: {}", e);
                }
            }
        }

        let vectors = self.lexical.embed_batch(&texts).await?;
        debug!(
            "Rebuilt lexical index: {} examples at version {}",
            vectors.len(),
            inner.version
        );
        inner.index = Some(IndexState {
            version: inner.version,
            method: RetrievalMethod::Lexical,
            vectors,
        });
        Ok(())
    }

    async fn embed_query(&self, method: RetrievalMethod, task: &str) -> Result<Vec<f32>> {
        match method {
            RetrievalMethod::Semantic => match self.active_semantic() {
                Some(provider) => provider.embed(task).await,
                None => Err(QuadraError::RetrievalUnavailable(
                    "semantic provider unavailable".to_string(),
                )),
            },
            RetrievalMethod::Lexical => self.lexical.embed(task).await,
        }
    }

    fn rank(examples: &[Example], index: &IndexState, vector: &[f32], k: usize) -> Vec<Evidence> {
        let mut scored: Vec<(usize, f32)> = index
            .vectors
            .iter()
            .enumerate()
            .map(|(i, candidate)| (i, clamp_unit(cosine_similarity(vector, candidate))))
            .collect();

        // Stable sort keeps insertion order for equal similarities
        scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(k);

        scored
            .into_iter()
            .map(|(i, similarity)| Evidence {
                example: examples[i].clone(),
                similarity,
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Provenance, Quadrant};
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::atomic::AtomicUsize;

    /// Provider returning scripted vectors keyed by exact text
    struct ScriptedEmbedder {
        vectors: HashMap<String, Vec<f32>>,
        batch_calls: Arc<AtomicUsize>,
    }

    impl ScriptedEmbedder {
        fn new(entries: &[(&str, Vec<f32>)]) -> (Self, Arc<AtomicUsize>) {
            let batch_calls = Arc::new(AtomicUsize::new(0));
            let embedder = Self {
                vectors: entries
                    .iter()
                    .map(|(text, vector)| (text.to_string(), vector.clone()))
                    .collect(),
                batch_calls: Arc::clone(&batch_calls),
            };
            (embedder, batch_calls)
        }

        fn lookup(&self, text: &str) -> Result<Vec<f32>> {
            self.vectors
                .get(text)
                .cloned()
                .ok_or_else(|| QuadraError::Embedding(format!("no scripted vector for '{}'", text)))
        }
    }

    #[async_trait]
    impl EmbeddingProvider for ScriptedEmbedder {
        async fn embed(&self, text: &str) -> Result<Vec<f32>> {
            self.lookup(text)
        }

        async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
            self.batch_calls.fetch_add(1, Ordering::SeqCst);
            texts.iter().map(|text| self.lookup(text)).collect()
        }

        fn dimensions(&self) -> usize {
            3
        }

        fn model_name(&self) -> &str {
            "scripted"
        }
    }

    /// Provider whose batch embedding always fails
    struct BrokenEmbedder;

    #[async_trait]
    impl EmbeddingProvider for BrokenEmbedder {
        async fn embed(&self, _text: &str) -> Result<Vec<f32>> {
            Err(QuadraError::Embedding("model offline".to_string()))
        }

        async fn embed_batch(&self, _texts: &[&str]) -> Result<Vec<Vec<f32>>> {
            Err(QuadraError::Embedding("model offline".to_string()))
        }

        fn dimensions(&self) -> usize {
            3
        }

        fn model_name(&self) -> &str {
            "broken"
        }
    }

    /// Indexes fine but fails on single-query embeds
    struct QueryFailEmbedder;

    #[async_trait]
    impl EmbeddingProvider for QueryFailEmbedder {
        async fn embed(&self, _text: &str) -> Result<Vec<f32>> {
            Err(QuadraError::Embedding("query embed failed".to_string()))
        }

        async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
            Ok(texts.iter().map(|_| vec![1.0, 0.0, 0.0]).collect())
        }

        fn dimensions(&self) -> usize {
            3
        }

        fn model_name(&self) -> &str {
            "query-fail"
        }
    }

    fn lexical_corpus() -> ExampleCorpus {
        ExampleCorpus::new(&EmbeddingConfig::default())
    }

    fn example(text: &str, label: Quadrant) -> Example {
        Example::new(text, label, Provenance::User)
    }

    #[tokio::test]
    async fn test_append_bumps_version() {
        let corpus = lexical_corpus();
        assert_eq!(corpus.version().await, 0);

        let v1 = corpus.append(example("urgent deadline", Quadrant::DoNow)).await.unwrap();
        let v2 = corpus.append(example("ignore spam", Quadrant::Delete)).await.unwrap();

        assert_eq!(v1, 1);
        assert_eq!(v2, 2);
        assert_eq!(corpus.len().await, 2);
    }

    #[tokio::test]
    async fn test_duplicate_rejected_case_insensitive() {
        let corpus = lexical_corpus();
        corpus.append(example("Urgent Deadline", Quadrant::DoNow)).await.unwrap();

        let err = corpus
            .append(example("urgent deadline", Quadrant::Delete))
            .await
            .unwrap_err();
        assert!(matches!(err, QuadraError::DuplicateExample(_)));

        // Rejection leaves both the count and the version alone
        assert_eq!(corpus.len().await, 1);
        assert_eq!(corpus.version().await, 1);
    }

    #[tokio::test]
    async fn test_empty_text_rejected() {
        let corpus = lexical_corpus();
        let err = corpus.append(example("   ", Quadrant::DoNow)).await.unwrap_err();
        assert!(matches!(err, QuadraError::Validation(_)));
    }

    #[tokio::test]
    async fn test_clear_advances_version() {
        let corpus = lexical_corpus();
        corpus.append(example("prepare report", Quadrant::Delegate)).await.unwrap();
        corpus.ensure_index_current().await.unwrap();

        let version = corpus.clear().await;
        assert_eq!(version, 2);
        assert!(corpus.is_empty().await);
        assert_eq!(corpus.index_version().await, None);

        // Same text can be appended again after a clear
        corpus.append(example("prepare report", Quadrant::Delegate)).await.unwrap();
        assert_eq!(corpus.version().await, 3);
    }

    #[tokio::test]
    async fn test_seed_defaults() {
        let corpus = lexical_corpus();
        let version = corpus.seed_defaults().await.unwrap();

        assert_eq!(corpus.len().await, 20);
        assert_eq!(version, 20);
    }

    #[tokio::test]
    async fn test_ensure_index_is_idempotent() {
        let (embedder, batch_calls) = ScriptedEmbedder::new(&[
            ("alpha", vec![1.0, 0.0, 0.0]),
            ("beta", vec![0.0, 1.0, 0.0]),
        ]);
        let corpus = ExampleCorpus::with_semantic_provider(
            &EmbeddingConfig::default(),
            Some(Arc::new(embedder)),
        );

        corpus.append(example("alpha", Quadrant::DoNow)).await.unwrap();
        corpus.append(example("beta", Quadrant::Delete)).await.unwrap();

        corpus.ensure_index_current().await.unwrap();
        corpus.ensure_index_current().await.unwrap();
        assert_eq!(batch_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_index_rebuilt_after_mutation() {
        let (embedder, batch_calls) = ScriptedEmbedder::new(&[
            ("alpha", vec![1.0, 0.0, 0.0]),
            ("beta", vec![0.0, 1.0, 0.0]),
        ]);
        let corpus = ExampleCorpus::with_semantic_provider(
            &EmbeddingConfig::default(),
            Some(Arc::new(embedder)),
        );

        corpus.append(example("alpha", Quadrant::DoNow)).await.unwrap();
        corpus.ensure_index_current().await.unwrap();
        assert_eq!(corpus.index_version().await, Some(1));

        corpus.append(example("beta", Quadrant::Delete)).await.unwrap();
        corpus.ensure_index_current().await.unwrap();
        assert_eq!(corpus.index_version().await, Some(2));
        assert_eq!(batch_calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_query_ranks_by_similarity() {
        let (embedder, _) = ScriptedEmbedder::new(&[
            ("east", vec![1.0, 0.0, 0.0]),
            ("north", vec![0.0, 1.0, 0.0]),
            ("northeast", vec![0.7, 0.7, 0.0]),
        ]);
        let corpus = ExampleCorpus::with_semantic_provider(
            &EmbeddingConfig::default(),
            Some(Arc::new(embedder)),
        );

        corpus.append(example("east", Quadrant::DoNow)).await.unwrap();
        corpus.append(example("north", Quadrant::Schedule)).await.unwrap();
        corpus.append(example("northeast", Quadrant::Delegate)).await.unwrap();

        let evidence = corpus.query(&[1.0, 0.0, 0.0], 2).await.unwrap();
        assert_eq!(evidence.len(), 2);
        assert_eq!(evidence[0].example.text, "east");
        assert!((evidence[0].similarity - 1.0).abs() < 1e-5);
        assert_eq!(evidence[1].example.text, "northeast");
    }

    #[tokio::test]
    async fn test_equal_similarity_breaks_toward_insertion_order() {
        let (embedder, _) = ScriptedEmbedder::new(&[
            ("first", vec![1.0, 0.0, 0.0]),
            ("second", vec![1.0, 0.0, 0.0]),
        ]);
        let corpus = ExampleCorpus::with_semantic_provider(
            &EmbeddingConfig::default(),
            Some(Arc::new(embedder)),
        );

        corpus.append(example("first", Quadrant::DoNow)).await.unwrap();
        corpus.append(example("second", Quadrant::Delete)).await.unwrap();

        let evidence = corpus.query(&[1.0, 0.0, 0.0], 2).await.unwrap();
        assert_eq!(evidence[0].example.text, "first");
        assert_eq!(evidence[1].example.text, "second");
    }

    #[tokio::test]
    async fn test_retrieve_lexical_by_default() {
        let corpus = lexical_corpus();
        corpus.append(example("urgent deadline tomorrow", Quadrant::DoNow)).await.unwrap();

        let (evidence, method) = corpus.retrieve("urgent deadline tomorrow", 5).await.unwrap();
        assert_eq!(method, RetrievalMethod::Lexical);
        assert_eq!(evidence.len(), 1);
        assert!((evidence[0].similarity - 1.0).abs() < 1e-5);
    }

    #[tokio::test]
    async fn test_retrieve_empty_corpus() {
        let corpus = lexical_corpus();
        let (evidence, method) = corpus.retrieve("anything at all", 5).await.unwrap();
        assert!(evidence.is_empty());
        assert_eq!(method, RetrievalMethod::Lexical);
    }

    #[tokio::test]
    async fn test_batch_failure_degrades_to_lexical() {
        let corpus = ExampleCorpus::with_semantic_provider(
            &EmbeddingConfig::default(),
            Some(Arc::new(BrokenEmbedder)),
        );
        corpus.append(example("clean up cache", Quadrant::Delete)).await.unwrap();

        let (evidence, method) = corpus.retrieve("clean up cache", 5).await.unwrap();
        assert_eq!(method, RetrievalMethod::Lexical);
        assert_eq!(evidence.len(), 1);
        assert!(corpus.semantic_degraded());

        // Degradation is sticky across later retrieves
        let (_, method) = corpus.retrieve("clean up cache", 5).await.unwrap();
        assert_eq!(method, RetrievalMethod::Lexical);
    }

    #[tokio::test]
    async fn test_query_embed_failure_degrades_to_lexical() {
        let corpus = ExampleCorpus::with_semantic_provider(
            &EmbeddingConfig::default(),
            Some(Arc::new(QueryFailEmbedder)),
        );
        corpus.append(example("plan future goals", Quadrant::Delegate)).await.unwrap();

        // Index builds semantically, then the query embed fails and the
        // corpus falls back to lexical end to end
        let (evidence, method) = corpus.retrieve("plan future goals", 5).await.unwrap();
        assert_eq!(method, RetrievalMethod::Lexical);
        assert_eq!(evidence.len(), 1);
        assert!(corpus.semantic_degraded());
    }
}
