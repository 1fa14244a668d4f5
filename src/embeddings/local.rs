//! Semantic embeddings using fastembed
//!
//! Provides high-quality sentence embeddings using locally-run models
//! via the fastembed library with ONNX Runtime.
//!
//! Models are automatically downloaded on first use to the cache directory
//! and subsequent runs load from cache.

use crate::config::EmbeddingConfig;
use crate::embeddings::EmbeddingProvider;
use crate::error::{QuadraError, Result};
use async_trait::async_trait;
use fastembed::{EmbeddingModel, InitOptions, TextEmbedding};
use std::sync::{Arc, Mutex};
use tokio::task;
use tracing::{debug, info};

/// Semantic embedding provider backed by fastembed
pub struct FastembedProvider {
    /// The underlying fastembed model (Arc<Mutex> for thread-safe interior mutability)
    model: Arc<Mutex<TextEmbedding>>,
    /// Configuration
    config: EmbeddingConfig,
    /// Cached dimensions
    dimensions: usize,
}

impl FastembedProvider {
    /// Create a new provider with the given configuration
    ///
    /// This will download the model if not already cached (may take 30-120
    /// seconds depending on model size and network speed).
    ///
    /// # Example
    /// ```ignore
    /// let config = EmbeddingConfig::default();
    /// let provider = FastembedProvider::new(config).await?;
    /// let embedding = provider.embed("urgent deadline tomorrow").await?;
    /// ```
    pub async fn new(config: EmbeddingConfig) -> Result<Self> {
        config.validate()?;

        info!(
            "Initializing fastembed provider: model={}, cache={:?}",
            config.model, config.cache_dir
        );

        let embedding_model = Self::model_name_to_enum(&config.model)?;
        let init_options = InitOptions::new(embedding_model)
            .with_cache_dir(config.cache_dir.clone())
            .with_show_download_progress(config.show_download_progress);

        // Load model in a blocking task (may download if not cached)
        let model = task::spawn_blocking(move || TextEmbedding::try_new(init_options))
            .await
            .map_err(|e| QuadraError::Other(format!("Task join error: {}", e)))?
            .map_err(|e| QuadraError::Embedding(format!("Failed to load model: {}", e)))?;

        let dimensions = config.dimensions()?;

        info!(
            "Fastembed provider initialized successfully: {} dimensions",
            dimensions
        );

        Ok(Self {
            model: Arc::new(Mutex::new(model)),
            config,
            dimensions,
        })
    }

    /// Map a model name string to fastembed's EmbeddingModel enum
    fn model_name_to_enum(model_name: &str) -> Result<EmbeddingModel> {
        match model_name {
            "nomic-embed-text-v1.5" => Ok(EmbeddingModel::NomicEmbedTextV15),
            "nomic-embed-text-v1" => Ok(EmbeddingModel::NomicEmbedTextV1),
            "all-MiniLM-L6-v2" => Ok(EmbeddingModel::AllMiniLML6V2),
            "all-MiniLM-L12-v2" => Ok(EmbeddingModel::AllMiniLML12V2),
            "bge-small-en-v1.5" => Ok(EmbeddingModel::BGESmallENV15),
            "bge-base-en-v1.5" => Ok(EmbeddingModel::BGEBaseENV15),
            "bge-large-en-v1.5" => Ok(EmbeddingModel::BGELargeENV15),
            _ => Err(QuadraError::Validation(format!(
                "Unsupported model: '{}'. See EmbeddingConfig::validate() for supported models.",
                model_name
            ))),
        }
    }

    /// Embed a batch of texts in a blocking task
    ///
    /// Internal implementation that runs fastembed's synchronous embed
    /// function in a Tokio blocking task.
    async fn embed_batch_internal(&self, texts: Vec<String>) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        debug!("Embedding batch of {} texts", texts.len());

        let model = Arc::clone(&self.model);
        let dimensions = self.dimensions;

        let embeddings = task::spawn_blocking(move || {
            let mut model_guard = model
                .lock()
                .map_err(|e| format!("Mutex lock failed: {}", e))?;

            model_guard
                .embed(texts, None)
                .map_err(|e| format!("Embedding generation failed: {}", e))
        })
        .await
        .map_err(|e| QuadraError::Other(format!("Task join error: {}", e)))?
        .map_err(QuadraError::Embedding)?;

        for (i, embedding) in embeddings.iter().enumerate() {
            if embedding.len() != dimensions {
                return Err(QuadraError::Embedding(format!(
                    "Embedding {} has wrong dimensions: expected {}, got {}",
                    i,
                    dimensions,
                    embedding.len()
                )));
            }
        }

        debug!("Successfully generated {} embeddings", embeddings.len());

        Ok(embeddings)
    }
}

#[async_trait]
impl EmbeddingProvider for FastembedProvider {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        if text.is_empty() {
            return Err(QuadraError::Validation("Text cannot be empty".to_string()));
        }

        let texts = vec![text.to_string()];
        let mut embeddings = self.embed_batch_internal(texts).await?;

        embeddings
            .pop()
            .ok_or_else(|| QuadraError::Embedding("No embedding returned".to_string()))
    }

    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        for (i, text) in texts.iter().enumerate() {
            if text.is_empty() {
                return Err(QuadraError::Validation(format!(
                    "Text at index {} cannot be empty",
                    i
                )));
            }
        }

        // Convert to owned strings for spawn_blocking
        let texts_owned: Vec<String> = texts.iter().map(|s| s.to_string()).collect();

        let batch_size = self.config.batch_size;
        let mut all_embeddings = Vec::new();

        for chunk in texts_owned.chunks(batch_size) {
            let chunk_embeddings = self.embed_batch_internal(chunk.to_vec()).await?;
            all_embeddings.extend(chunk_embeddings);
        }

        Ok(all_embeddings)
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn model_name(&self) -> &str {
        &self.config.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_model_name_mapping() {
        // Valid models
        assert!(FastembedProvider::model_name_to_enum("nomic-embed-text-v1.5").is_ok());
        assert!(FastembedProvider::model_name_to_enum("all-MiniLM-L6-v2").is_ok());
        assert!(FastembedProvider::model_name_to_enum("bge-base-en-v1.5").is_ok());

        // Invalid model
        assert!(FastembedProvider::model_name_to_enum("invalid-model").is_err());
    }

    // Integration tests with real model downloads. Ignored by default;
    // run with --ignored and --test-threads=1 to avoid concurrent downloads.

    #[tokio::test]
    #[ignore]
    async fn test_embed_single_text() {
        let config = EmbeddingConfig::default();
        let provider = FastembedProvider::new(config).await.unwrap();

        let embedding = provider.embed("urgent deadline tomorrow").await.unwrap();

        // all-MiniLM-L6-v2 has 384 dimensions
        assert_eq!(embedding.len(), 384);

        for &val in &embedding {
            assert!(val.is_finite());
        }
    }

    #[tokio::test]
    #[ignore]
    async fn test_embed_batch() {
        let config = EmbeddingConfig::default();
        let provider = FastembedProvider::new(config).await.unwrap();

        let texts = vec!["schedule call later", "delete old files", "prepare report"];
        let embeddings = provider.embed_batch(&texts).await.unwrap();

        assert_eq!(embeddings.len(), 3);
        for embedding in &embeddings {
            assert_eq!(embedding.len(), 384);
        }
    }

    #[tokio::test]
    #[ignore]
    async fn test_semantic_similarity() {
        let config = EmbeddingConfig::default();
        let provider = FastembedProvider::new(config).await.unwrap();

        // Similar texts should have similar embeddings
        let embed1 = provider.embed("urgent deadline tomorrow").await.unwrap();
        let embed2 = provider.embed("critical issue fix now").await.unwrap();
        let embed3 = provider.embed("water the office plants").await.unwrap();

        let sim_similar = crate::embeddings::cosine_similarity(&embed1, &embed2);
        let sim_different = crate::embeddings::cosine_similarity(&embed1, &embed3);

        assert!(sim_similar > sim_different);
    }
}
