use std::path::PathBuf;
use std::sync::{Mutex, MutexGuard};

use fastembed::{EmbeddingModel, InitOptions, TextEmbedding};

use crate::errors::{MatchingError, MatchingResult};

/// Turns text into a fixed-length vector.
///
/// Implementations must be deterministic for a fixed model and safe to call
/// from several matching runs at once.
pub trait Embedder: Send + Sync {
    fn embed(&self, text: &str) -> MatchingResult<Vec<f32>>;

    /// Width of the vectors produced by [`Embedder::embed`].
    fn dimensions(&self) -> usize;

    /// Prepare any lazily loaded state so the first `embed` call is fast.
    fn warm_up(&self) -> MatchingResult<()> {
        Ok(())
    }
}

/// Reject text that would otherwise embed to a meaningless vector.
pub fn validate_text(text: &str) -> MatchingResult<&str> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(MatchingError::InvalidInput(
            "text to embed must not be empty".to_string(),
        ));
    }
    Ok(trimmed)
}

/// Normalize a vector to unit length.
///
/// Returns the original vector when the norm is zero.
pub(crate) fn normalize_embedding(vec: &[f32]) -> Vec<f32> {
    let norm = vec.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm == 0.0 {
        vec.to_vec()
    } else {
        vec.iter().map(|x| x / norm).collect()
    }
}

/// Decode a stored embedding blob.
///
/// The blob is copied into an aligned buffer, since SQLite makes no
/// alignment promise for returned bytes.
pub(crate) fn decode_embedding(blob: &[u8]) -> MatchingResult<Vec<f32>> {
    if blob.is_empty() || blob.len() % size_of::<f32>() != 0 {
        return Err(MatchingError::CorruptEmbedding(format!(
            "blob has invalid length {}",
            blob.len()
        )));
    }
    Ok(bytemuck::pod_collect_to_vec::<u8, f32>(blob))
}

/// Load an embedding from blob when present, otherwise generate and persist it.
///
/// Returns the embedding and a flag indicating whether a new embedding was
/// generated.
pub(crate) fn load_or_generate_embedding<E, F>(
    existing_blob: Option<&[u8]>,
    text: &str,
    embedder: &E,
    persist: F,
) -> MatchingResult<(Vec<f32>, bool)>
where
    E: Embedder + ?Sized,
    F: FnOnce(&[f32]) -> MatchingResult<()>,
{
    if let Some(blob) = existing_blob {
        return Ok((decode_embedding(blob)?, false));
    }

    let generated = embedder.embed(text)?;
    persist(&generated)?;

    Ok((generated, true))
}

/// Map a configured model name onto a supported fastembed model.
pub fn parse_embedding_model(name: &str) -> MatchingResult<EmbeddingModel> {
    match name {
        "nomic-embed-text-v1" => Ok(EmbeddingModel::NomicEmbedTextV1),
        "nomic-embed-text-v1.5" => Ok(EmbeddingModel::NomicEmbedTextV15),
        "multilingual-e5-small" => Ok(EmbeddingModel::MultilingualE5Small),
        "multilingual-e5-base" => Ok(EmbeddingModel::MultilingualE5Base),
        "multilingual-e5-large" => Ok(EmbeddingModel::MultilingualE5Large),
        other => Err(MatchingError::InvalidInput(format!(
            "unsupported embedding model: {other}"
        ))),
    }
}

/// fastembed-backed embedder that loads its model on first use.
///
/// The loaded model is kept for the lifetime of the value and guarded by a
/// mutex because inference needs exclusive access.
pub struct FastEmbedder {
    model: EmbeddingModel,
    dimensions: usize,
    cache_dir: Option<PathBuf>,
    handle: Mutex<Option<TextEmbedding>>,
}

impl FastEmbedder {
    pub fn new(model: EmbeddingModel, cache_dir: Option<PathBuf>) -> MatchingResult<Self> {
        let dimensions = TextEmbedding::list_supported_models()
            .into_iter()
            .find(|info| info.model == model)
            .map(|info| info.dim)
            .ok_or_else(|| {
                MatchingError::InvalidInput(format!("no model info for {model:?}"))
            })?;

        Ok(Self {
            model,
            dimensions,
            cache_dir,
            handle: Mutex::new(None),
        })
    }

    pub fn from_model_name(name: &str, cache_dir: Option<PathBuf>) -> MatchingResult<Self> {
        Self::new(parse_embedding_model(name)?, cache_dir)
    }

    fn init_model(&self) -> MatchingResult<TextEmbedding> {
        let mut options = InitOptions::new(self.model.clone()).with_show_download_progress(false);
        if let Some(dir) = &self.cache_dir {
            options = options.with_cache_dir(dir.clone());
        }

        log::info!("Loading embedding model {:?}", self.model);
        TextEmbedding::try_new(options).map_err(|error| {
            MatchingError::EmbedderUnavailable(format!(
                "failed to initialize embedder {:?}: {error:?}",
                self.model
            ))
        })
    }

    /// Lock the model slot, loading the model first if needed.
    fn loaded_model(&self) -> MatchingResult<MutexGuard<'_, Option<TextEmbedding>>> {
        let mut handle = self.handle.lock().map_err(|_| {
            MatchingError::EmbedderUnavailable("embedding model lock poisoned".to_string())
        })?;
        if handle.is_none() {
            *handle = Some(self.init_model()?);
        }
        Ok(handle)
    }
}

impl Embedder for FastEmbedder {
    fn embed(&self, text: &str) -> MatchingResult<Vec<f32>> {
        let text = validate_text(text)?;

        let mut handle = self.loaded_model()?;
        let embedder = handle.as_mut().ok_or_else(|| {
            MatchingError::EmbedderUnavailable("embedding model not loaded".to_string())
        })?;

        let embedding = embedder
            .embed(vec![text.to_string()], None)
            .map_err(|error| {
                MatchingError::EmbedderUnavailable(format!(
                    "failed to generate embedding: {error:?}"
                ))
            })?
            .into_iter()
            .next()
            .map(|value| normalize_embedding(&value))
            .ok_or_else(|| {
                MatchingError::EmbedderUnavailable("embedder returned no vector".to_string())
            })?;

        if embedding.len() != self.dimensions {
            return Err(MatchingError::DimensionMismatch {
                expected: self.dimensions,
                actual: embedding.len(),
            });
        }

        Ok(embedding)
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn warm_up(&self) -> MatchingResult<()> {
        self.loaded_model().map(|_| ())
    }
}
