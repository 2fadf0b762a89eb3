use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use usearch::{Index, IndexOptions, MetricKind, ScalarKind};

use crate::domain::researcher::{CandidateHit, ResearcherProfile};
use crate::domain::types::DocumentId;
use crate::errors::{MatchingError, MatchingResult};
use crate::models::config::MatchingSettings;
use crate::processing::embedding::{Embedder, load_or_generate_embedding};
use crate::repository::{ResearcherReader, ResearcherWriter};

/// Approximate nearest-neighbour search over researcher documents.
///
/// Hits come back in index order, which callers must not treat as final.
pub trait VectorIndexClient: Send + Sync {
    fn search(&self, query: &[f32], top_k: usize) -> MatchingResult<Vec<CandidateHit>>;

    fn dimensions(&self) -> usize;
}

/// A researcher document ready to be added to the index.
pub struct IndexedDocument {
    pub document_id: DocumentId,
    pub researcher: ResearcherProfile,
    pub embedding: Vec<f32>,
}

/// In-memory usearch index with cosine metric, read-only once built.
pub struct UsearchIndex {
    index: Index,
    dimensions: usize,
    documents: HashMap<u64, (DocumentId, ResearcherProfile)>,
}

fn index_error(error: impl std::fmt::Display) -> MatchingError {
    MatchingError::IndexQuery(error.to_string())
}

/// Map a cosine distance onto a similarity score in `[0, 1]`.
pub fn similarity_from_distance(distance: f32) -> f32 {
    (2.0 - distance) / 2.0
}

impl UsearchIndex {
    /// Build the index. `candidate_pool` bounds the search expansion.
    pub fn build(
        documents: Vec<IndexedDocument>,
        dimensions: usize,
        candidate_pool: usize,
    ) -> MatchingResult<Self> {
        let index = Index::new(&IndexOptions {
            dimensions,
            metric: MetricKind::Cos,
            quantization: ScalarKind::F32,
            expansion_search: candidate_pool,
            ..Default::default()
        })
        .map_err(index_error)?;

        index.reserve(documents.len()).map_err(index_error)?;

        let mut profiles = HashMap::with_capacity(documents.len());
        for document in documents {
            if document.embedding.len() != dimensions {
                return Err(MatchingError::DimensionMismatch {
                    expected: dimensions,
                    actual: document.embedding.len(),
                });
            }
            let key = document.document_id.get() as u64;
            index
                .add(key, document.embedding.as_slice())
                .map_err(index_error)?;
            profiles.insert(key, (document.document_id, document.researcher));
        }

        Ok(Self {
            index,
            dimensions,
            documents: profiles,
        })
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }
}

impl VectorIndexClient for UsearchIndex {
    fn search(&self, query: &[f32], top_k: usize) -> MatchingResult<Vec<CandidateHit>> {
        if top_k == 0 {
            return Err(MatchingError::InvalidInput(
                "top_k must be greater than zero".to_string(),
            ));
        }
        if query.len() != self.dimensions {
            return Err(MatchingError::DimensionMismatch {
                expected: self.dimensions,
                actual: query.len(),
            });
        }
        if self.documents.is_empty() {
            return Ok(Vec::new());
        }

        let neighbors = self.index.search(query, top_k).map_err(index_error)?;

        let mut hits = Vec::with_capacity(neighbors.keys.len());
        for (key, distance) in neighbors.keys.iter().zip(neighbors.distances.iter()) {
            let Some((document_id, researcher)) = self.documents.get(key) else {
                log::warn!("Skipping unknown document key {key} returned by the index");
                continue;
            };
            hits.push(CandidateHit {
                document_id: *document_id,
                researcher: researcher.clone(),
                score: similarity_from_distance(*distance),
            });
        }

        Ok(hits)
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }
}

/// Swappable handle over the current [`UsearchIndex`].
///
/// Searches run against a snapshot, so a rebuild never blocks or disturbs a
/// search already in flight.
pub struct SharedIndex {
    current: RwLock<Arc<UsearchIndex>>,
}

impl SharedIndex {
    pub fn new(index: UsearchIndex) -> Self {
        Self {
            current: RwLock::new(Arc::new(index)),
        }
    }

    fn snapshot(&self) -> Arc<UsearchIndex> {
        let current = self.current.read().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(&current)
    }

    /// Install a freshly built index for all later searches.
    pub fn replace(&self, index: UsearchIndex) {
        let mut current = self.current.write().unwrap_or_else(PoisonError::into_inner);
        *current = Arc::new(index);
    }

    pub fn len(&self) -> usize {
        self.snapshot().len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshot().is_empty()
    }
}

impl VectorIndexClient for SharedIndex {
    fn search(&self, query: &[f32], top_k: usize) -> MatchingResult<Vec<CandidateHit>> {
        self.snapshot().search(query, top_k)
    }

    fn dimensions(&self) -> usize {
        self.snapshot().dimensions()
    }
}

/// Load every research document and build the search index.
///
/// Documents without a stored embedding are embedded and written back first.
/// Documents with blank content, a corrupt blob or a stored vector of the
/// wrong width are skipped with a warning.
pub fn build_researcher_index<R, E>(
    repo: &R,
    embedder: &E,
    settings: &MatchingSettings,
) -> MatchingResult<UsearchIndex>
where
    R: ResearcherReader + ResearcherWriter,
    E: Embedder + ?Sized,
{
    let documents = repo.list_research_documents()?;
    let loaded = documents.len();

    let mut generated = 0;
    let mut skipped = 0;
    let mut entries = Vec::with_capacity(documents.len());
    for document in documents {
        if document.research_content.trim().is_empty() && document.embedding.is_none() {
            skipped += 1;
            log::warn!(
                "Skipping research document {} of researcher {}: empty content",
                document.id,
                document.researcher.id
            );
            continue;
        }

        let outcome = load_or_generate_embedding(
            document.embedding.as_deref(),
            &document.research_content,
            embedder,
            |value| {
                repo.set_document_embedding(document.id, value)
                    .map(|_| ())
                    .map_err(MatchingError::from)
            },
        );
        let (embedding, was_generated) = match outcome {
            Ok(outcome) => outcome,
            Err(MatchingError::CorruptEmbedding(reason)) => {
                skipped += 1;
                log::warn!(
                    "Skipping research document {} of researcher {}: {reason}",
                    document.id,
                    document.researcher.id
                );
                continue;
            }
            Err(error) => return Err(error),
        };
        if embedding.len() != embedder.dimensions() {
            skipped += 1;
            log::warn!(
                "Skipping research document {} of researcher {}: stored embedding has {} dimensions, expected {}",
                document.id,
                document.researcher.id,
                embedding.len(),
                embedder.dimensions()
            );
            continue;
        }
        if was_generated {
            generated += 1;
        }

        entries.push(IndexedDocument {
            document_id: document.id,
            researcher: document.researcher,
            embedding,
        });
    }

    let index = UsearchIndex::build(entries, embedder.dimensions(), settings.candidate_pool)?;

    log::info!(
        "Built researcher index: documents_loaded={loaded}, embeddings_generated={generated}, skipped={skipped}, indexed={}",
        index.len()
    );

    Ok(index)
}
