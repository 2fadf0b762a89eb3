//! Error taxonomy of the matching pipeline.

use thiserror::Error;

use crate::repository::RepositoryError;

/// Failures surfaced by a single matching run.
#[derive(Debug, Error)]
pub enum MatchingError {
    /// Caller supplied unusable input. Never retried.
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("embedder unavailable: {0}")]
    EmbedderUnavailable(String),
    #[error("index query failed: {0}")]
    IndexQuery(String),
    /// Model and index disagree on vector width.
    #[error("dimension mismatch: index expects {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },
    /// Matches were computed but could not be stored in full.
    #[error("persisted {persisted} of {total} matches for project {project_id}: {reason}")]
    PartialPersistence {
        project_id: i32,
        persisted: usize,
        total: usize,
        reason: String,
    },
    #[error("project {0} not found")]
    ProjectNotFound(i32),
    /// A stored embedding blob cannot be decoded into a vector.
    #[error("corrupt stored embedding: {0}")]
    CorruptEmbedding(String),
    /// A blocking worker task panicked or was cancelled.
    #[error("worker task failed: {0}")]
    Worker(String),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

impl MatchingError {
    /// Whether the orchestrator may retry the failed step.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            MatchingError::EmbedderUnavailable(_) | MatchingError::IndexQuery(_)
        )
    }
}

pub type MatchingResult<T> = Result<T, MatchingError>;
