use thiserror::Error;

use crate::db::{DbConnection, DbPool};
use crate::domain::matching::{
    MatchProposal, MatchRecord, NewMatch, ResearcherOffer, WorkflowFlag,
};
use crate::domain::project::{NewProject, Project};
use crate::domain::researcher::{NewResearcher, ResearchDocument};
use crate::domain::types::{DocumentId, MatchId, ProjectId, ResearcherId, TypeConstraintError};

pub mod matching;
pub mod project;
pub mod researcher;

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("connection pool error: {0}")]
    Pool(#[from] diesel::r2d2::PoolError),
    #[error("record not found")]
    NotFound,
    #[error("database error: {0}")]
    Database(diesel::result::Error),
    #[error("validation error: {0}")]
    ValidationError(String),
}

impl From<diesel::result::Error> for RepositoryError {
    fn from(error: diesel::result::Error) -> Self {
        match error {
            diesel::result::Error::NotFound => RepositoryError::NotFound,
            other => RepositoryError::Database(other),
        }
    }
}

impl From<TypeConstraintError> for RepositoryError {
    fn from(error: TypeConstraintError) -> Self {
        RepositoryError::ValidationError(error.to_string())
    }
}

pub type RepositoryResult<T> = Result<T, RepositoryError>;

/// Diesel-backed repository over the matching tables.
#[derive(Clone)]
pub struct DieselRepository {
    pool: DbPool,
}

impl DieselRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    fn conn(&self) -> RepositoryResult<DbConnection> {
        Ok(self.pool.get()?)
    }
}

pub trait ProjectReader {
    fn get_project(&self, project_id: ProjectId) -> RepositoryResult<Project>;
}

pub trait ProjectWriter {
    fn create_project(&self, project: &NewProject) -> RepositoryResult<ProjectId>;
}

pub trait ResearcherReader {
    /// Every research document joined with its owner's profile, by id.
    fn list_research_documents(&self) -> RepositoryResult<Vec<ResearchDocument>>;
}

pub trait ResearcherWriter {
    fn create_researcher(&self, researcher: &NewResearcher) -> RepositoryResult<ResearcherId>;
    fn add_research_document(
        &self,
        researcher_id: ResearcherId,
        research_content: &str,
    ) -> RepositoryResult<DocumentId>;
    fn set_document_embedding(
        &self,
        document_id: DocumentId,
        embedding: &[f32],
    ) -> RepositoryResult<usize>;
}

pub trait MatchReader {
    fn list_matches(&self, project_id: ProjectId) -> RepositoryResult<Vec<MatchRecord>>;
    /// Stored matches joined with project and researcher, best score first.
    fn list_match_proposals(&self, project_id: ProjectId) -> RepositoryResult<Vec<MatchProposal>>;
    /// Projects requested from a researcher. `accepted = false` lists the
    /// offers still awaiting a response, `true` the ones already accepted.
    fn list_researcher_offers(
        &self,
        researcher_id: ResearcherId,
        accepted: bool,
    ) -> RepositoryResult<Vec<ResearcherOffer>>;
}

pub trait MatchWriter {
    /// Insert all records in one transaction. Nothing is kept on failure.
    fn create_matches(&self, matches: &[NewMatch]) -> RepositoryResult<usize>;
    fn set_workflow_flag(
        &self,
        match_id: MatchId,
        flag: WorkflowFlag,
        value: bool,
    ) -> RepositoryResult<usize>;

    /// The researcher accepted the offer.
    fn accept_offer(&self, match_id: MatchId) -> RepositoryResult<usize> {
        self.set_workflow_flag(match_id, WorkflowFlag::Response, true)
    }
}
