use chrono::NaiveDateTime;
use diesel::prelude::*;

use crate::domain::matching::{MatchRecord, NewMatch as DomainNewMatch};
use crate::domain::types::{MatchId, ProjectId, ResearcherId, TypeConstraintError};

#[derive(Debug, Clone, Queryable)]
pub struct Match {
    pub id: i32,
    pub project_id: i32,
    pub researcher_id: i32,
    pub matching_score: i32,
    pub request: bool,
    pub offer_status: bool,
    pub response: bool,
    pub resolution: bool,
    pub recruitment: bool,
    pub created_at: NaiveDateTime,
}

/// Insert row for a fresh match; every workflow flag starts out false.
#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = crate::schema::matches)]
pub struct NewMatch {
    pub project_id: i32,
    pub researcher_id: i32,
    pub matching_score: i32,
    pub request: bool,
    pub offer_status: bool,
    pub response: bool,
    pub resolution: bool,
    pub recruitment: bool,
}

impl From<&DomainNewMatch> for NewMatch {
    fn from(value: &DomainNewMatch) -> Self {
        Self {
            project_id: value.project_id.get(),
            researcher_id: value.researcher_id.get(),
            matching_score: value.matching_score,
            request: false,
            offer_status: false,
            response: false,
            resolution: false,
            recruitment: false,
        }
    }
}

impl TryFrom<Match> for MatchRecord {
    type Error = TypeConstraintError;

    fn try_from(row: Match) -> Result<Self, Self::Error> {
        Ok(Self {
            id: MatchId::new(row.id)?,
            project_id: ProjectId::new(row.project_id)?,
            researcher_id: ResearcherId::new(row.researcher_id)?,
            matching_score: row.matching_score,
            request: row.request,
            offer_status: row.offer_status,
            response: row.response,
            resolution: row.resolution,
            recruitment: row.recruitment,
            created_at: row.created_at,
        })
    }
}
