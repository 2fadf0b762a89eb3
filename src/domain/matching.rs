use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::domain::project::Project;
use crate::domain::researcher::ResearcherProfile;
use crate::domain::types::{MatchId, ProjectId, ResearcherId};

/// Best hit for one researcher after deduplication, score rescaled to 0..=100.
#[derive(Clone, Debug, PartialEq)]
pub struct RankedMatch {
    pub researcher: ResearcherProfile,
    pub raw_score: f32,
    pub score: i32,
}

/// Manual approval steps tracked on every match record.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowFlag {
    Request,
    OfferStatus,
    Response,
    Resolution,
    Recruitment,
}

#[derive(Clone, Debug, PartialEq)]
pub struct NewMatch {
    pub project_id: ProjectId,
    pub researcher_id: ResearcherId,
    pub matching_score: i32,
}

impl NewMatch {
    pub fn from_ranked(project_id: ProjectId, ranked: &RankedMatch) -> Self {
        Self {
            project_id,
            researcher_id: ranked.researcher.id,
            matching_score: ranked.score,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct MatchRecord {
    pub id: MatchId,
    pub project_id: ProjectId,
    pub researcher_id: ResearcherId,
    pub matching_score: i32,
    pub request: bool,
    pub offer_status: bool,
    pub response: bool,
    pub resolution: bool,
    pub recruitment: bool,
    pub created_at: NaiveDateTime,
}

/// Presentation record returned to the API layer.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct MatchProposal {
    pub project_title: String,
    pub matching_score: i32,
    pub researcher_name: String,
    pub name_kana: Option<String>,
    pub institution: Option<String>,
    pub affiliation: Option<String>,
    pub position: Option<String>,
    pub kaken_url: Option<String>,
}

impl MatchProposal {
    pub fn new(project_title: &str, ranked: &RankedMatch) -> Self {
        let researcher = &ranked.researcher;
        Self {
            project_title: project_title.to_string(),
            matching_score: ranked.score,
            researcher_name: researcher.name.clone(),
            name_kana: researcher.name_kana.clone(),
            institution: researcher.institution.clone(),
            affiliation: researcher.affiliation.clone(),
            position: researcher.position.clone(),
            kaken_url: researcher.kaken_url.clone(),
        }
    }
}

/// A project offered to a researcher, with the match it was offered through.
#[derive(Clone, Debug, PartialEq)]
pub struct ResearcherOffer {
    pub match_id: MatchId,
    pub project: Project,
}
