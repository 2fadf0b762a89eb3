use serde::Serialize;

use crate::domain::types::{DocumentId, ResearcherId};

/// Descriptive fields of a researcher as shown to customers.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ResearcherProfile {
    pub id: ResearcherId,
    pub name: String,
    pub name_kana: Option<String>,
    pub institution: Option<String>,
    pub affiliation: Option<String>,
    pub position: Option<String>,
    pub kaken_url: Option<String>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct NewResearcher {
    pub name: String,
    pub name_kana: Option<String>,
    pub institution: Option<String>,
    pub affiliation: Option<String>,
    pub position: Option<String>,
    pub kaken_url: Option<String>,
}

/// One piece of research content owned by a researcher.
///
/// A researcher may own several documents; each is indexed separately and
/// duplicates are collapsed at ranking time.
#[derive(Clone, Debug, PartialEq)]
pub struct ResearchDocument {
    pub id: DocumentId,
    pub researcher: ResearcherProfile,
    pub research_content: String,
    pub embedding: Option<Vec<u8>>,
}

/// A single nearest-neighbour result. Higher `score` means more similar.
#[derive(Clone, Debug, PartialEq)]
pub struct CandidateHit {
    pub document_id: DocumentId,
    pub researcher: ResearcherProfile,
    pub score: f32,
}
