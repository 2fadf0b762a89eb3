use diesel::prelude::*;

use crate::domain::researcher::{
    NewResearcher as DomainNewResearcher, ResearchDocument as DomainResearchDocument,
    ResearcherProfile,
};
use crate::domain::types::{DocumentId, ResearcherId, TypeConstraintError};

#[derive(Debug, Clone, Queryable)]
pub struct Researcher {
    pub id: i32,
    pub researcher_name: String,
    pub name_kana: Option<String>,
    pub institution: Option<String>,
    pub affiliation: Option<String>,
    pub position: Option<String>,
    pub kaken_url: Option<String>,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = crate::schema::researchers)]
pub struct NewResearcher {
    pub researcher_name: String,
    pub name_kana: Option<String>,
    pub institution: Option<String>,
    pub affiliation: Option<String>,
    pub position: Option<String>,
    pub kaken_url: Option<String>,
}

#[derive(Debug, Clone, Queryable)]
pub struct ResearchDocument {
    pub id: i32,
    pub researcher_id: i32,
    pub research_content: String,
    pub embedding: Option<Vec<u8>>,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = crate::schema::research_documents)]
pub struct NewResearchDocument {
    pub researcher_id: i32,
    pub research_content: String,
}

impl TryFrom<Researcher> for ResearcherProfile {
    type Error = TypeConstraintError;

    fn try_from(row: Researcher) -> Result<Self, Self::Error> {
        Ok(Self {
            id: ResearcherId::new(row.id)?,
            name: row.researcher_name,
            name_kana: row.name_kana,
            institution: row.institution,
            affiliation: row.affiliation,
            position: row.position,
            kaken_url: row.kaken_url,
        })
    }
}

impl From<DomainNewResearcher> for NewResearcher {
    fn from(researcher: DomainNewResearcher) -> Self {
        Self {
            researcher_name: researcher.name,
            name_kana: researcher.name_kana,
            institution: researcher.institution,
            affiliation: researcher.affiliation,
            position: researcher.position,
            kaken_url: researcher.kaken_url,
        }
    }
}

impl TryFrom<(ResearchDocument, Researcher)> for DomainResearchDocument {
    type Error = TypeConstraintError;

    fn try_from((document, researcher): (ResearchDocument, Researcher)) -> Result<Self, Self::Error> {
        Ok(Self {
            id: DocumentId::new(document.id)?,
            researcher: researcher.try_into()?,
            research_content: document.research_content,
            embedding: document.embedding,
        })
    }
}
