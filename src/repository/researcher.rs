use bytemuck::cast_slice;
use diesel::prelude::*;

use crate::domain::researcher::{NewResearcher, ResearchDocument};
use crate::domain::types::{DocumentId, ResearcherId};
use crate::models::researcher::{
    NewResearchDocument, NewResearcher as DbNewResearcher, ResearchDocument as DbResearchDocument,
    Researcher as DbResearcher,
};
use crate::repository::{
    DieselRepository, RepositoryError, RepositoryResult, ResearcherReader, ResearcherWriter,
};

impl ResearcherReader for DieselRepository {
    fn list_research_documents(&self) -> RepositoryResult<Vec<ResearchDocument>> {
        use crate::schema::{research_documents, researchers};

        let mut conn = self.conn()?;

        let rows = research_documents::table
            .inner_join(researchers::table)
            .order(research_documents::id.asc())
            .load::<(DbResearchDocument, DbResearcher)>(&mut conn)?;

        rows.into_iter()
            .map(ResearchDocument::try_from)
            .collect::<Result<Vec<_>, _>>()
            .map_err(|err| RepositoryError::ValidationError(err.to_string()))
    }
}

impl ResearcherWriter for DieselRepository {
    fn create_researcher(&self, researcher: &NewResearcher) -> RepositoryResult<ResearcherId> {
        use crate::schema::researchers;

        let mut conn = self.conn()?;
        let db_researcher: DbNewResearcher = researcher.clone().into();

        let id = diesel::insert_into(researchers::table)
            .values(&db_researcher)
            .returning(researchers::id)
            .get_result::<i32>(&mut conn)?;

        Ok(ResearcherId::new(id)?)
    }

    fn add_research_document(
        &self,
        researcher_id: ResearcherId,
        research_content: &str,
    ) -> RepositoryResult<DocumentId> {
        use crate::schema::research_documents;

        let mut conn = self.conn()?;

        let id = diesel::insert_into(research_documents::table)
            .values(&NewResearchDocument {
                researcher_id: researcher_id.get(),
                research_content: research_content.to_string(),
            })
            .returning(research_documents::id)
            .get_result::<i32>(&mut conn)?;

        Ok(DocumentId::new(id)?)
    }

    fn set_document_embedding(
        &self,
        document_id: DocumentId,
        embedding: &[f32],
    ) -> RepositoryResult<usize> {
        use crate::schema::research_documents;

        let mut conn = self.conn()?;

        // Convert &[f32] to &[u8]
        let blob: Vec<u8> = cast_slice(embedding).to_vec();

        let affected = diesel::update(
            research_documents::table.filter(research_documents::id.eq(document_id.get())),
        )
        .set(research_documents::embedding.eq(blob))
        .execute(&mut conn)?;

        Ok(affected)
    }
}
