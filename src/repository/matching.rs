use diesel::prelude::*;

use crate::domain::matching::{
    MatchProposal, MatchRecord, NewMatch, ResearcherOffer, WorkflowFlag,
};
use crate::domain::project::Project;
use crate::domain::types::{MatchId, ProjectId, ResearcherId};
use crate::models::matching::{Match as DbMatch, NewMatch as DbNewMatch};
use crate::models::project::Project as DbProject;
use crate::repository::{
    DieselRepository, MatchReader, MatchWriter, RepositoryError, RepositoryResult,
};

type ProposalRow = (
    String,
    i32,
    String,
    Option<String>,
    Option<String>,
    Option<String>,
    Option<String>,
    Option<String>,
);

impl MatchReader for DieselRepository {
    fn list_matches(&self, project_id: ProjectId) -> RepositoryResult<Vec<MatchRecord>> {
        use crate::schema::matches;

        let mut conn = self.conn()?;

        let rows = matches::table
            .filter(matches::project_id.eq(project_id.get()))
            .order(matches::id.asc())
            .load::<DbMatch>(&mut conn)?;

        rows.into_iter()
            .map(MatchRecord::try_from)
            .collect::<Result<Vec<_>, _>>()
            .map_err(|err| RepositoryError::ValidationError(err.to_string()))
    }

    fn list_match_proposals(&self, project_id: ProjectId) -> RepositoryResult<Vec<MatchProposal>> {
        use crate::schema::{matches, projects, researchers};

        let mut conn = self.conn()?;

        let rows = matches::table
            .inner_join(projects::table)
            .inner_join(researchers::table)
            .filter(matches::project_id.eq(project_id.get()))
            .order((matches::matching_score.desc(), matches::id.asc()))
            .select((
                projects::project_title,
                matches::matching_score,
                researchers::researcher_name,
                researchers::name_kana,
                researchers::institution,
                researchers::affiliation,
                researchers::position,
                researchers::kaken_url,
            ))
            .load::<ProposalRow>(&mut conn)?;

        Ok(rows
            .into_iter()
            .map(
                |(
                    project_title,
                    matching_score,
                    researcher_name,
                    name_kana,
                    institution,
                    affiliation,
                    position,
                    kaken_url,
                )| MatchProposal {
                    project_title,
                    matching_score,
                    researcher_name,
                    name_kana,
                    institution,
                    affiliation,
                    position,
                    kaken_url,
                },
            )
            .collect())
    }

    fn list_researcher_offers(
        &self,
        researcher_id: ResearcherId,
        accepted: bool,
    ) -> RepositoryResult<Vec<ResearcherOffer>> {
        use crate::schema::{matches, projects};

        let mut conn = self.conn()?;

        let rows = matches::table
            .inner_join(projects::table)
            .filter(matches::researcher_id.eq(researcher_id.get()))
            .filter(matches::request.eq(true))
            .filter(matches::response.eq(accepted))
            .order(matches::id.asc())
            .select((matches::id, projects::all_columns))
            .load::<(i32, DbProject)>(&mut conn)?;

        rows.into_iter()
            .map(|(match_id, project)| {
                Ok::<_, RepositoryError>(ResearcherOffer {
                    match_id: MatchId::new(match_id)?,
                    project: Project::try_from(project)?,
                })
            })
            .collect()
    }
}

impl MatchWriter for DieselRepository {
    fn create_matches(&self, matches: &[NewMatch]) -> RepositoryResult<usize> {
        use crate::schema::matches;

        if matches.is_empty() {
            return Ok(0);
        }

        let mut conn = self.conn()?;
        let inserted = conn.transaction(|conn| {
            let mut inserted_rows = 0;
            for new_match in matches.iter() {
                let db_match = DbNewMatch::from(new_match);
                inserted_rows += diesel::insert_into(matches::table)
                    .values(&db_match)
                    .execute(conn)?;
            }
            Ok::<usize, RepositoryError>(inserted_rows)
        })?;

        Ok(inserted)
    }

    fn set_workflow_flag(
        &self,
        match_id: MatchId,
        flag: WorkflowFlag,
        value: bool,
    ) -> RepositoryResult<usize> {
        use crate::schema::matches;

        let mut conn = self.conn()?;
        let target = matches::table.filter(matches::id.eq(match_id.get()));

        let affected = match flag {
            WorkflowFlag::Request => diesel::update(target)
                .set(matches::request.eq(value))
                .execute(&mut conn)?,
            WorkflowFlag::OfferStatus => diesel::update(target)
                .set(matches::offer_status.eq(value))
                .execute(&mut conn)?,
            WorkflowFlag::Response => diesel::update(target)
                .set(matches::response.eq(value))
                .execute(&mut conn)?,
            WorkflowFlag::Resolution => diesel::update(target)
                .set(matches::resolution.eq(value))
                .execute(&mut conn)?,
            WorkflowFlag::Recruitment => diesel::update(target)
                .set(matches::recruitment.eq(value))
                .execute(&mut conn)?,
        };

        if affected == 0 {
            return Err(RepositoryError::NotFound);
        }

        Ok(affected)
    }
}
