use diesel::prelude::*;

use crate::domain::project::{NewProject, Project};
use crate::domain::types::ProjectId;
use crate::models::project::{NewProject as DbNewProject, Project as DbProject};
use crate::repository::{DieselRepository, ProjectReader, ProjectWriter, RepositoryResult};

impl ProjectReader for DieselRepository {
    fn get_project(&self, project_id: ProjectId) -> RepositoryResult<Project> {
        use crate::schema::projects;

        let mut conn = self.conn()?;

        let project = projects::table
            .filter(projects::id.eq(project_id.get()))
            .first::<DbProject>(&mut conn)?;

        Ok(Project::try_from(project)?)
    }
}

impl ProjectWriter for DieselRepository {
    fn create_project(&self, project: &NewProject) -> RepositoryResult<ProjectId> {
        use crate::schema::projects;

        let mut conn = self.conn()?;
        let db_project: DbNewProject = project.clone().into();

        let id = diesel::insert_into(projects::table)
            .values(&db_project)
            .returning(projects::id)
            .get_result::<i32>(&mut conn)?;

        Ok(ProjectId::new(id)?)
    }
}
