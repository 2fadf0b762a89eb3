use chrono::NaiveDate;
use diesel::prelude::*;

use crate::domain::project::{NewProject as DomainNewProject, Project as DomainProject};
use crate::domain::types::{ProjectId, TypeConstraintError};

#[derive(Debug, Clone, Queryable)]
pub struct Project {
    pub id: i32,
    pub consultation_category: String,
    pub project_title: String,
    pub consultation_content: String,
    pub research_category: Option<String>,
    pub deadline: Option<NaiveDate>,
    pub customer_id: Option<i32>,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = crate::schema::projects)]
pub struct NewProject {
    pub consultation_category: String,
    pub project_title: String,
    pub consultation_content: String,
    pub research_category: Option<String>,
    pub deadline: Option<NaiveDate>,
    pub customer_id: Option<i32>,
}

impl TryFrom<Project> for DomainProject {
    type Error = TypeConstraintError;

    fn try_from(row: Project) -> Result<Self, Self::Error> {
        Ok(Self {
            id: ProjectId::new(row.id)?,
            consultation_category: row.consultation_category,
            project_title: row.project_title,
            consultation_content: row.consultation_content,
            research_category: row.research_category,
            deadline: row.deadline,
            customer_id: row.customer_id,
        })
    }
}

impl From<DomainNewProject> for NewProject {
    fn from(project: DomainNewProject) -> Self {
        Self {
            consultation_category: project.consultation_category,
            project_title: project.project_title,
            consultation_content: project.consultation_content,
            research_category: project.research_category,
            deadline: project.deadline,
            customer_id: project.customer_id,
        }
    }
}
