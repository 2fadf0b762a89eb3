use chrono::NaiveDate;

use crate::domain::types::ProjectId;

/// A customer's research consultation request.
#[derive(Clone, Debug, PartialEq)]
pub struct Project {
    pub id: ProjectId,
    pub consultation_category: String,
    pub project_title: String,
    pub consultation_content: String,
    pub research_category: Option<String>,
    pub deadline: Option<NaiveDate>,
    pub customer_id: Option<i32>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct NewProject {
    pub consultation_category: String,
    pub project_title: String,
    pub consultation_content: String,
    pub research_category: Option<String>,
    pub deadline: Option<NaiveDate>,
    pub customer_id: Option<i32>,
}
