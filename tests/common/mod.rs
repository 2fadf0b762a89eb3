//! Helpers for integration tests.

#![allow(dead_code)]

use researcher_matching::db::{DbPool, establish_connection_pool, run_migrations};
use researcher_matching::domain::project::NewProject;
use researcher_matching::domain::researcher::NewResearcher;
use researcher_matching::domain::types::{ProjectId, ResearcherId};
use researcher_matching::repository::{DieselRepository, ProjectWriter, ResearcherWriter};
use tempfile::TempDir;

/// Temporary database used in integration tests.
///
/// The backing directory, including WAL side files, is removed on drop.
pub struct TestDb {
    _dir: TempDir,
    pool: DbPool,
}

impl TestDb {
    pub fn new(filename: &str) -> Self {
        let dir = tempfile::tempdir().expect("Failed to create temp dir.");
        let path = dir.path().join(filename);
        let pool = establish_connection_pool(path.to_str().expect("utf-8 path"))
            .expect("Failed to establish SQLite connection.");
        run_migrations(&pool).expect("Failed to run migrations.");
        TestDb { _dir: dir, pool }
    }

    pub fn pool(&self) -> DbPool {
        self.pool.clone()
    }

    pub fn repo(&self) -> DieselRepository {
        DieselRepository::new(self.pool())
    }
}

pub fn seed_project(repo: &DieselRepository, title: &str, content: &str) -> ProjectId {
    repo.create_project(&NewProject {
        consultation_category: "Technical consultation".to_string(),
        project_title: title.to_string(),
        consultation_content: content.to_string(),
        research_category: Some("Life sciences".to_string()),
        deadline: None,
        customer_id: Some(1),
    })
    .expect("Failed to create project.")
}

pub fn seed_researcher(repo: &DieselRepository, name: &str) -> ResearcherId {
    repo.create_researcher(&NewResearcher {
        name: name.to_string(),
        name_kana: Some(format!("{name} (kana)")),
        institution: Some("Kyoto University".to_string()),
        affiliation: Some("Graduate School of Agriculture".to_string()),
        position: Some("Associate Professor".to_string()),
        kaken_url: Some(format!("https://nrid.nii.ac.jp/{name}")),
    })
    .expect("Failed to create researcher.")
}
