//! SQLite connection pool and schema bootstrap.

use diesel::connection::SimpleConnection;
use diesel::r2d2::{ConnectionManager, CustomizeConnection, Pool, PoolError, PooledConnection};
use diesel::sqlite::SqliteConnection;

pub type DbPool = Pool<ConnectionManager<SqliteConnection>>;
pub type DbConnection = PooledConnection<ConnectionManager<SqliteConnection>>;

const SCHEMA_DDL: &str = r#"
CREATE TABLE IF NOT EXISTS projects (
    id INTEGER PRIMARY KEY AUTOINCREMENT NOT NULL,
    consultation_category TEXT NOT NULL,
    project_title TEXT NOT NULL,
    consultation_content TEXT NOT NULL,
    research_category TEXT,
    deadline DATE,
    customer_id INTEGER
);

CREATE TABLE IF NOT EXISTS researchers (
    id INTEGER PRIMARY KEY AUTOINCREMENT NOT NULL,
    researcher_name TEXT NOT NULL,
    name_kana TEXT,
    institution TEXT,
    affiliation TEXT,
    position TEXT,
    kaken_url TEXT
);

CREATE TABLE IF NOT EXISTS research_documents (
    id INTEGER PRIMARY KEY AUTOINCREMENT NOT NULL,
    researcher_id INTEGER NOT NULL REFERENCES researchers(id),
    research_content TEXT NOT NULL,
    embedding BLOB
);

CREATE TABLE IF NOT EXISTS matches (
    id INTEGER PRIMARY KEY AUTOINCREMENT NOT NULL,
    project_id INTEGER NOT NULL REFERENCES projects(id),
    researcher_id INTEGER NOT NULL REFERENCES researchers(id),
    matching_score INTEGER NOT NULL CHECK (matching_score BETWEEN 0 AND 100),
    request BOOLEAN NOT NULL DEFAULT 0,
    offer_status BOOLEAN NOT NULL DEFAULT 0,
    response BOOLEAN NOT NULL DEFAULT 0,
    resolution BOOLEAN NOT NULL DEFAULT 0,
    recruitment BOOLEAN NOT NULL DEFAULT 0,
    created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
);

CREATE INDEX IF NOT EXISTS idx_matches_project_id ON matches(project_id);
CREATE INDEX IF NOT EXISTS idx_research_documents_researcher_id ON research_documents(researcher_id);
"#;

/// Per-connection pragmas applied whenever the pool hands out a connection.
#[derive(Debug)]
struct SqlitePragmas;

impl CustomizeConnection<SqliteConnection, diesel::r2d2::Error> for SqlitePragmas {
    fn on_acquire(&self, conn: &mut SqliteConnection) -> Result<(), diesel::r2d2::Error> {
        conn.batch_execute(
            "PRAGMA journal_mode = WAL; PRAGMA foreign_keys = ON; PRAGMA busy_timeout = 5000;",
        )
        .map_err(diesel::r2d2::Error::QueryError)
    }
}

/// Build an r2d2 pool for the SQLite database at `database_url`.
pub fn establish_connection_pool(database_url: &str) -> Result<DbPool, PoolError> {
    let manager = ConnectionManager::<SqliteConnection>::new(database_url);
    Pool::builder()
        .connection_customizer(Box::new(SqlitePragmas))
        .build(manager)
}

/// Create the tables used by the matching pipeline when they are missing.
pub fn run_migrations(pool: &DbPool) -> Result<(), diesel::r2d2::Error> {
    let mut conn = pool.get().map_err(|error| {
        diesel::r2d2::Error::ConnectionError(diesel::ConnectionError::BadConnection(
            error.to_string(),
        ))
    })?;
    conn.batch_execute(SCHEMA_DDL)
        .map_err(diesel::r2d2::Error::QueryError)
}

#[cfg(test)]
mod tests {
    use super::{establish_connection_pool, run_migrations};

    #[test]
    fn migrations_are_idempotent() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("schema.db");
        let pool = establish_connection_pool(path.to_str().expect("utf-8 path"))
            .expect("pool should build");

        run_migrations(&pool).expect("first run");
        run_migrations(&pool).expect("second run");
    }
}
