pub mod db;
pub mod domain;
pub mod errors;
pub mod models;
pub mod processing;
pub mod repository;
pub mod schema;

/// Nearest neighbours requested per search, leaving room for duplicate researchers.
pub const DEFAULT_TOP_K: usize = 100;

/// Matches proposed per project.
pub const DEFAULT_MATCH_LIMIT: usize = 10;

/// Candidate pool explored by the approximate search.
pub const DEFAULT_CANDIDATE_POOL: usize = 1000;
