pub mod matching;
pub mod project;
pub mod researcher;
pub mod types;
