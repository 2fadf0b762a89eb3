pub mod config;
pub mod matching;
pub mod project;
pub mod researcher;
