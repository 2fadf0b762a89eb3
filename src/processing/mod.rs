use serde::Deserialize;

use crate::domain::matching::WorkflowFlag;
use crate::domain::types::{MatchId, ProjectId};
use crate::processing::embedding::Embedder;
use crate::processing::index::SharedIndex;
use crate::processing::matching::MatchingOrchestrator;
use crate::repository::{MatchWriter, ProjectReader, ResearcherReader, ResearcherWriter};

pub mod embedding;
pub mod index;
pub mod matching;
pub mod persist;
pub mod ranking;

#[derive(Deserialize, Debug, PartialEq)]
pub enum MatchingMessage {
    MatchProject(ProjectId),
    UpdateWorkflow {
        match_id: MatchId,
        flag: WorkflowFlag,
        value: bool,
    },
    /// Reload researcher documents from storage into the search index.
    RebuildIndex,
}

/// Dispatch one worker message. Failures are logged, never propagated.
pub async fn process_matching_message<E, R>(
    msg: MatchingMessage,
    orchestrator: &MatchingOrchestrator<E, SharedIndex, R>,
    repo: &R,
) where
    E: Embedder + 'static,
    R: ProjectReader + MatchWriter + ResearcherReader + ResearcherWriter + Send + Sync + 'static,
{
    log::info!("Received matching message: {msg:?}");

    match msg {
        MatchingMessage::MatchProject(project_id) => {
            match orchestrator.match_project(project_id).await {
                Ok(proposals) => match serde_json::to_string(&proposals) {
                    Ok(json) => log::info!("Proposals for project {project_id}: {json}"),
                    Err(e) => log::error!("Failed to serialize proposals: {e}"),
                },
                Err(e) if e.is_transient() => {
                    log::error!("Matching for project {project_id} failed after retries: {e}")
                }
                Err(e) => log::error!("Matching for project {project_id} failed: {e}"),
            }
        }
        MatchingMessage::UpdateWorkflow {
            match_id,
            flag,
            value,
        } => {
            if let Err(e) = repo.set_workflow_flag(match_id, flag, value) {
                log::error!("Failed to set {flag:?}={value} on match {match_id}: {e}");
            }
        }
        MatchingMessage::RebuildIndex => match orchestrator.rebuild_index().await {
            Ok(indexed) => log::info!("Rebuilt researcher index with {indexed} documents"),
            Err(e) => log::error!("Failed to rebuild researcher index: {e}"),
        },
    }

    log::info!("Finished processing matching message");
}
