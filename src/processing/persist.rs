use crate::domain::matching::{NewMatch, RankedMatch};
use crate::domain::types::ProjectId;
use crate::errors::{MatchingError, MatchingResult};
use crate::repository::MatchWriter;

/// Store one match record per ranked researcher, all workflow flags unset.
///
/// Calling this twice for the same project stores the matches twice. The
/// batch is written in a single transaction, so a failure leaves no record of
/// this batch behind and is reported with `persisted: 0`.
pub fn persist_matches<R>(
    repo: &R,
    project_id: ProjectId,
    matches: &[RankedMatch],
) -> MatchingResult<usize>
where
    R: MatchWriter + ?Sized,
{
    if matches.is_empty() {
        return Ok(0);
    }

    let records = matches
        .iter()
        .map(|ranked| NewMatch::from_ranked(project_id, ranked))
        .collect::<Vec<_>>();

    match repo.create_matches(&records) {
        Ok(persisted) => Ok(persisted),
        Err(error) => {
            log::error!(
                "Failed to persist {} matches for project {project_id}: {error}",
                records.len()
            );
            Err(MatchingError::PartialPersistence {
                project_id: project_id.get(),
                persisted: 0,
                total: records.len(),
                reason: error.to_string(),
            })
        }
    }
}
