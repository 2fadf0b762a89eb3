use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use crate::domain::matching::{MatchProposal, RankedMatch};
use crate::domain::types::ProjectId;
use crate::errors::{MatchingError, MatchingResult};
use crate::models::config::MatchingSettings;
use crate::processing::embedding::{Embedder, validate_text};
use crate::processing::index::{SharedIndex, VectorIndexClient, build_researcher_index};
use crate::processing::persist::persist_matches;
use crate::processing::ranking::rank;
use crate::repository::{
    MatchWriter, ProjectReader, RepositoryError, ResearcherReader, ResearcherWriter,
};

/// Backoff before the retry following `attempt` (1-based), doubling each time.
fn backoff_delay(base_ms: u64, attempt: u32) -> Duration {
    let factor = 1_u64 << attempt.saturating_sub(1).min(16);
    Duration::from_millis(base_ms.saturating_mul(factor))
}

/// Run `step` until it succeeds, fails permanently or runs out of attempts.
async fn retry_transient<T, F, Fut>(
    settings: &MatchingSettings,
    label: &str,
    mut step: F,
) -> MatchingResult<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = MatchingResult<T>>,
{
    let attempts = settings.max_attempts.max(1);
    let mut attempt = 1;
    loop {
        match step().await {
            Ok(value) => return Ok(value),
            Err(error) if error.is_transient() && attempt < attempts => {
                let delay = backoff_delay(settings.retry_backoff_ms, attempt);
                log::warn!(
                    "{label} failed on attempt {attempt}/{attempts}: {error}; retrying in {delay:?}"
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(error) => return Err(error),
        }
    }
}

fn worker_error(join_error: tokio::task::JoinError) -> MatchingError {
    MatchingError::Worker(join_error.to_string())
}

/// Run blocking work off the async runtime, bounded by `limit`.
///
/// A timeout is reported through `on_failure`, a panicked worker as
/// [`MatchingError::Worker`].
async fn run_blocking<T, F>(
    limit: Duration,
    on_failure: fn(String) -> MatchingError,
    job: F,
) -> MatchingResult<T>
where
    T: Send + 'static,
    F: FnOnce() -> MatchingResult<T> + Send + 'static,
{
    match tokio::time::timeout(limit, tokio::task::spawn_blocking(job)).await {
        Ok(Ok(result)) => result,
        Ok(Err(join_error)) => Err(worker_error(join_error)),
        Err(_) => Err(on_failure(format!("timed out after {limit:?}"))),
    }
}

/// Composes embedding, search, ranking and persistence into one matching run.
pub struct MatchingOrchestrator<E, I, R> {
    embedder: Arc<E>,
    index: Arc<I>,
    repo: Arc<R>,
    settings: MatchingSettings,
}

impl<E, I, R> MatchingOrchestrator<E, I, R>
where
    E: Embedder + 'static,
    I: VectorIndexClient + 'static,
    R: ProjectReader + MatchWriter + Send + Sync + 'static,
{
    pub fn new(embedder: Arc<E>, index: Arc<I>, repo: Arc<R>, settings: MatchingSettings) -> Self {
        Self {
            embedder,
            index,
            repo,
            settings,
        }
    }

    /// Load the embedding model ahead of the first run.
    ///
    /// Not bounded by `embed_timeout_ms`, so a cold model cache cannot use up
    /// the retries of the first matching run.
    pub async fn warm_up(&self) -> MatchingResult<()> {
        let embedder = Arc::clone(&self.embedder);
        tokio::task::spawn_blocking(move || embedder.warm_up())
            .await
            .map_err(worker_error)?
    }

    /// Propose researchers for a project and store one match per proposal.
    ///
    /// Any failure aborts the run before persistence, so nothing is stored
    /// unless the final write commits.
    pub async fn propose_researchers(
        &self,
        project_id: ProjectId,
        consultation_text: &str,
    ) -> MatchingResult<Vec<RankedMatch>> {
        let text = validate_text(consultation_text)?.to_string();

        let query = retry_transient(&self.settings, "embedding", || {
            let embedder = Arc::clone(&self.embedder);
            let text = text.clone();
            run_blocking(
                Duration::from_millis(self.settings.embed_timeout_ms),
                MatchingError::EmbedderUnavailable,
                move || embedder.embed(&text),
            )
        })
        .await?;

        if query.len() != self.index.dimensions() {
            return Err(MatchingError::DimensionMismatch {
                expected: self.index.dimensions(),
                actual: query.len(),
            });
        }

        let query = Arc::new(query);
        let top_k = self.settings.top_k;
        let hits = retry_transient(&self.settings, "index search", || {
            let index = Arc::clone(&self.index);
            let query = Arc::clone(&query);
            run_blocking(
                Duration::from_millis(self.settings.search_timeout_ms),
                MatchingError::IndexQuery,
                move || index.search(&query, top_k),
            )
        })
        .await?;
        let hit_count = hits.len();

        let ranked = rank(hits, self.settings.limit);

        let repo = Arc::clone(&self.repo);
        let to_store = ranked.clone();
        let persisted = tokio::task::spawn_blocking(move || {
            persist_matches(repo.as_ref(), project_id, &to_store)
        })
        .await
        .map_err(|join_error| MatchingError::PartialPersistence {
            project_id: project_id.get(),
            persisted: 0,
            total: ranked.len(),
            reason: format!("persistence worker failed: {join_error}"),
        })??;

        log::info!(
            "Matched project {project_id}: hits={hit_count}, ranked={}, persisted={persisted}",
            ranked.len()
        );

        Ok(ranked)
    }

    /// Load a project, propose researchers for it and shape the result for display.
    pub async fn match_project(&self, project_id: ProjectId) -> MatchingResult<Vec<MatchProposal>> {
        let repo = Arc::clone(&self.repo);
        let project = tokio::task::spawn_blocking(move || repo.get_project(project_id))
            .await
            .map_err(worker_error)?
            .map_err(|error| match error {
                RepositoryError::NotFound => MatchingError::ProjectNotFound(project_id.get()),
                other => MatchingError::Repository(other),
            })?;

        let ranked = self
            .propose_researchers(project_id, &project.consultation_content)
            .await?;

        Ok(ranked
            .iter()
            .map(|ranked| MatchProposal::new(&project.project_title, ranked))
            .collect())
    }
}

impl<E, R> MatchingOrchestrator<E, SharedIndex, R>
where
    E: Embedder + 'static,
    R: ProjectReader + MatchWriter + ResearcherReader + ResearcherWriter + Send + Sync + 'static,
{
    /// Rebuild the researcher index from storage and swap it in.
    ///
    /// Picks up researchers and documents stored since the last build.
    /// Searches keep using the previous index until the new one is ready.
    pub async fn rebuild_index(&self) -> MatchingResult<usize> {
        let embedder = Arc::clone(&self.embedder);
        let repo = Arc::clone(&self.repo);
        let settings = self.settings.clone();
        let rebuilt = tokio::task::spawn_blocking(move || {
            build_researcher_index(repo.as_ref(), embedder.as_ref(), &settings)
        })
        .await
        .map_err(worker_error)??;

        let indexed = rebuilt.len();
        self.index.replace(rebuilt);
        Ok(indexed)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    use super::{MatchingOrchestrator, backoff_delay};
    use crate::domain::matching::{NewMatch, WorkflowFlag};
    use crate::domain::project::Project;
    use crate::domain::researcher::{CandidateHit, ResearcherProfile};
    use crate::domain::types::{DocumentId, MatchId, ProjectId, ResearcherId};
    use crate::errors::{MatchingError, MatchingResult};
    use crate::models::config::MatchingSettings;
    use crate::processing::embedding::{Embedder, validate_text};
    use crate::processing::index::VectorIndexClient;
    use crate::repository::{
        MatchWriter, ProjectReader, RepositoryError, RepositoryResult,
    };

    struct StubEmbedder {
        calls: AtomicUsize,
        failures_before_success: usize,
        vector: Vec<f32>,
        load_delay: Duration,
        loaded: AtomicBool,
    }

    impl StubEmbedder {
        fn new(vector: Vec<f32>) -> Self {
            Self {
                calls: AtomicUsize::new(0),
                failures_before_success: 0,
                vector,
                load_delay: Duration::ZERO,
                loaded: AtomicBool::new(false),
            }
        }

        fn load(&self) {
            if !self.loaded.load(Ordering::SeqCst) {
                std::thread::sleep(self.load_delay);
                self.loaded.store(true, Ordering::SeqCst);
            }
        }
    }

    impl Embedder for StubEmbedder {
        fn embed(&self, text: &str) -> MatchingResult<Vec<f32>> {
            validate_text(text)?;
            self.load();
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            if call < self.failures_before_success {
                return Err(MatchingError::EmbedderUnavailable(
                    "model warming up".to_string(),
                ));
            }
            Ok(self.vector.clone())
        }

        fn dimensions(&self) -> usize {
            self.vector.len()
        }

        fn warm_up(&self) -> MatchingResult<()> {
            self.load();
            Ok(())
        }
    }

    enum IndexBehavior {
        Hits(Vec<CandidateHit>),
        Fail,
        Slow,
    }

    struct StubIndex {
        calls: AtomicUsize,
        dimensions: usize,
        behavior: IndexBehavior,
    }

    impl StubIndex {
        fn new(dimensions: usize, behavior: IndexBehavior) -> Self {
            Self {
                calls: AtomicUsize::new(0),
                dimensions,
                behavior,
            }
        }
    }

    impl VectorIndexClient for StubIndex {
        fn search(&self, query: &[f32], _top_k: usize) -> MatchingResult<Vec<CandidateHit>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if query.len() != self.dimensions {
                return Err(MatchingError::DimensionMismatch {
                    expected: self.dimensions,
                    actual: query.len(),
                });
            }
            match &self.behavior {
                IndexBehavior::Hits(hits) => Ok(hits.clone()),
                IndexBehavior::Fail => Err(MatchingError::IndexQuery(
                    "connection reset".to_string(),
                )),
                IndexBehavior::Slow => {
                    std::thread::sleep(Duration::from_millis(200));
                    Ok(Vec::new())
                }
            }
        }

        fn dimensions(&self) -> usize {
            self.dimensions
        }
    }

    #[derive(Default)]
    struct FakeRepo {
        project: Option<Project>,
        panic_on_load: bool,
        stored: Mutex<Vec<NewMatch>>,
    }

    impl FakeRepo {
        fn stored(&self) -> Vec<NewMatch> {
            self.stored.lock().expect("stored mutex poisoned").clone()
        }
    }

    impl ProjectReader for FakeRepo {
        fn get_project(&self, _project_id: ProjectId) -> RepositoryResult<Project> {
            if self.panic_on_load {
                panic!("connection handle dropped mid-query");
            }
            self.project.clone().ok_or(RepositoryError::NotFound)
        }
    }

    impl MatchWriter for FakeRepo {
        fn create_matches(&self, matches: &[NewMatch]) -> RepositoryResult<usize> {
            let mut stored = self.stored.lock().expect("stored mutex poisoned");
            stored.extend_from_slice(matches);
            Ok(matches.len())
        }

        fn set_workflow_flag(
            &self,
            _match_id: MatchId,
            _flag: WorkflowFlag,
            _value: bool,
        ) -> RepositoryResult<usize> {
            Ok(1)
        }
    }

    fn hit(document_id: i32, researcher_id: i32, score: f32) -> CandidateHit {
        CandidateHit {
            document_id: DocumentId::new(document_id).expect("valid id"),
            researcher: ResearcherProfile {
                id: ResearcherId::new(researcher_id).expect("valid id"),
                name: format!("Researcher {researcher_id}"),
                name_kana: Some("けんきゅうしゃ".to_string()),
                institution: Some("Tokyo University".to_string()),
                affiliation: Some("Engineering".to_string()),
                position: Some("Professor".to_string()),
                kaken_url: None,
            },
            score,
        }
    }

    fn fast_settings() -> MatchingSettings {
        MatchingSettings {
            retry_backoff_ms: 1,
            search_timeout_ms: 50,
            ..Default::default()
        }
    }

    fn project_id() -> ProjectId {
        ProjectId::new(1).expect("valid id")
    }

    fn orchestrator(
        embedder: StubEmbedder,
        index: StubIndex,
        repo: FakeRepo,
    ) -> (
        MatchingOrchestrator<StubEmbedder, StubIndex, FakeRepo>,
        Arc<StubEmbedder>,
        Arc<StubIndex>,
        Arc<FakeRepo>,
    ) {
        let embedder = Arc::new(embedder);
        let index = Arc::new(index);
        let repo = Arc::new(repo);
        (
            MatchingOrchestrator::new(
                Arc::clone(&embedder),
                Arc::clone(&index),
                Arc::clone(&repo),
                fast_settings(),
            ),
            embedder,
            index,
            repo,
        )
    }

    #[test]
    fn backoff_doubles_per_attempt() {
        assert_eq!(backoff_delay(100, 1), Duration::from_millis(100));
        assert_eq!(backoff_delay(100, 2), Duration::from_millis(200));
        assert_eq!(backoff_delay(100, 3), Duration::from_millis(400));
    }

    #[tokio::test]
    async fn proposes_deduplicated_ranking_and_persists_it() {
        let (orchestrator, _, _, repo) = orchestrator(
            StubEmbedder::new(vec![1.0, 0.0]),
            StubIndex::new(
                2,
                IndexBehavior::Hits(vec![hit(1, 1, 0.92), hit(2, 2, 0.80), hit(3, 1, 0.95)]),
            ),
            FakeRepo::default(),
        );

        let ranked = orchestrator
            .propose_researchers(project_id(), "soil microbiome analysis")
            .await
            .expect("matching should succeed");

        assert_eq!(
            ranked
                .iter()
                .map(|m| (m.researcher.id.get(), m.score))
                .collect::<Vec<_>>(),
            vec![(1, 95), (2, 80)]
        );
        assert_eq!(
            repo.stored()
                .iter()
                .map(|m| (m.project_id.get(), m.researcher_id.get(), m.matching_score))
                .collect::<Vec<_>>(),
            vec![(1, 1, 95), (1, 2, 80)]
        );
    }

    #[tokio::test]
    async fn fewer_hits_than_limit_are_returned_without_padding() {
        let (orchestrator, _, _, repo) = orchestrator(
            StubEmbedder::new(vec![1.0, 0.0]),
            StubIndex::new(
                2,
                IndexBehavior::Hits(vec![hit(1, 1, 0.5), hit(2, 2, 0.75), hit(3, 3, 0.25)]),
            ),
            FakeRepo::default(),
        );

        let ranked = orchestrator
            .propose_researchers(project_id(), "battery chemistry")
            .await
            .expect("matching should succeed");

        assert_eq!(ranked.len(), 3);
        assert_eq!(repo.stored().len(), 3);
    }

    #[tokio::test]
    async fn empty_text_fails_before_search_or_persistence() {
        let (orchestrator, embedder, index, repo) = orchestrator(
            StubEmbedder::new(vec![1.0, 0.0]),
            StubIndex::new(2, IndexBehavior::Hits(vec![hit(1, 1, 0.9)])),
            FakeRepo::default(),
        );

        let result = orchestrator.propose_researchers(project_id(), "  ").await;

        assert!(matches!(result, Err(MatchingError::InvalidInput(_))));
        assert_eq!(embedder.calls.load(Ordering::SeqCst), 0);
        assert_eq!(index.calls.load(Ordering::SeqCst), 0);
        assert!(repo.stored().is_empty());
    }

    #[tokio::test]
    async fn index_failure_persists_nothing_after_retries() {
        let (orchestrator, _, index, repo) = orchestrator(
            StubEmbedder::new(vec![1.0, 0.0]),
            StubIndex::new(2, IndexBehavior::Fail),
            FakeRepo::default(),
        );

        let result = orchestrator
            .propose_researchers(project_id(), "protein folding")
            .await;

        assert!(matches!(result, Err(MatchingError::IndexQuery(_))));
        assert_eq!(index.calls.load(Ordering::SeqCst), 3);
        assert!(repo.stored().is_empty());
    }

    #[tokio::test]
    async fn transient_embedder_failure_is_retried() {
        let embedder = StubEmbedder {
            failures_before_success: 2,
            ..StubEmbedder::new(vec![1.0, 0.0])
        };
        let (orchestrator, embedder, _, repo) = orchestrator(
            embedder,
            StubIndex::new(2, IndexBehavior::Hits(vec![hit(1, 1, 0.5)])),
            FakeRepo::default(),
        );

        let ranked = orchestrator
            .propose_researchers(project_id(), "coastal erosion")
            .await
            .expect("third attempt should succeed");

        assert_eq!(ranked.len(), 1);
        assert_eq!(embedder.calls.load(Ordering::SeqCst), 3);
        assert_eq!(repo.stored().len(), 1);
    }

    #[tokio::test]
    async fn dimension_mismatch_is_not_retried() {
        let (orchestrator, _, index, repo) = orchestrator(
            StubEmbedder::new(vec![1.0, 0.0, 0.0]),
            StubIndex::new(2, IndexBehavior::Hits(vec![hit(1, 1, 0.5)])),
            FakeRepo::default(),
        );

        let result = orchestrator
            .propose_researchers(project_id(), "quantum sensing")
            .await;

        assert!(matches!(
            result,
            Err(MatchingError::DimensionMismatch {
                expected: 2,
                actual: 3
            })
        ));
        assert_eq!(index.calls.load(Ordering::SeqCst), 0);
        assert!(repo.stored().is_empty());
    }

    #[tokio::test]
    async fn slow_search_times_out_as_index_error() {
        let (orchestrator, _, _, repo) = orchestrator(
            StubEmbedder::new(vec![1.0, 0.0]),
            StubIndex::new(2, IndexBehavior::Slow),
            FakeRepo::default(),
        );

        let result = orchestrator
            .propose_researchers(project_id(), "materials informatics")
            .await;

        assert!(matches!(result, Err(MatchingError::IndexQuery(message)) if message.contains("timed out")));
        assert!(repo.stored().is_empty());
    }

    #[tokio::test]
    async fn match_project_attaches_project_title() {
        let repo = FakeRepo {
            project: Some(Project {
                id: project_id(),
                consultation_category: "Joint research".to_string(),
                project_title: "Drought resistant rice".to_string(),
                consultation_content: "Looking for plant genomics expertise".to_string(),
                research_category: None,
                deadline: None,
                customer_id: Some(3),
            }),
            ..Default::default()
        };
        let (orchestrator, _, _, _) = orchestrator(
            StubEmbedder::new(vec![1.0, 0.0]),
            StubIndex::new(2, IndexBehavior::Hits(vec![hit(1, 5, 0.875)])),
            repo,
        );

        let proposals = orchestrator
            .match_project(project_id())
            .await
            .expect("matching should succeed");

        assert_eq!(proposals.len(), 1);
        assert_eq!(proposals[0].project_title, "Drought resistant rice");
        assert_eq!(proposals[0].matching_score, 87);
        assert_eq!(proposals[0].researcher_name, "Researcher 5");
        assert_eq!(proposals[0].position.as_deref(), Some("Professor"));
    }

    #[tokio::test]
    async fn match_project_reports_missing_project() {
        let (orchestrator, embedder, _, _) = orchestrator(
            StubEmbedder::new(vec![1.0, 0.0]),
            StubIndex::new(2, IndexBehavior::Hits(Vec::new())),
            FakeRepo::default(),
        );

        let result = orchestrator.match_project(project_id()).await;

        assert!(matches!(result, Err(MatchingError::ProjectNotFound(1))));
        assert_eq!(embedder.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn panicked_project_lookup_is_a_worker_failure() {
        let (orchestrator, embedder, _, repo) = orchestrator(
            StubEmbedder::new(vec![1.0, 0.0]),
            StubIndex::new(2, IndexBehavior::Hits(vec![hit(1, 1, 0.5)])),
            FakeRepo {
                panic_on_load: true,
                ..Default::default()
            },
        );

        let result = orchestrator.match_project(project_id()).await;

        assert!(matches!(result, Err(MatchingError::Worker(_))));
        assert_eq!(embedder.calls.load(Ordering::SeqCst), 0);
        assert!(repo.stored().is_empty());
    }

    fn slow_loading_orchestrator()
    -> MatchingOrchestrator<StubEmbedder, StubIndex, FakeRepo> {
        let embedder = StubEmbedder {
            load_delay: Duration::from_millis(200),
            ..StubEmbedder::new(vec![1.0, 0.0])
        };
        MatchingOrchestrator::new(
            Arc::new(embedder),
            Arc::new(StubIndex::new(2, IndexBehavior::Hits(vec![hit(1, 1, 0.5)]))),
            Arc::new(FakeRepo::default()),
            MatchingSettings {
                embed_timeout_ms: 50,
                max_attempts: 1,
                ..fast_settings()
            },
        )
    }

    #[tokio::test]
    async fn cold_model_load_counts_against_embed_timeout() {
        let orchestrator = slow_loading_orchestrator();

        let result = orchestrator
            .propose_researchers(project_id(), "marine biology")
            .await;

        assert!(matches!(result, Err(MatchingError::EmbedderUnavailable(message)) if message.contains("timed out")));
    }

    #[tokio::test]
    async fn warm_up_loads_model_outside_embed_timeout() {
        let orchestrator = slow_loading_orchestrator();

        orchestrator.warm_up().await.expect("warm up should succeed");
        let ranked = orchestrator
            .propose_researchers(project_id(), "marine biology")
            .await
            .expect("warmed model should answer within the timeout");

        assert_eq!(ranked.len(), 1);
        assert_eq!(ranked[0].score, 50);
    }
}
