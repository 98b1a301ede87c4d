use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
    error::{AppError, AppResult},
    models::{CoherenceScore, Genre, Language, MovieDetails, MovieRecord},
    services::{
        catalog::{CatalogClient, FetchNotice, MAX_COUNT, MIN_COUNT},
        genre_resolver::{GenreResolver, Signal},
        plot_scorer::PlotScorer,
    },
};

/// Where a session is in the recommendation cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    #[default]
    Idle,
    Resolving,
    Fetching,
    Ready,
    Scoring,
}

impl Phase {
    fn can_transition_to(self, next: Phase) -> bool {
        use Phase::*;
        matches!(
            (self, next),
            (_, Resolving)
                | (Resolving, Fetching)
                | (Fetching, Ready)
                | (Ready, Scoring)
                | (Scoring, Ready)
                | (_, Idle)
        )
    }
}

/// What the user asked for
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Preferences {
    pub signal: Signal,
    #[serde(default)]
    pub language: Language,
    #[serde(default = "default_count")]
    pub count: usize,
}

fn default_count() -> usize {
    8
}

impl Preferences {
    pub fn validate(&self) -> AppResult<()> {
        if self.signal.text().trim().is_empty() {
            return Err(AppError::InvalidInput(
                "Mood, request or genre cannot be empty".to_string(),
            ));
        }
        if !(MIN_COUNT..=MAX_COUNT).contains(&self.count) {
            return Err(AppError::InvalidInput(format!(
                "count must be between {} and {}",
                MIN_COUNT, MAX_COUNT
            )));
        }
        Ok(())
    }
}

/// Scores are attached by title and position, so a score can never leak onto
/// a different movie.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct MovieKey {
    position: usize,
    title: String,
}

/// State of one user interaction cycle.
///
/// Owned by the caller and handed to the [`Orchestrator`] for each
/// transition. A new submission replaces it wholesale.
#[derive(Debug, Clone, Default)]
pub struct RequestContext {
    phase: Phase,
    preferences: Option<Preferences>,
    genre: Option<Genre>,
    movies: Vec<MovieRecord>,
    scores: HashMap<MovieKey, CoherenceScore>,
    notice: Option<FetchNotice>,
    updated_at: Option<DateTime<Utc>>,
}

impl RequestContext {
    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn preferences(&self) -> Option<&Preferences> {
        self.preferences.as_ref()
    }

    pub fn genre(&self) -> Option<Genre> {
        self.genre
    }

    pub fn movies(&self) -> &[MovieRecord] {
        &self.movies
    }

    pub fn notice(&self) -> Option<&FetchNotice> {
        self.notice.as_ref()
    }

    pub fn updated_at(&self) -> Option<DateTime<Utc>> {
        self.updated_at
    }

    /// Score for the movie at `position`, if one has been computed
    pub fn score(&self, position: usize) -> Option<CoherenceScore> {
        let movie = self.movies.get(position)?;
        self.scores
            .get(&MovieKey {
                position,
                title: movie.title.clone(),
            })
            .copied()
    }

    pub fn scored_count(&self) -> usize {
        self.scores.len()
    }

    fn transition(&mut self, next: Phase) {
        debug_assert!(
            self.phase.can_transition_to(next),
            "illegal transition {:?} -> {:?}",
            self.phase,
            next
        );
        tracing::debug!(from = ?self.phase, to = ?next, "Phase transition");
        self.phase = next;
        self.updated_at = Some(Utc::now());
    }

    fn movie_at(&self, position: usize) -> AppResult<&MovieRecord> {
        self.movies
            .get(position)
            .ok_or_else(|| AppError::NotFound(format!("No movie at position {}", position)))
    }

    fn require_ready(&self) -> AppResult<()> {
        if self.phase == Phase::Ready {
            Ok(())
        } else {
            Err(AppError::Conflict(format!(
                "Session is {:?}; fetch recommendations first",
                self.phase
            )))
        }
    }
}

/// Holds a context in Scoring and returns it to Ready when dropped
struct ScoringPhase<'a> {
    ctx: &'a mut RequestContext,
}

impl<'a> ScoringPhase<'a> {
    fn enter(ctx: &'a mut RequestContext) -> Self {
        ctx.transition(Phase::Scoring);
        Self { ctx }
    }
}

impl Drop for ScoringPhase<'_> {
    fn drop(&mut self) {
        self.ctx.transition(Phase::Ready);
    }
}

/// Sequences genre resolution, catalog discovery and on-demand plot scoring.
///
/// Holds no interaction state of its own; every transition works on a
/// caller-owned [`RequestContext`].
#[derive(Clone)]
pub struct Orchestrator {
    resolver: GenreResolver,
    catalog: Option<CatalogClient>,
    scorer: PlotScorer,
}

impl Orchestrator {
    pub fn new(resolver: GenreResolver, catalog: Option<CatalogClient>, scorer: PlotScorer) -> Self {
        Self {
            resolver,
            catalog,
            scorer,
        }
    }

    /// False when the catalog credential is missing
    pub fn can_recommend(&self) -> bool {
        self.catalog.is_some()
    }

    /// Idle/Ready -> Resolving -> Fetching -> Ready.
    ///
    /// Produces a fresh context; nothing from a previous cycle survives.
    pub async fn submit(&self, preferences: Preferences) -> AppResult<RequestContext> {
        let Some(catalog) = &self.catalog else {
            return Err(AppError::MissingCredential("TMDB_API_KEY"));
        };
        preferences.validate()?;

        let mut ctx = RequestContext::default();
        ctx.transition(Phase::Resolving);
        let genre = self.resolver.resolve(&preferences.signal).await;
        ctx.genre = Some(genre);

        ctx.transition(Phase::Fetching);
        let fetch = catalog
            .fetch(genre, preferences.language, preferences.count)
            .await;
        ctx.movies = fetch.movies;
        ctx.notice = fetch.notice;
        ctx.preferences = Some(preferences);

        ctx.transition(Phase::Ready);
        tracing::info!(
            genre = %genre,
            movies = ctx.movies.len(),
            "Recommendations ready"
        );

        Ok(ctx)
    }

    /// Ready -> Scoring -> Ready for one movie. Already scored movies are left
    /// alone and the model is not called again.
    pub async fn score_movie(&self, ctx: &mut RequestContext, position: usize) -> AppResult<CoherenceScore> {
        ctx.require_ready()?;
        let movie = ctx.movie_at(position)?;

        if let Some(existing) = ctx.score(position) {
            tracing::debug!(position, "Movie already scored");
            return Ok(existing);
        }

        let key = MovieKey {
            position,
            title: movie.title.clone(),
        };
        let overview = movie.overview.clone();
        let genre = ctx.genre.unwrap_or(self.resolver.default_genre());

        // Dropping the future mid-call still lands back in Ready.
        let mut scoring = ScoringPhase::enter(ctx);
        let score = self.scorer.score(&key.title, &overview, genre).await;
        scoring.ctx.scores.insert(key, score);

        Ok(score)
    }

    /// Scores every movie that has no score yet, one at a time
    pub async fn score_all(&self, ctx: &mut RequestContext) -> AppResult<usize> {
        ctx.require_ready()?;

        let mut scored = 0;
        for position in 0..ctx.movies.len() {
            if ctx.score(position).is_none() {
                self.score_movie(ctx, position).await?;
                scored += 1;
            }
        }

        tracing::info!(scored, total = ctx.movies.len(), "Batch scoring completed");
        Ok(scored)
    }

    /// Any phase -> Idle. Drops the movie list and every computed score.
    pub fn reset(&self, ctx: &mut RequestContext) {
        ctx.transition(Phase::Idle);
        *ctx = RequestContext {
            updated_at: Some(Utc::now()),
            ..RequestContext::default()
        };
    }

    /// Detail lookup for a movie in the current list
    pub async fn details(&self, ctx: &RequestContext, position: usize) -> AppResult<MovieDetails> {
        let catalog = self
            .catalog
            .as_ref()
            .ok_or(AppError::MissingCredential("TMDB_API_KEY"))?;
        let movie = ctx.movie_at(position)?;

        catalog.details(movie.id).await.ok_or_else(|| {
            AppError::ExternalApi(format!("Details unavailable for '{}'", movie.title))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{TmdbMovie, TmdbMovieDetails};
    use crate::services::providers::{
        CompletionRequest, LlmProvider, MockCatalogProvider, MockLlmProvider,
    };
    use crate::services::retry::RetryPolicy;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    fn titles(names: &[&str]) -> Vec<TmdbMovie> {
        names
            .iter()
            .enumerate()
            .map(|(i, name)| TmdbMovie {
                id: i as u64 + 1,
                title: name.to_string(),
                overview: Some(format!("{} has a plot.", name)),
                release_date: Some("2004-05-01".to_string()),
                vote_average: Some(7.2),
                popularity: Some(50.0),
                poster_path: None,
                genre_ids: vec![35],
            })
            .collect()
    }

    fn catalog_returning(names: &'static [&'static str]) -> CatalogClient {
        let mut mock = MockCatalogProvider::new();
        mock.expect_discover()
            .withf(|query| query.genre_code == 35)
            .returning(move |_| Ok(titles(names)));
        mock.expect_name().return_const("mock");
        CatalogClient::new(Arc::new(mock), RetryPolicy::fixed(3, Duration::ZERO), "")
    }

    /// Model mock that predicts comedy and scores every plot 7.5
    fn llm(score_calls: Arc<AtomicUsize>) -> Arc<dyn LlmProvider> {
        let mut mock = MockLlmProvider::new();
        mock.expect_complete().returning(move |request| {
            if request.max_tokens == 50 {
                Ok("comedy".to_string())
            } else {
                score_calls.fetch_add(1, Ordering::SeqCst);
                Ok("7.5".to_string())
            }
        });
        mock.expect_name().return_const("mock");
        Arc::new(mock)
    }

    fn orchestrator(score_calls: Arc<AtomicUsize>) -> Orchestrator {
        let llm = llm(score_calls);
        Orchestrator::new(
            GenreResolver::new(Some(llm.clone()), Genre::Drama),
            Some(catalog_returning(&["Superbad", "Step Brothers", "Anchorman"])),
            PlotScorer::new(Some(llm)),
        )
    }

    fn happy() -> Preferences {
        Preferences {
            signal: Signal::Mood("happy".to_string()),
            language: Language::English,
            count: 8,
        }
    }

    #[tokio::test]
    async fn test_happy_mood_yields_three_unscored_comedies() {
        let orchestrator = orchestrator(Arc::new(AtomicUsize::new(0)));
        let ctx = orchestrator.submit(happy()).await.unwrap();

        assert_eq!(ctx.phase(), Phase::Ready);
        assert_eq!(ctx.genre(), Some(Genre::Comedy));
        assert_eq!(ctx.movies().len(), 3);
        assert_eq!(ctx.scored_count(), 0);
        assert!((0..3).all(|i| ctx.score(i).is_none()));
        assert_eq!(ctx.notice(), None);
    }

    #[tokio::test]
    async fn test_submit_blocked_without_catalog() {
        let orchestrator = Orchestrator::new(
            GenreResolver::new(None, Genre::Drama),
            None,
            PlotScorer::new(None),
        );

        assert!(!orchestrator.can_recommend());
        let err = orchestrator.submit(happy()).await.unwrap_err();
        assert!(matches!(err, AppError::MissingCredential("TMDB_API_KEY")));
    }

    #[tokio::test]
    async fn test_submit_rejects_out_of_range_count() {
        let orchestrator = orchestrator(Arc::new(AtomicUsize::new(0)));
        let err = orchestrator
            .submit(Preferences { count: 40, ..happy() })
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn test_scoring_is_idempotent() {
        let score_calls = Arc::new(AtomicUsize::new(0));
        let orchestrator = orchestrator(score_calls.clone());
        let mut ctx = orchestrator.submit(happy()).await.unwrap();

        let first = orchestrator.score_movie(&mut ctx, 1).await.unwrap();
        let second = orchestrator.score_movie(&mut ctx, 1).await.unwrap();

        assert_eq!(first.to_string(), "7.5/10");
        assert_eq!(first, second);
        assert_eq!(score_calls.load(Ordering::SeqCst), 1);
        assert_eq!(ctx.phase(), Phase::Ready);
    }

    #[tokio::test]
    async fn test_score_all_skips_scored_movies() {
        let score_calls = Arc::new(AtomicUsize::new(0));
        let orchestrator = orchestrator(score_calls.clone());
        let mut ctx = orchestrator.submit(happy()).await.unwrap();

        orchestrator.score_movie(&mut ctx, 0).await.unwrap();
        let scored = orchestrator.score_all(&mut ctx).await.unwrap();

        assert_eq!(scored, 2);
        assert_eq!(ctx.scored_count(), 3);
        assert_eq!(score_calls.load(Ordering::SeqCst), 3);

        assert_eq!(orchestrator.score_all(&mut ctx).await.unwrap(), 0);
        assert_eq!(score_calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_scoring_requires_ready_and_valid_position() {
        let orchestrator = orchestrator(Arc::new(AtomicUsize::new(0)));

        let mut idle = RequestContext::default();
        let err = orchestrator.score_movie(&mut idle, 0).await.unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));

        let mut ctx = orchestrator.submit(happy()).await.unwrap();
        let err = orchestrator.score_movie(&mut ctx, 3).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    struct Unresponsive;

    #[async_trait::async_trait]
    impl LlmProvider for Unresponsive {
        async fn complete(&self, _request: CompletionRequest) -> AppResult<String> {
            std::future::pending().await
        }

        fn name(&self) -> &'static str {
            "unresponsive"
        }
    }

    #[tokio::test]
    async fn test_abandoned_scoring_returns_to_ready() {
        let orchestrator = Orchestrator::new(
            GenreResolver::new(None, Genre::Comedy),
            Some(catalog_returning(&["Superbad", "Step Brothers", "Anchorman"])),
            PlotScorer::new(Some(Arc::new(Unresponsive) as Arc<dyn LlmProvider>)),
        );
        let mut ctx = orchestrator.submit(happy()).await.unwrap();

        let abandoned = tokio::time::timeout(
            Duration::from_millis(20),
            orchestrator.score_movie(&mut ctx, 0),
        )
        .await;

        assert!(abandoned.is_err());
        assert_eq!(ctx.phase(), Phase::Ready);
        assert_eq!(ctx.score(0), None);
        assert!(ctx.require_ready().is_ok());

        orchestrator.reset(&mut ctx);
        assert_eq!(ctx.phase(), Phase::Idle);
    }

    #[test]
    fn test_reset_is_allowed_from_every_phase() {
        let orchestrator = Orchestrator::new(
            GenreResolver::new(None, Genre::Drama),
            None,
            PlotScorer::new(None),
        );

        for phase in [
            Phase::Idle,
            Phase::Resolving,
            Phase::Fetching,
            Phase::Ready,
            Phase::Scoring,
        ] {
            let mut ctx = RequestContext {
                phase,
                ..RequestContext::default()
            };
            orchestrator.reset(&mut ctx);
            assert_eq!(ctx.phase(), Phase::Idle);
        }
    }

    #[tokio::test]
    async fn test_reset_discards_scores() {
        let orchestrator = orchestrator(Arc::new(AtomicUsize::new(0)));
        let mut ctx = orchestrator.submit(happy()).await.unwrap();
        orchestrator.score_all(&mut ctx).await.unwrap();

        orchestrator.reset(&mut ctx);

        assert_eq!(ctx.phase(), Phase::Idle);
        assert!(ctx.movies().is_empty());
        assert_eq!(ctx.scored_count(), 0);
        assert_eq!(ctx.genre(), None);
    }

    #[tokio::test]
    async fn test_new_submission_replaces_context() {
        let score_calls = Arc::new(AtomicUsize::new(0));
        let orchestrator = orchestrator(score_calls.clone());
        let mut ctx = orchestrator.submit(happy()).await.unwrap();
        orchestrator.score_all(&mut ctx).await.unwrap();

        ctx = orchestrator.submit(happy()).await.unwrap();

        assert_eq!(ctx.movies().len(), 3);
        assert_eq!(ctx.scored_count(), 0);
    }

    #[tokio::test]
    async fn test_empty_catalog_still_reaches_ready() {
        let mut mock = MockCatalogProvider::new();
        mock.expect_discover()
            .times(2)
            .returning(|_| Err(AppError::Timeout("slow".to_string())));
        mock.expect_name().return_const("mock");

        let orchestrator = Orchestrator::new(
            GenreResolver::new(None, Genre::Drama),
            Some(CatalogClient::new(
                Arc::new(mock),
                RetryPolicy::fixed(2, Duration::ZERO),
                "",
            )),
            PlotScorer::new(None),
        );

        let ctx = orchestrator.submit(happy()).await.unwrap();
        assert_eq!(ctx.phase(), Phase::Ready);
        assert_eq!(ctx.genre(), Some(Genre::Drama));
        assert!(ctx.movies().is_empty());
        assert_eq!(
            ctx.notice(),
            Some(&FetchNotice::RetriesExhausted { attempts: 2 })
        );
    }

    #[tokio::test]
    async fn test_details_for_position() {
        let mut mock = MockCatalogProvider::new();
        mock.expect_discover()
            .returning(|_| Ok(titles(&["Superbad"])));
        mock.expect_movie_details()
            .with(mockall::predicate::eq(1))
            .times(1)
            .returning(|_| {
                Ok(TmdbMovieDetails {
                    runtime: Some(113),
                    budget: None,
                    revenue: None,
                    imdb_id: Some("tt0829482".to_string()),
                    credits: None,
                })
            });
        mock.expect_name().return_const("mock");

        let orchestrator = Orchestrator::new(
            GenreResolver::new(None, Genre::Comedy),
            Some(CatalogClient::new(
                Arc::new(mock),
                RetryPolicy::fixed(1, Duration::ZERO),
                "",
            )),
            PlotScorer::new(None),
        );

        let ctx = orchestrator
            .submit(Preferences {
                signal: Signal::Genre("comedy".to_string()),
                ..happy()
            })
            .await
            .unwrap();

        let details = orchestrator.details(&ctx, 0).await.unwrap();
        assert_eq!(details.imdb_id, "tt0829482");
        assert!(matches!(
            orchestrator.details(&ctx, 5).await,
            Err(AppError::NotFound(_))
        ));
    }

    #[test]
    fn test_phase_transitions() {
        assert!(Phase::Idle.can_transition_to(Phase::Resolving));
        assert!(Phase::Ready.can_transition_to(Phase::Resolving));
        assert!(Phase::Fetching.can_transition_to(Phase::Ready));
        assert!(!Phase::Idle.can_transition_to(Phase::Scoring));
        assert!(!Phase::Resolving.can_transition_to(Phase::Ready));
    }

    #[test]
    fn test_preferences_deserialize_with_defaults() {
        let prefs: Preferences =
            serde_json::from_str(r#"{ "signal": { "mood": "happy" } }"#).unwrap();
        assert_eq!(prefs.signal, Signal::Mood("happy".to_string()));
        assert_eq!(prefs.language, Language::English);
        assert_eq!(prefs.count, 8);
    }
}
