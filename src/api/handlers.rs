use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::{
    error::AppResult,
    middleware::request_id::RequestId,
    models::{CoherenceScore, Genre, Language, MovieDetails, MovieRecord},
    services::{FetchNotice, Phase, Preferences, RequestContext, Signal},
};

use super::AppState;

// Response types

#[derive(Debug, Serialize)]
pub struct GenreResponse {
    pub name: Genre,
    pub tmdb_code: u32,
}

#[derive(Debug, Serialize)]
pub struct LanguageResponse {
    pub name: Language,
    pub code: &'static str,
}

#[derive(Debug, Serialize)]
pub struct MovieResponse {
    pub position: usize,
    #[serde(flatten)]
    pub movie: MovieRecord,
    pub year: String,
    pub coherence_score: Option<CoherenceScore>,
}

/// Read-only view of a session's context
#[derive(Debug, Serialize)]
pub struct SessionResponse {
    pub session_id: Uuid,
    pub phase: Phase,
    pub signal: Option<Signal>,
    pub language: Option<Language>,
    pub count: Option<usize>,
    pub genre: Option<Genre>,
    pub movies: Vec<MovieResponse>,
    pub notice: Option<FetchNotice>,
    /// Inline status line for the display layer
    pub status: Option<String>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl SessionResponse {
    pub fn from_context(session_id: Uuid, ctx: &RequestContext) -> Self {
        let movies = ctx
            .movies()
            .iter()
            .enumerate()
            .map(|(position, movie)| MovieResponse {
                position,
                movie: movie.clone(),
                year: movie.year_label(),
                coherence_score: ctx.score(position),
            })
            .collect();

        let preferences = ctx.preferences();

        Self {
            session_id,
            phase: ctx.phase(),
            signal: preferences.map(|p| p.signal.clone()),
            language: preferences.map(|p| p.language),
            count: preferences.map(|p| p.count),
            genre: ctx.genre(),
            movies,
            notice: ctx.notice().cloned(),
            status: status_line(ctx),
            updated_at: ctx.updated_at(),
        }
    }
}

fn status_line(ctx: &RequestContext) -> Option<String> {
    if let Some(notice) = ctx.notice() {
        return Some(notice.message());
    }

    let genre = ctx.genre()?;
    let found = ctx.movies().len();
    Some(if found == 0 {
        format!(
            "No {} movies found. Try a different mood or language.",
            genre
        )
    } else {
        format!("Predicted genre: {}. Found {} movies.", genre, found)
    })
}

#[derive(Debug, Serialize)]
pub struct ScoreResponse {
    pub position: usize,
    pub coherence_score: CoherenceScore,
    pub session: SessionResponse,
}

#[derive(Debug, Serialize)]
pub struct BatchScoreResponse {
    pub newly_scored: usize,
    pub session: SessionResponse,
}

// Handlers

/// Health check endpoint
pub async fn health_check() -> (StatusCode, Json<Value>) {
    (StatusCode::OK, Json(json!({ "status": "healthy" })))
}

/// The fixed genre taxonomy
pub async fn list_genres() -> Json<Vec<GenreResponse>> {
    Json(
        Genre::ALL
            .iter()
            .map(|genre| GenreResponse {
                name: *genre,
                tmdb_code: genre.tmdb_code(),
            })
            .collect(),
    )
}

/// Supported language filters
pub async fn list_languages() -> Json<Vec<LanguageResponse>> {
    Json(
        Language::ALL
            .iter()
            .map(|language| LanguageResponse {
                name: *language,
                code: language.code(),
            })
            .collect(),
    )
}

/// Start a new, idle session
pub async fn create_session(
    State(state): State<AppState>,
) -> (StatusCode, Json<SessionResponse>) {
    let (id, handle) = state.create_session().await;
    let ctx = handle.lock().await;
    (
        StatusCode::CREATED,
        Json(SessionResponse::from_context(id, &ctx)),
    )
}

/// Current snapshot of a session
pub async fn get_session(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<SessionResponse>> {
    let handle = state.session(id).await?;
    let ctx = handle.lock().await;
    Ok(Json(SessionResponse::from_context(id, &ctx)))
}

/// Drop a session entirely
pub async fn delete_session(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<StatusCode> {
    state.remove_session(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Resolve a genre and fetch matching movies, replacing the session's context
pub async fn recommend(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Extension(request_id): Extension<RequestId>,
    Json(preferences): Json<Preferences>,
) -> AppResult<Json<SessionResponse>> {
    tracing::info!(
        request_id = %request_id,
        session_id = %id,
        signal = ?preferences.signal,
        language = ?preferences.language,
        count = preferences.count,
        "Processing recommendation request"
    );

    let handle = state.session(id).await?;
    let mut ctx = handle.lock().await;
    *ctx = state.orchestrator.submit(preferences).await?;

    tracing::info!(
        request_id = %request_id,
        session_id = %id,
        movies = ctx.movies().len(),
        "Recommendation completed"
    );

    Ok(Json(SessionResponse::from_context(id, &ctx)))
}

/// Score one movie's plot coherence
pub async fn score_movie(
    State(state): State<AppState>,
    Path((id, position)): Path<(Uuid, usize)>,
) -> AppResult<Json<ScoreResponse>> {
    let handle = state.session(id).await?;
    let mut ctx = handle.lock().await;
    let coherence_score = state.orchestrator.score_movie(&mut ctx, position).await?;

    Ok(Json(ScoreResponse {
        position,
        coherence_score,
        session: SessionResponse::from_context(id, &ctx),
    }))
}

/// Score every movie that has no score yet
pub async fn score_all(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<BatchScoreResponse>> {
    let handle = state.session(id).await?;
    let mut ctx = handle.lock().await;
    let newly_scored = state.orchestrator.score_all(&mut ctx).await?;

    Ok(Json(BatchScoreResponse {
        newly_scored,
        session: SessionResponse::from_context(id, &ctx),
    }))
}

/// Director, cast and budget details for one movie
pub async fn movie_details(
    State(state): State<AppState>,
    Path((id, position)): Path<(Uuid, usize)>,
) -> AppResult<Json<MovieDetails>> {
    let handle = state.session(id).await?;
    let ctx = handle.lock().await;
    let details = state.orchestrator.details(&ctx, position).await?;
    Ok(Json(details))
}

/// Return the session to Idle, discarding movies and scores
pub async fn reset(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<SessionResponse>> {
    let handle = state.session(id).await?;
    let mut ctx = handle.lock().await;
    state.orchestrator.reset(&mut ctx);
    Ok(Json(SessionResponse::from_context(id, &ctx)))
}
