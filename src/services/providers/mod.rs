/// External API provider abstractions
///
/// Two seams: a chat-completion model (genre prediction, plot scoring) and a
/// movie catalog (discovery, details). Each call is a single HTTP request;
/// retry and fallback policy live in the services that use them.
use crate::{
    error::AppResult,
    models::{TmdbMovie, TmdbMovieDetails},
};

pub mod openrouter;
pub mod tmdb;

/// One prompt sent to the model
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionRequest {
    pub system: String,
    pub prompt: String,
    /// Low values favor deterministic replies
    pub temperature: f32,
    pub max_tokens: u32,
}

/// Trait for chat-completion providers
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait LlmProvider: Send + Sync {
    /// Sends one system+user exchange and returns the raw text of the first
    /// choice.
    async fn complete(&self, request: CompletionRequest) -> AppResult<String>;

    /// Provider name for logging and debugging
    fn name(&self) -> &'static str;
}

/// Parameters of one discovery query
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoverQuery {
    pub genre_code: u32,
    pub language: &'static str,
    pub sort_by: &'static str,
    pub page: u32,
}

impl DiscoverQuery {
    /// First page sorted by descending popularity
    pub fn most_popular(genre_code: u32, language: &'static str) -> Self {
        Self {
            genre_code,
            language,
            sort_by: "popularity.desc",
            page: 1,
        }
    }
}

/// Trait for movie catalog providers
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait CatalogProvider: Send + Sync {
    /// Runs one discovery query and returns the raw results that parsed
    async fn discover(&self, query: &DiscoverQuery) -> AppResult<Vec<TmdbMovie>>;

    /// Fetches details plus credits for a single movie
    async fn movie_details(&self, movie_id: u64) -> AppResult<TmdbMovieDetails>;

    /// Provider name for logging and debugging
    fn name(&self) -> &'static str;
}
