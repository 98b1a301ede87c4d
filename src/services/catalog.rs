use std::sync::Arc;

use serde::Serialize;

use crate::{
    error::AppError,
    models::{Genre, Language, MovieDetails, MovieRecord},
    services::{
        providers::{CatalogProvider, DiscoverQuery},
        retry::{RetryFailure, RetryPolicy},
    },
};

pub const MIN_COUNT: usize = 3;
pub const MAX_COUNT: usize = 15;

/// Why a fetch came back empty
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FetchNotice {
    /// Every attempt timed out
    RetriesExhausted { attempts: usize },
    /// The request failed for another reason
    RequestFailed { cause: String },
    /// Anything else, such as an unreadable response
    Unexpected { cause: String },
}

impl FetchNotice {
    /// Text shown to the user
    pub fn message(&self) -> String {
        match self {
            FetchNotice::RetriesExhausted { attempts } => format!(
                "The movie database timed out after {} attempts. Check your connection and try again in a moment.",
                attempts
            ),
            FetchNotice::RequestFailed { cause } => {
                format!("Could not reach the movie database: {}", cause)
            }
            FetchNotice::Unexpected { cause } => {
                format!("Something went wrong while fetching movies: {}", cause)
            }
        }
    }

    fn from_failure(failure: RetryFailure) -> Self {
        let RetryFailure {
            error,
            attempts,
            exhausted,
        } = failure;

        match error {
            AppError::Timeout(_) if exhausted => FetchNotice::RetriesExhausted { attempts },
            AppError::Timeout(_)
            | AppError::Transport(_)
            | AppError::UpstreamStatus { .. }
            | AppError::ExternalApi(_) => FetchNotice::RequestFailed {
                cause: error.to_string(),
            },
            other => FetchNotice::Unexpected {
                cause: other.to_string(),
            },
        }
    }
}

/// Result of one catalog fetch. `movies` is empty whenever `notice` is set.
#[derive(Debug, Clone, Default)]
pub struct CatalogFetch {
    pub movies: Vec<MovieRecord>,
    pub notice: Option<FetchNotice>,
}

/// Genre discovery against the movie catalog with bounded retry.
///
/// `fetch` never fails: after the last failed attempt it returns an empty
/// list together with a notice describing why.
#[derive(Clone)]
pub struct CatalogClient {
    provider: Arc<dyn CatalogProvider>,
    retry: RetryPolicy,
    image_base_url: String,
}

impl CatalogClient {
    pub fn new(
        provider: Arc<dyn CatalogProvider>,
        retry: RetryPolicy,
        image_base_url: impl Into<String>,
    ) -> Self {
        Self {
            provider,
            retry,
            image_base_url: image_base_url.into(),
        }
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        self.retry
    }

    /// Caps a requested result count at [`MAX_COUNT`]. Small counts are
    /// honored as given; range checks belong to the caller.
    pub fn cap_count(count: usize) -> usize {
        count.min(MAX_COUNT)
    }

    /// Most popular movies of `genre`, at most `count` of them
    pub async fn fetch(&self, genre: Genre, language: Language, count: usize) -> CatalogFetch {
        self.fetch_with_policy(genre, language, count, self.retry)
            .await
    }

    /// Same as [`fetch`](Self::fetch) with an explicit attempt budget
    pub async fn fetch_with_retries(
        &self,
        genre: Genre,
        language: Language,
        count: usize,
        retries: usize,
    ) -> CatalogFetch {
        let policy = RetryPolicy {
            max_attempts: retries,
            ..self.retry
        };
        self.fetch_with_policy(genre, language, count, policy).await
    }

    async fn fetch_with_policy(
        &self,
        genre: Genre,
        language: Language,
        count: usize,
        policy: RetryPolicy,
    ) -> CatalogFetch {
        let count = Self::cap_count(count);
        let query = DiscoverQuery::most_popular(genre.tmdb_code(), language.query_code());
        let provider = &self.provider;
        let query = &query;

        let result = policy
            .run(
                "catalog_discover",
                move |attempt| {
                    async move {
                        tracing::debug!(
                            attempt,
                            genre = %genre,
                            provider = provider.name(),
                            "Querying catalog"
                        );
                        provider.discover(query).await
                    }
                },
                AppError::is_retryable,
            )
            .await;

        match result {
            Ok(raw) => {
                let movies: Vec<MovieRecord> = raw
                    .into_iter()
                    .take(count)
                    .map(|movie| MovieRecord::from_tmdb(movie, &self.image_base_url))
                    .collect();

                tracing::info!(
                    genre = %genre,
                    requested = count,
                    returned = movies.len(),
                    "Catalog fetch completed"
                );

                CatalogFetch {
                    movies,
                    notice: None,
                }
            }
            Err(failure) => {
                let notice = FetchNotice::from_failure(failure);
                tracing::error!(genre = %genre, notice = ?notice, "Catalog fetch failed");
                CatalogFetch {
                    movies: Vec::new(),
                    notice: Some(notice),
                }
            }
        }
    }

    /// Director, cast and money facts for one movie. Single attempt.
    pub async fn details(&self, movie_id: u64) -> Option<MovieDetails> {
        match self.provider.movie_details(movie_id).await {
            Ok(details) => Some(MovieDetails::from(details)),
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    movie_id,
                    provider = self.provider.name(),
                    "Movie details unavailable"
                );
                None
            }
        }
    }
}
