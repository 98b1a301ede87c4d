/// TMDB (The Movie Database) catalog provider
///
/// API Flow:
/// 1. Discovery: /discover/movie?with_genres=..&sort_by=popularity.desc&page=1
/// 2. Details: /movie/{id}?append_to_response=credits
///
/// The API key travels as the `api_key` query parameter.
use crate::{
    config::Config,
    error::{AppError, AppResult},
    models::{TmdbDiscoverResponse, TmdbMovie, TmdbMovieDetails},
    services::providers::{CatalogProvider, DiscoverQuery},
};
use reqwest::Client as HttpClient;

#[derive(Clone)]
pub struct TmdbProvider {
    http_client: HttpClient,
    api_key: String,
    api_url: String,
}

impl TmdbProvider {
    /// Builds a provider from configuration, or `None` when no API key is set
    pub fn from_config(config: &Config) -> AppResult<Option<Self>> {
        let Some(api_key) = config.tmdb_key() else {
            tracing::warn!("TMDB_API_KEY not set; recommendations are blocked");
            return Ok(None);
        };

        let http_client = HttpClient::builder()
            .timeout(config.tmdb_timeout())
            .build()
            .map_err(|e| AppError::Internal(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Some(Self {
            http_client,
            api_key: api_key.to_string(),
            api_url: config.tmdb_api_url.trim_end_matches('/').to_string(),
        }))
    }

    /// Keeps the results that match the expected shape and drops the rest
    fn parse_results(response: TmdbDiscoverResponse) -> Vec<TmdbMovie> {
        response
            .results
            .into_iter()
            .filter_map(|result| match serde_json::from_value::<TmdbMovie>(result) {
                Ok(movie) => Some(movie),
                Err(e) => {
                    tracing::debug!(error = %e, "Skipping malformed TMDB result");
                    None
                }
            })
            .collect()
    }
}

async fn check_status(response: reqwest::Response) -> AppResult<reqwest::Response> {
    if response.status().is_success() {
        return Ok(response);
    }

    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    Err(AppError::UpstreamStatus {
        status: status.as_u16(),
        body,
    })
}

#[async_trait::async_trait]
impl CatalogProvider for TmdbProvider {
    async fn discover(&self, query: &DiscoverQuery) -> AppResult<Vec<TmdbMovie>> {
        let url = format!("{}/discover/movie", self.api_url);
        let genre_code = query.genre_code.to_string();
        let page = query.page.to_string();

        let response = self
            .http_client
            .get(&url)
            .query(&[
                ("api_key", self.api_key.as_str()),
                ("with_genres", genre_code.as_str()),
                ("sort_by", query.sort_by),
                ("page", page.as_str()),
                ("language", query.language),
            ])
            .send()
            .await?;

        let response = check_status(response).await?;
        let body: TmdbDiscoverResponse = response.json().await?;
        let movies = Self::parse_results(body);

        tracing::info!(
            genre_code = query.genre_code,
            language = query.language,
            results = movies.len(),
            provider = "tmdb",
            "Discovery completed"
        );

        Ok(movies)
    }

    async fn movie_details(&self, movie_id: u64) -> AppResult<TmdbMovieDetails> {
        let url = format!("{}/movie/{}", self.api_url, movie_id);

        let response = self
            .http_client
            .get(&url)
            .query(&[
                ("api_key", self.api_key.as_str()),
                ("append_to_response", "credits"),
            ])
            .send()
            .await?;

        let response = check_status(response).await?;
        let response_text = response.text().await?;

        let details: TmdbMovieDetails = serde_json::from_str(&response_text).map_err(|e| {
            tracing::error!(
                error = %e,
                movie_id,
                "Failed to deserialize TMDB movie details"
            );
            AppError::Malformed(format!("Failed to parse TMDB response: {}", e))
        })?;

        tracing::info!(movie_id, provider = "tmdb", "Movie details fetched");

        Ok(details)
    }

    fn name(&self) -> &'static str {
        "tmdb"
    }
}
