use std::time::Duration;

use serde::Deserialize;

use crate::{models::Genre, services::RetryPolicy};

/// Application configuration loaded from environment variables
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    /// OpenRouter API key; genre prediction and plot scoring degrade without it
    #[serde(default)]
    pub openrouter_api_key: Option<String>,

    /// OpenRouter API base URL
    #[serde(default = "default_openrouter_api_url")]
    pub openrouter_api_url: String,

    /// Chat model used for both genre prediction and plot scoring
    #[serde(default = "default_llm_model")]
    pub llm_model: String,

    #[serde(default = "default_openrouter_referer")]
    pub openrouter_referer: String,

    #[serde(default = "default_openrouter_title")]
    pub openrouter_title: String,

    /// TMDB API key; recommendations are blocked without it
    #[serde(default)]
    pub tmdb_api_key: Option<String>,

    /// TMDB API base URL
    #[serde(default = "default_tmdb_api_url")]
    pub tmdb_api_url: String,

    /// Prefix prepended to TMDB poster paths
    #[serde(default = "default_tmdb_image_base_url")]
    pub tmdb_image_base_url: String,

    #[serde(default = "default_llm_timeout_secs")]
    pub llm_timeout_secs: u64,

    #[serde(default = "default_tmdb_timeout_secs")]
    pub tmdb_timeout_secs: u64,

    /// Total discovery attempts, including the first one
    #[serde(default = "default_catalog_max_attempts")]
    pub catalog_max_attempts: usize,

    #[serde(default = "default_catalog_retry_delay_secs")]
    pub catalog_retry_delay_secs: u64,

    /// When set, retry delays double per attempt up to this many seconds
    #[serde(default)]
    pub catalog_backoff_max_secs: Option<u64>,

    /// Sessions untouched for this long are evicted
    #[serde(default = "default_session_ttl_secs")]
    pub session_ttl_secs: u64,

    /// Upper bound on live sessions; the least recently used one is evicted
    #[serde(default = "default_max_sessions")]
    pub max_sessions: usize,

    /// Genre used whenever the model reply cannot be trusted
    #[serde(default = "default_genre")]
    pub default_genre: String,

    /// Server host address
    #[serde(default = "default_host")]
    pub host: String,

    /// Server port
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_openrouter_api_url() -> String {
    "https://openrouter.ai/api/v1".to_string()
}

fn default_llm_model() -> String {
    "deepseek/deepseek-chat".to_string()
}

fn default_openrouter_referer() -> String {
    "http://localhost:8501".to_string()
}

fn default_openrouter_title() -> String {
    "Movie Recommender App".to_string()
}

fn default_tmdb_api_url() -> String {
    "https://api.themoviedb.org/3".to_string()
}

fn default_tmdb_image_base_url() -> String {
    "https://image.tmdb.org/t/p/w500".to_string()
}

fn default_llm_timeout_secs() -> u64 {
    30
}

fn default_tmdb_timeout_secs() -> u64 {
    15
}

fn default_catalog_max_attempts() -> usize {
    3
}

fn default_catalog_retry_delay_secs() -> u64 {
    2
}

fn default_session_ttl_secs() -> u64 {
    3600
}

fn default_max_sessions() -> usize {
    10_000
}

fn default_genre() -> String {
    "drama".to_string()
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    3000
}

impl Default for Config {
    fn default() -> Self {
        Self {
            openrouter_api_key: None,
            openrouter_api_url: default_openrouter_api_url(),
            llm_model: default_llm_model(),
            openrouter_referer: default_openrouter_referer(),
            openrouter_title: default_openrouter_title(),
            tmdb_api_key: None,
            tmdb_api_url: default_tmdb_api_url(),
            tmdb_image_base_url: default_tmdb_image_base_url(),
            llm_timeout_secs: default_llm_timeout_secs(),
            tmdb_timeout_secs: default_tmdb_timeout_secs(),
            catalog_max_attempts: default_catalog_max_attempts(),
            catalog_retry_delay_secs: default_catalog_retry_delay_secs(),
            catalog_backoff_max_secs: None,
            session_ttl_secs: default_session_ttl_secs(),
            max_sessions: default_max_sessions(),
            default_genre: default_genre(),
            host: default_host(),
            port: default_port(),
        }
    }
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        envy::from_env::<Config>().map_err(|e| anyhow::anyhow!("Failed to load config: {}", e))
    }

    /// OpenRouter key, with blank values treated as absent
    pub fn openrouter_key(&self) -> Option<&str> {
        non_blank(self.openrouter_api_key.as_deref())
    }

    /// TMDB key, with blank values treated as absent
    pub fn tmdb_key(&self) -> Option<&str> {
        non_blank(self.tmdb_api_key.as_deref())
    }

    /// Configured fallback genre; an unparseable value means drama
    pub fn fallback_genre(&self) -> Genre {
        self.default_genre.parse().unwrap_or(Genre::Drama)
    }

    pub fn llm_timeout(&self) -> Duration {
        Duration::from_secs(self.llm_timeout_secs)
    }

    pub fn tmdb_timeout(&self) -> Duration {
        Duration::from_secs(self.tmdb_timeout_secs)
    }

    pub fn catalog_retry_delay(&self) -> Duration {
        Duration::from_secs(self.catalog_retry_delay_secs)
    }

    /// Fixed delay by default, capped exponential when a backoff ceiling is set
    pub fn catalog_retry_policy(&self) -> RetryPolicy {
        match self.catalog_backoff_max_secs {
            Some(max_secs) => RetryPolicy::exponential(
                self.catalog_max_attempts,
                self.catalog_retry_delay(),
                Duration::from_secs(max_secs),
            ),
            None => RetryPolicy::fixed(self.catalog_max_attempts, self.catalog_retry_delay()),
        }
    }

    pub fn session_ttl(&self) -> Duration {
        Duration::from_secs(self.session_ttl_secs)
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}
