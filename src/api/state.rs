use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::{Mutex, RwLock};
use uuid::Uuid;

use crate::{
    config::Config,
    error::{AppError, AppResult},
    services::{
        providers::{
            openrouter::OpenRouterProvider, tmdb::TmdbProvider, CatalogProvider, LlmProvider,
        },
        CatalogClient, GenreResolver, Orchestrator, PlotScorer, RequestContext,
    },
};

/// One session's context. The mutex is held for a whole interaction so
/// interactions on the same session run one after another.
pub type SessionHandle = Arc<Mutex<RequestContext>>;

const DEFAULT_SESSION_TTL: Duration = Duration::from_secs(3600);
const DEFAULT_MAX_SESSIONS: usize = 10_000;

struct SessionEntry {
    handle: SessionHandle,
    last_seen: Instant,
}

impl SessionEntry {
    fn is_expired(&self, ttl: Duration) -> bool {
        self.last_seen.elapsed() >= ttl
    }
}

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub orchestrator: Arc<Orchestrator>,
    sessions: Arc<RwLock<HashMap<Uuid, SessionEntry>>>,
    session_ttl: Duration,
    max_sessions: usize,
}

impl AppState {
    pub fn new(orchestrator: Orchestrator) -> Self {
        Self {
            orchestrator: Arc::new(orchestrator),
            sessions: Arc::new(RwLock::new(HashMap::new())),
            session_ttl: DEFAULT_SESSION_TTL,
            max_sessions: DEFAULT_MAX_SESSIONS,
        }
    }

    /// Idle sessions older than `ttl` are evicted, and at most `max_sessions`
    /// are kept at once.
    pub fn with_session_limits(mut self, ttl: Duration, max_sessions: usize) -> Self {
        self.session_ttl = ttl;
        self.max_sessions = max_sessions.max(1);
        self
    }

    /// Wires the real providers. Missing credentials disable the features
    /// that need them instead of failing startup.
    pub fn from_config(config: &Config) -> AppResult<Self> {
        let llm: Option<Arc<dyn LlmProvider>> = OpenRouterProvider::from_config(config)?
            .map(|provider| Arc::new(provider) as Arc<dyn LlmProvider>);

        let catalog = TmdbProvider::from_config(config)?.map(|provider| {
            CatalogClient::new(
                Arc::new(provider) as Arc<dyn CatalogProvider>,
                config.catalog_retry_policy(),
                config.tmdb_image_base_url.clone(),
            )
        });

        let orchestrator = Orchestrator::new(
            GenreResolver::new(llm.clone(), config.fallback_genre()),
            catalog,
            PlotScorer::new(llm),
        );

        tracing::info!(
            recommendations_enabled = orchestrator.can_recommend(),
            default_genre = %config.fallback_genre(),
            session_ttl_secs = config.session_ttl_secs,
            max_sessions = config.max_sessions,
            "Application state initialized"
        );

        Ok(Self::new(orchestrator).with_session_limits(config.session_ttl(), config.max_sessions))
    }

    /// Creates an Idle session, evicting expired sessions first and the least
    /// recently used one when the map is full
    pub async fn create_session(&self) -> (Uuid, SessionHandle) {
        let id = Uuid::new_v4();
        let handle = Arc::new(Mutex::new(RequestContext::default()));

        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|_, entry| !entry.is_expired(self.session_ttl));

        while sessions.len() >= self.max_sessions {
            let oldest = sessions
                .iter()
                .min_by_key(|(_, entry)| entry.last_seen)
                .map(|(id, _)| *id);
            match oldest {
                Some(oldest) => {
                    sessions.remove(&oldest);
                }
                None => break,
            }
        }

        let evicted = before - sessions.len();
        if evicted > 0 {
            tracing::info!(evicted, "Evicted idle sessions");
        }

        sessions.insert(
            id,
            SessionEntry {
                handle: handle.clone(),
                last_seen: Instant::now(),
            },
        );
        tracing::info!(session_id = %id, "Session created");
        (id, handle)
    }

    /// Looks up a live session and marks it as recently used
    pub async fn session(&self, id: Uuid) -> AppResult<SessionHandle> {
        let mut sessions = self.sessions.write().await;

        let expired = match sessions.get_mut(&id) {
            Some(entry) if !entry.is_expired(self.session_ttl) => {
                entry.last_seen = Instant::now();
                return Ok(entry.handle.clone());
            }
            Some(_) => true,
            None => false,
        };

        if expired {
            sessions.remove(&id);
            tracing::info!(session_id = %id, "Session expired");
        }
        Err(AppError::NotFound(format!("Session {} not found", id)))
    }

    pub async fn remove_session(&self, id: Uuid) -> AppResult<()> {
        let removed = self.sessions.write().await.remove(&id);
        match removed {
            Some(_) => {
                tracing::info!(session_id = %id, "Session removed");
                Ok(())
            }
            None => Err(AppError::NotFound(format!("Session {} not found", id))),
        }
    }

    pub async fn session_count(&self) -> usize {
        self.sessions.read().await.len()
    }
}
