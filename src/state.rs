// src/state.rs

use std::sync::Arc;

use axum::extract::FromRef;
use sqlx::SqlitePool;

use crate::{
    config::Config,
    error::AiError,
    quiz::{cache::QuestionCache, registry::SessionRegistry, session::SessionDeps},
    repositories::{QuestionStore, ResultStore, SqliteQuestionStore, SqliteResultStore},
    services::GeminiClient,
    utils::clock::{Clock, SystemClock},
};

#[derive(Clone)]
pub struct AppState {
    pub pool: SqlitePool,
    pub config: Config,
    pub deps: SessionDeps,
    pub sessions: SessionRegistry,
}

impl AppState {
    /// Wires the SQLite stores and the Gemini client behind a fresh session
    /// registry.
    pub fn new(pool: SqlitePool, config: Config) -> Result<Self, AiError> {
        let gemini = Arc::new(GeminiClient::new(config.gemini.clone())?);
        if !gemini.is_configured() {
            tracing::warn!("GEMINI_API_KEY is not set; using stored questions and rule-based feedback");
        }
        let clock: Arc<dyn Clock> = Arc::new(SystemClock);

        let deps = SessionDeps {
            questions: Arc::new(SqliteQuestionStore::new(pool.clone())),
            results: Arc::new(SqliteResultStore::new(pool.clone())),
            generator: gemini.clone(),
            feedback: gemini,
            cache: Arc::new(QuestionCache::new(config.question_cache_ttl, clock.clone())),
            clock,
            scoring: config.scoring.clone(),
            bands: config.feedback_bands.clone(),
        };

        Ok(Self::with_deps(pool, config, deps))
    }

    pub fn with_deps(pool: SqlitePool, config: Config, deps: SessionDeps) -> Self {
        Self {
            pool,
            config,
            deps,
            sessions: SessionRegistry::new(),
        }
    }

    pub fn questions(&self) -> &Arc<dyn QuestionStore> {
        &self.deps.questions
    }

    pub fn results(&self) -> &Arc<dyn ResultStore> {
        &self.deps.results
    }
}

impl FromRef<AppState> for SqlitePool {
    fn from_ref(state: &AppState) -> Self {
        state.pool.clone()
    }
}

impl FromRef<AppState> for Config {
    fn from_ref(state: &AppState) -> Self {
        state.config.clone()
    }
}

impl FromRef<AppState> for SessionRegistry {
    fn from_ref(state: &AppState) -> Self {
        state.sessions.clone()
    }
}
