//! Shared application state handed to every handler.

use std::{sync::Arc, time::Instant};

use crate::challenge::SolvedChallenges;
use crate::config::AppConfig;
use crate::session::{LoginThrottle, SessionRegistry};
use crate::store::{ContentStore, MemoryStore};

#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    store: Arc<dyn ContentStore>,
    config: AppConfig,
    sessions: SessionRegistry,
    login_throttle: LoginThrottle,
    solved_challenges: SolvedChallenges,
    started_at: Instant,
}

impl AppState {
    pub fn new(store: Arc<dyn ContentStore>, config: AppConfig) -> Self {
        Self::with_throttle(store, config, LoginThrottle::default())
    }

    pub fn with_throttle(
        store: Arc<dyn ContentStore>,
        config: AppConfig,
        login_throttle: LoginThrottle,
    ) -> Self {
        Self {
            inner: Arc::new(AppStateInner {
                store,
                config,
                sessions: SessionRegistry::default(),
                login_throttle,
                solved_challenges: SolvedChallenges::default(),
                started_at: Instant::now(),
            }),
        }
    }

    /// Memory-backed state with default categories and no admin account.
    pub fn in_memory(config: AppConfig) -> Self {
        Self::new(Arc::new(MemoryStore::seeded(None)), config)
    }

    pub fn store(&self) -> &dyn ContentStore {
        self.inner.store.as_ref()
    }

    pub fn config(&self) -> &AppConfig {
        &self.inner.config
    }

    pub fn sessions(&self) -> &SessionRegistry {
        &self.inner.sessions
    }

    pub fn login_throttle(&self) -> &LoginThrottle {
        &self.inner.login_throttle
    }

    pub fn solved_challenges(&self) -> &SolvedChallenges {
        &self.inner.solved_challenges
    }

    /// Seconds since the state was built.
    pub fn uptime_secs(&self) -> u64 {
        self.inner.started_at.elapsed().as_secs()
    }
}
