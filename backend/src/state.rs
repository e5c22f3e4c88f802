// src/state.rs

use std::sync::Arc;

use axum::extract::FromRef;

use crate::{config::Config, engine::ExamEngine, store::Store};

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn Store>,
    pub engine: ExamEngine,
    pub config: Config,
}

impl AppState {
    /// Wires the engine to `store` using the attempt policy from `config`.
    pub fn new(store: Arc<dyn Store>, config: Config) -> Self {
        let gate = crate::engine::AttemptGate::new(config.max_attempts, config.cooldown_minutes);
        Self {
            engine: ExamEngine::new(store.clone(), gate),
            store,
            config,
        }
    }
}

impl FromRef<AppState> for Arc<dyn Store> {
    fn from_ref(state: &AppState) -> Self {
        state.store.clone()
    }
}

impl FromRef<AppState> for ExamEngine {
    fn from_ref(state: &AppState) -> Self {
        state.engine.clone()
    }
}

impl FromRef<AppState> for Config {
    fn from_ref(state: &AppState) -> Self {
        state.config.clone()
    }
}
