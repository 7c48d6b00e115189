use std::sync::Arc;

use crate::{config::Config, services::Orchestrator};

#[derive(Clone)]
pub struct AppState {
    pub orchestrator: Arc<Orchestrator>,
    pub config: Arc<Config>,
}

impl AppState {
    pub fn new(config: Config) -> Self {
        let orchestrator = Orchestrator::from_config(&config);
        Self::with_orchestrator(config, orchestrator)
    }

    pub fn with_orchestrator(config: Config, orchestrator: Orchestrator) -> Self {
        Self {
            orchestrator: Arc::new(orchestrator),
            config: Arc::new(config),
        }
    }
}
