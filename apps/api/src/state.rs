use std::sync::Arc;

use crate::config::Config;
use crate::resume::Pipeline;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    /// Built once at startup; read-only thereafter.
    pub pipeline: Arc<Pipeline>,
    pub config: Config,
}

impl AppState {
    pub fn new(config: Config, pipeline: Pipeline) -> Self {
        Self {
            pipeline: Arc::new(pipeline),
            config,
        }
    }

    /// Default config, no completion capability.
    #[cfg(test)]
    pub fn for_tests() -> Self {
        let config = Config::default();
        let pipeline = Pipeline::from_config(&config, None);
        Self::new(config, pipeline)
    }
}
