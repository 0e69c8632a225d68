use std::sync::Arc;

use crate::analysis::generation::GenerationTracker;
use crate::analysis::pipeline::AnalysisPipeline;
use crate::config::Config;
use crate::persistence::{AnalysisStore, ProfileStore};

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub pipeline: AnalysisPipeline,
    pub profiles: Arc<dyn ProfileStore>,
    pub analyses: Arc<dyn AnalysisStore>,
    /// Latest analysis generation per user; older in-flight requests are not persisted.
    pub generations: Arc<GenerationTracker>,
}

#[cfg(test)]
impl AppState {
    /// State backed by one in-memory store, the builtin vocabulary and no remote scorer.
    pub fn for_tests(store: Arc<crate::persistence::memory::MemoryStore>) -> Self {
        use crate::analysis::matcher::MatchMode;
        use crate::analysis::vocabulary::Vocabulary;

        AppState {
            config: Config {
                database_url: "postgres://unused".to_string(),
                port: 0,
                rust_log: "debug".to_string(),
                vocabulary_path: None,
                match_mode: MatchMode::Token,
                remote_scoring_url: None,
                remote_scoring_api_key: None,
                remote_scoring_timeout: std::time::Duration::from_secs(1),
                analysis_history_limit: 20,
            },
            pipeline: AnalysisPipeline::new(
                Arc::new(Vocabulary::builtin().expect("builtin vocabulary")),
                MatchMode::Token,
                None,
            ),
            profiles: store.clone(),
            analyses: store,
            generations: Arc::new(GenerationTracker::new()),
        }
    }
}
