use std::sync::Arc;

use crate::llm_client::GeminiClient;
use crate::matching::analyzer::{GeminiResumeAnalyzer, ResumeAnalyzer};
use crate::matching::batch::{BatchRunner, BatchSettings};
use crate::matching::queue::{SharedQueue, UploadQueue};
use crate::session::Session;
use crate::store::{PipelineStore, RestStore};

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub store: RestStore,
    pub llm: GeminiClient,
    pub session: Session,
    /// In-memory upload queue; lost on restart.
    pub queue: SharedQueue,
    /// Batch orchestrator. Analyzer and store are trait objects so tests can
    /// swap in fakes.
    pub batch: BatchRunner,
}

impl AppState {
    pub fn new(store: RestStore, llm: GeminiClient, settings: BatchSettings) -> Self {
        let analyzer: Arc<dyn ResumeAnalyzer> = Arc::new(GeminiResumeAnalyzer(llm.clone()));
        let pipeline: Arc<dyn PipelineStore> = Arc::new(store.clone());

        Self {
            batch: BatchRunner::new(analyzer, pipeline, settings),
            store,
            llm,
            session: Session::default(),
            queue: UploadQueue::shared(),
        }
    }
}
