use crate::config::AppConfig;
use crate::db::executor::QueryExecutor;
use crate::db::upload::UploadStore;
use crate::llm::LlmManager;
use crate::pipeline::Pipeline;
use crate::web::templates::init_templates;
use minijinja::Environment;
use std::sync::Arc;

/// Shared application state for the web server.
///
/// Built once at start-up and never mutated; each request only reads it.
pub struct AppState {
    pub config: AppConfig,
    pub pipeline: Pipeline,
    pub uploads: UploadStore,
    pub template_env: Environment<'static>,
    pub startup_time: chrono::DateTime<chrono::Utc>,
}

impl AppState {
    pub fn new(config: AppConfig, llm_manager: LlmManager) -> Self {
        let executor = QueryExecutor::new(config.database.statement_policy);
        let pipeline = Pipeline::new(Arc::new(llm_manager), executor);
        let uploads = UploadStore::new(&config.database);

        Self {
            config,
            pipeline,
            uploads,
            template_env: init_templates(),
            startup_time: chrono::Utc::now(),
        }
    }
}
