use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;

use crate::db::policy::StatementPolicy;
use crate::pipeline::{Outcome, QueryRequest};
use crate::web::state::AppState;

#[derive(Debug, Deserialize)]
pub struct NlQueryRequest {
    pub question: String,
    /// Name of a previously uploaded database; the fallback is used when absent.
    pub db_file: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct SystemStatus {
    pub version: String,
    pub uptime_seconds: i64,
    pub backend: String,
    pub model: String,
    pub statement_policy: StatementPolicy,
    pub fallback_database: String,
}

/// Same pipeline as the form, always treated as a submission.
pub async fn nl_query(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<NlQueryRequest>,
) -> Json<Outcome> {
    debug!("NL-query: {}", payload.question);

    let outcome = match state.uploads.database_for(payload.db_file.as_deref()) {
        Ok(db_path) => {
            state
                .pipeline
                .answer(QueryRequest {
                    question: payload.question,
                    db_path,
                })
                .await
        }
        Err(e) => Outcome::Failed {
            sql: None,
            message: e.to_string(),
        },
    };

    Json(outcome)
}

pub async fn system_status(State(state): State<Arc<AppState>>) -> Json<SystemStatus> {
    let llm = state.pipeline.llm();

    Json(SystemStatus {
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_seconds: (chrono::Utc::now() - state.startup_time).num_seconds(),
        backend: llm.backend().to_string(),
        model: llm.model().to_string(),
        statement_policy: state.config.database.statement_policy,
        fallback_database: state.config.database.fallback_path.clone(),
    })
}
