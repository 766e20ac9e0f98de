//! The request pipeline: question → model → trimmed SQL → database → display state.
//!
//! Every form submission runs this once from the top. Nothing is kept
//! between runs except the database path the caller passes in.

use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info};

use crate::db::executor::{QueryExecutor, QueryResult};
use crate::llm::LlmManager;
use crate::prompt::PROMPT_TEMPLATE;

pub const INVALID_QUERY_MESSAGE: &str = "Please enter a valid query.";
pub const NO_DATA_MESSAGE: &str = "No data found.";

/// What the page shows after one pass through the pipeline.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum Outcome {
    /// Nothing asked yet.
    Idle,
    /// Submitted with an empty question; neither model nor database touched.
    InvalidQuery,
    Results {
        sql: String,
        #[serde(flatten)]
        result: QueryResult,
    },
    NoData {
        sql: String,
    },
    /// Any failure from the model or the database, as its display string.
    /// `sql` is set when the model answered and the database refused.
    Failed {
        sql: Option<String>,
        message: String,
    },
}

/// One question against one database file.
#[derive(Debug, Clone)]
pub struct QueryRequest {
    pub question: String,
    pub db_path: PathBuf,
}

pub struct Pipeline {
    llm: Arc<LlmManager>,
    executor: QueryExecutor,
}

impl Pipeline {
    pub fn new(llm: Arc<LlmManager>, executor: QueryExecutor) -> Self {
        Self { llm, executor }
    }

    pub fn llm(&self) -> &LlmManager {
        &self.llm
    }

    /// Decides the display state for one interaction.
    ///
    /// The pipeline runs when the submit control was used or a question is
    /// present; otherwise the page stays idle.
    pub async fn respond(&self, submitted: bool, request: QueryRequest) -> Outcome {
        if !submitted && request.question.is_empty() {
            return Outcome::Idle;
        }
        self.answer(request).await
    }

    /// A blank question is invalid; otherwise the model gets the question
    /// exactly as typed.
    pub async fn answer(&self, request: QueryRequest) -> Outcome {
        if request.question.trim().is_empty() {
            return Outcome::InvalidQuery;
        }

        info!("Generating SQL for question: {}", request.question);
        let sql = match self.llm.generate_sql(PROMPT_TEMPLATE, &request.question).await {
            Ok(text) => text.trim().to_string(),
            Err(e) => {
                error!("SQL generation failed: {}", e);
                return Outcome::Failed {
                    sql: None,
                    message: e.to_string(),
                };
            }
        };
        info!("Generated SQL: {}", sql);

        match self.executor.run(sql.clone(), request.db_path).await {
            Ok(result) if result.is_empty() => Outcome::NoData { sql },
            Ok(result) => Outcome::Results { sql, result },
            Err(e) => {
                error!("Query execution failed: {}", e);
                Outcome::Failed {
                    sql: Some(sql),
                    message: e.to_string(),
                }
            }
        }
    }
}
