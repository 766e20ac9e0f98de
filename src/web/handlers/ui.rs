use axum::{
    extract::{multipart::MultipartError, Multipart, State},
    http::StatusCode,
    response::Html,
};
use minijinja::context;
use std::sync::Arc;
use tracing::{debug, error};

use crate::pipeline::{Outcome, QueryRequest, INVALID_QUERY_MESSAGE, NO_DATA_MESSAGE};
use crate::web::state::AppState;
use crate::web::templates::{render_template, INDEX_TEMPLATE};

/// Fields posted by the form on the index page.
#[derive(Debug, Default)]
struct FormSubmission {
    question: String,
    action: Option<String>,
    /// File chosen by an earlier upload, echoed back through a hidden field.
    db_file: Option<String>,
    upload: Option<(String, axum::body::Bytes)>,
}

impl FormSubmission {
    async fn read(mut multipart: Multipart) -> Result<Self, MultipartError> {
        let mut form = FormSubmission::default();

        while let Some(field) = multipart.next_field().await? {
            let name = field.name().map(str::to_string);
            match name.as_deref() {
                Some("database") => {
                    let file_name = field.file_name().unwrap_or_default().to_string();
                    let contents = field.bytes().await?;
                    // browsers send an empty part when no file was picked
                    if !file_name.is_empty() && !contents.is_empty() {
                        form.upload = Some((file_name, contents));
                    }
                }
                Some("question") => form.question = field.text().await?,
                Some("action") => form.action = Some(field.text().await?),
                Some("db_file") => {
                    let value = field.text().await?;
                    if !value.is_empty() {
                        form.db_file = Some(value);
                    }
                }
                other => debug!("Ignoring form field {:?}", other),
            }
        }

        Ok(form)
    }

    fn submitted(&self) -> bool {
        self.action.as_deref() == Some("ask")
    }
}

pub async fn index_handler(State(state): State<Arc<AppState>>) -> Html<String> {
    render_page(&state, "", None, &Outcome::Idle)
}

pub async fn submit_handler(
    State(state): State<Arc<AppState>>,
    multipart: Multipart,
) -> Result<Html<String>, (StatusCode, String)> {
    let form = FormSubmission::read(multipart).await.map_err(|e| {
        error!("Failed to read form submission: {}", e);
        (StatusCode::BAD_REQUEST, format!("Invalid form submission: {}", e))
    })?;

    let mut db_file = form.db_file.clone();
    if let Some((file_name, contents)) = &form.upload {
        match state.uploads.save(file_name, contents).await {
            Ok(stored) => db_file = Some(stored),
            Err(e) => {
                error!("Upload of {} failed: {}", file_name, e);
                let outcome = Outcome::Failed {
                    sql: None,
                    message: e.to_string(),
                };
                return Ok(render_page(&state, &form.question, db_file.as_deref(), &outcome));
            }
        }
    }

    let outcome = match state.uploads.database_for(db_file.as_deref()) {
        Ok(db_path) => {
            let request = QueryRequest {
                question: form.question.clone(),
                db_path,
            };
            state.pipeline.respond(form.submitted(), request).await
        }
        Err(e) => Outcome::Failed {
            sql: None,
            message: e.to_string(),
        },
    };

    Ok(render_page(&state, &form.question, db_file.as_deref(), &outcome))
}

fn render_page(state: &AppState, question: &str, db_file: Option<&str>, outcome: &Outcome) -> Html<String> {
    let html = render_template(
        &state.template_env,
        INDEX_TEMPLATE,
        context! {
            model => state.pipeline.llm().model(),
            extension => state.uploads.extension(),
            question => question,
            db_file => db_file,
            outcome => outcome,
            invalid_message => INVALID_QUERY_MESSAGE,
            no_data_message => NO_DATA_MESSAGE,
        },
    );
    Html(html)
}
