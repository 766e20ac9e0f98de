// Axum start-up lives here. The form posts multipart so a database file can
// ride along with the question; uploads are unbounded, hence no body limit.

pub mod handlers;
pub mod routes;
pub mod state;
pub mod static_files;
pub mod templates;

use axum::{extract::DefaultBodyLimit, Router};
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::{compression::CompressionLayer, trace::TraceLayer};
use tracing::info;

use crate::config::WebConfig;
use state::AppState;

pub fn create_app(state: Arc<AppState>) -> Router {
    Router::new()
        .merge(routes::ui_routes())
        .merge(routes::api_routes())
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CompressionLayer::new())
                .layer(DefaultBodyLimit::disable()),
        )
        .with_state(state)
}

pub async fn run_server(config: WebConfig, state: Arc<AppState>) -> std::io::Result<()> {
    let listener = tokio::net::TcpListener::bind((config.host.as_str(), config.port)).await?;
    info!("Listening on http://{}", listener.local_addr()?);

    axum::serve(listener, create_app(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;
    use crate::llm::LlmManager;
    use crate::pipeline::tests::{seed_students, CannedGenerator};
    use axum::{
        body::Body,
        http::{header, Request, StatusCode},
    };
    use http_body_util::BodyExt;
    use std::path::Path;
    use tempfile::TempDir;
    use tower::ServiceExt;

    const BOUNDARY: &str = "querycraft-test-boundary";

    enum Part<'a> {
        Text(&'a str, &'a str),
        File(&'a str, &'a str, &'a [u8]),
    }

    fn multipart_body(parts: &[Part<'_>]) -> Vec<u8> {
        let mut body = Vec::new();
        for part in parts {
            body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
            match part {
                Part::Text(name, value) => {
                    body.extend_from_slice(
                        format!("Content-Disposition: form-data; name=\"{name}\"\r\n\r\n").as_bytes(),
                    );
                    body.extend_from_slice(value.as_bytes());
                }
                Part::File(name, file_name, contents) => {
                    body.extend_from_slice(
                        format!(
                            "Content-Disposition: form-data; name=\"{name}\"; filename=\"{file_name}\"\r\n\
                             Content-Type: application/octet-stream\r\n\r\n"
                        )
                        .as_bytes(),
                    );
                    body.extend_from_slice(contents);
                }
            }
            body.extend_from_slice(b"\r\n");
        }
        body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
        body
    }

    fn form_request(parts: &[Part<'_>]) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/")
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(Body::from(multipart_body(parts)))
            .unwrap()
    }

    /// App whose model always answers `reply`, with uploads going to `dir/uploads`
    /// and a fallback database at `dir/fallback.db`.
    fn app(dir: &Path, reply: &str) -> Router {
        let mut config = AppConfig::default();
        config.database.upload_dir = dir.join("uploads").to_string_lossy().into_owned();
        config.database.fallback_path = dir.join("fallback.db").to_string_lossy().into_owned();

        let llm = LlmManager::from_generator(Box::new(CannedGenerator::sql(reply)));
        create_app(Arc::new(AppState::new(config, llm)))
    }

    fn database_bytes(rows: usize) -> (TempDir, Vec<u8>) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("source.db");
        seed_students(&path, rows);
        let bytes = std::fs::read(&path).unwrap();
        (dir, bytes)
    }

    async fn body_text(response: axum::response::Response) -> String {
        let body = response.into_body().collect().await.unwrap().to_bytes();
        String::from_utf8(body.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn index_page_shows_the_form() {
        let dir = tempfile::tempdir().unwrap();
        let response = app(dir.path(), "SELECT 1")
            .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let html = body_text(response).await;
        assert!(html.contains("Welcome to QueryCraft!!"));
        assert!(html.contains("Enter Your Query:"));
        assert!(html.contains(r#"accept=".db""#));
        assert!(!html.contains("An error occurred"));
    }

    #[tokio::test]
    async fn empty_question_asks_for_a_valid_query() {
        let dir = tempfile::tempdir().unwrap();
        let response = app(dir.path(), "SELECT 1")
            .oneshot(form_request(&[Part::Text("question", ""), Part::Text("action", "ask")]))
            .await
            .unwrap();

        let html = body_text(response).await;
        assert!(html.contains("Please enter a valid query."));
        assert!(!dir.path().join("fallback.db").exists());
    }

    #[tokio::test]
    async fn uploaded_database_is_queried_instead_of_fallback() {
        let dir = tempfile::tempdir().unwrap();
        let (_src, bytes) = database_bytes(3);

        let response = app(dir.path(), "SELECT COUNT(*) FROM STUDENTS;")
            .oneshot(form_request(&[
                Part::File("database", "student.db", &bytes),
                Part::Text("question", "How many entries of records are present?"),
                Part::Text("action", "ask"),
            ]))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let html = body_text(response).await;
        assert!(html.contains("Uploaded file: student.db"), "{html}");
        assert!(html.contains("The Response is:"), "{html}");
        assert!(html.contains("<td>3</td>"), "{html}");
        assert!(dir.path().join("uploads").join("student.db").exists());
        assert!(!dir.path().join("fallback.db").exists());
    }

    #[tokio::test]
    async fn carried_file_name_keeps_using_the_upload() {
        let dir = tempfile::tempdir().unwrap();
        let (_src, bytes) = database_bytes(4);
        std::fs::create_dir_all(dir.path().join("uploads")).unwrap();
        std::fs::write(dir.path().join("uploads").join("student.db"), &bytes).unwrap();

        let response = app(dir.path(), "SELECT COUNT(*) FROM STUDENTS;")
            .oneshot(form_request(&[
                Part::File("database", "", b""),
                Part::Text("db_file", "student.db"),
                Part::Text("question", "how many?"),
                Part::Text("action", "ask"),
            ]))
            .await
            .unwrap();

        let html = body_text(response).await;
        assert!(html.contains("<td>4</td>"), "{html}");
    }

    #[tokio::test]
    async fn upload_alone_stays_idle() {
        let dir = tempfile::tempdir().unwrap();
        let (_src, bytes) = database_bytes(1);

        let response = app(dir.path(), "SELECT 1")
            .oneshot(form_request(&[
                Part::File("database", "student.db", &bytes),
                Part::Text("question", ""),
                Part::Text("action", "upload"),
            ]))
            .await
            .unwrap();

        let html = body_text(response).await;
        assert!(html.contains("Uploaded file: student.db"));
        assert!(!html.contains("Please enter a valid query."));
        assert!(!html.contains("Generated SQL Query:"));
    }

    #[tokio::test]
    async fn wrong_extension_is_refused() {
        let dir = tempfile::tempdir().unwrap();

        let response = app(dir.path(), "SELECT 1")
            .oneshot(form_request(&[
                Part::File("database", "students.csv", b"NAME,CLASS\n"),
                Part::Text("question", "how many?"),
                Part::Text("action", "ask"),
            ]))
            .await
            .unwrap();

        let html = body_text(response).await;
        assert!(html.contains("An error occurred:"));
        assert!(html.contains("Unsupported file type: .csv"));
        assert!(!dir.path().join("uploads").join("students.csv").exists());
    }

    #[tokio::test]
    async fn broken_sql_renders_the_error() {
        let dir = tempfile::tempdir().unwrap();
        let (_src, bytes) = database_bytes(2);

        let response = app(dir.path(), "SELEKT * FROM STUDENTS")
            .oneshot(form_request(&[
                Part::File("database", "student.db", &bytes),
                Part::Text("question", "everyone"),
                Part::Text("action", "ask"),
            ]))
            .await
            .unwrap();

        let html = body_text(response).await;
        assert!(html.contains("Generated SQL Query:"));
        assert!(html.contains("SELEKT * FROM STUDENTS"));
        assert!(html.contains("An error occurred:"));
        assert!(html.contains("syntax error"));
    }

    #[tokio::test]
    async fn zero_rows_says_no_data() {
        let dir = tempfile::tempdir().unwrap();
        let (_src, bytes) = database_bytes(2);

        let response = app(dir.path(), "SELECT * FROM STUDENTS WHERE Marks > 1000;")
            .oneshot(form_request(&[
                Part::File("database", "student.db", &bytes),
                Part::Text("question", "top scorers"),
                Part::Text("action", "ask"),
            ]))
            .await
            .unwrap();

        let html = body_text(response).await;
        assert!(html.contains("No data found."));
        assert!(!html.contains("<table>"));
    }

    #[tokio::test]
    async fn api_query_returns_outcome_json() {
        let dir = tempfile::tempdir().unwrap();
        seed_students(&dir.path().join("fallback.db"), 5);

        let response = app(dir.path(), "SELECT COUNT(*) AS total FROM STUDENTS;")
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/query")
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(r#"{"question": "how many?"}"#))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let json: serde_json::Value = serde_json::from_str(&body_text(response).await).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "state": "results",
                "sql": "SELECT COUNT(*) AS total FROM STUDENTS;",
                "columns": ["total"],
                "rows": [[5]]
            })
        );
    }

    #[tokio::test]
    async fn status_reports_policy_and_model() {
        let dir = tempfile::tempdir().unwrap();
        let response = app(dir.path(), "SELECT 1")
            .oneshot(Request::builder().uri("/api/status").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let json: serde_json::Value = serde_json::from_str(&body_text(response).await).unwrap();
        assert_eq!(json["statement_policy"], "unrestricted");
        assert_eq!(
            json["fallback_database"],
            dir.path().join("fallback.db").to_string_lossy().as_ref()
        );
        assert_eq!(json["backend"], "custom");
        assert_eq!(json["version"], env!("CARGO_PKG_VERSION"));
    }

    #[tokio::test]
    async fn serves_embedded_stylesheet() {
        let dir = tempfile::tempdir().unwrap();
        let app = app(dir.path(), "SELECT 1");

        let response = app
            .clone()
            .oneshot(Request::builder().uri("/static/style.css").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[header::CONTENT_TYPE], "text/css");

        let missing = app
            .oneshot(Request::builder().uri("/static/nope.js").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(missing.status(), StatusCode::NOT_FOUND);
    }
}
