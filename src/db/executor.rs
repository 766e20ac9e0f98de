use rusqlite::types::ValueRef;
use rusqlite::{Batch, Connection};
use serde::Serialize;
use std::error::Error;
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::db::policy::{StatementKind, StatementPolicy};

#[derive(Debug)]
pub enum QueryError {
    Database(rusqlite::Error),
    Rejected(StatementKind),
    MultipleStatements,
    Task(String),
}

impl fmt::Display for QueryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QueryError::Database(err) => write!(f, "{}", err),
            QueryError::Rejected(kind) => write!(
                f,
                "Refusing to run a {} statement: the server only allows read-only queries",
                kind
            ),
            QueryError::MultipleStatements => {
                write!(f, "You can only execute one statement at a time.")
            }
            QueryError::Task(msg) => write!(f, "Query task failed: {}", msg),
        }
    }
}

impl Error for QueryError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            QueryError::Database(err) => Some(err),
            _ => None,
        }
    }
}

impl From<rusqlite::Error> for QueryError {
    fn from(err: rusqlite::Error) -> Self {
        QueryError::Database(err)
    }
}

/// Rows fetched by one statement, in engine order.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct QueryResult {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<serde_json::Value>>,
}

impl QueryResult {
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Runs generated SQL against a single SQLite file, one connection per call.
#[derive(Debug, Clone, Copy, Default)]
pub struct QueryExecutor {
    policy: StatementPolicy,
}

impl QueryExecutor {
    pub fn new(policy: StatementPolicy) -> Self {
        Self { policy }
    }

    /// Executes `sql` on the blocking pool.
    pub async fn run(&self, sql: String, db_path: PathBuf) -> Result<QueryResult, QueryError> {
        let policy = self.policy;
        tokio::task::spawn_blocking(move || execute(&sql, &db_path, policy))
            .await
            .map_err(|e| QueryError::Task(e.to_string()))?
    }
}

/// Opens `db_path`, runs `sql` once, fetches every row, commits and closes.
///
/// SQLite creates the file if it does not exist, so a wrong path gives an
/// empty database and a "no such table" error rather than an open failure.
/// The connection is dropped on every error path, which closes it.
pub fn execute(sql: &str, db_path: &Path, policy: StatementPolicy) -> Result<QueryResult, QueryError> {
    debug!("Opening database at {}", db_path.display());
    let conn = Connection::open(db_path)?;

    let result = fetch_all(&conn, sql, policy)?;

    // a generated BEGIN would otherwise leave its transaction dangling
    if !conn.is_autocommit() {
        conn.execute_batch("COMMIT")?;
    }

    conn.close().map_err(|(_, err)| QueryError::Database(err))?;

    info!(
        "Query returned {} rows from {}",
        result.rows.len(),
        db_path.display()
    );
    Ok(result)
}

/// Text holding only whitespace or comments yields an empty result. A second
/// statement is refused before the first one is stepped.
fn fetch_all(conn: &Connection, sql: &str, policy: StatementPolicy) -> Result<QueryResult, QueryError> {
    let mut batch = Batch::new(conn, sql);
    let Some(mut stmt) = batch.next()? else {
        debug!("Generated text contains no statement");
        return Ok(QueryResult::default());
    };

    // a trailing statement that fails to prepare is still a second statement
    if !matches!(batch.next(), Ok(None)) {
        warn!("Rejected generated text containing more than one statement");
        return Err(QueryError::MultipleStatements);
    }

    let kind = StatementKind::of(&stmt);
    if !policy.permits(kind) {
        warn!("Rejected {} statement under read-only policy", kind);
        return Err(QueryError::Rejected(kind));
    }

    let columns: Vec<String> = stmt
        .column_names()
        .into_iter()
        .map(str::to_string)
        .collect();
    let column_count = columns.len();

    let mut rows = stmt.query([])?;
    let mut fetched = Vec::new();
    while let Some(row) = rows.next()? {
        let mut cells = Vec::with_capacity(column_count);
        for idx in 0..column_count {
            cells.push(to_json(row.get_ref(idx)?));
        }
        fetched.push(cells);
    }

    Ok(QueryResult {
        columns,
        rows: fetched,
    })
}

fn to_json(value: ValueRef<'_>) -> serde_json::Value {
    match value {
        ValueRef::Null => serde_json::Value::Null,
        ValueRef::Integer(i) => serde_json::Value::from(i),
        ValueRef::Real(f) => serde_json::Number::from_f64(f)
            .map(serde_json::Value::Number)
            .unwrap_or(serde_json::Value::Null),
        ValueRef::Text(bytes) => serde_json::Value::String(String::from_utf8_lossy(bytes).into_owned()),
        ValueRef::Blob(bytes) => serde_json::Value::String(format!("<blob: {} bytes>", bytes.len())),
    }
}
