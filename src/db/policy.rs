use serde::{Deserialize, Serialize};
use std::fmt;

/// What a prepared statement would do to the database file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StatementKind {
    ReadOnly,
    Mutating,
}

impl StatementKind {
    /// Asks SQLite itself (`sqlite3_stmt_readonly`) rather than guessing from
    /// the leading keyword, so CTEs, `PRAGMA` writes and the like are judged
    /// by the engine.
    pub fn of(stmt: &rusqlite::Statement<'_>) -> Self {
        if stmt.readonly() {
            StatementKind::ReadOnly
        } else {
            StatementKind::Mutating
        }
    }
}

impl fmt::Display for StatementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StatementKind::ReadOnly => write!(f, "read-only"),
            StatementKind::Mutating => write!(f, "mutating"),
        }
    }
}

/// Which statements the executor is allowed to run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StatementPolicy {
    /// Run whatever the model returned.
    #[default]
    Unrestricted,
    /// Refuse anything SQLite reports as writing.
    ReadOnly,
}

impl StatementPolicy {
    pub fn permits(self, kind: StatementKind) -> bool {
        match self {
            StatementPolicy::Unrestricted => true,
            StatementPolicy::ReadOnly => kind == StatementKind::ReadOnly,
        }
    }
}
