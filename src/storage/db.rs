//! Database connection management and migrations

use rusqlite::Connection;
use std::path::Path;
use tracing::info;

/// Database error type
#[derive(Debug)]
pub enum DatabaseError {
    ConnectionFailed(String),
    MigrationFailed(String),
    QueryFailed(String),
    JsonParseError(String),
}

impl std::fmt::Display for DatabaseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DatabaseError::ConnectionFailed(msg) => write!(f, "Connection failed: {}", msg),
            DatabaseError::MigrationFailed(msg) => write!(f, "Migration failed: {}", msg),
            DatabaseError::QueryFailed(msg) => write!(f, "Query failed: {}", msg),
            DatabaseError::JsonParseError(msg) => write!(f, "JSON parse error: {}", msg),
        }
    }
}

impl std::error::Error for DatabaseError {}

impl From<rusqlite::Error> for DatabaseError {
    fn from(err: rusqlite::Error) -> Self {
        DatabaseError::QueryFailed(err.to_string())
    }
}

impl From<serde_json::Error> for DatabaseError {
    fn from(err: serde_json::Error) -> Self {
        DatabaseError::JsonParseError(err.to_string())
    }
}

/// Wrapper around the SQLite connection
pub struct Database {
    pub conn: Connection,
}

/// Open or create the library database at the given path
pub fn open_database(db_path: &Path) -> Result<Database, DatabaseError> {
    info!("Opening database at {:?}", db_path);

    let conn = Connection::open(db_path)
        .map_err(|e| DatabaseError::ConnectionFailed(e.to_string()))?;

    conn.execute("PRAGMA foreign_keys = ON", [])
        .map_err(|e| DatabaseError::MigrationFailed(format!("Failed to enable foreign keys: {}", e)))?;

    run_migrations(&conn)?;

    Ok(Database { conn })
}

/// Open an in-memory database (tests)
pub fn open_in_memory() -> Result<Database, DatabaseError> {
    let conn = Connection::open_in_memory()
        .map_err(|e| DatabaseError::ConnectionFailed(e.to_string()))?;
    run_migrations(&conn)?;
    Ok(Database { conn })
}

/// Run database schema migrations
fn run_migrations(conn: &Connection) -> Result<(), DatabaseError> {
    let current_version: i32 = conn
        .query_row(
            "SELECT version FROM schema_version ORDER BY version DESC LIMIT 1",
            [],
            |row| row.get(0),
        )
        .unwrap_or(0);

    info!("Current schema version: {}", current_version);

    if current_version < 1 {
        info!("Applying migration v1: Initial schema");
        apply_v1_schema(conn)?;
    }

    Ok(())
}

fn apply_v1_schema(conn: &Connection) -> Result<(), DatabaseError> {
    conn.execute_batch(include_str!("schema.sql"))
        .map_err(|e| DatabaseError::MigrationFailed(format!("Failed to apply v1 schema: {}", e)))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_open_new_database() {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("library.db");
        let result = open_database(&db_path);
        assert!(result.is_ok());
        assert!(db_path.exists());
    }

    #[test]
    fn test_schema_version() {
        let db = open_in_memory().unwrap();

        let version: i32 = db
            .conn
            .query_row("SELECT version FROM schema_version", [], |row| row.get(0))
            .unwrap();

        assert_eq!(version, 1);
    }

    #[test]
    fn test_reopen_is_idempotent() {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("library.db");
        open_database(&db_path).unwrap();
        let result = open_database(&db_path);
        assert!(result.is_ok());
    }
}
