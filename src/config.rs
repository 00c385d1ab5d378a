//! Opening a configured SQLite connection for callers that need one.

use std::time::Duration;

use rusqlite::Connection;
use serde::Deserialize;
use tracing::info;

use crate::error::{RdbError, Result};
use crate::schema::Schema;

/// Path that opens a private in-memory database.
pub const MEMORY_PATH: &str = ":memory:";

fn default_busy_timeout_ms() -> u64 {
    5_000
}

fn default_foreign_keys() -> bool {
    true
}

/// How to open a connection for callers that do not manage one themselves.
///
/// The returned connection belongs to the caller; query sessions only borrow it.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SqliteConfig {
    /// Path to the SQLite database file, or `:memory:`
    pub db_path: String,
    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,
    #[serde(default = "default_foreign_keys")]
    pub foreign_keys: bool,
    /// Tables created on open when missing
    #[serde(default)]
    pub schema: Option<Schema>,
}

impl SqliteConfig {
    pub fn new(db_path: impl Into<String>) -> Self {
        Self {
            db_path: db_path.into(),
            busy_timeout_ms: default_busy_timeout_ms(),
            foreign_keys: default_foreign_keys(),
            schema: None,
        }
    }

    pub fn in_memory() -> Self {
        Self::new(MEMORY_PATH)
    }

    pub fn with_schema(mut self, schema: Schema) -> Self {
        self.schema = Some(schema);
        self
    }

    pub fn with_busy_timeout(mut self, timeout: Duration) -> Self {
        self.busy_timeout_ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX);
        self
    }

    pub fn with_foreign_keys(mut self, enabled: bool) -> Self {
        self.foreign_keys = enabled;
        self
    }

    /// Open the database, apply connection settings and bootstrap the schema.
    pub fn open(&self) -> Result<Connection> {
        let path = self.db_path.as_str();
        let conn = if path == MEMORY_PATH {
            Connection::open_in_memory()
        } else {
            Connection::open(path)
        }
        .map_err(|err| RdbError::open(path, &err))?;

        conn.busy_timeout(Duration::from_millis(self.busy_timeout_ms))
            .map_err(|err| RdbError::open(path, &err))?;
        conn.pragma_update(None, "foreign_keys", self.foreign_keys)
            .map_err(|err| RdbError::open(path, &err))?;
        info!(path, foreign_keys = self.foreign_keys, "opened sqlite database");

        if let Some(schema) = &self.schema {
            schema.apply(&conn)?;
            info!(path, tables = schema.tables.len(), "schema initialized");
        }
        Ok(conn)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{
        ColumnConstraint, ColumnDefinition, DataType, ForeignKeyAction, IndexDefinition,
        TableDefinition,
    };

    #[test]
    fn defaults_from_json() {
        let config: SqliteConfig = serde_json::from_str(r#"{"db_path": ":memory:"}"#).unwrap();
        assert_eq!(config, SqliteConfig::in_memory());
        assert_eq!(config.busy_timeout_ms, 5_000);
        assert!(config.foreign_keys);
        assert!(config.schema.is_none());
    }

    #[test]
    fn opens_in_memory_with_pragmas() {
        let conn = SqliteConfig::in_memory().open().unwrap();
        let fk: i64 = conn
            .query_row("PRAGMA foreign_keys", [], |row| row.get(0))
            .unwrap();
        assert_eq!(fk, 1);

        let conn = SqliteConfig::in_memory()
            .with_foreign_keys(false)
            .open()
            .unwrap();
        let fk: i64 = conn
            .query_row("PRAGMA foreign_keys", [], |row| row.get(0))
            .unwrap();
        assert_eq!(fk, 0);
    }

    fn table_names(conn: &Connection) -> Vec<String> {
        let mut stmt = conn
            .prepare("SELECT name FROM sqlite_master WHERE type = 'table' ORDER BY name")
            .unwrap();
        let names = stmt
            .query_map([], |row| row.get(0))
            .unwrap()
            .collect::<rusqlite::Result<Vec<String>>>()
            .unwrap();
        names
    }

    #[test]
    fn opens_from_json_with_schema() {
        let config: SqliteConfig = serde_json::from_str(
            r#"{
                "db_path": ":memory:",
                "busy_timeout_ms": 250,
                "schema": {
                    "tables": [
                        {
                            "name": "users",
                            "columns": [
                                {"name": "id", "data_type": "integer", "constraints": ["primary_key"]},
                                {"name": "name", "data_type": "text", "constraints": ["not_null"]},
                                {"name": "created", "data_type": "text", "default_value": "current_timestamp"},
                                {"name": "score", "data_type": "real", "default_value": {"real": 1.5}}
                            ],
                            "indexes": [{"name": "idx_users_name", "columns": ["name"], "unique": true}]
                        },
                        {
                            "name": "posts",
                            "columns": [
                                {"name": "id", "data_type": "integer", "constraints": ["primary_key"]},
                                {"name": "user_id", "data_type": "integer"}
                            ],
                            "foreign_keys": [
                                {"column": "user_id", "foreign_table": "users", "foreign_column": "id", "on_delete": "cascade"}
                            ]
                        }
                    ]
                }
            }"#,
        )
        .unwrap();
        assert_eq!(config.busy_timeout_ms, 250);
        let schema = config.schema.as_ref().unwrap();
        assert_eq!(schema.tables[0].columns[1].constraints, [ColumnConstraint::NotNull]);
        assert_eq!(schema.tables[1].foreign_keys[0].on_delete, ForeignKeyAction::Cascade);

        let conn = config.open().unwrap();
        assert_eq!(table_names(&conn), ["posts", "users"]);
        let timeout: i64 = conn
            .query_row("PRAGMA busy_timeout", [], |row| row.get(0))
            .unwrap();
        assert_eq!(timeout, 250);

        conn.execute("INSERT INTO users (id, name) VALUES (1, 'Alice')", [])
            .unwrap();
        let (created, score): (Option<String>, f64) = conn
            .query_row("SELECT created, score FROM users WHERE id = 1", [], |row| {
                Ok((row.get(0)?, row.get(1)?))
            })
            .unwrap();
        assert!(created.is_some());
        assert_eq!(score, 1.5);

        // foreign keys are on by default, so the cascade applies
        conn.execute("INSERT INTO posts (id, user_id) VALUES (10, 1)", [])
            .unwrap();
        conn.execute("DELETE FROM users WHERE id = 1", []).unwrap();
        let posts: i64 = conn
            .query_row("SELECT COUNT(*) FROM posts", [], |row| row.get(0))
            .unwrap();
        assert_eq!(posts, 0);
    }

    #[test]
    fn builder_with_schema_and_timeout() {
        let schema = Schema::new().add_table(
            TableDefinition::new("events")
                .column(ColumnDefinition::new("id", DataType::Integer))
                .column(ColumnDefinition::new("payload", DataType::Blob)),
        );
        let conn = SqliteConfig::in_memory()
            .with_schema(schema)
            .with_busy_timeout(Duration::from_millis(1_500))
            .open()
            .unwrap();
        assert_eq!(table_names(&conn), ["events"]);
        let timeout: i64 = conn
            .query_row("PRAGMA busy_timeout", [], |row| row.get(0))
            .unwrap();
        assert_eq!(timeout, 1_500);
    }

    #[test]
    fn schema_failure_surfaces_from_open() {
        let schema = Schema::new().add_table(
            TableDefinition::new("broken")
                .column(ColumnDefinition::new("id", DataType::Integer))
                .index(IndexDefinition::new("idx_nope", &["nope"])),
        );
        let err = SqliteConfig::in_memory()
            .with_schema(schema)
            .open()
            .unwrap_err();
        assert!(matches!(err, RdbError::Schema { ref table, .. } if table == "broken"));
    }

    #[test]
    fn unopenable_path_is_open_error() {
        let err = SqliteConfig::new("/nonexistent-dir/for/sure/db.sqlite")
            .open()
            .unwrap_err();
        assert!(matches!(err, RdbError::Open { .. }));
    }
}
