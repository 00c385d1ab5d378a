//! Query session wrapper over SQLite for the Runar ecosystem.
//!
//! # Intention
//!
//! - Run one parameterized statement at a time against a caller-owned
//!   connection and keep its rows in memory.
//! - Serve row count, row lookup, object projection, affected rows and
//!   transaction control against that cached result.
//!
//! # Architectural Boundaries
//!
//! - Only SQLite/database code belongs here.
//! - No pooling, no retries, no statement cache beyond the last statement.
//! - Driver failures are relayed as [`RdbError`] values, never recovered.

pub mod config;
pub mod error;
pub mod params;
pub mod row;
pub mod schema;
pub mod session;
pub mod value;

pub use config::SqliteConfig;
pub use error::{RdbError, Result};
pub use params::Params;
pub use row::Row;
pub use schema::{
    ColumnConstraint, ColumnDefinition, DataType, DefaultValue, ForeignKey, ForeignKeyAction,
    IndexDefinition, Schema, TableDefinition,
};
pub use session::QuerySession;
pub use value::Value;
