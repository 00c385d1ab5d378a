//! Declarative table definitions rendered to SQLite DDL.

use rusqlite::Connection;
use serde::Deserialize;
use tracing::debug;

use crate::error::{RdbError, Result};

/// Schema definition for the SQLite database
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct Schema {
    pub tables: Vec<TableDefinition>,
}

impl Schema {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_table(mut self, table: TableDefinition) -> Self {
        self.tables.push(table);
        self
    }

    /// Create every table and index that does not exist yet.
    pub fn apply(&self, conn: &Connection) -> Result<()> {
        for table in &self.tables {
            conn.execute_batch(&table.to_sql())
                .map_err(|err| RdbError::schema(&table.name, &err))?;
            for index in &table.indexes {
                conn.execute_batch(&index.to_sql(&table.name))
                    .map_err(|err| RdbError::schema(&table.name, &err))?;
            }
            debug!(table = %table.name, indexes = table.indexes.len(), "table ready");
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct TableDefinition {
    pub name: String,
    pub columns: Vec<ColumnDefinition>,
    #[serde(default)]
    pub primary_key: Vec<String>,
    #[serde(default)]
    pub foreign_keys: Vec<ForeignKey>,
    #[serde(default)]
    pub indexes: Vec<IndexDefinition>,
}

impl TableDefinition {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            columns: Vec::new(),
            primary_key: Vec::new(),
            foreign_keys: Vec::new(),
            indexes: Vec::new(),
        }
    }

    pub fn column(mut self, column: ColumnDefinition) -> Self {
        self.columns.push(column);
        self
    }

    pub fn primary_key(mut self, columns: &[&str]) -> Self {
        self.primary_key = columns.iter().map(|c| c.to_string()).collect();
        self
    }

    pub fn foreign_key(mut self, fk: ForeignKey) -> Self {
        self.foreign_keys.push(fk);
        self
    }

    pub fn index(mut self, index: IndexDefinition) -> Self {
        self.indexes.push(index);
        self
    }

    /// `CREATE TABLE IF NOT EXISTS` statement for this table.
    ///
    /// The table-level primary key is only emitted when no column already
    /// carries [`ColumnConstraint::PrimaryKey`].
    pub fn to_sql(&self) -> String {
        let mut parts: Vec<String> = self.columns.iter().map(ColumnDefinition::to_sql).collect();

        let inline_pk = self
            .columns
            .iter()
            .any(|c| c.constraints.contains(&ColumnConstraint::PrimaryKey));
        if !self.primary_key.is_empty() && !inline_pk {
            parts.push(format!("PRIMARY KEY ({})", quote_list(&self.primary_key)));
        }
        parts.extend(self.foreign_keys.iter().map(ForeignKey::to_sql));

        format!(
            "CREATE TABLE IF NOT EXISTS {} ({});",
            quote_ident(&self.name),
            parts.join(", ")
        )
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ColumnDefinition {
    pub name: String,
    pub data_type: DataType,
    #[serde(default)]
    pub constraints: Vec<ColumnConstraint>,
    #[serde(default)]
    pub default_value: Option<DefaultValue>,
}

impl ColumnDefinition {
    pub fn new(name: impl Into<String>, data_type: DataType) -> Self {
        Self {
            name: name.into(),
            data_type,
            constraints: Vec::new(),
            default_value: None,
        }
    }

    pub fn constraint(mut self, constraint: ColumnConstraint) -> Self {
        self.constraints.push(constraint);
        self
    }

    pub fn default_value(mut self, value: DefaultValue) -> Self {
        self.default_value = Some(value);
        self
    }

    fn to_sql(&self) -> String {
        let mut sql = format!("{} {}", quote_ident(&self.name), self.data_type.as_sql());
        for constraint in &self.constraints {
            sql.push(' ');
            sql.push_str(constraint.as_sql());
        }
        if let Some(default) = &self.default_value {
            sql.push_str(" DEFAULT ");
            sql.push_str(&default.to_sql());
        }
        sql
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataType {
    Integer,
    Text,
    Real,
    Blob,
}

impl DataType {
    fn as_sql(self) -> &'static str {
        match self {
            DataType::Integer => "INTEGER",
            DataType::Text => "TEXT",
            DataType::Real => "REAL",
            DataType::Blob => "BLOB",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnConstraint {
    PrimaryKey,
    NotNull,
    Unique,
}

impl ColumnConstraint {
    fn as_sql(self) -> &'static str {
        match self {
            ColumnConstraint::PrimaryKey => "PRIMARY KEY",
            ColumnConstraint::NotNull => "NOT NULL",
            ColumnConstraint::Unique => "UNIQUE",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DefaultValue {
    Integer(i64),
    Text(String),
    Real(f64),
    Null,
    CurrentTimestamp,
}

impl DefaultValue {
    fn to_sql(&self) -> String {
        match self {
            DefaultValue::Integer(i) => i.to_string(),
            // SQLite reads out-of-range literals as infinity and stores NaN as NULL
            DefaultValue::Real(f) if f.is_nan() => "NULL".to_string(),
            DefaultValue::Real(f) if f.is_infinite() => {
                if f.is_sign_negative() { "(-9e999)" } else { "(9e999)" }.to_string()
            }
            // parenthesized so exponent forms like 1e-7 stay a single term
            DefaultValue::Real(f) => format!("({f:?})"),
            DefaultValue::Text(s) => format!("'{}'", s.replace('\'', "''")),
            DefaultValue::Null => "NULL".to_string(),
            DefaultValue::CurrentTimestamp => "CURRENT_TIMESTAMP".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ForeignKey {
    pub column: String,
    pub foreign_table: String,
    pub foreign_column: String,
    #[serde(default)]
    pub on_delete: ForeignKeyAction,
    #[serde(default)]
    pub on_update: ForeignKeyAction,
}

impl ForeignKey {
    pub fn new(
        column: impl Into<String>,
        foreign_table: impl Into<String>,
        foreign_column: impl Into<String>,
    ) -> Self {
        Self {
            column: column.into(),
            foreign_table: foreign_table.into(),
            foreign_column: foreign_column.into(),
            on_delete: ForeignKeyAction::NoAction,
            on_update: ForeignKeyAction::NoAction,
        }
    }

    pub fn on_delete(mut self, action: ForeignKeyAction) -> Self {
        self.on_delete = action;
        self
    }

    pub fn on_update(mut self, action: ForeignKeyAction) -> Self {
        self.on_update = action;
        self
    }

    fn to_sql(&self) -> String {
        format!(
            "FOREIGN KEY ({}) REFERENCES {} ({}) ON DELETE {} ON UPDATE {}",
            quote_ident(&self.column),
            quote_ident(&self.foreign_table),
            quote_ident(&self.foreign_column),
            self.on_delete.as_sql(),
            self.on_update.as_sql()
        )
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ForeignKeyAction {
    #[default]
    NoAction,
    Cascade,
    SetNull,
    SetDefault,
    Restrict,
}

impl ForeignKeyAction {
    fn as_sql(self) -> &'static str {
        match self {
            ForeignKeyAction::NoAction => "NO ACTION",
            ForeignKeyAction::Cascade => "CASCADE",
            ForeignKeyAction::SetNull => "SET NULL",
            ForeignKeyAction::SetDefault => "SET DEFAULT",
            ForeignKeyAction::Restrict => "RESTRICT",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct IndexDefinition {
    pub name: String,
    pub columns: Vec<String>,
    #[serde(default)]
    pub unique: bool,
}

impl IndexDefinition {
    pub fn new(name: impl Into<String>, columns: &[&str]) -> Self {
        Self {
            name: name.into(),
            columns: columns.iter().map(|c| c.to_string()).collect(),
            unique: false,
        }
    }

    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    fn to_sql(&self, table: &str) -> String {
        format!(
            "CREATE {}INDEX IF NOT EXISTS {} ON {} ({});",
            if self.unique { "UNIQUE " } else { "" },
            quote_ident(&self.name),
            quote_ident(table),
            quote_list(&self.columns)
        )
    }
}

fn quote_ident(ident: &str) -> String {
    format!("\"{}\"", ident.replace('"', "\"\""))
}

fn quote_list(idents: &[String]) -> String {
    idents
        .iter()
        .map(|i| quote_ident(i))
        .collect::<Vec<_>>()
        .join(", ")
}
