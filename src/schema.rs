//! Table declarations and the per-store schema registry
//!
//! The registry only knows what this process declared. A table that exists on
//! disk but was never passed to `create_table` is unknown to every record
//! operation.

use crate::{Error, MismatchReason, Result};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::str::FromStr;
use std::sync::OnceLock;

static IDENTIFIER: OnceLock<Regex> = OnceLock::new();

fn identifier_pattern() -> &'static Regex {
    IDENTIFIER.get_or_init(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("identifier pattern compiles"))
}

/// Table and column names are spliced into statements, so they are held to a
/// plain identifier shape.
pub fn validate_identifier(name: &str) -> Result<&str> {
    if identifier_pattern().is_match(name) {
        Ok(name)
    } else {
        Err(Error::InvalidIdentifier(name.to_string()))
    }
}

/// Double-quote an already validated identifier.
pub fn quote(name: &str) -> String {
    format!("\"{}\"", name)
}

/// Declared storage type of a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum ColumnType {
    Integer,
    Real,
    Text,
    Numeric,
}

impl ColumnType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ColumnType::Integer => "INTEGER",
            ColumnType::Real => "REAL",
            ColumnType::Text => "TEXT",
            ColumnType::Numeric => "NUMERIC",
        }
    }
}

impl FromStr for ColumnType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_uppercase().as_str() {
            "INT" | "INTEGER" | "BIGINT" => Ok(ColumnType::Integer),
            "REAL" | "FLOAT" | "DOUBLE" => Ok(ColumnType::Real),
            "TEXT" | "VARCHAR" | "STRING" => Ok(ColumnType::Text),
            "NUMERIC" | "DECIMAL" => Ok(ColumnType::Numeric),
            _ => Err(Error::InvalidColumnType(s.to_string())),
        }
    }
}

impl TryFrom<String> for ColumnType {
    type Error = Error;

    fn try_from(s: String) -> Result<Self> {
        s.parse()
    }
}

impl From<ColumnType> for String {
    fn from(ty: ColumnType) -> Self {
        ty.as_str().to_string()
    }
}

impl std::fmt::Display for ColumnType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A `(name, type)` column descriptor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Column {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: ColumnType,
}

impl Column {
    pub fn new(name: impl Into<String>, ty: ColumnType) -> Self {
        Self { name: name.into(), ty }
    }

    pub fn integer(name: impl Into<String>) -> Self {
        Self::new(name, ColumnType::Integer)
    }

    pub fn real(name: impl Into<String>) -> Self {
        Self::new(name, ColumnType::Real)
    }

    pub fn text(name: impl Into<String>) -> Self {
        Self::new(name, ColumnType::Text)
    }
}

/// A declared table: the primary key first, then the non-null value columns
/// in declaration order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableSchema {
    name: String,
    key: Column,
    columns: Vec<Column>,
}

impl TableSchema {
    pub fn new(name: impl Into<String>, key: Column, columns: impl IntoIterator<Item = Column>) -> Result<Self> {
        let name = name.into();
        validate_identifier(&name)?;

        let columns: Vec<Column> = columns.into_iter().collect();
        let mut seen = HashSet::new();
        for column in std::iter::once(&key).chain(&columns) {
            validate_identifier(&column.name)?;
            if !seen.insert(column.name.as_str()) {
                return Err(Error::mismatch(&name, &column.name, MismatchReason::Duplicate));
            }
        }

        Ok(Self { name, key, columns })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn key(&self) -> &Column {
        &self.key
    }

    /// Non-key columns in declaration order
    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    /// Every column name, primary key first
    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.key.name.as_str()).chain(self.columns.iter().map(|c| c.name.as_str()))
    }

    pub fn has_value_column(&self, name: &str) -> bool {
        self.columns.iter().any(|c| c.name == name)
    }

    /// Reject record keys that are not declared value columns.
    pub fn check_record_columns<'a, I>(&self, names: I) -> Result<()>
    where
        I: IntoIterator<Item = &'a String>,
    {
        for name in names {
            if *name == self.key.name {
                return Err(Error::mismatch(&self.name, name, MismatchReason::PrimaryKey));
            }
            if !self.has_value_column(name) {
                return Err(Error::mismatch(&self.name, name, MismatchReason::Unknown));
            }
        }
        Ok(())
    }
}

/// Table name to declared schema, owned by one store.
#[derive(Debug, Default)]
pub struct SchemaRegistry {
    tables: BTreeMap<String, TableSchema>,
}

impl SchemaRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a schema, replacing any earlier declaration under the same name.
    /// Returns the replaced schema.
    pub fn register(&mut self, schema: TableSchema) -> Option<TableSchema> {
        let name = schema.name.clone();
        let previous = self.tables.insert(name.clone(), schema);
        if let Some(prev) = &previous {
            if Some(prev) != self.tables.get(&name) {
                tracing::warn!(
                    table = %name,
                    "table re-declared with a different layout; on-disk schema is not altered"
                );
            }
        }
        previous
    }

    pub fn get(&self, name: &str) -> Result<&TableSchema> {
        self.tables
            .get(name)
            .ok_or_else(|| Error::SchemaNotRegistered(name.to_string()))
    }

    /// Registered table names, sorted
    pub fn tables(&self) -> impl Iterator<Item = &str> {
        self.tables.keys().map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn users() -> TableSchema {
        TableSchema::new(
            "users",
            Column::integer("id"),
            [Column::text("name"), Column::integer("score")],
        )
        .unwrap()
    }

    #[test]
    fn test_column_order() {
        let schema = users();
        let names: Vec<&str> = schema.column_names().collect();
        assert_eq!(names, vec!["id", "name", "score"]);
    }

    #[test]
    fn test_identifier_validation() {
        assert!(validate_identifier("users_2").is_ok());
        assert!(validate_identifier("_x").is_ok());
        for bad in ["", "2fast", "users; DROP TABLE x", "a\"b", "a b"] {
            assert!(matches!(validate_identifier(bad), Err(Error::InvalidIdentifier(_))), "{bad}");
        }
        assert!(TableSchema::new("ok", Column::integer("bad name"), []).is_err());
    }

    #[test]
    fn test_duplicate_column() {
        let err = TableSchema::new("t", Column::integer("id"), [Column::text("id")]).unwrap_err();
        assert!(matches!(
            err,
            Error::ColumnMismatch { reason: MismatchReason::Duplicate, .. }
        ));
    }

    #[test]
    fn test_column_type_parse() {
        assert_eq!("int".parse::<ColumnType>().unwrap(), ColumnType::Integer);
        assert_eq!("Text".parse::<ColumnType>().unwrap(), ColumnType::Text);
        assert_eq!("double".parse::<ColumnType>().unwrap(), ColumnType::Real);
        assert!("BLOBBY".parse::<ColumnType>().is_err());
    }

    #[test]
    fn test_record_column_check() {
        let schema = users();
        let ok = ["name".to_string(), "score".to_string()];
        assert!(schema.check_record_columns(&ok).is_ok());

        let key = ["id".to_string()];
        assert!(matches!(
            schema.check_record_columns(&key),
            Err(Error::ColumnMismatch { reason: MismatchReason::PrimaryKey, .. })
        ));

        let unknown = ["email".to_string()];
        assert!(matches!(
            schema.check_record_columns(&unknown),
            Err(Error::ColumnMismatch { reason: MismatchReason::Unknown, .. })
        ));
    }

    #[test]
    fn test_registry_overwrites() {
        let mut registry = SchemaRegistry::new();
        assert!(matches!(registry.get("users"), Err(Error::SchemaNotRegistered(_))));

        assert!(registry.register(users()).is_none());
        let narrower = TableSchema::new("users", Column::integer("id"), [Column::text("name")]).unwrap();
        let replaced = registry.register(narrower).unwrap();

        assert_eq!(replaced.columns().len(), 2);
        assert_eq!(registry.get("users").unwrap().columns().len(), 1);
        assert_eq!(registry.tables().count(), 1);
    }
}
