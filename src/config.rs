use crate::schema::{Column, ColumnType, TableSchema};
use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct RecordStoreConfig {
    pub database: Option<String>,
    #[serde(default)]
    pub tables: Vec<TableConfig>,
}

/// One `[[tables]]` entry. The registry lives only as long as the process,
/// so these are re-declared on every start.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TableConfig {
    pub name: String,
    pub key: Column,
    #[serde(default)]
    pub columns: Vec<Column>,
}

impl TableConfig {
    pub fn to_schema(&self) -> crate::Result<TableSchema> {
        TableSchema::new(self.name.clone(), self.key.clone(), self.columns.iter().cloned())
    }
}

pub fn default_config_path() -> PathBuf {
    PathBuf::from("recordstore.toml")
}

pub fn default_database_path() -> PathBuf {
    PathBuf::from("recordstore.db")
}

/// Starter config written by `recordstore init`
pub fn starter_config() -> RecordStoreConfig {
    RecordStoreConfig {
        database: Some(default_database_path().display().to_string()),
        tables: vec![TableConfig {
            name: "users".to_string(),
            key: Column::new("id", ColumnType::Integer),
            columns: vec![
                Column::new("name", ColumnType::Text),
                Column::new("score", ColumnType::Integer),
            ],
        }],
    }
}

/// Read the table declarations. `Ok(None)` when there is no config yet.
pub fn load_config(path: Option<&Path>) -> anyhow::Result<Option<RecordStoreConfig>> {
    let path = path.map(Path::to_path_buf).unwrap_or_else(default_config_path);
    if !path.is_file() {
        return Ok(None);
    }

    let contents = std::fs::read_to_string(&path)
        .with_context(|| format!("reading table declarations from {}", path.display()))?;
    let config = toml::from_str::<RecordStoreConfig>(&contents)
        .with_context(|| format!("{} is not a valid recordstore config", path.display()))?;
    tracing::debug!("Loaded {} table declarations from {:?}", config.tables.len(), path);
    Ok(Some(config))
}

pub fn write_config(path: &Path, config: &RecordStoreConfig, force: bool) -> anyhow::Result<()> {
    if path.exists() && !force {
        anyhow::bail!(
            "{} already declares tables; pass --force to replace it",
            path.display()
        );
    }

    let contents = toml::to_string_pretty(config).context("serializing table declarations")?;
    std::fs::write(path, contents)
        .with_context(|| format!("writing table declarations to {}", path.display()))
}

/// Create the directory the database file lives in; SQLite will not.
pub fn ensure_db_dir(db_path: &Path) -> anyhow::Result<()> {
    match db_path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => std::fs::create_dir_all(dir)
            .with_context(|| format!("creating database directory {}", dir.display())),
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_tables() {
        let text = r#"
            database = "data/users.db"

            [[tables]]
            name = "users"
            key = { name = "id", type = "INTEGER" }
            columns = [
                { name = "name", type = "text" },
                { name = "score", type = "INT" },
            ]
        "#;

        let config: RecordStoreConfig = toml::from_str(text).unwrap();
        assert_eq!(config.database.as_deref(), Some("data/users.db"));
        assert_eq!(config.tables.len(), 1);

        let schema = config.tables[0].to_schema().unwrap();
        let names: Vec<&str> = schema.column_names().collect();
        assert_eq!(names, vec!["id", "name", "score"]);
        assert_eq!(schema.columns()[1].ty, ColumnType::Integer);
    }

    #[test]
    fn test_unknown_type_rejected() {
        let text = r#"
            [[tables]]
            name = "t"
            key = { name = "id", type = "UUID" }
        "#;
        assert!(toml::from_str::<RecordStoreConfig>(text).is_err());
    }

    #[test]
    fn test_write_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("recordstore.toml");

        write_config(&path, &starter_config(), false).unwrap();
        assert!(write_config(&path, &starter_config(), false).is_err());
        write_config(&path, &starter_config(), true).unwrap();

        let loaded = load_config(Some(&path)).unwrap().unwrap();
        assert_eq!(loaded, starter_config());
    }

    #[test]
    fn test_missing_config() {
        let dir = tempfile::tempdir().unwrap();
        assert!(load_config(Some(&dir.path().join("absent.toml"))).unwrap().is_none());
    }

    #[test]
    fn test_errors_name_the_config() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("recordstore.toml");
        std::fs::write(&path, "[[tables]]\nname = 3\n").unwrap();

        let err = load_config(Some(&path)).unwrap_err();
        assert!(format!("{err:#}").contains("not a valid recordstore config"), "{err:#}");

        let err = write_config(&path, &starter_config(), false).unwrap_err();
        assert!(err.to_string().contains("--force"), "{err}");
    }

    #[test]
    fn test_ensure_db_dir() {
        let dir = tempfile::tempdir().unwrap();
        let db = dir.path().join("nested").join("deeper").join("store.db");
        ensure_db_dir(&db).unwrap();
        assert!(db.parent().unwrap().is_dir());
        ensure_db_dir(&db).unwrap();
        ensure_db_dir(Path::new("bare.db")).unwrap();
    }
}
