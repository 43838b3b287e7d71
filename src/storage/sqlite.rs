//! SQLite record store

use std::collections::BTreeMap;
use std::path::Path;
use rusqlite::{Connection, OptionalExtension};
use crate::Result;
use crate::schema::{Column, SchemaRegistry, TableSchema, validate_identifier};
use crate::sql;
use crate::value::{Key, Record, Snapshot, Value};
use super::batch::{self, Batch};
use super::connection::{ConnectionSlot, ConnectionStats};
use super::observer::{StatementObserver, TracingObserver};

/// Schema-on-write record store over one SQLite file.
///
/// Every operation opens a connection, does its work and closes it again,
/// unless the caller has opened one with [`RecordStore::connect`]. Batch
/// operations share one connection and one transaction across all records.
///
/// Not synchronized: callers sharing a store across threads serialize access.
pub struct RecordStore {
    slot: ConnectionSlot,
    registry: SchemaRegistry,
    observer: Box<dyn StatementObserver>,
}

impl RecordStore {
    /// Create a store for a database file (created on first connect). No
    /// connection is opened here.
    pub fn open(path: impl AsRef<Path>) -> Self {
        Self {
            slot: ConnectionSlot::new(path.as_ref()),
            registry: SchemaRegistry::new(),
            observer: Box::new(TracingObserver),
        }
    }

    /// Replace the statement observer (defaults to [`TracingObserver`])
    pub fn with_observer(mut self, observer: impl StatementObserver + 'static) -> Self {
        self.observer = Box::new(observer);
        self
    }

    pub fn path(&self) -> &Path {
        self.slot.path()
    }

    // ========== Connection Lifecycle ==========

    /// Open the connection. No-op if already open.
    pub fn connect(&mut self) -> Result<()> {
        self.slot.connect().map(|_| ())
    }

    /// Close the connection. No-op if already closed.
    pub fn disconnect(&mut self) -> Result<()> {
        self.slot.disconnect()
    }

    pub fn is_connected(&self) -> bool {
        self.slot.is_open()
    }

    /// Lifetime open/close counts for this store
    pub fn connection_stats(&self) -> ConnectionStats {
        self.slot.stats()
    }

    // ========== Schema Operations ==========

    /// Declare a table: `key` becomes the primary key, every other column is
    /// `NOT NULL`. Creates the table if absent; an existing on-disk table is
    /// left as is and is not compared against this declaration.
    pub fn create_table(
        &mut self,
        name: &str,
        key: Column,
        columns: impl IntoIterator<Item = Column>,
    ) -> Result<()> {
        let schema = TableSchema::new(name, key, columns)?;
        self.declare(schema)
    }

    /// Declare a prebuilt schema. See [`RecordStore::create_table`].
    pub fn declare(&mut self, schema: TableSchema) -> Result<()> {
        let stmt = sql::create_table(&schema);
        let observer = self.observer.as_ref();
        self.slot.scoped(|conn| {
            observer.on_statement(&stmt);
            stmt.execute(conn)
        })?;

        tracing::debug!(table = %schema.name(), columns = schema.columns().len() + 1, "table declared");
        self.registry.register(schema);
        Ok(())
    }

    pub fn schema(&self, table: &str) -> Result<&TableSchema> {
        self.registry.get(table)
    }

    /// Tables declared in this process, sorted by name
    pub fn registered_tables(&self) -> Vec<&str> {
        self.registry.tables().collect()
    }

    // ========== Record Operations ==========

    /// Insert a new row. `record` must hold every declared non-key column and
    /// nothing else; the key goes in `id`.
    pub fn insert(&mut self, table: &str, id: impl Into<Key>, record: &Record) -> Result<()> {
        let id = id.into();
        let schema = self.registry.get(table)?;
        let observer = self.observer.as_ref();
        self.slot
            .scoped(|conn| batch::insert_row(conn, observer, schema, &id, record))
    }

    /// Set the columns present in `partial` on the row keyed by `id`. Columns
    /// not mentioned are left alone; a missing row is a silent no-op.
    pub fn update(&mut self, table: &str, id: impl Into<Key>, partial: &Record) -> Result<()> {
        let id = id.into();
        let schema = self.registry.get(table)?;
        let observer = self.observer.as_ref();
        self.slot
            .scoped(|conn| batch::update_row(conn, observer, schema, &id, partial))
    }

    /// Insert many rows in one transaction. Any failure rolls back every row
    /// of the batch and returns [`crate::Error::BatchFailed`].
    pub fn batch_insert(&mut self, table: &str, records: &BTreeMap<Key, Record>) -> Result<()> {
        let schema = self.registry.get(table)?;
        let observer = self.observer.as_ref();
        self.slot.scoped(|conn| {
            Batch::begin(conn, schema, observer)?.apply(records, Batch::insert)
        })
    }

    /// Apply many partial updates in one transaction, with the same failure
    /// policy as [`RecordStore::batch_insert`].
    pub fn batch_update(&mut self, table: &str, records: &BTreeMap<Key, Record>) -> Result<()> {
        let schema = self.registry.get(table)?;
        let observer = self.observer.as_ref();
        self.slot.scoped(|conn| {
            Batch::begin(conn, schema, observer)?.apply(records, Batch::update)
        })
    }

    /// Point lookup by primary key
    pub fn get(&mut self, table: &str, id: impl Into<Key>) -> Result<Option<Record>> {
        let id = id.into();
        let schema = self.registry.get(table)?;
        let observer = self.observer.as_ref();
        self.slot.scoped(|conn| {
            let stmt = sql::select_one(schema, &id)?;
            observer.on_statement(&stmt);
            let record = conn
                .query_row(&stmt.sql, rusqlite::params_from_iter(stmt.params.iter()), |row| {
                    let mut record = Record::new();
                    for (i, column) in schema.columns().iter().enumerate() {
                        record.insert(column.name.clone(), row.get::<_, Value>(i)?);
                    }
                    Ok(record)
                })
                .optional()?;
            Ok(record)
        })
    }

    /// Materialize a whole table as primary key -> record.
    ///
    /// Reads whatever is on disk, registered or not. Rows are keyed by the
    /// column the engine reports as primary key, falling back to the first
    /// column when none is declared.
    pub fn to_dict(&mut self, table: &str) -> Result<Snapshot> {
        let table = validate_identifier(table)?;
        let observer = self.observer.as_ref();
        self.slot.scoped(|conn| read_snapshot(conn, observer, table))
    }
}

fn read_snapshot(conn: &Connection, observer: &dyn StatementObserver, table: &str) -> Result<Snapshot> {
    let pk_stmt = sql::primary_key_column(table);
    observer.on_statement(&pk_stmt);
    let key_column: Option<String> = conn
        .query_row(&pk_stmt.sql, rusqlite::params_from_iter(pk_stmt.params.iter()), |row| row.get(0))
        .optional()?;

    let stmt = sql::select_all(table)?;
    observer.on_statement(&stmt);
    let mut prepared = conn.prepare(&stmt.sql)?;
    let names: Vec<String> = prepared.column_names().into_iter().map(String::from).collect();
    let key_index = key_column
        .and_then(|key| names.iter().position(|name| *name == key))
        .unwrap_or(0);

    let mut snapshot = Snapshot::new();
    let mut rows = prepared.query([])?;
    while let Some(row) = rows.next()? {
        let mut key = None;
        let mut record = Record::new();
        for (i, name) in names.iter().enumerate() {
            let value: Value = row.get(i)?;
            if i == key_index {
                key = Some(Key::try_from(value)?);
            } else {
                record.insert(name.clone(), value);
            }
        }
        if let Some(key) = key {
            snapshot.insert(key, record);
        }
    }
    Ok(snapshot)
}

impl std::fmt::Debug for RecordStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecordStore")
            .field("slot", &self.slot)
            .field("registry", &self.registry)
            .finish_non_exhaustive()
    }
}
