//! Transaction-scoped writes
//!
//! `insert_row` and `update_row` never commit. A single call runs them in
//! autocommit mode; a [`Batch`] runs many inside one transaction and commits
//! once at the end.

use super::observer::StatementObserver;
use crate::schema::TableSchema;
use crate::sql;
use crate::value::{Key, Record};
use crate::{Error, Result};
use rusqlite::{Connection, Transaction};
use std::collections::BTreeMap;

/// Insert one row on an already open connection.
pub(crate) fn insert_row(
    conn: &Connection,
    observer: &dyn StatementObserver,
    schema: &TableSchema,
    id: &Key,
    record: &Record,
) -> Result<()> {
    let stmt = sql::insert(schema, id, record)?;
    observer.on_statement(&stmt);
    stmt.execute(conn)?;
    Ok(())
}

/// Update the columns present in `partial` on an already open connection.
/// Zero matching rows is not an error.
pub(crate) fn update_row(
    conn: &Connection,
    observer: &dyn StatementObserver,
    schema: &TableSchema,
    id: &Key,
    partial: &Record,
) -> Result<()> {
    let Some(stmt) = sql::update(schema, id, partial)? else {
        return Ok(());
    };
    observer.on_statement(&stmt);
    let changed = stmt.execute(conn)?;
    if changed == 0 {
        tracing::debug!(table = %schema.name(), key = %id, "update matched no rows");
    }
    Ok(())
}

/// Open transaction over one table.
pub(crate) struct Batch<'a> {
    tx: Transaction<'a>,
    schema: &'a TableSchema,
    observer: &'a dyn StatementObserver,
}

impl<'a> Batch<'a> {
    pub(crate) fn begin(
        conn: &'a mut Connection,
        schema: &'a TableSchema,
        observer: &'a dyn StatementObserver,
    ) -> Result<Self> {
        let tx = conn.transaction()?;
        Ok(Self { tx, schema, observer })
    }

    pub(crate) fn insert(&self, id: &Key, record: &Record) -> Result<()> {
        insert_row(&self.tx, self.observer, self.schema, id, record)
    }

    pub(crate) fn update(&self, id: &Key, partial: &Record) -> Result<()> {
        update_row(&self.tx, self.observer, self.schema, id, partial)
    }

    /// Apply `op` to every record in key order, then commit. The first
    /// failure rolls the whole transaction back and is reported with its key.
    pub(crate) fn apply<F>(self, records: &BTreeMap<Key, Record>, op: F) -> Result<()>
    where
        F: Fn(&Self, &Key, &Record) -> Result<()>,
    {
        for (key, record) in records {
            if let Err(err) = op(&self, key, record) {
                tracing::warn!(table = %self.schema.name(), key = %key, error = %err, "batch aborted, rolling back");
                if let Err(rollback) = self.tx.rollback() {
                    tracing::error!(table = %self.schema.name(), error = %rollback, "rollback failed");
                }
                return Err(Error::BatchFailed {
                    table: self.schema.name().to_string(),
                    key: key.clone(),
                    source: Box::new(err),
                });
            }
        }
        self.commit(records.len())
    }

    pub(crate) fn commit(self, rows: usize) -> Result<()> {
        self.tx.commit()?;
        tracing::debug!(table = %self.schema.name(), rows, "batch committed");
        Ok(())
    }
}
