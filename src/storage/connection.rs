//! Connection lifecycle
//!
//! States are Closed and Open. `connect` and `disconnect` are idempotent.
//! [`ConnectionSlot::scoped`] opens when needed and closes what it opened on
//! every exit path, so a failed call never leaves a handle behind.

use crate::Result;
use rusqlite::Connection;
use std::path::{Path, PathBuf};

/// How many times the slot has opened and closed a connection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ConnectionStats {
    pub opens: u64,
    pub closes: u64,
}

impl std::fmt::Display for ConnectionStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "opens: {}, closes: {}", self.opens, self.closes)
    }
}

/// Holds at most one open connection to a database file.
pub struct ConnectionSlot {
    path: PathBuf,
    conn: Option<Connection>,
    stats: ConnectionStats,
}

impl ConnectionSlot {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            conn: None,
            stats: ConnectionStats::default(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn is_open(&self) -> bool {
        self.conn.is_some()
    }

    pub fn stats(&self) -> ConnectionStats {
        self.stats
    }

    /// Open a connection unless one is already open.
    pub fn connect(&mut self) -> Result<&mut Connection> {
        let conn = match self.conn.take() {
            Some(conn) => conn,
            None => {
                let conn = Connection::open(&self.path)?;
                self.stats.opens += 1;
                tracing::trace!(path = %self.path.display(), "connection opened");
                conn
            }
        };
        Ok(self.conn.insert(conn))
    }

    /// Close the open connection, if any. The handle is cleared even when
    /// the engine reports an error on close.
    pub fn disconnect(&mut self) -> Result<()> {
        let Some(conn) = self.conn.take() else {
            return Ok(());
        };
        self.stats.closes += 1;
        tracing::trace!(path = %self.path.display(), "connection closed");
        conn.close().map_err(|(_, err)| err.into())
    }

    /// Run `f` against an open connection. If this call opened it, it is
    /// closed again before returning, whether `f` succeeded or not. A
    /// connection the caller opened explicitly stays open.
    pub fn scoped<T, F>(&mut self, f: F) -> Result<T>
    where
        F: FnOnce(&mut Connection) -> Result<T>,
    {
        let opened = !self.is_open();
        let result = f(self.connect()?);
        if !opened {
            return result;
        }

        let closed = self.disconnect();
        match (result, closed) {
            (Err(err), _) => Err(err),
            (Ok(_), Err(err)) => Err(err),
            (Ok(value), Ok(())) => Ok(value),
        }
    }
}

impl std::fmt::Debug for ConnectionSlot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionSlot")
            .field("path", &self.path)
            .field("open", &self.is_open())
            .field("stats", &self.stats)
            .finish()
    }
}
