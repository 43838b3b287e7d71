//! Storage Layer - SQLite-backed persistence
//!
//! One file-backed database, one connection at a time:
//! - `connection`: Closed/Open lifecycle and scoped acquisition
//! - `observer`: diagnostic hook every statement passes through
//! - `batch`: transaction-scoped handle shared by bulk loads
//! - `sqlite`: the public [`RecordStore`]

pub mod batch;
pub mod connection;
pub mod observer;
pub mod sqlite;

pub use connection::{ConnectionSlot, ConnectionStats};
pub use observer::{StatementObserver, TracingObserver};
pub use sqlite::RecordStore;
