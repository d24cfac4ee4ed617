//! Durable local store for the sync engine
//!
//! One SQLite file holds the last-pulled snapshot of each collection, the
//! pending-operation log, and the last-sync timestamp. It is the sole source
//! of truth for the offline-first read path.

mod connection;
mod migrations;
mod queue;
mod snapshot;

pub use connection::Database;
pub use queue::PendingQueue;
pub use snapshot::SnapshotStore;
