//! tailormade-sync - Offline-first sync engine for TailorMade
//!
//! This crate contains the local store, pending-operation queue, and
//! reconciler that let the mobile client work on clients, sewing tickets,
//! and measurement templates while disconnected, then reconcile with the
//! backend's collection API once connectivity returns.

pub mod api;
pub mod config;
pub mod engine;
pub mod error;
pub mod models;
pub mod store;
pub mod sync;

mod util;

#[cfg(test)]
pub(crate) mod testing;

pub use api::{CollectionApi, RestCollectionApi};
pub use config::EngineConfig;
pub use engine::{OfflineEngine, OfflineSnapshot};
pub use error::{Error, Result};
pub use models::{LocalId, PendingOp, Record, RecordId, ResourceKind};
pub use store::{Database, PendingQueue, SnapshotStore};
pub use sync::{Reconciler, SyncOutcome};
