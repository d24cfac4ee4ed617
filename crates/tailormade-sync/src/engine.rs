//! Offline-first engine surface held by the UI layer
//!
//! Reads always come straight from the local store; they never wait on the
//! network. Writes go to the server when the device is online and into the
//! pending queue otherwise, with the local snapshot updated optimistically
//! either way. The host shell feeds connectivity changes in via
//! [`OfflineEngine::set_online`] and triggers [`OfflineEngine::sync`]
//! fire-and-forget; a failed sync is reported, never fatal.

use std::sync::atomic::{AtomicBool, Ordering};

use chrono::{DateTime, Utc};
use serde_json::{Map, Value};

use crate::api::{CollectionApi, RestCollectionApi};
use crate::config::EngineConfig;
use crate::error::{Error, Result};
use crate::models::{LocalId, Record, ResourceKind};
use crate::store::{Database, PendingQueue, SnapshotStore};
use crate::sync::{Reconciler, SyncOutcome};

/// Everything the UI needs for first paint, straight from the local store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OfflineSnapshot {
    pub clients: Vec<Record>,
    pub tickets: Vec<Record>,
    pub templates: Vec<Record>,
    pub last_sync: Option<DateTime<Utc>>,
}

/// Local read model, optimistic write path, and sync trigger in one handle.
pub struct OfflineEngine<A> {
    snapshots: SnapshotStore,
    queue: PendingQueue,
    api: A,
    reconciler: Reconciler<A>,
    online: AtomicBool,
    // Owns the store lifecycle; dropped last.
    _db: Database,
}

impl OfflineEngine<RestCollectionApi> {
    /// Open the engine against the real backend.
    pub async fn open(config: &EngineConfig) -> Result<Self> {
        let api = RestCollectionApi::new(config)?;
        let db = Database::open(config.db_path()).await?;
        Ok(Self::from_parts(db, api))
    }
}

impl<A: CollectionApi + Clone> OfflineEngine<A> {
    /// Assemble an engine from an opened database and a collection API.
    pub fn from_parts(db: Database, api: A) -> Self {
        let snapshots = SnapshotStore::new(db.connection());
        let queue = PendingQueue::new(db.connection());
        let reconciler = Reconciler::new(snapshots.clone(), queue.clone(), api.clone());
        Self {
            snapshots,
            queue,
            api,
            reconciler,
            online: AtomicBool::new(true),
            _db: db,
        }
    }

    /// Record the device's connectivity as reported by the host shell.
    pub fn set_online(&self, online: bool) {
        self.online.store(online, Ordering::Relaxed);
        tracing::debug!(online, "connectivity changed");
    }

    pub fn is_online(&self) -> bool {
        self.online.load(Ordering::Relaxed)
    }

    /// Read one collection plus the last-sync timestamp, local-only.
    pub async fn load(
        &self,
        kind: ResourceKind,
    ) -> Result<(Vec<Record>, Option<DateTime<Utc>>)> {
        let records = self.snapshots.get(kind).await?;
        let last_sync = self.snapshots.last_sync().await?;
        Ok((records, last_sync))
    }

    /// Read all three collections at once, local-only.
    pub async fn load_all(&self) -> Result<OfflineSnapshot> {
        Ok(OfflineSnapshot {
            clients: self.snapshots.get(ResourceKind::Client).await?,
            tickets: self.snapshots.get(ResourceKind::Ticket).await?,
            templates: self.snapshots.get(ResourceKind::Template).await?,
            last_sync: self.snapshots.last_sync().await?,
        })
    }

    /// Number of mutations waiting for the next sync pass.
    pub async fn pending_count(&self) -> Result<usize> {
        self.queue.len().await
    }

    /// Create a record. Online: sent directly, snapshot updated from the
    /// response. Offline: queued under a freshly minted local id.
    pub async fn create(
        &self,
        kind: ResourceKind,
        payload: Map<String, Value>,
    ) -> Result<Record> {
        if self.is_online() {
            let created = self.api.create(kind, &payload).await?;
            self.snapshots.insert(kind, &created).await?;
            return Ok(created);
        }

        let local_id = LocalId::generate();
        self.queue
            .enqueue_create(kind, local_id.clone(), payload.clone())
            .await?;
        let record = Record::local(local_id, payload);
        self.snapshots.insert(kind, &record).await?;
        Ok(record)
    }

    /// Update a record with a partial payload. `id` may be the local
    /// placeholder of a record created while offline.
    pub async fn update(
        &self,
        kind: ResourceKind,
        id: &str,
        payload: Map<String, Value>,
    ) -> Result<Record> {
        if self.is_online() {
            let updated = self.api.update(kind, id, &payload).await?;
            self.snapshots.replace(kind, id, &updated).await?;
            return Ok(updated);
        }

        // Apply locally first: a mutation the snapshot rejects must never
        // linger in the queue, or every future replay aborts on it.
        let updated = self.snapshots.apply_update(kind, id, &payload).await?;
        self.queue.enqueue_update(kind, id, payload).await?;
        Ok(updated)
    }

    /// Delete a record.
    pub async fn delete(&self, kind: ResourceKind, id: &str) -> Result<()> {
        if self.is_online() {
            self.api.delete(kind, id).await?;
        } else {
            self.queue.enqueue_delete(kind, id).await?;
        }

        // The record may already be gone locally (e.g. never pulled).
        match self.snapshots.remove(kind, id).await {
            Ok(()) | Err(Error::NotFound(_)) => Ok(()),
            Err(e) => Err(e),
        }
    }

    /// Run one reconciliation pass. Safe to fire-and-forget; the result
    /// feeds the UI's "will retry" affordance.
    pub async fn sync(&self) -> Result<SyncOutcome> {
        self.reconciler.sync().await
    }
}
