//! Reconciler: the pull / replay / re-pull synchronization pass
//!
//! A pass pulls the authoritative collections, replays the pending log
//! against the server in queued order, and pulls again so the local snapshot
//! reflects the replayed mutations. Conflict policy is the server's
//! last-write-wins; the engine performs no merging of its own.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde_json::Value;
use tokio::sync::Mutex;

use crate::api::CollectionApi;
use crate::error::{Error, Result};
use crate::models::{PendingOp, RecordId, ResourceKind};
use crate::store::{PendingQueue, SnapshotStore};
use crate::util::utc_now_millis;

/// Summary of a completed sync pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncOutcome {
    /// Number of queued mutations replayed against the server
    pub replayed: usize,
    /// Time of the pass's final pull; equal to the persisted last-sync timestamp
    pub completed_at: DateTime<Utc>,
}

/// Drives one synchronization pass at a time against the collection API.
pub struct Reconciler<A> {
    snapshots: SnapshotStore,
    queue: PendingQueue,
    api: A,
    // Single-flight guard: an overlapping drain could clear the queue out
    // from under the first pass.
    guard: Mutex<()>,
}

impl<A: CollectionApi> Reconciler<A> {
    pub fn new(snapshots: SnapshotStore, queue: PendingQueue, api: A) -> Self {
        Self {
            snapshots,
            queue,
            api,
            guard: Mutex::new(()),
        }
    }

    /// Run one full sync pass.
    ///
    /// Returns [`Error::SyncInFlight`] when a pass is already running. Any
    /// other failure leaves the pending queue intact for the next attempt;
    /// operations already replayed are not rolled back (at-least-once).
    pub async fn sync(&self) -> Result<SyncOutcome> {
        let Ok(_guard) = self.guard.try_lock() else {
            return Err(Error::SyncInFlight);
        };

        let mut completed_at = self.pull().await?;

        let pending = self.queue.drain().await?;
        let replayed = pending.len();
        if replayed > 0 {
            tracing::info!(count = replayed, "replaying pending mutations");
            self.replay(pending).await?;
            self.queue.clear().await?;
            // Second pull so the snapshot reflects the replayed mutations.
            completed_at = self.pull().await?;
        }

        tracing::info!(replayed, "sync pass completed");
        Ok(SyncOutcome {
            replayed,
            completed_at,
        })
    }

    /// Fetch all three collections, then replace the snapshot wholesale.
    /// Returns the timestamp persisted as last-sync.
    ///
    /// Every fetch must succeed before the store is touched, so a failed or
    /// partial pull never overwrites a good local snapshot.
    async fn pull(&self) -> Result<DateTime<Utc>> {
        let (clients, tickets, templates) = tokio::join!(
            self.api.list(ResourceKind::Client),
            self.api.list(ResourceKind::Ticket),
            self.api.list(ResourceKind::Template),
        );
        let collections = [
            (ResourceKind::Client, clients?),
            (ResourceKind::Ticket, tickets?),
            (ResourceKind::Template, templates?),
        ];

        for (kind, records) in &collections {
            self.snapshots.set(*kind, records).await?;
        }
        let pulled_at = utc_now_millis();
        self.snapshots.set_last_sync(pulled_at).await?;
        tracing::debug!("snapshot replaced from server");
        Ok(pulled_at)
    }

    /// Replay queued mutations strictly in the order they were queued.
    ///
    /// Server ids minted by creates earlier in the batch are substituted into
    /// later operations that still reference the local placeholder, so an
    /// offline create-then-edit session replays correctly. The first failure
    /// aborts the rest of the batch and the caller leaves the queue intact.
    async fn replay(&self, ops: Vec<PendingOp>) -> Result<()> {
        let mut resolved: HashMap<String, String> = HashMap::new();

        for op in ops {
            match op {
                PendingOp::Create {
                    resource,
                    local_id,
                    mut payload,
                    ..
                } => {
                    // The placeholder rides along as the server's dedupe key
                    // for resubmitted creates.
                    payload.insert(
                        "localId".to_string(),
                        Value::String(local_id.as_str().to_string()),
                    );
                    let created = self.api.create(resource, &payload).await?;
                    if let RecordId::Server(server_id) = created.id {
                        resolved.insert(local_id.as_str().to_string(), server_id);
                    }
                }
                PendingOp::Update {
                    resource,
                    id,
                    payload,
                    ..
                } => {
                    let target = resolved.get(&id).map_or(id.as_str(), String::as_str);
                    self.api.update(resource, target, &payload).await?;
                }
                PendingOp::Delete { resource, id, .. } => {
                    let target = resolved.get(&id).map_or(id.as_str(), String::as_str);
                    self.api.delete(resource, target).await?;
                }
            }
        }
        Ok(())
    }
}
