//! Pending-operation queue
//!
//! A single ordered log of offline mutations, persisted next to the snapshot.
//! `drain` reads without removing; entries are only ever removed by `clear`,
//! after the whole drained batch has replayed successfully. A replay that
//! fails partway leaves the log intact, so redelivery is at-least-once.

use libsql::{params, Connection};
use serde_json::{Map, Value};

use crate::error::Result;
use crate::models::{LocalId, PendingOp, ResourceKind};
use crate::util::unix_timestamp_millis_now;

/// Durable FIFO log of not-yet-synced mutations.
#[derive(Clone)]
pub struct PendingQueue {
    conn: Connection,
}

impl PendingQueue {
    /// Create a pending queue over the given connection.
    pub const fn new(conn: Connection) -> Self {
        Self { conn }
    }

    /// Queue a create performed while offline.
    pub async fn enqueue_create(
        &self,
        resource: ResourceKind,
        local_id: LocalId,
        payload: Map<String, Value>,
    ) -> Result<()> {
        self.append(&PendingOp::Create {
            resource,
            local_id,
            payload,
            queued_at: unix_timestamp_millis_now(),
        })
        .await
    }

    /// Queue an update performed while offline. `id` may be a server id or
    /// the local placeholder of a not-yet-synced create.
    pub async fn enqueue_update(
        &self,
        resource: ResourceKind,
        id: impl Into<String>,
        payload: Map<String, Value>,
    ) -> Result<()> {
        self.append(&PendingOp::Update {
            resource,
            id: id.into(),
            payload,
            queued_at: unix_timestamp_millis_now(),
        })
        .await
    }

    /// Queue a delete performed while offline.
    pub async fn enqueue_delete(&self, resource: ResourceKind, id: impl Into<String>) -> Result<()> {
        self.append(&PendingOp::Delete {
            resource,
            id: id.into(),
            queued_at: unix_timestamp_millis_now(),
        })
        .await
    }

    async fn append(&self, op: &PendingOp) -> Result<()> {
        let body = serde_json::to_string(op)?;
        self.conn
            .execute(
                "INSERT INTO pending_ops (body, queued_at) VALUES (?, ?)",
                params![body, op.queued_at()],
            )
            .await?;
        tracing::debug!(
            op = op.kind_str(),
            resource = %op.resource(),
            "queued offline mutation"
        );
        Ok(())
    }

    /// Read the full log in queued order without removing anything.
    pub async fn drain(&self) -> Result<Vec<PendingOp>> {
        let mut rows = self
            .conn
            .query("SELECT body FROM pending_ops ORDER BY seq ASC", ())
            .await?;

        let mut ops = Vec::new();
        while let Some(row) = rows.next().await? {
            let body: String = row.get(0)?;
            ops.push(serde_json::from_str(&body)?);
        }
        Ok(ops)
    }

    /// Empty the log. Call only after every operation of a drained batch has
    /// been replayed successfully.
    pub async fn clear(&self) -> Result<()> {
        self.conn.execute("DELETE FROM pending_ops", ()).await?;
        Ok(())
    }

    /// Number of queued mutations (for the UI badge).
    pub async fn len(&self) -> Result<usize> {
        let mut rows = self
            .conn
            .query("SELECT COUNT(*) FROM pending_ops", ())
            .await?;
        let row = rows.next().await?.ok_or_else(|| {
            crate::error::Error::InvalidInput("COUNT returned no rows".to_string())
        })?;
        let count: i64 = row.get(0)?;
        Ok(usize::try_from(count).unwrap_or(0))
    }

    pub async fn is_empty(&self) -> Result<bool> {
        Ok(self.len().await? == 0)
    }
}
