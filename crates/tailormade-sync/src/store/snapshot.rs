//! Snapshot store: the last-pulled server state per collection
//!
//! Collections are replaced wholesale on every successful pull; there is no
//! incremental diffing. Between pulls the engine layers optimistic local
//! mutations onto the same rows so the read path stays instant.

#![allow(clippy::cast_possible_wrap)] // SQLite uses i64 for row positions

use chrono::{DateTime, TimeZone, Utc};
use libsql::{params, Connection};

use crate::error::{Error, Result};
use crate::models::{Record, ResourceKind};

const LAST_SYNC_KEY: &str = "last_sync";

/// Durable per-collection snapshot plus the last-sync scalar.
#[derive(Clone)]
pub struct SnapshotStore {
    conn: Connection,
}

impl SnapshotStore {
    /// Create a snapshot store over the given connection.
    pub const fn new(conn: Connection) -> Self {
        Self { conn }
    }

    /// Read a collection in stored order.
    pub async fn get(&self, kind: ResourceKind) -> Result<Vec<Record>> {
        let mut rows = self
            .conn
            .query(
                "SELECT body FROM snapshot_records WHERE kind = ? ORDER BY position ASC",
                params![kind.as_str()],
            )
            .await?;

        let mut records = Vec::new();
        while let Some(row) = rows.next().await? {
            let body: String = row.get(0)?;
            records.push(Record::from_stored(serde_json::from_str(&body)?)?);
        }
        Ok(records)
    }

    /// Replace a collection wholesale, atomically.
    pub async fn set(&self, kind: ResourceKind, records: &[Record]) -> Result<()> {
        self.conn.execute("BEGIN TRANSACTION", ()).await?;

        let result = self.write_all(kind, records).await;
        if let Err(e) = result {
            self.conn.execute("ROLLBACK", ()).await.ok();
            return Err(e);
        }

        if let Err(e) = self.conn.execute("COMMIT", ()).await {
            self.conn.execute("ROLLBACK", ()).await.ok();
            return Err(e.into());
        }
        Ok(())
    }

    async fn write_all(&self, kind: ResourceKind, records: &[Record]) -> Result<()> {
        self.conn
            .execute(
                "DELETE FROM snapshot_records WHERE kind = ?",
                params![kind.as_str()],
            )
            .await?;

        for (position, record) in records.iter().enumerate() {
            let body = serde_json::to_string(&record.to_value())?;
            self.conn
                .execute(
                    "INSERT INTO snapshot_records (kind, position, body) VALUES (?, ?, ?)",
                    params![kind.as_str(), position as i64, body],
                )
                .await?;
        }
        Ok(())
    }

    /// Append one record to a collection (optimistic create).
    pub async fn insert(&self, kind: ResourceKind, record: &Record) -> Result<()> {
        let body = serde_json::to_string(&record.to_value())?;
        self.conn
            .execute(
                "INSERT INTO snapshot_records (kind, position, body)
                 SELECT ?, COALESCE(MAX(position) + 1, 0), ?
                 FROM snapshot_records WHERE kind = ?",
                params![kind.as_str(), body, kind.as_str()],
            )
            .await?;
        Ok(())
    }

    /// Merge a partial payload over one record (optimistic update).
    pub async fn apply_update(
        &self,
        kind: ResourceKind,
        id: &str,
        payload: &serde_json::Map<String, serde_json::Value>,
    ) -> Result<Record> {
        let mut records = self.get(kind).await?;
        let record = records
            .iter_mut()
            .find(|record| record.id.as_str() == id)
            .ok_or_else(|| Error::NotFound(format!("{kind} {id}")))?;
        record.apply(payload);
        let updated = record.clone();
        self.set(kind, &records).await?;
        Ok(updated)
    }

    /// Replace one record in place, keyed by id (direct-write confirmation).
    pub async fn replace(&self, kind: ResourceKind, id: &str, record: &Record) -> Result<()> {
        let mut records = self.get(kind).await?;
        match records.iter_mut().find(|existing| existing.id.as_str() == id) {
            Some(existing) => *existing = record.clone(),
            None => records.push(record.clone()),
        }
        self.set(kind, &records).await
    }

    /// Remove one record from a collection (optimistic delete).
    pub async fn remove(&self, kind: ResourceKind, id: &str) -> Result<()> {
        let mut records = self.get(kind).await?;
        let before = records.len();
        records.retain(|record| record.id.as_str() != id);
        if records.len() == before {
            return Err(Error::NotFound(format!("{kind} {id}")));
        }
        self.set(kind, &records).await
    }

    /// Timestamp of the last fully successful sync pass, if any.
    ///
    /// Display-only; never consulted for conflict detection.
    pub async fn last_sync(&self) -> Result<Option<DateTime<Utc>>> {
        let mut rows = self
            .conn
            .query(
                "SELECT value FROM meta WHERE key = ?",
                params![LAST_SYNC_KEY],
            )
            .await?;

        let Some(row) = rows.next().await? else {
            return Ok(None);
        };
        let raw: String = row.get(0)?;
        let millis: i64 = raw
            .parse()
            .map_err(|_| Error::InvalidInput(format!("corrupt last_sync value: {raw}")))?;
        Ok(Utc.timestamp_millis_opt(millis).single())
    }

    /// Record the completion time of a successful sync pass.
    pub async fn set_last_sync(&self, at: DateTime<Utc>) -> Result<()> {
        self.conn
            .execute(
                "INSERT INTO meta (key, value) VALUES (?, ?)
                 ON CONFLICT(key) DO UPDATE SET value = excluded.value",
                params![LAST_SYNC_KEY, at.timestamp_millis().to_string()],
            )
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::LocalId;
    use crate::store::Database;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    async fn setup() -> SnapshotStore {
        let db = Database::open_in_memory().await.unwrap();
        SnapshotStore::new(db.connection())
    }

    fn remote(id: &str, name: &str) -> Record {
        Record::from_remote(json!({"_id": id, "name": name})).unwrap()
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn empty_collection_reads_empty() {
        let store = setup().await;
        assert!(store.get(ResourceKind::Client).await.unwrap().is_empty());
        assert!(store.last_sync().await.unwrap().is_none());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn set_replaces_wholesale_and_preserves_order() {
        let store = setup().await;

        store
            .set(ResourceKind::Client, &[remote("c1", "Ada"), remote("c2", "Grace")])
            .await
            .unwrap();
        store
            .set(ResourceKind::Client, &[remote("c3", "Edith")])
            .await
            .unwrap();

        let records = store.get(ResourceKind::Client).await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].id.as_str(), "c3");
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn collections_are_isolated_per_kind() {
        let store = setup().await;

        store
            .set(ResourceKind::Client, &[remote("c1", "Ada")])
            .await
            .unwrap();
        store
            .set(ResourceKind::Ticket, &[remote("t1", "Hem dress")])
            .await
            .unwrap();

        assert_eq!(store.get(ResourceKind::Client).await.unwrap().len(), 1);
        assert_eq!(store.get(ResourceKind::Ticket).await.unwrap().len(), 1);
        assert!(store.get(ResourceKind::Template).await.unwrap().is_empty());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn insert_appends_local_record() {
        let store = setup().await;
        store
            .set(ResourceKind::Client, &[remote("c1", "Ada")])
            .await
            .unwrap();

        let local = Record::local(
            LocalId::generate(),
            json!({"name": "Grace"}).as_object().unwrap().clone(),
        );
        store.insert(ResourceKind::Client, &local).await.unwrap();

        let records = store.get(ResourceKind::Client).await.unwrap();
        assert_eq!(records.len(), 2);
        assert!(records[1].id.is_local());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn apply_update_merges_payload() {
        let store = setup().await;
        store
            .set(ResourceKind::Ticket, &[remote("t1", "Hem dress")])
            .await
            .unwrap();

        let updated = store
            .apply_update(
                ResourceKind::Ticket,
                "t1",
                json!({"status": "completed"}).as_object().unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(updated.fields["status"], json!("completed"));

        let records = store.get(ResourceKind::Ticket).await.unwrap();
        assert_eq!(records[0].fields["status"], json!("completed"));
        assert_eq!(records[0].fields["name"], json!("Hem dress"));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn apply_update_missing_record_is_not_found() {
        let store = setup().await;
        let err = store
            .apply_update(
                ResourceKind::Ticket,
                "t9",
                json!({"status": "completed"}).as_object().unwrap(),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn remove_deletes_only_the_target() {
        let store = setup().await;
        store
            .set(ResourceKind::Client, &[remote("c1", "Ada"), remote("c2", "Grace")])
            .await
            .unwrap();

        store.remove(ResourceKind::Client, "c1").await.unwrap();
        let records = store.get(ResourceKind::Client).await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].id.as_str(), "c2");
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn last_sync_round_trips_at_millis_precision() {
        let store = setup().await;
        let at = Utc.timestamp_millis_opt(1_700_000_000_123).single().unwrap();
        store.set_last_sync(at).await.unwrap();
        assert_eq!(store.last_sync().await.unwrap(), Some(at));
    }
}
