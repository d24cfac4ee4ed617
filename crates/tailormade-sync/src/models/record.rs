//! Record model
//!
//! A record is a free-form document (the backend owns the schema) plus an
//! identity. Identity is either a server-assigned id (`_id` on the wire) or a
//! client-minted placeholder for records created while offline. The
//! [`RecordId`] enum makes the two states mutually exclusive: a record never
//! carries both a server id and an unresolved local one.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::error::{Error, Result};

const LOCAL_ID_PREFIX: &str = "local_";

/// Field the backend assigns and returns record identifiers under.
const SERVER_ID_FIELD: &str = "_id";

/// Field offline-created records carry their placeholder id under, retained
/// after reconciliation as a historical join key.
const LOCAL_ID_FIELD: &str = "localId";

/// Client-generated placeholder identifier for a record created while offline.
///
/// Uses UUID v7 behind a `local_` prefix, so ids generated on one device are
/// time-sortable and never collide within a session.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct LocalId(String);

impl<'de> Deserialize<'de> for LocalId {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let value = String::deserialize(deserializer)?;
        Self::parse(&value).map_err(serde::de::Error::custom)
    }
}

impl LocalId {
    /// Mint a new placeholder id.
    #[must_use]
    pub fn generate() -> Self {
        Self(format!("{LOCAL_ID_PREFIX}{}", Uuid::now_v7()))
    }

    /// Parse an id string already known to carry the `local_` prefix.
    pub fn parse(value: &str) -> Result<Self> {
        if is_local_id(value) {
            Ok(Self(value.to_string()))
        } else {
            Err(Error::InvalidInput(format!("not a local id: {value}")))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for LocalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Check whether an id string is a client-minted placeholder.
#[must_use]
pub fn is_local_id(value: &str) -> bool {
    value.starts_with(LOCAL_ID_PREFIX)
}

/// Identity of a record: server-assigned once persisted, local placeholder
/// until the create is reconciled. Exactly one holds at any time.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum RecordId {
    Local(LocalId),
    Server(String),
}

impl RecordId {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Server(id) => id,
            Self::Local(id) => id.as_str(),
        }
    }

    pub const fn is_local(&self) -> bool {
        matches!(self, Self::Local(_))
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A record in one of the synced collections.
///
/// Persistence and wire traffic go through [`Record::to_value`] /
/// [`Record::from_stored`] / [`Record::from_remote`] exclusively; the struct
/// itself has no serde shape of its own.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    /// Identity (server-assigned or local placeholder)
    pub id: RecordId,
    /// Resource-specific payload, schema owned by the backend
    pub fields: Map<String, Value>,
}

impl Record {
    /// Build a record from a server document. The id is read from `_id`.
    pub fn from_remote(value: Value) -> Result<Self> {
        let Value::Object(mut fields) = value else {
            return Err(Error::InvalidInput(
                "server record must be a JSON object".to_string(),
            ));
        };

        let id = match fields.remove(SERVER_ID_FIELD) {
            Some(Value::String(id)) if !id.trim().is_empty() => id,
            _ => {
                return Err(Error::InvalidInput(
                    "server record is missing a string _id".to_string(),
                ))
            }
        };

        Ok(Self {
            id: RecordId::Server(id),
            fields,
        })
    }

    /// Build an optimistic record for an offline create. The placeholder id
    /// is mirrored into the payload under `localId`, the key the backend is
    /// expected to use for create de-duplication.
    #[must_use]
    pub fn local(local_id: LocalId, mut fields: Map<String, Value>) -> Self {
        fields.insert(
            LOCAL_ID_FIELD.to_string(),
            Value::String(local_id.as_str().to_string()),
        );
        Self {
            id: RecordId::Local(local_id),
            fields,
        }
    }

    /// Serialize for storage or display, with the id re-attached under `_id`.
    #[must_use]
    pub fn to_value(&self) -> Value {
        let mut fields = self.fields.clone();
        fields.insert(
            SERVER_ID_FIELD.to_string(),
            Value::String(self.id.as_str().to_string()),
        );
        Value::Object(fields)
    }

    /// Rebuild a record from its stored form.
    pub fn from_stored(value: Value) -> Result<Self> {
        let Value::Object(mut fields) = value else {
            return Err(Error::InvalidInput(
                "stored record must be a JSON object".to_string(),
            ));
        };

        let id = match fields.remove(SERVER_ID_FIELD) {
            Some(Value::String(id)) if is_local_id(&id) => RecordId::Local(LocalId(id)),
            Some(Value::String(id)) if !id.trim().is_empty() => RecordId::Server(id),
            _ => {
                return Err(Error::InvalidInput(
                    "stored record is missing a string _id".to_string(),
                ))
            }
        };

        Ok(Self { id, fields })
    }

    /// Merge a partial payload over this record's fields (optimistic update).
    pub fn apply(&mut self, payload: &Map<String, Value>) {
        for (key, value) in payload {
            self.fields.insert(key.clone(), value.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn fields(value: Value) -> Map<String, Value> {
        value.as_object().unwrap().clone()
    }

    #[test]
    fn local_ids_are_unique_and_prefixed() {
        let a = LocalId::generate();
        let b = LocalId::generate();
        assert_ne!(a, b);
        assert!(is_local_id(a.as_str()));
    }

    #[test]
    fn local_id_parse_rejects_server_ids() {
        assert!(LocalId::parse("c1").is_err());
        assert!(LocalId::parse("local_0192").is_ok());
    }

    #[test]
    fn from_remote_extracts_server_id() {
        let record = Record::from_remote(json!({"_id": "c1", "name": "Ada"})).unwrap();
        assert_eq!(record.id, RecordId::Server("c1".to_string()));
        assert_eq!(record.fields["name"], json!("Ada"));
    }

    #[test]
    fn from_remote_rejects_missing_id() {
        assert!(Record::from_remote(json!({"name": "Ada"})).is_err());
        assert!(Record::from_remote(json!("not an object")).is_err());
    }

    #[test]
    fn local_record_mirrors_placeholder_into_fields() {
        let local_id = LocalId::generate();
        let record = Record::local(local_id.clone(), fields(json!({"name": "Ada"})));
        assert!(record.id.is_local());
        assert_eq!(
            record.fields[LOCAL_ID_FIELD],
            json!(local_id.as_str().to_string())
        );
    }

    #[test]
    fn stored_round_trip_preserves_identity() {
        let remote = Record::from_remote(json!({"_id": "c1", "name": "Ada"})).unwrap();
        let restored = Record::from_stored(remote.to_value()).unwrap();
        assert_eq!(restored, remote);

        let local = Record::local(LocalId::generate(), fields(json!({"name": "Grace"})));
        let restored = Record::from_stored(local.to_value()).unwrap();
        assert_eq!(restored, local);
        assert!(restored.id.is_local());
    }

    #[test]
    fn apply_overwrites_and_adds_fields() {
        let mut record = Record::from_remote(json!({"_id": "t1", "status": "open"})).unwrap();
        record.apply(&fields(json!({"status": "completed", "note": "hemmed"})));
        assert_eq!(record.fields["status"], json!("completed"));
        assert_eq!(record.fields["note"], json!("hemmed"));
    }
}
