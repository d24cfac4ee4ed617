//! Pending mutation log entries
//!
//! Every write performed while offline is recorded as one of these variants
//! in a single ordered log, replayed oldest-first on the next sync pass. The
//! log is global across resource kinds so a dependent operation (an update or
//! delete of a record created offline) always replays after its create.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::{LocalId, ResourceKind};

/// A not-yet-synced mutation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum PendingOp {
    Create {
        resource: ResourceKind,
        local_id: LocalId,
        payload: Map<String, Value>,
        /// Unix millis when the mutation was queued
        queued_at: i64,
    },
    Update {
        resource: ResourceKind,
        /// Server id, or the local placeholder of a not-yet-synced create
        id: String,
        payload: Map<String, Value>,
        queued_at: i64,
    },
    Delete {
        resource: ResourceKind,
        id: String,
        queued_at: i64,
    },
}

impl PendingOp {
    pub const fn resource(&self) -> ResourceKind {
        match self {
            Self::Create { resource, .. }
            | Self::Update { resource, .. }
            | Self::Delete { resource, .. } => *resource,
        }
    }

    pub const fn queued_at(&self) -> i64 {
        match self {
            Self::Create { queued_at, .. }
            | Self::Update { queued_at, .. }
            | Self::Delete { queued_at, .. } => *queued_at,
        }
    }

    /// Short operation name for logging.
    pub const fn kind_str(&self) -> &'static str {
        match self {
            Self::Create { .. } => "create",
            Self::Update { .. } => "update",
            Self::Delete { .. } => "delete",
        }
    }
}
