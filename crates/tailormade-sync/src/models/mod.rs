//! Data model for the sync engine

mod pending;
mod record;
mod resource;

pub use pending::PendingOp;
pub use record::{is_local_id, LocalId, Record, RecordId};
pub use resource::ResourceKind;
