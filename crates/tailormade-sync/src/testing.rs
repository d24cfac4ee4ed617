//! In-memory collection API double shared by reconciler and engine tests.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde_json::{Map, Value};

use crate::api::CollectionApi;
use crate::error::{Error, Result};
use crate::models::{Record, ResourceKind};

#[derive(Default)]
pub struct FakeState {
    collections: HashMap<ResourceKind, Vec<Value>>,
    next_id: u64,
    /// When set, every list call fails with this status.
    pub fail_lists_with: Option<u16>,
    /// Creates whose payload `name` is in this set are rejected.
    pub reject_create_names: HashSet<String>,
    /// Every call is rejected as unauthorized.
    pub unauthorized: bool,
    /// Request log, e.g. `"PATCH tickets/t1"`.
    pub calls: Vec<String>,
}

/// Scriptable stand-in for the backend collection API.
#[derive(Clone, Default)]
pub struct FakeApi {
    state: Arc<Mutex<FakeState>>,
    /// Per-call latency, lets tests hold a sync pass in flight.
    latency: Option<Duration>,
}

impl FakeApi {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_latency(latency: Duration) -> Self {
        Self {
            state: Arc::default(),
            latency: Some(latency),
        }
    }

    pub fn state(&self) -> std::sync::MutexGuard<'_, FakeState> {
        self.state.lock().unwrap()
    }

    /// Seed a server-side record and return its assigned id.
    pub fn seed(&self, kind: ResourceKind, mut fields: Map<String, Value>) -> String {
        let mut state = self.state();
        let id = next_server_id(&mut state, kind);
        fields.insert("_id".to_string(), Value::String(id.clone()));
        state.collections.entry(kind).or_default().push(Value::Object(fields));
        id
    }

    pub fn server_records(&self, kind: ResourceKind) -> Vec<Value> {
        self.state()
            .collections
            .get(&kind)
            .cloned()
            .unwrap_or_default()
    }

    async fn pause(&self) {
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
    }

    fn check_auth(state: &FakeState) -> Result<()> {
        if state.unauthorized {
            return Err(Error::Auth("Invalid token".to_string()));
        }
        Ok(())
    }
}

fn next_server_id(state: &mut FakeState, kind: ResourceKind) -> String {
    state.next_id += 1;
    let prefix = match kind {
        ResourceKind::Client => "c",
        ResourceKind::Ticket => "t",
        ResourceKind::Template => "m",
    };
    format!("{prefix}{}", state.next_id)
}

impl CollectionApi for FakeApi {
    async fn list(&self, kind: ResourceKind) -> Result<Vec<Record>> {
        self.pause().await;
        let mut state = self.state();
        state.calls.push(format!("GET {}", kind.collection_path()));
        Self::check_auth(&state)?;
        if let Some(status) = state.fail_lists_with {
            return Err(Error::Http {
                status,
                message: "list unavailable".to_string(),
            });
        }
        state
            .collections
            .get(&kind)
            .cloned()
            .unwrap_or_default()
            .into_iter()
            .map(Record::from_remote)
            .collect()
    }

    async fn create(&self, kind: ResourceKind, payload: &Map<String, Value>) -> Result<Record> {
        self.pause().await;
        let mut state = self.state();
        state.calls.push(format!("POST {}", kind.collection_path()));
        Self::check_auth(&state)?;

        if let Some(Value::String(name)) = payload.get("name") {
            if state.reject_create_names.contains(name) {
                return Err(Error::Rejected {
                    status: 400,
                    message: format!("create rejected: {name}"),
                });
            }
        }

        let id = next_server_id(&mut state, kind);
        let mut fields = payload.clone();
        fields.insert("_id".to_string(), Value::String(id));
        state
            .collections
            .entry(kind)
            .or_default()
            .push(Value::Object(fields.clone()));
        Record::from_remote(Value::Object(fields))
    }

    async fn update(
        &self,
        kind: ResourceKind,
        id: &str,
        payload: &Map<String, Value>,
    ) -> Result<Record> {
        self.pause().await;
        let mut state = self.state();
        state
            .calls
            .push(format!("PATCH {}/{id}", kind.collection_path()));
        Self::check_auth(&state)?;

        let documents = state.collections.entry(kind).or_default();
        let Some(document) = documents
            .iter_mut()
            .find(|document| document.get("_id").and_then(Value::as_str) == Some(id))
        else {
            return Err(Error::Rejected {
                status: 404,
                message: format!("{kind} not found: {id}"),
            });
        };

        if let Value::Object(fields) = document {
            for (key, value) in payload {
                fields.insert(key.clone(), value.clone());
            }
        }
        Record::from_remote(document.clone())
    }

    async fn delete(&self, kind: ResourceKind, id: &str) -> Result<()> {
        self.pause().await;
        let mut state = self.state();
        state
            .calls
            .push(format!("DELETE {}/{id}", kind.collection_path()));
        Self::check_auth(&state)?;

        let documents = state.collections.entry(kind).or_default();
        let before = documents.len();
        documents.retain(|document| document.get("_id").and_then(Value::as_str) != Some(id));
        if documents.len() == before {
            return Err(Error::Rejected {
                status: 404,
                message: format!("{kind} not found: {id}"),
            });
        }
        Ok(())
    }
}
