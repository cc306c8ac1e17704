use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Last heartbeat payload received from one node.
pub type NodeRecord = Map<String, Value>;

/// Point-in-time view of the cluster: node id → last heartbeat.
///
/// Last write wins; nothing is ever evicted.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClusterSnapshot {
    nodes: BTreeMap<String, NodeRecord>,
}

impl ClusterSnapshot {
    /// Heartbeat field carrying the sender-declared node id.
    pub const NODE_FIELD: &'static str = "node";

    pub fn new() -> Self {
        Self::default()
    }

    /// Store `record` under its declared id, or `node{N}` with `N` the current size.
    ///
    /// Returns the id the record was stored under.
    pub fn upsert(&mut self, record: NodeRecord) -> String {
        let id = match record.get(Self::NODE_FIELD) {
            Some(Value::String(s)) => s.clone(),
            Some(Value::Null) | None => format!("node{}", self.nodes.len()),
            Some(other) => other.to_string(),
        };
        self.nodes.insert(id.clone(), record);
        id
    }

    pub fn get(&self, id: &str) -> Option<&NodeRecord> {
        self.nodes.get(id)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.nodes.keys().map(String::as_str)
    }

    pub fn to_value(&self) -> Value {
        Value::Object(
            self.nodes
                .iter()
                .map(|(id, record)| (id.clone(), Value::Object(record.clone())))
                .collect(),
        )
    }
}
