//! Serializable view of an instance's realized graph, for debugging.

use serde::Serialize;

use crate::graph::NodeTable;

/// Every node realized on one instance, in creation order.
#[derive(Debug, Clone, Serialize)]
pub struct GraphSnapshot {
    pub class: String,
    pub nodes: Vec<NodeSnapshot>,
}

#[derive(Debug, Clone, Serialize)]
pub struct NodeSnapshot {
    pub key: String,
    pub name: String,
    pub kind: &'static str,
    pub state: &'static str,
    pub arguments: Vec<String>,
    pub dependants: usize,
    pub observers: usize,
    /// Debug rendering of the cached value, stale or not.
    pub value: Option<String>,
}

impl GraphSnapshot {
    pub fn capture(table: &NodeTable) -> Self {
        let nodes = table
            .entries()
            .into_iter()
            .map(|(key, node)| NodeSnapshot {
                key: key.to_string(),
                name: node.name(),
                kind: node.kind().as_str(),
                state: node.state().as_str(),
                arguments: node.args().iter().map(|arg| arg.name()).collect(),
                dependants: node.dependant_count(),
                observers: node.observers().len(),
                value: node.debug_value(),
            })
            .collect();

        Self {
            class: table.class().name().to_string(),
            nodes,
        }
    }

    pub fn node(&self, name: &str) -> Option<&NodeSnapshot> {
        self.nodes.iter().find(|node| node.name == name)
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}
