//! Host instances and their node tables.

use std::any::Any;
use std::fmt;

use indexmap::IndexMap;
use parking_lot::Mutex;

use super::node::NodeRef;
use crate::blueprint::{Class, NodeKey};

/// Upcast to `Any`, so link resolvers can recover the concrete host type.
pub trait AsAny: Any {
    fn as_any(&self) -> &dyn Any;
}

impl<T: Any> AsAny for T {
    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// A host object that owns realized nodes.
///
/// Implementors only need to hand out their [`NodeTable`]; the table knows
/// the instance's class.
pub trait Tangled: AsAny + Send + Sync {
    fn nodes(&self) -> &NodeTable;

    fn class(&self) -> &Class {
        self.nodes().class()
    }
}

/// Per-instance mapping from node key to realized node.
///
/// Starts empty and fills as blueprints are first accessed. Nodes live as
/// long as the table (or anything still holding them); there is no eviction.
pub struct NodeTable {
    class: Class,
    nodes: Mutex<IndexMap<NodeKey, NodeRef>>,
}

impl NodeTable {
    pub fn new(class: &Class) -> Self {
        Self {
            class: class.clone(),
            nodes: Mutex::new(IndexMap::new()),
        }
    }

    pub fn class(&self) -> &Class {
        &self.class
    }

    pub fn get(&self, key: &NodeKey) -> Option<NodeRef> {
        self.nodes.lock().get(key).cloned()
    }

    /// Look up a node by declared name.
    pub fn get_named(&self, name: &str) -> Option<NodeRef> {
        self.get(&NodeKey::Named(name.into()))
    }

    /// Insert `node` unless the key is taken. Returns the node now stored
    /// under `key` and whether it is the one passed in.
    pub(crate) fn insert_if_absent(&self, key: NodeKey, node: NodeRef) -> (NodeRef, bool) {
        let mut nodes = self.nodes.lock();
        match nodes.get(&key) {
            Some(existing) => (existing.clone(), false),
            None => {
                nodes.insert(key, node.clone());
                (node, true)
            }
        }
    }

    /// Number of nodes realized on this instance.
    pub fn len(&self) -> usize {
        self.nodes.lock().len()
    }

    /// Check if nothing has been built on this instance yet.
    pub fn is_empty(&self) -> bool {
        self.nodes.lock().is_empty()
    }

    /// All nodes with their keys, in creation order.
    pub fn entries(&self) -> Vec<(NodeKey, NodeRef)> {
        self.nodes
            .lock()
            .iter()
            .map(|(key, node)| (key.clone(), node.clone()))
            .collect()
    }

    /// Realized source nodes, in creation order.
    pub fn sources(&self) -> Vec<NodeRef> {
        self.nodes
            .lock()
            .values()
            .filter(|node| node.is_source())
            .cloned()
            .collect()
    }
}

impl fmt::Debug for NodeTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NodeTable")
            .field("class", &self.class.name())
            .field("len", &self.len())
            .finish()
    }
}

/// Ready-made host carrying arbitrary user state.
///
/// The state is what link resolvers usually read, e.g. an `Arc` to the
/// related instance.
pub struct Object<S = ()> {
    nodes: NodeTable,
    state: S,
}

impl<S> Object<S> {
    pub fn new(class: &Class, state: S) -> Self {
        Self {
            nodes: NodeTable::new(class),
            state,
        }
    }

    pub fn state(&self) -> &S {
        &self.state
    }
}

impl Object<()> {
    /// Host without state.
    pub fn plain(class: &Class) -> Self {
        Self::new(class, ())
    }
}

impl<S: Send + Sync + 'static> Tangled for Object<S> {
    fn nodes(&self) -> &NodeTable {
        &self.nodes
    }
}

impl<S> fmt::Debug for Object<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Object").field("nodes", &self.nodes).finish_non_exhaustive()
    }
}
