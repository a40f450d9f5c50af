//! Graph Nodes
//!
//! This module defines the realized, per-instance vertices of the graph.
//!
//! A node holds its cached value and dirty flag, the argument nodes it reads
//! from, weak back-references to the nodes that read from it, and the
//! observers to signal when it changes.
//!
//! # Ownership
//!
//! Node tables own their nodes. Argument edges are strong (`Arc`), dependant
//! edges and observers are weak, so the two edge directions never form a
//! reference cycle.
//!
//! # States
//!
//! ```text
//! Uninitialized --compute/set--> Clean --upstream change--> Dirty
//!                                  ^                          |
//!                                  +-------recompute----------+
//! ```

use std::any::type_name;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use smallvec::SmallVec;
use tracing::trace;

use crate::blueprint::{BlueprintKind, RawBlueprint};
use crate::error::{DeclarationError, Result, TangleError};
use crate::graph::value::{downcast_value, value_type_name, values_equal, AnyValue, ValueRef};
use crate::reactive::{Observer, ObserverSet};

/// Unique identifier for a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(u64);

impl NodeId {
    /// Generate a new unique node ID.
    pub fn new() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    /// Get the raw ID value.
    pub fn raw(&self) -> u64 {
        self.0
    }
}

impl Default for NodeId {
    fn default() -> Self {
        Self::new()
    }
}

/// The kind of node in the graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    /// Set from outside. No arguments.
    Source,

    /// Computed from argument nodes by the blueprint's function.
    Function,
}

impl NodeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            NodeKind::Source => "source",
            NodeKind::Function => "function",
        }
    }
}

/// Observable lifecycle state of a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeState {
    /// Never computed or set.
    Uninitialized,

    /// The cached value is current.
    Clean,

    /// An upstream source changed; the cached value is stale.
    Dirty,
}

impl NodeState {
    pub fn as_str(&self) -> &'static str {
        match self {
            NodeState::Uninitialized => "uninitialized",
            NodeState::Clean => "clean",
            NodeState::Dirty => "dirty",
        }
    }
}

struct Slot {
    value: Option<ValueRef>,
    dirty: bool,
}

/// Shared handle to a node.
pub type NodeRef = Arc<Node>;

/// A realized vertex of the dataflow graph.
pub struct Node {
    id: NodeId,
    kind: NodeKind,
    blueprint: RawBlueprint,

    /// Argument nodes, in blueprint argument order. Fixed at construction.
    args: SmallVec<[NodeRef; 4]>,

    slot: Mutex<Slot>,

    /// Nodes that read this node. Weak to avoid cycles with `args`.
    dependants: Mutex<Vec<Weak<Node>>>,

    observers: ObserverSet,
}

impl Node {
    /// Create a node for `blueprint` over already-built argument nodes.
    ///
    /// Does not wire dependant edges; the builder does that once the node
    /// is registered in its table.
    pub(crate) fn new(blueprint: RawBlueprint, args: SmallVec<[NodeRef; 4]>) -> NodeRef {
        let kind = if blueprint.is_source() {
            NodeKind::Source
        } else {
            NodeKind::Function
        };
        Arc::new(Self {
            id: NodeId::new(),
            kind,
            blueprint,
            args,
            slot: Mutex::new(Slot {
                value: None,
                dirty: true,
            }),
            dependants: Mutex::new(Vec::new()),
            observers: ObserverSet::new(),
        })
    }

    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn kind(&self) -> NodeKind {
        self.kind
    }

    pub fn is_source(&self) -> bool {
        self.kind == NodeKind::Source
    }

    /// The blueprint this node was realized from.
    pub fn blueprint(&self) -> &RawBlueprint {
        &self.blueprint
    }

    /// Display name, e.g. `Foo.foo_value`.
    pub fn name(&self) -> String {
        self.blueprint.display_name()
    }

    pub fn args(&self) -> &[NodeRef] {
        &self.args
    }

    pub fn is_dirty(&self) -> bool {
        self.slot.lock().dirty
    }

    pub fn state(&self) -> NodeState {
        let slot = self.slot.lock();
        match (slot.dirty, slot.value.is_some()) {
            (false, _) => NodeState::Clean,
            (true, true) => NodeState::Dirty,
            (true, false) => NodeState::Uninitialized,
        }
    }

    /// Read the cached value. Fails while the node is dirty.
    pub fn value(&self) -> Result<ValueRef> {
        let slot = self.slot.lock();
        match (&slot.value, slot.dirty) {
            (Some(value), false) => Ok(Arc::clone(value)),
            _ => Err(TangleError::StaleRead { node: self.name() }),
        }
    }

    /// Read the cached value as `T`.
    pub fn get<T: AnyValue + Clone>(&self) -> Result<T> {
        let value = self.value()?;
        downcast_value::<T>(&value)
            .cloned()
            .ok_or_else(|| TangleError::TypeMismatch {
                node: self.name(),
                expected: type_name::<T>(),
                found: value_type_name(&value),
            })
    }

    /// Debug rendering of the cached value, stale or not.
    pub fn debug_value(&self) -> Option<String> {
        self.slot.lock().value.as_ref().map(|v| format!("{v:?}"))
    }

    /// Mark the node dirty. Returns whether it was clean before.
    pub(crate) fn mark_dirty(&self) -> bool {
        let mut slot = self.slot.lock();
        let was_clean = !slot.dirty;
        slot.dirty = true;
        was_clean
    }

    /// Store a new source value.
    ///
    /// Returns `false` without touching anything if `value` equals the
    /// current value.
    pub(crate) fn store(&self, value: ValueRef) -> Result<bool> {
        if !self.is_source() {
            return Err(DeclarationError::NotASource { node: self.name() }.into());
        }
        let mut slot = self.slot.lock();
        if let Some(current) = &slot.value {
            if values_equal(current, &value) {
                return Ok(false);
            }
        }
        slot.value = Some(value);
        slot.dirty = false;
        Ok(true)
    }

    /// Recompute from the argument values if dirty.
    ///
    /// Arguments must already be clean. On failure the node stays dirty.
    pub(crate) fn calculate(&self) -> Result<()> {
        let BlueprintKind::Function(fun) = self.blueprint.kind() else {
            return Ok(());
        };
        if !self.is_dirty() {
            return Ok(());
        }

        let values = self
            .args
            .iter()
            .map(|arg| arg.value())
            .collect::<Result<SmallVec<[ValueRef; 4]>>>()?;

        let value = fun(values.as_slice()).map_err(|source| TangleError::Calculation {
            node: self.name(),
            source,
        })?;
        trace!(node = %self.name(), "calculated");

        let mut slot = self.slot.lock();
        slot.value = Some(value);
        slot.dirty = false;
        Ok(())
    }

    /// Register `dependant` as a reader of this node.
    pub(crate) fn add_dependant(&self, dependant: &NodeRef) {
        let mut dependants = self.dependants.lock();
        dependants.retain(|weak| weak.strong_count() > 0);
        if !dependants.iter().any(|weak| weak.as_ptr() == Arc::as_ptr(dependant)) {
            dependants.push(Arc::downgrade(dependant));
        }
    }

    /// Live dependant nodes.
    pub fn dependants(&self) -> Vec<NodeRef> {
        self.dependants.lock().iter().filter_map(Weak::upgrade).collect()
    }

    pub fn dependant_count(&self) -> usize {
        self.dependants
            .lock()
            .iter()
            .filter(|weak| weak.strong_count() > 0)
            .count()
    }

    pub fn observers(&self) -> &ObserverSet {
        &self.observers
    }

    /// Register an observer, held weakly. Dropping the last strong
    /// reference to it unsubscribes it.
    pub fn subscribe<O: Observer + 'static>(&self, observer: &Arc<O>) {
        self.observers.insert(observer);
    }
}

impl fmt::Debug for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Node")
            .field("id", &self.id)
            .field("name", &self.name())
            .field("kind", &self.kind)
            .field("state", &self.state())
            .field("arg_count", &self.args.len())
            .field("dependant_count", &self.dependant_count())
            .finish()
    }
}

impl Drop for Node {
    /// Release argument chains with a work list instead of nested drops.
    fn drop(&mut self) {
        let mut pending: Vec<NodeRef> = self.args.drain(..).collect();
        while let Some(node) = pending.pop() {
            if let Some(mut last) = Arc::into_inner(node) {
                pending.extend(last.args.drain(..));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blueprint::Blueprint;
    use crate::graph::value::value_ref;

    fn source() -> NodeRef {
        Node::new(Blueprint::<f64>::source().into_raw(), SmallVec::new())
    }

    #[test]
    fn node_ids_are_unique() {
        let id1 = NodeId::new();
        let id2 = NodeId::new();
        assert_ne!(id1, id2);
    }

    #[test]
    fn source_node_starts_uninitialized() {
        let node = source();
        assert_eq!(node.kind(), NodeKind::Source);
        assert_eq!(node.state(), NodeState::Uninitialized);
        assert!(matches!(node.value(), Err(TangleError::StaleRead { .. })));
    }

    #[test]
    fn store_short_circuits_on_equal_value() {
        let node = source();
        assert!(node.store(value_ref(1.0_f64)).unwrap());
        assert_eq!(node.state(), NodeState::Clean);
        assert!(!node.store(value_ref(1.0_f64)).unwrap());
        assert!(node.store(value_ref(2.0_f64)).unwrap());
        assert_eq!(node.get::<f64>().unwrap(), 2.0);
    }

    #[test]
    fn function_node_calculates_from_arguments() {
        let a = Blueprint::<f64>::source();
        let doubled = Blueprint::map(&a, |a: &f64| a * 2.0);
        let arg = Node::new(a.into_raw(), SmallVec::new());
        let node = Node::new(doubled.into_raw(), smallvec::smallvec![Arc::clone(&arg)]);

        assert_eq!(node.kind(), NodeKind::Function);
        assert!(node.is_dirty());

        arg.store(value_ref(21.0_f64)).unwrap();
        node.calculate().unwrap();
        assert_eq!(node.get::<f64>().unwrap(), 42.0);

        // dirty with a stale value retained
        assert!(node.mark_dirty());
        assert_eq!(node.state(), NodeState::Dirty);
        assert_eq!(node.debug_value().as_deref(), Some("42.0"));
    }

    #[test]
    fn failed_calculation_leaves_node_dirty() {
        let a = Blueprint::<f64>::source();
        let inverse = Blueprint::try_map(&a, |a: &f64| {
            if *a == 0.0 {
                Err("division by zero")
            } else {
                Ok(1.0 / a)
            }
        });
        let arg = Node::new(a.into_raw(), SmallVec::new());
        let node = Node::new(inverse.into_raw(), smallvec::smallvec![Arc::clone(&arg)]);

        arg.store(value_ref(0.0_f64)).unwrap();
        assert!(matches!(node.calculate(), Err(TangleError::Calculation { .. })));
        assert!(node.is_dirty());
    }

    #[test]
    fn typed_read_reports_mismatch() {
        let node = source();
        node.store(value_ref(1.0_f64)).unwrap();
        assert!(matches!(node.get::<i32>(), Err(TangleError::TypeMismatch { expected: "i32", .. })));
    }

    #[test]
    fn store_on_function_node_is_rejected() {
        let a = Blueprint::<f64>::source();
        let node = Node::new(Blueprint::map(&a, |a: &f64| *a).into_raw(), smallvec::smallvec![source()]);
        assert!(matches!(
            node.store(value_ref(1.0_f64)),
            Err(TangleError::Declaration(DeclarationError::NotASource { .. }))
        ));
    }

    #[test]
    fn dropping_a_deep_chain_does_not_recurse() {
        let a = Blueprint::<u64>::source();
        let step = Blueprint::map(&a, |a: &u64| a + 1);
        let mut tip = Node::new(a.into_raw(), SmallVec::new());
        for _ in 0..200_000 {
            tip = Node::new(step.raw().clone(), smallvec::smallvec![tip]);
        }
        let weak = Arc::downgrade(&tip.args()[0]);

        // a small stack would overflow on a recursive drop
        std::thread::Builder::new()
            .stack_size(256 * 1024)
            .spawn(move || drop(tip))
            .unwrap()
            .join()
            .unwrap();
        assert!(weak.upgrade().is_none());
    }

    #[test]
    fn dependants_are_weak() {
        let parent = source();
        let a = Blueprint::<f64>::source();
        let child = Node::new(Blueprint::map(&a, |a: &f64| *a).into_raw(), smallvec::smallvec![Arc::clone(&parent)]);
        parent.add_dependant(&child);
        parent.add_dependant(&child);
        assert_eq!(parent.dependant_count(), 1);

        drop(child);
        assert_eq!(parent.dependant_count(), 0);
        assert!(parent.dependants().is_empty());
    }
}
