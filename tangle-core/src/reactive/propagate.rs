//! Change propagation.
//!
//! When a source takes a new value, every node reachable along dependant
//! edges is marked dirty, then every observer registered on the source or on
//! one of those nodes is signalled exactly once. Marking finishes before the
//! first observer runs, so a woken observer never sees a half-propagated
//! graph.

use std::collections::HashSet;
use std::sync::Arc;

use tracing::{debug, trace};

use super::observer::{observer_key, Observer};
use crate::graph::NodeRef;

/// What a propagation touched.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Propagation {
    /// Dependant nodes reached (the origin is not counted).
    pub dirtied: usize,

    /// Distinct observers signalled.
    pub signalled: usize,
}

/// Propagate a change of `origin` to its dependants and observers.
pub(crate) fn notify_update(origin: &NodeRef) -> Propagation {
    let mut visited = HashSet::from([origin.id()]);
    let mut stack = vec![Arc::clone(origin)];
    let mut seen_observers = HashSet::new();
    let mut observers: Vec<Arc<dyn Observer>> = Vec::new();
    let mut dirtied = 0;

    while let Some(node) = stack.pop() {
        for observer in node.observers().live() {
            if seen_observers.insert(observer_key(&observer)) {
                observers.push(observer);
            }
        }
        for dependant in node.dependants() {
            if visited.insert(dependant.id()) {
                dependant.mark_dirty();
                trace!(node = %dependant.name(), "marked dirty");
                dirtied += 1;
                stack.push(dependant);
            }
        }
    }

    debug!(
        origin = %origin.name(),
        dirtied,
        observers = observers.len(),
        "propagated change"
    );

    for observer in &observers {
        observer.notify();
    }

    Propagation {
        dirtied,
        signalled: observers.len(),
    }
}
