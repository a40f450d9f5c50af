//! Evaluator
//!
//! Brings a node up to date by recomputing the dirty part of its argument
//! subgraph, arguments before the nodes that read them.
//!
//! # Algorithm
//!
//! 1. Walk the argument edges depth-first from the requested node, pruning
//!    at source nodes and clean nodes: a clean node's whole argument subgraph
//!    is clean too, so nothing below it needs a look.
//! 2. Emit each dirty node after its arguments (post-order). Shared nodes
//!    are visited once, so the order is a topological order of the dirty
//!    subgraph.
//! 3. Calculate the nodes in that order. The first failure aborts the pass;
//!    the failing node and everything after it stay dirty.

use std::collections::HashSet;
use std::sync::Arc;

use tracing::{debug, warn};

use super::node::NodeRef;
use crate::error::Result;

/// Update order for the dirty subgraph under `root`, arguments first.
///
/// Sources are never included, even when `root` is one.
pub fn dirty_order(root: &NodeRef) -> Vec<NodeRef> {
    let mut order = Vec::new();
    let mut visited = HashSet::new();
    let mut frames = vec![(Arc::clone(root), false)];

    while let Some((node, expanded)) = frames.pop() {
        if expanded {
            order.push(node);
            continue;
        }
        if node.is_source() || !node.is_dirty() || !visited.insert(node.id()) {
            continue;
        }
        frames.push((Arc::clone(&node), true));
        for arg in node.args().iter().rev() {
            frames.push((Arc::clone(arg), false));
        }
    }

    order
}

/// Recompute every dirty node `root` depends on, then `root` itself.
///
/// Returns how many nodes were recomputed. An unset source in the subgraph
/// makes the first node reading it fail with a stale read naming the source.
pub fn evaluate(root: &NodeRef) -> Result<usize> {
    let order = dirty_order(root);
    if order.is_empty() {
        return Ok(0);
    }

    for (index, node) in order.iter().enumerate() {
        if let Err(err) = node.calculate() {
            warn!(node = %node.name(), error = %err, "evaluation failed");
            debug!(root = %root.name(), completed = index, "evaluation aborted");
            return Err(err);
        }
    }

    debug!(root = %root.name(), recomputed = order.len(), "evaluated");
    Ok(order.len())
}
