//! Dependency Graph
//!
//! This module implements the realized, per-instance side of the engine.
//!
//! # Overview
//!
//! Blueprints describe a DAG per class; the graph layer turns it into nodes
//! owned by host instances:
//!
//! - A [`Node`] holds one blueprint's cached value on one instance
//! - Edges run both ways: strong from a node to its arguments, weak from a
//!   node to its dependants
//! - [`Builder`] creates nodes on first access, crossing to other instances
//!   through the [`Mapper`]
//! - [`evaluate`] recomputes the dirty part of a node's argument subgraph
//!
//! # Design Decisions
//!
//! 1. Nodes live in per-instance [`NodeTable`]s rather than one central
//!    graph, so an instance's nodes go away with the instance.
//!
//! 2. Both the builder and the evaluator walk the graph with explicit
//!    stacks and visit shared nodes once.

mod builder;
mod evaluator;
mod mapper;
mod node;
mod table;
pub mod value;

pub use builder::Builder;
pub use evaluator::{dirty_order, evaluate};
pub use mapper::Mapper;
pub use node::{Node, NodeId, NodeKind, NodeRef, NodeState};
pub use table::{AsAny, NodeTable, Object, Tangled};
pub use value::{AnyValue, ValueRef};
