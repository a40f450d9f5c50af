//! Graph Builder
//!
//! Materializes the node for a blueprint on a host instance, creating any
//! missing argument nodes along the way.
//!
//! # Algorithm
//!
//! The build is an iterative depth-first walk over the blueprint DAG using an
//! explicit frame stack rather than recursion:
//!
//! 1. `Enter(host, blueprint)`: if the blueprint belongs to a class the host
//!    is not an instance of, switch host through the mapper. If the host's
//!    table already has the node, emit it and stop. Otherwise schedule
//!    `Exit` and then `Enter` for each argument.
//! 2. `Exit(host, blueprint)`: the argument nodes are now the top entries of
//!    the result stack. Pop them, create the node, insert it into the host's
//!    table and wire it as a dependant of its arguments.
//!
//! A blueprint reached twice through a diamond is only built once: its second
//! `Enter` happens after its first `Exit`, and finds it in the table.

use std::sync::Arc;

use smallvec::SmallVec;
use tracing::debug;

use super::mapper::Mapper;
use super::node::{Node, NodeRef};
use super::table::{NodeTable, Tangled};
use crate::blueprint::RawBlueprint;
use crate::config::RuntimeConfig;
use crate::error::{DeclarationError, Result, TangleError};

/// The instance a frame builds on.
#[derive(Clone)]
enum Host<'a> {
    /// The instance the build was started on.
    Root(&'a dyn Tangled),

    /// An instance reached through a link.
    Linked(Arc<dyn Tangled>),
}

impl Host<'_> {
    fn get(&self) -> &dyn Tangled {
        match self {
            Host::Root(host) => *host,
            Host::Linked(host) => host.as_ref(),
        }
    }
}

enum Frame<'a> {
    Enter(Host<'a>, RawBlueprint),
    Exit(Host<'a>, RawBlueprint),
}

/// Builds nodes for blueprints, one pass per call.
pub struct Builder<'r> {
    mapper: &'r Mapper,
    max_nodes: Option<usize>,
}

impl<'r> Builder<'r> {
    pub fn new(mapper: &'r Mapper, config: &RuntimeConfig) -> Self {
        Self {
            mapper,
            max_nodes: config.max_build_nodes,
        }
    }

    /// Return the node for `blueprint` on `root`, building it if needed.
    ///
    /// Building is idempotent: a second call returns the same node. On error
    /// the nodes created before the failure stay in their tables; they are
    /// complete and reused by the next build.
    pub fn build(&self, root: &dyn Tangled, blueprint: &RawBlueprint) -> Result<NodeRef> {
        let mut frames = vec![Frame::Enter(Host::Root(root), blueprint.clone())];
        let mut built: Vec<NodeRef> = Vec::new();
        let mut created = 0usize;

        while let Some(frame) = frames.pop() {
            match frame {
                Frame::Enter(host, blueprint) => {
                    let host = self.host_for(host, &blueprint)?;
                    if let Some(node) = lookup(host.get().nodes(), &blueprint)? {
                        built.push(node);
                        continue;
                    }
                    frames.push(Frame::Exit(host.clone(), blueprint.clone()));
                    for arg in blueprint.args().iter().rev() {
                        frames.push(Frame::Enter(host.clone(), arg.clone()));
                    }
                }
                Frame::Exit(host, blueprint) => {
                    if let Some(limit) = self.max_nodes {
                        if created >= limit {
                            return Err(TangleError::BuildLimit { limit });
                        }
                    }

                    let start = built.len() - blueprint.arg_count();
                    let args: SmallVec<[NodeRef; 4]> = built.drain(start..).collect();
                    let node = Node::new(blueprint.clone(), args);

                    let (node, inserted) = host.get().nodes().insert_if_absent(blueprint.key(), node);
                    if inserted {
                        for arg in node.args() {
                            arg.add_dependant(&node);
                        }
                        created += 1;
                    } else if node.blueprint() != &blueprint {
                        return Err(collision(&node, &blueprint));
                    }
                    built.push(node);
                }
            }
        }

        match built.pop() {
            Some(node) => {
                if created > 0 {
                    debug!(node = %node.name(), created, "built graph");
                }
                Ok(node)
            }
            None => unreachable!("a build pass always yields its root node"),
        }
    }

    /// Pick the instance whose table should hold `blueprint`'s node.
    fn host_for<'a>(&self, host: Host<'a>, blueprint: &RawBlueprint) -> Result<Host<'a>> {
        match blueprint.owner() {
            Some(owner) if !host.get().class().is_a(owner.id) => {
                let linked = self.mapper.resolve(host.get(), owner)?;
                Ok(Host::Linked(linked))
            }
            _ => Ok(host),
        }
    }
}

fn lookup(table: &NodeTable, blueprint: &RawBlueprint) -> Result<Option<NodeRef>> {
    match table.get(&blueprint.key()) {
        None => Ok(None),
        Some(node) if node.blueprint() == blueprint => Ok(Some(node)),
        Some(node) => Err(collision(&node, blueprint)),
    }
}

fn collision(existing: &NodeRef, requested: &RawBlueprint) -> TangleError {
    DeclarationError::NameCollision {
        name: requested.key().to_string(),
        existing: existing.blueprint().kind_name(),
        requested: requested.kind_name(),
    }
    .into()
}
