//! Reactive Runtime
//!
//! The runtime is the entry point that ties the pieces together: it owns the
//! link registry and configuration, builds nodes on demand, evaluates them,
//! and propagates source changes to dependants and observers.
//!
//! # How It Works
//!
//! 1. `value_of(host, blueprint)` builds the node (and any missing argument
//!    nodes) on first access, recomputes whatever is dirty beneath it, then
//!    reads the value.
//!
//! 2. `set_value(host, source, value)` stores the value and, unless it equals
//!    the current one:
//!    a. marks every node downstream dirty
//!    b. signals each observer registered along the way once
//!
//!    Nothing is recomputed until the next read.
//!
//! # Thread Safety
//!
//! Every operation that touches the graph runs under one reentrant lock, so
//! mutations are serialized and an observer may read values from inside its
//! callback on the same thread. Observers that hand off to other threads
//! (see [`Event`](super::Event) and [`Watcher`](super::Watcher)) read after
//! the triggering call has returned.

use std::sync::Arc;

use parking_lot::ReentrantMutex;
use tracing::debug;

use super::observer::Observer;
use super::propagate::{notify_update, Propagation};
use crate::blueprint::{Blueprint, Class, RawBlueprint};
use crate::config::RuntimeConfig;
use crate::error::Result;
use crate::graph::value::{value_ref, AnyValue, ValueRef};
use crate::graph::{evaluate, Builder, Mapper, NodeRef, Tangled};
use crate::snapshot::GraphSnapshot;

/// The engine façade.
#[derive(Debug, Default)]
pub struct Runtime {
    mapper: Mapper,
    config: RuntimeConfig,
    graph_lock: ReentrantMutex<()>,
}

impl Runtime {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: RuntimeConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    pub fn mapper(&self) -> &Mapper {
        &self.mapper
    }

    /// Register how instances of `owner` find their linked `target`
    /// instance. See [`Mapper::register_link`].
    pub fn register_link<U, T, F>(&self, owner: &Class, target: &Class, resolve: F) -> bool
    where
        U: Tangled,
        T: Tangled,
        F: Fn(&U) -> Arc<T> + Send + Sync + 'static,
    {
        self.mapper.register_link(owner, target, resolve)
    }

    /// Return the node for `blueprint` on `host`, building it and any
    /// missing argument nodes on first access.
    pub fn get_or_build_node<B>(&self, host: &dyn Tangled, blueprint: &B) -> Result<NodeRef>
    where
        B: AsRef<RawBlueprint> + ?Sized,
    {
        let _guard = self.graph_lock.lock();
        Builder::new(&self.mapper, &self.config).build(host, blueprint.as_ref())
    }

    /// Recompute the dirty part of `node`'s argument subgraph. Returns how
    /// many nodes were recomputed.
    pub fn evaluate(&self, node: &NodeRef) -> Result<usize> {
        let _guard = self.graph_lock.lock();
        evaluate(node)
    }

    /// Read a node's current value. Fails if the node is dirty.
    pub fn read_value(&self, node: &NodeRef) -> Result<ValueRef> {
        node.value()
    }

    /// Build, evaluate and read in one step.
    pub fn value_of<T: AnyValue + Clone>(&self, host: &dyn Tangled, blueprint: &Blueprint<T>) -> Result<T> {
        let _guard = self.graph_lock.lock();
        let node = self.get_or_build_node(host, blueprint)?;
        evaluate(&node)?;
        node.get::<T>()
    }

    /// Erased form of [`value_of`](Self::value_of).
    pub fn raw_value_of(&self, host: &dyn Tangled, blueprint: &RawBlueprint) -> Result<ValueRef> {
        let _guard = self.graph_lock.lock();
        let node = self.get_or_build_node(host, blueprint)?;
        evaluate(&node)?;
        node.value()
    }

    /// Set a source blueprint's value on `host`.
    ///
    /// Returns `false` and does nothing if the value equals the current one.
    pub fn set_value<T: AnyValue>(&self, host: &dyn Tangled, blueprint: &Blueprint<T>, value: T) -> Result<bool> {
        let _guard = self.graph_lock.lock();
        let node = self.get_or_build_node(host, blueprint)?;
        self.set_node_value(&node, value_ref(value))
    }

    /// Set a source node's value and propagate the change.
    pub fn set_node_value(&self, node: &NodeRef, value: ValueRef) -> Result<bool> {
        let _guard = self.graph_lock.lock();
        if !node.store(value)? {
            debug!(node = %node.name(), "value unchanged");
            return Ok(false);
        }
        let Propagation { dirtied, signalled } = notify_update(node);
        debug!(node = %node.name(), dirtied, signalled, "source updated");
        Ok(true)
    }

    /// Register `observer` on `node`. The node holds it weakly; dropping the
    /// last strong reference unsubscribes it.
    pub fn subscribe<O: Observer + 'static>(&self, node: &NodeRef, observer: &Arc<O>) {
        node.subscribe(observer);
    }

    /// Read a blueprint declared on `host`'s class (or an ancestor) by name.
    pub fn value_by_name(&self, host: &dyn Tangled, name: &str) -> Result<ValueRef> {
        let blueprint = host.class().require(name)?;
        self.raw_value_of(host, &blueprint)
    }

    /// Set a source declared on `host`'s class (or an ancestor) by name.
    pub fn set_by_name<T: AnyValue>(&self, host: &dyn Tangled, name: &str, value: T) -> Result<bool> {
        let blueprint = host.class().require(name)?;
        let node = self.get_or_build_node(host, &blueprint)?;
        self.set_node_value(&node, value_ref(value))
    }

    /// Subscribe to a named blueprint on `host`. Returns the node subscribed
    /// to.
    pub fn subscribe_by_name<O: Observer + 'static>(
        &self,
        host: &dyn Tangled,
        name: &str,
        observer: &Arc<O>,
    ) -> Result<NodeRef> {
        let blueprint = host.class().require(name)?;
        let node = self.get_or_build_node(host, &blueprint)?;
        node.subscribe(observer);
        Ok(node)
    }

    /// Diagnostic view of the nodes realized on `host`.
    pub fn snapshot(&self, host: &dyn Tangled) -> GraphSnapshot {
        let _guard = self.graph_lock.lock();
        GraphSnapshot::capture(host.nodes())
    }
}
