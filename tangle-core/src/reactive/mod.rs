//! Reactive Layer
//!
//! This module turns the graph into a live system: source changes flow to
//! dependants and to external observers, and the [`Runtime`] exposes the
//! whole engine behind a handful of calls.
//!
//! # Concepts
//!
//! ## Propagation
//!
//! Setting a source marks every node downstream of it dirty. Nothing is
//! recomputed at that point; a dirty node is brought up to date the next
//! time it is read.
//!
//! ## Observers
//!
//! An observer is registered on a node and signalled when the node (or
//! anything upstream of it) changes. It receives no value, only the signal;
//! it reads through the runtime if it wants the new value. Observers are
//! held weakly, so dropping one unsubscribes it.
//!
//! Three observers ship with the crate: [`Callback`] runs a closure,
//! [`Event`] wakes blocked threads and [`Watcher`] wakes async tasks.

mod observer;
mod propagate;
mod runtime;
mod waiters;

pub use observer::{Callback, Observer, ObserverSet};
pub use propagate::Propagation;
pub use runtime::Runtime;
pub use waiters::{Event, Watcher};
