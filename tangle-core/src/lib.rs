//! Tangle Core
//!
//! This crate provides a lazy, incrementally-evaluated dataflow graph whose
//! shape is declared once per type and realized per instance. It implements:
//!
//! - Blueprints: type-level descriptions of source and function nodes
//! - Lazy node building, crossing to linked instances of other types
//! - Dirty propagation with on-demand recomputation
//! - Observers signalled when a node's value changes
//!
//! # Architecture
//!
//! The crate is organized into several modules:
//!
//! - `blueprint`: Blueprints, their operator algebra and class descriptors
//! - `graph`: Realized nodes, node tables, the builder, the evaluator and the link mapper
//! - `reactive`: Change propagation, observers and the `Runtime` façade
//! - `snapshot`: Serializable diagnostic views of realized graphs
//!
//! # Example
//!
//! ```rust
//! use tangle_core::{Blueprint, Class, Object, Runtime};
//!
//! let foo = Class::new("Foo");
//! let a = foo.declare("a", Blueprint::<f64>::source()).unwrap();
//! let b = foo.declare("b", Blueprint::<f64>::source()).unwrap();
//! let sum = foo.declare("sum", &a + &b).unwrap();
//!
//! let runtime = Runtime::new();
//! let instance = Object::plain(&foo);
//! runtime.set_value(&instance, &a, 1.0).unwrap();
//! runtime.set_value(&instance, &b, 2.0).unwrap();
//! assert_eq!(runtime.value_of(&instance, &sum).unwrap(), 3.0);
//!
//! // only marks `sum` dirty; it is recomputed on the next read
//! runtime.set_value(&instance, &a, 5.0).unwrap();
//! assert_eq!(runtime.value_of(&instance, &sum).unwrap(), 7.0);
//! ```

pub mod blueprint;
pub mod config;
pub mod error;
pub mod graph;
pub mod reactive;
pub mod snapshot;

pub use blueprint::{Blueprint, Class, ClassId, Compose, NodeKey, RawBlueprint};
pub use config::RuntimeConfig;
pub use error::{ComputeError, DeclarationError, Result, TangleError};
pub use graph::{AnyValue, Node, NodeRef, NodeState, NodeTable, Object, Tangled, ValueRef};
pub use reactive::{Callback, Event, Observer, Runtime, Watcher};
pub use snapshot::GraphSnapshot;
