//! Error types for the tangle engine.
//!
//! Every fallible operation surfaces its error to the immediate caller. The
//! engine never retries internally; a failed evaluate leaves the failing node
//! dirty, so calling evaluate again is the retry.

use thiserror::Error;

/// Error raised by a user compute function.
pub type ComputeError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Convenience alias used throughout the crate.
pub type Result<T, E = TangleError> = std::result::Result<T, E>;

/// All errors the engine can report.
#[derive(Debug, Error)]
pub enum TangleError {
    /// No link resolver is registered between the two classes.
    #[error("no tangled link between {from} and {to}")]
    Mapping { from: String, to: String },

    /// A link resolver was handed a host of the wrong concrete type, or
    /// returned an instance of the wrong class.
    #[error("link {link} expected {expected}")]
    LinkHost { link: String, expected: String },

    /// A node was read while dirty.
    #[error("{node} is dirty and cannot be read")]
    StaleRead { node: String },

    /// A compute function failed.
    #[error("error evaluating node {node}")]
    Calculation {
        node: String,
        #[source]
        source: ComputeError,
    },

    /// A typed read or write saw a value of another type.
    #[error("{node} holds {found}, expected {expected}")]
    TypeMismatch {
        node: String,
        expected: &'static str,
        found: &'static str,
    },

    /// The declaration layer produced inconsistent blueprints.
    #[error(transparent)]
    Declaration(#[from] DeclarationError),

    /// A single build pass tried to materialize too many nodes.
    #[error("build pass exceeded the limit of {limit} nodes")]
    BuildLimit { limit: usize },
}

/// Errors caused by inconsistent declarations. These indicate a bug in the
/// code that declares blueprints, not a runtime condition.
#[derive(Debug, Error)]
pub enum DeclarationError {
    #[error("blueprint is already declared as {owner}.{name}")]
    AlreadyDeclared { owner: String, name: String },

    #[error("{class} already declares a blueprint named {name}")]
    DuplicateName { class: String, name: String },

    #[error("name {name} is bound to another {existing} blueprint, cannot realize a {requested} blueprint under it")]
    NameCollision {
        name: String,
        existing: &'static str,
        requested: &'static str,
    },

    #[error("{class} has no blueprint named {name}")]
    UnknownBlueprint { class: String, name: String },

    #[error("{node} is not a source node")]
    NotASource { node: String },
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn mapping_error_names_both_classes() {
        let err = TangleError::Mapping {
            from: "Bar".into(),
            to: "Foo".into(),
        };
        assert_eq!(err.to_string(), "no tangled link between Bar and Foo");
    }

    #[test]
    fn calculation_error_keeps_source() {
        let err = TangleError::Calculation {
            node: "Foo.ratio".into(),
            source: "division by zero".into(),
        };
        assert_eq!(err.to_string(), "error evaluating node Foo.ratio");
        assert_eq!(err.source().map(|s| s.to_string()).as_deref(), Some("division by zero"));
    }

    #[test]
    fn declaration_errors_convert() {
        let err: TangleError = DeclarationError::NotASource {
            node: "Foo.total".into(),
        }
        .into();
        assert!(matches!(err, TangleError::Declaration(_)));
        assert_eq!(err.to_string(), "Foo.total is not a source node");
    }
}
