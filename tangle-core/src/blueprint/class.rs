//! Runtime class descriptors.
//!
//! A [`Class`] plays the role of a host type: blueprints are declared on it,
//! instances point at it through their node table, and links are registered
//! between pairs of classes. Classes may derive from a parent class; an
//! instance of a derived class can use every blueprint declared on its
//! ancestors.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use indexmap::IndexMap;
use parking_lot::RwLock;

use super::{Blueprint, RawBlueprint};
use crate::error::{DeclarationError, Result};

/// Unique identifier for a class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ClassId(u64);

impl ClassId {
    fn next() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    /// Get the raw ID value.
    pub fn raw(&self) -> u64 {
        self.0
    }
}

/// Lightweight reference to a class, stored on declared blueprints.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct OwnerTag {
    pub id: ClassId,
    pub name: Arc<str>,
}

struct ClassInner {
    id: ClassId,
    name: Arc<str>,
    parent: Option<Class>,
    declared: RwLock<IndexMap<Arc<str>, RawBlueprint>>,
}

/// A host type. Cloning is cheap and shares the declaration table.
#[derive(Clone)]
pub struct Class(Arc<ClassInner>);

impl Class {
    /// Create a root class.
    pub fn new(name: impl Into<Arc<str>>) -> Self {
        Self::with_parent(name.into(), None)
    }

    /// Create a class deriving from `parent`.
    pub fn derive(name: impl Into<Arc<str>>, parent: &Class) -> Self {
        Self::with_parent(name.into(), Some(parent.clone()))
    }

    fn with_parent(name: Arc<str>, parent: Option<Class>) -> Self {
        Self(Arc::new(ClassInner {
            id: ClassId::next(),
            name,
            parent,
            declared: RwLock::new(IndexMap::new()),
        }))
    }

    pub fn id(&self) -> ClassId {
        self.0.id
    }

    pub fn name(&self) -> &str {
        &self.0.name
    }

    pub fn parent(&self) -> Option<&Class> {
        self.0.parent.as_ref()
    }

    pub(crate) fn tag(&self) -> OwnerTag {
        OwnerTag {
            id: self.0.id,
            name: Arc::clone(&self.0.name),
        }
    }

    /// This class followed by its ancestors, nearest first.
    pub fn lineage(&self) -> impl Iterator<Item = &Class> {
        std::iter::successors(Some(self), |class| class.parent())
    }

    /// Whether this class is `owner` or derives from it.
    pub fn is_a(&self, owner: ClassId) -> bool {
        self.lineage().any(|class| class.id() == owner)
    }

    /// Declare `blueprint` on this class under `name`.
    ///
    /// Assigns the blueprint its name and owner and records it so it can be
    /// looked up by name. Returns the blueprint for chaining.
    pub fn declare<T>(&self, name: &str, blueprint: Blueprint<T>) -> Result<Blueprint<T>> {
        self.declare_raw(name, blueprint.raw())?;
        Ok(blueprint)
    }

    /// Erased form of [`declare`](Self::declare).
    pub fn declare_raw(&self, name: &str, blueprint: &RawBlueprint) -> Result<()> {
        let mut declared = self.0.declared.write();
        if declared.contains_key(name) {
            return Err(DeclarationError::DuplicateName {
                class: self.name().to_string(),
                name: name.to_string(),
            }
            .into());
        }
        blueprint.assign_name_and_owner(name, self)?;
        declared.insert(Arc::from(name), blueprint.clone());
        Ok(())
    }

    /// Find a declared blueprint by name on this class or an ancestor.
    pub fn blueprint(&self, name: &str) -> Option<RawBlueprint> {
        self.lineage()
            .find_map(|class| class.0.declared.read().get(name).cloned())
    }

    /// Like [`blueprint`](Self::blueprint) but reports a declaration error.
    pub fn require(&self, name: &str) -> Result<RawBlueprint> {
        self.blueprint(name).ok_or_else(|| {
            DeclarationError::UnknownBlueprint {
                class: self.name().to_string(),
                name: name.to_string(),
            }
            .into()
        })
    }

    /// Names declared directly on this class, in declaration order.
    pub fn declared_names(&self) -> Vec<Arc<str>> {
        self.0.declared.read().keys().cloned().collect()
    }
}

impl PartialEq for Class {
    fn eq(&self, other: &Self) -> bool {
        self.id() == other.id()
    }
}

impl Eq for Class {}

impl fmt::Debug for Class {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Class")
            .field("id", &self.0.id)
            .field("name", &self.0.name)
            .field("parent", &self.parent().map(Class::name))
            .finish()
    }
}
