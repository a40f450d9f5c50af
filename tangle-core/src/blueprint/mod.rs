//! Blueprints
//!
//! A blueprint is the immutable, type-level description of a node: either a
//! source, or a function applied to the values of argument blueprints.
//! Blueprints are shared by every instance of the class they are declared
//! on; the [`Builder`](crate::graph::Builder) realizes them into per-instance
//! [`Node`](crate::graph::Node)s on first access.
//!
//! # Naming
//!
//! Declared blueprints get a name and an owner class through
//! [`Class::declare`]. Blueprints produced by combinators and operators stay
//! anonymous; their node is cached under the blueprint's own [`BlueprintId`],
//! so the same anonymous blueprint always maps to the same node while two
//! structurally identical anonymous blueprints never share one.
//!
//! # Acyclicity
//!
//! Argument lists are fixed when a blueprint is created, so a blueprint can
//! only reference blueprints that already exist. The blueprint graph is a DAG
//! by construction.

mod class;
mod ops;

pub use class::{Class, ClassId, OwnerTag};
pub use ops::Compose;

use std::any::type_name;
use std::fmt;
use std::marker::PhantomData;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, OnceLock};

use smallvec::SmallVec;

use crate::error::{ComputeError, DeclarationError, Result};
use crate::graph::value::{downcast_value, value_ref, value_type_name, AnyValue, ValueRef};

/// Erased compute function: argument values in, result value out.
pub type ComputeFn =
    Arc<dyn Fn(&[ValueRef]) -> std::result::Result<ValueRef, ComputeError> + Send + Sync>;

/// Process-unique identity of a blueprint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BlueprintId(u64);

impl BlueprintId {
    fn next() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    /// Get the raw ID value.
    pub fn raw(&self) -> u64 {
        self.0
    }
}

/// Key under which a realized node is stored in a node table.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum NodeKey {
    Named(Arc<str>),
    Anonymous(BlueprintId),
}

impl fmt::Display for NodeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NodeKey::Named(name) => f.write_str(name),
            NodeKey::Anonymous(id) => write!(f, "#{}", id.0),
        }
    }
}

pub(crate) enum BlueprintKind {
    Source,
    Function(ComputeFn),
}

struct Declaration {
    name: Arc<str>,
    owner: OwnerTag,
}

struct BlueprintInner {
    id: BlueprintId,
    kind: BlueprintKind,
    args: SmallVec<[RawBlueprint; 4]>,
    /// Operator or combinator name, shown for anonymous blueprints.
    label: Option<&'static str>,
    declaration: OnceLock<Declaration>,
}

impl Drop for BlueprintInner {
    // Long combinator chains would otherwise drop recursively.
    fn drop(&mut self) {
        let mut pending: Vec<RawBlueprint> = self.args.drain(..).collect();
        while let Some(RawBlueprint(inner)) = pending.pop() {
            if let Some(mut last) = Arc::into_inner(inner) {
                pending.extend(last.args.drain(..));
            }
        }
    }
}

/// Untyped blueprint handle. Cloning shares the blueprint.
#[derive(Clone)]
pub struct RawBlueprint(Arc<BlueprintInner>);

impl RawBlueprint {
    fn new(kind: BlueprintKind, args: SmallVec<[RawBlueprint; 4]>, label: Option<&'static str>) -> Self {
        Self(Arc::new(BlueprintInner {
            id: BlueprintId::next(),
            kind,
            args,
            label,
            declaration: OnceLock::new(),
        }))
    }

    /// Define a source blueprint.
    pub fn source() -> Self {
        Self::new(BlueprintKind::Source, SmallVec::new(), None)
    }

    /// Define a function blueprint over `args`.
    ///
    /// `fun` receives the argument values in the order the arguments were
    /// given.
    pub fn function<F, I>(fun: F, args: I) -> Self
    where
        F: Fn(&[ValueRef]) -> std::result::Result<ValueRef, ComputeError> + Send + Sync + 'static,
        I: IntoIterator<Item = RawBlueprint>,
    {
        Self::labelled(None, Arc::new(fun), args.into_iter().collect())
    }

    fn labelled(label: Option<&'static str>, fun: ComputeFn, args: SmallVec<[RawBlueprint; 4]>) -> Self {
        Self::new(BlueprintKind::Function(fun), args, label)
    }

    /// Give the blueprint its name and owner class. Allowed once.
    ///
    /// Normally called through [`Class::declare`], which also records the
    /// blueprint in the class's declaration table.
    pub fn assign_name_and_owner(&self, name: &str, owner: &Class) -> Result<()> {
        let declaration = Declaration {
            name: Arc::from(name),
            owner: owner.tag(),
        };
        self.0.declaration.set(declaration).map_err(|_| {
            let existing = self.0.declaration.get();
            DeclarationError::AlreadyDeclared {
                owner: existing.map(|d| d.owner.name.to_string()).unwrap_or_default(),
                name: existing.map(|d| d.name.to_string()).unwrap_or_default(),
            }
            .into()
        })
    }

    /// Get the blueprint ID.
    pub fn id(&self) -> BlueprintId {
        self.0.id
    }

    /// Declared name, if the blueprint has been declared on a class.
    pub fn name(&self) -> Option<&str> {
        self.0.declaration.get().map(|d| &*d.name)
    }

    /// Class that declared this blueprint.
    pub fn owner(&self) -> Option<&OwnerTag> {
        self.0.declaration.get().map(|d| &d.owner)
    }

    /// True until the blueprint is declared under a name.
    pub fn is_anonymous(&self) -> bool {
        self.0.declaration.get().is_none()
    }

    /// Whether this blueprint describes a source node.
    pub fn is_source(&self) -> bool {
        matches!(self.0.kind, BlueprintKind::Source)
    }

    /// Number of argument blueprints.
    pub fn arg_count(&self) -> usize {
        self.0.args.len()
    }

    /// Argument blueprints, in call order.
    pub fn args(&self) -> &[RawBlueprint] {
        &self.0.args
    }

    pub(crate) fn kind(&self) -> &BlueprintKind {
        &self.0.kind
    }

    pub(crate) fn kind_name(&self) -> &'static str {
        match self.0.kind {
            BlueprintKind::Source => "source",
            BlueprintKind::Function(_) => "function",
        }
    }

    /// Key of the node realized from this blueprint.
    pub fn key(&self) -> NodeKey {
        match self.0.declaration.get() {
            Some(declaration) => NodeKey::Named(Arc::clone(&declaration.name)),
            None => NodeKey::Anonymous(self.0.id),
        }
    }

    /// Human readable name: `Owner.name` or `<label #id>`.
    pub fn display_name(&self) -> String {
        match self.0.declaration.get() {
            Some(d) => format!("{}.{}", d.owner.name, d.name),
            None => format!("<{} #{}>", self.0.label.unwrap_or("anonymous"), self.0.id.0),
        }
    }
}

impl PartialEq for RawBlueprint {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl Eq for RawBlueprint {}

impl fmt::Debug for RawBlueprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Blueprint")
            .field("name", &self.display_name())
            .field("kind", &self.kind_name())
            .field("arg_count", &self.arg_count())
            .finish()
    }
}

/// Fetch argument `index` as `&A`.
fn arg<A: AnyValue>(args: &[ValueRef], index: usize) -> std::result::Result<&A, ComputeError> {
    let value = args
        .get(index)
        .ok_or_else(|| format!("missing argument {index}"))?;
    let typed = downcast_value::<A>(value).ok_or_else(|| {
        format!(
            "argument {index} is {}, expected {}",
            value_type_name(value),
            type_name::<A>()
        )
    })?;
    Ok(typed)
}

/// Typed blueprint handle producing values of type `T`.
///
/// A thin view over [`RawBlueprint`]; the type parameter only drives the
/// typed constructors and reads.
pub struct Blueprint<T> {
    raw: RawBlueprint,
    _marker: PhantomData<fn() -> T>,
}

impl<T> Blueprint<T> {
    /// Treat an erased blueprint as producing `T`.
    ///
    /// Nothing is checked here; a wrong `T` shows up as a type mismatch
    /// error on read.
    pub fn from_raw(raw: RawBlueprint) -> Self {
        Self {
            raw,
            _marker: PhantomData,
        }
    }

    /// Get the erased blueprint.
    pub fn raw(&self) -> &RawBlueprint {
        &self.raw
    }

    /// Consume the handle, returning the erased blueprint.
    pub fn into_raw(self) -> RawBlueprint {
        self.raw
    }

    /// Get the blueprint ID.
    pub fn id(&self) -> BlueprintId {
        self.raw.id()
    }

    /// Declared name, if any.
    pub fn name(&self) -> Option<&str> {
        self.raw.name()
    }

    /// Whether this blueprint describes a source node.
    pub fn is_source(&self) -> bool {
        self.raw.is_source()
    }
}

impl<T: AnyValue> Blueprint<T> {
    /// Define a source blueprint holding `T`.
    pub fn source() -> Self {
        Self::from_raw(RawBlueprint::source())
    }

    fn from_fn<F>(label: Option<&'static str>, args: SmallVec<[RawBlueprint; 4]>, fun: F) -> Self
    where
        F: Fn(&[ValueRef]) -> std::result::Result<T, ComputeError> + Send + Sync + 'static,
    {
        let erased: ComputeFn = Arc::new(move |values: &[ValueRef]| fun(values).map(value_ref));
        Self::from_raw(RawBlueprint::labelled(label, erased, args))
    }

    /// Function of one argument.
    pub fn map<A, F>(a: &Blueprint<A>, fun: F) -> Self
    where
        A: AnyValue,
        F: Fn(&A) -> T + Send + Sync + 'static,
    {
        Self::from_fn(None, smallvec::smallvec![a.raw.clone()], move |args| {
            Ok(fun(arg::<A>(args, 0)?))
        })
    }

    /// Function of two arguments.
    pub fn map2<A, B, F>(a: &Blueprint<A>, b: &Blueprint<B>, fun: F) -> Self
    where
        A: AnyValue,
        B: AnyValue,
        F: Fn(&A, &B) -> T + Send + Sync + 'static,
    {
        Self::from_fn(
            None,
            smallvec::smallvec![a.raw.clone(), b.raw.clone()],
            move |args| Ok(fun(arg::<A>(args, 0)?, arg::<B>(args, 1)?)),
        )
    }

    /// Function of three arguments.
    pub fn map3<A, B, C, F>(a: &Blueprint<A>, b: &Blueprint<B>, c: &Blueprint<C>, fun: F) -> Self
    where
        A: AnyValue,
        B: AnyValue,
        C: AnyValue,
        F: Fn(&A, &B, &C) -> T + Send + Sync + 'static,
    {
        Self::from_fn(
            None,
            smallvec::smallvec![a.raw.clone(), b.raw.clone(), c.raw.clone()],
            move |args| {
                Ok(fun(
                    arg::<A>(args, 0)?,
                    arg::<B>(args, 1)?,
                    arg::<C>(args, 2)?,
                ))
            },
        )
    }

    /// Fallible function of one argument.
    pub fn try_map<A, E, F>(a: &Blueprint<A>, fun: F) -> Self
    where
        A: AnyValue,
        E: Into<ComputeError>,
        F: Fn(&A) -> std::result::Result<T, E> + Send + Sync + 'static,
    {
        Self::from_fn(None, smallvec::smallvec![a.raw.clone()], move |args| {
            fun(arg::<A>(args, 0)?).map_err(Into::into)
        })
    }

    /// Fallible function of two arguments.
    pub fn try_map2<A, B, E, F>(a: &Blueprint<A>, b: &Blueprint<B>, fun: F) -> Self
    where
        A: AnyValue,
        B: AnyValue,
        E: Into<ComputeError>,
        F: Fn(&A, &B) -> std::result::Result<T, E> + Send + Sync + 'static,
    {
        Self::from_fn(
            None,
            smallvec::smallvec![a.raw.clone(), b.raw.clone()],
            move |args| fun(arg::<A>(args, 0)?, arg::<B>(args, 1)?).map_err(Into::into),
        )
    }

    /// Binary combinator behind the arithmetic operators. The result is
    /// anonymous and labelled `label` for diagnostics.
    pub fn combine<A, B, F>(label: &'static str, lhs: &Blueprint<A>, rhs: &Blueprint<B>, fun: F) -> Self
    where
        A: AnyValue,
        B: AnyValue,
        F: Fn(&A, &B) -> T + Send + Sync + 'static,
    {
        Self::from_fn(
            Some(label),
            smallvec::smallvec![lhs.raw.clone(), rhs.raw.clone()],
            move |args| Ok(fun(arg::<A>(args, 0)?, arg::<B>(args, 1)?)),
        )
    }
}

impl<T: AnyValue + Clone + PartialEq + fmt::Debug> Blueprint<T> {
    /// Node whose value is the list of `items`' values, in order.
    pub fn collect(items: &[&Blueprint<T>]) -> Blueprint<Vec<T>> {
        let args = items.iter().map(|item| item.raw.clone()).collect();
        Blueprint::from_fn(Some("list"), args, |values: &[ValueRef]| {
            (0..values.len())
                .map(|index| arg::<T>(values, index).map(T::clone))
                .collect()
        })
    }
}

impl<T> Clone for Blueprint<T> {
    fn clone(&self) -> Self {
        Self::from_raw(self.raw.clone())
    }
}

impl<T> fmt::Debug for Blueprint<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Blueprint")
            .field("name", &self.raw.display_name())
            .field("type", &type_name::<T>())
            .finish()
    }
}

impl<T> From<Blueprint<T>> for RawBlueprint {
    fn from(blueprint: Blueprint<T>) -> Self {
        blueprint.raw
    }
}

impl<T> AsRef<RawBlueprint> for Blueprint<T> {
    fn as_ref(&self) -> &RawBlueprint {
        &self.raw
    }
}

impl AsRef<RawBlueprint> for RawBlueprint {
    fn as_ref(&self) -> &RawBlueprint {
        self
    }
}
