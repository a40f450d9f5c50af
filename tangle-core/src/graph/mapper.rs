//! Cross-instance links.
//!
//! A blueprint declared on class `Foo` can be used from an instance of an
//! unrelated class `Bar` if a link `Bar -> Foo` is registered: the link's
//! resolver maps a `Bar` instance to the `Foo` instance whose nodes should be
//! used. The mapper only stores resolvers; it caches nothing and calls the
//! resolver on every build pass that needs it.

use std::any::type_name;
use std::fmt;
use std::sync::Arc;

use dashmap::DashMap;
use tracing::debug;

use super::table::{AsAny, Tangled};
use crate::blueprint::{Class, ClassId, OwnerTag};
use crate::error::{Result, TangleError};

type Resolver = Arc<dyn Fn(&dyn Tangled) -> Result<Arc<dyn Tangled>> + Send + Sync>;

#[derive(Clone)]
struct Link {
    name: Arc<str>,
    resolver: Resolver,
}

/// Registry of link resolvers keyed by `(owner class, target class)`.
#[derive(Default)]
pub struct Mapper {
    links: DashMap<(ClassId, ClassId), Link>,
}

impl Mapper {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register how instances of `owner` (host type `U`) find their linked
    /// instance of `target` (host type `T`).
    ///
    /// At most one resolver exists per class pair; registering again
    /// replaces it. Returns whether a resolver was replaced.
    pub fn register_link<U, T, F>(&self, owner: &Class, target: &Class, resolve: F) -> bool
    where
        U: Tangled,
        T: Tangled,
        F: Fn(&U) -> Arc<T> + Send + Sync + 'static,
    {
        let name: Arc<str> = Arc::from(format!("{} -> {}", owner.name(), target.name()));
        let link_name = Arc::clone(&name);
        let resolver: Resolver = Arc::new(move |host: &dyn Tangled| {
            let host = <dyn Tangled as AsAny>::as_any(host)
                .downcast_ref::<U>()
                .ok_or_else(|| TangleError::LinkHost {
                    link: link_name.to_string(),
                    expected: type_name::<U>().to_string(),
                })?;
            let linked: Arc<dyn Tangled> = resolve(host);
            Ok(linked)
        });

        debug!(link = %name, "registered link");
        self.links
            .insert((owner.id(), target.id()), Link { name, resolver })
            .is_some()
    }

    /// Whether `owner` (or an ancestor) has a link to `target`.
    pub fn has_link(&self, owner: &Class, target: ClassId) -> bool {
        owner
            .lineage()
            .any(|class| self.links.contains_key(&(class.id(), target)))
    }

    /// Find the instance of `target` linked to `host`.
    ///
    /// Links registered on an ancestor of the host's class apply too.
    pub fn resolve(&self, host: &dyn Tangled, target: &OwnerTag) -> Result<Arc<dyn Tangled>> {
        let class = host.class();
        let link = class
            .lineage()
            .find_map(|class| self.links.get(&(class.id(), target.id)).map(|link| link.clone()))
            .ok_or_else(|| TangleError::Mapping {
                from: class.name().to_string(),
                to: target.name.to_string(),
            })?;

        let linked = (link.resolver)(host)?;
        if !linked.class().is_a(target.id) {
            return Err(TangleError::LinkHost {
                link: link.name.to_string(),
                expected: format!("an instance of {}", target.name),
            });
        }
        Ok(linked)
    }

    /// Number of registered links.
    pub fn len(&self) -> usize {
        self.links.len()
    }

    /// Check if no links are registered.
    pub fn is_empty(&self) -> bool {
        self.links.is_empty()
    }
}

impl fmt::Debug for Mapper {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<String> = self.links.iter().map(|link| link.name.to_string()).collect();
        f.debug_struct("Mapper").field("links", &names).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::Object;

    struct Fixture {
        foo_class: Class,
        bar_class: Class,
        foo: Arc<Object>,
        bar: Object<Arc<Object>>,
    }

    fn fixture() -> Fixture {
        let foo_class = Class::new("Foo");
        let bar_class = Class::new("Bar");
        let foo = Arc::new(Object::plain(&foo_class));
        let bar = Object::new(&bar_class, Arc::clone(&foo));
        Fixture {
            foo_class,
            bar_class,
            foo,
            bar,
        }
    }

    #[test]
    fn resolves_registered_link() {
        let f = fixture();
        let mapper = Mapper::new();
        assert!(!mapper.register_link(&f.bar_class, &f.foo_class, |bar: &Object<Arc<Object>>| {
            Arc::clone(bar.state())
        }));

        let linked = mapper.resolve(&f.bar, &f.foo_class.tag()).unwrap();
        assert_eq!(linked.class(), &f.foo_class);
        assert!(std::ptr::eq(
            <dyn Tangled as AsAny>::as_any(&*linked).downcast_ref::<Object>().unwrap(),
            &*f.foo
        ));
    }

    #[test]
    fn missing_link_names_both_classes() {
        let f = fixture();
        let mapper = Mapper::new();
        let err = mapper.resolve(&f.bar, &f.foo_class.tag()).err().unwrap();
        assert_eq!(err.to_string(), "no tangled link between Bar and Foo");
    }

    #[test]
    fn wrong_host_type_is_reported() {
        let f = fixture();
        let mapper = Mapper::new();
        // registered for the wrong concrete host type
        mapper.register_link(&f.bar_class, &f.foo_class, |_: &Object<u8>| Arc::new(Object::plain(&Class::new("Foo"))));
        let err = mapper.resolve(&f.bar, &f.foo_class.tag()).err().unwrap();
        assert!(matches!(err, TangleError::LinkHost { .. }));
    }

    #[test]
    fn derived_classes_inherit_links() {
        let f = fixture();
        let mapper = Mapper::new();
        mapper.register_link(&f.bar_class, &f.foo_class, |bar: &Object<Arc<Object>>| {
            Arc::clone(bar.state())
        });
        let baz_class = Class::derive("Baz", &f.bar_class);
        let baz = Object::new(&baz_class, Arc::clone(&f.foo));

        assert!(mapper.has_link(&baz_class, f.foo_class.id()));
        assert!(mapper.resolve(&baz, &f.foo_class.tag()).is_ok());
    }

    #[test]
    fn reregistering_replaces() {
        let f = fixture();
        let mapper = Mapper::new();
        let resolve = |bar: &Object<Arc<Object>>| Arc::clone(bar.state());
        assert!(!mapper.register_link(&f.bar_class, &f.foo_class, resolve));
        assert!(mapper.register_link(&f.bar_class, &f.foo_class, resolve));
        assert_eq!(mapper.len(), 1);
    }
}
