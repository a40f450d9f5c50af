//! Observer types for the reactive system.
//!
//! An observer is an external waiter registered on a node. It is signalled
//! when the node's value changes (a source is set, or something upstream of
//! the node is). Nodes hold observers weakly: when the last strong reference
//! to an observer is dropped, it drops out of every set it was registered in
//! without an explicit unsubscribe.

use std::fmt;
use std::sync::{Arc, Weak};

use parking_lot::Mutex;

/// Something that wants to hear about node changes.
pub trait Observer: Send + Sync {
    /// Called once per logical update that reaches a node this observer is
    /// registered on.
    fn notify(&self);
}

fn address<T: ?Sized>(ptr: *const T) -> usize {
    ptr as *const () as usize
}

/// Weak, deduplicating set of observers.
#[derive(Default)]
pub struct ObserverSet {
    observers: Mutex<Vec<Weak<dyn Observer>>>,
}

impl ObserverSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an observer. Adding the same observer twice has no effect.
    pub fn insert<O: Observer + 'static>(&self, observer: &Arc<O>) {
        let weak: Weak<O> = Arc::downgrade(observer);
        self.insert_weak(weak);
    }

    /// Add an already type-erased observer.
    pub fn insert_dyn(&self, observer: &Arc<dyn Observer>) {
        self.insert_weak(Arc::downgrade(observer));
    }

    fn insert_weak(&self, weak: Weak<dyn Observer>) {
        let mut observers = self.observers.lock();
        observers.retain(|existing| existing.strong_count() > 0);
        let key = address(weak.as_ptr());
        if !observers.iter().any(|existing| address(existing.as_ptr()) == key) {
            observers.push(weak);
        }
    }

    /// Remove an observer explicitly.
    pub fn remove<O: Observer + 'static>(&self, observer: &Arc<O>) {
        let key = address(Arc::as_ptr(observer));
        self.observers
            .lock()
            .retain(|existing| existing.strong_count() > 0 && address(existing.as_ptr()) != key);
    }

    /// Strong references to the observers still alive, pruning the rest.
    pub fn live(&self) -> Vec<Arc<dyn Observer>> {
        let mut observers = self.observers.lock();
        observers.retain(|existing| existing.strong_count() > 0);
        observers.iter().filter_map(Weak::upgrade).collect()
    }

    /// Number of live observers.
    pub fn len(&self) -> usize {
        self.observers
            .lock()
            .iter()
            .filter(|existing| existing.strong_count() > 0)
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl fmt::Debug for ObserverSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObserverSet").field("len", &self.len()).finish()
    }
}

/// Identity of an observer, used to signal each observer once per update.
pub(crate) fn observer_key(observer: &Arc<dyn Observer>) -> usize {
    address(Arc::as_ptr(observer))
}

/// An observer that runs a closure.
pub struct Callback {
    /// The callback to invoke when the observed node changes.
    notify: Box<dyn Fn() + Send + Sync>,
}

impl Callback {
    /// Create a new callback observer.
    pub fn new<F>(notify: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        Self {
            notify: Box::new(notify),
        }
    }

    /// Create a callback observer already wrapped for subscription.
    pub fn shared<F>(notify: F) -> Arc<Self>
    where
        F: Fn() + Send + Sync + 'static,
    {
        Arc::new(Self::new(notify))
    }
}

impl Observer for Callback {
    fn notify(&self) {
        (self.notify)();
    }
}

impl fmt::Debug for Callback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Callback").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn counter() -> (Arc<AtomicUsize>, Arc<Callback>) {
        let count = Arc::new(AtomicUsize::new(0));
        let count_clone = count.clone();
        let callback = Callback::shared(move || {
            count_clone.fetch_add(1, Ordering::SeqCst);
        });
        (count, callback)
    }

    #[test]
    fn callback_notify_calls_closure() {
        let (count, callback) = counter();
        callback.notify();
        callback.notify();
        assert_eq!(count.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn set_deduplicates() {
        let set = ObserverSet::new();
        let (_, callback) = counter();
        set.insert(&callback);
        set.insert(&callback);
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn typed_and_erased_inserts_share_identity() {
        let set = ObserverSet::new();
        let (count, callback) = counter();
        let erased: Arc<dyn Observer> = callback.clone();
        set.insert(&callback);
        set.insert_dyn(&erased);
        assert_eq!(set.len(), 1);

        for observer in set.live() {
            observer.notify();
        }
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn dropped_observers_expire() {
        let set = ObserverSet::new();
        let (count, callback) = counter();
        set.insert(&callback);
        assert_eq!(set.live().len(), 1);

        drop(callback);
        assert!(set.is_empty());
        assert!(set.live().is_empty());
        assert_eq!(count.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn explicit_remove() {
        let set = ObserverSet::new();
        let (_, first) = counter();
        let (_, second) = counter();
        set.insert(&first);
        set.insert(&second);
        set.remove(&first);
        assert_eq!(set.len(), 1);
        let live = set.live();
        let second_dyn: Arc<dyn Observer> = second;
        assert_eq!(observer_key(&live[0]), observer_key(&second_dyn));
    }
}
