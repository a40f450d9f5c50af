//! Waiters: observers that external code can block or await on.
//!
//! Source feeders and watchers live outside the engine. A watcher registers
//! one of these on a node, waits for it, then reads the node's value through
//! the synchronous API.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use parking_lot::{Condvar, Mutex};
use tokio::sync::Notify;

use super::observer::Observer;

/// A settable flag for thread-based watchers.
///
/// `notify` sets the flag and wakes every waiting thread. The flag stays set
/// until [`clear`](Self::clear) is called.
#[derive(Debug, Default)]
pub struct Event {
    flag: Mutex<bool>,
    cond: Condvar,
}

impl Event {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self) {
        let mut flag = self.flag.lock();
        *flag = true;
        self.cond.notify_all();
    }

    pub fn clear(&self) {
        *self.flag.lock() = false;
    }

    pub fn is_set(&self) -> bool {
        *self.flag.lock()
    }

    /// Block until the flag is set.
    pub fn wait(&self) {
        let mut flag = self.flag.lock();
        while !*flag {
            self.cond.wait(&mut flag);
        }
    }

    /// Block until the flag is set or `timeout` passes. Returns whether the
    /// flag is set.
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        let mut flag = self.flag.lock();
        if !*flag {
            self.cond.wait_while_for(&mut flag, |set| !*set, timeout);
        }
        *flag
    }
}

impl Observer for Event {
    fn notify(&self) {
        self.set();
    }
}

/// An async waiter backed by [`tokio::sync::Notify`].
///
/// A notification that arrives while nobody is waiting is kept, so the next
/// [`changed`](Self::changed) returns immediately. The generation counter
/// tells how many notifications have arrived in total.
#[derive(Debug, Default)]
pub struct Watcher {
    notify: Notify,
    generation: AtomicU64,
}

impl Watcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for the next change.
    pub async fn changed(&self) {
        self.notify.notified().await;
    }

    /// Number of notifications received so far.
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }
}

impl Observer for Watcher {
    fn notify(&self) {
        self.generation.fetch_add(1, Ordering::AcqRel);
        self.notify.notify_one();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn event_set_and_clear() {
        let event = Event::new();
        assert!(!event.is_set());
        event.notify();
        assert!(event.is_set());
        event.clear();
        assert!(!event.is_set());
    }

    #[test]
    fn event_wakes_waiting_thread() {
        let event = Arc::new(Event::new());
        let waiter = {
            let event = event.clone();
            thread::spawn(move || event.wait())
        };
        event.notify();
        waiter.join().unwrap();
        assert!(event.is_set());
    }

    #[test]
    fn event_wait_times_out() {
        let event = Event::new();
        assert!(!event.wait_timeout(Duration::from_millis(10)));
    }

    #[tokio::test]
    async fn watcher_keeps_early_notification() {
        let watcher = Watcher::new();
        watcher.notify();
        watcher.changed().await;
        assert_eq!(watcher.generation(), 1);
    }
}
