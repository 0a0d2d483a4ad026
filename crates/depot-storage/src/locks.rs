use std::collections::HashSet;
use std::sync::{Condvar, Mutex};

/// Per-name mutual exclusion.
///
/// Holding a [`NameGuard`] for a name blocks every other `lock()` of that
/// name until the guard drops. Names nobody holds cost nothing.
#[derive(Debug, Default)]
pub(crate) struct NameLocks {
    held: Mutex<HashSet<String>>,
    released: Condvar,
}

impl NameLocks {
    pub(crate) fn lock(&self, name: &str) -> NameGuard<'_> {
        let mut held = self.held.lock().expect("name lock poisoned");
        while held.contains(name) {
            held = self.released.wait(held).expect("name lock poisoned");
        }
        held.insert(name.to_string());
        NameGuard {
            locks: self,
            name: name.to_string(),
        }
    }

    #[cfg(test)]
    fn is_held(&self, name: &str) -> bool {
        self.held.lock().expect("name lock poisoned").contains(name)
    }
}

pub(crate) struct NameGuard<'a> {
    locks: &'a NameLocks,
    name: String,
}

impl Drop for NameGuard<'_> {
    fn drop(&mut self) {
        // A poisoned set must still release the name.
        let mut held = match self.locks.held.lock() {
            Ok(held) => held,
            Err(poisoned) => poisoned.into_inner(),
        };
        held.remove(&self.name);
        self.locks.released.notify_all();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::thread;
    use std::time::Duration;

    #[test]
    fn guard_releases_on_drop() {
        let locks = NameLocks::default();
        {
            let _g = locks.lock("a");
            assert!(locks.is_held("a"));
        }
        assert!(!locks.is_held("a"));
    }

    #[test]
    fn distinct_names_do_not_block() {
        let locks = NameLocks::default();
        let _a = locks.lock("a");
        let _b = locks.lock("b");
        assert!(locks.is_held("a"));
        assert!(locks.is_held("b"));
    }

    #[test]
    fn same_name_is_exclusive() {
        let locks = NameLocks::default();
        let inside = AtomicUsize::new(0);
        let max_inside = AtomicUsize::new(0);

        thread::scope(|s| {
            for _ in 0..4 {
                s.spawn(|| {
                    for _ in 0..20 {
                        let _g = locks.lock("same");
                        let now = inside.fetch_add(1, Ordering::SeqCst) + 1;
                        max_inside.fetch_max(now, Ordering::SeqCst);
                        thread::sleep(Duration::from_micros(100));
                        inside.fetch_sub(1, Ordering::SeqCst);
                    }
                });
            }
        });

        assert_eq!(max_inside.load(Ordering::SeqCst), 1);
        assert!(!locks.is_held("same"));
    }
}
