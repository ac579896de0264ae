//! Cleanup handles returned by registrations and effects.

use std::fmt;

/// A one-shot cleanup.
///
/// Every registration against the host engine and every effect run hands one
/// of these back. Calling [`Disposer::dispose`] or dropping the disposer
/// reverses the registration. Use [`Disposer::forget`] to keep it for good.
#[must_use = "dropping a Disposer immediately reverses its registration"]
pub struct Disposer(Option<Box<dyn FnOnce()>>);

impl Disposer {
    /// Wraps a cleanup closure.
    pub fn new(f: impl FnOnce() + 'static) -> Self {
        Self(Some(Box::new(f)))
    }

    /// A disposer that does nothing.
    pub fn noop() -> Self {
        Self(None)
    }

    /// Combines several disposers into one. They run in reverse order,
    /// so the last registration is undone first.
    pub fn merge(disposers: impl IntoIterator<Item = Disposer>) -> Self {
        let mut all: Vec<Disposer> = disposers.into_iter().filter(|d| !d.is_noop()).collect();
        if all.is_empty() {
            return Self::noop();
        }
        Self::new(move || {
            while let Some(disposer) = all.pop() {
                disposer.dispose();
            }
        })
    }

    /// Returns true if disposing would do nothing.
    pub fn is_noop(&self) -> bool {
        self.0.is_none()
    }

    /// Runs the cleanup.
    pub fn dispose(mut self) {
        if let Some(f) = self.0.take() {
            f();
        }
    }

    /// Drops the handle without running the cleanup. The registration stays
    /// in place and whatever the cleanup captured is leaked.
    pub fn forget(mut self) {
        if let Some(f) = self.0.take() {
            std::mem::forget(f);
        }
    }
}

impl Drop for Disposer {
    fn drop(&mut self) {
        if let Some(f) = self.0.take() {
            f();
        }
    }
}

impl Default for Disposer {
    fn default() -> Self {
        Self::noop()
    }
}

impl fmt::Debug for Disposer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Disposer")
            .field(&if self.is_noop() { "noop" } else { "pending" })
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[test]
    fn test_dispose_runs_once() {
        let calls = Rc::new(RefCell::new(0));
        let c = calls.clone();
        let disposer = Disposer::new(move || *c.borrow_mut() += 1);
        assert!(!disposer.is_noop());
        disposer.dispose();
        assert_eq!(*calls.borrow(), 1);
    }

    #[test]
    fn test_merge_runs_in_reverse() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let parts = (0..3).map(|i| {
            let log = log.clone();
            Disposer::new(move || log.borrow_mut().push(i))
        });
        Disposer::merge(parts).dispose();
        assert_eq!(*log.borrow(), vec![2, 1, 0]);
    }

    #[test]
    fn test_drop_runs_cleanup() {
        let calls = Rc::new(RefCell::new(0));
        let c = calls.clone();
        {
            let _disposer = Disposer::new(move || *c.borrow_mut() += 1);
        }
        assert_eq!(*calls.borrow(), 1);
    }

    #[test]
    fn test_forget_skips_cleanup() {
        let calls = Rc::new(RefCell::new(0));
        let c = calls.clone();
        Disposer::new(move || *c.borrow_mut() += 1).forget();
        assert_eq!(*calls.borrow(), 0);
    }

    #[test]
    fn test_dropped_merge_runs_in_reverse() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let parts: Vec<Disposer> = (0..3)
            .map(|i| {
                let log = log.clone();
                Disposer::new(move || log.borrow_mut().push(i))
            })
            .collect();
        drop(Disposer::merge(parts));
        assert_eq!(*log.borrow(), vec![2, 1, 0]);
    }

    #[test]
    fn test_merge_of_noops_is_noop() {
        let merged = Disposer::merge(vec![Disposer::noop(), Disposer::noop()]);
        assert!(merged.is_noop());
    }
}
