//! Reactive value cells.

use crate::dispose::Disposer;
use crate::effect::effect;
use crate::runtime::{self, EffectId, Source, SourceId};
use std::cell::RefCell;
use std::collections::BTreeSet;
use std::fmt;
use std::rc::{Rc, Weak};

struct SignalInner<T> {
    id: SourceId,
    value: RefCell<T>,
    observers: RefCell<BTreeSet<EffectId>>,
}

impl<T> Source for SignalInner<T> {
    fn remove_observer(&self, effect: EffectId) {
        self.observers.borrow_mut().remove(&effect);
    }
}

/// A reactive value.
///
/// Reading through [`Signal::get`] or [`Signal::with`] inside an effect makes
/// that effect depend on the signal for the duration of the run. Writing a
/// different value re-runs every dependent effect once, after the current
/// batch. Cloning a signal clones the handle, not the value.
pub struct Signal<T> {
    inner: Rc<SignalInner<T>>,
}

impl<T> Clone for Signal<T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<T: 'static> Signal<T> {
    pub fn new(value: T) -> Self {
        Self {
            inner: Rc::new(SignalInner {
                id: runtime::next_id(),
                value: RefCell::new(value),
                observers: RefCell::new(BTreeSet::new()),
            }),
        }
    }

    fn track(&self) {
        let Some(observer) = runtime::current_observer() else {
            return;
        };
        let source: Weak<dyn Source> = Rc::downgrade(&self.inner) as Weak<dyn Source>;
        if runtime::record_dependency(observer, self.inner.id, source) {
            self.inner.observers.borrow_mut().insert(observer);
        }
    }

    /// Borrows the value, registering a dependency.
    ///
    /// The signal must not be written from inside `f`.
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        self.track();
        f(&self.inner.value.borrow())
    }

    /// Borrows the value without registering a dependency.
    pub fn with_untracked<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        f(&self.inner.value.borrow())
    }

    /// Writes a new value. Equal values are ignored.
    pub fn set(&self, value: T)
    where
        T: PartialEq,
    {
        if *self.inner.value.borrow() == value {
            return;
        }
        *self.inner.value.borrow_mut() = value;
        self.notify();
    }

    /// Computes the next value from the current one and writes it.
    pub fn update(&self, f: impl FnOnce(&T) -> T)
    where
        T: PartialEq,
    {
        let next = self.with_untracked(f);
        self.set(next);
    }

    fn notify(&self) {
        let observers: Vec<EffectId> = self.inner.observers.borrow().iter().copied().collect();
        if !observers.is_empty() {
            runtime::schedule(observers);
        }
    }

    /// Calls `f` with the current value now and after every change.
    /// Dispose or drop the result to unsubscribe.
    pub fn subscribe(&self, f: impl Fn(&T) + 'static) -> Disposer {
        let signal = self.clone();
        effect(move || {
            signal.with(|value| f(value));
            Disposer::noop()
        })
        .into_disposer()
    }

    /// Number of effects currently depending on this signal.
    pub fn observer_count(&self) -> usize {
        self.inner.observers.borrow().len()
    }

    /// Returns true if both handles point at the same cell.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }
}

impl<T: Clone + 'static> Signal<T> {
    /// Returns a copy of the value, registering a dependency.
    pub fn get(&self) -> T {
        self.with(T::clone)
    }

    /// Returns a copy of the value without registering a dependency.
    pub fn peek(&self) -> T {
        self.with_untracked(T::clone)
    }
}

impl<T: Default + 'static> Default for Signal<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

impl<T: fmt::Debug> fmt::Debug for Signal<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Signal")
            .field("value", &*self.inner.value.borrow())
            .finish()
    }
}
