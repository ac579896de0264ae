//! Derived values.

use crate::dispose::Disposer;
use crate::effect::{effect, Effect};
use crate::runtime::untrack;
use crate::signal::Signal;

/// A value derived from other signals.
///
/// The computation re-runs when its inputs change and only notifies readers
/// when the result differs from the previous one.
pub struct Memo<T> {
    value: Signal<T>,
    effect: Effect,
}

impl<T: Clone + PartialEq + 'static> Memo<T> {
    pub fn new(mut compute: impl FnMut() -> T + 'static) -> Self {
        let value = Signal::new(untrack(&mut compute));
        let target = value.clone();
        let effect = effect(move || {
            target.set(compute());
            Disposer::noop()
        });
        Self { value, effect }
    }

    /// Returns the current value, registering a dependency.
    pub fn get(&self) -> T {
        self.value.get()
    }

    /// Returns the current value without registering a dependency.
    pub fn peek(&self) -> T {
        self.value.peek()
    }

    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        self.value.with(f)
    }

    /// A read handle to the derived value. Writes to it are overwritten on
    /// the next recomputation.
    pub fn signal(&self) -> Signal<T> {
        self.value.clone()
    }

    /// Stops recomputing. The last value stays readable.
    pub fn dispose(&self) {
        self.effect.stop();
    }
}

impl<T> Clone for Memo<T> {
    fn clone(&self) -> Self {
        Self {
            value: self.value.clone(),
            effect: self.effect.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::rc::Rc;

    #[test]
    fn test_memo_tracks_inputs() {
        let count = Signal::new(2);
        let c = count.clone();
        let doubled = Memo::new(move || c.get() * 2);
        assert_eq!(doubled.get(), 4);
        count.set(5);
        assert_eq!(doubled.get(), 10);
        doubled.dispose();
        count.set(6);
        assert_eq!(doubled.get(), 10);
    }

    #[test]
    fn test_memo_skips_equal_results() {
        let input = Signal::new(1);
        let i = input.clone();
        let parity = Memo::new(move || i.get() % 2);

        let notified = Rc::new(Cell::new(0));
        let n = notified.clone();
        let sub = parity.signal().subscribe(move |_| n.set(n.get() + 1));

        input.set(3);
        assert_eq!(notified.get(), 1);
        input.set(4);
        assert_eq!(notified.get(), 2);
        sub.dispose();
        parity.dispose();
    }
}
