//! Thread-local reactive runtime: tracking stack, batching and the
//! pending-effect queue.

use crate::effect::EffectNode;
use std::cell::{Cell, RefCell};
use std::collections::{BTreeSet, HashMap};
use std::rc::{Rc, Weak};

/// Identifies an effect. Ids grow monotonically, so ordering by id is
/// ordering by creation.
pub(crate) type EffectId = u64;

/// Identifies a signal.
pub(crate) type SourceId = u64;

/// Upper bound on effect runs in one flush before propagation is cut off.
const MAX_FLUSH_RUNS: usize = 100_000;

/// Something an effect can depend on.
pub(crate) trait Source {
    fn remove_observer(&self, effect: EffectId);
}

pub(crate) struct Runtime {
    /// Tracking stack. `None` marks an untracked section.
    observers: RefCell<Vec<Option<EffectId>>>,
    batch_depth: Cell<usize>,
    flushing: Cell<bool>,
    pending: RefCell<BTreeSet<EffectId>>,
    effects: RefCell<HashMap<EffectId, Rc<EffectNode>>>,
    next_id: Cell<u64>,
}

thread_local! {
    static RUNTIME: Runtime = Runtime::new();
}

impl Runtime {
    fn new() -> Self {
        Self {
            observers: RefCell::new(Vec::new()),
            batch_depth: Cell::new(0),
            flushing: Cell::new(false),
            pending: RefCell::new(BTreeSet::new()),
            effects: RefCell::new(HashMap::new()),
            next_id: Cell::new(1),
        }
    }
}

fn with_runtime<R>(f: impl FnOnce(&Runtime) -> R) -> R {
    RUNTIME.with(f)
}

pub(crate) fn next_id() -> u64 {
    with_runtime(|rt| {
        let id = rt.next_id.get();
        rt.next_id.set(id + 1);
        id
    })
}

/// The effect currently being tracked, if any.
pub(crate) fn current_observer() -> Option<EffectId> {
    with_runtime(|rt| rt.observers.borrow().last().copied().flatten())
}

/// Records that the running effect `observer` read `source`. Returns false
/// if the observer has already been stopped.
pub(crate) fn record_dependency(observer: EffectId, id: SourceId, source: Weak<dyn Source>) -> bool {
    let node = with_runtime(|rt| rt.effects.borrow().get(&observer).cloned());
    match node {
        Some(node) => {
            node.add_dependency(id, source);
            true
        }
        None => false,
    }
}

pub(crate) fn register_effect(node: Rc<EffectNode>) {
    with_runtime(|rt| rt.effects.borrow_mut().insert(node.id, node));
}

pub(crate) fn unregister_effect(id: EffectId) {
    with_runtime(|rt| {
        rt.pending.borrow_mut().remove(&id);
        rt.effects.borrow_mut().remove(&id);
    });
}

/// Pops the tracking stack when dropped, so a panicking body does not leave
/// a stale observer behind.
pub(crate) struct TrackingGuard;

impl TrackingGuard {
    pub(crate) fn push(observer: Option<EffectId>) -> Self {
        with_runtime(|rt| rt.observers.borrow_mut().push(observer));
        TrackingGuard
    }
}

impl Drop for TrackingGuard {
    fn drop(&mut self) {
        with_runtime(|rt| rt.observers.borrow_mut().pop());
    }
}

/// Queues effects for a re-run after the current batch.
pub(crate) fn schedule(effects: impl IntoIterator<Item = EffectId>) {
    batch(|| {
        with_runtime(|rt| rt.pending.borrow_mut().extend(effects));
    });
}

/// Runs `f` with signal writes deferred. Effects triggered by those writes
/// run once each, in creation order, after the outermost batch returns.
pub fn batch<R>(f: impl FnOnce() -> R) -> R {
    with_runtime(|rt| rt.batch_depth.set(rt.batch_depth.get() + 1));
    let result = {
        let _guard = BatchGuard;
        f()
    };
    if with_runtime(|rt| rt.batch_depth.get()) == 0 {
        flush();
    }
    result
}

struct BatchGuard;

impl Drop for BatchGuard {
    fn drop(&mut self) {
        with_runtime(|rt| rt.batch_depth.set(rt.batch_depth.get().saturating_sub(1)));
    }
}

/// Runs `f` without registering any signal reads as dependencies.
pub fn untrack<R>(f: impl FnOnce() -> R) -> R {
    let _guard = TrackingGuard::push(None);
    f()
}

struct FlushGuard;

impl Drop for FlushGuard {
    fn drop(&mut self) {
        with_runtime(|rt| rt.flushing.set(false));
    }
}

fn flush() {
    if with_runtime(|rt| rt.flushing.replace(true)) {
        return;
    }
    let _guard = FlushGuard;

    let mut runs = 0usize;
    loop {
        let next = with_runtime(|rt| {
            let id = rt.pending.borrow_mut().pop_first()?;
            rt.effects.borrow().get(&id).cloned()
        });
        let Some(node) = next else {
            if with_runtime(|rt| rt.pending.borrow().is_empty()) {
                break;
            }
            continue;
        };

        runs += 1;
        if runs > MAX_FLUSH_RUNS {
            log::error!(
                "effect propagation did not settle after {} runs, dropping pending effects",
                MAX_FLUSH_RUNS
            );
            with_runtime(|rt| rt.pending.borrow_mut().clear());
            break;
        }

        if let Err(err) = node.run() {
            node.report(err);
        }
    }
}

#[cfg(test)]
pub(crate) fn live_effects() -> usize {
    with_runtime(|rt| rt.effects.borrow().len())
}
