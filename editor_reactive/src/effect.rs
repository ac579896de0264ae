//! Effects: side-effecting closures that re-run when their dependencies change.

use crate::dispose::Disposer;
use crate::runtime::{self, batch, untrack, EffectId, Source, SourceId, TrackingGuard};
use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::fmt;
use std::rc::{Rc, Weak};

/// Receives errors from effects that fail on a re-run. The first argument is
/// the effect's name.
pub type ErrorHook = Rc<dyn Fn(&str, &anyhow::Error)>;

type Body = Box<dyn FnMut() -> anyhow::Result<Disposer>>;

/// Options for [`try_effect`].
#[derive(Clone, Default)]
pub struct EffectOptions {
    name: Option<String>,
    on_error: Option<ErrorHook>,
}

impl EffectOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Names the effect in logs and error reports.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Installs a hook that receives the error when a re-run fails.
    pub fn with_error_hook(mut self, hook: ErrorHook) -> Self {
        self.on_error = Some(hook);
        self
    }
}

pub(crate) struct EffectNode {
    pub(crate) id: EffectId,
    name: String,
    body: RefCell<Body>,
    cleanup: RefCell<Option<Disposer>>,
    deps: RefCell<HashMap<SourceId, Weak<dyn Source>>>,
    stopped: Cell<bool>,
    on_error: Option<ErrorHook>,
}

impl EffectNode {
    pub(crate) fn add_dependency(&self, id: SourceId, source: Weak<dyn Source>) {
        self.deps.borrow_mut().entry(id).or_insert(source);
    }

    fn clear_dependencies(&self) {
        let deps: Vec<_> = self.deps.borrow_mut().drain().map(|(_, s)| s).collect();
        for source in deps {
            if let Some(source) = source.upgrade() {
                source.remove_observer(self.id);
            }
        }
    }

    fn run_cleanup(&self) {
        let cleanup = self.cleanup.borrow_mut().take();
        if let Some(cleanup) = cleanup {
            untrack(|| cleanup.dispose());
        }
    }

    /// Runs the previous cleanup, then the body with fresh dependency
    /// tracking. On error the effect is stopped before returning.
    pub(crate) fn run(&self) -> anyhow::Result<()> {
        if self.stopped.get() {
            return Ok(());
        }
        batch(|| {
            self.run_cleanup();
            self.clear_dependencies();
            if self.stopped.get() {
                return Ok(());
            }

            log::trace!("running effect `{}`", self.name);
            let result = {
                let _tracking = TrackingGuard::push(Some(self.id));
                let mut body = self.body.borrow_mut();
                (body)()
            };

            match result {
                Ok(cleanup) if self.stopped.get() => {
                    // Stopped from inside its own body.
                    untrack(|| cleanup.dispose());
                    Ok(())
                }
                Ok(cleanup) => {
                    *self.cleanup.borrow_mut() = Some(cleanup);
                    Ok(())
                }
                Err(err) => {
                    self.stop();
                    Err(err)
                }
            }
        })
    }

    pub(crate) fn stop(&self) {
        if self.stopped.replace(true) {
            return;
        }
        runtime::unregister_effect(self.id);
        self.clear_dependencies();
        batch(|| self.run_cleanup());
    }

    /// Reports a failure from a re-run. The effect is already stopped.
    pub(crate) fn report(&self, err: anyhow::Error) {
        log::error!("effect `{}` failed and was stopped: {:#}", self.name, err);
        if let Some(hook) = &self.on_error {
            hook(&self.name, &err);
        }
    }
}

impl Drop for EffectNode {
    fn drop(&mut self) {
        // Only effects that were never stopped still hold a cleanup here, and
        // those are dropped with the runtime at thread exit, when the cleanup
        // can no longer reach it.
        if let Some(cleanup) = self.cleanup.get_mut().take() {
            cleanup.forget();
        }
    }
}

/// Handle to a running effect.
#[derive(Clone)]
#[must_use = "an Effect keeps running until stopped"]
pub struct Effect {
    node: Rc<EffectNode>,
}

impl Effect {
    /// Stops the effect and runs its last cleanup. Further calls do nothing.
    pub fn stop(&self) {
        self.node.stop();
    }

    pub fn is_stopped(&self) -> bool {
        self.node.stopped.get()
    }

    pub fn name(&self) -> &str {
        &self.node.name
    }

    /// Number of signals read during the most recent run.
    pub fn dependency_count(&self) -> usize {
        self.node.deps.borrow().len()
    }

    /// Converts the handle into a disposer that stops the effect.
    pub fn into_disposer(self) -> Disposer {
        Disposer::new(move || self.stop())
    }
}

impl fmt::Debug for Effect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Effect")
            .field("name", &self.node.name)
            .field("stopped", &self.node.stopped.get())
            .finish()
    }
}

/// Runs `f` now and again whenever a signal it read changes. The returned
/// disposer runs before the next run and when the effect is stopped.
pub fn effect(mut f: impl FnMut() -> Disposer + 'static) -> Effect {
    let node = create(EffectOptions::new(), Box::new(move || Ok(f())));
    // An infallible body cannot fail its first run.
    let _ = node.run();
    Effect { node }
}

/// Fallible form of [`effect`]. An error from the first run is returned with
/// the effect already stopped. Errors from later runs stop the effect, get
/// logged, and go to the error hook in `options`.
pub fn try_effect(
    options: EffectOptions,
    f: impl FnMut() -> anyhow::Result<Disposer> + 'static,
) -> anyhow::Result<Effect> {
    let node = create(options, Box::new(f));
    node.run()?;
    Ok(Effect { node })
}

fn create(options: EffectOptions, body: Body) -> Rc<EffectNode> {
    let id = runtime::next_id();
    let node = Rc::new(EffectNode {
        id,
        name: options.name.unwrap_or_else(|| format!("effect-{}", id)),
        body: RefCell::new(body),
        cleanup: RefCell::new(None),
        deps: RefCell::new(HashMap::new()),
        stopped: Cell::new(false),
        on_error: options.on_error,
    });
    runtime::register_effect(node.clone());
    node
}
