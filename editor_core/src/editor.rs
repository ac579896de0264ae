//! Main editor logic.

use crate::command::{Command, CommandPriority};
use crate::draft::Draft;
use crate::error::{EditorError, Result};
use crate::node::{NodeKey, NodeType, PARAGRAPH, ROOT, TEXT};
use crate::state::EditorState;
use quire_reactive::{batch, untrack, Disposer};
use std::any::Any;
use std::cell::{Cell, RefCell};
use std::collections::{BTreeSet, HashMap};
use std::rc::{Rc, Weak};

/// Maximum number of transform passes in one update.
const MAX_TRANSFORM_PASSES: usize = 100;

/// Construction options. Node types cannot be added once the editor exists.
#[derive(Debug, Clone, Default)]
pub struct EditorConfig {
    nodes: Vec<NodeType>,
}

impl EditorConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds node types to the schema. Duplicates are ignored.
    pub fn with_nodes(mut self, nodes: impl IntoIterator<Item = NodeType>) -> Self {
        self.nodes.extend(nodes);
        self
    }
}

/// What changed in a committed update.
#[derive(Debug, Clone)]
pub struct UpdateEvent {
    pub prev: Rc<EditorState>,
    pub next: Rc<EditorState>,
    /// Nodes created or modified by the update, including by transforms.
    pub dirty: BTreeSet<NodeKey>,
    pub tags: BTreeSet<&'static str>,
}

impl UpdateEvent {
    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.contains(tag)
    }
}

type CommandHandler = Rc<dyn Fn(&Editor, &dyn Any) -> bool>;
type UpdateListener = Rc<dyn Fn(&Editor, &UpdateEvent)>;
type TickListener = Rc<dyn Fn(&Editor)>;
type Transform = Rc<dyn Fn(&mut Draft, NodeKey) -> Result<()>>;

type ListenerId = u64;

struct CommandEntry {
    id: ListenerId,
    priority: CommandPriority,
    handler: CommandHandler,
}

struct Inner {
    node_types: Rc<BTreeSet<NodeType>>,
    state: RefCell<Rc<EditorState>>,
    updating: Cell<bool>,
    commands: RefCell<HashMap<&'static str, Vec<CommandEntry>>>,
    update_listeners: RefCell<Vec<(ListenerId, UpdateListener)>>,
    transforms: RefCell<Vec<(ListenerId, NodeType, Transform)>>,
    tick_listeners: RefCell<Vec<(ListenerId, TickListener)>>,
    next_listener: Cell<ListenerId>,
}

/// The host engine.
///
/// Cloning an `Editor` clones a handle to the same instance. Listeners and
/// handlers receive the editor as an argument instead of capturing it.
/// Signal reads inside listeners, handlers and transforms are untracked.
#[derive(Clone)]
pub struct Editor {
    inner: Rc<Inner>,
}

/// Clears the `updating` flag even if the update closure panics.
struct UpdateGuard<'a>(&'a Cell<bool>);

impl Drop for UpdateGuard<'_> {
    fn drop(&mut self) {
        self.0.set(false);
    }
}

impl Editor {
    /// Creates an editor whose schema is the built-in node types plus
    /// `config`'s node types.
    pub fn new(config: EditorConfig) -> Self {
        let mut node_types: BTreeSet<NodeType> = [ROOT, PARAGRAPH, TEXT].into_iter().collect();
        node_types.extend(config.nodes);
        log::debug!(
            "creating editor with node types: {}",
            node_types.iter().map(|t| t.name()).collect::<Vec<_>>().join(", ")
        );
        Self {
            inner: Rc::new(Inner {
                node_types: Rc::new(node_types),
                state: RefCell::new(Rc::new(EditorState::new())),
                updating: Cell::new(false),
                commands: RefCell::new(HashMap::new()),
                update_listeners: RefCell::new(Vec::new()),
                transforms: RefCell::new(Vec::new()),
                tick_listeners: RefCell::new(Vec::new()),
                next_listener: Cell::new(1),
            }),
        }
    }

    pub fn has_node_type(&self, kind: NodeType) -> bool {
        self.inner.node_types.contains(&kind)
    }

    pub fn node_types(&self) -> Vec<NodeType> {
        self.inner.node_types.iter().copied().collect()
    }

    /// The committed state.
    pub fn state(&self) -> Rc<EditorState> {
        self.inner.state.borrow().clone()
    }

    pub fn read<R>(&self, f: impl FnOnce(&EditorState) -> R) -> R {
        f(&self.state())
    }

    /// Returns true while an update closure or its transforms are running.
    pub fn is_updating(&self) -> bool {
        self.inner.updating.get()
    }

    fn next_listener_id(&self) -> ListenerId {
        let id = self.inner.next_listener.get();
        self.inner.next_listener.set(id + 1);
        id
    }

    // ==================== Updates ====================

    /// Runs `f` against a draft of the current state and commits the result.
    ///
    /// If `f` or any node transform fails, nothing is committed. Listeners are
    /// only notified when the update changed something.
    pub fn update<R>(&self, f: impl FnOnce(&mut Draft) -> Result<R>) -> Result<R> {
        if self.inner.updating.replace(true) {
            return Err(EditorError::NestedUpdate);
        }
        let (prev, draft, value) = {
            let _guard = UpdateGuard(&self.inner.updating);
            let prev = self.state();
            let mut draft = Draft::new((*prev).clone(), self.inner.node_types.clone());
            let result = f(&mut draft).and_then(|value| {
                untrack(|| self.run_transforms(&mut draft))?;
                Ok(value)
            });
            match result {
                Ok(value) => (prev, draft, value),
                Err(err) => {
                    log::debug!("update discarded: {}", err);
                    return Err(err);
                }
            }
        };
        if !draft.is_changed() {
            return Ok(value);
        }

        let (state, dirty, tags) = draft.into_parts();
        let next = Rc::new(state);
        *self.inner.state.borrow_mut() = next.clone();
        let event = UpdateEvent {
            prev,
            next,
            dirty,
            tags,
        };
        self.notify_update(&event);
        Ok(value)
    }

    fn run_transforms(&self, draft: &mut Draft) -> Result<()> {
        let transforms: Vec<(NodeType, Transform)> = self
            .inner
            .transforms
            .borrow()
            .iter()
            .map(|(_, kind, t)| (*kind, t.clone()))
            .collect();
        if transforms.is_empty() {
            return Ok(());
        }

        for _ in 0..MAX_TRANSFORM_PASSES {
            let pending = draft.take_pending();
            if pending.is_empty() {
                return Ok(());
            }
            for key in pending {
                for (kind, transform) in &transforms {
                    // A previous transform may have removed or retyped the node.
                    let matches = draft.node(key).is_some_and(|n| n.kind() == *kind);
                    if matches {
                        transform(draft, key)?;
                    }
                }
            }
        }
        Err(EditorError::TransformLimit(MAX_TRANSFORM_PASSES))
    }

    fn notify_update(&self, event: &UpdateEvent) {
        let listeners: Vec<UpdateListener> = self
            .inner
            .update_listeners
            .borrow()
            .iter()
            .map(|(_, l)| l.clone())
            .collect();
        batch(|| {
            untrack(|| {
                for listener in listeners {
                    listener(self, event);
                }
            })
        });
    }

    // ==================== Commands ====================

    /// Registers a command handler. Dispose or drop the result to unregister.
    pub fn register_command<P: 'static>(
        &self,
        command: &Command<P>,
        priority: CommandPriority,
        handler: impl Fn(&Editor, &P) -> bool + 'static,
    ) -> Disposer {
        let id = self.next_listener_id();
        let handler: CommandHandler = Rc::new(move |editor, payload| {
            payload
                .downcast_ref::<P>()
                .is_some_and(|payload| handler(editor, payload))
        });
        {
            let mut commands = self.inner.commands.borrow_mut();
            let entries = commands.entry(command.id()).or_default();
            // Keep entries sorted by descending priority, registration order within a priority.
            let index = entries
                .iter()
                .position(|e| e.priority < priority)
                .unwrap_or(entries.len());
            entries.insert(
                index,
                CommandEntry {
                    id,
                    priority,
                    handler,
                },
            );
        }

        let command_id = command.id();
        let inner = Rc::downgrade(&self.inner);
        Disposer::new(move || {
            if let Some(inner) = inner.upgrade() {
                let mut commands = inner.commands.borrow_mut();
                if let Some(entries) = commands.get_mut(command_id) {
                    entries.retain(|e| e.id != id);
                    if entries.is_empty() {
                        commands.remove(command_id);
                    }
                }
            }
        })
    }

    /// Runs handlers for `command` until one returns `true`.
    pub fn dispatch_command<P: 'static>(&self, command: &Command<P>, payload: P) -> bool {
        let handlers: Vec<CommandHandler> = self
            .inner
            .commands
            .borrow()
            .get(command.id())
            .map(|entries| entries.iter().map(|e| e.handler.clone()).collect())
            .unwrap_or_default();
        if handlers.is_empty() {
            log::trace!("no handlers for command `{}`", command.id());
            return false;
        }
        batch(|| untrack(|| handlers.iter().any(|handler| handler(self, &payload))))
    }

    // ==================== Listeners ====================

    /// Registers a listener called after every committed update.
    pub fn register_update_listener(
        &self,
        listener: impl Fn(&Editor, &UpdateEvent) + 'static,
    ) -> Disposer {
        let id = self.next_listener_id();
        self.inner
            .update_listeners
            .borrow_mut()
            .push((id, Rc::new(listener)));
        let inner = Rc::downgrade(&self.inner);
        Disposer::new(move || {
            if let Some(inner) = inner.upgrade() {
                inner.update_listeners.borrow_mut().retain(|(i, _)| *i != id);
            }
        })
    }

    /// Registers a transform run on every dirty node of `kind` before an
    /// update commits.
    pub fn register_node_transform(
        &self,
        kind: NodeType,
        transform: impl Fn(&mut Draft, NodeKey) -> Result<()> + 'static,
    ) -> Result<Disposer> {
        if !self.has_node_type(kind) {
            return Err(EditorError::UnknownNodeType(kind));
        }
        let id = self.next_listener_id();
        self.inner
            .transforms
            .borrow_mut()
            .push((id, kind, Rc::new(transform)));
        let inner = Rc::downgrade(&self.inner);
        Ok(Disposer::new(move || {
            if let Some(inner) = inner.upgrade() {
                inner.transforms.borrow_mut().retain(|(i, _, _)| *i != id);
            }
        }))
    }

    /// Registers a listener called on every [`Editor::tick`].
    pub fn register_tick_listener(&self, listener: impl Fn(&Editor) + 'static) -> Disposer {
        let id = self.next_listener_id();
        self.inner
            .tick_listeners
            .borrow_mut()
            .push((id, Rc::new(listener)));
        let inner: Weak<Inner> = Rc::downgrade(&self.inner);
        Disposer::new(move || {
            if let Some(inner) = inner.upgrade() {
                inner.tick_listeners.borrow_mut().retain(|(i, _)| *i != id);
            }
        })
    }

    /// Advances time by one frame. The embedding event loop calls this
    /// periodically so extensions can poll background work.
    pub fn tick(&self) {
        let listeners: Vec<TickListener> = self
            .inner
            .tick_listeners
            .borrow()
            .iter()
            .map(|(_, l)| l.clone())
            .collect();
        batch(|| {
            untrack(|| {
                for listener in listeners {
                    listener(self);
                }
            })
        });
    }

    /// Total number of registered command handlers, listeners and transforms.
    pub fn listener_count(&self) -> usize {
        let commands: usize = self.inner.commands.borrow().values().map(Vec::len).sum();
        commands
            + self.inner.update_listeners.borrow().len()
            + self.inner.transforms.borrow().len()
            + self.inner.tick_listeners.borrow().len()
    }
}
