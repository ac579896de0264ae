//! The composition root: validates descriptors, builds the editor and runs
//! every extension's lifecycle in dependency order.

use crate::config::{merge_config, Config, ConfigBag, Overrides};
use crate::error::{ComposeError, Result};
use crate::extension::{read_output, Extension, ExtensionContext, Outputs};
use quire_core::{Editor, EditorConfig, NodeType};
use quire_reactive::{try_effect, Disposer, Effect, EffectOptions, ErrorHook};
use std::cell::{Cell, RefCell};
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::rc::Rc;

/// Options for [`compose_with`].
#[derive(Clone, Default)]
pub struct ComposeOptions {
    on_error: Option<ErrorHook>,
}

impl ComposeOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Receives errors from registrations that fail when re-run after a
    /// config change. The failing extension stays unregistered.
    pub fn on_error(mut self, hook: impl Fn(&str, &anyhow::Error) + 'static) -> Self {
        self.on_error = Some(Rc::new(hook));
        self
    }
}

impl fmt::Debug for ComposeOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComposeOptions")
            .field("on_error", &self.on_error.is_some())
            .finish()
    }
}

struct Instance {
    name: String,
    config: Config,
    effect: Option<Effect>,
}

/// A running set of extensions around one editor.
///
/// Dropping a live composition disposes it.
pub struct Composition {
    editor: Editor,
    instances: Vec<Instance>,
    outputs: Outputs,
    cleanups: Rc<RefCell<Vec<Disposer>>>,
    disposed: Cell<bool>,
}

/// Composes `extensions` with `overrides` applied.
pub fn compose(extensions: &[Extension], overrides: Overrides) -> Result<Composition> {
    compose_with(extensions, overrides, ComposeOptions::default())
}

/// [`compose`] with explicit options.
pub fn compose_with(
    extensions: &[Extension],
    overrides: Overrides,
    options: ComposeOptions,
) -> Result<Composition> {
    let configs = validate(extensions, &overrides)?;
    let order = build_order(extensions)?;

    let nodes = collect_nodes(extensions);
    let editor = Editor::new(EditorConfig::new().with_nodes(nodes));

    let mut composition = Composition {
        editor,
        instances: Vec::with_capacity(extensions.len()),
        outputs: Rc::default(),
        cleanups: Rc::default(),
        disposed: Cell::new(false),
    };

    for index in order {
        let extension = &extensions[index];
        let bag = configs[index].clone();
        if let Err(err) = composition.start(extension, bag, &options) {
            log::debug!("composition failed at `{}`; tearing down", extension.name());
            composition.teardown();
            return Err(err);
        }
    }

    log::debug!(
        "composed {} extensions: {}",
        composition.instances.len(),
        composition.names()?.collect::<Vec<_>>().join(", ")
    );
    Ok(composition)
}

/// Checks names and overrides and merges each extension's config.
fn validate(extensions: &[Extension], overrides: &Overrides) -> Result<Vec<ConfigBag>> {
    let mut seen = HashSet::new();
    for extension in extensions {
        if !seen.insert(extension.name()) {
            return Err(ComposeError::DuplicateName(extension.name().to_string()));
        }
    }
    if let Some(unknown) = overrides.extensions().find(|name| !seen.contains(name)) {
        return Err(ComposeError::UnknownExtension(unknown.to_string()));
    }

    let configs = extensions
        .iter()
        .map(|ext| merge_config(ext.name(), ext.config(), overrides.for_extension(ext.name())))
        .collect::<Result<Vec<_>>>()?;

    for extension in extensions {
        if let Some(missing) = extension.requires().iter().find(|r| !seen.contains(r.as_str())) {
            return Err(ComposeError::MissingRequirement {
                extension: extension.name().to_string(),
                requires: missing.clone(),
            });
        }
    }
    Ok(configs)
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Mark {
    Visiting,
    Done,
}

/// Orders extensions so requirements come first. Otherwise input order is
/// kept.
fn build_order(extensions: &[Extension]) -> Result<Vec<usize>> {
    let index: HashMap<&str, usize> = extensions
        .iter()
        .enumerate()
        .map(|(i, ext)| (ext.name(), i))
        .collect();
    let mut marks: HashMap<usize, Mark> = HashMap::new();
    let mut order = Vec::with_capacity(extensions.len());
    let mut path = Vec::new();

    fn visit(
        node: usize,
        extensions: &[Extension],
        index: &HashMap<&str, usize>,
        marks: &mut HashMap<usize, Mark>,
        path: &mut Vec<usize>,
        order: &mut Vec<usize>,
    ) -> Result<()> {
        match marks.get(&node) {
            Some(Mark::Done) => return Ok(()),
            Some(Mark::Visiting) => {
                let start = path.iter().position(|&n| n == node).unwrap_or(0);
                let chain = path[start..]
                    .iter()
                    .chain(std::iter::once(&node))
                    .map(|&n| extensions[n].name().to_string())
                    .collect();
                return Err(ComposeError::Cycle { chain });
            }
            None => {}
        }
        marks.insert(node, Mark::Visiting);
        path.push(node);
        for requirement in extensions[node].requires() {
            if let Some(&dep) = index.get(requirement.as_str()) {
                visit(dep, extensions, index, marks, path, order)?;
            }
        }
        path.pop();
        marks.insert(node, Mark::Done);
        order.push(node);
        Ok(())
    }

    for node in 0..extensions.len() {
        visit(node, extensions, &index, &mut marks, &mut path, &mut order)?;
    }
    Ok(order)
}

/// Union of every extension's node types in first-seen order.
fn collect_nodes(extensions: &[Extension]) -> Vec<NodeType> {
    let mut seen = HashSet::new();
    extensions
        .iter()
        .flat_map(|ext| ext.nodes().iter().copied())
        .filter(|node| seen.insert(*node))
        .collect()
}

impl Composition {
    fn start(&mut self, extension: &Extension, bag: ConfigBag, options: &ComposeOptions) -> Result<()> {
        let name = extension.name();
        let config = Config::new(name, bag);
        let ctx = ExtensionContext::new(
            name,
            self.editor.clone(),
            config.clone(),
            self.outputs.clone(),
            self.cleanups.clone(),
        );

        log::debug!("building extension `{}`", name);
        let output = extension.run_build(&ctx).map_err(|source| ComposeError::Build {
            extension: name.to_string(),
            source,
        })?;
        self.outputs
            .borrow_mut()
            .insert(name.to_string(), output.clone());

        let effect = match extension.register_fn() {
            Some(register) => {
                log::debug!("registering extension `{}`", name);
                let mut effect_options = EffectOptions::new().with_name(name);
                if let Some(hook) = &options.on_error {
                    effect_options = effect_options.with_error_hook(hook.clone());
                }
                let body = move || {
                    if ctx.config().is_disabled() {
                        log::trace!("extension `{}` is disabled", ctx.name());
                        return Ok(Disposer::noop());
                    }
                    register(&ctx, output.as_ref())
                };
                let effect = try_effect(effect_options, body).map_err(|source| {
                    ComposeError::Register {
                        extension: name.to_string(),
                        source,
                    }
                })?;
                Some(effect)
            }
            None => None,
        };

        self.instances.push(Instance {
            name: name.to_string(),
            config,
            effect,
        });
        Ok(())
    }

    /// Stops every registration in reverse order, then runs build cleanups in
    /// reverse order.
    fn teardown(&mut self) {
        for instance in self.instances.iter().rev() {
            if let Some(effect) = &instance.effect {
                log::debug!("unregistering extension `{}`", instance.name);
                effect.stop();
            }
        }
        let cleanups: Vec<Disposer> = self.cleanups.borrow_mut().drain(..).collect();
        for cleanup in cleanups.into_iter().rev() {
            cleanup.dispose();
        }
        self.disposed.set(true);
    }

    fn check_alive(&self) -> Result<()> {
        if self.disposed.get() {
            Err(ComposeError::Disposed)
        } else {
            Ok(())
        }
    }

    /// Tears down every extension. A second call returns
    /// [`ComposeError::Disposed`] and does nothing.
    pub fn dispose(&mut self) -> Result<()> {
        self.check_alive()?;
        log::debug!("disposing composition");
        self.teardown();
        Ok(())
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed.get()
    }

    pub fn editor(&self) -> Result<&Editor> {
        self.check_alive()?;
        Ok(&self.editor)
    }

    /// Build output of the extension called `name`.
    pub fn output<T: Clone + 'static>(&self, name: &str) -> Result<T> {
        self.check_alive()?;
        read_output(&self.outputs, name)
    }

    /// Live config of the extension called `name`.
    pub fn config(&self, name: &str) -> Result<Config> {
        self.check_alive()?;
        self.instances
            .iter()
            .find(|i| i.name == name)
            .map(|i| i.config.clone())
            .ok_or_else(|| ComposeError::NotComposed(name.to_string()))
    }

    /// Extension names in registration order.
    pub fn names(&self) -> Result<impl Iterator<Item = &str>> {
        self.check_alive()?;
        Ok(self.instances.iter().map(|i| i.name.as_str()))
    }

    /// Returns true if the registration of `name` is still running. It stops
    /// after a failed re-run.
    pub fn is_registered(&self, name: &str) -> Result<bool> {
        self.check_alive()?;
        let instance = self
            .instances
            .iter()
            .find(|i| i.name == name)
            .ok_or_else(|| ComposeError::NotComposed(name.to_string()))?;
        Ok(instance.effect.as_ref().is_some_and(|e| !e.is_stopped()))
    }
}

impl Drop for Composition {
    fn drop(&mut self) {
        if !self.disposed.get() {
            self.teardown();
        }
    }
}

impl fmt::Debug for Composition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Composition")
            .field(
                "extensions",
                &self.instances.iter().map(|i| i.name.as_str()).collect::<Vec<_>>(),
            )
            .field("disposed", &self.disposed.get())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ext(name: &str, requires: &[&str]) -> Extension {
        requires
            .iter()
            .fold(Extension::builder(name), |b, r| b.requires(*r))
            .define()
            .unwrap()
    }

    fn names(extensions: &[Extension], order: &[usize]) -> Vec<String> {
        order.iter().map(|&i| extensions[i].name().to_string()).collect()
    }

    #[test]
    fn test_build_order_puts_requirements_first() {
        let extensions = [ext("c", &["b"]), ext("a", &[]), ext("b", &["a"]), ext("d", &[])];
        let order = build_order(&extensions).unwrap();
        assert_eq!(names(&extensions, &order), vec!["a", "b", "c", "d"]);
    }

    #[test]
    fn test_build_order_reports_cycle_chain() {
        let extensions = [ext("x", &[]), ext("a", &["b"]), ext("b", &["c"]), ext("c", &["a"])];
        match build_order(&extensions) {
            Err(ComposeError::Cycle { chain }) => assert_eq!(chain, vec!["a", "b", "c", "a"]),
            other => panic!("expected cycle, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn test_self_requirement_is_a_cycle() {
        let extensions = [ext("a", &["a"])];
        let err = build_order(&extensions).unwrap_err();
        assert_eq!(err.to_string(), "requirement cycle: a -> a");
    }

    #[test]
    fn test_nodes_are_deduplicated_in_first_seen_order() {
        const A: NodeType = NodeType::block("a");
        const B: NodeType = NodeType::inline("b");
        let extensions = [
            Extension::builder("one").nodes([B, A]).define().unwrap(),
            Extension::builder("two").node(A).define().unwrap(),
        ];
        assert_eq!(collect_nodes(&extensions), vec![B, A]);
    }
}
