//! Extension descriptors and the context handed to their callbacks.

use crate::config::{Config, ConfigBag, ConfigValue, DISABLED_KEY};
use crate::error::{ComposeError, Result};
use quire_core::{Editor, NodeType};
use quire_reactive::Disposer;
use serde_json::Value;
use std::any::{type_name, Any};
use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::marker::PhantomData;
use std::rc::Rc;

type Output = Rc<dyn Any>;
type BuildFn = Rc<dyn Fn(&ExtensionContext) -> anyhow::Result<Output>>;
type RegisterFn = Rc<dyn Fn(&ExtensionContext, &dyn Any) -> anyhow::Result<Disposer>>;

/// Outputs of the extensions built so far, by name.
pub(crate) type Outputs = Rc<RefCell<HashMap<String, Output>>>;

/// A reusable extension template.
///
/// Descriptors hold no per-composition state; composing the same descriptor
/// twice produces two independent instances. Cloning is cheap.
#[derive(Clone)]
pub struct Extension {
    name: String,
    config: ConfigBag,
    nodes: Vec<NodeType>,
    requires: Vec<String>,
    build: Option<BuildFn>,
    register: Option<RegisterFn>,
}

impl Extension {
    /// Starts describing an extension called `name`.
    pub fn builder(name: impl Into<String>) -> ExtensionBuilder<()> {
        ExtensionBuilder {
            name: name.into(),
            config: ConfigBag::new(),
            nodes: Vec::new(),
            requires: Vec::new(),
            build: None,
            register: None,
            _output: PhantomData,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Default config, including the implicit `disabled` key.
    pub fn config(&self) -> &ConfigBag {
        &self.config
    }

    pub fn nodes(&self) -> &[NodeType] {
        &self.nodes
    }

    pub fn requires(&self) -> &[String] {
        &self.requires
    }

    pub(crate) fn run_build(&self, ctx: &ExtensionContext) -> anyhow::Result<Output> {
        match &self.build {
            Some(build) => build(ctx),
            None => Ok(Rc::new(())),
        }
    }

    pub(crate) fn register_fn(&self) -> Option<RegisterFn> {
        self.register.clone()
    }
}

impl fmt::Debug for Extension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Extension")
            .field("name", &self.name)
            .field("config", &self.config)
            .field("nodes", &self.nodes)
            .field("requires", &self.requires)
            .field("build", &self.build.is_some())
            .field("register", &self.register.is_some())
            .finish()
    }
}

/// Builder for [`Extension`]. `O` is the type `build` produces, which
/// `register` receives.
pub struct ExtensionBuilder<O> {
    name: String,
    config: ConfigBag,
    nodes: Vec<NodeType>,
    requires: Vec<String>,
    build: Option<BuildFn>,
    register: Option<RegisterFn>,
    _output: PhantomData<fn() -> O>,
}

impl<O: 'static> ExtensionBuilder<O> {
    /// Declares a config key and its default.
    pub fn config(mut self, key: impl Into<String>, default: impl Into<ConfigValue>) -> Self {
        self.config.insert(key.into(), default.into());
        self
    }

    /// Declares a node type the editor must know about.
    pub fn node(mut self, node: NodeType) -> Self {
        self.nodes.push(node);
        self
    }

    pub fn nodes(mut self, nodes: impl IntoIterator<Item = NodeType>) -> Self {
        self.nodes.extend(nodes);
        self
    }

    /// Declares that `name` must be built and registered before this one.
    pub fn requires(mut self, name: impl Into<String>) -> Self {
        self.requires.push(name.into());
        self
    }

    /// Sets the build step. Its output is readable by dependents and by the
    /// composition's owner. Call this before [`register`](Self::register):
    /// a register step set earlier expects the old output type and is
    /// discarded.
    pub fn build<P: 'static>(
        self,
        build: impl Fn(&ExtensionContext) -> anyhow::Result<P> + 'static,
    ) -> ExtensionBuilder<P> {
        if self.register.is_some() {
            log::warn!(
                "extension `{}`: build set after register; the register step was discarded",
                self.name
            );
        }
        ExtensionBuilder {
            name: self.name,
            config: self.config,
            nodes: self.nodes,
            requires: self.requires,
            build: Some(Rc::new(move |ctx| Ok(Rc::new(build(ctx)?) as Output))),
            register: None,
            _output: PhantomData,
        }
    }

    /// Sets the register step. It runs inside an effect: when a config key it
    /// read changes, the returned disposer runs and `register` runs again.
    pub fn register(
        mut self,
        register: impl Fn(&ExtensionContext, &O) -> anyhow::Result<Disposer> + 'static,
    ) -> Self {
        self.register = Some(Rc::new(move |ctx, output| {
            let output = output.downcast_ref::<O>().ok_or_else(|| {
                anyhow::anyhow!("build output is not a `{}`", type_name::<O>())
            })?;
            register(ctx, output)
        }));
        self
    }

    /// Validates the descriptor.
    pub fn define(mut self) -> Result<Extension> {
        let name = self.name.trim();
        if name.is_empty() {
            return Err(ComposeError::EmptyName);
        }
        self.config
            .entry(DISABLED_KEY.to_string())
            .or_insert(ConfigValue::Plain(Value::Bool(false)));
        Ok(Extension {
            name: name.to_string(),
            config: self.config,
            nodes: self.nodes,
            requires: self.requires,
            build: self.build,
            register: self.register,
        })
    }
}

/// What `build` and `register` see of the running composition.
#[derive(Clone)]
pub struct ExtensionContext {
    name: Rc<str>,
    editor: Editor,
    config: Config,
    outputs: Outputs,
    cleanups: Rc<RefCell<Vec<Disposer>>>,
}

impl ExtensionContext {
    pub(crate) fn new(
        name: &str,
        editor: Editor,
        config: Config,
        outputs: Outputs,
        cleanups: Rc<RefCell<Vec<Disposer>>>,
    ) -> Self {
        Self {
            name: Rc::from(name),
            editor,
            config,
            outputs,
            cleanups,
        }
    }

    /// Name of the extension being built or registered.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn editor(&self) -> &Editor {
        &self.editor
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Output of an extension built earlier in this composition.
    pub fn output<T: Clone + 'static>(&self, name: &str) -> Result<T> {
        read_output(&self.outputs, name)
    }

    /// Runs `disposer` when the composition is disposed, after every
    /// registration has been torn down.
    pub fn on_dispose(&self, disposer: Disposer) {
        self.cleanups.borrow_mut().push(disposer);
    }
}

pub(crate) fn read_output<T: Clone + 'static>(outputs: &Outputs, name: &str) -> Result<T> {
    let outputs = outputs.borrow();
    let output = outputs
        .get(name)
        .ok_or_else(|| ComposeError::UnknownOutput(name.to_string()))?;
    output
        .downcast_ref::<T>()
        .cloned()
        .ok_or_else(|| ComposeError::OutputType {
            extension: name.to_string(),
            expected: type_name::<T>(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use quire_core::NodeType;
    use serde_json::json;

    const BADGE: NodeType = NodeType::inline("badge");

    #[test]
    fn test_define_rejects_blank_name() {
        assert!(matches!(
            Extension::builder("  ").define(),
            Err(ComposeError::EmptyName)
        ));
    }

    #[test]
    fn test_define_adds_disabled_key() {
        let ext = Extension::builder("badges")
            .config("color", json!("red"))
            .node(BADGE)
            .requires("rich-text")
            .define()
            .unwrap();
        assert_eq!(ext.name(), "badges");
        assert_eq!(ext.config()[DISABLED_KEY].current(), json!(false));
        assert_eq!(ext.config()["color"].current(), json!("red"));
        assert_eq!(ext.nodes(), &[BADGE]);
        assert_eq!(ext.requires(), &["rich-text".to_string()]);
    }

    #[test]
    fn test_explicit_disabled_default_is_kept() {
        let ext = Extension::builder("off")
            .config(DISABLED_KEY, json!(true))
            .define()
            .unwrap();
        assert_eq!(ext.config()[DISABLED_KEY].current(), json!(true));
    }

    #[test]
    fn test_build_after_register_discards_register() {
        let ext = Extension::builder("late")
            .register(|_, _: &()| Ok(Disposer::noop()))
            .build(|_| Ok(7u8))
            .define()
            .unwrap();
        assert!(ext.register_fn().is_none());

        let ext = Extension::builder("ordered")
            .build(|_| Ok(7u8))
            .register(|_, _: &u8| Ok(Disposer::noop()))
            .define()
            .unwrap();
        assert!(ext.register_fn().is_some());
    }

    #[test]
    fn test_output_lookup() {
        let outputs: Outputs = Rc::default();
        outputs
            .borrow_mut()
            .insert("counter".into(), Rc::new(41u32) as Output);

        assert_eq!(read_output::<u32>(&outputs, "counter").unwrap(), 41);
        assert!(matches!(
            read_output::<String>(&outputs, "counter"),
            Err(ComposeError::OutputType { .. })
        ));
        assert!(matches!(
            read_output::<u32>(&outputs, "missing"),
            Err(ComposeError::UnknownOutput(_))
        ));
    }
}
