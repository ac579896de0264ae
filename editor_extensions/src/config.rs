//! Extension configuration: defaults, overrides and per-key signals.

use crate::error::{ComposeError, Result};
use quire_reactive::Signal;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;
use std::rc::Rc;

/// Config key every extension carries implicitly.
pub const DISABLED_KEY: &str = "disabled";

/// A configuration value: either plain data or a signal owned by the caller.
///
/// Signals are shared, not copied, so whoever created one can change the
/// value while the composition is running.
#[derive(Clone)]
pub enum ConfigValue {
    Plain(Value),
    Signal(Signal<Value>),
}

impl ConfigValue {
    /// Reads the current value without tracking.
    pub fn current(&self) -> Value {
        match self {
            ConfigValue::Plain(value) => value.clone(),
            ConfigValue::Signal(signal) => signal.peek(),
        }
    }

    fn into_signal(self) -> Signal<Value> {
        match self {
            ConfigValue::Plain(value) => Signal::new(value),
            ConfigValue::Signal(signal) => signal,
        }
    }
}

impl From<Value> for ConfigValue {
    fn from(value: Value) -> Self {
        ConfigValue::Plain(value)
    }
}

impl From<Signal<Value>> for ConfigValue {
    fn from(signal: Signal<Value>) -> Self {
        ConfigValue::Signal(signal)
    }
}

impl fmt::Debug for ConfigValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigValue::Plain(value) => write!(f, "Plain({})", value),
            ConfigValue::Signal(signal) => write!(f, "Signal({})", signal.peek()),
        }
    }
}

/// Named config values of one extension.
pub type ConfigBag = BTreeMap<String, ConfigValue>;

/// Shallow-merges `overrides` over `defaults`. Keys missing from the
/// overrides keep their defaults; keys missing from the defaults are errors.
pub fn merge_config(
    extension: &str,
    defaults: &ConfigBag,
    overrides: Option<&ConfigBag>,
) -> Result<ConfigBag> {
    let mut merged = defaults.clone();
    for (key, value) in overrides.into_iter().flatten() {
        match merged.get_mut(key) {
            Some(slot) => *slot = value.clone(),
            None => {
                return Err(ComposeError::UnknownConfigKey {
                    extension: extension.to_string(),
                    key: key.clone(),
                })
            }
        }
    }
    Ok(merged)
}

#[derive(Deserialize)]
#[serde(transparent)]
struct OverridesFile(BTreeMap<String, BTreeMap<String, Value>>);

/// Per-extension config overrides supplied by the client.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    entries: BTreeMap<String, ConfigBag>,
}

impl Overrides {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds one override.
    pub fn set(
        mut self,
        extension: impl Into<String>,
        key: impl Into<String>,
        value: impl Into<ConfigValue>,
    ) -> Self {
        self.entries
            .entry(extension.into())
            .or_default()
            .insert(key.into(), value.into());
        self
    }

    /// Parses overrides from a JSON object of objects, for example
    /// `{"max-length": {"max_length": 20}}`.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let file: OverridesFile =
            serde_json::from_str(json).map_err(ComposeError::InvalidOverrides)?;
        let entries = file
            .0
            .into_iter()
            .map(|(name, values)| {
                let bag = values
                    .into_iter()
                    .map(|(key, value)| (key, ConfigValue::Plain(value)))
                    .collect();
                (name, bag)
            })
            .collect();
        Ok(Self { entries })
    }

    /// Reads overrides from a JSON file.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|source| ComposeError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&json)
    }

    /// Merges `other` over `self`, key by key.
    pub fn merge(mut self, other: Overrides) -> Self {
        for (name, bag) in other.entries {
            self.entries.entry(name).or_default().extend(bag);
        }
        self
    }

    pub fn for_extension(&self, name: &str) -> Option<&ConfigBag> {
        self.entries.get(name)
    }

    /// Names of the extensions these overrides target.
    pub fn extensions(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// The live configuration of one extension instance.
///
/// Every key is its own signal, so an effect only re-runs when a key it
/// actually read changes. Cloning shares the signals.
#[derive(Clone)]
pub struct Config {
    extension: Rc<str>,
    values: Rc<BTreeMap<String, Signal<Value>>>,
}

impl Config {
    pub(crate) fn new(extension: &str, bag: ConfigBag) -> Self {
        let values = bag
            .into_iter()
            .map(|(key, value)| (key, value.into_signal()))
            .collect();
        Self {
            extension: Rc::from(extension),
            values: Rc::new(values),
        }
    }

    pub fn extension(&self) -> &str {
        &self.extension
    }

    fn unknown_key(&self, key: &str) -> ComposeError {
        ComposeError::UnknownConfigKey {
            extension: self.extension.to_string(),
            key: key.to_string(),
        }
    }

    /// The signal behind `key`.
    pub fn signal(&self, key: &str) -> Result<Signal<Value>> {
        self.values
            .get(key)
            .cloned()
            .ok_or_else(|| self.unknown_key(key))
    }

    /// Reads `key` as JSON, registering a dependency.
    pub fn value(&self, key: &str) -> Result<Value> {
        Ok(self.signal(key)?.get())
    }

    /// Reads `key` and deserializes it, registering a dependency.
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Result<T> {
        let value = self.value(key)?;
        serde_json::from_value(value).map_err(|source| ComposeError::Config {
            key: key.to_string(),
            source,
        })
    }

    /// Writes `key`. Effects that read it re-run.
    pub fn set(&self, key: &str, value: impl Into<Value>) -> Result<()> {
        self.signal(key)?.set(value.into());
        Ok(())
    }

    /// Reads the implicit `disabled` flag, registering a dependency.
    /// Anything other than `true` counts as enabled.
    pub fn is_disabled(&self) -> bool {
        self.values
            .get(DISABLED_KEY)
            .is_some_and(|signal| signal.with(|v| v.as_bool() == Some(true)))
    }

    pub fn set_disabled(&self, disabled: bool) -> Result<()> {
        self.set(DISABLED_KEY, disabled)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let values: BTreeMap<&str, Value> = self
            .values
            .iter()
            .map(|(k, s)| (k.as_str(), s.peek()))
            .collect();
        f.debug_struct("Config")
            .field("extension", &self.extension)
            .field("values", &values)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quire_reactive::effect;
    use quire_reactive::Disposer;
    use serde_json::json;
    use std::cell::Cell;

    fn defaults() -> ConfigBag {
        let mut bag = ConfigBag::new();
        bag.insert("max_length".into(), json!(280).into());
        bag.insert("strict".into(), json!(false).into());
        bag.insert(DISABLED_KEY.into(), json!(false).into());
        bag
    }

    #[test]
    fn test_merge_keeps_unset_defaults() {
        let overrides = Overrides::new().set("max-length", "max_length", json!(20));
        let merged =
            merge_config("max-length", &defaults(), overrides.for_extension("max-length")).unwrap();
        assert_eq!(merged["max_length"].current(), json!(20));
        assert_eq!(merged["strict"].current(), json!(false));
    }

    #[test]
    fn test_merge_rejects_unknown_key() {
        let overrides = Overrides::new().set("max-length", "maxLength", json!(20));
        let err = merge_config("max-length", &defaults(), overrides.for_extension("max-length"))
            .unwrap_err();
        assert!(matches!(
            err,
            ComposeError::UnknownConfigKey { ref extension, ref key }
                if extension == "max-length" && key == "maxLength"
        ));
    }

    #[test]
    fn test_overrides_from_json() {
        let overrides =
            Overrides::from_json_str(r#"{"max-length": {"max_length": 20}, "history": {}}"#)
                .unwrap();
        assert_eq!(overrides.extensions().collect::<Vec<_>>(), vec!["history", "max-length"]);
        let bag = overrides.for_extension("max-length").unwrap();
        assert_eq!(bag["max_length"].current(), json!(20));

        assert!(matches!(
            Overrides::from_json_str("[1, 2]"),
            Err(ComposeError::InvalidOverrides(_))
        ));
    }

    #[test]
    fn test_overrides_from_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("overrides.json");
        std::fs::write(&path, r#"{"character-limit": {"max_length": 10}}"#).unwrap();
        let overrides = Overrides::from_path(&path).unwrap();
        assert!(overrides.for_extension("character-limit").is_some());

        let missing = Overrides::from_path(dir.path().join("missing.json"));
        assert!(matches!(missing, Err(ComposeError::Io { .. })));
    }

    #[test]
    fn test_signal_values_are_shared() {
        let external = Signal::new(json!(5));
        let mut bag = defaults();
        bag.insert("max_length".into(), external.clone().into());
        let config = Config::new("max-length", bag);

        external.set(json!(7));
        assert_eq!(config.get::<u64>("max_length").unwrap(), 7);
        config.set("max_length", 9).unwrap();
        assert_eq!(external.peek(), json!(9));
    }

    #[test]
    fn test_typed_reads() {
        let config = Config::new("max-length", defaults());
        assert_eq!(config.get::<usize>("max_length").unwrap(), 280);
        assert!(matches!(
            config.get::<String>("max_length"),
            Err(ComposeError::Config { .. })
        ));
        assert!(matches!(
            config.get::<usize>("nope"),
            Err(ComposeError::UnknownConfigKey { .. })
        ));
    }

    #[test]
    fn test_keys_are_tracked_independently() {
        let config = Config::new("max-length", defaults());
        let runs = Rc::new(Cell::new(0));
        let r = runs.clone();
        let c = config.clone();
        let e = effect(move || {
            let _ = c.get::<usize>("max_length");
            r.set(r.get() + 1);
            Disposer::noop()
        });

        config.set("strict", true).unwrap();
        assert_eq!(runs.get(), 1);
        config.set("max_length", 10).unwrap();
        assert_eq!(runs.get(), 2);
        assert!(!config.is_disabled());
        e.stop();
    }
}
