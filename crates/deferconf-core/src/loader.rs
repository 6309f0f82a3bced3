//! Settings modules and the loaders that find them
//!
//! A settings module is a flat table of overrides selected by a dotted path
//! such as `project.settings.prod`. A [`ModuleLoader`] turns that path into
//! a [`Module`]; where the content comes from (memory, a file, something
//! generated) is up to the loader.

use std::collections::HashMap;
use std::path::{Component, Path, PathBuf};

use indexmap::IndexMap;

use crate::error::{Error, Result};
use crate::provider::{is_setting_name, SettingsProvider};
use crate::value::Value;

/// File extensions tried by [`FileLoader`], in order
const MODULE_EXTENSIONS: &[&str] = &["yaml", "yml", "json"];

/// A loaded settings module
#[derive(Debug, Clone, PartialEq)]
pub struct Module {
    path: String,
    values: IndexMap<String, Value>,
}

impl Module {
    /// Create an empty module for the given dotted path
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            values: IndexMap::new(),
        }
    }

    /// Add a value, returning the module
    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.values.insert(name.into(), value.into());
        self
    }

    /// Create a module from a parsed document; the top level must be a mapping
    pub fn from_value(path: impl Into<String>, value: Value) -> Result<Self> {
        let path = path.into();
        match value {
            Value::Mapping(values) => Ok(Self { path, values }),
            // An empty document declares nothing
            Value::Null => Ok(Self::new(path)),
            other => Err(Error::parse(format!(
                "Settings module '{}' must be a mapping, got {}",
                path,
                other.type_name()
            ))),
        }
    }

    /// Parse a module from YAML text
    pub fn from_yaml(path: impl Into<String>, yaml: &str) -> Result<Self> {
        let value: Value = serde_yaml::from_str(yaml).map_err(|e| Error::parse(e.to_string()))?;
        Self::from_value(path, value)
    }

    /// Parse a module from JSON text
    pub fn from_json(path: impl Into<String>, json: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(json).map_err(|e| Error::parse(e.to_string()))?;
        Self::from_value(path, value)
    }

    /// The dotted path this module was loaded from
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Setting entries in module order, skipping non-setting names
    pub fn settings(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.values
            .iter()
            .filter(|(k, _)| is_setting_name(k))
            .map(|(k, v)| (k.as_str(), v))
    }
}

impl SettingsProvider for Module {
    fn get(&self, name: &str) -> Result<Value> {
        self.values
            .get(name)
            .cloned()
            .ok_or_else(|| Error::setting_not_found(name))
    }

    fn names(&self) -> Vec<String> {
        self.settings().map(|(k, _)| k.to_string()).collect()
    }
}

/// Resolves a dotted path to a settings module
pub trait ModuleLoader: Send + Sync {
    /// Load the module at `path`
    ///
    /// Returns a `ModuleNotFound` error if nothing is registered under `path`.
    fn load(&self, path: &str) -> Result<Module>;
}

impl<F> ModuleLoader for F
where
    F: Fn(&str) -> Result<Module> + Send + Sync,
{
    fn load(&self, path: &str) -> Result<Module> {
        self(path)
    }
}

/// An in-memory registry of modules keyed by dotted path
#[derive(Debug, Clone, Default)]
pub struct ModuleRegistry {
    modules: HashMap<String, Module>,
}

impl ModuleRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a module under its own path, replacing any existing one
    pub fn register(&mut self, module: Module) {
        self.modules.insert(module.path.clone(), module);
    }

    /// Register a module, refusing to replace an existing one unless `force`
    pub fn register_with_force(&mut self, module: Module, force: bool) -> Result<()> {
        if !force && self.modules.contains_key(&module.path) {
            return Err(Error::internal(format!(
                "Settings module '{}' is already registered",
                module.path
            ))
            .with_help("Use register_with_force(..., true) to replace it"));
        }
        self.register(module);
        Ok(())
    }

    /// Check if a module is registered under `path`
    pub fn contains(&self, path: &str) -> bool {
        self.modules.contains_key(path)
    }
}

impl ModuleLoader for ModuleRegistry {
    fn load(&self, path: &str) -> Result<Module> {
        self.modules
            .get(path)
            .cloned()
            .ok_or_else(|| Error::module_not_found(path))
    }
}

/// Loads modules from YAML or JSON files under a root directory
///
/// `project.settings` resolves to `<root>/project/settings.yaml`, then
/// `.yml`, then `.json`.
#[derive(Debug, Clone)]
pub struct FileLoader {
    root: PathBuf,
}

impl FileLoader {
    /// Create a loader rooted at `root`
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Candidate files for `path`, or `None` if a segment is not a plain
    /// file name (empty, `..`, absolute, or containing a separator)
    fn candidates(&self, path: &str) -> Option<Vec<PathBuf>> {
        let mut base = self.root.clone();
        for segment in path.split('.') {
            let mut components = Path::new(segment).components();
            match (components.next(), components.next()) {
                (Some(Component::Normal(name)), None) if name == segment => base.push(segment),
                _ => return None,
            }
        }
        Some(
            MODULE_EXTENSIONS
                .iter()
                .map(|ext| base.with_extension(ext))
                .collect(),
        )
    }
}

impl Default for FileLoader {
    fn default() -> Self {
        Self::new(".")
    }
}

impl ModuleLoader for FileLoader {
    fn load(&self, path: &str) -> Result<Module> {
        let candidates = self
            .candidates(path)
            .ok_or_else(|| Error::module_not_found(path))?;

        for file in candidates {
            if !file.is_file() {
                continue;
            }
            log::debug!("Loading settings module '{}' from {}", path, file.display());
            let content = std::fs::read_to_string(&file).map_err(|e| {
                Error::parse(format!("Failed to read file '{}': {}", file.display(), e))
            })?;
            let is_json = file.extension().and_then(|e| e.to_str()) == Some("json");
            return if is_json {
                Module::from_json(path, &content)
            } else {
                Module::from_yaml(path, &content)
            };
        }

        Err(Error::module_not_found(path))
    }
}
