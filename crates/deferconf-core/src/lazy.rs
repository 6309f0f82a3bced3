//! Lazily resolved, process-wide settings
//!
//! [`LazySettings`] is what the rest of an application reads settings from.
//! Nothing is loaded until the first access. At that point the proxy binds
//! either to [`Settings`] resolved from the module named by the
//! `APP_SETTINGS_MODULE` environment variable, or to the [`SettingsHolder`]
//! installed earlier by [`LazySettings::configure`]. Every value read
//! through the proxy is cached until the next write.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, OnceLock, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::catalog::Catalog;
use crate::error::{Error, Result};
use crate::holder::SettingsHolder;
use crate::provider::SettingsProvider;
use crate::settings::{Settings, SettingsOptions};
use crate::value::Value;

/// Environment variable naming the settings module
pub const ENVIRONMENT_VARIABLE: &str = "APP_SETTINGS_MODULE";

static GLOBAL_SETTINGS: OnceLock<LazySettings> = OnceLock::new();

/// The process-wide settings proxy.
///
/// Lazily created with default options on first call.
pub fn settings() -> &'static LazySettings {
    GLOBAL_SETTINGS.get_or_init(LazySettings::new)
}

/// The object a [`LazySettings`] forwards to
#[derive(Debug, Clone, Default)]
pub enum Wrapped {
    /// Not yet resolved or configured
    #[default]
    Empty,
    /// Resolved from the environment-selected module
    Settings(Settings),
    /// Installed by an explicit `configure` call
    Holder(SettingsHolder),
}

impl Wrapped {
    /// Check if nothing is bound yet
    pub fn is_empty(&self) -> bool {
        matches!(self, Wrapped::Empty)
    }

    fn provider(&self) -> Result<&dyn SettingsProvider> {
        match self {
            Wrapped::Settings(s) => Ok(s as &dyn SettingsProvider),
            Wrapped::Holder(h) => Ok(h as &dyn SettingsProvider),
            Wrapped::Empty => Err(Error::internal("settings proxy used before binding")),
        }
    }
}

/// Options for a [`LazySettings`] proxy
#[derive(Debug, Clone)]
pub struct LazyOptions {
    /// Environment variable read on auto-resolve
    pub environment_variable: String,
    /// Options used to build the resolved [`Settings`]
    pub settings: SettingsOptions,
}

impl Default for LazyOptions {
    fn default() -> Self {
        Self {
            environment_variable: ENVIRONMENT_VARIABLE.to_string(),
            settings: SettingsOptions::default(),
        }
    }
}

#[derive(Default)]
struct State {
    wrapped: Wrapped,
    cache: HashMap<String, Arc<Value>>,
}

/// Deferred settings proxy
pub struct LazySettings {
    options: LazyOptions,
    state: RwLock<State>,
}

impl Default for LazySettings {
    fn default() -> Self {
        Self::new()
    }
}

impl LazySettings {
    /// Create an unconfigured proxy with default options
    pub fn new() -> Self {
        Self::with_options(LazyOptions::default())
    }

    /// Create an unconfigured proxy with custom options
    pub fn with_options(options: LazyOptions) -> Self {
        Self {
            options,
            state: RwLock::new(State::default()),
        }
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, State>> {
        self.state
            .read()
            .map_err(|_| Error::internal("settings lock poisoned"))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, State>> {
        self.state
            .write()
            .map_err(|_| Error::internal("settings lock poisoned"))
    }

    /// Take the write lock, auto-resolving first if nothing is bound yet
    fn bound(&self, name: Option<&str>) -> Result<RwLockWriteGuard<'_, State>> {
        let mut state = self.write()?;
        if state.wrapped.is_empty() {
            self.setup(&mut state, name)?;
        }
        Ok(state)
    }

    fn setup(&self, state: &mut State, name: Option<&str>) -> Result<()> {
        let var = &self.options.environment_variable;
        let module = std::env::var(var).ok().filter(|m| !m.is_empty());
        let Some(module) = module else {
            let desc = match name {
                Some(name) => format!("setting {}", name),
                None => "settings".to_string(),
            };
            return Err(Error::misconfigured(format!(
                "Requested {}, but settings are not configured. You must either define the \
                 environment variable {} or call settings.configure() before accessing settings.",
                desc, var
            ))
            .with_help(format!("export {}=<dotted.module.path>", var)));
        };

        log::debug!("Binding settings to module '{}' from ${}", module, var);
        let settings = Settings::with_options(&module, &self.options.settings)?;
        state.wrapped = Wrapped::Settings(settings);
        state.cache.clear();
        Ok(())
    }

    /// Read a setting
    ///
    /// The first read of each name is fetched from the backing object and
    /// cached; later reads return the same `Arc` until the cache is cleared.
    pub fn get(&self, name: &str) -> Result<Arc<Value>> {
        {
            let state = self.read()?;
            if let Some(value) = state.cache.get(name) {
                log::trace!("Settings cache hit for {}", name);
                return Ok(Arc::clone(value));
            }
        }

        let mut state = self.bound(Some(name))?;
        if let Some(value) = state.cache.get(name) {
            return Ok(Arc::clone(value));
        }
        let value = Arc::new(state.wrapped.provider()?.get(name)?);
        state.cache.insert(name.to_string(), Arc::clone(&value));
        Ok(value)
    }

    /// Write a setting through to the backing object
    ///
    /// Clears every cached value, not just `name`.
    pub fn set(&self, name: impl Into<String>, value: impl Into<Value>) -> Result<()> {
        let name = name.into();
        let mut state = self.bound(Some(&name))?;
        log::debug!("Setting {} written; clearing settings cache", name);
        state.cache.clear();
        match &mut state.wrapped {
            Wrapped::Settings(s) => s.set(name, value),
            Wrapped::Holder(h) => h.set(name, value),
            Wrapped::Empty => return Err(Error::internal("settings proxy used before binding")),
        }
        Ok(())
    }

    /// Delete a setting from the backing object and drop it from the cache
    pub fn delete(&self, name: &str) -> Result<()> {
        let mut state = self.bound(Some(name))?;
        match &mut state.wrapped {
            Wrapped::Settings(s) => s.delete(name),
            Wrapped::Holder(h) => h.delete(name),
            Wrapped::Empty => return Err(Error::internal("settings proxy used before binding")),
        }
        state.cache.remove(name);
        Ok(())
    }

    /// Replace the backing object, dropping every cached value
    pub fn set_wrapped(&self, wrapped: Wrapped) -> Result<()> {
        let mut state = self.write()?;
        state.wrapped = wrapped;
        state.cache.clear();
        Ok(())
    }

    /// Return to the unconfigured state
    pub fn reset(&self) -> Result<()> {
        self.set_wrapped(Wrapped::Empty)
    }

    /// Bind to explicitly supplied settings instead of the environment
    ///
    /// Fails with `AlreadyConfigured` if the proxy is already bound, whether by
    /// an earlier `configure` or by an auto-resolve.
    pub fn configure<I, K, V>(&self, defaults: Arc<dyn SettingsProvider>, overrides: I) -> Result<()>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        let mut state = self.write()?;
        if !state.wrapped.is_empty() {
            return Err(Error::already_configured());
        }
        let mut holder = SettingsHolder::new(defaults);
        for (name, value) in overrides {
            holder.set(name, value);
        }
        log::info!("Settings configured explicitly");
        state.wrapped = Wrapped::Holder(holder);
        state.cache.clear();
        Ok(())
    }

    /// [`configure`](Self::configure) on top of the global catalog
    pub fn configure_with_overrides<I, K, V>(&self, overrides: I) -> Result<()>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        self.configure(Catalog::global(), overrides)
    }

    /// Whether the proxy is bound
    pub fn configured(&self) -> bool {
        !self
            .state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .wrapped
            .is_empty()
    }

    /// Whether `name` was customized in the backing object
    pub fn is_overridden(&self, name: &str) -> Result<bool> {
        let state = self.bound(None)?;
        Ok(state.wrapped.provider()?.is_overridden(name))
    }

    /// Every setting name visible through the backing object, sorted
    pub fn names(&self) -> Result<Vec<String>> {
        let state = self.bound(None)?;
        let mut names = state.wrapped.provider()?.names();
        names.sort();
        Ok(names)
    }

    /// Module path of resolved settings; `None` while unbound or configured
    pub fn settings_module(&self) -> Option<String> {
        match &self.state.read().ok()?.wrapped {
            Wrapped::Settings(s) => Some(s.settings_module().to_string()),
            _ => None,
        }
    }

    /// Get a setting as a string, with type coercion if needed
    pub fn get_string(&self, name: &str) -> Result<String> {
        let value = self.get(name)?;
        match &*value {
            Value::String(s) => Ok(s.clone()),
            Value::Integer(i) => Ok(i.to_string()),
            Value::Float(f) => Ok(f.to_string()),
            Value::Bool(b) => Ok(b.to_string()),
            other => Err(Error::type_coercion(name, "string", other.type_name())),
        }
    }

    /// Get a setting as an integer, with type coercion if needed
    pub fn get_i64(&self, name: &str) -> Result<i64> {
        let value = self.get(name)?;
        match &*value {
            Value::Integer(i) => Ok(*i),
            Value::String(s) => s
                .parse()
                .map_err(|_| Error::type_coercion(name, "integer", format!("string (\"{}\")", s))),
            other => Err(Error::type_coercion(name, "integer", other.type_name())),
        }
    }

    /// Get a setting as a float, with type coercion if needed
    pub fn get_f64(&self, name: &str) -> Result<f64> {
        let value = self.get(name)?;
        match &*value {
            Value::Float(f) => Ok(*f),
            Value::Integer(i) => Ok(*i as f64),
            Value::String(s) => s
                .parse()
                .map_err(|_| Error::type_coercion(name, "float", format!("string (\"{}\")", s))),
            other => Err(Error::type_coercion(name, "float", other.type_name())),
        }
    }

    /// Get a setting as a boolean; strings must be "true" or "false"
    pub fn get_bool(&self, name: &str) -> Result<bool> {
        let value = self.get(name)?;
        match &*value {
            Value::Bool(b) => Ok(*b),
            Value::String(s) => match s.to_lowercase().as_str() {
                "true" => Ok(true),
                "false" => Ok(false),
                _ => Err(Error::type_coercion(
                    name,
                    "boolean",
                    format!("string (\"{}\") - only \"true\" or \"false\" allowed", s),
                )),
            },
            other => Err(Error::type_coercion(name, "boolean", other.type_name())),
        }
    }

    /// Get a setting that must be a list or a tuple
    pub fn get_list(&self, name: &str) -> Result<Vec<Value>> {
        let value = self.get(name)?;
        value
            .as_sequence()
            .map(<[Value]>::to_vec)
            .ok_or_else(|| Error::type_coercion(name, "sequence", value.type_name()))
    }
}

impl fmt::Debug for LazySettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.read().unwrap_or_else(PoisonError::into_inner);
        f.debug_struct("LazySettings")
            .field("options", &self.options)
            .field("wrapped", &state.wrapped)
            .field("cached", &state.cache.len())
            .finish()
    }
}

impl fmt::Display for LazySettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.read().unwrap_or_else(PoisonError::into_inner);
        match &state.wrapped {
            Wrapped::Empty => write!(f, "<LazySettings [Unevaluated]>"),
            Wrapped::Settings(s) => write!(f, "<LazySettings \"{}\">", s.settings_module()),
            Wrapped::Holder(_) => write!(f, "<LazySettings [Configured]>"),
        }
    }
}
