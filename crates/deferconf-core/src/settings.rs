//! Resolved settings
//!
//! [`Settings`] is the environment-driven merge of a defaults provider and
//! one settings module: every default is copied, then every setting the
//! module declares is laid over it.

use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;

use crate::catalog::Catalog;
use crate::error::{Error, Result};
use crate::loader::{FileLoader, ModuleLoader};
use crate::provider::{is_setting_name, SettingsProvider};
use crate::value::Value;

/// Settings that must be a list or a tuple
const TUPLE_SETTINGS: &[&str] = &["INSTALLED_APPS"];

/// Options for building [`Settings`]
#[derive(Clone)]
pub struct SettingsOptions {
    /// Base layer copied before the module is applied
    pub defaults: Arc<dyn SettingsProvider>,
    /// Loader used to find the settings module
    pub loader: Arc<dyn ModuleLoader>,
    /// Export `TIME_ZONE` to the process (`TZ` + `tzset`)
    pub apply_time_zone: bool,
}

impl Default for SettingsOptions {
    fn default() -> Self {
        Self {
            defaults: Catalog::global(),
            loader: Arc::new(FileLoader::default()),
            apply_time_zone: true,
        }
    }
}

impl fmt::Debug for SettingsOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SettingsOptions")
            .field("apply_time_zone", &self.apply_time_zone)
            .finish_non_exhaustive()
    }
}

/// Settings resolved from a settings module
#[derive(Debug, Clone)]
pub struct Settings {
    settings_module: String,
    values: IndexMap<String, Value>,
    explicit: BTreeSet<String>,
}

impl Settings {
    /// Resolve settings from `module_path` with the default options
    pub fn new(module_path: &str) -> Result<Self> {
        Self::with_options(module_path, &SettingsOptions::default())
    }

    /// Resolve settings from `module_path`
    ///
    /// Fails if the module cannot be loaded, if a tuple setting is not a
    /// sequence, or if `SECRET_KEY` is empty once the module is applied.
    pub fn with_options(module_path: &str, options: &SettingsOptions) -> Result<Self> {
        let mut values = IndexMap::new();
        for name in options.defaults.names() {
            if is_setting_name(&name) {
                let value = options.defaults.get(&name)?;
                values.insert(name, value);
            }
        }
        values.insert(
            "SETTINGS_MODULE".to_string(),
            Value::String(module_path.to_string()),
        );

        let module = options.loader.load(module_path)?;

        let mut explicit = BTreeSet::new();
        for (name, value) in module.settings() {
            if TUPLE_SETTINGS.contains(&name) && !value.is_sequence() {
                return Err(Error::invalid_setting(
                    name,
                    format!("The {} setting must be a list or a tuple.", name),
                ));
            }
            values.insert(name.to_string(), value.clone());
            explicit.insert(name.to_string());
        }

        let settings = Self {
            settings_module: module_path.to_string(),
            values,
            explicit,
        };

        if !settings
            .values
            .get("SECRET_KEY")
            .is_some_and(Value::is_truthy)
        {
            return Err(Error::invalid_setting(
                "SECRET_KEY",
                "The SECRET_KEY setting must not be empty.",
            ));
        }

        if options.apply_time_zone {
            settings.apply_time_zone();
        }

        log::info!(
            "Resolved settings from '{}' ({} explicit)",
            settings.settings_module,
            settings.explicit.len()
        );
        Ok(settings)
    }

    fn apply_time_zone(&self) {
        let Some(time_zone) = self.values.get("TIME_ZONE").filter(|v| v.is_truthy()) else {
            return;
        };
        match time_zone.as_str() {
            Some(tz) => {
                if set_process_time_zone(tz) {
                    log::debug!("Process time zone set to {}", tz);
                }
            }
            None => log::warn!(
                "TIME_ZONE must be a string, got {}; process time zone left unchanged",
                time_zone.type_name()
            ),
        }
    }

    /// The dotted path of the module these settings were resolved from
    pub fn settings_module(&self) -> &str {
        &self.settings_module
    }

    /// Names the settings module set explicitly, sorted
    pub fn explicit_settings(&self) -> impl Iterator<Item = &str> {
        self.explicit.iter().map(String::as_str)
    }

    /// Assign a value at runtime
    ///
    /// Runtime assignments are not recorded as explicit settings.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.values.insert(name.into(), value.into());
    }

    /// Remove a value at runtime; later lookups of `name` fail
    pub fn delete(&mut self, name: &str) {
        self.values.shift_remove(name);
    }
}

impl SettingsProvider for Settings {
    fn get(&self, name: &str) -> Result<Value> {
        self.values
            .get(name)
            .cloned()
            .ok_or_else(|| Error::setting_not_found(name))
    }

    fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .values
            .keys()
            .filter(|k| is_setting_name(k))
            .cloned()
            .collect();
        names.sort();
        names
    }

    fn is_overridden(&self, name: &str) -> bool {
        self.explicit.contains(name)
    }
}

impl fmt::Display for Settings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<Settings \"{}\">", self.settings_module)
    }
}

/// Export `TZ` and re-read it with `tzset`. Returns false where the
/// platform has no `tzset`.
#[cfg(unix)]
fn set_process_time_zone(time_zone: &str) -> bool {
    extern "C" {
        fn tzset();
    }

    std::env::set_var("TZ", time_zone);
    // SAFETY: tzset takes no arguments and only re-reads TZ.
    unsafe { tzset() };
    true
}

#[cfg(not(unix))]
fn set_process_time_zone(_time_zone: &str) -> bool {
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::loader::{Module, ModuleRegistry};
    use pretty_assertions::assert_eq;

    fn defaults() -> Catalog {
        Catalog::new()
            .with("DEBUG", false)
            .with("SECRET_KEY", "default-secret")
            .with("INSTALLED_APPS", Value::Sequence(vec![]))
            .with("TIME_ZONE", "")
            .with("LOG_LEVEL", "INFO")
            .with("helper", "not a setting")
    }

    fn options_with(modules: Vec<Module>) -> SettingsOptions {
        let mut registry = ModuleRegistry::new();
        for module in modules {
            registry.register(module);
        }
        SettingsOptions {
            defaults: Arc::new(defaults()),
            loader: Arc::new(registry),
            apply_time_zone: false,
        }
    }

    #[test]
    fn test_defaults_survive() {
        let options = options_with(vec![Module::new("app.settings").with("DEBUG", true)]);
        let settings = Settings::with_options("app.settings", &options).unwrap();

        assert_eq!(settings.get("LOG_LEVEL").unwrap(), Value::from("INFO"));
        assert_eq!(settings.get("SECRET_KEY").unwrap(), Value::from("default-secret"));
        assert!(!settings.is_overridden("LOG_LEVEL"));
    }

    #[test]
    fn test_module_overrides_defaults() {
        let options = options_with(vec![Module::new("app.settings")
            .with("DEBUG", true)
            .with("INSTALLED_APPS", vec!["auth", "admin"])]);
        let settings = Settings::with_options("app.settings", &options).unwrap();

        assert_eq!(settings.get("DEBUG").unwrap(), Value::Bool(true));
        assert_eq!(
            settings.get("INSTALLED_APPS").unwrap(),
            Value::from(vec!["auth", "admin"])
        );
        assert!(settings.is_overridden("DEBUG"));
        assert!(settings.is_overridden("INSTALLED_APPS"));
        assert_eq!(
            settings.explicit_settings().collect::<Vec<_>>(),
            vec!["DEBUG", "INSTALLED_APPS"]
        );
    }

    #[test]
    fn test_override_equal_to_default_is_still_overridden() {
        let options = options_with(vec![Module::new("app.settings").with("DEBUG", false)]);
        let settings = Settings::with_options("app.settings", &options).unwrap();

        assert!(settings.is_overridden("DEBUG"));
    }

    #[test]
    fn test_non_setting_names_ignored() {
        let options = options_with(vec![Module::new("app.settings").with("debug", true)]);
        let settings = Settings::with_options("app.settings", &options).unwrap();

        assert!(settings.get("debug").unwrap_err().is_not_found());
        assert!(settings.get("helper").unwrap_err().is_not_found());
        assert!(!settings.is_overridden("debug"));
    }

    #[test]
    fn test_settings_module_recorded() {
        let options = options_with(vec![Module::new("app.settings")]);
        let settings = Settings::with_options("app.settings", &options).unwrap();

        assert_eq!(settings.settings_module(), "app.settings");
        assert_eq!(
            settings.get("SETTINGS_MODULE").unwrap(),
            Value::from("app.settings")
        );
        assert_eq!(settings.to_string(), "<Settings \"app.settings\">");
    }

    #[test]
    fn test_installed_apps_must_be_sequence() {
        let module = Module::from_yaml("app.settings", "INSTALLED_APPS: {a, b}\n").unwrap();
        let options = options_with(vec![module]);

        let err = Settings::with_options("app.settings", &options).unwrap_err();
        assert_eq!(err.kind, ErrorKind::Misconfiguration);
        assert_eq!(err.name, Some("INSTALLED_APPS".into()));
        assert!(err.to_string().contains("INSTALLED_APPS"));
    }

    #[test]
    fn test_installed_apps_scalar_rejected() {
        let options = options_with(vec![Module::new("app.settings").with("INSTALLED_APPS", "auth")]);

        let err = Settings::with_options("app.settings", &options).unwrap_err();
        assert_eq!(err.kind, ErrorKind::Misconfiguration);
    }

    #[test]
    fn test_empty_secret_key_from_module() {
        let options = options_with(vec![Module::new("app.settings").with("SECRET_KEY", "")]);

        let err = Settings::with_options("app.settings", &options).unwrap_err();
        assert_eq!(err.kind, ErrorKind::Misconfiguration);
        assert_eq!(err.name, Some("SECRET_KEY".into()));
    }

    #[test]
    fn test_module_can_satisfy_secret_key() {
        let mut options = options_with(vec![Module::new("app.settings").with("SECRET_KEY", "s3cr3t")]);
        options.defaults = Arc::new(defaults().with("SECRET_KEY", ""));

        let settings = Settings::with_options("app.settings", &options).unwrap();
        assert_eq!(settings.get("SECRET_KEY").unwrap(), Value::from("s3cr3t"));
    }

    #[test]
    fn test_missing_secret_key_rejected() {
        let mut options = options_with(vec![Module::new("app.settings")]);
        options.defaults = Arc::new(Catalog::new().with("DEBUG", true));

        let err = Settings::with_options("app.settings", &options).unwrap_err();
        assert_eq!(err.kind, ErrorKind::Misconfiguration);
    }

    #[test]
    fn test_missing_module_propagates() {
        let options = options_with(vec![]);

        let err = Settings::with_options("app.missing", &options).unwrap_err();
        assert_eq!(
            err.kind,
            ErrorKind::ModuleNotFound {
                path: "app.missing".into()
            }
        );
    }

    #[test]
    fn test_runtime_set_and_delete() {
        let options = options_with(vec![Module::new("app.settings")]);
        let mut settings = Settings::with_options("app.settings", &options).unwrap();

        settings.set("LOG_LEVEL", "DEBUG");
        assert_eq!(settings.get("LOG_LEVEL").unwrap(), Value::from("DEBUG"));
        assert!(!settings.is_overridden("LOG_LEVEL"));

        settings.delete("LOG_LEVEL");
        assert!(settings.get("LOG_LEVEL").unwrap_err().is_not_found());
        assert!(!settings.names().contains(&"LOG_LEVEL".to_string()));
    }

    #[test]
    fn test_names_sorted() {
        let options = options_with(vec![Module::new("app.settings").with("ZEBRA", 1)]);
        let settings = Settings::with_options("app.settings", &options).unwrap();

        let names = settings.names();
        let mut sorted = names.clone();
        sorted.sort();
        assert_eq!(names, sorted);
        assert!(names.contains(&"ZEBRA".to_string()));
        assert!(names.contains(&"SETTINGS_MODULE".to_string()));
    }

    /// `TZ` is process-wide; tests that touch it take this lock
    #[cfg(unix)]
    static TZ_LOCK: std::sync::Mutex<()> = std::sync::Mutex::new(());

    #[cfg(unix)]
    fn resolve_with_time_zone(time_zone: Value) -> String {
        let _guard = TZ_LOCK.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        std::env::set_var("TZ", "Marker/Unchanged");
        let mut options = options_with(vec![Module::new("app.settings").with("TIME_ZONE", time_zone)]);
        options.apply_time_zone = true;

        Settings::with_options("app.settings", &options).unwrap();
        std::env::var("TZ").unwrap()
    }

    #[cfg(unix)]
    #[test]
    fn test_time_zone_applied() {
        assert_eq!(resolve_with_time_zone(Value::from("Europe/Paris")), "Europe/Paris");
    }

    #[cfg(unix)]
    #[test]
    fn test_empty_time_zone_leaves_tz() {
        assert_eq!(resolve_with_time_zone(Value::from("")), "Marker/Unchanged");
    }

    #[cfg(unix)]
    #[test]
    fn test_non_string_time_zone_leaves_tz() {
        assert_eq!(resolve_with_time_zone(Value::Integer(5)), "Marker/Unchanged");
    }
}
