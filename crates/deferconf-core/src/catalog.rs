//! Default catalog
//!
//! The baseline table of recognized setting names and their built-in values.

use std::sync::{Arc, OnceLock};

use indexmap::IndexMap;

use crate::error::{Error, Result};
use crate::provider::{is_setting_name, SettingsProvider};
use crate::value::Value;

static GLOBAL_CATALOG: OnceLock<Arc<Catalog>> = OnceLock::new();

/// An ordered table of default setting values
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Catalog {
    values: IndexMap<String, Value>,
}

impl Catalog {
    /// Create an empty catalog
    pub fn new() -> Self {
        Self::default()
    }

    /// The built-in defaults shared by every process.
    pub fn global() -> Arc<Catalog> {
        GLOBAL_CATALOG
            .get_or_init(|| Arc::new(Self::builtin()))
            .clone()
    }

    fn builtin() -> Self {
        Self::new()
            .with("DEBUG", false)
            .with("SECRET_KEY", "")
            .with("INSTALLED_APPS", Value::Sequence(vec![]))
            .with("ALLOWED_HOSTS", Value::Sequence(vec![]))
            .with("MIDDLEWARE", Value::Sequence(vec![]))
            .with("DATABASES", Value::Mapping(IndexMap::new()))
            .with("TIME_ZONE", "UTC")
            .with("USE_TZ", true)
            .with("LANGUAGE_CODE", "en-us")
            .with("DEFAULT_CHARSET", "utf-8")
            .with("LOG_LEVEL", "INFO")
    }

    /// Add or replace a default, returning the catalog
    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(name, value);
        self
    }

    /// Add or replace a default
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.values.insert(name.into(), value.into());
    }

    /// Number of setting entries
    pub fn len(&self) -> usize {
        self.values.keys().filter(|k| is_setting_name(k)).count()
    }

    /// Check if the catalog has no setting entries
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Iterate over setting entries in insertion order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.values
            .iter()
            .filter(|(k, _)| is_setting_name(k))
            .map(|(k, v)| (k.as_str(), v))
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Catalog {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            values: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

impl SettingsProvider for Catalog {
    fn get(&self, name: &str) -> Result<Value> {
        self.values
            .get(name)
            .cloned()
            .ok_or_else(|| Error::setting_not_found(name))
    }

    fn names(&self) -> Vec<String> {
        self.iter().map(|(k, _)| k.to_string()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_global_catalog_defaults() {
        let catalog = Catalog::global();

        assert_eq!(catalog.get("DEBUG").unwrap(), Value::Bool(false));
        assert_eq!(catalog.get("SECRET_KEY").unwrap(), Value::from(""));
        assert!(catalog.get("INSTALLED_APPS").unwrap().is_sequence());
        assert!(!catalog.is_overridden("DEBUG"));
    }

    #[test]
    fn test_global_catalog_is_shared() {
        assert!(Arc::ptr_eq(&Catalog::global(), &Catalog::global()));
    }

    #[test]
    fn test_names_skip_non_setting_entries() {
        let catalog: Catalog = vec![("DEBUG", true), ("helper", true), ("TIMEOUT", false)]
            .into_iter()
            .collect();

        assert_eq!(catalog.names(), vec!["DEBUG", "TIMEOUT"]);
        assert_eq!(catalog.len(), 2);
    }

    #[test]
    fn test_missing_setting() {
        let err = Catalog::new().get("NOPE").unwrap_err();
        assert!(err.is_not_found());
    }
}
