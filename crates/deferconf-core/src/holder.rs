//! Explicitly configured settings
//!
//! A [`SettingsHolder`] layers sparse per-name changes over a defaults
//! provider. Each name is either inherited from the provider, overridden
//! with a local value, or deleted.

use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::sync::Arc;

use crate::error::{Error, Result};
use crate::provider::{is_setting_name, SettingsProvider};
use crate::value::Value;

/// Local state of one name; names without an entry are inherited
#[derive(Debug, Clone, PartialEq)]
enum Entry {
    Overridden(Value),
    Deleted,
}

/// Defaults plus explicit overrides and deletions
#[derive(Clone)]
pub struct SettingsHolder {
    default_settings: Arc<dyn SettingsProvider>,
    entries: HashMap<String, Entry>,
}

impl SettingsHolder {
    /// Create a holder that inherits everything from `default_settings`
    pub fn new(default_settings: Arc<dyn SettingsProvider>) -> Self {
        Self {
            default_settings,
            entries: HashMap::new(),
        }
    }

    /// Set a value, clearing any earlier deletion of `name`
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.entries
            .insert(name.into(), Entry::Overridden(value.into()));
    }

    /// Delete `name`; it stays unresolvable until set again
    pub fn delete(&mut self, name: &str) {
        self.entries.insert(name.to_string(), Entry::Deleted);
    }
}

impl SettingsProvider for SettingsHolder {
    fn get(&self, name: &str) -> Result<Value> {
        match self.entries.get(name) {
            Some(Entry::Deleted) => Err(Error::setting_not_found(name)),
            Some(Entry::Overridden(value)) => Ok(value.clone()),
            None => self.default_settings.get(name),
        }
    }

    fn names(&self) -> Vec<String> {
        let mut names: BTreeSet<String> = self.default_settings.names().into_iter().collect();
        for (name, entry) in &self.entries {
            match entry {
                Entry::Overridden(_) if is_setting_name(name) => {
                    names.insert(name.clone());
                }
                Entry::Overridden(_) => {}
                Entry::Deleted => {
                    names.remove(name);
                }
            }
        }
        names.into_iter().collect()
    }

    fn is_overridden(&self, name: &str) -> bool {
        self.entries.contains_key(name) || self.default_settings.is_overridden(name)
    }
}

impl fmt::Debug for SettingsHolder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SettingsHolder")
            .field("entries", &self.entries)
            .finish_non_exhaustive()
    }
}

impl fmt::Display for SettingsHolder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<SettingsHolder>")
    }
}
