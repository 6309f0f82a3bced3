//! The attribute surface shared by every settings layer
//!
//! Catalogs, loaded modules, resolved settings and override holders all
//! expose settings by name through [`SettingsProvider`], so any of them can
//! serve as the base layer of another.

use crate::error::Result;
use crate::value::Value;

/// A source of named settings
pub trait SettingsProvider: Send + Sync {
    /// Look up a setting by name
    ///
    /// Returns a [`SettingNotFound`](crate::error::ErrorKind::SettingNotFound)
    /// error if the name is not defined.
    fn get(&self, name: &str) -> Result<Value>;

    /// Names of every setting this provider defines
    fn names(&self) -> Vec<String>;

    /// Whether the setting was customized rather than left at its default
    fn is_overridden(&self, _name: &str) -> bool {
        false
    }
}

/// Whether `name` is a setting name.
///
/// Setting names are upper case: at least one cased character and no
/// lower-case ones. Everything else is an ordinary attribute and is ignored.
pub fn is_setting_name(name: &str) -> bool {
    let mut cased = false;
    for c in name.chars() {
        if c.is_lowercase() {
            return false;
        }
        if c.is_uppercase() {
            cased = true;
        }
    }
    cased
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_setting_names() {
        assert!(is_setting_name("DEBUG"));
        assert!(is_setting_name("SECRET_KEY"));
        assert!(is_setting_name("CACHE_TTL_2"));
        assert!(is_setting_name("_PRIVATE"));
    }

    #[test]
    fn test_non_setting_names() {
        assert!(!is_setting_name("debug"));
        assert!(!is_setting_name("Debug"));
        assert!(!is_setting_name("_"));
        assert!(!is_setting_name("123"));
        assert!(!is_setting_name(""));
    }
}
