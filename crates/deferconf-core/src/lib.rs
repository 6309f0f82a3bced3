//! deferconf-core: Deferred, process-wide settings
//!
//! Settings are read by name through a lazy proxy. Nothing is loaded until
//! the first read, which resolves the module named by `APP_SETTINGS_MODULE`
//! on top of the default catalog, unless the application installed explicit
//! settings with `configure` first.
//!
//! # Example
//!
//! ```rust
//! use deferconf_core::{LazySettings, Value};
//!
//! let settings = LazySettings::new();
//! settings
//!     .configure_with_overrides([("SECRET_KEY", "s3cr3t"), ("LOG_LEVEL", "DEBUG")])
//!     .unwrap();
//!
//! assert_eq!(*settings.get("LOG_LEVEL").unwrap(), Value::from("DEBUG"));
//! assert!(settings.is_overridden("LOG_LEVEL").unwrap());
//! ```

pub mod catalog;
pub mod error;
pub mod holder;
pub mod lazy;
pub mod loader;
pub mod provider;
pub mod settings;
pub mod value;

pub use catalog::Catalog;
pub use error::{Error, ErrorKind, Result};
pub use holder::SettingsHolder;
pub use lazy::{settings, LazyOptions, LazySettings, Wrapped, ENVIRONMENT_VARIABLE};
pub use loader::{FileLoader, Module, ModuleLoader, ModuleRegistry};
pub use provider::{is_setting_name, SettingsProvider};
pub use settings::{Settings, SettingsOptions};
pub use value::Value;
