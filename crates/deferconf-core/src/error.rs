//! Error types for deferconf
//!
//! Errors are structured values: a kind, the setting name involved (if any),
//! an optional cause, and an actionable help message.

use std::fmt;

/// Result type alias for deferconf operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for deferconf operations
#[derive(Debug, Clone)]
pub struct Error {
    /// The kind of error that occurred
    pub kind: ErrorKind,
    /// Setting name the error relates to (e.g., "SECRET_KEY")
    pub name: Option<String>,
    /// Actionable help message
    pub help: Option<String>,
    /// Underlying cause (as string for Clone compatibility)
    pub cause: Option<String>,
}

/// Categories of errors that can occur
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    /// Settings are missing or invalid; not recoverable where raised
    Misconfiguration,
    /// `configure` was called on a proxy that is already bound
    AlreadyConfigured,
    /// The requested setting is unknown or was deleted
    SettingNotFound,
    /// The settings module selected by path could not be found
    ModuleNotFound { path: String },
    /// A settings module could not be parsed
    Parse,
    /// A typed accessor found a value of the wrong shape
    TypeCoercion,
    /// Internal error (bug in deferconf)
    Internal,
}

impl Error {
    /// Create a misconfiguration error
    pub fn misconfigured(message: impl Into<String>) -> Self {
        Self {
            kind: ErrorKind::Misconfiguration,
            name: None,
            help: None,
            cause: Some(message.into()),
        }
    }

    /// Create a misconfiguration error about a single setting
    pub fn invalid_setting(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind: ErrorKind::Misconfiguration,
            name: Some(name.into()),
            help: None,
            cause: Some(message.into()),
        }
    }

    /// Create an already-configured error
    pub fn already_configured() -> Self {
        Self {
            kind: ErrorKind::AlreadyConfigured,
            name: None,
            help: Some("configure() may only be called once, before settings are first read".into()),
            cause: Some("Settings already configured.".into()),
        }
    }

    /// Create a setting not found error
    pub fn setting_not_found(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            kind: ErrorKind::SettingNotFound,
            help: Some(format!(
                "Check that '{}' is defined in the settings module or the default catalog",
                name
            )),
            name: Some(name),
            cause: None,
        }
    }

    /// Create a module not found error
    pub fn module_not_found(path: impl Into<String>) -> Self {
        let path = path.into();
        Self {
            help: Some(format!(
                "Check that the settings module '{}' exists and is importable",
                path
            )),
            kind: ErrorKind::ModuleNotFound { path },
            name: None,
            cause: None,
        }
    }

    /// Create a parse error
    pub fn parse(message: impl Into<String>) -> Self {
        Self {
            kind: ErrorKind::Parse,
            name: None,
            help: None,
            cause: Some(message.into()),
        }
    }

    /// Create a type coercion error
    pub fn type_coercion(
        name: impl Into<String>,
        expected: impl Into<String>,
        got: impl Into<String>,
    ) -> Self {
        Self {
            kind: ErrorKind::TypeCoercion,
            name: Some(name.into()),
            help: Some(format!(
                "Ensure the value can be converted to {}",
                expected.into()
            )),
            cause: Some(format!("Got: {}", got.into())),
        }
    }

    /// Create an internal error (bug in deferconf)
    pub fn internal(message: impl Into<String>) -> Self {
        Self {
            kind: ErrorKind::Internal,
            name: None,
            help: Some("This is likely a bug in deferconf. Please report it.".into()),
            cause: Some(message.into()),
        }
    }

    /// Add help message to the error
    pub fn with_help(mut self, help: impl Into<String>) -> Self {
        self.help = Some(help.into());
        self
    }

    /// True for errors a caller probing an optional setting should expect
    pub fn is_not_found(&self) -> bool {
        self.kind == ErrorKind::SettingNotFound
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            ErrorKind::Misconfiguration => write!(f, "Improperly configured")?,
            ErrorKind::AlreadyConfigured => write!(f, "Already configured")?,
            ErrorKind::SettingNotFound => write!(f, "Setting not found")?,
            ErrorKind::ModuleNotFound { path } => write!(f, "Module not found: {}", path)?,
            ErrorKind::Parse => write!(f, "Parse error")?,
            ErrorKind::TypeCoercion => write!(f, "Type coercion failed")?,
            ErrorKind::Internal => write!(f, "Internal error")?,
        }

        if let Some(name) = &self.name {
            write!(f, "\n  Setting: {}", name)?;
        }

        if let Some(cause) = &self.cause {
            write!(f, "\n  {}", cause)?;
        }

        if let Some(help) = &self.help {
            write!(f, "\n  Help: {}", help)?;
        }

        Ok(())
    }
}

impl std::error::Error for Error {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_setting_display() {
        let err = Error::invalid_setting(
            "INSTALLED_APPS",
            "The INSTALLED_APPS setting must be a list or a tuple.",
        );
        let display = format!("{}", err);

        assert!(display.contains("Improperly configured"));
        assert!(display.contains("Setting: INSTALLED_APPS"));
        assert!(display.contains("must be a list or a tuple"));
    }

    #[test]
    fn test_setting_not_found_error() {
        let err = Error::setting_not_found("MISSING");

        assert_eq!(err.kind, ErrorKind::SettingNotFound);
        assert_eq!(err.name, Some("MISSING".into()));
        assert!(err.is_not_found());
        assert!(format!("{}", err).contains("Help:"));
    }

    #[test]
    fn test_module_not_found_error() {
        let err = Error::module_not_found("project.settings");
        let display = format!("{}", err);

        assert!(display.contains("Module not found: project.settings"));
        assert!(!err.is_not_found());
    }

    #[test]
    fn test_already_configured_error() {
        let err = Error::already_configured();
        let display = format!("{}", err);

        assert_eq!(err.kind, ErrorKind::AlreadyConfigured);
        assert!(display.contains("Settings already configured."));
    }

    #[test]
    fn test_type_coercion_error() {
        let err = Error::type_coercion("DEBUG", "boolean", "string");
        let display = format!("{}", err);

        assert!(display.contains("Type coercion failed"));
        assert!(display.contains("Setting: DEBUG"));
        assert!(display.contains("Got: string"));
    }

    #[test]
    fn test_with_help() {
        let err = Error::parse("bad input").with_help("Try fixing the syntax");
        let display = format!("{}", err);

        assert!(display.contains("Help: Try fixing the syntax"));
    }
}
