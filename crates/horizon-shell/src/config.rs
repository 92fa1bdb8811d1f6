//! Shell configuration.
//!
//! A [`ShellConfig`] names the application, describes the root window and
//! sets the initial UI culture and theme. It can be built in code or loaded
//! from TOML; any key left out takes its default.
//!
//! ```
//! use horizon_shell::ShellConfig;
//!
//! let config = ShellConfig::from_toml_str(r#"
//!     application_name = "Viewer"
//!     root_window_title = "Viewer"
//!     ui_theme = "dark"
//! "#).unwrap();
//!
//! assert_eq!(config.root_window_name, "Root");
//! assert!(config.quit_when_last_window_closes);
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Result, ShellError};

/// Application-level settings consumed by [`Application`](crate::Application).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShellConfig {
    /// Display name of the application.
    pub application_name: String,
    /// Version string reported by the application.
    pub application_version: String,
    /// Name given to the root desktop window.
    pub root_window_name: String,
    /// Title of the root desktop window; the application name when empty.
    pub root_window_title: String,
    /// Quit normally once the last desktop window has closed.
    pub quit_when_last_window_closes: bool,
    /// Initial UI culture.
    pub ui_culture: String,
    /// Initial UI theme.
    pub ui_theme: String,
    /// Default `tracing` filter directive for binaries built on the shell.
    pub log_filter: String,
}

impl Default for ShellConfig {
    fn default() -> Self {
        Self {
            application_name: "Horizon Shell".to_string(),
            application_version: env!("CARGO_PKG_VERSION").to_string(),
            root_window_name: "Root".to_string(),
            root_window_title: String::new(),
            quit_when_last_window_closes: true,
            ui_culture: "en-US".to_string(),
            ui_theme: "default".to_string(),
            log_filter: "info".to_string(),
        }
    }
}

impl ShellConfig {
    /// Create a configuration with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the application name.
    pub fn application_name(mut self, name: impl Into<String>) -> Self {
        self.application_name = name.into();
        self
    }

    /// Set the root window title.
    pub fn root_window_title(mut self, title: impl Into<String>) -> Self {
        self.root_window_title = title.into();
        self
    }

    /// Set whether closing the last window quits the application.
    pub fn quit_when_last_window_closes(mut self, quit: bool) -> Self {
        self.quit_when_last_window_closes = quit;
        self
    }

    /// The title used for the root window.
    pub fn effective_root_title(&self) -> &str {
        if self.root_window_title.is_empty() {
            &self.application_name
        } else {
            &self.root_window_title
        }
    }

    /// Parse a configuration from TOML text.
    pub fn from_toml_str(s: &str) -> Result<Self> {
        toml::from_str(s).map_err(|e| ShellError::config(None, e.to_string()))
    }

    /// Load a configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| ShellError::config(Some(path.to_path_buf()), e.to_string()))?;
        toml::from_str(&content)
            .map_err(|e| ShellError::config(Some(path.to_path_buf()), e.to_string()))
    }

    /// Serialize the configuration as TOML.
    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| ShellError::config(None, e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = ShellConfig::default();
        assert_eq!(config.root_window_name, "Root");
        assert_eq!(config.ui_culture, "en-US");
        assert_eq!(config.effective_root_title(), "Horizon Shell");
    }

    #[test]
    fn test_partial_toml_takes_defaults() {
        let config = ShellConfig::from_toml_str("quit_when_last_window_closes = false").unwrap();
        assert!(!config.quit_when_last_window_closes);
        assert_eq!(config.ui_theme, "default");
    }

    #[test]
    fn test_malformed_toml_is_config_error() {
        let err = ShellConfig::from_toml_str("ui_theme = [").unwrap_err();
        assert!(matches!(err, ShellError::Config { path: None, .. }));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "application_name = \"Viewer\"\nroot_window_title = \"Main\"").unwrap();

        let config = ShellConfig::load(file.path()).unwrap();
        assert_eq!(config.application_name, "Viewer");
        assert_eq!(config.effective_root_title(), "Main");
    }

    #[test]
    fn test_load_missing_file_reports_path() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("absent.toml");
        match ShellConfig::load(&missing) {
            Err(ShellError::Config { path: Some(path), .. }) => assert_eq!(path, missing),
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn test_toml_round_trip() {
        let config = ShellConfig::new().application_name("Viewer");
        let text = config.to_toml_string().unwrap();
        assert_eq!(ShellConfig::from_toml_str(&text).unwrap(), config);
    }
}
