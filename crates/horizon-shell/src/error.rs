//! Error types for the desktop shell.

use std::path::PathBuf;

use horizon_shell_core::DispatchError;

use crate::desktop_object::DesktopObjectState;

/// Result type alias for shell operations.
pub type Result<T> = std::result::Result<T, ShellError>;

/// Errors that can occur in the desktop shell.
///
/// Refusals (a window that will not close, a component that declines to
/// exit) are not errors; they are reported as `false` or
/// [`CloseOutcome`](crate::CloseOutcome) values.
#[derive(Debug, thiserror::Error)]
pub enum ShellError {
    /// An operation was invoked in a state that does not permit it.
    #[error("Operation '{operation}' not valid on a {kind} with state {state:?}")]
    InvalidState {
        operation: &'static str,
        kind: &'static str,
        state: DesktopObjectState,
    },

    /// A collection already holds a member with this name.
    #[error("An object named '{0}' already exists in the collection")]
    DuplicateName(String),

    /// The object already belongs to a collection.
    #[error("The object '{0}' is already a member of a collection")]
    AlreadyMember(String),

    /// Named lookup failed.
    #[error("No object named '{0}' exists in the collection")]
    NotFound(String),

    /// `start` was called on a component that is already started.
    #[error("Component has already been started")]
    ComponentAlreadyStarted,

    /// An operation required a started component.
    #[error("Component has not been started")]
    ComponentNotStarted,

    /// The component has no host.
    #[error("Component is not hosted")]
    ComponentNotHosted,

    /// The application has not finished starting up.
    #[error("Application has not been initialized")]
    NotInitialized,

    /// The process-wide application handle was installed twice.
    #[error("An application instance has already been installed")]
    AlreadyInstalled,

    /// A page or pane index was outside the container.
    #[error("Index {index} out of range (count {count})")]
    IndexOutOfRange { index: usize, count: usize },

    /// A view could not be created or opened.
    #[error("View error: {0}")]
    View(String),

    /// The GUI toolkit failed to start or stop.
    #[error("GUI toolkit error: {0}")]
    Toolkit(String),

    /// The session manager failed.
    #[error("Session error: {0}")]
    Session(String),

    /// A caller-supplied initialization hook failed.
    #[error("Initialization failed: {0}")]
    Initialization(String),

    /// Configuration could not be read or parsed.
    #[error("Invalid configuration{}: {message}", path_suffix(.path))]
    Config {
        path: Option<PathBuf>,
        message: String,
    },

    /// Cross-thread dispatch failed.
    #[error("Dispatch error: {0}")]
    Dispatch(#[from] DispatchError),
}

fn path_suffix(path: &Option<PathBuf>) -> String {
    path.as_ref()
        .map(|p| format!(" in '{}'", p.display()))
        .unwrap_or_default()
}

impl ShellError {
    /// Create an invalid-state error.
    pub fn invalid_state(
        operation: &'static str,
        kind: &'static str,
        state: DesktopObjectState,
    ) -> Self {
        Self::InvalidState {
            operation,
            kind,
            state,
        }
    }

    /// Create a view error.
    pub fn view(message: impl Into<String>) -> Self {
        Self::View(message.into())
    }

    /// Create a toolkit error.
    pub fn toolkit(message: impl Into<String>) -> Self {
        Self::Toolkit(message.into())
    }

    /// Create a session error.
    pub fn session(message: impl Into<String>) -> Self {
        Self::Session(message.into())
    }

    /// Create a configuration error.
    pub fn config(path: Option<PathBuf>, message: impl Into<String>) -> Self {
        Self::Config {
            path,
            message: message.into(),
        }
    }
}
