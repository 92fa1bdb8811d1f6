//! Session management hooks.
//!
//! The shell only drives a session's lifecycle: it initiates one during
//! startup, terminates it while quitting and invalidates it on request.
//! Authentication itself belongs to whatever implements [`SessionManager`].
//! Without one, the application uses a [`LocalSessionManager`], which is
//! always online.

use std::fmt;

use horizon_shell_core::{ObservableProperty, Signal};

use crate::error::Result;
use crate::logging::targets;

/// The state of the user's session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SessionStatus {
    /// No session has been initiated.
    #[default]
    Unknown,
    /// Connected and authenticated.
    Online,
    /// Working without a server.
    Offline,
    /// The session timed out or was invalidated.
    Expired,
}

/// Manages the user's session on behalf of the application.
///
/// Status is read from any thread; the lifecycle methods are called on the
/// UI thread.
pub trait SessionManager: Send + Sync {
    /// Start a session. `Ok(false)` means the user declined (for example,
    /// cancelled a login prompt) and the application should not start.
    fn initiate_session(&self) -> Result<bool>;

    /// End the session. Called once while the application quits.
    fn terminate_session(&self) -> Result<()>;

    /// Mark the session as no longer valid.
    fn invalidate_session(&self) -> Result<()>;

    /// The current status.
    fn status(&self) -> SessionStatus;

    /// Emitted when the status changes.
    fn status_changed(&self) -> &Signal<SessionStatus>;
}

/// A session manager with no server: sessions always start online.
pub struct LocalSessionManager {
    status: ObservableProperty<SessionStatus>,
}

impl Default for LocalSessionManager {
    fn default() -> Self {
        Self::new()
    }
}

impl LocalSessionManager {
    /// Create a manager in the [`SessionStatus::Unknown`] state.
    pub fn new() -> Self {
        Self {
            status: ObservableProperty::new(SessionStatus::Unknown),
        }
    }

    fn transition(&self, status: SessionStatus) {
        if self.status.set(status) {
            tracing::debug!(target: targets::SESSION, ?status, "session status changed");
        }
    }
}

impl SessionManager for LocalSessionManager {
    fn initiate_session(&self) -> Result<bool> {
        self.transition(SessionStatus::Online);
        Ok(true)
    }

    fn terminate_session(&self) -> Result<()> {
        self.transition(SessionStatus::Unknown);
        Ok(())
    }

    fn invalidate_session(&self) -> Result<()> {
        self.transition(SessionStatus::Expired);
        Ok(())
    }

    fn status(&self) -> SessionStatus {
        self.status.get()
    }

    fn status_changed(&self) -> &Signal<SessionStatus> {
        self.status.changed()
    }
}

impl fmt::Debug for LocalSessionManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LocalSessionManager")
            .field("status", &self.status())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use std::sync::Arc;

    #[test]
    fn test_local_session_lifecycle() {
        let manager = LocalSessionManager::new();
        let seen = Arc::new(Mutex::new(Vec::new()));
        {
            let seen = seen.clone();
            manager
                .status_changed()
                .connect(move |&status| seen.lock().push(status));
        }

        assert_eq!(manager.status(), SessionStatus::Unknown);
        assert!(manager.initiate_session().unwrap());
        manager.invalidate_session().unwrap();
        manager.terminate_session().unwrap();

        assert_eq!(
            *seen.lock(),
            vec![
                SessionStatus::Online,
                SessionStatus::Expired,
                SessionStatus::Unknown
            ]
        );
    }

    #[test]
    fn test_repeated_status_is_not_reported() {
        let manager = LocalSessionManager::new();
        let count = Arc::new(Mutex::new(0));
        {
            let count = count.clone();
            manager.status_changed().connect(move |_| *count.lock() += 1);
        }
        manager.initiate_session().unwrap();
        manager.initiate_session().unwrap();
        assert_eq!(*count.lock(), 1);
    }
}
