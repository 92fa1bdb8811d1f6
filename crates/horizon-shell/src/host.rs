//! Component hosting shared by workspaces, shelves and dialog boxes.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

use horizon_shell_core::logging::guard;

use crate::command_history::CommandHistory;
use crate::component::{ApplicationComponent, ApplicationComponentHost, HostKind};
use crate::desktop_object::{
    CloseReason, DesktopObject, DesktopObjectExt, DesktopObjectState, UserInteraction,
};
use crate::error::Result;
use crate::logging::targets;
use crate::window::DesktopWindow;

/// A desktop object that hosts one application component.
pub(crate) trait HostedObject: DesktopObject + Sized {
    const HOST_KIND: HostKind;

    fn site(&self) -> &ComponentSite;

    fn owner_window(&self) -> Option<Arc<DesktopWindow>>;

    fn command_history(&self) -> Option<CommandHistory> {
        None
    }
}

/// Binds a component to its hosting object.
pub(crate) struct ComponentSite {
    component: Arc<dyn ApplicationComponent>,
    exit_requested: AtomicBool,
}

impl ComponentSite {
    pub(crate) fn new(component: Arc<dyn ApplicationComponent>) -> Self {
        Self {
            component,
            exit_requested: AtomicBool::new(false),
        }
    }

    pub(crate) fn component(&self) -> &Arc<dyn ApplicationComponent> {
        &self.component
    }

    pub(crate) fn exit_requested(&self) -> bool {
        self.exit_requested.load(Ordering::SeqCst)
    }

    /// Attach a host for `object` and start the component.
    pub(crate) fn start<T: HostedObject>(&self, object: &Weak<T>) -> Result<()> {
        let host: Arc<dyn ApplicationComponentHost> = Arc::new(ObjectHost {
            object: object.clone(),
        });
        self.component.component_core().set_host(host);
        self.component.start()
    }

    /// Stop the component if it is running, logging failures.
    pub(crate) fn stop(&self, owner: &str) {
        if !self.component.is_started() {
            return;
        }
        match guard("component stop", || self.component.stop()) {
            Some(Ok(())) => {}
            Some(Err(err)) => tracing::error!(
                target: targets::COMPONENT,
                owner,
                error = %err,
                "component failed to stop"
            ),
            None => tracing::error!(target: targets::COMPONENT, owner, "component panicked while stopping"),
        }
    }

    pub(crate) fn can_close(&self) -> bool {
        self.exit_requested() || guard("component can_exit", || self.component.can_exit()).unwrap_or(false)
    }

    pub(crate) fn prepare_close(&self) -> bool {
        self.exit_requested()
            || guard("component prepare_exit", || self.component.prepare_exit()).unwrap_or(false)
    }
}

/// Host handed to a component living directly in a desktop object.
struct ObjectHost<T> {
    object: Weak<T>,
}

impl<T: HostedObject> ApplicationComponentHost for ObjectHost<T> {
    fn kind(&self) -> HostKind {
        T::HOST_KIND
    }

    fn exit(&self) {
        let Some(object) = self.object.upgrade() else {
            return;
        };
        object.site().exit_requested.store(true, Ordering::SeqCst);

        let state = object.state();
        if state != DesktopObjectState::Open {
            tracing::debug!(
                target: targets::COMPONENT,
                object = %object.core().describe(),
                ?state,
                "exit recorded; object not open"
            );
            return;
        }
        let closed = match object.close_with(UserInteraction::Allowed, CloseReason::PROGRAM) {
            Ok(outcome) => {
                tracing::debug!(
                    target: targets::COMPONENT,
                    object = %object.core().describe(),
                    ?outcome,
                    "component exit"
                );
                outcome.is_closed()
            }
            Err(err) => {
                tracing::error!(
                    target: targets::COMPONENT,
                    object = %object.core().describe(),
                    error = %err,
                    "component exit failed"
                );
                false
            }
        };
        // A vetoed exit must not bypass later close checks.
        if !closed {
            object.site().exit_requested.store(false, Ordering::SeqCst);
        }
    }

    fn command_history(&self) -> Option<CommandHistory> {
        self.object.upgrade()?.command_history()
    }

    fn desktop_window(&self) -> Option<Arc<DesktopWindow>> {
        self.object.upgrade()?.owner_window()
    }

    fn title(&self) -> String {
        self.object
            .upgrade()
            .map(|object| object.title())
            .unwrap_or_default()
    }

    fn set_title(&self, title: &str) {
        if let Some(object) = self.object.upgrade() {
            object.core().set_title(title);
        }
    }
}
