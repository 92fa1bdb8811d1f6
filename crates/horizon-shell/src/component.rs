//! Application components and their hosts.
//!
//! An [`ApplicationComponent`] supplies the content of a workspace, shelf or
//! dialog box. It is started when its host object opens and stopped when
//! that object is disposed. The host is the component's only channel back
//! to the desktop: it asks to [`exit`](ApplicationComponentHost::exit),
//! reaches the owning window and the command history, and sets the title.
//!
//! # Exit negotiation
//!
//! When the host initiates a close, the kernel asks
//! [`can_exit`](ApplicationComponent::can_exit) (no interaction) and then
//! [`prepare_exit`](ApplicationComponent::prepare_exit) (may prompt). When
//! the component initiates it through [`ComponentCore::exit`], neither is
//! consulted.
//!
//! # Example
//!
//! ```
//! use horizon_shell::{ApplicationComponent, ComponentCore};
//!
//! struct Notes {
//!     core: ComponentCore,
//! }
//!
//! impl ApplicationComponent for Notes {
//!     fn component_core(&self) -> &ComponentCore {
//!         &self.core
//!     }
//! }
//!
//! let notes = Notes { core: ComponentCore::new() };
//! notes.start().unwrap();
//! notes.component_core().set_modified(true);
//! assert!(!notes.can_exit());
//! ```

use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use horizon_shell_core::{ObservableProperty, Signal};
use parking_lot::Mutex;

use crate::command_history::CommandHistory;
use crate::dialog::DialogBoxCreationArgs;
use crate::error::{Result, ShellError};
use crate::logging::targets;
use crate::shelf::{Shelf, ShelfCreationArgs, ShelfDisplayHint};
use crate::validation::ValidationRuleSet;
use crate::view::{DialogBoxAction, MessageBoxActions};
use crate::window::DesktopWindow;
use crate::workspace::{Workspace, WorkspaceCreationArgs};

/// Message shown when a modified component is asked to exit.
pub const DISCARD_CHANGES_MESSAGE: &str = "Discard changes made in this window?";

/// The kind of object hosting a component.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HostKind {
    /// Hosted in a workspace.
    Workspace,
    /// Hosted in a shelf.
    Shelf,
    /// Hosted in a dialog box.
    DialogBox,
}

impl HostKind {
    /// Whether components in this host may always exit without asking.
    pub fn is_non_blocking(self) -> bool {
        matches!(self, HostKind::Shelf | HostKind::DialogBox)
    }
}

/// How a component finished.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ComponentExitCode {
    /// No exit code was set.
    #[default]
    None,
    /// The user accepted the component's work.
    Accepted,
    /// The component failed.
    Error,
}

/// A set of action identifiers a component exports to the desktop.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ActionSet(BTreeSet<String>);

impl ActionSet {
    /// Create an empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an action identifier.
    pub fn insert(&mut self, action: impl Into<String>) -> bool {
        self.0.insert(action.into())
    }

    /// Whether the set contains `action`.
    pub fn contains(&self, action: &str) -> bool {
        self.0.contains(action)
    }

    /// Union of two sets.
    pub fn union(&self, other: &ActionSet) -> ActionSet {
        ActionSet(self.0.union(&other.0).cloned().collect())
    }

    /// Number of actions.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the set is empty.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterate over the identifiers in order.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }
}

impl<S: Into<String>> FromIterator<S> for ActionSet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        ActionSet(iter.into_iter().map(Into::into).collect())
    }
}

/// The channel through which a component talks to whatever hosts it.
pub trait ApplicationComponentHost: Send + Sync {
    /// The kind of host.
    fn kind(&self) -> HostKind;

    /// Ask the host to close, without consulting the component.
    fn exit(&self);

    /// The command history available to the component, if any.
    fn command_history(&self) -> Option<CommandHistory>;

    /// The window the component lives in, if it is still around.
    fn desktop_window(&self) -> Option<Arc<DesktopWindow>>;

    /// The host's title.
    fn title(&self) -> String;

    /// Set the host's title.
    fn set_title(&self, title: &str);

    /// Show a message box in the component's window.
    ///
    /// Without a window to show it in, the answer is `Cancel`.
    fn show_message_box(&self, message: &str, actions: MessageBoxActions) -> DialogBoxAction {
        let shown = self
            .desktop_window()
            .map(|window| window.show_message_box(message, actions));
        match shown {
            Some(Ok(action)) => action,
            Some(Err(err)) => {
                tracing::warn!(target: targets::COMPONENT, error = %err, "message box not shown");
                DialogBoxAction::Cancel
            }
            None => {
                tracing::warn!(target: targets::COMPONENT, "message box requested without a window");
                DialogBoxAction::Cancel
            }
        }
    }
}

/// State shared by every application component.
pub struct ComponentCore {
    host: Mutex<Option<Arc<dyn ApplicationComponentHost>>>,
    started: AtomicBool,
    modified: ObservableProperty<bool>,
    exit_code: Mutex<ComponentExitCode>,
    validation_visible: AtomicBool,
    validation: ValidationRuleSet,

    started_signal: Signal<()>,
    stopped: Signal<()>,
    validation_visible_changed: Signal<bool>,
}

impl Default for ComponentCore {
    fn default() -> Self {
        Self::new()
    }
}

impl ComponentCore {
    /// Create the core of an unstarted, unhosted component.
    pub fn new() -> Self {
        Self {
            host: Mutex::new(None),
            started: AtomicBool::new(false),
            modified: ObservableProperty::new(false),
            exit_code: Mutex::new(ComponentExitCode::None),
            validation_visible: AtomicBool::new(false),
            validation: ValidationRuleSet::new(),
            started_signal: Signal::new(),
            stopped: Signal::new(),
            validation_visible_changed: Signal::new(),
        }
    }

    /// Attach the host. Called by the framework before `start`.
    pub fn set_host(&self, host: Arc<dyn ApplicationComponentHost>) {
        *self.host.lock() = Some(host);
    }

    /// The host.
    pub fn host(&self) -> Result<Arc<dyn ApplicationComponentHost>> {
        self.host.lock().clone().ok_or(ShellError::ComponentNotHosted)
    }

    /// The host kind, if hosted.
    pub fn host_kind(&self) -> Option<HostKind> {
        self.host.lock().as_ref().map(|host| host.kind())
    }

    /// Mark the component started.
    pub fn start(&self) -> Result<()> {
        if self.started.swap(true, Ordering::SeqCst) {
            return Err(ShellError::ComponentAlreadyStarted);
        }
        tracing::debug!(target: targets::COMPONENT, "component started");
        self.started_signal.emit(());
        Ok(())
    }

    /// Mark the component stopped.
    pub fn stop(&self) -> Result<()> {
        if !self.started.swap(false, Ordering::SeqCst) {
            return Err(ShellError::ComponentNotStarted);
        }
        tracing::debug!(target: targets::COMPONENT, "component stopped");
        self.stopped.emit(());
        Ok(())
    }

    /// Whether the component is started.
    pub fn is_started(&self) -> bool {
        self.started.load(Ordering::SeqCst)
    }

    /// Whether the component holds unsaved changes.
    pub fn is_modified(&self) -> bool {
        self.modified.get()
    }

    /// Set the modified flag, notifying listeners on change.
    pub fn set_modified(&self, modified: bool) {
        self.modified.set(modified);
    }

    /// The exit code.
    pub fn exit_code(&self) -> ComponentExitCode {
        *self.exit_code.lock()
    }

    /// Set the exit code without exiting.
    pub fn set_exit_code(&self, code: ComponentExitCode) {
        *self.exit_code.lock() = code;
    }

    /// Set the exit code and ask the host to exit.
    pub fn exit(&self, code: ComponentExitCode) -> Result<()> {
        self.set_exit_code(code);
        let host = self.host()?;
        tracing::debug!(target: targets::COMPONENT, ?code, "component requested exit");
        host.exit();
        Ok(())
    }

    /// Show a message box through the host.
    pub fn show_message_box(&self, message: &str, actions: MessageBoxActions) -> DialogBoxAction {
        match self.host() {
            Ok(host) => host.show_message_box(message, actions),
            Err(_) => {
                tracing::warn!(target: targets::COMPONENT, "message box requested by an unhosted component");
                DialogBoxAction::Cancel
            }
        }
    }

    /// The validation rules.
    pub fn validation(&self) -> &ValidationRuleSet {
        &self.validation
    }

    /// Whether views should display validation messages.
    pub fn validation_visible(&self) -> bool {
        self.validation_visible.load(Ordering::SeqCst)
    }

    /// Show or hide validation messages. Listeners are notified only
    /// while started.
    pub fn show_validation(&self, show: bool) {
        self.validation_visible.store(show, Ordering::SeqCst);
        if self.is_started() {
            self.validation_visible_changed.emit(show);
        }
    }

    /// The validation message for `property`, if messages are visible and
    /// a rule fails.
    pub fn validation_message(&self, property: &str) -> Option<String> {
        if self.validation_visible() {
            self.validation.message_for(property)
        } else {
            None
        }
    }

    /// Emitted after the component starts.
    pub fn started(&self) -> &Signal<()> {
        &self.started_signal
    }

    /// Emitted after the component stops.
    pub fn stopped(&self) -> &Signal<()> {
        &self.stopped
    }

    /// Emitted when the modified flag changes.
    pub fn modified_changed(&self) -> &Signal<bool> {
        self.modified.changed()
    }

    /// Emitted when validation visibility is set while started.
    pub fn validation_visible_changed(&self) -> &Signal<bool> {
        &self.validation_visible_changed
    }
}

impl fmt::Debug for ComponentCore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComponentCore")
            .field("host", &self.host_kind())
            .field("started", &self.is_started())
            .field("modified", &self.is_modified())
            .field("exit_code", &self.exit_code())
            .finish()
    }
}

/// Content hosted by a workspace, shelf or dialog box.
///
/// Implementors hold a [`ComponentCore`] and override the hooks they need.
/// Overrides of `start` and `stop` must call through to the core.
pub trait ApplicationComponent: Send + Sync + 'static {
    /// The shared component state.
    fn component_core(&self) -> &ComponentCore;

    /// Start the component. Fails if already started.
    fn start(&self) -> Result<()> {
        self.component_core().start()
    }

    /// Stop the component. Fails if not started.
    fn stop(&self) -> Result<()> {
        self.component_core().stop()
    }

    /// Whether the component is started.
    fn is_started(&self) -> bool {
        self.component_core().is_started()
    }

    /// Whether the component can exit without asking the user.
    ///
    /// Shelf and dialog components always can; others can unless modified.
    fn can_exit(&self) -> bool {
        let core = self.component_core();
        if core.host_kind().is_some_and(HostKind::is_non_blocking) {
            return true;
        }
        !self.modified()
    }

    /// Prepare for a host-initiated exit, asking the user to discard
    /// changes if modified. Returns `false` if the user cancels.
    fn prepare_exit(&self) -> bool {
        let core = self.component_core();
        if core.host_kind().is_some_and(HostKind::is_non_blocking) {
            return true;
        }
        if self.modified() {
            let answer = core.show_message_box(DISCARD_CHANGES_MESSAGE, MessageBoxActions::OkCancel);
            if answer == DialogBoxAction::Cancel {
                return false;
            }
        }
        true
    }

    /// Whether the component holds unsaved changes.
    fn modified(&self) -> bool {
        self.component_core().is_modified()
    }

    /// How the component finished.
    fn exit_code(&self) -> ComponentExitCode {
        self.component_core().exit_code()
    }

    /// Whether any validation rule fails.
    fn has_validation_errors(&self) -> bool {
        self.component_core().validation().has_errors()
    }

    /// Show or hide validation messages.
    fn show_validation(&self, show: bool) {
        self.component_core().show_validation(show);
    }

    /// Actions the component exports to its window.
    fn exported_actions(&self) -> ActionSet {
        ActionSet::new()
    }
}

/// Open `component` in a new workspace of `window`.
///
/// An error from the component's `start` propagates and the workspace is
/// not opened.
pub fn launch_as_workspace(
    window: &Arc<DesktopWindow>,
    component: Arc<dyn ApplicationComponent>,
    title: impl Into<String>,
) -> Result<Arc<Workspace>> {
    window
        .workspaces()
        .add_new(WorkspaceCreationArgs::new(component, title))
}

/// Open `component` in a new shelf of `window`.
pub fn launch_as_shelf(
    window: &Arc<DesktopWindow>,
    component: Arc<dyn ApplicationComponent>,
    title: impl Into<String>,
    display_hint: ShelfDisplayHint,
) -> Result<Arc<Shelf>> {
    window
        .shelves()
        .add_new(ShelfCreationArgs::new(component, title).display_hint(display_hint))
}

/// Run `component` in a modal dialog box and return its exit code.
pub fn launch_as_dialog(
    window: &Arc<DesktopWindow>,
    component: Arc<dyn ApplicationComponent>,
    title: impl Into<String>,
) -> Result<ComponentExitCode> {
    let exit_code_source = component.clone();
    window.show_dialog_box(DialogBoxCreationArgs::new(component, title))?;
    Ok(exit_code_source.exit_code())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    struct FixedHost {
        kind: HostKind,
        exits: AtomicUsize,
    }

    impl ApplicationComponentHost for FixedHost {
        fn kind(&self) -> HostKind {
            self.kind
        }

        fn exit(&self) {
            self.exits.fetch_add(1, Ordering::SeqCst);
        }

        fn command_history(&self) -> Option<CommandHistory> {
            None
        }

        fn desktop_window(&self) -> Option<Arc<DesktopWindow>> {
            None
        }

        fn title(&self) -> String {
            String::new()
        }

        fn set_title(&self, _title: &str) {}
    }

    struct Plain {
        core: ComponentCore,
    }

    impl ApplicationComponent for Plain {
        fn component_core(&self) -> &ComponentCore {
            &self.core
        }
    }

    fn hosted(kind: HostKind) -> (Plain, Arc<FixedHost>) {
        let host = Arc::new(FixedHost {
            kind,
            exits: AtomicUsize::new(0),
        });
        let component = Plain {
            core: ComponentCore::new(),
        };
        component.core.set_host(host.clone());
        (component, host)
    }

    #[test]
    fn test_start_stop_guards() {
        let (component, _) = hosted(HostKind::Workspace);
        assert!(matches!(component.stop(), Err(ShellError::ComponentNotStarted)));
        component.start().unwrap();
        assert!(matches!(component.start(), Err(ShellError::ComponentAlreadyStarted)));
        component.stop().unwrap();
        assert!(!component.is_started());
    }

    #[test]
    fn test_can_exit_depends_on_host_kind() {
        let (workspace_component, _) = hosted(HostKind::Workspace);
        workspace_component.core.set_modified(true);
        assert!(!workspace_component.can_exit());

        let (shelf_component, _) = hosted(HostKind::Shelf);
        shelf_component.core.set_modified(true);
        assert!(shelf_component.can_exit());
        assert!(shelf_component.prepare_exit());
    }

    #[test]
    fn test_prepare_exit_without_window_refuses_when_modified() {
        let (component, _) = hosted(HostKind::Workspace);
        assert!(component.prepare_exit());
        component.core.set_modified(true);
        assert!(!component.prepare_exit());
    }

    #[test]
    fn test_exit_sets_code_then_asks_host() {
        let (component, host) = hosted(HostKind::DialogBox);
        component.core.exit(ComponentExitCode::Accepted).unwrap();
        assert_eq!(component.exit_code(), ComponentExitCode::Accepted);
        assert_eq!(host.exits.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_exit_without_host_fails() {
        let component = Plain {
            core: ComponentCore::new(),
        };
        assert!(matches!(
            component.core.exit(ComponentExitCode::Error),
            Err(ShellError::ComponentNotHosted)
        ));
    }

    #[test]
    fn test_modified_changed_fires_once_per_change() {
        let core = ComponentCore::new();
        let changes = Arc::new(AtomicUsize::new(0));
        let changes_clone = changes.clone();
        core.modified_changed().connect(move |_| {
            changes_clone.fetch_add(1, Ordering::SeqCst);
        });
        core.set_modified(true);
        core.set_modified(true);
        core.set_modified(false);
        assert_eq!(changes.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_validation_messages_hidden_until_shown() {
        let core = ComponentCore::new();
        core.validation().add("name", "Name is required", || false);
        assert_eq!(core.validation_message("name"), None);
        core.show_validation(true);
        assert_eq!(core.validation_message("name").as_deref(), Some("Name is required"));
    }

    #[test]
    fn test_action_set_union() {
        let a: ActionSet = ["file.save", "file.open"].into_iter().collect();
        let b: ActionSet = ["file.save", "edit.undo"].into_iter().collect();
        let all = a.union(&b);
        assert_eq!(all.len(), 3);
        assert_eq!(all.iter().collect::<Vec<_>>(), vec!["edit.undo", "file.open", "file.save"]);
    }
}
