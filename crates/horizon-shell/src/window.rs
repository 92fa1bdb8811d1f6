//! Desktop windows and the application's window collection.
//!
//! A [`DesktopWindow`] owns three collections: workspaces, shelves and
//! dialog boxes. Closing a window cascades into its children:
//!
//! 1. [`can_close`](DesktopObject::can_close) asks every workspace without
//!    interaction; one refusal makes a non-interactive window close fail
//!    before anything changes.
//! 2. [`prepare_close`](DesktopObject::prepare_close) closes each open
//!    workspace with `reason | PARENT_CLOSING`, stopping at the first
//!    refusal, then closes the shelves. Shelves cannot block the window.
//!
//! The window title tracks the active workspace: `"{workspace} - {base}"`.

use std::fmt;
use std::ops::Deref;
use std::sync::{Arc, Weak};

use horizon_shell_core::{Subscription, SubscriptionSet};
use parking_lot::Mutex;

use crate::collection::{ActivationPolicy, DesktopObjectCollection};
use crate::desktop_object::{
    CloseReason, DesktopObject, DesktopObjectCore, DesktopObjectExt, DesktopObjectState,
    UserInteraction,
};
use crate::dialog::{DialogBoxCollection, DialogBoxCreationArgs};
use crate::error::{Result, ShellError};
use crate::logging::targets;
use crate::shelf::ShelfCollection;
use crate::view::{
    DesktopWindowView, DialogBoxAction, MessageBoxActions, ViewFactory,
};
use crate::workspace::{Workspace, WorkspaceCollection};

/// Arguments for [`DesktopWindowCollection::add_new`].
#[derive(Debug, Clone, Default)]
pub struct DesktopWindowCreationArgs {
    title: String,
    name: Option<String>,
}

impl DesktopWindowCreationArgs {
    /// A window with base title `title`.
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            name: None,
        }
    }

    /// Give the window a unique name.
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }
}

struct TitleTracking {
    workspace: Weak<Workspace>,
    _subscription: Subscription,
}

/// A top-level desktop window.
pub struct DesktopWindow {
    core: DesktopObjectCore<dyn DesktopWindowView>,
    this: Weak<DesktopWindow>,
    base_title: String,
    view_factory: Arc<dyn ViewFactory>,

    workspaces: WorkspaceCollection,
    shelves: ShelfCollection,
    dialog_boxes: DialogBoxCollection,

    subscriptions: Mutex<SubscriptionSet>,
    title_tracking: Mutex<Option<TitleTracking>>,
}

impl DesktopWindow {
    fn new(args: DesktopWindowCreationArgs, view_factory: Arc<dyn ViewFactory>) -> Arc<Self> {
        Arc::new_cyclic(|this: &Weak<DesktopWindow>| Self {
            core: DesktopObjectCore::new("DesktopWindow", args.name, args.title.clone()),
            this: this.clone(),
            base_title: args.title,
            view_factory,
            workspaces: WorkspaceCollection::new(this.clone()),
            shelves: ShelfCollection::new(this.clone()),
            dialog_boxes: DialogBoxCollection::new(this.clone()),
            subscriptions: Mutex::new(SubscriptionSet::new()),
            title_tracking: Mutex::new(None),
        })
    }

    /// The title the window shows when no workspace is active.
    pub fn base_title(&self) -> &str {
        &self.base_title
    }

    /// The window's workspaces.
    pub fn workspaces(&self) -> &WorkspaceCollection {
        &self.workspaces
    }

    /// The active workspace.
    pub fn active_workspace(&self) -> Option<Arc<Workspace>> {
        self.workspaces.active_workspace()
    }

    /// The window's shelves.
    pub fn shelves(&self) -> &ShelfCollection {
        &self.shelves
    }

    /// The window's dialog boxes.
    pub fn dialog_boxes(&self) -> &DialogBoxCollection {
        &self.dialog_boxes
    }

    /// Show a message box in front of this window.
    ///
    /// Valid while open or closing.
    pub fn show_message_box(
        &self,
        message: &str,
        actions: MessageBoxActions,
    ) -> Result<DialogBoxAction> {
        self.core.require_state(
            "show_message_box",
            &[DesktopObjectState::Open, DesktopObjectState::Closing],
        )?;
        let view = self
            .core
            .view()
            .ok_or_else(|| ShellError::view("window has no view"))?;
        Ok(view.show_message_box(message, actions))
    }

    /// Add a dialog box for `args` and run it modally.
    ///
    /// Valid while open or closing.
    pub fn show_dialog_box(&self, args: DialogBoxCreationArgs) -> Result<DialogBoxAction> {
        self.core.require_state(
            "show_dialog_box",
            &[DesktopObjectState::Open, DesktopObjectState::Closing],
        )?;
        let dialog = self.dialog_boxes.add_new(args)?;
        dialog.run_modal()
    }

    fn make_title(&self) -> String {
        match self.workspaces.active_workspace() {
            Some(workspace) => format!("{} - {}", workspace.title(), self.base_title),
            None => self.base_title.clone(),
        }
    }

    fn update_title(&self) {
        self.core.set_title(self.make_title());
    }

    /// Follow the title of `workspace` while it is active.
    fn track_workspace_title(&self, workspace: &Arc<Workspace>) {
        let mut tracking = self.title_tracking.lock();
        let tracked = tracking
            .as_ref()
            .is_some_and(|t| std::ptr::eq(t.workspace.as_ptr(), Arc::as_ptr(workspace)));

        if workspace.is_active() {
            if !tracked {
                let this = self.this.clone();
                let subscription = workspace.core().title_changed().subscribe(move |_| {
                    if let Some(window) = this.upgrade() {
                        window.update_title();
                    }
                });
                *tracking = Some(TitleTracking {
                    workspace: Arc::downgrade(workspace),
                    _subscription: subscription,
                });
            }
        } else if tracked {
            *tracking = None;
        }
    }
}

impl DesktopObject for DesktopWindow {
    type View = dyn DesktopWindowView;

    fn core(&self) -> &DesktopObjectCore<dyn DesktopWindowView> {
        &self.core
    }

    fn create_view(&self) -> Result<Arc<dyn DesktopWindowView>> {
        self.view_factory.create_window_view(self)
    }

    fn can_close(&self) -> bool {
        self.workspaces
            .items()
            .iter()
            .all(|workspace| workspace.can_close())
    }

    fn prepare_close(&self, reason: CloseReason) -> bool {
        let child_reason = reason | CloseReason::PARENT_CLOSING;

        for workspace in self.workspaces.items() {
            if workspace.state() != DesktopObjectState::Open {
                continue;
            }
            match workspace.close_with(UserInteraction::Allowed, child_reason) {
                Ok(outcome) if outcome.is_closed() => {}
                Ok(outcome) => {
                    tracing::debug!(
                        target: targets::OBJECT,
                        window = %self.core.describe(),
                        workspace = %workspace.core().describe(),
                        ?outcome,
                        "workspace blocked window close"
                    );
                    return false;
                }
                Err(err) => {
                    tracing::error!(
                        target: targets::OBJECT,
                        workspace = %workspace.core().describe(),
                        error = %err,
                        "workspace failed to close"
                    );
                    return false;
                }
            }
        }

        for shelf in self.shelves.items() {
            if shelf.state() == DesktopObjectState::Open {
                let outcome = shelf.close_with(UserInteraction::Allowed, child_reason);
                tracing::trace!(
                    target: targets::OBJECT,
                    shelf = %shelf.core().describe(),
                    ?outcome,
                    "shelf closed with window"
                );
            }
        }
        true
    }

    fn on_opened(&self) {
        let this = self.this.clone();
        let subscription = self.workspaces.item_activation_changed().subscribe(move |args| {
            if let Some(window) = this.upgrade() {
                window.track_workspace_title(&args.item);
                window.update_title();
            }
        });
        self.subscriptions.lock().push(subscription);
        self.update_title();
    }

    fn on_disposing(&self) {
        self.subscriptions.lock().release_all();
        *self.title_tracking.lock() = None;

        // Children hold views created by this window's view.
        self.dialog_boxes.dispose();
        self.workspaces.dispose();
        self.shelves.dispose();
    }
}

impl fmt::Debug for DesktopWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DesktopWindow")
            .field("core", &self.core)
            .field("workspaces", &self.workspaces.len())
            .field("shelves", &self.shelves.len())
            .field("dialog_boxes", &self.dialog_boxes.len())
            .finish()
    }
}

/// The application's windows. At most one is active.
#[derive(Clone)]
pub struct DesktopWindowCollection {
    inner: DesktopObjectCollection<DesktopWindow>,
    view_factory: Arc<dyn ViewFactory>,
}

impl DesktopWindowCollection {
    /// Create an empty collection whose windows get views from
    /// `view_factory`.
    pub fn new(view_factory: Arc<dyn ViewFactory>) -> Self {
        Self {
            inner: DesktopObjectCollection::new("windows", ActivationPolicy::Exclusive),
            view_factory,
        }
    }

    /// Create a window for `args` and open it.
    pub fn add_new(&self, args: DesktopWindowCreationArgs) -> Result<Arc<DesktopWindow>> {
        let window = DesktopWindow::new(args, self.view_factory.clone());
        self.inner.open(&window)?;
        Ok(window)
    }

    /// The active window.
    pub fn active_window(&self) -> Option<Arc<DesktopWindow>> {
        self.inner.active_item()
    }
}

impl Deref for DesktopWindowCollection {
    type Target = DesktopObjectCollection<DesktopWindow>;

    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}

impl fmt::Debug for DesktopWindowCollection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&self.inner, f)
    }
}
