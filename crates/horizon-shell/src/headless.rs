//! Headless views and view factory.
//!
//! These views behave like a simple windowing toolkit without drawing
//! anything: opening a view shows and focuses it, activating a workspace
//! deactivates its siblings, and dialogs return from `run_modal`
//! immediately. They make the whole kernel usable in tests and in
//! processes without a display.
//!
//! Toolkit-originated events can be simulated with
//! [`HeadlessView::request_close`], [`HeadlessView::simulate_focus`] and
//! [`HeadlessView::simulate_visibility`].
//!
//! ```
//! use horizon_shell::headless::{HeadlessView, ViewKind};
//! use horizon_shell::view::DesktopObjectView;
//!
//! let view = HeadlessView::new(ViewKind::Shelf);
//! view.open().unwrap();
//! assert!(view.is_visible() && view.is_active());
//! ```

use std::collections::VecDeque;
use std::sync::{Arc, Weak};

use horizon_shell_core::Signal;
use parking_lot::Mutex;

use crate::dialog::DialogBox;
use crate::error::{Result, ShellError};
use crate::shelf::Shelf;
use crate::view::{
    ApplicationView, DesktopObjectView, DesktopWindowView, DialogBoxAction, DialogBoxView,
    MessageBoxActions, ShelfView, ViewFactory, WorkspaceView,
};
use crate::window::DesktopWindow;
use crate::workspace::Workspace;

/// The kind of object a headless view presents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ViewKind {
    /// A desktop window.
    Window,
    /// A workspace.
    Workspace,
    /// A shelf.
    Shelf,
    /// A dialog box.
    DialogBox,
}

#[derive(Debug, Default)]
struct ViewState {
    title: String,
    open: bool,
    visible: bool,
    active: bool,
    disposed: bool,
    modal_runs: usize,
}

/// Views among which at most one is active at a time.
#[derive(Default)]
struct ActivationGroup {
    members: Mutex<Vec<Weak<HeadlessView>>>,
}

impl ActivationGroup {
    fn join(&self, view: &Arc<HeadlessView>) {
        let mut members = self.members.lock();
        members.retain(|member| member.strong_count() > 0);
        members.push(Arc::downgrade(view));
    }

    fn others(&self, view: &HeadlessView) -> Vec<Arc<HeadlessView>> {
        let mut members = self.members.lock();
        members.retain(|weak| weak.strong_count() > 0);
        members
            .iter()
            .filter_map(Weak::upgrade)
            .filter(|other| !std::ptr::eq(Arc::as_ptr(other), view))
            .collect()
    }
}

/// A view that records state instead of drawing.
pub struct HeadlessView {
    kind: ViewKind,
    state: Mutex<ViewState>,
    group: Option<Arc<ActivationGroup>>,
    fail_open: bool,
    active_changed: Signal<bool>,
    visible_changed: Signal<bool>,
    close_requested: Signal<()>,
}

impl HeadlessView {
    /// Create a standalone view.
    pub fn new(kind: ViewKind) -> Arc<Self> {
        Self::build(kind, None, false)
    }

    /// Create a view whose `open` fails.
    pub fn failing(kind: ViewKind) -> Arc<Self> {
        Self::build(kind, None, true)
    }

    fn build(kind: ViewKind, group: Option<Arc<ActivationGroup>>, fail_open: bool) -> Arc<Self> {
        let view = Arc::new(Self {
            kind,
            state: Mutex::new(ViewState::default()),
            group: group.clone(),
            fail_open,
            active_changed: Signal::new(),
            visible_changed: Signal::new(),
            close_requested: Signal::new(),
        });
        if let Some(group) = group {
            group.join(&view);
        }
        view
    }

    /// The kind of object this view presents.
    pub fn kind(&self) -> ViewKind {
        self.kind
    }

    /// The last title set by the kernel.
    pub fn title(&self) -> String {
        self.state.lock().title.clone()
    }

    /// Whether `open` succeeded.
    pub fn is_open(&self) -> bool {
        self.state.lock().open
    }

    /// Whether the view is visible.
    pub fn is_visible(&self) -> bool {
        self.state.lock().visible
    }

    /// Whether the view is focused.
    pub fn is_active(&self) -> bool {
        self.state.lock().active
    }

    /// Whether the view was disposed.
    pub fn is_disposed(&self) -> bool {
        self.state.lock().disposed
    }

    /// Number of times `run_modal` was called.
    pub fn modal_runs(&self) -> usize {
        self.state.lock().modal_runs
    }

    /// Simulate the user clicking the view's close box.
    pub fn request_close(&self) {
        self.close_requested.emit(());
    }

    /// Simulate the toolkit moving focus to or away from the view.
    pub fn simulate_focus(&self, active: bool) {
        if active {
            self.activate();
        } else {
            self.update_active(false);
        }
    }

    /// Simulate the toolkit showing or hiding the view.
    pub fn simulate_visibility(&self, visible: bool) {
        self.update_visible(visible);
    }

    fn update_active(&self, active: bool) {
        let changed = {
            let mut state = self.state.lock();
            if state.disposed || state.active == active {
                false
            } else {
                state.active = active;
                true
            }
        };
        if changed {
            self.active_changed.emit(active);
        }
    }

    fn update_visible(&self, visible: bool) {
        let changed = {
            let mut state = self.state.lock();
            if state.disposed || state.visible == visible {
                false
            } else {
                state.visible = visible;
                true
            }
        };
        if changed {
            self.visible_changed.emit(visible);
        }
    }
}

impl DesktopObjectView for HeadlessView {
    fn open(&self) -> Result<()> {
        if self.fail_open {
            return Err(ShellError::view(format!("{:?} view failed to open", self.kind)));
        }
        self.state.lock().open = true;
        self.show();
        self.activate();
        Ok(())
    }

    fn show(&self) {
        self.update_visible(true);
    }

    fn activate(&self) {
        if let Some(group) = &self.group {
            for other in group.others(self) {
                other.update_active(false);
            }
        }
        self.update_active(true);
    }

    fn set_title(&self, title: &str) {
        self.state.lock().title = title.to_string();
    }

    fn dispose(&self) -> Result<()> {
        let mut state = self.state.lock();
        state.disposed = true;
        state.open = false;
        state.active = false;
        state.visible = false;
        Ok(())
    }

    fn active_changed(&self) -> &Signal<bool> {
        &self.active_changed
    }

    fn visible_changed(&self) -> &Signal<bool> {
        &self.visible_changed
    }

    fn close_requested(&self) -> &Signal<()> {
        &self.close_requested
    }
}

impl WorkspaceView for HeadlessView {}

impl ShelfView for HeadlessView {
    fn hide(&self) {
        self.update_visible(false);
        self.update_active(false);
    }
}

impl DialogBoxView for HeadlessView {
    fn run_modal(&self) -> Result<()> {
        self.state.lock().modal_runs += 1;
        Ok(())
    }
}

/// Shared by every view a factory creates.
#[derive(Default)]
struct FactoryShared {
    views: Mutex<Vec<Weak<HeadlessView>>>,
    windows: Arc<ActivationGroup>,
    responses: Mutex<VecDeque<DialogBoxAction>>,
    messages: Mutex<Vec<String>>,
}

impl FactoryShared {
    fn create(&self, kind: ViewKind, group: Option<Arc<ActivationGroup>>) -> Arc<HeadlessView> {
        let view = HeadlessView::build(kind, group, false);
        let mut views = self.views.lock();
        views.retain(|tracked| tracked.strong_count() > 0);
        views.push(Arc::downgrade(&view));
        view
    }

    fn live_views(&self, kind: ViewKind) -> Vec<Arc<HeadlessView>> {
        let mut views = self.views.lock();
        views.retain(|tracked| tracked.strong_count() > 0);
        views
            .iter()
            .filter_map(Weak::upgrade)
            .filter(|view| view.kind() == kind)
            .collect()
    }

    fn message_box(&self, message: &str, actions: MessageBoxActions) -> DialogBoxAction {
        self.messages.lock().push(message.to_string());
        let scripted = self.responses.lock().pop_front();
        match scripted {
            Some(action) if actions.offers(action) => action,
            _ => default_action(actions),
        }
    }
}

fn default_action(actions: MessageBoxActions) -> DialogBoxAction {
    match actions {
        MessageBoxActions::Ok | MessageBoxActions::OkCancel => DialogBoxAction::Ok,
        MessageBoxActions::YesNo | MessageBoxActions::YesNoCancel => DialogBoxAction::Yes,
    }
}

/// Headless view of a desktop window.
pub struct HeadlessWindowView {
    base: Arc<HeadlessView>,
    workspaces: Arc<ActivationGroup>,
    shared: Arc<FactoryShared>,
}

impl HeadlessWindowView {
    /// The underlying headless view, for simulating toolkit events.
    pub fn base(&self) -> &Arc<HeadlessView> {
        &self.base
    }
}

impl DesktopObjectView for HeadlessWindowView {
    fn open(&self) -> Result<()> {
        self.base.open()
    }

    fn show(&self) {
        self.base.show();
    }

    fn activate(&self) {
        self.base.activate();
    }

    fn set_title(&self, title: &str) {
        self.base.set_title(title);
    }

    fn dispose(&self) -> Result<()> {
        self.base.dispose()
    }

    fn active_changed(&self) -> &Signal<bool> {
        self.base.active_changed()
    }

    fn visible_changed(&self) -> &Signal<bool> {
        self.base.visible_changed()
    }

    fn close_requested(&self) -> &Signal<()> {
        self.base.close_requested()
    }
}

impl DesktopWindowView for HeadlessWindowView {
    fn create_workspace_view(&self, _workspace: &Workspace) -> Result<Arc<dyn WorkspaceView>> {
        Ok(self
            .shared
            .create(ViewKind::Workspace, Some(self.workspaces.clone())))
    }

    fn create_shelf_view(&self, _shelf: &Shelf) -> Result<Arc<dyn ShelfView>> {
        Ok(self.shared.create(ViewKind::Shelf, None))
    }

    fn create_dialog_box_view(&self, _dialog: &DialogBox) -> Result<Arc<dyn DialogBoxView>> {
        Ok(self.shared.create(ViewKind::DialogBox, None))
    }

    fn show_message_box(&self, message: &str, actions: MessageBoxActions) -> DialogBoxAction {
        self.shared.message_box(message, actions)
    }
}

/// Headless application view.
pub struct HeadlessApplicationView {
    shared: Arc<FactoryShared>,
}

impl ApplicationView for HeadlessApplicationView {
    fn show_message_box(&self, message: &str, actions: MessageBoxActions) -> DialogBoxAction {
        self.shared.message_box(message, actions)
    }

    fn dispose(&self) {}
}

/// A [`ViewFactory`] producing headless views.
///
/// Cloning shares the created views and scripted message-box responses.
/// Message boxes answer with the next scripted response that the box
/// offers, falling back to OK/Yes.
#[derive(Clone, Default)]
pub struct HeadlessViewFactory {
    shared: Arc<FactoryShared>,
}

impl HeadlessViewFactory {
    /// Create a factory.
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue the answer for the next message box.
    pub fn push_message_box_response(&self, action: DialogBoxAction) {
        self.shared.responses.lock().push_back(action);
    }

    /// Every message shown so far, in order.
    pub fn messages_shown(&self) -> Vec<String> {
        self.shared.messages.lock().clone()
    }

    /// Every view of `kind` that is still alive, in creation order.
    ///
    /// The factory does not keep views alive; a view is gone once its
    /// object has closed and nobody else holds it.
    pub fn views(&self, kind: ViewKind) -> Vec<Arc<HeadlessView>> {
        self.shared.live_views(kind)
    }

    /// The most recently created view of `kind`.
    pub fn last_view(&self, kind: ViewKind) -> Option<Arc<HeadlessView>> {
        self.views(kind).pop()
    }
}

impl ViewFactory for HeadlessViewFactory {
    fn create_application_view(&self) -> Result<Arc<dyn ApplicationView>> {
        Ok(Arc::new(HeadlessApplicationView {
            shared: self.shared.clone(),
        }))
    }

    fn create_window_view(&self, _window: &DesktopWindow) -> Result<Arc<dyn DesktopWindowView>> {
        let base = self
            .shared
            .create(ViewKind::Window, Some(self.shared.windows.clone()));
        Ok(Arc::new(HeadlessWindowView {
            base,
            workspaces: Arc::new(ActivationGroup::default()),
            shared: self.shared.clone(),
        }))
    }
}
