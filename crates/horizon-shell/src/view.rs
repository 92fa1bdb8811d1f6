//! View contracts consumed by the desktop kernel.
//!
//! Every desktop object delegates presentation to exactly one view, created
//! when the object opens and disposed when it closes. The kernel never looks
//! inside a view; it calls the methods below and listens to the three
//! view-originated notifications ([`active_changed`], [`visible_changed`],
//! [`close_requested`]), unsubscribing before the view is disposed.
//!
//! A toolkit integration supplies a [`ViewFactory`]. The
//! [`headless`](crate::headless) module provides one that needs no display.
//!
//! [`active_changed`]: DesktopObjectView::active_changed
//! [`visible_changed`]: DesktopObjectView::visible_changed
//! [`close_requested`]: DesktopObjectView::close_requested

use std::sync::Arc;

use horizon_shell_core::Signal;

use crate::dialog::DialogBox;
use crate::error::Result;
use crate::shelf::Shelf;
use crate::window::DesktopWindow;
use crate::workspace::Workspace;

/// The presentation side of a desktop object.
pub trait DesktopObjectView: Send + Sync {
    /// Open (realize) the view.
    fn open(&self) -> Result<()>;

    /// Make the view visible.
    fn show(&self);

    /// Give the view focus.
    fn activate(&self);

    /// Update the displayed title.
    fn set_title(&self, title: &str);

    /// Release the view's resources. Called exactly once, after the kernel
    /// has unsubscribed from the view's notifications.
    fn dispose(&self) -> Result<()>;

    /// Emitted by the view when its active state changes.
    fn active_changed(&self) -> &Signal<bool>;

    /// Emitted by the view when its visibility changes.
    fn visible_changed(&self) -> &Signal<bool>;

    /// Emitted when the user asks the view to close (e.g. its close box).
    fn close_requested(&self) -> &Signal<()>;
}

/// View of a [`Workspace`].
pub trait WorkspaceView: DesktopObjectView {}

/// View of a [`Shelf`].
pub trait ShelfView: DesktopObjectView {
    /// Hide the shelf without closing it.
    fn hide(&self);
}

/// View of a [`DialogBox`].
pub trait DialogBoxView: DesktopObjectView {
    /// Run the dialog modally. Toolkits block here until the dialog closes.
    fn run_modal(&self) -> Result<()>;
}

/// View of a [`DesktopWindow`]; also creates the views of its children.
pub trait DesktopWindowView: DesktopObjectView {
    /// Create the view for a workspace in this window.
    fn create_workspace_view(&self, workspace: &Workspace) -> Result<Arc<dyn WorkspaceView>>;

    /// Create the view for a shelf in this window.
    fn create_shelf_view(&self, shelf: &Shelf) -> Result<Arc<dyn ShelfView>>;

    /// Create the view for a dialog box owned by this window.
    fn create_dialog_box_view(&self, dialog: &DialogBox) -> Result<Arc<dyn DialogBoxView>>;

    /// Show a message box parented to this window.
    fn show_message_box(&self, message: &str, actions: MessageBoxActions) -> DialogBoxAction;
}

/// Application-level view, used before any window exists.
pub trait ApplicationView: Send + Sync {
    /// Show a message box not parented to any window.
    fn show_message_box(&self, message: &str, actions: MessageBoxActions) -> DialogBoxAction;

    /// Release the view's resources.
    fn dispose(&self);
}

/// Creates the top-level views for an application.
pub trait ViewFactory: Send + Sync {
    /// Create the application view.
    fn create_application_view(&self) -> Result<Arc<dyn ApplicationView>>;

    /// Create the view for a desktop window.
    fn create_window_view(&self, window: &DesktopWindow) -> Result<Arc<dyn DesktopWindowView>>;
}

/// Buttons offered by a message box.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageBoxActions {
    /// A single OK button.
    Ok,
    /// OK and Cancel.
    OkCancel,
    /// Yes and No.
    YesNo,
    /// Yes, No and Cancel.
    YesNoCancel,
}

impl MessageBoxActions {
    /// Whether `action` is one of the offered buttons.
    pub fn offers(self, action: DialogBoxAction) -> bool {
        use DialogBoxAction as A;
        match self {
            Self::Ok => action == A::Ok,
            Self::OkCancel => matches!(action, A::Ok | A::Cancel),
            Self::YesNo => matches!(action, A::Yes | A::No),
            Self::YesNoCancel => matches!(action, A::Yes | A::No | A::Cancel),
        }
    }
}

/// The button a user chose in a message box or dialog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DialogBoxAction {
    /// OK.
    Ok,
    /// Cancel.
    Cancel,
    /// Yes.
    Yes,
    /// No.
    No,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_box_actions_offers() {
        assert!(MessageBoxActions::OkCancel.offers(DialogBoxAction::Cancel));
        assert!(!MessageBoxActions::Ok.offers(DialogBoxAction::Cancel));
        assert!(MessageBoxActions::YesNoCancel.offers(DialogBoxAction::No));
        assert!(!MessageBoxActions::YesNo.offers(DialogBoxAction::Ok));
    }
}
