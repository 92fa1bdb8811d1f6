//! Modal dialog boxes owned by a desktop window.

use std::fmt;
use std::ops::Deref;
use std::sync::{Arc, Weak};

use crate::collection::{ActivationPolicy, DesktopObjectCollection};
use crate::component::{ApplicationComponent, ComponentExitCode, HostKind};
use crate::desktop_object::{CloseReason, DesktopObject, DesktopObjectCore, DesktopObjectState};
use crate::error::{Result, ShellError};
use crate::host::{ComponentSite, HostedObject};
use crate::view::{DesktopWindowView, DialogBoxAction, DialogBoxView};
use crate::window::DesktopWindow;

/// Preferred size of a dialog box.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum DialogSize {
    /// Let the view size the dialog to its content.
    #[default]
    Automatic,
    /// A small dialog.
    Small,
    /// A medium dialog.
    Medium,
    /// A large dialog.
    Large,
    /// Explicit size in logical pixels.
    Custom {
        /// Width.
        width: u32,
        /// Height.
        height: u32,
    },
}

/// Arguments for [`DialogBoxCollection::add_new`].
pub struct DialogBoxCreationArgs {
    component: Arc<dyn ApplicationComponent>,
    title: String,
    name: Option<String>,
    size: DialogSize,
}

impl DialogBoxCreationArgs {
    /// Host `component` in a dialog titled `title`.
    pub fn new(component: Arc<dyn ApplicationComponent>, title: impl Into<String>) -> Self {
        Self {
            component,
            title: title.into(),
            name: None,
            size: DialogSize::Automatic,
        }
    }

    /// Give the dialog a unique name.
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Set the size hint.
    pub fn size(mut self, size: DialogSize) -> Self {
        self.size = size;
        self
    }
}

/// A dialog box hosting one application component.
pub struct DialogBox {
    core: DesktopObjectCore<dyn DialogBoxView>,
    this: Weak<DialogBox>,
    window: Weak<DesktopWindow>,
    site: ComponentSite,
    size: DialogSize,
}

impl DialogBox {
    fn new(window: Weak<DesktopWindow>, args: DialogBoxCreationArgs) -> Arc<Self> {
        Arc::new_cyclic(|this| Self {
            core: DesktopObjectCore::new("DialogBox", args.name, args.title),
            this: this.clone(),
            window,
            site: ComponentSite::new(args.component),
            size: args.size,
        })
    }

    /// The hosted component.
    pub fn component(&self) -> &Arc<dyn ApplicationComponent> {
        self.site.component()
    }

    /// The size hint.
    pub fn size(&self) -> DialogSize {
        self.size
    }

    /// The owning window, while it exists.
    pub fn desktop_window(&self) -> Option<Arc<DesktopWindow>> {
        self.window.upgrade()
    }

    /// Run the dialog modally through its view.
    ///
    /// Returns `Ok` if the component exited with
    /// [`ComponentExitCode::Accepted`], `Cancel` otherwise.
    pub fn run_modal(&self) -> Result<DialogBoxAction> {
        self.core.require_state("run_modal", &[DesktopObjectState::Open])?;
        if let Some(view) = self.core.view() {
            view.run_modal()?;
        }
        Ok(match self.component().exit_code() {
            ComponentExitCode::Accepted => DialogBoxAction::Ok,
            ComponentExitCode::None | ComponentExitCode::Error => DialogBoxAction::Cancel,
        })
    }
}

impl DesktopObject for DialogBox {
    type View = dyn DialogBoxView;

    fn core(&self) -> &DesktopObjectCore<dyn DialogBoxView> {
        &self.core
    }

    fn create_view(&self) -> Result<Arc<dyn DialogBoxView>> {
        let window_view = self
            .window
            .upgrade()
            .and_then(|window| window.core().view())
            .ok_or_else(|| ShellError::view("dialog box has no open window"))?;
        window_view.create_dialog_box_view(self)
    }

    fn initialize(&self) -> Result<()> {
        self.site.start(&self.this)
    }

    fn can_close(&self) -> bool {
        self.site.can_close()
    }

    fn prepare_close(&self, _reason: CloseReason) -> bool {
        if self.can_close() {
            return true;
        }
        self.core.show_and_activate();
        self.site.prepare_close()
    }

    fn on_disposing(&self) {
        self.site.stop(&self.core.describe());
    }
}

impl HostedObject for DialogBox {
    const HOST_KIND: HostKind = HostKind::DialogBox;

    fn site(&self) -> &ComponentSite {
        &self.site
    }

    fn owner_window(&self) -> Option<Arc<DesktopWindow>> {
        self.desktop_window()
    }
}

impl fmt::Debug for DialogBox {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DialogBox")
            .field("core", &self.core)
            .field("size", &self.size)
            .finish()
    }
}

/// The dialog boxes of one window.
pub struct DialogBoxCollection {
    inner: DesktopObjectCollection<DialogBox>,
    window: Weak<DesktopWindow>,
}

impl DialogBoxCollection {
    pub(crate) fn new(window: Weak<DesktopWindow>) -> Self {
        Self {
            inner: DesktopObjectCollection::new("dialog boxes", ActivationPolicy::Forward),
            window,
        }
    }

    /// Create a dialog box for `args` and open it.
    ///
    /// The owning window may be open or closing; a closing window can
    /// still ask the user something.
    pub fn add_new(&self, args: DialogBoxCreationArgs) -> Result<Arc<DialogBox>> {
        let window = self
            .window
            .upgrade()
            .ok_or_else(|| ShellError::view("dialog box has no open window"))?;
        window.core().require_state(
            "add dialog box",
            &[DesktopObjectState::Open, DesktopObjectState::Closing],
        )?;

        let dialog = DialogBox::new(self.window.clone(), args);
        self.inner.open(&dialog)?;
        Ok(dialog)
    }
}

impl Deref for DialogBoxCollection {
    type Target = DesktopObjectCollection<DialogBox>;

    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}

impl fmt::Debug for DialogBoxCollection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&self.inner, f)
    }
}
