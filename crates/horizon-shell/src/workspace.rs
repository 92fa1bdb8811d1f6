//! Workspaces: the main document areas of a desktop window.

use std::fmt;
use std::ops::Deref;
use std::sync::{Arc, Weak};

use crate::collection::{ActivationPolicy, DesktopObjectCollection};
use crate::command_history::CommandHistory;
use crate::component::{ApplicationComponent, HostKind};
use crate::desktop_object::{CloseReason, DesktopObject, DesktopObjectCore, DesktopObjectState};
use crate::error::{Result, ShellError};
use crate::host::{ComponentSite, HostedObject};
use crate::view::{DesktopWindowView, WorkspaceView};
use crate::window::DesktopWindow;

/// Arguments for [`WorkspaceCollection::add_new`].
pub struct WorkspaceCreationArgs {
    component: Arc<dyn ApplicationComponent>,
    title: String,
    name: Option<String>,
}

impl WorkspaceCreationArgs {
    /// Host `component` in a workspace titled `title`.
    pub fn new(component: Arc<dyn ApplicationComponent>, title: impl Into<String>) -> Self {
        Self {
            component,
            title: title.into(),
            name: None,
        }
    }

    /// Give the workspace a unique name.
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }
}

/// A workspace hosting one application component.
pub struct Workspace {
    core: DesktopObjectCore<dyn WorkspaceView>,
    this: Weak<Workspace>,
    window: Weak<DesktopWindow>,
    site: ComponentSite,
    command_history: CommandHistory,
}

impl Workspace {
    fn new(window: Weak<DesktopWindow>, args: WorkspaceCreationArgs) -> Arc<Self> {
        Arc::new_cyclic(|this| Self {
            core: DesktopObjectCore::new("Workspace", args.name, args.title),
            this: this.clone(),
            window,
            site: ComponentSite::new(args.component),
            command_history: CommandHistory::new(),
        })
    }

    /// The hosted component.
    pub fn component(&self) -> &Arc<dyn ApplicationComponent> {
        self.site.component()
    }

    /// The owning window, while it exists.
    pub fn desktop_window(&self) -> Option<Arc<DesktopWindow>> {
        self.window.upgrade()
    }

    /// This workspace's undo/redo history.
    pub fn command_history(&self) -> &CommandHistory {
        &self.command_history
    }
}

impl DesktopObject for Workspace {
    type View = dyn WorkspaceView;

    fn core(&self) -> &DesktopObjectCore<dyn WorkspaceView> {
        &self.core
    }

    fn create_view(&self) -> Result<Arc<dyn WorkspaceView>> {
        let window_view = self
            .window
            .upgrade()
            .and_then(|window| window.core().view())
            .ok_or_else(|| ShellError::view("workspace has no open window"))?;
        window_view.create_workspace_view(self)
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

impl HostedObject for Workspace {
    const HOST_KIND: HostKind = HostKind::Workspace;

    fn site(&self) -> &ComponentSite {
        &self.site
    }

    fn owner_window(&self) -> Option<Arc<DesktopWindow>> {
        self.desktop_window()
    }

    fn command_history(&self) -> Option<CommandHistory> {
        Some(self.command_history.clone())
    }
}

impl fmt::Debug for Workspace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Workspace").field("core", &self.core).finish()
    }
}

/// The workspaces of one window. At most one is active.
pub struct WorkspaceCollection {
    inner: DesktopObjectCollection<Workspace>,
    window: Weak<DesktopWindow>,
}

impl WorkspaceCollection {
    pub(crate) fn new(window: Weak<DesktopWindow>) -> Self {
        Self {
            inner: DesktopObjectCollection::new("workspaces", ActivationPolicy::Exclusive),
            window,
        }
    }

    /// Create a workspace for `args` and open it.
    ///
    /// Fails if the window is not open, the name is taken, or the
    /// component fails to start.
    pub fn add_new(&self, args: WorkspaceCreationArgs) -> Result<Arc<Workspace>> {
        let window = self
            .window
            .upgrade()
            .ok_or_else(|| ShellError::view("workspace has no open window"))?;
        window
            .core()
            .require_state("add workspace", &[DesktopObjectState::Open])?;

        let workspace = Workspace::new(self.window.clone(), args);
        self.inner.open(&workspace)?;
        Ok(workspace)
    }

    /// The active workspace.
    pub fn active_workspace(&self) -> Option<Arc<Workspace>> {
        self.inner.active_item()
    }
}

impl Deref for WorkspaceCollection {
    type Target = DesktopObjectCollection<Workspace>;

    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}

impl fmt::Debug for WorkspaceCollection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&self.inner, f)
    }
}
