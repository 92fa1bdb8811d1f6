//! Shelves: auxiliary panels docked around or floating over a window.

use std::fmt;
use std::ops::{BitOr, Deref};
use std::sync::{Arc, Weak};

use crate::collection::{ActivationPolicy, DesktopObjectCollection};
use crate::component::{ApplicationComponent, HostKind};
use crate::desktop_object::{CloseReason, DesktopObject, DesktopObjectCore, DesktopObjectState};
use crate::error::{Result, ShellError};
use crate::host::{ComponentSite, HostedObject};
use crate::view::{DesktopObjectView, DesktopWindowView, ShelfView};
use crate::window::DesktopWindow;

/// Placement hints for a shelf, passed through to the view.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct ShelfDisplayHint(u16);

impl ShelfDisplayHint {
    /// No preference.
    pub const NONE: ShelfDisplayHint = ShelfDisplayHint(0);
    /// Dock at the top.
    pub const DOCK_TOP: ShelfDisplayHint = ShelfDisplayHint(1 << 0);
    /// Dock at the bottom.
    pub const DOCK_BOTTOM: ShelfDisplayHint = ShelfDisplayHint(1 << 1);
    /// Dock at the left.
    pub const DOCK_LEFT: ShelfDisplayHint = ShelfDisplayHint(1 << 2);
    /// Dock at the right.
    pub const DOCK_RIGHT: ShelfDisplayHint = ShelfDisplayHint(1 << 3);
    /// Float over the window.
    pub const DOCK_FLOAT: ShelfDisplayHint = ShelfDisplayHint(1 << 4);
    /// Collapse when not in use.
    pub const DOCK_AUTO_HIDE: ShelfDisplayHint = ShelfDisplayHint(1 << 5);
    /// Take the whole dock area.
    pub const MAXIMIZE_ON_DOCK: ShelfDisplayHint = ShelfDisplayHint(1 << 6);
    /// Hide when a workspace opens.
    pub const HIDE_ON_WORKSPACE_OPEN: ShelfDisplayHint = ShelfDisplayHint(1 << 7);

    /// Check if every flag in `hint` is set.
    pub fn has(&self, hint: ShelfDisplayHint) -> bool {
        (self.0 & hint.0) == hint.0
    }
}

impl BitOr for ShelfDisplayHint {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self::Output {
        ShelfDisplayHint(self.0 | rhs.0)
    }
}

impl fmt::Debug for ShelfDisplayHint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ShelfDisplayHint({:#06b})", self.0)
    }
}

/// Arguments for [`ShelfCollection::add_new`].
pub struct ShelfCreationArgs {
    component: Arc<dyn ApplicationComponent>,
    title: String,
    name: Option<String>,
    display_hint: ShelfDisplayHint,
}

impl ShelfCreationArgs {
    /// Host `component` in a shelf titled `title`.
    pub fn new(component: Arc<dyn ApplicationComponent>, title: impl Into<String>) -> Self {
        Self {
            component,
            title: title.into(),
            name: None,
            display_hint: ShelfDisplayHint::NONE,
        }
    }

    /// Give the shelf a unique name.
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Set the placement hint.
    pub fn display_hint(mut self, hint: ShelfDisplayHint) -> Self {
        self.display_hint = hint;
        self
    }
}

/// A shelf hosting one application component.
///
/// Shelf components may always exit, so a shelf never blocks its window
/// from closing.
pub struct Shelf {
    core: DesktopObjectCore<dyn ShelfView>,
    this: Weak<Shelf>,
    window: Weak<DesktopWindow>,
    site: ComponentSite,
    display_hint: ShelfDisplayHint,
}

impl Shelf {
    fn new(window: Weak<DesktopWindow>, args: ShelfCreationArgs) -> Arc<Self> {
        Arc::new_cyclic(|this| Self {
            core: DesktopObjectCore::new("Shelf", args.name, args.title),
            this: this.clone(),
            window,
            site: ComponentSite::new(args.component),
            display_hint: args.display_hint,
        })
    }

    /// The hosted component.
    pub fn component(&self) -> &Arc<dyn ApplicationComponent> {
        self.site.component()
    }

    /// The placement hint.
    pub fn display_hint(&self) -> ShelfDisplayHint {
        self.display_hint
    }

    /// The owning window, while it exists.
    pub fn desktop_window(&self) -> Option<Arc<DesktopWindow>> {
        self.window.upgrade()
    }

    /// Show the shelf. Only valid while open.
    pub fn show(&self) -> Result<()> {
        self.core.require_state("show", &[DesktopObjectState::Open])?;
        if let Some(view) = self.core.view() {
            view.show();
        }
        Ok(())
    }

    /// Hide the shelf without closing it. Only valid while open.
    pub fn hide(&self) -> Result<()> {
        self.core.require_state("hide", &[DesktopObjectState::Open])?;
        if let Some(view) = self.core.view() {
            view.hide();
        }
        Ok(())
    }
}

impl DesktopObject for Shelf {
    type View = dyn ShelfView;

    fn core(&self) -> &DesktopObjectCore<dyn ShelfView> {
        &self.core
    }

    fn create_view(&self) -> Result<Arc<dyn ShelfView>> {
        let window_view = self
            .window
            .upgrade()
            .and_then(|window| window.core().view())
            .ok_or_else(|| ShellError::view("shelf has no open window"))?;
        window_view.create_shelf_view(self)
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

impl HostedObject for Shelf {
    const HOST_KIND: HostKind = HostKind::Shelf;

    fn site(&self) -> &ComponentSite {
        &self.site
    }

    fn owner_window(&self) -> Option<Arc<DesktopWindow>> {
        self.desktop_window()
    }

    fn command_history(&self) -> Option<crate::command_history::CommandHistory> {
        self.desktop_window()?
            .workspaces()
            .active_workspace()
            .map(|workspace| workspace.command_history().clone())
    }
}

impl fmt::Debug for Shelf {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Shelf")
            .field("core", &self.core)
            .field("display_hint", &self.display_hint)
            .finish()
    }
}

/// The shelves of one window.
pub struct ShelfCollection {
    inner: DesktopObjectCollection<Shelf>,
    window: Weak<DesktopWindow>,
}

impl ShelfCollection {
    pub(crate) fn new(window: Weak<DesktopWindow>) -> Self {
        Self {
            inner: DesktopObjectCollection::new("shelves", ActivationPolicy::Forward),
            window,
        }
    }

    /// Create a shelf for `args` and open it.
    pub fn add_new(&self, args: ShelfCreationArgs) -> Result<Arc<Shelf>> {
        let window = self
            .window
            .upgrade()
            .ok_or_else(|| ShellError::view("shelf has no open window"))?;
        window
            .core()
            .require_state("add shelf", &[DesktopObjectState::Open])?;

        let shelf = Shelf::new(self.window.clone(), args);
        self.inner.open(&shelf)?;
        Ok(shelf)
    }
}

impl Deref for ShelfCollection {
    type Target = DesktopObjectCollection<Shelf>;

    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}

impl fmt::Debug for ShelfCollection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&self.inner, f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_hint_flags() {
        let hint = ShelfDisplayHint::DOCK_LEFT | ShelfDisplayHint::DOCK_AUTO_HIDE;
        assert!(hint.has(ShelfDisplayHint::DOCK_LEFT));
        assert!(!hint.has(ShelfDisplayHint::DOCK_RIGHT));
        assert!(hint.has(ShelfDisplayHint::NONE));
    }
}
