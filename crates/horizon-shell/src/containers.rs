//! Composite components built from child components.
//!
//! Every container is itself an [`ApplicationComponent`] and gives each
//! child a host that forwards to the container's own host: a child asking
//! to exit asks the container's host to exit, and title or command-history
//! requests reach whatever hosts the container.
//!
//! Containers report themselves modified when any child is, fail
//! validation when any child does, and export the union of their
//! children's actions.
//!
//! | container | children |
//! |---|---|
//! | [`SimpleComponentContainer`] | one, with accept/cancel |
//! | [`SplitComponentContainer`] | two panes |
//! | [`PagedComponentContainer`] | pages, optionally started lazily |
//! | [`TabComponentContainer`] | pages addressed by tab title |
//! | [`NavigatorComponentContainer`] | pages addressed by path, with accept/cancel |

use std::fmt;
use std::ops::Deref;
use std::sync::{Arc, Weak};

use horizon_shell_core::Signal;
use horizon_shell_core::logging::guard;
use parking_lot::Mutex;

use crate::command_history::CommandHistory;
use crate::component::{
    ActionSet, ApplicationComponent, ApplicationComponentHost, ComponentCore, ComponentExitCode,
    HostKind,
};
use crate::error::{Result, ShellError};
use crate::logging::targets;
use crate::window::DesktopWindow;

// ============================================================================
// Child hosting
// ============================================================================

/// Host given to a child; forwards everything to the container's host.
struct ChildHost {
    container: Weak<dyn ApplicationComponent>,
}

impl ChildHost {
    fn attach(container: &Weak<dyn ApplicationComponent>, child: &Arc<dyn ApplicationComponent>) {
        child.component_core().set_host(Arc::new(ChildHost {
            container: container.clone(),
        }));
    }

    fn container_host(&self) -> Option<Arc<dyn ApplicationComponentHost>> {
        self.container.upgrade()?.component_core().host().ok()
    }
}

impl ApplicationComponentHost for ChildHost {
    fn kind(&self) -> HostKind {
        self.container_host()
            .map(|host| host.kind())
            .unwrap_or(HostKind::Workspace)
    }

    fn exit(&self) {
        match self.container_host() {
            Some(host) => host.exit(),
            None => tracing::warn!(target: targets::COMPONENT, "child exit ignored; container is not hosted"),
        }
    }

    fn command_history(&self) -> Option<CommandHistory> {
        self.container_host()?.command_history()
    }

    fn desktop_window(&self) -> Option<Arc<DesktopWindow>> {
        self.container_host()?.desktop_window()
    }

    fn title(&self) -> String {
        self.container_host()
            .map(|host| host.title())
            .unwrap_or_default()
    }

    fn set_title(&self, title: &str) {
        if let Some(host) = self.container_host() {
            host.set_title(title);
        }
    }
}

/// Start `children` in order. On failure the ones already started are
/// stopped again and the error is returned.
fn start_all(children: &[&Arc<dyn ApplicationComponent>]) -> Result<()> {
    for (index, child) in children.iter().enumerate() {
        if let Err(err) = child.start() {
            for started in children[..index].iter().rev() {
                stop_child(started);
            }
            return Err(err);
        }
    }
    Ok(())
}

fn stop_child(child: &Arc<dyn ApplicationComponent>) {
    if !child.is_started() {
        return;
    }
    match guard("child component stop", || child.stop()) {
        Some(Ok(())) => {}
        Some(Err(err)) => {
            tracing::error!(target: targets::COMPONENT, error = %err, "child component failed to stop")
        }
        None => tracing::error!(target: targets::COMPONENT, "child component panicked while stopping"),
    }
}

fn aggregate_exit_code<'a>(
    own: ComponentExitCode,
    children: impl IntoIterator<Item = &'a Arc<dyn ApplicationComponent>>,
) -> ComponentExitCode {
    if own != ComponentExitCode::None {
        return own;
    }
    if children
        .into_iter()
        .any(|child| child.exit_code() == ComponentExitCode::Error)
    {
        ComponentExitCode::Error
    } else {
        ComponentExitCode::None
    }
}

fn union_actions<'a>(children: impl IntoIterator<Item = &'a Arc<dyn ApplicationComponent>>) -> ActionSet {
    children
        .into_iter()
        .fold(ActionSet::new(), |acc, child| acc.union(&child.exported_actions()))
}

/// Refuse to start a container twice before touching its children.
fn ensure_not_started(core: &ComponentCore) -> Result<()> {
    if core.is_started() {
        return Err(ShellError::ComponentAlreadyStarted);
    }
    Ok(())
}

// ============================================================================
// Simple
// ============================================================================

/// Wraps one component with accept and cancel.
pub struct SimpleComponentContainer {
    core: ComponentCore,
    child: Arc<dyn ApplicationComponent>,
}

impl SimpleComponentContainer {
    /// Wrap `child`.
    pub fn new(child: Arc<dyn ApplicationComponent>) -> Arc<Self> {
        Arc::new_cyclic(|this: &Weak<Self>| {
            let container: Weak<dyn ApplicationComponent> = this.clone();
            ChildHost::attach(&container, &child);
            Self {
                core: ComponentCore::new(),
                child,
            }
        })
    }

    /// The wrapped component.
    pub fn child(&self) -> &Arc<dyn ApplicationComponent> {
        &self.child
    }

    /// Exit with [`ComponentExitCode::Accepted`].
    ///
    /// If the child has validation errors, they are made visible and
    /// `Ok(false)` is returned without exiting.
    pub fn accept(&self) -> Result<bool> {
        if self.child.has_validation_errors() {
            self.child.show_validation(true);
            return Ok(false);
        }
        self.core.exit(ComponentExitCode::Accepted)?;
        Ok(true)
    }

    /// Exit without accepting.
    pub fn cancel(&self) -> Result<()> {
        self.core.exit(ComponentExitCode::None)
    }
}

impl ApplicationComponent for SimpleComponentContainer {
    fn component_core(&self) -> &ComponentCore {
        &self.core
    }

    fn start(&self) -> Result<()> {
        ensure_not_started(&self.core)?;
        self.child.start()?;
        self.core.start()
    }

    fn stop(&self) -> Result<()> {
        stop_child(&self.child);
        self.core.stop()
    }

    fn modified(&self) -> bool {
        self.core.is_modified() || self.child.modified()
    }

    fn exit_code(&self) -> ComponentExitCode {
        aggregate_exit_code(self.core.exit_code(), [&self.child])
    }

    fn has_validation_errors(&self) -> bool {
        self.child.has_validation_errors()
    }

    fn show_validation(&self, show: bool) {
        self.core.show_validation(show);
        self.child.show_validation(show);
    }

    fn exported_actions(&self) -> ActionSet {
        self.child.exported_actions()
    }
}

impl fmt::Debug for SimpleComponentContainer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SimpleComponentContainer")
            .field("core", &self.core)
            .finish()
    }
}

// ============================================================================
// Split
// ============================================================================

/// Direction in which a split container lays out its panes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SplitOrientation {
    /// Side by side.
    #[default]
    Horizontal,
    /// One above the other.
    Vertical,
}

/// One pane of a [`SplitComponentContainer`].
pub struct SplitPane {
    label: String,
    component: Arc<dyn ApplicationComponent>,
    weight: f32,
}

impl SplitPane {
    /// A pane with weight 1.
    pub fn new(label: impl Into<String>, component: Arc<dyn ApplicationComponent>) -> Self {
        Self {
            label: label.into(),
            component,
            weight: 1.0,
        }
    }

    /// Set the pane's share of the available space, relative to the other
    /// pane. Negative weights count as zero.
    pub fn weight(mut self, weight: f32) -> Self {
        self.weight = weight.max(0.0);
        self
    }

    /// The pane label.
    pub fn label(&self) -> &str {
        &self.label
    }

    /// The pane's component.
    pub fn component(&self) -> &Arc<dyn ApplicationComponent> {
        &self.component
    }
}

impl fmt::Debug for SplitPane {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SplitPane")
            .field("label", &self.label)
            .field("weight", &self.weight)
            .finish()
    }
}

/// Two components side by side or stacked.
pub struct SplitComponentContainer {
    core: ComponentCore,
    panes: [SplitPane; 2],
    orientation: SplitOrientation,
}

impl SplitComponentContainer {
    /// Split `first` and `second` along `orientation`.
    pub fn new(first: SplitPane, second: SplitPane, orientation: SplitOrientation) -> Arc<Self> {
        Arc::new_cyclic(|this: &Weak<Self>| {
            let container: Weak<dyn ApplicationComponent> = this.clone();
            ChildHost::attach(&container, &first.component);
            ChildHost::attach(&container, &second.component);
            Self {
                core: ComponentCore::new(),
                panes: [first, second],
                orientation,
            }
        })
    }

    /// The pane at `index` (0 or 1).
    pub fn pane(&self, index: usize) -> Result<&SplitPane> {
        self.panes.get(index).ok_or(ShellError::IndexOutOfRange {
            index,
            count: self.panes.len(),
        })
    }

    /// The layout direction.
    pub fn orientation(&self) -> SplitOrientation {
        self.orientation
    }

    /// The panes' weights scaled to sum to 1. Two zero weights split evenly.
    pub fn relative_weights(&self) -> (f32, f32) {
        let [a, b] = [self.panes[0].weight, self.panes[1].weight];
        let total = a + b;
        if total <= f32::EPSILON {
            (0.5, 0.5)
        } else {
            (a / total, b / total)
        }
    }

    fn components(&self) -> impl Iterator<Item = &Arc<dyn ApplicationComponent>> {
        self.panes.iter().map(|pane| &pane.component)
    }
}

impl ApplicationComponent for SplitComponentContainer {
    fn component_core(&self) -> &ComponentCore {
        &self.core
    }

    fn start(&self) -> Result<()> {
        ensure_not_started(&self.core)?;
        let children: Vec<_> = self.components().collect();
        start_all(&children)?;
        self.core.start()
    }

    fn stop(&self) -> Result<()> {
        for pane in self.panes.iter().rev() {
            stop_child(&pane.component);
        }
        self.core.stop()
    }

    fn modified(&self) -> bool {
        self.core.is_modified() || self.components().any(|child| child.modified())
    }

    fn exit_code(&self) -> ComponentExitCode {
        aggregate_exit_code(self.core.exit_code(), self.components())
    }

    fn has_validation_errors(&self) -> bool {
        self.components().any(|child| child.has_validation_errors())
    }

    fn show_validation(&self, show: bool) {
        self.core.show_validation(show);
        for child in self.components() {
            child.show_validation(show);
        }
    }

    fn exported_actions(&self) -> ActionSet {
        union_actions(self.components())
    }
}

impl fmt::Debug for SplitComponentContainer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SplitComponentContainer")
            .field("core", &self.core)
            .field("panes", &self.panes)
            .field("orientation", &self.orientation)
            .finish()
    }
}

// ============================================================================
// Paged
// ============================================================================

/// One page of a paged container.
pub struct ContainerPage {
    title: String,
    component: Arc<dyn ApplicationComponent>,
    lazy: bool,
}

impl ContainerPage {
    /// A page started together with its container.
    pub fn new(title: impl Into<String>, component: Arc<dyn ApplicationComponent>) -> Self {
        Self {
            title: title.into(),
            component,
            lazy: false,
        }
    }

    /// Defer starting the page until it is first shown.
    pub fn lazy(mut self, lazy: bool) -> Self {
        self.lazy = lazy;
        self
    }

    /// The page title. Navigator containers use it as the page path.
    pub fn title(&self) -> &str {
        &self.title
    }

    /// The page component.
    pub fn component(&self) -> &Arc<dyn ApplicationComponent> {
        &self.component
    }

    /// Whether the page starts on first navigation.
    pub fn is_lazy(&self) -> bool {
        self.lazy
    }
}

impl fmt::Debug for ContainerPage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ContainerPage")
            .field("title", &self.title)
            .field("lazy", &self.lazy)
            .field("started", &self.component.is_started())
            .finish()
    }
}

/// A sequence of pages, one of which is current.
///
/// Eager pages start with the container. Lazy pages start the first time
/// [`move_to`](Self::move_to) selects them; a page that fails to start is
/// logged and still becomes current.
pub struct PagedComponentContainer {
    core: ComponentCore,
    pages: Vec<ContainerPage>,
    current: Mutex<Option<usize>>,
    current_page_changed: Signal<usize>,
}

impl PagedComponentContainer {
    /// Create a container over `pages`.
    pub fn new(pages: Vec<ContainerPage>) -> Arc<Self> {
        Arc::new_cyclic(|this: &Weak<Self>| {
            let container: Weak<dyn ApplicationComponent> = this.clone();
            Self::with_container(pages, &container)
        })
    }

    fn with_container(pages: Vec<ContainerPage>, container: &Weak<dyn ApplicationComponent>) -> Self {
        for page in &pages {
            ChildHost::attach(container, &page.component);
        }
        Self {
            core: ComponentCore::new(),
            pages,
            current: Mutex::new(None),
            current_page_changed: Signal::new(),
        }
    }

    /// Number of pages.
    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    /// The page at `index`.
    pub fn page(&self, index: usize) -> Result<&ContainerPage> {
        self.pages.get(index).ok_or(ShellError::IndexOutOfRange {
            index,
            count: self.pages.len(),
        })
    }

    /// All pages in order.
    pub fn pages(&self) -> &[ContainerPage] {
        &self.pages
    }

    /// Index of the current page, once the container has started.
    pub fn current_index(&self) -> Option<usize> {
        *self.current.lock()
    }

    /// The current page.
    pub fn current_page(&self) -> Option<&ContainerPage> {
        self.current_index().and_then(|index| self.pages.get(index))
    }

    /// Whether there is a page after the current one.
    pub fn forward_enabled(&self) -> bool {
        self.current_index()
            .is_some_and(|index| index + 1 < self.pages.len())
    }

    /// Whether there is a page before the current one.
    pub fn back_enabled(&self) -> bool {
        self.current_index().is_some_and(|index| index > 0)
    }

    /// Make page `index` current, starting it first if needed.
    ///
    /// Errors from starting the page are logged, not returned.
    #[tracing::instrument(skip(self), target = "horizon_shell::component", level = "debug")]
    pub fn move_to(&self, index: usize) -> Result<()> {
        if !self.core.is_started() {
            return Err(ShellError::ComponentNotStarted);
        }
        let page = self.page(index)?;

        if !page.component.is_started() {
            match guard("page start", || page.component.start()) {
                Some(Ok(())) => {}
                Some(Err(err)) => tracing::error!(
                    target: targets::COMPONENT,
                    page = %page.title,
                    error = %err,
                    "page failed to start"
                ),
                None => tracing::error!(
                    target: targets::COMPONENT,
                    page = %page.title,
                    "page panicked while starting"
                ),
            }
        }

        let previous = self.current.lock().replace(index);
        if previous != Some(index) {
            self.current_page_changed.emit(index);
        }
        Ok(())
    }

    /// Move to the next page. Returns `false` at the last page.
    pub fn forward(&self) -> Result<bool> {
        if !self.forward_enabled() {
            return Ok(false);
        }
        let next = self.current_index().map_or(0, |index| index + 1);
        self.move_to(next)?;
        Ok(true)
    }

    /// Move to the previous page. Returns `false` at the first page.
    pub fn back(&self) -> Result<bool> {
        if !self.back_enabled() {
            return Ok(false);
        }
        let previous = self.current_index().map_or(0, |index| index - 1);
        self.move_to(previous)?;
        Ok(true)
    }

    /// Emitted with the new index when the current page changes.
    pub fn current_page_changed(&self) -> &Signal<usize> {
        &self.current_page_changed
    }

    fn components(&self) -> impl Iterator<Item = &Arc<dyn ApplicationComponent>> {
        self.pages.iter().map(|page| &page.component)
    }

    fn index_where(&self, predicate: impl Fn(&ContainerPage) -> bool) -> Option<usize> {
        self.pages.iter().position(predicate)
    }
}

impl ApplicationComponent for PagedComponentContainer {
    fn component_core(&self) -> &ComponentCore {
        &self.core
    }

    fn start(&self) -> Result<()> {
        ensure_not_started(&self.core)?;
        let eager: Vec<_> = self
            .pages
            .iter()
            .filter(|page| !page.lazy)
            .map(|page| &page.component)
            .collect();
        start_all(&eager)?;
        self.core.start()?;
        if !self.pages.is_empty() {
            self.move_to(0)?;
        }
        Ok(())
    }

    fn stop(&self) -> Result<()> {
        for page in self.pages.iter().rev() {
            stop_child(&page.component);
        }
        *self.current.lock() = None;
        self.core.stop()
    }

    fn modified(&self) -> bool {
        self.core.is_modified() || self.components().any(|child| child.modified())
    }

    fn exit_code(&self) -> ComponentExitCode {
        aggregate_exit_code(self.core.exit_code(), self.components())
    }

    fn has_validation_errors(&self) -> bool {
        self.components().any(|child| child.has_validation_errors())
    }

    fn show_validation(&self, show: bool) {
        self.core.show_validation(show);
        for child in self.components() {
            child.show_validation(show);
        }
    }

    fn exported_actions(&self) -> ActionSet {
        union_actions(self.components())
    }
}

impl fmt::Debug for PagedComponentContainer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PagedComponentContainer")
            .field("core", &self.core)
            .field("pages", &self.pages)
            .field("current", &self.current_index())
            .finish()
    }
}

/// Implements `ApplicationComponent` for a wrapper around a paged container.
macro_rules! delegate_paged_component {
    ($ty:ty) => {
        impl ApplicationComponent for $ty {
            fn component_core(&self) -> &ComponentCore {
                self.paged.component_core()
            }

            fn start(&self) -> Result<()> {
                self.paged.start()
            }

            fn stop(&self) -> Result<()> {
                self.paged.stop()
            }

            fn modified(&self) -> bool {
                self.paged.modified()
            }

            fn exit_code(&self) -> ComponentExitCode {
                self.paged.exit_code()
            }

            fn has_validation_errors(&self) -> bool {
                self.paged.has_validation_errors()
            }

            fn show_validation(&self, show: bool) {
                self.paged.show_validation(show)
            }

            fn exported_actions(&self) -> ActionSet {
                self.paged.exported_actions()
            }
        }

        impl Deref for $ty {
            type Target = PagedComponentContainer;

            fn deref(&self) -> &PagedComponentContainer {
                &self.paged
            }
        }
    };
}

// ============================================================================
// Tab
// ============================================================================

/// Pages presented as tabs and addressed by title.
pub struct TabComponentContainer {
    paged: PagedComponentContainer,
}

impl TabComponentContainer {
    /// Create a container with one tab per page.
    pub fn new(tabs: Vec<ContainerPage>) -> Arc<Self> {
        Arc::new_cyclic(|this: &Weak<Self>| {
            let container: Weak<dyn ApplicationComponent> = this.clone();
            Self {
                paged: PagedComponentContainer::with_container(tabs, &container),
            }
        })
    }

    /// Tab titles in order.
    pub fn tab_titles(&self) -> Vec<&str> {
        self.paged.pages.iter().map(|page| page.title()).collect()
    }

    /// Title of the selected tab.
    pub fn current_tab(&self) -> Option<&str> {
        self.paged.current_page().map(ContainerPage::title)
    }

    /// Select the tab titled `title`.
    pub fn select_tab(&self, title: &str) -> Result<()> {
        let index = self
            .paged
            .index_where(|page| page.title == title)
            .ok_or_else(|| ShellError::NotFound(title.to_string()))?;
        self.paged.move_to(index)
    }
}

delegate_paged_component!(TabComponentContainer);

impl fmt::Debug for TabComponentContainer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("TabComponentContainer")
            .field(&self.paged)
            .finish()
    }
}

// ============================================================================
// Navigator
// ============================================================================

/// Pages addressed by path (`"Display/Colors"`), walked with forward and
/// back, and finished with accept or cancel.
pub struct NavigatorComponentContainer {
    paged: PagedComponentContainer,
}

impl NavigatorComponentContainer {
    /// Create a navigator; each page's title is its path.
    pub fn new(pages: Vec<ContainerPage>) -> Arc<Self> {
        Arc::new_cyclic(|this: &Weak<Self>| {
            let container: Weak<dyn ApplicationComponent> = this.clone();
            Self {
                paged: PagedComponentContainer::with_container(pages, &container),
            }
        })
    }

    /// Path of the current page.
    pub fn current_path(&self) -> Option<&str> {
        self.paged.current_page().map(ContainerPage::title)
    }

    /// Show the page at `path`.
    pub fn navigate_to(&self, path: &str) -> Result<()> {
        let index = self
            .paged
            .index_where(|page| page.title == path)
            .ok_or_else(|| ShellError::NotFound(path.to_string()))?;
        self.paged.move_to(index)
    }

    /// Exit with [`ComponentExitCode::Accepted`].
    ///
    /// If any page has validation errors, validation is made visible, the
    /// first such page becomes current and `Ok(false)` is returned.
    pub fn accept(&self) -> Result<bool> {
        if let Some(index) = self
            .paged
            .index_where(|page| page.component.has_validation_errors())
        {
            self.paged.show_validation(true);
            self.paged.move_to(index)?;
            return Ok(false);
        }
        self.paged.core.exit(ComponentExitCode::Accepted)?;
        Ok(true)
    }

    /// Exit without accepting.
    pub fn cancel(&self) -> Result<()> {
        self.paged.core.exit(ComponentExitCode::None)
    }
}

delegate_paged_component!(NavigatorComponentContainer);

impl fmt::Debug for NavigatorComponentContainer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("NavigatorComponentContainer")
            .field(&self.paged)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct RecordingHost {
        exits: AtomicUsize,
        title: Mutex<String>,
    }

    impl RecordingHost {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                exits: AtomicUsize::new(0),
                title: Mutex::new(String::new()),
            })
        }
    }

    impl ApplicationComponentHost for RecordingHost {
        fn kind(&self) -> HostKind {
            HostKind::Workspace
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
            self.title.lock().clone()
        }

        fn set_title(&self, title: &str) {
            *self.title.lock() = title.to_string();
        }
    }

    #[derive(Default)]
    struct Leaf {
        core: ComponentCore,
        actions: Vec<&'static str>,
        fail_start: bool,
    }

    impl Leaf {
        fn arc() -> Arc<Self> {
            Arc::new(Self::default())
        }

        fn with_actions(actions: Vec<&'static str>) -> Arc<Self> {
            Arc::new(Self {
                actions,
                ..Self::default()
            })
        }

        fn failing() -> Arc<Self> {
            Arc::new(Self {
                fail_start: true,
                ..Self::default()
            })
        }
    }

    impl ApplicationComponent for Leaf {
        fn component_core(&self) -> &ComponentCore {
            &self.core
        }

        fn start(&self) -> Result<()> {
            if self.fail_start {
                return Err(ShellError::Initialization("leaf refused to start".into()));
            }
            self.core.start()
        }

        fn exported_actions(&self) -> ActionSet {
            self.actions.iter().copied().collect()
        }
    }

    fn host<C: ApplicationComponent>(container: &Arc<C>) -> Arc<RecordingHost> {
        let host = RecordingHost::new();
        container.component_core().set_host(host.clone());
        host
    }

    #[test]
    fn test_child_host_forwards_to_container_host() {
        let leaf = Leaf::arc();
        let container = SimpleComponentContainer::new(leaf.clone());
        let host = host(&container);
        container.start().unwrap();

        let child_host = leaf.core.host().unwrap();
        child_host.set_title("Editing");
        assert_eq!(host.title(), "Editing");
        assert_eq!(child_host.title(), "Editing");

        leaf.core.exit(ComponentExitCode::Accepted).unwrap();
        assert_eq!(host.exits.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_simple_accept_refused_with_validation_errors() {
        let leaf = Leaf::arc();
        leaf.core.validation().add("name", "Name is required", || false);
        let container = SimpleComponentContainer::new(leaf.clone());
        let host = host(&container);
        container.start().unwrap();

        assert!(!container.accept().unwrap());
        assert!(leaf.core.validation_visible());
        assert_eq!(host.exits.load(Ordering::SeqCst), 0);
        assert_eq!(container.exit_code(), ComponentExitCode::None);
    }

    #[test]
    fn test_simple_accept_exits() {
        let leaf = Leaf::arc();
        let container = SimpleComponentContainer::new(leaf.clone());
        let host = host(&container);
        container.start().unwrap();
        assert!(leaf.is_started());

        assert!(container.accept().unwrap());
        assert_eq!(container.exit_code(), ComponentExitCode::Accepted);
        assert_eq!(host.exits.load(Ordering::SeqCst), 1);

        container.stop().unwrap();
        assert!(!leaf.is_started());
    }

    #[test]
    fn test_start_twice_leaves_children_alone() {
        let leaf = Leaf::arc();
        let container = SimpleComponentContainer::new(leaf.clone());
        container.start().unwrap();
        assert!(matches!(
            container.start(),
            Err(ShellError::ComponentAlreadyStarted)
        ));
        assert!(leaf.is_started());
    }

    #[test]
    fn test_split_aggregates_children() {
        let left = Leaf::with_actions(vec!["copy", "paste"]);
        let right = Leaf::with_actions(vec!["paste", "zoom"]);
        let split = SplitComponentContainer::new(
            SplitPane::new("left", left.clone()).weight(3.0),
            SplitPane::new("right", right.clone()),
            SplitOrientation::Vertical,
        );
        split.start().unwrap();

        assert!(!split.modified());
        right.core.set_modified(true);
        assert!(split.modified());

        let actions = split.exported_actions();
        assert_eq!(actions.iter().collect::<Vec<_>>(), vec!["copy", "paste", "zoom"]);
        assert_eq!(split.relative_weights(), (0.75, 0.25));
        assert!(matches!(
            split.pane(2),
            Err(ShellError::IndexOutOfRange { index: 2, count: 2 })
        ));
    }

    #[test]
    fn test_split_start_failure_stops_started_panes() {
        let left = Leaf::arc();
        let split = SplitComponentContainer::new(
            SplitPane::new("left", left.clone()),
            SplitPane::new("right", Leaf::failing()),
            SplitOrientation::Horizontal,
        );

        assert!(split.start().is_err());
        assert!(!left.is_started());
        assert!(!split.is_started());
    }

    #[test]
    fn test_paged_lazy_start_and_flags() {
        let first = Leaf::arc();
        let second = Leaf::arc();
        let paged = PagedComponentContainer::new(vec![
            ContainerPage::new("One", first.clone()),
            ContainerPage::new("Two", second.clone()).lazy(true),
        ]);
        let changes = Arc::new(Mutex::new(Vec::new()));
        {
            let changes = changes.clone();
            paged
                .current_page_changed()
                .connect(move |&index| changes.lock().push(index));
        }

        paged.start().unwrap();
        assert!(first.is_started());
        assert!(!second.is_started());
        assert_eq!(paged.current_index(), Some(0));
        assert!(paged.forward_enabled());
        assert!(!paged.back_enabled());

        assert!(paged.forward().unwrap());
        assert!(second.is_started());
        assert!(!paged.forward_enabled());
        assert!(paged.back_enabled());
        assert!(!paged.forward().unwrap());

        assert!(paged.back().unwrap());
        assert_eq!(*changes.lock(), vec![0, 1, 0]);
    }

    #[test]
    fn test_paged_page_start_failure_is_not_propagated() {
        let broken = Leaf::failing();
        let paged = PagedComponentContainer::new(vec![
            ContainerPage::new("One", Leaf::arc()),
            ContainerPage::new("Broken", broken.clone()).lazy(true),
        ]);
        paged.start().unwrap();

        paged.move_to(1).unwrap();
        assert_eq!(paged.current_index(), Some(1));
        assert!(!broken.is_started());
    }

    #[test]
    fn test_paged_move_before_start_fails() {
        let paged = PagedComponentContainer::new(vec![ContainerPage::new("One", Leaf::arc())]);
        assert!(matches!(paged.move_to(0), Err(ShellError::ComponentNotStarted)));
        paged.start().unwrap();
        assert!(matches!(
            paged.move_to(5),
            Err(ShellError::IndexOutOfRange { index: 5, count: 1 })
        ));
    }

    #[test]
    fn test_tab_select_by_title() {
        let tabs = TabComponentContainer::new(vec![
            ContainerPage::new("General", Leaf::arc()),
            ContainerPage::new("Advanced", Leaf::arc()).lazy(true),
        ]);
        tabs.start().unwrap();
        assert_eq!(tabs.tab_titles(), vec!["General", "Advanced"]);
        assert_eq!(tabs.current_tab(), Some("General"));

        tabs.select_tab("Advanced").unwrap();
        assert_eq!(tabs.current_tab(), Some("Advanced"));
        assert!(matches!(tabs.select_tab("Missing"), Err(ShellError::NotFound(_))));
    }

    #[test]
    fn test_navigator_accept_jumps_to_invalid_page() {
        let valid = Leaf::arc();
        let invalid = Leaf::arc();
        invalid.core.validation().add("port", "Port must be set", || false);
        let navigator = NavigatorComponentContainer::new(vec![
            ContainerPage::new("Server/General", valid),
            ContainerPage::new("Server/Network", invalid.clone()).lazy(true),
        ]);
        let host = host(&navigator);
        navigator.start().unwrap();

        assert!(!navigator.accept().unwrap());
        assert_eq!(navigator.current_path(), Some("Server/Network"));
        assert!(invalid.core.validation_visible());
        assert_eq!(host.exits.load(Ordering::SeqCst), 0);

        navigator.cancel().unwrap();
        assert_eq!(host.exits.load(Ordering::SeqCst), 1);
        assert_eq!(navigator.exit_code(), ComponentExitCode::None);
    }
}
