//! Integration tests for window, workspace and shelf lifecycles.

use std::sync::Arc;

use horizon_shell::headless::{HeadlessViewFactory, ViewKind};
use horizon_shell::logging::{DesktopTreeDebug, TreeFormatOptions, TreeStyle};
use horizon_shell::prelude::*;
use horizon_shell::{DesktopWindowCollection, Shelf};
use parking_lot::Mutex;

#[derive(Default)]
struct Editor {
    core: ComponentCore,
}

impl ApplicationComponent for Editor {
    fn component_core(&self) -> &ComponentCore {
        &self.core
    }
}

fn editor() -> Arc<Editor> {
    Arc::new(Editor::default())
}

fn root_window(factory: &HeadlessViewFactory) -> (DesktopWindowCollection, Arc<DesktopWindow>) {
    let windows = DesktopWindowCollection::new(Arc::new(factory.clone()));
    let window = windows
        .add_new(DesktopWindowCreationArgs::new("Root").name("Root"))
        .unwrap();
    (windows, window)
}

fn open_shelf(window: &Arc<DesktopWindow>, title: &str) -> Arc<Shelf> {
    window
        .shelves()
        .add_new(ShelfCreationArgs::new(editor(), title).display_hint(ShelfDisplayHint::DOCK_LEFT))
        .unwrap()
}

#[test]
fn workspace_that_cannot_close_blocks_non_interactive_window_close() {
    let factory = HeadlessViewFactory::new();
    let (_windows, window) = root_window(&factory);

    let events = Arc::new(Mutex::new(Vec::new()));
    {
        let events = events.clone();
        window.workspaces().item_opening().connect(move |args| {
            events.lock().push(format!("opening {}", args.item.title()));
        });
    }
    {
        let events = events.clone();
        window.workspaces().item_opened().connect(move |args| {
            events.lock().push(format!("opened {}", args.item.title()));
        });
    }

    let component = editor();
    let workspace = window
        .workspaces()
        .add_new(WorkspaceCreationArgs::new(component.clone(), "Editor"))
        .unwrap();

    assert_eq!(*events.lock(), vec!["opening Editor", "opened Editor"]);
    let active = window.active_workspace().unwrap();
    assert!(Arc::ptr_eq(&active, &workspace));

    component.component_core().set_modified(true);
    let outcome = window
        .close_with(UserInteraction::NotAllowed, CloseReason::PROGRAM)
        .unwrap();

    assert_eq!(outcome, CloseOutcome::Refused);
    assert_eq!(window.state(), DesktopObjectState::Open);
    assert_eq!(workspace.state(), DesktopObjectState::Open);
}

#[test]
fn closing_a_window_closes_every_child() {
    let factory = HeadlessViewFactory::new();
    let (windows, window) = root_window(&factory);

    let workspaces: Vec<_> = ["Orders", "Invoices"]
        .into_iter()
        .map(|title| {
            window
                .workspaces()
                .add_new(WorkspaceCreationArgs::new(editor(), title))
                .unwrap()
        })
        .collect();
    let shelves = vec![open_shelf(&window, "Explorer"), open_shelf(&window, "Properties")];
    let mut views = factory.views(ViewKind::Workspace);
    views.extend(factory.views(ViewKind::Shelf));
    assert_eq!(views.len(), 4);

    assert!(window.close().unwrap());

    assert_eq!(window.state(), DesktopObjectState::Closed);
    for workspace in &workspaces {
        assert_eq!(workspace.state(), DesktopObjectState::Closed);
        assert!(!workspace.component().is_started());
    }
    for shelf in &shelves {
        assert_eq!(shelf.state(), DesktopObjectState::Closed);
    }
    assert!(windows.is_empty());
    assert!(views.iter().all(|view| view.is_disposed()));
}

#[test]
fn one_blocking_workspace_leaves_every_child_open() {
    let factory = HeadlessViewFactory::new();
    let (_windows, window) = root_window(&factory);

    let clean = window
        .workspaces()
        .add_new(WorkspaceCreationArgs::new(editor(), "Clean"))
        .unwrap();
    let dirty_component = editor();
    let dirty = window
        .workspaces()
        .add_new(WorkspaceCreationArgs::new(dirty_component.clone(), "Dirty"))
        .unwrap();
    let shelf = open_shelf(&window, "Explorer");
    dirty_component.component_core().set_modified(true);

    let outcome = window
        .close_with(UserInteraction::NotAllowed, CloseReason::APPLICATION_QUIT)
        .unwrap();

    assert_eq!(outcome, CloseOutcome::Refused);
    for state in [window.state(), clean.state(), dirty.state(), shelf.state()] {
        assert_eq!(state, DesktopObjectState::Open);
    }
    assert_eq!(window.workspaces().len(), 2);
}

#[test]
fn interactive_close_asks_before_discarding_changes() {
    let factory = HeadlessViewFactory::new();
    let (_windows, window) = root_window(&factory);
    let component = editor();
    let workspace = window
        .workspaces()
        .add_new(WorkspaceCreationArgs::new(component.clone(), "Draft"))
        .unwrap();
    component.component_core().set_modified(true);

    factory.push_message_box_response(DialogBoxAction::Cancel);
    assert!(!window.close().unwrap());
    assert_eq!(workspace.state(), DesktopObjectState::Open);
    assert_eq!(factory.messages_shown().len(), 1);

    // Default answer is OK: discard and close.
    assert!(window.close().unwrap());
    assert_eq!(workspace.state(), DesktopObjectState::Closed);
    assert_eq!(factory.messages_shown().len(), 2);
}

#[test]
fn cancelled_close_restores_open_state_and_flags() {
    let factory = HeadlessViewFactory::new();
    let (_windows, window) = root_window(&factory);
    let workspace = window
        .workspaces()
        .add_new(WorkspaceCreationArgs::new(editor(), "Editor"))
        .unwrap();

    let before = (workspace.is_active(), workspace.is_visible());
    let states = Arc::new(Mutex::new(Vec::new()));
    let veto = {
        let states = states.clone();
        let observed = Arc::downgrade(&workspace);
        workspace.core().closing().subscribe(move |args| {
            if let Some(workspace) = observed.upgrade() {
                states.lock().push(workspace.state());
            }
            args.cancel();
        })
    };

    let outcome = workspace
        .close_with(UserInteraction::Allowed, CloseReason::USER_INTERFACE)
        .unwrap();
    assert_eq!(outcome, CloseOutcome::Cancelled);
    assert_eq!(workspace.state(), DesktopObjectState::Open);
    assert_eq!((workspace.is_active(), workspace.is_visible()), before);
    assert_eq!(*states.lock(), vec![DesktopObjectState::Closing]);

    veto.release();
    assert!(workspace.close().unwrap());
    assert_eq!(workspace.state(), DesktopObjectState::Closed);
}

#[test]
fn vetoed_component_exit_keeps_close_checks() {
    let factory = HeadlessViewFactory::new();
    let (_windows, window) = root_window(&factory);
    let component = editor();
    let workspace = window
        .workspaces()
        .add_new(WorkspaceCreationArgs::new(component.clone(), "Draft"))
        .unwrap();

    let veto = workspace.core().closing().subscribe(|args| args.cancel());
    component
        .component_core()
        .exit(ComponentExitCode::Accepted)
        .unwrap();
    assert_eq!(workspace.state(), DesktopObjectState::Open);
    veto.release();

    component.component_core().set_modified(true);
    let outcome = workspace
        .close_with(UserInteraction::NotAllowed, CloseReason::PROGRAM)
        .unwrap();

    assert_eq!(outcome, CloseOutcome::Refused);
    assert_eq!(workspace.state(), DesktopObjectState::Open);
}

#[test]
fn duplicate_workspace_name_is_rejected() {
    let factory = HeadlessViewFactory::new();
    let (_windows, window) = root_window(&factory);
    window
        .workspaces()
        .add_new(WorkspaceCreationArgs::new(editor(), "Orders").name("orders"))
        .unwrap();

    let duplicate = window
        .workspaces()
        .add_new(WorkspaceCreationArgs::new(editor(), "Orders again").name("orders"));

    assert!(matches!(duplicate, Err(ShellError::DuplicateName(_))));
    assert_eq!(window.workspaces().len(), 1);
}

#[test]
fn factory_releases_views_of_closed_objects() {
    let factory = HeadlessViewFactory::new();
    let (_windows, window) = root_window(&factory);
    for round in 0..3 {
        let workspace = window
            .workspaces()
            .add_new(WorkspaceCreationArgs::new(editor(), format!("Scratch {round}")))
            .unwrap();
        assert_eq!(factory.views(ViewKind::Workspace).len(), 1);
        assert!(workspace.close().unwrap());
    }

    assert!(factory.views(ViewKind::Workspace).is_empty());
    assert_eq!(factory.views(ViewKind::Window).len(), 1);
}

#[test]
fn view_close_request_closes_the_workspace() {
    let factory = HeadlessViewFactory::new();
    let (_windows, window) = root_window(&factory);
    let workspace = window
        .workspaces()
        .add_new(WorkspaceCreationArgs::new(editor(), "Editor"))
        .unwrap();

    factory.last_view(ViewKind::Workspace).unwrap().request_close();

    assert_eq!(workspace.state(), DesktopObjectState::Closed);
    assert!(window.workspaces().is_empty());
    assert!(window.active_workspace().is_none());
}

#[test]
fn window_title_follows_active_workspace() {
    let factory = HeadlessViewFactory::new();
    let (_windows, window) = root_window(&factory);
    window
        .workspaces()
        .add_new(WorkspaceCreationArgs::new(editor(), "Orders"))
        .unwrap();
    assert_eq!(window.title(), "Orders - Root");

    let second = window
        .workspaces()
        .add_new(WorkspaceCreationArgs::new(editor(), "Invoices"))
        .unwrap();
    assert_eq!(window.title(), "Invoices - Root");

    second.core().set_title("Invoices (2)");
    assert_eq!(window.title(), "Invoices (2) - Root");
}

#[test]
fn tree_debug_lists_children_under_their_window() {
    let factory = HeadlessViewFactory::new();
    let (windows, window) = root_window(&factory);
    window
        .workspaces()
        .add_new(WorkspaceCreationArgs::new(editor(), "Editor").name("editor"))
        .unwrap();
    open_shelf(&window, "Explorer");

    let output = DesktopTreeDebug::with_options(TreeFormatOptions {
        style: TreeStyle::Ascii,
        ..TreeFormatOptions::minimal()
    })
    .format(&windows);

    let lines: Vec<&str> = output.lines().collect();
    assert_eq!(lines[0], "Desktop (1 windows):");
    assert_eq!(lines[1], "`-- DesktopWindow 'Root' \"Editor - Root\"");
    assert_eq!(lines[2], "    +-- Workspace 'editor' \"Editor\"");
    assert_eq!(lines[3], "    `-- Shelf \"Explorer\"");
}
