//! Horizon Shell - a desktop application shell.
//!
//! The shell manages the lifecycle of long-lived UI objects: desktop
//! windows and the workspaces, shelves and dialog boxes inside them. Each
//! object moves through `Opening → Open → Closing → Closed`, owns exactly
//! one view while open, and belongs to one collection that republishes its
//! notifications. Content is supplied as [`ApplicationComponent`]s, hosted
//! directly or inside containers. An [`Application`] ties everything to a
//! GUI toolkit's event loop.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use horizon_shell::prelude::*;
//! use horizon_shell::component::launch_as_workspace;
//!
//! #[derive(Default)]
//! struct Orders {
//!     core: ComponentCore,
//! }
//!
//! impl ApplicationComponent for Orders {
//!     fn component_core(&self) -> &ComponentCore {
//!         &self.core
//!     }
//! }
//!
//! fn main() -> horizon_shell::Result<()> {
//!     let app = Application::builder()
//!         .config(ShellConfig::new().application_name("Orders"))
//!         .initializer(|app| {
//!             if let Some(window) = app.root_window() {
//!                 launch_as_workspace(&window, Arc::new(Orders::default()), "Orders")?;
//!             }
//!             Ok(())
//!         })
//!         .build();
//!
//!     app.run()
//! }
//! ```
//!
//! # Threading
//!
//! Desktop objects, collections and components are used on the UI thread
//! only. [`Application::marshal_delegate`] and [`Application::quit`] are
//! the entry points for other threads.

pub mod application;
pub mod collection;
pub mod command_history;
pub mod component;
pub mod config;
pub mod containers;
pub mod desktop_object;
pub mod dialog;
mod error;
pub mod headless;
mod host;
pub mod logging;
pub mod monitor;
pub mod prelude;
pub mod session;
pub mod shelf;
pub mod toolkit;
pub mod validation;
pub mod view;
pub mod window;
pub mod workspace;

pub use application::{Application, ApplicationBuilder, QuitState, QuittingEventArgs};
pub use collection::{ActivationPolicy, DesktopObjectCollection};
pub use command_history::{Command, CommandHistory};
pub use component::{
    ActionSet, ApplicationComponent, ApplicationComponentHost, ComponentCore, ComponentExitCode,
    HostKind,
};
pub use config::ShellConfig;
pub use desktop_object::{
    CloseOutcome, CloseReason, DesktopObject, DesktopObjectCore, DesktopObjectExt,
    DesktopObjectState, UserInteraction,
};
pub use dialog::{DialogBox, DialogBoxCreationArgs, DialogSize};
pub use error::{Result, ShellError};
pub use monitor::{DesktopMonitor, MonitorEntry};
pub use session::{LocalSessionManager, SessionManager, SessionStatus};
pub use shelf::{Shelf, ShelfCreationArgs, ShelfDisplayHint};
pub use toolkit::{GuiToolkit, HeadlessToolkit};
#[cfg(feature = "winit")]
pub use toolkit::WinitToolkit;
pub use view::{DialogBoxAction, MessageBoxActions, ViewFactory};
pub use window::{DesktopWindow, DesktopWindowCollection, DesktopWindowCreationArgs};
pub use workspace::{Workspace, WorkspaceCreationArgs};
