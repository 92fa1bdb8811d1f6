//! Prelude module for Horizon Shell.
//!
//! This module re-exports the most commonly used types for convenient importing:
//!
//! ```ignore
//! use horizon_shell::prelude::*;
//! ```
//!
//! This provides access to:
//! - Application lifecycle (`Application`, `ShellConfig`)
//! - Desktop objects (`DesktopWindow`, `Workspace`, `Shelf`, `DialogBox`)
//! - Component hosting (`ApplicationComponent`, `ComponentCore`)
//! - Signals and properties from the core crate

// ============================================================================
// Application
// ============================================================================

pub use crate::application::{Application, QuitState};
pub use crate::config::ShellConfig;
pub use crate::error::ShellError;
pub use crate::session::{SessionManager, SessionStatus};

// ============================================================================
// Desktop Objects
// ============================================================================

pub use crate::desktop_object::{
    CloseOutcome, CloseReason, DesktopObject, DesktopObjectExt, DesktopObjectState,
    UserInteraction,
};
pub use crate::dialog::DialogBoxCreationArgs;
pub use crate::shelf::{ShelfCreationArgs, ShelfDisplayHint};
pub use crate::view::{DialogBoxAction, MessageBoxActions};
pub use crate::window::{DesktopWindow, DesktopWindowCreationArgs};
pub use crate::workspace::{Workspace, WorkspaceCreationArgs};

// ============================================================================
// Components
// ============================================================================

pub use crate::component::{
    ApplicationComponent, ApplicationComponentHost, ComponentCore, ComponentExitCode,
};

// ============================================================================
// Signal/Slot and Property System
// ============================================================================

pub use horizon_shell_core::{ObservableProperty, Signal, Subscription, SubscriptionSet};
